//! Finds the transcript files a submission published by probing candidate
//! filenames.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{AgentKey, SubmissionRecord};
use crate::source::{join_path, DataSource};

/// Ordered filename templates for one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPatterns {
    pub model: String,
    pub patterns: Vec<String>,
}

/// Candidate transcript filenames per model.
///
/// Templates may use `{submission_dir}`, `{domain}` and `{model_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternTable {
    #[serde(default)]
    pub models: Vec<ModelPatterns>,
    /// Used for models without an entry
    #[serde(default)]
    pub fallback: Vec<String>,
}

impl Default for PatternTable {
    fn default() -> Self {
        const TRIALS: &str = "{submission_dir}.trials.json";
        let entry = |model: &str, extra: &[&str]| ModelPatterns {
            model: model.to_string(),
            patterns: std::iter::once(TRIALS)
                .chain(extra.iter().copied())
                .map(str::to_string)
                .collect(),
        };

        Self {
            models: vec![
                entry("claude-4-sonnet", &[]),
                entry(
                    "claude-3.7-sonnet",
                    &["claude-3-7-sonnet-20250219_{domain}_default_gpt-4.1-2025-04-14_4trials.json"],
                ),
                entry(
                    "gpt-4.1",
                    &["gpt-4.1-2025-04-14_{domain}_default_gpt-4.1-2025-04-14_4trials.json"],
                ),
                entry(
                    "gpt-4.1-mini",
                    &["gpt-4.1-mini-2025-04-14_{domain}_base_gpt-4.1-2025-04-14_4trials.json"],
                ),
                entry(
                    "o4-mini",
                    &["o4-mini-2025-04-16_{domain}_default_gpt-4.1-2025-04-14_4trials.json"],
                ),
                entry(
                    "gpt-5",
                    &["gpt-5_{domain}_default_gpt-4.1-2025-04-14_4trials.json"],
                ),
                entry(
                    "qwen3-max-2025-10-30",
                    &["{domain}_llm_agent_qwen3-max-2025-10-30_user_simulator_gpt-4.1-2025-04-14.json"],
                ),
                entry(
                    "Qwen3-Max-Thinking-Preview",
                    &["{domain}_llm_agent_qwen3-max-2025-10-30_user_simulator_gpt-4.1-2025-04-14.json"],
                ),
                entry(
                    "Nemotron-Orchestrator-8B",
                    &["toolorchestra_{domain}_gpt-5_1trial.json"],
                ),
            ],
            fallback: vec![
                TRIALS.to_string(),
                "{domain}_llm_agent_{model_name}_user_simulator_gpt-4.1-2025-04-14.json".to_string(),
                "{model_name}_{domain}_default_gpt-4.1-2025-04-14_4trials.json".to_string(),
                "{domain}_{model_name}_user_simulator_gpt-4.1-2025-04-14.json".to_string(),
            ],
        }
    }
}

impl PatternTable {
    /// Templates for a model, matched case-insensitively. Models without
    /// an entry (or with an empty one) get the fallback list.
    pub fn patterns_for(&self, model_name: &str) -> &[String] {
        self.models
            .iter()
            .find(|m| m.model.eq_ignore_ascii_case(model_name))
            .map(|m| m.patterns.as_slice())
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.fallback)
    }
}

/// Fill every placeholder of a template
pub fn expand_template(template: &str, submission_dir: &str, domain: &str, model_name: &str) -> String {
    template
        .replace("{submission_dir}", submission_dir)
        .replace("{domain}", domain)
        .replace("{model_name}", model_name)
}

/// A transcript file that exists for a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTrajectory {
    /// `"<agent key> - <Domain>"`
    pub name: String,
    pub file: String,
    pub domain: String,
    pub model: String,
    pub agent_key: AgentKey,
    pub submission_dir: String,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Directory holding a submission's transcripts
pub fn trajectory_dir(submissions_dir: &str, submission_dir: &str) -> String {
    join_path(&[submissions_dir, submission_dir, "trajectories"])
}

/// Probe candidate filenames for each domain, keeping the first hit.
///
/// Submissions that do not declare trajectories are never probed. No hit
/// at all is an empty list, not an error.
pub async fn resolve_trajectories(
    source: &dyn DataSource,
    record: &SubmissionRecord,
    table: &PatternTable,
    domains: &[String],
    submissions_dir: &str,
) -> Vec<ResolvedTrajectory> {
    let submission = &record.submission;
    if !submission.trajectories_available {
        debug!(
            "Submission {} does not publish trajectories, skipping probe",
            record.submission_dir
        );
        return Vec::new();
    }

    let agent_key = submission.agent_key();
    let dir = trajectory_dir(submissions_dir, &record.submission_dir);
    let patterns = table.patterns_for(&submission.model_name);
    let mut resolved = Vec::new();

    for domain in domains {
        for template in patterns {
            let file = expand_template(template, &record.submission_dir, domain, &submission.model_name);
            let path = join_path(&[&dir, &file]);
            if source.exists(&path).await {
                debug!("Found trajectory {}", path);
                resolved.push(ResolvedTrajectory {
                    name: format!("{} - {}", agent_key, capitalize(domain)),
                    file,
                    domain: domain.clone(),
                    model: submission.model_name.clone(),
                    agent_key: agent_key.clone(),
                    submission_dir: record.submission_dir.clone(),
                });
                break;
            }
        }
    }

    info!(
        "Resolved {} trajectory file(s) for {}",
        resolved.len(),
        agent_key
    );
    resolved
}
