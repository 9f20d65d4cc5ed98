use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::de::null_default;

const UNKNOWN_FRAMEWORK: &str = "unknown";
const KEY_SEPARATOR: &str = "::";

/// Composite identity of a leaderboard entry: `<model_name>::<framework>`
///
/// A missing framework is spelled `unknown`, and parsing `unknown` back
/// yields `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentKey(String);

impl AgentKey {
    pub fn new(agent_framework: Option<&str>, model_name: &str) -> Self {
        let framework = agent_framework.unwrap_or(UNKNOWN_FRAMEWORK);
        AgentKey(format!("{}{}{}", model_name, KEY_SEPARATOR, framework))
    }

    /// Split the key back into `(model_name, framework)`
    pub fn parts(&self) -> (&str, Option<&str>) {
        match self.0.split_once(KEY_SEPARATOR) {
            Some((model, framework)) if framework != UNKNOWN_FRAMEWORK => (model, Some(framework)),
            Some((model, _)) => (model, None),
            None => (self.0.as_str(), None),
        }
    }

    pub fn model_name(&self) -> &str {
        self.parts().0
    }

    pub fn agent_framework(&self) -> Option<&str> {
        self.parts().1
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentKey {
    fn from(raw: &str) -> Self {
        AgentKey(raw.to_string())
    }
}

/// Whether the entry used the benchmark's stock scaffold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionType {
    #[default]
    Standard,
    Custom,
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionType::Standard => write!(f, "standard"),
            SubmissionType::Custom => write!(f, "custom"),
        }
    }
}

/// Scores for one language
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageResults {
    /// FuncPass@1 in percent
    #[serde(default)]
    pub func_pass_1: Option<f64>,
    /// SecPass@1 in percent
    #[serde(default)]
    pub sec_pass_1: Option<f64>,
    /// Evaluation cost in USD
    #[serde(default)]
    pub cost: Option<f64>,
}

/// Self-reported verification answers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub modified_prompts: Option<bool>,
    #[serde(default)]
    pub omitted_questions: Option<bool>,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Methodology {
    #[serde(default)]
    pub evaluation_date: Option<String>,
    #[serde(default)]
    pub susvibes_version: Option<String>,
    #[serde(default)]
    pub agent_framework: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub verification: Option<Verification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
}

/// Languages mapped to `null` have no scores and are left out
fn results_by_language<'de, D>(deserializer: D) -> Result<BTreeMap<String, LanguageResults>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<LanguageResults>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(language, results)| results.map(|r| (language, r)))
        .collect())
}

/// One `submission.json` document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub model_name: String,
    #[serde(default)]
    pub model_organization: Option<String>,
    #[serde(default)]
    pub submitting_organization: Option<String>,
    #[serde(default)]
    pub submission_date: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub submission_type: SubmissionType,
    #[serde(default, deserialize_with = "null_default")]
    pub is_new: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub trajectories_available: bool,
    /// Scores keyed by language (`python`, ...)
    #[serde(default, deserialize_with = "results_by_language")]
    pub results: BTreeMap<String, LanguageResults>,
    #[serde(default)]
    pub methodology: Option<Methodology>,
    #[serde(default, deserialize_with = "null_default")]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
}

impl Submission {
    pub fn agent_framework(&self) -> Option<&str> {
        self.methodology
            .as_ref()
            .and_then(|m| m.agent_framework.as_deref())
    }

    pub fn agent_key(&self) -> AgentKey {
        AgentKey::new(self.agent_framework(), &self.model_name)
    }

    pub fn verification(&self) -> Option<&Verification> {
        self.methodology.as_ref().and_then(|m| m.verification.as_ref())
    }

    /// Verified entries ship trajectories, answered every question and, unless
    /// they are custom scaffolds, kept the stock prompts.
    pub fn is_verified(&self) -> bool {
        let Some(verification) = self.verification() else {
            return false;
        };
        self.trajectories_available
            && verification.omitted_questions == Some(false)
            && (self.submission_type == SubmissionType::Custom
                || verification.modified_prompts == Some(false))
    }

    pub fn language_results(&self, language: &str) -> Option<&LanguageResults> {
        self.results.get(language)
    }
}

/// A submission together with the directory it was loaded from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub submission_dir: String,
    #[serde(flatten)]
    pub submission: Submission,
}

/// The subset of a submission the leaderboard needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionMetrics {
    pub agent_key: AgentKey,
    pub model_name: String,
    pub agent_framework: Option<String>,
    pub organization: Option<String>,
    pub func_pass_1: Option<f64>,
    pub sec_pass_1: Option<f64>,
    pub cost: Option<f64>,
    pub is_new: bool,
    pub is_verified: bool,
    pub verification: Option<Verification>,
    pub submission_type: SubmissionType,
}

impl SubmissionMetrics {
    pub fn from_submission(submission: &Submission, language: &str) -> Self {
        let results = submission.language_results(language);
        Self {
            agent_key: submission.agent_key(),
            model_name: submission.model_name.clone(),
            agent_framework: submission.agent_framework().map(str::to_string),
            organization: submission.submitting_organization.clone(),
            func_pass_1: results.and_then(|r| r.func_pass_1),
            sec_pass_1: results.and_then(|r| r.sec_pass_1),
            cost: results.and_then(|r| r.cost),
            is_new: submission.is_new,
            is_verified: submission.is_verified(),
            verification: submission.verification().cloned(),
            submission_type: submission.submission_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_key_composition() {
        assert_eq!(AgentKey::new(None, "gpt-4.1").as_str(), "gpt-4.1::unknown");
        assert_eq!(AgentKey::new(Some("react"), "gpt-4.1").as_str(), "gpt-4.1::react");
    }

    #[test]
    fn test_agent_key_parsing_recovers_parts() {
        let key = AgentKey::from("gpt-4.1::unknown");
        assert_eq!(key.parts(), ("gpt-4.1", None));

        let key = AgentKey::from("gpt-4.1::react");
        assert_eq!(key.parts(), ("gpt-4.1", Some("react")));

        let built = AgentKey::new(Some("openhands"), "claude-4-sonnet");
        assert_eq!(built.model_name(), "claude-4-sonnet");
        assert_eq!(built.agent_framework(), Some("openhands"));
    }

    fn submission(value: serde_json::Value) -> Submission {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_submission_defaults() {
        let s = submission(json!({ "model_name": "gpt-5" }));
        assert_eq!(s.submission_type, SubmissionType::Standard);
        assert!(!s.is_new);
        assert!(!s.trajectories_available);
        assert_eq!(s.agent_key().as_str(), "gpt-5::unknown");
        assert!(!s.is_verified());
    }

    #[test]
    fn test_verification_rules() {
        let standard = submission(json!({
            "model_name": "gpt-5",
            "trajectories_available": true,
            "methodology": {
                "agent_framework": "openhands",
                "verification": { "modified_prompts": false, "omitted_questions": false }
            }
        }));
        assert!(standard.is_verified());

        let modified = submission(json!({
            "model_name": "gpt-5",
            "trajectories_available": true,
            "methodology": {
                "verification": { "modified_prompts": true, "omitted_questions": false }
            }
        }));
        assert!(!modified.is_verified());

        // custom scaffolds may change prompts
        let custom = submission(json!({
            "model_name": "gpt-5",
            "submission_type": "custom",
            "trajectories_available": true,
            "methodology": {
                "verification": { "modified_prompts": true, "omitted_questions": false }
            }
        }));
        assert!(custom.is_verified());

        let unknown_omission = submission(json!({
            "model_name": "gpt-5",
            "trajectories_available": true,
            "methodology": {
                "verification": { "modified_prompts": false, "omitted_questions": null }
            }
        }));
        assert!(!unknown_omission.is_verified());
    }

    #[test]
    fn test_metrics_from_submission() {
        let s = submission(json!({
            "model_name": "claude-4-sonnet",
            "submitting_organization": "Lab",
            "is_new": true,
            "results": { "python": { "func_pass_1": 61.5, "sec_pass_1": 12.0, "cost": 30.2 } },
            "methodology": { "agent_framework": "swe-agent" }
        }));
        let metrics = SubmissionMetrics::from_submission(&s, "python");
        assert_eq!(metrics.agent_key.as_str(), "claude-4-sonnet::swe-agent");
        assert_eq!(metrics.func_pass_1, Some(61.5));
        assert_eq!(metrics.sec_pass_1, Some(12.0));
        assert_eq!(metrics.cost, Some(30.2));
        assert_eq!(metrics.organization.as_deref(), Some("Lab"));
        assert!(metrics.is_new);

        let missing = SubmissionMetrics::from_submission(&s, "java");
        assert_eq!(missing.func_pass_1, None);
        assert_eq!(missing.cost, None);
    }
}
