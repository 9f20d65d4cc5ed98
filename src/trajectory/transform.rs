//! Turns raw per-record event logs into the normalized trajectory document.
//!
//! The transformer is pure: every secondary file has already been fetched by
//! the loader, and enrichment (dataset, summary) is handed in through
//! [`TransformContext`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Map;
use std::collections::HashSet;

use super::model::{
    AgentInfo, Instructions, Message, RewardInfo, Simulation, Task, TaskDescription, TokenUsage,
    TrajectoryDocument, TrajectoryInfo, UserScenario,
};
use super::raw::{MessageEvent, RawEvent, ResultEvent, Transcript, TrialRecord, TrialSummary};
use crate::dataset::DatasetIndex;

const UNKNOWN_AGENT: &str = "unknown";

/// Enrichment available to a transformation
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub dataset: Option<&'a DatasetIndex>,
    pub summary: Option<&'a TrialSummary>,
    /// Domain recorded on every created task
    pub domain: &'a str,
}

impl Default for TransformContext<'_> {
    fn default() -> Self {
        Self {
            dataset: None,
            summary: None,
            domain: "Python",
        }
    }
}

/// Normalize a transcript. Normalized documents pass through untouched.
pub fn transform(transcript: Transcript, ctx: &TransformContext<'_>) -> TrajectoryDocument {
    match transcript {
        Transcript::Normalized(doc) => doc,
        Transcript::Records(records) => transform_records(&records, ctx),
    }
}

fn transform_records(records: &[TrialRecord], ctx: &TransformContext<'_>) -> TrajectoryDocument {
    let mut simulations = Vec::with_capacity(records.len());
    let mut tasks = Vec::new();
    let mut seen = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let instance_id = record
            .instance_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("instance_{}", index));

        if seen.insert(instance_id.clone()) {
            tasks.push(build_task(&instance_id, ctx));
        }
        simulations.push(build_simulation(&instance_id, record, ctx.summary));
    }

    TrajectoryDocument::new(
        simulations,
        tasks,
        Some(TrajectoryInfo {
            num_trials: Some(records.len()),
            agent_info: Some(agent_info(records)),
            ..Default::default()
        }),
    )
}

/// Agent identity from the first system event of the first record
fn agent_info(records: &[TrialRecord]) -> AgentInfo {
    let model = records
        .first()
        .and_then(|r| {
            r.events.iter().find_map(|e| match e {
                RawEvent::System(s) => Some(s.model.clone()),
                _ => None,
            })
        })
        .flatten()
        .unwrap_or_else(|| UNKNOWN_AGENT.to_string());

    AgentInfo {
        implementation: model.clone(),
        llm: model,
        llm_args: Map::new(),
    }
}

fn build_task(instance_id: &str, ctx: &TransformContext<'_>) -> Task {
    let description = match ctx.dataset.and_then(|d| d.get(instance_id)) {
        Some(instance) => TaskDescription {
            instance_id: instance_id.to_string(),
            ..instance.description()
        },
        None => TaskDescription {
            instance_id: instance_id.to_string(),
            ..Default::default()
        },
    };

    Task {
        id: instance_id.to_string(),
        description: Some(description),
        user_scenario: Some(UserScenario {
            instructions: Instructions {
                domain: ctx.domain.to_string(),
                reason_for_call: Some("Code generation task".to_string()),
                known_info: Some("See model patch for details".to_string()),
            },
        }),
        extra: Map::new(),
    }
}

/// Parse an event timestamp. Naive timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Running state while walking one record's events
#[derive(Default)]
struct EventWalk {
    messages: Vec<Message>,
    total_cost: f64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    result: Option<ResultEvent>,
}

impl EventWalk {
    fn observe_start(&mut self, timestamp: Option<&str>) {
        if self.start.is_none() {
            self.start = timestamp.and_then(parse_timestamp);
        }
    }

    fn push_message(&mut self, kind: &str, event: &MessageEvent) {
        let raw = event.message.clone().unwrap_or_default();
        let usage = event.usage();
        let cost = event.cost();
        self.total_cost += cost;

        let timestamp = event.timestamp.clone();
        self.observe_start(timestamp.as_deref());
        if let Some(ts) = timestamp.as_deref().and_then(parse_timestamp) {
            self.end = Some(ts);
        }

        let (content, tool_calls) = match &raw.content {
            Some(content) => (content.render(), content.tool_calls()),
            None => (String::new(), Vec::new()),
        };

        self.messages.push(Message {
            role: raw.role.unwrap_or_else(|| kind.to_string()),
            content: Some(content),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            turn_idx: Some(self.messages.len()),
            timestamp,
            cost: Some(cost),
            usage: Some(TokenUsage {
                prompt_tokens: usage.prompt(),
                completion_tokens: usage.completion(),
            }),
            extra: Map::new(),
        });
    }

    fn duration(&self) -> Option<f64> {
        if let Some(ms) = self.result.as_ref().and_then(|r| r.duration_ms) {
            if ms > 0.0 {
                return Some(ms / 1000.0);
            }
        }
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    fn termination_reason(&self) -> String {
        match &self.result {
            Some(r) if r.is_error => "error".to_string(),
            Some(ResultEvent {
                subtype: Some(subtype),
                ..
            }) => subtype.clone(),
            _ => "completed".to_string(),
        }
    }
}

fn build_simulation(
    instance_id: &str,
    record: &TrialRecord,
    summary: Option<&TrialSummary>,
) -> Simulation {
    let mut walk = EventWalk::default();

    for event in &record.events {
        match event {
            RawEvent::System(system) => walk.observe_start(system.timestamp.as_deref()),
            RawEvent::Assistant(message) => walk.push_message("assistant", message),
            RawEvent::User(message) => walk.push_message("user", message),
            RawEvent::Result(result) => walk.result = Some(result.clone()),
            RawEvent::Other => {}
        }
    }

    let listed = |ids: &[String]| ids.iter().any(|id| id == instance_id);
    let (correct, correct_secure) = summary
        .map(|s| (listed(&s.details.correct), listed(&s.details.correct_secure)))
        .unwrap_or((false, false));

    let trial = 1;
    Simulation {
        id: format!("{}_trial_{}", instance_id, trial),
        task_id: instance_id.to_string(),
        trial,
        duration: walk.duration(),
        reward_info: Some(RewardInfo {
            reward: 0.0,
            nl_assertions: Vec::new(),
            correct,
            correct_secure,
            extra: Map::new(),
        }),
        termination_reason: Some(walk.termination_reason()),
        agent_cost: Some(
            walk.result
                .as_ref()
                .and_then(|r| r.total_cost_usd)
                .unwrap_or(walk.total_cost),
        ),
        user_cost: Some(0.0),
        num_turns: Some(
            walk.result
                .as_ref()
                .and_then(|r| r.num_turns)
                .filter(|n| *n > 0)
                .unwrap_or(walk.messages.len() as u32),
        ),
        model_patch: record.model_patch.clone(),
        messages: walk.messages,
        extra: Map::new(),
    }
}
