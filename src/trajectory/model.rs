//! Normalized trajectory document: simulations, tasks and run info.
//!
//! This is both the output of the transformer and the shape some transcript
//! files already have on disk. Those files are hand-shaped, so every field
//! reads leniently and unknown fields are carried along in `extra`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::de::{lenient, lenient_items};

fn default_trial() -> u32 {
    1
}

fn trial_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::<D, Option<u32>>(deserializer)?.unwrap_or_else(default_trial))
}

/// Prompt/completion token counts of one message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, deserialize_with = "lenient")]
    pub prompt_tokens: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub completion_tokens: u64,
}

/// One conversation turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, deserialize_with = "lenient")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub tool_calls: Option<Vec<Value>>,
    /// Zero-based position among the messages of its simulation
    #[serde(default, deserialize_with = "lenient")]
    pub turn_idx: Option<usize>,
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub usage: Option<TokenUsage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub reward: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub nl_assertions: Vec<Value>,
    /// Functional tests passed
    #[serde(default, deserialize_with = "lenient")]
    pub correct: bool,
    /// Functional and security tests passed
    #[serde(default, deserialize_with = "lenient")]
    pub correct_secure: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single trial of one task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub task_id: String,
    #[serde(default = "default_trial", deserialize_with = "trial_number")]
    pub trial: u32,
    #[serde(default, deserialize_with = "lenient_items")]
    pub messages: Vec<Message>,
    /// Wall-clock duration in seconds
    #[serde(default, deserialize_with = "lenient")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub reward_info: Option<RewardInfo>,
    #[serde(default, deserialize_with = "lenient")]
    pub termination_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub agent_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub user_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub num_turns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub model_patch: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Simulation {
    pub fn is_correct(&self) -> bool {
        self.reward_info.as_ref().is_some_and(|r| r.correct)
    }

    pub fn is_correct_secure(&self) -> bool {
        self.reward_info.as_ref().is_some_and(|r| r.correct_secure)
    }
}

/// Task metadata joined from the dataset; fields are empty when the
/// instance is unknown to the dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDescription {
    #[serde(rename = "InstanceID", default, deserialize_with = "lenient")]
    pub instance_id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub image_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub project: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cwe_ids: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub cve_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub info_page: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub problem_statement: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instructions {
    #[serde(default, deserialize_with = "lenient")]
    pub domain: String,
    #[serde(default, deserialize_with = "lenient")]
    pub reason_for_call: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub known_info: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserScenario {
    #[serde(default, deserialize_with = "lenient")]
    pub instructions: Instructions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<TaskDescription>,
    #[serde(default, deserialize_with = "lenient")]
    pub user_scenario: Option<UserScenario>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn domain(&self) -> Option<&str> {
        self.user_scenario
            .as_ref()
            .map(|s| s.instructions.domain.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub implementation: String,
    #[serde(default, deserialize_with = "lenient")]
    pub llm: String,
    #[serde(default, deserialize_with = "lenient")]
    pub llm_args: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub num_trials: Option<usize>,
    #[serde(default, deserialize_with = "lenient")]
    pub max_steps: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub max_errors: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub seed: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub agent_info: Option<AgentInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Normalized collection of simulations and the tasks they refer to.
///
/// A document read with [`TrajectoryDocument::from_normalized`] keeps the
/// JSON it came from and serializes back to exactly that value; the typed
/// fields are a best-effort view used for lookups.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrajectoryDocument {
    #[serde(default, deserialize_with = "lenient_items")]
    pub simulations: Vec<Simulation>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub tasks: Vec<Task>,
    #[serde(default, deserialize_with = "lenient")]
    pub info: Option<TrajectoryInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    source: Option<Value>,
}

#[derive(Serialize)]
struct DocumentFields<'a> {
    simulations: &'a [Simulation],
    tasks: &'a [Task],
    info: &'a Option<TrajectoryInfo>,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

impl Serialize for TrajectoryDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.source {
            Some(source) => source.serialize(serializer),
            None => DocumentFields {
                simulations: &self.simulations,
                tasks: &self.tasks,
                info: &self.info,
                extra: &self.extra,
            }
            .serialize(serializer),
        }
    }
}

impl TrajectoryDocument {
    pub fn new(simulations: Vec<Simulation>, tasks: Vec<Task>, info: Option<TrajectoryInfo>) -> Self {
        Self {
            simulations,
            tasks,
            info,
            ..Default::default()
        }
    }

    /// Wrap a document that is already in normalized form
    pub fn from_normalized(value: Value) -> Self {
        let mut doc = match serde_json::from_value::<TrajectoryDocument>(value.clone()) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Normalized document has no usable typed view: {}", e);
                TrajectoryDocument::default()
            }
        };
        doc.source = Some(value);
        doc
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn simulation(&self, simulation_id: &str) -> Option<&Simulation> {
        self.simulations.iter().find(|s| s.id == simulation_id)
    }
}
