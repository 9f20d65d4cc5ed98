//! Raw transcript files as they are recorded by the agent harness.
//!
//! A transcript file is either an already normalized document or a list of
//! per-task records, each holding an event log (or the name of a file that
//! holds it). [`RawTranscript`] is what comes off the wire; [`Transcript`] is
//! the same thing with every file reference replaced by its events.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::model::TrajectoryDocument;
use crate::de::{lenient, null_default};
use crate::error::{BoardError, Result};

/// Token counters under either naming convention
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

impl RawUsage {
    pub fn prompt(&self) -> u64 {
        self.prompt_tokens.or(self.input_tokens).unwrap_or(0)
    }

    pub fn completion(&self) -> u64 {
        self.completion_tokens.or(self.output_tokens).unwrap_or(0)
    }
}

/// One block of message content.
///
/// Anything that is not plain text, text, a tool call or a tool result is
/// kept verbatim as `Unknown` and rendered as its JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ContentBlock {
    Plain(String),
    Text(Value),
    ToolUse(Value),
    ToolResult(Value),
    Unknown(Value),
}

impl From<Value> for ContentBlock {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ContentBlock::Plain(s),
            Value::Object(ref map) => match map.get("type").and_then(Value::as_str) {
                Some("text") => ContentBlock::Text(value),
                Some("tool_use") => ContentBlock::ToolUse(value),
                Some("tool_result") => ContentBlock::ToolResult(value),
                _ => ContentBlock::Unknown(value),
            },
            other => ContentBlock::Unknown(other),
        }
    }
}

impl From<ContentBlock> for Value {
    fn from(block: ContentBlock) -> Self {
        match block {
            ContentBlock::Plain(s) => Value::String(s),
            ContentBlock::Text(v)
            | ContentBlock::ToolUse(v)
            | ContentBlock::ToolResult(v)
            | ContentBlock::Unknown(v) => v,
        }
    }
}

impl ContentBlock {
    pub fn is_tool_use(&self) -> bool {
        matches!(self, ContentBlock::ToolUse(_))
    }

    /// Display text of the block; tool calls have none
    pub fn render(&self) -> Option<String> {
        match self {
            ContentBlock::Plain(s) => Some(s.clone()),
            ContentBlock::Text(v) => Some(v.get("text").and_then(Value::as_str).unwrap_or("").to_string()),
            ContentBlock::ToolUse(_) => None,
            ContentBlock::ToolResult(v) => Some(render_tool_result(v.get("content"))),
            ContentBlock::Unknown(v) => Some(v.to_string()),
        }
    }
}

/// Tool results carry either a string or a nested list of blocks
fn render_tool_result(content: Option<&Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .cloned()
            .map(ContentBlock::from)
            .filter_map(|b| b.render())
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Other(Value),
}

impl MessageContent {
    /// Newline-joined text of every block except tool calls
    pub fn render(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(ContentBlock::render)
                .collect::<Vec<_>>()
                .join("\n"),
            MessageContent::Other(Value::Null) => String::new(),
            MessageContent::Other(v) => v.to_string(),
        }
    }

    pub fn tool_calls(&self) -> Vec<Value> {
        match self {
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.is_tool_use())
                .cloned()
                .map(Value::from)
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default)]
    pub usage: Option<RawUsage>,
    #[serde(default)]
    pub cost: Option<f64>,
}

/// An assistant or user turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub message: Option<RawMessage>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub usage: Option<RawUsage>,
    #[serde(default)]
    pub cost: Option<f64>,
}

impl MessageEvent {
    /// Usage reported on the message, else on the event
    pub fn usage(&self) -> RawUsage {
        self.message
            .as_ref()
            .and_then(|m| m.usage)
            .or(self.usage)
            .unwrap_or_default()
    }

    /// Cost reported on the message, else on the event, else zero
    pub fn cost(&self) -> f64 {
        self.message
            .as_ref()
            .and_then(|m| m.cost)
            .or(self.cost)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Final accounting emitted when a run ends
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub subtype: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub is_error: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub duration_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_cost_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub num_turns: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawEvent {
    System(SystemEvent),
    Assistant(MessageEvent),
    User(MessageEvent),
    Result(ResultEvent),
    #[serde(other)]
    Other,
}

impl RawEvent {
    /// Events that do not decode are kept as `Other` so one bad line
    /// does not take the whole record down
    pub fn from_value_lenient(value: Value) -> Self {
        match serde_json::from_value(value) {
            Ok(event) => event,
            Err(e) => {
                warn!("Ignoring malformed trajectory event: {}", e);
                RawEvent::Other
            }
        }
    }
}

/// Event log of a record: inline, or the name of a file next to the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrajectorySource {
    Events(Vec<Value>),
    File(String),
}

/// One `{instance_id, model_patch, trajectory}` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub model_patch: Option<String>,
    #[serde(default)]
    pub trajectory: Option<TrajectorySource>,
}

impl RawRecord {
    pub fn file_reference(&self) -> Option<&str> {
        match &self.trajectory {
            Some(TrajectorySource::File(path)) => Some(path),
            _ => None,
        }
    }

    /// Attach a resolved event log
    pub fn with_events(self, events: Vec<Value>) -> TrialRecord {
        TrialRecord {
            instance_id: self.instance_id,
            model_patch: self.model_patch,
            events: events.into_iter().map(RawEvent::from_value_lenient).collect(),
        }
    }
}

/// A record whose event log is in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialRecord {
    pub instance_id: Option<String>,
    pub model_patch: Option<String>,
    pub events: Vec<RawEvent>,
}

impl TryFrom<RawRecord> for TrialRecord {
    type Error = BoardError;

    fn try_from(record: RawRecord) -> Result<Self> {
        match record.trajectory.clone() {
            Some(TrajectorySource::File(path)) => Err(BoardError::UnresolvedTrajectoryRef(path)),
            Some(TrajectorySource::Events(events)) => Ok(record.with_events(events)),
            None => Ok(record.with_events(Vec::new())),
        }
    }
}

/// A transcript file as read, before file references are followed
#[derive(Debug, Clone, PartialEq)]
pub enum RawTranscript {
    Normalized(TrajectoryDocument),
    Records(Vec<RawRecord>),
}

impl RawTranscript {
    /// Decide the shape once, at the ingestion boundary
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(ref map)
                if map.get("simulations").is_some_and(Value::is_array)
                    && map.get("tasks").is_some_and(Value::is_array) =>
            {
                Ok(RawTranscript::Normalized(TrajectoryDocument::from_normalized(value)))
            }
            Value::Array(_) => serde_json::from_value(value)
                .map(RawTranscript::Records)
                .map_err(|e| BoardError::UnrecognizedTranscript(e.to_string())),
            Value::Object(_) => Err(BoardError::UnrecognizedTranscript(
                "object without simulations and tasks arrays".to_string(),
            )),
            other => Err(BoardError::UnrecognizedTranscript(format!(
                "unexpected JSON {}",
                json_kind(&other)
            ))),
        }
    }

    /// Names of secondary files the records point at
    pub fn file_references(&self) -> Vec<&str> {
        match self {
            RawTranscript::Normalized(_) => Vec::new(),
            RawTranscript::Records(records) => {
                records.iter().filter_map(RawRecord::file_reference).collect()
            }
        }
    }

    /// Convert a transcript that has no file references
    pub fn into_inline(self) -> Result<Transcript> {
        match self {
            RawTranscript::Normalized(doc) => Ok(Transcript::Normalized(doc)),
            RawTranscript::Records(records) => records
                .into_iter()
                .map(TrialRecord::try_from)
                .collect::<Result<Vec<_>>>()
                .map(Transcript::Records),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A transcript ready for transformation
#[derive(Debug, Clone, PartialEq)]
pub enum Transcript {
    Normalized(TrajectoryDocument),
    Records(Vec<TrialRecord>),
}

/// Optional `*.summary.json` next to a transcript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    #[serde(default, deserialize_with = "null_default")]
    pub details: SummaryDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryDetails {
    /// Instances whose functional tests passed
    #[serde(default, deserialize_with = "null_default")]
    pub correct: Vec<String>,
    /// Instances that also passed the security tests
    #[serde(default, deserialize_with = "null_default")]
    pub correct_secure: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_block_variants() {
        let blocks: Vec<ContentBlock> = serde_json::from_value(json!([
            "plain",
            { "type": "text", "text": "hello" },
            { "type": "tool_use", "id": "t1", "name": "bash", "input": { "cmd": "ls" } },
            { "type": "tool_result", "tool_use_id": "t1", "content": "file.py" },
            { "type": "thinking", "thinking": "hmm" }
        ]))
        .unwrap();

        assert!(matches!(blocks[0], ContentBlock::Plain(_)));
        assert!(matches!(blocks[1], ContentBlock::Text(_)));
        assert!(blocks[2].is_tool_use());
        assert!(matches!(blocks[3], ContentBlock::ToolResult(_)));
        assert!(matches!(blocks[4], ContentBlock::Unknown(_)));

        assert_eq!(blocks[2].render(), None);
        assert_eq!(blocks[3].render().as_deref(), Some("file.py"));
        assert_eq!(
            blocks[4].render().as_deref(),
            Some(r#"{"thinking":"hmm","type":"thinking"}"#)
        );

        // round trip keeps the raw block
        assert_eq!(
            Value::from(blocks[2].clone())["input"]["cmd"],
            json!("ls")
        );
    }

    #[test]
    fn test_tool_result_with_nested_blocks() {
        let block = ContentBlock::from(json!({
            "type": "tool_result",
            "content": [ { "type": "text", "text": "line 1" }, { "type": "text", "text": "line 2" } ]
        }));
        assert_eq!(block.render().as_deref(), Some("line 1\nline 2"));

        let empty = ContentBlock::from(json!({ "type": "tool_result" }));
        assert_eq!(empty.render().as_deref(), Some(""));
    }

    #[test]
    fn test_message_content_render() {
        let content: MessageContent = serde_json::from_value(json!([
            { "type": "text", "text": "Let me look." },
            { "type": "tool_use", "id": "t1", "name": "read", "input": {} }
        ]))
        .unwrap();
        assert_eq!(content.render(), "Let me look.");
        assert_eq!(content.tool_calls().len(), 1);

        let text: MessageContent = serde_json::from_value(json!("just text")).unwrap();
        assert_eq!(text.render(), "just text");
        assert!(text.tool_calls().is_empty());
    }

    #[test]
    fn test_usage_naming_conventions() {
        let both = RawUsage {
            prompt_tokens: Some(10),
            completion_tokens: Some(3),
            input_tokens: Some(99),
            output_tokens: Some(98),
        };
        assert_eq!((both.prompt(), both.completion()), (10, 3));

        let anthropic: RawUsage =
            serde_json::from_value(json!({ "input_tokens": 7, "output_tokens": 2 })).unwrap();
        assert_eq!((anthropic.prompt(), anthropic.completion()), (7, 2));
        assert_eq!(RawUsage::default().prompt(), 0);
    }

    #[test]
    fn test_event_decoding() {
        let events: Vec<RawEvent> = [
            json!({ "type": "system", "subtype": "init", "model": "claude-sonnet-4" }),
            json!({ "type": "assistant", "message": { "role": "assistant", "content": "hi", "cost": 0.5 } }),
            json!({ "type": "result", "is_error": false, "duration_ms": 1500, "num_turns": 3 }),
            json!({ "type": "stream_event", "delta": "x" }),
            json!({ "no_type": true }),
        ]
        .into_iter()
        .map(RawEvent::from_value_lenient)
        .collect();

        assert!(matches!(&events[0], RawEvent::System(s) if s.model.as_deref() == Some("claude-sonnet-4")));
        assert!(matches!(&events[1], RawEvent::Assistant(m) if m.cost() == 0.5));
        assert!(matches!(&events[2], RawEvent::Result(r) if r.duration_ms == Some(1500.0)));
        assert_eq!(events[3], RawEvent::Other);
        assert_eq!(events[4], RawEvent::Other);

        let result = RawEvent::from_value_lenient(json!({
            "type": "result", "subtype": "max_turns", "is_error": null, "total_cost_usd": 2.5
        }));
        assert!(matches!(
            result,
            RawEvent::Result(ResultEvent { is_error: false, total_cost_usd: Some(c), .. }) if c == 2.5
        ));
    }

    #[test]
    fn test_summary_with_null_lists() {
        let summary: TrialSummary =
            serde_json::from_value(json!({ "details": { "correct": ["a"], "correct_secure": null } }))
                .unwrap();
        assert_eq!(summary.details.correct, vec!["a".to_string()]);
        assert!(summary.details.correct_secure.is_empty());
    }

    #[test]
    fn test_transcript_shape_detection() {
        let normalized = RawTranscript::from_value(json!({ "simulations": [], "tasks": [] })).unwrap();
        assert!(matches!(normalized, RawTranscript::Normalized(_)));

        let records = RawTranscript::from_value(json!([
            { "instance_id": "a", "trajectory": [] },
            { "instance_id": "b", "trajectory": "trajectories/b.json" },
            { "instance_id": "c" }
        ]))
        .unwrap();
        assert_eq!(records.file_references(), vec!["trajectories/b.json"]);
        assert!(matches!(
            records.clone().into_inline(),
            Err(BoardError::UnresolvedTrajectoryRef(_))
        ));

        assert!(RawTranscript::from_value(json!({ "simulations": [] })).is_err());
        assert!(RawTranscript::from_value(json!("nope")).is_err());
    }
}
