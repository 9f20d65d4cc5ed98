//! Display-ready shapes for the trajectory viewer: formatted messages,
//! pagination and small text helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BoardError, Result};
use crate::trajectory::transform::parse_timestamp;
use crate::trajectory::{Message, Simulation};

pub const DEFAULT_PAGE_SIZE: usize = 50;

const NOT_AVAILABLE: &str = "not available";

/// A message as the viewer shows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
    pub turn: Option<usize>,
    pub timestamp: String,
    pub cost: f64,
    /// `"<prompt>/<completion>"`
    pub tokens: String,
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS` UTC when it parses
pub fn format_timestamp(raw: Option<&str>) -> String {
    match raw {
        None => "N/A".to_string(),
        Some(raw) => parse_timestamp(raw)
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| raw.to_string()),
    }
}

pub fn format_message(message: &Message) -> FormattedMessage {
    FormattedMessage {
        role: message.role.clone(),
        content: message.content.clone().unwrap_or_default(),
        tool_calls: message.tool_calls.clone(),
        turn: message.turn_idx,
        timestamp: format_timestamp(message.timestamp.as_deref()),
        cost: message.cost.unwrap_or(0.0),
        tokens: message
            .usage
            .map(|u| format!("{}/{}", u.prompt_tokens, u.completion_tokens))
            .unwrap_or_else(|| "N/A".to_string()),
    }
}

/// One page of a longer list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Slice `items` for a 1-based page. Pages past the end are empty.
pub fn page_of<T: Clone>(items: &[T], page: usize, page_size: usize) -> Result<Page<T>> {
    if page == 0 || page_size == 0 {
        return Err(BoardError::InvalidPage { page, page_size });
    }

    let total = items.len();
    let start = (page - 1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);

    Ok(Page {
        items: items[start..end].to_vec(),
        total,
        total_pages: total.div_ceil(page_size),
        page,
        page_size,
    })
}

/// Formatted messages of a simulation, one page at a time
pub fn paginate(
    simulation: &Simulation,
    page: usize,
    page_size: usize,
) -> Result<Page<FormattedMessage>> {
    let formatted: Vec<FormattedMessage> = simulation.messages.iter().map(format_message).collect();
    page_of(&formatted, page, page_size)
}

/// Page cursor owned by whoever shows the messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Changing the page size always goes back to the first page
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn apply(&self, simulation: &Simulation) -> Result<Page<FormattedMessage>> {
        paginate(simulation, self.page, self.page_size)
    }
}

/// Short readable label for a task id
pub fn clean_task_id(task_id: &str) -> String {
    if task_id.is_empty() {
        return "Unknown".to_string();
    }
    if task_id.chars().all(|c| c.is_ascii_digit()) || task_id.chars().count() < 10 {
        return task_id.to_string();
    }

    if let Some(inner) = bracketed(task_id) {
        return title_case(&inner.replace('_', " "));
    }

    let head = task_id.split('_').next().unwrap_or(task_id);
    let mut chars = head.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Contents of the first non-empty `[...]` group
fn bracketed(s: &str) -> Option<&str> {
    let mut rest = s;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let close = after.find(']')?;
        if close > 0 {
            return Some(&after[..close]);
        }
        rest = &after[close + 1..];
    }
    None
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && !in_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        in_word = is_word;
    }
    out
}

/// Missing task fields read "not available"
pub fn display_or_na(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Comma-separated list, or "not available" when empty
pub fn display_list_or_na(values: Option<&[String]>) -> String {
    match values {
        Some(v) if !v.is_empty() => v.join(", "),
        _ => NOT_AVAILABLE.to_string(),
    }
}
