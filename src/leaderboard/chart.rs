//! Data behind the FuncPass@1 vs SecPass@1 scatter view.
//!
//! Drawing is left to the client; this only decides which points exist,
//! how they are styled and where the axes stop.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SubmissionFilter;
use crate::catalog::{AgentKey, SubmissionMetrics};

/// Marker shapes handed out to agent frameworks in first-seen order
pub const POINT_STYLES: [&str; 8] = [
    "circle", "triangle", "rect", "rectRot", "star", "cross", "crossRot", "dash",
];

pub const FALLBACK_COLOR: &str = "#9333ea";

/// Colors per LLM backbone shown on the chart
pub fn default_palette() -> BTreeMap<String, String> {
    [
        ("Claude-3.7-Sonnet", "#22c55e"),
        ("GPT-4.1", "#3b82f6"),
        ("o4-mini", "#a855f7"),
        ("GPT-4.1-mini", "#f97316"),
        ("Claude Opus 4.1", "#06b6d4"),
        ("GPT-5", "#ef4444"),
        ("Kimi-k2", "#e91e63"),
        ("o3", "#6366f1"),
        ("Claude Opus 4", "#ec4899"),
        ("Claude Sonnet 4", "#84cc16"),
        ("DeepSeek-V3-0324", "#dc2626"),
        ("Qwen3-235B-A22B", "#fbbf24"),
        ("Gemini-2.5-Flash", "#10b981"),
        ("Claude 4 Sonnet", "#0891b2"),
        ("Gemini 3 Pro", "#2563eb"),
    ]
    .into_iter()
    .map(|(model, color)| (model.to_string(), color.to_string()))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub label: String,
    pub agent_key: AgentKey,
    pub model_name: String,
    pub agent_framework: String,
    /// FuncPass@1
    pub x: f64,
    /// SecPass@1
    pub y: f64,
    pub color: String,
    pub point_style: String,
    pub radius: u32,
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub name: String,
    /// Color for backbones, point style for frameworks
    pub marker: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterChart {
    pub points: Vec<ScatterPoint>,
    pub models: Vec<LegendEntry>,
    pub frameworks: Vec<LegendEntry>,
    pub axes: AxisLimits,
}

/// Build the scatter data. Entries need both scores to be plotted.
pub fn scatter(
    metrics: &BTreeMap<AgentKey, SubmissionMetrics>,
    filter: &SubmissionFilter,
    palette: &BTreeMap<String, String>,
) -> ScatterChart {
    let mut points = Vec::new();
    let mut models: Vec<LegendEntry> = Vec::new();
    let mut frameworks: Vec<LegendEntry> = Vec::new();

    for m in metrics.values() {
        if !filter.accepts(m.submission_type) {
            continue;
        }
        let (Some(x), Some(y)) = (m.func_pass_1, m.sec_pass_1) else {
            continue;
        };

        let framework = m.agent_framework.clone().unwrap_or_else(|| "unknown".to_string());
        let point_style = match frameworks.iter().find(|f| f.name == framework) {
            Some(entry) => entry.marker.clone(),
            None => {
                let style = POINT_STYLES[frameworks.len() % POINT_STYLES.len()].to_string();
                frameworks.push(LegendEntry {
                    name: framework.clone(),
                    marker: style.clone(),
                });
                style
            }
        };

        let color = palette
            .get(&m.model_name)
            .cloned()
            .unwrap_or_else(|| FALLBACK_COLOR.to_string());
        if !models.iter().any(|e| e.name == m.model_name) {
            models.push(LegendEntry {
                name: m.model_name.clone(),
                marker: color.clone(),
            });
        }

        points.push(ScatterPoint {
            label: if m.is_new {
                format!("{} (new)", m.agent_key)
            } else {
                m.agent_key.to_string()
            },
            agent_key: m.agent_key.clone(),
            model_name: m.model_name.clone(),
            agent_framework: framework,
            x,
            y,
            color,
            point_style,
            radius: if m.is_new { 8 } else { 6 },
            is_new: m.is_new,
        });
    }

    let axes = axis_limits(&points);
    ScatterChart {
        points,
        models,
        frameworks,
        axes,
    }
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| !v.is_nan()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() {
        return (0.0, 100.0);
    }

    let range = max - min;
    let padding = if range > 0.0 { (range * 0.1).max(5.0) } else { 5.0 };
    let lo = (min - padding).max(0.0);
    let hi = (max + padding).min(100.0);
    ((lo / 5.0).floor() * 5.0, (hi / 5.0).ceil() * 5.0)
}

/// Axis bounds with at least 5 points of padding, clamped to 0..=100 and
/// snapped outward to multiples of 5
pub fn axis_limits(points: &[ScatterPoint]) -> AxisLimits {
    let (min_x, max_x) = padded_range(points.iter().map(|p| p.x));
    let (min_y, max_y) = padded_range(points.iter().map(|p| p.y));
    AxisLimits {
        min_x,
        max_x,
        min_y,
        max_y,
    }
}
