//! Leaderboard aggregation: filtering, sorting and ranking of per-agent scores

pub mod chart;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::catalog::{AgentKey, SubmissionMetrics, SubmissionType};

/// Which submission types are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFilter {
    pub include_standard: bool,
    pub include_custom: bool,
}

impl Default for SubmissionFilter {
    fn default() -> Self {
        Self {
            include_standard: true,
            include_custom: false,
        }
    }
}

impl SubmissionFilter {
    /// With both types switched off there is nothing to show and the caller
    /// should ask the user to pick one instead of drawing an empty table.
    pub fn is_empty(&self) -> bool {
        !self.include_standard && !self.include_custom
    }

    pub fn accepts(&self, submission_type: SubmissionType) -> bool {
        match submission_type {
            SubmissionType::Standard => self.include_standard,
            SubmissionType::Custom => self.include_custom,
        }
    }
}

/// Sortable leaderboard columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    #[serde(alias = "func_pass_1")]
    FuncPass1,
    #[serde(alias = "sec_pass_1")]
    SecPass1,
    #[serde(alias = "llm_backbone")]
    LlmBackbone,
    #[serde(alias = "agent_framework")]
    AgentFramework,
}

impl SortKey {
    pub fn is_numeric(&self) -> bool {
        matches!(self, SortKey::FuncPass1 | SortKey::SecPass1)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::FuncPass1 => write!(f, "funcpass1"),
            SortKey::SecPass1 => write!(f, "secpass1"),
            SortKey::LlmBackbone => write!(f, "llmbackbone"),
            SortKey::AgentFramework => write!(f, "agentframework"),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', '-', '@'], "").as_str() {
            "funcpass1" => Ok(SortKey::FuncPass1),
            "secpass1" => Ok(SortKey::SecPass1),
            "llmbackbone" | "model" => Ok(SortKey::LlmBackbone),
            "agentframework" | "framework" => Ok(SortKey::AgentFramework),
            other => Err(format!("unknown sort column '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub filter: SubmissionFilter,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl LeaderboardQuery {
    /// Clicking a column header: same column flips direction, a new column
    /// starts descending.
    pub fn sort_by(&mut self, column: SortKey) {
        if self.sort == column {
            self.direction = self.direction.toggled();
        } else {
            self.sort = column;
            self.direction = SortDirection::Desc;
        }
    }
}

/// Badge for the first three positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
}

impl Medal {
    pub fn for_rank(rank: u32) -> Option<Self> {
        match rank {
            1 => Some(Medal::Gold),
            2 => Some(Medal::Silver),
            3 => Some(Medal::Bronze),
            _ => None,
        }
    }
}

/// One rendered leaderboard line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// Position in the sorted list, starting at 1
    pub rank: u32,
    pub medal: Option<Medal>,
    pub agent_key: AgentKey,
    pub model_name: String,
    pub agent_framework: Option<String>,
    pub organization: Option<String>,
    pub func_pass_1: Option<f64>,
    pub sec_pass_1: Option<f64>,
    pub cost: Option<f64>,
    pub is_new: bool,
    pub is_verified: bool,
    pub submission_type: SubmissionType,
    /// First row of the default FuncPass@1 descending view
    pub top_performer: bool,
}

impl LeaderboardRow {
    fn from_metrics(metrics: &SubmissionMetrics) -> Self {
        Self {
            rank: 0,
            medal: None,
            agent_key: metrics.agent_key.clone(),
            model_name: metrics.model_name.clone(),
            agent_framework: metrics.agent_framework.clone(),
            organization: metrics.organization.clone(),
            func_pass_1: metrics.func_pass_1,
            sec_pass_1: metrics.sec_pass_1,
            cost: metrics.cost,
            is_new: metrics.is_new,
            is_verified: metrics.is_verified,
            submission_type: metrics.submission_type,
            top_performer: false,
        }
    }

    pub fn has_any_score(&self) -> bool {
        self.func_pass_1.is_some() || self.sec_pass_1.is_some()
    }

    fn score(&self, key: SortKey) -> Option<f64> {
        match key {
            SortKey::FuncPass1 => self.func_pass_1,
            SortKey::SecPass1 => self.sec_pass_1,
            _ => None,
        }
    }

    fn text(&self, key: SortKey) -> &str {
        match key {
            SortKey::LlmBackbone => &self.model_name,
            SortKey::AgentFramework => self.agent_framework.as_deref().unwrap_or(""),
            _ => "",
        }
    }
}

/// Rows without a value for a numeric column always go last
fn compare_scores(a: Option<f64>, b: Option<f64>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// Filter, sort and rank the catalog metrics.
///
/// Sorting is stable, so ties keep their input order, and every row gets a
/// distinct rank even when scores are equal.
pub fn build_leaderboard(
    metrics: &BTreeMap<AgentKey, SubmissionMetrics>,
    query: &LeaderboardQuery,
) -> Vec<LeaderboardRow> {
    if query.filter.is_empty() {
        return Vec::new();
    }

    let mut rows: Vec<LeaderboardRow> = metrics
        .values()
        .filter(|m| query.filter.accepts(m.submission_type))
        .map(LeaderboardRow::from_metrics)
        .collect();

    let sort = query.sort;
    let direction = query.direction;
    if sort.is_numeric() {
        rows.sort_by(|a, b| compare_scores(a.score(sort), b.score(sort), direction));
    } else {
        rows.sort_by(|a, b| {
            let ord = a.text(sort).cmp(b.text(sort));
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }

    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = (i + 1) as u32;
        row.medal = Medal::for_rank(row.rank);
    }

    if sort == SortKey::FuncPass1 && direction == SortDirection::Desc {
        if let Some(first) = rows.first_mut() {
            first.top_performer = first.has_any_score();
        }
    }

    rows
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{:.1}%", s))
}

/// Markdown table of the rows, used by the CLI
pub fn render_markdown(rows: &[LeaderboardRow]) -> String {
    let mut report = String::new();

    report.push_str("| Rank | LLM Backbone | Agent Framework | FuncPass@1 | SecPass@1 | Cost | Verified |\n");
    report.push_str("|------|--------------|-----------------|------------|-----------|------|----------|\n");

    for row in rows {
        report.push_str(&format!(
            "| {}{} | {} | {} | {} | {} | {} | {} |\n",
            row.rank,
            if row.is_new { " (new)" } else { "" },
            row.model_name,
            row.agent_framework.as_deref().unwrap_or("unknown"),
            format_score(row.func_pass_1),
            format_score(row.sec_pass_1),
            row.cost.map_or_else(|| "-".to_string(), |c| format!("${:.2}", c)),
            if row.is_verified { "yes" } else { "no" },
        ));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(
        model: &str,
        framework: Option<&str>,
        func: Option<f64>,
        sec: Option<f64>,
        submission_type: SubmissionType,
    ) -> SubmissionMetrics {
        SubmissionMetrics {
            agent_key: AgentKey::new(framework, model),
            model_name: model.to_string(),
            agent_framework: framework.map(str::to_string),
            organization: None,
            func_pass_1: func,
            sec_pass_1: sec,
            cost: None,
            is_new: false,
            is_verified: false,
            verification: None,
            submission_type,
        }
    }

    fn catalog(entries: Vec<SubmissionMetrics>) -> BTreeMap<AgentKey, SubmissionMetrics> {
        entries.into_iter().map(|m| (m.agent_key.clone(), m)).collect()
    }

    fn query(standard: bool, custom: bool, sort: SortKey, direction: SortDirection) -> LeaderboardQuery {
        LeaderboardQuery {
            filter: SubmissionFilter {
                include_standard: standard,
                include_custom: custom,
            },
            sort,
            direction,
        }
    }

    #[test]
    fn test_filter_exhaustiveness() {
        let data = catalog(vec![
            metrics("a", None, Some(1.0), None, SubmissionType::Standard),
            metrics("b", None, Some(2.0), None, SubmissionType::Custom),
            metrics("c", None, None, None, SubmissionType::Standard),
        ]);

        for (standard, custom) in [(true, true), (true, false), (false, true), (false, false)] {
            let rows = build_leaderboard(&data, &query(standard, custom, SortKey::FuncPass1, SortDirection::Desc));
            let expected = data
                .values()
                .filter(|m| match m.submission_type {
                    SubmissionType::Standard => standard,
                    SubmissionType::Custom => custom,
                })
                .count();
            assert_eq!(rows.len(), expected);
            assert!(rows.iter().all(|r| match r.submission_type {
                SubmissionType::Standard => standard,
                SubmissionType::Custom => custom,
            }));
        }

        let none = query(false, false, SortKey::FuncPass1, SortDirection::Desc);
        assert!(none.filter.is_empty());
        assert!(build_leaderboard(&data, &none).is_empty());
    }

    #[test]
    fn test_missing_scores_sort_last_in_both_directions() {
        let data = catalog(vec![
            metrics("a", None, None, None, SubmissionType::Standard),
            metrics("b", None, Some(80.0), None, SubmissionType::Standard),
            metrics("c", None, Some(60.0), None, SubmissionType::Standard),
        ]);

        let desc = build_leaderboard(&data, &query(true, false, SortKey::FuncPass1, SortDirection::Desc));
        let scores: Vec<Option<f64>> = desc.iter().map(|r| r.func_pass_1).collect();
        assert_eq!(scores, vec![Some(80.0), Some(60.0), None]);

        let asc = build_leaderboard(&data, &query(true, false, SortKey::FuncPass1, SortDirection::Asc));
        let scores: Vec<Option<f64>> = asc.iter().map(|r| r.func_pass_1).collect();
        assert_eq!(scores, vec![Some(60.0), Some(80.0), None]);
    }

    #[test]
    fn test_ties_get_distinct_ranks() {
        let data = catalog(vec![
            metrics("a", None, Some(50.0), None, SubmissionType::Standard),
            metrics("b", None, Some(50.0), None, SubmissionType::Standard),
            metrics("c", None, Some(50.0), None, SubmissionType::Standard),
            metrics("d", None, Some(10.0), None, SubmissionType::Standard),
        ]);

        let rows = build_leaderboard(&data, &LeaderboardQuery::default());
        let ranks: Vec<u32> = rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        // stable: ties keep catalog order
        let models: Vec<&str> = rows.iter().map(|r| r.model_name.as_str()).collect();
        assert_eq!(models, vec!["a", "b", "c", "d"]);
        assert_eq!(rows[0].medal, Some(Medal::Gold));
        assert_eq!(rows[2].medal, Some(Medal::Bronze));
        assert_eq!(rows[3].medal, None);
        assert!(rows[0].top_performer);
        assert!(!rows[1].top_performer);
    }

    #[test]
    fn test_text_columns_treat_missing_as_empty() {
        let data = catalog(vec![
            metrics("m1", Some("swe-agent"), None, None, SubmissionType::Standard),
            metrics("m2", None, None, None, SubmissionType::Standard),
            metrics("m3", Some("openhands"), None, None, SubmissionType::Standard),
        ]);

        let rows = build_leaderboard(&data, &query(true, false, SortKey::AgentFramework, SortDirection::Asc));
        let frameworks: Vec<Option<&str>> = rows.iter().map(|r| r.agent_framework.as_deref()).collect();
        assert_eq!(frameworks, vec![None, Some("openhands"), Some("swe-agent")]);

        let rows = build_leaderboard(&data, &query(true, false, SortKey::LlmBackbone, SortDirection::Desc));
        let models: Vec<&str> = rows.iter().map(|r| r.model_name.as_str()).collect();
        assert_eq!(models, vec!["m3", "m2", "m1"]);
    }

    #[test]
    fn test_column_click_toggles_direction() {
        let mut q = LeaderboardQuery::default();
        q.sort_by(SortKey::FuncPass1);
        assert_eq!(q.direction, SortDirection::Asc);
        q.sort_by(SortKey::SecPass1);
        assert_eq!(q.sort, SortKey::SecPass1);
        assert_eq!(q.direction, SortDirection::Desc);
    }

    #[test]
    fn test_parse_sort_key() {
        assert_eq!("funcPass1".parse::<SortKey>().unwrap(), SortKey::FuncPass1);
        assert_eq!("sec_pass_1".parse::<SortKey>().unwrap(), SortKey::SecPass1);
        assert_eq!("llmBackbone".parse::<SortKey>().unwrap(), SortKey::LlmBackbone);
        assert!("cost".parse::<SortKey>().is_err());
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
    }

    #[test]
    fn test_markdown_report() {
        let data = catalog(vec![metrics("gpt-5", Some("openhands"), Some(55.0), None, SubmissionType::Standard)]);
        let report = render_markdown(&build_leaderboard(&data, &LeaderboardQuery::default()));
        assert!(report.contains("| 1 | gpt-5 | openhands | 55.0% | - | - | no |"));
    }
}
