//! Benchmark task definitions loaded from the newline-delimited dataset file

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::de::null_default;
use crate::error::{BoardError, Result};
use crate::source::{fetch_text, DataSource};
use crate::trajectory::{Instructions, Task, TaskDescription, UserScenario};

/// Expected number of failing tests before the fix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedFailures {
    #[serde(default, deserialize_with = "null_default")]
    pub func: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub sec: u32,
}

/// One line of the dataset file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetInstance {
    pub instance_id: String,
    #[serde(default)]
    pub image_name: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub cwe_ids: Vec<String>,
    #[serde(default)]
    pub cve_id: Option<String>,
    #[serde(default)]
    pub info_page: Option<String>,
    #[serde(default)]
    pub problem_statement: Option<String>,
    #[serde(default)]
    pub security_patch: Option<String>,
    #[serde(default)]
    pub task_patch: Option<String>,
    #[serde(default)]
    pub golden_patch: Option<String>,
    #[serde(default)]
    pub test_patch: Option<String>,
    #[serde(default)]
    pub expected_failures: Option<ExpectedFailures>,
}

impl DatasetInstance {
    pub fn description(&self) -> TaskDescription {
        TaskDescription {
            instance_id: self.instance_id.clone(),
            image_name: self.image_name.clone(),
            project: self.project.clone(),
            cwe_ids: Some(self.cwe_ids.clone()),
            cve_id: self.cve_id.clone(),
            info_page: self.info_page.clone(),
            problem_statement: self.problem_statement.clone(),
        }
    }
}

/// Lookup table from instance id to its definition.
///
/// Duplicate ids keep their first position but the later definition.
#[derive(Debug, Clone, Default)]
pub struct DatasetIndex {
    instances: HashMap<String, DatasetInstance>,
    order: Vec<String>,
}

impl DatasetIndex {
    /// Parse JSONL text. Blank lines are ignored, unparseable lines are
    /// logged and skipped.
    pub fn parse(text: &str) -> Self {
        let mut index = DatasetIndex::default();
        let mut skipped = 0usize;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<DatasetInstance>(line) {
                Ok(instance) if instance.instance_id.is_empty() => {
                    debug!("Dataset line {} has an empty instance_id", line_no + 1);
                    skipped += 1;
                }
                Ok(instance) => index.insert(instance),
                Err(e) => {
                    warn!("Failed to parse dataset line {}: {}", line_no + 1, e);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!("Skipped {} dataset lines", skipped);
        }
        index
    }

    fn insert(&mut self, instance: DatasetInstance) {
        let id = instance.instance_id.clone();
        if self.instances.insert(id.clone(), instance).is_some() {
            debug!("Duplicate dataset instance {}, keeping the later one", id);
        } else {
            self.order.push(id);
        }
    }

    pub fn get(&self, instance_id: &str) -> Option<&DatasetInstance> {
        self.instances.get(instance_id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances in file order
    pub fn iter(&self) -> impl Iterator<Item = &DatasetInstance> {
        self.order.iter().filter_map(|id| self.instances.get(id))
    }

    /// Task definitions for the task browser, in file order
    pub fn tasks(&self, default_domain: &str) -> Vec<Task> {
        self.iter()
            .map(|instance| Task {
                id: instance.instance_id.clone(),
                description: Some(instance.description()),
                user_scenario: Some(UserScenario {
                    instructions: Instructions {
                        domain: instance
                            .language
                            .clone()
                            .unwrap_or_else(|| default_domain.to_string()),
                        reason_for_call: Some("Code generation task".to_string()),
                        known_info: Some(format!(
                            "Project: {}",
                            instance.project.as_deref().unwrap_or("N/A")
                        )),
                    },
                }),
                extra: Default::default(),
            })
            .collect()
    }
}

/// Fetch and index the dataset file
pub async fn load_dataset(source: &dyn DataSource, path: &str) -> Result<DatasetIndex> {
    let text = fetch_text(source, path)
        .await
        .map_err(BoardError::DatasetUnavailable)?;
    let index = DatasetIndex::parse(&text);
    info!("Indexed {} dataset instances from {}", index.len(), path);
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{"instance_id": "proj__a-1", "project": "proj", "cwe_ids": ["CWE-79"], "cve_id": "CVE-2024-1", "problem_statement": "Add a thing", "expected_failures": {"func": 3, "sec": 1}}
not json at all

{"instance_id": "proj__b-2", "language": "JavaScript"}
{"project": "missing-id"}
{"instance_id": "proj__a-1", "project": "proj-v2"}
"#;

    #[test]
    fn test_parse_skips_bad_lines() {
        let index = DatasetIndex::parse(DATASET);
        assert_eq!(index.len(), 2);

        let b = index.get("proj__b-2").unwrap();
        assert!(b.cwe_ids.is_empty());
        assert_eq!(b.cve_id, None);
        assert_eq!(b.problem_statement, None);
    }

    #[test]
    fn test_duplicates_last_write_wins() {
        let index = DatasetIndex::parse(DATASET);
        let a = index.get("proj__a-1").unwrap();
        assert_eq!(a.project.as_deref(), Some("proj-v2"));
        // order keeps first sighting
        let ids: Vec<&str> = index.iter().map(|i| i.instance_id.as_str()).collect();
        assert_eq!(ids, vec!["proj__a-1", "proj__b-2"]);
    }

    #[test]
    fn test_expected_failures() {
        let index = DatasetIndex::parse(DATASET.lines().next().unwrap());
        let a = index.get("proj__a-1").unwrap();
        assert_eq!(a.expected_failures, Some(ExpectedFailures { func: 3, sec: 1 }));
        assert_eq!(a.cwe_ids, vec!["CWE-79".to_string()]);
    }

    #[test]
    fn test_null_fields_default() {
        let index = DatasetIndex::parse(concat!(
            r#"{"instance_id": "a", "project": "p", "cwe_ids": null, "cve_id": null}"#,
            "\n",
            r#"{"instance_id": "b", "expected_failures": {"func": null, "sec": 2}}"#,
        ));
        assert_eq!(index.len(), 2);

        let a = index.get("a").unwrap();
        assert_eq!(a.project.as_deref(), Some("p"));
        assert!(a.cwe_ids.is_empty());
        assert_eq!(a.cve_id, None);

        let b = index.get("b").unwrap();
        assert_eq!(b.expected_failures, Some(ExpectedFailures { func: 0, sec: 2 }));
    }

    #[test]
    fn test_tasks_view() {
        let index = DatasetIndex::parse(DATASET);
        let tasks = index.tasks("Python");
        assert_eq!(tasks.len(), 2);
        let a = &tasks[0].user_scenario.as_ref().unwrap().instructions;
        assert_eq!(a.domain, "Python");
        assert_eq!(a.known_info.as_deref(), Some("Project: proj-v2"));
        let b = &tasks[1].user_scenario.as_ref().unwrap().instructions;
        assert_eq!(b.domain, "JavaScript");
        assert_eq!(b.known_info.as_deref(), Some("Project: N/A"));
    }

    #[tokio::test]
    async fn test_load_dataset_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = crate::source::FsSource::new(dir.path());
        let err = load_dataset(&source, "datasets/none.jsonl").await.unwrap_err();
        assert!(matches!(err, BoardError::DatasetUnavailable(_)));
    }
}
