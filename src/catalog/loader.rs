//! Loads the submission catalog from the manifest

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use super::submission::{AgentKey, Submission, SubmissionMetrics, SubmissionRecord};
use crate::error::{BoardError, Result};
use crate::source::{fetch_json, join_path, DataSource};

/// `manifest.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub submissions: Vec<String>,
}

/// Where the catalog lives and how to read it
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub manifest_path: String,
    pub submissions_dir: String,
    /// Results key the leaderboard metrics are taken from
    pub language: String,
    /// Maximum number of submission documents in flight
    pub concurrency: usize,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            manifest_path: "submissions/manifest.json".to_string(),
            submissions_dir: "submissions".to_string(),
            language: "python".to_string(),
            concurrency: 8,
        }
    }
}

/// Every successfully loaded submission, keyed by [`AgentKey`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    /// Lightweight per-agent scores for the leaderboard
    pub metrics: BTreeMap<AgentKey, SubmissionMetrics>,
    /// Full documents for detail views and trajectory lookup
    pub submissions: BTreeMap<AgentKey, SubmissionRecord>,
    /// Manifest entries that could not be loaded
    pub failed: BTreeSet<String>,
}

impl Catalog {
    /// Build a catalog from documents in manifest order.
    ///
    /// Entries sharing an AgentKey overwrite each other; the last one wins.
    pub fn from_records(records: impl IntoIterator<Item = SubmissionRecord>, language: &str) -> Self {
        let mut catalog = Catalog::default();
        for record in records {
            catalog.insert(record, language);
        }
        catalog
    }

    fn insert(&mut self, record: SubmissionRecord, language: &str) {
        let key = record.submission.agent_key();
        let metrics = SubmissionMetrics::from_submission(&record.submission, language);
        if let Some(previous) = self.submissions.insert(key.clone(), record) {
            warn!(
                "Submission '{}' overwrites '{}' under agent key {}",
                self.submissions[&key].submission_dir, previous.submission_dir, key
            );
        }
        self.metrics.insert(key, metrics);
    }

    pub fn get(&self, key: &AgentKey) -> Option<&SubmissionRecord> {
        self.submissions.get(key)
    }

    pub fn find_by_dir(&self, submission_dir: &str) -> Option<&SubmissionRecord> {
        self.submissions
            .values()
            .find(|r| r.submission_dir == submission_dir)
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    /// Listing order for the trajectory browser: new entries first, then
    /// entries with trajectories, then by agent key.
    pub fn browse_order(&self) -> Vec<&SubmissionRecord> {
        let mut records: Vec<&SubmissionRecord> = self.submissions.values().collect();
        records.sort_by(|a, b| {
            b.submission
                .is_new
                .cmp(&a.submission.is_new)
                .then_with(|| {
                    b.submission
                        .trajectories_available
                        .cmp(&a.submission.trajectories_available)
                })
                .then_with(|| a.submission.agent_key().cmp(&b.submission.agent_key()))
        });
        records
    }
}

/// Fetch the manifest and every submission it lists.
///
/// A missing manifest fails the whole load. A single broken submission is
/// logged and skipped.
pub async fn load_catalog(source: &dyn DataSource, options: &CatalogOptions) -> Result<Catalog> {
    let manifest: Manifest = fetch_json(source, &options.manifest_path)
        .await
        .map_err(BoardError::ManifestUnavailable)?;

    info!(
        "Loading {} submissions from {}",
        manifest.submissions.len(),
        source.describe()
    );

    let submissions_dir = options.submissions_dir.as_str();
    let fetched: Vec<(String, Result<Submission>)> = stream::iter(manifest.submissions)
        .map(|dir| async move {
            let path = join_path(&[submissions_dir, &dir, "submission.json"]);
            let result = fetch_json::<Submission>(source, &path).await.map_err(|source| {
                BoardError::SubmissionUnavailable {
                    dir: dir.clone(),
                    source,
                }
            });
            (dir, result)
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    let mut catalog = Catalog::default();
    for (dir, result) in fetched {
        match result {
            Ok(submission) => {
                debug!("Loaded submission {}", dir);
                catalog.insert(
                    SubmissionRecord {
                        submission_dir: dir,
                        submission,
                    },
                    &options.language,
                );
            }
            Err(e) => {
                warn!("Skipping submission: {}", e);
                catalog.failed.insert(dir);
            }
        }
    }

    info!(
        "Catalog ready: {} submissions, {} skipped",
        catalog.len(),
        catalog.failed.len()
    );

    Ok(catalog)
}
