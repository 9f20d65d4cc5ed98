//! Fetches a transcript with its optional summary and secondary event files,
//! then hands everything to the transformer.

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::model::TrajectoryDocument;
use super::raw::{RawTranscript, TrajectorySource, Transcript, TrialSummary};
use super::resolver::trajectory_dir;
use super::transform::{transform, TransformContext};
use crate::dataset::DatasetIndex;
use crate::error::{BoardError, Result};
use crate::source::{fetch_json, join_path, DataSource};

const TRIALS_SUFFIX: &str = ".trials.json";
const SUMMARY_SUFFIX: &str = ".summary.json";

/// Summary filename paired with a transcript, if the transcript follows
/// the `*.trials.json` naming
pub fn summary_file_for(file: &str) -> Option<String> {
    file.strip_suffix(TRIALS_SUFFIX)
        .map(|base| format!("{}{}", base, SUMMARY_SUFFIX))
}

/// What to load and how to enrich it
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryRequest<'a> {
    pub submissions_dir: &'a str,
    pub submission_dir: &'a str,
    pub file: &'a str,
    pub domain: &'a str,
}

/// Load and normalize one transcript file.
///
/// Only the transcript itself is mandatory. A missing summary or a missing
/// secondary event file degrades to defaults with a warning.
pub async fn load_trajectory(
    source: &dyn DataSource,
    request: &TrajectoryRequest<'_>,
    dataset: Option<&DatasetIndex>,
) -> Result<TrajectoryDocument> {
    let dir = trajectory_dir(request.submissions_dir, request.submission_dir);
    let path = join_path(&[&dir, request.file]);

    let (raw, summary) = futures::join!(
        fetch_json::<Value>(source, &path),
        load_summary(source, &dir, request.file)
    );
    let raw = raw.map_err(|source| BoardError::TrajectoryFetchFailed {
        file: request.file.to_string(),
        source,
    })?;

    let transcript = resolve_references(source, &dir, RawTranscript::from_value(raw)?).await;
    let ctx = TransformContext {
        dataset,
        summary: summary.as_ref(),
        domain: request.domain,
    };
    let doc = transform(transcript, &ctx);

    info!(
        "Loaded {} with {} simulations over {} tasks",
        path,
        doc.simulations.len(),
        doc.tasks.len()
    );
    Ok(doc)
}

async fn load_summary(source: &dyn DataSource, dir: &str, file: &str) -> Option<TrialSummary> {
    let summary_file = summary_file_for(file)?;
    let path = join_path(&[dir, &summary_file]);
    match fetch_json::<TrialSummary>(source, &path).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!("Summary {} unavailable, correctness flags default to false: {}", path, e);
            None
        }
    }
}

/// Replace every file reference with the events it names. Fetches run
/// concurrently; a failed fetch leaves that record with no events.
pub async fn resolve_references(
    source: &dyn DataSource,
    dir: &str,
    raw: RawTranscript,
) -> Transcript {
    let records = match raw {
        RawTranscript::Normalized(doc) => return Transcript::Normalized(doc),
        RawTranscript::Records(records) => records,
    };

    let resolved = join_all(records.into_iter().map(|mut record| async move {
        match record.trajectory.take() {
            Some(TrajectorySource::File(file)) => {
                let path = join_path(&[dir, &file]);
                let events = match fetch_json::<Vec<Value>>(source, &path).await {
                    Ok(events) => {
                        debug!("Loaded {} events from {}", events.len(), path);
                        events
                    }
                    Err(e) => {
                        warn!("Failed to load trajectory file {}: {}", path, e);
                        Vec::new()
                    }
                };
                record.with_events(events)
            }
            Some(TrajectorySource::Events(events)) => record.with_events(events),
            None => record.with_events(Vec::new()),
        }
    }))
    .await;

    Transcript::Records(resolved)
}
