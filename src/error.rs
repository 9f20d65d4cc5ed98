//! Error taxonomy shared by the loaders, the transformer and the outer surfaces

use thiserror::Error;

use crate::source::SourceError;

/// Errors raised while loading or shaping dashboard data
#[derive(Debug, Error)]
pub enum BoardError {
    /// The submissions manifest could not be fetched or parsed
    #[error("submissions manifest unavailable: {0}")]
    ManifestUnavailable(#[source] SourceError),

    /// A single submission document failed; callers skip it
    #[error("submission '{dir}' unavailable: {source}")]
    SubmissionUnavailable {
        dir: String,
        #[source]
        source: SourceError,
    },

    /// A trajectory file that was probed successfully could not be fetched
    #[error("failed to load trajectory '{file}': {source}")]
    TrajectoryFetchFailed {
        file: String,
        #[source]
        source: SourceError,
    },

    /// The dataset file could not be fetched at all
    #[error("dataset unavailable: {0}")]
    DatasetUnavailable(#[source] SourceError),

    /// A transcript document is neither a normalized document nor a record list
    #[error("unrecognized transcript shape: {0}")]
    UnrecognizedTranscript(String),

    /// A record still points at a secondary file when transformation starts
    #[error("trajectory reference '{0}' was not resolved before transformation")]
    UnresolvedTrajectoryRef(String),

    #[error("invalid page request: page={page}, page_size={page_size}")]
    InvalidPage { page: usize, page_size: usize },

    #[error("{0} not found")]
    NotFound(String),
}

impl BoardError {
    /// Whether a user-facing surface should offer a retry action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BoardError::ManifestUnavailable(_)
                | BoardError::TrajectoryFetchFailed { .. }
                | BoardError::DatasetUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let manifest = BoardError::ManifestUnavailable(SourceError::NotFound("m.json".into()));
        assert!(manifest.is_retryable());

        let fetch = BoardError::TrajectoryFetchFailed {
            file: "a.trials.json".into(),
            source: SourceError::NotFound("a.trials.json".into()),
        };
        assert!(fetch.is_retryable());
        assert!(fetch.to_string().contains("a.trials.json"));

        assert!(!BoardError::NotFound("gpt-5::unknown".into()).is_retryable());
        assert!(!BoardError::InvalidPage { page: 0, page_size: 50 }.is_retryable());
    }
}
