//! Read-only access to the static site that hosts submissions, trajectories
//! and the dataset.
//!
//! Everything the dashboard reads goes through [`DataSource`], so the loaders
//! never care whether the files live on disk or behind a web server.

mod fs;
mod http;

pub use fs::FsSource;
pub use http::HttpSource;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Component, Path};
use thiserror::Error;

/// Errors from a single fetch or probe
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{path} returned status {status}")]
    Status { path: String, status: u16 },

    #[error("refusing to read '{0}' outside the data root")]
    Rejected(String),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// A read-only store of static files addressed by relative paths
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the full contents of a file
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, SourceError>;

    /// Cheap existence probe; must not download the file body
    async fn exists(&self, path: &str) -> bool;

    /// Human readable location, used in logs
    fn describe(&self) -> String;
}

/// Fetch a file and decode it as JSON
pub async fn fetch_json<T: DeserializeOwned>(
    source: &dyn DataSource,
    path: &str,
) -> Result<T, SourceError> {
    let bytes = source.fetch(path).await?;
    serde_json::from_slice(&bytes).map_err(|source| SourceError::Decode {
        path: path.to_string(),
        source,
    })
}

/// Fetch a file as UTF-8 text (lossy)
pub async fn fetch_text(source: &dyn DataSource, path: &str) -> Result<String, SourceError> {
    let bytes = source.fetch(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Strip leading slashes and refuse anything that could leave the data
/// root (`..`, absolute prefixes)
pub fn checked_relative(path: &str) -> Result<&str, SourceError> {
    let relative = path.trim_start_matches('/');
    let escapes = Path::new(relative)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || relative.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(SourceError::Rejected(path.to_string()));
    }
    Ok(relative)
}

/// Join path segments with `/`, ignoring empty segments
pub fn join_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
