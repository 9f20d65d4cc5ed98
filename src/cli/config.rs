use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::CatalogOptions;
use crate::leaderboard::chart::default_palette;
use crate::source::{DataSource, FsSource, HttpSource};
use crate::trajectory::PatternTable;

/// Configuration for the dashboard backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Where the static site lives
    #[serde(default)]
    pub source: SourceConfig,

    /// Path of the submissions manifest, relative to the source
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    /// Directory holding one folder per submission
    #[serde(default = "default_submissions_dir")]
    pub submissions_dir: String,

    /// Newline-delimited dataset file
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    /// Results key used for leaderboard scores
    #[serde(default = "default_language")]
    pub language: String,

    /// Trajectory domains to probe for
    #[serde(default = "default_domains")]
    pub domains: Vec<String>,

    /// Submission documents fetched at once
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Messages per page in the trajectory viewer
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Candidate transcript filenames per model
    #[serde(default)]
    pub patterns: PatternTable,

    /// Chart color per LLM backbone
    #[serde(default = "default_palette")]
    pub model_colors: BTreeMap<String, String>,
}

/// Static site location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A local checkout of the site
    Fs { root: PathBuf },
    /// A deployed copy of the site
    Http { base_url: String },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Fs {
            root: PathBuf::from("./public"),
        }
    }
}

impl SourceConfig {
    pub fn into_source(self) -> Arc<dyn DataSource> {
        match self {
            SourceConfig::Fs { root } => Arc::new(FsSource::new(root)),
            SourceConfig::Http { base_url } => Arc::new(HttpSource::new(&base_url)),
        }
    }
}

fn default_manifest_path() -> String {
    "submissions/manifest.json".to_string()
}

fn default_submissions_dir() -> String {
    "submissions".to_string()
}

fn default_dataset_path() -> String {
    "datasets/susvibes_dataset.jsonl".to_string()
}

fn default_language() -> String {
    "python".to_string()
}

fn default_domains() -> Vec<String> {
    vec!["Python".to_string()]
}

fn default_fetch_concurrency() -> usize {
    8
}

fn default_page_size() -> usize {
    50
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            manifest_path: default_manifest_path(),
            submissions_dir: default_submissions_dir(),
            dataset_path: default_dataset_path(),
            language: default_language(),
            domains: default_domains(),
            fetch_concurrency: default_fetch_concurrency(),
            page_size: default_page_size(),
            patterns: PatternTable::default(),
            model_colors: default_palette(),
        }
    }
}

impl BoardConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: BoardConfig =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .context(format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_concurrency == 0 {
            anyhow::bail!("fetch_concurrency must be at least 1");
        }
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        if self.domains.is_empty() {
            anyhow::bail!("at least one trajectory domain is required");
        }
        Ok(())
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            manifest_path: self.manifest_path.clone(),
            submissions_dir: self.submissions_dir.clone(),
            language: self.language.clone(),
            concurrency: self.fetch_concurrency,
        }
    }

    /// The domain tasks are filed under when nothing more specific is known
    pub fn default_domain(&self) -> &str {
        self.domains.first().map(String::as_str).unwrap_or("Python")
    }

    /// Generate a sample configuration
    pub fn sample() -> Self {
        Self {
            source: SourceConfig::Http {
                base_url: "https://susvibes.example.org/".to_string(),
            },
            ..Default::default()
        }
    }
}
