//! Shared state for the API server

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::catalog::{load_catalog, Catalog};
use crate::cli::BoardConfig;
use crate::dataset::{load_dataset, DatasetIndex};
use crate::error::Result;
use crate::source::DataSource;

#[derive(Debug)]
struct Published<T> {
    generation: u64,
    value: Arc<T>,
}

/// The most recently published result of a repeatable load.
///
/// Each load takes a ticket before it starts. A finished load only replaces
/// the published value when its ticket is newer, so a slow load that was
/// overtaken never clobbers a fresher result. Readers always get a complete
/// value.
#[derive(Debug)]
pub struct LatestSlot<T> {
    next_generation: AtomicU64,
    current: RwLock<Option<Published<T>>>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self {
            next_generation: AtomicU64::new(0),
            current: RwLock::new(None),
        }
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a generation for a load that is about to start
    pub fn ticket(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish a value loaded under `ticket`. Returns false if a newer
    /// value is already published.
    pub async fn publish(&self, ticket: u64, value: Arc<T>) -> bool {
        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|p| p.generation >= ticket) {
            return false;
        }
        *current = Some(Published {
            generation: ticket,
            value,
        });
        true
    }

    pub async fn get(&self) -> Option<Arc<T>> {
        self.current.read().await.as_ref().map(|p| p.value.clone())
    }

    /// Generation of the published value, 0 when nothing is published
    pub async fn generation(&self) -> u64 {
        self.current
            .read()
            .await
            .as_ref()
            .map_or(0, |p| p.generation)
    }
}

/// Counts reported after a refresh
#[derive(Debug, Clone, serde::Serialize)]
pub struct RefreshSummary {
    pub submissions: usize,
    pub failed_submissions: usize,
    /// None when the dataset could not be loaded
    pub dataset_instances: Option<usize>,
}

/// Application state shared across all handlers
pub struct AppState {
    pub source: Arc<dyn DataSource>,
    pub config: BoardConfig,
    pub catalog: LatestSlot<Catalog>,
    pub dataset: LatestSlot<DatasetIndex>,
}

impl AppState {
    pub fn new(config: BoardConfig, source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            config,
            catalog: LatestSlot::new(),
            dataset: LatestSlot::new(),
        }
    }

    /// Reload the catalog and publish it if no newer load finished first
    pub async fn refresh_catalog(&self) -> Result<Arc<Catalog>> {
        let ticket = self.catalog.ticket();
        let loaded = Arc::new(load_catalog(self.source.as_ref(), &self.config.catalog_options()).await?);

        if self.catalog.publish(ticket, loaded.clone()).await {
            return Ok(loaded);
        }
        debug!("Catalog load {} was overtaken by a newer one", ticket);
        Ok(self.catalog.get().await.unwrap_or(loaded))
    }

    pub async fn refresh_dataset(&self) -> Result<Arc<DatasetIndex>> {
        let ticket = self.dataset.ticket();
        let loaded = Arc::new(load_dataset(self.source.as_ref(), &self.config.dataset_path).await?);

        if self.dataset.publish(ticket, loaded.clone()).await {
            return Ok(loaded);
        }
        debug!("Dataset load {} was overtaken by a newer one", ticket);
        Ok(self.dataset.get().await.unwrap_or(loaded))
    }

    /// Reload everything. The catalog is mandatory, the dataset is not.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        let (catalog, dataset) = tokio::join!(self.refresh_catalog(), self.refresh_dataset());
        let catalog = catalog?;

        let dataset_instances = match dataset {
            Ok(index) => Some(index.len()),
            Err(e) => {
                warn!("Dataset unavailable, tasks will not be enriched: {}", e);
                None
            }
        };

        info!(
            "Refreshed {} submissions ({} failed)",
            catalog.len(),
            catalog.failed.len()
        );
        Ok(RefreshSummary {
            submissions: catalog.len(),
            failed_submissions: catalog.failed.len(),
            dataset_instances,
        })
    }

    /// Published catalog, loading it on first use
    pub async fn catalog(&self) -> Result<Arc<Catalog>> {
        match self.catalog.get().await {
            Some(catalog) => Ok(catalog),
            None => self.refresh_catalog().await,
        }
    }

    /// Published dataset, loading it on first use
    pub async fn dataset(&self) -> Result<Arc<DatasetIndex>> {
        match self.dataset.get().await {
            Some(dataset) => Ok(dataset),
            None => self.refresh_dataset().await,
        }
    }

    /// Dataset for enrichment only; failures degrade to no enrichment
    pub async fn dataset_for_enrichment(&self) -> Option<Arc<DatasetIndex>> {
        match self.dataset().await {
            Ok(dataset) => Some(dataset),
            Err(e) => {
                warn!("Continuing without dataset enrichment: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FsSource;

    #[tokio::test]
    async fn test_stale_load_does_not_overwrite() {
        let slot: LatestSlot<&str> = LatestSlot::new();
        let slow = slot.ticket();
        let fast = slot.ticket();

        assert!(slot.publish(fast, Arc::new("fresh")).await);
        assert!(!slot.publish(slow, Arc::new("stale")).await);
        assert_eq!(*slot.get().await.unwrap(), "fresh");
        assert_eq!(slot.generation().await, fast);
    }

    #[tokio::test]
    async fn test_empty_slot() {
        let slot: LatestSlot<u32> = LatestSlot::new();
        assert!(slot.get().await.is_none());
        assert_eq!(slot.generation().await, 0);
        let t = slot.ticket();
        assert!(slot.publish(t, Arc::new(7)).await);
        assert_eq!(*slot.get().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_refresh_without_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(BoardConfig::default(), Arc::new(FsSource::new(dir.path())));

        let err = state.refresh().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(state.catalog.get().await.is_none());
        assert!(state.dataset_for_enrichment().await.is_none());
    }
}
