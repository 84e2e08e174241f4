//! Time-boxed catalog snapshot for display reads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::RwLock;

use crate::catalog::{Catalog, SchemaError};
use crate::table_store::{TableStore, TableStoreError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] TableStoreError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

struct Snapshot {
    catalog: Arc<Catalog>,
    loaded_at: Instant,
}

pub struct CatalogCache {
    store: Arc<dyn TableStore>,
    ttl: Duration,
    slot: RwLock<Option<Snapshot>>,
}

impl CatalogCache {
    pub fn new(store: Arc<dyn TableStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    /// The cached catalog, reloading it when missing or older than the TTL.
    pub async fn catalog(&self) -> Result<Arc<Catalog>, LoadError> {
        {
            let slot = self.slot.read().await;
            if let Some(snapshot) = slot.as_ref() {
                if snapshot.loaded_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(&snapshot.catalog));
                }
            }
        }

        let mut slot = self.slot.write().await;
        // Another request may have reloaded while we waited for the lock.
        if let Some(snapshot) = slot.as_ref() {
            if snapshot.loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&snapshot.catalog));
            }
        }

        let raw = self.store.load().await?;
        let catalog = Arc::new(Catalog::from_raw(&raw)?);
        tracing::info!(rows = catalog.table.len(), "Loaded catalog");

        *slot = Some(Snapshot {
            catalog: Arc::clone(&catalog),
            loaded_at: Instant::now(),
        });
        Ok(catalog)
    }

    /// Drop the snapshot so the next read goes to the store.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        *slot = None;
        tracing::debug!("Catalog cache invalidated");
    }
}
