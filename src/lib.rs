//! dance-library - A searchable catalog of dance videos kept in a spreadsheet
//!
//! This crate serves a card-grid catalog over HTTP with:
//! - A spreadsheet as the system of record (Google Sheets, or redb for local use)
//! - Schema normalization tolerant of English and Japanese headers
//! - Keyword, performer and category filtering with suggestion lists
//! - Latest / by-category / by-performer views with an alphabet index
//! - Add, update (with thumbnail upload) and delete of catalog rows

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod google_auth;
pub mod mutation;
pub mod table_store;
#[cfg(test)]
pub mod testutil;
pub mod upload;

use std::sync::Arc;
use std::time::Duration;

use cache::CatalogCache;
use catalog::{KakasiTransliterator, Transliterator};
use config::Config;
use mutation::MutationCoordinator;
use table_store::TableStore;
use upload::{ImageUploader, LocalUploader};

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<CatalogCache>,
    pub mutations: MutationCoordinator,
    pub transliterator: Arc<dyn Transliterator>,
    /// Set when uploads are stored locally and served by this process.
    pub local_uploads: Option<Arc<LocalUploader>>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn TableStore>,
        uploader: Arc<dyn ImageUploader>,
        local_uploads: Option<Arc<LocalUploader>>,
    ) -> Self {
        let catalog = Arc::new(CatalogCache::new(
            Arc::clone(&store),
            Duration::from_secs(config.cache_ttl_seconds),
        ));
        let mutations = MutationCoordinator::new(
            store,
            uploader,
            Arc::clone(&catalog),
            config.upload.folder_id.clone(),
        );

        Self {
            config,
            catalog,
            mutations,
            transliterator: Arc::new(KakasiTransliterator),
            local_uploads,
        }
    }
}
