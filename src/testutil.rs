//! Shared test helpers for dance-library unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::catalog::{RawTable, RecordInput};
use crate::config::{Config, TableConfig, UploadConfig};
use crate::table_store::{LocalTableStore, TableStore, TableStoreError};
use crate::upload::{ImageUploader, LocalUploader, UploadError};
use crate::AppState;

/// Create a test AppState over a temporary redb table and local upload directory.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let uploads_dir = temp_dir.path().join("uploads");

    let config = Config {
        bind_address: "127.0.0.1:0".to_string(),
        table: TableConfig {
            data_dir: data_dir.to_string_lossy().to_string(),
            ..Default::default()
        },
        upload: UploadConfig {
            local_upload_path: uploads_dir.to_string_lossy().to_string(),
            ..Default::default()
        },
        google_credentials_file: None,
        cache_ttl_seconds: 600,
        edit_mode: true,
        max_upload_size: 1024 * 1024, // 1MB for tests
    };

    let store = LocalTableStore::open(&data_dir).expect("Failed to open test table");
    let uploader = Arc::new(
        LocalUploader::new(&uploads_dir, &config.upload.public_base_url)
            .expect("Failed to create test upload directory"),
    );

    Arc::new(AppState::new(
        config,
        Arc::new(store),
        uploader.clone(),
        Some(uploader),
    ))
}

pub fn record_input(performer: &str, category: &str, video_url: &str, memo: &str) -> RecordInput {
    RecordInput {
        performer: performer.to_string(),
        category: category.to_string(),
        video_url: video_url.to_string(),
        memo: memo.to_string(),
        ..Default::default()
    }
}

/// Always fails as if the destination drive were full.
pub struct FailingUploader;

#[async_trait]
impl ImageUploader for FailingUploader {
    async fn upload(
        &self,
        _data: Bytes,
        _filename: &str,
        _folder_id: Option<&str>,
    ) -> Result<String, UploadError> {
        Err(UploadError::QuotaExceeded("storageQuotaExceeded".to_string()))
    }
}

/// Reads through to the wrapped store but refuses every write.
pub struct ReadOnlyStore(pub Arc<dyn TableStore>);

#[async_trait]
impl TableStore for ReadOnlyStore {
    async fn load(&self) -> Result<RawTable, TableStoreError> {
        self.0.load().await
    }

    async fn replace(&self, _table: &RawTable) -> Result<(), TableStoreError> {
        Err(TableStoreError::Write("sheet is read-only".to_string()))
    }
}
