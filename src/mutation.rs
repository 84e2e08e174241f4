//! Add, update and delete against the backing sheet.
//!
//! Each operation re-reads the sheet (bypassing the cache), applies one
//! positional change, writes the whole sheet back and invalidates the cache.
//! This narrows the stale-write window but is not a transaction: a writer in
//! another session between the read and the write is overwritten.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::cache::CatalogCache;
use crate::catalog::{
    thumbnail, ColumnMap, RawTable, Record, RecordInput, RowId, SchemaError, ValidationError,
};
use crate::table_store::{TableStore, TableStoreError};
use crate::upload::{ImageUploader, UploadError};

#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Store(#[from] TableStoreError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Row {0} not found")]
    RowNotFound(RowId),
}

/// A replacement thumbnail supplied with an update.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Bytes,
    pub filename: String,
    /// Overrides the configured default folder.
    pub folder_id: Option<String>,
}

pub struct MutationCoordinator {
    cache: Arc<CatalogCache>,
    default_folder_id: String,
    store: Arc<dyn TableStore>,
    uploader: Arc<dyn ImageUploader>,
}

impl MutationCoordinator {
    pub fn new(
        store: Arc<dyn TableStore>,
        uploader: Arc<dyn ImageUploader>,
        cache: Arc<CatalogCache>,
        default_folder_id: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            default_folder_id: default_folder_id.into(),
            store,
            uploader,
        }
    }

    /// Fresh read of the sheet with its resolved columns, ready for writing.
    async fn fetch(&self) -> Result<(RawTable, ColumnMap), MutationError> {
        let mut raw = self.store.load().await?;
        let mut columns = ColumnMap::resolve(&raw.headers)?;
        columns.ensure_optional_columns(&mut raw);
        Ok((raw, columns))
    }

    async fn commit(&self, raw: &RawTable) -> Result<(), MutationError> {
        self.store.replace(raw).await?;
        self.cache.invalidate().await;
        Ok(())
    }

    /// Append a record. An empty image URL is filled from the video URL when possible.
    pub async fn add(&self, input: RecordInput) -> Result<(RowId, Record), MutationError> {
        let mut record = input.validate(None)?;
        fill_thumbnail(&mut record);

        let (mut raw, columns) = self.fetch().await?;
        let mut cells = Vec::new();
        columns.write(&mut cells, &record);
        let row = raw.push_row(cells);

        self.commit(&raw).await?;
        tracing::info!(row = %row, performer = %record.performer, "Added record");
        Ok((row, record))
    }

    /// Overwrite the record at `row`. The row is checked before a supplied
    /// image is uploaded; the image URL then replaces the image column. If
    /// the upload fails nothing is written, and if the write fails the
    /// uploaded file is discarded.
    pub async fn update(
        &self,
        row: RowId,
        input: RecordInput,
        image: Option<ImageUpload>,
    ) -> Result<Record, MutationError> {
        input.validate(None)?;

        let (mut raw, columns) = self.fetch().await?;
        let existing = raw
            .row_mut(row)
            .map(|cells| columns.read(cells))
            .ok_or(MutationError::RowNotFound(row))?;
        let mut record = input.validate(Some(&existing.platform))?;

        let uploaded_url = match image {
            Some(image) => {
                let folder = image
                    .folder_id
                    .as_deref()
                    .filter(|f| !f.is_empty())
                    .unwrap_or(&self.default_folder_id);
                let url = self
                    .uploader
                    .upload(image.data, &image.filename, Some(folder))
                    .await?;
                tracing::info!(row = %row, filename = %image.filename, "Uploaded replacement thumbnail");
                Some(url)
            }
            None => None,
        };
        match &uploaded_url {
            Some(url) => record.image_url = url.clone(),
            None => fill_thumbnail(&mut record),
        }

        if let Some(cells) = raw.row_mut(row) {
            columns.write(cells, &record);
        }
        if let Err(e) = self.commit(&raw).await {
            if let Some(url) = &uploaded_url {
                // Best-effort cleanup of the file nothing refers to
                if let Err(cleanup) = self.uploader.discard(url).await {
                    tracing::warn!(url = %url, error = %cleanup, "Failed to discard uploaded thumbnail");
                }
            }
            return Err(e);
        }
        tracing::info!(row = %row, performer = %record.performer, "Updated record");
        Ok(record)
    }

    /// Remove the row at `row`, returning what it held.
    pub async fn delete(&self, row: RowId) -> Result<Record, MutationError> {
        let (mut raw, columns) = self.fetch().await?;
        let cells = raw.remove_row(row).ok_or(MutationError::RowNotFound(row))?;
        let removed = columns.read(&cells);

        self.commit(&raw).await?;
        tracing::info!(row = %row, performer = %removed.performer, "Deleted record");
        Ok(removed)
    }
}

fn fill_thumbnail(record: &mut Record) {
    if record.image_url.is_empty() {
        if let Some(url) = thumbnail::resolve(&record.video_url) {
            record.image_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::normalize;
    use crate::testutil::{record_input, test_state, FailingUploader, ReadOnlyStore};

    fn png_upload() -> ImageUpload {
        ImageUpload {
            data: Bytes::from_static(b"png"),
            filename: "thumb.png".to_string(),
            folder_id: None,
        }
    }

    fn upload_count(state: &crate::AppState) -> usize {
        let Some(uploads) = &state.local_uploads else {
            return 0;
        };
        std::fs::read_dir(uploads.base_path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_add_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (row, record) = state
            .mutations
            .add(record_input("Alice", "W", "https://youtu.be/dQw4w9WgXcQ", "fast spin"))
            .await
            .unwrap();
        assert_eq!(row, RowId::new(0));
        assert!(record.image_url.contains("dQw4w9WgXcQ"));

        let raw = state.catalog.store().load().await.unwrap();
        let table = normalize(&raw).unwrap();
        assert_eq!(table.rows().last().unwrap().record, record);
    }

    #[tokio::test]
    async fn test_null_like_text_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (row, added) = state
            .mutations
            .add(record_input("Nan", "W", "https://youtu.be/dQw4w9WgXcQ", "NONE"))
            .await
            .unwrap();

        let table = normalize(&state.catalog.store().load().await.unwrap()).unwrap();
        let back = table.get(row).unwrap();
        assert_eq!(back, &added);
        assert_eq!(back.performer, "Nan");
        assert_eq!(back.memo, "NONE");
    }

    #[tokio::test]
    async fn test_add_validation_happens_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let err = state
            .mutations
            .add(record_input("", "W", "https://youtu.be/dQw4w9WgXcQ", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::Validation(ValidationError::MissingPerformer)));
        assert!(state.catalog.store().load().await.unwrap().rows.is_empty());
    }

    #[tokio::test]
    async fn test_add_invalidates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        assert!(state.catalog.catalog().await.unwrap().table.is_empty());
        state
            .mutations
            .add(record_input("Alice", "W", "https://youtu.be/dQw4w9WgXcQ", ""))
            .await
            .unwrap();
        assert_eq!(state.catalog.catalog().await.unwrap().table.len(), 1);
    }

    #[tokio::test]
    async fn test_update_with_image_upload() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let (row, _) = state
            .mutations
            .add(record_input("Alice", "W", "https://youtu.be/dQw4w9WgXcQ", ""))
            .await
            .unwrap();

        let updated = state
            .mutations
            .update(
                row,
                record_input("Alice B", "T", "https://youtu.be/dQw4w9WgXcQ", "new memo"),
                Some(png_upload()),
            )
            .await
            .unwrap();
        assert!(updated.image_url.starts_with("http://localhost:8080/uploads/"));
        assert!(updated.image_url.ends_with("-thumb.png"));

        let catalog = state.catalog.catalog().await.unwrap();
        assert_eq!(catalog.table.get(row).unwrap(), &updated);
    }

    #[tokio::test]
    async fn test_failed_upload_aborts_update() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let (row, original) = state
            .mutations
            .add(record_input("Alice", "W", "https://youtu.be/dQw4w9WgXcQ", ""))
            .await
            .unwrap();

        let coordinator = MutationCoordinator::new(
            Arc::clone(state.catalog.store()),
            Arc::new(FailingUploader),
            Arc::clone(&state.catalog),
            "folder",
        );
        let err = coordinator
            .update(
                row,
                record_input("Changed", "T", "https://youtu.be/dQw4w9WgXcQ", ""),
                Some(png_upload()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::Upload(UploadError::QuotaExceeded(_))));

        let raw = state.catalog.store().load().await.unwrap();
        assert_eq!(normalize(&raw).unwrap().get(row).unwrap(), &original);
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let err = state
            .mutations
            .update(
                RowId::new(7),
                record_input("Alice", "W", "https://youtu.be/dQw4w9WgXcQ", ""),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::RowNotFound(r) if r == RowId::new(7)));
    }

    #[tokio::test]
    async fn test_update_missing_row_skips_upload() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let err = state
            .mutations
            .update(
                RowId::new(3),
                record_input("Alice", "W", "https://youtu.be/dQw4w9WgXcQ", ""),
                Some(png_upload()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::RowNotFound(r) if r == RowId::new(3)));
        assert_eq!(upload_count(&state), 0);

        // An uploader that always fails is never reached either.
        let coordinator = MutationCoordinator::new(
            Arc::clone(state.catalog.store()),
            Arc::new(FailingUploader),
            Arc::clone(&state.catalog),
            "",
        );
        let err = coordinator
            .update(
                RowId::new(3),
                record_input("Alice", "W", "https://youtu.be/dQw4w9WgXcQ", ""),
                Some(png_upload()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::RowNotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_write_discards_uploaded_image() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let (row, _) = state
            .mutations
            .add(record_input("Alice", "W", "https://youtu.be/dQw4w9WgXcQ", ""))
            .await
            .unwrap();

        let uploader = state.local_uploads.clone().unwrap();
        let coordinator = MutationCoordinator::new(
            Arc::new(ReadOnlyStore(Arc::clone(state.catalog.store()))),
            uploader,
            Arc::clone(&state.catalog),
            "",
        );
        let err = coordinator
            .update(
                row,
                record_input("Alice", "T", "https://youtu.be/dQw4w9WgXcQ", ""),
                Some(png_upload()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::Store(TableStoreError::Write(_))));
        assert_eq!(upload_count(&state), 0);
    }

    #[tokio::test]
    async fn test_delete_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        for (performer, id) in [("Alice", "aaaaaaaaaaa"), ("Bob", "bbbbbbbbbbb"), ("Carol", "ccccccccccc")] {
            state
                .mutations
                .add(record_input(performer, "W", &format!("https://youtu.be/{id}"), ""))
                .await
                .unwrap();
        }

        let removed = state.mutations.delete(RowId::new(1)).await.unwrap();
        assert_eq!(removed.performer, "Bob");

        let table = normalize(&state.catalog.store().load().await.unwrap()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table
            .records()
            .all(|r| !(r.performer == removed.performer && r.video_url == removed.video_url)));
        // Positions shift after a delete.
        assert_eq!(table.get(RowId::new(1)).unwrap().performer, "Carol");
    }

    #[tokio::test]
    async fn test_mutation_sees_writes_made_behind_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state
            .mutations
            .add(record_input("Alice", "W", "https://youtu.be/aaaaaaaaaaa", ""))
            .await
            .unwrap();
        // Warm the cache, then change the sheet from "another session".
        state.catalog.catalog().await.unwrap();
        let store = state.catalog.store();
        let mut raw = store.load().await.unwrap();
        raw.rows.push(vec![
            "Bob".to_string(),
            "T".to_string(),
            String::new(),
            "https://youtu.be/bbbbbbbbbbb".to_string(),
        ]);
        store.replace(&raw).await.unwrap();

        state
            .mutations
            .add(record_input("Carol", "F", "https://youtu.be/ccccccccccc", ""))
            .await
            .unwrap();

        let table = normalize(&store.load().await.unwrap()).unwrap();
        let names: Vec<&str> = table.records().map(|r| r.performer.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob", "Carol"]);
    }
}
