use async_trait::async_trait;
use redb::{Database as RedbDatabase, ReadableTable};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;
use super::{TableStore, TableStoreError};
use crate::catalog::RawTable;

/// Headers written into a fresh local sheet.
pub const DEFAULT_HEADERS: [&str; 6] = [
    "performer",
    "category",
    "image_url",
    "video_url",
    "memo",
    "platform",
];

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for DatabaseError {
    fn from(e: redb::Error) -> Self {
        DatabaseError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

/// A sheet kept in an embedded redb file, for development and tests.
/// `replace` runs in a single write transaction.
#[derive(Clone)]
pub struct LocalTableStore {
    db: Arc<RedbDatabase>,
}

impl LocalTableStore {
    /// Open or create the sheet under `data_dir`. A new sheet gets [`DEFAULT_HEADERS`].
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("dance-library.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        let write_txn = db.begin_write()?;
        {
            let mut meta = write_txn.open_table(SHEET_META)?;
            let _ = write_txn.open_table(SHEET_ROWS)?;
            if meta.get(HEADERS_KEY)?.is_none() {
                let headers: Vec<String> = DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect();
                let data = rmp_serde::to_vec_named(&headers)?;
                meta.insert(HEADERS_KEY, data.as_slice())?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn read_all(&self) -> Result<RawTable, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let meta = read_txn.open_table(SHEET_META)?;
        let headers: Vec<String> = match meta.get(HEADERS_KEY)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => Vec::new(),
        };

        let table = read_txn.open_table(SHEET_ROWS)?;
        let mut rows = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let cells: Vec<String> = rmp_serde::from_slice(value.value())?;
            rows.push(cells);
        }

        Ok(RawTable::new(headers, rows))
    }

    pub fn write_all(&self, sheet: &RawTable) -> Result<(), DatabaseError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut meta = write_txn.open_table(SHEET_META)?;
            let data = rmp_serde::to_vec_named(&sheet.headers)?;
            meta.insert(HEADERS_KEY, data.as_slice())?;

            let table = write_txn.open_table(SHEET_ROWS)?;
            let keys: Vec<u64> = table
                .iter()?
                .map(|r| r.map(|(k, _)| k.value()))
                .collect::<Result<Vec<_>, _>>()?;
            drop(table);

            let mut table = write_txn.open_table(SHEET_ROWS)?;
            for key in keys {
                table.remove(key)?;
            }
            for (offset, cells) in sheet.rows.iter().enumerate() {
                let data = rmp_serde::to_vec_named(cells)?;
                table.insert(offset as u64, data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[async_trait]
impl TableStore for LocalTableStore {
    async fn load(&self) -> Result<RawTable, TableStoreError> {
        self.read_all()
            .map_err(|e| TableStoreError::Fetch(e.to_string()))
    }

    async fn replace(&self, table: &RawTable) -> Result<(), TableStoreError> {
        self.write_all(table)
            .map_err(|e| TableStoreError::Write(e.to_string()))?;
        tracing::debug!(rows = table.rows.len(), "Replaced local sheet");
        Ok(())
    }
}
