mod local;
mod sheets;
mod tables;

pub use local::{DatabaseError, LocalTableStore};
pub use sheets::{parse_spreadsheet_id, SheetsStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::RawTable;

#[derive(Debug, Error)]
pub enum TableStoreError {
    #[error("Failed to fetch table: {0}")]
    Fetch(String),
    #[error("Failed to write table: {0}")]
    Write(String),
}

/// Whole-table access to the backing sheet. There is no partial-row API:
/// every mutation transmits the full table, and `replace` is all-or-nothing.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn load(&self) -> Result<RawTable, TableStoreError>;
    async fn replace(&self, table: &RawTable) -> Result<(), TableStoreError>;
}
