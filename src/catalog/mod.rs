//! Pure, synchronous catalog pipeline:
//! raw sheet → [`schema`] → [`Table`] → {[`vocabulary`], [`filter`]} → [`sort`] → [`card`].

pub mod card;
pub mod filter;
pub mod record;
pub mod schema;
pub mod sort;
pub mod thumbnail;
pub mod vocabulary;

use std::collections::BTreeSet;

pub use card::VideoCard;
pub use filter::FilterCriteria;
pub use record::{Category, Record, RecordInput, Row, RowId, Table, ValidationError};
pub use schema::{ColumnMap, RawTable, SchemaError};
pub use sort::{KakasiTransliterator, KanaTransliterator, Section, SortKey, Transliterator, ViewMode};
pub use vocabulary::Vocabulary;

/// A normalized table plus everything derived from it. Rebuilt from scratch
/// whenever the table is reloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub table: Table,
    pub vocabulary: Vocabulary,
    /// Distinct performers, ascending.
    pub performers: Vec<String>,
    /// Distinct stored categories, ascending.
    pub categories: Vec<String>,
}

impl Catalog {
    pub fn from_raw(raw: &RawTable) -> Result<Self, SchemaError> {
        Ok(Self::new(schema::normalize(raw)?))
    }

    pub fn new(table: Table) -> Self {
        let distinct = |pick: fn(&Record) -> &str| -> Vec<String> {
            table
                .records()
                .map(pick)
                .filter(|v| !v.is_empty())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        let performers = distinct(|r| r.performer.as_str());
        let categories = distinct(|r| r.category.as_str());
        let vocabulary = Vocabulary::from_table(&table);

        Self {
            table,
            vocabulary,
            performers,
            categories,
        }
    }

    /// Filter, then arrange for `mode`.
    pub fn view(
        &self,
        criteria: &FilterCriteria,
        mode: ViewMode,
        transliterator: &dyn Transliterator,
    ) -> (usize, Vec<Section>) {
        let filtered = filter::apply(&self.table, criteria);
        let shown = filtered.len();
        (shown, sort::arrange(&filtered, mode, transliterator))
    }
}
