use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::record::{Record, Table};

/// Facet selections. Empty facets pass everything through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub performers: BTreeSet<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// Every keyword must appear in the memo (AND).
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.performers.is_empty() && self.categories.is_empty() && self.keywords.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        if !self.performers.is_empty() && !self.performers.contains(&record.performer) {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&record.category) {
            return false;
        }
        if self.keywords.iter().all(|k| k.is_empty()) {
            return true;
        }
        let memo = record.memo.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| !k.is_empty())
            .all(|k| memo.contains(&k.to_lowercase()))
    }
}

/// Rows of `table` matching `criteria`, in table order.
pub fn apply(table: &Table, criteria: &FilterCriteria) -> Table {
    if criteria.is_empty() {
        return table.clone();
    }
    Table::from_rows(
        table
            .rows()
            .iter()
            .filter(|row| criteria.matches(&row.record))
            .cloned()
            .collect(),
    )
}
