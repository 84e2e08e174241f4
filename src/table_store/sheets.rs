use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{TableStore, TableStoreError};
use crate::catalog::RawTable;
use crate::google_auth::GoogleAuth;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Google Sheets backend using the v4 `values` API.
pub struct SheetsStore {
    auth: Arc<GoogleAuth>,
    base_url: Url,
    client: Client,
    range: String,
    spreadsheet_id: String,
    /// Rows (header included) and columns seen on the last load or write. A
    /// replace pads with blanks up to this size so removed rows and cells are cleared.
    high_water_rows: AtomicUsize,
    high_water_width: AtomicUsize,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeUpdate<'a> {
    major_dimension: &'a str,
    values: Vec<Vec<String>>,
}

/// Accepts either a bare spreadsheet ID or a full `/spreadsheets/d/<id>/...` URL.
pub fn parse_spreadsheet_id(input: &str) -> String {
    let input = input.trim();
    match input.split_once("/spreadsheets/d/") {
        Some((_, rest)) => rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
        None => input.to_string(),
    }
}

impl SheetsStore {
    pub fn new(
        spreadsheet_id: &str,
        range: &str,
        auth: Arc<GoogleAuth>,
    ) -> Result<Self, anyhow::Error> {
        Self::with_base_url(spreadsheet_id, range, auth, SHEETS_API_BASE)
    }

    /// Point at a different API host (an emulator or a test server).
    pub fn with_base_url(
        spreadsheet_id: &str,
        range: &str,
        auth: Arc<GoogleAuth>,
        base_url: &str,
    ) -> Result<Self, anyhow::Error> {
        Ok(Self {
            auth,
            base_url: Url::parse(base_url)?,
            client: Client::builder().build()?,
            range: range.to_string(),
            spreadsheet_id: parse_spreadsheet_id(spreadsheet_id),
            high_water_rows: AtomicUsize::new(0),
            high_water_width: AtomicUsize::new(0),
        })
    }

    fn values_url(&self) -> Result<Url, String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| format!("invalid Sheets base URL: {}", self.base_url))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                self.range.as_str(),
            ]);
        Ok(url)
    }

    fn record_size(&self, rows: usize, width: usize) {
        self.high_water_rows.fetch_max(rows, Ordering::SeqCst);
        self.high_water_width.fetch_max(width, Ordering::SeqCst);
    }
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl TableStore for SheetsStore {
    async fn load(&self) -> Result<RawTable, TableStoreError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| TableStoreError::Fetch(format!("authentication failed: {e}")))?;
        let url = self.values_url().map_err(TableStoreError::Fetch)?;

        let resp = self
            .client
            .get(url)
            .query(&[("valueRenderOption", "FORMATTED_VALUE")])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| TableStoreError::Fetch(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TableStoreError::Fetch(format!(
                "Sheets read failed ({status}): {body}"
            )));
        }

        let range: ValueRange = resp
            .json()
            .await
            .map_err(|e| TableStoreError::Fetch(format!("unexpected Sheets response: {e}")))?;

        let mut rows = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect::<Vec<_>>());
        let headers = rows.next().unwrap_or_default();
        let table = RawTable::new(headers, rows.collect());

        self.record_size(table.rows.len() + 1, table.width());
        tracing::debug!(rows = table.rows.len(), "Loaded sheet");
        Ok(table)
    }

    async fn replace(&self, table: &RawTable) -> Result<(), TableStoreError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| TableStoreError::Write(format!("authentication failed: {e}")))?;
        let url = self.values_url().map_err(TableStoreError::Write)?;

        let width = table
            .width()
            .max(self.high_water_width.load(Ordering::SeqCst));
        let height = (table.rows.len() + 1).max(self.high_water_rows.load(Ordering::SeqCst));

        let pad = |cells: &[String]| {
            let mut row = cells.to_vec();
            row.resize(width, String::new());
            row
        };
        let mut values: Vec<Vec<String>> = Vec::with_capacity(height);
        values.push(pad(&table.headers));
        values.extend(table.rows.iter().map(|r| pad(r)));
        values.resize(height, vec![String::new(); width]);

        let resp = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&token)
            .json(&ValueRangeUpdate {
                major_dimension: "ROWS",
                values,
            })
            .send()
            .await
            .map_err(|e| TableStoreError::Write(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TableStoreError::Write(format!(
                "Sheets write failed ({status}): {body}"
            )));
        }

        self.record_size(table.rows.len() + 1, table.width());
        tracing::debug!(rows = table.rows.len(), "Replaced sheet");
        Ok(())
    }
}
