//! Maps loosely-edited spreadsheet headers onto [`Record`] fields.
//!
//! Column resolution is a two-stage decision per field:
//!
//! | stage | rule |
//! |-------|------|
//! | named | header (trimmed, ASCII case-insensitive) equals one of the field's aliases |
//! | positional | optional fields only: the fixed fallback column, if it exists and no other field claimed it |
//! | absent | required field: [`SchemaError`]; optional field: default value |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::record::{Record, Row, RowId, Table, DEFAULT_PLATFORM};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing columns in the spreadsheet: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Sheet contents as strings: a header row followed by data rows.
/// Rows may be shorter than the header; absent cells read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Widest row, header included.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    pub fn row_mut(&mut self, id: RowId) -> Option<&mut Vec<String>> {
        self.rows.get_mut(id.offset())
    }

    pub fn remove_row(&mut self, id: RowId) -> Option<Vec<String>> {
        (id.offset() < self.rows.len()).then(|| self.rows.remove(id.offset()))
    }

    /// Append a row and return its id.
    pub fn push_row(&mut self, cells: Vec<String>) -> RowId {
        self.rows.push(cells);
        RowId::new(self.rows.len() - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Performer,
    Category,
    ImageUrl,
    VideoUrl,
    Memo,
    Platform,
}

impl Field {
    const REQUIRED: [Field; 4] = [
        Field::Performer,
        Field::Category,
        Field::ImageUrl,
        Field::VideoUrl,
    ];

    const ALL_NAMED: [Field; 6] = [
        Field::Performer,
        Field::Category,
        Field::ImageUrl,
        Field::VideoUrl,
        Field::Memo,
        Field::Platform,
    ];

    /// Accepted header names; index 0 is the English header, index 1 the Japanese one.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Performer => &["performer", "ダンサー", "dancer"],
            Field::Category => &["category", "種目", "discipline"],
            Field::ImageUrl => &["image_url", "画像URL", "image url"],
            Field::VideoUrl => &["video_url", "動画URL", "video url"],
            Field::Memo => &["memo", "メモ"],
            Field::Platform => &["platform", "プラットフォーム"],
        }
    }

    /// Zero-based column tried when an optional field has no matching header.
    fn fallback_position(self) -> Option<usize> {
        match self {
            Field::Memo => Some(5),
            Field::Platform => Some(2),
            _ => None,
        }
    }

    fn header(self, style: HeaderStyle) -> &'static str {
        match style {
            HeaderStyle::English => self.aliases()[0],
            HeaderStyle::Japanese => self.aliases()[1],
        }
    }

    fn matches(self, header: &str) -> bool {
        let header = header.trim();
        self.aliases()
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(header))
    }
}

/// Which naming convention the sheet uses; columns we add follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderStyle {
    English,
    Japanese,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Named(usize),
    Positional(usize),
    Absent,
}

impl Resolution {
    pub fn index(self) -> Option<usize> {
        match self {
            Resolution::Named(i) | Resolution::Positional(i) => Some(i),
            Resolution::Absent => None,
        }
    }
}

/// Resolved column positions for one header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    performer: usize,
    category: usize,
    image_url: usize,
    video_url: usize,
    memo: Resolution,
    platform: Resolution,
    style: HeaderStyle,
}

impl ColumnMap {
    pub fn resolve(headers: &[String]) -> Result<Self, SchemaError> {
        let named = |field: Field| headers.iter().position(|h| field.matches(h));

        let missing: Vec<String> = Field::REQUIRED
            .iter()
            .filter(|field| named(**field).is_none())
            .map(|field| field.aliases()[0].to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }

        // Checked non-empty above.
        let performer = named(Field::Performer).unwrap_or_default();
        let category = named(Field::Category).unwrap_or_default();
        let image_url = named(Field::ImageUrl).unwrap_or_default();
        let video_url = named(Field::VideoUrl).unwrap_or_default();

        let style = if Field::Performer.header(HeaderStyle::Japanese) == headers[performer].trim()
        {
            HeaderStyle::Japanese
        } else {
            HeaderStyle::English
        };

        let mut claimed = vec![performer, category, image_url, video_url];
        let mut resolve_optional = |field: Field| {
            let resolution = if let Some(i) = named(field) {
                Resolution::Named(i)
            } else {
                match field.fallback_position() {
                    Some(i)
                        if i < headers.len()
                            && !claimed.contains(&i)
                            && !Field::ALL_NAMED.iter().any(|f| f.matches(&headers[i])) =>
                    {
                        tracing::debug!(
                            column = i,
                            header = %headers[i],
                            "Using positional fallback column"
                        );
                        Resolution::Positional(i)
                    }
                    _ => Resolution::Absent,
                }
            };
            if let Some(i) = resolution.index() {
                claimed.push(i);
            }
            resolution
        };
        let memo = resolve_optional(Field::Memo);
        let platform = resolve_optional(Field::Platform);

        Ok(Self {
            performer,
            category,
            image_url,
            video_url,
            memo,
            platform,
            style,
        })
    }

    pub fn memo(&self) -> Resolution {
        self.memo
    }

    pub fn platform(&self) -> Resolution {
        self.platform
    }

    pub fn read(&self, cells: &[String]) -> Record {
        let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or_default();
        let optional = |r: Resolution| r.index().map(|i| clean(cell(i))).unwrap_or_default();

        let platform = optional(self.platform);
        Record {
            performer: cell(self.performer).trim().to_string(),
            category: cell(self.category).trim().to_string(),
            image_url: cell(self.image_url).trim().to_string(),
            video_url: cell(self.video_url).trim().to_string(),
            memo: optional(self.memo),
            platform: if platform.trim().is_empty() {
                DEFAULT_PLATFORM.to_string()
            } else {
                platform.trim().to_string()
            },
        }
    }

    /// Add header cells for optional fields the sheet lacks so they can be written.
    pub fn ensure_optional_columns(&mut self, raw: &mut RawTable) {
        let style = self.style;
        let width = raw.width();
        if raw.headers.len() < width {
            raw.headers.resize(width, String::new());
        }
        for field in [Field::Memo, Field::Platform] {
            let slot = match field {
                Field::Memo => &mut self.memo,
                _ => &mut self.platform,
            };
            if *slot == Resolution::Absent {
                raw.headers.push(field.header(style).to_string());
                *slot = Resolution::Named(raw.headers.len() - 1);
            }
        }
    }

    /// Overwrite the record's cells in `cells`, leaving unrelated columns untouched.
    pub fn write(&self, cells: &mut Vec<String>, record: &Record) {
        let mut set = |i: usize, value: &str| {
            if cells.len() <= i {
                cells.resize(i + 1, String::new());
            }
            cells[i] = value.to_string();
        };
        set(self.performer, &record.performer);
        set(self.category, &record.category);
        set(self.image_url, &record.image_url);
        set(self.video_url, &record.video_url);
        if let Some(i) = self.memo.index() {
            set(i, &record.memo);
        }
        if let Some(i) = self.platform.index() {
            set(i, &record.platform);
        }
    }
}

/// Exact spellings an exported sheet uses for a missing value.
const NULL_TOKENS: [&str; 5] = ["nan", "NaN", "None", "null", "NULL"];

/// Null-like memo and platform values read as empty. Matching is
/// case-sensitive, so text such as "Nan" or "NONE" is kept.
fn clean(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || NULL_TOKENS.contains(&trimmed) {
        String::new()
    } else {
        value.to_string()
    }
}

/// Convert a raw sheet into a [`Table`]. Blank rows are skipped but keep
/// their positions, so row ids always address the raw sheet.
pub fn normalize(raw: &RawTable) -> Result<Table, SchemaError> {
    let columns = ColumnMap::resolve(&raw.headers)?;
    let rows = raw
        .rows
        .iter()
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|(offset, cells)| Row {
            id: RowId::new(offset),
            record: columns.read(cells),
        })
        .collect();
    Ok(Table::from_rows(rows))
}
