use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform recorded when a row leaves the platform column blank.
pub const DEFAULT_PLATFORM: &str = "YouTube";

/// Positional identity of a row: its offset among the data rows of the backing
/// sheet (header excluded). Shifts on every delete; never cache it across a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(usize);

impl RowId {
    pub fn new(offset: usize) -> Self {
        Self(offset)
    }

    pub fn offset(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One video entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub performer: String,
    /// Stored verbatim; see [`Category::parse`] for the loose interpretation.
    pub category: String,
    pub image_url: String,
    pub video_url: String,
    pub memo: String,
    pub platform: String,
}

/// A record together with the row it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub id: RowId,
    pub record: Record,
}

/// In-memory snapshot of the backing sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    /// Build a table whose row ids are the records' positions.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(offset, record)| Row {
                id: RowId::new(offset),
                record,
            })
            .collect();
        Self { rows }
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter().map(|row| &row.record)
    }

    pub fn get(&self, id: RowId) -> Option<&Record> {
        self.rows
            .iter()
            .find(|row| row.id == id)
            .map(|row| &row.record)
    }
}

/// Dance categories offered by entry forms. Ballroom (W, T, F, Q, V) first,
/// then Latin, then the overflow bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    W,
    T,
    F,
    Q,
    V,
    S,
    C,
    R,
    P,
    J,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::W,
        Category::T,
        Category::F,
        Category::Q,
        Category::V,
        Category::S,
        Category::C,
        Category::R,
        Category::P,
        Category::J,
        Category::Other,
    ];

    /// Interpret a stored value. Anything outside the known codes is `Other`.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "W" => Category::W,
            "T" => Category::T,
            "F" => Category::F,
            "Q" => Category::Q,
            "V" => Category::V,
            "S" => Category::S,
            "C" => Category::C,
            "R" => Category::R,
            "P" => Category::P,
            "J" => Category::J,
            _ => Category::Other,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::W => "W",
            Category::T => "T",
            Category::F => "F",
            Category::Q => "Q",
            Category::V => "V",
            Category::S => "S",
            Category::C => "C",
            Category::R => "R",
            Category::P => "P",
            Category::J => "J",
            Category::Other => "Other",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Category::W => "Waltz",
            Category::T => "Tango",
            Category::F => "Slow Foxtrot",
            Category::Q => "Quickstep",
            Category::V => "Viennese Waltz",
            Category::S => "Samba",
            Category::C => "Cha Cha",
            Category::R => "Rumba",
            Category::P => "Paso Doble",
            Category::J => "Jive",
            Category::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("performer name is required")]
    MissingPerformer,
    #[error("video URL is required")]
    MissingVideoUrl,
}

/// User-supplied values for an add or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecordInput {
    pub performer: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: String,
    pub video_url: String,
    #[serde(default)]
    pub memo: String,
    /// `None` keeps the stored platform on update and uses the default on add.
    #[serde(default)]
    pub platform: Option<String>,
}

impl RecordInput {
    /// Check required fields and produce the record to store.
    /// `existing_platform` is the value kept when no platform is supplied.
    pub fn validate(&self, existing_platform: Option<&str>) -> Result<Record, ValidationError> {
        let performer = self.performer.trim();
        if performer.is_empty() {
            return Err(ValidationError::MissingPerformer);
        }
        let video_url = self.video_url.trim();
        if video_url.is_empty() {
            return Err(ValidationError::MissingVideoUrl);
        }

        let category = match self.category.trim() {
            "" => Category::Other.code().to_string(),
            other => other.to_string(),
        };

        let platform = self
            .platform
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .or(existing_platform.filter(|p| !p.is_empty()))
            .unwrap_or(DEFAULT_PLATFORM)
            .to_string();

        Ok(Record {
            performer: performer.to_string(),
            category,
            image_url: self.image_url.trim().to_string(),
            video_url: video_url.to_string(),
            memo: self.memo.clone(),
            platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(performer: &str, video_url: &str) -> RecordInput {
        RecordInput {
            performer: performer.to_string(),
            category: "W".to_string(),
            video_url: video_url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_requires_performer() {
        let err = input("  ", "https://youtu.be/dQw4w9WgXcQ")
            .validate(None)
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingPerformer);
    }

    #[test]
    fn test_validate_requires_video_url() {
        let err = input("Alice", "").validate(None).unwrap_err();
        assert_eq!(err, ValidationError::MissingVideoUrl);
    }

    #[test]
    fn test_validate_defaults() {
        let mut raw = input(" Alice ", "https://youtu.be/dQw4w9WgXcQ");
        raw.category = String::new();
        let record = raw.validate(None).unwrap();
        assert_eq!(record.performer, "Alice");
        assert_eq!(record.category, "Other");
        assert_eq!(record.platform, DEFAULT_PLATFORM);
    }

    #[test]
    fn test_validate_keeps_existing_platform() {
        let record = input("Alice", "https://vimeo.com/1")
            .validate(Some("Vimeo"))
            .unwrap();
        assert_eq!(record.platform, "Vimeo");

        let mut raw = input("Alice", "https://vimeo.com/1");
        raw.platform = Some("Instagram".to_string());
        assert_eq!(raw.validate(Some("Vimeo")).unwrap().platform, "Instagram");
    }

    #[test]
    fn test_category_parse_is_loose() {
        assert_eq!(Category::parse(" W "), Category::W);
        assert_eq!(Category::parse("Showdance"), Category::Other);
        assert_eq!(Category::parse(""), Category::Other);
    }

    #[test]
    fn test_table_get_by_row_id() {
        let table = Table::from_records(vec![
            Record {
                performer: "Alice".to_string(),
                category: "W".to_string(),
                image_url: String::new(),
                video_url: "a".to_string(),
                memo: String::new(),
                platform: DEFAULT_PLATFORM.to_string(),
            },
        ]);
        assert_eq!(table.get(RowId::new(0)).unwrap().performer, "Alice");
        assert!(table.get(RowId::new(1)).is_none());
    }
}
