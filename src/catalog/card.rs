use serde::Serialize;

use super::record::{Row, RowId};
use super::thumbnail::{self, NO_IMAGE_PLACEHOLDER};

/// A row as the card grid shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoCard {
    pub row: RowId,
    pub performer: String,
    pub category: String,
    /// Explicit image, else derived thumbnail, else the placeholder.
    pub image_url: String,
    pub video_url: String,
    pub memo: String,
    pub caption: String,
    pub platform: String,
}

impl From<&Row> for VideoCard {
    fn from(row: &Row) -> Self {
        let record = &row.record;
        let image_url = if record.image_url.is_empty() {
            thumbnail::resolve(&record.video_url)
                .unwrap_or_else(|| NO_IMAGE_PLACEHOLDER.to_string())
        } else {
            record.image_url.clone()
        };

        Self {
            row: row.id,
            performer: record.performer.clone(),
            category: record.category.clone(),
            image_url,
            video_url: record.video_url.clone(),
            memo: record.memo.clone(),
            caption: memo_caption(&record.memo).to_string(),
            platform: record.platform.clone(),
        }
    }
}

/// One-line memo summary: the second line, or the first when there is no
/// non-blank second line.
pub fn memo_caption(memo: &str) -> &str {
    let mut lines = memo.lines();
    let first = lines.next().unwrap_or_default();
    match lines.next() {
        Some(second) if !second.trim().is_empty() => second.trim(),
        _ => first.trim(),
    }
}
