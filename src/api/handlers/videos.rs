use axum::extract::{Multipart, Path, State};
use axum::Json;
use std::sync::Arc;

use super::mutation_error;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::catalog::{Record, RecordInput, Row, RowId, VideoCard};
use crate::mutation::ImageUpload;
use crate::AppState;

// ============================================================================
// Handlers
// ============================================================================

/// Route: POST /videos
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    AppJson(input): AppJson<RecordInput>,
) -> Result<Json<JSend<VideoCard>>, ApiError> {
    let (row, record) = state.mutations.add(input).await.map_err(mutation_error)?;
    Ok(JSend::success(record_to_card(row, record)))
}

/// Multipart update: text fields for the record plus an optional `image` file.
/// Route: PUT /videos/:row
pub async fn update_video(
    State(state): State<Arc<AppState>>,
    Path(row): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<JSend<VideoCard>>, ApiError> {
    let row = parse_row(&row)?;

    let mut input = RecordInput::default();
    let mut folder_id: Option<String> = None;
    let mut image: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name == "image" {
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "thumbnail".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read image: {e}")))?;

            if data.len() as u64 > state.config.max_upload_size {
                return Err(ApiError::payload_too_large(format!(
                    "Image exceeds maximum upload size of {} bytes",
                    state.config.max_upload_size
                )));
            }
            // An empty file input still submits a part.
            if !data.is_empty() {
                image = Some((filename, data));
            }
            continue;
        }

        let slot = match field_name.as_str() {
            "performer" => &mut input.performer,
            "category" => &mut input.category,
            "image_url" => &mut input.image_url,
            "video_url" => &mut input.video_url,
            "memo" => &mut input.memo,
            "platform" => input.platform.insert(String::new()),
            "folder_id" => folder_id.insert(String::new()),
            _ => continue,
        };
        *slot = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid {field_name}: {e}")))?;
    }

    let image = image.map(|(filename, data)| ImageUpload {
        data,
        filename,
        folder_id,
    });

    let record = state
        .mutations
        .update(row, input, image)
        .await
        .map_err(mutation_error)?;
    Ok(JSend::success(record_to_card(row, record)))
}

/// Route: DELETE /videos/:row
pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    Path(row): Path<String>,
) -> Result<Json<JSend<VideoCard>>, ApiError> {
    let row = parse_row(&row)?;
    let removed = state.mutations.delete(row).await.map_err(mutation_error)?;
    Ok(JSend::success(record_to_card(row, removed)))
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_row(raw: &str) -> Result<RowId, ApiError> {
    raw.parse::<usize>()
        .map(RowId::new)
        .map_err(|_| ApiError::bad_request(format!("row must be a non-negative integer, got '{raw}'")))
}

fn record_to_card(id: RowId, record: Record) -> VideoCard {
    VideoCard::from(&Row { id, record })
}
