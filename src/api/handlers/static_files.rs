use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::AppState;

/// Serve a thumbnail written by the local upload backend.
/// Route: GET /uploads/*name
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(name): axum::extract::Path<String>,
) -> Result<Response, ApiError> {
    let uploads = state
        .local_uploads
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Uploads are not served by this instance"))?;

    let path = uploads
        .object_path(&name)
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let data = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ApiError::not_found("File not found"),
        _ => ApiError::internal(format!("Failed to read upload: {e}")),
    })?;

    let mime_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();
    let byte_size = data.len() as u64;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        mime_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, header::HeaderValue::from(byte_size));

    // Upload keys carry a random prefix, so content never changes under a name.
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=86400, immutable"),
    );

    Ok(response)
}
