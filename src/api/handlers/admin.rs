use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::JSend;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Drop the display snapshot so the next read reloads the sheet.
/// Route: POST /cache/refresh
pub async fn refresh_cache(State(state): State<Arc<AppState>>) -> Json<JSend<()>> {
    state.catalog.invalidate().await;
    tracing::info!("Display cache refreshed on request");
    JSend::success(())
}
