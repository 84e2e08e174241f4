use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Room for the text fields sent alongside an image.
const FORM_FIELDS_ALLOWANCE: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize + FORM_FIELDS_ALLOWANCE;

    let mut router = Router::new()
        // Catalog
        .route("/videos", get(handlers::list_videos))
        .route("/facets", get(handlers::facets))
        .route("/thumbnail", get(handlers::thumbnail))
        // Suggestions
        .route("/suggestions/keywords", get(handlers::suggest_keywords))
        .route("/suggestions/performers", get(handlers::suggest_performers))
        .route("/suggestions/tags", get(handlers::suggest_tags))
        .route("/suggestions/tags/apply", post(handlers::apply_tag))
        // Locally stored thumbnails
        .route("/uploads/*name", get(handlers::serve_upload))
        // Internal
        .route("/cache/refresh", post(handlers::refresh_cache))
        .route("/_internal/health", get(handlers::health));

    if state.config.edit_mode {
        router = router
            .route("/videos", post(handlers::create_video))
            .route("/videos/:row", delete(handlers::delete_video))
            .route(
                "/videos/:row",
                put(handlers::update_video).layer(DefaultBodyLimit::max(upload_limit)),
            );
    } else {
        tracing::info!("Edit mode disabled; add, update and delete routes are not mounted");
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
