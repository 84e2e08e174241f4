use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::load_error;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend};
use crate::catalog::vocabulary::{append_tag, suggest_performers as performers_matching};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct MemoParams {
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyTagRequest {
    #[serde(default)]
    pub memo: String,
    pub tag: String,
}

#[derive(Debug, Serialize)]
pub struct ApplyTagResponse {
    pub memo: String,
}

fn respond(suggestions: Vec<&str>) -> Json<JSend<SuggestionsResponse>> {
    JSend::success(SuggestionsResponse {
        suggestions: suggestions.into_iter().map(str::to_string).collect(),
    })
}

/// Route: GET /suggestions/keywords?q=
pub async fn suggest_keywords(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<QueryParams>,
) -> Result<Json<JSend<SuggestionsResponse>>, ApiError> {
    let catalog = state.catalog.catalog().await.map_err(load_error)?;
    Ok(respond(catalog.vocabulary.suggest_keywords(&params.q)))
}

/// Route: GET /suggestions/tags?memo=
pub async fn suggest_tags(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<MemoParams>,
) -> Result<Json<JSend<SuggestionsResponse>>, ApiError> {
    let catalog = state.catalog.catalog().await.map_err(load_error)?;
    Ok(respond(catalog.vocabulary.suggest_tags(&params.memo)))
}

/// Route: GET /suggestions/performers?q=
pub async fn suggest_performers(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<QueryParams>,
) -> Result<Json<JSend<SuggestionsResponse>>, ApiError> {
    let catalog = state.catalog.catalog().await.map_err(load_error)?;
    Ok(respond(performers_matching(&catalog.performers, params.q.trim())))
}

/// Route: POST /suggestions/tags/apply
pub async fn apply_tag(
    AppJson(req): AppJson<ApplyTagRequest>,
) -> Result<Json<JSend<ApplyTagResponse>>, ApiError> {
    let tag = req.tag.trim();
    if tag.is_empty() {
        return Err(ApiError::bad_request("tag must not be empty"));
    }

    Ok(JSend::success(ApplyTagResponse {
        memo: append_tag(&req.memo, tag),
    }))
}
