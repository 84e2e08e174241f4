use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::load_error;
use crate::api::response::{ApiError, AppQuery, JSend};
use crate::catalog::{thumbnail as thumbnails, Category, FilterCriteria, Section, VideoCard, ViewMode};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct VideosParams {
    #[serde(default)]
    pub view: ViewMode,
    #[serde(default)]
    pub performer: Vec<String>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub keyword: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VideosResponse {
    /// Rows in the whole catalog
    pub total: usize,
    /// Rows left after filtering
    pub shown: usize,
    pub view: ViewMode,
    pub sections: Vec<SectionResponse>,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub label: String,
    pub anchor: String,
    pub cards: Vec<VideoCard>,
}

#[derive(Debug, Serialize)]
pub struct FacetsResponse {
    pub performers: Vec<String>,
    pub categories: Vec<String>,
    pub vocabulary: Vec<String>,
    pub category_choices: Vec<CategoryChoice>,
}

#[derive(Debug, Serialize)]
pub struct CategoryChoice {
    pub code: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailParams {
    #[serde(default)]
    pub video_url: String,
}

#[derive(Debug, Serialize)]
pub struct ThumbnailResponse {
    /// Empty when no thumbnail can be derived.
    pub image_url: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<VideosParams>,
) -> Result<Json<JSend<VideosResponse>>, ApiError> {
    let catalog = state.catalog.catalog().await.map_err(load_error)?;

    let criteria = FilterCriteria {
        performers: non_blank(params.performer).collect::<BTreeSet<_>>(),
        categories: non_blank(params.category).collect::<BTreeSet<_>>(),
        keywords: non_blank(params.keyword).collect(),
    };
    let (shown, sections) = catalog.view(&criteria, params.view, state.transliterator.as_ref());

    tracing::debug!(shown, view = ?params.view, "Rendered catalog view");

    Ok(JSend::success(VideosResponse {
        total: catalog.table.len(),
        shown,
        view: params.view,
        sections: sections.into_iter().map(section_to_response).collect(),
    }))
}

pub async fn facets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<FacetsResponse>>, ApiError> {
    let catalog = state.catalog.catalog().await.map_err(load_error)?;

    Ok(JSend::success(FacetsResponse {
        performers: catalog.performers.clone(),
        categories: catalog.categories.clone(),
        vocabulary: catalog.vocabulary.words().to_vec(),
        category_choices: Category::ALL
            .iter()
            .map(|c| CategoryChoice {
                code: c.code(),
                name: c.display_name(),
            })
            .collect(),
    }))
}

/// Preview the thumbnail an add would derive for `video_url`.
pub async fn thumbnail(
    AppQuery(params): AppQuery<ThumbnailParams>,
) -> Json<JSend<ThumbnailResponse>> {
    JSend::success(ThumbnailResponse {
        image_url: thumbnails::resolve(params.video_url.trim()).unwrap_or_default(),
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn non_blank(values: Vec<String>) -> impl Iterator<Item = String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn section_to_response(section: Section) -> SectionResponse {
    SectionResponse {
        cards: section.rows.iter().map(VideoCard::from).collect(),
        label: section.label,
        anchor: section.anchor,
    }
}
