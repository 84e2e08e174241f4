mod admin;
mod catalog;
mod static_files;
mod suggestions;
mod videos;

use crate::api::response::ApiError;
use crate::cache::LoadError;
use crate::mutation::MutationError;
use crate::table_store::TableStoreError;
use crate::upload::UploadError;

pub use admin::{health, refresh_cache};
pub use catalog::{facets, list_videos, thumbnail};
pub use static_files::serve_upload;
pub use suggestions::{apply_tag, suggest_keywords, suggest_performers, suggest_tags};
pub use videos::{create_video, delete_video, update_video};

/// Map a catalog load failure to an ApiError
fn load_error(e: LoadError) -> ApiError {
    match e {
        LoadError::Store(e) => store_error(e),
        LoadError::Schema(e) => ApiError::unprocessable(e.to_string()),
    }
}

fn store_error(e: TableStoreError) -> ApiError {
    tracing::error!(error = %e, "Table store request failed");
    ApiError::bad_gateway(e.to_string())
}

/// Map a MutationError to an ApiError
fn mutation_error(e: MutationError) -> ApiError {
    match e {
        MutationError::Validation(e) => ApiError::bad_request(e.to_string()),
        MutationError::RowNotFound(_) => ApiError::not_found(e.to_string()),
        MutationError::Schema(e) => ApiError::unprocessable(e.to_string()),
        MutationError::Store(e) => store_error(e),
        MutationError::Upload(e) => {
            tracing::warn!(error = %e, "Thumbnail upload failed");
            match e {
                UploadError::QuotaExceeded(_) => ApiError::insufficient_storage(e.to_string()),
                UploadError::Io(_) => ApiError::internal(e.to_string()),
                UploadError::Rejected(_) | UploadError::Transport(_) => {
                    ApiError::bad_gateway(e.to_string())
                }
            }
        }
    }
}
