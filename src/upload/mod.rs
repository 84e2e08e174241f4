mod drive;
mod local;
mod proxy;

pub use drive::DriveUploader;
pub use local::LocalUploader;
pub use proxy::ProxyUploader;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(
        "Storage quota exceeded ({0}). Upload into a shared drive folder the service account \
         can write to, or free up space, then try again."
    )]
    QuotaExceeded(String),
    #[error("Upload rejected: {0}")]
    Rejected(String),
    #[error("Upload failed: {0}")]
    Transport(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Thumbnail image destination. Returns a publicly viewable URL.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        folder_id: Option<&str>,
    ) -> Result<String, UploadError>;

    /// Remove a file this uploader returned `url` for. Backends that cannot
    /// delete leave the file in place.
    async fn discard(&self, url: &str) -> Result<(), UploadError> {
        tracing::debug!(url, "Upload backend cannot discard files");
        Ok(())
    }
}

/// Content type for an uploaded image, guessed from its filename.
pub(crate) fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Whether a backend error message describes an exhausted storage quota.
pub(crate) fn is_quota_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("storagequotaexceeded") || lower.contains("quota")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("thumb.png"), "image/png");
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_quota_message_detection() {
        assert!(is_quota_message("\"reason\": \"storageQuotaExceeded\""));
        assert!(is_quota_message("Drive quota exceeded"));
        assert!(!is_quota_message("permission denied"));
    }

    #[test]
    fn test_quota_error_carries_hint() {
        let err = UploadError::QuotaExceeded("403".to_string());
        assert!(err.to_string().contains("shared drive"));
    }
}
