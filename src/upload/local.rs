use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::{ImageUploader, UploadError};

/// Writes images under a local directory; the service serves them at
/// `{public_base_url}/uploads/...`.
pub struct LocalUploader {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalUploader {
    pub fn new<P: AsRef<Path>>(base_path: P, public_base_url: &str) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a served key to a file path, refusing anything that could escape the base.
    pub fn object_path(&self, key: &str) -> Option<PathBuf> {
        let mut path = self.base_path.clone();
        for segment in key.split('/') {
            if segment.is_empty() || sanitize(segment) != segment {
                return None;
            }
            path.push(segment);
        }
        Some(path)
    }

    /// The served key for a URL this uploader returned.
    fn key_for<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(&self.public_base_url)?.strip_prefix("/uploads/")
    }
}

/// Keep `[A-Za-z0-9._-]`, replace everything else, and never yield `.`/`..`.
fn sanitize(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        "_".repeat(cleaned.len().max(1))
    } else {
        cleaned
    }
}

#[async_trait]
impl ImageUploader for LocalUploader {
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        folder_id: Option<&str>,
    ) -> Result<String, UploadError> {
        let name = format!("{}-{}", uuid::Uuid::new_v4(), sanitize(filename));
        let key = match folder_id.filter(|f| !f.is_empty()) {
            Some(folder) => format!("{}/{name}", sanitize(folder)),
            None => name,
        };

        let path = self
            .object_path(&key)
            .ok_or_else(|| UploadError::Rejected(format!("invalid upload name: {filename}")))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;

        tracing::debug!(key = %key, bytes = data.len(), "Stored upload locally");
        Ok(format!("{}/uploads/{key}", self.public_base_url))
    }

    async fn discard(&self, url: &str) -> Result<(), UploadError> {
        let path = self
            .key_for(url)
            .and_then(|key| self.object_path(key))
            .ok_or_else(|| UploadError::Rejected(format!("not a local upload: {url}")))?;
        tokio::fs::remove_file(&path).await?;
        tracing::debug!(path = %path.display(), "Removed local upload");
        Ok(())
    }
}
