use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::{content_type_for, is_quota_message, ImageUploader, UploadError};
use crate::google_auth::GoogleAuth;

const DRIVE_API_BASE: &str = "https://www.googleapis.com";
const BOUNDARY: &str = "dance-library-upload-boundary";

/// Uploads straight to Google Drive and shares the file as anyone-with-link reader.
pub struct DriveUploader {
    auth: Arc<GoogleAuth>,
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

impl DriveUploader {
    pub fn new(auth: Arc<GoogleAuth>) -> Result<Self, anyhow::Error> {
        Self::with_base_url(auth, DRIVE_API_BASE)
    }

    pub fn with_base_url(auth: Arc<GoogleAuth>, base_url: &str) -> Result<Self, anyhow::Error> {
        Ok(Self {
            auth,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder().build()?,
        })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/drive/v3/files?uploadType=multipart&supportsAllDrives=true&fields=id",
            self.base_url
        )
    }

    fn permissions_url(&self, file_id: &str) -> String {
        format!(
            "{}/drive/v3/files/{file_id}/permissions?supportsAllDrives=true",
            self.base_url
        )
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/drive/v3/files/{file_id}?supportsAllDrives=true", self.base_url)
    }

    /// Public URL that renders the image inline.
    pub fn view_url(file_id: &str) -> String {
        format!("https://drive.google.com/thumbnail?id={file_id}&sz=w640")
    }

    /// The file id inside a [`view_url`](Self::view_url).
    fn file_id(url: &str) -> Option<&str> {
        let query = url.strip_prefix("https://drive.google.com/thumbnail?")?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("id="))
            .filter(|id| !id.is_empty())
    }
}

/// `multipart/related` body: JSON metadata part, then the media part.
fn related_body(metadata: &serde_json::Value, content_type: &str, data: &[u8]) -> Bytes {
    let mut body = BytesMut::with_capacity(data.len() + 512);
    body.put_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(metadata.to_string().as_bytes());
    body.put_slice(format!("\r\n--{BOUNDARY}\r\n").as_bytes());
    body.put_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.put_slice(data);
    body.put_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body.freeze()
}

/// Map a failed Drive response, recognising quota exhaustion.
async fn drive_error(resp: Response, action: &str) -> UploadError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = format!("Drive {action} failed ({status}): {body}");
    if status == StatusCode::INSUFFICIENT_STORAGE || is_quota_message(&body) {
        UploadError::QuotaExceeded(message)
    } else if status.is_client_error() {
        UploadError::Rejected(message)
    } else {
        UploadError::Transport(message)
    }
}

#[async_trait]
impl ImageUploader for DriveUploader {
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        folder_id: Option<&str>,
    ) -> Result<String, UploadError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| UploadError::Transport(format!("authentication failed: {e}")))?;

        let mut metadata = serde_json::json!({ "name": filename });
        if let Some(folder) = folder_id.filter(|f| !f.is_empty()) {
            metadata["parents"] = serde_json::json!([folder]);
        }
        let body = related_body(&metadata, &content_type_for(filename), &data);

        let resp = self
            .client
            .post(self.upload_url())
            .bearer_auth(&token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(drive_error(resp, "upload").await);
        }
        let file: DriveFile = resp
            .json()
            .await
            .map_err(|e| UploadError::Transport(format!("unexpected Drive response: {e}")))?;

        let resp = self
            .client
            .post(self.permissions_url(&file.id))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(drive_error(resp, "share").await);
        }

        tracing::debug!(file_id = %file.id, filename, "Uploaded image to Drive");
        Ok(Self::view_url(&file.id))
    }

    async fn discard(&self, url: &str) -> Result<(), UploadError> {
        let file_id = Self::file_id(url)
            .ok_or_else(|| UploadError::Rejected(format!("not a Drive file URL: {url}")))?;
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| UploadError::Transport(format!("authentication failed: {e}")))?;

        let resp = self
            .client
            .delete(self.file_url(file_id))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(drive_error(resp, "delete").await);
        }

        tracing::debug!(file_id, "Deleted Drive file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_body_layout() {
        let body = related_body(&serde_json::json!({"name": "a.png"}), "image/png", b"PNG");
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with(&format!("--{BOUNDARY}\r\nContent-Type: application/json")));
        assert!(text.contains("{\"name\":\"a.png\"}"));
        assert!(text.contains("Content-Type: image/png\r\n\r\nPNG\r\n"));
        assert!(text.ends_with(&format!("--{BOUNDARY}--\r\n")));
    }

    #[test]
    fn test_file_id_from_view_url() {
        let url = DriveUploader::view_url("abc-123");
        assert_eq!(DriveUploader::file_id(&url), Some("abc-123"));
        assert_eq!(DriveUploader::file_id("https://example.com/?id=abc"), None);
        assert_eq!(DriveUploader::file_id("https://drive.google.com/thumbnail?sz=w640"), None);
    }
}
