use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{content_type_for, is_quota_message, ImageUploader, UploadError};

/// Posts the image as base64 JSON to an upload proxy (for example a script
/// endpoint running under a user account with its own storage quota).
pub struct ProxyUploader {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyRequest<'a> {
    data: String,
    filename: &'a str,
    folder_id: Option<&'a str>,
    mime_type: String,
}

#[derive(Deserialize)]
struct ProxyResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ProxyUploader {
    pub fn new(endpoint: &str) -> Result<Self, anyhow::Error> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl ImageUploader for ProxyUploader {
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        folder_id: Option<&str>,
    ) -> Result<String, UploadError> {
        let request = ProxyRequest {
            data: base64::engine::general_purpose::STANDARD.encode(&data),
            filename,
            folder_id: folder_id.filter(|f| !f.is_empty()),
            mime_type: content_type_for(filename),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if status == StatusCode::INSUFFICIENT_STORAGE {
            return Err(UploadError::QuotaExceeded(body));
        }
        if !status.is_success() {
            return Err(UploadError::Transport(format!(
                "proxy upload failed ({status}): {body}"
            )));
        }

        let parsed: ProxyResponse = serde_json::from_str(&body)
            .map_err(|e| UploadError::Transport(format!("unexpected proxy response: {e}")))?;

        match (parsed.status.as_deref(), parsed.url) {
            (Some("success") | None, Some(url)) if !url.is_empty() => {
                tracing::debug!(filename, "Uploaded image through proxy");
                Ok(url)
            }
            _ => {
                let message = parsed
                    .message
                    .unwrap_or_else(|| "proxy returned no URL".to_string());
                if is_quota_message(&message) {
                    Err(UploadError::QuotaExceeded(message))
                } else {
                    Err(UploadError::Rejected(message))
                }
            }
        }
    }
}
