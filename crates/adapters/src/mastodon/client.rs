//! Mastodon REST client for media upload and status publishing

use async_trait::async_trait;
use media_bot_domain::{MediaId, MediaPublisher, PublishError, PublishResult, StatusPost};
use reqwest::{Client, Response, StatusCode, multipart};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Mastodon API client
pub struct MastodonClient {
    client: Client,
    access_token: SecretString,
    base_url: String,
}

impl MastodonClient {
    pub fn new(
        base_url: impl Into<String>,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(PublishError::Config("Mastodon base URL is empty".to_string()));
        }

        Ok(Self {
            client,
            access_token,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }

    /// Map non-success statuses onto publish errors
    async fn check_status(response: Response, action: &str) -> Result<Response, PublishError> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(PublishError::Auth("Invalid or revoked access token".to_string()))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(PublishError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(PublishError::Api(format!(
                    "Failed to {} ({}): {}",
                    action, status, body
                )))
            }
            _ => Ok(response),
        }
    }
}

#[derive(Deserialize)]
struct MediaAttachmentResponse {
    id: String,
}

#[derive(Serialize)]
struct CreateStatusRequest<'a> {
    status: &'a str,
    media_ids: Vec<&'a str>,
    sensitive: bool,
    spoiler_text: &'a str,
}

#[derive(Deserialize)]
struct StatusResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl MediaPublisher for MastodonClient {
    async fn upload_media(&self, file: &Path, description: &str) -> Result<MediaId, PublishError> {
        let media_error = |message: String| PublishError::MediaFile {
            path: file.display().to_string(),
            message,
        };

        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| media_error(e.to_string()))?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("media")
            .to_string();
        let mime = mime_guess::from_path(file).first_or_octet_stream();

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())
            .map_err(|e| media_error(e.to_string()))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("description", description.to_string());

        let url = format!("{}/api/v2/media", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        // 202 means the server is still processing; the id is usable either way
        let response = Self::check_status(response, "upload media").await?;
        let attachment: MediaAttachmentResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        tracing::info!(media_id = %attachment.id, file = %file.display(), "Uploaded media");
        Ok(MediaId::new(attachment.id))
    }

    async fn publish_status(&self, post: &StatusPost) -> Result<PublishResult, PublishError> {
        let request = CreateStatusRequest {
            status: &post.text,
            media_ids: post.media_ids.iter().map(MediaId::as_str).collect(),
            sensitive: post.sensitive,
            spoiler_text: &post.spoiler_text,
        };

        let url = format!("{}/api/v1/statuses", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .json(&request)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let response = Self::check_status(response, "publish status").await?;
        let status: StatusResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        tracing::info!(status_id = %status.id, "Published status to Mastodon");
        Ok(PublishResult {
            id: status.id,
            url: status.url,
        })
    }

    fn platform(&self) -> &'static str {
        "mastodon"
    }
}
