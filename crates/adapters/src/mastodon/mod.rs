//! Mastodon adapters

mod client;

pub use client::MastodonClient;

use async_trait::async_trait;
use media_bot_domain::{MediaId, MediaPublisher, PublishError, PublishResult, StatusPost};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stub publisher that hands out sequential ids instead of talking to a server
#[derive(Default)]
pub struct StubPublisher {
    uploads: AtomicU64,
    statuses: AtomicU64,
}

impl StubPublisher {
    pub const PLATFORM: &'static str = "stub";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaPublisher for StubPublisher {
    async fn upload_media(&self, file: &Path, description: &str) -> Result<MediaId, PublishError> {
        if !file.is_file() {
            return Err(PublishError::MediaFile {
                path: file.display().to_string(),
                message: "not a file".to_string(),
            });
        }

        let count = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(file = %file.display(), description, count, "Stub upload");

        Ok(MediaId::from(100_000 + count))
    }

    async fn publish_status(&self, post: &StatusPost) -> Result<PublishResult, PublishError> {
        let count = self.statuses.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(media_ids = post.media_ids.len(), count, "Stub status");

        let id = format!("stub_{}", count);
        Ok(PublishResult {
            url: Some(format!("https://mastodon.invalid/@stub/{}", id)),
            id,
        })
    }

    fn platform(&self) -> &'static str {
        Self::PLATFORM
    }
}
