//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use rand::Rng;
use std::path::Path;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{Catalog, ContentDescriptor, MediaId, ScheduledJob, StatusPost};

/// Error type for content catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Content directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },
    #[error("Failed to store media id in {file}: {message}")]
    WriteBack { file: String, message: String },
}

/// Port for the content library
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// Load every valid descriptor, rebuilding the catalog from scratch
    async fn load(&self) -> Result<Catalog, CatalogError>;

    /// Persist a freshly assigned media id into the descriptor's storage
    async fn store_media_id(
        &self,
        descriptor: &ContentDescriptor,
        media_id: &MediaId,
    ) -> Result<(), CatalogError>;
}

/// Error type for remote service operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Failed to read media file {path}: {message}")]
    MediaFile { path: String, message: String },
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result of a successful publish operation
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Platform-specific status ID
    pub id: String,
    /// URL to the published status, if available
    pub url: Option<String>,
}

/// Port for the remote social network
#[async_trait]
pub trait MediaPublisher: Send + Sync {
    /// Upload a media file with its description, returning the remote handle
    async fn upload_media(&self, file: &Path, description: &str)
    -> Result<MediaId, PublishError>;

    /// Publish a status referencing previously uploaded media
    async fn publish_status(&self, post: &StatusPost) -> Result<PublishResult, PublishError>;

    /// Get the platform name (e.g., "mastodon")
    fn platform(&self) -> &'static str;
}

/// Error type for job store operations
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for durable scheduler state
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get_job(&self, id: &str) -> Result<Option<ScheduledJob>, JobStoreError>;

    /// Insert or replace a job
    async fn save_job(&self, job: &ScheduledJob) -> Result<(), JobStoreError>;

    async fn remove_job(&self, id: &str) -> Result<(), JobStoreError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Port for random choices (enables forced picks in tests)
pub trait RandomSource: Send + Sync {
    /// Pick an index in `0..len`; `len` is never zero
    fn pick(&self, len: usize) -> usize;
}

/// Uniform picks from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}
