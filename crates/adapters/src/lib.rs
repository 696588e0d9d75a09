//! media-bot adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `catalog`: Filesystem catalog of YAML metadata documents
//! - `jobs`: SQLite scheduler state
//! - `mastodon`: Mastodon media upload and status publishing

mod catalog_fs;
mod job_sqlite;

pub mod mastodon;

/// Re-exports for catalog adapters
pub mod catalog {
    pub use crate::catalog_fs::FsCatalogRepo as FilesystemCatalogRepo;
}

/// Re-exports for job store adapters
pub mod jobs {
    pub use crate::job_sqlite::SqliteJobStore;
}
