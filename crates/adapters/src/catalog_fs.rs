//! Filesystem-based content catalog backed by YAML metadata documents

use async_trait::async_trait;
use media_bot_domain::{
    Catalog, CatalogError, CatalogRepo, ContentDescriptor, ContentWarning, MediaId, SkipReason,
    SkippedEntry,
};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Field that caches the remote media id inside a metadata document
const MEDIA_ID_FIELD: &str = "media_mastodon_media_id";

/// Filesystem catalog repository
pub struct FsCatalogRepo {
    content_dir: PathBuf,
}

impl FsCatalogRepo {
    /// Create a new filesystem catalog; the directory must exist
    pub fn new(content_dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content_dir = content_dir.as_ref().to_path_buf();

        if !content_dir.is_dir() {
            return Err(CatalogError::DirectoryNotFound(
                content_dir.display().to_string(),
            ));
        }

        Ok(Self { content_dir })
    }

    fn is_metadata_file(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        )
    }

    fn parse_document(path: &Path, content: &str) -> Result<MetadataDocument, CatalogError> {
        serde_yaml::from_str(content).map_err(|e| CatalogError::Parse {
            file: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// On-disk layout of a metadata document
#[derive(Debug, Deserialize)]
struct MetadataDocument {
    media_file: PathBuf,
    media_description: String,
    #[serde(default)]
    media_source_note: Option<String>,
    #[serde(default)]
    media_source_url: Option<String>,
    media_content_warning_data: ContentWarningDocument,
    #[serde(default)]
    media_mastodon_media_id: Option<MediaIdValue>,
}

#[derive(Debug, Deserialize)]
struct ContentWarningDocument {
    content_warning_is_enabled: bool,
    content_warning_note: String,
}

/// Media ids are written as integers but quoted strings are accepted too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MediaIdValue {
    Number(u64),
    Text(String),
}

impl From<MediaIdValue> for MediaId {
    fn from(value: MediaIdValue) -> Self {
        match value {
            MediaIdValue::Number(n) => MediaId::from(n),
            MediaIdValue::Text(s) => MediaId::new(s),
        }
    }
}

#[async_trait]
impl CatalogRepo for FsCatalogRepo {
    async fn load(&self) -> Result<Catalog, CatalogError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.content_dir)? {
            let path = entry?.path();
            if path.is_file() && Self::is_metadata_file(&path) {
                paths.push(path);
            }
        }
        // Deterministic order so diagnostics are stable
        paths.sort();

        let mut catalog = Catalog::new();

        for path in paths {
            let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                return Err(CatalogError::Parse {
                    file: path.display().to_string(),
                    message: "Invalid filename".to_string(),
                });
            };

            let content = std::fs::read_to_string(&path)?;
            let document = Self::parse_document(&path, &content)?;

            // Relative media paths resolve against the working directory
            let media_file = std::path::absolute(&document.media_file)?;
            if !media_file.exists() {
                tracing::debug!(key = %key, media_file = %media_file.display(), "Media file missing");
                catalog.skip(SkippedEntry {
                    key,
                    metadata_path: path,
                    reason: SkipReason::MissingMediaFile { path: media_file },
                });
                continue;
            }

            catalog.insert(ContentDescriptor {
                key,
                media_file,
                media_description: document.media_description,
                source_note: document.media_source_note,
                source_url: document.media_source_url,
                content_warning: ContentWarning {
                    enabled: document.media_content_warning_data.content_warning_is_enabled,
                    note: document.media_content_warning_data.content_warning_note,
                },
                media_id: document.media_mastodon_media_id.map(MediaId::from),
                metadata_path: path,
            });
        }

        Ok(catalog)
    }

    async fn store_media_id(
        &self,
        descriptor: &ContentDescriptor,
        media_id: &MediaId,
    ) -> Result<(), CatalogError> {
        let path = &descriptor.metadata_path;
        let write_back_error = |message: String| CatalogError::WriteBack {
            file: path.display().to_string(),
            message,
        };

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| write_back_error(e.to_string()))?;

        let mut document: Mapping = serde_yaml::from_str(&content)
            .map_err(|e| write_back_error(format!("not a YAML mapping: {}", e)))?;

        let value = match media_id.as_u64() {
            Some(n) => Value::Number(n.into()),
            None => Value::String(media_id.as_str().to_string()),
        };
        document.insert(Value::String(MEDIA_ID_FIELD.to_string()), value);

        let updated =
            serde_yaml::to_string(&document).map_err(|e| write_back_error(e.to_string()))?;

        // Write to a sibling file then rename so readers never see a partial document
        let tmp_path = path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp_path, updated)
            .await
            .map_err(|e| write_back_error(e.to_string()))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| write_back_error(e.to_string()))?;

        tracing::debug!(
            key = %descriptor.key,
            media_id = %media_id,
            file = %path.display(),
            "Stored media id"
        );
        Ok(())
    }
}
