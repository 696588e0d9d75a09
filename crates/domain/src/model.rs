//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use time::{Duration, OffsetDateTime};

/// Opaque media handle assigned by the remote service after an upload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form of the id, when the service issued a numeric one
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for MediaId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Content warning attached to a post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentWarning {
    /// Whether the media is marked sensitive
    pub enabled: bool,
    /// Spoiler text shown in front of the post
    pub note: String,
}

/// One entry of the content library, loaded from a metadata document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDescriptor {
    /// Stable key (metadata file name without extension)
    pub key: String,
    /// Absolute path of the media file
    pub media_file: PathBuf,
    /// Description used as alt text and as the post body
    pub media_description: String,
    pub source_note: Option<String>,
    pub source_url: Option<String>,
    pub content_warning: ContentWarning,
    /// Remote media id cached after the first successful upload
    pub media_id: Option<MediaId>,
    /// Metadata document this descriptor was loaded from
    pub metadata_path: PathBuf,
}

/// Why a metadata document was left out of the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The declared media file does not exist on disk
    MissingMediaFile { path: PathBuf },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingMediaFile { path } => {
                write!(f, "media file not found: {}", path.display())
            }
        }
    }
}

/// Per-entry diagnostic for a metadata document that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub key: String,
    pub metadata_path: PathBuf,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// All descriptors loaded for one posting cycle
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, ContentDescriptor>,
    skipped: Vec<SkippedEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor, replacing any previous entry with the same key
    pub fn insert(&mut self, descriptor: ContentDescriptor) {
        self.entries.insert(descriptor.key.clone(), descriptor);
    }

    /// Record an entry that was left out
    pub fn skip(&mut self, entry: SkippedEntry) {
        self.skipped.push(entry);
    }

    pub fn get(&self, key: &str) -> Option<&ContentDescriptor> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ContentDescriptor> {
        self.entries.values()
    }

    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A status ready for the publish call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPost {
    pub text: String,
    pub media_ids: Vec<MediaId>,
    /// Mark attached media as sensitive
    pub sensitive: bool,
    /// Content warning text; empty means none
    pub spoiler_text: String,
}

/// What happened during one posting cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Selected content key
    pub key: String,
    /// Rendered status body
    pub status_text: String,
    /// Media id attached to the status (None in dry run without a cached id)
    pub media_id: Option<MediaId>,
    /// Whether an upload happened in this cycle
    pub uploaded: bool,
    /// Whether a fresh media id was persisted back into the descriptor
    pub media_id_cached: bool,
    pub status_id: Option<String>,
    pub status_url: Option<String>,
    /// Cooldown expiry recorded for the key
    pub blocked_until: Option<OffsetDateTime>,
    pub selection_attempts: usize,
    /// Whether the block list had to be wiped to make progress
    pub block_list_cleared: bool,
    pub skipped: Vec<SkippedEntry>,
    pub dry_run: bool,
}

/// Durable record of a fixed-interval job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: String,
    pub interval_secs: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub next_run_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_run_at: Option<OffsetDateTime>,
}

impl ScheduledJob {
    /// A fresh job whose first run is one interval from `now`
    pub fn new(id: impl Into<String>, interval_secs: u64, now: OffsetDateTime) -> Self {
        let mut job = Self {
            id: id.into(),
            interval_secs: interval_secs.max(1),
            next_run_at: now,
            last_run_at: None,
        };
        job.next_run_at = now.saturating_add(job.interval());
        job
    }

    pub fn interval(&self) -> Duration {
        Duration::seconds(i64::try_from(self.interval_secs.max(1)).unwrap_or(i64::MAX))
    }

    pub fn is_due(&self, now: OffsetDateTime) -> bool {
        self.next_run_at <= now
    }

    /// How long to sleep until the job is due (zero when overdue)
    pub fn delay_until_due(&self, now: OffsetDateTime) -> std::time::Duration {
        std::time::Duration::try_from(self.next_run_at - now).unwrap_or_default()
    }

    /// Number of whole runs that were missed as of `now`
    pub fn missed_runs(&self, now: OffsetDateTime) -> i64 {
        if !self.is_due(now) {
            return 0;
        }
        (now - self.next_run_at).whole_seconds() / self.interval().whole_seconds() + 1
    }

    /// Record a run starting at `now` and move `next_run_at` past it.
    ///
    /// The run always consumes the pending slot, even when the wall clock
    /// reads slightly before it, and any further missed slots are coalesced.
    pub fn mark_started(&mut self, now: OffsetDateTime) {
        self.last_run_at = Some(now);
        let slots = self.missed_runs(now).max(1);
        let advance = self.interval().whole_seconds().saturating_mul(slots);
        self.next_run_at = self.next_run_at.saturating_add(Duration::seconds(advance));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_new_job_first_run_is_one_interval_out() {
        let now = datetime!(2024-01-01 12:00 UTC);
        let job = ScheduledJob::new("post", 3600, now);

        assert_eq!(job.next_run_at, datetime!(2024-01-01 13:00 UTC));
        assert!(job.last_run_at.is_none());
        assert!(!job.is_due(now));
    }

    #[test]
    fn test_delay_until_due_is_zero_when_overdue() {
        let now = datetime!(2024-01-01 12:00 UTC);
        let job = ScheduledJob::new("post", 60, now);

        assert_eq!(
            job.delay_until_due(now),
            std::time::Duration::from_secs(60)
        );
        assert_eq!(
            job.delay_until_due(datetime!(2024-01-01 12:05 UTC)),
            std::time::Duration::ZERO
        );
    }

    #[test]
    fn test_mark_started_coalesces_missed_runs() {
        let created = datetime!(2024-01-01 12:00 UTC);
        let mut job = ScheduledJob::new("post", 3600, created);

        // Down for a little over three intervals
        let now = datetime!(2024-01-01 16:30 UTC);
        assert_eq!(job.missed_runs(now), 4);

        job.mark_started(now);

        assert_eq!(job.last_run_at, Some(now));
        assert_eq!(job.next_run_at, datetime!(2024-01-01 17:00 UTC));
        assert!(!job.is_due(now));
    }

    #[test]
    fn test_mark_started_exactly_on_time() {
        let created = datetime!(2024-01-01 12:00 UTC);
        let mut job = ScheduledJob::new("post", 3600, created);
        let due = job.next_run_at;

        job.mark_started(due);

        assert_eq!(job.next_run_at, datetime!(2024-01-01 14:00 UTC));
    }

    #[test]
    fn test_mark_started_early_wakeup_still_advances() {
        let created = datetime!(2024-01-01 12:00 UTC);
        let mut job = ScheduledJob::new("post", 3600, created);

        job.mark_started(datetime!(2024-01-01 12:59:59.999 UTC));

        assert_eq!(job.next_run_at, datetime!(2024-01-01 14:00 UTC));
    }

    #[test]
    fn test_catalog_keeps_skipped_entries() {
        let mut catalog = Catalog::new();
        catalog.skip(SkippedEntry {
            key: "gone".to_string(),
            metadata_path: PathBuf::from("/content/gone.yaml"),
            reason: SkipReason::MissingMediaFile {
                path: PathBuf::from("/content/gone.png"),
            },
        });

        assert!(catalog.is_empty());
        assert_eq!(catalog.skipped().len(), 1);
        assert_eq!(catalog.skipped()[0].key, "gone");
    }

    #[test]
    fn test_media_id_numeric_form() {
        assert_eq!(MediaId::new("109876").as_u64(), Some(109876));
        assert_eq!(MediaId::new("abc").as_u64(), None);
        assert_eq!(MediaId::from(42).as_str(), "42");
    }

    #[test]
    fn test_oversized_interval_stays_positive() {
        let now = datetime!(2024-01-01 12:00 UTC);
        let mut job = ScheduledJob::new("post", u64::MAX, now);

        assert!(job.interval().is_positive());
        assert!(job.next_run_at > now);
        assert!(!job.is_due(now));

        job.mark_started(now);
        assert!(job.next_run_at > now);
        assert_eq!(job.last_run_at, Some(now));
    }
}
