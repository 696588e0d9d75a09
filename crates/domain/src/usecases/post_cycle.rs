//! Posting cycle use case - orchestrates catalog loading, selection, upload and publishing

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    block_list::BlockList,
    model::{ContentDescriptor, CycleReport, MediaId},
    ports::{CatalogError, CatalogRepo, Clock, MediaPublisher, PublishError, RandomSource},
    usecases::{
        render::{build_status_post, render_status_text},
        schedule::{ScheduledTask, TaskFailure},
        select::{DEFAULT_MAX_ATTEMPTS, SelectionError, select_content},
    },
};

/// Configuration for the posting cycle
#[derive(Debug, Clone)]
pub struct PostCycleConfig {
    /// Dry run mode (no upload, no publish, no block)
    pub dry_run: bool,
    /// Random picks before the block list is wiped
    pub max_selection_attempts: usize,
    /// Write uploaded media ids back into the metadata documents
    pub persist_media_ids: bool,
}

impl Default for PostCycleConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_selection_attempts: DEFAULT_MAX_ATTEMPTS,
            persist_media_ids: true,
        }
    }
}

/// Process-lifetime state shared by consecutive cycles
#[derive(Debug, Clone, Default)]
pub struct PostingContext {
    pub blocks: BlockList,
}

impl PostingContext {
    pub fn new(blocks: BlockList) -> Self {
        Self { blocks }
    }
}

/// Posting cycle orchestrator
pub struct PostCycle<C, P, Cl, R>
where
    C: CatalogRepo + ?Sized,
    P: MediaPublisher + ?Sized,
    Cl: Clock + ?Sized,
    R: RandomSource + ?Sized,
{
    catalog_repo: Arc<C>,
    publisher: Arc<P>,
    clock: Arc<Cl>,
    random: Arc<R>,
    config: PostCycleConfig,
}

impl<C, P, Cl, R> PostCycle<C, P, Cl, R>
where
    C: CatalogRepo + ?Sized,
    P: MediaPublisher + ?Sized,
    Cl: Clock + ?Sized,
    R: RandomSource + ?Sized,
{
    pub fn new(
        catalog_repo: Arc<C>,
        publisher: Arc<P>,
        clock: Arc<Cl>,
        random: Arc<R>,
        config: PostCycleConfig,
    ) -> Self {
        Self {
            catalog_repo,
            publisher,
            clock,
            random,
            config,
        }
    }

    /// Run one posting cycle
    pub async fn run_once(&self, context: &mut PostingContext) -> Result<CycleReport, CycleError> {
        let catalog = self.catalog_repo.load().await?;

        tracing::info!(
            entries = catalog.len(),
            skipped = catalog.skipped().len(),
            "Loaded content catalog"
        );
        for skipped in catalog.skipped() {
            tracing::warn!(
                key = %skipped.key,
                metadata = %skipped.metadata_path.display(),
                reason = %skipped.reason,
                "Skipped content entry"
            );
        }

        let keys = catalog.keys();
        let selection = select_content(
            &keys,
            &mut context.blocks,
            self.clock.now(),
            self.random.as_ref(),
            self.config.max_selection_attempts,
        )?;

        tracing::info!(
            key = %selection.key,
            attempts = selection.attempts,
            cleared_blocks = selection.cleared_blocks,
            "Selected content"
        );

        let mut descriptor = catalog
            .get(&selection.key)
            .cloned()
            .ok_or_else(|| SelectionError::UnknownKey(selection.key.clone()))?;

        let mut report = CycleReport {
            key: selection.key.clone(),
            status_text: render_status_text(&descriptor),
            media_id: descriptor.media_id.clone(),
            uploaded: false,
            media_id_cached: false,
            status_id: None,
            status_url: None,
            blocked_until: None,
            selection_attempts: selection.attempts,
            block_list_cleared: selection.cleared_blocks,
            skipped: catalog.skipped().to_vec(),
            dry_run: self.config.dry_run,
        };

        if self.config.dry_run {
            tracing::info!(
                key = %report.key,
                media_file = %descriptor.media_file.display(),
                cached_media_id = ?descriptor.media_id,
                sensitive = descriptor.content_warning.enabled,
                status_text = %report.status_text,
                "[DRY RUN] Would post"
            );
            return Ok(report);
        }

        let media_id = match descriptor.media_id.clone() {
            Some(media_id) => {
                tracing::info!(key = %report.key, media_id = %media_id, "Reusing uploaded media");
                media_id
            }
            None => {
                let media_id = self
                    .publisher
                    .upload_media(&descriptor.media_file, &descriptor.media_description)
                    .await
                    .map_err(|source| CycleError::Upload {
                        key: report.key.clone(),
                        source,
                    })?;

                tracing::info!(
                    key = %report.key,
                    media_id = %media_id,
                    platform = self.publisher.platform(),
                    "Uploaded media"
                );
                report.uploaded = true;
                if self.config.persist_media_ids {
                    report.media_id_cached = self.cache_media_id(&descriptor, &media_id).await;
                }
                descriptor.media_id = Some(media_id.clone());
                media_id
            }
        };
        report.media_id = Some(media_id.clone());

        let status = build_status_post(&descriptor, media_id.clone());
        let published = self
            .publisher
            .publish_status(&status)
            .await
            .map_err(|source| CycleError::Publish {
                key: report.key.clone(),
                source,
            })?;

        tracing::info!(
            key = %report.key,
            media_id = %media_id,
            status_id = %published.id,
            url = ?published.url,
            "Posted status"
        );

        let now = self.clock.now();
        context.blocks.prune_expired(now);
        let until = context.blocks.block(&report.key, now);
        tracing::info!(key = %report.key, until = %until, "Blocked content");

        report.status_id = Some(published.id);
        report.status_url = published.url;
        report.blocked_until = Some(until);

        Ok(report)
    }

    /// Write the media id back; failure only costs a re-upload later
    async fn cache_media_id(
        &self,
        descriptor: &ContentDescriptor,
        media_id: &MediaId,
    ) -> bool {
        match self.catalog_repo.store_media_id(descriptor, media_id).await {
            Ok(()) => {
                tracing::debug!(key = %descriptor.key, media_id = %media_id, "Cached media id");
                true
            }
            Err(e) => {
                tracing::warn!(
                    key = %descriptor.key,
                    media_id = %media_id,
                    error = %e,
                    "Failed to cache media id, next post of this content will upload again"
                );
                false
            }
        }
    }
}

/// Errors from a posting cycle
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
    #[error("Upload of '{key}' failed: {source}")]
    Upload {
        key: String,
        #[source]
        source: PublishError,
    },
    #[error("Publishing '{key}' failed: {source}")]
    Publish {
        key: String,
        #[source]
        source: PublishError,
    },
}

impl CycleError {
    /// Whether no future cycle can succeed either
    pub fn is_fatal(&self) -> bool {
        matches!(self, CycleError::Selection(SelectionError::NoContent))
    }
}

/// A posting cycle bound to its context, ready to be driven by the scheduler
pub struct PostingTask<C, P, Cl, R>
where
    C: CatalogRepo + ?Sized,
    P: MediaPublisher + ?Sized,
    Cl: Clock + ?Sized,
    R: RandomSource + ?Sized,
{
    cycle: PostCycle<C, P, Cl, R>,
    context: PostingContext,
}

impl<C, P, Cl, R> PostingTask<C, P, Cl, R>
where
    C: CatalogRepo + ?Sized,
    P: MediaPublisher + ?Sized,
    Cl: Clock + ?Sized,
    R: RandomSource + ?Sized,
{
    pub fn new(cycle: PostCycle<C, P, Cl, R>, context: PostingContext) -> Self {
        Self { cycle, context }
    }

    pub fn context(&self) -> &PostingContext {
        &self.context
    }
}

#[async_trait]
impl<C, P, Cl, R> ScheduledTask for PostingTask<C, P, Cl, R>
where
    C: CatalogRepo + ?Sized,
    P: MediaPublisher + ?Sized,
    Cl: Clock + ?Sized,
    R: RandomSource + ?Sized,
{
    async fn run(&mut self) -> Result<(), TaskFailure> {
        match self.cycle.run_once(&mut self.context).await {
            Ok(report) => {
                tracing::info!(
                    key = %report.key,
                    uploaded = report.uploaded,
                    status_id = ?report.status_id,
                    "Posting cycle complete"
                );
                Ok(())
            }
            Err(e) => Err(TaskFailure {
                fatal: e.is_fatal(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Catalog, ContentWarning, StatusPost};
    use crate::ports::PublishResult;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    // Fake implementations for testing
    struct FakeCatalogRepo {
        catalog: Mutex<Catalog>,
        stored: Mutex<Vec<(String, MediaId)>>,
        fail_load: bool,
        fail_store: bool,
    }

    impl FakeCatalogRepo {
        fn new(descriptors: Vec<ContentDescriptor>) -> Self {
            let mut catalog = Catalog::new();
            for descriptor in descriptors {
                catalog.insert(descriptor);
            }
            Self {
                catalog: Mutex::new(catalog),
                stored: Mutex::new(vec![]),
                fail_load: false,
                fail_store: false,
            }
        }

        fn stored(&self) -> Vec<(String, MediaId)> {
            self.stored.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogRepo for FakeCatalogRepo {
        async fn load(&self) -> Result<Catalog, CatalogError> {
            if self.fail_load {
                return Err(CatalogError::Parse {
                    file: "broken.yaml".to_string(),
                    message: "bad document".to_string(),
                });
            }
            Ok(self.catalog.lock().unwrap().clone())
        }

        async fn store_media_id(
            &self,
            descriptor: &ContentDescriptor,
            media_id: &MediaId,
        ) -> Result<(), CatalogError> {
            if self.fail_store {
                return Err(CatalogError::WriteBack {
                    file: descriptor.metadata_path.display().to_string(),
                    message: "read-only".to_string(),
                });
            }
            self.stored
                .lock()
                .unwrap()
                .push((descriptor.key.clone(), media_id.clone()));
            // Mirror the write-back so the next load sees it
            let mut catalog = self.catalog.lock().unwrap();
            if let Some(existing) = catalog.get(&descriptor.key).cloned() {
                catalog.insert(ContentDescriptor {
                    media_id: Some(media_id.clone()),
                    ..existing
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePublisher {
        uploads: Mutex<Vec<(PathBuf, String)>>,
        statuses: Mutex<Vec<StatusPost>>,
        fail_upload: bool,
        fail_publish: bool,
    }

    #[async_trait]
    impl MediaPublisher for FakePublisher {
        async fn upload_media(
            &self,
            file: &Path,
            description: &str,
        ) -> Result<MediaId, PublishError> {
            if self.fail_upload {
                return Err(PublishError::Api("upload rejected".to_string()));
            }
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((file.to_path_buf(), description.to_string()));
            Ok(MediaId::new(format!("media-{}", uploads.len())))
        }

        async fn publish_status(&self, post: &StatusPost) -> Result<PublishResult, PublishError> {
            if self.fail_publish {
                return Err(PublishError::RateLimited);
            }
            let mut statuses = self.statuses.lock().unwrap();
            statuses.push(post.clone());
            Ok(PublishResult {
                id: format!("status-{}", statuses.len()),
                url: None,
            })
        }

        fn platform(&self) -> &'static str {
            "fake"
        }
    }

    struct FakeClock {
        time: OffsetDateTime,
    }

    impl Clock for FakeClock {
        fn now(&self) -> OffsetDateTime {
            self.time
        }
    }

    /// Replays scripted picks, repeating the last one once exhausted
    struct ScriptedRandom {
        picks: Mutex<Vec<usize>>,
    }

    impl ScriptedRandom {
        fn new(picks: &[usize]) -> Self {
            let mut picks = picks.to_vec();
            picks.reverse();
            Self {
                picks: Mutex::new(picks),
            }
        }
    }

    impl RandomSource for ScriptedRandom {
        fn pick(&self, len: usize) -> usize {
            let mut picks = self.picks.lock().unwrap();
            let pick = if picks.len() > 1 {
                picks.pop().unwrap()
            } else {
                picks[0]
            };
            pick.min(len - 1)
        }
    }

    const NOW: OffsetDateTime = datetime!(2024-06-01 09:00 UTC);

    fn descriptor(key: &str, media_id: Option<&str>) -> ContentDescriptor {
        ContentDescriptor {
            key: key.to_string(),
            media_file: PathBuf::from(format!("/content/{}.png", key)),
            media_description: format!("Picture {}", key),
            source_note: None,
            source_url: None,
            content_warning: ContentWarning {
                enabled: true,
                note: "eye contact".to_string(),
            },
            media_id: media_id.map(MediaId::new),
            metadata_path: PathBuf::from(format!("/content/{}.yaml", key)),
        }
    }

    fn cycle(
        repo: &Arc<FakeCatalogRepo>,
        publisher: &Arc<FakePublisher>,
        picks: &[usize],
        config: PostCycleConfig,
    ) -> PostCycle<FakeCatalogRepo, FakePublisher, FakeClock, ScriptedRandom> {
        PostCycle::new(
            Arc::clone(repo),
            Arc::clone(publisher),
            Arc::new(FakeClock { time: NOW }),
            Arc::new(ScriptedRandom::new(picks)),
            config,
        )
    }

    #[tokio::test]
    async fn test_first_post_uploads_caches_and_blocks() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![
            descriptor("a", None),
            descriptor("b", None),
        ]));
        let publisher = Arc::new(FakePublisher::default());
        let mut context = PostingContext::default();

        let report = cycle(&repo, &publisher, &[0], PostCycleConfig::default())
            .run_once(&mut context)
            .await
            .unwrap();

        assert_eq!(report.key, "a");
        assert!(report.uploaded);
        assert!(report.media_id_cached);
        assert_eq!(report.media_id, Some(MediaId::new("media-1")));

        let uploads = publisher.uploads.lock().unwrap().clone();
        assert_eq!(
            uploads,
            vec![(PathBuf::from("/content/a.png"), "Picture a".to_string())]
        );

        let statuses = publisher.statuses.lock().unwrap().clone();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].media_ids, vec![MediaId::new("media-1")]);
        assert!(statuses[0].sensitive);
        assert_eq!(statuses[0].spoiler_text, "eye contact");
        assert_eq!(statuses[0].text, "Picture a\n\n");

        assert_eq!(repo.stored(), vec![("a".to_string(), MediaId::new("media-1"))]);
        assert_eq!(
            context.blocks.blocked_until("a"),
            Some(NOW + Duration::hours(6))
        );
        assert_eq!(report.blocked_until, Some(NOW + Duration::hours(6)));
    }

    #[tokio::test]
    async fn test_cached_media_id_skips_upload() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![descriptor("a", Some("4242"))]));
        let publisher = Arc::new(FakePublisher::default());
        let mut context = PostingContext::default();

        let report = cycle(&repo, &publisher, &[0], PostCycleConfig::default())
            .run_once(&mut context)
            .await
            .unwrap();

        assert!(!report.uploaded);
        assert!(publisher.uploads.lock().unwrap().is_empty());
        assert!(repo.stored().is_empty());

        let statuses = publisher.statuses.lock().unwrap().clone();
        assert_eq!(statuses[0].media_ids, vec![MediaId::new("4242")]);
    }

    #[tokio::test]
    async fn test_second_cycle_reuses_written_back_media_id() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![descriptor("a", None)]));
        let publisher = Arc::new(FakePublisher::default());
        let posting = cycle(&repo, &publisher, &[0], PostCycleConfig::default());

        posting
            .run_once(&mut PostingContext::default())
            .await
            .unwrap();
        let report = posting
            .run_once(&mut PostingContext::default())
            .await
            .unwrap();

        assert!(!report.uploaded);
        assert_eq!(publisher.uploads.lock().unwrap().len(), 1);
        assert_eq!(publisher.statuses.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_posted_key_is_excluded_within_cooldown() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![
            descriptor("a", Some("1")),
            descriptor("b", Some("2")),
        ]));
        let publisher = Arc::new(FakePublisher::default());
        let posting = cycle(&repo, &publisher, &[0, 0, 0, 1], PostCycleConfig::default());
        let mut context = PostingContext::default();

        let first = posting.run_once(&mut context).await.unwrap();
        let second = posting.run_once(&mut context).await.unwrap();

        assert_eq!(first.key, "a");
        assert_eq!(second.key, "b");
        assert_eq!(second.selection_attempts, 3);
        assert!(!second.block_list_cleared);
        assert!(context.blocks.is_blocked("a", NOW));
        assert!(context.blocks.is_blocked("b", NOW));
    }

    #[tokio::test]
    async fn test_everything_blocked_clears_and_posts() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![descriptor("a", Some("1"))]));
        let publisher = Arc::new(FakePublisher::default());
        let mut context = PostingContext::default();
        context.blocks.block("a", NOW);
        let config = PostCycleConfig {
            max_selection_attempts: 5,
            ..Default::default()
        };

        let report = cycle(&repo, &publisher, &[0], config)
            .run_once(&mut context)
            .await
            .unwrap();

        assert!(report.block_list_cleared);
        assert_eq!(report.key, "a");
        assert_eq!(publisher.statuses.lock().unwrap().len(), 1);
        assert!(context.blocks.is_blocked("a", NOW));
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_block_list_untouched() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![descriptor("a", Some("1"))]));
        let publisher = Arc::new(FakePublisher {
            fail_publish: true,
            ..Default::default()
        });
        let mut context = PostingContext::default();

        let result = cycle(&repo, &publisher, &[0], PostCycleConfig::default())
            .run_once(&mut context)
            .await;

        assert!(matches!(result, Err(CycleError::Publish { .. })));
        assert!(!result.unwrap_err().is_fatal());
        assert!(context.blocks.is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_skips_publish() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![descriptor("a", None)]));
        let publisher = Arc::new(FakePublisher {
            fail_upload: true,
            ..Default::default()
        });
        let mut context = PostingContext::default();

        let result = cycle(&repo, &publisher, &[0], PostCycleConfig::default())
            .run_once(&mut context)
            .await;

        assert!(matches!(result, Err(CycleError::Upload { .. })));
        assert!(publisher.statuses.lock().unwrap().is_empty());
        assert!(repo.stored().is_empty());
        assert!(context.blocks.is_empty());
    }

    #[tokio::test]
    async fn test_write_back_failure_still_publishes() {
        let mut repo = FakeCatalogRepo::new(vec![descriptor("a", None)]);
        repo.fail_store = true;
        let repo = Arc::new(repo);
        let publisher = Arc::new(FakePublisher::default());
        let mut context = PostingContext::default();

        let report = cycle(&repo, &publisher, &[0], PostCycleConfig::default())
            .run_once(&mut context)
            .await
            .unwrap();

        assert!(report.uploaded);
        assert!(!report.media_id_cached);
        assert_eq!(publisher.statuses.lock().unwrap().len(), 1);
        assert!(context.blocks.is_blocked("a", NOW));
    }

    #[tokio::test]
    async fn test_unpersisted_media_id_is_not_written_back() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![descriptor("a", None)]));
        let publisher = Arc::new(FakePublisher::default());
        let config = PostCycleConfig {
            persist_media_ids: false,
            ..Default::default()
        };
        let posting = cycle(&repo, &publisher, &[0], config);

        let first = posting
            .run_once(&mut PostingContext::default())
            .await
            .unwrap();
        let second = posting
            .run_once(&mut PostingContext::default())
            .await
            .unwrap();

        assert!(first.uploaded);
        assert!(!first.media_id_cached);
        assert!(second.uploaded);
        assert!(repo.stored().is_empty());
        assert_eq!(publisher.statuses.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_remote_calls() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![descriptor("a", None)]));
        let publisher = Arc::new(FakePublisher::default());
        let mut context = PostingContext::default();
        let config = PostCycleConfig {
            dry_run: true,
            ..Default::default()
        };

        let report = cycle(&repo, &publisher, &[0], config)
            .run_once(&mut context)
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.status_text, "Picture a\n\n");
        assert!(publisher.uploads.lock().unwrap().is_empty());
        assert!(publisher.statuses.lock().unwrap().is_empty());
        assert!(context.blocks.is_empty());
    }

    #[tokio::test]
    async fn test_empty_catalog_is_fatal() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![]));
        let publisher = Arc::new(FakePublisher::default());

        let result = cycle(&repo, &publisher, &[0], PostCycleConfig::default())
            .run_once(&mut PostingContext::default())
            .await;

        let error = result.unwrap_err();
        assert!(matches!(
            error,
            CycleError::Selection(SelectionError::NoContent)
        ));
        assert!(error.is_fatal());
    }

    #[tokio::test]
    async fn test_catalog_parse_error_is_not_fatal() {
        let mut repo = FakeCatalogRepo::new(vec![descriptor("a", None)]);
        repo.fail_load = true;
        let repo = Arc::new(repo);
        let publisher = Arc::new(FakePublisher::default());

        let result = cycle(&repo, &publisher, &[0], PostCycleConfig::default())
            .run_once(&mut PostingContext::default())
            .await;

        let error = result.unwrap_err();
        assert!(matches!(error, CycleError::Catalog(_)));
        assert!(!error.is_fatal());
    }

    #[tokio::test]
    async fn test_posting_task_reports_fatal_failure() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![]));
        let publisher = Arc::new(FakePublisher::default());
        let mut task = PostingTask::new(
            cycle(&repo, &publisher, &[0], PostCycleConfig::default()),
            PostingContext::default(),
        );

        let failure = task.run().await.unwrap_err();

        assert!(failure.fatal);
        assert!(failure.message.contains("No content"));
    }

    #[tokio::test]
    async fn test_posting_task_keeps_blocks_between_runs() {
        let repo = Arc::new(FakeCatalogRepo::new(vec![
            descriptor("a", Some("1")),
            descriptor("b", Some("2")),
        ]));
        let publisher = Arc::new(FakePublisher::default());
        let mut task = PostingTask::new(
            cycle(&repo, &publisher, &[1], PostCycleConfig::default()),
            PostingContext::default(),
        );

        task.run().await.unwrap();

        assert!(task.context().blocks.is_blocked("b", NOW));
    }
}
