//! Fixed-interval scheduler with durable next-run state

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    model::ScheduledJob,
    ports::{Clock, JobStore, JobStoreError},
};

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Identifier of the persisted job
    pub job_id: String,
    /// Time between runs
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            job_id: "post".to_string(),
            interval: Duration::from_secs(3600),
        }
    }
}

/// Failure reported by a scheduled task
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub message: String,
    /// Stop the scheduler instead of waiting for the next run
    pub fatal: bool,
}

/// Work invoked by the scheduler once per interval
#[async_trait]
pub trait ScheduledTask: Send {
    async fn run(&mut self) -> Result<(), TaskFailure>;
}

/// Errors from the scheduler
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Job store error: {0}")]
    JobStore(#[from] JobStoreError),
    #[error("Scheduled task failed fatally: {0}")]
    Fatal(String),
}

/// Drives a task at a fixed interval, persisting next-run time across restarts
pub struct Scheduler<S, Cl>
where
    S: JobStore + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<S>,
    clock: Arc<Cl>,
    config: SchedulerConfig,
}

impl<S, Cl> Scheduler<S, Cl>
where
    S: JobStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(store: Arc<S>, clock: Arc<Cl>, config: SchedulerConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    fn interval_secs(&self) -> u64 {
        self.config.interval.as_secs().max(1)
    }

    /// Load the persisted job or create it, reconciling the configured interval
    pub async fn prepare(&self) -> Result<ScheduledJob, SchedulerError> {
        let now = self.clock.now();
        let interval_secs = self.interval_secs();

        let job = match self.store.get_job(&self.config.job_id).await? {
            Some(job) if job.interval_secs != interval_secs => {
                tracing::info!(
                    job_id = %job.id,
                    stored_interval_secs = job.interval_secs,
                    interval_secs,
                    "Interval changed, rescheduling job"
                );
                ScheduledJob {
                    last_run_at: job.last_run_at,
                    ..ScheduledJob::new(job.id, interval_secs, now)
                }
            }
            Some(job) => {
                let missed = job.missed_runs(now);
                if missed > 0 {
                    tracing::warn!(
                        job_id = %job.id,
                        missed,
                        next_run_at = %job.next_run_at,
                        "Missed runs while stopped, running once now"
                    );
                } else {
                    tracing::info!(
                        job_id = %job.id,
                        next_run_at = %job.next_run_at,
                        "Resuming persisted job"
                    );
                }
                job
            }
            None => {
                let job = ScheduledJob::new(self.config.job_id.clone(), interval_secs, now);
                tracing::info!(
                    job_id = %job.id,
                    next_run_at = %job.next_run_at,
                    "Created scheduled job"
                );
                job
            }
        };

        self.store.save_job(&job).await?;
        Ok(job)
    }

    /// Forget the persisted job so the next start schedules from scratch
    pub async fn reset(&self) -> Result<(), SchedulerError> {
        self.store.remove_job(&self.config.job_id).await?;
        tracing::info!(job_id = %self.config.job_id, "Removed persisted job");
        Ok(())
    }

    /// Run `task` once per interval until `shutdown` resolves or the task fails fatally
    pub async fn run<T, F>(&self, task: &mut T, shutdown: F) -> Result<(), SchedulerError>
    where
        T: ScheduledTask + ?Sized,
        F: Future<Output = ()>,
    {
        let mut job = self.prepare().await?;
        tokio::pin!(shutdown);

        loop {
            let wait = job.delay_until_due(self.clock.now());
            tracing::debug!(
                job_id = %job.id,
                next_run_at = %job.next_run_at,
                wait_secs = wait.as_secs(),
                "Waiting for next run"
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = &mut shutdown => {
                    tracing::info!(job_id = %job.id, "Scheduler stopped");
                    return Ok(());
                }
            }

            // Persist the advanced schedule first so a crash mid-run does not repeat it
            job.mark_started(self.clock.now());
            self.store.save_job(&job).await?;

            match task.run().await {
                Ok(()) => {}
                Err(failure) if failure.fatal => {
                    tracing::error!(job_id = %job.id, error = %failure.message, "Fatal task failure");
                    return Err(SchedulerError::Fatal(failure.message));
                }
                Err(failure) => {
                    tracing::error!(
                        job_id = %job.id,
                        error = %failure.message,
                        next_run_at = %job.next_run_at,
                        "Scheduled run failed"
                    );
                }
            }
        }
    }
}
