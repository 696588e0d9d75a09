//! Run command - scheduled posting loop

use anyhow::{Context, Result};
use media_bot_adapters::{
    catalog::FilesystemCatalogRepo, jobs::SqliteJobStore, mastodon::StubPublisher,
};
use media_bot_domain::{
    BlockList, CycleReport, MediaPublisher, SystemClock, ThreadRandom,
    usecases::{PostCycle, PostCycleConfig, PostingContext, PostingTask, Scheduler, SchedulerConfig},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::args::RunArgs;
use crate::commands::build_publisher;
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    config.validate()?;
    let dry_run = args.dry_run || config.general.dry_run;

    tracing::info!(
        dry_run = dry_run,
        once = args.once,
        content_dir = %config.general.content_dir.display(),
        interval_secs = config.schedule.interval_secs,
        "Starting media-bot run"
    );

    let catalog_repo = Arc::new(
        FilesystemCatalogRepo::new(&config.general.content_dir)
            .context("Failed to initialize content catalog")?,
    );

    // Dry runs make no remote calls
    let publisher: Arc<dyn MediaPublisher> = if dry_run {
        Arc::new(StubPublisher::new())
    } else {
        build_publisher(&config)?
    };
    tracing::info!(platform = publisher.platform(), "Publisher ready");

    // Stub media ids mean nothing to a real instance
    let persist_media_ids = publisher.platform() != StubPublisher::PLATFORM;

    let cooldown = i64::try_from(config.posting.cooldown_secs)
        .context("posting.cooldown_secs is out of range")?;
    let context = PostingContext::new(BlockList::new(time::Duration::seconds(cooldown)));

    let cycle = PostCycle::new(
        catalog_repo,
        publisher,
        Arc::new(SystemClock),
        Arc::new(ThreadRandom),
        PostCycleConfig {
            dry_run,
            max_selection_attempts: config.posting.max_selection_attempts,
            persist_media_ids,
        },
    );

    if args.once {
        let mut context = context;
        let report = cycle
            .run_once(&mut context)
            .await
            .context("Posting cycle failed")?;
        print_report(&report, persist_media_ids);
        return Ok(());
    }

    let job_store = Arc::new(
        SqliteJobStore::new(&config.general.job_store_path)
            .await
            .context("Failed to initialize SQLite job store")?,
    );

    let scheduler = Scheduler::new(
        job_store,
        Arc::new(SystemClock),
        SchedulerConfig {
            job_id: config.schedule.job_id.clone(),
            interval: Duration::from_secs(config.schedule.interval_secs),
        },
    );
    if args.reset_schedule {
        scheduler
            .reset()
            .await
            .context("Failed to reset persisted schedule")?;
    }
    let mut task = PostingTask::new(cycle, context);

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    scheduler
        .run(&mut task, shutdown)
        .await
        .context("Scheduler stopped")?;

    tracing::info!("media-bot run completed");
    Ok(())
}

fn print_report(report: &CycleReport, persist_media_ids: bool) {
    for skipped in &report.skipped {
        println!("Skipped {}: {}", skipped.key, skipped.reason);
    }

    if report.dry_run {
        println!("Dry run: would post {}", report.key);
    } else {
        match report.status_url {
            Some(ref url) => println!("Posted {}: {}", report.key, url),
            None => println!(
                "Posted {} (status {})",
                report.key,
                report.status_id.as_deref().unwrap_or("unknown")
            ),
        }
        if persist_media_ids && report.uploaded && !report.media_id_cached {
            println!("Warning: media id could not be saved, the file will be uploaded again");
        }
    }

    if report.block_list_cleared {
        println!("Every entry was on cooldown; the block list was cleared");
    }

    println!();
    println!("{}", report.status_text);
}
