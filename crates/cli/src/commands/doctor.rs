//! Doctor command - validate configuration and show status

use anyhow::Result;
use media_bot_adapters::{catalog::FilesystemCatalogRepo, jobs::SqliteJobStore};
use media_bot_domain::{CatalogRepo, JobStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    content: CheckResult,
    credential: CheckResult,
    job_store: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        content: CheckResult::error("Not checked"),
        credential: CheckResult::error("Not checked"),
        job_store: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.content = check_content(&config.general.content_dir).await;
        report.credential = check_credential(config);
        report.job_store =
            check_job_store(&config.general.job_store_path, &config.schedule.job_id).await;
    }

    let checks = [
        &report.config,
        &report.content,
        &report.credential,
        &report.job_store,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_content(dir: &Path) -> CheckResult {
    let repo = match FilesystemCatalogRepo::new(dir) {
        Ok(r) => r,
        Err(e) => return CheckResult::error(e.to_string()),
    };

    match repo.load().await {
        Ok(catalog) if catalog.is_empty() => {
            CheckResult::error(format!("No postable entries in {}", dir.display()))
        }
        Ok(catalog) => {
            let details = serde_json::json!({
                "count": catalog.len(),
                "keys": catalog.keys(),
                "skipped": catalog.skipped(),
            });
            if catalog.skipped().is_empty() {
                CheckResult::ok(format!("{} entries loaded", catalog.len())).with_details(details)
            } else {
                CheckResult::warn(format!(
                    "{} entries loaded, {} skipped",
                    catalog.len(),
                    catalog.skipped().len()
                ))
                .with_details(details)
            }
        }
        Err(e) => CheckResult::error(format!("Failed to load catalog: {}", e)),
    }
}

fn check_credential(config: &AppConfig) -> CheckResult {
    match config.general.publisher.trim() {
        "stub" => return CheckResult::ok("Publisher: stub (offline)"),
        "mastodon" => {}
        other => return CheckResult::error(format!("Unknown publisher: {}", other)),
    }

    let env_var = &config.mastodon.access_token_env;
    if env_var.is_empty() {
        return CheckResult::error("No access token env var configured");
    }

    // Only report presence, never the value
    match std::env::var(env_var) {
        Ok(val) if !val.trim().is_empty() => CheckResult::ok(format!(
            "Instance: {}, Access token: {} (set)",
            config.mastodon.base_url, env_var
        )),
        _ => CheckResult::error(format!(
            "Instance: {}, Access token: {} (not set)",
            config.mastodon.base_url, env_var
        )),
    }
}

async fn check_job_store(path: &Path, job_id: &str) -> CheckResult {
    if !path.exists() {
        return CheckResult::warn(format!(
            "Job store {} will be created on first run",
            path.display()
        ));
    }

    let store = match SqliteJobStore::new(path).await {
        Ok(s) => s,
        Err(e) => return CheckResult::error(format!("Failed to open job store: {}", e)),
    };

    match store.get_job(job_id).await {
        Ok(Some(job)) => {
            let next_run_at = job
                .next_run_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| job.next_run_at.to_string());
            CheckResult::ok(format!("Job {} next runs at {}", job.id, next_run_at)).with_details(
                serde_json::json!({
                    "interval_secs": job.interval_secs,
                    "next_run_at": next_run_at,
                }),
            )
        }
        Ok(None) => CheckResult::ok(format!(
            "Job store {} has no {} job yet",
            path.display(),
            job_id
        )),
        Err(e) => CheckResult::error(format!("Failed to read job store: {}", e)),
    }
}

fn print_report(report: &DoctorReport) {
    println!("media-bot Doctor Report");
    println!("=======================");
    println!();

    print_check("Config", &report.config);
    print_check("Content", &report.content);
    print_check("Credential", &report.credential);
    print_check("Job Store", &report.job_store);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: media-bot run --dry-run --once");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
