//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub posting: PostingConfig,

    #[serde(default)]
    pub mastodon: MastodonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    #[serde(default = "default_job_store_path")]
    pub job_store_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub dry_run: bool,

    /// Publisher backend: "mastodon" or "stub"
    #[serde(default = "default_publisher")]
    pub publisher: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_job_id")]
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingConfig {
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    #[serde(default = "default_max_selection_attempts")]
    pub max_selection_attempts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    #[serde(default = "default_mastodon_base_url")]
    pub base_url: String,

    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_content_dir() -> PathBuf {
    PathBuf::from("./content/")
}

fn default_job_store_path() -> PathBuf {
    PathBuf::from("./jobs.sqlite3")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_publisher() -> String {
    "mastodon".to_string()
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_job_id() -> String {
    "post".to_string()
}

fn default_cooldown_secs() -> u64 {
    6 * 3600
}

fn default_max_selection_attempts() -> usize {
    1000
}

fn default_mastodon_base_url() -> String {
    "https://botsin.space".to_string()
}

fn default_access_token_env() -> String {
    "MASTODON_ACCESS_TOKEN".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            job_store_path: default_job_store_path(),
            log_level: default_log_level(),
            dry_run: false,
            publisher: default_publisher(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            job_id: default_job_id(),
        }
    }
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            max_selection_attempts: default_max_selection_attempts(),
        }
    }
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            base_url: default_mastodon_base_url(),
            access_token_env: default_access_token_env(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Legacy environment names and the config keys they override
const LEGACY_ENV: &[(&str, &str)] = &[
    ("CONTENT_DIR_PATH", "general.content_dir"),
    ("MASTODON_API_URL", "mastodon.base_url"),
    ("SQLITE_URL", "general.job_store_path"),
];

/// Upper bound for the schedule interval and the posting cooldown
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 3600;

/// Extract a filesystem path from a SQLite URL or a plain path.
///
/// `sqlite:///jobs.sqlite3` is relative and `sqlite:////var/jobs.sqlite3` absolute.
pub fn parse_sqlite_url(url: &str) -> PathBuf {
    let url = url.trim();
    let rest = url
        .strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    // Drop connection parameters such as ?mode=rwc
    let rest = rest.split('?').next().unwrap_or(rest);

    PathBuf::from(rest)
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(config_path, |name| std::env::var(name).ok())
    }

    /// Load configuration, resolving legacy variables through `lookup`
    pub fn load_with_env<F>(config_path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder();

        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MEDIA_BOT")
                .separator("__")
                .try_parsing(true),
        );

        for &(name, key) in LEGACY_ENV {
            let value = lookup(name).filter(|v| !v.trim().is_empty());
            let value = match (name, value) {
                ("SQLITE_URL", Some(url)) => Some(parse_sqlite_url(&url).display().to_string()),
                (_, value) => value,
            };
            builder = builder
                .set_override_option(key, value)
                .with_context(|| format!("Invalid value in {}", name))?;
        }

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Reject durations that cannot be scheduled
    pub fn validate(&self) -> Result<()> {
        let interval = self.schedule.interval_secs;
        if interval == 0 || interval > MAX_DURATION_SECS {
            anyhow::bail!(
                "schedule.interval_secs must be between 1 and {}, got {}",
                MAX_DURATION_SECS,
                interval
            );
        }

        let cooldown = self.posting.cooldown_secs;
        if cooldown > MAX_DURATION_SECS {
            anyhow::bail!(
                "posting.cooldown_secs must be at most {}, got {}",
                MAX_DURATION_SECS,
                cooldown
            );
        }

        Ok(())
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# media-bot configuration
# Legacy variables CONTENT_DIR_PATH, MASTODON_API_URL and SQLITE_URL
# override the matching keys below.

[general]
content_dir = "./content/"
job_store_path = "./jobs.sqlite3"
log_level = "info"
dry_run = false
publisher = "mastodon"  # mastodon, stub

[schedule]
interval_secs = 3600
job_id = "post"

[posting]
# A posted entry is not picked again for this long
cooldown_secs = 21600
max_selection_attempts = 1000

[mastodon]
base_url = "https://botsin.space"
access_token_env = "MASTODON_ACCESS_TOKEN"
timeout_secs = 30
"#
        .to_string()
    }
}
