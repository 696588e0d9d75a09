//! Command implementations

pub mod catalog;
pub mod config;
pub mod doctor;
pub mod preview;
pub mod run;

use anyhow::{Context, Result, bail};
use media_bot_adapters::mastodon::{MastodonClient, StubPublisher};
use media_bot_domain::MediaPublisher;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;

/// Read a credential from the environment variable named by `env_var`
pub(crate) fn load_access_token(env_var: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No access token env var configured for mastodon");
    }

    let token = std::env::var(env_var)
        .with_context(|| format!("Missing access token env var {} for mastodon", env_var))?;

    if token.trim().is_empty() {
        bail!("Access token env var {} is empty", env_var);
    }

    Ok(SecretString::new(token.into()))
}

/// Build the publisher selected by `general.publisher`
pub(crate) fn build_publisher(config: &AppConfig) -> Result<Arc<dyn MediaPublisher>> {
    match config.general.publisher.trim() {
        "mastodon" => {
            let token = load_access_token(&config.mastodon.access_token_env)?;
            let client = MastodonClient::new(
                config.mastodon.base_url.clone(),
                token,
                Duration::from_secs(config.mastodon.timeout_secs),
            )
            .context("Failed to initialize Mastodon client")?;
            Ok(Arc::new(client))
        }
        "stub" => Ok(Arc::new(StubPublisher::new())),
        other => bail!("Unknown publisher: {}", other),
    }
}
