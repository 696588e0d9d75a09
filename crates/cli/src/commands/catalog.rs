//! Catalog command - list and validate the content library

use anyhow::{Context, Result};
use media_bot_adapters::catalog::FilesystemCatalogRepo;
use media_bot_domain::CatalogRepo;
use std::path::PathBuf;

use crate::args::{CatalogArgs, CatalogCommands};
use crate::config::AppConfig;

pub async fn execute(args: CatalogArgs, config_path: Option<PathBuf>) -> Result<()> {
    match args.command {
        CatalogCommands::List { content_dir, json } => {
            list_catalog(content_dir, json, config_path).await
        }
        CatalogCommands::Validate { content_dir } => {
            validate_catalog(content_dir, config_path).await
        }
    }
}

/// Resolve the content directory from the flag, falling back to configuration
pub(crate) fn resolve_content_dir(
    content_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<PathBuf> {
    match content_dir {
        Some(dir) => Ok(dir),
        None => Ok(AppConfig::load(config_path.as_deref())?.general.content_dir),
    }
}

async fn list_catalog(
    content_dir: Option<PathBuf>,
    json: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let dir = resolve_content_dir(content_dir, config_path)?;

    let repo =
        FilesystemCatalogRepo::new(&dir).context("Failed to initialize content catalog")?;
    let catalog = repo.load().await.context("Failed to load catalog")?;

    if json {
        let output = serde_json::json!({
            "count": catalog.len(),
            "entries": catalog.descriptors().map(|d| serde_json::json!({
                "key": d.key,
                "media_file": d.media_file,
                "media_description": d.media_description,
                "content_warning": d.content_warning.enabled,
                "media_id": d.media_id,
                "metadata_path": d.metadata_path,
            })).collect::<Vec<_>>(),
            "skipped": catalog.skipped(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Content Catalog ({} entries)", catalog.len());
        println!("=======================");
        println!();

        for descriptor in catalog.descriptors() {
            println!("Key: {}", descriptor.key);
            println!("  Media: {}", descriptor.media_file.display());
            if descriptor.content_warning.enabled {
                println!("  Content warning: {}", descriptor.content_warning.note);
            }
            match descriptor.media_id {
                Some(ref id) => println!("  Media id: {}", id),
                None => println!("  Media id: (not uploaded)"),
            }
            println!();
        }

        if !catalog.skipped().is_empty() {
            println!("Skipped ({})", catalog.skipped().len());
            for skipped in catalog.skipped() {
                println!("  {}: {}", skipped.key, skipped.reason);
            }
        }
    }

    Ok(())
}

async fn validate_catalog(content_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let dir = resolve_content_dir(content_dir, config_path)?;

    println!("Validating catalog in: {}", dir.display());

    let result = match FilesystemCatalogRepo::new(&dir) {
        Ok(repo) => repo.load().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(catalog) if catalog.skipped().is_empty() => {
            println!("✓ Validation passed ({} entries)", catalog.len());
            Ok(())
        }
        Ok(catalog) => {
            for skipped in catalog.skipped() {
                eprintln!(
                    "✗ {} ({}): {}",
                    skipped.key,
                    skipped.metadata_path.display(),
                    skipped.reason
                );
            }
            eprintln!(
                "✗ Validation failed ({} entries, {} skipped)",
                catalog.len(),
                catalog.skipped().len()
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("✗ Validation failed: {}", e);
            std::process::exit(1);
        }
    }
}
