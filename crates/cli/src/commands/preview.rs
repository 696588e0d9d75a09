//! Preview command - render the status text for one entry

use anyhow::{Context, Result, bail};
use media_bot_adapters::catalog::FilesystemCatalogRepo;
use media_bot_domain::{CatalogRepo, usecases::render_status_text};
use std::path::PathBuf;

use crate::args::PreviewArgs;
use crate::commands::catalog::resolve_content_dir;

pub async fn execute(args: PreviewArgs, config_path: Option<PathBuf>) -> Result<()> {
    let dir = resolve_content_dir(args.content_dir, config_path)?;

    let repo =
        FilesystemCatalogRepo::new(&dir).context("Failed to initialize content catalog")?;
    let catalog = repo.load().await.context("Failed to load catalog")?;

    let Some(descriptor) = catalog.get(&args.key) else {
        if let Some(skipped) = catalog.skipped().iter().find(|s| s.key == args.key) {
            bail!("Entry {} is skipped: {}", args.key, skipped.reason);
        }
        bail!("No entry with key {} in {}", args.key, dir.display());
    };

    if descriptor.content_warning.enabled {
        println!("CW: {}", descriptor.content_warning.note);
        println!();
    }
    println!("{}", render_status_text(descriptor));

    Ok(())
}
