//! `vpost merge` – join videos with an intro and print the chapter listing.

use anyhow::Result;
use std::path::PathBuf;
use vpost_core::config::VpostConfig;
use vpost_core::media::{FfmpegEngine, MediaEngine};

pub async fn run_merge(
    cfg: &VpostConfig,
    videos: Vec<PathBuf>,
    intro: PathBuf,
    output: PathBuf,
) -> Result<()> {
    let engine = FfmpegEngine::new(cfg.media.clone());
    let listing = tokio::task::spawn_blocking(move || engine.merge(&videos, &intro, &output))
        .await
        .map_err(|e| anyhow::anyhow!("merge task failed: {}", e))??;
    print!("{}", listing);
    Ok(())
}
