//! `vpost post-process` – render one finished clip with ffmpeg.

use anyhow::Result;
use vpost_core::config::VpostConfig;
use vpost_core::media::{FfmpegEngine, MediaEngine, PostProcessJob};

pub async fn run_post_process(cfg: &VpostConfig, job: PostProcessJob) -> Result<()> {
    let engine = FfmpegEngine::new(cfg.media.clone());
    let output = tokio::task::spawn_blocking(move || engine.post_process(&job))
        .await
        .map_err(|e| anyhow::anyhow!("post-processing task failed: {}", e))??;
    println!("{}", output.display());
    Ok(())
}
