//! [`MediaEngine`] backed by the ffmpeg and ffprobe binaries.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::filters::{self, EffectParams};
use super::probe::probe_duration_seconds;
use super::{MediaEngine, PostProcessJob};
use crate::config::MediaConfig;

#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    cfg: MediaConfig,
}

impl FfmpegEngine {
    pub fn new(cfg: MediaConfig) -> Self {
        Self { cfg }
    }

    fn effect_params(&self, job: &PostProcessJob) -> EffectParams {
        EffectParams {
            sampling_rate: self.cfg.sampling_rate,
            pitch_factor: job.pitch_factor.unwrap_or(self.cfg.pitch_factor),
            reverb_dry: self.cfg.reverb_dry,
            reverb_wet: self.cfg.reverb_wet,
            music_volume: self.cfg.music_volume,
            music_fade_secs: self.cfg.music_fade_secs,
        }
    }

    /// Video encoder arguments shared by every rendering step.
    fn encode_args(&self) -> Vec<OsString> {
        [
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            self.cfg.preset.clone(),
            "-r".to_string(),
            self.cfg.fps.to_string(),
            "-threads".to_string(),
            self.cfg.threads.to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }

    fn run(&self, step: &str, args: Vec<OsString>) -> Result<()> {
        tracing::debug!(step, ?args, "running ffmpeg");
        let output = Command::new(&self.cfg.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(&args)
            .output()
            .with_context(|| format!("failed to run {} ({step})", self.cfg.ffmpeg))?;
        if !output.status.success() {
            anyhow::bail!(
                "ffmpeg {step} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    fn cut_args(&self, job: &PostProcessJob, out: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            job.style_video.clone().into(),
            "-i".into(),
            job.source_video.clone().into(),
            "-filter_complex".into(),
            filters::cut_graph(&job.cuts).into(),
            "-map".into(),
            "[vout]".into(),
            "-map".into(),
            "[aout]".into(),
        ];
        args.extend(self.encode_args());
        args.push(out.into());
        args
    }

    fn effects_args(&self, job: &PostProcessJob, clip: &Path, duration: f64, out: &Path) -> Vec<OsString> {
        let params = self.effect_params(job);
        vec![
            "-i".into(),
            clip.into(),
            "-i".into(),
            job.impulse_response.clone().into(),
            "-stream_loop".into(),
            "-1".into(),
            "-i".into(),
            job.background_music.clone().into(),
            "-filter_complex".into(),
            filters::effects_graph(&params, duration).into(),
            "-map".into(),
            "[mix]".into(),
            "-ar".into(),
            self.cfg.sampling_rate.to_string().into(),
            "-ac".into(),
            "2".into(),
            "-c:a".into(),
            "pcm_s32le".into(),
            out.into(),
        ]
    }

    fn mux_args(&self, clip: &Path, audio: &Path, out: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            clip.into(),
            "-i".into(),
            audio.into(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-shortest".into(),
        ];
        args.extend(self.encode_args());
        args.push(out.into());
        args
    }

    fn validate(&self, job: &PostProcessJob) -> Result<()> {
        if job.cuts.is_empty() {
            anyhow::bail!("at least one cut range is required");
        }
        let factor = job.pitch_factor.unwrap_or(self.cfg.pitch_factor);
        if !(factor.is_finite() && factor > 0.0) {
            anyhow::bail!("pitch factor must be positive, got {factor}");
        }
        for input in [
            &job.source_video,
            &job.style_video,
            &job.background_music,
            &job.impulse_response,
        ] {
            if !input.is_file() {
                anyhow::bail!("input {} does not exist", input.display());
            }
        }
        Ok(())
    }
}

impl MediaEngine for FfmpegEngine {
    fn post_process(&self, job: &PostProcessJob) -> Result<PathBuf> {
        if job.output.exists() {
            tracing::info!(output = %job.output.display(), "output already exists, skipping");
            return Ok(job.output.clone());
        }
        self.validate(job)?;

        let scratch = tempfile::Builder::new()
            .prefix("vpost-")
            .tempdir()
            .context("create scratch directory")?;
        let clip = scratch.path().join("cut.mp4");
        let audio = scratch.path().join("voice_music.wav");
        let rendered = scratch.path().join("final.mp4");

        tracing::info!(cuts = job.cuts.len(), "cutting styled clip");
        self.run("cut", self.cut_args(job, &clip))?;

        let duration = probe_duration_seconds(&self.cfg.ffprobe, &clip)?;
        tracing::info!(duration, "applying pitch, reverb and background music");
        self.run("effects", self.effects_args(job, &clip, duration, &audio))?;

        tracing::info!("encoding final video");
        self.run("mux", self.mux_args(&clip, &audio, &rendered))?;

        if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::copy(&rendered, &job.output)
            .with_context(|| format!("copy result to {}", job.output.display()))?;
        tracing::info!(output = %job.output.display(), "post-processing finished");
        Ok(job.output.clone())
    }

    fn merge(&self, videos: &[PathBuf], intro: &Path, output: &Path) -> Result<String> {
        if videos.is_empty() {
            anyhow::bail!("nothing to merge");
        }
        let intro_secs = probe_duration_seconds(&self.cfg.ffprobe, intro)?;
        let mut listing = String::new();
        let mut start = 0.0;
        let mut args: Vec<OsString> = Vec::with_capacity(videos.len() * 2 + 12);
        for video in videos {
            listing.push_str(&filters::chapter_line(video, start));
            start += probe_duration_seconds(&self.cfg.ffprobe, video)? + intro_secs;
            args.push("-i".into());
            args.push(video.clone().into());
        }
        args.push("-i".into());
        args.push(intro.into());
        args.push("-filter_complex".into());
        args.push(filters::merge_graph(videos.len()).into());
        args.extend(["-map", "[vout]", "-map", "[aout]"].map(OsString::from));
        args.extend(self.encode_args());
        args.push(output.into());

        tracing::info!(videos = videos.len(), output = %output.display(), "merging videos");
        self.run("merge", args)?;
        Ok(listing)
    }
}
