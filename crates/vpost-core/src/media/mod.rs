//! Media effects engine.
//!
//! Everything signal-related (trimming, pitch, convolution reverb, mixing,
//! encoding) is delegated to ffmpeg; this module only plans the filter
//! graphs, runs the processes and manages the scratch files between them.

mod ffmpeg;
mod filters;
mod probe;

pub use ffmpeg::FfmpegEngine;
pub use filters::{chapter_line, format_clock};
pub use probe::parse_duration_json;

use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One `[start, end)` range, in seconds, cut out of the styled video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutRange {
    pub start: f64,
    pub end: f64,
}

impl CutRange {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !(start.is_finite() && end.is_finite()) || start < 0.0 || start >= end {
            anyhow::bail!("invalid cut range {start}:{end}; need 0 <= start < end");
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl FromStr for CutRange {
    type Err = anyhow::Error;

    /// Parses `START:END` in seconds, e.g. `12.5:40`.
    fn from_str(s: &str) -> Result<Self> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("cut range {s:?} must look like START:END"))?;
        let start: f64 = a.trim().parse()?;
        let end: f64 = b.trim().parse()?;
        CutRange::new(start, end)
    }
}

impl fmt::Display for CutRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Inputs of one post-processing run.
#[derive(Debug, Clone)]
pub struct PostProcessJob {
    /// Original footage; only its audio track is used.
    pub source_video: PathBuf,
    /// Style-transferred render of the same footage; provides the frames.
    pub style_video: PathBuf,
    pub cuts: Vec<CutRange>,
    pub background_music: PathBuf,
    /// Impulse response for the convolution reverb.
    pub impulse_response: PathBuf,
    /// Overrides the configured pitch factor when set.
    pub pitch_factor: Option<f64>,
    pub output: PathBuf,
}

/// Engine that turns inputs into finished video files.
pub trait MediaEngine {
    /// Produce `job.output`. A no-op when the output already exists.
    fn post_process(&self, job: &PostProcessJob) -> Result<PathBuf>;

    /// Join `videos`, each followed by `intro`, into `output`.
    /// Returns one `Video: ... start at: h:m:s` line per input.
    fn merge(&self, videos: &[PathBuf], intro: &Path, output: &Path) -> Result<String>;
}
