use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::{RetryPolicy, MAX_RETRIES, RETRIABLE_STATUS_CODES};

/// Resumable uploads require chunk sizes in multiples of this.
pub const CHUNK_GRANULARITY: u64 = 256 * 1024;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// HTTP statuses treated as transient server errors.
    pub retriable_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            retriable_status_codes: RETRIABLE_STATUS_CODES.to_vec(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retriable_status_codes: self.retriable_status_codes.clone(),
        }
    }
}

/// Upload endpoint, chunking and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Resumable upload endpoint (videos.insert).
    pub endpoint: String,
    /// Bytes per PUT; 0 sends the whole file in one request.
    pub chunk_size_bytes: u64,
    pub connect_timeout_secs: u64,
    /// Deadline for one chunk round-trip. Expiry is retried like any transport error.
    pub chunk_timeout_secs: u64,
    /// Directory holding `<channel>.json` credential files.
    /// Defaults to `~/.config/vpost/channels`.
    pub credentials_dir: Option<PathBuf>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/upload/youtube/v3/videos".to_string(),
            chunk_size_bytes: 32 * CHUNK_GRANULARITY,
            connect_timeout_secs: 30,
            chunk_timeout_secs: 300,
            credentials_dir: None,
        }
    }
}

impl UploadConfig {
    /// Chunk size rounded down to the protocol granularity; `None` = single request.
    pub fn effective_chunk_size(&self) -> Option<u64> {
        if self.chunk_size_bytes == 0 {
            return None;
        }
        let rounded = self.chunk_size_bytes / CHUNK_GRANULARITY * CHUNK_GRANULARITY;
        Some(rounded.max(CHUNK_GRANULARITY))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }

    pub fn credentials_dir(&self) -> Result<PathBuf> {
        match &self.credentials_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let xdg_dirs = xdg::BaseDirectories::new()?;
                Ok(xdg_dirs.get_config_home().join("vpost").join("channels"))
            }
        }
    }
}

/// ffmpeg/ffprobe binaries and effect parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
    /// Audio sample rate for intermediate and final audio.
    pub sampling_rate: u32,
    /// Pitch multiplier applied to the voice track (duration unchanged).
    pub pitch_factor: f64,
    /// `afir` dry/wet gains for the convolution reverb.
    pub reverb_dry: f64,
    pub reverb_wet: f64,
    /// Gain applied to the normalized background music.
    pub music_volume: f64,
    /// Fade-in/out length of the background music.
    pub music_fade_secs: f64,
    pub fps: u32,
    pub threads: u32,
    /// libx264 preset.
    pub preset: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            sampling_rate: 44100,
            pitch_factor: 0.6,
            reverb_dry: 10.0,
            reverb_wet: 10.0,
            music_volume: 0.03,
            music_fade_secs: 1.0,
            fps: 24,
            threads: 4,
            preset: "ultrafast".to_string(),
        }
    }
}

/// Global configuration loaded from `~/.config/vpost/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VpostConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vpost")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VpostConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VpostConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: VpostConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = VpostConfig::default();
        assert_eq!(cfg.retry.max_retries, 10);
        assert_eq!(cfg.retry.retriable_status_codes, vec![500, 502, 503, 504]);
        assert_eq!(cfg.upload.chunk_timeout_secs, 300);
        assert_eq!(cfg.media.sampling_rate, 44100);
        assert!((cfg.media.pitch_factor - 0.6).abs() < 1e-9);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = VpostConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: VpostConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.retry.max_retries, cfg.retry.max_retries);
        assert_eq!(parsed.upload.endpoint, cfg.upload.endpoint);
        assert_eq!(parsed.media.preset, cfg.media.preset);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: VpostConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.retry.max_retries, 10);
        assert_eq!(cfg.media.fps, 24);
        assert!(cfg.upload.credentials_dir.is_none());
    }

    #[test]
    fn config_toml_partial_sections() {
        let toml = r#"
            [retry]
            max_retries = 3

            [upload]
            endpoint = "http://127.0.0.1:8080/upload"
            chunk_size_bytes = 1000000
            credentials_dir = "/srv/vpost/channels"

            [media]
            pitch_factor = 0.8
        "#;
        let cfg: VpostConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.retry.retriable_status_codes, vec![500, 502, 503, 504]);
        assert_eq!(cfg.upload.endpoint, "http://127.0.0.1:8080/upload");
        assert_eq!(cfg.upload.chunk_timeout_secs, 300);
        assert_eq!(
            cfg.upload.credentials_dir.as_deref(),
            Some(std::path::Path::new("/srv/vpost/channels"))
        );
        assert!((cfg.media.pitch_factor - 0.8).abs() < 1e-9);
        assert_eq!(cfg.media.ffmpeg, "ffmpeg");
    }

    #[test]
    fn chunk_size_rounds_to_granularity() {
        let mut up = UploadConfig {
            chunk_size_bytes: 1_000_000,
            ..UploadConfig::default()
        };
        assert_eq!(up.effective_chunk_size(), Some(3 * CHUNK_GRANULARITY));
        up.chunk_size_bytes = 10;
        assert_eq!(up.effective_chunk_size(), Some(CHUNK_GRANULARITY));
        up.chunk_size_bytes = 0;
        assert_eq!(up.effective_chunk_size(), None);
    }

    #[test]
    fn retry_config_builds_policy() {
        let rc = RetryConfig {
            max_retries: 4,
            retriable_status_codes: vec![503],
        };
        let p = rc.policy();
        assert_eq!(p.max_retries, 4);
        assert_eq!(p.retriable_status_codes, vec![503]);
    }
}
