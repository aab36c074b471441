use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Duration in seconds from `ffprobe -show_entries format=duration -of json`.
pub fn parse_duration_json(stdout: &[u8]) -> Result<f64> {
    let v: serde_json::Value =
        serde_json::from_slice(stdout).context("ffprobe output is not JSON")?;
    let raw = v["format"]["duration"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("ffprobe output has no format.duration"))?;
    let secs: f64 = raw
        .parse()
        .with_context(|| format!("unparseable duration {raw:?}"))?;
    Ok(secs)
}

pub(crate) fn probe_duration_seconds(ffprobe: &str, path: &Path) -> Result<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("failed to run {} for {}", ffprobe, path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    parse_duration_json(&output.stdout)
        .with_context(|| format!("probing duration of {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration() {
        let out = br#"{ "format": { "duration": "93.480000" } }"#;
        assert!((parse_duration_json(out).unwrap() - 93.48).abs() < 1e-9);
    }

    #[test]
    fn missing_duration_is_error() {
        assert!(parse_duration_json(br#"{ "format": {} }"#).is_err());
        assert!(parse_duration_json(b"N/A").is_err());
    }
}
