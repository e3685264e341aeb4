//! Technical metadata probing.
//!
//! The pipeline only depends on the [`MetadataProbe`] contract: given a
//! path, return duration/dimensions/codec or nothing. [`FfprobeProbe`]
//! implements it by shelling out to `ffprobe`; every failure mode (missing
//! binary, unreadable stream, no video track) yields `None` rather than an
//! error, so a failed probe never aborts a scan.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::media::VideoMetadata;

/// Contract for technical metadata extraction.
pub trait MetadataProbe: Send + Sync {
    /// Probe a file for video metadata. Returns `None` on any failure.
    fn probe(&self, path: &Path) -> Option<VideoMetadata>;
}

/// A probe that never returns metadata.
///
/// Used when probing is disabled and as a stand-in for tests; quality
/// scoring falls back to filename resolution tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProbe;

impl MetadataProbe for NullProbe {
    fn probe(&self, _path: &Path) -> Option<VideoMetadata> {
        None
    }
}

/// ffprobe-backed metadata probe.
///
/// The executable location is explicit configuration: either a directory
/// containing the ffprobe binary, or the bare name resolved via `PATH`.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    /// Full path or bare name of the ffprobe executable.
    executable: PathBuf,
}

#[cfg(windows)]
const FFPROBE_BINARY: &str = "ffprobe.exe";
#[cfg(not(windows))]
const FFPROBE_BINARY: &str = "ffprobe";

impl FfprobeProbe {
    /// Create a probe resolving `ffprobe` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executable: PathBuf::from(FFPROBE_BINARY),
        }
    }

    /// Create a probe using the ffprobe binary inside the given directory.
    #[must_use]
    pub fn with_directory(dir: &Path) -> Self {
        Self {
            executable: dir.join(FFPROBE_BINARY),
        }
    }

    /// Run ffprobe and parse its JSON output.
    fn run(&self, path: &Path) -> Option<FfprobeOutput> {
        let output = Command::new(&self.executable)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .output();

        let output = match output {
            Ok(out) => out,
            Err(e) => {
                log::debug!(
                    "ffprobe invocation failed for {}: {}",
                    path.display(),
                    e
                );
                return None;
            }
        };

        if !output.status.success() {
            log::debug!(
                "ffprobe exited with {} for {}",
                output.status,
                path.display()
            );
            return None;
        }

        match serde_json::from_slice::<FfprobeOutput>(&output.stdout) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::debug!("unparseable ffprobe output for {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> Option<VideoMetadata> {
        let parsed = self.run(path)?;

        let video = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))?;

        // Container duration is preferred; some formats only carry it on
        // the stream.
        let duration = parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(parse_duration)
            .or_else(|| video.duration.as_deref().and_then(parse_duration))
            .unwrap_or(0.0);

        Some(VideoMetadata {
            duration,
            width: video.width.unwrap_or(0),
            height: video.height.unwrap_or(0),
            codec: video
                .codec_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok()
}

/// Subset of ffprobe's JSON document the probe cares about.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
}
