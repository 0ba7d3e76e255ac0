//! Aspect-ratio classification of staged uploads.
//!
//! The probe step is behind the [`Prober`] trait so the ffprobe binary can be
//! swapped for an in-process implementation (or a fake in tests) without
//! touching the pipeline.

use crate::services::process::{ProcessError, run_tool};
use async_trait::async_trait;
use serde::Deserialize;
use std::{ffi::OsStr, fmt, path::Path, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument};

/// Absolute tolerance applied to `width / height`. Boundaries are inclusive.
pub const RATIO_TOLERANCE: f64 = 0.01;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("media probe failed: {0}")]
    Probe(#[from] ProcessError),
    #[error("could not parse probe output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no video stream found")]
    NoStream,
}

/// Coarse aspect class of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Landscape16x9,
    Portrait9x16,
    Other,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape16x9 => "16:9",
            Self::Portrait9x16 => "9:16",
            Self::Other => "other",
        }
    }

    /// Folder name used as the object key prefix.
    pub fn name(self) -> &'static str {
        match self {
            Self::Landscape16x9 => "landscape",
            Self::Portrait9x16 => "portrait",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown aspect ratio `{0}`")]
pub struct UnknownAspectRatio(pub String);

impl FromStr for AspectRatio {
    type Err = UnknownAspectRatio;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16:9" => Ok(Self::Landscape16x9),
            "9:16" => Ok(Self::Portrait9x16),
            "other" => Ok(Self::Other),
            _ => Err(UnknownAspectRatio(s.to_string())),
        }
    }
}

/// Classify raw stream dimensions. 16:9 is checked before 9:16.
pub fn classify_dimensions(width: u32, height: u32) -> AspectRatio {
    if height == 0 {
        return AspectRatio::Other;
    }
    let ratio = f64::from(width) / f64::from(height);
    if (ratio - 16.0 / 9.0).abs() <= RATIO_TOLERANCE {
        AspectRatio::Landscape16x9
    } else if (ratio - 9.0 / 16.0).abs() <= RATIO_TOLERANCE {
        AspectRatio::Portrait9x16
    } else {
        AspectRatio::Other
    }
}

/// The subset of ffprobe's JSON output the classifier reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl ProbeReport {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ClassifyError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// First stream that is (or may be) a video stream.
    pub fn first_video_stream(&self) -> Option<&ProbeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref().is_none_or(|t| t == "video"))
    }
}

/// Extracts stream descriptors from a media file.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, ClassifyError>;
}

/// [`Prober`] backed by the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: String,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, ClassifyError> {
        let args = [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-print_format"),
            OsStr::new("json"),
            OsStr::new("-show_streams"),
            OsStr::new("-select_streams"),
            OsStr::new("v:0"),
            path.as_os_str(),
        ];
        let output = run_tool(&self.program, args, self.timeout).await?;
        ProbeReport::from_json(&output.stdout)
    }
}

/// Probe `path` and classify its first video stream.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn classify(prober: &dyn Prober, path: &Path) -> Result<AspectRatio, ClassifyError> {
    let report = prober.probe(path).await?;
    let stream = report.first_video_stream().ok_or(ClassifyError::NoStream)?;
    let aspect = classify_dimensions(stream.width, stream.height);
    debug!(
        width = stream.width,
        height = stream.height,
        aspect = %aspect,
        "classified upload"
    );
    Ok(aspect)
}
