//! Fast-start rewrite: move the MP4 index to the front of the file.
//!
//! Streams are copied, never re-encoded. The output lands next to the input
//! as `<input>.processing`.

use crate::services::process::{ProcessError, run_tool};
use async_trait::async_trait;
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, instrument};

pub const PROCESSING_SUFFIX: &str = ".processing";

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("remux failed: {0}")]
    Process(#[from] ProcessError),
    #[error("remux produced no output at {0}")]
    MissingOutput(PathBuf),
    #[error("cannot track output file: {0}")]
    Output(#[source] std::io::Error),
}

/// Rewrites a container so playback can start before the download finishes.
#[async_trait]
pub trait Remuxer: Send + Sync {
    async fn remux(&self, input: &Path, output: &Path) -> Result<(), TransformError>;
}

/// [`Remuxer`] backed by the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    program: String,
    timeout: Duration,
}

impl FfmpegRemuxer {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux(&self, input: &Path, output: &Path) -> Result<(), TransformError> {
        let args = [
            OsStr::new("-y"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-c"),
            OsStr::new("copy"),
            OsStr::new("-movflags"),
            OsStr::new("faststart"),
            OsStr::new("-f"),
            OsStr::new("mp4"),
            output.as_os_str(),
        ];
        run_tool(&self.program, args, self.timeout).await?;
        Ok(())
    }
}

/// Sibling path the rewritten file is written to.
pub fn processing_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(PROCESSING_SUFFIX);
    PathBuf::from(name)
}

/// Rewrite `input` for progressive playback.
///
/// The returned [`TempPath`] owns the new file and deletes it on drop. The
/// guard exists before the remuxer starts, so a half-written output is also
/// removed when the remux fails.
#[instrument(skip_all, fields(input = %input.display()))]
pub async fn rewrite_for_streaming(
    remuxer: &dyn Remuxer,
    input: &Path,
) -> Result<TempPath, TransformError> {
    let output =
        TempPath::try_from_path(processing_path(input)).map_err(TransformError::Output)?;
    remuxer.remux(input, &output).await?;

    if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
        return Err(TransformError::MissingOutput(output.to_path_buf()));
    }

    debug!(output = %output.display(), "fast-start rewrite complete");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct CopyRemuxer;

    #[async_trait]
    impl Remuxer for CopyRemuxer {
        async fn remux(&self, input: &Path, output: &Path) -> Result<(), TransformError> {
            tokio::fs::copy(input, output)
                .await
                .map_err(|err| TransformError::MissingOutput(PathBuf::from(err.to_string())))?;
            Ok(())
        }
    }

    /// Writes some bytes, then fails like a crashed ffmpeg would.
    struct PartialRemuxer;

    #[async_trait]
    impl Remuxer for PartialRemuxer {
        async fn remux(&self, _input: &Path, output: &Path) -> Result<(), TransformError> {
            tokio::fs::write(output, b"partial").await.ok();
            Err(TransformError::MissingOutput(output.to_path_buf()))
        }
    }

    struct NoopRemuxer;

    #[async_trait]
    impl Remuxer for NoopRemuxer {
        async fn remux(&self, _input: &Path, _output: &Path) -> Result<(), TransformError> {
            Ok(())
        }
    }

    #[test]
    fn processing_path_appends_suffix() {
        assert_eq!(
            processing_path(Path::new("/tmp/tubely-upload123.mp4")),
            PathBuf::from("/tmp/tubely-upload123.mp4.processing")
        );
    }

    #[tokio::test]
    async fn output_is_removed_when_guard_drops() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        fs::write(&input, b"moov+mdat").unwrap();

        let output = rewrite_for_streaming(&CopyRemuxer, &input).await.unwrap();
        let output_path = output.to_path_buf();
        assert_eq!(output_path, processing_path(&input));
        assert_eq!(fs::read(&output_path).unwrap(), b"moov+mdat");

        drop(output);
        assert!(!output_path.exists());
    }

    #[tokio::test]
    async fn partial_output_is_removed_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        fs::write(&input, b"data").unwrap();

        assert!(rewrite_for_streaming(&PartialRemuxer, &input).await.is_err());
        assert!(!processing_path(&input).exists());
    }

    #[tokio::test]
    async fn silent_remuxer_without_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        fs::write(&input, b"data").unwrap();

        let err = rewrite_for_streaming(&NoopRemuxer, &input).await.unwrap_err();
        assert!(matches!(err, TransformError::MissingOutput(_)));
    }
}
