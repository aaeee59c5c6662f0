use std::{
    future::Future,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::process::Command;

#[derive(Debug, Clone, Copy)]
pub struct FallbackRequest<'a> {
    pub url: &'a str,
    pub output_template: &'a Path,
    pub audio_format: &'a str,
    pub bitrate_kbps: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Fallback tool timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Fallback tool exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An independently maintained downloader used as the last resort.
pub trait FallbackTool {
    fn fetch_audio(
        &self,
        request: &FallbackRequest<'_>,
    ) -> impl Future<Output = Result<(), FallbackError>> + Send;
}

/// Runs a youtube-dl compatible command line in a subprocess under a hard
/// wall-clock timeout.
#[derive(Debug, Clone)]
pub struct CommandFallbackTool {
    program: PathBuf,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl CommandFallbackTool {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandFallbackTool {
            program: program.into(),
            leading_args: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Splits a command line such as `python3 -m youtube_dl` into program and
    /// leading arguments.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl FallbackTool for CommandFallbackTool {
    #[tracing::instrument(skip(self), fields(program = %self.program.display()))]
    async fn fetch_audio(&self, request: &FallbackRequest<'_>) -> Result<(), FallbackError> {
        let child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(["--extract-audio", "--audio-format", request.audio_format])
            .arg("--audio-quality")
            .arg(format!("{}K", request.bitrate_kbps))
            .arg("--output")
            .arg(request.output_template)
            .arg(request.url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FallbackError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // dropping the child on timeout kills it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| FallbackError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(FallbackError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
