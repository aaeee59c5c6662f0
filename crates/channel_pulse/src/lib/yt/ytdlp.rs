use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

use crate::{
    parser::{parse_flat_listing, parse_video_info, VideoInfo},
    yt::VideoExtractor,
};

#[derive(Debug, thiserror::Error)]
pub enum YtDlpError {
    #[error("Failed to spawn {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("yt-dlp exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("Failed to parse yt-dlp output: {0}")]
    Parse(#[from] crate::error::Error),
}

/// Thin async binding over the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    socket_timeout_secs: u32,
    cookies: Option<PathBuf>,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlp {
    const STDERR_TAIL_LINES: usize = 6;

    pub fn new(binary: impl Into<PathBuf>) -> Self {
        YtDlp {
            binary: binary.into(),
            socket_timeout_secs: 30,
            cookies: None,
        }
    }

    pub fn with_socket_timeout(mut self, secs: u32) -> Self {
        self.socket_timeout_secs = secs;
        self
    }

    /// Cookie jar attached to listing and metadata calls whenever the file
    /// exists at call time.
    pub fn with_cookies(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookies = Some(path.into());
        self
    }

    fn cookie_args(&self) -> Vec<OsString> {
        match &self.cookies {
            Some(jar) if jar.is_file() => vec!["--cookies".into(), jar.into()],
            _ => Vec::new(),
        }
    }

    fn playlist_args(&self, url: &str, limit: usize) -> Vec<OsString> {
        let mut args = self.cookie_args();
        args.extend(
            [
                "--flat-playlist",
                "--ignore-errors",
                "--playlist-end",
                limit.to_string().as_str(),
                "-J",
                url,
            ]
            .map(OsString::from),
        );
        args
    }

    fn video_args(&self, url: &str) -> Vec<OsString> {
        let mut args = self.cookie_args();
        args.extend(["-J", "--skip-download", "--no-playlist", url].map(OsString::from));
        args
    }

    /// `yt-dlp --flat-playlist -J` limited to the first `limit` entries
    #[tracing::instrument(skip(self))]
    pub async fn dump_playlist(&self, url: &str, limit: usize) -> Result<Vec<VideoInfo>, YtDlpError> {
        let stdout = self.exec(self.playlist_args(url, limit)).await?;

        Ok(parse_flat_listing(&String::from_utf8_lossy(&stdout))?)
    }

    /// Full metadata for a single video, without downloading it
    #[tracing::instrument(skip(self))]
    pub async fn dump_video(&self, url: &str) -> Result<VideoInfo, YtDlpError> {
        let stdout = self.exec(self.video_args(url)).await?;

        Ok(parse_video_info(&String::from_utf8_lossy(&stdout))?)
    }

    #[tracing::instrument(skip_all, fields(url = %download.url))]
    pub async fn download_audio(&self, download: &AudioDownload) -> Result<(), YtDlpError> {
        self.exec(download.args()).await.map(|_| ())
    }

    /// Exports `browser`'s session cookies into a Netscape cookie jar at `dest`.
    ///
    /// yt-dlp only writes the jar after a request, so `probe_url` is resolved
    /// without downloading anything.
    #[tracing::instrument(skip(self))]
    pub async fn export_browser_cookies(
        &self,
        browser: &str,
        dest: &Path,
        probe_url: &str,
    ) -> Result<(), YtDlpError> {
        let mut args: Vec<OsString> = vec!["--cookies-from-browser".into(), browser.into()];
        args.push("--cookies".into());
        args.push(dest.into());
        args.extend(["--skip-download", "--no-playlist", "--quiet", probe_url].map(OsString::from));

        self.exec(args).await.map(|_| ())
    }

    async fn exec<I, S>(&self, args: I) -> Result<Vec<u8>, YtDlpError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let output = Command::new(&self.binary)
            .arg("--socket-timeout")
            .arg(self.socket_timeout_secs.to_string())
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| YtDlpError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines = stderr.lines().collect::<Vec<_>>();
            let tail = lines[lines.len().saturating_sub(Self::STDERR_TAIL_LINES)..].join("\n");
            return Err(YtDlpError::Failed {
                status: output.status.to_string(),
                stderr: tail,
            });
        }

        Ok(output.stdout)
    }
}

impl VideoExtractor for YtDlp {
    async fn flat_listing(&self, channel_url: &str, limit: usize) -> anyhow::Result<Vec<VideoInfo>> {
        Ok(self.dump_playlist(channel_url, limit).await?)
    }

    async fn video_details(&self, video_url: &str) -> anyhow::Result<VideoInfo> {
        Ok(self.dump_video(video_url).await?)
    }
}

/// One audio extraction request: best available audio, transcoded by yt-dlp's
/// ffmpeg post-processor.
#[derive(Debug, Clone)]
pub struct AudioDownload {
    pub url: String,
    pub output_template: PathBuf,
    pub audio_format: String,
    pub audio_quality: String,
    pub retries: u8,
    pub user_agent: Option<String>,
    pub player_client: Option<String>,
    pub cookies: Option<PathBuf>,
    /// Min/max seconds yt-dlp sleeps between requests
    pub sleep_interval: Option<(u32, u32)>,
}

impl AudioDownload {
    pub fn new(url: impl Into<String>, output_template: impl Into<PathBuf>) -> Self {
        AudioDownload {
            url: url.into(),
            output_template: output_template.into(),
            audio_format: "mp3".into(),
            audio_quality: "192K".into(),
            retries: 3,
            user_agent: None,
            player_client: None,
            cookies: None,
            sleep_interval: None,
        }
    }

    pub fn codec(mut self, audio_format: impl Into<String>, bitrate_kbps: u32) -> Self {
        self.audio_format = audio_format.into();
        self.audio_quality = format!("{bitrate_kbps}K");
        self
    }

    pub fn retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn player_client(mut self, client: impl Into<String>) -> Self {
        self.player_client = Some(client.into());
        self
    }

    pub fn cookies(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookies = Some(path.into());
        self
    }

    pub fn sleep_interval(mut self, min_secs: u32, max_secs: u32) -> Self {
        self.sleep_interval = Some((min_secs, max_secs.max(min_secs)));
        self
    }

    pub fn args(&self) -> Vec<OsString> {
        let retries = self.retries.to_string();
        let mut args: Vec<OsString> = [
            "--format",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            self.audio_format.as_str(),
            "--audio-quality",
            self.audio_quality.as_str(),
            "--retries",
            retries.as_str(),
            "--fragment-retries",
            retries.as_str(),
            "--no-playlist",
            "--add-header",
            "Accept-Language:en-US,en;q=0.9",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        if let Some(user_agent) = &self.user_agent {
            args.push("--user-agent".into());
            args.push(user_agent.into());
        }
        if let Some(client) = &self.player_client {
            args.push("--extractor-args".into());
            args.push(format!("youtube:player_client={client}").into());
        }
        if let Some(cookies) = &self.cookies {
            args.push("--cookies".into());
            args.push(cookies.into());
        }
        if let Some((min, max)) = self.sleep_interval {
            args.push("--sleep-requests".into());
            args.push(min.to_string().into());
            args.push("--min-sleep-interval".into());
            args.push(min.to_string().into());
            args.push("--max-sleep-interval".into());
            args.push(max.to_string().into());
        }

        args.push("--output".into());
        args.push(self.output_template.as_os_str().to_owned());
        args.push(self.url.as_str().into());
        args
    }
}
