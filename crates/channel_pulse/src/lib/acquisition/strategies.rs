use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;

use crate::{
    acquisition::{
        fallback::{FallbackRequest, FallbackTool},
        find_artifact, random_user_agent, AcquisitionRequest, AcquisitionStrategy, Jitter,
    },
    types::StrategyKind,
    yt::ytdlp::{AudioDownload, YtDlp},
};

/// Per-download network/fragment retries handed to yt-dlp
pub const DOWNLOAD_RETRIES: u8 = 3;

fn audio_download(request: &AcquisitionRequest) -> AudioDownload {
    AudioDownload::new(&request.url, request.output_template())
        .codec(&request.audio_format, request.bitrate_kbps)
        .retries(DOWNLOAD_RETRIES)
        .user_agent(random_user_agent())
        .sleep_interval(1, 3)
}

/// Best available audio with a randomized user agent.
pub struct StandardDownload {
    yt_dlp: YtDlp,
    jitter: Jitter,
}

impl StandardDownload {
    pub const DEFAULT_JITTER: Jitter = Jitter::from_secs(1, 4);

    pub fn new(yt_dlp: YtDlp) -> Self {
        StandardDownload {
            yt_dlp,
            jitter: Self::DEFAULT_JITTER,
        }
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }
}

#[async_trait]
impl AcquisitionStrategy for StandardDownload {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Standard
    }

    async fn attempt(&self, request: &AcquisitionRequest) -> anyhow::Result<()> {
        self.jitter.pause().await;
        self.yt_dlp
            .download_audio(&audio_download(request))
            .await
            .context("Standard download failed")
    }
}

/// Same download routed through each of yt-dlp's alternate player clients in
/// turn, stopping at the first that exits cleanly.
pub struct AlternateBackends {
    yt_dlp: YtDlp,
    backends: Vec<String>,
    jitter: Jitter,
}

impl AlternateBackends {
    pub const DEFAULT_BACKENDS: [&str; 4] = ["android", "ios", "mweb", "tv_embedded"];
    pub const DEFAULT_JITTER: Jitter = Jitter::from_secs(3, 10);

    pub fn new(yt_dlp: YtDlp) -> Self {
        AlternateBackends {
            yt_dlp,
            backends: Self::DEFAULT_BACKENDS.map(String::from).to_vec(),
            jitter: Self::DEFAULT_JITTER,
        }
    }

    pub fn with_backends<I, S>(mut self, backends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backends = backends.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }
}

#[async_trait]
impl AcquisitionStrategy for AlternateBackends {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AlternateBackends
    }

    async fn attempt(&self, request: &AcquisitionRequest) -> anyhow::Result<()> {
        let mut last_error = None;

        for backend in &self.backends {
            self.jitter.pause().await;
            let download = audio_download(request).player_client(backend);
            let result = self.yt_dlp.download_audio(&download).await;

            // a clean exit only counts once the file is on disk
            if find_artifact(&request.output_dir, &request.file_stem, &request.audio_format).is_some() {
                tracing::info!(%backend, "Alternate backend succeeded");
                return Ok(());
            }

            let error = match result {
                Ok(()) => anyhow::anyhow!("Backend {backend} exited cleanly without producing a file"),
                Err(e) => anyhow::Error::new(e).context(format!("Backend {backend} failed")),
            };
            tracing::warn!(%backend, error = %error, "Alternate backend failed");
            last_error = Some(error);
        }

        match last_error {
            Some(e) => Err(e.context("Every alternate backend failed")),
            None => anyhow::bail!("No alternate backends configured"),
        }
    }
}

/// Standard download authenticated with a browser session's cookie jar.
pub struct CookieAuthenticated {
    yt_dlp: YtDlp,
    cookies_path: PathBuf,
    browsers: Vec<String>,
    jitter: Jitter,
}

impl CookieAuthenticated {
    pub const DEFAULT_BROWSERS: [&str; 5] = ["chrome", "firefox", "edge", "brave", "chromium"];

    pub fn new(yt_dlp: YtDlp, cookies_path: impl Into<PathBuf>) -> Self {
        CookieAuthenticated {
            yt_dlp,
            cookies_path: cookies_path.into(),
            browsers: Self::DEFAULT_BROWSERS.map(String::from).to_vec(),
            jitter: StandardDownload::DEFAULT_JITTER,
        }
    }

    pub fn with_browsers<I, S>(mut self, browsers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.browsers = browsers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn cookies_path(&self) -> &Path {
        &self.cookies_path
    }

    /// The pre-extracted jar if present, else one exported from the first
    /// browser profile that yields it.
    async fn cookie_jar(&self, probe_url: &str) -> Option<&Path> {
        if self.cookies_path.is_file() {
            return Some(&self.cookies_path);
        }
        tracing::info!(path = ?self.cookies_path, "Cookie jar missing, trying browser profiles");

        for browser in &self.browsers {
            match self
                .yt_dlp
                .export_browser_cookies(browser, &self.cookies_path, probe_url)
                .await
            {
                Ok(()) if self.cookies_path.is_file() => {
                    tracing::info!(%browser, "Exported browser cookies");
                    return Some(&self.cookies_path);
                }
                Ok(()) => tracing::debug!(%browser, "Browser export wrote no cookie jar"),
                Err(e) => tracing::debug!(%browser, error = %e, "Browser cookie export failed"),
            }
        }

        None
    }
}

#[async_trait]
impl AcquisitionStrategy for CookieAuthenticated {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CookieAuthenticated
    }

    async fn attempt(&self, request: &AcquisitionRequest) -> anyhow::Result<()> {
        let jar = self
            .cookie_jar(&request.url)
            .await
            .context("No cookie jar available")?;

        self.jitter.pause().await;
        self.yt_dlp
            .download_audio(&audio_download(request).cookies(jar))
            .await
            .context("Cookie-authenticated download failed")
    }
}

/// Last resort: an external downloader with its own extraction logic.
pub struct ExternalTool<T> {
    tool: T,
}

impl<T> ExternalTool<T> {
    pub fn new(tool: T) -> Self {
        ExternalTool { tool }
    }
}

#[async_trait]
impl<T> AcquisitionStrategy for ExternalTool<T>
where
    T: FallbackTool + Send + Sync,
{
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExternalTool
    }

    async fn attempt(&self, request: &AcquisitionRequest) -> anyhow::Result<()> {
        let output_template = request.output_template();
        let fallback_request = FallbackRequest {
            url: &request.url,
            output_template: &output_template,
            audio_format: &request.audio_format,
            bitrate_kbps: request.bitrate_kbps,
        };

        self.tool
            .fetch_audio(&fallback_request)
            .await
            .context("External fallback tool failed")
    }
}
