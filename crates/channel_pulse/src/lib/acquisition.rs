pub mod fallback;
pub mod strategies;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use rand::{seq::SliceRandom, Rng};

use crate::{
    sanitize::artifact_stem,
    types::{AcquisitionAttempt, AttemptOutcome, LocalArtifact, StrategyKind},
    VideoDescriptor,
};

/// What to fetch and where the transcoded file must land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub file_stem: String,
    pub audio_format: String,
    pub bitrate_kbps: u32,
}

impl AcquisitionRequest {
    pub const AUDIO_FORMAT: &str = "mp3";
    pub const BITRATE_KBPS: u32 = 192;

    pub fn new(descriptor: &VideoDescriptor, output_dir: impl Into<PathBuf>) -> Self {
        AcquisitionRequest {
            url: descriptor.watch_url(),
            output_dir: output_dir.into(),
            file_stem: artifact_stem(&descriptor.title, &descriptor.id),
            audio_format: Self::AUDIO_FORMAT.into(),
            bitrate_kbps: Self::BITRATE_KBPS,
        }
    }

    /// Output template in yt-dlp's `%(ext)s` convention
    pub fn output_template(&self) -> PathBuf {
        self.output_dir.join(format!("{}.%(ext)s", self.file_stem))
    }

    pub fn expected_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.file_stem, self.audio_format))
    }
}

/// One way of turning a watch URL into a local audio file.
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn attempt(&self, request: &AcquisitionRequest) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("All {} acquisition strategies failed", .attempts.len())]
    Exhausted { attempts: Vec<AcquisitionAttempt> },
}

/// Tries each strategy once, in order, until one leaves the expected file in
/// the output directory.
pub struct AcquisitionEngine {
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
}

impl AcquisitionEngine {
    pub fn new(strategies: Vec<Box<dyn AcquisitionStrategy>>) -> Self {
        AcquisitionEngine { strategies }
    }

    pub fn with_strategy(mut self, strategy: impl AcquisitionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    #[tracing::instrument(skip_all, fields(url = %request.url, stem = %request.file_stem))]
    pub async fn acquire(&self, request: &AcquisitionRequest) -> Result<LocalArtifact, AcquisitionError> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let kind = strategy.kind();
            tracing::info!(strategy = %kind, "Trying acquisition strategy");

            let result = strategy.attempt(request).await;

            // exit codes are unreliable across backends; the output directory decides
            match find_artifact(&request.output_dir, &request.file_stem, &request.audio_format) {
                Some(path) => {
                    if let Err(e) = &result {
                        tracing::warn!(strategy = %kind, error = ?e, "Strategy reported failure but produced a file");
                    }
                    let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or_default();
                    tracing::info!(strategy = %kind, path = ?path, size_bytes, "Acquired audio");

                    attempts.push(AcquisitionAttempt {
                        strategy: kind,
                        outcome: AttemptOutcome::Produced(path.clone()),
                    });
                    return Ok(LocalArtifact {
                        content_type: channel_store::content_type_for(&path),
                        path,
                        size_bytes,
                    });
                }
                None => {
                    let reason = match result {
                        Err(e) => format!("{e:#}"),
                        Ok(()) => "strategy finished without producing a file".to_string(),
                    };
                    tracing::warn!(strategy = %kind, %reason, "Acquisition strategy failed");
                    attempts.push(AcquisitionAttempt {
                        strategy: kind,
                        outcome: AttemptOutcome::Failed(reason),
                    });
                }
            }
        }

        tracing::error!(
            tried = ?attempts.iter().map(|a| a.strategy).collect::<Vec<_>>(),
            "All acquisition strategies failed"
        );
        Err(AcquisitionError::Exhausted { attempts })
    }
}

/// First file in `dir` named `<stem>*.<ext>`, by name order.
pub fn find_artifact(dir: &Path, stem: &str, ext: &str) -> Option<PathBuf> {
    let suffix = format!(".{ext}");
    let mut matches = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(stem) && name.ends_with(&suffix))
        })
        .map(|entry| entry.path())
        .collect::<Vec<_>>();

    matches.sort();
    matches.into_iter().next()
}

/// Randomized pause inserted before requests to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min: Duration,
    max: Duration,
}

impl Jitter {
    pub const NONE: Jitter = Jitter::new(Duration::ZERO, Duration::ZERO);

    pub const fn new(min: Duration, max: Duration) -> Self {
        Jitter { min, max }
    }

    pub const fn from_secs(min: u64, max: u64) -> Self {
        Jitter::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Jitter pause");
            tokio::time::sleep(delay).await;
        }
    }
}

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}
