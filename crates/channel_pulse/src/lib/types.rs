use std::{fmt, path::PathBuf};

use channel_store::UploadReceipt;
use chrono::{DateTime, NaiveDate, Utc};

pub const WATCH_BASE_URL: &str = "https://www.youtube.com/watch";

/// A candidate video, normalized from whichever resolution strategy found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDescriptor {
    pub id: String,
    pub title: String,
    pub media_locator: MediaLocator,
    pub published: Option<Published>,
}

impl VideoDescriptor {
    pub const UNKNOWN_TITLE: &str = "Unknown Title";

    pub fn watch_url(&self) -> String {
        self.media_locator.watch_url()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaLocator {
    Url(String),
    Id(String),
}

impl MediaLocator {
    pub fn watch_url(&self) -> String {
        match self {
            MediaLocator::Url(url) => url.clone(),
            MediaLocator::Id(id) => format!("{WATCH_BASE_URL}?v={id}"),
        }
    }
}

/// Publication time as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    /// Calendar date with no zone attached, e.g. yt-dlp's `upload_date`
    Date(NaiveDate),
    /// Exact instant, e.g. a feed entry's `<published>` timestamp
    At(DateTime<Utc>),
}

/// A transcoded audio file on local transient storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    pub path: PathBuf,
    pub content_type: &'static str,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Standard,
    AlternateBackends,
    CookieAuthenticated,
    ExternalTool,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Standard => "standard",
            StrategyKind::AlternateBackends => "alternate-backends",
            StrategyKind::CookieAuthenticated => "cookie-authenticated",
            StrategyKind::ExternalTool => "external-tool",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionAttempt {
    pub strategy: StrategyKind,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Produced(PathBuf),
    Failed(String),
}

impl AcquisitionAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Produced(_))
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Ok(Completion),
    /// An artifact was produced but could not be stored
    Partial { artifact: String, error: String },
    Fail { attempts: Vec<AcquisitionAttempt> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Uploaded(UploadReceipt),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoVideo,
    NotFresh { video_id: String },
    RunInProgress,
}

impl RunResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, RunResult::Ok(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunResult::Ok(_) => "ok",
            RunResult::Partial { .. } => "partial",
            RunResult::Fail { .. } => "fail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url_from_id() {
        let locator = MediaLocator::Id("dQw4w9WgXcQ".into());
        assert_eq!(
            locator.watch_url(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_watch_url_passthrough() {
        let locator = MediaLocator::Url("https://youtu.be/dQw4w9WgXcQ".into());
        assert_eq!(locator.watch_url(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_run_result_labels() {
        assert_eq!(
            RunResult::Ok(Completion::Skipped(SkipReason::NoVideo)).label(),
            "ok"
        );
        assert_eq!(
            RunResult::Partial {
                artifact: "a.mp3".into(),
                error: "boom".into()
            }
            .label(),
            "partial"
        );
        assert_eq!(RunResult::Fail { attempts: vec![] }.label(), "fail");
    }
}
