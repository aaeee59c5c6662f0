use std::sync::{Arc, Mutex};

use channel_pulse::{
    parser::{parse_flat_listing, parse_video_info, VideoInfo},
    yt::VideoExtractor,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractorCall {
    Listing(String),
    Details(String),
}

#[derive(Clone)]
pub struct MockExtractor {
    pub listing: String,
    pub details: String,
    pub fail_listing: Option<String>,
    pub fail_details: Option<String>,
    pub calls: Arc<Mutex<Vec<ExtractorCall>>>,
}

impl MockExtractor {
    pub fn new(listing: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            listing: listing.into(),
            details: details.into(),
            fail_listing: None,
            fail_details: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn from_fixtures() -> Self {
        Self::new(
            include_str!("../fixtures/flat_listing.json"),
            include_str!("../fixtures/video_details.json"),
        )
    }

    pub fn failing_listing(msg: &str) -> Self {
        Self {
            fail_listing: Some(msg.to_string()),
            ..Self::from_fixtures()
        }
    }

    pub fn failing_details(msg: &str) -> Self {
        Self {
            fail_details: Some(msg.to_string()),
            ..Self::from_fixtures()
        }
    }

    /// Details fixture with its upload date moved to `yyyymmdd`
    pub fn published_on(yyyymmdd: &str) -> Self {
        let details = include_str!("../fixtures/video_details.json")
            .replace("\"upload_date\": \"20240501\"", &format!("\"upload_date\": \"{yyyymmdd}\""));
        Self::new(include_str!("../fixtures/flat_listing.json"), details)
    }
}

impl VideoExtractor for MockExtractor {
    async fn flat_listing(&self, channel_url: &str, _limit: usize) -> anyhow::Result<Vec<VideoInfo>> {
        self.calls
            .lock()
            .unwrap()
            .push(ExtractorCall::Listing(channel_url.to_string()));
        if let Some(ref msg) = self.fail_listing {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(parse_flat_listing(&self.listing)?)
    }

    async fn video_details(&self, video_url: &str) -> anyhow::Result<VideoInfo> {
        self.calls
            .lock()
            .unwrap()
            .push(ExtractorCall::Details(video_url.to_string()));
        if let Some(ref msg) = self.fail_details {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(parse_video_info(&self.details)?)
    }
}
