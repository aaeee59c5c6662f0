use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::error::Error;

static CHANNEL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|/)channel/([A-Za-z0-9_-]+)").unwrap());

static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|/)@([A-Za-z0-9._-]+)").unwrap());

/// The configured channel, as either a stable channel id or a vanity handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// `/channel/<id>`; the only form a feed URL can be derived from
    Id(String),
    /// `/@<handle>`
    Handle(String),
}

impl ChannelRef {
    const BASE_URL: &str = "https://www.youtube.com";
    const FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml";

    pub fn channel_id(&self) -> Option<&str> {
        match self {
            ChannelRef::Id(id) => Some(id),
            ChannelRef::Handle(_) => None,
        }
    }

    pub fn channel_url(&self) -> String {
        match self {
            ChannelRef::Id(id) => format!("{}/channel/{id}", Self::BASE_URL),
            ChannelRef::Handle(handle) => format!("{}/@{handle}", Self::BASE_URL),
        }
    }

    /// The channel's uploads tab; listing the bare channel URL yields its
    /// tabs rather than its videos.
    pub fn videos_url(&self) -> String {
        format!("{}/videos", self.channel_url())
    }

    pub fn feed_url(&self) -> Option<String> {
        self.channel_id()
            .map(|id| format!("{}?channel_id={id}", Self::FEED_URL))
    }
}

impl FromStr for ChannelRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(id) = CHANNEL_ID_RE.captures(s).and_then(|cap| cap.get(1)) {
            return Ok(ChannelRef::Id(id.as_str().to_string()));
        }
        if let Some(handle) = HANDLE_RE.captures(s).and_then(|cap| cap.get(1)) {
            return Ok(ChannelRef::Handle(handle.as_str().to_string()));
        }

        Err(Error::ParseError(
            "Channel reference must contain /channel/<id> or /@<handle>",
        ))
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.channel_url())
    }
}
