//! # Descriptor Parser
//!
//! Normalizes the platform's heterogeneous outputs (yt-dlp flat listings,
//! yt-dlp per-video dumps and the channel's Atom feed) into a single
//! [`VideoDescriptor`] shape.

use std::{borrow::Cow, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::Error,
    freshness::parse_compact_date,
    types::{MediaLocator, Published},
    VideoDescriptor,
};

static VIDEO_ID_IN_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/|/live/)([A-Za-z0-9_-]{11})").unwrap()
});

static FEED_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").unwrap());

static FEED_VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<yt:videoId>\s*([^<\s]+)\s*</yt:videoId>").unwrap());

static FEED_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title>(.*?)</title>").unwrap());

static FEED_PUBLISHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<published>\s*([^<\s]+)\s*</published>").unwrap());

static XML_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|amp|lt|gt|quot|apos);").unwrap());

/// A single video as dumped by `yt-dlp -J`, either as a flat playlist entry or
/// as a full per-video record. Every field is optional since flat entries
/// carry only a subset.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct VideoInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub webpage_url: Option<String>,
    pub upload_date: Option<String>,
    pub timestamp: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaylistInfo {
    #[serde(default)]
    entries: Vec<Value>,
}

/// Parses the `entries` of a `yt-dlp --flat-playlist -J` dump.
///
/// Entries yt-dlp could not extract show up as `null` and are skipped.
///
/// # Returns
/// * `Ok(Vec<VideoInfo>)` in listing order (most recent first for a channel's videos tab).
/// * `Err(Error)` if the dump is not a JSON object.
pub fn parse_flat_listing(json: &str) -> Result<Vec<VideoInfo>, Error> {
    let playlist = serde_json::from_str::<PlaylistInfo>(json)?;

    let entries = playlist
        .entries
        .into_iter()
        .filter(|entry| !entry.is_null())
        .filter_map(|entry| {
            serde_json::from_value::<VideoInfo>(entry)
                .inspect_err(|e| tracing::debug!(error = %e, "Skipping malformed listing entry"))
                .ok()
        })
        .collect();

    Ok(entries)
}

/// Parses a single-video `yt-dlp -J` dump.
pub fn parse_video_info(json: &str) -> Result<VideoInfo, Error> {
    Ok(serde_json::from_str::<VideoInfo>(json)?)
}

/// Extracts the 11-character video id from a watch, short or share URL.
pub fn video_id_from_url(url: &str) -> Option<&str> {
    VIDEO_ID_IN_URL_RE
        .captures(url)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

impl TryFrom<VideoInfo> for VideoDescriptor {
    type Error = Error;

    /// Attempts to create a `VideoDescriptor` from a yt-dlp record.
    ///
    /// # Returns
    /// * `Ok(VideoDescriptor)` when an id is present or derivable from the record's URL.
    /// * `Err(Error)` otherwise.
    fn try_from(
        VideoInfo {
            id,
            title,
            url,
            webpage_url,
            upload_date,
            timestamp,
        }: VideoInfo,
    ) -> Result<Self, Self::Error> {
        let record_url = webpage_url.or(url);

        let (id, media_locator) = match id.filter(|id| !id.is_empty()) {
            Some(id) => (id.clone(), MediaLocator::Id(id)),
            None => {
                let url = record_url.ok_or(Error::ParseError(
                    "Listing entry has neither an 'id' nor a 'url'",
                ))?;
                let id = video_id_from_url(&url)
                    .ok_or(Error::ParseError("Failed to derive video id from entry url"))?
                    .to_string();
                (id, MediaLocator::Url(url))
            }
        };

        let published = match upload_date.as_deref().map(parse_compact_date) {
            Some(Ok(date)) => Some(Published::Date(date)),
            Some(Err(e)) => {
                tracing::warn!(error = %e, video_id = %id, "Ignoring malformed upload_date");
                None
            }
            None => timestamp
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts as i64, 0))
                .map(Published::At),
        };

        Ok(VideoDescriptor {
            id,
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| VideoDescriptor::UNKNOWN_TITLE.to_string()),
            media_locator,
            published,
        })
    }
}

/// Parses the first (most recent) `<entry>` of a channel's Atom feed.
#[tracing::instrument(skip(xml))]
pub fn parse_feed_entry(xml: &str) -> Result<VideoDescriptor, Error> {
    let entry = FEED_ENTRY_RE
        .captures(xml)
        .and_then(|cap| cap.get(1))
        .ok_or(Error::ParseError("Feed contains no <entry> element"))?
        .as_str();

    let id = FEED_VIDEO_ID_RE
        .captures(entry)
        .and_then(|cap| cap.get(1))
        .ok_or(Error::ParseError("Feed entry has no <yt:videoId>"))?
        .as_str()
        .to_string();

    let title = FEED_TITLE_RE
        .captures(entry)
        .and_then(|cap| cap.get(1))
        .map(|m| unescape_xml(m.as_str().trim()).into_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| VideoDescriptor::UNKNOWN_TITLE.to_string());

    let published = FEED_PUBLISHED_RE
        .captures(entry)
        .and_then(|cap| cap.get(1))
        .and_then(|m| {
            DateTime::parse_from_rfc3339(m.as_str())
                .inspect_err(|e| tracing::warn!(error = %e, video_id = %id, "Ignoring malformed <published>"))
                .ok()
        })
        .map(|dt| Published::At(dt.with_timezone(&Utc)));

    Ok(VideoDescriptor {
        media_locator: MediaLocator::Id(id.clone()),
        id,
        title,
        published,
    })
}

fn unescape_xml(text: &str) -> Cow<'_, str> {
    XML_ENTITY_RE.replace_all(text, |cap: &Captures| {
        let entity = &cap[1];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ if entity.starts_with("#x") => u32::from_str_radix(&entity[2..], 16)
                .ok()
                .and_then(char::from_u32),
            _ => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
        };
        decoded.map_or_else(|| cap[0].to_string(), String::from)
    })
}
