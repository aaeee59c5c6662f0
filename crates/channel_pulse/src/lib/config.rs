use std::path::PathBuf;

use chrono_tz::Tz;
use reqwest::Url;

use crate::{acquisition::fallback::CommandFallbackTool, yt::channel::ChannelRef};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid storage URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid channel reference {channel}: {source}")]
    InvalidChannel {
        channel: String,
        #[source]
        source: crate::error::Error,
    },
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),
    #[error("Listing depth must be between 1 and {max}, got {0}", max = PipelineConfig::MAX_LISTING_DEPTH)]
    ListingDepth(usize),
}

/// Raw pipeline settings as collected from flags and the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub supabase_url: String,
    pub supabase_key: String,
    pub channel_url: String,
    pub bucket: String,
    pub workdir: PathBuf,
    pub cookies_path: PathBuf,
    pub yt_dlp_bin: PathBuf,
    pub fallback_tool: String,
    pub timezone: String,
    pub listing_depth: usize,
}

/// The parts of a [`PipelineConfig`] that only exist once validated.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub channel: ChannelRef,
    pub zone: Tz,
    pub fallback_tool: CommandFallbackTool,
}

impl PipelineConfig {
    pub const MAX_LISTING_DEPTH: usize = 5;

    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        for (name, value) in [
            ("SUPABASE_URL", &self.supabase_url),
            ("SUPABASE_KEY", &self.supabase_key),
            ("CHANNEL_URL", &self.channel_url),
            ("BUCKET_NAME", &self.bucket),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        let url = Url::parse(&self.supabase_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.supabase_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.supabase_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        let channel = self
            .channel_url
            .parse::<ChannelRef>()
            .map_err(|source| ConfigError::InvalidChannel {
                channel: self.channel_url.clone(),
                source,
            })?;

        let zone = self
            .timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))?;

        if !(1..=Self::MAX_LISTING_DEPTH).contains(&self.listing_depth) {
            return Err(ConfigError::ListingDepth(self.listing_depth));
        }

        let fallback_tool = CommandFallbackTool::from_command_line(&self.fallback_tool)
            .ok_or(ConfigError::Missing("FALLBACK_TOOL"))?;

        if matches!(channel, ChannelRef::Handle(_)) {
            tracing::warn!(channel = %channel, "Handle references cannot use the feed fallback");
        }

        Ok(ValidatedConfig {
            channel,
            zone,
            fallback_tool,
        })
    }
}
