use std::future::Future;

use anyhow::Context;

use crate::{
    parser::parse_feed_entry,
    yt::{channel::ChannelRef, FeedSource, VideoExtractor},
    VideoDescriptor,
};

/// Resolves the channel's most recent video.
///
/// Resolution failures are not errors for the caller: `None` means there is
/// nothing to do this run.
pub trait ChannelResolver {
    fn resolve_latest(&self) -> impl Future<Output = Option<VideoDescriptor>> + Send;
}

/// Flat listing, then detailed lookup, then the channel feed.
#[derive(Debug, Clone)]
pub struct LatestVideoResolver<E, F> {
    channel: ChannelRef,
    extractor: E,
    feed: F,
    listing_depth: usize,
}

impl<E, F> LatestVideoResolver<E, F>
where
    E: VideoExtractor + Send + Sync,
    F: FeedSource + Send + Sync,
{
    pub const DEFAULT_LISTING_DEPTH: usize = 1;

    pub fn new(channel: ChannelRef, extractor: E, feed: F) -> Self {
        LatestVideoResolver {
            channel,
            extractor,
            feed,
            listing_depth: Self::DEFAULT_LISTING_DEPTH,
        }
    }

    pub fn listing_depth(mut self, depth: usize) -> Self {
        self.listing_depth = depth.max(1);
        self
    }

    pub fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    /// First usable entry of a shallow listing of the channel's videos tab
    #[tracing::instrument(skip(self))]
    async fn from_flat_listing(&self) -> anyhow::Result<VideoDescriptor> {
        let entries = self
            .extractor
            .flat_listing(&self.channel.videos_url(), self.listing_depth)
            .await
            .context("Flat listing failed")?;

        entries
            .into_iter()
            .find_map(|entry| {
                VideoDescriptor::try_from(entry)
                    .inspect_err(|e| tracing::debug!(error = %e, "Skipping listing entry"))
                    .ok()
            })
            .context("Channel listing returned no usable entries")
    }

    /// Re-fetches the candidate's full metadata for an authoritative publish date
    #[tracing::instrument(skip(self, candidate), fields(video_id = %candidate.id))]
    async fn with_details(&self, candidate: &VideoDescriptor) -> anyhow::Result<VideoDescriptor> {
        let info = self
            .extractor
            .video_details(&candidate.watch_url())
            .await
            .context("Detailed lookup failed")?;

        let mut detailed = VideoDescriptor::try_from(info)?;
        detailed.published = detailed.published.or(candidate.published);
        Ok(detailed)
    }

    #[tracing::instrument(skip(self))]
    async fn from_feed(&self) -> anyhow::Result<VideoDescriptor> {
        let feed_url = self
            .channel
            .feed_url()
            .context("Feed fallback needs a /channel/<id> reference, not a handle")?;

        let xml = self
            .feed
            .fetch_feed(&feed_url)
            .await
            .context("Feed request failed")?;

        Ok(parse_feed_entry(&xml)?)
    }
}

impl<E, F> ChannelResolver for LatestVideoResolver<E, F>
where
    E: VideoExtractor + Send + Sync,
    F: FeedSource + Send + Sync,
{
    #[tracing::instrument(skip(self), fields(channel = %self.channel))]
    async fn resolve_latest(&self) -> Option<VideoDescriptor> {
        let candidate = match self.from_flat_listing().await {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::warn!(error = ?e, "Flat listing failed, falling back to channel feed");
                return self
                    .from_feed()
                    .await
                    .inspect(|d| tracing::info!(video_id = %d.id, "Resolved latest video from feed"))
                    .inspect_err(|e| tracing::error!(error = ?e, "All resolution strategies failed"))
                    .ok();
            }
        };

        match self.with_details(&candidate).await {
            Ok(detailed) => {
                tracing::info!(video_id = %detailed.id, "Resolved latest video");
                Some(detailed)
            }
            Err(e) => {
                tracing::warn!(error = ?e, video_id = %candidate.id, "Detailed lookup failed, falling back to channel feed");
                match self.from_feed().await {
                    Ok(from_feed) => Some(from_feed),
                    Err(e) => {
                        tracing::warn!(error = ?e, "Feed fallback failed, keeping flat listing entry");
                        Some(candidate)
                    }
                }
            }
        }
    }
}
