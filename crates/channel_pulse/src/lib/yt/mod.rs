pub mod channel;
pub mod feed;
pub mod ytdlp;

use std::future::Future;

use crate::parser::VideoInfo;

/// The platform's extraction capability: listings and per-video metadata.
pub trait VideoExtractor {
    fn flat_listing(
        &self,
        channel_url: &str,
        limit: usize,
    ) -> impl Future<Output = anyhow::Result<Vec<VideoInfo>>> + Send;

    fn video_details(&self, video_url: &str) -> impl Future<Output = anyhow::Result<VideoInfo>> + Send;
}

pub trait FeedSource {
    fn fetch_feed(&self, feed_url: &str) -> impl Future<Output = anyhow::Result<String>> + Send;
}
