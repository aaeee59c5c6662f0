use std::{ops::Deref, time::Duration};

use anyhow::Context;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

use crate::yt::FeedSource;

/// HTTP client for a channel's Atom feed, retrying transient failures.
#[derive(Clone)]
pub struct FeedClient(pub ClientWithMiddleware);

impl Deref for FeedClient {
    type Target = ClientWithMiddleware;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FeedClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    const MAX_RETRIES: u32 = 3;

    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .context("Failed to build feed http client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(Self::MAX_RETRIES);

        Ok(FeedClient(
            ClientBuilder::new(client)
                .with(RetryTransientMiddleware::new_with_policy(retry_policy))
                .build(),
        ))
    }
}

impl FeedSource for FeedClient {
    #[tracing::instrument(skip(self))]
    async fn fetch_feed(&self, feed_url: &str) -> anyhow::Result<String> {
        let resp = self
            .get(feed_url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Feed request failed with status {status}");
        }

        Ok(resp.text().await?)
    }
}
