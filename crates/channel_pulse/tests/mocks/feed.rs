use std::sync::{Arc, Mutex};

use channel_pulse::yt::FeedSource;

#[derive(Clone)]
pub struct MockFeed {
    pub xml: String,
    pub fail_with: Option<String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockFeed {
    pub fn new(xml: impl Into<String>) -> Self {
        Self {
            xml: xml.into(),
            fail_with: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn from_fixture() -> Self {
        Self::new(include_str!("../fixtures/feed.xml"))
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }
}

impl FeedSource for MockFeed {
    async fn fetch_feed(&self, feed_url: &str) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(feed_url.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.xml.clone())
    }
}
