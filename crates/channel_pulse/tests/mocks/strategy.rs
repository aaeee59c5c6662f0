use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use channel_pulse::{
    acquisition::{AcquisitionRequest, AcquisitionStrategy},
    StrategyKind,
};

/// Records its invocation in a shared log. Whether it reports success and
/// whether it leaves `<stem>.<format>` (holding its own name) are independent.
#[derive(Clone)]
pub struct MockStrategy {
    pub kind: StrategyKind,
    pub fail_with: Option<String>,
    pub delay: Option<Duration>,
    pub writes_file: bool,
    pub log: Arc<Mutex<Vec<StrategyKind>>>,
}

impl MockStrategy {
    pub fn succeeding(kind: StrategyKind, log: &Arc<Mutex<Vec<StrategyKind>>>) -> Self {
        Self {
            kind,
            fail_with: None,
            delay: None,
            writes_file: true,
            log: log.clone(),
        }
    }

    /// Reports success without writing anything
    pub fn silent_ok(kind: StrategyKind, log: &Arc<Mutex<Vec<StrategyKind>>>) -> Self {
        Self {
            writes_file: false,
            ..Self::succeeding(kind, log)
        }
    }

    pub fn failing(kind: StrategyKind, msg: &str, log: &Arc<Mutex<Vec<StrategyKind>>>) -> Self {
        Self {
            kind,
            fail_with: Some(msg.to_string()),
            delay: None,
            writes_file: false,
            log: log.clone(),
        }
    }

    /// Reports failure but still leaves the finished file behind
    pub fn failing_with_file(kind: StrategyKind, msg: &str, log: &Arc<Mutex<Vec<StrategyKind>>>) -> Self {
        Self {
            writes_file: true,
            ..Self::failing(kind, msg, log)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl AcquisitionStrategy for MockStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn attempt(&self, request: &AcquisitionRequest) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(self.kind);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.writes_file {
            tokio::fs::write(request.expected_path(), self.kind.to_string()).await?;
        }
        if let Some(ref msg) = self.fail_with {
            // leftovers a failed download might leave behind
            tokio::fs::write(
                request.output_dir.join(format!("{}.webm.part", request.file_stem)),
                b"partial",
            )
            .await?;
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(())
    }
}
