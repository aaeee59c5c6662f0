use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use channel_store::{content_type_for, object_key, StorageSink, UploadReceipt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct MockStorage {
    pub bucket: String,
    pub objects: Arc<Mutex<Vec<StoredObject>>>,
    pub attempts: Arc<Mutex<usize>>,
    pub fail_with: Option<String>,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self {
            bucket: "audio".to_string(),
            objects: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(Mutex::new(0)),
            fail_with: None,
        }
    }
}

impl MockStorage {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl StorageSink for MockStorage {
    async fn upload(&self, path: &Path) -> anyhow::Result<UploadReceipt> {
        *self.attempts.lock().unwrap() += 1;
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }

        let key = object_key(path)
            .ok_or_else(|| anyhow::anyhow!("no file name in {}", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        let receipt = UploadReceipt {
            bucket: self.bucket.clone(),
            key: key.clone(),
            content_type: content_type_for(path),
            size_bytes: bytes.len() as u64,
        };

        self.objects.lock().unwrap().push(StoredObject {
            key,
            content_type: content_type_for(path),
            bytes,
        });
        Ok(receipt)
    }
}
