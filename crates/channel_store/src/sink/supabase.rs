use std::{path::Path, time::Duration};

use anyhow::Context;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::sink::{content_type_for, object_key, StorageSink, UploadReceipt};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),
}

/// Error body returned by the storage API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorBody {
    /// The API's own message when the body decodes, else the raw text
    fn describe(body: &str) -> String {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(ApiErrorBody {
                error: Some(error),
                message: Some(message),
            }) => format!("{error}: {message}"),
            Ok(ApiErrorBody {
                message: Some(message),
                ..
            }) => message,
            _ => body.trim().to_string(),
        }
    }
}

/// Supabase storage bucket reached through the storage REST API.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: Url,
    api_key: String,
    bucket: String,
}

impl SupabaseStorage {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let base_url =
            Url::parse(base_url).map_err(|e| StorageError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(Self::REQUEST_TIMEOUT).build()?;

        Ok(SupabaseStorage {
            client,
            base_url,
            api_key: api_key.into(),
            bucket: bucket.into(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `{base}/storage/v1/object/{bucket}/{key}` with every segment percent-encoded
    pub fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["storage", "v1", "object", self.bucket.as_str(), key]);
        Ok(url)
    }

    async fn put_object(&self, path: &Path) -> Result<UploadReceipt, StorageError> {
        let key = object_key(path)
            .ok_or_else(|| StorageError::InvalidUrl(format!("no file name in {}", path.display())))?;
        let content_type = content_type_for(path);
        let url = self.object_url(key)?;

        let bytes = tokio::fs::read(path).await?;
        let size_bytes = bytes.len() as u64;

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status,
                message: ApiErrorBody::describe(&body),
            });
        }

        Ok(UploadReceipt {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            content_type,
            size_bytes,
        })
    }
}

impl StorageSink for SupabaseStorage {
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn upload(&self, path: &Path) -> anyhow::Result<UploadReceipt> {
        let receipt = self
            .put_object(path)
            .await
            .inspect_err(|e| tracing::error!(error = %e, path = ?path, "Failed to upload object"))
            .with_context(|| format!("Failed to upload {} to bucket {}", path.display(), self.bucket))?;

        tracing::info!(key = %receipt.key, size_bytes = receipt.size_bytes, "Uploaded object");
        Ok(receipt)
    }
}
