use std::{future::Future, path::Path};

pub mod supabase;

/// Durable object storage for finished audio artifacts.
///
/// Objects are keyed by the artifact's base file name and uploads overwrite
/// whatever is already stored under that key.
pub trait StorageSink {
    fn upload(&self, path: &Path) -> impl Future<Output = anyhow::Result<UploadReceipt>> + Send;
}

impl<T: StorageSink + Send + Sync> StorageSink for &T {
    async fn upload(&self, path: &Path) -> anyhow::Result<UploadReceipt> {
        (**self).upload(path).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    pub content_type: &'static str,
    pub size_bytes: u64,
}

/// Object key for a local file: its base name.
pub fn object_key(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// MIME type stored alongside an object, derived from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("opus") | Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        _ => "audio/mpeg",
    }
}
