//! # Storage Module
//!
//! This module provides the storage sink that receives finished audio
//! artifacts, along with a Supabase storage implementation.
//!
//! Uploads are single attempts keyed by the artifact's file name and always
//! overwrite an existing object with the same key.

mod sink;

pub use sink::supabase::{StorageError, SupabaseStorage};
pub use sink::{content_type_for, object_key, StorageSink, UploadReceipt};
