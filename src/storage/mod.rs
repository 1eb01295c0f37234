pub mod s3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

/// Remote key prefix under which every backup artifact lives.
pub const REMOTE_PREFIX: &str = "mysql-backups/";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed for {key}: {reason}")]
    Upload { key: String, reason: String },

    #[error("list failed for prefix {prefix}: {reason}")]
    List { prefix: String, reason: String },

    #[error("delete failed for {key}: {reason}")]
    Delete { key: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Durable object-storage backend for backup artifacts.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<ObjectInfo, StorageError>;
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Remote key for a local artifact filename. The filename is carried over
/// verbatim so local and remote naming always agree.
pub fn remote_key(filename: &str) -> String {
    format!("{REMOTE_PREFIX}{filename}")
}
