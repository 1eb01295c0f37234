use crate::storage::{ObjectInfo, StorageError, StorageProvider};
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct S3ProviderConfig {
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// S3-compatible object storage (AWS, MinIO, Backblaze and friends via a
/// custom endpoint).
pub struct S3Provider {
    client: s3::Client,
    bucket: String,
}

impl S3Provider {
    pub fn new(config: S3ProviderConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "static-creds",
        );

        let mut builder = s3::config::Builder::new()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(true)
            .behavior_version(BehaviorVersion::latest());

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint.clone());
        }

        S3Provider {
            client: s3::Client::from_conf(builder.build()),
            bucket: config.bucket,
        }
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<ObjectInfo, StorageError> {
        let upload_err = |reason: String| StorageError::Upload {
            key: key.to_string(),
            reason,
        };

        let size = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| upload_err(e.to_string()))?
            .len();
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| upload_err(e.to_string()))?;

        info!("uploading to s3://{}/{} ({} bytes)", self.bucket, key, size);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/gzip")
            .body(body)
            .send()
            .await
            .map_err(|e| upload_err(e.to_string()))?;

        Ok(ObjectInfo {
            key: key.to_string(),
            size,
            last_modified: Utc::now(),
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let list_err = |reason: String| StorageError::List {
            prefix: prefix.to_string(),
            reason,
        };

        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| list_err(e.to_string()))?;

            for obj in resp.contents() {
                let Some(key) = obj.key() else { continue };
                let last_modified = obj
                    .last_modified()
                    .and_then(|ts| DateTime::from_timestamp(ts.secs(), 0))
                    .unwrap_or_else(Utc::now);
                objects.push(ObjectInfo {
                    key: key.to_string(),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                    last_modified,
                });
            }

            match resp.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        debug!("listed {} object(s) under {}", objects.len(), prefix);
        Ok(objects)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        info!("deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }
}
