use crate::config::{ConnectionDescriptor, GroupIndex};
use crate::domain::DatabaseDumper;
use crate::storage::{remote_key, StorageProvider};
use crate::utils::compress::{artifact_filename, compress_dump};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{error, info, warn};

/// Outcome of one execution attempt for one descriptor. Error detail is
/// credential-free by construction: every message is built from the
/// descriptor's redacted projection.
#[derive(Debug, Clone, Serialize)]
pub struct BackupResult {
    pub name: String,
    pub group: String,
    pub database: String,
    pub success: bool,
    pub size: u64,
    pub error: Option<String>,
    pub remote_key: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupSummary {
    pub success_count: usize,
    pub error_count: usize,
    pub total_size: u64,
    pub databases: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupRunReport {
    pub groups: BTreeMap<String, GroupSummary>,
    pub results: Vec<BackupResult>,
    pub success_count: usize,
    pub error_count: usize,
    pub total_size: u64,
}

impl BackupRunReport {
    pub fn record(&mut self, result: BackupResult) {
        let summary = self.groups.entry(result.group.clone()).or_default();
        summary.databases.push(result.database.clone());
        if result.success {
            summary.success_count += 1;
            summary.total_size += result.size;
            self.success_count += 1;
            self.total_size += result.size;
        } else {
            summary.error_count += 1;
            self.error_count += 1;
        }
        self.results.push(result);
    }
}

/// dump → compress → upload → local cleanup for a single descriptor, every
/// stage failure contained in the returned result.
pub struct BackupPipeline {
    dumper: Arc<dyn DatabaseDumper>,
    storage: Arc<dyn StorageProvider>,
}

impl BackupPipeline {
    pub fn new(dumper: Arc<dyn DatabaseDumper>, storage: Arc<dyn StorageProvider>) -> Self {
        BackupPipeline { dumper, storage }
    }

    pub async fn execute(&self, descriptor: &ConnectionDescriptor) -> BackupResult {
        let started_local = chrono::Local::now();
        let started_at = Utc::now();
        let fail = |error: String| BackupResult {
            name: descriptor.name.clone(),
            group: descriptor.group.clone(),
            database: descriptor.database.clone(),
            success: false,
            size: 0,
            error: Some(error),
            remote_key: None,
            started_at,
            finished_at: Utc::now(),
        };

        info!("backing up {}", descriptor.display_info());

        if let Err(e) = self.dumper.ping(descriptor).await {
            error!("connectivity check failed: {e}");
            return fail(e.to_string());
        }

        let dump = match self.dumper.dump(descriptor).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("dump failed: {e}");
                return fail(e.to_string());
            }
        };

        let work_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(e) => return fail(format!("failed to create temp dir: {e}")),
        };
        let filename = artifact_filename(&descriptor.database, started_local);
        let artifact = match compress_dump(&dump, &filename, work_dir.path()).await {
            Ok(path) => path,
            Err(e) => {
                error!("compression failed: {e}");
                return fail(e.to_string());
            }
        };
        drop(dump);

        // Remote key preserves the local filename verbatim.
        let key = remote_key(&filename);
        let upload = self.storage.upload(&artifact, &key).await;

        // The local artifact is removed whatever the upload outcome, so disk
        // usage stays bounded under repeated upload failures.
        if let Err(e) = tokio::fs::remove_file(&artifact).await {
            warn!("failed to remove local artifact {}: {e}", artifact.display());
        }

        match upload {
            Ok(object) => {
                info!(
                    "backup uploaded: {} -> {} ({} bytes)",
                    descriptor.display_info(),
                    object.key,
                    object.size
                );
                BackupResult {
                    name: descriptor.name.clone(),
                    group: descriptor.group.clone(),
                    database: descriptor.database.clone(),
                    success: true,
                    size: object.size,
                    error: None,
                    remote_key: Some(object.key),
                    started_at,
                    finished_at: Utc::now(),
                }
            }
            Err(e) => {
                error!("upload failed: {e}");
                fail(e.to_string())
            }
        }
    }

    /// Run a descriptor set group by group. Descriptors of one group run
    /// sequentially in declaration order to avoid piling onto one server; a
    /// failure never aborts its siblings.
    pub async fn run_batch(&self, descriptors: &[ConnectionDescriptor]) -> BackupRunReport {
        let index = GroupIndex::new(descriptors);
        let mut report = BackupRunReport::default();

        for group in index.group_names() {
            let members: Vec<&ConnectionDescriptor> = index
                .by_group(&group)
                .into_iter()
                .filter(|d| d.enabled)
                .collect();
            info!("backing up group {} ({} database(s))", group, members.len());
            for descriptor in members {
                let result = self.execute(descriptor).await;
                report.record(result);
            }
        }

        info!(
            "backup batch finished: {} succeeded, {} failed",
            report.success_count, report.error_count
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_connections;
    use crate::domain::mock::MockDumper;
    use crate::storage::mock::MockStorage;

    #[tokio::test]
    async fn successful_run_uploads_under_expected_key() {
        let descriptors = parse_connections("mysql://u:pw@h:3306/app").unwrap();
        let storage = Arc::new(MockStorage::default());
        let pipeline = BackupPipeline::new(Arc::new(MockDumper::ok()), storage.clone());

        let result = pipeline.execute(&descriptors[0]).await;
        assert!(result.success);
        assert!(result.size > 0);

        let key = result.remote_key.unwrap();
        assert!(key.starts_with("mysql-backups/backup_app_"));
        assert!(key.ends_with(".sql.gz"));
        assert_eq!(storage.keys(), vec![key]);
    }

    #[tokio::test]
    async fn mid_batch_failure_is_isolated() {
        let descriptors = parse_connections("mysql://u:pw@h:3306/d1,d2,d3").unwrap();
        let storage = Arc::new(MockStorage::default());
        let pipeline = BackupPipeline::new(Arc::new(MockDumper::failing(&["d2"])), storage);

        let report = pipeline.run_batch(&descriptors).await;
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);

        let by_db: BTreeMap<&str, bool> = report
            .results
            .iter()
            .map(|r| (r.database.as_str(), r.success))
            .collect();
        assert_eq!(by_db["d1"], true);
        assert_eq!(by_db["d2"], false);
        assert_eq!(by_db["d3"], true);

        let failed = report.results.iter().find(|r| !r.success).unwrap();
        assert!(failed.error.as_deref().unwrap().contains("d2"));
    }

    #[tokio::test]
    async fn error_detail_never_contains_password() {
        let descriptors = parse_connections("mysql://u:hunter2@h:3306/app").unwrap();
        let storage = Arc::new(MockStorage::default());
        let pipeline = BackupPipeline::new(Arc::new(MockDumper::failing(&["app"])), storage);

        let result = pipeline.execute(&descriptors[0]).await;
        assert!(!result.success);
        assert!(!result.error.unwrap().contains("hunter2"));
    }

    #[tokio::test]
    async fn failed_upload_still_records_result_and_keeps_nothing_remote() {
        let descriptors = parse_connections("mysql://u:pw@h:3306/app").unwrap();
        let storage = Arc::new(MockStorage {
            fail_uploads: true,
            ..Default::default()
        });
        let pipeline = BackupPipeline::new(Arc::new(MockDumper::ok()), storage.clone());

        let result = pipeline.execute(&descriptors[0]).await;
        assert!(!result.success);
        assert_eq!(result.size, 0);
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn disabled_descriptors_are_skipped_by_batches() {
        let raw = r#"[
            {"name": "a", "connection": "mysql://u:p@h:3306/d1"},
            {"name": "b", "connection": "mysql://u:p@h:3306/d2", "enabled": false}
        ]"#;
        let descriptors = parse_connections(raw).unwrap();
        let storage = Arc::new(MockStorage::default());
        let pipeline = BackupPipeline::new(Arc::new(MockDumper::ok()), storage);

        let report = pipeline.run_batch(&descriptors).await;
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].database, "d1");
    }
}
