use crate::config::ConnectionDescriptor;
use crate::storage::{remote_key, StorageProvider};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupCleanupSummary {
    pub deleted_count: usize,
    pub error_count: usize,
    pub databases: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub groups: BTreeMap<String, GroupCleanupSummary>,
    pub deleted_count: usize,
    pub error_count: usize,
}

/// Expires remote backups per descriptor: objects under that descriptor's
/// artifact prefix older than its effective retention are deleted.
pub struct CleanupService {
    storage: Arc<dyn StorageProvider>,
    default_retention_days: u32,
}

impl CleanupService {
    pub fn new(storage: Arc<dyn StorageProvider>, default_retention_days: u32) -> Self {
        CleanupService {
            storage,
            default_retention_days,
        }
    }

    pub fn effective_retention_days(&self, descriptor: &ConnectionDescriptor) -> u32 {
        descriptor
            .retention_override_days
            .unwrap_or(self.default_retention_days)
    }

    pub async fn run(&self, descriptors: &[&ConnectionDescriptor]) -> CleanupReport {
        let mut report = CleanupReport::default();

        for descriptor in descriptors {
            let retention_days = self.effective_retention_days(descriptor);
            let cutoff = Utc::now() - Duration::days(retention_days as i64);
            let prefix = remote_key(&format!("backup_{}_", descriptor.database));

            let summary = report.groups.entry(descriptor.group.clone()).or_default();
            summary.databases.push(descriptor.database.clone());

            let objects = match self.storage.list(&prefix).await {
                Ok(objects) => objects,
                Err(e) => {
                    error!("cleanup list failed for {}: {e}", descriptor.display_info());
                    summary.error_count += 1;
                    report.error_count += 1;
                    continue;
                }
            };

            for object in objects {
                if object.last_modified >= cutoff {
                    continue;
                }
                match self.storage.delete(&object.key).await {
                    Ok(()) => {
                        info!("deleted expired backup {}", object.key);
                        summary.deleted_count += 1;
                        report.deleted_count += 1;
                    }
                    Err(e) => {
                        error!("failed to delete {}: {e}", object.key);
                        summary.error_count += 1;
                        report.error_count += 1;
                    }
                }
            }

            info!(
                "cleanup for {} done: retention {} day(s), {} deleted",
                descriptor.display_info(),
                retention_days,
                summary.deleted_count
            );
        }

        report
    }
}
