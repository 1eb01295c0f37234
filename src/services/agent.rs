use crate::config::{parse_connections, ConfigError, ConnectionDescriptor};
use crate::domain::DatabaseDumper;
use crate::scheduler::cron::validate_five_field_cron;
use crate::scheduler::{build_jobs, AlreadyRunning, ScheduledJob};
use crate::services::backup::{BackupPipeline, BackupResult, BackupRunReport};
use crate::services::cleanup::{CleanupReport, CleanupService};
use crate::services::status::{build_status, StatusReport};
use crate::storage::StorageProvider;
use chrono::Utc;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Supplied by the environment loader: fallbacks used when a descriptor
/// carries no override.
#[derive(Debug, Clone)]
pub struct GlobalDefaults {
    pub backup_schedule: String,
    pub cleanup_schedule: String,
    pub retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    All,
    Group(String),
}

impl RunTarget {
    fn matches(&self, group: &str) -> bool {
        match self {
            RunTarget::All => true,
            RunTarget::Group(name) => name == group,
        }
    }
}

struct AgentState {
    descriptors: Arc<Vec<ConnectionDescriptor>>,
    jobs: Vec<Arc<ScheduledJob>>,
}

/// The agent core: owns the current descriptor set and its scheduled jobs,
/// and exposes the reload / status / run-now operations to whatever control
/// surface embeds it. A reload swaps the whole state atomically; in-flight
/// executions keep the snapshot they were given.
pub struct BackupAgent {
    pipeline: BackupPipeline,
    cleanup: CleanupService,
    defaults: GlobalDefaults,
    state: RwLock<AgentState>,
}

impl BackupAgent {
    /// First parse happens here and is fatal on error: with no prior good
    /// state there is nothing to fall back to.
    pub fn new(
        dumper: Arc<dyn DatabaseDumper>,
        storage: Arc<dyn StorageProvider>,
        defaults: GlobalDefaults,
        raw_config: &str,
    ) -> Result<Self, ConfigError> {
        validate_five_field_cron(&defaults.backup_schedule)?;
        validate_five_field_cron(&defaults.cleanup_schedule)?;

        let descriptors = parse_connections(raw_config)?;
        let jobs = build_jobs(&descriptors, &defaults.backup_schedule).map_err(|_| {
            ConfigError::InvalidSchedule {
                expr: defaults.backup_schedule.clone(),
            }
        })?;

        Ok(BackupAgent {
            pipeline: BackupPipeline::new(dumper, storage.clone()),
            cleanup: CleanupService::new(storage, defaults.retention_days),
            defaults,
            state: RwLock::new(AgentState {
                descriptors: Arc::new(descriptors),
                jobs,
            }),
        })
    }

    /// Re-resolve the whole descriptor set from a new raw value. On any parse
    /// error the previously loaded set stays active untouched.
    pub fn reload(&self, raw_config: &str) -> Result<usize, ConfigError> {
        let descriptors = match parse_connections(raw_config) {
            Ok(d) => d,
            Err(e) => {
                warn!("reload rejected, keeping current configuration: {e}");
                return Err(e);
            }
        };
        let jobs = build_jobs(&descriptors, &self.defaults.backup_schedule).map_err(|_| {
            ConfigError::InvalidSchedule {
                expr: self.defaults.backup_schedule.clone(),
            }
        })?;

        let count = descriptors.len();
        let mut state = self.state.write().expect("agent state lock poisoned");
        state.descriptors = Arc::new(descriptors);
        state.jobs = jobs;
        info!("configuration reloaded: {count} connection(s)");
        Ok(count)
    }

    /// Consistent snapshot of the current descriptor set.
    pub fn descriptors(&self) -> Arc<Vec<ConnectionDescriptor>> {
        self.state
            .read()
            .expect("agent state lock poisoned")
            .descriptors
            .clone()
    }

    pub fn jobs(&self) -> Vec<Arc<ScheduledJob>> {
        self.state
            .read()
            .expect("agent state lock poisoned")
            .jobs
            .clone()
    }

    pub fn cleanup_schedule(&self) -> &str {
        &self.defaults.cleanup_schedule
    }

    pub fn status(&self) -> StatusReport {
        build_status(&self.descriptors())
    }

    /// Used by the scheduler loop, which holds the job's run guard already.
    pub async fn execute_descriptor(&self, descriptor: &ConnectionDescriptor) -> BackupResult {
        self.pipeline.execute(descriptor).await
    }

    /// Manual trigger. Shares the per-job state machine with scheduled
    /// triggers: a job already running is reported as in progress, never
    /// queued. Jobs run sequentially within a group, in descriptor order.
    pub async fn run_backup_now(&self, target: RunTarget) -> BackupRunReport {
        let jobs: Vec<Arc<ScheduledJob>> = self
            .jobs()
            .into_iter()
            .filter(|j| target.matches(&j.descriptor.group))
            .collect();

        let mut report = BackupRunReport::default();
        for job in jobs {
            match job.try_claim() {
                Ok(_guard) => {
                    let result = self.pipeline.execute(&job.descriptor).await;
                    report.record(result);
                }
                Err(AlreadyRunning) => {
                    warn!("backup already in progress: {}", job.descriptor.display_info());
                    let now = Utc::now();
                    report.record(BackupResult {
                        name: job.descriptor.name.clone(),
                        group: job.descriptor.group.clone(),
                        database: job.descriptor.database.clone(),
                        success: false,
                        size: 0,
                        error: Some("backup already in progress".into()),
                        remote_key: None,
                        started_at: now,
                        finished_at: now,
                    });
                }
            }
        }
        report
    }

    /// Manual retention enforcement over the selected groups.
    pub async fn run_cleanup_now(&self, target: RunTarget) -> CleanupReport {
        let descriptors = self.descriptors();
        let selected: Vec<&ConnectionDescriptor> = descriptors
            .iter()
            .filter(|d| d.enabled && target.matches(&d.group))
            .collect();
        self.cleanup.run(&selected).await
    }
}
