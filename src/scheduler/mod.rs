pub mod cron;

use crate::config::ConnectionDescriptor;
use crate::scheduler::cron::{next_run_timestamp, validate_five_field_cron, ScheduleError};
use crate::services::agent::{BackupAgent, RunTarget};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One enabled descriptor bound to its resolved schedule and its exclusive
/// run flag. Built once per reload; the effective schedule is not re-resolved
/// per trigger.
pub struct ScheduledJob {
    pub descriptor: ConnectionDescriptor,
    pub effective_schedule: String,
    next_run: AtomicI64,
    running: Arc<AtomicBool>,
}

/// Released on drop, returning the job to idle.
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct AlreadyRunning;

impl ScheduledJob {
    fn new(descriptor: ConnectionDescriptor, effective_schedule: String) -> Result<Self, ScheduleError> {
        let next = next_run_timestamp(&effective_schedule)?;
        Ok(ScheduledJob {
            descriptor,
            effective_schedule,
            next_run: AtomicI64::new(next),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Claim exclusive execution. Scheduled and manual triggers go through the
    /// same claim; a second trigger while running is refused, never queued.
    pub fn try_claim(&self) -> Result<RunGuard, AlreadyRunning> {
        match self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Ok(RunGuard {
                running: self.running.clone(),
            }),
            Err(_) => Err(AlreadyRunning),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn due(&self, now: i64) -> bool {
        now >= self.next_run.load(Ordering::SeqCst)
    }

    fn advance(&self) {
        match next_run_timestamp(&self.effective_schedule) {
            Ok(next) => self.next_run.store(next, Ordering::SeqCst),
            // Validated at build time; should not happen.
            Err(e) => error!("failed to advance schedule: {e}"),
        }
    }
}

/// Resolve each enabled descriptor to a scheduled job. An override that fails
/// validation falls back to the default rather than silently dropping the
/// target.
pub fn build_jobs(
    descriptors: &[ConnectionDescriptor],
    default_schedule: &str,
) -> Result<Vec<Arc<ScheduledJob>>, ScheduleError> {
    let mut jobs = Vec::new();
    for d in descriptors.iter().filter(|d| d.enabled) {
        let effective = match d.schedule_override.as_deref() {
            Some(expr) if validate_five_field_cron(expr).is_ok() => expr.to_string(),
            Some(expr) => {
                warn!(
                    "invalid schedule override '{}' for {}, using default '{}'",
                    expr,
                    d.display_info(),
                    default_schedule
                );
                default_schedule.to_string()
            }
            None => default_schedule.to_string(),
        };
        debug!("scheduled {} at '{}'", d.display_info(), effective);
        jobs.push(Arc::new(ScheduledJob::new(d.clone(), effective)?));
    }
    Ok(jobs)
}

/// Background tick loop. Wakes every second, triggers due backup jobs on
/// worker tasks, and fires the global cleanup schedule. A slow backup never
/// delays detection of other jobs; an already-running job skips its trigger.
pub async fn scheduler_loop(agent: Arc<BackupAgent>) {
    let cleanup_schedule = agent.cleanup_schedule().to_string();
    let cleanup_next = AtomicI64::new(match next_run_timestamp(&cleanup_schedule) {
        Ok(ts) => ts,
        Err(e) => {
            error!("invalid cleanup schedule '{cleanup_schedule}': {e}");
            return;
        }
    });

    info!("scheduler started, cleanup at '{cleanup_schedule}'");
    loop {
        let now = chrono::Local::now().timestamp();

        for job in agent.jobs() {
            if !job.due(now) {
                continue;
            }
            job.advance();
            match job.try_claim() {
                Ok(guard) => {
                    let agent = agent.clone();
                    let job = job.clone();
                    tokio::spawn(async move {
                        let _guard = guard;
                        info!("scheduled backup trigger: {}", job.descriptor.display_info());
                        let result = agent.execute_descriptor(&job.descriptor).await;
                        if !result.success {
                            error!(
                                "scheduled backup failed for {}: {}",
                                job.descriptor.display_info(),
                                result.error.as_deref().unwrap_or("unknown error")
                            );
                        }
                    });
                }
                Err(AlreadyRunning) => {
                    warn!(
                        "skipping trigger, backup still running: {}",
                        job.descriptor.display_info()
                    );
                }
            }
        }

        if now >= cleanup_next.load(Ordering::SeqCst) {
            match next_run_timestamp(&cleanup_schedule) {
                Ok(next) => cleanup_next.store(next, Ordering::SeqCst),
                Err(e) => error!("failed to advance cleanup schedule: {e}"),
            }
            let agent = agent.clone();
            tokio::spawn(async move {
                info!("scheduled cleanup trigger");
                let report = agent.run_cleanup_now(RunTarget::All).await;
                info!("cleanup removed {} expired backup(s)", report.deleted_count);
            });
        }

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_connections;

    #[test]
    fn override_wins_over_default() {
        let raw = r#"[{"name": "a", "connection": "mysql://u:p@h:3306/d", "schedule": "30 2 * * *"}]"#;
        let descriptors = parse_connections(raw).unwrap();
        let jobs = build_jobs(&descriptors, "0 4 * * *").unwrap();
        assert_eq!(jobs[0].effective_schedule, "30 2 * * *");
    }

    #[test]
    fn missing_override_falls_back_to_default() {
        let descriptors = parse_connections("mysql://u:p@h:3306/d").unwrap();
        let jobs = build_jobs(&descriptors, "0 4 * * *").unwrap();
        assert_eq!(jobs[0].effective_schedule, "0 4 * * *");
    }

    #[test]
    fn disabled_descriptors_are_not_scheduled() {
        let raw = r#"[
            {"name": "a", "connection": "mysql://u:p@h:3306/d1"},
            {"name": "b", "connection": "mysql://u:p@h:3306/d2", "enabled": false}
        ]"#;
        let descriptors = parse_connections(raw).unwrap();
        let jobs = build_jobs(&descriptors, "0 4 * * *").unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].descriptor.name, "a");
    }

    #[test]
    fn second_claim_is_refused_until_guard_drops() {
        let descriptors = parse_connections("mysql://u:p@h:3306/d").unwrap();
        let jobs = build_jobs(&descriptors, "0 4 * * *").unwrap();
        let job = &jobs[0];

        let guard = job.try_claim().unwrap();
        assert!(job.is_running());
        assert!(job.try_claim().is_err());

        drop(guard);
        assert!(!job.is_running());
        assert!(job.try_claim().is_ok());
    }
}
