use anyhow::{bail, Context, Result};
use mysql_backup_agent::config::parse_connections;
use mysql_backup_agent::domain::mysql::MysqlDumper;
use mysql_backup_agent::scheduler::scheduler_loop;
use mysql_backup_agent::services::agent::{BackupAgent, GlobalDefaults, RunTarget};
use mysql_backup_agent::settings::CONFIG;
use mysql_backup_agent::storage::s3::{S3Provider, S3ProviderConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("mysql backup agent starting");

    if CONFIG.mysql_connections.is_empty() {
        bail!("MYSQL_CONNECTIONS is not set");
    }
    if CONFIG.s3_bucket_name.is_empty()
        || CONFIG.s3_access_key_id.is_empty()
        || CONFIG.s3_secret_access_key.is_empty()
    {
        bail!("S3_BUCKET_NAME, S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set");
    }

    // Surface parse errors before any component spins up.
    let descriptors = parse_connections(&CONFIG.mysql_connections)
        .context("invalid MYSQL_CONNECTIONS configuration")?;
    for d in &descriptors {
        info!("configured target: {}", d.display_info());
    }

    let storage = Arc::new(S3Provider::new(S3ProviderConfig {
        bucket: CONFIG.s3_bucket_name.clone(),
        endpoint_url: CONFIG.s3_endpoint_url.clone(),
        access_key: CONFIG.s3_access_key_id.clone(),
        secret_key: CONFIG.s3_secret_access_key.clone(),
        region: CONFIG.s3_region.clone(),
    }));

    let agent = Arc::new(
        BackupAgent::new(
            Arc::new(MysqlDumper),
            storage,
            GlobalDefaults {
                backup_schedule: CONFIG.backup_schedule.clone(),
                cleanup_schedule: CONFIG.cleanup_schedule.clone(),
                retention_days: CONFIG.retention_days,
            },
            &CONFIG.mysql_connections,
        )
        .context("failed to initialize backup agent")?,
    );

    let status = agent.status();
    info!(
        "agent ready: {} database(s) in {} group(s), backup at '{}', cleanup at '{}', retention {} day(s)",
        status.total_database_count,
        status.connection_groups.len(),
        CONFIG.backup_schedule,
        CONFIG.cleanup_schedule,
        CONFIG.retention_days
    );

    if CONFIG.run_initial_backup {
        info!("running initial backup");
        let report = agent.run_backup_now(RunTarget::All).await;
        if report.error_count > 0 {
            error!(
                "initial backup finished with failures: {} succeeded, {} failed",
                report.success_count, report.error_count
            );
        } else {
            info!(
                "initial backup finished: {} succeeded, {} bytes uploaded",
                report.success_count, report.total_size
            );
        }
    }

    let scheduler = tokio::spawn(scheduler_loop(agent.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received, stopping scheduler");
    scheduler.abort();

    Ok(())
}
