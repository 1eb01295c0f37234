use crate::config::ConnectionDescriptor;
use crate::domain::DumpError;
use std::process::Command;
use tracing::{debug, info};

/// Runs mysqldump on a blocking worker and returns the raw SQL dump.
pub async fn run(descriptor: ConnectionDescriptor) -> Result<Vec<u8>, DumpError> {
    tokio::task::spawn_blocking(move || -> Result<Vec<u8>, DumpError> {
        debug!("starting dump for {}", descriptor.display_info());

        let mut cmd = Command::new("mysqldump");
        cmd.arg("--host")
            .arg(&descriptor.host)
            .arg("--port")
            .arg(descriptor.port.to_string())
            .arg("--user")
            .arg(&descriptor.user)
            .arg("--single-transaction")
            .arg("--routines")
            .arg("--triggers")
            .arg("--events")
            .arg("--add-drop-database")
            .arg("--create-options")
            .arg("--disable-keys")
            .arg("--extended-insert")
            .arg("--quick")
            .arg("--lock-tables=false")
            .arg(&descriptor.database)
            .env("MYSQL_PWD", descriptor.password.expose());
        if descriptor.requires_ssl() {
            cmd.arg("--ssl-mode=REQUIRED");
        }

        let output = cmd.output().map_err(|e| {
            DumpError(format!(
                "failed to run mysqldump for {}: {}",
                descriptor.display_info(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DumpError(format!(
                "mysqldump failed for {}: {}",
                descriptor.display_info(),
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(DumpError(format!(
                "mysqldump produced an empty dump for {}",
                descriptor.display_info()
            )));
        }

        info!(
            "dump finished for {} ({} bytes)",
            descriptor.display_info(),
            output.stdout.len()
        );
        Ok(output.stdout)
    })
    .await
    .map_err(|e| DumpError(format!("dump worker panicked: {e}")))?
}
