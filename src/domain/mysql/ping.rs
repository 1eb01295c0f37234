use crate::config::ConnectionDescriptor;
use crate::domain::ConnectionError;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

const PING_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(descriptor: &ConnectionDescriptor) -> Result<(), ConnectionError> {
    debug!("pinging {}", descriptor.display_info());

    let mut cmd = Command::new("mysqladmin");
    cmd.arg("--host")
        .arg(&descriptor.host)
        .arg("--port")
        .arg(descriptor.port.to_string())
        .arg("--user")
        .arg(&descriptor.user)
        .arg("ping")
        .env("MYSQL_PWD", descriptor.password.expose());
    if descriptor.requires_ssl() {
        cmd.arg("--ssl-mode=REQUIRED");
    }

    let result = timeout(PING_TIMEOUT, cmd.output()).await;
    match result {
        Ok(Ok(output)) if output.status.success() => Ok(()),
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ConnectionError(format!(
                "{} unreachable: {}",
                descriptor.display_info(),
                stderr.trim()
            )))
        }
        Ok(Err(e)) => Err(ConnectionError(format!(
            "failed to run mysqladmin for {}: {}",
            descriptor.display_info(),
            e
        ))),
        Err(_) => Err(ConnectionError(format!(
            "ping timed out for {}",
            descriptor.display_info()
        ))),
    }
}
