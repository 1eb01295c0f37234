use once_cell::sync::Lazy;
use std::env;

/// Process-wide configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The overloaded connection configuration value (string or JSON).
    pub mysql_connections: String,
    pub backup_schedule: String,
    pub cleanup_schedule: String,
    pub retention_days: u32,
    pub run_initial_backup: bool,

    pub s3_bucket_name: String,
    pub s3_endpoint_url: Option<String>,
    pub s3_access_key_id: String,
    pub s3_secret_access_key: String,
    pub s3_region: String,
}

pub static CONFIG: Lazy<Settings> = Lazy::new(Settings::from_env);

impl Settings {
    fn from_env() -> Self {
        Settings {
            mysql_connections: env::var("MYSQL_CONNECTIONS").unwrap_or_default(),
            backup_schedule: env_or("BACKUP_SCHEDULE", "0 4 * * *"),
            cleanup_schedule: env_or("CLEANUP_SCHEDULE", "0 5 * * *"),
            retention_days: env::var("RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
            run_initial_backup: env::var("RUN_INITIAL_BACKUP")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            s3_bucket_name: env::var("S3_BUCKET_NAME").unwrap_or_default(),
            s3_endpoint_url: env::var("S3_ENDPOINT_URL").ok(),
            s3_access_key_id: env::var("S3_ACCESS_KEY_ID").unwrap_or_default(),
            s3_secret_access_key: env::var("S3_SECRET_ACCESS_KEY").unwrap_or_default(),
            s3_region: env_or("S3_REGION", "us-east-1"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
