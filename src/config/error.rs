use thiserror::Error;

/// Parse-time failures. Any of these rejects the whole input: a reload that
/// produces a `ConfigError` must leave the previously loaded descriptor set
/// untouched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("connection configuration is empty")]
    EmptyInput,

    #[error("invalid JSON configuration: {0}")]
    InvalidJson(String),

    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("unsupported connection string format: {raw}")]
    MalformedConnectionString { raw: String },

    #[error("invalid port in connection string: {raw}")]
    InvalidPort { raw: String },

    #[error("invalid cron schedule: {expr}")]
    InvalidSchedule { expr: String },

    #[error("retention_days must be a positive integer, got {value}")]
    InvalidRetention { value: i64 },
}
