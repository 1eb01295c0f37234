pub mod mysql;

use crate::config::ConnectionDescriptor;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("connection check failed: {0}")]
pub struct ConnectionError(pub String);

#[derive(Debug, Error)]
#[error("dump failed: {0}")]
pub struct DumpError(pub String);

/// Produces logical dumps for one backup target. The pipeline only ever talks
/// to this trait, so tests can substitute an in-memory implementation.
#[async_trait]
pub trait DatabaseDumper: Send + Sync {
    /// Fast connectivity and authentication check.
    async fn ping(&self, descriptor: &ConnectionDescriptor) -> Result<(), ConnectionError>;

    /// Full logical dump of the target database.
    async fn dump(&self, descriptor: &ConnectionDescriptor) -> Result<Vec<u8>, DumpError>;
}
