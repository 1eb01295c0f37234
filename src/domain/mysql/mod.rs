mod dump;
mod ping;

use crate::config::ConnectionDescriptor;
use crate::domain::{ConnectionError, DatabaseDumper, DumpError};
use async_trait::async_trait;

/// Dumper backed by the mysql client utilities (`mysqladmin`, `mysqldump`).
/// The password travels through the MYSQL_PWD environment variable, never on
/// the command line.
pub struct MysqlDumper;

#[async_trait]
impl DatabaseDumper for MysqlDumper {
    async fn ping(&self, descriptor: &ConnectionDescriptor) -> Result<(), ConnectionError> {
        ping::run(descriptor).await
    }

    async fn dump(&self, descriptor: &ConnectionDescriptor) -> Result<Vec<u8>, DumpError> {
        dump::run(descriptor.clone()).await
    }
}
