use async_compression::tokio::write::GzipEncoder;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Debug, Error)]
#[error("compression failed: {0}")]
pub struct CompressionError(pub String);

/// Artifact naming contract shared by local files and remote keys:
/// `backup_{database}_{YYYYMMDD_HHMMSS}.sql.gz`, timestamp taken at dump start.
pub fn artifact_filename(database: &str, started_at: DateTime<Local>) -> String {
    format!(
        "backup_{}_{}.sql.gz",
        database,
        started_at.format("%Y%m%d_%H%M%S")
    )
}

/// Gzip a raw dump into `dir/filename` and return the written path.
pub async fn compress_dump(
    data: &[u8],
    filename: &str,
    dir: &Path,
) -> Result<PathBuf, CompressionError> {
    let path = dir.join(filename);
    let err = |e: std::io::Error| CompressionError(format!("{}: {e}", path.display()));

    let file = File::create(&path).await.map_err(err)?;
    let mut encoder = GzipEncoder::new(file);
    encoder.write_all(data).await.map_err(err)?;
    encoder.shutdown().await.map_err(err)?;

    info!("compressed dump to {} ({} bytes raw)", path.display(), data.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filename_follows_backup_pattern() {
        let ts = Local.with_ymd_and_hms(2026, 8, 26, 4, 5, 6).unwrap();
        assert_eq!(artifact_filename("app", ts), "backup_app_20260826_040506.sql.gz");
    }

    #[tokio::test]
    async fn compress_writes_gzip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = compress_dump(b"CREATE TABLE t (id INT);", "backup_t_20260826_040506.sql.gz", dir.path())
            .await
            .unwrap();
        let bytes = std::fs::read(&path).unwrap();
        // gzip magic
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }
}
