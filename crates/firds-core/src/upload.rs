use std::path::Path;

use firds_bucket::{BucketStore, S3BucketStore, S3Config};
use tracing::info;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    pub bytes: u64,
}

/// Object key for a local file: its base name.
pub fn object_key(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::InvalidFileName(path.display().to_string()))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => "text/csv",
        Some(ext) if ext.eq_ignore_ascii_case("xml") => "application/xml",
        _ => "application/octet-stream",
    }
}

fn local_file_size(path: &Path) -> Result<u64> {
    let metadata = std::fs::metadata(path).map_err(|err| PipelineError::LocalFile {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    if !metadata.is_file() {
        return Err(PipelineError::LocalFile {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    Ok(metadata.len())
}

/// Uploads `path` to the S3 bucket described by `config`.
///
/// The local file is checked before any client is built, so a missing file never
/// touches the network.
pub async fn upload_file(path: &Path, config: &S3Config) -> Result<UploadReceipt> {
    local_file_size(path)?;
    let store = S3BucketStore::new(config.clone()).await?;
    upload_with_store(&store, path).await
}

pub async fn upload_with_store(store: &dyn BucketStore, path: &Path) -> Result<UploadReceipt> {
    let bytes = local_file_size(path)?;
    let key = object_key(path)?;

    store.put_file(&key, path, content_type(path)).await?;

    info!(bucket = store.bucket(), key = %key, bytes, "uploaded file");
    Ok(UploadReceipt {
        bucket: store.bucket().to_string(),
        key,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use firds_bucket::MemoryBucketStore;

    use super::*;

    #[tokio::test]
    async fn uploads_under_base_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("DLTINS_20210117_01of01.csv");
        std::fs::write(&path, "Issr\nLEI1\n").expect("write csv");

        let store = MemoryBucketStore::new("firds-output");
        let receipt = upload_with_store(&store, &path).await.expect("upload failed");

        assert_eq!(receipt.bucket, "firds-output");
        assert_eq!(receipt.key, "DLTINS_20210117_01of01.csv");
        assert_eq!(receipt.bytes, 10);
        assert_eq!(store.content_type(&receipt.key).as_deref(), Some("text/csv"));
        let stored = store.get_object(&receipt.key).await.expect("object missing");
        assert_eq!(&stored[..], b"Issr\nLEI1\n");
    }

    #[tokio::test]
    async fn missing_local_file_fails_before_any_client_is_built() {
        let config = S3Config {
            bucket: "firds-output".to_string(),
            region: "eu-west-2".to_string(),
            endpoint: Some("http://127.0.0.1:9".to_string()),
            access_key_id: Some("key".to_string()),
            secret_access_key: Some("secret".to_string()),
            force_path_style: true,
        };
        let err = upload_file(Path::new("/nonexistent/rows.csv"), &config)
            .await
            .expect_err("missing file should fail");
        assert!(matches!(err, PipelineError::LocalFile { .. }));
    }

    #[tokio::test]
    async fn directories_are_not_uploaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MemoryBucketStore::new("firds-output");
        let err = upload_with_store(&store, dir.path())
            .await
            .expect_err("directory should fail");
        assert!(matches!(err, PipelineError::LocalFile { .. }));
        assert!(store.keys().is_empty());
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type(Path::new("a.CSV")), "text/csv");
        assert_eq!(content_type(Path::new("a.xml")), "application/xml");
        assert_eq!(content_type(Path::new("a")), "application/octet-stream");
    }
}
