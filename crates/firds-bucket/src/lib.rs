//! Abstractions over S3-compatible storage backends used for generated FIRDS CSV files.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: "firds-csv".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("bucket does not exist: {0}")]
    NoSuchBucket(String),
    #[error("credentials rejected: {0}")]
    Credentials(String),
    #[error("failed to read local file {path}: {message}")]
    LocalFile { path: String, message: String },
    #[error("sdk error: {0}")]
    Sdk(String),
    #[error("object not found: {0}")]
    NotFound(String),
}

impl BucketError {
    fn from_sdk<E, R>(err: SdkError<E, R>, bucket: &str) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: fmt::Debug,
    {
        let message = DisplayErrorContext(&err).to_string();
        match err.code() {
            Some("NoSuchBucket") => Self::NoSuchBucket(bucket.to_string()),
            Some("NoSuchKey") => Self::NotFound(message),
            Some("InvalidAccessKeyId" | "SignatureDoesNotMatch") => Self::Credentials(message),
            _ => Self::Sdk(message),
        }
    }
}

#[async_trait]
pub trait BucketStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError>;
    /// Uploads the file at `path`, streaming its contents from disk.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str)
        -> Result<(), BucketError>;
    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError>;
    async fn delete_object(&self, key: &str) -> Result<(), BucketError>;
    fn bucket(&self) -> &str;
}

#[derive(Clone)]
pub struct S3BucketStore {
    client: Client,
    bucket: String,
}

impl S3BucketStore {
    pub async fn new(config: S3Config) -> Result<Self, BucketError> {
        if config.bucket.is_empty() {
            return Err(BucketError::Configuration(
                "bucket name cannot be empty".into(),
            ));
        }
        if config.region.trim().is_empty() {
            return Err(BucketError::Configuration("region cannot be empty".into()));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(access_key, secret_key, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        debug!(bucket = %config.bucket, region = %config.region, "configured S3 client");
        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }
}

#[async_trait]
impl BucketStore for S3BucketStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| BucketError::from_sdk(err, &self.bucket))?;
        Ok(())
    }

    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), BucketError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|err| BucketError::LocalFile {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| BucketError::from_sdk(err, &self.bucket))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match BucketError::from_sdk(err, &self.bucket) {
                BucketError::NotFound(_) => BucketError::NotFound(key.to_string()),
                other => other,
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|err| BucketError::Sdk(err.to_string()))?;
        Ok(data.into_bytes())
    }

    async fn delete_object(&self, key: &str) -> Result<(), BucketError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| BucketError::from_sdk(err, &self.bucket))?;
        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// In-process store used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    bucket: String,
    objects: Mutex<HashMap<String, (Bytes, String)>>,
}

impl MemoryBucketStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.lock().get(key).map(|(_, content_type)| content_type.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (Bytes, String)>> {
        // A poisoned map is still structurally valid.
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        self.lock()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), BucketError> {
        let bytes = std::fs::read(path).map_err(|err| BucketError::LocalFile {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        self.put_object(key, Bytes::from(bytes), content_type).await
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        self.lock()
            .get(key)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BucketError> {
        self.lock().remove(key);
        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
