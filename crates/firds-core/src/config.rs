//! Pipeline settings, read from a sectioned TOML file and overridable from the environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use firds_bucket::S3Config;
use firds_parser::DEFAULT_FILE_TYPE;
use serde::Deserialize;

use crate::error::{PipelineError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "firds.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sourcefile: SourceSection,
    pub download: DownloadSection,
    pub csv: CsvSection,
    #[serde(default)]
    pub aws: Option<AwsSection>,
    #[serde(default)]
    pub http: HttpSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    pub xml_source_url: String,
    #[serde(default = "default_file_type")]
    pub file_type: String,
    #[serde(default = "default_index_file_name")]
    pub index_file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSection {
    pub download_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvSection {
    pub csv_path: PathBuf,
}

#[derive(Clone, Default, Deserialize)]
pub struct AwsSection {
    #[serde(default)]
    pub bucket_name: String,
    #[serde(default)]
    pub aws_access_key_id: String,
    #[serde(default)]
    pub aws_secret_access_key: String,
    #[serde(default)]
    pub region_name: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

impl fmt::Debug for AwsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSection")
            .field("bucket_name", &self.bucket_name)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &"<redacted>")
            .field("region_name", &self.region_name)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl AwsSection {
    pub fn s3_config(&self) -> Result<S3Config> {
        let required = [
            ("bucket_name", &self.bucket_name),
            ("aws_access_key_id", &self.aws_access_key_id),
            ("aws_secret_access_key", &self.aws_secret_access_key),
            ("region_name", &self.region_name),
        ];
        if let Some((key, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(PipelineError::Config(format!("[aws] {key} must be set")));
        }

        Ok(S3Config {
            bucket: self.bucket_name.clone(),
            region: self.region_name.clone(),
            endpoint: self.endpoint_url.clone(),
            access_key_id: Some(self.aws_access_key_id.clone()),
            secret_access_key: Some(self.aws_secret_access_key.clone()),
            force_path_style: self.force_path_style,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpSection {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_file_type() -> String {
    DEFAULT_FILE_TYPE.to_string()
}

fn default_index_file_name() -> String {
    "sourcefile.xml".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_timeout_secs() -> u64 {
    300
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(PipelineError::io(path))?;
        Self::from_toml_str(&content).map_err(|err| match err {
            PipelineError::Config(message) => {
                PipelineError::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| PipelineError::Config(err.to_string()))
    }

    /// Applies `FIRDS_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(url) = get("FIRDS_SOURCE_URL") {
            self.sourcefile.xml_source_url = url;
        }
        if let Some(path) = get("FIRDS_DOWNLOAD_PATH") {
            self.download.download_path = PathBuf::from(path);
        }
        if let Some(path) = get("FIRDS_CSV_PATH") {
            self.csv.csv_path = PathBuf::from(path);
        }

        let aws_overrides = [
            "FIRDS_S3_BUCKET",
            "FIRDS_S3_REGION",
            "FIRDS_S3_ENDPOINT_URL",
            "FIRDS_S3_ACCESS_KEY_ID",
            "FIRDS_S3_SECRET_ACCESS_KEY",
        ]
        .map(get);
        if aws_overrides.iter().all(Option::is_none) {
            return;
        }

        let [bucket, region, endpoint, access_key, secret_key] = aws_overrides;
        let aws = self.aws.get_or_insert_with(AwsSection::default);
        if let Some(bucket) = bucket {
            aws.bucket_name = bucket;
        }
        if let Some(region) = region {
            aws.region_name = region;
        }
        if let Some(endpoint) = endpoint {
            aws.endpoint_url = Some(endpoint);
        }
        if let Some(access_key) = access_key {
            aws.aws_access_key_id = access_key;
        }
        if let Some(secret_key) = secret_key {
            aws.aws_secret_access_key = secret_key;
        }
    }

    pub fn s3_config(&self) -> Result<S3Config> {
        self.aws
            .as_ref()
            .ok_or_else(|| PipelineError::Config("missing [aws] section".to_string()))?
            .s3_config()
    }
}
