use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::HttpSection;
use crate::error::{PipelineError, Result};

/// Downloads remote resources to local files.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSection) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.timeout())
            .user_agent(concat!("firds-pipeline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| PipelineError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }

    /// GETs `url` and writes the body to `<directory>/<name>`, returning the absolute path.
    ///
    /// The directory is created when missing. Nothing is left at the target path
    /// unless the whole body was written.
    pub async fn download(&self, url: &str, directory: &Path, name: &str) -> Result<PathBuf> {
        let name = validate_file_name(name)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| PipelineError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        fs::create_dir_all(directory)
            .await
            .map_err(PipelineError::io(directory))?;

        let target = directory.join(name);
        let partial = directory.join(format!("{name}.part"));

        let written = match write_body(response, &partial, url).await {
            Ok(written) => written,
            Err(err) => {
                remove_partial(&partial).await;
                return Err(err);
            }
        };

        if let Err(err) = fs::rename(&partial, &target).await {
            remove_partial(&partial).await;
            return Err(PipelineError::io(&target)(err));
        }
        let target = fs::canonicalize(&target)
            .await
            .map_err(PipelineError::io(&target))?;

        info!(url, path = %target.display(), bytes = written, "downloaded resource");
        Ok(target)
    }
}

async fn remove_partial(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        debug!(path = %path.display(), error = %err, "no partial download to remove");
    }
}

async fn write_body(response: reqwest::Response, path: &Path, url: &str) -> Result<u64> {
    let mut file = fs::File::create(path).await.map_err(PipelineError::io(path))?;
    let mut written = 0u64;

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| {
            warn!(url, "download interrupted");
            PipelineError::Request {
                url: url.to_string(),
                source,
            }
        })?;
        file.write_all(&chunk).await.map_err(PipelineError::io(path))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(PipelineError::io(path))?;
    Ok(written)
}

fn validate_file_name(name: &str) -> Result<&str> {
    let candidate = Path::new(name);
    match candidate.file_name() {
        Some(file_name) if file_name == candidate.as_os_str() && name != ".." => Ok(name),
        _ => Err(PipelineError::InvalidFileName(name.to_string())),
    }
}
