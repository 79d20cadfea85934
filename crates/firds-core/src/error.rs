// crates/firds-core/src/error.rs

use std::path::{Path, PathBuf};

use firds_bucket::BucketError;
use firds_parser::ParserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("File I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid file name {0:?}")]
    InvalidFileName(String),

    #[error("Index {} could not be parsed: {source}", path.display())]
    Index {
        path: PathBuf,
        #[source]
        source: ParserError,
    },

    #[error("Archive {} could not be extracted: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Archive {} contains no XML file", path.display())]
    NoXmlInArchive { path: PathBuf },

    #[error("Records in {} could not be transformed: {source}", path.display())]
    Transform {
        path: PathBuf,
        #[source]
        source: ParserError,
    },

    #[error("Local file {} is not available: {reason}", path.display())]
    LocalFile { path: PathBuf, reason: String },

    #[error("Upload failed: {0}")]
    Bucket(#[from] BucketError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    pub(crate) fn io(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| Self::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
