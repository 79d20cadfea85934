pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod index;
pub mod pipeline;
pub mod transform;
pub mod upload;

pub use archive::{unzip_file, ExtractedArchive};
pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use fetch::HttpFetcher;
pub use index::locate_archive;
pub use pipeline::{Pipeline, PipelineReport, RunOptions};
pub use transform::{create_csv, CsvOutput};
pub use upload::{object_key, upload_file, upload_with_store, UploadReceipt};
