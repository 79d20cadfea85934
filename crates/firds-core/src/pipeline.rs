//! Pipeline: fetch index -> locate archive -> fetch archive -> extract -> CSV -> upload.

use std::path::{Path, PathBuf};

use firds_bucket::{BucketStore, S3BucketStore};
use firds_parser::IndexReference;
use tracing::info;

use crate::archive::{unzip_file, ExtractedArchive};
use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::fetch::HttpFetcher;
use crate::index::locate_archive;
use crate::transform::{create_csv, CsvOutput};
use crate::upload::{upload_with_store, UploadReceipt};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub skip_upload: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub index_path: PathBuf,
    pub reference: IndexReference,
    pub archive_path: PathBuf,
    pub extracted: ExtractedArchive,
    pub csv: CsvOutput,
    pub upload: Option<UploadReceipt>,
}

pub struct Pipeline {
    config: AppConfig,
    fetcher: HttpFetcher,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.http)?;
        Ok(Self { config, fetcher })
    }

    /// Runs every stage, uploading to the configured S3 bucket unless skipped.
    pub async fn run(&self, options: RunOptions) -> Result<PipelineReport> {
        if options.skip_upload {
            return self.run_with_store(None).await;
        }
        // Resolve credentials before any download so a bad [aws] section fails fast.
        let s3_config = self.config.s3_config()?;
        let store = S3BucketStore::new(s3_config).await?;
        self.run_with_store(Some(&store)).await
    }

    /// Runs every stage against an explicit store; `None` stops after the CSV is written.
    pub async fn run_with_store(&self, store: Option<&dyn BucketStore>) -> Result<PipelineReport> {
        let source = &self.config.sourcefile;
        let download_dir = self.config.download.download_path.as_path();

        // 1. index document
        let index_path = self
            .fetcher
            .download(&source.xml_source_url, download_dir, &source.index_file_name)
            .await?;

        // 2. archive reference
        let reference = locate_archive(&index_path, &source.file_type)?;

        // 3. archive
        let archive_path = self
            .fetcher
            .download(&reference.archive_url, download_dir, &reference.archive_name)
            .await?;

        // 4. extraction
        let extracted = {
            let archive_path = archive_path.clone();
            let target = download_dir.to_path_buf();
            tokio::task::spawn_blocking(move || unzip_file(&archive_path, &target)).await??
        };

        // 5. CSV
        let xml_path = select_xml(&extracted, &archive_path)?;
        let csv = {
            let csv_dir = self.config.csv.csv_path.clone();
            tokio::task::spawn_blocking(move || create_csv(&xml_path, &csv_dir)).await??
        };

        // 6. upload
        let upload = match store {
            Some(store) => Some(upload_with_store(store, &csv.path).await?),
            None => {
                info!(path = %csv.path.display(), "upload skipped");
                None
            }
        };

        info!(
            archive = %reference.archive_name,
            rows = csv.records,
            uploaded = upload.is_some(),
            "pipeline finished"
        );

        Ok(PipelineReport {
            index_path,
            reference,
            archive_path,
            extracted,
            csv,
            upload,
        })
    }
}

/// Prefers the XML entry named after the archive, falling back to the first XML entry.
fn select_xml(extracted: &ExtractedArchive, archive_path: &Path) -> Result<PathBuf> {
    let archive_stem = archive_path.file_stem();
    let mut candidates = extracted.files_with_extension("xml").peekable();
    let first = candidates.peek().map(|path| path.to_path_buf());

    candidates
        .find(|path| path.file_stem() == archive_stem)
        .cloned()
        .or(first)
        .ok_or_else(|| PipelineError::NoXmlInArchive {
            path: archive_path.to_path_buf(),
        })
}
