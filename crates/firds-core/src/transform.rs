use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use firds_parser::transform_records;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};

const READ_BUFFER_BYTES: usize = 128 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOutput {
    pub path: PathBuf,
    pub records: usize,
}

/// Streams the records of `xml_path` into `<csv_dir>/<stem>.csv`.
///
/// A partially written CSV is removed when the source turns out to be malformed.
pub fn create_csv(xml_path: &Path, csv_dir: &Path) -> Result<CsvOutput> {
    let stem = xml_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| PipelineError::InvalidFileName(xml_path.display().to_string()))?;

    let source = File::open(xml_path).map_err(PipelineError::io(xml_path))?;

    fs::create_dir_all(csv_dir).map_err(PipelineError::io(csv_dir))?;
    let csv_path = csv_dir.join(format!("{stem}.csv"));
    let output = File::create(&csv_path).map_err(PipelineError::io(&csv_path))?;

    let summary = match transform_records(
        BufReader::with_capacity(READ_BUFFER_BYTES, source),
        BufWriter::new(output),
    ) {
        Ok(summary) => summary,
        Err(source) => {
            warn!(path = %csv_path.display(), "removing partial CSV output");
            fs::remove_file(&csv_path).ok();
            return Err(PipelineError::Transform {
                path: xml_path.to_path_buf(),
                source,
            });
        }
    };

    let path = fs::canonicalize(&csv_path).map_err(PipelineError::io(&csv_path))?;
    info!(
        source = %xml_path.display(),
        path = %path.display(),
        rows = summary.records,
        "wrote CSV"
    );
    Ok(CsvOutput {
        path,
        records: summary.records,
    })
}
