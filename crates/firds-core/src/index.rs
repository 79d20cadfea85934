use std::path::Path;

use firds_parser::{parse_index_file, IndexReference};
use tracing::info;

use crate::error::{PipelineError, Result};

/// Finds the first archive of `file_type` referenced by the index document at `path`.
pub fn locate_archive(path: &Path, file_type: &str) -> Result<IndexReference> {
    let reference = parse_index_file(path, file_type).map_err(|source| PipelineError::Index {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        archive = %reference.archive_name,
        url = %reference.archive_url,
        "located archive in index"
    );
    Ok(reference)
}
