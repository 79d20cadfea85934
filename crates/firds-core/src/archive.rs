use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zip::ZipArchive;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArchive {
    pub target_dir: PathBuf,
    /// Regular files written, in archive order.
    pub files: Vec<PathBuf>,
}

impl ExtractedArchive {
    pub fn files_with_extension<'a>(
        &'a self,
        extension: &'a str,
    ) -> impl Iterator<Item = &'a PathBuf> {
        self.files.iter().filter(move |path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
    }
}

/// Extracts every entry of the ZIP archive at `zip_path` into `target_dir`.
///
/// Existing files are overwritten, so extracting the same archive twice yields the
/// same tree. Entries whose names would escape `target_dir` are skipped.
pub fn unzip_file(zip_path: &Path, target_dir: &Path) -> Result<ExtractedArchive> {
    let file = File::open(zip_path).map_err(PipelineError::io(zip_path))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|source| PipelineError::Archive {
            path: zip_path.to_path_buf(),
            source,
        })?;

    fs::create_dir_all(target_dir).map_err(PipelineError::io(target_dir))?;
    let target_dir = fs::canonicalize(target_dir).map_err(PipelineError::io(target_dir))?;

    let mut files = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|source| PipelineError::Archive {
            path: zip_path.to_path_buf(),
            source,
        })?;

        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!(entry = entry.name(), "skipping archive entry with unsafe path");
            continue;
        };
        let out_path = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(PipelineError::io(&out_path))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(PipelineError::io(parent))?;
        }
        let mut out = File::create(&out_path).map_err(PipelineError::io(&out_path))?;
        io::copy(&mut entry, &mut out).map_err(PipelineError::io(&out_path))?;
        files.push(out_path);
    }

    info!(
        archive = %zip_path.display(),
        target = %target_dir.display(),
        files = files.len(),
        "extracted archive"
    );
    Ok(ExtractedArchive { target_dir, files })
}
