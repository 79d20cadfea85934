use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("document ended with {open_elements} unclosed element(s)")]
    Truncated { open_elements: usize },

    #[error("document contains no root element")]
    NoRootElement,

    #[error("no {file_type} entry with both a file name and a download link")]
    MissingReference { file_type: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ParserError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn xml(position: u64, source: impl Into<quick_xml::Error>) -> Self {
        Self::Xml {
            position,
            source: source.into(),
        }
    }
}
