pub mod errors;
pub mod index;
pub mod model;
pub mod records;

pub use errors::ParserError;
pub use index::{parse_index_entries, parse_index_file, select_reference, DEFAULT_FILE_TYPE};
pub use model::{IndexEntry, IndexReference, InstrumentRecord, RecordColumn, RECORD_COLUMNS};
pub use records::{transform_records, RecordReader, TransformSummary};
