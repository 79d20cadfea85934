//! Streaming extraction of instrument records from DLTINS delta files.
//!
//! The source documents run to hundreds of megabytes, so records are pulled
//! one at a time from a `quick_xml` event reader that reuses a single buffer.
//! Memory stays proportional to the element depth and to one record.

use std::io::{BufRead, Write};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::errors::ParserError;
use crate::model::{InstrumentRecord, RecordColumn, RECORD_COLUMNS};

const RECORD_TAG: &[u8] = b"FinInstrm";
const GENERAL_ATTRIBUTES_TAG: &[u8] = b"FinInstrmGnlAttrbts";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSummary {
    pub records: usize,
}

/// Pull-based iterator over the `FinInstrm` records of a document.
pub struct RecordReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    state: ScanState,
    finished: bool,
}

#[derive(Default)]
struct ScanState {
    /// Local names of the currently open elements.
    stack: Vec<Vec<u8>>,
    seen_root: bool,
    /// Depth of the open record element, if any.
    record_depth: Option<usize>,
    record: InstrumentRecord,
    capture: Option<Capture>,
}

struct Capture {
    column: RecordColumn,
    depth: usize,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: Reader::from_reader(input),
            buf: Vec::with_capacity(8 * 1024),
            state: ScanState::default(),
            finished: false,
        }
    }

    fn next_record(&mut self) -> Result<Option<InstrumentRecord>, ParserError> {
        loop {
            self.buf.clear();
            let position = self.reader.buffer_position() as u64;
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|err| ParserError::xml(position, err))?;

            match event {
                Event::Start(start) => {
                    self.state.open(start.local_name().as_ref());
                }
                Event::Empty(start) => {
                    // An empty record still counts as a record.
                    self.state.open(start.local_name().as_ref());
                    if let Some(record) = self.state.close() {
                        return Ok(Some(record));
                    }
                }
                Event::Text(text) => {
                    if self.state.capture.is_some() {
                        let value = text
                            .unescape()
                            .map_err(|err| ParserError::xml(position, err))?;
                        self.state.append(&value);
                    }
                }
                Event::CData(data) => {
                    if self.state.capture.is_some() {
                        self.state.append(&String::from_utf8_lossy(&data));
                    }
                }
                Event::End(_) => {
                    if let Some(record) = self.state.close() {
                        return Ok(Some(record));
                    }
                }
                Event::Eof => {
                    if !self.state.seen_root {
                        return Err(ParserError::NoRootElement);
                    }
                    if !self.state.stack.is_empty() {
                        return Err(ParserError::Truncated {
                            open_elements: self.state.stack.len(),
                        });
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<InstrumentRecord, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl ScanState {
    fn open(&mut self, name: &[u8]) {
        self.seen_root = true;
        let parent_is_general = self
            .stack
            .last()
            .is_some_and(|parent| parent.as_slice() == GENERAL_ATTRIBUTES_TAG);
        self.stack.push(name.to_vec());
        let depth = self.stack.len();

        let Some(record_depth) = self.record_depth else {
            if name == RECORD_TAG {
                self.record_depth = Some(depth);
                self.record = InstrumentRecord::default();
            }
            return;
        };

        if self.capture.is_some() {
            return;
        }

        let column = if parent_is_general {
            RecordColumn::general_attribute(name)
        } else if name == RecordColumn::Issuer.source_tag() && depth <= record_depth + 2 {
            Some(RecordColumn::Issuer)
        } else {
            None
        };

        // First occurrence wins.
        if let Some(column) = column.filter(|column| self.record.get(*column).is_empty()) {
            self.capture = Some(Capture { column, depth });
        }
    }

    fn append(&mut self, text: &str) {
        if let Some(capture) = &self.capture {
            self.record.field_mut(capture.column).push_str(text);
        }
    }

    /// Pops the current element, returning the finished record when it closes one.
    fn close(&mut self) -> Option<InstrumentRecord> {
        let depth = self.stack.len();
        self.stack.pop();

        if let Some(column) = self
            .capture
            .as_ref()
            .filter(|capture| capture.depth == depth)
            .map(|capture| capture.column)
        {
            self.capture = None;
            // Text may arrive split around comments and CDATA, so trim the joined value.
            let field = self.record.field_mut(column);
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }

        if self.record_depth == Some(depth) {
            self.record_depth = None;
            self.capture = None;
            return Some(std::mem::take(&mut self.record));
        }
        None
    }
}

/// Streams every record of `input` into `output` as CSV, header first.
pub fn transform_records<R: BufRead, W: Write>(
    input: R,
    output: W,
) -> Result<TransformSummary, ParserError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);
    writer.write_record(RECORD_COLUMNS)?;

    let mut summary = TransformSummary::default();
    for record in RecordReader::new(input) {
        writer.serialize(record?)?;
        summary.records += 1;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(summary)
}
