use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::ParserError;
use crate::model::{IndexEntry, IndexReference};

pub const DEFAULT_FILE_TYPE: &str = "DLTINS";

/// Reads an index document from disk and returns the first archive of `file_type` it names.
pub fn parse_index_file(
    path: impl AsRef<Path>,
    file_type: &str,
) -> Result<IndexReference, ParserError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| ParserError::io(path, err))?;
    let entries = parse_index_entries(BufReader::new(file))?;
    select_reference(&entries, file_type).ok_or_else(|| ParserError::MissingReference {
        file_type: file_type.to_string(),
    })
}

pub fn select_reference(entries: &[IndexEntry], file_type: &str) -> Option<IndexReference> {
    entries
        .iter()
        .filter(|entry| entry.matches_type(file_type))
        .find_map(IndexEntry::reference)
}

/// Collects every `<doc>` entry of an index document, in document order.
pub fn parse_index_entries<R: BufRead>(input: R) -> Result<Vec<IndexEntry>, ParserError> {
    let mut reader = Reader::from_reader(input);

    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current: Option<IndexEntry> = None;
    let mut field: Option<(String, String)> = None;
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| ParserError::xml(reader.buffer_position() as u64, err))?;

        match event {
            Event::Start(start) => {
                depth += 1;
                seen_root = true;
                if start.local_name().as_ref() == b"doc" {
                    current = Some(IndexEntry::default());
                } else if current.is_some() {
                    field = field_name(&start, reader.buffer_position() as u64)?
                        .map(|name| (name, String::new()));
                }
            }
            Event::Empty(start) => {
                seen_root = true;
                if start.local_name().as_ref() == b"doc" {
                    entries.push(IndexEntry::default());
                }
            }
            Event::Text(text) => {
                if let Some((_, value)) = field.as_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|err| ParserError::xml(reader.buffer_position() as u64, err))?;
                    value.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some((_, value)) = field.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                if end.local_name().as_ref() == b"doc" {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                } else if let Some((name, value)) = field.take() {
                    if let Some(entry) = current.as_mut() {
                        entry.set_field(&name, value.trim().to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ParserError::NoRootElement);
    }
    if depth > 0 {
        return Err(ParserError::Truncated {
            open_elements: depth,
        });
    }

    Ok(entries)
}

fn field_name(start: &BytesStart<'_>, position: u64) -> Result<Option<String>, ParserError> {
    for attr in start.attributes() {
        let attr = attr.map_err(|err| ParserError::xml(position, err))?;
        if attr.key.local_name().as_ref() == b"name" {
            let value = attr
                .unescape_value()
                .map_err(|err| ParserError::xml(position, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
