//! Metadata XML parsing
//!
//! Parsing only fails on input that cannot be a VDI 2770 document at all
//! (empty, malformed XML, wrong root element or namespace). Missing or
//! invalid values are left to the validator.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::model::Document;

pub const VDI2770_NAMESPACE: &str = "http://www.vdi.de/schemas/vdi2770";
const ROOT_ELEMENT: &[u8] = b"Document";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("metadata file is empty")]
    Empty,

    #[error("metadata is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unexpected root element '{0}', expected 'Document'")]
    UnexpectedRoot(String),

    #[error("unexpected default namespace '{0}'")]
    UnexpectedNamespace(String),

    #[error("XML does not match the VDI 2770 structure: {0}")]
    Structure(#[from] quick_xml::DeError),

    #[error("cannot read metadata file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse VDI 2770 metadata from raw bytes.
pub fn parse(bytes: &[u8]) -> Result<Document, ParseError> {
    let text = std::str::from_utf8(bytes)?.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    check_root(text)?;

    Ok(quick_xml::de::from_str::<Document>(text)?)
}

/// Read and parse a metadata file.
pub fn parse_file(path: &Path) -> Result<Document, ParseError> {
    let bytes = fs::read(path)?;
    parse(&bytes)
}

/// Verify the root element is `Document`, in the VDI 2770 namespace when
/// a default namespace is declared.
fn check_root(text: &str) -> Result<(), ParseError> {
    let mut reader = Reader::from_str(text);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                if e.local_name().as_ref() != ROOT_ELEMENT {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    return Err(ParseError::UnexpectedRoot(name));
                }

                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"xmlns" {
                        let ns = String::from_utf8_lossy(&attr.value).into_owned();
                        if ns.trim() != VDI2770_NAMESPACE {
                            return Err(ParseError::UnexpectedNamespace(ns));
                        }
                    }
                }
                return Ok(());
            }
            Event::Eof => return Err(ParseError::Empty),
            _ => {}
        }
    }
}
