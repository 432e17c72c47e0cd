//! PDF/A conformance detection from the XMP metadata stream

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const PDFA_ID_NAMESPACE: &str = "http://www.aiim.org/pdfa/ns/id/";
const DEFAULT_PDFA_ID_PREFIX: &str = "pdfaid";

/// Declared PDF/A part and conformance level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConformanceLevel {
    Pdfa1A,
    Pdfa1B,
    Pdfa2A,
    Pdfa2B,
    Pdfa2U,
    Pdfa3A,
    Pdfa3B,
    Pdfa3U,
}

impl ConformanceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConformanceLevel::Pdfa1A => "1A",
            ConformanceLevel::Pdfa1B => "1B",
            ConformanceLevel::Pdfa2A => "2A",
            ConformanceLevel::Pdfa2B => "2B",
            ConformanceLevel::Pdfa2U => "2U",
            ConformanceLevel::Pdfa3A => "3A",
            ConformanceLevel::Pdfa3B => "3B",
            ConformanceLevel::Pdfa3U => "3U",
        }
    }

    /// Level `B` ("basic") only guarantees visual reproduction.
    pub fn is_level_b(&self) -> bool {
        self.as_str().ends_with('B')
    }
}

impl fmt::Display for ConformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConformanceLevel {
    type Err = PdfValidationError;

    /// Accepts `3A`, `3a`, `PDF/A-3A` and similar spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let level = normalized.strip_prefix("PDF/A-").unwrap_or(&normalized);
        match level {
            "1A" => Ok(ConformanceLevel::Pdfa1A),
            "1B" => Ok(ConformanceLevel::Pdfa1B),
            "2A" => Ok(ConformanceLevel::Pdfa2A),
            "2B" => Ok(ConformanceLevel::Pdfa2B),
            "2U" => Ok(ConformanceLevel::Pdfa2U),
            "3A" => Ok(ConformanceLevel::Pdfa3A),
            "3B" => Ok(ConformanceLevel::Pdfa3B),
            "3U" => Ok(ConformanceLevel::Pdfa3U),
            _ => Err(PdfValidationError::UnsupportedLevel(s.trim().to_string())),
        }
    }
}

/// Why a PDF's conformance level could not be determined. One variant
/// per failure mode so callers can tell them apart.
#[derive(Error, Debug)]
pub enum PdfValidationError {
    #[error("PDF file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("cannot read PDF {}: {reason}", .path.display())]
    InvalidPdf { path: PathBuf, reason: String },

    #[error("PDF has no embedded XMP metadata stream: {}", .0.display())]
    NoMetadata(PathBuf),

    #[error("XMP metadata is not well-formed: {0}")]
    MalformedXmp(String),

    #[error("XMP metadata carries no PDF/A identification")]
    NoPdfaIdentification,

    #[error("unsupported PDF/A conformance level '{0}'")]
    UnsupportedLevel(String),

    #[error("I/O error while reading PDF: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            PdfValidationError::FileNotFound(_) => "pdf.not_found",
            PdfValidationError::InvalidPdf { .. } => "pdf.invalid",
            PdfValidationError::NoMetadata(_) => "pdf.no_metadata",
            PdfValidationError::MalformedXmp(_) => "pdf.malformed_xmp",
            PdfValidationError::NoPdfaIdentification => "pdf.no_pdfa_id",
            PdfValidationError::UnsupportedLevel(_) => "pdf.unsupported_level",
            PdfValidationError::Io(_) => "pdf.io",
        }
    }
}

/// Read the PDF/A level declared in a PDF's XMP metadata.
pub fn detect_conformance_level(path: &Path) -> Result<ConformanceLevel, PdfValidationError> {
    if !path.is_file() {
        return Err(PdfValidationError::FileNotFound(path.to_path_buf()));
    }
    check_header(path)?;

    let xmp = read_xmp_metadata(path)?;
    let level = parse_xmp_conformance(&xmp)?;
    debug!("{} declares PDF/A-{}", path.display(), level);
    Ok(level)
}

fn check_header(path: &Path) -> Result<(), PdfValidationError> {
    let mut header = [0u8; 5];
    let mut file = File::open(path)?;
    let n = file.read(&mut header)?;
    if n < header.len() || &header != b"%PDF-" {
        return Err(PdfValidationError::InvalidPdf {
            path: path.to_path_buf(),
            reason: "missing %PDF- header".to_string(),
        });
    }
    Ok(())
}

/// Catalog -> /Metadata -> stream content, as text.
fn read_xmp_metadata(path: &Path) -> Result<String, PdfValidationError> {
    let invalid = |reason: String| PdfValidationError::InvalidPdf {
        path: path.to_path_buf(),
        reason,
    };

    // lopdf can panic on malformed input, keep it from taking the run down
    let owned = path.to_path_buf();
    let document = match panic::catch_unwind(AssertUnwindSafe(|| lopdf::Document::load(&owned))) {
        Ok(Ok(doc)) => doc,
        Ok(Err(e)) => return Err(invalid(e.to_string())),
        Err(_) => return Err(invalid("parser panicked".to_string())),
    };

    let catalog = document
        .catalog()
        .map_err(|e| invalid(format!("cannot read catalog: {}", e)))?;

    let no_metadata = || PdfValidationError::NoMetadata(path.to_path_buf());
    let meta_id = catalog
        .get(b"Metadata")
        .and_then(|obj| obj.as_reference())
        .map_err(|_| no_metadata())?;
    let stream = document
        .get_object(meta_id)
        .and_then(|obj| obj.as_stream())
        .map_err(|_| no_metadata())?;

    let bytes = if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|e| invalid(format!("cannot decompress metadata stream: {}", e)))?
    } else {
        stream.content.clone()
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(no_metadata());
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extract `pdfaid:part` and `pdfaid:conformance` from an XMP packet.
///
/// Both the attribute form (`pdfaid:part="3"`) and the element form
/// (`<pdfaid:part>3</pdfaid:part>`) are recognized, under whatever prefix
/// the packet binds to the PDF/A identification namespace.
pub fn parse_xmp_conformance(xml: &str) -> Result<ConformanceLevel, PdfValidationError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut prefixes: HashSet<String> = HashSet::new();
    prefixes.insert(DEFAULT_PDFA_ID_PREFIX.to_string());

    let mut part: Option<String> = None;
    let mut conformance: Option<String> = None;
    let mut current: Option<&'static str> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| PdfValidationError::MalformedXmp(e.to_string()))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                collect_prefixes(e, &mut prefixes)?;
                read_attributes(e, &prefixes, &mut part, &mut conformance)?;

                let is_start = matches!(event, Event::Start(_));
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                current = match split_qname(&name) {
                    (Some(prefix), "part") if is_start && prefixes.contains(prefix) => Some("part"),
                    (Some(prefix), "conformance") if is_start && prefixes.contains(prefix) => {
                        Some("conformance")
                    }
                    _ => None,
                };
            }
            Event::Text(ref t) => {
                if let Some(field) = current {
                    let value = t
                        .unescape()
                        .map_err(|e| PdfValidationError::MalformedXmp(e.to_string()))?
                        .trim()
                        .to_string();
                    match field {
                        "part" => part = Some(value),
                        _ => conformance = Some(value),
                    }
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }

    match (part, conformance) {
        (Some(p), Some(c)) => format!("{}{}", p, c).parse(),
        (Some(p), None) => Err(PdfValidationError::UnsupportedLevel(p)),
        _ => Err(PdfValidationError::NoPdfaIdentification),
    }
}

fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

fn collect_prefixes(e: &BytesStart<'_>, prefixes: &mut HashSet<String>) -> Result<(), PdfValidationError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| PdfValidationError::MalformedXmp(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if let Some(prefix) = key.strip_prefix("xmlns:") {
            if attr.value.as_ref() == PDFA_ID_NAMESPACE.as_bytes() {
                prefixes.insert(prefix.to_string());
            }
        }
    }
    Ok(())
}

fn read_attributes(
    e: &BytesStart<'_>,
    prefixes: &HashSet<String>,
    part: &mut Option<String>,
    conformance: &mut Option<String>,
) -> Result<(), PdfValidationError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| PdfValidationError::MalformedXmp(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let (Some(prefix), local) = split_qname(&key) else {
            continue;
        };
        if !prefixes.contains(prefix) {
            continue;
        }
        let target = match local {
            "part" => &mut *part,
            "conformance" => &mut *conformance,
            _ => continue,
        };
        let value = attr
            .unescape_value()
            .map_err(|e| PdfValidationError::MalformedXmp(e.to_string()))?;
        *target = Some(value.trim().to_string());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::{dictionary, Document, Object, Stream};
    use std::path::Path;

    pub fn xmp_packet(part: &str, conformance: &str) -> String {
        format!(
            r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about="" xmlns:pdfaid="http://www.aiim.org/pdfa/ns/id/">
      <pdfaid:part>{part}</pdfaid:part>
      <pdfaid:conformance>{conformance}</pdfaid:conformance>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#
        )
    }

    /// Write a one-page PDF, with an XMP stream when `xmp` is given.
    pub fn write_pdf(path: &Path, xmp: Option<&str>) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if let Some(xmp) = xmp {
            let metadata = doc.add_object(Stream::new(
                dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
                xmp.as_bytes().to_vec(),
            ));
            catalog.set("Metadata", metadata);
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }
}
