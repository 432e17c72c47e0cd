//! VDI 2770 metadata: model, parsing and validation

pub mod mime;
pub mod model;
pub mod parser;
pub mod validator;

pub use mime::{mime_compatible, mime_equals, probe_mime_type, MimeType};
pub use model::{DigitalFile, Document, DocumentId};
pub use parser::{parse, parse_file, ParseError, VDI2770_NAMESPACE};
pub use validator::{accepts_basic_pdfa, validate, validate_main};

/// Marks a document container
pub const DOCUMENT_METADATA_FILE: &str = "VDI2770_Metadata.xml";

/// Marks a documentation (main) container
pub const MAIN_METADATA_FILE: &str = "VDI2770_Main.xml";
