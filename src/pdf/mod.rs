//! PDF/A conformance detection

pub mod conformance;

pub use conformance::{detect_conformance_level, parse_xmp_conformance, ConformanceLevel, PdfValidationError};
