//! VDI 2770 Validator Library
//!
//! Validation and packaging of VDI 2770 documentation containers: metadata
//! parsing and rule checks, hardened ZIP handling, PDF/A conformance
//! detection and report trees.

pub mod archive;
pub mod config;
pub mod container;
pub mod core;
pub mod error;
pub mod metadata;
pub mod pdf;
pub mod reporting;
pub mod scanner;

pub use config::{ArchiveLimits, ValidatorConfig};
pub use container::{ContainerBuilder, ContainerProcessor};
pub use error::ProcessingError;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::archive::{ArchiveInspector, ScopedExtraction};
    pub use crate::config::{ArchiveLimits, ValidatorConfig};
    pub use crate::container::{classify, ContainerBuilder, ContainerProcessor, NodeKind};
    pub use crate::core::{
        has_errors, has_warnings, ContainerType, Fault, FaultLevel, FaultType, Message, MessageLevel, Report,
        ReportSummary,
    };
    pub use crate::error::ProcessingError;
    pub use crate::metadata::{mime_equals, parse, parse_file, validate, validate_main, Document, DocumentId};
    pub use crate::pdf::{detect_conformance_level, ConformanceLevel, PdfValidationError};
    pub use crate::reporting::{
        render_text, write_json_report, write_text_report, StatisticsRecord, StatisticsSink,
    };
    pub use crate::scanner::{collect_inputs, compute_file_hash};
}
