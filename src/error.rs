use std::path::PathBuf;
use thiserror::Error;

use crate::core::Message;
use crate::metadata::ParseError;

/// Fatal errors for the container currently being processed.
///
/// Every variant maps to a stable [`code`](ProcessingError::code) so a
/// presentation layer can localize the message without parsing the text.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("input is neither a ZIP archive nor a folder: {}", .0.display())]
    UnsupportedInput(PathBuf),

    #[error("no VDI 2770 metadata file in {}", .0.display())]
    NotAContainer(PathBuf),

    #[error("missing referenced file '{file}' in {}", .container.display())]
    MissingFile { container: PathBuf, file: String },

    #[error("not a valid ZIP archive: {} ({reason})", .path.display())]
    InvalidArchive { path: PathBuf, reason: String },

    #[error("encrypted ZIP archives are not supported: {}", .0.display())]
    EncryptedArchive(PathBuf),

    #[error("archive {} rejected as zip bomb: entry '{entry}' {reason}", .path.display())]
    ZipBomb {
        path: PathBuf,
        entry: String,
        reason: String,
    },

    #[error("archive {} contains an entry escaping the extraction folder: '{entry}'", .path.display())]
    UnsafeEntry { path: PathBuf, entry: String },

    #[error("container {} exceeds the maximum nesting depth of {depth}", .path.display())]
    NestingTooDeep { path: PathBuf, depth: usize },

    #[error("cannot parse metadata file {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("metadata file {} has {errors} error(s)", .path.display())]
    InvalidMetadata { path: PathBuf, errors: usize },

    #[error("cannot write archive: {0}")]
    ZipWrite(#[from] zip::result::ZipError),
}

impl ProcessingError {
    pub fn code(&self) -> &'static str {
        match self {
            ProcessingError::Io(_) => "io.error",
            ProcessingError::Config(_) => "config.invalid",
            ProcessingError::InputNotFound(_) => "input.not_found",
            ProcessingError::UnsupportedInput(_) => "input.unsupported",
            ProcessingError::NotAContainer(_) => "container.no_metadata",
            ProcessingError::MissingFile { .. } => "container.missing_file",
            ProcessingError::InvalidArchive { .. } => "zip.invalid",
            ProcessingError::EncryptedArchive(_) => "zip.encrypted",
            ProcessingError::ZipBomb { .. } => "zip.bomb",
            ProcessingError::UnsafeEntry { .. } => "zip.unsafe_entry",
            ProcessingError::NestingTooDeep { .. } => "container.nesting_depth",
            ProcessingError::Metadata { .. } => "metadata.parse",
            ProcessingError::InvalidMetadata { .. } => "metadata.invalid",
            ProcessingError::ZipWrite(_) => "zip.write",
        }
    }

    /// Render this error as an error-level report message.
    pub fn to_message(&self) -> Message {
        Message::error(self.code(), self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProcessingError>;
