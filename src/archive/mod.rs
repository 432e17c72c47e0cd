//! ZIP inspection, security hardening and extraction

pub mod extract;
pub mod inspector;

pub use extract::ScopedExtraction;
pub use inspector::{has_zip_signature, ArchiveEntry, ArchiveInspector};
