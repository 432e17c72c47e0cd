//! ZIP structure and security checks
//!
//! All checks work on the central directory only and never decompress
//! entry data, so they are safe to run on untrusted archives.

use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::config::{ArchiveLimits, DEFAULT_MAX_NESTING_DEPTH};
use crate::core::{Fault, FaultType};
use crate::error::{ProcessingError, Result};

const LOCAL_HEADER_SIGNATURE: &[u8; 4] = b"PK\x03\x04";
const EMPTY_ARCHIVE_SIGNATURE: &[u8; 4] = b"PK\x05\x06";

/// Returns `true` if the file starts with a ZIP signature.
pub fn has_zip_signature(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    match File::open(path).and_then(|mut f| f.read_exact(&mut magic)) {
        Ok(()) => &magic == LOCAL_HEADER_SIGNATURE || &magic == EMPTY_ARCHIVE_SIGNATURE,
        Err(_) => false,
    }
}

/// Central directory record of one archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub is_dir: bool,
    pub encrypted: bool,
}

/// Read-only view on one ZIP file on disk.
#[derive(Debug, Clone)]
pub struct ArchiveInspector {
    pub(crate) path: PathBuf,
    pub(crate) limits: ArchiveLimits,
    pub(crate) max_depth: usize,
}

impl ArchiveInspector {
    pub fn new(path: impl Into<PathBuf>, limits: ArchiveLimits) -> Self {
        Self {
            path: path.into(),
            limits,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    /// Limit how many nested archive layers [`extract_to`](Self::extract_to)
    /// unwraps.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn open(&self) -> Result<ZipArchive<BufReader<File>>> {
        if !self.path.exists() {
            return Err(ProcessingError::InputNotFound(self.path.clone()));
        }
        let file = File::open(&self.path)?;
        ZipArchive::new(BufReader::new(file)).map_err(|e| self.invalid(e.to_string()))
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> ProcessingError {
        ProcessingError::InvalidArchive {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    /// Cheap signature check; says nothing about the archive's integrity.
    pub fn is_zip(&self) -> bool {
        has_zip_signature(&self.path)
    }

    /// The central directory can be read and every entry header is intact.
    pub fn is_valid_zip(&self) -> bool {
        self.list_entries().is_ok()
    }

    pub fn is_encrypted(&self) -> Result<bool> {
        Ok(self.list_entries()?.iter().any(|e| e.encrypted))
    }

    /// Whether an entry with this name exists. Backslashes are treated as
    /// path separators and a trailing `/` is ignored.
    pub fn contains_entry(&self, name: &str) -> Result<bool> {
        let wanted = normalize_entry_name(name);
        Ok(self
            .list_entries()?
            .iter()
            .any(|e| normalize_entry_name(&e.name) == wanted))
    }

    pub fn list_entries(&self) -> Result<Vec<ArchiveEntry>> {
        let mut archive = self.open()?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).map_err(|e| self.invalid(e.to_string()))?;
            entries.push(ArchiveEntry {
                name: entry.name().to_string(),
                size: entry.size(),
                compressed_size: entry.compressed_size(),
                is_dir: entry.is_dir(),
                encrypted: entry.encrypted(),
            });
        }
        Ok(entries)
    }

    /// First entry exceeding the configured limits, with the reason.
    fn find_bomb_entry(&self) -> Result<Option<(String, String)>> {
        for entry in self.list_entries()? {
            if entry.is_dir {
                continue;
            }
            if let Some(reason) = bomb_reason(&entry, &self.limits) {
                return Ok(Some((entry.name, reason)));
            }
        }
        Ok(None)
    }

    /// Zip-bomb heuristic over the first layer of entries.
    pub fn detect_bomb(&self) -> Result<bool> {
        Ok(self.find_bomb_entry()?.is_some())
    }

    /// Run every security check required before extraction, in order:
    /// well-formed, not encrypted, no bomb characteristics.
    pub fn check_security(&self) -> Result<()> {
        if !self.is_zip() {
            if !self.path.exists() {
                return Err(ProcessingError::InputNotFound(self.path.clone()));
            }
            return Err(self.invalid("missing ZIP signature"));
        }

        let entries = self.list_entries()?;

        if entries.iter().any(|e| e.encrypted) {
            warn!("Rejecting encrypted archive {}", self.path.display());
            return Err(ProcessingError::EncryptedArchive(self.path.clone()));
        }

        if let Some((entry, reason)) = self.find_bomb_entry()? {
            warn!("Rejecting archive {}: '{}' {}", self.path.display(), entry, reason);
            return Err(ProcessingError::ZipBomb {
                path: self.path.clone(),
                entry,
                reason,
            });
        }

        debug!("{} passed security checks ({} entries)", self.path.display(), entries.len());
        Ok(())
    }

    /// Structural findings that do not prevent processing.
    ///
    /// Directory entries are tolerated but reported as warnings, the
    /// container format has no folder semantics.
    pub fn validate_zip_file(&self) -> Result<Vec<Fault>> {
        let faults = self
            .list_entries()?
            .into_iter()
            .enumerate()
            .filter(|(_, e)| e.is_dir)
            .map(|(index, e)| {
                Fault::warning(FaultType::HasInvalidValue, "ZipEntry", "archive contains a directory entry")
                    .with_index(index)
                    .with_value(e.name)
            })
            .collect();
        Ok(faults)
    }
}

fn normalize_entry_name(name: &str) -> String {
    name.replace('\\', "/").trim_end_matches('/').to_string()
}

fn bomb_reason(entry: &ArchiveEntry, limits: &ArchiveLimits) -> Option<String> {
    // sizes beyond i64 come from corrupt or forged headers
    if entry.size > i64::MAX as u64 || entry.compressed_size > i64::MAX as u64 {
        return Some("declares an invalid size".to_string());
    }
    if entry.size > limits.max_uncompressed_size {
        return Some(format!(
            "expands to {} bytes, limit is {}",
            entry.size, limits.max_uncompressed_size
        ));
    }
    if entry.size == 0 {
        return None;
    }
    if entry.compressed_size == 0 {
        return Some("has no compressed data but a non-zero size".to_string());
    }

    let factor = entry.size as f64 / entry.compressed_size as f64;
    if factor > limits.max_compression_factor {
        return Some(format!(
            "has compression factor {:.1}, limit is {}",
            factor, limits.max_compression_factor
        ));
    }
    None
}
