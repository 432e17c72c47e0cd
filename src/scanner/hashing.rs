//! SHA-256 fingerprints for reports and statistics

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Hex-encoded SHA-256 of a file's content, read in 8 KiB chunks.
///
/// # Arguments
/// * `path` - File to hash
///
/// # Returns
/// Lowercase hex digest (64 characters)
pub fn compute_file_hash(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
