//! Input discovery for batch validation

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::archive::has_zip_signature;
use crate::container::classify;

fn is_archive(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.to_string_lossy().to_lowercase() == "zip")
        && has_zip_signature(path)
}

/// Collect container archives and container folders below `dir`.
///
/// A folder that is a container is returned as a whole and not descended
/// into, its nested containers belong to it. If `dir` itself is a
/// container it is the only result.
///
/// # Arguments
/// * `dir` - Directory to scan
/// * `recursive` - Whether to scan subdirectories recursively
///
/// # Returns
/// Sorted paths of archives and container folders
pub fn collect_inputs(dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    if classify(dir).is_container() {
        return Ok(vec![dir.to_path_buf()]);
    }

    let mut inputs = Vec::new();

    if recursive {
        let mut walker = WalkDir::new(dir).follow_links(false).min_depth(1).into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type().is_dir() {
                if classify(path).is_container() {
                    inputs.push(path.to_path_buf());
                    walker.skip_current_dir();
                }
            } else if entry.file_type().is_file() && is_archive(path) {
                inputs.push(path.to_path_buf());
            }
        }
    } else {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if (file_type.is_dir() && classify(&path).is_container())
                || (file_type.is_file() && is_archive(&path))
            {
                inputs.push(path);
            }
        }
    }

    inputs.sort();
    Ok(inputs)
}
