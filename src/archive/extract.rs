//! Checked extraction into caller-provided or scoped temporary folders

use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::inspector::{has_zip_signature, ArchiveInspector};
use crate::error::{ProcessingError, Result};

impl ArchiveInspector {
    /// Extract the archive into `target` and return the extraction root.
    ///
    /// Security checks run first and only cover this layer. With `recurse`,
    /// every extracted ZIP is checked and unpacked in turn into a folder
    /// named after it, then deleted, one level at a time.
    pub fn extract_to(&self, target: &Path, recurse: bool) -> Result<PathBuf> {
        self.extract_layer(target, recurse, 0)
    }

    fn extract_layer(&self, target: &Path, recurse: bool, depth: usize) -> Result<PathBuf> {
        if depth > self.max_depth {
            return Err(ProcessingError::NestingTooDeep {
                path: self.path.clone(),
                depth: self.max_depth,
            });
        }

        self.check_security()?;
        fs::create_dir_all(target)?;

        let mut archive = self.open()?;
        let mut nested = Vec::new();
        let limit = self.limits.max_uncompressed_size;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| self.invalid(e.to_string()))?;

            let relative = entry
                .enclosed_name()
                .map(|p| p.to_path_buf())
                .ok_or_else(|| ProcessingError::UnsafeEntry {
                    path: self.path.clone(),
                    entry: entry.name().to_string(),
                })?;
            let out = target.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&out)?;
                continue;
            }
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }

            // headers can lie about the size, cap what is actually written
            let mut file = File::create(&out)?;
            let written = io::copy(&mut entry.by_ref().take(limit + 1), &mut file)?;
            if written > limit {
                drop(file);
                fs::remove_file(&out)?;
                return Err(ProcessingError::ZipBomb {
                    path: self.path.clone(),
                    entry: entry.name().to_string(),
                    reason: format!("expands beyond {} bytes", limit),
                });
            }

            if recurse && is_zip_file(&out) {
                nested.push(out);
            }
        }
        drop(archive);

        debug!("Extracted {} to {}", self.path.display(), target.display());

        for inner in nested {
            let folder = unpack_folder_for(&inner);
            ArchiveInspector {
                path: inner.clone(),
                limits: self.limits,
                max_depth: self.max_depth,
            }
            .extract_layer(&folder, true, depth + 1)?;
            fs::remove_file(&inner)?;
        }

        Ok(target.to_path_buf())
    }
}

fn is_zip_file(path: &Path) -> bool {
    let by_name = path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("zip"));
    by_name && has_zip_signature(path)
}

/// `child.zip` unpacks into `child/`, or `child_unpacked/` if `child/` exists.
fn unpack_folder_for(archive: &Path) -> PathBuf {
    let folder = archive.with_extension("");
    if !folder.exists() {
        return folder;
    }
    let stem = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    folder.with_file_name(format!("{}_unpacked", stem))
}

/// A single extracted archive layer in a temporary folder.
///
/// The folder is removed when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct ScopedExtraction {
    dir: TempDir,
}

impl ScopedExtraction {
    /// Check and extract one layer of `inspector`'s archive.
    pub fn extract(inspector: &ArchiveInspector) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("vdi2770-").tempdir()?;
        inspector.extract_to(dir.path(), false)?;
        info!("Unpacked {} into {}", inspector.path().display(), dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
