//! Packaging a validated folder into a container archive

use log::{debug, info, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::classify::{classify, metadata_path, NodeKind};
use super::resolver::ReferenceResolver;
use crate::archive::{has_zip_signature, ArchiveInspector, ScopedExtraction};
use crate::config::ValidatorConfig;
use crate::core::has_errors;
use crate::error::{ProcessingError, Result};
use crate::metadata::{self, Document};

/// A container archive and the metadata it was built from
#[derive(Debug)]
struct Built {
    archive: PathBuf,
    document: Document,
}

/// Builds `<primary document id>.zip` archives from container folders.
pub struct ContainerBuilder<'a> {
    config: &'a ValidatorConfig,
}

/// Replace everything but ASCII letters, digits, `.`, `-` and `_`.
pub fn sanitize_file_name(id: &str) -> String {
    let cleaned: String = id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "container".to_string()
    } else {
        cleaned.to_string()
    }
}

impl<'a> ContainerBuilder<'a> {
    pub fn new(config: &'a ValidatorConfig) -> Self {
        Self { config }
    }

    /// Build the container in `folder` into `out_dir` and return the
    /// archive path.
    ///
    /// Child containers are built first. Only children referenced by the
    /// main document are embedded, unreferenced or failing ones are
    /// skipped with a warning.
    ///
    /// # Arguments
    /// * `folder` - Document or documentation container folder
    /// * `out_dir` - Directory receiving `<primary id>.zip`, created if missing
    ///
    /// # Returns
    /// Path of the written archive
    pub fn create_container(&self, folder: &Path, out_dir: &Path) -> Result<PathBuf> {
        let built = self.build(folder, out_dir, 0)?;
        info!("Created {}", built.archive.display());
        Ok(built.archive)
    }

    fn build(&self, folder: &Path, out_dir: &Path, depth: usize) -> Result<Built> {
        if !folder.is_dir() {
            return Err(ProcessingError::InputNotFound(folder.to_path_buf()));
        }
        if depth > self.config.max_nesting_depth {
            return Err(ProcessingError::NestingTooDeep {
                path: folder.to_path_buf(),
                depth: self.config.max_nesting_depth,
            });
        }

        let kind = classify(folder);
        let meta_path = metadata_path(folder, kind)
            .ok_or_else(|| ProcessingError::NotAContainer(folder.to_path_buf()))?;

        let document = metadata::parse_file(&meta_path).map_err(|source| ProcessingError::Metadata {
            path: meta_path.clone(),
            source,
        })?;
        let faults = match kind {
            NodeKind::Documentation => metadata::validate_main(&document, self.config.strict),
            _ => metadata::validate(&document, self.config.strict),
        };
        if has_errors(&faults) {
            return Err(ProcessingError::InvalidMetadata {
                path: meta_path,
                errors: faults.iter().filter(|f| f.is_error()).count(),
            });
        }

        let mut files: Vec<String> = Vec::new();
        for file in document.digital_files() {
            let name = file.file_name.trim().replace('\\', "/");
            if !folder.join(&name).is_file() {
                return Err(ProcessingError::MissingFile {
                    container: folder.to_path_buf(),
                    file: name,
                });
            }
            if !files.contains(&name) {
                files.push(name);
            }
        }

        let id = document
            .primary_id()
            .map(|id| sanitize_file_name(&id.id))
            .unwrap_or_else(|| sanitize_file_name(""));

        // keeps child archives alive until the parent is written
        let staging = tempfile::Builder::new().prefix("vdi2770-build-").tempdir()?;
        let children = match kind {
            NodeKind::Documentation => self.build_children(folder, &document, staging.path(), depth)?,
            _ => Vec::new(),
        };

        fs::create_dir_all(out_dir)?;
        let target = out_dir.join(format!("{}.zip", id));
        let metadata_name = kind.metadata_file_name().unwrap_or_default();

        let mut tmp = NamedTempFile::new_in(out_dir)?;
        {
            let mut zip = ZipWriter::new(tmp.as_file_mut());
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            add_file(&mut zip, metadata_name, &meta_path, options)?;
            for name in &files {
                add_file(&mut zip, name, &folder.join(name), options)?;
            }
            for child in &children {
                let name = child
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                add_file(&mut zip, &name, child, options)?;
            }
            zip.finish()?;
        }
        tmp.persist(&target).map_err(|e| ProcessingError::Io(e.error))?;

        debug!(
            "Wrote {} with {} file(s) and {} child container(s)",
            target.display(),
            files.len(),
            children.len()
        );
        Ok(Built {
            archive: target,
            document,
        })
    }

    /// Build every child container into `staging` and return the archives
    /// referenced by `main`.
    fn build_children(&self, folder: &Path, main: &Document, staging: &Path, depth: usize) -> Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = fs::read_dir(folder)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<_>>()?;
        entries.sort();

        let declared: Vec<String> = main
            .digital_files()
            .map(|f| f.file_name.trim().replace('\\', "/"))
            .collect();

        let mut built: Vec<Built> = Vec::new();
        for (slot, path) in entries.into_iter().enumerate() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            // one folder per child so equal ids cannot overwrite each other
            let slot_dir = staging.join(slot.to_string());
            let result = if path.is_dir() {
                if !classify(&path).is_container() {
                    continue;
                }
                self.build(&path, &slot_dir, depth + 1)
            } else if name.to_ascii_lowercase().ends_with(".zip")
                && has_zip_signature(&path)
                && !declared.contains(&name)
            {
                self.adopt_archive(&path, &slot_dir)
            } else {
                continue;
            };

            match result {
                Ok(child) => {
                    if built.iter().any(|b| b.archive.file_name() == child.archive.file_name()) {
                        warn!("Skipping {}: another child uses the same archive name", name);
                        continue;
                    }
                    built.push(child);
                }
                Err(e) => warn!("Skipping child container {}: {}", name, e),
            }
        }

        let mut resolver = ReferenceResolver::new();
        for (index, child) in built.iter().enumerate() {
            resolver.register(index, &child.document);
        }
        let resolution = resolver.resolve(main);
        for (_, id) in &resolution.unresolved {
            warn!("Referenced document {} is not part of the package", id);
        }

        let mut referenced = Vec::new();
        for (index, child) in built.into_iter().enumerate() {
            if resolution.referenced.contains(&index) {
                referenced.push(child.archive);
            } else {
                info!("Leaving out {}: not referenced by the main document", child.archive.display());
            }
        }
        Ok(referenced)
    }

    /// Take over an already built child archive after checking it. The
    /// archive is refused when its metadata has errors.
    fn adopt_archive(&self, archive: &Path, staging: &Path) -> Result<Built> {
        let inspector = ArchiveInspector::new(archive, self.config.limits)
            .with_max_depth(self.config.max_nesting_depth);
        let extraction = ScopedExtraction::extract(&inspector)?;

        let kind = classify(extraction.path());
        let meta_path = metadata_path(extraction.path(), kind)
            .ok_or_else(|| ProcessingError::NotAContainer(archive.to_path_buf()))?;
        let document = metadata::parse_file(&meta_path).map_err(|source| ProcessingError::Metadata {
            path: archive.to_path_buf(),
            source,
        })?;
        let faults = match kind {
            NodeKind::Documentation => metadata::validate_main(&document, self.config.strict),
            _ => metadata::validate(&document, self.config.strict),
        };
        if has_errors(&faults) {
            return Err(ProcessingError::InvalidMetadata {
                path: archive.to_path_buf(),
                errors: faults.iter().filter(|f| f.is_error()).count(),
            });
        }

        fs::create_dir_all(staging)?;
        let target = staging.join(archive.file_name().unwrap_or_default());
        fs::copy(archive, &target)?;
        Ok(Built {
            archive: target,
            document,
        })
    }
}

fn add_file<W: io::Write + io::Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    source: &Path,
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(name, options)?;
    let mut file = File::open(source)?;
    io::copy(&mut file, zip)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::inspector::test_support::write_zip;
    use crate::config::ArchiveLimits;
    use crate::container::test_support::{document_folder, metadata_xml};
    use crate::metadata::MAIN_METADATA_FILE;
    use tempfile::TempDir;

    fn config() -> ValidatorConfig {
        ValidatorConfig::new(ArchiveLimits::new(100.0, 50 * 1024 * 1024).unwrap())
    }

    fn main_folder(root: &Path, targets: &[&str]) -> PathBuf {
        let main = root.join("main");
        fs::create_dir_all(&main).unwrap();
        fs::write(main.join("overview.txt"), "overview").unwrap();
        fs::write(
            main.join(MAIN_METADATA_FILE),
            metadata_xml("MAIN/2024 #1", "01-01", targets, &[("overview.txt", "text/plain")]),
        )
        .unwrap();
        main
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("MAN-001"), "MAN-001");
        assert_eq!(sanitize_file_name("a/b c"), "a_b_c");
        assert_eq!(sanitize_file_name("../x"), "_x");
        assert_eq!(sanitize_file_name("   "), "container");
    }

    #[test]
    fn test_build_document_container() {
        let dir = TempDir::new().unwrap();
        let folder = document_folder(dir.path(), "doc", "DOC-1");
        fs::write(folder.join("stray.bin"), [1u8, 2, 3]).unwrap();

        let config = config();
        let out = dir.path().join("out");
        let archive = ContainerBuilder::new(&config).create_container(&folder, &out).unwrap();

        assert_eq!(archive, out.join("DOC-1.zip"));
        let inspector = ArchiveInspector::new(&archive, config.limits);
        let names: Vec<String> = inspector.list_entries().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["VDI2770_Metadata.xml", "notes.txt"]);
    }

    #[test]
    fn test_build_embeds_only_referenced_children() {
        let dir = TempDir::new().unwrap();
        let main = main_folder(dir.path(), &["X"]);
        document_folder(&main, "x", "X");
        document_folder(&main, "y", "Y");

        let config = config();
        let out = dir.path().join("out");
        let archive = ContainerBuilder::new(&config).create_container(&main, &out).unwrap();

        assert_eq!(archive, out.join("MAIN_2024__1.zip"));
        let inspector = ArchiveInspector::new(&archive, config.limits);
        assert!(inspector.contains_entry("X.zip").unwrap());
        assert!(!inspector.contains_entry("Y.zip").unwrap());
        assert!(inspector.contains_entry(MAIN_METADATA_FILE).unwrap());
    }

    #[test]
    fn test_build_refuses_missing_file() {
        let dir = TempDir::new().unwrap();
        let folder = document_folder(dir.path(), "doc", "DOC-1");
        fs::remove_file(folder.join("notes.txt")).unwrap();

        let config = config();
        let err = ContainerBuilder::new(&config)
            .create_container(&folder, &dir.path().join("out"))
            .unwrap_err();
        assert_eq!(err.code(), "container.missing_file");
    }

    #[test]
    fn test_build_refuses_invalid_metadata() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("doc");
        fs::create_dir(&folder).unwrap();
        fs::write(
            folder.join(crate::metadata::DOCUMENT_METADATA_FILE),
            r#"<Document xmlns="http://www.vdi.de/schemas/vdi2770"/>"#,
        )
        .unwrap();

        let config = config();
        let err = ContainerBuilder::new(&config)
            .create_container(&folder, &dir.path().join("out"))
            .unwrap_err();
        assert_eq!(err.code(), "metadata.invalid");
    }

    #[test]
    fn test_prebuilt_child_archive_is_adopted() {
        let dir = TempDir::new().unwrap();
        let config = config();
        let builder = ContainerBuilder::new(&config);

        let child = document_folder(dir.path(), "x", "X");
        let main = main_folder(dir.path(), &["X"]);
        builder.create_container(&child, &main).unwrap();
        assert!(main.join("X.zip").exists());

        let archive = builder.create_container(&main, &dir.path().join("out")).unwrap();
        assert!(ArchiveInspector::new(&archive, config.limits).contains_entry("X.zip").unwrap());
    }

    #[test]
    fn test_invalid_prebuilt_child_is_skipped() {
        let dir = TempDir::new().unwrap();
        let main = main_folder(dir.path(), &["X"]);
        write_zip(
            &main.join("X.zip"),
            &[(
                crate::metadata::DOCUMENT_METADATA_FILE,
                br#"<Document xmlns="http://www.vdi.de/schemas/vdi2770"><DocumentId DomainId="1">X</DocumentId></Document>"#,
            )],
        );

        let config = config();
        let archive = ContainerBuilder::new(&config)
            .create_container(&main, &dir.path().join("out"))
            .unwrap();
        assert!(!ArchiveInspector::new(&archive, config.limits).contains_entry("X.zip").unwrap());
    }

    #[test]
    fn test_first_child_wins_on_equal_ids() {
        let dir = TempDir::new().unwrap();
        let main = main_folder(dir.path(), &["X"]);
        fs::write(document_folder(&main, "a", "X").join("notes.txt"), "FIRST").unwrap();
        fs::write(document_folder(&main, "b", "X").join("notes.txt"), "SECOND").unwrap();

        let config = config();
        let archive = ContainerBuilder::new(&config)
            .create_container(&main, &dir.path().join("out"))
            .unwrap();

        let unpacked = dir.path().join("unpacked");
        ArchiveInspector::new(&archive, config.limits)
            .extract_to(&unpacked, true)
            .unwrap();
        assert_eq!(fs::read_to_string(unpacked.join("X").join("notes.txt")).unwrap(), "FIRST");
    }
}
