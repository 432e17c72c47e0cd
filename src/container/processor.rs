//! Validation of documentation and document containers
//!
//! Every node is processed in two phases: all child containers are
//! validated first and collected into a map keyed by their file name, then
//! the parent is validated against that map. Errors inside a child never
//! abort the parent, they are reported as warnings at the parent's level.

use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::classify::{classify, has_both_markers, metadata_path, NodeKind};
use super::resolver::ReferenceResolver;
use crate::archive::{has_zip_signature, ArchiveInspector, ScopedExtraction};
use crate::config::ValidatorConfig;
use crate::core::{has_errors, ContainerType, Fault, FaultLevel, FaultType, Message, Report};
use crate::error::ProcessingError;
use crate::metadata::{
    self, accepts_basic_pdfa, mime_compatible, mime_equals, probe_mime_type, Document,
    DOCUMENT_METADATA_FILE, MAIN_METADATA_FILE,
};
use crate::pdf::detect_conformance_level;
use crate::scanner::compute_file_hash;

/// Result of processing one node of the container tree
#[derive(Debug)]
struct NodeOutcome {
    report: Report,
    document: Option<Document>,
    failed: bool,
}

impl NodeOutcome {
    fn fail(mut report: Report, error: ProcessingError) -> Self {
        debug!("{}: {}", report.file_name, error);
        report.add_message(error.to_message());
        Self {
            report,
            document: None,
            failed: true,
        }
    }
}

/// Top-level folder entries, split by role
#[derive(Debug, Default)]
struct FolderListing {
    child_folders: Vec<(String, PathBuf)>,
    child_archives: Vec<(String, PathBuf)>,
    extra_files: Vec<String>,
}

fn normalize_name(name: &str) -> String {
    name.trim().replace('\\', "/")
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Walks a container tree and produces its [`Report`].
///
/// Holds no state besides the read-only configuration, so one processor
/// can validate any number of inputs, also from several threads.
pub struct ContainerProcessor<'a> {
    config: &'a ValidatorConfig,
}

impl<'a> ContainerProcessor<'a> {
    pub fn new(config: &'a ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a container archive or folder.
    ///
    /// Never fails: problems that stop validation are recorded as error
    /// messages in the returned report.
    pub fn validate(&self, input: &Path) -> Report {
        let name = file_name_of(input);
        info!("Validating {}", input.display());

        let report = Report::new(ContainerType::Unknown, name.clone());
        let outcome = if !input.exists() {
            NodeOutcome::fail(report, ProcessingError::InputNotFound(input.to_path_buf()))
        } else if input.is_dir() {
            self.process_folder(input, report, 0)
        } else if has_zip_signature(input) {
            self.process_archive(input, report, 0)
        } else {
            NodeOutcome::fail(report, ProcessingError::UnsupportedInput(input.to_path_buf()))
        };

        let report = outcome.report;
        info!(
            "{}: {} error(s), {} warning(s)",
            name,
            report.error_messages(true).len(),
            report.warn_messages(true, false).len()
        );
        report
    }

    fn process_archive(&self, archive: &Path, mut report: Report, depth: usize) -> NodeOutcome {
        if depth > self.config.max_nesting_depth {
            return NodeOutcome::fail(
                report,
                ProcessingError::NestingTooDeep {
                    path: archive.to_path_buf(),
                    depth: self.config.max_nesting_depth,
                },
            );
        }

        match compute_file_hash(archive) {
            Ok(hash) => report.file_hash = Some(hash),
            Err(e) => return NodeOutcome::fail(report, e.into()),
        }

        let inspector = ArchiveInspector::new(archive, self.config.limits)
            .with_max_depth(self.config.max_nesting_depth);

        if let Err(e) = inspector.check_security() {
            return NodeOutcome::fail(report, e);
        }
        match inspector.validate_zip_file() {
            Ok(faults) => report.add_faults(&faults, 0),
            Err(e) => return NodeOutcome::fail(report, e),
        }

        // removed when this function returns, children only keep reports
        let extraction = match ScopedExtraction::extract(&inspector) {
            Ok(extraction) => extraction,
            Err(e) => return NodeOutcome::fail(report, e),
        };

        self.process_folder(extraction.path(), report, depth)
    }

    fn process_folder(&self, folder: &Path, mut report: Report, depth: usize) -> NodeOutcome {
        let node = PathBuf::from(&report.file_name);
        if depth > self.config.max_nesting_depth {
            return NodeOutcome::fail(
                report,
                ProcessingError::NestingTooDeep {
                    path: node,
                    depth: self.config.max_nesting_depth,
                },
            );
        }

        let kind = classify(folder);
        let Some(meta_path) = metadata_path(folder, kind) else {
            return NodeOutcome::fail(report, ProcessingError::NotAContainer(node));
        };
        report.container_type = kind.container_type();
        debug!("{} classified as {}", report.file_name, report.container_type);

        if has_both_markers(folder) {
            report.add_message(Message::warning(
                "container.ambiguous",
                format!(
                    "both {} and {} are present, treating the folder as documentation container",
                    MAIN_METADATA_FILE, DOCUMENT_METADATA_FILE
                ),
            ));
        }

        let document = match metadata::parse_file(&meta_path) {
            Ok(document) => document,
            Err(source) => {
                return NodeOutcome::fail(
                    report,
                    ProcessingError::Metadata {
                        path: PathBuf::from(meta_path.file_name().unwrap_or_default()),
                        source,
                    },
                )
            }
        };
        report.id = document.primary_id().map(|id| id.id.trim().to_string());

        let faults = match kind {
            NodeKind::Documentation => metadata::validate_main(&document, self.config.strict),
            _ => metadata::validate(&document, self.config.strict),
        };
        report.add_faults(&faults, 0);
        if has_errors(&faults) {
            let errors = faults.iter().filter(|f| f.is_error()).count();
            let mut outcome = NodeOutcome::fail(
                report,
                ProcessingError::InvalidMetadata {
                    path: PathBuf::from(meta_path.file_name().unwrap_or_default()),
                    errors,
                },
            );
            outcome.document = Some(document);
            return outcome;
        }

        let declared: HashSet<String> = document
            .digital_files()
            .map(|f| normalize_name(&f.file_name))
            .filter(|n| !n.is_empty())
            .collect();

        let files_complete = self.check_digital_files(folder, &document, &mut report);

        let listing = match list_folder(folder, &declared) {
            Ok(listing) => listing,
            Err(e) => return NodeOutcome::fail(report, e),
        };

        match kind {
            NodeKind::Documentation => self.process_children(&listing, &document, &mut report, depth),
            _ => {
                for (name, _) in listing.child_folders.iter().chain(&listing.child_archives) {
                    report.add_message(Message::warning(
                        "container.unexpected_nested",
                        format!("document container holds another container: {}", name),
                    ));
                }
            }
        }

        for name in &listing.extra_files {
            report.add_message(Message::info(
                "container.extra_file",
                format!("file is not referenced by the metadata: {}", name),
            ));
        }

        NodeOutcome {
            report,
            document: Some(document),
            failed: !files_complete,
        }
    }

    /// Existence, format and PDF/A checks for every declared digital file.
    /// Returns `false` if a file is missing.
    fn check_digital_files(&self, folder: &Path, document: &Document, report: &mut Report) -> bool {
        let basic_pdfa_allowed = accepts_basic_pdfa(document);
        let mut complete = true;
        let mut faults = Vec::new();

        for (index, file) in document.digital_files().enumerate() {
            let name = normalize_name(&file.file_name);
            if name.is_empty() || name.starts_with('/') || name.split('/').any(|s| s == "..") {
                // already reported by the metadata validator
                continue;
            }

            let path = folder.join(&name);
            if !path.is_file() {
                complete = false;
                report.add_message(
                    ProcessingError::MissingFile {
                        container: PathBuf::from(&report.file_name),
                        file: name.clone(),
                    }
                    .to_message(),
                );
                continue;
            }

            let Some(declared) = file.mime_type.as_deref().map(str::trim).filter(|m| !m.is_empty()) else {
                continue;
            };

            match probe_mime_type(&path) {
                Ok(Some(probed)) if !mime_compatible(declared, probed) => faults.push(
                    Fault::error(
                        FaultType::IsInconsistent,
                        "DigitalFile.FileFormat",
                        format!("{} is declared as {} but contains {}", name, declared, probed),
                    )
                    .with_index(index)
                    .with_value(declared),
                ),
                Ok(Some(_)) => {}
                Ok(None) => report.add_message(Message::info(
                    "mime.unknown",
                    format!("cannot determine the format of {}", name),
                )),
                Err(e) => report.add_message(ProcessingError::Io(e).to_message()),
            }

            if self.config.check_pdf && mime_equals(declared, "application/pdf") {
                match detect_conformance_level(&path) {
                    Ok(level) if level.is_level_b() && !basic_pdfa_allowed => faults.push(
                        Fault::new(
                            FaultLevel::for_omission(self.config.strict),
                            FaultType::HasInvalidValue,
                            "DigitalFile",
                            format!(
                                "{} conforms to PDF/A-{}, level B is only permitted for certificates",
                                name, level
                            ),
                        )
                        .with_index(index)
                        .with_value(level.as_str()),
                    ),
                    Ok(level) => report.add_message(Message::info(
                        "pdf.conformance",
                        format!("{} conforms to PDF/A-{}", name, level),
                    )),
                    Err(e) => report.add_message(Message::error(e.code(), format!("{}: {}", name, e))),
                }
            }
        }

        report.add_faults(&faults, 0);
        complete
    }

    /// Phase one: validate every child container. Phase two: match them
    /// against the main document's relationships.
    fn process_children(&self, listing: &FolderListing, main: &Document, report: &mut Report, depth: usize) {
        let mut children: BTreeMap<String, NodeOutcome> = BTreeMap::new();

        for (name, path) in &listing.child_folders {
            let child = Report::new(ContainerType::Unknown, name.clone());
            children.insert(name.clone(), self.process_folder(path, child, depth + 1));
        }
        for (name, path) in &listing.child_archives {
            let child = Report::new(ContainerType::Unknown, name.clone());
            children.insert(name.clone(), self.process_archive(path, child, depth + 1));
        }

        let mut resolver = ReferenceResolver::new();
        for (name, child) in &children {
            if let (false, Some(document)) = (child.failed, &child.document) {
                resolver.register(name.clone(), document);
            }
        }
        let resolution = resolver.resolve(main);

        for (name, child) in children {
            if child.failed {
                warn!("Skipping container {}: validation failed", name);
                report.add_message(Message::warning(
                    "container.child_skipped",
                    format!("{} is not part of the package, it cannot be validated", name),
                ));
                report.add_messages(
                    child
                        .report
                        .error_messages(true)
                        .into_iter()
                        .map(|m| Message::warning(m.code.clone(), m.text.clone()).with_indent(1)),
                );
            } else if resolution.referenced.contains(&name) {
                debug!("{} is referenced by the main document", name);
                report.add_sub_report(child.report);
            } else {
                report.add_message(Message::warning(
                    "container.unreferenced",
                    format!("{} is not referenced by the main document", name),
                ));
            }
        }

        let unresolved: Vec<Fault> = resolution
            .unresolved
            .into_iter()
            .map(|(index, id)| {
                Fault::error(
                    FaultType::IsInconsistent,
                    "DocumentRelationship.DocumentId",
                    "referenced document is not part of the package",
                )
                .with_index(index)
                .with_value(id.to_string())
            })
            .collect();
        report.add_faults(&unresolved, 0);
    }
}

fn list_folder(folder: &Path, declared: &HashSet<String>) -> Result<FolderListing, ProcessingError> {
    let mut entries: Vec<(String, PathBuf)> = fs::read_dir(folder)?
        .map(|entry| entry.map(|e| (e.file_name().to_string_lossy().into_owned(), e.path())))
        .collect::<Result<_, _>>()?;
    entries.sort();

    let mut listing = FolderListing::default();
    for (name, path) in entries {
        if path.is_dir() {
            // plain sub-folders may hold declared digital files
            if classify(&path).is_container() {
                listing.child_folders.push((name, path));
            }
        } else if name == MAIN_METADATA_FILE || name == DOCUMENT_METADATA_FILE || declared.contains(&name) {
            continue;
        } else if name.to_ascii_lowercase().ends_with(".zip") && has_zip_signature(&path) {
            listing.child_archives.push((name, path));
        } else {
            listing.extra_files.push(name);
        }
    }
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::inspector::test_support::write_zip;
    use crate::config::ArchiveLimits;
    use crate::core::MessageLevel;
    use crate::container::test_support::{document_folder, metadata_xml};
    use crate::pdf::conformance::test_support::{write_pdf, xmp_packet};
    use tempfile::TempDir;

    fn config() -> ValidatorConfig {
        ValidatorConfig::new(ArchiveLimits::new(100.0, 50 * 1024 * 1024).unwrap())
    }

    fn codes(messages: &[&Message]) -> Vec<String> {
        messages.iter().map(|m| m.code.clone()).collect()
    }

    #[test]
    fn test_document_folder() {
        let dir = TempDir::new().unwrap();
        let folder = document_folder(dir.path(), "doc", "DOC-1");
        fs::write(folder.join("stray.bin"), [0u8, 1, 2]).unwrap();

        let config = config();
        let report = ContainerProcessor::new(&config).validate(&folder);

        assert_eq!(report.container_type, ContainerType::DocumentContainer);
        assert_eq!(report.id.as_deref(), Some("DOC-1"));
        assert!(!report.has_errors(), "{:?}", report.error_messages(true));
        assert_eq!(codes(&report.info_messages(false)), vec!["container.extra_file"]);
    }

    #[test]
    fn test_missing_digital_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let folder = document_folder(dir.path(), "doc", "DOC-1");
        fs::remove_file(folder.join("notes.txt")).unwrap();

        let config = config();
        let report = ContainerProcessor::new(&config).validate(&folder);
        assert_eq!(codes(&report.error_messages(false)), vec!["container.missing_file"]);
    }

    #[test]
    fn test_mime_mismatch_is_inconsistent() {
        let dir = TempDir::new().unwrap();
        let folder = document_folder(dir.path(), "doc", "DOC-1");
        fs::write(folder.join("notes.txt"), b"%PDF-1.4 not text").unwrap();

        let config = config();
        let report = ContainerProcessor::new(&config).validate(&folder);
        let errors = report.error_messages(false);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "fault.is_inconsistent.DigitalFile.FileFormat");
    }

    #[test]
    fn test_referenced_and_unreferenced_siblings() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main");
        fs::create_dir(&main).unwrap();
        fs::write(main.join("overview.txt"), "overview").unwrap();
        fs::write(
            main.join(MAIN_METADATA_FILE),
            metadata_xml("MAIN", "01-01", &["X"], &[("overview.txt", "text/plain")]),
        )
        .unwrap();
        document_folder(&main, "x", "X");
        document_folder(&main, "y", "Y");

        let config = config();
        let report = ContainerProcessor::new(&config).validate(&main);

        assert_eq!(report.container_type, ContainerType::DocumentationContainer);
        assert_eq!(report.sub_reports().len(), 1);
        assert_eq!(report.sub_reports()[0].file_name, "x");
        assert_eq!(report.sub_reports()[0].id.as_deref(), Some("X"));
        assert!(!report.has_errors(), "{:?}", report.error_messages(true));

        let warnings = report.warn_messages(false, false);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "container.unreferenced");
        assert!(warnings[0].text.contains('y'));
    }

    #[test]
    fn test_unresolved_relationship_is_error() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main");
        fs::create_dir(&main).unwrap();
        fs::write(main.join("overview.txt"), "overview").unwrap();
        fs::write(
            main.join(MAIN_METADATA_FILE),
            metadata_xml("MAIN", "01-01", &["GONE"], &[("overview.txt", "text/plain")]),
        )
        .unwrap();

        let config = config();
        let report = ContainerProcessor::new(&config).validate(&main);
        let errors = report.error_messages(false);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "fault.is_inconsistent.DocumentRelationship.DocumentId");
    }

    #[test]
    fn test_broken_sibling_becomes_warning() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main");
        fs::create_dir(&main).unwrap();
        fs::write(main.join("overview.txt"), "overview").unwrap();
        fs::write(
            main.join(MAIN_METADATA_FILE),
            metadata_xml("MAIN", "01-01", &[], &[("overview.txt", "text/plain")]),
        )
        .unwrap();
        let broken = main.join("broken");
        fs::create_dir(&broken).unwrap();
        fs::write(broken.join(DOCUMENT_METADATA_FILE), "<Document><oops>").unwrap();

        let config = config();
        let report = ContainerProcessor::new(&config).validate(&main);

        assert!(!report.has_errors());
        assert!(report.sub_reports().is_empty());
        let warnings = codes(&report.warn_messages(false, false));
        assert_eq!(warnings, vec!["container.child_skipped", "metadata.parse"]);
        assert_eq!(report.messages()[1].indent, 1);
    }

    #[test]
    fn test_pdfa_level_b_depends_on_class() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("doc");
        fs::create_dir(&folder).unwrap();
        write_pdf(&folder.join("manual.pdf"), Some(&xmp_packet("3", "B")));

        let write_meta = |class_id: &str| {
            fs::write(
                folder.join(DOCUMENT_METADATA_FILE),
                metadata_xml("DOC-1", class_id, &[], &[("manual.pdf", "application/pdf")]),
            )
            .unwrap();
        };

        write_meta("03-02");
        let lenient = config();
        let report = ContainerProcessor::new(&lenient).validate(&folder);
        assert!(!report.has_errors());
        assert_eq!(
            codes(&report.warn_messages(false, false)),
            vec!["fault.has_invalid_value.DigitalFile"]
        );

        let strict = config().strict(true);
        let report = ContainerProcessor::new(&strict).validate(&folder);
        assert_eq!(
            codes(&report.error_messages(false)),
            vec!["fault.has_invalid_value.DigitalFile"]
        );

        write_meta("02-04");
        let report = ContainerProcessor::new(&strict).validate(&folder);
        assert!(!report.has_errors());
        assert_eq!(codes(&report.info_messages(false)), vec!["pdf.conformance"]);
    }

    #[test]
    fn test_pdf_without_xmp() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("doc");
        fs::create_dir(&folder).unwrap();
        write_pdf(&folder.join("manual.pdf"), None);
        fs::write(
            folder.join(DOCUMENT_METADATA_FILE),
            metadata_xml("DOC-1", "03-02", &[], &[("manual.pdf", "application/pdf")]),
        )
        .unwrap();

        let config = config();
        let report = ContainerProcessor::new(&config).validate(&folder);
        assert_eq!(codes(&report.error_messages(false)), vec!["pdf.no_metadata"]);

        let unchecked = config.clone().check_pdf(false);
        assert!(!ContainerProcessor::new(&unchecked).validate(&folder).has_errors());
    }

    #[test]
    fn test_unsupported_and_missing_inputs() {
        let dir = TempDir::new().unwrap();
        let text = dir.path().join("readme.txt");
        fs::write(&text, "hello").unwrap();

        let config = config();
        let processor = ContainerProcessor::new(&config);

        let report = processor.validate(&text);
        assert_eq!(report.container_type, ContainerType::Unknown);
        assert_eq!(codes(&report.error_messages(false)), vec!["input.unsupported"]);

        let report = processor.validate(&dir.path().join("nothing.zip"));
        assert_eq!(codes(&report.error_messages(false)), vec!["input.not_found"]);

        let report = processor.validate(dir.path());
        assert_eq!(codes(&report.error_messages(false)), vec!["container.no_metadata"]);
    }

    #[test]
    fn test_both_markers_warn() {
        let dir = TempDir::new().unwrap();
        let folder = document_folder(dir.path(), "doc", "DOC-1");
        fs::write(
            folder.join(MAIN_METADATA_FILE),
            metadata_xml("MAIN", "01-01", &[], &[("notes.txt", "text/plain")]),
        )
        .unwrap();

        let config = config();
        let report = ContainerProcessor::new(&config).validate(&folder);
        assert_eq!(report.container_type, ContainerType::DocumentationContainer);
        assert_eq!(report.messages()[0].level, MessageLevel::Warning);
        assert_eq!(report.messages()[0].code, "container.ambiguous");
    }

    #[test]
    fn test_nesting_depth() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main");
        fs::create_dir(&main).unwrap();
        fs::write(main.join("overview.txt"), "overview").unwrap();
        fs::write(
            main.join(MAIN_METADATA_FILE),
            metadata_xml("MAIN", "01-01", &["X"], &[("overview.txt", "text/plain")]),
        )
        .unwrap();
        document_folder(&main, "x", "X");

        let config = config().max_nesting_depth(0);
        let report = ContainerProcessor::new(&config).validate(&main);
        let warnings = codes(&report.warn_messages(false, false));
        assert_eq!(warnings, vec!["container.child_skipped", "container.nesting_depth"]);
        assert!(report.has_errors());
    }

    #[test]
    fn test_nesting_depth_checked_before_unpacking() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main");
        fs::create_dir(&main).unwrap();
        fs::write(main.join("overview.txt"), "overview").unwrap();
        fs::write(
            main.join(MAIN_METADATA_FILE),
            metadata_xml("MAIN", "01-01", &[], &[("overview.txt", "text/plain")]),
        )
        .unwrap();
        // would be refused as a bomb if it were inspected
        write_zip(&main.join("X.zip"), &[("zeros.bin", &vec![0u8; 512 * 1024])]);

        let config = config().max_nesting_depth(0);
        let report = ContainerProcessor::new(&config).validate(&main);
        let warnings = codes(&report.warn_messages(false, false));
        assert_eq!(warnings, vec!["container.child_skipped", "container.nesting_depth"]);
    }
}
