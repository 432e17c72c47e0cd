//! Structural and semantic checks on a parsed [`Document`]
//!
//! Checks run in declaration order so the fault list is deterministic for an
//! unmodified document. Cross-container checks (relationship targets,
//! files on disk) belong to the container processor.

use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use std::path::{Component, Path};

use super::mime::MimeType;
use super::model::{Document, DocumentVersion, LocalizedText, Party};
use crate::core::{Fault, FaultLevel, FaultType};

pub const VDI2770_CLASSIFICATION_SYSTEM: &str = "VDI2770:2018";

/// VDI 2770 document classes (category-group)
pub const VDI2770_CLASS_IDS: &[&str] = &[
    "01-01", "02-01", "02-02", "02-03", "02-04", "03-01", "03-02", "03-03", "03-04", "03-05",
    "03-06", "04-01",
];

/// The only class allowed to carry PDF/A level B files (certificates)
pub const CERTIFICATE_CLASS_ID: &str = "02-04";

const PARTY_ROLES: &[&str] = &["Author", "Customer", "Supplier", "Manufacturer", "Responsible"];
const STATUS_VALUES: &[&str] = &["InReview", "Released"];
// "ReferesTo" is the spelling of the published schema
const RELATIONSHIP_TYPES: &[&str] = &["Affecting", "ReferesTo", "RefersTo", "BasedOn", "Translation"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validate a document container's metadata.
pub fn validate(document: &Document, strict: bool) -> Vec<Fault> {
    MetadataValidator { strict, main: false }.run(document)
}

/// Validate a documentation (main) container's metadata. Every version
/// must reference at least one digital file.
pub fn validate_main(document: &Document, strict: bool) -> Vec<Fault> {
    MetadataValidator { strict, main: true }.run(document)
}

/// Whether files of this document may use a PDF/A conformance level `B`.
pub fn accepts_basic_pdfa(document: &Document) -> bool {
    document.class_ids().any(|id| id == CERTIFICATE_CLASS_ID)
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Two-letter ISO 639-1 code, e.g. `en`
fn is_language_code(code: &str) -> bool {
    let code = code.trim();
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Relative path that stays inside the container
fn is_contained_path(name: &str) -> bool {
    let path = Path::new(name);
    !name.starts_with('/')
        && !name.starts_with('\\')
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

struct MetadataValidator {
    strict: bool,
    main: bool,
}

impl MetadataValidator {
    fn run(&self, doc: &Document) -> Vec<Fault> {
        let mut faults = Vec::new();
        self.check_document_ids(doc, &mut faults);
        self.check_domains(doc, &mut faults);
        self.check_classifications(doc, &mut faults);
        self.check_referenced_objects(doc, &mut faults);

        if doc.versions.is_empty() {
            faults.push(Fault::error(
                FaultType::IsEmpty,
                "DocumentVersion",
                "document has no version",
            ));
        }
        for (index, version) in doc.versions.iter().enumerate() {
            self.check_version(index, version, &mut faults);
        }

        if self.main && doc.digital_files().next().is_none() && !doc.versions.is_empty() {
            faults.push(Fault::error(
                FaultType::IsEmpty,
                "DocumentVersion.DigitalFile",
                "main document does not reference any digital file",
            ));
        }
        faults
    }

    fn omission(&self, fault_type: FaultType, field: &str, message: &str) -> Fault {
        Fault::new(FaultLevel::for_omission(self.strict), fault_type, field, message)
    }

    fn check_document_ids(&self, doc: &Document, faults: &mut Vec<Fault>) {
        if doc.document_ids.is_empty() {
            faults.push(Fault::error(FaultType::IsEmpty, "DocumentId", "document has no id"));
            return;
        }

        let declared: HashSet<&str> = doc
            .document_id_domains
            .iter()
            .filter_map(|d| d.domain_id.as_deref())
            .map(str::trim)
            .collect();

        let mut seen = HashSet::new();
        let mut primary_seen = false;

        for (index, id) in doc.document_ids.iter().enumerate() {
            if id.id.trim().is_empty() {
                faults.push(
                    Fault::error(FaultType::IsEmpty, "DocumentId", "document id is empty").with_index(index),
                );
            }

            if id.domain_id.trim().is_empty() {
                faults.push(
                    Fault::error(FaultType::IsEmpty, "DocumentId.DomainId", "document id has no domain")
                        .with_index(index),
                );
            } else if !declared.contains(id.domain_id.trim()) {
                faults.push(
                    Fault::error(
                        FaultType::IsInconsistent,
                        "DocumentId.DomainId",
                        "domain is not declared by any DocumentIdDomain",
                    )
                    .with_index(index)
                    .with_value(id.domain_id.trim()),
                );
            }

            if !seen.insert(id) {
                faults.push(
                    Fault::error(FaultType::HasDuplicateValue, "DocumentId", "document id is declared twice")
                        .with_index(index)
                        .with_value(id.to_string()),
                );
            }

            if id.is_primary == Some(true) {
                if primary_seen {
                    faults.push(
                        Fault::error(
                            FaultType::HasDuplicateValue,
                            "DocumentId.IsPrimary",
                            "more than one document id is flagged as primary, the first one is used",
                        )
                        .with_index(index)
                        .with_value(id.id.trim()),
                    );
                }
                primary_seen = true;
            }
        }
    }

    fn check_domains(&self, doc: &Document, faults: &mut Vec<Fault>) {
        if doc.document_id_domains.is_empty() {
            faults.push(Fault::error(
                FaultType::IsEmpty,
                "DocumentIdDomain",
                "document declares no id domain",
            ));
            return;
        }

        let mut seen = HashSet::new();
        for (index, domain) in doc.document_id_domains.iter().enumerate() {
            match domain.domain_id.as_deref().map(str::trim) {
                None => faults.push(
                    Fault::error(FaultType::IsNull, "DocumentIdDomain.DocumentDomainId", "domain id is missing")
                        .with_index(index),
                ),
                Some("") => faults.push(
                    Fault::error(FaultType::IsEmpty, "DocumentIdDomain.DocumentDomainId", "domain id is empty")
                        .with_index(index),
                ),
                Some(id) => {
                    if !seen.insert(id) {
                        faults.push(
                            Fault::error(
                                FaultType::HasDuplicateValue,
                                "DocumentIdDomain.DocumentDomainId",
                                "domain id is declared twice",
                            )
                            .with_index(index)
                            .with_value(id),
                        );
                    }
                }
            }

            match &domain.party {
                Some(party) => self.check_party(party, "DocumentIdDomain.Party", index, faults),
                None => faults.push(
                    self.omission(FaultType::IsNull, "DocumentIdDomain.Party", "domain has no responsible party")
                        .with_index(index),
                ),
            }
        }
    }

    fn check_classifications(&self, doc: &Document, faults: &mut Vec<Fault>) {
        if doc.classifications.is_empty() {
            faults.push(Fault::error(
                FaultType::IsEmpty,
                "DocumentClassification",
                "document is not classified",
            ));
            return;
        }

        let mut has_vdi2770 = false;
        for (index, class) in doc.classifications.iter().enumerate() {
            let system = class.system.as_deref().map(str::trim);
            if is_blank(system) {
                faults.push(
                    Fault::error(
                        FaultType::IsNull,
                        "DocumentClassification.ClassificationSystem",
                        "classification system is missing",
                    )
                    .with_index(index),
                );
            }

            let class_id = class.class_id.as_deref().map(str::trim);
            if is_blank(class_id) {
                faults.push(
                    Fault::error(FaultType::IsNull, "DocumentClassification.ClassId", "class id is missing")
                        .with_index(index),
                );
            } else if system == Some(VDI2770_CLASSIFICATION_SYSTEM) {
                has_vdi2770 = true;
                let id = class_id.unwrap_or_default();
                if !VDI2770_CLASS_IDS.contains(&id) {
                    faults.push(
                        Fault::error(
                            FaultType::HasInvalidValue,
                            "DocumentClassification.ClassId",
                            "unknown VDI 2770 class id",
                        )
                        .with_index(index)
                        .with_value(id),
                    );
                }
            }

            if class.class_names.is_empty() {
                faults.push(
                    self.omission(
                        FaultType::IsEmpty,
                        "DocumentClassification.ClassName",
                        "classification has no class name",
                    )
                    .with_index(index),
                );
            }
            self.check_localized(&class.class_names, "DocumentClassification.ClassName", faults);
        }

        if !has_vdi2770 {
            faults.push(Fault::error(
                FaultType::IsInconsistent,
                "DocumentClassification.ClassificationSystem",
                "document has no classification according to VDI2770:2018",
            ));
        }
    }

    fn check_referenced_objects(&self, doc: &Document, faults: &mut Vec<Fault>) {
        if doc.referenced_objects.is_empty() {
            faults.push(Fault::error(
                FaultType::IsEmpty,
                "ReferencedObject",
                "document does not reference any object",
            ));
            return;
        }

        for (index, object) in doc.referenced_objects.iter().enumerate() {
            if object.object_ids.is_empty() {
                faults.push(
                    Fault::error(FaultType::IsEmpty, "ReferencedObject.ObjectId", "referenced object has no id")
                        .with_index(index),
                );
            }
            for (id_index, object_id) in object.object_ids.iter().enumerate() {
                if object_id.value.trim().is_empty() {
                    faults.push(
                        Fault::error(FaultType::IsEmpty, "ReferencedObject.ObjectId", "object id is empty")
                            .with_index(id_index),
                    );
                }
            }

            if object.parties.is_empty() {
                faults.push(
                    self.omission(FaultType::IsEmpty, "ReferencedObject.Party", "referenced object has no manufacturer")
                        .with_index(index),
                );
            }
            for (party_index, party) in object.parties.iter().enumerate() {
                self.check_party(party, "ReferencedObject.Party", party_index, faults);
            }

            if object.descriptions.is_empty() {
                faults.push(
                    self.omission(
                        FaultType::IsEmpty,
                        "ReferencedObject.Description",
                        "referenced object has no description",
                    )
                    .with_index(index),
                );
            }
            self.check_localized(&object.descriptions, "ReferencedObject.Description", faults);
        }
    }

    fn check_version(&self, index: usize, version: &DocumentVersion, faults: &mut Vec<Fault>) {
        if is_blank(version.version_id.as_deref()) {
            faults.push(
                Fault::error(FaultType::IsNull, "DocumentVersion.DocumentVersionId", "version id is missing")
                    .with_index(index),
            );
        }

        if version.languages.is_empty() {
            faults.push(
                Fault::error(FaultType::IsEmpty, "DocumentVersion.Language", "version declares no language")
                    .with_index(index),
            );
        }
        for (lang_index, lang) in version.languages.iter().enumerate() {
            if !is_language_code(lang) {
                faults.push(
                    Fault::error(FaultType::HasInvalidValue, "DocumentVersion.Language", "invalid language code")
                        .with_index(lang_index)
                        .with_value(lang.trim()),
                );
            }
        }

        if version.parties.is_empty() {
            faults.push(
                self.omission(FaultType::IsEmpty, "DocumentVersion.Party", "version has no author")
                    .with_index(index),
            );
        }
        for (party_index, party) in version.parties.iter().enumerate() {
            self.check_party(party, "DocumentVersion.Party", party_index, faults);
        }

        self.check_descriptions(index, version, faults);
        self.check_life_cycle(index, version, faults);
        self.check_relationships(version, faults);
        self.check_digital_files(index, version, faults);
    }

    fn check_descriptions(&self, index: usize, version: &DocumentVersion, faults: &mut Vec<Fault>) {
        if version.descriptions.is_empty() {
            faults.push(
                Fault::error(
                    FaultType::IsEmpty,
                    "DocumentVersion.DocumentDescription",
                    "version has no description",
                )
                .with_index(index),
            );
        }

        for (desc_index, desc) in version.descriptions.iter().enumerate() {
            if let Some(lang) = desc.language.as_deref() {
                if !is_language_code(lang) {
                    faults.push(
                        Fault::error(
                            FaultType::HasInvalidValue,
                            "DocumentDescription.Language",
                            "invalid language code",
                        )
                        .with_index(desc_index)
                        .with_value(lang.trim()),
                    );
                }
            }
            if is_blank(desc.title.as_deref()) {
                faults.push(
                    Fault::error(FaultType::IsNull, "DocumentDescription.Title", "description has no title")
                        .with_index(desc_index),
                );
            }
            if is_blank(desc.summary.as_deref()) {
                faults.push(
                    self.omission(FaultType::IsNull, "DocumentDescription.Summary", "description has no summary")
                        .with_index(desc_index),
                );
            }
            let no_keywords = desc
                .keywords
                .as_ref()
                .map_or(true, |k| k.items.iter().all(|w| w.trim().is_empty()));
            if no_keywords {
                faults.push(
                    self.omission(FaultType::IsEmpty, "DocumentDescription.KeyWords", "description has no keywords")
                        .with_index(desc_index),
                );
            }
        }
    }

    fn check_life_cycle(&self, index: usize, version: &DocumentVersion, faults: &mut Vec<Fault>) {
        if version.life_cycle_status.is_empty() {
            faults.push(
                Fault::error(
                    FaultType::IsEmpty,
                    "DocumentVersion.LifeCycleStatus",
                    "version has no life cycle status",
                )
                .with_index(index),
            );
        }

        let today = Local::now().date_naive();
        for (status_index, status) in version.life_cycle_status.iter().enumerate() {
            match status.set_date.as_deref().map(str::trim) {
                None | Some("") => faults.push(
                    Fault::error(FaultType::IsNull, "LifeCycleStatus.SetDate", "status has no date")
                        .with_index(status_index),
                ),
                Some(raw) => match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                    Ok(date) if date > today => faults.push(
                        Fault::warning(FaultType::ExceedsUpperBound, "LifeCycleStatus.SetDate", "status date lies in the future")
                            .with_index(status_index)
                            .with_value(raw),
                    ),
                    Ok(_) => {}
                    Err(_) => faults.push(
                        Fault::error(
                            FaultType::HasInvalidValue,
                            "LifeCycleStatus.SetDate",
                            "date does not match yyyy-MM-dd",
                        )
                        .with_index(status_index)
                        .with_value(raw),
                    ),
                },
            }

            match status.status_value.as_deref().map(str::trim) {
                None | Some("") => faults.push(
                    Fault::error(FaultType::IsNull, "LifeCycleStatus.StatusValue", "status value is missing")
                        .with_index(status_index),
                ),
                Some(value) if !STATUS_VALUES.contains(&value) => faults.push(
                    Fault::error(FaultType::HasInvalidValue, "LifeCycleStatus.StatusValue", "unknown status value")
                        .with_index(status_index)
                        .with_value(value),
                ),
                Some(_) => {}
            }

            for (party_index, party) in status.parties.iter().enumerate() {
                self.check_party(party, "LifeCycleStatus.Party", party_index, faults);
            }
        }
    }

    fn check_relationships(&self, version: &DocumentVersion, faults: &mut Vec<Fault>) {
        for (index, rel) in version.relationships.iter().enumerate() {
            match rel.relation_type.as_deref().map(str::trim) {
                None | Some("") => faults.push(
                    Fault::error(FaultType::IsNull, "DocumentRelationship.Type", "relationship has no type")
                        .with_index(index),
                ),
                Some(t) if !RELATIONSHIP_TYPES.contains(&t) => faults.push(
                    Fault::error(FaultType::HasInvalidValue, "DocumentRelationship.Type", "unknown relationship type")
                        .with_index(index)
                        .with_value(t),
                ),
                Some(_) => {}
            }

            match &rel.document_id {
                None => faults.push(
                    Fault::error(FaultType::IsNull, "DocumentRelationship.DocumentId", "relationship has no target")
                        .with_index(index),
                ),
                Some(target) if target.id.trim().is_empty() => faults.push(
                    Fault::error(FaultType::IsEmpty, "DocumentRelationship.DocumentId", "relationship target is empty")
                        .with_index(index),
                ),
                Some(_) => {}
            }
        }
    }

    fn check_digital_files(&self, index: usize, version: &DocumentVersion, faults: &mut Vec<Fault>) {
        if version.digital_files.is_empty() {
            let fault = if self.main {
                Fault::error(FaultType::IsEmpty, "DocumentVersion.DigitalFile", "version has no digital file")
            } else {
                self.omission(FaultType::IsEmpty, "DocumentVersion.DigitalFile", "version has no digital file")
            };
            faults.push(fault.with_index(index));
        }

        let mut names = HashSet::new();
        for (file_index, file) in version.digital_files.iter().enumerate() {
            let name = file.file_name.trim();
            if name.is_empty() {
                faults.push(
                    Fault::error(FaultType::IsEmpty, "DigitalFile", "digital file has no name").with_index(file_index),
                );
            } else if !is_contained_path(name) {
                faults.push(
                    Fault::error(
                        FaultType::HasInvalidValue,
                        "DigitalFile",
                        "file name must be relative to the container",
                    )
                    .with_index(file_index)
                    .with_value(name),
                );
            } else if !names.insert(name) {
                faults.push(
                    Fault::error(FaultType::HasDuplicateValue, "DigitalFile", "file is referenced twice")
                        .with_index(file_index)
                        .with_value(name),
                );
            }

            match file.mime_type.as_deref().map(str::trim) {
                None | Some("") => faults.push(
                    Fault::error(FaultType::IsNull, "DigitalFile.FileFormat", "file format is missing")
                        .with_index(file_index),
                ),
                Some(mime) if MimeType::parse(mime).is_none() => faults.push(
                    Fault::error(FaultType::HasInvalidValue, "DigitalFile.FileFormat", "file format is not a MIME type")
                        .with_index(file_index)
                        .with_value(mime),
                ),
                Some(_) => {}
            }
        }
    }

    fn check_party(&self, party: &Party, field: &str, index: usize, faults: &mut Vec<Fault>) {
        match party.role.as_deref().map(str::trim) {
            None | Some("") => faults.push(
                Fault::error(FaultType::IsNull, format!("{field}.Role"), "party has no role").with_index(index),
            ),
            Some(role) if !PARTY_ROLES.contains(&role) => faults.push(
                Fault::error(FaultType::HasInvalidValue, format!("{field}.Role"), "unknown party role")
                    .with_index(index)
                    .with_value(role),
            ),
            Some(_) => {}
        }

        let Some(org) = &party.organization else {
            faults.push(
                Fault::error(FaultType::IsNull, format!("{field}.Organization"), "party has no organization")
                    .with_index(index),
            );
            return;
        };

        let attrs = [
            ("OrganizationId", org.id.as_deref()),
            ("OrganizationName", org.name.as_deref()),
            ("OrganizationOfficialName", org.official_name.as_deref()),
        ];
        for (attr, value) in attrs {
            if is_blank(value) {
                faults.push(
                    Fault::error(
                        FaultType::IsEmpty,
                        format!("{field}.Organization.{attr}"),
                        "organization attribute is empty",
                    )
                    .with_index(index),
                );
            }
        }
    }

    fn check_localized(&self, texts: &[LocalizedText], field: &str, faults: &mut Vec<Fault>) {
        for (index, text) in texts.iter().enumerate() {
            if text.text.trim().is_empty() {
                faults.push(
                    Fault::error(FaultType::IsEmpty, field, "text is empty").with_index(index),
                );
            }
            if let Some(lang) = text.language.as_deref() {
                if !is_language_code(lang) {
                    faults.push(
                        Fault::error(FaultType::HasInvalidValue, format!("{field}.Language"), "invalid language code")
                            .with_index(index)
                            .with_value(lang.trim()),
                    );
                }
            }
        }
    }
}
