use serde::Deserialize;
use std::fmt;
use std::hash::{Hash, Hasher};

// ---------------------------------------------------------------------------
// Root: <Document xmlns="http://www.vdi.de/schemas/vdi2770">
//
// Every field is optional or defaulted on purpose: missing values are
// reported by the validator as faults, only malformed XML fails parsing.
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(rename = "DocumentId", default)]
    pub document_ids: Vec<DocumentId>,

    #[serde(rename = "DocumentIdDomain", default)]
    pub document_id_domains: Vec<DocumentIdDomain>,

    #[serde(rename = "DocumentClassification", default)]
    pub classifications: Vec<DocumentClassification>,

    #[serde(rename = "ReferencedObject", default)]
    pub referenced_objects: Vec<ReferencedObject>,

    #[serde(rename = "DocumentVersion", default)]
    pub versions: Vec<DocumentVersion>,
}

impl Document {
    /// The primary document id.
    ///
    /// The first id flagged `IsPrimary` wins; without any flag the first
    /// declared id is primary. Several flagged ids are reported by the
    /// validator, the selection here stays deterministic.
    pub fn primary_id(&self) -> Option<&DocumentId> {
        self.document_ids
            .iter()
            .find(|id| id.is_primary == Some(true))
            .or_else(|| self.document_ids.first())
    }

    /// Every non-empty document id, primary or not.
    pub fn all_ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.document_ids.iter().filter(|id| !id.id.trim().is_empty())
    }

    /// Every digital file across all versions, in declaration order.
    pub fn digital_files(&self) -> impl Iterator<Item = &DigitalFile> {
        self.versions.iter().flat_map(|v| v.digital_files.iter())
    }

    /// Every document id referenced by a relationship of any version.
    pub fn relationship_targets(&self) -> impl Iterator<Item = &DocumentId> {
        self.versions
            .iter()
            .flat_map(|v| v.relationships.iter())
            .filter_map(|r| r.document_id.as_ref())
    }

    /// VDI 2770 class ids (e.g. `03-02`) of this document.
    pub fn class_ids(&self) -> impl Iterator<Item = &str> {
        self.classifications
            .iter()
            .filter_map(|c| c.class_id.as_deref())
            .map(str::trim)
    }
}

/// `<DocumentId DomainId=".." IsPrimary="true">value</DocumentId>`
///
/// Equality and hashing use the id and the domain only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentId {
    #[serde(rename = "@DomainId", default)]
    pub domain_id: String,

    #[serde(rename = "@IsPrimary", default)]
    pub is_primary: Option<bool>,

    #[serde(rename = "$text", default)]
    pub id: String,
}

impl DocumentId {
    pub fn new(id: impl Into<String>, domain_id: impl Into<String>) -> Self {
        Self {
            domain_id: domain_id.into(),
            is_primary: None,
            id: id.into(),
        }
    }

    fn key(&self) -> (&str, &str) {
        (self.id.trim(), self.domain_id.trim())
    }
}

impl PartialEq for DocumentId {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for DocumentId {}

impl Hash for DocumentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (domain {})", self.id.trim(), self.domain_id.trim())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentIdDomain {
    #[serde(rename = "DocumentDomainId")]
    pub domain_id: Option<String>,

    #[serde(rename = "Party")]
    pub party: Option<Party>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Party {
    #[serde(rename = "@Role")]
    pub role: Option<String>,

    #[serde(rename = "Organization")]
    pub organization: Option<Organization>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Organization {
    #[serde(rename = "@OrganizationId")]
    pub id: Option<String>,

    #[serde(rename = "@OrganizationName")]
    pub name: Option<String>,

    #[serde(rename = "@OrganizationOfficialName")]
    pub official_name: Option<String>,
}

/// Text with an optional `Language` attribute
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedText {
    #[serde(rename = "@Language")]
    pub language: Option<String>,

    #[serde(rename = "$text", default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentClassification {
    #[serde(rename = "ClassId")]
    pub class_id: Option<String>,

    #[serde(rename = "ClassName", default)]
    pub class_names: Vec<LocalizedText>,

    #[serde(rename = "ClassificationSystem")]
    pub system: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferencedObject {
    #[serde(rename = "ObjectId", default)]
    pub object_ids: Vec<ObjectId>,

    #[serde(rename = "Party", default)]
    pub parties: Vec<Party>,

    #[serde(rename = "Description", default)]
    pub descriptions: Vec<LocalizedText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectId {
    #[serde(rename = "@ObjectType")]
    pub object_type: Option<String>,

    #[serde(rename = "@RefType")]
    pub ref_type: Option<String>,

    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentVersion {
    #[serde(rename = "DocumentVersionId")]
    pub version_id: Option<String>,

    #[serde(rename = "Language", default)]
    pub languages: Vec<String>,

    #[serde(rename = "Party", default)]
    pub parties: Vec<Party>,

    #[serde(rename = "DocumentDescription", default)]
    pub descriptions: Vec<DocumentDescription>,

    #[serde(rename = "LifeCycleStatus", default)]
    pub life_cycle_status: Vec<LifeCycleStatus>,

    #[serde(rename = "DocumentRelationship", default)]
    pub relationships: Vec<DocumentRelationship>,

    #[serde(rename = "DigitalFile", default)]
    pub digital_files: Vec<DigitalFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentDescription {
    #[serde(rename = "@Language")]
    pub language: Option<String>,

    #[serde(rename = "Title")]
    pub title: Option<String>,

    #[serde(rename = "Summary")]
    pub summary: Option<String>,

    #[serde(rename = "KeyWords")]
    pub keywords: Option<KeyWords>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyWords {
    #[serde(rename = "KeyWord", default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LifeCycleStatus {
    /// `yyyy-MM-dd`
    #[serde(rename = "@SetDate")]
    pub set_date: Option<String>,

    #[serde(rename = "@StatusValue")]
    pub status_value: Option<String>,

    #[serde(rename = "Party", default)]
    pub parties: Vec<Party>,
}

/// A weak reference to another document, resolved against sibling
/// containers by the container processor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentRelationship {
    #[serde(rename = "@Type")]
    pub relation_type: Option<String>,

    #[serde(rename = "DocumentId")]
    pub document_id: Option<DocumentId>,

    #[serde(rename = "DocumentVersionId")]
    pub version_id: Option<String>,

    #[serde(rename = "Description", default)]
    pub descriptions: Vec<LocalizedText>,
}

/// `<DigitalFile FileFormat="application/pdf">manual.pdf</DigitalFile>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DigitalFile {
    #[serde(rename = "@FileFormat")]
    pub mime_type: Option<String>,

    #[serde(rename = "$text", default)]
    pub file_name: String,
}
