//! Fixtures shared by the container tests

use std::fs;
use std::path::{Path, PathBuf};

use crate::metadata::DOCUMENT_METADATA_FILE;

/// Complete, valid metadata for `id` with relationships to `targets` and
/// the given `(file name, MIME type)` digital files.
pub fn metadata_xml(id: &str, class_id: &str, targets: &[&str], files: &[(&str, &str)]) -> String {
    let organization = r#"<Organization OrganizationId="1" OrganizationName="ACME" OrganizationOfficialName="ACME GmbH"/>"#;
    let relationships: String = targets
        .iter()
        .map(|t| format!(r#"<DocumentRelationship Type="RefersTo"><DocumentId DomainId="1">{}</DocumentId></DocumentRelationship>"#, t))
        .collect();
    let digital_files: String = files
        .iter()
        .map(|(name, mime)| format!(r#"<DigitalFile FileFormat="{}">{}</DigitalFile>"#, mime, name))
        .collect();
    format!(
        r#"<Document xmlns="http://www.vdi.de/schemas/vdi2770">
  <DocumentId DomainId="1" IsPrimary="true">{id}</DocumentId>
  <DocumentIdDomain>
    <DocumentDomainId>1</DocumentDomainId>
    <Party Role="Responsible">{organization}</Party>
  </DocumentIdDomain>
  <DocumentClassification>
    <ClassId>{class_id}</ClassId>
    <ClassName Language="en">Documentation</ClassName>
    <ClassificationSystem>VDI2770:2018</ClassificationSystem>
  </DocumentClassification>
  <ReferencedObject>
    <ObjectId ObjectType="Type" RefType="product type">P-100</ObjectId>
    <Party Role="Manufacturer">{organization}</Party>
    <Description Language="en">Pump</Description>
  </ReferencedObject>
  <DocumentVersion>
    <DocumentVersionId>1</DocumentVersionId>
    <Language>en</Language>
    <Party Role="Author">{organization}</Party>
    <DocumentDescription Language="en">
      <Title>{id}</Title>
      <Summary>Summary of {id}</Summary>
      <KeyWords><KeyWord>pump</KeyWord></KeyWords>
    </DocumentDescription>
    <LifeCycleStatus SetDate="2021-03-01" StatusValue="Released"/>
    {relationships}
    {digital_files}
  </DocumentVersion>
</Document>"#
    )
}

/// A document container folder holding one text file.
pub fn document_folder(root: &Path, name: &str, id: &str) -> PathBuf {
    let folder = root.join(name);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("notes.txt"), "plain text").unwrap();
    fs::write(
        folder.join(DOCUMENT_METADATA_FILE),
        metadata_xml(id, "03-02", &[], &[("notes.txt", "text/plain")]),
    )
    .unwrap();
    folder
}

