//! Fixtures shared by the integration tests

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use vdi2770_validator::prelude::*;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DOCUMENT_METADATA_FILE: &str = "VDI2770_Metadata.xml";
pub const MAIN_METADATA_FILE: &str = "VDI2770_Main.xml";

pub fn limits() -> ArchiveLimits {
    ArchiveLimits::new(100.0, 50 * 1024 * 1024).unwrap()
}

pub fn config() -> ValidatorConfig {
    ValidatorConfig::new(limits())
}

/// Valid metadata for `id` with relationships to `targets` and the given
/// `(file name, MIME type)` digital files.
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

/// A documentation container folder referring to `targets`.
pub fn main_folder(root: &Path, name: &str, targets: &[&str]) -> PathBuf {
    let folder = root.join(name);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("overview.txt"), "overview").unwrap();
    fs::write(
        folder.join(MAIN_METADATA_FILE),
        metadata_xml("MAIN", "01-01", targets, &[("overview.txt", "text/plain")]),
    )
    .unwrap();
    folder
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}

pub fn xmp_packet(part: &str, conformance: &str) -> String {
    format!(
        r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about="" xmlns:pdfaid="http://www.aiim.org/pdfa/ns/id/" pdfaid:part="{part}" pdfaid:conformance="{conformance}"/>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#
    )
}

/// One-page PDF, with an XMP metadata stream when `xmp` is given.
pub fn write_pdf(path: &Path, xmp: Option<&str>) {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if let Some(xmp) = xmp {
        let metadata = doc.add_object(Stream::new(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            xmp.as_bytes().to_vec(),
        ));
        catalog.set("Metadata", metadata);
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

pub fn codes(messages: &[&Message]) -> Vec<String> {
    messages.iter().map(|m| m.code.clone()).collect()
}

/// Set the "encrypted" bit in every local and central header.
pub fn set_encryption_flag(path: &Path) {
    let mut bytes = fs::read(path).unwrap();
    for i in 0..bytes.len().saturating_sub(4) {
        match &bytes[i..i + 4] {
            b"PK\x03\x04" => bytes[i + 6] |= 1,
            b"PK\x01\x02" => bytes[i + 8] |= 1,
            _ => {}
        }
    }
    fs::write(path, bytes).unwrap();
}
