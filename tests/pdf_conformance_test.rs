//! Integration tests for PDF/A detection
//!
//! Well-formed files report their level, malformed ones fail with an
//! error instead of panicking.

mod common;

use common::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use vdi2770_validator::prelude::*;

/// Helper to create a test file with given content
fn create_test_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[test]
fn test_detects_declared_level() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a3.pdf");
    write_pdf(&path, Some(&xmp_packet("3", "A")));

    let level = detect_conformance_level(&path).unwrap();
    assert_eq!(level, ConformanceLevel::Pdfa3A);
    assert!(!level.is_level_b());
    assert_eq!(level.as_str(), "3A");
}

#[test]
fn test_pdf_without_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plain.pdf");
    write_pdf(&path, None);

    let err = detect_conformance_level(&path).unwrap_err();
    assert!(matches!(err, PdfValidationError::NoMetadata(_)));
    assert_eq!(err.code(), "pdf.no_metadata");
}

#[test]
fn test_xmp_without_pdfa_identification() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("xmp.pdf");
    let xmp = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
        <rdf:Description rdf:about="" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:format>application/pdf</dc:format></rdf:Description>
        </rdf:RDF></x:xmpmeta>"#;
    write_pdf(&path, Some(xmp));

    assert_eq!(detect_conformance_level(&path).unwrap_err().code(), "pdf.no_pdfa_id");
}

/// Test files with a corrupted header
#[test]
fn test_corrupted_header() {
    let test_cases = vec![
        b"PDF-1.7\n%%EOF".as_slice(),  // Missing %
        b"$PDF-1.7\n%%EOF".as_slice(), // Wrong character
        b"%pdf-1.7\n%%EOF".as_slice(), // Lowercase
        b"%PD".as_slice(),             // Too short
    ];

    for (idx, content) in test_cases.iter().enumerate() {
        let temp_file = create_test_file(content);
        let err = detect_conformance_level(temp_file.path()).unwrap_err();
        assert_eq!(err.code(), "pdf.invalid", "test case {}", idx);
    }
}

/// Valid header, broken body: must not panic
#[test]
fn test_garbage_body_does_not_panic() {
    let test_cases = vec![
        b"%PDF-1.7\nRANDOM GARBAGE DATA HERE\n%%EOF".as_slice(),
        b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n1 0 obj\n<<".as_slice(),
        b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 99 0 R >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF".as_slice(),
    ];

    for (idx, content) in test_cases.iter().enumerate() {
        let temp_file = create_test_file(content);
        assert!(detect_conformance_level(temp_file.path()).is_err(), "test case {}", idx);
    }
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = detect_conformance_level(&dir.path().join("nope.pdf")).unwrap_err();
    assert_eq!(err.code(), "pdf.not_found");
}

#[test]
fn test_level_parsing() {
    assert_eq!("PDF/A-3b".parse::<ConformanceLevel>().unwrap(), ConformanceLevel::Pdfa3B);
    assert_eq!("2u".parse::<ConformanceLevel>().unwrap(), ConformanceLevel::Pdfa2U);
    assert!("1U".parse::<ConformanceLevel>().is_err());
    assert!(ConformanceLevel::Pdfa1B.is_level_b());
}
