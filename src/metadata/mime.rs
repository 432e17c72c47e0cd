//! MIME type comparison and content probing
//!
//! Declared MIME types are compared case-insensitively and independent of
//! parameter order and spacing. A parameter only present on one side does
//! not make two types differ: `image/vnd.dxf` equals
//! `image/vnd.dxf; format=ascii`, but `format=ascii` differs from
//! `format=binary`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Common spellings mapped to their registered form.
const ALIASES: &[(&str, &str)] = &[
    ("text/xml", "application/xml"),
    ("image/jpg", "image/jpeg"),
    ("image/pjpeg", "image/jpeg"),
    ("image/x-png", "image/png"),
    ("application/x-pdf", "application/pdf"),
    ("application/x-zip-compressed", "application/zip"),
    ("image/x-dxf", "image/vnd.dxf"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    essence: String,
    params: BTreeMap<String, String>,
}

impl MimeType {
    /// Parse `type/subtype; key=value; ...`. Returns `None` for anything
    /// without a valid `type/subtype` part.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(';');
        let essence = parts.next()?.trim().to_ascii_lowercase();

        let (top, sub) = essence.split_once('/')?;
        let valid_token = |s: &str| {
            !s.is_empty() && !s.contains('/') && !s.chars().any(char::is_whitespace)
        };
        if !valid_token(top) || !valid_token(sub) {
            return None;
        }

        let essence = ALIASES
            .iter()
            .find(|(alias, _)| *alias == essence)
            .map(|(_, canonical)| canonical.to_string())
            .unwrap_or(essence);

        let mut params = BTreeMap::new();
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (key, val) = param.split_once('=')?;
            let key = key.trim().to_ascii_lowercase();
            let val = val.trim().trim_matches('"').to_ascii_lowercase();
            if key.is_empty() {
                return None;
            }
            params.insert(key, val);
        }

        Some(Self { essence, params })
    }

    pub fn essence(&self) -> &str {
        &self.essence
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Same essence, and every parameter present on both sides agrees.
    pub fn equivalent(&self, other: &MimeType) -> bool {
        self.essence == other.essence
            && self
                .params
                .iter()
                .all(|(k, v)| other.params.get(k).map_or(true, |o| o == v))
    }
}

/// Compare two MIME type strings. Unparseable values only equal
/// themselves (ignoring case and surrounding whitespace).
pub fn mime_equals(a: &str, b: &str) -> bool {
    match (MimeType::parse(a), MimeType::parse(b)) {
        (Some(x), Some(y)) => x.equivalent(&y),
        (None, None) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => false,
    }
}

/// Whether a declared type is satisfied by the type probed from content.
///
/// Beyond [`mime_equals`], container formats built on ZIP or XML (office
/// documents, `+zip`, `+xml` types) are accepted for a generic
/// `application/zip` or `application/xml` probe.
pub fn mime_compatible(declared: &str, probed: &str) -> bool {
    if mime_equals(declared, probed) {
        return true;
    }
    let (Some(declared), Some(probed)) = (MimeType::parse(declared), MimeType::parse(probed)) else {
        return false;
    };

    match probed.essence() {
        "application/zip" => {
            let e = declared.essence();
            e.ends_with("+zip")
                || e.starts_with("application/vnd.openxmlformats-officedocument.")
                || e.starts_with("application/vnd.oasis.opendocument.")
                || e == "application/vnd.ms-xpsdocument"
        }
        "application/xml" => declared.essence().ends_with("+xml"),
        "text/plain" => declared.essence().starts_with("text/"),
        _ => false,
    }
}

const PROBE_LEN: usize = 512;

/// Guess a file's MIME type from its leading bytes, falling back to the
/// extension for plain-text formats. Returns `Ok(None)` when the content
/// is not recognized.
pub fn probe_mime_type(path: &Path) -> io::Result<Option<&'static str>> {
    let mut file = File::open(path)?;
    let mut head = Vec::with_capacity(PROBE_LEN);
    file.by_ref().take(PROBE_LEN as u64).read_to_end(&mut head)?;

    if let Some(mime) = probe_magic(&head) {
        return Ok(Some(mime));
    }

    let is_text = !head.contains(&0) && std::str::from_utf8(trim_utf8_tail(&head)).is_ok();
    if !is_text {
        return Ok(None);
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    Ok(match ext.as_str() {
        "txt" | "log" => Some("text/plain"),
        "csv" => Some("text/csv"),
        "htm" | "html" => Some("text/html"),
        "xml" => Some("application/xml"),
        "json" => Some("application/json"),
        "stp" | "step" => Some("model/step"),
        _ => None,
    })
}

/// Drop a UTF-8 sequence cut off by the probe window.
fn trim_utf8_tail(bytes: &[u8]) -> &[u8] {
    match std::str::from_utf8(bytes) {
        Ok(_) => bytes,
        Err(e) if e.error_len().is_none() => &bytes[..e.valid_up_to()],
        Err(_) => bytes,
    }
}

fn probe_magic(head: &[u8]) -> Option<&'static str> {
    if head.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }
    if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("image/png");
    }
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if head.starts_with(b"II*\0") || head.starts_with(b"MM\0*") {
        return Some("image/tiff");
    }
    if head.starts_with(b"PK\x03\x04") || head.starts_with(b"PK\x05\x06") {
        return Some("application/zip");
    }
    if head.starts_with(b"AutoCAD Binary DXF") {
        return Some("image/vnd.dxf; format=binary");
    }

    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<?xml") {
        return Some("application/xml");
    }

    // ASCII DXF starts with group code 0 followed by SECTION
    let mut lines = text.lines().map(str::trim);
    if lines.next() == Some("0") && lines.next() == Some("SECTION") {
        return Some("image/vnd.dxf; format=ascii");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parameter_spacing_and_order() {
        assert!(mime_equals("image/vnd.dxf;format=ascii", "image/vnd.dxf; format=ascii"));
        assert!(mime_equals("text/plain; charset=utf-8; format=flowed", "TEXT/Plain;format=flowed;charset=UTF-8"));
    }

    #[test]
    fn test_missing_parameter_is_wildcard() {
        assert!(mime_equals("image/vnd.dxf", "image/vnd.dxf;format=ascii"));
        assert!(mime_equals("image/vnd.dxf;format=ascii", "image/vnd.dxf"));
        assert!(!mime_equals("image/vnd.dxf;format=ascii", "image/vnd.dxf;format=binary"));
    }

    #[test]
    fn test_aliases_and_invalid_values() {
        assert!(mime_equals("image/jpg", "image/jpeg"));
        assert!(mime_equals("text/xml", "application/xml"));
        assert!(!mime_equals("application/pdf", "image/png"));
        assert!(MimeType::parse("pdf").is_none());
        assert!(MimeType::parse("application/").is_none());
        assert!(MimeType::parse("application/pdf; broken").is_none());
        assert!(mime_equals("pdf", "PDF"));
        assert!(!mime_equals("pdf", "application/pdf"));
    }

    #[test]
    fn test_compatible_container_formats() {
        assert!(mime_compatible(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "application/zip"
        ));
        assert!(mime_compatible("image/svg+xml", "application/xml"));
        assert!(!mime_compatible("application/pdf", "application/zip"));
    }

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_probe_magic_bytes() {
        let dir = TempDir::new().unwrap();
        let pdf = write(&dir, "a.bin", b"%PDF-1.7\n%%EOF");
        let png = write(&dir, "b.bin", b"\x89PNG\r\n\x1a\nrest");
        let dxf = write(&dir, "c.dxf", b"  0\r\nSECTION\r\n  2\r\nHEADER\r\n");
        let unknown = write(&dir, "d.bin", &[0u8, 1, 2, 3]);

        assert_eq!(probe_mime_type(&pdf).unwrap(), Some("application/pdf"));
        assert_eq!(probe_mime_type(&png).unwrap(), Some("image/png"));
        assert_eq!(probe_mime_type(&dxf).unwrap(), Some("image/vnd.dxf; format=ascii"));
        assert_eq!(probe_mime_type(&unknown).unwrap(), None);
    }

    #[test]
    fn test_probe_text_by_extension() {
        let dir = TempDir::new().unwrap();
        let txt = write(&dir, "readme.txt", b"plain text");
        let other = write(&dir, "readme.xyz", b"plain text");

        assert_eq!(probe_mime_type(&txt).unwrap(), Some("text/plain"));
        assert_eq!(probe_mime_type(&other).unwrap(), None);
    }
}
