//! Document inspection without conversion.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::backend::{LopdfBackend, PdfBackend, XObject};
use crate::error::Result;

/// Document information dictionary fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// Per-page summary.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    /// 0-based page index
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub rotation: i64,
    pub image_count: usize,
    pub has_text: bool,
}

/// Summary of a PDF document.
#[derive(Debug, Clone, Serialize)]
pub struct PdfInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub metadata: DocumentMetadata,
    pub pages: Vec<PageInfo>,
}

impl PdfInfo {
    /// Inspect a PDF file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let backend = LopdfBackend::load_file(path)?;
        let mut info = Self::from_backend(&backend);
        info.path = Some(path.to_path_buf());
        Ok(info)
    }

    /// Inspect a PDF held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let backend = LopdfBackend::load_bytes(data)?;
        Ok(Self::from_backend(&backend))
    }

    pub fn from_backend(backend: &LopdfBackend) -> Self {
        let pages: Vec<PageInfo> = backend
            .pages()
            .into_values()
            .enumerate()
            .map(|(index, id)| page_info(backend, index, id))
            .collect();

        Self {
            path: None,
            version: backend.version(),
            page_count: pages.len(),
            encrypted: backend.is_encrypted(),
            metadata: read_metadata(backend),
            pages,
        }
    }
}

fn page_info(backend: &LopdfBackend, index: usize, id: super::backend::PageId) -> PageInfo {
    let geometry = backend.page_geometry(id);
    let image_count = backend
        .xobject_names(id)
        .iter()
        .filter(|name| matches!(backend.xobject(id, name), Ok(XObject::Image(_))))
        .count();
    let has_text = backend
        .page_content(id)
        .and_then(|content| backend.decode_content(&content))
        .map(|ops| {
            ops.iter()
                .any(|op| matches!(op.operator.as_str(), "Tj" | "TJ" | "'" | "\""))
        })
        .unwrap_or(false);

    PageInfo {
        index,
        width: geometry.width,
        height: geometry.height,
        rotation: geometry.rotation,
        image_count,
        has_text,
    }
}

fn read_metadata(backend: &LopdfBackend) -> DocumentMetadata {
    let doc = backend.raw_doc();
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|o| o.as_reference().ok())
        .and_then(|id| doc.get_dictionary(id).ok());

    let Some(info) = info else {
        return DocumentMetadata::default();
    };

    DocumentMetadata {
        title: get_string_from_dict(info, b"Title"),
        author: get_string_from_dict(info, b"Author"),
        subject: get_string_from_dict(info, b"Subject"),
        keywords: get_string_from_dict(info, b"Keywords"),
        creator: get_string_from_dict(info, b"Creator"),
        producer: get_string_from_dict(info, b"Producer"),
        created: get_string_from_dict(info, b"CreationDate").and_then(|s| parse_pdf_date(&s)),
        modified: get_string_from_dict(info, b"ModDate").and_then(|s| parse_pdf_date(&s)),
    }
}

fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        lopdf::Object::String(bytes, _) => {
            let text = super::backend::decode_text_simple(bytes);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        lopdf::Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use lopdf::{dictionary, Object, StringFormat};

    #[test]
    fn test_parse_pdf_date() {
        let date = parse_pdf_date("D:20240115103045+09'00'").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
        assert_eq!(date.hour(), 10);
    }

    #[test]
    fn test_parse_pdf_date_minimal() {
        let date = parse_pdf_date("D:2024").unwrap();
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 1);
        assert!(parse_pdf_date("D:20").is_none());
    }

    #[test]
    fn test_string_from_dict() {
        let dict = dictionary! {
            "Title" => Object::String(vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69], StringFormat::Hexadecimal),
            "Author" => Object::string_literal("  "),
            "Creator" => "Writer",
        };
        assert_eq!(get_string_from_dict(&dict, b"Title").as_deref(), Some("Hi"));
        assert_eq!(get_string_from_dict(&dict, b"Author"), None);
        assert_eq!(get_string_from_dict(&dict, b"Creator").as_deref(), Some("Writer"));
        assert_eq!(get_string_from_dict(&dict, b"Subject"), None);
    }
}
