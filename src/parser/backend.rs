//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF operations, isolating
//! the concrete PDF library (lopdf) from the content-stream interpreter.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::model::ImageFormat;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Glyph metrics fall back to this advance (per mille of the font size).
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// Font information returned by the backend.
#[derive(Debug, Clone)]
pub struct BackendFontInfo {
    /// Font resource name (key in the page's font dictionary).
    pub name: Vec<u8>,
    /// Base font name (e.g., "Helvetica-Bold").
    pub base_font: String,
    /// First code covered by `widths`.
    pub first_char: u32,
    /// Glyph advances in 1/1000 text space units.
    pub widths: Vec<f32>,
    /// Composite fonts use two-byte codes.
    pub two_byte: bool,
}

impl BackendFontInfo {
    /// Advance of one character code, in 1/1000 text space units.
    pub fn glyph_width(&self, code: u32) -> f32 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_GLYPH_WIDTH)
    }

    /// Character codes of a shown string.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [b] => u32::from(*b),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        }
    }
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// Physical page geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// MediaBox lower-left corner.
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
    /// Rotation in degrees, as stored in the page dictionary.
    pub rotation: i64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        // US Letter
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            width: 612.0,
            height: 792.0,
            rotation: 0,
        }
    }
}

/// An image XObject ready for placement.
#[derive(Debug, Clone)]
pub struct PdfImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

/// A named XObject resource.
#[derive(Debug, Clone)]
pub enum XObject {
    Image(PdfImage),
    /// Form XObjects are not interpreted.
    Form,
    /// Image encodings the converter cannot carry (masks, unusual bit depths).
    Unsupported(String),
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, font info, content stream
/// decoding, and text decoding without exposing any concrete PDF library types.
pub trait PdfBackend {
    /// Return all pages as (1-based page number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Page size and rotation, resolving inherited attributes.
    fn page_geometry(&self, page: PageId) -> PageGeometry;

    /// Return font info for a given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence using the font's encoding on the given page.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;

    /// Resolve a named XObject from the page resources.
    fn xobject(&self, page: PageId, name: &[u8]) -> Result<XObject>;

    /// Names of all XObjects on the page, for inspection.
    fn xobject_names(&self, page: PageId) -> Vec<Vec<u8>>;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| match c {
                [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
                _ => None,
            })
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

/// Inherited page attributes are looked up at most this many levels up.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Self::from_document(doc)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Self::from_document(doc)
    }

    /// Load from a reader.
    pub fn load_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    /// Wrap an already-loaded document.
    ///
    /// Documents lopdf could not decrypt never get here: loading fails with
    /// [`Error::Encrypted`].
    pub fn from_document(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            log::debug!("Document carries an encryption dictionary");
        }
        Ok(Self { doc })
    }

    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    /// Follow a reference, if the object is one.
    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, walking `/Parent` for inherited values.
    fn inherited(&self, page: PageId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.doc.get_dictionary(page).ok()?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = dict.get(key) {
                return self.resolve(value);
            }
            let parent = dict.get(b"Parent").ok()?;
            dict = self.resolve_dict(parent)?;
        }
        None
    }

    fn resource_dict(&self, page: PageId, category: &[u8]) -> Option<&Dictionary> {
        let resources = match self.inherited(page, b"Resources")? {
            Object::Dictionary(d) => d,
            _ => return None,
        };
        self.resolve_dict(resources.get(category).ok()?)
    }

    fn font_info(&self, name: &[u8], font: &Dictionary) -> BackendFontInfo {
        let base_font = font
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let two_byte = font
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|s| s == b"Type0")
            .unwrap_or(false);
        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);
        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| self.resolve(w).and_then(object_number).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();

        BackendFontInfo {
            name: name.to_vec(),
            base_font,
            first_char,
            widths,
            two_byte,
        }
    }

    fn image_from_stream(&self, stream: &Stream) -> XObject {
        let dict = &stream.dict;
        let is_mask = dict
            .get(b"ImageMask")
            .ok()
            .and_then(|o| o.as_bool().ok())
            .unwrap_or(false);
        if is_mask {
            return XObject::Unsupported("stencil mask".to_string());
        }

        // The last filter in a chain determines the payload encoding.
        let filter = dict.get(b"Filter").ok().and_then(|f| match self.resolve(f)? {
            Object::Name(n) => Some(n.clone()),
            Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()).map(|n| n.to_vec()),
            _ => None,
        });

        match filter.as_deref() {
            Some(b"DCTDecode") => XObject::Image(PdfImage {
                data: stream.content.clone(),
                format: ImageFormat::Jpeg,
            }),
            Some(b"JPXDecode") => XObject::Image(PdfImage {
                data: stream.content.clone(),
                format: ImageFormat::Jpeg2000,
            }),
            Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                XObject::Unsupported("bilevel fax encoding".to_string())
            }
            _ => self.raw_image(stream),
        }
    }

    fn raw_image(&self, stream: &Stream) -> XObject {
        let dict = &stream.dict;
        let int = |key: &[u8]| dict.get(key).ok().and_then(|o| o.as_i64().ok());

        let (width, height) = match (int(b"Width"), int(b"Height")) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w as u32, h as u32),
            _ => return XObject::Unsupported("missing image dimensions".to_string()),
        };
        if int(b"BitsPerComponent").unwrap_or(8) != 8 {
            return XObject::Unsupported("bit depth other than 8".to_string());
        }

        let components = match dict.get(b"ColorSpace").ok().and_then(|c| self.resolve(c)) {
            Some(Object::Name(n)) => color_space_components(n),
            Some(Object::Array(arr)) => match arr.first().and_then(|o| o.as_name().ok()) {
                Some(b"ICCBased") => arr
                    .get(1)
                    .and_then(|o| self.resolve_dict(o))
                    .and_then(|d| d.get(b"N").ok())
                    .and_then(|n| n.as_i64().ok())
                    .map(|n| n as u8),
                Some(name) => color_space_components(name),
                None => None,
            },
            _ => Some(3),
        };
        let components = match components {
            Some(c @ (1 | 3 | 4)) => c,
            _ => return XObject::Unsupported("unsupported color space".to_string()),
        };

        let data = if dict.get(b"Filter").is_ok() {
            match stream.decompressed_content() {
                Ok(data) => data,
                Err(e) => return XObject::Unsupported(format!("undecodable samples: {}", e)),
            }
        } else {
            stream.content.clone()
        };

        XObject::Image(PdfImage {
            data,
            format: ImageFormat::Raw {
                width,
                height,
                components,
            },
        })
    }
}

fn color_space_components(name: &[u8]) -> Option<u8> {
    match name {
        b"DeviceGray" | b"CalGray" | b"G" => Some(1),
        b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(3),
        b"DeviceCMYK" | b"CMYK" => Some(4),
        _ => None,
    }
}

fn object_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_geometry(&self, page: PageId) -> PageGeometry {
        let mut geometry = PageGeometry::default();

        let media_box = self
            .inherited(page, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| self.resolve(v).and_then(object_number))
                    .collect::<Vec<f32>>()
            });
        if let Some([x0, y0, x1, y1]) = media_box.as_deref() {
            let (w, h) = ((x1 - x0).abs(), (y1 - y0).abs());
            if w > 0.0 && h > 0.0 {
                geometry.origin_x = x0.min(*x1);
                geometry.origin_y = y0.min(*y1);
                geometry.width = w;
                geometry.height = h;
            }
        }

        geometry.rotation = self
            .inherited(page, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .rem_euclid(360);
        geometry
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>> {
        let Some(fonts) = self.resource_dict(page, b"Font") else {
            return Ok(Vec::new());
        };
        Ok(fonts
            .iter()
            .filter_map(|(name, obj)| {
                self.resolve_dict(obj)
                    .map(|font| self.font_info(name, font))
            })
            .collect())
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;
        let contents = match page_dict.get(b"Contents") {
            Ok(obj) => self
                .resolve(obj)
                .ok_or_else(|| Error::PdfParse("Invalid content stream".to_string()))?,
            // A page without content is blank, not broken.
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Stream(s) => Ok(s.decompressed_content().unwrap_or_else(|_| s.content.clone())),
            Object::Array(arr) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Some(Object::Stream(s)) = self.resolve(obj) {
                        match s.decompressed_content() {
                            Ok(data) => content.extend_from_slice(&data),
                            Err(_) => content.extend_from_slice(&s.content),
                        }
                        content.push(b'\n');
                    }
                }
                Ok(content)
            }
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        let font = self
            .resource_dict(page, b"Font")
            .and_then(|fonts| fonts.get(font_name).ok())
            .and_then(|obj| self.resolve_dict(obj));
        if let Some(font_dict) = font {
            if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn xobject(&self, page: PageId, name: &[u8]) -> Result<XObject> {
        let obj = self
            .resource_dict(page, b"XObject")
            .and_then(|x| x.get(name).ok())
            .and_then(|o| self.resolve(o))
            .ok_or_else(|| {
                Error::PdfParse(format!("XObject /{} not found", String::from_utf8_lossy(name)))
            })?;

        let Object::Stream(stream) = obj else {
            return Err(Error::Corrupted("XObject is not a stream".to_string()));
        };
        match stream.dict.get(b"Subtype").ok().and_then(|s| s.as_name().ok()) {
            Some(b"Image") => Ok(self.image_from_stream(stream)),
            Some(b"Form") => Ok(XObject::Form),
            _ => Ok(XObject::Unsupported("unknown XObject subtype".to_string())),
        }
    }

    fn xobject_names(&self, page: PageId) -> Vec<Vec<u8>> {
        self.resource_dict(page, b"XObject")
            .map(|x| x.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}
