//! Raw page primitives produced by the extractor.
//!
//! These records are immutable once extracted; every later stage only reads
//! them.

use serde::{Deserialize, Serialize};

use super::geometry::BoundingBox;

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Build from PDF color components in the 0.0..=1.0 range.
    pub fn from_unit(r: f32, g: f32, b: f32) -> Self {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgb(c(r), c(g), c(b))
    }

    /// Convert CMYK components (0.0..=1.0) to RGB.
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        let k = k.clamp(0.0, 1.0);
        Self::from_unit(
            (1.0 - c.clamp(0.0, 1.0)) * (1.0 - k),
            (1.0 - m.clamp(0.0, 1.0)) * (1.0 - k),
            (1.0 - y.clamp(0.0, 1.0)) * (1.0 - k),
        )
    }

    /// Upper-case hex without a leading `#`, e.g. `"FF0000"`.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    /// Near-black colors render as the document default.
    pub fn is_black(self) -> bool {
        self.0 < 16 && self.1 < 16 && self.2 < 16
    }
}

/// Character-level styling carried by text lines and runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font family with any subset prefix removed (e.g. "Helvetica").
    pub font_family: String,
    /// Font size in points.
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Rgb,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            size: 12.0,
            bold: false,
            italic: false,
            underline: false,
            color: Rgb::BLACK,
        }
    }
}

impl TextStyle {
    /// Derive family, weight and slant from a PDF base font name such as
    /// `"ABCDEF+Times-BoldItalic"`.
    pub fn from_font_name(base_font: &str, size: f32) -> Self {
        let name = strip_subset_prefix(base_font);
        let lower = name.to_lowercase();
        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let italic = lower.contains("italic") || lower.contains("oblique");
        let family = name
            .split(['-', ','])
            .next()
            .unwrap_or(name)
            .trim()
            .to_string();

        Self {
            font_family: if family.is_empty() {
                "Helvetica".to_string()
            } else {
                family
            },
            size,
            bold,
            italic,
            ..Default::default()
        }
    }

    /// Same rendering attributes, ignoring tiny size jitter.
    pub fn same_appearance(&self, other: &TextStyle) -> bool {
        self.font_family == other.font_family
            && (self.size - other.size).abs() < 0.5
            && self.bold == other.bold
            && self.italic == other.italic
            && self.underline == other.underline
            && self.color == other.color
    }
}

/// Remove a `XXXXXX+` subset tag from an embedded font name.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest))
            if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) =>
        {
            rest
        }
        _ => name,
    }
}

/// One visual line of text with uniform style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub style: TextStyle,
    pub bbox: BoundingBox,
    /// 0-based page index.
    pub page: usize,
}

impl TextLine {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, style: TextStyle, page: usize) -> Self {
        Self {
            text: text.into(),
            style,
            bbox,
            page,
        }
    }
}

/// Encoding of an extracted image payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Jpeg2000,
    /// Uncompressed samples, 8 bits per component.
    Raw {
        width: u32,
        height: u32,
        components: u8,
    },
}

impl ImageFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg2000 => "jpx",
            ImageFormat::Raw { .. } => "raw",
        }
    }
}

/// An image drawn on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRegion {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub bbox: BoundingBox,
    pub page: usize,
}

/// A cell in a detected table grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub row_span: usize,
    pub col_span: usize,
}

impl TableCell {
    pub fn new(row: usize, col: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            col,
            text: text.into(),
            row_span: 1,
            col_span: 1,
        }
    }
}

/// A detected data table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegion {
    pub bbox: BoundingBox,
    pub cells: Vec<TableCell>,
    pub page: usize,
}

impl TableRegion {
    pub fn new(bbox: BoundingBox, cells: Vec<TableCell>, page: usize) -> Self {
        Self { bbox, cells, page }
    }

    pub fn row_count(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.row + c.row_span.max(1))
            .max()
            .unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.col + c.col_span.max(1))
            .max()
            .unwrap_or(0)
    }

    /// A grid with no rows or no columns cannot be rendered.
    pub fn is_degenerate(&self) -> bool {
        self.row_count() == 0 || self.column_count() == 0
    }

    /// Text of the cell anchored at `(row, col)`, if any.
    pub fn cell_text(&self, row: usize, col: usize) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.row == row && c.col == col)
            .map(|c| c.text.as_str())
    }

    /// All cell text joined row by row, used for word-level validation.
    pub fn plain_text(&self) -> String {
        let mut cells: Vec<&TableCell> = self.cells.iter().collect();
        cells.sort_by_key(|c| (c.row, c.col));
        cells
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything extracted from one page.
#[derive(Debug, Clone, Default)]
pub struct PagePrimitives {
    pub page_index: usize,
    pub width: f32,
    pub height: f32,
    pub lines: Vec<TextLine>,
    pub images: Vec<ImageRegion>,
    pub tables: Vec<TableRegion>,
}

impl PagePrimitives {
    pub fn new(page_index: usize, width: f32, height: f32) -> Self {
        Self {
            page_index,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.images.is_empty() && self.tables.is_empty()
    }

    /// Whether any text was extracted, used by document inspection.
    pub fn has_text(&self) -> bool {
        self.lines.iter().any(|l| !l.text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_from_font_name() {
        let s = TextStyle::from_font_name("ABCDEF+Times-BoldItalic", 10.0);
        assert_eq!(s.font_family, "Times");
        assert!(s.bold);
        assert!(s.italic);

        let s = TextStyle::from_font_name("Helvetica", 12.0);
        assert_eq!(s.font_family, "Helvetica");
        assert!(!s.bold && !s.italic);

        let s = TextStyle::from_font_name("Arial,Bold", 9.0);
        assert_eq!(s.font_family, "Arial");
        assert!(s.bold);
    }

    #[test]
    fn test_subset_prefix_only_for_tags() {
        assert_eq!(strip_subset_prefix("ABCDEF+Foo"), "Foo");
        assert_eq!(strip_subset_prefix("abc+Foo"), "abc+Foo");
        assert_eq!(strip_subset_prefix("Foo"), "Foo");
    }

    #[test]
    fn test_rgb() {
        assert_eq!(Rgb::from_unit(1.0, 0.0, 0.0).to_hex(), "FF0000");
        assert!(Rgb::from_cmyk(0.0, 0.0, 0.0, 1.0).is_black());
        assert_eq!(Rgb::from_cmyk(0.0, 0.0, 0.0, 0.0), Rgb(255, 255, 255));
    }

    #[test]
    fn test_table_dimensions() {
        let table = TableRegion::new(
            BoundingBox::new(0.0, 0.0, 100.0, 50.0),
            vec![
                TableCell::new(0, 0, "a"),
                TableCell::new(0, 1, "b"),
                TableCell::new(1, 0, "c"),
                TableCell::new(1, 1, "d"),
            ],
            0,
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.cell_text(1, 0), Some("c"));
        assert_eq!(table.plain_text(), "a b c d");
        assert!(!table.is_degenerate());
        assert!(TableRegion::new(BoundingBox::default(), vec![], 0).is_degenerate());
    }
}
