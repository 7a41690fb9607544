//! Primitive extraction: text lines, images and tables per page.
//!
//! A small content-stream interpreter tracks the graphics and text state
//! needed to place text and images, then groups shown strings into
//! uniformly-styled lines. All output geometry is top-left origin.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use super::backend::{
    get_number_from_value, BackendFontInfo, ContentOp, LopdfBackend, PageGeometry, PageId,
    PdfBackend, PdfValue, XObject,
};
use super::options::{ErrorMode, ExtractOptions};
use super::table_detector::TableDetector;
use crate::error::{Error, Result};
use crate::model::{BoundingBox, ImageRegion, PagePrimitives, Rgb, TextLine, TextStyle};

/// Source of per-page primitives.
///
/// Extraction is deterministic: the same page always yields the same
/// primitives in the same order.
pub trait PrimitiveExtractor {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Extract the lines, images and tables of a 0-based page.
    fn extract_page(&self, page_index: usize) -> Result<PagePrimitives>;
}

/// TJ adjustments larger than this (1/1000 em) read as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Fraction of the font size above the baseline covered by a glyph box.
const ASCENT: f32 = 0.8;

/// Extractor over any [`PdfBackend`].
pub struct PdfExtractor<B: PdfBackend = LopdfBackend> {
    backend: B,
    options: ExtractOptions,
    page_ids: Vec<PageId>,
}

impl PdfExtractor<LopdfBackend> {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Self> {
        Ok(Self::new(LopdfBackend::load_file(path)?, options))
    }

    /// Open a PDF held in memory.
    pub fn from_bytes(data: &[u8], options: ExtractOptions) -> Result<Self> {
        Ok(Self::new(LopdfBackend::load_bytes(data)?, options))
    }
}

impl<B: PdfBackend> PdfExtractor<B> {
    pub fn new(backend: B, options: ExtractOptions) -> Self {
        let page_ids = backend.pages().into_values().collect();
        Self {
            backend,
            options,
            page_ids,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    fn page_id(&self, page_index: usize) -> Result<PageId> {
        self.page_ids
            .get(page_index)
            .copied()
            .ok_or(Error::PageOutOfRange(page_index, self.page_ids.len()))
    }

    /// Page size in points.
    pub fn page_geometry(&self, page_index: usize) -> Result<PageGeometry> {
        Ok(self.backend.page_geometry(self.page_id(page_index)?))
    }

    /// Apply the error mode to a page-level failure.
    fn recover<T: Default>(&self, page_index: usize, what: &str, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                log::warn!("Page {}: {} failed: {}", page_index, what, e);
                Ok(T::default())
            }
            Err(e) => Err(e),
        }
    }

    fn interpret(&self, page_index: usize, page_id: PageId, geometry: PageGeometry) -> Result<(Vec<Fragment>, Vec<ImageRegion>)> {
        let fonts: HashMap<Vec<u8>, BackendFontInfo> = self
            .recover(page_index, "font lookup", self.backend.page_fonts(page_id))?
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();

        let content = self.backend.page_content(page_id)?;
        let ops = self.backend.decode_content(&content)?;

        let mut interpreter = Interpreter::new(&self.backend, page_id, page_index, geometry, &fonts);
        interpreter.extract_images = self.options.extract_images;
        interpreter.split_threshold = self.options.split_gap_ratio * 1000.0;
        for op in &ops {
            interpreter.apply(op);
        }

        if let Some(e) = interpreter.image_error.take() {
            if self.options.error_mode == ErrorMode::Strict {
                return Err(e);
            }
        }
        Ok((interpreter.fragments, interpreter.images))
    }
}

impl<B: PdfBackend> PrimitiveExtractor for PdfExtractor<B> {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn extract_page(&self, page_index: usize) -> Result<PagePrimitives> {
        let page_id = self.page_id(page_index)?;
        let geometry = self.backend.page_geometry(page_id);
        let mut page = PagePrimitives::new(page_index, geometry.width, geometry.height);

        let (fragments, images) = self.recover(
            page_index,
            "content interpretation",
            self.interpret(page_index, page_id, geometry),
        )?;

        page.lines = assemble_lines(fragments, self.options.split_gap_ratio, page_index);
        page.images = images;

        if self.options.detect_tables {
            let detector = TableDetector::with_config(self.options.table_config.clone());
            page.tables = detector.detect(&page.lines);
        }

        log::debug!(
            "Page {}: {} lines, {} images, {} tables",
            page_index,
            page.lines.len(),
            page.images.len(),
            page.tables.len()
        );
        Ok(page)
    }
}

// ---------------------------------------------------------------------------
// Content-stream interpretation
// ---------------------------------------------------------------------------

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(ops: &[PdfValue]) -> Option<Matrix> {
        let n: Vec<f32> = ops.iter().filter_map(get_number_from_value).collect();
        match n.as_slice() {
            [a, b, c, d, e, f] => Some(Matrix {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }

    fn translation(tx: f32, ty: f32) -> Matrix {
        Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.a + y * self.c + self.e, x * self.b + y * self.d + self.f)
    }

    /// Vertical scale factor.
    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Graphics state saved by `q` and restored by `Q`. Text state parameters
/// are part of it.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Rgb,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill: Rgb::BLACK,
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// A shown string placed on the page, top-left coordinates.
#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    text: String,
    x0: f32,
    x1: f32,
    baseline: f32,
    size: f32,
    style: TextStyle,
}

struct Interpreter<'a, B: PdfBackend> {
    backend: &'a B,
    page_id: PageId,
    page_index: usize,
    geometry: PageGeometry,
    fonts: &'a HashMap<Vec<u8>, BackendFontInfo>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    in_text: bool,
    extract_images: bool,
    /// TJ adjustments beyond this (1/1000 em) end the current fragment.
    split_threshold: f32,
    fragments: Vec<Fragment>,
    images: Vec<ImageRegion>,
    image_error: Option<Error>,
}

impl<'a, B: PdfBackend> Interpreter<'a, B> {
    fn new(
        backend: &'a B,
        page_id: PageId,
        page_index: usize,
        geometry: PageGeometry,
        fonts: &'a HashMap<Vec<u8>, BackendFontInfo>,
    ) -> Self {
        Self {
            backend,
            page_id,
            page_index,
            geometry,
            fonts,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            in_text: false,
            extract_images: true,
            split_threshold: 1500.0,
            fragments: Vec::new(),
            images: Vec::new(),
            image_error: None,
        }
    }

    fn apply(&mut self, op: &ContentOp) {
        let num = |i: usize| op.operands.get(i).and_then(get_number_from_value);
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }
            "g" => {
                if let Some(v) = num(0) {
                    self.state.fill = Rgb::from_unit(v, v, v);
                }
            }
            "rg" => {
                if let (Some(r), Some(g), Some(b)) = (num(0), num(1), num(2)) {
                    self.state.fill = Rgb::from_unit(r, g, b);
                }
            }
            "k" => {
                if let (Some(c), Some(m), Some(y), Some(k)) = (num(0), num(1), num(2), num(3)) {
                    self.state.fill = Rgb::from_cmyk(c, m, y, k);
                }
            }
            "sc" | "scn" => {
                let comps: Vec<f32> = op.operands.iter().filter_map(get_number_from_value).collect();
                match comps.as_slice() {
                    [v] => self.state.fill = Rgb::from_unit(*v, *v, *v),
                    [r, g, b] => self.state.fill = Rgb::from_unit(*r, *g, *b),
                    [c, m, y, k] => self.state.fill = Rgb::from_cmyk(*c, *m, *y, *k),
                    _ => {}
                }
            }
            "BT" => {
                self.in_text = true;
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => self.in_text = false,
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.state.font = Some(name.clone());
                }
                if let Some(size) = num(1) {
                    self.state.font_size = size;
                }
            }
            "Tc" => self.state.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => self.state.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => self.state.horizontal_scale = num(0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.leading = num(0).unwrap_or(0.0),
            "Ts" => self.state.rise = num(0).unwrap_or(0.0),
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.state.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    self.show(items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (num(0), num(1)) {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                }
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "Do" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.place_xobject(name);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        // Producers that never set TL still expect T* to advance a line.
        let leading = if self.state.leading != 0.0 {
            self.state.leading
        } else {
            self.state.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    /// Convert a point in PDF user space to top-left page coordinates.
    fn to_page(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x - self.geometry.origin_x,
            self.geometry.origin_y + self.geometry.height - y,
        )
    }

    /// Show a TJ-style array of strings and position adjustments.
    fn show(&mut self, items: &[PdfValue]) {
        if !self.in_text {
            return;
        }
        let fonts = self.fonts;
        let font_name = self.state.font.clone().unwrap_or_default();
        let font = fonts.get(&font_name);
        let size = self.state.font_size;
        let th = self.state.horizontal_scale;
        let split_threshold = self.split_threshold;

        let mut pending: Option<(String, f32)> = None;
        let mut pending_end = 0.0;

        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    let text = self.backend.decode_text(self.page_id, &font_name, bytes);
                    let advance = self.string_advance(font, bytes);
                    let start = self.cursor_x();
                    let entry = pending.get_or_insert_with(|| (String::new(), start));
                    entry.0.push_str(&text);
                    self.advance(advance);
                    pending_end = self.cursor_x();
                }
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let n = get_number_from_value(item).unwrap_or(0.0);
                    let adjustment = -n;
                    if adjustment > split_threshold {
                        if let Some((text, start)) = pending.take() {
                            self.push_fragment(text, start, pending_end, font);
                        }
                    } else if adjustment > TJ_SPACE_THRESHOLD {
                        if let Some((text, _)) = pending.as_mut() {
                            let needs_space = text
                                .chars()
                                .last()
                                .map(|c| !c.is_whitespace() && !is_spaceless_script_char(c))
                                .unwrap_or(false);
                            if needs_space {
                                text.push(' ');
                            }
                        }
                    }
                    self.advance(adjustment / 1000.0 * size * th);
                }
                _ => {}
            }
        }

        if let Some((text, start)) = pending {
            self.push_fragment(text, start, pending_end, font);
        }
    }

    /// Horizontal displacement of a string in unscaled text space.
    fn string_advance(&self, font: Option<&BackendFontInfo>, bytes: &[u8]) -> f32 {
        let size = self.state.font_size;
        let th = self.state.horizontal_scale;
        let codes: Vec<u32> = match font {
            Some(f) => f.codes(bytes),
            None => bytes.iter().map(|&b| u32::from(b)).collect(),
        };
        let single_byte = font.map(|f| !f.two_byte).unwrap_or(true);

        codes
            .iter()
            .map(|&code| {
                let glyph = font.map(|f| f.glyph_width(code)).unwrap_or(500.0) / 1000.0 * size;
                let word = if single_byte && code == 32 {
                    self.state.word_spacing
                } else {
                    0.0
                };
                (glyph + self.state.char_spacing + word) * th
            })
            .sum()
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }

    /// Current text position along the baseline, in device X.
    fn cursor_x(&self) -> f32 {
        let m = self.text_matrix.then(&self.state.ctm);
        m.apply(0.0, self.state.rise).0
    }

    fn push_fragment(&mut self, text: String, start_x: f32, end_x: f32, font: Option<&BackendFontInfo>) {
        if text.trim().is_empty() {
            return;
        }
        let m = self.text_matrix.then(&self.state.ctm);
        let (_, baseline_pdf) = m.apply(0.0, self.state.rise);
        let size = self.state.font_size * m.vertical_scale();
        if !(size.is_finite() && size > 0.0) {
            return;
        }

        let (x0, baseline) = self.to_page(start_x.min(end_x), baseline_pdf);
        let x1 = x0 + (end_x - start_x).abs();

        let mut style = font
            .map(|f| TextStyle::from_font_name(&f.base_font, size))
            .unwrap_or_else(|| TextStyle {
                size,
                ..TextStyle::default()
            });
        style.size = (size * 10.0).round() / 10.0;
        style.color = self.state.fill;

        self.fragments.push(Fragment {
            text,
            x0,
            x1: x1.max(x0 + size * 0.25),
            baseline,
            size,
            style,
        });
    }

    fn place_xobject(&mut self, name: &[u8]) {
        if !self.extract_images {
            return;
        }
        match self.backend.xobject(self.page_id, name) {
            Ok(XObject::Image(image)) => {
                // Images are drawn into the unit square mapped by the CTM.
                let ctm = self.state.ctm;
                let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
                let points: Vec<(f32, f32)> = corners
                    .iter()
                    .map(|&(x, y)| {
                        let (px, py) = ctm.apply(x, y);
                        self.to_page(px, py)
                    })
                    .collect();
                let x0 = points.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
                let x1 = points.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
                let y0 = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
                let y1 = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

                self.images.push(ImageRegion {
                    data: image.data,
                    format: image.format,
                    bbox: BoundingBox::new(x0, y0, x1, y1),
                    page: self.page_index,
                });
            }
            Ok(XObject::Form) => {
                log::debug!(
                    "Page {}: form XObject /{} not interpreted",
                    self.page_index,
                    String::from_utf8_lossy(name)
                );
            }
            Ok(XObject::Unsupported(reason)) => {
                log::warn!(
                    "Page {}: skipping image /{}: {}",
                    self.page_index,
                    String::from_utf8_lossy(name),
                    reason
                );
            }
            Err(e) => {
                log::warn!(
                    "Page {}: image /{} could not be read: {}",
                    self.page_index,
                    String::from_utf8_lossy(name),
                    e
                );
                self.image_error.get_or_insert(Error::ImageDecode(e.to_string()));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Line assembly
// ---------------------------------------------------------------------------

/// Group fragments into uniformly-styled lines.
///
/// Fragments share a line when their baselines are within 30% of the font
/// size. Neighbours on a line are joined while the style is unchanged and
/// the horizontal gap stays under `split_gap_ratio` font sizes.
fn assemble_lines(mut fragments: Vec<Fragment>, split_gap_ratio: f32, page: usize) -> Vec<TextLine> {
    fragments.sort_by(|a, b| {
        a.baseline
            .partial_cmp(&b.baseline)
            .unwrap_or(Ordering::Equal)
            .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
    });

    // Bucket by baseline.
    let mut rows: Vec<Vec<Fragment>> = Vec::new();
    for fragment in fragments {
        match rows.last_mut() {
            Some(row)
                if row
                    .first()
                    .map(|f| (f.baseline - fragment.baseline).abs() <= f.size.max(fragment.size) * 0.3)
                    .unwrap_or(false) =>
            {
                row.push(fragment)
            }
            _ => rows.push(vec![fragment]),
        }
    }

    let mut lines = Vec::new();
    for mut row in rows {
        row.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));

        let mut current: Option<Fragment> = None;
        for fragment in row {
            current = match current.take() {
                Some(mut line) => {
                    let gap = fragment.x0 - line.x1;
                    let size = line.size.max(fragment.size);
                    if line.style.same_appearance(&fragment.style) && gap <= split_gap_ratio * size {
                        if needs_space(&line.text, &fragment.text, gap, size) {
                            line.text.push(' ');
                        }
                        line.text.push_str(&fragment.text);
                        line.x1 = line.x1.max(fragment.x1);
                        Some(line)
                    } else {
                        lines.push(to_line(line, page));
                        Some(fragment)
                    }
                }
                None => Some(fragment),
            };
        }
        if let Some(line) = current {
            lines.push(to_line(line, page));
        }
    }
    lines
}

fn needs_space(left: &str, right: &str, gap: f32, size: f32) -> bool {
    let (Some(last), Some(first)) = (left.chars().last(), right.chars().next()) else {
        return false;
    };
    if last.is_whitespace() || first.is_whitespace() {
        return false;
    }
    gap > size * 0.15 && !(is_spaceless_script_char(last) && is_spaceless_script_char(first))
}

fn to_line(fragment: Fragment, page: usize) -> TextLine {
    let top = fragment.baseline - fragment.size * ASCENT;
    let bbox = BoundingBox::new(fragment.x0, top, fragment.x1, top + fragment.size);
    TextLine::new(fragment.text.trim().to_string(), bbox, fragment.style, page)
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageFormat;
    use crate::parser::backend::PdfImage;
    use std::collections::BTreeMap;

    fn fragment(text: &str, x0: f32, x1: f32, baseline: f32, style: TextStyle) -> Fragment {
        Fragment {
            text: text.to_string(),
            x0,
            x1,
            baseline,
            size: style.size,
            style,
        }
    }

    #[test]
    fn test_matrix_composition() {
        let scale = Matrix { a: 2.0, d: 2.0, ..Matrix::IDENTITY };
        let shift = Matrix::translation(10.0, 20.0);
        // Scale first, then shift
        let m = scale.then(&shift);
        assert_eq!(m.apply(1.0, 1.0), (12.0, 22.0));
        assert_eq!(m.vertical_scale(), 2.0);
    }

    #[test]
    fn test_assemble_joins_words() {
        let style = TextStyle::default();
        let lines = assemble_lines(
            vec![
                fragment("world", 140.0, 170.0, 100.0, style.clone()),
                fragment("Hello", 100.0, 130.0, 100.0, style.clone()),
            ],
            1.5,
            0,
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hello world");
        let top = 100.0 - 12.0 * ASCENT;
        assert_eq!(lines[0].bbox, BoundingBox::new(100.0, top, 170.0, top + 12.0));
    }

    #[test]
    fn test_assemble_splits_on_style_and_gap() {
        let plain = TextStyle::default();
        let bold = TextStyle { bold: true, ..TextStyle::default() };
        let lines = assemble_lines(
            vec![
                fragment("Name", 100.0, 130.0, 100.0, plain.clone()),
                fragment("Alice", 300.0, 330.0, 100.0, plain.clone()),
                fragment("Note:", 100.0, 130.0, 200.0, bold),
                fragment("details", 133.0, 170.0, 200.0, plain),
            ],
            1.5,
            0,
        );
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Name", "Alice", "Note:", "details"]);
    }

    #[test]
    fn test_spaceless_scripts() {
        assert!(!needs_space("中", "文", 5.0, 12.0));
        assert!(needs_space("a", "b", 5.0, 12.0));
        assert!(!needs_space("a ", "b", 5.0, 12.0));
        assert!(!needs_space("a", "b", 0.5, 12.0));
    }

    /// In-memory backend driving the interpreter without a real PDF.
    struct FakeBackend {
        ops: Vec<ContentOp>,
    }

    fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp {
            operator: operator.to_string(),
            operands,
        }
    }

    impl PdfBackend for FakeBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            BTreeMap::from([(1, (1, 0))])
        }
        fn page_geometry(&self, _page: PageId) -> PageGeometry {
            PageGeometry::default()
        }
        fn page_fonts(&self, _page: PageId) -> Result<Vec<BackendFontInfo>> {
            Ok(vec![BackendFontInfo {
                name: b"F1".to_vec(),
                base_font: "Helvetica-Bold".to_string(),
                first_char: 0,
                widths: vec![],
                two_byte: false,
            }])
        }
        fn page_content(&self, _page: PageId) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
        fn decode_content(&self, _data: &[u8]) -> Result<Vec<ContentOp>> {
            Ok(self.ops.clone())
        }
        fn decode_text(&self, _page: PageId, _font: &[u8], bytes: &[u8]) -> String {
            String::from_utf8_lossy(bytes).to_string()
        }
        fn xobject(&self, _page: PageId, _name: &[u8]) -> Result<XObject> {
            Ok(XObject::Image(PdfImage {
                data: vec![0xFF, 0xD8],
                format: ImageFormat::Jpeg,
            }))
        }
        fn xobject_names(&self, _page: PageId) -> Vec<Vec<u8>> {
            vec![b"Im0".to_vec()]
        }
    }

    #[test]
    fn test_interpreter_places_text_and_images() {
        let backend = FakeBackend {
            ops: vec![
                op("BT", vec![]),
                op("Tf", vec![PdfValue::Name(b"F1".to_vec()), PdfValue::Integer(10)]),
                op("rg", vec![PdfValue::Real(1.0), PdfValue::Integer(0), PdfValue::Integer(0)]),
                op("Td", vec![PdfValue::Integer(72), PdfValue::Integer(700)]),
                op("Tj", vec![PdfValue::Str(b"Title".to_vec())]),
                op("ET", vec![]),
                op("q", vec![]),
                op(
                    "cm",
                    vec![
                        PdfValue::Integer(200),
                        PdfValue::Integer(0),
                        PdfValue::Integer(0),
                        PdfValue::Integer(150),
                        PdfValue::Integer(100),
                        PdfValue::Integer(300),
                    ],
                ),
                op("Do", vec![PdfValue::Name(b"Im0".to_vec())]),
                op("Q", vec![]),
            ],
        };
        let extractor = PdfExtractor::new(backend, ExtractOptions::default());
        let page = extractor.extract_page(0).unwrap();

        assert_eq!(page.lines.len(), 1);
        let line = &page.lines[0];
        assert_eq!(line.text, "Title");
        assert!(line.style.bold);
        assert_eq!(line.style.color, Rgb(255, 0, 0));
        // Baseline at 792 - 700 = 92, glyph box starts 8pt above it
        assert!((line.bbox.y0 - 84.0).abs() < 1e-3);
        assert!((line.bbox.x0 - 72.0).abs() < 1e-3);
        // Five glyphs at the 500/1000 default advance
        assert!((line.bbox.x1 - 97.0).abs() < 1e-3);

        assert_eq!(page.images.len(), 1);
        assert_eq!(page.images[0].bbox, BoundingBox::new(100.0, 342.0, 300.0, 492.0));
    }

    #[test]
    fn test_page_out_of_range() {
        let extractor = PdfExtractor::new(FakeBackend { ops: vec![] }, ExtractOptions::default());
        assert_eq!(extractor.page_count(), 1);
        assert!(matches!(extractor.extract_page(3), Err(Error::PageOutOfRange(3, 1))));
    }
}
