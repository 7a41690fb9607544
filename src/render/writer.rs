//! DOCX output: a block stream and the writer that packs it.
//!
//! The renderer produces [`DocBlock`]s; a [`DocxSink`] appends them in
//! order and commits the finished document. [`DocxWriter`] is the sink
//! backed by `docx-rs`.

use std::fs::{self, File};
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use docx_rs::{
    AlignmentType, BreakType, Docx, LineSpacing, PageMargin, Paragraph, Pic, Run, RunFonts, Table,
    TableCell, TableRow, WidthType,
};

use crate::error::{Error, Result};

/// Twentieths of a point.
fn twips(points: f32) -> i32 {
    (points * 20.0).round() as i32
}

/// English Metric Units.
fn emu(points: f32) -> u32 {
    (points.max(0.0) * 12_700.0).round() as u32
}

/// A styled span of text.
#[derive(Debug, Clone, PartialEq)]
pub struct DocRun {
    pub text: String,
    pub font: String,
    /// Points
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Hex color, `None` for the default (black)
    pub color: Option<String>,
}

impl DocRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: "Arial".to_string(),
            size: 11.0,
            bold: false,
            italic: false,
            underline: false,
            color: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocAlignment {
    #[default]
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocParagraph {
    pub runs: Vec<DocRun>,
    /// Points
    pub space_before: Option<f32>,
    pub alignment: DocAlignment,
}

impl DocParagraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }
}

/// An inline picture, already encoded as PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct DocImage {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    /// Display size in points
    pub width: f32,
    pub height: f32,
    pub space_before: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocCell {
    pub blocks: Vec<DocBlock>,
    pub col_span: usize,
}

/// A native table. Layout tables carry column content and have no borders.
#[derive(Debug, Clone, PartialEq)]
pub struct DocTable {
    /// Points, one per grid column
    pub column_widths: Vec<f32>,
    pub rows: Vec<Vec<DocCell>>,
    pub bordered: bool,
}

/// One unit of the output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DocBlock {
    Paragraph(DocParagraph),
    Image(DocImage),
    Table(DocTable),
    PageBreak,
}

/// Ordered append-only document output.
pub trait DocxSink {
    /// Append one block after everything appended so far.
    fn append(&mut self, block: DocBlock) -> Result<()>;

    /// Number of blocks appended.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`DocxSink`] building a document with `docx-rs`.
pub struct DocxWriter {
    docx: Option<Docx>,
    appended: usize,
}

impl DocxWriter {
    /// Start a document with the given page size and margin, in points.
    pub fn new(page_width: f32, page_height: f32, margin: f32) -> Self {
        let m = twips(margin);
        let docx = Docx::new()
            .page_size(twips(page_width).max(1) as u32, twips(page_height).max(1) as u32)
            .page_margin(PageMargin::new().top(m).bottom(m).left(m).right(m));
        Self {
            docx: Some(docx),
            appended: 0,
        }
    }

    /// Pack the document into `writer`.
    pub fn commit_to<W: Write + Seek>(mut self, writer: W) -> Result<()> {
        let docx = self
            .docx
            .take()
            .ok_or_else(|| Error::Render("document already committed".to_string()))?;
        docx.build()
            .pack(writer)
            .map_err(|e| Error::Render(e.to_string()))
    }

    /// Pack the document into memory.
    pub fn commit_to_bytes(self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.commit_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write the document to `path`, creating parent directories.
    ///
    /// The file is only created once the whole document has been packed.
    pub fn commit(self, path: &Path) -> Result<()> {
        let bytes = self.commit_to_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        Ok(())
    }
}

impl DocxSink for DocxWriter {
    fn append(&mut self, block: DocBlock) -> Result<()> {
        let docx = self
            .docx
            .take()
            .ok_or_else(|| Error::Render("document already committed".to_string()))?;
        self.docx = Some(match block {
            DocBlock::Table(table) => docx.add_table(build_table(&table)),
            other => docx.add_paragraph(build_paragraph(&other)),
        });
        self.appended += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.appended
    }
}

fn build_run(run: &DocRun) -> Run {
    let mut r = Run::new()
        .add_text(run.text.as_str())
        .size((run.size * 2.0).round() as usize)
        .fonts(RunFonts::new().ascii(run.font.as_str()).hi_ansi(run.font.as_str()));
    if run.bold {
        r = r.bold();
    }
    if run.italic {
        r = r.italic();
    }
    if run.underline {
        r = r.underline("single");
    }
    if let Some(color) = &run.color {
        r = r.color(color.as_str());
    }
    r
}

fn with_space_before(p: Paragraph, space_before: Option<f32>) -> Paragraph {
    let before = space_before.map(|pt| twips(pt).max(0) as u32).unwrap_or(0);
    p.line_spacing(LineSpacing::new().before(before).after(0))
}

/// Non-table blocks all become one paragraph.
fn build_paragraph(block: &DocBlock) -> Paragraph {
    match block {
        DocBlock::Paragraph(para) => {
            let mut p = para
                .runs
                .iter()
                .fold(Paragraph::new(), |p, run| p.add_run(build_run(run)));
            if para.alignment == DocAlignment::Center {
                p = p.align(AlignmentType::Center);
            }
            with_space_before(p, para.space_before)
        }
        DocBlock::Image(image) => {
            let pic = Pic::new_with_dimensions(image.png.clone(), image.width_px, image.height_px)
                .size(emu(image.width), emu(image.height));
            let p = Paragraph::new()
                .add_run(Run::new().add_image(pic))
                .align(AlignmentType::Center);
            with_space_before(p, image.space_before)
        }
        DocBlock::PageBreak => Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
        DocBlock::Table(_) => Paragraph::new(),
    }
}

fn build_cell(cell: &DocCell, width: f32) -> TableCell {
    let mut tc = TableCell::new().width(twips(width).max(0) as usize, WidthType::Dxa);
    if cell.col_span > 1 {
        tc = tc.grid_span(cell.col_span);
    }
    if cell.blocks.is_empty() {
        // Word requires at least one paragraph per cell.
        return tc.add_paragraph(Paragraph::new());
    }
    for block in &cell.blocks {
        tc = match block {
            DocBlock::Table(table) => tc.add_table(build_table(table)),
            other => tc.add_paragraph(build_paragraph(other)),
        };
    }
    if matches!(cell.blocks.last(), Some(DocBlock::Table(_))) {
        tc = tc.add_paragraph(Paragraph::new());
    }
    tc
}

fn build_table(table: &DocTable) -> Table {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut col = 0;
            let cells = row
                .iter()
                .map(|cell| {
                    let span = cell.col_span.max(1);
                    let width: f32 = table.column_widths.iter().skip(col).take(span).sum();
                    col += span;
                    build_cell(cell, width)
                })
                .collect();
            TableRow::new(cells)
        })
        .collect();

    let grid = table
        .column_widths
        .iter()
        .map(|w| twips(*w).max(0) as usize)
        .collect();
    let mut t = Table::new(rows).set_grid(grid);
    if !table.bordered {
        t = t.clear_all_border();
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn document_xml(bytes: Vec<u8>) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_units() {
        assert_eq!(twips(36.0), 720);
        assert_eq!(emu(72.0), 914_400);
        assert_eq!(emu(-1.0), 0);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut writer = DocxWriter::new(612.0, 792.0, 36.0);
        for text in ["alpha-block", "bravo-block", "charlie-block"] {
            writer
                .append(DocBlock::Paragraph(DocParagraph {
                    runs: vec![DocRun::plain(text)],
                    ..Default::default()
                }))
                .unwrap();
        }
        assert_eq!(writer.len(), 3);

        let xml = document_xml(writer.commit_to_bytes().unwrap());
        let first = xml.find("alpha-block").unwrap();
        let second = xml.find("bravo-block").unwrap();
        let third = xml.find("charlie-block").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_styled_run_and_tables() {
        let mut writer = DocxWriter::new(612.0, 792.0, 36.0);
        let mut run = DocRun::plain("Heading");
        run.bold = true;
        run.color = Some("FF0000".to_string());
        writer
            .append(DocBlock::Paragraph(DocParagraph {
                runs: vec![run],
                space_before: Some(12.0),
                ..Default::default()
            }))
            .unwrap();
        writer
            .append(DocBlock::Table(DocTable {
                column_widths: vec![100.0, 100.0],
                rows: vec![vec![
                    DocCell {
                        blocks: vec![DocBlock::Paragraph(DocParagraph {
                            runs: vec![DocRun::plain("left cell")],
                            ..Default::default()
                        })],
                        col_span: 1,
                    },
                    DocCell::default(),
                ]],
                bordered: false,
            }))
            .unwrap();

        let xml = document_xml(writer.commit_to_bytes().unwrap());
        assert!(xml.contains("Heading"));
        assert!(xml.contains("FF0000"));
        assert!(xml.contains("w:tbl"));
        assert!(xml.contains("left cell"));
    }

    #[test]
    fn test_commit_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.docx");
        let mut writer = DocxWriter::new(612.0, 792.0, 36.0);
        writer.append(DocBlock::PageBreak).unwrap();
        writer.commit(&path).unwrap();
        assert!(path.exists());
    }
}
