//! Turns unified pages into DOCX blocks.

use super::images::{decode_region, encode_png};
use super::writer::{DocBlock, DocCell, DocImage, DocParagraph, DocRun, DocTable};
use super::{RenderOptions, RenderStats};
use crate::error::Result;
use crate::model::{
    ElementPayload, ImageRegion, PageElement, Paragraph, Segment, TableRegion, TextStyle, UnifiedPage,
};

/// Size of data-table cell text, in points.
const TABLE_FONT_SIZE: f32 = 10.0;
const PLACEHOLDER_COLOR: &str = "808080";

/// Rendered blocks of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub page_index: usize,
    pub blocks: Vec<DocBlock>,
    pub stats: RenderStats,
}

/// Where an element is drawn, which bounds image sizes.
#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Width available to the element, in points.
    width: f32,
    /// Width of the source region the frame stands for.
    source_width: f32,
    in_cell: bool,
}

/// Maps PDF font names onto the closest family Word ships with.
pub fn map_font(family: &str) -> String {
    let lower = family.to_ascii_lowercase();
    let known = [
        ("times", "Times New Roman"),
        ("arial", "Arial"),
        ("helvetica", "Arial"),
        ("courier", "Courier New"),
        ("symbol", "Symbol"),
        ("zapfdingbats", "Wingdings"),
        ("calibri", "Calibri"),
        ("cambria", "Cambria"),
        ("georgia", "Georgia"),
        ("verdana", "Verdana"),
        ("garamond", "Garamond"),
    ];
    if let Some((_, mapped)) = known.iter().find(|(key, _)| lower.contains(key)) {
        return mapped.to_string();
    }

    let cleaned = family
        .trim_end_matches("MT")
        .trim_end_matches("PS")
        .trim();
    if cleaned.is_empty() {
        "Arial".to_string()
    } else {
        cleaned.to_string()
    }
}

/// DOCX renderer.
#[derive(Debug, Clone, Default)]
pub struct DocxRenderer {
    options: RenderOptions,
}

impl DocxRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render one page into blocks for a body `content_width` points wide.
    ///
    /// Element-level failures (undecodable images) become placeholders and
    /// never fail the page.
    pub fn render_page(&self, page: &UnifiedPage, content_width: f32) -> RenderedPage {
        let mut stats = RenderStats {
            page_count: 1,
            ..Default::default()
        };
        let body = Frame {
            width: content_width,
            source_width: page.width,
            in_cell: false,
        };

        let mut blocks = Vec::new();
        for segment in page.segments() {
            match segment {
                Segment::FullWidth(element) => blocks.push(self.element_block(element, body, &mut stats)),
                Segment::Columns(columns) if columns.len() > 1 => {
                    blocks.push(self.layout_table(page, &columns, content_width, &mut stats));
                }
                Segment::Columns(columns) => {
                    for element in columns.into_iter().flatten() {
                        blocks.push(self.element_block(element, body, &mut stats));
                    }
                }
            }
        }

        RenderedPage {
            page_index: page.page_index,
            blocks,
            stats,
        }
    }

    /// Borderless table with one cell per content column.
    fn layout_table(
        &self,
        page: &UnifiedPage,
        columns: &[Vec<&PageElement>],
        content_width: f32,
        stats: &mut RenderStats,
    ) -> DocBlock {
        let ranges = page.columns.ranges();
        let total: f32 = ranges.iter().map(|r| r.width().max(0.0)).sum();
        let widths: Vec<f32> = if total > 0.0 && ranges.len() == columns.len() {
            ranges
                .iter()
                .map(|r| r.width().max(0.0) / total * content_width)
                .collect()
        } else {
            vec![content_width / columns.len() as f32; columns.len()]
        };

        let cells = columns
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (elements, width))| {
                let frame = Frame {
                    width: *width,
                    source_width: ranges.get(i).map(|r| r.width()).unwrap_or(page.width),
                    in_cell: true,
                };
                DocCell {
                    blocks: elements
                        .iter()
                        .map(|e| self.element_block(e, frame, stats))
                        .collect(),
                    col_span: 1,
                }
            })
            .collect();

        stats.layout_table_count += 1;
        DocBlock::Table(DocTable {
            column_widths: widths,
            rows: vec![cells],
            bordered: false,
        })
    }

    fn element_block(&self, element: &PageElement, frame: Frame, stats: &mut RenderStats) -> DocBlock {
        let space_before = self.options.space_before(element.gap_before);
        match &element.payload {
            ElementPayload::Paragraph(paragraph) => {
                stats.paragraph_count += 1;
                stats.text_elements += paragraph.line_count as u32;
                stats.count_text(&paragraph.plain_text());
                DocBlock::Paragraph(self.paragraph(paragraph, space_before))
            }
            ElementPayload::Image(region) => match self.image(region, frame, space_before) {
                Ok(image) => {
                    stats.image_count += 1;
                    DocBlock::Image(image)
                }
                Err(e) => {
                    log::warn!("Page {}: image replaced by placeholder: {}", region.page, e);
                    stats.images_skipped += 1;
                    DocBlock::Paragraph(self.placeholder(space_before))
                }
            },
            ElementPayload::Table(table) => {
                stats.table_count += 1;
                stats.count_text(&table.plain_text());
                DocBlock::Table(self.data_table(table, frame))
            }
        }
    }

    fn run(&self, text: &str, style: &TextStyle) -> DocRun {
        DocRun {
            text: text.to_string(),
            font: map_font(&style.font_family),
            size: self.options.clamp_font_size(style.size),
            bold: style.bold,
            italic: style.italic,
            underline: style.underline,
            color: (!style.color.is_black()).then(|| style.color.to_hex()),
        }
    }

    fn paragraph(&self, paragraph: &Paragraph, space_before: Option<f32>) -> DocParagraph {
        DocParagraph {
            runs: paragraph
                .runs
                .iter()
                .map(|r| self.run(&r.text, &r.style))
                .collect(),
            space_before,
            ..Default::default()
        }
    }

    fn placeholder(&self, space_before: Option<f32>) -> DocParagraph {
        let mut run = DocRun::plain(self.options.image_placeholder.as_str());
        run.italic = true;
        run.size = self.options.clamp_font_size(9.0);
        run.color = Some(PLACEHOLDER_COLOR.to_string());
        DocParagraph {
            runs: vec![run],
            space_before,
            ..Default::default()
        }
    }

    /// Decode, scale to the frame and re-encode as PNG.
    fn image(&self, region: &ImageRegion, frame: Frame, space_before: Option<f32>) -> Result<DocImage> {
        let pixels = decode_region(region)?;
        let (width_px, height_px) = (pixels.width(), pixels.height());
        let png = encode_png(&pixels)?;

        let (min, max) = if frame.in_cell {
            (self.options.min_cell_image_width, self.options.max_cell_image_width)
        } else {
            (self.options.min_image_width, self.options.max_image_width)
        };
        let max = max.min(frame.width).max(1.0);
        let min = min.min(max);

        let share = if frame.source_width > 0.0 {
            region.bbox.width() / frame.source_width
        } else {
            1.0
        };
        let width = (share * frame.width).clamp(min, max);
        let height = width * height_px as f32 / width_px.max(1) as f32;

        Ok(DocImage {
            png,
            width_px,
            height_px,
            width,
            height,
            space_before,
        })
    }

    /// Native bordered table sized to the region's share of the frame.
    fn data_table(&self, table: &TableRegion, frame: Frame) -> DocTable {
        let cols = table.column_count().max(1);
        let share = if frame.source_width > 0.0 {
            (table.bbox.width() / frame.source_width).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let total = (share * frame.width).max(cols as f32 * 36.0).min(frame.width);
        let column_widths = vec![total / cols as f32; cols];

        let rows = (0..table.row_count())
            .map(|r| {
                let mut row = Vec::new();
                let mut c = 0;
                while c < cols {
                    match table.cells.iter().find(|cell| cell.row == r && cell.col == c) {
                        Some(cell) => {
                            let span = cell.col_span.clamp(1, cols - c);
                            let mut run = DocRun::plain(cell.text.trim());
                            run.size = TABLE_FONT_SIZE;
                            row.push(DocCell {
                                blocks: vec![DocBlock::Paragraph(DocParagraph {
                                    runs: vec![run],
                                    ..Default::default()
                                })],
                                col_span: span,
                            });
                            c += span;
                        }
                        None => {
                            row.push(DocCell {
                                blocks: Vec::new(),
                                col_span: 1,
                            });
                            c += 1;
                        }
                    }
                }
                row
            })
            .collect();

        DocTable {
            column_widths,
            rows,
            bordered: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BoundingBox, ColumnAssignment, ColumnBoundary, ColumnRange, ImageFormat, Rgb, TableCell, TextLine,
    };

    fn text(content: &str, bbox: BoundingBox, column: ColumnAssignment) -> PageElement {
        let line = TextLine::new(content, bbox, TextStyle::default(), 0);
        PageElement::new(ElementPayload::Paragraph(Paragraph::from_line(&line)), bbox, column, 0)
    }

    fn two_column_page(elements: Vec<PageElement>) -> UnifiedPage {
        UnifiedPage {
            page_index: 0,
            width: 600.0,
            height: 800.0,
            columns: ColumnBoundary::new(vec![ColumnRange::new(50.0, 250.0), ColumnRange::new(300.0, 550.0)]),
            elements,
        }
    }

    #[test]
    fn test_map_font() {
        assert_eq!(map_font("TimesNewRomanPSMT"), "Times New Roman");
        assert_eq!(map_font("Helvetica"), "Arial");
        assert_eq!(map_font("ArialMT"), "Arial");
        assert_eq!(map_font("Courier"), "Courier New");
        assert_eq!(map_font("MinionPro"), "MinionPro");
        assert_eq!(map_font(""), "Arial");
    }

    #[test]
    fn test_columns_become_layout_table() {
        let page = two_column_page(vec![
            text("Title", BoundingBox::new(50.0, 0.0, 550.0, 20.0), ColumnAssignment::Spanning),
            text("Left", BoundingBox::new(50.0, 30.0, 250.0, 40.0), ColumnAssignment::Column(0)),
            text("Right", BoundingBox::new(300.0, 30.0, 550.0, 40.0), ColumnAssignment::Column(1)),
            text("Footer", BoundingBox::new(50.0, 700.0, 550.0, 720.0), ColumnAssignment::Spanning),
        ]);
        let rendered = DocxRenderer::default().render_page(&page, 540.0);

        assert_eq!(rendered.blocks.len(), 3);
        let DocBlock::Table(table) = &rendered.blocks[1] else {
            panic!("expected layout table, got {:?}", rendered.blocks[1]);
        };
        assert!(!table.bordered);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].len(), 2);
        // Widths follow the 200:250 column ratio
        assert!((table.column_widths[0] - 240.0).abs() < 1e-3);
        assert!((table.column_widths[1] - 300.0).abs() < 1e-3);
        assert_eq!(rendered.stats.layout_table_count, 1);
        assert_eq!(rendered.stats.paragraph_count, 4);
    }

    #[test]
    fn test_single_column_renders_inline() {
        let mut page = UnifiedPage::empty(0, 600.0, 800.0);
        let mut second = text("Second", BoundingBox::new(50.0, 60.0, 300.0, 72.0), ColumnAssignment::Column(0));
        second.gap_before = Some(40.0);
        page.elements = vec![
            text("First", BoundingBox::new(50.0, 0.0, 300.0, 12.0), ColumnAssignment::Column(0)),
            second,
        ];
        let rendered = DocxRenderer::default().render_page(&page, 540.0);
        assert_eq!(rendered.blocks.len(), 2);
        let DocBlock::Paragraph(p) = &rendered.blocks[1] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.space_before, Some(24.0));
        assert_eq!(p.text(), "Second");
    }

    #[test]
    fn test_run_styles() {
        let renderer = DocxRenderer::default();
        let style = TextStyle {
            font_family: "Times-Bold".to_string(),
            size: 60.0,
            bold: true,
            color: Rgb(200, 0, 0),
            ..TextStyle::default()
        };
        let run = renderer.run("Big", &style);
        assert_eq!(run.font, "Times New Roman");
        assert_eq!(run.size, 36.0);
        assert!(run.bold);
        assert_eq!(run.color.as_deref(), Some("C80000"));
        assert_eq!(renderer.run("x", &TextStyle::default()).color, None);
    }

    #[test]
    fn test_corrupt_image_becomes_placeholder() {
        let mut page = UnifiedPage::empty(0, 600.0, 800.0);
        let bbox = BoundingBox::new(100.0, 100.0, 300.0, 200.0);
        let region = ImageRegion {
            data: vec![1, 2, 3],
            format: ImageFormat::Jpeg,
            bbox,
            page: 0,
        };
        page.elements = vec![PageElement::new(ElementPayload::Image(region), bbox, ColumnAssignment::Column(0), 0)];
        let rendered = DocxRenderer::default().render_page(&page, 540.0);
        assert_eq!(rendered.stats.images_skipped, 1);
        let DocBlock::Paragraph(p) = &rendered.blocks[0] else {
            panic!("expected placeholder");
        };
        assert_eq!(p.text(), "[Image could not be rendered]");
    }

    #[test]
    fn test_image_keeps_aspect_ratio() {
        let mut page = UnifiedPage::empty(0, 600.0, 800.0);
        let bbox = BoundingBox::new(0.0, 0.0, 600.0, 300.0);
        let region = ImageRegion {
            data: vec![255; 4 * 2 * 3],
            format: ImageFormat::Raw { width: 4, height: 2, components: 3 },
            bbox,
            page: 0,
        };
        page.elements = vec![PageElement::new(ElementPayload::Image(region), bbox, ColumnAssignment::Column(0), 0)];
        let rendered = DocxRenderer::default().render_page(&page, 540.0);
        let DocBlock::Image(image) = &rendered.blocks[0] else {
            panic!("expected image");
        };
        // Capped at 6.5in, height follows the 2:1 pixels
        assert_eq!(image.width, 468.0);
        assert_eq!(image.height, 234.0);
        assert_eq!((image.width_px, image.height_px), (4, 2));
    }

    #[test]
    fn test_data_table_grid() {
        let bbox = BoundingBox::new(100.0, 100.0, 400.0, 200.0);
        let mut spanning = TableCell::new(1, 0, "Total");
        spanning.col_span = 2;
        let table = TableRegion::new(
            bbox,
            vec![TableCell::new(0, 0, "Name"), TableCell::new(0, 1, "Score"), spanning],
            0,
        );
        let mut page = UnifiedPage::empty(0, 600.0, 800.0);
        page.elements = vec![PageElement::new(ElementPayload::Table(table), bbox, ColumnAssignment::Column(0), 0)];
        let rendered = DocxRenderer::default().render_page(&page, 540.0);
        let DocBlock::Table(t) = &rendered.blocks[0] else {
            panic!("expected table");
        };
        assert!(t.bordered);
        assert_eq!(t.column_widths, vec![135.0, 135.0]);
        assert_eq!(t.rows[0].len(), 2);
        assert_eq!(t.rows[1].len(), 1);
        assert_eq!(t.rows[1][0].col_span, 2);
    }
}
