//! Paragraph grouping.
//!
//! Adjacent text elements in the same column run are merged into one
//! paragraph when they sit close together and share a font. Emphasis
//! changes inside a paragraph survive as separate runs. Grouping never
//! reorders elements.

use super::config::LayoutConfig;
use crate::model::{BoundingBox, ElementPayload, PageElement, Paragraph, TextStyle, UnifiedPage};

/// Merges line elements into paragraphs.
#[derive(Debug, Clone, Default)]
pub struct ParagraphGrouper {
    config: LayoutConfig,
}

impl ParagraphGrouper {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Group the text elements of a unified page.
    pub fn group(&self, mut page: UnifiedPage) -> UnifiedPage {
        let elements = std::mem::take(&mut page.elements);
        let mut grouped: Vec<PageElement> = Vec::with_capacity(elements.len());
        // Box of the last line merged into the tail paragraph.
        let mut last_line: Option<BoundingBox> = None;

        for element in elements {
            let merged = match (grouped.last_mut(), last_line) {
                (Some(prev), Some(prev_line)) => self.try_merge(prev, prev_line, &element),
                _ => false,
            };
            if merged {
                last_line = Some(element.bbox);
                continue;
            }
            last_line = match element.payload {
                ElementPayload::Paragraph(_) => Some(element.bbox),
                _ => None,
            };
            grouped.push(element);
        }

        page.elements = grouped;
        page
    }

    /// Merge `next` into `prev` when they continue the same paragraph.
    fn try_merge(&self, prev: &mut PageElement, prev_line: BoundingBox, next: &PageElement) -> bool {
        if prev.column != next.column {
            return false;
        }
        let next_paragraph = match &next.payload {
            ElementPayload::Paragraph(p) => p,
            _ => return false,
        };
        let prev_paragraph = match &mut prev.payload {
            ElementPayload::Paragraph(p) => p,
            _ => return false,
        };

        let (prev_style, next_style) = match (prev_paragraph.trailing_style(), next_paragraph.leading_style()) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };
        if !self.styles_continue(prev_style, next_style) {
            return false;
        }

        let line_height = prev_line.height().max(next.bbox.height());
        let gap = next.bbox.y0 - prev_line.y1;
        if gap > self.config.line_gap_ratio * line_height {
            return false;
        }

        append_paragraph(prev_paragraph, next_paragraph);
        prev.bbox = prev.bbox.union(&next.bbox);
        true
    }

    fn styles_continue(&self, a: &TextStyle, b: &TextStyle) -> bool {
        if a.font_family != b.font_family {
            return false;
        }
        let (small, large) = if a.size <= b.size { (a.size, b.size) } else { (b.size, a.size) };
        small > 0.0 && large / small <= self.config.font_jump_ratio && large - small <= self.config.size_tolerance
    }
}

/// Join two paragraphs with a single space, keeping style runs.
fn append_paragraph(target: &mut Paragraph, next: &Paragraph) {
    let ends_with_space = target
        .runs
        .last()
        .map(|r| r.text.ends_with(char::is_whitespace))
        .unwrap_or(true);
    let mut first = true;
    for run in &next.runs {
        if first && !ends_with_space && !run.text.starts_with(char::is_whitespace) {
            target.push_text(" ", &run.style);
        }
        first = false;
        target.push_text(&run.text, &run.style);
    }
    target.line_count += next.line_count;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnAssignment, ColumnBoundary, TextLine};

    fn text(s: &str, y0: f32, style: TextStyle) -> PageElement {
        let bbox = BoundingBox::new(72.0, y0, 400.0, y0 + style.size);
        let line = TextLine::new(s, bbox, style, 0);
        PageElement::new(
            ElementPayload::Paragraph(Paragraph::from_line(&line)),
            bbox,
            ColumnAssignment::Column(0),
            0,
        )
    }

    fn page(elements: Vec<PageElement>) -> UnifiedPage {
        UnifiedPage {
            page_index: 0,
            width: 612.0,
            height: 792.0,
            columns: ColumnBoundary::single(72.0, 400.0),
            elements,
        }
    }

    fn body() -> TextStyle {
        TextStyle::default()
    }

    #[test]
    fn test_close_lines_merge() {
        let grouped = ParagraphGrouper::default().group(page(vec![
            text("first line", 100.0, body()),
            text("second line", 115.0, body()),
        ]));
        assert_eq!(grouped.elements.len(), 1);
        let p = grouped.elements[0].as_paragraph().unwrap();
        assert_eq!(p.plain_text(), "first line second line");
        assert_eq!(p.line_count, 2);
        assert_eq!(grouped.elements[0].bbox, BoundingBox::new(72.0, 100.0, 400.0, 127.0));
    }

    #[test]
    fn test_distant_lines_split() {
        let grouped = ParagraphGrouper::default().group(page(vec![
            text("first", 100.0, body()),
            text("second", 130.0, body()),
        ]));
        assert_eq!(grouped.elements.len(), 2);
    }

    #[test]
    fn test_font_jump_splits() {
        let heading = TextStyle { size: 18.0, bold: true, ..body() };
        let grouped = ParagraphGrouper::default().group(page(vec![
            text("Heading", 100.0, heading),
            text("body text", 120.0, body()),
        ]));
        assert_eq!(grouped.elements.len(), 2);
    }

    #[test]
    fn test_size_change_below_jump_splits() {
        let small = TextStyle { size: 10.0, ..body() };
        let larger = TextStyle { size: 12.5, ..body() };
        let grouped = ParagraphGrouper::default().group(page(vec![
            text("caption", 100.0, small),
            text("body text", 113.0, larger),
        ]));
        assert_eq!(grouped.elements.len(), 2);

        let near = TextStyle { size: 12.3, ..body() };
        let grouped = ParagraphGrouper::default().group(page(vec![
            text("one", 100.0, body()),
            text("two", 115.0, near),
        ]));
        assert_eq!(grouped.elements.len(), 1);
    }

    #[test]
    fn test_family_change_splits() {
        let mono = TextStyle { font_family: "Courier".to_string(), ..body() };
        let grouped = ParagraphGrouper::default().group(page(vec![
            text("prose", 100.0, body()),
            text("code", 114.0, mono),
        ]));
        assert_eq!(grouped.elements.len(), 2);
    }

    #[test]
    fn test_emphasis_kept_as_runs() {
        let bold = TextStyle { bold: true, ..body() };
        let grouped = ParagraphGrouper::default().group(page(vec![
            text("plain", 100.0, body()),
            text("strong", 114.0, bold),
            text("plain again", 128.0, body()),
        ]));
        assert_eq!(grouped.elements.len(), 1);
        let p = grouped.elements[0].as_paragraph().unwrap();
        assert_eq!(p.plain_text(), "plain strong plain again");
        assert!(p.runs.iter().any(|r| r.style.bold && r.text.contains("strong")));
        assert!(p.runs.len() >= 3);
    }

    #[test]
    fn test_columns_never_merge() {
        let mut right = text("right", 114.0, body());
        right.column = ColumnAssignment::Column(1);
        let grouped = ParagraphGrouper::default().group(page(vec![text("left", 100.0, body()), right]));
        assert_eq!(grouped.elements.len(), 2);
    }
}
