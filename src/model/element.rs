//! Ordered page elements produced by the unifier.

use serde::{Deserialize, Serialize};

use super::geometry::BoundingBox;
use super::primitives::{ImageRegion, TableRegion, TextLine, TextStyle};

/// Horizontal extent of one column, in page points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub x_start: f32,
    pub x_end: f32,
}

impl ColumnRange {
    pub fn new(x_start: f32, x_end: f32) -> Self {
        Self { x_start, x_end }
    }

    pub fn width(&self) -> f32 {
        self.x_end - self.x_start
    }

    pub fn center(&self) -> f32 {
        (self.x_start + self.x_end) / 2.0
    }

    pub fn contains(&self, x: f32) -> bool {
        x >= self.x_start && x <= self.x_end
    }

    /// Distance from `x` to the nearest edge, zero when inside.
    pub fn distance_to(&self, x: f32) -> f32 {
        if x < self.x_start {
            self.x_start - x
        } else if x > self.x_end {
            x - self.x_end
        } else {
            0.0
        }
    }
}

/// Column layout of a page: ordered, non-overlapping ranges, never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBoundary {
    ranges: Vec<ColumnRange>,
}

impl ColumnBoundary {
    /// Build from ranges. Ranges are sorted left to right; an empty input
    /// collapses to one zero-width column at the origin so the layout is
    /// never columnless.
    pub fn new(mut ranges: Vec<ColumnRange>) -> Self {
        ranges.retain(|r| r.x_start.is_finite() && r.x_end.is_finite());
        ranges.sort_by(|a, b| {
            a.x_start
                .partial_cmp(&b.x_start)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if ranges.is_empty() {
            ranges.push(ColumnRange::new(0.0, 0.0));
        }
        Self { ranges }
    }

    pub fn single(x_start: f32, x_end: f32) -> Self {
        Self::new(vec![ColumnRange::new(x_start, x_end)])
    }

    pub fn count(&self) -> usize {
        self.ranges.len()
    }

    pub fn ranges(&self) -> &[ColumnRange] {
        &self.ranges
    }

    pub fn is_multi_column(&self) -> bool {
        self.ranges.len() > 1
    }
}

/// Which column an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnAssignment {
    /// Crosses column boundaries; acts as a hard break in reading order.
    Spanning,
    /// 0-based column, left to right.
    Column(usize),
}

impl ColumnAssignment {
    /// Numeric form: column index, or -1 for full-width elements.
    pub fn index(&self) -> i32 {
        match self {
            ColumnAssignment::Spanning => -1,
            ColumnAssignment::Column(c) => *c as i32,
        }
    }

    pub fn is_spanning(&self) -> bool {
        matches!(self, ColumnAssignment::Spanning)
    }
}

/// A run of text with one style inside a paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledRun {
    pub text: String,
    pub style: TextStyle,
}

impl StyledRun {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// A paragraph assembled from one or more text lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<StyledRun>,
    /// Number of source lines merged into this paragraph.
    pub line_count: usize,
}

impl Paragraph {
    pub fn from_line(line: &TextLine) -> Self {
        Self {
            runs: vec![StyledRun::new(line.text.clone(), line.style.clone())],
            line_count: 1,
        }
    }

    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }

    /// Style of the first non-empty run; governs merge decisions.
    pub fn leading_style(&self) -> Option<&TextStyle> {
        self.runs
            .iter()
            .find(|r| !r.text.trim().is_empty())
            .or_else(|| self.runs.first())
            .map(|r| &r.style)
    }

    /// Style of the last run; the next line continues from here.
    pub fn trailing_style(&self) -> Option<&TextStyle> {
        self.runs.last().map(|r| &r.style)
    }

    /// Append text, extending the last run when the style matches.
    pub fn push_text(&mut self, text: &str, style: &TextStyle) {
        match self.runs.last_mut() {
            Some(last) if last.style.same_appearance(style) => last.text.push_str(text),
            _ => self.runs.push(StyledRun::new(text, style.clone())),
        }
    }
}

/// Element payload; rendering and ordering match on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementPayload {
    Paragraph(Paragraph),
    Image(ImageRegion),
    Table(TableRegion),
}

/// Coarse element kind, shared with layout hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
    Table,
}

impl ElementPayload {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementPayload::Paragraph(_) => ElementKind::Text,
            ElementPayload::Image(_) => ElementKind::Image,
            ElementPayload::Table(_) => ElementKind::Table,
        }
    }
}

/// One positioned element in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageElement {
    pub payload: ElementPayload,
    pub bbox: BoundingBox,
    pub column: ColumnAssignment,
    pub page: usize,
    /// Vertical whitespace above this element, in points. `None` for the
    /// first element of a column or page.
    pub gap_before: Option<f32>,
}

impl PageElement {
    pub fn new(payload: ElementPayload, bbox: BoundingBox, column: ColumnAssignment, page: usize) -> Self {
        Self {
            payload,
            bbox,
            column,
            page,
            gap_before: None,
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.payload.kind()
    }

    /// `(page_index, column_index, y0, x0)`.
    pub fn sort_key(&self) -> (usize, i32, f32, f32) {
        (self.page, self.column.index(), self.bbox.y0, self.bbox.x0)
    }

    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match &self.payload {
            ElementPayload::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    /// Text carried by the element, for validation and debugging.
    pub fn plain_text(&self) -> String {
        match &self.payload {
            ElementPayload::Paragraph(p) => p.plain_text(),
            ElementPayload::Table(t) => t.plain_text(),
            ElementPayload::Image(_) => String::new(),
        }
    }
}

/// A contiguous stretch of a unified page for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    /// A single full-width element.
    FullWidth(&'a PageElement),
    /// Column content between two breaks, one vector per column.
    Columns(Vec<Vec<&'a PageElement>>),
}

/// The ordered element sequence of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedPage {
    pub page_index: usize,
    pub width: f32,
    pub height: f32,
    pub columns: ColumnBoundary,
    pub elements: Vec<PageElement>,
}

impl UnifiedPage {
    pub fn empty(page_index: usize, width: f32, height: f32) -> Self {
        Self {
            page_index,
            width,
            height,
            columns: ColumnBoundary::single(0.0, width),
            elements: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Split the element sequence at full-width breaks.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let column_count = self.columns.count();
        let mut segments = Vec::new();
        let mut pending: Option<Vec<Vec<&PageElement>>> = None;

        for element in &self.elements {
            match element.column {
                ColumnAssignment::Spanning => {
                    if let Some(cols) = pending.take() {
                        segments.push(Segment::Columns(cols));
                    }
                    segments.push(Segment::FullWidth(element));
                }
                ColumnAssignment::Column(c) => {
                    let cols = pending.get_or_insert_with(|| vec![Vec::new(); column_count]);
                    let slot = c.min(column_count.saturating_sub(1));
                    cols[slot].push(element);
                }
            }
        }
        if let Some(cols) = pending {
            segments.push(Segment::Columns(cols));
        }
        segments
    }

    pub fn count_kind(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind() == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_element(text: &str, bbox: BoundingBox, column: ColumnAssignment) -> PageElement {
        let line = TextLine::new(text, bbox, TextStyle::default(), 0);
        PageElement::new(
            ElementPayload::Paragraph(Paragraph::from_line(&line)),
            bbox,
            column,
            0,
        )
    }

    #[test]
    fn test_column_boundary_never_empty() {
        let b = ColumnBoundary::new(vec![]);
        assert_eq!(b.count(), 1);

        let b = ColumnBoundary::new(vec![
            ColumnRange::new(300.0, 550.0),
            ColumnRange::new(0.0, 250.0),
        ]);
        assert_eq!(b.ranges()[0].x_start, 0.0);
        assert!(b.is_multi_column());
    }

    #[test]
    fn test_assignment_index() {
        assert_eq!(ColumnAssignment::Spanning.index(), -1);
        assert_eq!(ColumnAssignment::Column(2).index(), 2);
    }

    #[test]
    fn test_paragraph_push_text_coalesces() {
        let style = TextStyle::default();
        let bold = TextStyle {
            bold: true,
            ..TextStyle::default()
        };
        let mut p = Paragraph::default();
        p.push_text("a", &style);
        p.push_text(" b", &style);
        p.push_text(" C", &bold);
        assert_eq!(p.runs.len(), 2);
        assert_eq!(p.plain_text(), "a b C");
    }

    #[test]
    fn test_segments_split_at_breaks() {
        let page = UnifiedPage {
            page_index: 0,
            width: 600.0,
            height: 800.0,
            columns: ColumnBoundary::new(vec![
                ColumnRange::new(0.0, 250.0),
                ColumnRange::new(300.0, 550.0),
            ]),
            elements: vec![
                text_element("title", BoundingBox::new(0.0, 0.0, 550.0, 20.0), ColumnAssignment::Spanning),
                text_element("l1", BoundingBox::new(0.0, 30.0, 250.0, 40.0), ColumnAssignment::Column(0)),
                text_element("r1", BoundingBox::new(300.0, 30.0, 550.0, 40.0), ColumnAssignment::Column(1)),
                text_element("foot", BoundingBox::new(0.0, 700.0, 550.0, 720.0), ColumnAssignment::Spanning),
            ],
        };

        let segments = page.segments();
        assert_eq!(segments.len(), 3);
        assert!(matches!(segments[0], Segment::FullWidth(_)));
        match &segments[1] {
            Segment::Columns(cols) => {
                assert_eq!(cols.len(), 2);
                assert_eq!(cols[0][0].plain_text(), "l1");
                assert_eq!(cols[1][0].plain_text(), "r1");
            }
            other => panic!("unexpected segment {:?}", other),
        }
        assert!(matches!(segments[2], Segment::FullWidth(_)));
    }
}
