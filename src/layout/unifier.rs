//! Element unification: one ordered element sequence per page.
//!
//! The unifier owns reading order. It carves table text out of the line
//! stream, assigns every element to a column (or marks it full-width),
//! orders column content top to bottom, and emits columns left to right
//! between full-width breaks. Layout hints only break ties between
//! elements whose tops are within `y_epsilon` of each other.

use std::cmp::Ordering;

use super::config::LayoutConfig;
use crate::model::{
    BoundingBox, ColumnAssignment, ColumnBoundary, ElementPayload, LayoutHint, PageElement,
    PagePrimitives, Paragraph, UnifiedPage,
};

/// Merges a page's primitives into reading order.
#[derive(Debug, Clone, Default)]
pub struct ElementUnifier {
    config: LayoutConfig,
}

/// An element under construction, with its optional hint rank.
#[derive(Debug, Clone)]
struct Candidate {
    element: PageElement,
    hint_rank: Option<usize>,
}

impl ElementUnifier {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Build the ordered element sequence for one page.
    ///
    /// Never fails: degenerate geometry is skipped with a warning, and a page
    /// with nothing left yields an empty [`UnifiedPage`].
    pub fn unify(
        &self,
        page: &PagePrimitives,
        columns: &ColumnBoundary,
        hint: Option<&LayoutHint>,
    ) -> UnifiedPage {
        let mut unified = UnifiedPage {
            page_index: page.page_index,
            width: page.width,
            height: page.height,
            columns: columns.clone(),
            elements: Vec::new(),
        };

        if let Some(hint) = hint {
            if hint.column_count != 0 && hint.column_count != columns.count() {
                log::info!(
                    "Page {}: hint suggests {} column(s), heuristic found {}; keeping heuristic",
                    page.page_index,
                    hint.column_count,
                    columns.count()
                );
            }
        }

        let mut candidates = self.collect(page);
        if candidates.is_empty() {
            return unified;
        }

        for candidate in &mut candidates {
            candidate.element.column = self.assign_column(&candidate.element.bbox, columns, page.height);
            candidate.hint_rank = hint.and_then(|h| hint_rank(h, &candidate.element));
        }

        let ordered = self.sequence(candidates, columns.count());
        unified.elements = record_gaps(ordered);
        unified
    }

    /// Turn primitives into unassigned elements, applying the table carve-out.
    fn collect(&self, page: &PagePrimitives) -> Vec<Candidate> {
        let mut tables = Vec::new();
        for table in &page.tables {
            if table.bbox.is_degenerate() {
                log::warn!("Page {}: skipping table with zero-area bbox {:?}", page.page_index, table.bbox);
                continue;
            }
            if table.is_degenerate() {
                // Its lines stay in the text stream.
                log::warn!("Page {}: skipping table with an empty grid", page.page_index);
                continue;
            }
            tables.push(table);
        }

        let mut candidates = Vec::with_capacity(page.lines.len() + page.images.len() + tables.len());

        for line in &page.lines {
            if line.bbox.is_degenerate() {
                log::warn!(
                    "Page {}: skipping text line with zero-area bbox {:?}",
                    page.page_index,
                    line.bbox
                );
                continue;
            }
            if line.text.trim().is_empty() {
                continue;
            }
            let carved = tables
                .iter()
                .any(|t| line.bbox.containment_in(&t.bbox) >= self.config.containment_ratio);
            if carved {
                continue;
            }
            candidates.push(candidate(
                ElementPayload::Paragraph(Paragraph::from_line(line)),
                line.bbox,
                page.page_index,
            ));
        }

        for image in &page.images {
            if image.bbox.is_degenerate() {
                log::warn!(
                    "Page {}: skipping image with zero-area bbox {:?}",
                    page.page_index,
                    image.bbox
                );
                continue;
            }
            candidates.push(candidate(
                ElementPayload::Image(image.clone()),
                image.bbox,
                page.page_index,
            ));
        }

        for table in tables {
            candidates.push(candidate(
                ElementPayload::Table(table.clone()),
                table.bbox,
                page.page_index,
            ));
        }

        candidates
    }

    /// Assign a box to its home column, or mark it full-width.
    ///
    /// The home column is the range containing the box's horizontal center
    /// (the nearest range when the center falls in a gutter). A box that
    /// crosses into another range and keeps less than `span_fraction` of its
    /// width at home is full-width.
    pub fn assign_column(&self, bbox: &BoundingBox, columns: &ColumnBoundary, page_height: f32) -> ColumnAssignment {
        if let Some(band) = self.config.margin_band {
            if bbox.y1 <= band || bbox.y0 >= page_height - band {
                return ColumnAssignment::Spanning;
            }
        }

        let ranges = columns.ranges();
        if ranges.len() <= 1 {
            return ColumnAssignment::Column(0);
        }

        let center = bbox.center_x();
        let home = ranges
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.distance_to(center)
                    .partial_cmp(&b.distance_to(center))
                    .unwrap_or(Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);

        let touched = ranges
            .iter()
            .filter(|r| bbox.horizontal_overlap(r.x_start, r.x_end) > 0.0)
            .count();
        if touched > 1 {
            let home_range = ranges[home];
            let inside = bbox.horizontal_overlap(home_range.x_start, home_range.x_end);
            if inside < self.config.span_fraction * bbox.width() {
                return ColumnAssignment::Spanning;
            }
        }
        ColumnAssignment::Column(home)
    }

    /// Order assigned candidates: bands between breaks, columns left to right
    /// inside a band, top to bottom inside a column.
    fn sequence(&self, candidates: Vec<Candidate>, column_count: usize) -> Vec<PageElement> {
        let (breaks, flowing): (Vec<Candidate>, Vec<Candidate>) = candidates
            .into_iter()
            .partition(|c| c.element.column.is_spanning());

        let breaks = self.order_vertically(breaks);
        let band_count = breaks.len() + 1;

        let mut bands: Vec<Vec<Vec<Candidate>>> = (0..band_count)
            .map(|_| (0..column_count.max(1)).map(|_| Vec::new()).collect())
            .collect();

        for c in flowing {
            let band = breaks.iter().filter(|b| self.precedes(b, &c)).count();
            let column = match c.element.column {
                ColumnAssignment::Column(i) => i.min(column_count.max(1) - 1),
                ColumnAssignment::Spanning => 0,
            };
            bands[band][column].push(c);
        }

        let mut ordered = Vec::new();
        let mut breaks = breaks.into_iter();
        for band in bands {
            for column in band {
                ordered.extend(self.order_vertically(column).into_iter().map(|c| c.element));
            }
            if let Some(b) = breaks.next() {
                ordered.push(b.element);
            }
        }
        ordered
    }

    /// Whether `a` reads before `b`: top edge first, hint order for tops
    /// within epsilon, then left edge.
    fn precedes(&self, a: &Candidate, b: &Candidate) -> bool {
        let dy = b.element.bbox.y0 - a.element.bbox.y0;
        if dy.abs() > self.config.y_epsilon {
            return dy > 0.0;
        }
        if let (Some(ra), Some(rb)) = (a.hint_rank, b.hint_rank) {
            if ra != rb {
                return ra < rb;
            }
        }
        match a.element.bbox.y0.partial_cmp(&b.element.bbox.y0) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            _ => a.element.bbox.x0 < b.element.bbox.x0,
        }
    }

    /// Stable sort by (y0, x0), then let the hint reorder adjacent pairs
    /// whose tops are within epsilon.
    fn order_vertically(&self, mut items: Vec<Candidate>) -> Vec<Candidate> {
        items.sort_by(|a, b| {
            a.element
                .bbox
                .y0
                .partial_cmp(&b.element.bbox.y0)
                .unwrap_or(Ordering::Equal)
                .then(
                    a.element
                        .bbox
                        .x0
                        .partial_cmp(&b.element.bbox.x0)
                        .unwrap_or(Ordering::Equal),
                )
        });

        // Each swap removes one hint-rank inversion, so this terminates.
        for _ in 0..items.len() {
            let mut swapped = false;
            for i in 1..items.len() {
                let (a, b) = (&items[i - 1], &items[i]);
                let close = (a.element.bbox.y0 - b.element.bbox.y0).abs() <= self.config.y_epsilon;
                if let (true, Some(ra), Some(rb)) = (close, a.hint_rank, b.hint_rank) {
                    if ra > rb {
                        items.swap(i - 1, i);
                        swapped = true;
                    }
                }
            }
            if !swapped {
                break;
            }
        }
        items
    }
}

fn candidate(payload: ElementPayload, bbox: BoundingBox, page: usize) -> Candidate {
    Candidate {
        element: PageElement::new(payload, bbox, ColumnAssignment::Column(0), page),
        hint_rank: None,
    }
}

/// Position of the best-matching hinted element of the same kind.
fn hint_rank(hint: &LayoutHint, element: &PageElement) -> Option<usize> {
    let kind = element.kind();
    let bbox = &element.bbox;
    let mut best: Option<(usize, f32)> = None;

    for (rank, hinted) in hint.order.iter().enumerate() {
        if hinted.kind != kind {
            continue;
        }
        let mut score = bbox.iou(&hinted.bbox);
        if score <= 0.0 {
            let (cx, cy) = (bbox.center_x(), bbox.center_y());
            let h = &hinted.bbox;
            if cx >= h.x0 && cx <= h.x1 && cy >= h.y0 && cy <= h.y1 {
                score = f32::EPSILON;
            }
        }
        if score > 0.0 && best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((rank, score));
        }
    }
    best.map(|(rank, _)| rank)
}

/// Fill `gap_before` from the emitted order. Column elements measure from the
/// previous element in the same column and band, falling back to the last
/// break; breaks measure from the lowest content emitted above them.
fn record_gaps(mut ordered: Vec<PageElement>) -> Vec<PageElement> {
    let mut column_bottoms: Vec<Option<f32>> = Vec::new();
    let mut last_break_bottom: Option<f32> = None;
    let mut lowest: Option<f32> = None;

    for element in &mut ordered {
        let bbox = element.bbox;
        let previous = match element.column {
            ColumnAssignment::Spanning => {
                column_bottoms.clear();
                let prev = lowest;
                last_break_bottom = Some(bbox.y1);
                prev
            }
            ColumnAssignment::Column(c) => {
                if column_bottoms.len() <= c {
                    column_bottoms.resize(c + 1, None);
                }
                let prev = column_bottoms[c].or(last_break_bottom);
                column_bottoms[c] = Some(bbox.y1);
                prev
            }
        };
        element.gap_before = previous.map(|p| (bbox.y0 - p).max(0.0));
        lowest = Some(lowest.map_or(bbox.y1, |l| l.max(bbox.y1)));
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ColumnRange, ElementKind, HintedElement, ImageFormat, ImageRegion, TableCell, TableRegion, TextLine,
        TextStyle,
    };

    fn line(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> TextLine {
        TextLine::new(text, BoundingBox::new(x0, y0, x1, y1), TextStyle::default(), 0)
    }

    fn two_columns() -> ColumnBoundary {
        ColumnBoundary::new(vec![
            ColumnRange::new(0.0, 250.0),
            ColumnRange::new(300.0, 550.0),
        ])
    }

    fn texts(page: &UnifiedPage) -> Vec<String> {
        page.elements.iter().map(|e| e.plain_text()).collect()
    }

    fn page_with(lines: Vec<TextLine>) -> PagePrimitives {
        let mut page = PagePrimitives::new(0, 612.0, 792.0);
        page.lines = lines;
        page
    }

    #[test]
    fn test_assign_column() {
        let unifier = ElementUnifier::default();
        let cols = two_columns();
        let a = |x0, x1| unifier.assign_column(&BoundingBox::new(x0, 0.0, x1, 10.0), &cols, 792.0);

        assert_eq!(a(0.0, 250.0), ColumnAssignment::Column(0));
        assert_eq!(a(300.0, 550.0), ColumnAssignment::Column(1));
        assert_eq!(a(0.0, 550.0), ColumnAssignment::Spanning);
        // Mostly inside the left column with a small overhang.
        assert_eq!(a(0.0, 320.0), ColumnAssignment::Column(0));
        // Entirely in the gutter.
        assert_eq!(a(260.0, 270.0), ColumnAssignment::Column(0));
    }

    #[test]
    fn test_single_column_follows_y() {
        let page = page_with(vec![
            line("c", 72.0, 300.0, 500.0, 312.0),
            line("a", 72.0, 100.0, 500.0, 112.0),
            line("b", 72.0, 200.0, 500.0, 212.0),
        ]);
        let cols = ColumnBoundary::single(72.0, 500.0);
        let unified = ElementUnifier::default().unify(&page, &cols, None);
        assert_eq!(texts(&unified), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_gap_metadata() {
        let page = page_with(vec![
            line("a", 72.0, 100.0, 500.0, 112.0),
            line("b", 72.0, 130.0, 500.0, 142.0),
        ]);
        let cols = ColumnBoundary::single(72.0, 500.0);
        let unified = ElementUnifier::default().unify(&page, &cols, None);
        assert_eq!(unified.elements[0].gap_before, None);
        assert_eq!(unified.elements[1].gap_before, Some(18.0));
    }

    #[test]
    fn test_right_column_starts_from_break() {
        let page = page_with(vec![
            line("title", 0.0, 0.0, 550.0, 20.0),
            line("l1", 0.0, 30.0, 250.0, 40.0),
            line("r1", 300.0, 32.0, 550.0, 42.0),
        ]);
        let unified = ElementUnifier::default().unify(&page, &two_columns(), None);
        assert_eq!(texts(&unified), vec!["title", "l1", "r1"]);
        assert_eq!(unified.elements[1].gap_before, Some(10.0));
        assert_eq!(unified.elements[2].gap_before, Some(12.0));
    }

    #[test]
    fn test_table_carve_out() {
        let mut page = page_with(vec![
            line("inside one", 110.0, 120.0, 190.0, 135.0),
            line("inside two", 110.0, 150.0, 190.0, 165.0),
        ]);
        page.tables.push(TableRegion::new(
            BoundingBox::new(100.0, 100.0, 200.0, 300.0),
            vec![TableCell::new(0, 0, "inside one"), TableCell::new(1, 0, "inside two")],
            0,
        ));
        let unified = ElementUnifier::default().unify(&page, &ColumnBoundary::single(100.0, 200.0), None);
        assert_eq!(unified.elements.len(), 1);
        assert_eq!(unified.elements[0].kind(), ElementKind::Table);
    }

    #[test]
    fn test_partially_covered_line_survives() {
        let mut page = page_with(vec![line("half", 150.0, 120.0, 250.0, 135.0)]);
        page.tables.push(TableRegion::new(
            BoundingBox::new(100.0, 100.0, 200.0, 300.0),
            vec![TableCell::new(0, 0, "x")],
            0,
        ));
        let unified = ElementUnifier::default().unify(&page, &ColumnBoundary::single(100.0, 250.0), None);
        assert_eq!(unified.elements.len(), 2);
    }

    #[test]
    fn test_degenerate_geometry_skipped() {
        let mut page = page_with(vec![
            line("zero", 10.0, 10.0, 10.0, 20.0),
            line("ok", 10.0, 30.0, 100.0, 40.0),
        ]);
        page.images.push(ImageRegion {
            data: vec![],
            format: ImageFormat::Png,
            bbox: BoundingBox::new(0.0, 0.0, 50.0, 0.0),
            page: 0,
        });
        let unified = ElementUnifier::default().unify(&page, &ColumnBoundary::single(0.0, 100.0), None);
        assert_eq!(texts(&unified), vec!["ok"]);
    }

    #[test]
    fn test_empty_page() {
        let page = PagePrimitives::new(3, 612.0, 792.0);
        let unified = ElementUnifier::default().unify(&page, &ColumnBoundary::single(0.0, 612.0), None);
        assert!(unified.is_empty());
        assert_eq!(unified.page_index, 3);
    }

    #[test]
    fn test_images_interleave_by_position() {
        let mut page = page_with(vec![
            line("above", 72.0, 100.0, 500.0, 112.0),
            line("below", 72.0, 400.0, 500.0, 412.0),
        ]);
        page.images.push(ImageRegion {
            data: vec![1, 2, 3],
            format: ImageFormat::Jpeg,
            bbox: BoundingBox::new(100.0, 150.0, 300.0, 350.0),
            page: 0,
        });
        let unified = ElementUnifier::default().unify(&page, &ColumnBoundary::single(72.0, 500.0), None);
        let kinds: Vec<ElementKind> = unified.elements.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![ElementKind::Text, ElementKind::Image, ElementKind::Text]);
    }

    #[test]
    fn test_hint_breaks_ties_only() {
        // "b" sits 1pt above "a" but the hint reads "a" first.
        let page = page_with(vec![
            line("a", 72.0, 101.0, 200.0, 111.0),
            line("b", 220.0, 100.0, 400.0, 110.0),
            line("c", 72.0, 200.0, 400.0, 210.0),
        ]);
        let cols = ColumnBoundary::single(72.0, 400.0);
        let hint = LayoutHint {
            column_count: 1,
            columns: vec![],
            tables: vec![],
            order: vec![
                HintedElement { kind: ElementKind::Text, bbox: BoundingBox::new(72.0, 200.0, 400.0, 210.0) },
                HintedElement { kind: ElementKind::Text, bbox: BoundingBox::new(72.0, 101.0, 200.0, 111.0) },
                HintedElement { kind: ElementKind::Text, bbox: BoundingBox::new(220.0, 100.0, 400.0, 110.0) },
            ],
        };

        let unifier = ElementUnifier::default();
        let without = unifier.unify(&page, &cols, None);
        let with = unifier.unify(&page, &cols, Some(&hint));

        assert_eq!(texts(&without), vec!["b", "a", "c"]);
        // The hint wants "c" first, but "c" is far below; only the tie flips.
        assert_eq!(texts(&with), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_margin_band_promotes_headers() {
        let config = LayoutConfig::default().with_margin_band(40.0);
        let page = page_with(vec![
            line("running head", 0.0, 10.0, 120.0, 20.0),
            line("l1", 0.0, 60.0, 250.0, 70.0),
            line("r1", 300.0, 60.0, 550.0, 70.0),
            line("page 3", 260.0, 770.0, 290.0, 780.0),
        ]);
        let unified = ElementUnifier::new(config).unify(&page, &two_columns(), None);
        assert_eq!(unified.elements[0].column, ColumnAssignment::Spanning);
        assert_eq!(texts(&unified), vec!["running head", "l1", "r1", "page 3"]);
    }

    #[test]
    fn test_margin_band_measured_from_page_edges() {
        let config = LayoutConfig::default().with_margin_band(40.0);
        let page = page_with(vec![
            line("l1", 0.0, 60.0, 250.0, 70.0),
            line("r1", 300.0, 60.0, 550.0, 70.0),
            // Within 40pt of the lowest content, but not of the page bottom (792).
            line("late note", 0.0, 745.0, 120.0, 751.0),
            line("folio", 260.0, 770.0, 290.0, 780.0),
        ]);
        let unified = ElementUnifier::new(config).unify(&page, &two_columns(), None);
        let column_of = |t: &str| {
            unified
                .elements
                .iter()
                .find(|e| e.plain_text() == t)
                .map(|e| e.column)
                .unwrap()
        };
        assert_eq!(column_of("late note"), ColumnAssignment::Column(0));
        assert_eq!(column_of("folio"), ColumnAssignment::Spanning);
    }
}
