//! Column detection by horizontal occupancy analysis.
//!
//! Text line boxes are projected onto the X axis in fixed-width slices.
//! Runs of (nearly) empty slices between occupied regions are gutter
//! candidates; a candidate survives when the columns it creates are wide
//! enough, populated enough and tall enough.

use std::cmp::Ordering;

use super::config::LayoutConfig;
use crate::model::{BoundingBox, ColumnBoundary, ColumnRange};

/// Upper bound on histogram slices; wider content gets wider slices.
const MAX_SLICES: usize = 4096;

/// A candidate gutter in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Gutter {
    x_start: f32,
    x_end: f32,
}

impl Gutter {
    fn width(&self) -> f32 {
        self.x_end - self.x_start
    }
}

/// Detects column boundaries on a page.
///
/// Detection is total: degenerate input (no lines, narrow content, no
/// qualifying gutter) yields a single column.
#[derive(Debug, Clone, Default)]
pub struct ColumnDetector {
    config: LayoutConfig,
}

impl ColumnDetector {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Compute column ranges from the text line boxes of one page.
    pub fn detect(&self, boxes: &[BoundingBox], page_width: f32) -> ColumnBoundary {
        let clipped = clip_to_page(boxes, page_width);
        let boxes: Vec<&BoundingBox> = clipped.iter().collect();
        if boxes.is_empty() {
            return ColumnBoundary::single(0.0, page_width.max(0.0));
        }

        let min_x = boxes.iter().map(|b| b.x0).fold(f32::INFINITY, f32::min);
        let max_x = boxes.iter().map(|b| b.x1).fold(f32::NEG_INFINITY, f32::max);
        let content_width = max_x - min_x;

        if content_width < self.config.min_content_width {
            log::debug!(
                "Content width {:.1}pt below {:.1}pt, single column",
                content_width,
                self.config.min_content_width
            );
            return ColumnBoundary::single(min_x, max_x);
        }

        // Wide lines would fill every gutter they cross.
        let wide_limit = content_width * self.config.wide_line_fraction;
        let counted: Vec<&BoundingBox> = boxes
            .iter()
            .copied()
            .filter(|b| b.width() <= wide_limit)
            .collect();
        if counted.len() < self.config.min_lines_per_column * 2 {
            log::debug!("Only {} narrow lines, single column", counted.len());
            return ColumnBoundary::single(min_x, max_x);
        }

        let slice = self.config.slice_width.max(content_width / MAX_SLICES as f32);
        let mut gutters = self.find_gutters(&counted, min_x, content_width, slice);
        log::debug!("Gutter candidates: {:?}", gutters);

        loop {
            let columns = self.columns_between(&gutters, &counted, min_x, max_x);
            match self.weakest_gutter(&gutters, &columns, &counted) {
                Some(index) => {
                    log::debug!("Dropping gutter {:?}", gutters[index]);
                    gutters.remove(index);
                }
                None => {
                    let ranges: Vec<ColumnRange> = columns.iter().map(|c| c.range).collect();
                    log::debug!("Detected {} column(s): {:?}", ranges.len(), ranges);
                    return ColumnBoundary::new(ranges);
                }
            }
        }
    }

    /// Runs of low-occupancy slices that do not touch either content edge
    /// and whose center lies in the search window.
    fn find_gutters(&self, lines: &[&BoundingBox], min_x: f32, content_width: f32, slice: f32) -> Vec<Gutter> {
        let num_slices = ((content_width / slice).ceil() as usize).min(MAX_SLICES) + 1;
        let mut occupancy = vec![0usize; num_slices];

        for b in lines {
            let start = (((b.x0 - min_x) / slice) as usize).min(num_slices - 1);
            let end = (((b.x1 - min_x) / slice) as usize).min(num_slices - 1);
            for slot in occupancy.iter_mut().take(end + 1).skip(start) {
                *slot += 1;
            }
        }

        let peak = occupancy.iter().copied().max().unwrap_or(0);
        let threshold = (peak as f32 * self.config.gap_density).floor() as usize;

        let mut gutters = Vec::new();
        let mut run_start: Option<usize> = None;
        for (i, &count) in occupancy.iter().enumerate() {
            if count <= threshold {
                run_start.get_or_insert(i);
                continue;
            }
            if let Some(start) = run_start.take() {
                // A run starting at slice 0 is a margin, not a gutter.
                if start > 0 {
                    if let Some(g) = self.qualify_run(start, i - 1, min_x, content_width, slice) {
                        gutters.push(g);
                    }
                }
            }
        }
        // A trailing run touches the right edge and is ignored.
        gutters
    }

    fn qualify_run(&self, first: usize, last: usize, min_x: f32, content_width: f32, slice: f32) -> Option<Gutter> {
        let gutter = Gutter {
            x_start: min_x + first as f32 * slice,
            x_end: min_x + (last + 1) as f32 * slice,
        };
        if gutter.width() < self.config.min_gap_width {
            return None;
        }
        let center = (gutter.x_start + gutter.x_end) / 2.0;
        let position = (center - min_x) / content_width;
        if position < self.config.search_start || position > self.config.search_end {
            log::debug!(
                "Gutter at {:.1}..{:.1} outside search window ({:.0}%)",
                gutter.x_start,
                gutter.x_end,
                position * 100.0
            );
            return None;
        }
        Some(gutter)
    }

    /// Split the content at the gutters and snap each column to the extent
    /// of the lines centered in it.
    fn columns_between(
        &self,
        gutters: &[Gutter],
        lines: &[&BoundingBox],
        min_x: f32,
        max_x: f32,
    ) -> Vec<Column> {
        let mut columns = Vec::with_capacity(gutters.len() + 1);
        for i in 0..=gutters.len() {
            let left = if i == 0 { min_x } else { gutters[i - 1].x_end };
            let right = if i == gutters.len() { max_x } else { gutters[i].x_start };

            let members: Vec<&BoundingBox> = lines
                .iter()
                .copied()
                .filter(|b| {
                    let c = b.center_x();
                    (i == 0 || c >= left) && (i == gutters.len() || c < right)
                })
                .collect();

            let range = if members.is_empty() {
                ColumnRange::new(left, right)
            } else {
                let x0 = members.iter().map(|b| b.x0).fold(f32::INFINITY, f32::min);
                let x1 = members.iter().map(|b| b.x1).fold(f32::NEG_INFINITY, f32::max);
                ColumnRange::new(x0.max(left), x1.min(right).max(x0.max(left)))
            };

            let top = members.iter().map(|b| b.y0).fold(f32::INFINITY, f32::min);
            let bottom = members.iter().map(|b| b.y1).fold(f32::NEG_INFINITY, f32::max);
            columns.push(Column {
                range,
                line_count: members.len(),
                vertical_extent: if members.is_empty() { 0.0 } else { bottom - top },
            });
        }
        columns
    }

    /// Index of the gutter to drop next, or `None` when every column passes.
    fn weakest_gutter(&self, gutters: &[Gutter], columns: &[Column], lines: &[&BoundingBox]) -> Option<usize> {
        if gutters.is_empty() {
            return None;
        }

        let top = lines.iter().map(|b| b.y0).fold(f32::INFINITY, f32::min);
        let bottom = lines.iter().map(|b| b.y1).fold(f32::NEG_INFINITY, f32::max);
        let vertical_range = (bottom - top).max(f32::EPSILON);
        let share = (lines.len() as f32 * self.config.min_line_share).ceil() as usize;
        let min_lines = self.config.min_lines_per_column.max(share);

        for (i, column) in columns.iter().enumerate() {
            let coverage = column.vertical_extent / vertical_range;
            let failing = column.range.width() < self.config.min_column_width
                || column.line_count < min_lines
                || coverage < self.config.min_vertical_coverage;
            if !failing {
                continue;
            }

            log::debug!(
                "Column {} rejected: width={:.1} lines={} coverage={:.2}",
                i,
                column.range.width(),
                column.line_count,
                coverage
            );

            // Remove the narrower of the gutters bordering this column.
            let left = i.checked_sub(1);
            let right = (i < gutters.len()).then_some(i);
            return match (left, right) {
                (Some(l), Some(r)) => {
                    match gutters[l]
                        .width()
                        .partial_cmp(&gutters[r].width())
                        .unwrap_or(Ordering::Equal)
                    {
                        Ordering::Greater => Some(r),
                        _ => Some(l),
                    }
                }
                (Some(l), None) => Some(l),
                (None, Some(r)) => Some(r),
                (None, None) => None,
            };
        }
        None
    }
}

#[derive(Debug, Clone)]
struct Column {
    range: ColumnRange,
    line_count: usize,
    vertical_extent: f32,
}

/// Clip boxes to `[0, page_width]`, dropping those left degenerate. Content
/// streams can place text anywhere, including far off the page.
fn clip_to_page(boxes: &[BoundingBox], page_width: f32) -> Vec<BoundingBox> {
    let bounded = page_width.is_finite() && page_width > 0.0;
    boxes
        .iter()
        .map(|b| {
            if bounded {
                BoundingBox::new(b.x0.max(0.0), b.y0, b.x1.min(page_width), b.y1)
            } else {
                *b
            }
        })
        .filter(|b| !b.is_degenerate())
        .collect()
}

/// Detect columns with the default configuration.
pub fn detect_columns(boxes: &[BoundingBox], page_width: f32) -> ColumnBoundary {
    ColumnDetector::default().detect(boxes, page_width)
}
