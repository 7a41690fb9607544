//! Table detection using text position analysis (Stream mode algorithm).
//!
//! Tables are found from text alignment alone: fragments are grouped into
//! rows, left edges that recur across rows become column edges, and runs of
//! rows that align with those edges become tables. Lists and column prose
//! also align, so both are rejected explicitly.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::model::{BoundingBox, TableCell, TableRegion, TextLine};

/// A row of text fragments sharing a vertical position.
#[derive(Debug, Clone)]
pub struct TableRowData {
    /// Vertical center of the row.
    pub y: f32,
    /// Fragments in this row, sorted by X.
    pub lines: Vec<TextLine>,
}

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping fragments into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
    /// Cells averaging more characters than this read as prose, which is
    /// what side-by-side text columns look like to this detector.
    pub max_mean_cell_chars: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            max_mean_cell_chars: 32.0,
        }
    }
}

/// Detects tables in the text fragments of one page.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables among the given lines.
    ///
    /// The lines themselves are not consumed; the unifier removes the ones
    /// that fall inside a returned table region.
    pub fn detect(&self, lines: &[TextLine]) -> Vec<TableRegion> {
        log::debug!("TableDetector: starting with {} lines", lines.len());

        if lines.len() < self.config.min_rows * self.config.min_columns {
            return vec![];
        }

        let rows = self.group_into_rows(lines);
        if rows.len() < self.config.min_rows {
            return vec![];
        }

        let columns = self.detect_columns(&rows);
        log::debug!("TableDetector: column edges {:?}", columns);
        if columns.len() < self.config.min_columns {
            return vec![];
        }

        let regions = self.find_table_regions(&rows, &columns);
        log::debug!("TableDetector: found {} candidate regions", regions.len());

        let mut tables = Vec::new();
        for (start_row, end_row) in regions {
            let table_rows = &rows[start_row..=end_row];

            // Re-detect columns for this specific region
            let table_columns = self.detect_columns(table_rows);
            if table_columns.len() < self.config.min_columns {
                continue;
            }
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "TableDetector: skipping region, too many columns ({} > {})",
                    table_columns.len(),
                    self.config.max_columns
                );
                continue;
            }
            if self.is_list_pattern(table_rows, &table_columns) {
                log::debug!("TableDetector: skipping region, list pattern");
                continue;
            }
            if self.is_prose(table_rows) {
                log::debug!("TableDetector: skipping region, cells read as prose");
                continue;
            }

            tables.push(self.to_region(table_rows, &table_columns));
        }
        tables
    }

    /// Group fragments into rows by vertical center.
    fn group_into_rows(&self, lines: &[TextLine]) -> Vec<TableRowData> {
        let mut sorted: Vec<&TextLine> = lines.iter().filter(|l| !l.bbox.is_degenerate()).collect();
        sorted.sort_by(|a, b| {
            a.bbox
                .center_y()
                .partial_cmp(&b.bbox.center_y())
                .unwrap_or(Ordering::Equal)
                .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
        });

        let mut rows: Vec<TableRowData> = Vec::new();
        let mut current: Vec<TextLine> = Vec::new();
        let mut current_y: Option<f32> = None;

        for line in sorted {
            let tolerance = line.style.size.max(1.0) * self.config.y_tolerance_factor;
            let y = line.bbox.center_y();
            match current_y {
                Some(cy) if (y - cy).abs() <= tolerance => current.push(line.clone()),
                _ => {
                    if !current.is_empty() {
                        rows.push(make_row(std::mem::take(&mut current)));
                    }
                    current_y = Some(y);
                    current.push(line.clone());
                }
            }
        }
        if !current.is_empty() {
            rows.push(make_row(current));
        }
        rows
    }

    /// Detect column edges from recurring left edges.
    ///
    /// Rows with at least two fragments are preferred; when too few exist,
    /// every row votes.
    fn detect_columns(&self, rows: &[TableRowData]) -> Vec<f32> {
        let multi: Vec<&TableRowData> = rows.iter().filter(|r| r.lines.len() >= 2).collect();
        let voters: Vec<&TableRowData> = if multi.len() >= self.config.min_rows {
            multi
        } else {
            rows.iter().collect()
        };
        if voters.is_empty() {
            return vec![];
        }

        let bucket_size = 5.0;
        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &voters {
            // Each bucket counts once per row
            let buckets: HashSet<i32> = row
                .lines
                .iter()
                .map(|l| (l.bbox.x0 / bucket_size).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((voters.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * bucket_size)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Find contiguous row runs that align with the column edges.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = row.lines.len() >= 2
                && self.alignment_score(row, columns) >= self.config.min_alignment_ratio;
            match (aligned, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.config.min_rows {
                        regions.push((s, i - 1));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }
        regions
    }

    /// Share of a row's fragments that start on a column edge.
    fn alignment_score(&self, row: &TableRowData, columns: &[f32]) -> f32 {
        if row.lines.is_empty() || columns.is_empty() {
            return 0.0;
        }
        let tolerance = 5.0;
        let aligned = row
            .lines
            .iter()
            .filter(|l| columns.iter().any(|c| (l.bbox.x0 - c).abs() <= tolerance))
            .count();
        aligned as f32 / row.lines.len() as f32
    }

    /// Build the table region: bbox over all fragments, one cell per
    /// (row, column) with fragment text joined by spaces.
    fn to_region(&self, rows: &[TableRowData], columns: &[f32]) -> TableRegion {
        let mut bbox: Option<BoundingBox> = None;
        let mut cells = Vec::new();
        let page = rows
            .first()
            .and_then(|r| r.lines.first())
            .map(|l| l.page)
            .unwrap_or(0);

        for (row_idx, row) in rows.iter().enumerate() {
            let mut contents: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
            for line in &row.lines {
                bbox = Some(bbox.map_or(line.bbox, |b| b.union(&line.bbox)));
                let col = find_column(line.bbox.x0, columns);
                contents[col].push(line.text.trim());
            }
            for (col_idx, parts) in contents.into_iter().enumerate() {
                cells.push(TableCell::new(row_idx, col_idx, parts.join(" ")));
            }
        }

        TableRegion::new(bbox.unwrap_or_default(), cells, page)
    }

    /// Check if detected table rows actually represent a numbered or bulleted list.
    ///
    /// A numbered list often splits "1." and the item text into separate
    /// fragments, which looks like a two-column table.
    fn is_list_pattern(&self, rows: &[TableRowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullet_count = 0;
        let mut number_count = 0;
        for row in rows {
            // Rows are sorted by X, so the first fragment is the leftmost
            if let Some(first) = row.lines.first() {
                let text = first.text.trim();
                if is_bullet_marker(text) {
                    bullet_count += 1;
                } else if is_number_marker(text) {
                    number_count += 1;
                }
            }
        }

        let bullet_ratio = bullet_count as f32 / rows.len() as f32;
        let total_ratio = (bullet_count + number_count) as f32 / rows.len() as f32;

        // Bullet markers are almost never real table data
        if bullet_ratio >= 0.5 {
            return true;
        }
        // Numbered first columns are common in real tables; only reject 2 columns
        columns.len() == 2 && total_ratio >= 0.5
    }

    fn is_prose(&self, rows: &[TableRowData]) -> bool {
        let (chars, count) = rows
            .iter()
            .flat_map(|r| r.lines.iter())
            .fold((0usize, 0usize), |(c, n), l| (c + l.text.trim().chars().count(), n + 1));
        count > 0 && chars as f32 / count as f32 > self.config.max_mean_cell_chars
    }
}

fn make_row(mut lines: Vec<TextLine>) -> TableRowData {
    lines.sort_by(|a, b| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal));
    let y = lines.iter().map(|l| l.bbox.center_y()).sum::<f32>() / lines.len() as f32;
    TableRowData { y, lines }
}

/// Column index for a fragment starting at `x`: the last edge at or before
/// it (with 10pt slack), or the first column.
fn find_column(x: f32, columns: &[f32]) -> usize {
    columns
        .iter()
        .rposition(|&edge| x >= edge - 10.0)
        .unwrap_or(0)
}

/// Check if text is a bullet marker (•, -, etc.).
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "▹" | "►" | "■" | "●" | "※" | "□" | "◆" | "◇" | "▶" | "▷" | "☞" | "➤" | "➜"
    )
}

/// Check if text is a number-style list marker (1., 2), a., etc.).
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    // Letter marker: "a.", "B)"
    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}
