//! Tunable thresholds for column detection, unification and grouping.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Every heuristic threshold used by the layout stage.
///
/// Distances are in PDF points, ratios are unitless. The defaults are tuned
/// for ordinary letter/A4 documents with 9 to 12 point body text.
///
/// Loadable from JSON; missing keys take their default:
///
/// ```
/// use docxify::layout::LayoutConfig;
///
/// let config = LayoutConfig::from_json(r#"{ "min_gap_width": 18.0 }"#).unwrap();
/// assert_eq!(config.min_gap_width, 18.0);
/// assert_eq!(config.span_fraction, 0.6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    // Column detection
    /// Histogram bucket width.
    pub slice_width: f32,
    /// Narrowest gutter that can separate columns.
    pub min_gap_width: f32,
    /// Buckets at or below this fraction of the peak occupancy count as empty.
    pub gap_density: f32,
    /// Lines wider than this fraction of the content width are left out of
    /// the histogram; they are spanning candidates, not column text.
    pub wide_line_fraction: f32,
    /// Minimum share of the page's vertical content range that the lines on
    /// each side of a gutter must cover.
    pub min_vertical_coverage: f32,
    /// Gutters must be centered inside this window of the content width.
    pub search_start: f32,
    pub search_end: f32,
    /// Content narrower than this is always a single column.
    pub min_content_width: f32,
    /// Narrowest acceptable column.
    pub min_column_width: f32,
    /// Every column needs at least this many lines...
    pub min_lines_per_column: usize,
    /// ...and at least this share of all counted lines.
    pub min_line_share: f32,

    // Unification
    /// A line this much inside a table region belongs to the table.
    pub containment_ratio: f32,
    /// Share of an element's width that must fall inside its home column;
    /// below it a multi-column element is full-width.
    pub span_fraction: f32,
    /// Vertical positions closer than this are ambiguous and may be
    /// reordered by a hint.
    pub y_epsilon: f32,
    /// When set, elements lying entirely within this distance of the top or
    /// bottom page edge are treated as full-width headers and footers.
    pub margin_band: Option<f32>,

    // Paragraph grouping
    /// Lines merge when the gap between them is at most this multiple of the
    /// line height.
    pub line_gap_ratio: f32,
    /// Lines merge only when their font sizes differ by at most this many
    /// points.
    pub size_tolerance: f32,
    /// Font size ratio above which lines never merge.
    pub font_jump_ratio: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            slice_width: 3.0,
            min_gap_width: 12.0,
            gap_density: 0.05,
            wide_line_fraction: 0.6,
            min_vertical_coverage: 0.5,
            search_start: 0.15,
            search_end: 0.85,
            min_content_width: 250.0,
            min_column_width: 80.0,
            min_lines_per_column: 2,
            min_line_share: 0.1,
            containment_ratio: 0.9,
            span_fraction: 0.6,
            y_epsilon: 2.0,
            margin_band: None,
            line_gap_ratio: 0.5,
            size_tolerance: 0.5,
            font_jump_ratio: 1.3,
        }
    }
}

impl LayoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would make the heuristics meaningless.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("slice_width", self.slice_width),
            ("min_gap_width", self.min_gap_width),
            ("line_gap_ratio", self.line_gap_ratio),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!("{} must be positive", name)));
            }
        }

        let fractions = [
            ("gap_density", self.gap_density),
            ("wide_line_fraction", self.wide_line_fraction),
            ("min_vertical_coverage", self.min_vertical_coverage),
            ("containment_ratio", self.containment_ratio),
            ("span_fraction", self.span_fraction),
            ("min_line_share", self.min_line_share),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("{} must be within 0..=1", name)));
            }
        }

        if !(0.0 <= self.search_start && self.search_start < self.search_end && self.search_end <= 1.0) {
            return Err(Error::Config(
                "search window must satisfy 0 <= search_start < search_end <= 1".to_string(),
            ));
        }
        if self.font_jump_ratio < 1.0 {
            return Err(Error::Config("font_jump_ratio must be at least 1".to_string()));
        }
        if self.y_epsilon < 0.0 || self.size_tolerance < 0.0 || self.margin_band.is_some_and(|m| m < 0.0) {
            return Err(Error::Config("distances must not be negative".to_string()));
        }
        Ok(())
    }

    pub fn with_margin_band(mut self, band: f32) -> Self {
        self.margin_band = Some(band);
        self
    }

    pub fn with_y_epsilon(mut self, epsilon: f32) -> Self {
        self.y_epsilon = epsilon;
        self
    }

    pub fn with_span_fraction(mut self, fraction: f32) -> Self {
        self.span_fraction = fraction;
        self
    }

    pub fn with_line_gap_ratio(mut self, ratio: f32) -> Self {
        self.line_gap_ratio = ratio;
        self
    }

    pub fn with_min_gap_width(mut self, width: f32) -> Self {
        self.min_gap_width = width;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LayoutConfig::default().validate().is_ok());
    }

    #[test]
    fn test_json_round_trip_keeps_overrides() {
        let config = LayoutConfig::default().with_margin_band(40.0);
        let json = config.to_json().unwrap();
        let back = LayoutConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(LayoutConfig::from_json(r#"{ "span_fraction": 1.5 }"#).is_err());
        assert!(LayoutConfig::from_json(r#"{ "search_start": 0.9, "search_end": 0.2 }"#).is_err());
        assert!(LayoutConfig::from_json(r#"{ "slice_width": 0 }"#).is_err());
        assert!(LayoutConfig::from_json(r#"{ "size_tolerance": -1 }"#).is_err());
        assert!(LayoutConfig::from_json("[]").is_err());
    }
}
