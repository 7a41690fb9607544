//! Rendering options and configuration.

use std::ops::Range;

use super::CleanupOptions;
use crate::error::{Error, Result};

/// Points per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Options for DOCX rendering. All lengths are in points.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Output page size; `None` takes the size of the first source page
    pub page_size: Option<(f32, f32)>,

    /// Margin applied on all four sides
    pub margin: f32,

    /// Smallest and largest font size written
    pub min_font_size: f32,
    pub max_font_size: f32,

    /// Gaps above this become paragraph space-before
    pub spacing_threshold: f32,

    /// Upper bound on space-before
    pub max_space_before: f32,

    /// Image width limits in the body
    pub min_image_width: f32,
    pub max_image_width: f32,

    /// Image width limits inside layout table cells
    pub min_cell_image_width: f32,
    pub max_cell_image_width: f32,

    /// Text written where an image could not be rendered
    pub image_placeholder: String,

    /// Start each source page on a new output page
    pub page_breaks: bool,

    /// Text cleanup applied before writing
    pub cleanup: Option<CleanupOptions>,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the output page size.
    pub fn with_page_size(mut self, width: f32, height: f32) -> Self {
        self.page_size = Some((width, height));
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin.max(0.0);
        self
    }

    pub fn with_font_size_range(mut self, min: f32, max: f32) -> Self {
        self.min_font_size = min.min(max);
        self.max_font_size = max.max(min);
        self
    }

    pub fn with_max_space_before(mut self, points: f32) -> Self {
        self.max_space_before = points.max(0.0);
        self
    }

    pub fn with_image_placeholder(mut self, text: impl Into<String>) -> Self {
        self.image_placeholder = text.into();
        self
    }

    pub fn with_page_breaks(mut self, enabled: bool) -> Self {
        self.page_breaks = enabled;
        self
    }

    /// Set cleanup options.
    pub fn with_cleanup(mut self, cleanup: CleanupOptions) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// Set cleanup preset.
    pub fn with_cleanup_preset(mut self, preset: super::CleanupPreset) -> Self {
        self.cleanup = Some(CleanupOptions::from_preset(preset));
        self
    }

    /// Clamp a source font size into the written range.
    pub fn clamp_font_size(&self, size: f32) -> f32 {
        if size.is_finite() {
            size.clamp(self.min_font_size, self.max_font_size)
        } else {
            self.min_font_size
        }
    }

    /// Space-before for a recorded gap, if it is large enough to keep.
    pub fn space_before(&self, gap: Option<f32>) -> Option<f32> {
        match gap {
            Some(g) if g.is_finite() && g > self.spacing_threshold => Some(g.min(self.max_space_before)),
            _ => None,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page_size: None,
            margin: 0.5 * POINTS_PER_INCH,
            min_font_size: 8.0,
            max_font_size: 36.0,
            spacing_threshold: 6.0,
            max_space_before: 24.0,
            min_image_width: 1.0 * POINTS_PER_INCH,
            max_image_width: 6.5 * POINTS_PER_INCH,
            min_cell_image_width: 0.5 * POINTS_PER_INCH,
            max_cell_image_width: 2.8 * POINTS_PER_INCH,
            image_placeholder: "[Image could not be rendered]".to_string(),
            page_breaks: true,
            cleanup: None,
        }
    }
}

/// Largest range accepted inside a comma-separated page list, which is
/// expanded eagerly. A bare `a-b` range is never expanded.
pub const MAX_LISTED_PAGES: usize = 100_000;

/// Collapse sorted, distinct indices into contiguous spans.
fn spans(sorted: &[usize]) -> Vec<Range<usize>> {
    let mut out: Vec<Range<usize>> = Vec::new();
    for &page in sorted {
        match out.last_mut() {
            Some(last) if last.end == page => last.end = page + 1,
            _ => out.push(page..page + 1),
        }
    }
    out
}

/// Page selection, 0-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Render all pages
    #[default]
    All,
    /// Render a range of pages (end exclusive)
    Range(Range<usize>),
    /// Render specific pages
    Pages(Vec<usize>),
}

impl PageSelection {
    /// Check if a page index should be included.
    pub fn includes(&self, page: usize) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Resolve against a document, returning the selected indices in page
    /// order and the requested indices the document does not have, as
    /// contiguous spans.
    pub fn resolve(&self, page_count: usize) -> (Vec<usize>, Vec<Range<usize>>) {
        match self {
            PageSelection::All => ((0..page_count).collect(), Vec::new()),
            PageSelection::Range(range) => {
                let present = range.start.min(page_count)..range.end.min(page_count);
                let missing = range.start.max(page_count)..range.end;
                let missing = if missing.is_empty() { Vec::new() } else { vec![missing] };
                (present.collect(), missing)
            }
            PageSelection::Pages(pages) => {
                let mut sorted = pages.clone();
                sorted.sort_unstable();
                sorted.dedup();
                let (present, absent): (Vec<usize>, Vec<usize>) = sorted.into_iter().partition(|&p| p < page_count);
                (present, spans(&absent))
            }
        }
    }

    /// Parse a page selection string (e.g., "0-5", "0,2,4", "0-3,7").
    ///
    /// Ranges are end exclusive.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        let number = |part: &str| -> Result<usize> {
            part.trim()
                .parse()
                .map_err(|_| Error::InvalidPageRange(format!("'{}' is not a page index", part.trim())))
        };

        // Simple range (e.g., "0-10")
        if !s.contains(',') {
            if let Some((start, end)) = s.split_once('-') {
                return Ok(PageSelection::Range(number(start)?..number(end)?));
            }
        }

        // Comma-separated list with possible ranges
        let mut pages = Vec::new();
        for part in s.split(',') {
            match part.split_once('-') {
                Some((start, end)) => {
                    let range = number(start)?..number(end)?;
                    if range.len() > MAX_LISTED_PAGES {
                        return Err(Error::InvalidPageRange(format!(
                            "range '{}' in a page list covers more than {} pages",
                            part.trim(),
                            MAX_LISTED_PAGES
                        )));
                    }
                    pages.extend(range)
                }
                None => pages.push(number(part)?),
            }
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}
