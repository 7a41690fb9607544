//! Extraction options and configuration.

use super::table_detector::TableDetectorConfig;

/// Options for primitive extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Whether to place image XObjects
    pub extract_images: bool,

    /// Whether to run table detection
    pub detect_tables: bool,

    /// Table detection thresholds
    pub table_config: TableDetectorConfig,

    /// Fragments on one baseline further apart than this many font sizes
    /// become separate lines (table cells, tab stops).
    pub split_gap_ratio: f32,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Fail the conversion on any page-level problem.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Enable or disable image extraction.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.extract_images = extract;
        self
    }

    /// Enable or disable table detection.
    pub fn with_tables(mut self, detect: bool) -> Self {
        self.detect_tables = detect;
        self
    }

    /// Replace the table detector configuration.
    pub fn with_table_config(mut self, config: TableDetectorConfig) -> Self {
        self.table_config = config;
        self
    }

    /// Extract text only.
    pub fn text_only(mut self) -> Self {
        self.extract_images = false;
        self.detect_tables = false;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            extract_images: true,
            detect_tables: true,
            table_config: TableDetectorConfig::default(),
            split_gap_ratio: 1.5,
        }
    }
}

/// Error handling mode during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any error
    Strict,
    /// Log page-level failures, keep what was extracted, and continue
    #[default]
    Lenient,
}
