//! End-to-end PDF to DOCX conversion.
//!
//! [`Converter`] wires the stages together: primitive extraction, optional
//! layout hints, column-aware unification and grouping, rendering, writing
//! and fidelity validation.
//!
//! # Example
//!
//! ```no_run
//! use docxify::convert::{ConvertOptions, Converter};
//! use std::path::Path;
//!
//! let converter = Converter::new(ConvertOptions::default().with_hints(false));
//! let result = converter.convert(Path::new("paper.pdf"), None);
//! println!("{} pages, success: {}", result.pages_converted, result.success);
//! ```

mod batch;
mod pipeline;

pub use batch::{collect_pdfs, BatchOptions, BatchReport};
pub use pipeline::Converter;

use std::path::{Path, PathBuf};

use serde::Serialize;

#[cfg(feature = "vision")]
use crate::hint::VisionConfig;
use crate::layout::LayoutConfig;
use crate::parser::ExtractOptions;
use crate::render::{FidelityReport, PageSelection, RenderOptions, RenderStats};

/// Options for one conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Pages to convert, 0-based
    pub pages: PageSelection,

    /// Column detection, unification and grouping thresholds
    pub layout: LayoutConfig,

    /// Primitive extraction options
    pub extract: ExtractOptions,

    /// DOCX rendering options
    pub render: RenderOptions,

    /// Ask a hint provider for layout hints
    pub hints: bool,

    /// Hint service settings
    #[cfg(feature = "vision")]
    pub vision: VisionConfig,

    /// Read the output back and score it against the source text
    pub validate: bool,

    /// Analyze pages on the rayon thread pool
    pub parallel: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            pages: PageSelection::All,
            layout: LayoutConfig::default(),
            extract: ExtractOptions::default(),
            render: RenderOptions::default(),
            hints: true,
            #[cfg(feature = "vision")]
            vision: VisionConfig::default(),
            validate: true,
            parallel: false,
        }
    }
}

impl ConvertOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set layout thresholds.
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Set extraction options.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract = options;
        self
    }

    /// Set rendering options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    /// Enable or disable layout hints.
    pub fn with_hints(mut self, enabled: bool) -> Self {
        self.hints = enabled;
        self
    }

    /// Set hint service settings.
    #[cfg(feature = "vision")]
    pub fn with_vision(mut self, config: VisionConfig) -> Self {
        self.vision = config;
        self
    }

    /// Set the hint service credential.
    #[cfg(feature = "vision")]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.vision = self.vision.with_api_key(key);
        self
    }

    /// Enable or disable fidelity validation.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Enable or disable parallel page analysis.
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Fail on page-level extraction problems instead of skipping them.
    pub fn strict(mut self) -> Self {
        self.extract = self.extract.strict();
        self
    }
}

/// Outcome of converting one document.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub input: PathBuf,

    /// Written file; `None` when nothing was written
    pub output: Option<PathBuf>,

    pub success: bool,

    pub pages_converted: usize,

    pub stats: RenderStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fidelity: Option<FidelityReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Recoverable problems met along the way
    pub warnings: Vec<String>,
}

impl ConversionResult {
    /// A conversion that produced no output.
    pub fn failed(input: &Path, error: impl ToString) -> Self {
        Self {
            input: input.to_path_buf(),
            output: None,
            success: false,
            pages_converted: 0,
            stats: RenderStats::default(),
            fidelity: None,
            error: Some(error.to_string()),
            warnings: Vec::new(),
        }
    }

    /// Fidelity score, when validation ran.
    pub fn score(&self) -> Option<f32> {
        self.fidelity.as_ref().map(|f| f.score)
    }
}

/// Default output path: the input with a `.docx` extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("docx")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_options_builder() {
        let options = ConvertOptions::new()
            .with_pages(PageSelection::Range(0..2))
            .with_hints(false)
            .with_validation(false)
            .with_parallel(true)
            .strict();

        assert_eq!(options.pages, PageSelection::Range(0..2));
        assert!(!options.hints);
        assert!(!options.validate);
        assert!(options.parallel);
        assert_eq!(options.extract.error_mode, crate::parser::ErrorMode::Strict);
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/report.pdf")),
            PathBuf::from("/tmp/report.docx")
        );
        assert_eq!(default_output_path(Path::new("scan")), PathBuf::from("scan.docx"));
    }

    #[test]
    fn test_failed_result_serializes() {
        let result = ConversionResult::failed(Path::new("in.pdf"), "Document is encrypted");
        assert!(!result.success);
        assert_eq!(result.score(), None);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"error\":\"Document is encrypted\""));
        assert!(!json.contains("fidelity"));
    }
}
