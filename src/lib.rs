//! # docxify
//!
//! Layout-preserving PDF to DOCX conversion for Rust.
//!
//! Every page is read into positioned primitives (text lines, images, table
//! regions), its columns are detected, and the primitives are merged into one
//! reading-order sequence. Multi-column runs are written as borderless layout
//! tables so the column structure survives in Word.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docxify::convert_file;
//!
//! fn main() -> docxify::Result<()> {
//!     let result = convert_file("paper.pdf")?;
//!     println!("Wrote {:?}", result.output);
//!     if let Some(score) = result.score() {
//!         println!("Fidelity: {:.1}%", score * 100.0);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Column detection**: gutter search over a horizontal occupancy histogram
//! - **Reading order**: full-width elements break column runs; columns read left to right
//! - **Native output**: styled runs, scaled images, bordered data tables
//! - **Layout hints**: optional vision-model hints break ordering ties (feature `vision`)
//! - **Validation**: word-level fidelity score read back from the written file
//! - **Cleanup pipeline**: ligatures, hyphenation, invalid characters

pub mod convert;
pub mod detect;
pub mod error;
pub mod hint;
pub mod layout;
pub mod model;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use convert::{BatchOptions, BatchReport, ConversionResult, ConvertOptions, Converter};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use error::{Error, Result};
pub use hint::{HintOutcome, HintProvider, NoHints};
#[cfg(feature = "vision")]
pub use hint::{VisionConfig, VisionHintProvider};
pub use layout::{LayoutConfig, LayoutEngine};
pub use model::{BoundingBox, LayoutHint, PageElement, PagePrimitives, UnifiedPage};
pub use parser::{ErrorMode, ExtractOptions, PdfExtractor, PdfInfo, PrimitiveExtractor};
pub use render::{CleanupOptions, CleanupPreset, FidelityReport, PageSelection, RenderOptions};

use std::path::Path;
use std::sync::Arc;

/// Convert a PDF next to itself (`input.docx`) with default options.
///
/// # Example
///
/// ```no_run
/// let result = docxify::convert_file("report.pdf").unwrap();
/// assert!(result.success);
/// ```
pub fn convert_file<P: AsRef<Path>>(input: P) -> Result<ConversionResult> {
    Converter::default().try_convert(input.as_ref(), None)
}

/// Convert a PDF into `output`.
pub fn convert_file_to<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<ConversionResult> {
    Converter::default().try_convert(input.as_ref(), Some(output.as_ref()))
}

/// Convert a PDF with custom options.
///
/// # Example
///
/// ```no_run
/// use docxify::{convert_file_with_options, ConvertOptions, PageSelection};
/// use std::path::Path;
///
/// let options = ConvertOptions::new()
///     .with_pages(PageSelection::Range(0..5))
///     .with_hints(false);
/// let result = convert_file_with_options("report.pdf", Some(Path::new("first-five.docx")), options).unwrap();
/// ```
pub fn convert_file_with_options<P: AsRef<Path>>(
    input: P,
    output: Option<&Path>,
    options: ConvertOptions,
) -> Result<ConversionResult> {
    Converter::new(options).try_convert(input.as_ref(), output)
}

/// Read document and page information without converting.
///
/// # Example
///
/// ```no_run
/// let info = docxify::inspect_file("report.pdf").unwrap();
/// println!("PDF {} with {} pages", info.version, info.page_count);
/// ```
pub fn inspect_file<P: AsRef<Path>>(path: P) -> Result<PdfInfo> {
    PdfInfo::from_path(path)
}

/// Extract, unify and group one page without writing anything.
pub fn analyze_page<P: AsRef<Path>>(path: P, page_index: usize, config: LayoutConfig) -> Result<UnifiedPage> {
    let extractor = PdfExtractor::open(path, ExtractOptions::default())?;
    let page = extractor.extract_page(page_index)?;
    Ok(LayoutEngine::new(config).analyze(&page, None))
}

/// Builder for converting PDF documents.
///
/// # Example
///
/// ```no_run
/// use docxify::{CleanupPreset, Docxify, PageSelection};
///
/// let result = Docxify::new()
///     .with_pages(PageSelection::Pages(vec![0, 2]))
///     .with_cleanup(CleanupPreset::Standard)
///     .without_hints()
///     .convert_to("paper.pdf", "paper-selected.docx")?;
/// # Ok::<(), docxify::Error>(())
/// ```
pub struct Docxify {
    options: ConvertOptions,
    hint_provider: Option<Arc<dyn HintProvider>>,
}

impl Docxify {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            options: ConvertOptions::default(),
            hint_provider: None,
        }
    }

    /// Fail on page-level extraction problems.
    pub fn strict(mut self) -> Self {
        self.options = self.options.strict();
        self
    }

    /// Skip images and table detection.
    pub fn text_only(mut self) -> Self {
        self.options.extract = self.options.extract.text_only();
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.options = self.options.with_pages(pages);
        self
    }

    /// Set layout thresholds.
    pub fn with_layout(mut self, config: LayoutConfig) -> Self {
        self.options = self.options.with_layout(config);
        self
    }

    /// Set cleanup preset.
    pub fn with_cleanup(mut self, preset: CleanupPreset) -> Self {
        self.options.render = self.options.render.with_cleanup_preset(preset);
        self
    }

    /// Set the hint service credential.
    #[cfg(feature = "vision")]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.options = self.options.with_api_key(key);
        self
    }

    /// Use a custom hint provider.
    pub fn with_hint_provider(mut self, provider: Arc<dyn HintProvider>) -> Self {
        self.hint_provider = Some(provider);
        self
    }

    /// Never request layout hints.
    pub fn without_hints(mut self) -> Self {
        self.options = self.options.with_hints(false);
        self
    }

    /// Skip fidelity validation.
    pub fn without_validation(mut self) -> Self {
        self.options = self.options.with_validation(false);
        self
    }

    /// Analyze pages in parallel.
    pub fn parallel(mut self) -> Self {
        self.options = self.options.with_parallel(true);
        self
    }

    /// The options collected so far.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Build the converter.
    pub fn build(self) -> Converter {
        let converter = Converter::new(self.options);
        match self.hint_provider {
            Some(provider) => converter.with_hint_provider(provider),
            None => converter,
        }
    }

    /// Convert `input` next to itself.
    pub fn convert<P: AsRef<Path>>(self, input: P) -> Result<ConversionResult> {
        self.build().try_convert(input.as_ref(), None)
    }

    /// Convert `input` into `output`.
    pub fn convert_to<P: AsRef<Path>, Q: AsRef<Path>>(self, input: P, output: Q) -> Result<ConversionResult> {
        self.build().try_convert(input.as_ref(), Some(output.as_ref()))
    }
}

impl Default for Docxify {
    fn default() -> Self {
        Self::new()
    }
}
