//! The conversion pipeline.

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use super::{default_output_path, ConversionResult, ConvertOptions};
use crate::detect::{detect_format_from_path, has_pdf_extension};
use crate::error::{Error, Result};
use crate::hint::{HintProvider, NoHints, PageRasterizer, SketchRasterizer};
use crate::layout::LayoutEngine;
use crate::model::{LayoutHint, PagePrimitives, UnifiedPage};
use crate::parser::{PdfExtractor, PrimitiveExtractor};
use crate::render::{
    CleanupPipeline, DocBlock, DocxRenderer, DocxSink, DocxWriter, FidelityValidator, RenderStats,
};

/// One analyzed page, and whether a hint shaped it.
struct AnalyzedPage {
    page: UnifiedPage,
    hinted: bool,
}

/// Converts PDF files to DOCX.
pub struct Converter {
    options: ConvertOptions,
    engine: LayoutEngine,
    hints: Arc<dyn HintProvider>,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl Converter {
    /// Create a converter. When hints are enabled and a credential is
    /// available, pages are sent to the vision hint service.
    pub fn new(options: ConvertOptions) -> Self {
        let hints = default_provider(&options);
        let rasterizer = Arc::new(SketchRasterizer::new(raster_dpi(&options)));
        Self {
            engine: LayoutEngine::new(options.layout.clone()),
            options,
            hints,
            rasterizer,
        }
    }

    /// Replace the hint provider.
    pub fn with_hint_provider(mut self, provider: Arc<dyn HintProvider>) -> Self {
        self.hints = provider;
        self
    }

    /// Replace the page rasterizer used to build hint requests.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert `input`, never failing: errors are reported in the result.
    pub fn convert(&self, input: &Path, output: Option<&Path>) -> ConversionResult {
        match self.try_convert(input, output) {
            Ok(result) => result,
            Err(e) => {
                log::error!("Conversion of {} failed: {}", input.display(), e);
                ConversionResult::failed(input, e)
            }
        }
    }

    /// Convert `input` into `output` (default: `input` with a `.docx`
    /// extension). Fatal problems return an error and leave no output file.
    pub fn try_convert(&self, input: &Path, output: Option<&Path>) -> Result<ConversionResult> {
        let format = detect_format_from_path(input)?;
        let mut warnings = Vec::new();
        if !has_pdf_extension(input) {
            warnings.push(format!("{} has no .pdf extension", input.display()));
            log::warn!("{} has no .pdf extension; converting anyway", input.display());
        }
        log::info!("Converting {} ({})", input.display(), format);

        let output = output.map(Path::to_path_buf).unwrap_or_else(|| default_output_path(input));
        let extractor = PdfExtractor::open(input, self.options.extract.clone())?;
        self.convert_from(&extractor, input, &output, warnings)
    }

    /// Run the pipeline on any extractor and write to `output`. `input` only
    /// labels the result.
    pub fn convert_from<E: PrimitiveExtractor>(
        &self,
        extractor: &E,
        input: &Path,
        output: &Path,
        mut warnings: Vec<String>,
    ) -> Result<ConversionResult> {
        let page_count = extractor.page_count();
        let (selected, missing) = self.options.pages.resolve(page_count);
        for span in &missing {
            let message = if span.len() == 1 {
                format!("page {} skipped: document has {} pages", span.start, page_count)
            } else {
                format!("pages {}..{} skipped: document has {} pages", span.start, span.end, page_count)
            };
            log::warn!("{}", message);
            warnings.push(message);
        }
        if selected.is_empty() {
            return Err(Error::InvalidPageRange(format!(
                "selection contains none of the document's {} pages",
                page_count
            )));
        }

        let primitives = selected
            .iter()
            .map(|&index| extractor.extract_page(index))
            .collect::<Result<Vec<_>>>()?;

        let analyzed: Vec<AnalyzedPage> = if self.options.parallel {
            primitives.par_iter().map(|p| self.analyze(p)).collect()
        } else {
            primitives.iter().map(|p| self.analyze(p)).collect()
        };

        let (page_width, page_height) = self
            .options
            .render
            .page_size
            .unwrap_or((primitives[0].width, primitives[0].height));
        let margin = self.options.render.margin;
        let content_width = if page_width > 2.0 * margin {
            page_width - 2.0 * margin
        } else {
            page_width
        };

        let renderer = DocxRenderer::new(self.options.render.clone());
        let cleanup = self.options.render.cleanup.clone().map(CleanupPipeline::new);
        let mut writer = DocxWriter::new(page_width, page_height, margin);
        let mut stats = RenderStats::default();

        for (i, analyzed) in analyzed.iter().enumerate() {
            let mut rendered = renderer.render_page(&analyzed.page, content_width);
            if let Some(cleanup) = &cleanup {
                cleanup.apply(&mut rendered.blocks);
            }
            if i > 0 && self.options.render.page_breaks {
                writer.append(DocBlock::PageBreak)?;
            }
            for block in rendered.blocks {
                writer.append(block)?;
            }
            if analyzed.hinted {
                rendered.stats.hints_used += 1;
            }
            stats.merge(&rendered.stats);
        }

        writer.commit(output)?;
        log::info!(
            "Wrote {} ({} pages, {} paragraphs, {} images, {} tables)",
            output.display(),
            stats.page_count,
            stats.paragraph_count,
            stats.image_count,
            stats.table_count
        );

        let fidelity = if self.options.validate {
            let source: Vec<(usize, String)> = primitives.iter().map(|p| (p.page_index, page_text(p))).collect();
            match FidelityValidator::new().validate_file(&source, output) {
                Ok(report) => {
                    if !report.valid {
                        log::warn!("Fidelity score {:.1}%: {}", report.score * 100.0, report.issues.join("; "));
                    }
                    Some(report)
                }
                Err(e) => {
                    let message = format!("validation skipped: {}", e);
                    log::warn!("{}", message);
                    warnings.push(message);
                    None
                }
            }
        } else {
            None
        };

        Ok(ConversionResult {
            input: input.to_path_buf(),
            output: Some(output.to_path_buf()),
            success: true,
            pages_converted: analyzed.len(),
            stats,
            fidelity,
            error: None,
            warnings,
        })
    }

    fn analyze(&self, page: &PagePrimitives) -> AnalyzedPage {
        let hint = self.hint_for(page);
        AnalyzedPage {
            page: self.engine.analyze(page, hint.as_ref()),
            hinted: hint.is_some(),
        }
    }

    fn hint_for(&self, page: &PagePrimitives) -> Option<LayoutHint> {
        if !self.options.hints || page.is_empty() || !self.hints.is_available() {
            return None;
        }
        let raster = match self.rasterizer.rasterize(page) {
            Ok(raster) => raster,
            Err(e) => {
                log::debug!("Page {}: no raster for hint request: {}", page.page_index, e);
                return None;
            }
        };
        let hint = self.hints.get_hint(&raster).into_hint();
        if hint.is_some() {
            log::debug!("Page {}: layout hint received", page.page_index);
        }
        hint
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

/// Text of a page as the reader sees it, for validation.
fn page_text(page: &PagePrimitives) -> String {
    page.lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(feature = "vision")]
fn raster_dpi(options: &ConvertOptions) -> f32 {
    options.vision.dpi
}

#[cfg(not(feature = "vision"))]
fn raster_dpi(_options: &ConvertOptions) -> f32 {
    SketchRasterizer::default().dpi()
}

#[cfg(feature = "vision")]
fn default_provider(options: &ConvertOptions) -> Arc<dyn HintProvider> {
    use crate::hint::VisionHintProvider;

    if !options.hints || options.vision.resolve_api_key().is_none() {
        return Arc::new(NoHints);
    }
    match VisionHintProvider::new(options.vision.clone()) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            log::warn!("Layout hints disabled: {}", e);
            Arc::new(NoHints)
        }
    }
}

#[cfg(not(feature = "vision"))]
fn default_provider(_options: &ConvertOptions) -> Arc<dyn HintProvider> {
    Arc::new(NoHints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint::{HintOutcome, PageRaster};
    use crate::model::{BoundingBox, TextLine, TextStyle};
    use crate::render::{read_docx, PageSelection};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Pages(Vec<PagePrimitives>);

    impl PrimitiveExtractor for Pages {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn extract_page(&self, page_index: usize) -> Result<PagePrimitives> {
            self.0
                .get(page_index)
                .cloned()
                .ok_or(Error::PageOutOfRange(page_index, self.0.len()))
        }
    }

    struct Counting(AtomicUsize);

    impl HintProvider for Counting {
        fn get_hint(&self, _raster: &PageRaster) -> HintOutcome {
            self.0.fetch_add(1, Ordering::SeqCst);
            HintOutcome::Unavailable("offline".to_string())
        }
    }

    fn page(index: usize, lines: &[(&str, f32)]) -> PagePrimitives {
        let mut page = PagePrimitives::new(index, 612.0, 792.0);
        for (text, y) in lines {
            page.lines.push(TextLine::new(
                *text,
                BoundingBox::new(72.0, *y, 400.0, *y + 12.0),
                TextStyle::default(),
                index,
            ));
        }
        page
    }

    fn options() -> ConvertOptions {
        ConvertOptions::default().with_hints(false)
    }

    #[test]
    fn test_convert_from_writes_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.docx");
        let pages = Pages(vec![
            page(0, &[("Opening statement", 72.0)]),
            page(1, &[("Closing remarks", 72.0)]),
        ]);

        let result = Converter::new(options())
            .convert_from(&pages, Path::new("mem.pdf"), &output, Vec::new())
            .unwrap();

        assert!(result.success);
        assert_eq!(result.pages_converted, 2);
        assert_eq!(result.stats.page_count, 2);
        let report = result.fidelity.unwrap();
        assert_eq!(report.score, 1.0);

        let content = read_docx(&std::fs::read(&output).unwrap()).unwrap();
        let first = content.text.find("Opening statement").unwrap();
        let second = content.text.find("Closing remarks").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_missing_pages_warn_and_empty_selection_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.docx");
        let pages = Pages(vec![page(0, &[("Only page", 72.0)])]);

        let converter = Converter::new(options().with_pages(PageSelection::Pages(vec![0, 5])));
        let result = converter.convert_from(&pages, Path::new("mem.pdf"), &output, Vec::new()).unwrap();
        assert_eq!(result.pages_converted, 1);
        assert_eq!(result.warnings.len(), 1);

        let empty = dir.path().join("empty.docx");
        let converter = Converter::new(options().with_pages(PageSelection::Pages(vec![3])));
        let err = converter.convert_from(&pages, Path::new("mem.pdf"), &empty, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidPageRange(_)));
        assert!(!empty.exists());
    }

    #[test]
    fn test_oversized_range_warns_once() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.docx");
        let pages = Pages(vec![page(0, &[("Only page", 72.0)])]);

        let converter = Converter::new(options().with_pages(PageSelection::Range(0..50_000_000)));
        let result = converter.convert_from(&pages, Path::new("mem.pdf"), &output, Vec::new()).unwrap();
        assert_eq!(result.pages_converted, 1);
        assert_eq!(result.warnings, vec!["pages 1..50000000 skipped: document has 1 pages".to_string()]);
    }

    #[test]
    fn test_unavailable_hints_are_asked_once_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.docx");
        let pages = Pages(vec![page(0, &[("Body text", 72.0)]), page(1, &[("More text", 72.0)])]);
        let provider = Arc::new(Counting(AtomicUsize::new(0)));

        let result = Converter::new(ConvertOptions::default().with_parallel(true))
            .with_hint_provider(provider.clone())
            .convert_from(&pages, Path::new("mem.pdf"), &output, Vec::new())
            .unwrap();

        assert!(result.success);
        assert_eq!(result.stats.hints_used, 0);
        assert_eq!(provider.0.load(Ordering::SeqCst), 2);
    }

    struct CountingRaster(AtomicUsize);

    impl PageRasterizer for CountingRaster {
        fn rasterize(&self, page: &PagePrimitives) -> Result<PageRaster> {
            self.0.fetch_add(1, Ordering::SeqCst);
            SketchRasterizer::default().rasterize(page)
        }
    }

    #[test]
    fn test_no_raster_without_usable_provider() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.docx");
        let pages = Pages(vec![page(0, &[("Body text", 72.0)]), page(1, &[("More text", 72.0)])]);
        let raster = Arc::new(CountingRaster(AtomicUsize::new(0)));

        let result = Converter::new(ConvertOptions::default())
            .with_hint_provider(Arc::new(NoHints))
            .with_rasterizer(raster.clone())
            .convert_from(&pages, Path::new("mem.pdf"), &output, Vec::new())
            .unwrap();
        assert!(result.success);
        assert_eq!(raster.0.load(Ordering::SeqCst), 0);

        // A provider that can answer still gets one raster per page.
        let provider = Arc::new(Counting(AtomicUsize::new(0)));
        Converter::new(ConvertOptions::default())
            .with_hint_provider(provider)
            .with_rasterizer(raster.clone())
            .convert_from(&pages, Path::new("mem.pdf"), &output, Vec::new())
            .unwrap();
        assert_eq!(raster.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_convert_reports_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.pdf");
        std::fs::write(&input, b"just some text").unwrap();

        let result = Converter::new(options()).convert(&input, None);
        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(!dir.path().join("notes.docx").exists());
    }
}
