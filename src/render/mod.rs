//! DOCX rendering: unified pages to blocks, blocks to a packed document.
//!
//! [`DocxRenderer`] turns each [`crate::model::UnifiedPage`] into a list of
//! [`DocBlock`]s, [`CleanupPipeline`] tidies their text, and a [`DocxSink`]
//! such as [`DocxWriter`] appends them in order and commits the file.
//! [`FidelityValidator`] reads the result back and scores it.

mod cleanup;
pub(crate) mod images;
mod options;
mod renderer;
mod result;
pub mod validate;
pub mod writer;

pub use cleanup::{CleanupOptions, CleanupPipeline, CleanupPreset};
pub use options::{PageSelection, RenderOptions, POINTS_PER_INCH};
pub use renderer::{map_font, DocxRenderer, RenderedPage};
pub use result::RenderStats;
pub use validate::{extract_words, read_docx, DocxContent, FidelityReport, FidelityValidator, PageScore};
pub use writer::{DocAlignment, DocBlock, DocCell, DocImage, DocParagraph, DocRun, DocTable, DocxSink, DocxWriter};
