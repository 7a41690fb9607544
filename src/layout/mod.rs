//! Reading-order reconstruction.
//!
//! [`ColumnDetector`] finds column ranges, [`ElementUnifier`] merges a page's
//! primitives into one ordered sequence, and [`ParagraphGrouper`] folds
//! adjacent lines into paragraphs. [`LayoutEngine`] runs all three.

mod columns;
mod config;
mod grouper;
mod unifier;

pub use columns::{detect_columns, ColumnDetector};
pub use config::LayoutConfig;
pub use grouper::ParagraphGrouper;
pub use unifier::ElementUnifier;

use crate::model::{BoundingBox, LayoutHint, PagePrimitives, UnifiedPage};

/// The full per-page layout pipeline.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    detector: ColumnDetector,
    unifier: ElementUnifier,
    grouper: ParagraphGrouper,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            detector: ColumnDetector::new(config.clone()),
            unifier: ElementUnifier::new(config.clone()),
            grouper: ParagraphGrouper::new(config),
        }
    }

    /// Detect columns, unify and group one page.
    pub fn analyze(&self, page: &PagePrimitives, hint: Option<&LayoutHint>) -> UnifiedPage {
        let unified = self.unify(page, hint);
        self.grouper.group(unified)
    }

    /// Detect columns and unify, without paragraph grouping.
    pub fn unify(&self, page: &PagePrimitives, hint: Option<&LayoutHint>) -> UnifiedPage {
        // Table cells line up like columns; keep them out of the histogram.
        let ratio = self.detector.config().containment_ratio;
        let boxes: Vec<BoundingBox> = page
            .lines
            .iter()
            .map(|l| l.bbox)
            .filter(|b| !page.tables.iter().any(|t| b.containment_in(&t.bbox) >= ratio))
            .collect();
        let columns = self.detector.detect(&boxes, page.width);
        self.unifier.unify(page, &columns, hint)
    }
}
