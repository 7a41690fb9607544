//! Advisory layout hints.

use serde::{Deserialize, Serialize};

use super::element::{ColumnRange, ElementKind};
use super::geometry::BoundingBox;

/// One element in the hint's suggested reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintedElement {
    pub kind: ElementKind,
    /// Approximate position in page points.
    pub bbox: BoundingBox,
}

/// Layout estimate for one page, in page points.
///
/// Hints never decide column boundaries; they only break ties between
/// elements whose vertical positions are too close to order reliably.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutHint {
    pub column_count: usize,
    pub columns: Vec<ColumnRange>,
    pub tables: Vec<BoundingBox>,
    /// Elements in suggested reading order.
    pub order: Vec<HintedElement>,
}

impl LayoutHint {
    pub fn is_empty(&self) -> bool {
        self.column_count == 0 && self.columns.is_empty() && self.tables.is_empty() && self.order.is_empty()
    }
}
