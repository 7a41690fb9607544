//! Data model shared by every conversion stage.
//!
//! Primitives come out of the extractor, the unifier turns them into
//! ordered [`PageElement`]s, and the renderer consumes [`UnifiedPage`]s.

mod element;
mod geometry;
mod hint;
mod primitives;

pub use element::{
    ColumnAssignment, ColumnBoundary, ColumnRange, ElementKind, ElementPayload, PageElement,
    Paragraph, Segment, StyledRun, UnifiedPage,
};
pub use geometry::BoundingBox;
pub use hint::{HintedElement, LayoutHint};
pub use primitives::{
    strip_subset_prefix, ImageFormat, ImageRegion, PagePrimitives, Rgb, TableCell, TableRegion,
    TextLine, TextStyle,
};
