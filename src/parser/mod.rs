//! PDF parsing module.

pub mod backend;
mod extractor;
mod info;
mod options;
mod table_detector;

pub use backend::{LopdfBackend, PageGeometry, PdfBackend};
pub use extractor::{PdfExtractor, PrimitiveExtractor};
pub use info::{DocumentMetadata, PageInfo, PdfInfo};
pub use options::{ErrorMode, ExtractOptions};
pub use table_detector::{TableDetector, TableDetectorConfig, TableRowData};
