//! Optional layout hints.
//!
//! A [`HintProvider`] looks at a rendered page and suggests columns, table
//! regions and a reading order. Hints are advisory: every failure turns into
//! [`HintOutcome::Unavailable`] and conversion carries on with the column
//! heuristic alone.

mod raster;
mod response;
#[cfg(feature = "vision")]
mod vision;

pub use raster::{PageRaster, PageRasterizer, SketchRasterizer};
pub use response::parse_hint_response;
#[cfg(feature = "vision")]
pub use vision::{VisionConfig, VisionHintProvider};

use crate::model::LayoutHint;

/// Reasons a hint could not be produced. Never escapes this module except
/// as the text of [`HintOutcome::Unavailable`].
#[derive(thiserror::Error, Debug)]
pub(crate) enum HintError {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("page raster failed: {0}")]
    Raster(String),
}

/// Result of a hint request.
#[derive(Debug, Clone, PartialEq)]
pub enum HintOutcome {
    Hint(LayoutHint),
    Unavailable(String),
}

impl HintOutcome {
    pub fn into_hint(self) -> Option<LayoutHint> {
        match self {
            HintOutcome::Hint(hint) => Some(hint),
            HintOutcome::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, HintOutcome::Hint(_))
    }
}

impl From<std::result::Result<LayoutHint, HintError>> for HintOutcome {
    fn from(result: std::result::Result<LayoutHint, HintError>) -> Self {
        match result {
            Ok(hint) => HintOutcome::Hint(hint),
            Err(e) => HintOutcome::Unavailable(e.to_string()),
        }
    }
}

/// Source of advisory layout hints.
///
/// Implementations make at most one attempt per call, bound it with a
/// timeout and never panic or return an error to the caller. Credentials are
/// part of the provider's own configuration.
pub trait HintProvider: Send + Sync {
    fn get_hint(&self, raster: &PageRaster) -> HintOutcome;

    /// Whether a request could succeed at all. When false, callers skip
    /// building the page raster.
    fn is_available(&self) -> bool {
        true
    }
}

/// Provider that never has a hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHints;

impl HintProvider for NoHints {
    fn get_hint(&self, _raster: &PageRaster) -> HintOutcome {
        HintOutcome::Unavailable("hints disabled".to_string())
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(LayoutHint);

    impl HintProvider for Fixed {
        fn get_hint(&self, _raster: &PageRaster) -> HintOutcome {
            HintOutcome::Hint(self.0.clone())
        }
    }

    fn raster() -> PageRaster {
        PageRaster {
            png: Vec::new(),
            width_px: 0,
            height_px: 0,
            page_width: 612.0,
            page_height: 792.0,
        }
    }

    #[test]
    fn test_no_hints_is_unavailable() {
        let outcome = NoHints.get_hint(&raster());
        assert!(!outcome.is_available());
        assert_eq!(outcome.into_hint(), None);
        assert!(!NoHints.is_available());
        assert!(Fixed(LayoutHint::default()).is_available());
    }

    #[test]
    fn test_providers_are_object_safe() {
        let hint = LayoutHint {
            column_count: 2,
            ..LayoutHint::default()
        };
        let providers: Vec<Box<dyn HintProvider>> = vec![Box::new(NoHints), Box::new(Fixed(hint.clone()))];
        let outcomes: Vec<HintOutcome> = providers.iter().map(|p| p.get_hint(&raster())).collect();
        assert_eq!(outcomes[1], HintOutcome::Hint(hint));
    }

    #[test]
    fn test_errors_collapse_to_unavailable() {
        let outcome: HintOutcome = Err(HintError::Status(529)).into();
        assert_eq!(outcome, HintOutcome::Unavailable("service returned HTTP 529".to_string()));
    }
}
