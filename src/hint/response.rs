//! Parsing of the hint service's JSON answer.
//!
//! Positions come back as percentages of the page size and are converted to
//! page points here.

use serde::Deserialize;

use super::HintError;
use crate::model::{BoundingBox, ColumnRange, ElementKind, HintedElement, LayoutHint};

/// Upper bound on a believable column count.
const MAX_COLUMNS: usize = 6;

#[derive(Debug, Deserialize)]
struct RawHint {
    num_columns: usize,
    #[serde(default)]
    column_positions: Vec<Vec<f32>>,
    #[serde(default)]
    tables: Vec<Vec<f32>>,
    #[serde(default)]
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: String,
    bbox: Vec<f32>,
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.rfind("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

fn percent(v: f32, extent: f32) -> f32 {
    v.clamp(0.0, 100.0) / 100.0 * extent
}

fn to_bbox(values: &[f32], page_width: f32, page_height: f32) -> Option<BoundingBox> {
    let [x0, y0, x1, y1] = values else {
        return None;
    };
    let bbox = BoundingBox::from_corners(
        percent(*x0, page_width),
        percent(*y0, page_height),
        percent(*x1, page_width),
        percent(*y1, page_height),
    );
    (!bbox.is_degenerate()).then_some(bbox)
}

fn to_kind(name: &str) -> Option<ElementKind> {
    match name.to_ascii_lowercase().as_str() {
        "text" | "paragraph" | "heading" | "title" | "caption" => Some(ElementKind::Text),
        "image" | "figure" | "picture" => Some(ElementKind::Image),
        "table" => Some(ElementKind::Table),
        _ => None,
    }
}

/// Parse a hint answer for a page of the given size in points.
///
/// Entries with unusable geometry or unknown kinds are dropped; a missing or
/// implausible column count rejects the whole answer.
pub fn parse_hint_response(text: &str, page_width: f32, page_height: f32) -> Result<LayoutHint, String> {
    parse(text, page_width, page_height).map_err(|e| e.to_string())
}

pub(crate) fn parse(text: &str, page_width: f32, page_height: f32) -> Result<LayoutHint, HintError> {
    let raw: RawHint = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| HintError::Malformed(e.to_string()))?;

    if raw.num_columns == 0 || raw.num_columns > MAX_COLUMNS {
        return Err(HintError::Malformed(format!(
            "implausible column count {}",
            raw.num_columns
        )));
    }

    let columns = raw
        .column_positions
        .iter()
        .filter_map(|pos| match pos.as_slice() {
            [start, end] if end > start => Some(ColumnRange::new(
                percent(*start, page_width),
                percent(*end, page_width),
            )),
            _ => None,
        })
        .collect();

    let tables = raw
        .tables
        .iter()
        .filter_map(|t| to_bbox(t, page_width, page_height))
        .collect();

    let order = raw
        .elements
        .iter()
        .filter_map(|e| {
            Some(HintedElement {
                kind: to_kind(&e.kind)?,
                bbox: to_bbox(&e.bbox, page_width, page_height)?,
            })
        })
        .collect();

    Ok(LayoutHint {
        column_count: raw.num_columns,
        columns,
        tables,
        order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_answer() {
        let text = r#"```json
{
  "num_columns": 2,
  "column_positions": [[5, 45], [55, 95]],
  "tables": [[10, 50, 90, 70], [1, 2, 3]],
  "elements": [
    {"type": "heading", "bbox": [5, 2, 95, 6]},
    {"type": "figure", "bbox": [55, 10, 95, 30]},
    {"type": "sidebar", "bbox": [0, 0, 10, 10]},
    {"type": "text", "bbox": [5, 10, 5, 30]}
  ]
}
```"#;
        let hint = parse(text, 600.0, 800.0).unwrap();
        assert_eq!(hint.column_count, 2);
        assert_eq!(hint.columns, vec![ColumnRange::new(30.0, 270.0), ColumnRange::new(330.0, 570.0)]);
        assert_eq!(hint.tables, vec![BoundingBox::new(60.0, 400.0, 540.0, 560.0)]);
        // Unknown kinds and zero-width boxes are dropped
        assert_eq!(hint.order.len(), 2);
        assert_eq!(hint.order[0].kind, ElementKind::Text);
        assert_eq!(hint.order[1].kind, ElementKind::Image);
    }

    #[test]
    fn test_rejects_malformed_answers() {
        assert!(matches!(parse("not json", 600.0, 800.0), Err(HintError::Malformed(_))));
        assert!(parse(r#"{"num_columns": 0}"#, 600.0, 800.0).is_err());
        assert!(parse(r#"{"num_columns": 12}"#, 600.0, 800.0).is_err());
        assert!(parse(r#"{"tables": []}"#, 600.0, 800.0).is_err());
    }

    #[test]
    fn test_minimal_answer() {
        let hint = parse_hint_response(r#"{"num_columns": 1}"#, 600.0, 800.0).unwrap();
        assert_eq!(hint.column_count, 1);
        assert!(hint.order.is_empty());
    }
}
