//! Word-level fidelity check of a written DOCX against its source text.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;

use crate::error::{Error, Result};

/// Default minimum score for a valid conversion.
pub const DEFAULT_THRESHOLD: f32 = 0.85;

/// Cap on reported missing words.
const MAX_MISSING_WORDS: usize = 50;

/// Normalized words of a text: non-word characters become spaces, words
/// are lowercased, and only words longer than two characters that are not
/// all digits are kept.
pub fn extract_words(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();
    cleaned
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !w.chars().all(|c| c.is_numeric()))
        .map(str::to_string)
        .collect()
}

/// Text content read back from a DOCX.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxContent {
    pub text: String,
    /// Body paragraphs (outside tables)
    pub paragraphs: usize,
    /// Body paragraphs with no text, picture or page break
    pub blank_paragraphs: usize,
}

/// Read `word/document.xml` out of DOCX bytes.
pub fn read_docx(bytes: &[u8]) -> Result<DocxContent> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;
    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<DocxContent> {
    let mut reader = Reader::from_str(xml);
    let mut content = DocxContent::default();

    let mut table_depth = 0usize;
    let mut in_text = false;
    let mut paragraph_has_content = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Validation(format!("document.xml: {}", e)))?;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:p" => paragraph_has_content = false,
                b"w:t" => in_text = true,
                b"w:drawing" => paragraph_has_content = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => content.text.push(' '),
                b"w:br" => {
                    let is_page = e.attributes().flatten().any(|a| {
                        a.key.as_ref() == b"w:type" && a.value.as_ref() == b"page"
                    });
                    if is_page {
                        paragraph_has_content = true;
                    }
                }
                b"w:p" if table_depth == 0 => {
                    content.paragraphs += 1;
                    content.blank_paragraphs += 1;
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| Error::Validation(format!("document.xml: {}", e)))?;
                if !text.trim().is_empty() {
                    paragraph_has_content = true;
                }
                content.text.push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                b"w:t" => in_text = false,
                b"w:p" => {
                    content.text.push('\n');
                    if table_depth == 0 {
                        content.paragraphs += 1;
                        if !paragraph_has_content {
                            content.blank_paragraphs += 1;
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(content)
}

/// Per-page share of source words found in the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageScore {
    pub page: usize,
    pub score: f32,
    pub source_words: usize,
}

/// Result of comparing a DOCX against its source text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FidelityReport {
    /// Share of distinct source words present in the output, 0.0 to 1.0
    pub score: f32,
    pub source_word_count: usize,
    pub output_word_count: usize,
    /// Up to 50 source words absent from the output, sorted
    pub missing_words: Vec<String>,
    pub page_scores: Vec<PageScore>,
    pub paragraph_count: usize,
    pub blank_paragraph_count: usize,
    pub valid: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Compares source text with a written DOCX.
#[derive(Debug, Clone)]
pub struct FidelityValidator {
    threshold: f32,
}

impl Default for FidelityValidator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl FidelityValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Validate a DOCX file. `source_pages` holds `(page_index, text)`.
    pub fn validate_file<P: AsRef<Path>>(&self, source_pages: &[(usize, String)], docx: P) -> Result<FidelityReport> {
        let bytes = fs::read(docx)?;
        self.validate_bytes(source_pages, &bytes)
    }

    pub fn validate_bytes(&self, source_pages: &[(usize, String)], docx: &[u8]) -> Result<FidelityReport> {
        let content = read_docx(docx)?;
        Ok(self.compare(source_pages, &content))
    }

    pub fn compare(&self, source_pages: &[(usize, String)], output: &DocxContent) -> FidelityReport {
        let output_words = extract_words(&output.text);
        let output_set: HashSet<&str> = output_words.iter().map(String::as_str).collect();

        let mut source_word_count = 0;
        let mut source_set: BTreeSet<String> = BTreeSet::new();
        let mut page_scores = Vec::with_capacity(source_pages.len());

        for (page, text) in source_pages {
            let words = extract_words(text);
            source_word_count += words.len();
            let page_set: HashSet<&str> = words.iter().map(String::as_str).collect();
            let found = page_set.iter().filter(|w| output_set.contains(*w)).count();
            page_scores.push(PageScore {
                page: *page,
                score: ratio(found, page_set.len()),
                source_words: page_set.len(),
            });
            source_set.extend(words);
        }

        let missing: Vec<String> = source_set
            .iter()
            .filter(|w| !output_set.contains(w.as_str()))
            .cloned()
            .collect();
        let score = ratio(source_set.len() - missing.len(), source_set.len());

        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        if score < self.threshold {
            issues.push(format!(
                "Content match {:.1}% is below the {:.0}% threshold",
                score * 100.0,
                self.threshold * 100.0
            ));
            recommendations.push("Review complex layouts or tables".to_string());
        }
        if (output_words.len() as f32) < source_word_count as f32 * 0.8 {
            issues.push("Significant content loss detected".to_string());
            recommendations.push("Check for scanned or image-based pages".to_string());
        }
        if output.blank_paragraphs > source_pages.len() * 2 {
            issues.push(format!("Excessive blank paragraphs ({})", output.blank_paragraphs));
            recommendations.push("Run cleanup to remove blank content".to_string());
        }

        FidelityReport {
            score,
            source_word_count,
            output_word_count: output_words.len(),
            missing_words: missing.into_iter().take(MAX_MISSING_WORDS).collect(),
            page_scores,
            paragraph_count: output.paragraphs,
            blank_paragraph_count: output.blank_paragraphs,
            valid: score >= self.threshold && issues.is_empty(),
            issues,
            recommendations,
        }
    }
}

fn ratio(found: usize, total: usize) -> f32 {
    if total == 0 {
        1.0
    } else {
        found as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::writer::{DocBlock, DocParagraph, DocRun, DocxSink, DocxWriter};

    fn content(text: &str, paragraphs: usize, blank: usize) -> DocxContent {
        DocxContent {
            text: text.to_string(),
            paragraphs,
            blank_paragraphs: blank,
        }
    }

    #[test]
    fn test_extract_words() {
        assert_eq!(
            extract_words("The quick-brown fox, 2024 a an ok! Über"),
            vec!["the", "quick", "brown", "fox", "über"]
        );
    }

    #[test]
    fn test_perfect_match() {
        let source = vec![(0, "Alpha beta gamma".to_string())];
        let report = FidelityValidator::new().compare(&source, &content("alpha BETA gamma", 1, 0));
        assert_eq!(report.score, 1.0);
        assert!(report.valid);
        assert!(report.missing_words.is_empty());
        assert_eq!(report.page_scores[0].score, 1.0);
    }

    #[test]
    fn test_missing_words_and_issues() {
        let source = vec![
            (0, "alpha beta gamma delta".to_string()),
            (1, "epsilon zeta".to_string()),
        ];
        let report = FidelityValidator::new().compare(&source, &content("alpha beta gamma", 10, 5));
        assert!((report.score - 0.5).abs() < 1e-6);
        assert_eq!(report.missing_words, vec!["delta", "epsilon", "zeta"]);
        assert_eq!(report.page_scores[1].score, 0.0);
        assert!(!report.valid);
        // Below threshold, under 80% of the words, and 5 blanks for 2 pages
        assert_eq!(report.issues.len(), 3);
        assert_eq!(report.recommendations.len(), 3);
    }

    #[test]
    fn test_empty_source_scores_one() {
        let report = FidelityValidator::new().compare(&[(0, String::new())], &content("", 0, 0));
        assert_eq!(report.score, 1.0);
        assert!(report.valid);
    }

    #[test]
    fn test_missing_words_capped() {
        let text: String = (0..80).map(|i| format!("word{:03} ", i)).collect();
        let report = FidelityValidator::new().compare(&[(0, text)], &content("", 0, 0));
        assert_eq!(report.missing_words.len(), 50);
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn test_read_back_written_docx() {
        let mut writer = DocxWriter::new(612.0, 792.0, 36.0);
        writer
            .append(DocBlock::Paragraph(DocParagraph {
                runs: vec![DocRun::plain("Readable "), DocRun::plain("content")],
                ..Default::default()
            }))
            .unwrap();
        writer.append(DocBlock::Paragraph(DocParagraph::default())).unwrap();
        writer.append(DocBlock::PageBreak).unwrap();
        let bytes = writer.commit_to_bytes().unwrap();

        let content = read_docx(&bytes).unwrap();
        assert!(content.text.contains("Readable content"));
        assert_eq!(content.paragraphs, 3);
        assert_eq!(content.blank_paragraphs, 1);
    }

    #[test]
    fn test_not_a_docx() {
        assert!(read_docx(b"plain text").is_err());
    }
}
