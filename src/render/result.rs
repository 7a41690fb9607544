//! Rendering statistics.

use serde::{Deserialize, Serialize};

/// Statistics collected while rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Total number of pages rendered
    pub page_count: u32,

    /// Source text lines that ended up in paragraphs
    pub text_elements: u32,

    /// Number of paragraphs written
    pub paragraph_count: u32,

    /// Number of images written
    pub image_count: u32,

    /// Images replaced by a placeholder
    pub images_skipped: u32,

    /// Number of data tables written
    pub table_count: u32,

    /// Multi-column runs written as layout tables
    pub layout_table_count: u32,

    /// Pages whose ordering used a layout hint
    pub hints_used: u32,

    /// Approximate word count (whitespace-separated tokens)
    pub word_count: u32,

    /// Character count (excluding whitespace)
    pub char_count: u32,
}

impl RenderStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add word and character counts from text.
    pub fn count_text(&mut self, text: &str) {
        // Word count: whitespace-separated tokens
        self.word_count += text.split_whitespace().count() as u32;

        // Character count: non-whitespace characters
        self.char_count += text.chars().filter(|c| !c.is_whitespace()).count() as u32;
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &RenderStats) {
        self.page_count += other.page_count;
        self.text_elements += other.text_elements;
        self.paragraph_count += other.paragraph_count;
        self.image_count += other.image_count;
        self.images_skipped += other.images_skipped;
        self.table_count += other.table_count;
        self.layout_table_count += other.layout_table_count;
        self.hints_used += other.hints_used;
        self.word_count += other.word_count;
        self.char_count += other.char_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_count_text() {
        let mut stats = RenderStats::new();
        stats.count_text("Hello, world! This is a test.");

        assert_eq!(stats.word_count, 6);
        assert_eq!(stats.char_count, 24);
    }

    #[test]
    fn test_stats_merge() {
        let mut stats1 = RenderStats::new();
        stats1.paragraph_count = 5;
        stats1.table_count = 2;

        let stats2 = RenderStats {
            paragraph_count: 3,
            table_count: 1,
            image_count: 4,
            images_skipped: 1,
            ..Default::default()
        };

        stats1.merge(&stats2);

        assert_eq!(stats1.paragraph_count, 8);
        assert_eq!(stats1.table_count, 3);
        assert_eq!(stats1.image_count, 4);
        assert_eq!(stats1.images_skipped, 1);
    }
}
