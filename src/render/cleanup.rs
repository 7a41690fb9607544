//! Text cleanup applied to the block stream before it is written.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::writer::{DocBlock, DocParagraph};

/// Cleanup preset levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPreset {
    /// Minimal cleanup: Unicode NFC normalization and invalid characters only
    Minimal,
    /// Standard cleanup: adds ligatures, hyphenation and empty paragraphs
    #[default]
    Standard,
    /// Aggressive cleanup: adds private-use removal and bullet unification
    Aggressive,
}

impl std::str::FromStr for CleanupPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(CleanupPreset::Minimal),
            "standard" => Ok(CleanupPreset::Standard),
            "aggressive" => Ok(CleanupPreset::Aggressive),
            other => Err(format!("unknown cleanup preset '{}'", other)),
        }
    }
}

/// Options for text cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Normalize Unicode to NFC form
    pub normalize_unicode: bool,

    /// Fix ligatures (fi, fl, etc.)
    pub fix_ligatures: bool,

    /// Remove Unicode replacement character (U+FFFD)
    pub remove_replacement_char: bool,

    /// Remove control characters XML cannot carry
    pub remove_control_chars: bool,

    /// Remove Private Use Area (PUA) characters
    pub remove_pua: bool,

    /// Standardize bullet characters (●, ○, ■ → •)
    pub standardize_bullets: bool,

    /// Join words hyphenated across merged lines
    pub fix_hyphenation: bool,

    /// Collapse runs of spaces
    pub collapse_spaces: bool,

    /// Drop paragraphs with no visible text
    pub remove_empty_paragraphs: bool,
}

impl CleanupOptions {
    /// Create options from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        match preset {
            CleanupPreset::Minimal => Self::minimal(),
            CleanupPreset::Standard => Self::standard(),
            CleanupPreset::Aggressive => Self::aggressive(),
        }
    }

    /// Minimal cleanup options.
    pub fn minimal() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: false,
            remove_replacement_char: true,
            remove_control_chars: true,
            remove_pua: false,
            standardize_bullets: false,
            fix_hyphenation: false,
            collapse_spaces: false,
            remove_empty_paragraphs: false,
        }
    }

    /// Standard cleanup options.
    pub fn standard() -> Self {
        Self {
            fix_ligatures: true,
            fix_hyphenation: true,
            collapse_spaces: true,
            remove_empty_paragraphs: true,
            ..Self::minimal()
        }
    }

    /// Aggressive cleanup options.
    pub fn aggressive() -> Self {
        Self {
            remove_pua: true,
            standardize_bullets: true,
            ..Self::standard()
        }
    }
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::standard()
    }
}

const LIGATURES: [(&str, &str); 7] = [
    ("\u{FB00}", "ff"),  // ﬀ
    ("\u{FB01}", "fi"),  // ﬁ
    ("\u{FB02}", "fl"),  // ﬂ
    ("\u{FB03}", "ffi"), // ﬃ
    ("\u{FB04}", "ffl"), // ﬄ
    ("\u{FB05}", "st"),  // ﬅ (long s + t)
    ("\u{FB06}", "st"),  // ﬆ
];

/// Text cleanup pipeline.
pub struct CleanupPipeline {
    options: CleanupOptions,
    hyphenation: Option<Regex>,
    spaces: Option<Regex>,
}

impl CleanupPipeline {
    /// Create a new cleanup pipeline with the given options.
    pub fn new(options: CleanupOptions) -> Self {
        Self {
            options,
            // "infor- mation" → "information"
            hyphenation: Regex::new(r"([a-zA-Z])- +([a-z])").ok(),
            spaces: Regex::new(r" {2,}").ok(),
        }
    }

    /// Create a pipeline from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        Self::new(CleanupOptions::from_preset(preset))
    }

    pub fn options(&self) -> &CleanupOptions {
        &self.options
    }

    /// Clean one span of text.
    pub fn process(&self, text: &str) -> String {
        let mut result: String = if self.options.normalize_unicode {
            text.nfc().collect()
        } else {
            text.to_string()
        };

        if self.options.fix_ligatures {
            for (ligature, replacement) in LIGATURES {
                result = result.replace(ligature, replacement);
            }
        }

        if self.options.remove_replacement_char {
            result = result.replace('\u{FFFD}', "");
        }

        if self.options.remove_control_chars || self.options.remove_pua {
            result.retain(|c| {
                !(self.options.remove_control_chars && is_xml_invalid(c)) && !(self.options.remove_pua && is_pua(c))
            });
        }

        if self.options.standardize_bullets {
            for bullet in ['●', '○', '■', '□', '◆', '◇', '▪', '▫', '►', '▻'] {
                result = result.replace(bullet, "•");
            }
        }

        if self.options.fix_hyphenation {
            if let Some(re) = &self.hyphenation {
                result = re.replace_all(&result, "$1$2").into_owned();
            }
        }

        if self.options.collapse_spaces {
            if let Some(re) = &self.spaces {
                result = re.replace_all(&result, " ").into_owned();
            }
        }

        result
    }

    /// Clean every text run in `blocks`, in place, and drop emptied
    /// paragraphs when configured. Table cells and images are kept.
    pub fn apply(&self, blocks: &mut Vec<DocBlock>) {
        for block in blocks.iter_mut() {
            self.clean_block(block);
        }
        if self.options.remove_empty_paragraphs {
            blocks.retain(|b| !matches!(b, DocBlock::Paragraph(p) if p.is_blank()));
        }
    }

    fn clean_block(&self, block: &mut DocBlock) {
        match block {
            DocBlock::Paragraph(p) => self.clean_paragraph(p),
            DocBlock::Table(table) => {
                for cell in table.rows.iter_mut().flatten() {
                    for inner in cell.blocks.iter_mut() {
                        self.clean_block(inner);
                    }
                    if self.options.remove_empty_paragraphs {
                        cell.blocks.retain(|b| !matches!(b, DocBlock::Paragraph(p) if p.is_blank()));
                    }
                }
            }
            DocBlock::Image(_) | DocBlock::PageBreak => {}
        }
    }

    fn clean_paragraph(&self, paragraph: &mut DocParagraph) {
        for run in paragraph.runs.iter_mut() {
            run.text = self.process(&run.text);
        }
        if self.options.remove_empty_paragraphs {
            paragraph.runs.retain(|r| !r.text.is_empty());
        }
    }
}

impl Default for CleanupPipeline {
    fn default() -> Self {
        Self::new(CleanupOptions::default())
    }
}

/// Characters that are not allowed in XML 1.0 documents.
fn is_xml_invalid(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}')
}

fn is_pua(c: char) -> bool {
    let code = c as u32;
    (0xE000..=0xF8FF).contains(&code) || (0xF0000..=0xFFFFD).contains(&code) || (0x100000..=0x10FFFD).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::writer::{DocCell, DocRun, DocTable};

    fn paragraph(text: &str) -> DocBlock {
        DocBlock::Paragraph(DocParagraph {
            runs: vec![DocRun::plain(text)],
            ..Default::default()
        })
    }

    #[test]
    fn test_unicode_normalization() {
        let pipeline = CleanupPipeline::from_preset(CleanupPreset::Minimal);
        let result = pipeline.process("cafe\u{301}");
        assert_eq!(result, "café");
    }

    #[test]
    fn test_ligature_fix() {
        let pipeline = CleanupPipeline::from_preset(CleanupPreset::Standard);
        assert_eq!(pipeline.process("ﬁnding ﬂowers"), "finding flowers");
    }

    #[test]
    fn test_invalid_characters_removed() {
        let pipeline = CleanupPipeline::from_preset(CleanupPreset::Minimal);
        assert_eq!(pipeline.process("Hello\u{FFFD}Wor\u{1}ld\tok"), "HelloWorld\tok");
    }

    #[test]
    fn test_hyphenation_and_spaces() {
        let pipeline = CleanupPipeline::from_preset(CleanupPreset::Standard);
        assert_eq!(pipeline.process("This is infor- mation   here"), "This is information here");
        // Hyphens followed by capitals are kept
        assert_eq!(pipeline.process("Jean- Paul"), "Jean- Paul");
    }

    #[test]
    fn test_aggressive_bullets_and_pua() {
        let pipeline = CleanupPipeline::from_preset(CleanupPreset::Aggressive);
        assert_eq!(pipeline.process("● Item\u{E000}"), "• Item");
        let standard = CleanupPipeline::from_preset(CleanupPreset::Standard);
        assert_eq!(standard.process("● Item"), "● Item");
    }

    #[test]
    fn test_apply_drops_empty_paragraphs() {
        let pipeline = CleanupPipeline::default();
        let mut blocks = vec![
            paragraph("Keep"),
            paragraph("\u{FFFD}"),
            DocBlock::PageBreak,
            DocBlock::Table(DocTable {
                column_widths: vec![100.0],
                rows: vec![vec![DocCell {
                    blocks: vec![paragraph("  "), paragraph("cell")],
                    col_span: 1,
                }]],
                bordered: false,
            }),
        ];
        pipeline.apply(&mut blocks);
        assert_eq!(blocks.len(), 3);
        let DocBlock::Table(table) = &blocks[2] else {
            panic!("expected table");
        };
        assert_eq!(table.rows[0][0].blocks.len(), 1);
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("Aggressive".parse::<CleanupPreset>(), Ok(CleanupPreset::Aggressive));
        assert!("loud".parse::<CleanupPreset>().is_err());
    }
}
