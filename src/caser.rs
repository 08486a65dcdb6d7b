//! Keyword Caser
//!
//! Pure per-line pass over document text that rewrites recognized ABAP
//! keywords to a configured case. Produces edits only; the client applies
//! them.

use regex::Regex;

use crate::keywords::KeywordSet;

/// Target letter-case for matched keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Lower,
    Upper,
}

impl CaseMode {
    pub fn apply(&self, word: &str) -> String {
        match self {
            CaseMode::Lower => word.to_lowercase(),
            CaseMode::Upper => word.to_uppercase(),
        }
    }
}

/// A single replacement within the document, with offsets in UTF-16 code
/// units (the LSP default position encoding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReplacement {
    pub line: u32,
    pub start: u32,
    pub end: u32,
    pub text: String,
}

/// Matches keywords and emits case-normalizing replacements.
#[derive(Debug, Clone)]
pub struct KeywordCaser {
    pattern: Regex,
}

impl KeywordCaser {
    /// Compile the alternation over the given keyword set.
    ///
    /// The set is already sorted longest-first; alternation tries branches
    /// left to right, so that ordering is what keeps `END` from shadowing
    /// `ENDFORM`. Words are escaped before joining, so hyphenated keywords
    /// like `FIELD-SYMBOLS` are matched literally.
    pub fn new(keywords: &KeywordSet) -> Self {
        let alternation: Vec<String> = keywords
            .words()
            .iter()
            .map(|w| regex::escape(w))
            .collect();
        let source = format!("(?i){}", alternation.join("|"));

        // The alternation is built from escaped literals only, so it always
        // compiles; an empty set degenerates to a match-nothing pattern.
        let pattern = if keywords.is_empty() {
            Regex::new("$^").expect("static pattern compiles")
        } else {
            Regex::new(&source).expect("escaped literal alternation compiles")
        };

        Self { pattern }
    }

    /// Scan `text` line by line and return one replacement per keyword
    /// occurrence whose case differs from `mode`.
    ///
    /// Spans come straight from the match iterator, so duplicate keywords on
    /// one line each get their own span. Offsets are in UTF-16 code units,
    /// the LSP default position encoding.
    pub fn edits(&self, text: &str, mode: CaseMode) -> Vec<TextReplacement> {
        let mut replacements = Vec::new();

        for (line_idx, line) in text.lines().enumerate() {
            for m in self.pattern.find_iter(line) {
                let matched = m.as_str();
                let cased = mode.apply(matched);
                if cased == matched {
                    continue;
                }

                let start = line[..m.start()].encode_utf16().count() as u32;
                let len = matched.encode_utf16().count() as u32;
                replacements.push(TextReplacement {
                    line: line_idx as u32,
                    start,
                    end: start + len,
                    text: cased,
                });
            }
        }

        replacements
    }
}
