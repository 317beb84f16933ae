//! Sentence splitting.
//!
//! A sentence ends at a run of `.`, `!` or `?` followed by whitespace.  The
//! punctuation stays with the sentence it closes; the whitespace belongs to
//! neither.  Abbreviations ("Dr. Smith") split too, which is accepted.

use std::sync::OnceLock;

use regex::Regex;

/// One sentence of the selected text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    /// Byte offset of the first character in the source text.
    pub start_offset: usize,
    /// Byte offset one past the last character.
    pub end_offset: usize,
    pub index: usize,
}

impl Sentence {
    /// Length used for proportional timing.
    pub fn weight(&self) -> usize {
        self.text.chars().count()
    }
}

fn boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.!?]+\s+").expect("static regex"))
}

/// Split `text` into trimmed, non-empty sentences with contiguous indices.
///
/// `&text[s.start_offset..s.end_offset] == s.text` for every sentence.
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut cursor = 0;

    for m in boundary().find_iter(text) {
        let punct_end = m.start() + m.as_str().trim_end().len();
        push_fragment(text, cursor, punct_end, &mut sentences);
        cursor = m.end();
    }
    push_fragment(text, cursor, text.len(), &mut sentences);

    sentences
}

fn push_fragment(text: &str, from: usize, to: usize, out: &mut Vec<Sentence>) {
    let raw = &text[from..to];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let start = from + (raw.len() - raw.trim_start().len());
    out.push(Sentence {
        text: trimmed.to_string(),
        start_offset: start,
        end_offset: start + trimmed.len(),
        index: out.len(),
    });
}
