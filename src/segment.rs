//! Pattern-driven pre-segmentation of raw text into BPE words.
//!
//! Words are the leftmost, non-overlapping matches of the segmentation pattern.
//! Text between two matches is not part of any word. When the pattern carries
//! capture groups, the participating groups of a single match are joined in
//! group order to form the word.

use fancy_regex::Regex;

use crate::error::{Result, SbpeError};

/// Default segmentation pattern.
///
/// Fenced code blocks, inline code spans, and markdown links (each optionally
/// space-prefixed) come first so they are matched as single atomic words before
/// the symbol-run alternative can split their delimiters. The remaining
/// alternatives follow the usual GPT-2 layout: contractions, optionally
/// space-prefixed letter, number, and symbol runs, then whitespace with a
/// trailing-space look-ahead.
pub const DEFAULT_PATTERN: &str = r#"( ?```[\s\S]*?```)|( ?`[^`]*`)|( ?\[[^\]]*\]\([^)]*\))|('s|'t|'re|'ve|'m|'ll|'d| ?[\p{L}]+| ?[\p{N}]+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+)"#;

/// Splits text into words with a compiled segmentation pattern.
#[derive(Debug, Clone)]
pub struct Segmenter {
    regex: Regex,
    groups: usize,
}

impl Segmenter {
    /// Compiles `pattern` into a segmenter.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|err| SbpeError::InvalidPattern(err.to_string()))?;
        let groups = regex.captures_len().saturating_sub(1);
        Ok(Self { regex, groups })
    }

    /// Returns the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Invokes `f` with every word of `text`, in order.
    pub fn for_each_word<F>(&self, text: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        if self.groups == 0 {
            for found in self.regex.find_iter(text) {
                let m = found.map_err(|err| SbpeError::Segmentation(err.to_string()))?;
                f(m.as_str());
            }
            return Ok(());
        }

        let mut joined = String::new();
        for captures in self.regex.captures_iter(text) {
            let captures = captures.map_err(|err| SbpeError::Segmentation(err.to_string()))?;
            joined.clear();
            for group in captures.iter().skip(1).flatten() {
                joined.push_str(group.as_str());
            }
            f(&joined);
        }
        Ok(())
    }

    /// Collects the words of `text` into owned strings.
    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        let mut words = Vec::new();
        self.for_each_word(text, |word| words.push(word.to_owned()))?;
        Ok(words)
    }

    /// Counts the words of `text` without allocating them.
    pub fn count_words(&self, text: &str) -> Result<usize> {
        let mut count = 0usize;
        self.for_each_word(text, |_| count += 1)?;
        Ok(count)
    }
}
