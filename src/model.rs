//! The tokenizer: a segmentation pattern bound to a finished vocabulary.

use std::path::Path;

use rayon::prelude::*;

use crate::decoder;
use crate::encoder::bpe_encode;
use crate::error::Result;
use crate::segment::Segmenter;
use crate::serialization;
use crate::vocab::{TokenId, Vocabulary};

/// Trained or loaded BPE tokenizer.
///
/// Immutable once constructed; share it across threads by reference or `Arc`.
#[must_use]
#[derive(Debug, Clone)]
pub struct Tokenizer {
    segmenter: Segmenter,
    vocab: Vocabulary,
}

impl Tokenizer {
    /// Binds `pattern` to `vocab`.
    pub fn new(pattern: &str, vocab: Vocabulary) -> Result<Self> {
        Ok(Self::from_parts(Segmenter::new(pattern)?, vocab))
    }

    pub(crate) fn from_parts(segmenter: Segmenter, vocab: Vocabulary) -> Self {
        Self { segmenter, vocab }
    }

    /// Returns the segmentation pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.segmenter.pattern()
    }

    /// Returns the segmenter compiled from the pattern.
    #[must_use]
    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Returns the vocabulary.
    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Encodes text: segments it, then merges each word's UTF-8 bytes.
    ///
    /// Only a regex runtime failure during segmentation can fail.
    pub fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let mut ids = Vec::with_capacity(text.len() / 2);
        self.segmenter
            .for_each_word(text, |word| ids.extend(bpe_encode(&self.vocab, word.as_bytes())))?;
        Ok(ids)
    }

    /// Encodes raw bytes as a single word, without segmentation.
    #[must_use]
    pub fn encode_bytes(&self, bytes: &[u8]) -> Vec<TokenId> {
        bpe_encode(&self.vocab, bytes)
    }

    /// Encodes many texts concurrently; results keep input order.
    pub fn encode_batch<S>(&self, texts: &[S]) -> Result<Vec<Vec<TokenId>>>
    where
        S: AsRef<str> + Sync,
    {
        texts
            .par_iter()
            .map(|text| self.encode(text.as_ref()))
            .collect()
    }

    /// Decodes ids into bytes; unknown ids are skipped.
    #[must_use]
    pub fn decode_bytes(&self, ids: &[TokenId]) -> Vec<u8> {
        decoder::decode_bytes(&self.vocab, ids)
    }

    /// Decodes ids into text, replacing invalid UTF-8 with U+FFFD.
    #[must_use]
    pub fn decode_text(&self, ids: &[TokenId]) -> String {
        decoder::decode_text(&self.vocab, ids)
    }

    /// Number of tokens `text` encodes to.
    pub fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.encode(text)?.len())
    }

    /// Keeps the first `max_tokens` tokens of `text` and decodes them back.
    ///
    /// A cut inside a multi-byte character shows up as U+FFFD at the end.
    pub fn truncate_to_tokens(&self, text: &str, max_tokens: usize) -> Result<String> {
        let ids = self.encode(text)?;
        if ids.len() <= max_tokens {
            return Ok(text.to_owned());
        }
        Ok(self.decode_text(&ids[..max_tokens]))
    }

    /// Persists the tokenizer as versioned JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P, pretty: bool) -> Result<()> {
        serialization::save_model(self, path, pretty)
    }

    /// Loads a tokenizer persisted with [`Tokenizer::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        serialization::load_model(path)
    }
}
