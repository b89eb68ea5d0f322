//! Bidirectional mapping between byte sequences and ranks.

use rustc_hash::FxHashMap;

use crate::error::{Result, SbpeError};

/// Token identifier (rank) used throughout the crate.
pub type TokenId = u32;
/// Adjacent part pair encoded as `(left, right)` ranks.
pub type Pair = (TokenId, TokenId);

/// Number of single-byte tokens that seed every vocabulary.
pub const BYTE_VOCAB_SIZE: usize = 256;

/// Learned vocabulary: a bijection between byte sequences and ranks.
///
/// Ranks `0..256` always hold the single bytes in numeric order. Every later rank
/// was assigned in creation order, so `token_bytes(r)` for `r >= 256` is the
/// `r - 256`-th merged sequence produced during training.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    tokens: Vec<Vec<u8>>,
    ranks: FxHashMap<Vec<u8>, TokenId>,
}

impl Vocabulary {
    /// Creates a vocabulary holding only the 256 single-byte tokens.
    #[must_use]
    pub fn new() -> Self {
        let tokens: Vec<Vec<u8>> = (0u8..=u8::MAX).map(|b| vec![b]).collect();
        let ranks = tokens
            .iter()
            .enumerate()
            .map(|(rank, bytes)| (bytes.clone(), rank as TokenId))
            .collect();
        Self { tokens, ranks }
    }

    /// Rebuilds a vocabulary from rank-ordered byte sequences.
    ///
    /// Rejects inputs that break the byte-coverage or bijection invariants.
    pub fn from_tokens(tokens: Vec<Vec<u8>>) -> Result<Self> {
        if tokens.len() < BYTE_VOCAB_SIZE {
            return Err(SbpeError::InvalidModel(format!(
                "vocabulary holds {} entries, fewer than the {BYTE_VOCAB_SIZE} byte tokens",
                tokens.len()
            )));
        }
        if TokenId::try_from(tokens.len()).is_err() {
            return Err(SbpeError::InvalidModel(format!(
                "vocabulary holds {} entries, more than a TokenId can address",
                tokens.len()
            )));
        }
        for (rank, bytes) in tokens.iter().take(BYTE_VOCAB_SIZE).enumerate() {
            if *bytes != [rank as u8] {
                return Err(SbpeError::InvalidModel(format!(
                    "rank {rank} must hold the single byte {rank:#04x}"
                )));
            }
        }

        let mut ranks = FxHashMap::default();
        ranks.reserve(tokens.len());
        for (rank, bytes) in tokens.iter().enumerate() {
            if bytes.is_empty() {
                return Err(SbpeError::InvalidModel(format!(
                    "rank {rank} holds an empty byte sequence"
                )));
            }
            if let Some(previous) = ranks.insert(bytes.clone(), rank as TokenId) {
                return Err(SbpeError::InvalidModel(format!(
                    "ranks {previous} and {rank} hold the same byte sequence"
                )));
            }
        }
        Ok(Self { tokens, ranks })
    }

    /// Appends `bytes` at the next rank and returns it.
    pub(crate) fn push(&mut self, bytes: Vec<u8>) -> Result<TokenId> {
        if self.ranks.contains_key(&bytes) {
            return Err(SbpeError::Internal(
                "byte sequence is already present in the vocabulary".into(),
            ));
        }
        let rank = TokenId::try_from(self.tokens.len())
            .map_err(|_| SbpeError::Internal("vocabulary size exceeded u32::MAX".into()))?;
        self.ranks.insert(bytes.clone(), rank);
        self.tokens.push(bytes);
        Ok(rank)
    }

    /// Returns the rank of `bytes`, if present.
    #[inline]
    #[must_use]
    pub fn rank_of(&self, bytes: &[u8]) -> Option<TokenId> {
        self.ranks.get(bytes).copied()
    }

    /// Returns the byte sequence stored at `rank`, if present.
    #[inline]
    #[must_use]
    pub fn token_bytes(&self, rank: TokenId) -> Option<&[u8]> {
        self.tokens.get(rank as usize).map(Vec::as_slice)
    }

    /// Returns `true` when `bytes` is a vocabulary entry.
    #[must_use]
    pub fn contains(&self, bytes: &[u8]) -> bool {
        self.ranks.contains_key(bytes)
    }

    /// Total number of entries, including the 256 byte tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` when the vocabulary holds no entries, which a valid one never does.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of entries learned beyond the byte alphabet.
    #[must_use]
    pub fn merged_len(&self) -> usize {
        self.tokens.len() - BYTE_VOCAB_SIZE
    }

    /// Iterates `(rank, bytes)` in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &[u8])> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .map(|(rank, bytes)| (rank as TokenId, bytes.as_slice()))
    }

    /// Returns the rank-ordered byte sequences.
    #[must_use]
    pub fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}
