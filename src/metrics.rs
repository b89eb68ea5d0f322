//! Structured record of a training run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::vocab::TokenId;

/// Reason a training run terminated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The configured target vocabulary size was reached.
    TargetVocabReached,
    /// No adjacent pair remained in any word.
    NoPairsRemaining,
}

/// One merge round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeRecord {
    /// Sequential round number (1-indexed).
    pub round: usize,
    /// Rank of the merged byte sequence.
    pub rank: TokenId,
    /// Merged byte sequence.
    pub bytes: Vec<u8>,
    /// Corpus-wide count of the selected pair.
    pub frequency: usize,
    /// Number of pair occurrences rewritten across the corpus.
    pub merges_applied: usize,
    /// Distinct adjacent pairs counted in this round.
    pub distinct_pairs: usize,
    /// `true` when the merged sequence already had a rank and no entry was added.
    pub reused_rank: bool,
    /// Execution time for the round.
    pub elapsed: Duration,
}

/// Aggregate metrics produced by a training session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainingMetrics {
    /// Number of words produced by segmentation (before pooling).
    pub words: usize,
    /// Number of distinct words after pooling.
    pub distinct_words: usize,
    /// Merge log in round order.
    pub merges: Vec<MergeRecord>,
    /// Total duration of the training session.
    pub total_duration: Duration,
    /// Reason training terminated.
    pub stop_reason: StopReason,
}

impl TrainingMetrics {
    /// Creates an empty metrics container with pre-allocated capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: 0,
            distinct_words: 0,
            merges: Vec::with_capacity(capacity),
            total_duration: Duration::ZERO,
            stop_reason: StopReason::TargetVocabReached,
        }
    }

    /// Byte sequences added to the vocabulary, in rank order.
    pub fn learned_tokens(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.merges
            .iter()
            .filter(|record| !record.reused_rank)
            .map(|record| record.bytes.as_slice())
    }
}
