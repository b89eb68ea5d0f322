//! Greedy lowest-rank merge of a byte string into token ids.

use crate::vocab::{TokenId, Vocabulary};

#[derive(Clone, Copy)]
struct Part {
    start: usize,
    rank: TokenId,
}

/// Encodes `input` as a single word.
///
/// Starts from one part per byte and repeatedly merges the adjacent pair whose
/// concatenation has the lowest rank in `vocab` (leftmost on ties) until no
/// adjacent concatenation is a vocabulary entry. Total over all byte strings,
/// since every single byte has a rank.
#[must_use]
pub fn bpe_encode(vocab: &Vocabulary, input: &[u8]) -> Vec<TokenId> {
    let mut parts: Vec<Part> = input
        .iter()
        .enumerate()
        .map(|(start, &byte)| Part {
            start,
            rank: TokenId::from(byte),
        })
        .collect();

    while parts.len() > 1 {
        let mut best: Option<(usize, TokenId)> = None;
        for idx in 0..parts.len() - 1 {
            let end = parts
                .get(idx + 2)
                .map_or(input.len(), |next| next.start);
            let Some(rank) = vocab.rank_of(&input[parts[idx].start..end]) else {
                continue;
            };
            if best.map_or(true, |(_, best_rank)| rank < best_rank) {
                best = Some((idx, rank));
            }
        }

        let Some((idx, rank)) = best else {
            break;
        };
        parts[idx].rank = rank;
        parts.remove(idx + 1);
    }

    parts.into_iter().map(|part| part.rank).collect()
}
