//! Expansion of token ids back into bytes and text.

use log::trace;

use crate::vocab::{TokenId, Vocabulary};

/// Concatenates the byte sequence of each id in order.
///
/// Ids missing from `vocab` contribute nothing, so decoding is total over
/// arbitrary id sequences.
#[must_use]
pub fn decode_bytes(vocab: &Vocabulary, ids: &[TokenId]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(ids.len() * 2);
    for &id in ids {
        match vocab.token_bytes(id) {
            Some(token) => bytes.extend_from_slice(token),
            None => trace!("skipping unknown token id {id}"),
        }
    }
    bytes
}

/// Decodes ids into text, replacing invalid UTF-8 with U+FFFD.
#[must_use]
pub fn decode_text(vocab: &Vocabulary, ids: &[TokenId]) -> String {
    String::from_utf8_lossy(&decode_bytes(vocab, ids)).into_owned()
}
