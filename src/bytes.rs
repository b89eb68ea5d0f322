//! Printable string representation of raw token bytes.
//!
//! Persisted vocabularies store each token as a string over the GPT-2 byte-level
//! alphabet: printable Latin-1 bytes map to themselves and every other byte is
//! shifted into the `U+0100..` range. The mapping is a bijection, so any byte
//! sequence (valid UTF-8 or not) survives a JSON round trip unchanged.

use std::collections::HashMap;
use std::sync::OnceLock;

struct ByteAlphabet {
    forward: [char; 256],
    reverse: HashMap<char, u8>,
}

fn alphabet() -> &'static ByteAlphabet {
    static ALPHABET: OnceLock<ByteAlphabet> = OnceLock::new();
    ALPHABET.get_or_init(|| {
        let mut forward = ['\0'; 256];
        let mut reverse = HashMap::with_capacity(256);
        let mut shifted = 0u32;
        for byte in 0u8..=u8::MAX {
            let printable = matches!(byte, b'!'..=b'~' | 0xA1..=0xAC | 0xAE..=0xFF);
            let codepoint = if printable {
                u32::from(byte)
            } else {
                shifted += 1;
                255 + shifted
            };
            // 0x100..=0x143 are all valid scalar values.
            let ch = char::from_u32(codepoint).unwrap_or(char::REPLACEMENT_CHARACTER);
            forward[byte as usize] = ch;
            reverse.insert(ch, byte);
        }
        ByteAlphabet { forward, reverse }
    })
}

/// Converts raw bytes into their byte-level string form.
#[must_use]
pub fn bytes_to_token_string(bytes: &[u8]) -> String {
    let table = &alphabet().forward;
    bytes.iter().map(|&b| table[b as usize]).collect()
}

/// Converts a byte-level string back into raw bytes.
///
/// Returns `None` when `text` contains a character outside the alphabet.
#[must_use]
pub fn token_string_to_bytes(text: &str) -> Option<Vec<u8>> {
    let reverse = &alphabet().reverse;
    text.chars().map(|c| reverse.get(&c).copied()).collect()
}
