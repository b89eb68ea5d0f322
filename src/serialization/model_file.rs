//! JSON model schema: `{format, version, pattern, vocab: [{rank, token}]}`.
//!
//! The schema is independent of the in-memory layout. Entries are written in
//! rank order and token bytes use the byte-level alphabet from [`crate::bytes`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bytes::{bytes_to_token_string, token_string_to_bytes};
use crate::error::{Result, SbpeError};
use crate::model::Tokenizer;
use crate::vocab::{TokenId, Vocabulary};

/// Value of the `format` field.
pub const FORMAT_NAME: &str = "sbpe";
/// Schema version written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// On-disk representation of a tokenizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelFile {
    /// Always [`FORMAT_NAME`].
    pub format: String,
    /// Schema version.
    pub version: u32,
    /// Segmentation pattern.
    pub pattern: String,
    /// Vocabulary entries in rank order.
    pub vocab: Vec<VocabEntry>,
}

/// A single persisted vocabulary entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VocabEntry {
    /// Rank of the entry.
    pub rank: TokenId,
    /// Token bytes in byte-level string form.
    pub token: String,
}

impl ModelFile {
    /// Captures `tokenizer` in schema form.
    pub fn from_tokenizer(tokenizer: &Tokenizer) -> Self {
        let vocab = tokenizer
            .vocabulary()
            .iter()
            .map(|(rank, bytes)| VocabEntry {
                rank,
                token: bytes_to_token_string(bytes),
            })
            .collect();
        Self {
            format: FORMAT_NAME.to_owned(),
            version: FORMAT_VERSION,
            pattern: tokenizer.pattern().to_owned(),
            vocab,
        }
    }

    /// Rebuilds the tokenizer, checking the schema and vocabulary invariants.
    pub fn into_tokenizer(self) -> Result<Tokenizer> {
        if self.format != FORMAT_NAME {
            return Err(SbpeError::InvalidModel(format!(
                "unexpected format {:?}, expected {FORMAT_NAME:?}",
                self.format
            )));
        }
        if self.version != FORMAT_VERSION {
            return Err(SbpeError::InvalidModel(format!(
                "unsupported schema version {} (this build reads version {FORMAT_VERSION})",
                self.version
            )));
        }

        let mut tokens = Vec::with_capacity(self.vocab.len());
        for (position, entry) in self.vocab.into_iter().enumerate() {
            if entry.rank as usize != position {
                return Err(SbpeError::InvalidModel(format!(
                    "entry {position} carries rank {}; ranks must be contiguous and ordered",
                    entry.rank
                )));
            }
            let bytes = token_string_to_bytes(&entry.token).ok_or_else(|| {
                SbpeError::InvalidModel(format!(
                    "rank {} holds characters outside the byte alphabet",
                    entry.rank
                ))
            })?;
            tokens.push(bytes);
        }

        let vocab = Vocabulary::from_tokens(tokens)?;
        Tokenizer::new(&self.pattern, vocab)
    }
}

/// Serialises `tokenizer` to a JSON string.
pub fn to_json(tokenizer: &Tokenizer, pretty: bool) -> Result<String> {
    let file = ModelFile::from_tokenizer(tokenizer);
    let json = if pretty {
        serde_json::to_string_pretty(&file)?
    } else {
        serde_json::to_string(&file)?
    };
    Ok(json)
}

/// Parses a tokenizer from a JSON string.
pub fn from_json(json: &str) -> Result<Tokenizer> {
    let file: ModelFile = serde_json::from_str(json)?;
    file.into_tokenizer()
}

/// Writes `tokenizer` to `path`.
pub fn save_model<P: AsRef<Path>>(tokenizer: &Tokenizer, path: P, pretty: bool) -> Result<()> {
    let json = to_json(tokenizer, pretty)?;
    fs::write(path.as_ref(), json)
        .map_err(|err| SbpeError::io(err, Some(path.as_ref().to_path_buf())))
}

/// Reads a tokenizer from `path`; a missing file yields [`SbpeError::MissingModel`].
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Tokenizer> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SbpeError::MissingModel(path.to_path_buf()));
    }
    let json =
        fs::read_to_string(path).map_err(|err| SbpeError::io(err, Some(path.to_path_buf())))?;
    from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::DEFAULT_PATTERN;
    use crate::trainer::train;
    use serde_json::Value;
    use tempfile::tempdir;

    fn trained() -> Tokenizer {
        train(
            "Hello, world! `code` here, ünïcødé there. Hello, world!",
            300,
            DEFAULT_PATTERN,
        )
        .unwrap()
    }

    #[test]
    fn save_and_reload_preserves_ranks_and_behaviour() {
        let tokenizer = trained();
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        tokenizer.save(&path, false).unwrap();

        let reloaded = Tokenizer::load(&path).unwrap();
        assert_eq!(reloaded.pattern(), tokenizer.pattern());
        assert_eq!(reloaded.vocabulary(), tokenizer.vocabulary());

        let text = "Hello, ünïcødé world with `code`";
        assert_eq!(reloaded.encode(text).unwrap(), tokenizer.encode(text).unwrap());
    }

    #[test]
    fn json_layout_is_versioned_and_rank_ordered() {
        let json = to_json(&trained(), true).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["format"], FORMAT_NAME);
        assert_eq!(value["version"], FORMAT_VERSION);
        assert_eq!(value["pattern"], DEFAULT_PATTERN);
        let entries = value["vocab"].as_array().unwrap();
        assert_eq!(entries[32]["rank"], 32);
        assert_eq!(entries[32]["token"], "\u{120}");
        assert_eq!(entries[97]["token"], "a");
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let err = load_model(dir.path().join("absent.json")).expect_err("must fail");
        assert!(matches!(err, SbpeError::MissingModel(_)));
    }

    #[test]
    fn tampered_models_are_rejected() {
        let tokenizer = trained();
        let good = ModelFile::from_tokenizer(&tokenizer);

        let mut wrong_version = good.clone();
        wrong_version.version = FORMAT_VERSION + 1;
        assert!(matches!(
            wrong_version.into_tokenizer(),
            Err(SbpeError::InvalidModel(_))
        ));

        let mut renumbered = good.clone();
        renumbered.vocab[10].rank = 11;
        assert!(renumbered.into_tokenizer().is_err());

        let last = good.vocab.len() - 1;
        assert!(last > 256, "corpus must yield at least two merges");

        let mut duplicated = good.clone();
        let copy = duplicated.vocab[last].token.clone();
        duplicated.vocab[last - 1].token = copy;
        assert!(duplicated.into_tokenizer().is_err());

        let mut foreign = good.clone();
        foreign.vocab[last].token = "\u{4e2d}".into();
        assert!(foreign.into_tokenizer().is_err());

        let mut other_format = good;
        other_format.format = "pickle".into();
        assert!(other_format.into_tokenizer().is_err());

        assert!(matches!(
            from_json("{not json"),
            Err(SbpeError::Serialization(_))
        ));
    }
}
