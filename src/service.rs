//! Load-or-train lifecycle around a persisted tokenizer.
//!
//! [`TokenizerService::initialize`] trains and saves a model when none exists,
//! then loads it from disk and runs the validation gate before handing it out.

use std::fs;
use std::io::ErrorKind;

use log::{info, warn};

use crate::config::{ServiceConfig, TrainerConfig};
use crate::error::{Result, SbpeError};
use crate::model::Tokenizer;
use crate::segment::Segmenter;
use crate::trainer::Trainer;
use crate::validate::ensure_valid;
use crate::vocab::BYTE_VOCAB_SIZE;

/// Corpus used when the configured training data file does not exist.
pub const FALLBACK_CORPUS: &str = "Hello world!";

/// Suggests a vocabulary size for a corpus of `word_count` segmented words.
///
/// Twice the word count, rounded to the nearest multiple of 256 (remainders
/// below 128 round down) and never smaller than 256.
#[must_use]
pub fn suggested_vocab_size(word_count: usize) -> usize {
    let doubled = word_count.saturating_mul(2);
    let remainder = doubled % BYTE_VOCAB_SIZE;
    let rounded = if remainder < BYTE_VOCAB_SIZE / 2 {
        doubled - remainder
    } else {
        doubled.saturating_add(BYTE_VOCAB_SIZE - remainder)
    };
    rounded.max(BYTE_VOCAB_SIZE)
}

/// Owns a validated tokenizer backed by a model file.
#[derive(Debug, Clone)]
pub struct TokenizerService {
    tokenizer: Tokenizer,
    cfg: ServiceConfig,
}

impl TokenizerService {
    /// Ensures a model exists at `cfg.model_path`, training one if needed, then
    /// loads and validates it.
    ///
    /// A freshly trained model that fails validation is never written to disk.
    pub fn initialize(cfg: ServiceConfig) -> Result<Self> {
        if cfg.model_path.exists() {
            info!("found existing model at {}", cfg.model_path.display());
        } else {
            info!(
                "no model at {}; training from {}",
                cfg.model_path.display(),
                cfg.training_data_path.display()
            );
            let tokenizer = train_for(&cfg)?;
            ensure_valid(&tokenizer, &cfg.validation_samples)?;
            if let Some(parent) = cfg.model_path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)
                        .map_err(|err| SbpeError::io(err, Some(parent.to_path_buf())))?;
                }
            }
            tokenizer.save(&cfg.model_path, false)?;
            info!("saved model to {}", cfg.model_path.display());
        }
        Self::load(cfg)
    }

    /// Loads and validates the model at `cfg.model_path` without training.
    pub fn load(cfg: ServiceConfig) -> Result<Self> {
        let tokenizer = Tokenizer::load(&cfg.model_path)?;
        ensure_valid(&tokenizer, &cfg.validation_samples)?;
        info!(
            "loaded model {} with vocab size {}",
            cfg.model_path.display(),
            tokenizer.vocabulary().len()
        );
        Ok(Self { tokenizer, cfg })
    }

    /// Returns the validated tokenizer.
    #[must_use]
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Returns the configuration the service was built from.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.cfg
    }

    /// Consumes the service, returning its tokenizer.
    #[must_use]
    pub fn into_tokenizer(self) -> Tokenizer {
        self.tokenizer
    }
}

fn read_training_data(cfg: &ServiceConfig) -> Result<String> {
    match fs::read(&cfg.training_data_path) {
        Ok(raw) => Ok(String::from_utf8_lossy(&raw).into_owned()),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(
                "training data {} not found; using fallback corpus",
                cfg.training_data_path.display()
            );
            Ok(FALLBACK_CORPUS.to_owned())
        }
        Err(err) => Err(SbpeError::io(err, Some(cfg.training_data_path.clone()))),
    }
}

fn train_for(cfg: &ServiceConfig) -> Result<Tokenizer> {
    let corpus = read_training_data(cfg)?;
    let vocab_size = match cfg.vocab_size {
        Some(size) => size,
        None => {
            let words = Segmenter::new(&cfg.pattern)?.count_words(&corpus)?;
            let size = suggested_vocab_size(words);
            info!("corpus has {words} words; using vocab size {size}");
            size
        }
    };
    let trainer = Trainer::new(TrainerConfig {
        vocab_size,
        pattern: cfg.pattern.clone(),
        show_progress: cfg.show_progress,
    });
    Ok(trainer.train(&corpus)?.tokenizer)
}
