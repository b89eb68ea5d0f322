//! Configuration builders controlling training, corpus ingestion, and the tokenizer service.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SbpeError};
use crate::segment::DEFAULT_PATTERN;
use crate::validate::DEFAULT_VALIDATION_SAMPLES;
use crate::vocab::BYTE_VOCAB_SIZE;

/// Environment variable naming the persisted model path.
pub const MODEL_PATH_ENV: &str = "MODEL_PATH";
/// Environment variable naming the training corpus path.
pub const TRAINING_DATA_PATH_ENV: &str = "TRAINING_DATA_PATH";
/// Environment variable overriding the segmentation pattern.
pub const PATTERN_ENV: &str = "PAT_STR";

/// Default location of the persisted model.
pub const DEFAULT_MODEL_PATH: &str = "tokenizer.json";
/// Default location of the training corpus.
pub const DEFAULT_TRAINING_DATA_PATH: &str = "sample-training-data.log";

/// Configuration for BPE training.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainerConfig {
    /// Target vocabulary size including the 256 base byte tokens.
    pub vocab_size: usize,
    /// Segmentation pattern applied to the corpus and persisted with the model.
    pub pattern: String,
    /// Enables per-merge logging through the `log` facade.
    pub show_progress: bool,
}

impl TrainerConfig {
    /// Returns a builder initialised with [`TrainerConfig::default`].
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    /// Validates the invariants required for training.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size < BYTE_VOCAB_SIZE {
            return Err(SbpeError::InvalidArgument(format!(
                "vocab_size ({}) must be at least {BYTE_VOCAB_SIZE} so every byte can be encoded",
                self.vocab_size
            )));
        }
        let max_vocab = usize::try_from(u32::MAX).unwrap_or(usize::MAX);
        if self.vocab_size > max_vocab {
            return Err(SbpeError::InvalidArgument(format!(
                "vocab_size ({}) exceeds {max_vocab}, the maximum representable TokenId",
                self.vocab_size
            )));
        }
        Ok(())
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            vocab_size: 1024,
            pattern: DEFAULT_PATTERN.to_owned(),
            show_progress: true,
        }
    }
}

/// Builder for [`TrainerConfig`].
#[derive(Debug, Default, Clone)]
pub struct TrainerBuilder {
    cfg: TrainerConfig,
}

impl TrainerBuilder {
    /// Creates a builder with [`TrainerConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the desired vocabulary size (including base byte tokens).
    #[must_use]
    pub fn vocab_size(mut self, value: usize) -> Self {
        self.cfg.vocab_size = value;
        self
    }

    /// Sets the segmentation pattern.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.cfg.pattern = pattern.into();
        self
    }

    /// Enables or disables per-merge logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`TrainerConfig`].
    pub fn build(self) -> Result<TrainerConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how text corpora are discovered on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
        }
    }
}

/// Settings for the load-or-train [`TokenizerService`](crate::service::TokenizerService).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Where the trained model is persisted and loaded from.
    pub model_path: PathBuf,
    /// Corpus used when no model exists yet.
    pub training_data_path: PathBuf,
    /// Segmentation pattern used when training a new model.
    pub pattern: String,
    /// Explicit vocabulary size; `None` derives one from the corpus.
    pub vocab_size: Option<usize>,
    /// Samples every trained or loaded model must round trip.
    pub validation_samples: Vec<String>,
    /// Enables per-merge logging while training.
    pub show_progress: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            training_data_path: PathBuf::from(DEFAULT_TRAINING_DATA_PATH),
            pattern: DEFAULT_PATTERN.to_owned(),
            vocab_size: None,
            validation_samples: DEFAULT_VALIDATION_SAMPLES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            show_progress: false,
        }
    }
}

impl ServiceConfig {
    /// Returns a builder initialised with [`ServiceConfig::default`].
    #[must_use]
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::default()
    }

    /// Reads `MODEL_PATH`, `TRAINING_DATA_PATH`, and `PAT_STR`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(path) = env::var_os(MODEL_PATH_ENV) {
            cfg.model_path = PathBuf::from(path);
        }
        if let Some(path) = env::var_os(TRAINING_DATA_PATH_ENV) {
            cfg.training_data_path = PathBuf::from(path);
        }
        if let Ok(pattern) = env::var(PATTERN_ENV) {
            cfg.pattern = pattern;
        }
        cfg
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Default, Clone)]
pub struct ServiceBuilder {
    cfg: ServiceConfig,
}

impl ServiceBuilder {
    /// Sets the model path.
    #[must_use]
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cfg.model_path = path.into();
        self
    }

    /// Sets the training corpus path.
    #[must_use]
    pub fn training_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cfg.training_data_path = path.into();
        self
    }

    /// Sets the segmentation pattern.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.cfg.pattern = pattern.into();
        self
    }

    /// Pins the vocabulary size instead of deriving it from the corpus.
    #[must_use]
    pub fn vocab_size(mut self, value: Option<usize>) -> Self {
        self.cfg.vocab_size = value;
        self
    }

    /// Replaces the validation samples.
    #[must_use]
    pub fn validation_samples<I, S>(mut self, samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.validation_samples = samples.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables per-merge logging while training.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder.
    pub fn build(self) -> Result<ServiceConfig> {
        if let Some(size) = self.cfg.vocab_size {
            if size < BYTE_VOCAB_SIZE {
                return Err(SbpeError::InvalidArgument(format!(
                    "vocab_size ({size}) must be at least {BYTE_VOCAB_SIZE}"
                )));
            }
        }
        Ok(self.cfg)
    }
}
