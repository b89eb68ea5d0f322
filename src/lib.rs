//! Byte-level BPE tokenizer with pattern-based pre-segmentation.
//!
//! Text is split into words by a regular expression, each word's UTF-8 bytes
//! are merged according to a learned vocabulary, and ids decode back to the
//! original bytes. The crate exposes a library API and an `sbpe` command line
//! interface for training, encoding, decoding, and validating tokenizers.
//!
//! ```no_run
//! use sbpe::{Tokenizer, Trainer, TrainerConfig, DEFAULT_VALIDATION_SAMPLES};
//!
//! # fn main() -> sbpe::Result<()> {
//! let cfg = TrainerConfig::builder()
//!     .vocab_size(1024)
//!     .show_progress(false)
//!     .build()?;
//! let artifacts = Trainer::new(cfg).train("Hello there! Can you assist me with my code?")?;
//! sbpe::ensure_valid(&artifacts.tokenizer, DEFAULT_VALIDATION_SAMPLES)?;
//! artifacts.tokenizer.save("tokenizer.json", false)?;
//!
//! let tokenizer = Tokenizer::load("tokenizer.json")?;
//! let ids = tokenizer.encode("Hello, world!")?;
//! assert_eq!(tokenizer.decode_text(&ids), "Hello, world!");
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature. Library users can
//! drop its dependencies with `sbpe = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod bytes;
pub mod config;
pub mod corpus;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod model;
pub mod segment;
pub mod serialization;
pub mod service;
pub mod trainer;
pub mod validate;
pub mod vocab;

pub use config::{IngestConfig, ServiceBuilder, ServiceConfig, TrainerBuilder, TrainerConfig};
pub use error::{Result, SbpeError};
pub use metrics::{MergeRecord, StopReason, TrainingMetrics};
pub use model::Tokenizer;
pub use segment::{Segmenter, DEFAULT_PATTERN};
pub use service::{suggested_vocab_size, TokenizerService};
pub use trainer::{train, Trainer, TrainerArtifacts};
pub use validate::{ensure_valid, validate, DEFAULT_VALIDATION_SAMPLES};
pub use vocab::{TokenId, Vocabulary, BYTE_VOCAB_SIZE};
