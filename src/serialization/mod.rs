//! Versioned persistence of tokenizers.

pub mod model_file;

pub use model_file::{
    from_json, load_model, save_model, to_json, ModelFile, VocabEntry, FORMAT_NAME, FORMAT_VERSION,
};
