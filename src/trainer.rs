//! Core training loop: iterative highest-frequency pair merging.

use std::collections::hash_map::Entry;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use bstr::ByteSlice;
use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::config::{IngestConfig, TrainerBuilder, TrainerConfig};
use crate::corpus::load_text_corpus;
use crate::error::{Result, SbpeError};
use crate::metrics::{MergeRecord, StopReason, TrainingMetrics};
use crate::model::Tokenizer;
use crate::segment::Segmenter;
use crate::vocab::{Pair, TokenId, Vocabulary, BYTE_VOCAB_SIZE};

mod word;

use word::Word;

/// Trains a tokenizer on `corpus` with the given vocabulary size and pattern.
///
/// Fails with [`SbpeError::InvalidArgument`] before any segmentation when
/// `vocab_size < 256`.
pub fn train(corpus: &str, vocab_size: usize, pattern: &str) -> Result<Tokenizer> {
    let cfg = TrainerConfig {
        vocab_size,
        pattern: pattern.to_owned(),
        show_progress: false,
    };
    Ok(Trainer::new(cfg).train(corpus)?.tokenizer)
}

/// High-level façade configuring and executing BPE training runs.
#[derive(Debug, Clone)]
pub struct Trainer {
    cfg: TrainerConfig,
}

/// Artifacts returned after a training session completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct TrainerArtifacts {
    /// Trained tokenizer (pattern plus finished vocabulary).
    pub tokenizer: Tokenizer,
    /// Merge log and summary of the run.
    pub metrics: TrainingMetrics,
}

impl Trainer {
    /// Creates a new trainer for the supplied configuration.
    #[must_use]
    pub fn new(cfg: TrainerConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`TrainerBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.cfg
    }

    /// Trains on a single corpus string.
    pub fn train(&self, corpus: &str) -> Result<TrainerArtifacts> {
        self.train_from_texts(&[corpus])
    }

    /// Trains on text files discovered under `inputs`.
    pub fn train_from_paths<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        ingest: &IngestConfig,
    ) -> Result<TrainerArtifacts> {
        self.cfg.validate()?;
        let documents = load_text_corpus(inputs, ingest)?;
        let corpus_bytes: usize = documents.iter().map(String::len).sum();
        info!(
            "loaded {} documents totalling {corpus_bytes} bytes",
            documents.len()
        );
        self.train_from_texts(&documents)
    }

    /// Trains on in-memory documents.
    ///
    /// Each document is segmented on its own; the words of all documents are
    /// pooled in document order.
    pub fn train_from_texts<S: AsRef<str>>(&self, texts: &[S]) -> Result<TrainerArtifacts> {
        self.cfg.validate()?;
        let segmenter = Segmenter::new(&self.cfg.pattern)?;

        let training_start = Instant::now();
        let max_new_tokens = self.cfg.vocab_size - BYTE_VOCAB_SIZE;
        let mut metrics = TrainingMetrics::new(max_new_tokens.min(16_384));

        let mut words = pool_words(&segmenter, texts, &mut metrics)?;
        let mut vocab = Vocabulary::new();
        let mut round = 0usize;

        while vocab.len() < self.cfg.vocab_size {
            let round_start = Instant::now();
            let stats = count_pairs(&words);
            let Some((pair, frequency)) = stats.best() else {
                metrics.stop_reason = StopReason::NoPairsRemaining;
                break;
            };
            round += 1;

            let mut record = merge_round(&mut vocab, &mut words, pair)?;
            record.round = round;
            record.frequency = frequency;
            record.distinct_pairs = stats.len();
            record.elapsed = round_start.elapsed();

            if self.cfg.show_progress {
                info!(
                    "round {:>6} rank {:>8} freq {:>8} merges {:>8} distinct_pairs {:>8} token {:?}",
                    record.round,
                    record.rank,
                    record.frequency,
                    record.merges_applied,
                    record.distinct_pairs,
                    record.bytes.as_bstr()
                );
            }
            metrics.merges.push(record);
        }

        metrics.total_duration = training_start.elapsed();
        if self.cfg.show_progress {
            info!(
                "completed {} merge rounds in {:.2?}; vocab size {} ({:?})",
                round,
                metrics.total_duration,
                vocab.len(),
                metrics.stop_reason
            );
        }

        let tokenizer = Tokenizer::from_parts(segmenter, vocab);
        Ok(TrainerArtifacts { tokenizer, metrics })
    }
}

/// Segments every document and pools identical words, keeping first-occurrence order.
///
/// Pooling leaves pair counts and the first-seen order of pairs unchanged, so the
/// merge sequence matches a scan over every word occurrence.
fn pool_words<S: AsRef<str>>(
    segmenter: &Segmenter,
    texts: &[S],
    metrics: &mut TrainingMetrics,
) -> Result<Vec<Word>> {
    let mut words: Vec<Word> = Vec::new();
    let mut index: FxHashMap<Vec<u8>, usize> = FxHashMap::default();
    let mut total = 0usize;
    for text in texts {
        segmenter.for_each_word(text.as_ref(), |word| {
            total += 1;
            let bytes = word.as_bytes();
            if bytes.is_empty() {
                return;
            }
            if let Some(&slot) = index.get(bytes) {
                words[slot].bump();
            } else {
                index.insert(bytes.to_vec(), words.len());
                words.push(Word::from_bytes(bytes));
            }
        })?;
    }
    metrics.words = total;
    metrics.distinct_words = words.len();
    Ok(words)
}

/// Merges `pair` in every word, assigning the concatenation a rank.
///
/// A concatenation that already has a rank keeps it and the vocabulary does not
/// grow. Round bookkeeping (number, frequency, pair count, timing) is left at
/// zero for the caller to fill in.
fn merge_round(vocab: &mut Vocabulary, words: &mut [Word], pair: Pair) -> Result<MergeRecord> {
    let merged = concat_pair(vocab, pair)?;
    let (rank, reused_rank) = match vocab.rank_of(&merged) {
        Some(existing) => (existing, true),
        None => (vocab.push(merged.clone())?, false),
    };
    if reused_rank {
        debug!("merged sequence {:?} already has rank {rank}", merged.as_bstr());
    }

    let merges_applied = words
        .iter_mut()
        .map(|word| word.merge(pair, rank) * word.count())
        .sum();

    Ok(MergeRecord {
        round: 0,
        rank,
        bytes: merged,
        frequency: 0,
        merges_applied,
        distinct_pairs: 0,
        reused_rank,
        elapsed: Duration::ZERO,
    })
}

fn concat_pair(vocab: &Vocabulary, pair: Pair) -> Result<Vec<u8>> {
    let lookup = |rank: TokenId| {
        vocab
            .token_bytes(rank)
            .ok_or_else(|| SbpeError::Internal(format!("word part {rank} has no vocabulary entry")))
    };
    let left = lookup(pair.0)?;
    let right = lookup(pair.1)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    merged.extend_from_slice(left);
    merged.extend_from_slice(right);
    Ok(merged)
}

/// Corpus-wide pair counts that remember first-seen order.
#[derive(Default)]
struct PairStats {
    index: FxHashMap<Pair, usize>,
    entries: Vec<(Pair, usize)>,
}

impl PairStats {
    fn add(&mut self, pair: Pair, count: usize) {
        match self.index.entry(pair) {
            Entry::Occupied(slot) => self.entries[*slot.get()].1 += count,
            Entry::Vacant(slot) => {
                slot.insert(self.entries.len());
                self.entries.push((pair, count));
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Highest count; the first-seen pair wins ties.
    fn best(&self) -> Option<(Pair, usize)> {
        self.entries
            .iter()
            .copied()
            .fold(None, |best, (pair, count)| match best {
                Some((_, top)) if top >= count => best,
                _ => Some((pair, count)),
            })
    }
}

fn count_pairs(words: &[Word]) -> PairStats {
    let mut stats = PairStats::default();
    for word in words {
        let count = word.count();
        word.for_each_pair(|pair| stats.add(pair, count));
    }
    stats
}

impl fmt::Display for TrainerArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "BPE tokenizer with vocab size {}",
            self.tokenizer.vocabulary().len()
        )?;
        writeln!(f, "Merge rounds: {}", self.metrics.merges.len())?;
        writeln!(f, "Stop reason: {:?}", self.metrics.stop_reason)?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learned(tokenizer: &Tokenizer) -> Vec<Vec<u8>> {
        tokenizer.vocabulary().tokens()[BYTE_VOCAB_SIZE..].to_vec()
    }

    #[test]
    fn small_vocab_fails_before_segmentation() {
        // The pattern is invalid too; the size check must win.
        let err = train("anything", 100, "(").expect_err("vocab size must be rejected");
        assert!(matches!(err, SbpeError::InvalidArgument(_)));
    }

    #[test]
    fn single_character_words_yield_no_merges() {
        let trainer = Trainer::new(TrainerConfig {
            vocab_size: 259,
            pattern: ".".into(),
            show_progress: false,
        });
        let artefacts = trainer.train("aaabdaaabac").unwrap();
        assert_eq!(artefacts.tokenizer.vocabulary().len(), 256);
        assert_eq!(artefacts.metrics.stop_reason, StopReason::NoPairsRemaining);
        assert_eq!(artefacts.metrics.words, 11);
        assert_eq!(artefacts.metrics.distinct_words, 4);
    }

    #[test]
    fn hand_computed_merge_order() {
        let tokenizer = train("aaabdaaabac", 259, ".+").unwrap();
        assert_eq!(
            learned(&tokenizer),
            vec![b"aa".to_vec(), b"aaa".to_vec(), b"aaab".to_vec()]
        );

        let trainer = Trainer::new(TrainerConfig {
            vocab_size: 259,
            pattern: ".+".into(),
            show_progress: true,
        });
        let metrics = trainer.train("aaabdaaabac").unwrap().metrics;
        let frequencies: Vec<usize> = metrics.merges.iter().map(|m| m.frequency).collect();
        assert_eq!(frequencies, vec![4, 2, 2]);
        assert_eq!(metrics.stop_reason, StopReason::TargetVocabReached);
        assert_eq!(
            metrics.learned_tokens().collect::<Vec<_>>(),
            vec![&b"aa"[..], &b"aaa"[..], &b"aaab"[..]]
        );
    }

    #[test]
    fn ties_go_to_the_first_seen_pair() {
        let tokenizer = train("cd ab ab cd", 258, r"\w+").unwrap();
        assert_eq!(learned(&tokenizer), vec![b"cd".to_vec(), b"ab".to_vec()]);
    }

    #[test]
    fn training_is_deterministic() {
        let corpus = "the quick brown fox jumps over the lazy dog; the dog sleeps";
        let first = train(corpus, 300, crate::segment::DEFAULT_PATTERN).unwrap();
        let second = train(corpus, 300, crate::segment::DEFAULT_PATTERN).unwrap();
        assert_eq!(first.vocabulary(), second.vocabulary());
    }

    #[test]
    fn vocabulary_grows_monotonically_and_never_exceeds_target() {
        let corpus = "low lower lowest newer newest wider widest";
        let mut previous = 0usize;
        for target in [256, 258, 264, 280, 400] {
            let size = train(corpus, target, crate::segment::DEFAULT_PATTERN)
                .unwrap()
                .vocabulary()
                .len();
            assert!(size <= target);
            assert!(size >= previous);
            previous = size;
        }
    }

    #[test]
    fn pooled_documents_match_concatenated_scan() {
        let trainer = Trainer::new(TrainerConfig {
            vocab_size: 270,
            pattern: r"\w+".into(),
            show_progress: false,
        });
        let split = trainer.train_from_texts(&["abab cdcd", "abab ef"]).unwrap();
        let joined = trainer.train("abab cdcd abab ef").unwrap();
        assert_eq!(
            split.tokenizer.vocabulary(),
            joined.tokenizer.vocabulary()
        );
    }

    #[test]
    fn training_from_paths_matches_in_memory_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "abab cdcd").unwrap();
        std::fs::write(dir.path().join("b.txt"), "abab ef").unwrap();
        let trainer = Trainer::new(TrainerConfig {
            vocab_size: 270,
            pattern: r"\w+".into(),
            show_progress: false,
        });

        let from_disk = trainer
            .train_from_paths(&[dir.path()], &IngestConfig::default())
            .unwrap();
        let in_memory = trainer.train_from_texts(&["abab cdcd", "abab ef"]).unwrap();
        assert_eq!(
            from_disk.tokenizer.vocabulary(),
            in_memory.tokenizer.vocabulary()
        );
        assert_eq!(from_disk.metrics.words, in_memory.metrics.words);

        let err = trainer
            .train_from_paths(&[dir.path().join("missing")], &IngestConfig::default())
            .expect_err("missing input must fail");
        assert!(matches!(err, SbpeError::InvalidArgument(_)));
    }

    #[test]
    fn merging_into_an_existing_sequence_reuses_its_rank() {
        let a = TokenId::from(b'a');
        let c = TokenId::from(b'c');
        let mut vocab = Vocabulary::new();
        let ab = vocab.push(b"ab".to_vec()).unwrap();
        let bc = vocab.push(b"bc".to_vec()).unwrap();
        let mut words = vec![Word::from_parts(vec![ab, c]), Word::from_parts(vec![a, bc])];

        let first = merge_round(&mut vocab, &mut words, (ab, c)).unwrap();
        assert!(!first.reused_rank);
        assert_eq!(first.bytes, b"abc");
        assert_eq!(first.merges_applied, 1);
        let abc = first.rank;
        let size = vocab.len();

        let second = merge_round(&mut vocab, &mut words, (a, bc)).unwrap();
        assert!(second.reused_rank);
        assert_eq!(second.rank, abc);
        assert_eq!(second.merges_applied, 1);
        assert_eq!(vocab.len(), size);
        assert_eq!(words[0].parts(), &[abc]);
        assert_eq!(words[1].parts(), &[abc]);

        let mut metrics = TrainingMetrics::new(2);
        metrics.merges.push(first);
        metrics.merges.push(second);
        assert_eq!(metrics.learned_tokens().collect::<Vec<_>>(), vec![&b"abc"[..]]);
    }

    #[test]
    fn pair_stats_prefers_higher_count_then_first_seen() {
        let mut stats = PairStats::default();
        stats.add((1, 2), 1);
        stats.add((3, 4), 2);
        stats.add((5, 6), 2);
        stats.add((1, 2), 1);
        assert_eq!(stats.best(), Some(((1, 2), 2)));
        stats.add((5, 6), 1);
        assert_eq!(stats.best(), Some(((5, 6), 3)));
        assert_eq!(stats.len(), 3);
        assert_eq!(PairStats::default().best(), None);
    }
}
