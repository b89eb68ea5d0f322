use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use bstr::ByteSlice;
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use rayon::ThreadPoolBuilder;
use sbpe::config::{IngestConfig, TrainerConfig};
use sbpe::validate::{validate, DEFAULT_VALIDATION_SAMPLES};
use sbpe::{Tokenizer, Trainer, BYTE_VOCAB_SIZE, DEFAULT_PATTERN};
use serde_json::json;

const DEFAULT_OUTPUT: &str = "tokenizer.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Text BPE tokenizer toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a new tokenizer from text inputs
    Train(TrainArgs),
    /// Encode text with a trained tokenizer
    Encode(EncodeArgs),
    /// Decode token ids back into text
    Decode(DecodeArgs),
    /// Check that samples round trip through a tokenizer
    Validate(ValidateArgs),
    /// Inspect tokenizer metadata
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Files or directories to ingest
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path for the model file
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Target vocabulary size (including the 256 byte tokens)
    #[arg(long, value_name = "SIZE")]
    vocab_size: Option<usize>,

    /// Segmentation pattern
    #[arg(long, value_name = "REGEX")]
    pattern: Option<String>,

    /// Extra validation samples, one per line
    #[arg(long, value_name = "PATH")]
    samples: Option<PathBuf>,

    /// Disable per-merge logging and the spinner
    #[arg(long)]
    no_progress: bool,

    /// Emit pretty JSON
    #[arg(long)]
    pretty: bool,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Model file to load
    #[arg(short = 'm', long, value_name = "PATH")]
    tokenizer: PathBuf,

    /// Text to encode instead of reading files
    #[arg(long, value_name = "TEXT", conflicts_with = "inputs")]
    text: Option<String>,

    /// Text files to encode
    #[arg(required_unless_present = "text")]
    inputs: Vec<PathBuf>,

    /// Emit JSON lines instead of human-readable output
    #[arg(long)]
    json: bool,

    /// Print token counts instead of ids
    #[arg(long)]
    count: bool,

    /// Limit Rayon worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Model file to load
    #[arg(short = 'm', long, value_name = "PATH")]
    tokenizer: PathBuf,

    /// Path to whitespace separated token ids
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Token ids to decode when --input is omitted
    #[arg(value_name = "ID", required_unless_present = "input")]
    tokens: Vec<u32>,

    /// Output file for decoded bytes (defaults to stdout)
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Model file to check
    #[arg(short = 'm', long, value_name = "PATH")]
    tokenizer: PathBuf,

    /// Extra validation samples, one per line
    #[arg(long, value_name = "PATH")]
    samples: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Model file to inspect
    #[arg(short = 'm', long, value_name = "PATH")]
    tokenizer: PathBuf,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    json: bool,

    /// Print the last N learned tokens
    #[arg(long, value_name = "N")]
    show_tokens: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Encode(args) => run_encode(args),
        Commands::Decode(args) => run_decode(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn run_train(args: TrainArgs) -> Result<()> {
    let mut cfg = TrainerConfig::builder().show_progress(!args.no_progress);
    if let Some(vocab_size) = args.vocab_size {
        cfg = cfg.vocab_size(vocab_size);
    }
    if let Some(pattern) = &args.pattern {
        cfg = cfg.pattern(pattern.clone());
    }
    let trainer_cfg = cfg.build()?;

    let ingest_cfg = IngestConfig {
        recursive: !args.no_recursive,
        follow_symlinks: args.follow_symlinks,
    };
    let samples = gather_samples(args.samples.as_deref())?;

    let spinner = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} training merges... {elapsed}")
            .context("invalid progress template")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let trainer = Trainer::new(trainer_cfg);
    let start = Instant::now();
    let artifacts = trainer
        .train_from_paths(&args.inputs, &ingest_cfg)
        .context("training failed")?;
    if let Some(pb) = spinner {
        pb.finish_with_message("training complete");
    }
    let elapsed = start.elapsed();

    let failures = validate(&artifacts.tokenizer, &samples);
    if !failures.is_empty() {
        bail!(
            "{} of {} validation samples failed to round trip; model not written",
            failures.len(),
            samples.len()
        );
    }

    artifacts
        .tokenizer
        .save(&args.output, args.pretty)
        .with_context(|| format!("failed to save tokenizer to {}", args.output.display()))?;

    let vocab_size = artifacts.tokenizer.vocabulary().len();
    let merged = artifacts.tokenizer.vocabulary().merged_len();
    info!(
        "training complete: rounds={} vocab={vocab_size} duration={elapsed:.2?} stop={:?}",
        artifacts.metrics.merges.len(),
        artifacts.metrics.stop_reason
    );
    println!(
        "wrote tokenizer with vocab {} ({} merged tokens) to {}",
        vocab_size,
        merged,
        args.output.display()
    );
    println!(
        "   words {} ({} distinct) | duration {:.2?}",
        artifacts.metrics.words,
        artifacts.metrics.distinct_words,
        elapsed
    );

    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }
    let tokenizer = load_tokenizer(&args.tokenizer)?;

    let (labels, texts): (Vec<String>, Vec<String>) = match args.text {
        Some(text) => (vec!["<text>".to_string()], vec![text]),
        None => {
            let mut labels = Vec::with_capacity(args.inputs.len());
            let mut texts = Vec::with_capacity(args.inputs.len());
            for path in &args.inputs {
                let raw =
                    fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
                labels.push(path.display().to_string());
                texts.push(String::from_utf8_lossy(&raw).into_owned());
            }
            (labels, texts)
        }
    };

    let encoded = tokenizer.encode_batch(&texts)?;
    let single = args.inputs.is_empty();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (label, tokens) in labels.iter().zip(&encoded) {
        if args.json {
            let record = if args.count {
                json!({ "path": label, "count": tokens.len() })
            } else {
                json!({ "path": label, "tokens": tokens })
            };
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
        } else if args.count {
            if single {
                writeln!(out, "{}", tokens.len())?;
            } else {
                writeln!(out, "{label}:\t{}", tokens.len())?;
            }
        } else {
            if !single {
                write!(out, "{label}:\t")?;
            }
            write_token_sequence(&mut out, tokens)?;
        }
    }

    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let tokenizer = load_tokenizer(&args.tokenizer)?;

    let tokens = if let Some(input_path) = &args.input {
        let contents = fs::read_to_string(input_path)
            .with_context(|| format!("failed to read {}", input_path.display()))?;
        parse_token_list(&contents)?
    } else {
        args.tokens
    };

    let bytes = tokenizer.decode_bytes(&tokens);

    if let Some(path) = &args.output {
        let mut file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(&bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote {} bytes to {}", bytes.len(), path.display());
    } else {
        io::stdout().write_all(&bytes)?;
    }

    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<()> {
    let tokenizer = load_tokenizer(&args.tokenizer)?;
    let samples = gather_samples(args.samples.as_deref())?;
    let failures = validate(&tokenizer, &samples);
    if failures.is_empty() {
        println!("all {} samples round trip", samples.len());
        return Ok(());
    }
    for sample in &failures {
        error!("failed: {:?}", sample.as_bytes().as_bstr());
    }
    Err(anyhow!(
        "{} of {} samples failed to round trip",
        failures.len(),
        samples.len()
    ))
}

fn run_info(args: InfoArgs) -> Result<()> {
    let tokenizer = load_tokenizer(&args.tokenizer)?;
    let vocab = tokenizer.vocabulary();
    let longest = vocab.iter().map(|(_, bytes)| bytes.len()).max().unwrap_or(0);
    let recent: Vec<(u32, &[u8])> = match args.show_tokens {
        Some(count) => {
            let learned: Vec<_> = vocab.iter().skip(BYTE_VOCAB_SIZE).collect();
            let skip = learned.len().saturating_sub(count);
            learned.into_iter().skip(skip).collect()
        }
        None => Vec::new(),
    };

    if args.json {
        let tokens: Vec<_> = recent
            .iter()
            .map(|(rank, bytes)| json!({ "rank": rank, "token": format!("{:?}", bytes.as_bstr()) }))
            .collect();
        let summary = json!({
            "path": args.tokenizer.display().to_string(),
            "pattern": tokenizer.pattern(),
            "default_pattern": tokenizer.pattern() == DEFAULT_PATTERN,
            "vocab_size": vocab.len(),
            "merged_tokens": vocab.merged_len(),
            "longest_token": longest,
            "tokens": tokens,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Pattern      : {}", tokenizer.pattern());
        println!("Vocab size   : {}", vocab.len());
        println!("Merged tokens: {}", vocab.merged_len());
        println!("Longest token: {longest} bytes");
        for (rank, bytes) in &recent {
            println!("{rank:>8}  {:?}", bytes.as_bstr());
        }
    }

    Ok(())
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::load(path)
        .with_context(|| format!("failed to load tokenizer from {}", path.display()))
}

/// Default samples followed by the non-empty lines of `extra`.
fn gather_samples(extra: Option<&Path>) -> Result<Vec<String>> {
    let mut samples: Vec<String> = DEFAULT_VALIDATION_SAMPLES
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
    if let Some(path) = extra {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read samples from {}", path.display()))?;
        samples.extend(
            contents
                .lines()
                .filter(|line| !line.is_empty())
                .map(str::to_owned),
        );
    }
    Ok(samples)
}

fn write_token_sequence<W: Write>(writer: &mut W, tokens: &[u32]) -> Result<()> {
    for (idx, token) in tokens.iter().enumerate() {
        if idx > 0 {
            writer.write_all(b" ")?;
        }
        write!(writer, "{token}")?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

fn parse_token_list(text: &str) -> Result<Vec<u32>> {
    text.split_whitespace()
        .map(|part| {
            part.parse::<u32>()
                .map_err(|err| anyhow!("invalid token id `{part}`: {err}"))
        })
        .collect()
}
