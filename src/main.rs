//! CLI entry point for IPA dataset preparation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use ipa_dataset::{
    dump_dataset, DatasetProcessor, EnglishIpaProcessor, LexiconPhonemizer, Mode,
    ProcessorConfig, Vocab,
};

#[derive(Parser, Debug)]
#[command(name = "ipa-dataset")]
#[command(about = "Prepare phoneme-indexed TTS training data from an IPA manifest")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode one text and print its symbols and ids
    Encode {
        /// Text to encode (space-separated phonemes in train mode)
        #[arg(short, long)]
        text: String,

        /// train or inference
        #[arg(short, long, default_value = "train")]
        mode: String,

        /// Pronunciation lexicon for inference mode
        #[arg(long)]
        lexicon: Option<PathBuf>,
    },

    /// Encode every manifest record and dump ids, waveforms and metadata
    Preprocess {
        /// Dataset root containing the manifest and audio files
        #[arg(short, long)]
        data_dir: PathBuf,

        /// JSON processor config; command-line flags override its fields
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Manifest filename inside the dataset root
        #[arg(long)]
        manifest: Option<String>,

        /// Manifest field delimiter
        #[arg(long)]
        delimiter: Option<String>,

        /// train or inference
        #[arg(long)]
        mode: Option<String>,

        /// Pronunciation lexicon for inference mode
        #[arg(long)]
        lexicon: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        out_dir: PathBuf,
    },

    /// Write the ordered symbol vocabulary as JSON
    Vocab {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .try_init();

    match Args::parse().command {
        Command::Encode {
            text,
            mode,
            lexicon,
        } => encode(&text, &mode, lexicon.as_deref()),
        Command::Preprocess {
            data_dir,
            config,
            manifest,
            delimiter,
            mode,
            lexicon,
            out_dir,
        } => {
            let mut processor_config = match config {
                Some(ref path) => ProcessorConfig::load(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ProcessorConfig::new(&data_dir),
            };
            processor_config.data_dir = data_dir;
            if let Some(manifest) = manifest {
                processor_config.manifest_name = manifest;
            }
            if let Some(delimiter) = delimiter {
                processor_config.delimiter = delimiter;
            }
            if let Some(mode) = mode {
                processor_config.mode = mode.parse()?;
            }
            preprocess(processor_config, lexicon.as_deref(), &out_dir)
        }
        Command::Vocab { output } => {
            let json = Vocab::english_ipa().to_json()?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
            Ok(())
        }
    }
}

fn build_processor(
    config: ProcessorConfig,
    lexicon: Option<&Path>,
    items_from_manifest: bool,
) -> Result<EnglishIpaProcessor> {
    let processor = if items_from_manifest {
        EnglishIpaProcessor::load(config).context("Failed to load manifest")?
    } else {
        EnglishIpaProcessor::from_records(config, Vec::new())
    };
    Ok(match lexicon {
        Some(path) => {
            let lexicon = LexiconPhonemizer::load(path).context("Failed to load lexicon")?;
            processor.with_phonemizer(Box::new(lexicon))
        }
        None => processor,
    })
}

fn encode(text: &str, mode: &str, lexicon: Option<&Path>) -> Result<()> {
    let mode: Mode = mode.parse()?;
    let config = ProcessorConfig::new(".").with_mode(mode);
    let processor = build_processor(config, lexicon, false)?;

    let ids = processor
        .text_to_sequence(text)
        .context("Failed to encode text")?;
    let symbols = processor.vocab().ids_to_symbols(&ids)?;

    println!("Symbols: {}", symbols.join(" "));
    println!("Token IDs: {:?} (len={})", ids, ids.len());
    Ok(())
}

fn preprocess(config: ProcessorConfig, lexicon: Option<&Path>, out_dir: &Path) -> Result<()> {
    println!("Loading manifest from {:?}...", config.manifest_path());
    let processor = build_processor(config, lexicon, true)?;

    println!("Processing {} utterances...", processor.items().len());
    let summary = dump_dataset(&processor, out_dir)
        .with_context(|| format!("Failed to dump dataset to {}", out_dir.display()))?;

    println!(
        "Done! Encoded {} utterances ({:.2}s of audio); mapper at {:?}.",
        summary.utterances, summary.total_secs, summary.mapper_path
    );
    Ok(())
}
