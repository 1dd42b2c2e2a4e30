//! IPA dataset adapter
//!
//! Turns a delimited manifest of (audio file, text, speaker) records into
//! phoneme-id training samples paired with their decoded waveforms.

pub mod audio;
pub mod config;
pub mod dump;
pub mod error;
pub mod g2p;
pub mod manifest;
pub mod processor;
pub mod vocab;

pub use audio::{read_wav, save_wav};
pub use config::{ColumnPositions, Mode, ProcessorConfig};
pub use dump::{check_unique_utt_ids, dump_dataset, DumpSummary};
pub use error::{DatasetError, Result};
pub use g2p::{clean_g2p, DisabledPhonemizer, LexiconPhonemizer, Phonemizer, Sentence, Word};
pub use manifest::{load_manifest, parse_line, ManifestRecord};
pub use processor::{load_processor_mapper, DatasetProcessor, EnglishIpaProcessor, Sample};
pub use vocab::Vocab;

/// Fixed names shared with downstream tooling.
pub mod constants {
    /// Mapper artifact written by `save_pretrained`.
    pub const PROCESSOR_FILE_NAME: &str = "processor.json";
}
