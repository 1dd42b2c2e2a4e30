//! Error types for dataset processing.

use std::path::PathBuf;

/// Result type alias using [`DatasetError`].
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Every failure the adapter can surface. Nothing is recovered locally.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// Manifest line with fewer columns than the configured positions need.
    #[error("malformed record at {}:{line}: expected at least {required} fields, found {found}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        required: usize,
        found: usize,
    },

    /// Waveform missing, unreadable, or in an unsupported format.
    #[error("failed to decode audio {}: {message}", path.display())]
    AudioDecode { path: PathBuf, message: String },

    /// Cleaned token absent from the symbol vocabulary.
    #[error("unknown symbol {symbol:?}")]
    UnknownSymbol { symbol: String },

    /// Id outside the symbol vocabulary.
    #[error("unknown symbol id {id}")]
    UnknownId { id: i32 },

    /// Directory or file access failure while loading or saving.
    #[error("{}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two manifest records resolve to the same utterance id.
    #[error("duplicate utterance id {utt_id:?}: {} and {}", first.display(), second.display())]
    DuplicateUtterance {
        utt_id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The grapheme-to-phoneme engine rejected its input.
    #[error("phonemizer: {0}")]
    Phonemizer(String),

    /// Invalid processor configuration.
    #[error("config: {0}")]
    Config(String),

    /// JSON (de)serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// A failure while building the sample of one manifest record.
    #[error("utterance {utt_id}: {source}")]
    Record {
        utt_id: String,
        #[source]
        source: Box<DatasetError>,
    },
}

impl DatasetError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn in_record(self, utt_id: &str) -> Self {
        DatasetError::Record {
            utt_id: utt_id.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through [`DatasetError::Record`] wrappers.
    pub fn root_cause(&self) -> &DatasetError {
        match self {
            DatasetError::Record { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
