//! Processor configuration.
//!
//! Configurations are built in code with [`ProcessorConfig::new`] or loaded
//! from JSON with [`ProcessorConfig::load`]. They are never mutated after the
//! processor is constructed.

use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How raw text is turned into phoneme tokens.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    /// Text is already phonemized and whitespace-tokenized.
    #[default]
    Train,
    /// Text is natural language and goes through the phonemizer.
    Inference,
}

impl FromStr for Mode {
    type Err = DatasetError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Mode::Train),
            "inference" => Ok(Mode::Inference),
            other => Err(DatasetError::Config(format!(
                "unsupported mode {other:?} (expected \"train\" or \"inference\")"
            ))),
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = DatasetError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Train => f.write_str("train"),
            Mode::Inference => f.write_str("inference"),
        }
    }
}

/// Zero-based column indices of the manifest fields after splitting a line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnPositions {
    pub file: usize,
    pub text: usize,
    pub speaker_name: usize,
}

impl Default for ColumnPositions {
    fn default() -> Self {
        Self {
            file: 0,
            text: 1,
            speaker_name: 2,
        }
    }
}

impl ColumnPositions {
    /// Minimum number of fields a manifest line must carry, or `None` when
    /// a position is too large to be addressed.
    pub fn required_fields(&self) -> Option<usize> {
        self.file.max(self.text).max(self.speaker_name).checked_add(1)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
/// Dataset location and manifest layout.
pub struct ProcessorConfig {
    /// Dataset root; manifest and audio paths are resolved against it.
    pub data_dir: PathBuf,
    /// Manifest filename inside `data_dir`.
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
    /// Field separator of manifest lines.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub positions: ColumnPositions,
    /// Audio extension appended to file fields that lack it.
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub mode: Mode,
}

fn default_manifest_name() -> String {
    "train.txt".to_string()
}

fn default_delimiter() -> String {
    "|".to_string()
}

fn default_extension() -> String {
    ".wav".to_string()
}

impl ProcessorConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            manifest_name: default_manifest_name(),
            delimiter: default_delimiter(),
            positions: ColumnPositions::default(),
            extension: default_extension(),
            mode: Mode::default(),
        }
    }

    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_positions(mut self, positions: ColumnPositions) -> Self {
        self.positions = positions;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| DatasetError::fs(path, e))?;
        let config: ProcessorConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(DatasetError::Config("delimiter must not be empty".to_string()));
        }
        if self.positions.required_fields().is_none() {
            return Err(DatasetError::Config(format!(
                "column positions out of range: {:?}",
                self.positions
            )));
        }
        Ok(())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir.join(&self.manifest_name)
    }
}
