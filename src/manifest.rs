//! Manifest parsing.
//!
//! A manifest is a plain-text file with one record per line and no header.
//! Fields are split on the configured delimiter and picked out by the
//! configured column positions.

use crate::config::ProcessorConfig;
use crate::error::{DatasetError, Result};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One utterance listed in the manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestRecord {
    pub text: String,
    /// Always ends with the configured audio extension.
    pub wav_path: PathBuf,
    pub speaker_name: String,
}

impl ManifestRecord {
    /// File name of `wav_path` up to its first `.`.
    pub fn utt_id(&self) -> String {
        self.wav_path
            .file_name()
            .map(|name| name.to_string_lossy())
            .and_then(|name| name.split('.').next().map(str::to_string))
            .unwrap_or_default()
    }
}

/// Read every record of `config.manifest_path()`. Fails on the first bad line.
pub fn load_manifest(config: &ProcessorConfig) -> Result<Vec<ManifestRecord>> {
    let path = config.manifest_path();
    let file = File::open(&path).map_err(|e| DatasetError::fs(&path, e))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| DatasetError::fs(&path, e))?;
        records.push(parse_line(&line, idx + 1, &path, config)?);
    }

    log::info!(
        "Loaded {} records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Parse one manifest line. `line_no` is 1-based and only used for errors.
pub fn parse_line(
    line: &str,
    line_no: usize,
    manifest: &Path,
    config: &ProcessorConfig,
) -> Result<ManifestRecord> {
    let parts: Vec<&str> = line.trim().split(config.delimiter.as_str()).collect();
    let positions = &config.positions;
    let required = positions.required_fields().ok_or_else(|| {
        DatasetError::Config(format!("column positions out of range: {positions:?}"))
    })?;
    if parts.len() < required {
        return Err(DatasetError::MalformedRecord {
            path: manifest.to_path_buf(),
            line: line_no,
            required,
            found: parts.len(),
        });
    }

    let wav_path = with_extension(
        config.data_dir.join(parts[positions.file]),
        &config.extension,
    );

    Ok(ManifestRecord {
        text: parts[positions.text].to_string(),
        wav_path,
        speaker_name: parts[positions.speaker_name].to_string(),
    })
}

fn with_extension(path: PathBuf, extension: &str) -> PathBuf {
    if path.to_string_lossy().ends_with(extension) {
        return path;
    }
    let mut raw: OsString = path.into_os_string();
    raw.push(extension);
    PathBuf::from(raw)
}
