//! Writing encoded datasets to disk.
//!
//! Layout under the output directory:
//!
//! ```text
//! ids/<utt_id>-ids.npy        int32 phoneme ids
//! raw-wavs/<utt_id>-wave.npy  float32 waveform, 1-D for mono, [frames, channels] otherwise
//! metadata.jsonl              one line per utterance
//! speakers.json               speaker name -> id
//! processor.json              processor mapper
//! ```

use crate::error::{DatasetError, Result};
use crate::processor::{DatasetProcessor, Sample};
use ndarray_npy::WriteNpyExt;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const IDS_DIR: &str = "ids";
pub const WAVS_DIR: &str = "raw-wavs";
pub const METADATA_FILE_NAME: &str = "metadata.jsonl";
pub const SPEAKERS_FILE_NAME: &str = "speakers.json";

#[derive(Serialize)]
struct SampleMetadata<'a> {
    utt_id: &'a str,
    speaker_name: &'a str,
    rate: u32,
    raw_text: &'a str,
    num_ids: usize,
    num_frames: usize,
}

/// What [`dump_dataset`] wrote.
#[derive(Debug, Clone)]
pub struct DumpSummary {
    pub utterances: usize,
    pub total_secs: f32,
    pub mapper_path: PathBuf,
}

/// Reject manifests where two records share an utterance id, since their
/// dumps would land on the same file names.
pub fn check_unique_utt_ids<P: DatasetProcessor + ?Sized>(processor: &P) -> Result<()> {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for item in processor.items() {
        let utt_id = item.utt_id();
        if let Some(first) = seen.get(&utt_id) {
            return Err(DatasetError::DuplicateUtterance {
                utt_id,
                first: first.to_path_buf(),
                second: item.wav_path.clone(),
            });
        }
        seen.insert(utt_id, &item.wav_path);
    }
    Ok(())
}

/// Encode every record and write the dataset layout under `out_dir`.
/// Nothing is written when utterance ids collide; otherwise stops at the
/// first failing record.
pub fn dump_dataset<P: DatasetProcessor + ?Sized>(
    processor: &P,
    out_dir: &Path,
) -> Result<DumpSummary> {
    check_unique_utt_ids(processor)?;

    let ids_dir = out_dir.join(IDS_DIR);
    let wavs_dir = out_dir.join(WAVS_DIR);
    for dir in [&ids_dir, &wavs_dir] {
        fs::create_dir_all(dir).map_err(|e| DatasetError::fs(dir, e))?;
    }

    let metadata_path = out_dir.join(METADATA_FILE_NAME);
    let metadata_file =
        File::create(&metadata_path).map_err(|e| DatasetError::fs(&metadata_path, e))?;
    let mut metadata = BufWriter::new(metadata_file);

    let mut utterances = 0;
    let mut total_secs = 0.0f32;
    for sample in processor.samples() {
        let sample = sample?;
        write_sample(&sample, &ids_dir, &wavs_dir)?;
        serde_json::to_writer(
            &mut metadata,
            &SampleMetadata {
                utt_id: &sample.utt_id,
                speaker_name: &sample.speaker_name,
                rate: sample.rate,
                raw_text: &sample.raw_text,
                num_ids: sample.text_ids.len(),
                num_frames: sample.num_frames(),
            },
        )?;
        metadata
            .write_all(b"\n")
            .map_err(|e| DatasetError::fs(&metadata_path, e))?;
        utterances += 1;
        total_secs += sample.duration_secs();
    }
    metadata
        .flush()
        .map_err(|e| DatasetError::fs(&metadata_path, e))?;

    let speakers_path = out_dir.join(SPEAKERS_FILE_NAME);
    let speakers = serde_json::to_string_pretty(&processor.speaker_map())?;
    fs::write(&speakers_path, speakers).map_err(|e| DatasetError::fs(&speakers_path, e))?;

    let mapper_path = processor.save_pretrained(out_dir)?;
    log::info!(
        "Dumped {utterances} utterances ({total_secs:.2}s of audio) to {}",
        out_dir.display()
    );
    Ok(DumpSummary {
        utterances,
        total_secs,
        mapper_path,
    })
}

fn write_sample(sample: &Sample, ids_dir: &Path, wavs_dir: &Path) -> Result<()> {
    let ids_path = ids_dir.join(format!("{}-ids.npy", sample.utt_id));
    let ids_file = File::create(&ids_path).map_err(|e| DatasetError::fs(&ids_path, e))?;
    sample
        .text_ids
        .write_npy(BufWriter::new(ids_file))
        .map_err(|e| DatasetError::fs(&ids_path, std::io::Error::other(e)))?;

    let wave_path = wavs_dir.join(format!("{}-wave.npy", sample.utt_id));
    let wave_file = BufWriter::new(
        File::create(&wave_path).map_err(|e| DatasetError::fs(&wave_path, e))?,
    );
    if sample.audio.ncols() == 1 {
        sample.audio.column(0).write_npy(wave_file)
    } else {
        sample.audio.write_npy(wave_file)
    }
    .map_err(|e| DatasetError::fs(&wave_path, std::io::Error::other(e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::save_wav;
    use crate::config::ProcessorConfig;
    use crate::manifest::ManifestRecord;
    use crate::processor::EnglishIpaProcessor;

    fn processor(dir: &Path, names: &[&str]) -> EnglishIpaProcessor {
        let items = names
            .iter()
            .map(|name| ManifestRecord {
                text: "k ˈæ t".to_string(),
                wav_path: dir.join(name),
                speaker_name: "spk".to_string(),
            })
            .collect();
        EnglishIpaProcessor::from_records(ProcessorConfig::new(dir), items)
    }

    #[test]
    fn test_unique_ids_pass() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_unique_utt_ids(&processor(dir.path(), &["a.wav", "b.wav"])).is_ok());
    }

    #[test]
    fn test_same_stem_different_extension_collides() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_unique_utt_ids(&processor(dir.path(), &["a.wav", "a.v2.wav"])).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateUtterance { ref utt_id, .. } if utt_id == "a"));
        assert!(err.to_string().contains("a.v2.wav"), "{err}");
    }

    #[test]
    fn test_unwritable_ids_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        save_wav(&[0.0, 0.1], &dir.path().join("utt.wav"), 16000).unwrap();
        let out = dir.path().join("out");
        // A directory where the ids file should go makes File::create fail.
        let blocked = out.join(IDS_DIR).join("utt-ids.npy");
        fs::create_dir_all(&blocked).unwrap();

        let err = dump_dataset(&processor(dir.path(), &["utt.wav"]), &out).unwrap_err();
        match &err {
            DatasetError::FileSystem { path, .. } => assert_eq!(path, &blocked),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("utt-ids.npy"), "{err}");
    }
}
