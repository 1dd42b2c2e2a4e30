//! WAV decoding and writing.

use crate::error::{DatasetError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use ndarray::Array2;
use std::path::Path;

/// Decode a WAV file into `[frames, channels]` samples in `[-1.0, 1.0]`
/// plus its sample rate.
pub fn read_wav(path: &Path) -> Result<(Array2<f32>, u32)> {
    let decode_err = |message: String| DatasetError::AudioDecode {
        path: path.to_path_buf(),
        message,
    };

    let reader = WavReader::open(path).map_err(|e| decode_err(e.to_string()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(decode_err("WAV header declares zero channels".to_string()));
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>(),
        SampleFormat::Int => {
            let max = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<std::result::Result<Vec<_>, _>>()
        }
    }
    .map_err(|e| decode_err(e.to_string()))?;

    let frames = samples.len() / channels;
    let audio = Array2::from_shape_vec((frames, channels), samples)
        .map_err(|e| decode_err(format!("truncated frame: {e}")))?;

    Ok((audio, spec.sample_rate))
}

/// Save mono audio samples to a 16-bit PCM WAV file.
///
/// Args:
///     samples: Audio samples in range [-1.0, 1.0]
///     path: Output file path
///     sample_rate: Sample rate in Hz
pub fn save_wav(samples: &[f32], path: &Path, sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let io_err = |e: hound::Error| DatasetError::AudioDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut writer = WavWriter::create(path, spec).map_err(io_err)?;

    for &sample in samples {
        // Clamp and convert to 16-bit integer
        let clamped = sample.clamp(-1.0, 1.0);
        let int_sample = (clamped * i16::MAX as f32) as i16;
        writer.write_sample(int_sample).map_err(io_err)?;
    }

    writer.finalize().map_err(io_err)?;

    Ok(())
}
