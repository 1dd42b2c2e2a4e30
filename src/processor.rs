//! Dataset processors: manifest records in, encoded training samples out.

use crate::audio::read_wav;
use crate::config::{Mode, ProcessorConfig};
use crate::constants::PROCESSOR_FILE_NAME;
use crate::error::{DatasetError, Result};
use crate::g2p::{clean_g2p, words_to_tokens, DisabledPhonemizer, Phonemizer};
use crate::manifest::{load_manifest, ManifestRecord};
use crate::vocab::Vocab;
use ndarray::{Array1, Array2};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One encoded utterance.
#[derive(Clone, Debug)]
pub struct Sample {
    pub raw_text: String,
    pub text_ids: Array1<i32>,
    /// Decoded waveform, `[frames, channels]`.
    pub audio: Array2<f32>,
    pub utt_id: String,
    pub speaker_name: String,
    pub rate: u32,
}

impl Sample {
    pub fn num_frames(&self) -> usize {
        self.audio.nrows()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.rate == 0 {
            return 0.0;
        }
        self.num_frames() as f32 / self.rate as f32
    }
}

/// Shared interface of dataset adapters.
pub trait DatasetProcessor {
    /// Manifest records, in manifest order.
    fn items(&self) -> &[ManifestRecord];

    /// Build the sample of one record.
    fn get_one_sample(&self, item: &ManifestRecord) -> Result<Sample>;

    /// Persist processor metadata under `saved_path`.
    fn save_pretrained(&self, saved_path: &Path) -> Result<PathBuf>;

    /// Id appended to every sequence, if any.
    fn setup_eos_token(&self) -> Option<i32>;

    /// Speaker name to id, numbered by first appearance.
    fn speaker_map(&self) -> BTreeMap<String, usize> {
        let mut map = BTreeMap::new();
        for item in self.items() {
            let next = map.len();
            map.entry(item.speaker_name.clone()).or_insert(next);
        }
        map
    }

    /// Lazily build every sample in manifest order.
    fn samples(&self) -> Box<dyn Iterator<Item = Result<Sample>> + '_> {
        Box::new(self.items().iter().map(move |item| self.get_one_sample(item)))
    }
}

/// Adapter for English datasets transcribed (or transcribable) in IPA.
pub struct EnglishIpaProcessor {
    config: ProcessorConfig,
    items: Vec<ManifestRecord>,
    phonemizer: Box<dyn Phonemizer>,
    vocab: &'static Vocab,
}

impl EnglishIpaProcessor {
    /// Read the manifest named by `config`. Inference-mode text will fail
    /// until a phonemizer is attached with [`Self::with_phonemizer`].
    pub fn load(config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        let items = load_manifest(&config)?;
        Ok(Self::from_records(config, items))
    }

    /// Build a processor over records that were obtained elsewhere.
    pub fn from_records(config: ProcessorConfig, items: Vec<ManifestRecord>) -> Self {
        Self {
            config,
            items,
            phonemizer: Box::new(DisabledPhonemizer),
            vocab: Vocab::english_ipa(),
        }
    }

    pub fn with_phonemizer(mut self, phonemizer: Box<dyn Phonemizer>) -> Self {
        log::debug!("Using {} phonemizer", phonemizer.name());
        self.phonemizer = phonemizer;
        self
    }

    pub fn vocab(&self) -> &'static Vocab {
        self.vocab
    }

    /// Encode text according to the configured mode.
    pub fn text_to_sequence(&self, text: &str) -> Result<Vec<i32>> {
        match self.config.mode {
            // Train-mode text is already phonemized.
            Mode::Train => {
                let tokens: Vec<&str> = text.split_whitespace().collect();
                self.vocab.symbols_to_ids(&clean_g2p(&tokens))
            }
            Mode::Inference => self.inference_text_to_seq(text),
        }
    }

    pub fn inference_text_to_seq(&self, text: &str) -> Result<Vec<i32>> {
        self.vocab.symbols_to_ids(&self.text_to_phonemes(text)?)
    }

    /// Run the phonemizer and return cleaned vocabulary symbols.
    pub fn text_to_phonemes(&self, text: &str) -> Result<Vec<String>> {
        let sentences = self.phonemizer.sentences(text)?;
        Ok(clean_g2p(&words_to_tokens(&sentences)))
    }
}

impl DatasetProcessor for EnglishIpaProcessor {
    fn items(&self) -> &[ManifestRecord] {
        &self.items
    }

    fn get_one_sample(&self, item: &ManifestRecord) -> Result<Sample> {
        let utt_id = item.utt_id();
        let build = || -> Result<Sample> {
            let (audio, rate) = read_wav(&item.wav_path)?;
            let text_ids = self.text_to_sequence(&item.text)?;
            if text_ids.is_empty() {
                log::warn!("Utterance {utt_id} encodes to an empty sequence");
            }
            log::debug!(
                "Built {utt_id}: {} ids, {} frames at {rate} Hz",
                text_ids.len(),
                audio.nrows()
            );
            Ok(Sample {
                raw_text: item.text.clone(),
                text_ids: Array1::from(text_ids),
                audio,
                utt_id: utt_id.clone(),
                speaker_name: item.speaker_name.clone(),
                rate,
            })
        };
        build().map_err(|e| e.in_record(&utt_id))
    }

    fn save_pretrained(&self, saved_path: &Path) -> Result<PathBuf> {
        fs::create_dir_all(saved_path).map_err(|e| DatasetError::fs(saved_path, e))?;
        let path = saved_path.join(PROCESSOR_FILE_NAME);
        let file = File::create(&path).map_err(|e| DatasetError::fs(&path, e))?;
        serde_json::to_writer(file, &Map::new())?;
        log::info!("Saved processor mapper to {}", path.display());
        Ok(path)
    }

    fn setup_eos_token(&self) -> Option<i32> {
        None
    }
}

/// Read back the mapping written by [`DatasetProcessor::save_pretrained`].
pub fn load_processor_mapper(saved_path: &Path) -> Result<Map<String, Value>> {
    let path = saved_path.join(PROCESSOR_FILE_NAME);
    let file = File::open(&path).map_err(|e| DatasetError::fs(&path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::save_wav;
    use crate::g2p::LexiconPhonemizer;

    fn record(dir: &Path, name: &str, text: &str, speaker: &str) -> ManifestRecord {
        ManifestRecord {
            text: text.to_string(),
            wav_path: dir.join(format!("{name}.wav")),
            speaker_name: speaker.to_string(),
        }
    }

    fn train_processor() -> EnglishIpaProcessor {
        EnglishIpaProcessor::from_records(ProcessorConfig::new("/data"), Vec::new())
    }

    fn inference_processor() -> EnglishIpaProcessor {
        let lexicon = LexiconPhonemizer::from_entries([
            ("the", vec!["ð", "ə"]),
            ("cat", vec!["k", "ˈæ", "t"]),
            ("sat", vec!["s", "ˈæ", "t"]),
        ]);
        EnglishIpaProcessor::from_records(
            ProcessorConfig::new("/data").with_mode(Mode::Inference),
            Vec::new(),
        )
        .with_phonemizer(Box::new(lexicon))
    }

    #[test]
    fn test_train_mode_round_trip() {
        let processor = train_processor();
        let ids = processor.text_to_sequence("k æ t").unwrap();

        assert_eq!(ids.len(), 3);
        assert_eq!(
            processor.vocab().ids_to_symbols(&ids).unwrap(),
            vec!["@k", "@æ", "@t"]
        );
    }

    #[test]
    fn test_train_mode_punctuation() {
        let processor = train_processor();
        let ids = processor.text_to_sequence("h ə l ˈoʊ , w ˈɚ l d .").unwrap();
        let symbols = processor.vocab().ids_to_symbols(&ids).unwrap();

        assert_eq!(symbols[4], ",");
        assert_eq!(symbols[9], ".");
        assert!(processor.setup_eos_token().is_none());
        assert_ne!(*ids.last().unwrap(), processor.vocab().eos_id());
    }

    #[test]
    fn test_train_mode_unknown_symbol() {
        let processor = train_processor();
        let err = processor.text_to_sequence("k x t").unwrap_err();
        assert!(matches!(err, DatasetError::UnknownSymbol { ref symbol } if symbol == "@x"));
    }

    #[test]
    fn test_train_mode_ignores_phonemizer() {
        // The disabled phonemizer would fail if it were consulted.
        assert!(train_processor().text_to_sequence("ð ə").is_ok());
    }

    #[test]
    fn test_inference_mode_breaks_are_separate_tokens() {
        let processor = inference_processor();
        let symbols = processor.text_to_phonemes("The cat. The cat sat, the cat!").unwrap();

        assert_eq!(
            symbols,
            vec![
                "@ð", "@ə", "@k", "@ˈæ", "@t", ".", "@ð", "@ə", "@k", "@ˈæ", "@t", "@s", "@ˈæ",
                "@t", ",", "@ð", "@ə", "@k", "@ˈæ", "@t", "!"
            ]
        );
        let ids = processor.text_to_sequence("The cat.").unwrap();
        assert_eq!(ids.len(), 6);
        assert_eq!(ids[5], processor.vocab().symbol_to_id(".").unwrap());
    }

    #[test]
    fn test_inference_mode_without_phonemizer() {
        let processor = EnglishIpaProcessor::from_records(
            ProcessorConfig::new("/data").with_mode(Mode::Inference),
            Vec::new(),
        );
        assert!(matches!(
            processor.text_to_sequence("the cat"),
            Err(DatasetError::Phonemizer(_))
        ));
    }

    #[test]
    fn test_get_one_sample() {
        let dir = tempfile::tempdir().unwrap();
        let item = record(dir.path(), "LJ001-0001", "k ˈæ t .", "ljspeech");
        save_wav(&[0.0, 0.1, -0.1, 0.2], &item.wav_path, 22050).unwrap();

        let processor = train_processor();
        let sample = processor.get_one_sample(&item).unwrap();

        assert_eq!(sample.utt_id, "LJ001-0001");
        assert_eq!(sample.speaker_name, "ljspeech");
        assert_eq!(sample.raw_text, "k ˈæ t .");
        assert_eq!(sample.rate, 22050);
        assert_eq!(sample.text_ids.len(), 4);
        assert_eq!(sample.num_frames(), 4);
        assert!(sample.duration_secs() > 0.0);
    }

    #[test]
    fn test_get_one_sample_missing_audio() {
        let dir = tempfile::tempdir().unwrap();
        let item = record(dir.path(), "missing", "k", "spk");

        let err = train_processor().get_one_sample(&item).unwrap_err();
        assert!(matches!(err, DatasetError::Record { ref utt_id, .. } if utt_id == "missing"));
        assert!(matches!(err.root_cause(), DatasetError::AudioDecode { .. }));
    }

    #[test]
    fn test_get_one_sample_unknown_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let item = record(dir.path(), "bad", "k q", "spk");
        save_wav(&[0.0; 8], &item.wav_path, 16000).unwrap();

        let err = train_processor().get_one_sample(&item).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            DatasetError::UnknownSymbol { symbol } if symbol == "@q"
        ));
    }

    #[test]
    fn test_speaker_map_first_appearance() {
        let dir = Path::new("/data");
        let items = vec![
            record(dir, "a", "k", "zoe"),
            record(dir, "b", "k", "adam"),
            record(dir, "c", "k", "zoe"),
        ];
        let processor = EnglishIpaProcessor::from_records(ProcessorConfig::new(dir), items);
        let map = processor.speaker_map();

        assert_eq!(map.len(), 2);
        assert_eq!(map["zoe"], 0);
        assert_eq!(map["adam"], 1);
    }

    #[test]
    fn test_save_pretrained_writes_empty_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("processor");
        let processor = train_processor();

        let path = processor.save_pretrained(&out).unwrap();
        assert_eq!(path, out.join(PROCESSOR_FILE_NAME));
        assert!(path.exists());
        assert!(load_processor_mapper(&out).unwrap().is_empty());

        // Saving again into an existing directory is fine.
        processor.save_pretrained(&out).unwrap();
    }
}
