//! Grapheme-to-phoneme engines and phoneme token cleaning.

use crate::error::{DatasetError, Result};
use crate::vocab::{PHONEME_MARKER, PUNCTUATION};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One word as segmented by a phonemizer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Word {
    /// Surface text of the word (or of the break).
    pub text: String,
    /// Phoneme symbols in order, without the vocabulary marker.
    pub phonemes: Vec<String>,
    /// Sentence-final break such as `.` or `?`.
    pub is_major_break: bool,
    /// Phrase break such as `,`.
    pub is_minor_break: bool,
}

impl Word {
    pub fn is_break(&self) -> bool {
        self.is_major_break || self.is_minor_break
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sentence {
    pub words: Vec<Word>,
}

/// Text to sentences of words with phonemes or break flags.
pub trait Phonemizer: Send + Sync {
    fn sentences(&self, text: &str) -> Result<Vec<Sentence>>;

    /// Human-readable name of this engine.
    fn name(&self) -> &'static str;
}

/// Flatten phonemizer output to raw tokens: breaks become their literal
/// text, every other word contributes each of its phonemes.
pub fn words_to_tokens(sentences: &[Sentence]) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in sentences.iter().flat_map(|s| s.words.iter()) {
        if word.is_break() {
            tokens.push(word.text.clone());
        } else {
            tokens.extend(word.phonemes.iter().cloned());
        }
    }
    tokens
}

/// Turn raw tokens into vocabulary symbols: punctuation stays as is, a lone
/// space is dropped, anything else gets the phoneme marker.
pub fn clean_g2p<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    tokens
        .iter()
        .map(|token| -> &str { token.as_ref() })
        .filter(|token| *token != " ")
        .map(|token| {
            if is_punctuation(token) {
                token.to_string()
            } else {
                format!("{PHONEME_MARKER}{token}")
            }
        })
        .collect()
}

fn is_punctuation(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if PUNCTUATION.contains(c))
}

/// Used when no engine is configured; train-mode text never reaches it.
#[derive(Debug, Default)]
pub struct DisabledPhonemizer;

impl Phonemizer for DisabledPhonemizer {
    fn sentences(&self, _text: &str) -> Result<Vec<Sentence>> {
        Err(DatasetError::Phonemizer(
            "no phonemizer configured; inference mode needs a lexicon".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "Disabled"
    }
}

const MAJOR_BREAKS: &str = ".?!";
const MINOR_BREAKS: &str = ",;:";

/// Dictionary phonemizer backed by a pronunciation lexicon.
///
/// Lexicon lines look like `hello h ə l ˈoʊ`: the word, then its phonemes
/// separated by whitespace. Blank lines and lines starting with `#` or `;;;`
/// are skipped. Lookups are case-insensitive; the first entry for a word wins.
#[derive(Debug, Default)]
pub struct LexiconPhonemizer {
    entries: HashMap<String, Vec<String>>,
}

impl LexiconPhonemizer {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| DatasetError::fs(path, e))?;
        let mut lexicon = Self::default();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| DatasetError::fs(path, e))?;
            lexicon.add_line(&line).map_err(|message| {
                DatasetError::Phonemizer(format!(
                    "{}:{}: {message}",
                    path.display(),
                    idx + 1
                ))
            })?;
        }
        log::info!(
            "Loaded lexicon with {} entries from {}",
            lexicon.len(),
            path.display()
        );
        Ok(lexicon)
    }

    pub fn from_entries<I, W, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (W, Vec<P>)>,
        W: AsRef<str>,
        P: Into<String>,
    {
        let mut lexicon = Self::default();
        for (word, phonemes) in entries {
            lexicon.insert(word.as_ref(), phonemes.into_iter().map(Into::into).collect());
        }
        lexicon
    }

    fn add_line(&mut self, line: &str) -> std::result::Result<(), String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(";;;") {
            return Ok(());
        }
        let mut fields = line.split_whitespace();
        let word = fields.next().unwrap_or_default();
        let phonemes: Vec<String> = fields.map(str::to_string).collect();
        if phonemes.is_empty() {
            return Err(format!("entry {word:?} has no phonemes"));
        }
        self.insert(word, phonemes);
        Ok(())
    }

    fn insert(&mut self, word: &str, phonemes: Vec<String>) {
        self.entries
            .entry(word.to_lowercase())
            .or_insert(phonemes);
    }

    pub fn lookup(&self, word: &str) -> Option<&[String]> {
        self.entries.get(&word.to_lowercase()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn word(&self, text: &str) -> Result<Word> {
        let phonemes = self.lookup(text).ok_or_else(|| {
            DatasetError::Phonemizer(format!("word {text:?} is not in the lexicon"))
        })?;
        Ok(Word {
            text: text.to_string(),
            phonemes: phonemes.to_vec(),
            ..Word::default()
        })
    }
}

impl Phonemizer for LexiconPhonemizer {
    fn sentences(&self, text: &str) -> Result<Vec<Sentence>> {
        let mut sentences = Vec::new();
        let mut current = Sentence::default();
        let mut pending = String::new();

        for ch in text.chars() {
            if ch.is_alphanumeric() || ch == '\'' {
                pending.push(ch);
                continue;
            }
            if !pending.is_empty() {
                current.words.push(self.word(&pending)?);
                pending.clear();
            }
            if MAJOR_BREAKS.contains(ch) {
                current.words.push(Word {
                    text: ch.to_string(),
                    is_major_break: true,
                    ..Word::default()
                });
                sentences.push(std::mem::take(&mut current));
            } else if MINOR_BREAKS.contains(ch) {
                current.words.push(Word {
                    text: ch.to_string(),
                    is_minor_break: true,
                    ..Word::default()
                });
            }
        }
        if !pending.is_empty() {
            current.words.push(self.word(&pending)?);
        }
        if !current.words.is_empty() {
            sentences.push(current);
        }
        Ok(sentences)
    }

    fn name(&self) -> &'static str {
        "Lexicon"
    }
}
