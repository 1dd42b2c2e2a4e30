//! The fixed English IPA symbol vocabulary.
//!
//! The position of each symbol in the table is its id. Reordering or editing
//! the table invalidates every dataset encoded with it.

use crate::error::{DatasetError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Marker prepended to every phoneme so it cannot collide with punctuation.
pub const PHONEME_MARKER: char = '@';

/// Punctuation kept verbatim in the symbol stream.
pub const PUNCTUATION: &str = "!,.?;:";

pub const PAD: &str = "@PAD";
pub const SIL: &str = "@SIL";
pub const EOS: &str = "@EOS";

/// English IPA phoneme inventory, stress marks fused with their vowel.
pub const VALID_SYMBOLS: [&str; 69] = [
    "aɪ", "aʊ", "b", "d", "d͡ʒ", "eɪ", "f", "h", "i", "j", "k", "l", "m", "n", "oʊ", "p", "s",
    "t", "t͡ʃ", "u", "v", "w", "z", "æ", "ð", "ŋ", "ɑ", "ɔ", "ə", "ɚ", "ɛ", "ɡ", "ɪ", "ɹ", "ʃ",
    "ʊ", "ʌ", "ʒ", "ˈaɪ", "ˈaʊ", "ˈeɪ", "ˈi", "ˈoʊ", "ˈu", "ˈæ", "ˈɑ", "ˈɔ", "ˈɔɪ", "ˈɚ",
    "ˈɛ", "ˈɪ", "ˈʊ", "ˈʌ", "ˌaɪ", "ˌaʊ", "ˌeɪ", "ˌi", "ˌoʊ", "ˌu", "ˌæ", "ˌɑ", "ˌɔ", "ˌɔɪ",
    "ˌɚ", "ˌɛ", "ˌɪ", "ˌʊ", "ˌʌ", "θ",
];

/// Ordered symbol table with its reverse index.
#[derive(Debug, Serialize)]
pub struct Vocab {
    symbols: Vec<String>,
    #[serde(skip)]
    ids: HashMap<String, i32>,
}

impl Vocab {
    /// The process-wide English IPA table:
    /// `@PAD`, `@`-prefixed phonemes, punctuation, `@SIL`, `@EOS`.
    pub fn english_ipa() -> &'static Vocab {
        static VOCAB: OnceLock<Vocab> = OnceLock::new();
        VOCAB.get_or_init(|| {
            let mut symbols = Vec::with_capacity(VALID_SYMBOLS.len() + PUNCTUATION.len() + 3);
            symbols.push(PAD.to_string());
            symbols.extend(
                VALID_SYMBOLS
                    .iter()
                    .map(|s| format!("{PHONEME_MARKER}{s}")),
            );
            symbols.extend(PUNCTUATION.chars().map(String::from));
            symbols.push(SIL.to_string());
            symbols.push(EOS.to_string());
            Vocab::from_symbols(symbols)
        })
    }

    fn from_symbols(symbols: Vec<String>) -> Self {
        let ids = symbols
            .iter()
            .enumerate()
            .map(|(id, symbol)| (symbol.clone(), id as i32))
            .collect();
        Self { symbols, ids }
    }

    /// Look up one cleaned symbol.
    pub fn symbol_to_id(&self, symbol: &str) -> Result<i32> {
        self.ids
            .get(symbol)
            .copied()
            .ok_or_else(|| DatasetError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }

    /// Look up a cleaned symbol list. Stops at the first unknown symbol.
    pub fn symbols_to_ids<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Vec<i32>> {
        symbols
            .iter()
            .map(|s| self.symbol_to_id(s.as_ref()))
            .collect()
    }

    pub fn id_to_symbol(&self, id: i32) -> Result<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.symbols.get(idx))
            .map(String::as_str)
            .ok_or(DatasetError::UnknownId { id })
    }

    pub fn ids_to_symbols(&self, ids: &[i32]) -> Result<Vec<&str>> {
        ids.iter().map(|&id| self.id_to_symbol(id)).collect()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.ids.contains_key(symbol)
    }

    pub fn pad_id(&self) -> i32 {
        self.ids[PAD]
    }

    pub fn sil_id(&self) -> i32 {
        self.ids[SIL]
    }

    pub fn eos_id(&self) -> i32 {
        self.ids[EOS]
    }

    /// Symbols in id order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Serialize the ordered table as `{"symbols": [...]}`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Get the vocabulary size.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_layout() {
        let vocab = Vocab::english_ipa();

        assert_eq!(vocab.len(), 1 + 69 + 6 + 1 + 1);
        assert_eq!(vocab.pad_id(), 0);
        assert_eq!(vocab.id_to_symbol(1).unwrap(), "@aɪ");
        assert_eq!(vocab.id_to_symbol(69).unwrap(), "@θ");
        assert_eq!(vocab.symbol_to_id("!").unwrap(), 70);
        assert_eq!(vocab.symbol_to_id(":").unwrap(), 75);
        assert_eq!(vocab.sil_id(), 76);
        assert_eq!(vocab.eos_id(), 77);
    }

    #[test]
    fn test_ids_are_positions() {
        let vocab = Vocab::english_ipa();
        for (idx, symbol) in vocab.symbols().iter().enumerate() {
            assert_eq!(vocab.symbol_to_id(symbol).unwrap(), idx as i32);
        }
    }

    #[test]
    fn test_unknown_symbol() {
        let vocab = Vocab::english_ipa();

        // Unprefixed phonemes are not vocabulary members.
        let err = vocab.symbol_to_id("k").unwrap_err();
        assert!(matches!(err, DatasetError::UnknownSymbol { ref symbol } if symbol == "k"));

        let err = vocab.symbols_to_ids(&["@k", "@q"]).unwrap_err();
        assert!(matches!(err, DatasetError::UnknownSymbol { ref symbol } if symbol == "@q"));
    }

    #[test]
    fn test_unknown_id() {
        let vocab = Vocab::english_ipa();
        assert!(matches!(
            vocab.id_to_symbol(-1),
            Err(DatasetError::UnknownId { id: -1 })
        ));
        assert!(vocab.id_to_symbol(vocab.len() as i32).is_err());
    }

    #[test]
    fn test_to_json_keeps_order() {
        let json = Vocab::english_ipa().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let symbols = value["symbols"].as_array().unwrap();
        assert_eq!(symbols.len(), 78);
        assert_eq!(symbols[0], "@PAD");
        assert_eq!(symbols[77], "@EOS");
    }
}
