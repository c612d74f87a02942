//! Word tokenisation strategies.
//!
//! The scorer only needs "how many words, how long are they", so a tokenizer
//! returns borrowed slices of the input and nothing else. Both implementations
//! keep only tokens containing at least one alphabetic character from any
//! script; bare numbers and punctuation never count as words.

use unicode_segmentation::UnicodeSegmentation;

/// Splits normalised text into word tokens.
pub trait Tokenizer: Send + Sync {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// Splits on every character that is neither alphabetic nor numeric.
///
/// Works for any script whose words are separated by whitespace or
/// punctuation and has no dependencies beyond `char` properties, so it is
/// always available. Contractions split (`don't` → `don`, `t`).
#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalTokenizer;

impl Tokenizer for UniversalTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| has_letter(token))
            .collect()
    }
}

/// UAX #29 word boundaries via `unicode-segmentation`.
///
/// Keeps contractions, hyphen-free compounds and decimal numbers together,
/// which gives slightly more faithful average word lengths on Latin text.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeWordTokenizer;

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.unicode_words().filter(|token| has_letter(token)).collect()
    }
}

fn has_letter(token: &str) -> bool {
    token.chars().any(char::is_alphabetic)
}
