//! Character-distribution entropy.

use std::collections::HashMap;

/// Computes an entropy figure for a string.
///
/// Implementations must return 0 for empty input and must not depend on
/// anything but the input.
pub trait EntropyCalculator: Send + Sync {
    fn entropy(&self, text: &str) -> f64;
}

/// Raw Shannon entropy over the character frequency distribution, in bits
/// per character: `−Σ p·log₂ p`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShannonEntropy;

impl EntropyCalculator for ShannonEntropy {
    fn entropy(&self, text: &str) -> f64 {
        shannon(text).0
    }
}

/// Shannon entropy rescaled onto a 0–`scale` range.
///
/// The raw figure is divided by the maximum entropy reachable with the same
/// number of distinct characters (`log₂ k`), so a perfectly even distribution
/// scores `scale` whatever the alphabet size.
#[derive(Debug, Clone, Copy)]
pub struct ScaledEntropy {
    pub scale: f64,
}

impl Default for ScaledEntropy {
    fn default() -> Self {
        Self { scale: 10.0 }
    }
}

impl EntropyCalculator for ScaledEntropy {
    fn entropy(&self, text: &str) -> f64 {
        let (bits, distinct) = shannon(text);
        if distinct < 2 {
            return 0.0;
        }
        bits / (distinct as f64).log2() * self.scale
    }
}

/// Returns `(bits per char, distinct char count)`.
fn shannon(text: &str) -> (f64, usize) {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in text.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return (0.0, 0);
    }

    let total = total as f64;
    let bits = counts
        .values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>();
    (bits, counts.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_symbol_has_zero_entropy() {
        assert_eq!(ShannonEntropy.entropy("........"), 0.0);
        assert_eq!(ScaledEntropy::default().entropy("aaaa"), 0.0);
    }

    #[test]
    fn two_even_symbols_have_one_bit() {
        let h = ShannonEntropy.entropy("abababab");
        assert!((h - 1.0).abs() < 1e-9, "got {h}");
    }

    #[test]
    fn scaled_even_distribution_hits_scale() {
        let h = ScaledEntropy::default().entropy("abcd");
        assert!((h - 10.0).abs() < 1e-9, "got {h}");
    }

    #[test]
    fn prose_is_well_above_threshold() {
        let h = ShannonEntropy.entropy("The quick brown fox jumps over the lazy dog");
        assert!(h > 3.5, "got {h}");
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(ShannonEntropy.entropy(""), 0.0);
    }
}
