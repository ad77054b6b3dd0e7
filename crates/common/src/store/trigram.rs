//! Trigram similarity with pg_trgm semantics
//!
//! Each lowercased alphanumeric word is padded with two leading spaces and
//! one trailing space before being split into trigrams; similarity is the
//! Jaccard index of the two trigram sets.

use std::collections::HashSet;

/// Distinct trigrams of `text`
pub fn trigrams(text: &str) -> HashSet<String> {
    let mut grams = HashSet::new();

    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = format!("  {} ", word.to_lowercase()).chars().collect();
        for window in padded.windows(3) {
            grams.insert(window.iter().collect());
        }
    }

    grams
}

/// `similarity(a, b)` as computed by pg_trgm, in `[0, 1]`
pub fn similarity(a: &str, b: &str) -> f64 {
    let left = trigrams(a);
    let right = trigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(&right).count();
    let total = left.len() + right.len() - shared;
    shared as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_trigrams() {
        let grams = trigrams("cat");
        let expected: HashSet<String> = ["  c", " ca", "cat", "at "]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(grams, expected);
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("Rust", "rust"), 1.0);
        assert_eq!(similarity("", "rust"), 0.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_typo_tolerance() {
        let close = similarity("postgres", "postgers");
        let far = similarity("postgres", "gardening");
        assert!(close > 0.3, "close = {close}");
        assert!(far < close);
    }
}
