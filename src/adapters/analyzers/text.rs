//! Small text utilities shared by the reference analyzers.

use std::collections::HashMap;

/// Lowercased word tokens. Apostrophes stay inside words ("don't").
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Term-frequency vector of a token list.
pub fn term_frequencies(tokens: &[String]) -> HashMap<&str, f64> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    counts
}

/// Cosine similarity of two sparse vectors; 0.0 when either is empty.
pub fn cosine_similarity(a: &HashMap<&str, f64>, b: &HashMap<&str, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values().map(|y| y * y).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_splits_punctuation() {
        assert_eq!(tokenize("Hello, World! Don't 'quote'"), vec!["hello", "world", "don't", "quote"]);
    }

    #[test]
    fn identical_texts_have_similarity_one() {
        let a = tokenize("pricing plans for teams");
        let b = tokenize("Pricing plans for teams");
        let sim = cosine_similarity(&term_frequencies(&a), &term_frequencies(&b));
        assert!((sim - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_texts_have_similarity_zero() {
        let a = tokenize("pricing plans");
        let b = tokenize("weather today");
        assert_eq!(cosine_similarity(&term_frequencies(&a), &term_frequencies(&b)), 0.0);
    }

    #[test]
    fn empty_text_has_similarity_zero() {
        let a = tokenize("");
        let b = tokenize("anything");
        assert_eq!(cosine_similarity(&term_frequencies(&a), &term_frequencies(&b)), 0.0);
    }
}
