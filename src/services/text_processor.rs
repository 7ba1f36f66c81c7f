// Text Processing Service
// Normalization, sentence splitting and stylometry used by the local analyzers

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn word_regex() -> &'static Regex {
    static WORD_RE: OnceLock<Regex> = OnceLock::new();
    WORD_RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_']+|[\u{4e00}-\u{9fff}]").expect("valid word regex"))
}

/// Normalize punctuation and whitespace before analysis
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s = text
        .replace(&['\u{201c}', '\u{201d}'][..], "\"")
        .replace(&['\u{2018}', '\u{2019}'][..], "'")
        .replace('\u{2014}', "-")
        .replace(&['\u{3000}', '\u{00A0}'][..], " ");

    // Normalize line endings
    s = s.replace("\r\n", "\n").replace('\r', "\n");

    // Collapse horizontal whitespace and strip each line
    s.lines()
        .map(|ln| {
            ln.split(|c: char| matches!(c, ' ' | '\t' | '\x0C' | '\x0B'))
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Word tokens (ASCII words, CJK characters)
pub fn tokenize_words(text: &str) -> Vec<&str> {
    word_regex().find_iter(text).map(|m| m.as_str()).collect()
}

/// Sentence splitting that keeps quoted sentences and decimal numbers intact
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut buffer = String::new();
    let mut in_quote = false;

    for (i, &ch) in chars.iter().enumerate() {
        buffer.push(ch);

        if ch == '"' {
            in_quote = !in_quote;
            continue;
        }
        if in_quote || !['。', '！', '？', '.', '!', '?'].contains(&ch) {
            continue;
        }
        // 3.14 is not a sentence end
        if ch == '.'
            && i > 0
            && i + 1 < chars.len()
            && chars[i - 1].is_ascii_digit()
            && chars[i + 1].is_ascii_digit()
        {
            continue;
        }
        // Collapse "?!" / "..." runs into one terminator
        if i + 1 < chars.len() && ['.', '!', '?'].contains(&chars[i + 1]) {
            continue;
        }

        let sentence = buffer.trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        buffer.clear();
    }

    let remaining = buffer.trim();
    if !remaining.is_empty() {
        sentences.push(remaining.to_string());
    }

    sentences
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StylometryMetrics {
    pub word_count: usize,
    pub sentence_count: usize,
    pub ttr: f64, // Type-Token Ratio
    /// Average sentence length in words
    pub avg_sentence_words: f64,
    pub repeat_ratio: f64,
    pub ngram_repeat_rate: f64,
}

/// Compute stylometry metrics for text
pub fn compute_stylometry(text: &str) -> StylometryMetrics {
    let words: Vec<String> = tokenize_words(text).iter().map(|w| w.to_lowercase()).collect();
    let total_words = words.len();

    if total_words == 0 {
        return StylometryMetrics::default();
    }

    let unique_words: HashSet<&str> = words.iter().map(|w| w.as_str()).collect();
    let ttr = unique_words.len() as f64 / total_words as f64;

    let sentence_count = split_sentences(text).len().max(1);
    let avg_sentence_words = total_words as f64 / sentence_count as f64;

    // Fraction of vocab items that occur >= 3 times
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for w in &words {
        *freq.entry(w.as_str()).or_insert(0) += 1;
    }
    let repeat_ratio = freq.values().filter(|&&v| v >= 3).count() as f64 / freq.len().max(1) as f64;

    let refs: Vec<&str> = words.iter().map(|w| w.as_str()).collect();
    let ngram_repeat_rate = ngram_repeat_rate(&refs, 3);

    StylometryMetrics {
        word_count: total_words,
        sentence_count,
        ttr,
        avg_sentence_words,
        repeat_ratio,
        ngram_repeat_rate,
    }
}

/// Share of n-grams that repeat an earlier n-gram
pub fn ngram_repeat_rate(tokens: &[&str], n: usize) -> f64 {
    if n == 0 || tokens.len() < n + 1 {
        return 0.0;
    }
    let mut counts: HashMap<&[&str], usize> = HashMap::new();
    let mut total = 0usize;
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
        total += 1;
    }
    let repeats = counts.values().filter(|&&c| c >= 2).map(|&c| c - 1).sum::<usize>();
    repeats as f64 / total.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_punctuation() {
        let text = "\u{201c}Hello\u{201d}\u{00A0}\u{00A0}world \u{2014} again\r\n  next   line  ";
        assert_eq!(normalize_punctuation(text), "\"Hello\" world - again\nnext line");
        assert_eq!(normalize_punctuation(""), "");
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("Pi is 3.14 today. Is it? Yes!! \"Stop. Now.\" he said.");
        assert_eq!(
            sentences,
            vec!["Pi is 3.14 today.", "Is it?", "Yes!!", "\"Stop. Now.\" he said."]
        );
    }

    #[test]
    fn test_stylometry_basic() {
        let m = compute_stylometry("The cat sat. The cat sat. The cat sat.");
        assert_eq!(m.word_count, 9);
        assert_eq!(m.sentence_count, 3);
        assert!((m.avg_sentence_words - 3.0).abs() < 1e-9);
        assert!((m.ttr - 3.0 / 9.0).abs() < 1e-9);
        assert_eq!(m.repeat_ratio, 1.0);
        assert!(m.ngram_repeat_rate > 0.5);

        assert_eq!(compute_stylometry("").word_count, 0);
    }

    #[test]
    fn test_ngram_repeat_rate_unique() {
        let tokens = ["a", "b", "c", "d", "e"];
        assert_eq!(ngram_repeat_rate(&tokens, 3), 0.0);
        assert_eq!(ngram_repeat_rate(&tokens[..3], 3), 0.0);
    }
}
