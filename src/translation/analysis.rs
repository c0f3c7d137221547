/*!
 * Document analysis performed before translation.
 *
 * Counts the structural Markdown features of the input and picks out the
 * terms that should be rendered consistently across chunks.
 */

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CODE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t].*$").unwrap());
static LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t].*(?:\n[ \t]*[-*+][ \t].*)*").unwrap());
static TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\|.*\|[ \t]*(?:\n\|.*\|[ \t]*)+").unwrap());
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Za-z][A-Za-z0-9_]+\b").unwrap());

/// Words never reported as key terms
const STOPWORDS: &[&str] = &["the", "and", "for", "that", "this", "from", "with", "not", "have", "has"];

/// Extra weight given to identifiers that appear inside fenced code
const CODE_IDENTIFIER_BONUS: usize = 2;

/// Counts of structural Markdown elements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatElements {
    pub code_blocks: usize,
    pub headers: usize,
    pub lists: usize,
    pub tables: usize,
}

/// Count fenced code blocks, ATX headers, list runs and pipe tables
pub fn identify_format_elements(text: &str) -> FormatElements {
    FormatElements {
        code_blocks: CODE_BLOCK_RE.find_iter(text).count(),
        headers: HEADER_RE.find_iter(text).count(),
        lists: LIST_RE.find_iter(text).count(),
        tables: TABLE_RE.find_iter(text).count(),
    }
}

/// Most frequent terms of the document, at most `max_terms` of them.
///
/// Identifiers that also occur inside fenced code get a bonus per code
/// occurrence. Ties keep the order of first appearance. Short words and
/// common English function words are dropped.
pub fn extract_key_terms(text: &str, max_terms: usize) -> Vec<String> {
    if max_terms == 0 {
        return Vec::new();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for word in WORD_RE.find_iter(text).map(|m| m.as_str()) {
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            first_seen.push(word);
        }
        *count += 1;
    }

    for block in CODE_BLOCK_RE.find_iter(text) {
        for identifier in WORD_RE.find_iter(block.as_str()) {
            if let Some(count) = counts.get_mut(identifier.as_str()) {
                *count += CODE_IDENTIFIER_BONUS;
            }
        }
    }

    let mut ranked: Vec<(usize, &str)> = first_seen.iter().map(|w| (counts[w], *w)).collect();
    // stable sort keeps first-appearance order among equal counts
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();

    ranked
        .into_iter()
        .take(max_terms * 2)
        .map(|(_, word)| word)
        .filter(|word| word.chars().count() > 3 && !stopwords.contains(word.to_lowercase().as_str()))
        .take(max_terms)
        .map(str::to_string)
        .collect()
}
