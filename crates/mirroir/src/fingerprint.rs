//! Structural screen fingerprinting and similarity
//!
//! A fingerprint is a stable digest of a screen's text content plus the
//! rough positions of its icons. Fingerprint equality is sufficient but
//! not necessary for "same screen"; near-misses are resolved by Jaccard
//! similarity over the normalized text sets.

use std::collections::HashSet;

use crate::types::{Icon, TapPoint};

/// Jaccard similarity at or above this value means "same screen".
pub const SIMILARITY_THRESHOLD: f64 = 0.80;

/// Minimum normalized text length for a text to contribute to a fingerprint.
const MIN_TEXT_LEN: usize = 3;

/// Side length of the grid cells icon positions are bucketed into.
const ICON_BUCKET_PT: f64 = 50.0;

/// Strip punctuation, collapse case. Keeps alphanumerics and single spaces.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if c.is_whitespace() && !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// The set of normalized, non-empty element texts on a screen.
pub fn normalized_text_set(elements: &[TapPoint]) -> HashSet<String> {
    elements
        .iter()
        .map(|e| normalize_text(&e.text))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Compute the structural fingerprint of a screen.
///
/// Texts are normalized, filtered to length >= 3 and sorted, so ordering
/// within the OCR output is irrelevant by construction. Icon positions are
/// bucketed into 50-pt grid cells and appended as sorted `bx,by:count`
/// entries. The joined representation is digested with blake3.
pub fn compute(elements: &[TapPoint], icons: &[Icon]) -> String {
    let mut texts: Vec<String> = elements
        .iter()
        .map(|e| normalize_text(&e.text))
        .filter(|t| t.chars().count() >= MIN_TEXT_LEN)
        .collect();
    texts.sort();
    texts.dedup();

    let mut buckets: Vec<(i64, i64)> = icons
        .iter()
        .map(|i| {
            (
                (i.x / ICON_BUCKET_PT).floor() as i64,
                (i.y / ICON_BUCKET_PT).floor() as i64,
            )
        })
        .collect();
    buckets.sort();

    let mut parts = texts;
    let mut i = 0;
    while i < buckets.len() {
        let cell = buckets[i];
        let count = buckets[i..].iter().take_while(|b| **b == cell).count();
        parts.push(format!("{},{}:{}", cell.0, cell.1, count));
        i += count;
    }

    let digest = blake3::hash(parts.join("|").as_bytes());
    digest.to_hex()[..16].to_string()
}

/// Jaccard similarity of two screens' normalized text sets.
///
/// Two empty screens are considered identical (1.0).
pub fn jaccard_similarity(a: &[TapPoint], b: &[TapPoint]) -> f64 {
    let sa = normalized_text_set(a);
    let sb = normalized_text_set(b);
    if sa.is_empty() && sb.is_empty() {
        return 1.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    intersection as f64 / union as f64
}
