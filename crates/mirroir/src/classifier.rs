//! Element classification
//!
//! Turns the flat OCR element list into semantically labelled elements.
//! Classification is purely textual plus row context: a chevron glyph on
//! the same row promotes its label to navigation, a state literal ("On",
//! "Connected") promotes the row's label to a state change.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ClassifiedElement, ElementRole, TapPoint};

/// Two elements share a row iff their Y coordinates differ by at most this.
pub const ROW_TOLERANCE_PT: f64 = 15.0;

/// Texts below this length are decoration.
const MIN_LABEL_LEN: usize = 3;

/// Texts above this length are informational prose.
const LONG_TEXT_LEN: usize = 50;

const CHEVRON_VARIANTS: [&str; 3] = [">", "\u{203a}", "\u{276f}"];

static DESTRUCTIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^sign out$",
        r"(?i)^log ?out$",
        r"(?i)^delete\b",
        r"(?i)^remove\b",
        r"(?i)^erase\b",
        r"(?i)^reset\b",
        r"(?i)^supprimer\b",
        r"(?i)^effacer\b",
        r"(?i)^d[ée]connexion$",
        r"(?i)^eliminar\b",
        r"(?i)^cerrar sesi[oó]n$",
        r"(?i)^airplane mode$",
        r"(?i)^mode avion$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static destructive pattern"))
    .collect()
});

static VALUE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d+([.,]\d+)?\s*(gb|mb|kb|tb|%|km)$").expect("static value pattern")
});

/// Literals indicating a toggle or connection state.
const STATE_LITERALS: [&str; 5] = ["On", "Off", "Connected", "Auto", "None"];

const HELP_LINK_PHRASES: [&str; 3] = ["learn more", "en savoir plus", "más información"];

const CONJUNCTIONS: [&str; 4] = [" and ", " or ", " et ", " ou "];

/// Group element indices into rows by Y proximity.
///
/// Returns one Vec of indices per row, rows ordered top to bottom. An
/// element joins the row whose anchor (first member) is within tolerance.
pub(crate) fn group_rows(ys: &[f64], tolerance: f64) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..ys.len()).collect();
    order.sort_by(|&a, &b| ys[a].partial_cmp(&ys[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut anchor = f64::NEG_INFINITY;
    for idx in order {
        if (ys[idx] - anchor).abs() <= tolerance {
            if let Some(row) = rows.last_mut() {
                row.push(idx);
            }
        } else {
            anchor = ys[idx];
            rows.push(vec![idx]);
        }
    }
    rows
}

fn is_chevron(text: &str) -> bool {
    CHEVRON_VARIANTS.contains(&text.trim())
}

fn is_all_punctuation(text: &str) -> bool {
    !text.trim().is_empty() && text.trim().chars().all(|c| !c.is_alphanumeric())
}

fn is_destructive(text: &str) -> bool {
    let t = text.trim();
    DESTRUCTIVE_PATTERNS.iter().any(|re| re.is_match(t))
}

fn is_state_literal(text: &str) -> bool {
    STATE_LITERALS.contains(&text.trim())
}

fn is_value_text(text: &str) -> bool {
    let t = text.trim();
    VALUE_PATTERN.is_match(t) || is_state_literal(t)
}

fn is_sentence_like(text: &str) -> bool {
    text.contains(',') && CONJUNCTIONS.iter().any(|c| text.to_lowercase().contains(c))
}

fn is_help_link(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    HELP_LINK_PHRASES.iter().any(|p| lower == *p)
}

/// Per-element verdict from the first, row-free pass.
#[derive(Clone, Copy, PartialEq)]
enum BaseRole {
    Decoration { chevron: bool },
    Destructive,
    /// Info by value/state pattern; never overridden by chevron context
    ValueInfo,
    /// Info by length or phrasing; chevron context wins over this
    ProseInfo,
    Unassigned,
}

/// Classifies OCR elements, preserving input order.
#[derive(Debug, Clone)]
pub struct ElementClassifier {
    row_tolerance: f64,
}

impl Default for ElementClassifier {
    fn default() -> Self {
        Self {
            row_tolerance: ROW_TOLERANCE_PT,
        }
    }
}

impl ElementClassifier {
    pub fn new(row_tolerance: f64) -> Self {
        Self { row_tolerance }
    }

    pub fn classify(&self, elements: &[TapPoint]) -> Vec<ClassifiedElement> {
        let base: Vec<BaseRole> = elements.iter().map(|e| Self::base_role(&e.text)).collect();

        let ys: Vec<f64> = elements.iter().map(|e| e.y).collect();
        let rows = group_rows(&ys, self.row_tolerance);

        // Row context: which rows carry a chevron or a state indicator.
        let mut row_of = vec![0usize; elements.len()];
        let mut row_has_chevron = vec![false; rows.len()];
        let mut row_has_state = vec![false; rows.len()];
        for (r, row) in rows.iter().enumerate() {
            for &i in row {
                row_of[i] = r;
                match base[i] {
                    BaseRole::Decoration { chevron: true } => row_has_chevron[r] = true,
                    BaseRole::ValueInfo if is_state_literal(&elements[i].text) => {
                        row_has_state[r] = true
                    }
                    _ => {}
                }
            }
        }

        elements
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let r = row_of[i];
                let (role, chevron_ctx) = match base[i] {
                    BaseRole::Decoration { .. } => (ElementRole::Decoration, false),
                    BaseRole::Destructive => (ElementRole::Destructive, false),
                    BaseRole::ValueInfo => (ElementRole::Info, false),
                    // Chevron context wins over length-based info.
                    BaseRole::ProseInfo if row_has_chevron[r] => (ElementRole::Navigation, true),
                    BaseRole::ProseInfo => (ElementRole::Info, false),
                    BaseRole::Unassigned if row_has_state[r] => (ElementRole::StateChange, false),
                    BaseRole::Unassigned if row_has_chevron[r] => (ElementRole::Navigation, true),
                    BaseRole::Unassigned => (ElementRole::Navigation, false),
                };
                ClassifiedElement {
                    point: e.clone(),
                    role,
                    has_chevron_context: chevron_ctx,
                }
            })
            .collect()
    }

    fn base_role(text: &str) -> BaseRole {
        let t = text.trim();
        if is_chevron(t) {
            return BaseRole::Decoration { chevron: true };
        }
        if t.chars().count() < MIN_LABEL_LEN || is_all_punctuation(t) {
            return BaseRole::Decoration { chevron: false };
        }
        if is_destructive(t) {
            return BaseRole::Destructive;
        }
        if is_value_text(t) {
            return BaseRole::ValueInfo;
        }
        if t.chars().count() > LONG_TEXT_LEN || is_sentence_like(t) || is_help_link(t) {
            return BaseRole::ProseInfo;
        }
        BaseRole::Unassigned
    }
}
