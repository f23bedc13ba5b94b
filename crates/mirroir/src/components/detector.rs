//! Row-based component detection
//!
//! Groups classified elements into rows, derives per-row properties,
//! matches each row against the loaded component definitions, and runs
//! the absorption post-pass that folds caption rows into their parents.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::classifier::{group_rows, ROW_TOLERANCE_PT};
use crate::components::definition::{
    AbsorbCondition, ChevronMode, ClickTarget, ComponentDefinition, Zone,
};
use crate::types::{ClassifiedElement, ElementRole, TapPoint};

/// Rows whose center is above this fraction of the screen are nav bar.
const NAV_BAR_FRACTION: f64 = 0.12;
/// Rows whose center is below this fraction of the screen are tab bar.
const TAB_BAR_FRACTION: f64 = 0.88;

static DISMISS_LABELS: [&str; 10] = [
    "OK", "Cancel", "Done", "Close", "Dismiss", "Not Now", "X", "Got It", "Annuler", "Fermer",
];

static NUMERIC_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d+([.,]\d+)?\s*(gb|mb|kb|tb|%|km)?$").expect("static numeric pattern")
});

/// Derived facts about one row of classified elements.
#[derive(Debug, Clone)]
pub struct RowProperties {
    pub element_count: usize,
    pub has_chevron: bool,
    pub has_numeric_value: bool,
    pub row_height: f64,
    pub top_y: f64,
    pub bottom_y: f64,
    pub zone: Zone,
    pub has_state_indicator: bool,
    pub has_long_text: bool,
    pub has_dismiss_button: bool,
    pub average_confidence: f64,
    pub numeric_only_count: usize,
    pub element_texts: Vec<String>,
}

impl RowProperties {
    fn from_elements(elements: &[&ClassifiedElement], screen_height: f64) -> Self {
        let ys: Vec<f64> = elements.iter().map(|e| e.point.y).collect();
        let top_y = ys.iter().cloned().fold(f64::INFINITY, f64::min);
        let bottom_y = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let center = (top_y + bottom_y) / 2.0;
        let zone = if screen_height > 0.0 && center < NAV_BAR_FRACTION * screen_height {
            Zone::NavBar
        } else if screen_height > 0.0 && center > TAB_BAR_FRACTION * screen_height {
            Zone::TabBar
        } else {
            Zone::Content
        };

        let texts: Vec<String> = elements.iter().map(|e| e.point.text.clone()).collect();
        let numeric_only_count = texts.iter().filter(|t| is_numeric_only(t)).count();
        let confidence_sum: f64 = elements.iter().map(|e| e.point.confidence).sum();

        Self {
            element_count: elements.len(),
            has_chevron: elements
                .iter()
                .any(|e| e.role == ElementRole::Decoration && is_chevron_glyph(&e.point.text)),
            has_numeric_value: texts.iter().any(|t| NUMERIC_VALUE.is_match(t.trim())),
            row_height: bottom_y - top_y,
            top_y,
            bottom_y,
            zone,
            has_state_indicator: texts
                .iter()
                .any(|t| matches!(t.trim(), "On" | "Off" | "Connected" | "Auto" | "None")),
            has_long_text: texts.iter().any(|t| t.chars().count() > 50),
            has_dismiss_button: texts
                .iter()
                .any(|t| DISMISS_LABELS.iter().any(|d| d.eq_ignore_ascii_case(t.trim()))),
            average_confidence: if elements.is_empty() {
                0.0
            } else {
                confidence_sum / elements.len() as f64
            },
            numeric_only_count,
            element_texts: texts,
        }
    }
}

fn is_chevron_glyph(text: &str) -> bool {
    matches!(text.trim(), ">" | "\u{203a}" | "\u{276f}")
}

fn is_numeric_only(text: &str) -> bool {
    let t: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    !t.is_empty()
        && t.chars().any(|c| c.is_ascii_digit())
        && t.chars().all(|c| c.is_ascii_digit() || ".,:%".contains(c))
}

/// A matched group of elements on a screen, with its interaction target.
#[derive(Debug, Clone)]
pub struct ScreenComponent {
    pub name: String,
    pub elements: Vec<ClassifiedElement>,
    /// The point to actuate, when the definition makes the row tappable
    pub tap_target: Option<TapPoint>,
    pub has_chevron: bool,
    pub top_y: f64,
    pub bottom_y: f64,
    pub definition: ComponentDefinition,
}

/// Score a row against one definition.
///
/// Hard constraints gate the match entirely; the returned score orders
/// surviving candidates by specificity, with a bonus when a preferred
/// chevron is present.
pub fn score_match(def: &ComponentDefinition, row: &RowProperties) -> Option<f64> {
    let effective_count = if def.exclude_numeric_only {
        row.element_count.saturating_sub(row.numeric_only_count)
    } else {
        row.element_count
    };
    if effective_count < def.min_elements || effective_count > def.max_elements {
        return None;
    }
    if row.row_height > def.max_row_height_pt {
        return None;
    }
    if row.zone != def.zone {
        return None;
    }
    if let Some(want) = def.has_dismiss_button {
        if row.has_dismiss_button != want {
            return None;
        }
    }
    if let Some(want) = def.has_numeric_value {
        if row.has_numeric_value != want {
            return None;
        }
    }
    if let Some(want) = def.has_long_text {
        if row.has_long_text != want {
            return None;
        }
    }
    if let Some(min) = def.min_confidence {
        if row.average_confidence < min {
            return None;
        }
    }

    let chevron_mode = def.effective_chevron_mode();
    match chevron_mode {
        Some(ChevronMode::Required) if !row.has_chevron => return None,
        Some(ChevronMode::Forbidden) if row.has_chevron => return None,
        _ => {}
    }

    if let Some(pattern) = &def.text_pattern {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(_) => return None,
        };
        if !row.element_texts.iter().any(|t| re.is_match(t)) {
            return None;
        }
    }

    // Specificity: every explicit constraint the definition carries makes
    // a surviving match more convincing than a looser one.
    let mut score = 1.0;
    if matches!(
        chevron_mode,
        Some(ChevronMode::Required) | Some(ChevronMode::Forbidden)
    ) {
        score += 1.0;
    }
    if def.has_dismiss_button.is_some() {
        score += 1.0;
    }
    if def.has_numeric_value.is_some() {
        score += 1.0;
    }
    if def.has_long_text.is_some() {
        score += 1.0;
    }
    if def.min_confidence.is_some() {
        score += 1.0;
    }
    if def.text_pattern.is_some() {
        score += 1.0;
    }
    if def.zone != Zone::Content {
        score += 1.0;
    }
    if chevron_mode == Some(ChevronMode::Preferred) && row.has_chevron {
        score += 0.5;
    }
    Some(score)
}

/// Detects screen components from classified elements.
#[derive(Debug, Clone)]
pub struct ComponentDetector {
    definitions: Vec<ComponentDefinition>,
}

impl ComponentDetector {
    pub fn new(definitions: Vec<ComponentDefinition>) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &[ComponentDefinition] {
        &self.definitions
    }

    /// Match every row, then run the absorption post-pass. Components come
    /// back sorted by `top_y`.
    pub fn detect(
        &self,
        classified: &[ClassifiedElement],
        screen_height: f64,
    ) -> Vec<ScreenComponent> {
        let ys: Vec<f64> = classified.iter().map(|e| e.point.y).collect();
        let rows = group_rows(&ys, ROW_TOLERANCE_PT);

        let mut components: Vec<ScreenComponent> = rows
            .iter()
            .map(|row| {
                let row_elements: Vec<&ClassifiedElement> =
                    row.iter().map(|&i| &classified[i]).collect();
                let props = RowProperties::from_elements(&row_elements, screen_height);
                self.match_row(&row_elements, &props)
            })
            .collect();

        components.sort_by(|a, b| {
            a.top_y
                .partial_cmp(&b.top_y)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        absorb(components)
    }

    fn match_row(
        &self,
        row_elements: &[&ClassifiedElement],
        props: &RowProperties,
    ) -> ScreenComponent {
        let best = self
            .definitions
            .iter()
            .filter_map(|def| score_match(def, props).map(|score| (def, score)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let definition = match best {
            Some((def, score)) => {
                debug!(component = %def.name, score, "row matched definition");
                def.clone()
            }
            // Unknown structure: keep it, but never tap it.
            None => ComponentDefinition::unclassified(),
        };

        let tap_target = if definition.clickable {
            match definition.click_target {
                ClickTarget::FirstNavigationElement => row_elements
                    .iter()
                    .find(|e| e.role == ElementRole::Navigation)
                    .map(|e| e.point.clone()),
                ClickTarget::FirstDismissButton => row_elements
                    .iter()
                    .find(|e| {
                        DISMISS_LABELS
                            .iter()
                            .any(|d| d.eq_ignore_ascii_case(e.point.text.trim()))
                    })
                    .map(|e| e.point.clone()),
                ClickTarget::None => None,
            }
        } else {
            None
        };

        ScreenComponent {
            name: definition.name.clone(),
            elements: row_elements.iter().map(|e| (*e).clone()).collect(),
            tap_target,
            has_chevron: props.has_chevron,
            top_y: props.top_y,
            bottom_y: props.bottom_y,
            definition,
        }
    }
}

/// Greedy downward absorption: a component whose definition absorbs
/// followers swallows each subsequent component within range, subject to
/// the absorb condition. The parent keeps its tap target.
fn absorb(components: Vec<ScreenComponent>) -> Vec<ScreenComponent> {
    let mut merged: Vec<ScreenComponent> = Vec::with_capacity(components.len());
    for comp in components {
        if let Some(parent) = merged.last_mut() {
            let def = &parent.definition;
            let same_row_overlap = def.absorbs_same_row && comp.top_y <= parent.bottom_y;
            let below_in_range = def.absorbs_below_within_pt > 0.0
                && comp.top_y <= parent.bottom_y + def.absorbs_below_within_pt;
            if (same_row_overlap || below_in_range) && absorb_allowed(def.absorb_condition, &comp) {
                parent.elements.extend(comp.elements);
                parent.bottom_y = parent.bottom_y.max(comp.bottom_y);
                parent.has_chevron |= comp.has_chevron;
                continue;
            }
        }
        merged.push(comp);
    }
    merged
}

fn absorb_allowed(condition: AbsorbCondition, comp: &ScreenComponent) -> bool {
    match condition {
        AbsorbCondition::Any => true,
        AbsorbCondition::InfoOrDecorationOnly => comp
            .elements
            .iter()
            .all(|e| matches!(e.role, ElementRole::Info | ElementRole::Decoration)),
    }
}
