//! Component definitions: the match rules, interaction semantics, and
//! grouping behavior a row is tested against.

use serde::{Deserialize, Serialize};

/// Platform a definition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Macos,
}

/// Vertical band of the screen a row must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    NavBar,
    #[default]
    Content,
    TabBar,
}

/// How a chevron on the row constrains matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChevronMode {
    /// Row must contain a chevron
    Required,
    /// Row must not contain a chevron
    Forbidden,
    /// A chevron adds score but is not required
    Preferred,
}

/// Which element of a matched row receives the tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickTarget {
    FirstNavigationElement,
    FirstDismissButton,
    #[default]
    None,
}

/// What tapping a matched row is expected to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickResult {
    Navigates,
    Dismisses,
    #[default]
    None,
}

/// Which follower components an absorbing definition may swallow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsorbCondition {
    #[default]
    Any,
    InfoOrDecorationOnly,
}

/// A named screen-component pattern: match rules over a row of classified
/// elements, plus what to do when the row matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub name: String,
    pub platform: Option<Platform>,
    #[serde(default)]
    pub description: String,

    // Match rules
    /// Legacy chevron constraint; `chevron_mode` wins when both are set.
    pub row_has_chevron: Option<bool>,
    pub chevron_mode: Option<ChevronMode>,
    pub min_elements: usize,
    pub max_elements: usize,
    pub max_row_height_pt: f64,
    pub zone: Zone,
    pub has_numeric_value: Option<bool>,
    pub has_long_text: Option<bool>,
    pub has_dismiss_button: Option<bool>,
    pub min_confidence: Option<f64>,
    pub exclude_numeric_only: bool,
    /// Regex that must match at least one element text on the row
    pub text_pattern: Option<String>,

    // Interaction
    pub clickable: bool,
    pub click_target: ClickTarget,
    pub click_result: ClickResult,
    pub back_after_click: bool,

    // Grouping
    pub absorbs_same_row: bool,
    pub absorbs_below_within_pt: f64,
    pub absorb_condition: AbsorbCondition,
}

impl ComponentDefinition {
    /// A definition with the documented defaults and the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            platform: None,
            description: String::new(),
            row_has_chevron: None,
            chevron_mode: None,
            min_elements: 1,
            max_elements: 10,
            max_row_height_pt: 100.0,
            zone: Zone::Content,
            has_numeric_value: None,
            has_long_text: None,
            has_dismiss_button: None,
            min_confidence: None,
            exclude_numeric_only: false,
            text_pattern: None,
            clickable: false,
            click_target: ClickTarget::None,
            click_result: ClickResult::None,
            back_after_click: false,
            absorbs_same_row: false,
            absorbs_below_within_pt: 0.0,
            absorb_condition: AbsorbCondition::Any,
        }
    }

    /// The fallback component unknown rows collapse into. Never tappable.
    pub fn unclassified() -> Self {
        let mut def = Self::named("unclassified");
        def.description = "Row structure not matched by any definition".to_string();
        def
    }

    /// The chevron constraint in effect: `chevron_mode` wins over the
    /// legacy boolean when both are present.
    pub fn effective_chevron_mode(&self) -> Option<ChevronMode> {
        self.chevron_mode.or(match self.row_has_chevron {
            Some(true) => Some(ChevronMode::Required),
            Some(false) => Some(ChevronMode::Forbidden),
            None => None,
        })
    }
}
