//! Common value types shared across the exploration engine

use serde::{Deserialize, Serialize};

/// An OCR-detected text run with its tap coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapPoint {
    /// Recognized text content
    pub text: String,
    /// Tap X coordinate in points
    pub x: f64,
    /// Tap Y coordinate in points
    pub y: f64,
    /// OCR confidence in [0, 1]
    pub confidence: f64,
}

impl TapPoint {
    pub fn new(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            confidence: 1.0,
        }
    }
}

/// A detected tappable region without recognized text (e.g. an icon button).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub x: f64,
    pub y: f64,
    /// Estimated side length of the tappable region in points
    pub estimated_size: f64,
}

/// One described screen: what the OCR pipeline saw at a point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenDescription {
    /// Text elements with tap coordinates, in OCR order
    pub elements: Vec<TapPoint>,
    /// Free-form hints from the describer (e.g. "back-button", "keyboard-visible")
    pub hints: Vec<String>,
    /// Tappable regions detected without text
    pub icons: Vec<Icon>,
    /// Base64-encoded PNG of the screen
    pub screenshot_base64: String,
}

/// Semantic role assigned to an OCR element by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    /// Tapping likely navigates to another screen
    Navigation,
    /// Tapping likely toggles a setting in place
    StateChange,
    /// Display-only value or explanatory text
    Info,
    /// Visual chrome with no meaning on its own (chevrons, separators)
    Decoration,
    /// Dangerous action the explorer must never trigger
    Destructive,
}

/// A `TapPoint` plus its classified role and row context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedElement {
    pub point: TapPoint,
    pub role: ElementRole,
    /// True when the element shares a row with a chevron glyph
    pub has_chevron_context: bool,
}

/// Coarse screen category, assigned at capture time by the platform strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenType {
    /// A root screen with a bottom tab bar
    TabRoot,
    /// A settings-style list of grouped rows
    Settings,
    /// A long scrollable list
    List,
    /// A leaf detail screen
    Detail,
    /// A modal sheet or dialog
    Modal,
}

/// Kind of input action that produced a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Tap,
    Swipe,
    PressKey,
    Launch,
}

/// A plan entry: an element worth tapping, with its score and the
/// reasons the planner gave it that score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedElement {
    pub point: TapPoint,
    pub score: f64,
    pub reason: String,
}

/// Budgets bounding one exploration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationBudget {
    /// Maximum graph depth the explorer will dive to
    pub max_depth: u32,
    /// Maximum number of distinct screens to capture
    pub max_screens: usize,
    /// Wall-clock limit for the whole run
    pub max_time_seconds: u64,
    /// Tap budget per screen before the explorer prefers scroll/backtrack
    pub max_actions_per_screen: u32,
    /// Content swipes allowed per screen
    pub scroll_limit: u32,
    /// Probe taps allowed per tab-root screen
    pub max_scouts_per_screen: u32,
    /// Extra element texts to never tap (case-insensitive substring match)
    pub skip_patterns: Vec<String>,
}

impl Default for ExplorationBudget {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_screens: 40,
            max_time_seconds: 300,
            max_actions_per_screen: 12,
            scroll_limit: 3,
            max_scouts_per_screen: 4,
            skip_patterns: Vec::new(),
        }
    }
}

impl ExplorationBudget {
    /// Whether any hard budget is spent. Depth is measured from the root
    /// (root = 0), `screens` counts accepted captures, `elapsed_seconds`
    /// is wall-clock time since the run started.
    pub fn is_exhausted(&self, depth: u32, screens: usize, elapsed_seconds: u64) -> bool {
        depth > self.max_depth
            || screens >= self.max_screens
            || elapsed_seconds >= self.max_time_seconds
    }
}
