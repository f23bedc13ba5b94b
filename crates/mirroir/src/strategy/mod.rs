//! Platform strategy: the policy seam between the explorer and a
//! concrete device family
//!
//! A strategy classifies screens, ranks elements when no plan exists,
//! chooses how to physically go back, and decides which texts must never
//! be tapped. The explorer is parameterized over a strategy at
//! construction and never branches on platform itself.

mod desktop;
mod mobile;

pub use desktop::DesktopStrategy;
pub use mobile::MobileStrategy;

use std::collections::HashSet;

use crate::fingerprint;
use crate::types::{ExplorationBudget, Icon, ScreenType, TapPoint};

/// How to physically move one screen back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BacktrackMethod {
    /// No way back (typically at the root)
    None,
    /// A key chord (e.g. Cmd+[ on a mirrored device)
    PressBack {
        key: String,
        modifiers: Vec<String>,
    },
    /// Tap a visible back affordance
    TapBack,
}

pub trait PlatformStrategy: Send + Sync {
    /// Coarse screen category for the capture.
    fn classify_screen(&self, elements: &[TapPoint], hints: &[String]) -> ScreenType;

    /// Fallback ranking when no planner plan has been built.
    fn rank_elements(
        &self,
        elements: &[TapPoint],
        icons: &[Icon],
        visited: &HashSet<String>,
        depth: u32,
        screen_type: ScreenType,
    ) -> Vec<TapPoint>;

    /// How to go back from the given depth.
    fn backtrack_method(&self, hints: &[String], depth: u32) -> BacktrackMethod;

    /// True when the element text must never be tapped.
    fn should_skip(&self, text: &str, budget: &ExplorationBudget) -> bool;

    /// True when the screen is not worth diving into.
    fn is_terminal(
        &self,
        elements: &[TapPoint],
        depth: u32,
        budget: &ExplorationBudget,
        screen_type: ScreenType,
    ) -> bool;

    /// Logical screen dimensions `(width, height)` in points.
    fn screen_size(&self) -> (f64, f64);

    fn extract_fingerprint(&self, elements: &[TapPoint], icons: &[Icon]) -> String {
        fingerprint::compute(elements, icons)
    }
}
