//! Desktop (mirrored Mac) strategy

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::classifier::ElementClassifier;
use crate::strategy::{BacktrackMethod, PlatformStrategy};
use crate::types::{ElementRole, ExplorationBudget, Icon, ScreenType, TapPoint};

/// Elements left of this X coordinate belong to a sidebar.
const SIDEBAR_MAX_X: f64 = 200.0;

/// A dialog has at most this many elements.
const DIALOG_ELEMENT_MAX: usize = 8;

const CONFIRM_LABELS: [&str; 4] = ["OK", "Save", "Apply", "Continue"];

static SKIP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^quit\b",
        r"(?i)^force quit\b",
        r"(?i)\bformat\b",
        r"(?i)\buninstall\b",
        r"(?i)^shut down$",
        r"(?i)^restart$",
        r"(?i)^empty trash$",
        r"(?i)\bdelete\b",
        r"(?i)\berase\b",
        r"(?i)^sign out$",
        r"(?i)^log ?out$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static skip pattern"))
    .collect()
});

/// Policy for sidebar-driven desktop applications.
pub struct DesktopStrategy {
    screen_width: f64,
    screen_height: f64,
    classifier: ElementClassifier,
}

impl DesktopStrategy {
    pub fn new(screen_width: f64, screen_height: f64) -> Self {
        Self {
            screen_width,
            screen_height,
            classifier: ElementClassifier::default(),
        }
    }

    fn navigation_count(&self, elements: &[TapPoint]) -> usize {
        self.classifier
            .classify(elements)
            .iter()
            .filter(|e| e.role == ElementRole::Navigation)
            .count()
    }
}

impl PlatformStrategy for DesktopStrategy {
    fn classify_screen(&self, elements: &[TapPoint], _hints: &[String]) -> ScreenType {
        // Dialog: Cancel plus a confirm button on a small screen.
        let has_cancel = elements
            .iter()
            .any(|e| e.text.trim().eq_ignore_ascii_case("Cancel"));
        let has_confirm = elements.iter().any(|e| {
            CONFIRM_LABELS
                .iter()
                .any(|c| c.eq_ignore_ascii_case(e.text.trim()))
        });
        if has_cancel && has_confirm && elements.len() <= DIALOG_ELEMENT_MAX {
            return ScreenType::Modal;
        }

        // Sidebar layout: a column of entries hugging the left edge.
        let sidebar_count = elements.iter().filter(|e| e.x < SIDEBAR_MAX_X).count();
        if sidebar_count >= 3 {
            return ScreenType::Settings;
        }

        if self.navigation_count(elements) > DIALOG_ELEMENT_MAX {
            return ScreenType::List;
        }
        ScreenType::Detail
    }

    fn rank_elements(
        &self,
        elements: &[TapPoint],
        _icons: &[Icon],
        visited: &HashSet<String>,
        _depth: u32,
        _screen_type: ScreenType,
    ) -> Vec<TapPoint> {
        // Broader than the planner: state toggles count as tappable too.
        let classified = self.classifier.classify(elements);
        let mut candidates: Vec<TapPoint> = classified
            .iter()
            .filter(|e| {
                matches!(
                    e.role,
                    ElementRole::Navigation | ElementRole::StateChange
                )
            })
            .filter(|e| !visited.contains(&e.point.text))
            .map(|e| e.point.clone())
            .collect();
        // Sidebar entries first (left to right), then top to bottom.
        candidates.sort_by(|a, b| {
            a.x.partial_cmp(&b.x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        });
        candidates
    }

    fn backtrack_method(&self, _hints: &[String], depth: u32) -> BacktrackMethod {
        if depth == 0 {
            return BacktrackMethod::None;
        }
        BacktrackMethod::PressBack {
            key: "[".to_string(),
            modifiers: vec!["command".to_string()],
        }
    }

    fn should_skip(&self, text: &str, budget: &ExplorationBudget) -> bool {
        let trimmed = text.trim();
        if SKIP_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
            return true;
        }
        let lower = trimmed.to_lowercase();
        budget
            .skip_patterns
            .iter()
            .any(|p| lower.contains(&p.to_lowercase()))
    }

    fn is_terminal(
        &self,
        elements: &[TapPoint],
        depth: u32,
        budget: &ExplorationBudget,
        screen_type: ScreenType,
    ) -> bool {
        if elements.is_empty() {
            return true;
        }
        if depth >= budget.max_depth {
            return true;
        }
        screen_type == ScreenType::Modal && self.navigation_count(elements) == 0
    }

    fn screen_size(&self) -> (f64, f64) {
        (self.screen_width, self.screen_height)
    }
}
