//! Mobile (mirrored phone) strategy

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::classifier::ElementClassifier;
use crate::strategy::{BacktrackMethod, PlatformStrategy};
use crate::types::{ElementRole, ExplorationBudget, Icon, ScreenType, TapPoint};

/// Elements below this fraction of the screen height sit in the tab bar.
const TAB_BAR_FRACTION: f64 = 0.88;

/// At most this many navigables still counts as a "small" screen.
const MODAL_NAVIGABLE_MAX: usize = 3;

/// With a back hint, this many navigables or fewer is a detail screen.
const DETAIL_NAVIGABLE_MAX: usize = 6;

const MODAL_AFFORDANCES: [&str; 4] = ["Done", "Cancel", "X", "OK"];

static SKIP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Destructive, across locales
        r"(?i)^sign out$",
        r"(?i)^log ?out$",
        r"(?i)\bdelete\b",
        r"(?i)\berase\b",
        r"(?i)^remove\b",
        r"(?i)^reset\b",
        r"(?i)^supprimer\b",
        r"(?i)^d[ée]connexion$",
        r"(?i)^eliminar\b",
        r"(?i)^cerrar sesi[oó]n$",
        r"(?i)^airplane mode$",
        r"(?i)^mode avion$",
        // Purchases and ads
        r"(?i)\bsubscribe\b",
        r"(?i)\bbuy\b",
        r"(?i)\bpurchase\b",
        r"(?i)\bupgrade\b",
        r"(?i)free trial",
        r"(?i)^rate ",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static skip pattern"))
    .collect()
});

/// Policy for phone-sized, tab-bar-driven applications.
pub struct MobileStrategy {
    screen_width: f64,
    screen_height: f64,
    classifier: ElementClassifier,
}

impl MobileStrategy {
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

    fn has_back_hint(hints: &[String]) -> bool {
        hints.iter().any(|h| h.to_lowercase().contains("back"))
    }
}

impl PlatformStrategy for MobileStrategy {
    fn classify_screen(&self, elements: &[TapPoint], hints: &[String]) -> ScreenType {
        let tab_bar_count = elements
            .iter()
            .filter(|e| e.y > TAB_BAR_FRACTION * self.screen_height)
            .count();
        if tab_bar_count >= 3 {
            return ScreenType::TabRoot;
        }

        let navigables = self.navigation_count(elements);
        let has_modal_affordance = elements.iter().any(|e| {
            MODAL_AFFORDANCES
                .iter()
                .any(|a| a.eq_ignore_ascii_case(e.text.trim()))
        });
        if navigables <= MODAL_NAVIGABLE_MAX && has_modal_affordance {
            return ScreenType::Modal;
        }

        if Self::has_back_hint(hints) {
            if navigables <= DETAIL_NAVIGABLE_MAX {
                return ScreenType::Detail;
            }
            return ScreenType::List;
        }
        ScreenType::Settings
    }

    fn rank_elements(
        &self,
        elements: &[TapPoint],
        _icons: &[Icon],
        visited: &HashSet<String>,
        _depth: u32,
        _screen_type: ScreenType,
    ) -> Vec<TapPoint> {
        // Broader than the planner: state toggles count as tappable too,
        // so screens made only of switches still get explored.
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
        // Mid-screen content first, then top to bottom.
        let mid = self.screen_height / 2.0;
        candidates.sort_by(|a, b| {
            let da = (a.y - mid).abs();
            let db = (b.y - mid).abs();
            da.partial_cmp(&db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        });
        candidates
    }

    fn backtrack_method(&self, hints: &[String], depth: u32) -> BacktrackMethod {
        if depth == 0 {
            return BacktrackMethod::None;
        }
        if hints.iter().any(|h| h.to_lowercase().contains("back-button")) {
            return BacktrackMethod::TapBack;
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
