//! Screen planning and scouting
//!
//! The planner turns classified elements into a ranked action plan for
//! the dive phase. The scout phase probes tab-root screens first, so the
//! plan can favor elements that provably navigate.
//!
//! Score weights are tunable constants; only their relative order is
//! load-bearing.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{ClassifiedElement, ElementRole, RankedElement, ScreenType, TapPoint};

/// What one probe tap taught us about an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoutOutcome {
    /// The tap moved to a different screen
    Navigated,
    /// The screen did not change
    NoChange,
}

pub const CHEVRON_BONUS: f64 = 3.0;
pub const SHORT_LABEL_BONUS: f64 = 2.0;
pub const MID_SCREEN_BONUS: f64 = 1.0;
pub const SCOUT_NAVIGATED_BONUS: f64 = 5.0;
pub const SCOUT_NO_CHANGE_PENALTY: f64 = -10.0;

/// Labels at most this long, with no spaces, get the short-label bonus.
const SHORT_LABEL_LEN: usize = 20;

/// The vertical band that earns the mid-screen bonus.
const MID_SCREEN_LOW: f64 = 0.3;
const MID_SCREEN_HIGH: f64 = 0.7;

pub struct ScreenPlanner;

impl ScreenPlanner {
    /// Build the ranked plan for one screen.
    ///
    /// Visited elements are dropped, only navigation elements are kept,
    /// and each survivor is scored. The result is sorted by descending
    /// score, ties broken top-first.
    pub fn build_plan(
        classified: &[ClassifiedElement],
        visited: &HashSet<String>,
        scout_results: &HashMap<String, ScoutOutcome>,
        screen_height: f64,
    ) -> Vec<RankedElement> {
        let mut plan: Vec<RankedElement> = classified
            .iter()
            .filter(|e| e.role == ElementRole::Navigation)
            .filter(|e| !visited.contains(&e.point.text))
            .map(|e| Self::score_element(e, scout_results, screen_height))
            .collect();

        plan.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    a.point
                        .y
                        .partial_cmp(&b.point.y)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });
        plan
    }

    fn score_element(
        element: &ClassifiedElement,
        scout_results: &HashMap<String, ScoutOutcome>,
        screen_height: f64,
    ) -> RankedElement {
        let mut score = 0.0;
        let mut reasons: Vec<&str> = Vec::new();

        if element.has_chevron_context {
            score += CHEVRON_BONUS;
            reasons.push("chevron");
        }
        let text = element.point.text.trim();
        if !text.contains(char::is_whitespace) && text.chars().count() <= SHORT_LABEL_LEN {
            score += SHORT_LABEL_BONUS;
            reasons.push("short label");
        }
        if screen_height > 0.0 {
            let fraction = element.point.y / screen_height;
            if (MID_SCREEN_LOW..=MID_SCREEN_HIGH).contains(&fraction) {
                score += MID_SCREEN_BONUS;
                reasons.push("mid-screen");
            }
        }
        match scout_results.get(&element.point.text) {
            Some(ScoutOutcome::Navigated) => {
                score += SCOUT_NAVIGATED_BONUS;
                reasons.push("scouted: navigated");
            }
            Some(ScoutOutcome::NoChange) => {
                score += SCOUT_NO_CHANGE_PENALTY;
                reasons.push("scouted: no change");
            }
            None => {}
        }

        RankedElement {
            point: element.point.clone(),
            score,
            reason: reasons.join(", "),
        }
    }
}

pub struct ScoutPhase;

impl ScoutPhase {
    /// Scouting is only worth its taps on broad tab-root screens near the
    /// root; chevron affordances make it redundant everywhere else.
    pub fn should_scout(screen_type: ScreenType, depth: u32, navigation_count: usize) -> bool {
        screen_type == ScreenType::TabRoot && depth < 2 && navigation_count >= 4
    }

    /// First navigation element that has not been probed yet.
    pub fn next_scout_target<'a>(
        classified: &'a [ClassifiedElement],
        scouted: &HashSet<String>,
    ) -> Option<&'a TapPoint> {
        classified
            .iter()
            .filter(|e| e.role == ElementRole::Navigation)
            .find(|e| !scouted.contains(&e.point.text))
            .map(|e| &e.point)
    }

    /// Dive order after scouting: proven navigators first, then the
    /// unprobed; elements that provably did nothing are excluded.
    pub fn rank_for_dive(
        scout_results: &HashMap<String, ScoutOutcome>,
        classified: &[ClassifiedElement],
    ) -> Vec<TapPoint> {
        let navigation: Vec<&TapPoint> = classified
            .iter()
            .filter(|e| e.role == ElementRole::Navigation)
            .map(|e| &e.point)
            .collect();

        let mut ranked: Vec<TapPoint> = navigation
            .iter()
            .filter(|p| scout_results.get(&p.text) == Some(&ScoutOutcome::Navigated))
            .map(|p| (*p).clone())
            .collect();
        ranked.extend(
            navigation
                .iter()
                .filter(|p| !scout_results.contains_key(&p.text))
                .map(|p| (*p).clone()),
        );
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ElementClassifier;

    const SCREEN_HEIGHT: f64 = 800.0;

    fn classify(points: Vec<TapPoint>) -> Vec<ClassifiedElement> {
        ElementClassifier::default().classify(&points)
    }

    fn plan(
        classified: &[ClassifiedElement],
        visited: &[&str],
        scouts: &[(&str, ScoutOutcome)],
    ) -> Vec<RankedElement> {
        let visited: HashSet<String> = visited.iter().map(|s| s.to_string()).collect();
        let scouts: HashMap<String, ScoutOutcome> = scouts
            .iter()
            .map(|(t, o)| (t.to_string(), *o))
            .collect();
        ScreenPlanner::build_plan(classified, &visited, &scouts, SCREEN_HEIGHT)
    }

    #[test]
    fn visited_and_non_navigation_elements_are_dropped() {
        let classified = classify(vec![
            TapPoint::new("General", 40.0, 300.0),
            TapPoint::new("About", 40.0, 340.0),
            TapPoint::new("128 GB", 320.0, 380.0),
            TapPoint::new("Sign Out", 40.0, 420.0),
        ]);
        let plan = plan(&classified, &["General"], &[]);
        let texts: Vec<&str> = plan.iter().map(|e| e.point.text.as_str()).collect();
        assert_eq!(texts, vec!["About"]);
    }

    #[test]
    fn chevron_outranks_plain_label() {
        let classified = classify(vec![
            TapPoint::new("Plain", 40.0, 300.0),
            TapPoint::new("Rowed", 40.0, 340.0),
            TapPoint::new(">", 360.0, 342.0),
        ]);
        let plan = plan(&classified, &[], &[]);
        assert_eq!(plan[0].point.text, "Rowed");
        assert!(plan[0].score > plan[1].score);
        assert!(plan[0].reason.contains("chevron"));
    }

    #[test]
    fn scouted_navigator_outranks_chevron() {
        let classified = classify(vec![
            TapPoint::new("Chevroned", 40.0, 300.0),
            TapPoint::new(">", 360.0, 302.0),
            TapPoint::new("Proven", 40.0, 340.0),
        ]);
        let plan = plan(&classified, &[], &[("Proven", ScoutOutcome::Navigated)]);
        assert_eq!(plan[0].point.text, "Proven");
    }

    #[test]
    fn no_change_scout_sinks_to_the_bottom() {
        let classified = classify(vec![
            TapPoint::new("Dead", 40.0, 300.0),
            TapPoint::new("Alive", 40.0, 340.0),
        ]);
        let plan = plan(&classified, &[], &[("Dead", ScoutOutcome::NoChange)]);
        assert_eq!(plan[0].point.text, "Alive");
        assert!(plan[1].score < 0.0);
    }

    #[test]
    fn ties_break_top_first() {
        let classified = classify(vec![
            TapPoint::new("Lower", 40.0, 500.0),
            TapPoint::new("Upper", 40.0, 400.0),
        ]);
        let plan = plan(&classified, &[], &[]);
        assert_eq!(plan[0].point.text, "Upper");
        assert_eq!(plan[1].point.text, "Lower");
    }

    #[test]
    fn should_scout_boundary_cross_product() {
        let types = [
            ScreenType::TabRoot,
            ScreenType::Settings,
            ScreenType::List,
            ScreenType::Detail,
            ScreenType::Modal,
        ];
        for screen_type in types {
            for depth in 0..4u32 {
                for nav_count in 0..7usize {
                    let expected =
                        screen_type == ScreenType::TabRoot && depth < 2 && nav_count >= 4;
                    assert_eq!(
                        ScoutPhase::should_scout(screen_type, depth, nav_count),
                        expected,
                        "{screen_type:?} depth={depth} nav={nav_count}"
                    );
                }
            }
        }
    }

    #[test]
    fn next_scout_target_skips_probed_elements() {
        let classified = classify(vec![
            TapPoint::new("First", 40.0, 300.0),
            TapPoint::new("Second", 40.0, 340.0),
        ]);
        let scouted: HashSet<String> = ["First".to_string()].into_iter().collect();
        let target = ScoutPhase::next_scout_target(&classified, &scouted);
        assert_eq!(target.map(|t| t.text.as_str()), Some("Second"));
        let all: HashSet<String> = ["First".to_string(), "Second".to_string()]
            .into_iter()
            .collect();
        assert!(ScoutPhase::next_scout_target(&classified, &all).is_none());
    }

    #[test]
    fn rank_for_dive_orders_navigated_then_unscouted() {
        let classified = classify(vec![
            TapPoint::new("Unprobed", 40.0, 300.0),
            TapPoint::new("Dead", 40.0, 340.0),
            TapPoint::new("Proven", 40.0, 380.0),
        ]);
        let scouts: HashMap<String, ScoutOutcome> = [
            ("Dead".to_string(), ScoutOutcome::NoChange),
            ("Proven".to_string(), ScoutOutcome::Navigated),
        ]
        .into_iter()
        .collect();
        let ranked = ScoutPhase::rank_for_dive(&scouts, &classified);
        let texts: Vec<&str> = ranked.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Proven", "Unprobed"]);
    }
}
