//! Overlay recognition
//!
//! Pure predicates over the OCR element list: system alerts (permission
//! prompts, rating requests) that must be dismissed before exploration
//! can continue, and the system search overlay that means we fell out of
//! the target app.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::TapPoint;

/// Alerts never have more elements than this; busier screens are content.
const ALERT_ELEMENT_MAX: usize = 10;

/// Dismiss labels, safest first. The detector always returns the first
/// (lowest-index) label present on screen.
pub const DISMISS_PRIORITY: [&str; 13] = [
    "Don't Allow",
    "Ne pas autoriser",
    "Ask App Not to Track",
    "Cancel",
    "Annuler",
    "Not Now",
    "Plus tard",
    "Dismiss",
    "Close",
    "No",
    "Decline",
    "OK",
    "Allow",
];

static TITLE_PATTERNS: Lazy<Vec<(Regex, AlertType)>> = Lazy::new(|| {
    [
        (r"(?i)allow .* to track", AlertType::Tracking),
        (r"(?i)would like to", AlertType::Permission),
        (r"(?i)wants to ", AlertType::Permission),
        (r"(?i)souhaite acc[ée]der", AlertType::Permission),
        (r"(?i)^enjoying\b", AlertType::RatingPrompt),
        (r"(?i)rate .* on the app store", AlertType::RatingPrompt),
        (r"(?i)turn on notifications", AlertType::Permission),
    ]
    .iter()
    .map(|(p, t)| (Regex::new(p).expect("static alert pattern"), *t))
    .collect()
});

static SPOTLIGHT_INDICATORS: [&str; 6] = [
    "top hit",
    "meilleur r\u{e9}sultat",
    "siri suggestions",
    "siri-vorschl\u{e4}ge",
    "suggestions siri",
    "spotlight search",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Permission,
    Tracking,
    RatingPrompt,
}

/// A recognized alert and the safest element to dismiss it with.
#[derive(Debug, Clone)]
pub struct Alert {
    pub alert_type: AlertType,
    pub dismiss_target: TapPoint,
}

pub struct AlertDetector;

impl AlertDetector {
    /// Recognize an overlay alert: a title-like element plus at least
    /// one known button. Returns the highest-priority dismiss target.
    pub fn detect_alert(elements: &[TapPoint]) -> Option<Alert> {
        if elements.is_empty() || elements.len() > ALERT_ELEMENT_MAX {
            return None;
        }
        let alert_type = elements.iter().find_map(|e| {
            TITLE_PATTERNS
                .iter()
                .find(|(re, _)| re.is_match(&e.text))
                .map(|(_, t)| *t)
        })?;

        let dismiss_target = DISMISS_PRIORITY.iter().find_map(|label| {
            elements
                .iter()
                .find(|e| e.text.trim().eq_ignore_ascii_case(label))
        })?;

        Some(Alert {
            alert_type,
            dismiss_target: dismiss_target.clone(),
        })
    }
}

pub struct SpotlightDetector;

impl SpotlightDetector {
    /// True when the system search overlay is covering the target app.
    pub fn is_spotlight_visible(elements: &[TapPoint]) -> bool {
        elements.iter().any(|e| {
            let lower = e.text.to_lowercase();
            SPOTLIGHT_INDICATORS.iter().any(|i| lower.contains(i))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(texts: &[&str]) -> Vec<TapPoint> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TapPoint::new(*t, 200.0, 300.0 + 50.0 * i as f64))
            .collect()
    }

    #[test]
    fn location_prompt_is_dismissed_with_dont_allow() {
        let elements = points(&[
            "\"Maps\" would like to use your location",
            "Allow",
            "Don't Allow",
        ]);
        let alert = AlertDetector::detect_alert(&elements).unwrap();
        assert_eq!(alert.alert_type, AlertType::Permission);
        assert_eq!(alert.dismiss_target.text, "Don't Allow");
    }

    #[test]
    fn tracking_prompt_prefers_ask_not_to_track() {
        let elements = points(&[
            "Allow \"News\" to track your activity?",
            "Ask App Not to Track",
            "Allow",
        ]);
        let alert = AlertDetector::detect_alert(&elements).unwrap();
        assert_eq!(alert.alert_type, AlertType::Tracking);
        assert_eq!(alert.dismiss_target.text, "Ask App Not to Track");
    }

    #[test]
    fn rating_prompt_falls_back_to_not_now() {
        let elements = points(&["Enjoying the app?", "Not Now", "OK"]);
        let alert = AlertDetector::detect_alert(&elements).unwrap();
        assert_eq!(alert.alert_type, AlertType::RatingPrompt);
        assert_eq!(alert.dismiss_target.text, "Not Now");
    }

    #[test]
    fn dismiss_target_always_has_the_lowest_priority_index() {
        // Every pair (higher-priority, lower-priority) resolves to the
        // higher-priority label regardless of OCR order.
        for i in 0..DISMISS_PRIORITY.len() {
            for j in (i + 1)..DISMISS_PRIORITY.len() {
                let elements = points(&[
                    "\"App\" would like to send you notifications",
                    DISMISS_PRIORITY[j],
                    DISMISS_PRIORITY[i],
                ]);
                let alert = AlertDetector::detect_alert(&elements).unwrap();
                assert_eq!(
                    alert.dismiss_target.text, DISMISS_PRIORITY[i],
                    "pair ({i}, {j})"
                );
            }
        }
    }

    #[test]
    fn busy_screens_never_fire() {
        let names: Vec<String> = (0..11).map(|i| format!("Element {i}")).collect();
        let mut texts: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        texts[0] = "\"App\" would like to use your location";
        texts[1] = "Don't Allow";
        assert!(AlertDetector::detect_alert(&points(&texts)).is_none());
    }

    #[test]
    fn title_without_buttons_is_not_an_alert() {
        let elements = points(&["\"App\" would like to use your location"]);
        assert!(AlertDetector::detect_alert(&elements).is_none());
    }

    #[test]
    fn spotlight_indicators_match_case_insensitively() {
        assert!(SpotlightDetector::is_spotlight_visible(&points(&[
            "TOP HIT",
            "Safari"
        ])));
        assert!(SpotlightDetector::is_spotlight_visible(&points(&[
            "Meilleur r\u{e9}sultat"
        ])));
        assert!(!SpotlightDetector::is_spotlight_visible(&points(&[
            "Settings", "General"
        ])));
    }
}
