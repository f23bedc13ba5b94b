//! Exploration session lifecycle
//!
//! One session is one run against one app: it owns the navigation graph,
//! the ordered list of accepted captures, and the action log. In
//! manifest mode the session carries a queue of goals; finalizing one
//! goal advances to the next with a fresh graph while the session stays
//! active.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::fingerprint::{self, SIMILARITY_THRESHOLD};
use crate::graph::{GraphSnapshot, NavigationGraph, TransitionOutcome};
use crate::types::{ActionType, Icon, ScreenType, TapPoint};

/// Whether the run is chasing stated goals or surveying freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    GoalDriven,
    Discovery,
}

/// One accepted capture, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedScreen {
    pub index: usize,
    pub elements: Vec<TapPoint>,
    pub hints: Vec<String>,
    pub icons: Vec<Icon>,
    pub action_type: ActionType,
    /// Element text that was tapped to arrive here, if any
    pub arrived_via: Option<String>,
    pub screenshot_base64: String,
}

/// One log entry per capture attempt, duplicates included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action_type: ActionType,
    pub element_text: Option<String>,
    pub was_duplicate: bool,
    pub timestamp: DateTime<Utc>,
}

/// Everything a finished goal produced.
#[derive(Debug, Clone, Serialize)]
pub struct SessionData {
    pub app_name: String,
    pub goal: Option<String>,
    pub screens: Vec<CapturedScreen>,
    pub actions: Vec<ActionRecord>,
    pub graph_snapshot: GraphSnapshot,
}

/// Result of a capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Near-identical to the previous capture; logged, not recorded
    Rejected,
    /// Forwarded to the graph, with the graph's classification
    Accepted(TransitionOutcome),
}

impl CaptureOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CaptureOutcome::Accepted(_))
    }
}

struct SessionState {
    session_id: Uuid,
    active: bool,
    app_name: String,
    goal: Option<String>,
    goal_queue: VecDeque<String>,
    screens: Vec<CapturedScreen>,
    actions: Vec<ActionRecord>,
    previous_elements: Option<Vec<TapPoint>>,
    graph_started: bool,
    started_at: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            active: false,
            app_name: String::new(),
            goal: None,
            goal_queue: VecDeque::new(),
            screens: Vec::new(),
            actions: Vec::new(),
            previous_elements: None,
            graph_started: false,
            started_at: Utc::now(),
        }
    }
}

/// See the module docs. Mutating methods are mutex-guarded; read-only
/// accessors may be called from any thread.
#[derive(Default)]
pub struct ExplorationSession {
    state: Mutex<SessionState>,
    graph: NavigationGraph,
}

impl ExplorationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a run. `goals` puts the session in manifest mode: the first
    /// queue entry becomes the active goal and `finalize` advances the
    /// rest.
    pub fn start(&self, app_name: &str, goal: Option<String>, goals: Vec<String>) {
        let mut state = self.lock();
        let mut queue: VecDeque<String> = goals.into();
        let goal = goal.or_else(|| queue.pop_front());
        *state = SessionState {
            session_id: Uuid::new_v4(),
            active: true,
            app_name: app_name.to_string(),
            goal,
            goal_queue: queue,
            started_at: Utc::now(),
            ..SessionState::default()
        };
        info!(session = %state.session_id, app = app_name, "exploration session started");
    }

    /// Record an arrival. Near-duplicates of the immediately previous
    /// capture are logged and rejected; everything else is forwarded to
    /// the graph (as `start` for the first capture of a goal).
    #[allow(clippy::too_many_arguments)]
    pub fn capture(
        &self,
        elements: &[TapPoint],
        hints: &[String],
        icons: &[Icon],
        action_type: ActionType,
        arrived_via: Option<&str>,
        screenshot_base64: &str,
        screen_type: ScreenType,
    ) -> CaptureOutcome {
        let mut state = self.lock();
        if !state.active {
            debug!("capture on inactive session rejected");
            return CaptureOutcome::Rejected;
        }

        let record = ActionRecord {
            action_type,
            element_text: arrived_via.map(|s| s.to_string()),
            was_duplicate: false,
            timestamp: Utc::now(),
        };

        if let Some(previous) = &state.previous_elements {
            if fingerprint::jaccard_similarity(elements, previous) >= SIMILARITY_THRESHOLD {
                let mut record = record;
                record.was_duplicate = true;
                state.actions.push(record);
                debug!("duplicate capture rejected");
                return CaptureOutcome::Rejected;
            }
        }

        let outcome = if state.graph_started {
            self.graph.record_transition(
                elements,
                hints,
                icons,
                screenshot_base64,
                action_type,
                arrived_via.unwrap_or_default(),
                screen_type,
            )
        } else {
            let fp = self
                .graph
                .start(elements, hints, icons, screenshot_base64, screen_type);
            state.graph_started = true;
            TransitionOutcome::NewScreen(fp)
        };

        let index = state.screens.len();
        state.screens.push(CapturedScreen {
            index,
            elements: elements.to_vec(),
            hints: hints.to_vec(),
            icons: icons.to_vec(),
            action_type,
            arrived_via: arrived_via.map(|s| s.to_string()),
            screenshot_base64: screenshot_base64.to_string(),
        });
        state.actions.push(record);
        state.previous_elements = Some(elements.to_vec());
        CaptureOutcome::Accepted(outcome)
    }

    /// Close out the current goal. Returns `None` when the session is
    /// not active (double finalization is harmless). In manifest mode,
    /// remaining goals keep the session active with per-goal state
    /// rebuilt from scratch.
    pub fn finalize(&self) -> Option<SessionData> {
        let mut state = self.lock();
        if !state.active {
            return None;
        }
        let data = SessionData {
            app_name: state.app_name.clone(),
            goal: state.goal.clone(),
            screens: std::mem::take(&mut state.screens),
            actions: std::mem::take(&mut state.actions),
            graph_snapshot: self.graph.finalize(),
        };

        if let Some(next_goal) = state.goal_queue.pop_front() {
            info!(goal = %next_goal, "advancing to next manifest goal");
            state.goal = Some(next_goal);
            state.previous_elements = None;
            state.graph_started = false;
        } else {
            info!(session = %state.session_id, "exploration session finished");
            state.active = false;
        }
        Some(data)
    }

    pub fn graph(&self) -> &NavigationGraph {
        &self.graph
    }

    pub fn active(&self) -> bool {
        self.lock().active
    }

    pub fn app_name(&self) -> String {
        self.lock().app_name.clone()
    }

    pub fn goal(&self) -> Option<String> {
        self.lock().goal.clone()
    }

    pub fn screen_count(&self) -> usize {
        self.lock().screens.len()
    }

    pub fn action_count(&self) -> usize {
        self.lock().actions.len()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.lock().started_at
    }

    pub fn current_mode(&self) -> SessionMode {
        let state = self.lock();
        if state.goal.is_some() || !state.goal_queue.is_empty() {
            SessionMode::GoalDriven
        } else {
            SessionMode::Discovery
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(texts: &[&str]) -> Vec<TapPoint> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TapPoint::new(*t, 100.0, 100.0 + 40.0 * i as f64))
            .collect()
    }

    fn capture(session: &ExplorationSession, texts: &[&str], via: Option<&str>) -> CaptureOutcome {
        session.capture(
            &points(texts),
            &[],
            &[],
            ActionType::Tap,
            via,
            "",
            ScreenType::Settings,
        )
    }

    #[test]
    fn first_capture_starts_the_graph() {
        let session = ExplorationSession::new();
        session.start("Settings", None, Vec::new());
        let outcome = capture(&session, &["Settings", "General"], None);
        assert!(matches!(
            outcome,
            CaptureOutcome::Accepted(TransitionOutcome::NewScreen(_))
        ));
        assert_eq!(session.screen_count(), 1);
        assert_eq!(session.graph().node_count(), 1);
    }

    #[test]
    fn near_duplicate_of_previous_capture_is_rejected() {
        let session = ExplorationSession::new();
        session.start("Files", None, Vec::new());
        let names: Vec<String> = (0..10).map(|i| format!("Row number {i}")).collect();
        let texts: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        assert!(capture(&session, &texts, None).is_accepted());

        // One text swapped: Jaccard 9/11 >= 0.80, rejected.
        let mut swapped = texts.clone();
        swapped[9] = "Completely different";
        assert_eq!(capture(&session, &swapped, None), CaptureOutcome::Rejected);
        assert_eq!(session.screen_count(), 1);
        assert_eq!(session.action_count(), 2);

        // Below the threshold: accepted.
        let others: Vec<String> = (0..10).map(|i| format!("Other entry {i}")).collect();
        let other_texts: Vec<&str> = others.iter().map(|s| s.as_str()).collect();
        assert!(capture(&session, &other_texts, Some("Row number 0")).is_accepted());
        assert_eq!(session.screen_count(), 2);
    }

    #[test]
    fn duplicate_captures_are_logged_with_the_flag() {
        let session = ExplorationSession::new();
        session.start("Settings", None, Vec::new());
        capture(&session, &["Settings", "General"], None);
        capture(&session, &["Settings", "General"], Some("Settings"));
        let data = session.finalize().unwrap();
        assert_eq!(data.actions.len(), 2);
        assert!(!data.actions[0].was_duplicate);
        assert!(data.actions[1].was_duplicate);
    }

    #[test]
    fn finalize_returns_none_when_inactive() {
        let session = ExplorationSession::new();
        assert!(session.finalize().is_none());
        session.start("Settings", None, Vec::new());
        capture(&session, &["Settings", "General"], None);
        assert!(session.finalize().is_some());
        assert!(!session.active());
        assert!(session.finalize().is_none());
    }

    #[test]
    fn manifest_mode_advances_goals_and_rebuilds_state() {
        let session = ExplorationSession::new();
        session.start(
            "Settings",
            None,
            vec!["Find storage".to_string(), "Find privacy".to_string()],
        );
        assert_eq!(session.current_mode(), SessionMode::GoalDriven);
        assert_eq!(session.goal(), Some("Find storage".to_string()));

        capture(&session, &["Settings", "General"], None);
        capture(&session, &["About", "Version"], Some("General"));
        let first = session.finalize().unwrap();
        assert_eq!(first.goal, Some("Find storage".to_string()));
        assert_eq!(first.screens.len(), 2);

        // Still active, on the next goal, with per-goal state reset.
        assert!(session.active());
        assert_eq!(session.goal(), Some("Find privacy".to_string()));
        assert_eq!(session.screen_count(), 0);

        capture(&session, &["Settings", "Privacy"], None);
        assert_eq!(session.graph().node_count(), 1);
        let second = session.finalize().unwrap();
        assert_eq!(second.goal, Some("Find privacy".to_string()));
        assert!(!session.active());
    }

    #[test]
    fn mode_is_discovery_without_goals() {
        let session = ExplorationSession::new();
        session.start("Settings", None, Vec::new());
        assert_eq!(session.current_mode(), SessionMode::Discovery);
        session.start("Settings", Some("Find storage".to_string()), Vec::new());
        assert_eq!(session.current_mode(), SessionMode::GoalDriven);
    }

    #[test]
    fn start_resets_a_previous_run() {
        let session = ExplorationSession::new();
        session.start("Settings", None, Vec::new());
        capture(&session, &["Settings", "General"], None);
        session.start("Files", None, Vec::new());
        assert_eq!(session.screen_count(), 0);
        assert_eq!(session.app_name(), "Files");
        assert!(session.active());
    }
}
