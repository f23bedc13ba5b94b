//! The navigation graph
//!
//! Canonical store for everything the explorer learns: screens as nodes
//! keyed by fingerprint, transitions as append-only edges, plus per-node
//! exploration state (visited elements, scroll count, scout results,
//! traversal phase, cached screen plan).
//!
//! Mutating operations are serialized behind an internal mutex so a
//! concurrent reader (status tooling) always sees a consistent snapshot.
//! Graph operations are total: unknown fingerprints are coerced to
//! no-ops rather than errors.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fingerprint::{self, SIMILARITY_THRESHOLD};
use crate::planner::ScoutOutcome;
use crate::types::{ActionType, Icon, RankedElement, ScreenType, TapPoint};

/// Per-node traversal phase; only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalPhase {
    Scout,
    Dive,
    Exhausted,
}

/// One captured screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub fingerprint: String,
    pub depth: u32,
    pub screen_type: ScreenType,
    pub elements: Vec<TapPoint>,
    pub icons: Vec<Icon>,
    pub hints: Vec<String>,
    pub screenshot_base64: String,
    pub visited_elements: HashSet<String>,
    pub scroll_count: u32,
    pub scout_results: HashMap<String, ScoutOutcome>,
    pub traversal_phase: TraversalPhase,
    pub screen_plan: Option<Vec<RankedElement>>,
}

/// One accepted transition between screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from_fingerprint: String,
    pub to_fingerprint: String,
    pub action_type: ActionType,
    pub element_text: String,
}

/// How `record_transition` classified a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Same screen as the current node; nothing recorded
    Duplicate,
    /// A known screen; an edge was added and current moved there
    Revisited(String),
    /// A novel screen; node and edge were added and current moved there
    NewScreen(String),
}

/// Immutable view of a finished graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: HashMap<String, GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub root_fingerprint: String,
}

#[derive(Default)]
struct GraphState {
    nodes: HashMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
    current: Option<String>,
    root: Option<String>,
    started: bool,
}

/// See the module docs. All methods take `&self`; state lives behind a
/// mutex.
#[derive(Default)]
pub struct NavigationGraph {
    state: Mutex<GraphState>,
}

impl NavigationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all state and capture the root screen at depth 0.
    pub fn start(
        &self,
        elements: &[TapPoint],
        hints: &[String],
        icons: &[Icon],
        screenshot_base64: &str,
        screen_type: ScreenType,
    ) -> String {
        let fp = fingerprint::compute(elements, icons);
        let mut state = self.lock();
        *state = GraphState::default();
        state.nodes.insert(
            fp.clone(),
            new_node(&fp, 0, screen_type, elements, icons, hints, screenshot_base64),
        );
        state.current = Some(fp.clone());
        state.root = Some(fp.clone());
        state.started = true;
        info!(fingerprint = %fp, "graph started at root");
        fp
    }

    /// Record an arrival at a screen, classifying it as duplicate,
    /// revisit, or novel. Duplicates leave the graph untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn record_transition(
        &self,
        elements: &[TapPoint],
        hints: &[String],
        icons: &[Icon],
        screenshot_base64: &str,
        action_type: ActionType,
        element_text: &str,
        screen_type: ScreenType,
    ) -> TransitionOutcome {
        let fp = fingerprint::compute(elements, icons);
        let mut state = self.lock();
        if !state.started {
            warn!("record_transition before start; ignoring");
            return TransitionOutcome::Duplicate;
        }
        let current_fp = match state.current.clone() {
            Some(fp) => fp,
            None => return TransitionOutcome::Duplicate,
        };

        // Same screen as where we already are?
        if fp == current_fp {
            return TransitionOutcome::Duplicate;
        }
        if let Some(current_node) = state.nodes.get(&current_fp) {
            if fingerprint::jaccard_similarity(elements, &current_node.elements)
                >= SIMILARITY_THRESHOLD
            {
                debug!(fingerprint = %fp, "near-duplicate of current screen");
                return TransitionOutcome::Duplicate;
            }
        }

        // A known screen, exactly or by nearest similarity?
        let existing = if state.nodes.contains_key(&fp) {
            Some(fp.clone())
        } else {
            state
                .nodes
                .values()
                .map(|n| (n.fingerprint.clone(), fingerprint::jaccard_similarity(elements, &n.elements)))
                .filter(|(_, sim)| *sim >= SIMILARITY_THRESHOLD)
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(fp, _)| fp)
        };

        if let Some(existing_fp) = existing {
            state.edges.push(GraphEdge {
                from_fingerprint: current_fp,
                to_fingerprint: existing_fp.clone(),
                action_type,
                element_text: element_text.to_string(),
            });
            state.current = Some(existing_fp.clone());
            debug!(fingerprint = %existing_fp, "revisited known screen");
            return TransitionOutcome::Revisited(existing_fp);
        }

        // Novel screen.
        let depth = state
            .nodes
            .get(&current_fp)
            .map(|n| n.depth + 1)
            .unwrap_or(1);
        state.nodes.insert(
            fp.clone(),
            new_node(&fp, depth, screen_type, elements, icons, hints, screenshot_base64),
        );
        state.edges.push(GraphEdge {
            from_fingerprint: current_fp,
            to_fingerprint: fp.clone(),
            action_type,
            element_text: element_text.to_string(),
        });
        state.current = Some(fp.clone());
        info!(fingerprint = %fp, depth, "new screen recorded");
        TransitionOutcome::NewScreen(fp)
    }

    /// Resynchronize "where am I" after a physical backtrack. Never
    /// creates nodes or edges; unknown fingerprints are ignored.
    pub fn set_current_fingerprint(&self, fp: &str) {
        let mut state = self.lock();
        if state.nodes.contains_key(fp) {
            state.current = Some(fp.to_string());
        } else {
            warn!(fingerprint = %fp, "cannot resync to unknown fingerprint");
        }
    }

    pub fn current_fingerprint(&self) -> Option<String> {
        self.lock().current.clone()
    }

    pub fn root_fingerprint(&self) -> Option<String> {
        self.lock().root.clone()
    }

    pub fn node(&self, fp: &str) -> Option<GraphNode> {
        self.lock().nodes.get(fp).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.lock().edges.len()
    }

    /// Record that a dive action consumed an element. Texts that never
    /// appeared on the node are ignored, keeping the visited set a
    /// subset of the node's elements.
    pub fn mark_element_visited(&self, fp: &str, text: &str) {
        let mut state = self.lock();
        if let Some(node) = state.nodes.get_mut(fp) {
            if node.elements.iter().any(|e| e.text == text) {
                node.visited_elements.insert(text.to_string());
            } else {
                warn!(fingerprint = %fp, text, "visited text not on node; ignoring");
            }
        }
    }

    /// Element texts not yet consumed by a dive action, in element order.
    pub fn unvisited_elements(&self, fp: &str) -> Vec<String> {
        let state = self.lock();
        match state.nodes.get(fp) {
            Some(node) => {
                let mut seen = HashSet::new();
                node.elements
                    .iter()
                    .map(|e| e.text.clone())
                    .filter(|t| !node.visited_elements.contains(t))
                    .filter(|t| seen.insert(t.clone()))
                    .collect()
            }
            None => Vec::new(),
        }
    }

    /// Union newly revealed elements into a node after a scroll. Returns
    /// how many element texts were actually new.
    pub fn merge_scrolled_elements(&self, fp: &str, new_elements: &[TapPoint]) -> usize {
        let mut state = self.lock();
        let node = match state.nodes.get_mut(fp) {
            Some(node) => node,
            None => return 0,
        };
        let known: HashSet<String> = node.elements.iter().map(|e| e.text.clone()).collect();
        let mut novel = 0;
        for element in new_elements {
            if !known.contains(&element.text)
                && !node.elements.iter().any(|e| e.text == element.text)
            {
                node.elements.push(element.clone());
                novel += 1;
            }
        }
        if novel > 0 {
            debug!(fingerprint = %fp, novel, "merged scrolled elements");
        }
        novel
    }

    pub fn scroll_count(&self, fp: &str) -> u32 {
        self.lock().nodes.get(fp).map(|n| n.scroll_count).unwrap_or(0)
    }

    pub fn increment_scroll_count(&self, fp: &str) {
        if let Some(node) = self.lock().nodes.get_mut(fp) {
            node.scroll_count += 1;
        }
    }

    pub fn record_scout_result(&self, fp: &str, text: &str, outcome: ScoutOutcome) {
        if let Some(node) = self.lock().nodes.get_mut(fp) {
            node.scout_results.insert(text.to_string(), outcome);
        }
    }

    pub fn scout_results(&self, fp: &str) -> HashMap<String, ScoutOutcome> {
        self.lock()
            .nodes
            .get(fp)
            .map(|n| n.scout_results.clone())
            .unwrap_or_default()
    }

    pub fn traversal_phase(&self, fp: &str) -> Option<TraversalPhase> {
        self.lock().nodes.get(fp).map(|n| n.traversal_phase)
    }

    /// Advance a node's phase. Reverse transitions are ignored; the
    /// phase is monotonic per session.
    pub fn set_traversal_phase(&self, fp: &str, phase: TraversalPhase) {
        if let Some(node) = self.lock().nodes.get_mut(fp) {
            if phase >= node.traversal_phase {
                node.traversal_phase = phase;
            } else {
                warn!(fingerprint = %fp, ?phase, "ignoring reverse phase transition");
            }
        }
    }

    pub fn set_screen_plan(&self, fp: &str, plan: Vec<RankedElement>) {
        if let Some(node) = self.lock().nodes.get_mut(fp) {
            node.screen_plan = Some(plan);
        }
    }

    pub fn screen_plan(&self, fp: &str) -> Option<Vec<RankedElement>> {
        self.lock().nodes.get(fp).and_then(|n| n.screen_plan.clone())
    }

    pub fn clear_screen_plan(&self, fp: &str) {
        if let Some(node) = self.lock().nodes.get_mut(fp) {
            node.screen_plan = None;
        }
    }

    /// Highest-scored plan entry whose text has not been visited.
    pub fn next_planned_element(&self, fp: &str) -> Option<RankedElement> {
        let state = self.lock();
        let node = state.nodes.get(fp)?;
        let plan = node.screen_plan.as_ref()?;
        plan.iter()
            .find(|e| !node.visited_elements.contains(&e.point.text))
            .cloned()
    }

    /// Freeze the graph into an immutable snapshot.
    pub fn finalize(&self) -> GraphSnapshot {
        let state = self.lock();
        GraphSnapshot {
            nodes: state.nodes.clone(),
            edges: state.edges.clone(),
            root_fingerprint: state.root.clone().unwrap_or_default(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GraphState> {
        // A poisoned lock means a panic mid-mutation; propagating the
        // inner state is still the least-bad option for a status read.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn new_node(
    fp: &str,
    depth: u32,
    screen_type: ScreenType,
    elements: &[TapPoint],
    icons: &[Icon],
    hints: &[String],
    screenshot_base64: &str,
) -> GraphNode {
    GraphNode {
        fingerprint: fp.to_string(),
        depth,
        screen_type,
        elements: elements.to_vec(),
        icons: icons.to_vec(),
        hints: hints.to_vec(),
        screenshot_base64: screenshot_base64.to_string(),
        visited_elements: HashSet::new(),
        scroll_count: 0,
        scout_results: HashMap::new(),
        traversal_phase: TraversalPhase::Scout,
        screen_plan: None,
    }
}
