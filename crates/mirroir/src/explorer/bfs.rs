//! Breadth-first exploration
//!
//! The surveyor variant: an explicit frontier queue finishes every
//! element of the current depth before descending. Instead of stepwise
//! backtracking it replays the recorded edge path from the root to the
//! next frontier node, one action per step. Useful for shallow, broad
//! surveys of an app's top levels.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classifier::ElementClassifier;
use crate::device::{InputActuator, ScreenDescriber};
use crate::errors::ExplorerError;
use crate::explorer::{dismiss_overlays, ensure_screen_plan, StepOutcome};
use crate::graph::{GraphEdge, GraphSnapshot, TransitionOutcome, TraversalPhase};
use crate::session::{CaptureOutcome, ExplorationSession};
use crate::strategy::{BacktrackMethod, PlatformStrategy};
use crate::types::{ActionType, ExplorationBudget};

pub struct BfsExplorer {
    session: Arc<ExplorationSession>,
    strategy: Arc<dyn PlatformStrategy>,
    budget: ExplorationBudget,
    classifier: ElementClassifier,
    /// Screens awaiting exploration, shallowest first
    frontier: VecDeque<String>,
    frontier_seeded: bool,
    /// Fingerprints of the physical path, root first
    physical: Vec<String>,
    actions_on_screen: u32,
    last_action: (ActionType, Option<String>),
    started_at: Instant,
    cancel: CancellationToken,
}

impl BfsExplorer {
    pub fn new(
        session: Arc<ExplorationSession>,
        strategy: Arc<dyn PlatformStrategy>,
        budget: ExplorationBudget,
    ) -> Self {
        Self {
            session,
            strategy,
            budget,
            classifier: ElementClassifier::default(),
            frontier: VecDeque::new(),
            frontier_seeded: false,
            physical: Vec::new(),
            actions_on_screen: 0,
            last_action: (ActionType::Launch, None),
            started_at: Instant::now(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Perform one unit of survey work.
    pub async fn step(
        &mut self,
        describer: &dyn ScreenDescriber,
        input: &dyn InputActuator,
    ) -> StepOutcome {
        if self.cancel.is_cancelled() {
            info!("survey cancelled");
            return StepOutcome::Finished;
        }
        let depth = self.physical.len().saturating_sub(1) as u32;
        let elapsed = self.started_at.elapsed().as_secs();
        if self
            .budget
            .is_exhausted(depth, self.session.screen_count(), elapsed)
        {
            info!(depth, elapsed, "budget exhausted");
            return StepOutcome::Finished;
        }

        let desc = match describer.describe(false).await {
            Ok(desc) => desc,
            Err(e) => return StepOutcome::Paused(format!("Failed to capture screen: {e}")),
        };
        let (desc, _overlay_note) = match dismiss_overlays(describer, input, desc).await {
            Ok(pair) => pair,
            Err(e) => return StepOutcome::Paused(format!("Failed to capture screen: {e}")),
        };

        let screen_type = self.strategy.classify_screen(&desc.elements, &desc.hints);
        let (action, via) = self.last_action.clone();
        let outcome = self.session.capture(
            &desc.elements,
            &desc.hints,
            &desc.icons,
            action,
            via.as_deref(),
            &desc.screenshot_base64,
            screen_type,
        );
        Self::sync_physical(&mut self.physical, &outcome);

        let graph = self.session.graph();
        let current = match graph.current_fingerprint() {
            Some(fp) => fp,
            None => return StepOutcome::Paused("Session has no current screen".to_string()),
        };

        if !self.frontier_seeded {
            self.frontier.push_back(current.clone());
            self.frontier_seeded = true;
        }
        let target = match self.frontier.front() {
            Some(target) => target.clone(),
            None => {
                info!("frontier drained, survey complete");
                return StepOutcome::Finished;
            }
        };

        if current != target {
            return self.replay_toward(describer, input, &current, &target, &desc.hints).await;
        }

        // Explore one element of the frontier head.
        graph.set_traversal_phase(&target, TraversalPhase::Dive);
        ensure_screen_plan(&self.session, self.strategy.as_ref(), &self.classifier, &target);

        if self.actions_on_screen >= self.budget.max_actions_per_screen {
            debug!(fingerprint = %target, "action budget spent on screen");
            return self.advance_frontier(&target);
        }
        let next = match graph.next_planned_element(&target) {
            Some(next) => next,
            None => return self.advance_frontier(&target),
        };

        if self.strategy.should_skip(&next.point.text, &self.budget) {
            graph.mark_element_visited(&target, &next.point.text);
            return StepOutcome::Continue(format!("Skipped '{}'", next.point.text));
        }

        if let Err(e) = input.tap(next.point.x, next.point.y).await {
            return StepOutcome::Paused(format!("Tap failed: {e}"));
        }
        let after = match describer.describe(false).await {
            Ok(desc) => desc,
            Err(e) => return StepOutcome::Paused(format!("Failed to capture screen: {e}")),
        };
        let after_type = self.strategy.classify_screen(&after.elements, &after.hints);
        let outcome = self.session.capture(
            &after.elements,
            &after.hints,
            &after.icons,
            ActionType::Tap,
            Some(&next.point.text),
            &after.screenshot_base64,
            after_type,
        );
        graph.mark_element_visited(&target, &next.point.text);
        self.actions_on_screen += 1;
        self.last_action = (ActionType::Tap, Some(next.point.text.clone()));
        Self::sync_physical(&mut self.physical, &outcome);

        let text = &next.point.text;
        match outcome {
            CaptureOutcome::Accepted(TransitionOutcome::NewScreen(fp)) => {
                let child_depth = graph.node(&fp).map(|n| n.depth).unwrap_or(u32::MAX);
                if child_depth < self.budget.max_depth {
                    self.frontier.push_back(fp.clone());
                } else {
                    debug!(fingerprint = %fp, "child at depth cap, not enqueued");
                }
                // Hop straight back so the next step continues this screen.
                if let Err(e) = self
                    .issue_back(input, &after.hints, child_depth)
                    .await
                {
                    return StepOutcome::Paused(format!("Backtrack failed: {e}"));
                }
                self.physical.pop();
                graph.set_current_fingerprint(&target);
                self.last_action = (ActionType::PressKey, None);
                StepOutcome::Continue(format!("Tapped '{text}': enqueued new screen"))
            }
            CaptureOutcome::Accepted(TransitionOutcome::Revisited(_)) => {
                // The device moved somewhere already known; the replay
                // machinery walks us back to the frontier next step.
                StepOutcome::Continue(format!("Tapped '{text}': revisited known screen"))
            }
            CaptureOutcome::Accepted(TransitionOutcome::Duplicate) | CaptureOutcome::Rejected => {
                StepOutcome::Continue(format!("Tapped '{text}': no change"))
            }
        }
    }

    /// One replay action toward the frontier head: back out if we are
    /// off the recorded root path, otherwise descend the next edge.
    async fn replay_toward(
        &mut self,
        describer: &dyn ScreenDescriber,
        input: &dyn InputActuator,
        current: &str,
        target: &str,
        hints: &[String],
    ) -> StepOutcome {
        let graph = self.session.graph();
        let snapshot = graph.finalize();
        let root = snapshot.root_fingerprint.clone();

        let (path_nodes, path_edges) = match shortest_path(&snapshot, &root, target) {
            Some(path) => path,
            None => {
                warn!(fingerprint = %target, "frontier node unreachable from root");
                self.frontier.pop_front();
                return StepOutcome::Continue("Dropped unreachable frontier screen".to_string());
            }
        };

        // Strictly shorter, so there is always a next edge to descend.
        let on_path = self.physical.len() < path_nodes.len()
            && self.physical[..] == path_nodes[..self.physical.len()];
        if !on_path || self.physical.is_empty() {
            // Off the recorded path: one step back toward the root.
            let depth = self.physical.len().saturating_sub(1) as u32;
            if let Err(e) = self.issue_back(input, hints, depth.max(1)).await {
                return StepOutcome::Paused(format!("Backtrack failed: {e}"));
            }
            if self.physical.len() > 1 {
                self.physical.pop();
                if let Some(previous) = self.physical.last() {
                    graph.set_current_fingerprint(previous);
                }
            }
            self.last_action = (ActionType::PressKey, None);
            return StepOutcome::Backtracked;
        }

        // Descend the next recorded edge.
        let hop = &path_edges[self.physical.len() - 1];
        let node = match graph.node(current) {
            Some(node) => node,
            None => return StepOutcome::Paused("Current screen unknown to graph".to_string()),
        };
        let point = node
            .elements
            .iter()
            .find(|e| e.text == hop.element_text)
            .cloned();
        let point = match point {
            Some(point) => point,
            None => {
                warn!(text = %hop.element_text, "replay element missing from screen");
                self.frontier.pop_front();
                return StepOutcome::Continue("Dropped unreachable frontier screen".to_string());
            }
        };

        if let Err(e) = input.tap(point.x, point.y).await {
            return StepOutcome::Paused(format!("Replay tap failed: {e}"));
        }
        let after = match describer.describe(false).await {
            Ok(desc) => desc,
            Err(e) => return StepOutcome::Paused(format!("Failed to capture screen: {e}")),
        };
        let screen_type = self.strategy.classify_screen(&after.elements, &after.hints);
        let before = graph.current_fingerprint();
        let outcome = self.session.capture(
            &after.elements,
            &after.hints,
            &after.icons,
            ActionType::Tap,
            Some(&hop.element_text),
            &after.screenshot_base64,
            screen_type,
        );
        self.last_action = (ActionType::Tap, Some(hop.element_text.clone()));
        Self::sync_physical(&mut self.physical, &outcome);

        if graph.current_fingerprint() == before && !outcome.is_accepted() {
            // The hop did nothing; this frontier node cannot be reached.
            warn!(text = %hop.element_text, "replay hop had no effect");
            self.frontier.pop_front();
            return StepOutcome::Continue("Dropped unreachable frontier screen".to_string());
        }
        self.actions_on_screen = 0;
        StepOutcome::Continue(format!("Replayed '{}' toward frontier", hop.element_text))
    }

    /// Finish the frontier head and move to the next screen in line.
    fn advance_frontier(&mut self, target: &str) -> StepOutcome {
        let graph = self.session.graph();
        graph.set_traversal_phase(target, TraversalPhase::Exhausted);
        self.frontier.pop_front();
        self.actions_on_screen = 0;
        if self.frontier.is_empty() {
            info!("frontier drained, survey complete");
            return StepOutcome::Finished;
        }
        debug!(remaining = self.frontier.len(), "advancing frontier");
        StepOutcome::Continue("Screen exhausted, advancing frontier".to_string())
    }

    async fn issue_back(
        &self,
        input: &dyn InputActuator,
        hints: &[String],
        depth: u32,
    ) -> Result<(), ExplorerError> {
        match self.strategy.backtrack_method(hints, depth.max(1)) {
            BacktrackMethod::PressBack { key, modifiers } => {
                input.press_key(&key, &modifiers).await
            }
            // The surveyor has no element context mid-replay; the chord
            // works on every mirrored platform.
            BacktrackMethod::TapBack | BacktrackMethod::None => {
                input.press_key("[", &["command".to_string()]).await
            }
        }
    }

    fn sync_physical(physical: &mut Vec<String>, outcome: &CaptureOutcome) {
        match outcome {
            CaptureOutcome::Accepted(TransitionOutcome::NewScreen(fp)) => {
                physical.push(fp.clone());
            }
            CaptureOutcome::Accepted(TransitionOutcome::Revisited(fp)) => {
                if let Some(pos) = physical.iter().position(|s| s == fp) {
                    physical.truncate(pos + 1);
                } else {
                    physical.push(fp.clone());
                }
            }
            CaptureOutcome::Accepted(TransitionOutcome::Duplicate) | CaptureOutcome::Rejected => {}
        }
    }
}

/// Shortest path from `from` to `to` over the recorded edges. Returns
/// the node sequence (including both endpoints) and the edges between
/// them.
fn shortest_path(
    snapshot: &GraphSnapshot,
    from: &str,
    to: &str,
) -> Option<(Vec<String>, Vec<GraphEdge>)> {
    if from == to {
        return Some((vec![from.to_string()], Vec::new()));
    }
    let mut adjacency: HashMap<&str, Vec<&GraphEdge>> = HashMap::new();
    for edge in &snapshot.edges {
        adjacency
            .entry(edge.from_fingerprint.as_str())
            .or_default()
            .push(edge);
    }

    let mut predecessor: HashMap<String, &GraphEdge> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(from);
    while let Some(node) = queue.pop_front() {
        if node == to {
            break;
        }
        for edge in adjacency.get(node).into_iter().flatten() {
            let next = edge.to_fingerprint.as_str();
            if next != from && !predecessor.contains_key(next) {
                predecessor.insert(next.to_string(), edge);
                queue.push_back(next);
            }
        }
    }

    predecessor.get(to)?;
    let mut edges: Vec<GraphEdge> = Vec::new();
    let mut cursor = to.to_string();
    while cursor != from {
        let edge = predecessor.get(&cursor)?;
        edges.push((*edge).clone());
        cursor = edge.from_fingerprint.clone();
    }
    edges.reverse();

    let mut nodes = vec![from.to_string()];
    nodes.extend(edges.iter().map(|e| e.to_fingerprint.clone()));
    Some((nodes, edges))
}
