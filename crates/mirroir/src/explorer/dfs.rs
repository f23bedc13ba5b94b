//! Depth-first exploration
//!
//! Scout-then-dive per screen: tab roots get probe taps first, then the
//! planner's ranked elements are consumed one tap per step, pushing
//! novel screens onto the stack. When a screen runs dry the explorer
//! scrolls, and when scrolling runs dry it physically backtracks. A
//! tab-root session at depth >= 3 fast-backtracks straight to the root.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::classifier::ElementClassifier;
use crate::device::{InputActuator, ScreenDescriber};
use crate::errors::ExplorerError;
use crate::explorer::{dismiss_overlays, StepOutcome};
use crate::fingerprint::{jaccard_similarity, SIMILARITY_THRESHOLD};
use crate::graph::{GraphNode, TransitionOutcome, TraversalPhase};
use crate::planner::{ScoutOutcome, ScoutPhase};
use crate::session::{CaptureOutcome, ExplorationSession};
use crate::strategy::{BacktrackMethod, PlatformStrategy};
use crate::types::{
    ActionType, ElementRole, ExplorationBudget, RankedElement, ScreenDescription, TapPoint,
};

/// Duration of a content swipe.
const SWIPE_DURATION_MS: u64 = 300;

/// Back-affordance texts a `TapBack` looks for.
const BACK_AFFORDANCES: [&str; 4] = ["<", "\u{2039}", "Back", "\u{2039} Back"];

pub struct DfsExplorer {
    session: Arc<ExplorationSession>,
    strategy: Arc<dyn PlatformStrategy>,
    budget: ExplorationBudget,
    classifier: ElementClassifier,
    /// Fingerprints of the physical path, root first
    stack: Vec<String>,
    actions_on_screen: u32,
    scout_counts: HashMap<String, u32>,
    /// How we arrived at the screen the next capture will see
    last_action: (ActionType, Option<String>),
    started_at: Instant,
    cancel: CancellationToken,
}

impl DfsExplorer {
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
            stack: Vec::new(),
            actions_on_screen: 0,
            scout_counts: HashMap::new(),
            last_action: (ActionType::Launch, None),
            started_at: Instant::now(),
            cancel: CancellationToken::new(),
        }
    }

    /// Token observed between steps; cancelling it finishes the run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Perform one unit of exploration work.
    pub async fn step(
        &mut self,
        describer: &dyn ScreenDescriber,
        input: &dyn InputActuator,
    ) -> StepOutcome {
        if self.cancel.is_cancelled() {
            info!("exploration cancelled");
            return StepOutcome::Finished;
        }
        let depth = self.stack.len().saturating_sub(1) as u32;
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

        // Record where we are. After a normal dive step this is a
        // session-level duplicate of the previous capture and changes
        // nothing; after backtracks and overlays it resynchronizes.
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
        Self::sync_stack(&mut self.stack, &mut self.actions_on_screen, &outcome);

        let graph = self.session.graph();
        let current = match graph.current_fingerprint() {
            Some(fp) => fp,
            None => return StepOutcome::Paused("Session has no current screen".to_string()),
        };
        let node = match graph.node(&current) {
            Some(node) => node,
            None => return StepOutcome::Paused("Current screen unknown to graph".to_string()),
        };

        if self
            .strategy
            .is_terminal(&desc.elements, node.depth, &self.budget, node.screen_type)
        {
            debug!(fingerprint = %current, "terminal screen");
            return self.backtrack(input, &desc).await;
        }

        // Scout phase, tab roots only.
        if graph.traversal_phase(&current) == Some(TraversalPhase::Scout) {
            let classified = self.classifier.classify(&node.elements);
            let navigation_count = classified
                .iter()
                .filter(|e| e.role == ElementRole::Navigation)
                .count();
            if ScoutPhase::should_scout(node.screen_type, node.depth, navigation_count) {
                let scouted: HashSet<String> =
                    graph.scout_results(&current).keys().cloned().collect();
                let scout_count = self.scout_counts.get(&current).copied().unwrap_or(0);
                if scout_count < self.budget.max_scouts_per_screen {
                    if let Some(target) = ScoutPhase::next_scout_target(&classified, &scouted) {
                        let target = target.clone();
                        return self.scout(describer, input, &current, &node, target).await;
                    }
                }
            }
            graph.set_traversal_phase(&current, TraversalPhase::Dive);
        }

        // Dive phase.
        crate::explorer::ensure_screen_plan(
            &self.session,
            self.strategy.as_ref(),
            &self.classifier,
            &current,
        );

        if self.actions_on_screen >= self.budget.max_actions_per_screen {
            debug!(fingerprint = %current, "action budget spent on screen");
            return self.scroll_or_backtrack(describer, input, &current, &desc, false).await;
        }

        let target = match graph.next_planned_element(&current) {
            Some(target) => target,
            None => {
                return self
                    .scroll_or_backtrack(describer, input, &current, &desc, true)
                    .await
            }
        };

        if self.strategy.should_skip(&target.point.text, &self.budget) {
            graph.mark_element_visited(&current, &target.point.text);
            debug!(text = %target.point.text, "skipping element");
            return StepOutcome::Continue(format!("Skipped '{}'", target.point.text));
        }

        self.dive(describer, input, &current, target).await
    }

    /// Probe one element: tap, observe, record, and come straight back.
    /// Scouting never marks elements visited.
    async fn scout(
        &mut self,
        describer: &dyn ScreenDescriber,
        input: &dyn InputActuator,
        current: &str,
        node: &GraphNode,
        target: TapPoint,
    ) -> StepOutcome {
        *self.scout_counts.entry(current.to_string()).or_insert(0) += 1;

        if let Err(e) = input.tap(target.x, target.y).await {
            return StepOutcome::Paused(format!("Scout tap failed: {e}"));
        }
        let after = match describer.describe(false).await {
            Ok(desc) => desc,
            Err(e) => return StepOutcome::Paused(format!("Failed to capture screen: {e}")),
        };

        let outcome = if jaccard_similarity(&after.elements, &node.elements) >= SIMILARITY_THRESHOLD
        {
            ScoutOutcome::NoChange
        } else {
            ScoutOutcome::Navigated
        };
        let graph = self.session.graph();
        graph.record_scout_result(current, &target.text, outcome);

        if outcome == ScoutOutcome::Navigated {
            if let Err(e) = self
                .issue_back(input, &after.hints, &after.elements, node.depth + 1)
                .await
            {
                return StepOutcome::Paused(format!("Scout backtrack failed: {e}"));
            }
            if let Some(root) = graph.root_fingerprint() {
                graph.set_current_fingerprint(&root);
            }
        }

        let verdict = match outcome {
            ScoutOutcome::Navigated => "navigated",
            ScoutOutcome::NoChange => "no change",
        };
        info!(text = %target.text, verdict, "scouted element");
        StepOutcome::Continue(format!("Scouted '{}': {verdict}", target.text))
    }

    /// Tap the next planned element and record what happened. Every
    /// dive tap marks its element visited, whatever the outcome.
    async fn dive(
        &mut self,
        describer: &dyn ScreenDescriber,
        input: &dyn InputActuator,
        current: &str,
        target: RankedElement,
    ) -> StepOutcome {
        if let Err(e) = input.tap(target.point.x, target.point.y).await {
            return StepOutcome::Paused(format!("Tap failed: {e}"));
        }
        let after = match describer.describe(false).await {
            Ok(desc) => desc,
            Err(e) => return StepOutcome::Paused(format!("Failed to capture screen: {e}")),
        };

        let screen_type = self.strategy.classify_screen(&after.elements, &after.hints);
        let outcome = self.session.capture(
            &after.elements,
            &after.hints,
            &after.icons,
            ActionType::Tap,
            Some(&target.point.text),
            &after.screenshot_base64,
            screen_type,
        );
        let graph = self.session.graph();
        graph.mark_element_visited(current, &target.point.text);
        self.actions_on_screen += 1;
        self.last_action = (ActionType::Tap, Some(target.point.text.clone()));
        Self::sync_stack(&mut self.stack, &mut self.actions_on_screen, &outcome);

        let text = &target.point.text;
        match outcome {
            CaptureOutcome::Accepted(TransitionOutcome::NewScreen(fp)) => {
                debug!(fingerprint = %fp, "dive found new screen");
                StepOutcome::Continue(format!("Tapped '{text}': new screen"))
            }
            CaptureOutcome::Accepted(TransitionOutcome::Revisited(fp)) => {
                debug!(fingerprint = %fp, "dive revisited known screen");
                StepOutcome::Continue(format!("Tapped '{text}': revisited known screen"))
            }
            CaptureOutcome::Accepted(TransitionOutcome::Duplicate) | CaptureOutcome::Rejected => {
                StepOutcome::Continue(format!("Tapped '{text}': no change"))
            }
        }
    }

    /// Scroll for more content if the budget allows, otherwise backtrack.
    /// `plan_exhausted` marks the screen `Exhausted` before backtracking.
    async fn scroll_or_backtrack(
        &mut self,
        describer: &dyn ScreenDescriber,
        input: &dyn InputActuator,
        current: &str,
        desc: &ScreenDescription,
        plan_exhausted: bool,
    ) -> StepOutcome {
        let graph = self.session.graph();
        if graph.scroll_count(current) < self.budget.scroll_limit {
            let (width, height) = self.strategy.screen_size();
            if let Err(e) = input
                .swipe(
                    width / 2.0,
                    height * 0.7,
                    width / 2.0,
                    height * 0.3,
                    SWIPE_DURATION_MS,
                )
                .await
            {
                return StepOutcome::Paused(format!("Swipe failed: {e}"));
            }
            self.last_action = (ActionType::Swipe, None);

            let after = match describer.describe(false).await {
                Ok(desc) => desc,
                Err(e) => return StepOutcome::Paused(format!("Failed to capture screen: {e}")),
            };
            let novel = graph.merge_scrolled_elements(current, &after.elements);
            if novel >= 1 {
                self.actions_on_screen = 0;
                graph.clear_screen_plan(current);
                debug!(fingerprint = %current, novel, "scroll revealed content");
                return StepOutcome::Continue(format!("Scrolled, {novel} novel"));
            }
            // Only fruitless scrolls consume budget; fall through to
            // backtrack.
            graph.increment_scroll_count(current);
        }

        if plan_exhausted {
            graph.set_traversal_phase(current, TraversalPhase::Exhausted);
        }
        self.backtrack(input, desc).await
    }

    /// Physically move back toward the root and resynchronize the graph.
    async fn backtrack(&mut self, input: &dyn InputActuator, desc: &ScreenDescription) -> StepOutcome {
        if self.stack.len() <= 1 {
            info!("exploration complete");
            return StepOutcome::Finished;
        }
        let graph = self.session.graph();
        let root = match graph.root_fingerprint() {
            Some(root) => root,
            None => return StepOutcome::Finished,
        };
        let root_is_tab_root = graph
            .node(&root)
            .map(|n| n.screen_type == crate::types::ScreenType::TabRoot)
            .unwrap_or(false);

        if root_is_tab_root && self.stack.len() >= 3 {
            // Fast-backtrack: unwind the whole stack in one step.
            let presses = self.stack.len() - 1;
            for i in 0..presses {
                let depth = (presses - i) as u32;
                if let Err(e) = self
                    .issue_back(input, &desc.hints, &desc.elements, depth)
                    .await
                {
                    return StepOutcome::Paused(format!("Backtrack failed: {e}"));
                }
            }
            self.stack.truncate(1);
            graph.set_current_fingerprint(&root);
            self.actions_on_screen = 0;
            self.last_action = (ActionType::PressKey, None);
            info!(presses, "fast-backtracked to root");
            return StepOutcome::Backtracked;
        }

        let depth = self.stack.len().saturating_sub(1) as u32;
        if let Err(e) = self
            .issue_back(input, &desc.hints, &desc.elements, depth)
            .await
        {
            return StepOutcome::Paused(format!("Backtrack failed: {e}"));
        }
        self.stack.pop();
        if let Some(parent) = self.stack.last() {
            graph.set_current_fingerprint(parent);
        }
        self.actions_on_screen = 0;
        self.last_action = (ActionType::PressKey, None);
        StepOutcome::Backtracked
    }

    async fn issue_back(
        &self,
        input: &dyn InputActuator,
        hints: &[String],
        elements: &[TapPoint],
        depth: u32,
    ) -> Result<(), ExplorerError> {
        match self.strategy.backtrack_method(hints, depth) {
            BacktrackMethod::PressBack { key, modifiers } => {
                input.press_key(&key, &modifiers).await
            }
            BacktrackMethod::TapBack => {
                let affordance = elements.iter().find(|e| {
                    BACK_AFFORDANCES
                        .iter()
                        .any(|a| a.eq_ignore_ascii_case(e.text.trim()))
                });
                match affordance {
                    Some(point) => input.tap(point.x, point.y).await,
                    // No visible affordance; the chord is the fallback.
                    None => input.press_key("[", &["command".to_string()]).await,
                }
            }
            BacktrackMethod::None => Ok(()),
        }
    }

    /// Keep the stack equal to the physical path after a capture.
    fn sync_stack(stack: &mut Vec<String>, actions_on_screen: &mut u32, outcome: &CaptureOutcome) {
        match outcome {
            CaptureOutcome::Accepted(TransitionOutcome::NewScreen(fp)) => {
                stack.push(fp.clone());
                *actions_on_screen = 0;
            }
            CaptureOutcome::Accepted(TransitionOutcome::Revisited(fp)) => {
                // Looping back to an ancestor collapses the stack to it;
                // a cross-link to a sibling extends the physical path.
                if let Some(pos) = stack.iter().position(|s| s == fp) {
                    stack.truncate(pos + 1);
                } else {
                    stack.push(fp.clone());
                }
                *actions_on_screen = 0;
            }
            CaptureOutcome::Accepted(TransitionOutcome::Duplicate) | CaptureOutcome::Rejected => {}
        }
    }
}
