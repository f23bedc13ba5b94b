//! The traversal state machines
//!
//! Two explorers share one external contract: `step()` performs one
//! bounded unit of work (at most a handful of OCR calls and input
//! actions) and reports what happened. The caller loops until
//! `Finished`, and may retry after `Paused`.

mod bfs;
mod dfs;

pub use bfs::BfsExplorer;
pub use dfs::DfsExplorer;

use tracing::warn;

use crate::classifier::ElementClassifier;
use crate::device::{InputActuator, ScreenDescriber};
use crate::errors::ExplorerError;
use crate::overlay::{AlertDetector, SpotlightDetector};
use crate::planner::ScreenPlanner;
use crate::session::ExplorationSession;
use crate::strategy::PlatformStrategy;
use crate::types::{RankedElement, ScreenDescription};

/// Result of one `step()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Progress was made; the description says what
    Continue(String),
    /// The explorer physically moved back toward the root
    Backtracked,
    /// A transient failure; the caller may retry the step
    Paused(String),
    /// Budgets are spent or nothing is left to explore
    Finished,
}

/// Dismiss any overlay covering the app before the step proceeds.
///
/// Alerts are tapped away via their safest button, the system search
/// overlay via Escape; either way the screen is re-described. A failed
/// dismiss tap degrades to a normal step on the original description.
pub(crate) async fn dismiss_overlays(
    describer: &dyn ScreenDescriber,
    input: &dyn InputActuator,
    desc: ScreenDescription,
) -> Result<(ScreenDescription, Option<String>), ExplorerError> {
    if let Some(alert) = AlertDetector::detect_alert(&desc.elements) {
        let target = &alert.dismiss_target;
        if let Err(e) = input.tap(target.x, target.y).await {
            warn!(error = %e, "alert dismiss tap failed; continuing");
            return Ok((desc, None));
        }
        let refreshed = describer.describe(false).await?;
        return Ok((
            refreshed,
            Some(format!("Dismissed alert via '{}'", target.text)),
        ));
    }

    if SpotlightDetector::is_spotlight_visible(&desc.elements) {
        if let Err(e) = input.press_key("escape", &[]).await {
            warn!(error = %e, "spotlight dismiss failed; continuing");
            return Ok((desc, None));
        }
        let refreshed = describer.describe(false).await?;
        return Ok((refreshed, Some("Dismissed search overlay".to_string())));
    }

    Ok((desc, None))
}

/// Build and cache the screen plan for a node if none exists, falling
/// back to the strategy's own ranking when the planner finds nothing.
pub(crate) fn ensure_screen_plan(
    session: &ExplorationSession,
    strategy: &dyn PlatformStrategy,
    classifier: &ElementClassifier,
    fp: &str,
) {
    let graph = session.graph();
    if graph.screen_plan(fp).is_some() {
        return;
    }
    let node = match graph.node(fp) {
        Some(node) => node,
        None => return,
    };
    let classified = classifier.classify(&node.elements);
    let (_, height) = strategy.screen_size();
    let mut plan = ScreenPlanner::build_plan(
        &classified,
        &node.visited_elements,
        &node.scout_results,
        height,
    );
    if plan.is_empty() {
        plan = strategy
            .rank_elements(
                &node.elements,
                &node.icons,
                &node.visited_elements,
                node.depth,
                node.screen_type,
            )
            .into_iter()
            .map(|point| RankedElement {
                point,
                score: 0.0,
                reason: "strategy fallback".to_string(),
            })
            .collect();
    }
    graph.set_screen_plan(fp, plan);
}
