//! End-to-end explorer scenarios against a scripted device

mod common;

use std::sync::Arc;

use common::{FakeScreen, ScriptedDevice};
use mirroir::explorer::{BfsExplorer, DfsExplorer, StepOutcome};
use mirroir::planner::ScoutOutcome;
use mirroir::session::ExplorationSession;
use mirroir::strategy::MobileStrategy;
use mirroir::types::{ExplorationBudget, ScreenType, TapPoint};

const WIDTH: f64 = 390.0;
const HEIGHT: f64 = 800.0;

fn session() -> Arc<ExplorationSession> {
    common::init_tracing();
    let session = Arc::new(ExplorationSession::new());
    session.start("Scripted", None, Vec::new());
    session
}

fn strategy() -> Arc<MobileStrategy> {
    Arc::new(MobileStrategy::new(WIDTH, HEIGHT))
}

async fn run_to_finish(
    explorer: &mut DfsExplorer,
    device: &ScriptedDevice,
    max_steps: usize,
) -> Vec<StepOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..max_steps {
        let outcome = explorer.step(device, device).await;
        let finished = outcome == StepOutcome::Finished;
        outcomes.push(outcome);
        if finished {
            return outcomes;
        }
    }
    panic!("explorer did not finish within {max_steps} steps: {outcomes:?}");
}

/// S1: a three-level settings drill-down is fully captured, with one
/// edge per descent, and the run ends in `Finished` after backtracking.
#[tokio::test]
async fn settings_drilldown_captures_every_level() {
    let device = ScriptedDevice::new(
        "root",
        vec![
            (
                "root",
                FakeScreen::new(vec![
                    TapPoint::new("Settings", 40.0, 100.0),
                    TapPoint::new("General", 40.0, 140.0),
                ])
                .with_transition("General", "general"),
            ),
            (
                "general",
                FakeScreen::new(vec![
                    TapPoint::new("About", 40.0, 100.0),
                    TapPoint::new("Version", 40.0, 140.0),
                ])
                .with_transition("About", "about"),
            ),
            (
                "about",
                FakeScreen::new(vec![
                    TapPoint::new("Build", 40.0, 100.0),
                    TapPoint::new("Model", 40.0, 140.0),
                ]),
            ),
        ],
    );

    let session = session();
    let budget = ExplorationBudget {
        scroll_limit: 0,
        ..Default::default()
    };
    let mut explorer = DfsExplorer::new(session.clone(), strategy(), budget);
    let outcomes = run_to_finish(&mut explorer, &device, 30).await;

    let graph = session.graph();
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert!(outcomes.contains(&StepOutcome::Backtracked));

    let snapshot = graph.finalize();
    let mut depths: Vec<u32> = snapshot.nodes.values().map(|n| n.depth).collect();
    depths.sort();
    assert_eq!(depths, vec![0, 1, 2]);
    assert_eq!(snapshot.edges[0].element_text, "General");
    assert_eq!(snapshot.edges[1].element_text, "About");
}

fn tab_root_screen() -> FakeScreen {
    FakeScreen::new(vec![
        TapPoint::new("Alpha", 40.0, 300.0),
        TapPoint::new(">", 360.0, 302.0),
        TapPoint::new("Bravo", 40.0, 360.0),
        TapPoint::new(">", 360.0, 362.0),
        TapPoint::new("Charlie", 40.0, 420.0),
        TapPoint::new(">", 360.0, 422.0),
        TapPoint::new("Delta", 40.0, 480.0),
        TapPoint::new(">", 360.0, 482.0),
        TapPoint::new("Home", 65.0, 770.0),
        TapPoint::new("Search", 195.0, 770.0),
        TapPoint::new("Profile", 325.0, 770.0),
    ])
    .with_transition("Alpha", "screen-a")
    .with_transition("Bravo", "screen-b")
}

/// S2: a tab root scouts its first two rows, never marking them
/// visited, then flips to dive with the proven navigator on top.
#[tokio::test]
async fn tab_root_scouts_then_dives() {
    let device = ScriptedDevice::new(
        "root",
        vec![
            ("root", tab_root_screen()),
            (
                "screen-a",
                FakeScreen::new(vec![TapPoint::new("Apple content", 40.0, 300.0)]),
            ),
            (
                "screen-b",
                FakeScreen::new(vec![TapPoint::new("Banana content", 40.0, 300.0)]),
            ),
        ],
    );

    let session = session();
    let budget = ExplorationBudget {
        max_scouts_per_screen: 2,
        scroll_limit: 0,
        ..Default::default()
    };
    let mut explorer = DfsExplorer::new(session.clone(), strategy(), budget);
    let graph = session.graph();

    let first = explorer.step(&device, &device).await;
    assert_eq!(
        first,
        StepOutcome::Continue("Scouted 'Alpha': navigated".to_string())
    );
    let root = graph.root_fingerprint().unwrap();
    assert_eq!(graph.node(&root).unwrap().screen_type, ScreenType::TabRoot);
    // Scouting never marks anything visited, and we are back at root.
    assert!(graph.node(&root).unwrap().visited_elements.is_empty());
    assert_eq!(device.current_screen(), "root");

    let second = explorer.step(&device, &device).await;
    assert_eq!(
        second,
        StepOutcome::Continue("Scouted 'Bravo': navigated".to_string())
    );
    assert!(graph.node(&root).unwrap().visited_elements.is_empty());

    let results = graph.scout_results(&root);
    assert_eq!(results.get("Alpha"), Some(&ScoutOutcome::Navigated));
    assert_eq!(results.get("Bravo"), Some(&ScoutOutcome::Navigated));

    // Third step: scout budget spent, phase flips to dive; the plan's
    // top entry is the first proven navigator and the dive tap marks it.
    let third = explorer.step(&device, &device).await;
    assert!(matches!(third, StepOutcome::Continue(_)), "{third:?}");
    let plan = graph.screen_plan(&root).expect("plan cached in dive");
    assert_eq!(plan[0].point.text, "Alpha");
    assert!(plan[0].reason.contains("scouted: navigated"));
    assert!(graph.node(&root).unwrap().visited_elements.contains("Alpha"));
}

/// Scouting is allowed one level below the root; the resync target
/// after a navigated probe is always the root fingerprint.
#[tokio::test]
async fn scout_at_depth_one_resyncs_to_root() {
    let device = ScriptedDevice::new(
        "root",
        vec![
            (
                "root",
                FakeScreen::new(vec![TapPoint::new("Entry", 40.0, 300.0)])
                    .with_transition("Entry", "hub"),
            ),
            ("hub", tab_root_screen()),
            (
                "screen-a",
                FakeScreen::new(vec![TapPoint::new("Apple content", 40.0, 300.0)]),
            ),
            (
                "screen-b",
                FakeScreen::new(vec![TapPoint::new("Banana content", 40.0, 300.0)]),
            ),
        ],
    );

    let session = session();
    let budget = ExplorationBudget {
        scroll_limit: 0,
        ..Default::default()
    };
    let mut explorer = DfsExplorer::new(session.clone(), strategy(), budget);
    let graph = session.graph();

    // Dive from the plain root into the tab-styled hub at depth 1.
    let first = explorer.step(&device, &device).await;
    assert!(matches!(first, StepOutcome::Continue(_)), "{first:?}");
    let root = graph.root_fingerprint().unwrap();
    let hub = graph.current_fingerprint().unwrap();
    assert_ne!(hub, root);
    assert_eq!(graph.node(&hub).unwrap().depth, 1);
    assert_eq!(graph.node(&hub).unwrap().screen_type, ScreenType::TabRoot);

    // The hub scouts even though it is not the root...
    let second = explorer.step(&device, &device).await;
    assert_eq!(
        second,
        StepOutcome::Continue("Scouted 'Alpha': navigated".to_string())
    );
    let results = graph.scout_results(&hub);
    assert_eq!(results.get("Alpha"), Some(&ScoutOutcome::Navigated));
    assert!(graph.node(&hub).unwrap().visited_elements.is_empty());
    assert_eq!(device.current_screen(), "hub");

    // ...and the graph resynchronizes to the root fingerprint.
    assert_eq!(graph.current_fingerprint(), Some(root));
}

/// S3: an alert is dismissed through its safest button and leaves no
/// trace in the graph.
#[tokio::test]
async fn alert_is_dismissed_without_graph_edges() {
    let device = ScriptedDevice::new(
        "alert",
        vec![
            (
                "alert",
                FakeScreen::new(vec![
                    TapPoint::new("\"Scripted\" would like to use your location", 195.0, 300.0),
                    TapPoint::new("Allow", 260.0, 420.0),
                    TapPoint::new("Don't Allow", 130.0, 420.0),
                ])
                .with_transition("Don't Allow", "main"),
            ),
            (
                "main",
                FakeScreen::new(vec![
                    TapPoint::new("Feed", 40.0, 300.0),
                    TapPoint::new("Friends", 40.0, 340.0),
                ]),
            ),
        ],
    );

    let session = session();
    let mut explorer = DfsExplorer::new(session.clone(), strategy(), ExplorationBudget::default());
    let outcome = explorer.step(&device, &device).await;
    assert!(matches!(outcome, StepOutcome::Continue(_)), "{outcome:?}");

    assert!(device.tap_texts().contains(&"Don't Allow".to_string()));
    let graph = session.graph();
    // Only the post-alert screen was ever captured.
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
    let root = graph.root_fingerprint().unwrap();
    assert!(graph
        .node(&root)
        .unwrap()
        .elements
        .iter()
        .any(|e| e.text == "Feed"));
}

/// S5: two fruitful scrolls are free, only the third, fruitless swipe
/// consumes scroll budget, and the drained root finishes the run.
#[tokio::test]
async fn scroll_budget_bounds_the_swipes() {
    let device = ScriptedDevice::new(
        "feed",
        vec![(
            "feed",
            FakeScreen::new(vec![TapPoint::new("Item one", 40.0, 300.0)])
                .with_scroll_batch(vec![TapPoint::new("Item two", 40.0, 500.0)])
                .with_scroll_batch(vec![TapPoint::new("Item three", 40.0, 520.0)]),
        )],
    );

    let session = session();
    let budget = ExplorationBudget {
        scroll_limit: 2,
        ..Default::default()
    };
    let mut explorer = DfsExplorer::new(session.clone(), strategy(), budget);

    // Tap the only visible item.
    let outcome = explorer.step(&device, &device).await;
    assert!(matches!(outcome, StepOutcome::Continue(_)));

    // First scroll reveals one novel element, clears the plan, and
    // leaves the scroll budget untouched.
    let outcome = explorer.step(&device, &device).await;
    assert_eq!(outcome, StepOutcome::Continue("Scrolled, 1 novel".to_string()));
    let graph = session.graph();
    let root = graph.root_fingerprint().unwrap();
    assert!(graph.screen_plan(&root).is_none());
    assert_eq!(graph.scroll_count(&root), 0);

    let outcomes = run_to_finish(&mut explorer, &device, 10).await;
    assert_eq!(outcomes.last(), Some(&StepOutcome::Finished));
    // Two fruitful swipes plus the one fruitless attempt that finally
    // charged the budget.
    assert_eq!(device.swipes(), 3);
    assert_eq!(graph.scroll_count(&root), 1);
    assert_eq!(
        graph.traversal_phase(&root),
        Some(mirroir::graph::TraversalPhase::Exhausted)
    );
    // Everything revealed was eventually tapped.
    let taps = device.tap_texts();
    for text in ["Item one", "Item two", "Item three"] {
        assert!(taps.contains(&text.to_string()), "{text} missing: {taps:?}");
    }
}

/// Property 9: fast-backtrack from stack depth 3 on a tab-root session
/// emits exactly 2 back presses in a single step.
#[tokio::test]
async fn fast_backtrack_unwinds_the_stack_in_one_step() {
    let device = ScriptedDevice::new(
        "root",
        vec![
            (
                "root",
                FakeScreen::new(vec![
                    TapPoint::new("Alpha", 40.0, 300.0),
                    TapPoint::new(">", 360.0, 302.0),
                    TapPoint::new("Home", 65.0, 770.0),
                    TapPoint::new("Search", 195.0, 770.0),
                    TapPoint::new("Profile", 325.0, 770.0),
                ])
                .with_transition("Alpha", "screen-a"),
            ),
            (
                "screen-a",
                FakeScreen::new(vec![TapPoint::new("Bravo", 40.0, 300.0)])
                    .with_transition("Bravo", "screen-b"),
            ),
            (
                "screen-b",
                FakeScreen::new(vec![TapPoint::new("Leaf content", 40.0, 300.0)]),
            ),
        ],
    );

    let session = session();
    let budget = ExplorationBudget {
        max_scouts_per_screen: 0,
        scroll_limit: 0,
        ..Default::default()
    };
    let mut explorer = DfsExplorer::new(session.clone(), strategy(), budget);

    // Dive: root -> screen-a -> screen-b, then exhaust the leaf.
    for _ in 0..3 {
        let outcome = explorer.step(&device, &device).await;
        assert!(matches!(outcome, StepOutcome::Continue(_)), "{outcome:?}");
    }
    assert_eq!(explorer.stack_depth(), 3);
    assert_eq!(device.current_screen(), "screen-b");

    let before = device.back_presses();
    let outcome = explorer.step(&device, &device).await;
    assert_eq!(outcome, StepOutcome::Backtracked);
    assert_eq!(device.back_presses() - before, 2);
    assert_eq!(explorer.stack_depth(), 1);
    assert_eq!(device.current_screen(), "root");
    let graph = session.graph();
    assert_eq!(
        graph.current_fingerprint(),
        graph.root_fingerprint()
    );
}

/// A transient OCR failure pauses the step and the run recovers on
/// retry.
#[tokio::test]
async fn ocr_failure_pauses_and_recovers() {
    let device = ScriptedDevice::new(
        "root",
        vec![(
            "root",
            FakeScreen::new(vec![
                TapPoint::new("Settings", 40.0, 100.0),
                TapPoint::new("General", 40.0, 140.0),
            ]),
        )],
    );

    let session = session();
    let budget = ExplorationBudget {
        scroll_limit: 0,
        ..Default::default()
    };
    let mut explorer = DfsExplorer::new(session.clone(), strategy(), budget);

    device.fail_next_describe();
    let outcome = explorer.step(&device, &device).await;
    assert!(matches!(outcome, StepOutcome::Paused(_)), "{outcome:?}");
    assert_eq!(session.graph().node_count(), 0);

    let outcome = explorer.step(&device, &device).await;
    assert!(matches!(outcome, StepOutcome::Continue(_)), "{outcome:?}");
    assert_eq!(session.graph().node_count(), 1);
}

/// Cancellation is observed between steps.
#[tokio::test]
async fn cancellation_finishes_the_run() {
    let device = ScriptedDevice::new(
        "root",
        vec![(
            "root",
            FakeScreen::new(vec![TapPoint::new("Settings", 40.0, 100.0)]),
        )],
    );
    let session = session();
    let mut explorer = DfsExplorer::new(session, strategy(), ExplorationBudget::default());
    explorer.cancellation_token().cancel();
    assert_eq!(explorer.step(&device, &device).await, StepOutcome::Finished);
}

/// The BFS surveyor finishes every element of the root before touching
/// a child screen, reaching children by path replay.
#[tokio::test]
async fn bfs_explores_breadth_first_with_path_replay() {
    let device = ScriptedDevice::new(
        "root",
        vec![
            (
                "root",
                FakeScreen::new(vec![
                    TapPoint::new("Alpha", 40.0, 300.0),
                    TapPoint::new("Bravo", 40.0, 360.0),
                ])
                .with_transition("Alpha", "a")
                .with_transition("Bravo", "b"),
            ),
            (
                "a",
                FakeScreen::new(vec![TapPoint::new("Apple content", 40.0, 300.0)]),
            ),
            (
                "b",
                FakeScreen::new(vec![TapPoint::new("Banana content", 40.0, 300.0)]),
            ),
        ],
    );

    let session = session();
    let budget = ExplorationBudget {
        max_depth: 2,
        scroll_limit: 0,
        ..Default::default()
    };
    let mut explorer = BfsExplorer::new(session.clone(), strategy(), budget);

    let mut outcomes = Vec::new();
    for _ in 0..30 {
        let outcome = explorer.step(&device, &device).await;
        let finished = outcome == StepOutcome::Finished;
        outcomes.push(outcome);
        if finished {
            break;
        }
    }
    assert_eq!(outcomes.last(), Some(&StepOutcome::Finished), "{outcomes:?}");
    assert_eq!(session.graph().node_count(), 3);

    // Breadth order: both root entries before any child content.
    let taps = device.tap_texts();
    let first_child_tap = taps
        .iter()
        .position(|t| t.contains("content"))
        .expect("children explored");
    let alpha = taps.iter().position(|t| t == "Alpha").unwrap();
    let bravo = taps.iter().position(|t| t == "Bravo").unwrap();
    assert!(alpha < first_child_tap && bravo < first_child_tap, "{taps:?}");
}
