//! Autonomous UI exploration through screen mirroring plus OCR
//!
//! Given a running target application observed through a
//! [`ScreenDescriber`] and driven through an [`InputActuator`], the
//! explorer walks the app's reachable screens, builds a navigation
//! graph with fingerprint-based deduplication, and leaves behind a
//! snapshot from which reusable skill scripts can be extracted.
//!
//! The engine is platform-agnostic: a [`PlatformStrategy`] parameterizes
//! screen classification, element ranking, and backtracking for mobile
//! versus desktop targets.

pub mod classifier;
pub mod components;
pub mod device;
pub mod errors;
pub mod explorer;
pub mod fingerprint;
pub mod graph;
pub mod overlay;
pub mod planner;
pub mod session;
pub mod strategy;
pub mod types;

pub use classifier::ElementClassifier;
pub use components::{ComponentDefinition, ComponentDetector, ScreenComponent};
pub use device::{InputActuator, ScreenDescriber};
pub use errors::ExplorerError;
pub use explorer::{BfsExplorer, DfsExplorer, StepOutcome};
pub use graph::{
    GraphEdge, GraphNode, GraphSnapshot, NavigationGraph, TransitionOutcome, TraversalPhase,
};
pub use overlay::{Alert, AlertDetector, AlertType, SpotlightDetector};
pub use planner::{ScoutOutcome, ScoutPhase, ScreenPlanner};
pub use session::{
    ActionRecord, CaptureOutcome, CapturedScreen, ExplorationSession, SessionData, SessionMode,
};
pub use strategy::{BacktrackMethod, DesktopStrategy, MobileStrategy, PlatformStrategy};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    ActionType, ClassifiedElement, ElementRole, ExplorationBudget, Icon, RankedElement,
    ScreenDescription, ScreenType, TapPoint,
};
