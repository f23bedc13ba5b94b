//! Screen components: definitions, detection, and the on-disk catalog

pub mod catalog;
pub mod definition;
pub mod detector;
pub mod loader;

pub use definition::{
    AbsorbCondition, ChevronMode, ClickResult, ClickTarget, ComponentDefinition, Platform, Zone,
};
pub use detector::{score_match, ComponentDetector, RowProperties, ScreenComponent};
pub use loader::{load_all, load_dir, parse_definition, search_paths};
