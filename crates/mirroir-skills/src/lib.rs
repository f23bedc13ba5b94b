//! Skill extraction for finished mirroir exploration runs
//!
//! Walks a [`mirroir::graph::GraphSnapshot`] from the root to every
//! interesting leaf and turns each path into a replayable skill: a
//! markdown file of numbered action sentences, indexed by a
//! `MANIFEST.md`.

pub mod pathfinder;
pub mod render;

pub use pathfinder::{landmark, ExploredScreen, GraphPathFinder, SkillPath};
pub use render::{render_manifest, render_skill, sanitize_filename, write_bundle};
