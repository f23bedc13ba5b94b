//! Skill markdown rendering
//!
//! Each extracted path becomes a markdown file with YAML front matter
//! and a numbered step list; a `MANIFEST.md` indexes the bundle.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use mirroir::graph::GraphSnapshot;
use mirroir::types::ActionType;

use crate::pathfinder::{landmark, GraphPathFinder, SkillPath};

const SKILL_VERSION: &str = "1";

#[derive(Serialize)]
struct SkillFrontMatter<'a> {
    name: &'a str,
    version: &'a str,
    app: &'a str,
}

/// Render one skill file: front matter, title, numbered steps.
pub fn render_skill(path: &SkillPath, snapshot: &GraphSnapshot, app: &str) -> String {
    let front = SkillFrontMatter {
        name: &path.name,
        version: SKILL_VERSION,
        app,
    };
    let front_yaml = serde_yaml::to_string(&front).unwrap_or_default();

    let mut steps: Vec<String> = vec![format!("Launch \"{app}\"")];
    for edge in &path.edges {
        steps.push(match edge.action_type {
            ActionType::Tap => format!("Tap \"{}\"", edge.element_text),
            ActionType::Swipe => "Swipe up".to_string(),
            ActionType::PressKey => {
                let key = if edge.element_text.is_empty() {
                    "back"
                } else {
                    edge.element_text.as_str()
                };
                format!("Press **{key}**")
            }
            ActionType::Launch => format!("Launch \"{app}\""),
        });
    }
    if let Some(leaf) = snapshot.nodes.get(&path.leaf_fingerprint) {
        steps.push(format!(
            "Remember: this lands on the \"{}\" screen",
            landmark(leaf)
        ));
    }

    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&front_yaml);
    out.push_str("---\n\n");
    out.push_str(&format!("# {}\n\n## Steps\n\n", path.name));
    for (i, step) in steps.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, step));
    }
    out
}

/// Collapse a skill name into a safe filename stem: lowercase, runs of
/// non-alphanumerics become single dashes, edges trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// The bundle index: one line per emitted skill file.
pub fn render_manifest(app: &str, filenames: &[String]) -> String {
    let mut out = format!("# Skills for {app}\n\n");
    for name in filenames {
        out.push_str(&format!("- {name}\n"));
    }
    out
}

/// Extract every interesting path from the snapshot and write the skill
/// bundle (one file per path plus `MANIFEST.md`) into `dir`. Returns the
/// emitted skill filenames.
pub fn write_bundle(dir: &Path, app: &str, snapshot: &GraphSnapshot) -> anyhow::Result<Vec<String>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating skill bundle directory {}", dir.display()))?;

    let paths = GraphPathFinder::find_interesting_paths(snapshot);
    let mut filenames: Vec<String> = Vec::with_capacity(paths.len());
    for path in &paths {
        let stem = sanitize_filename(&path.name);
        let stem: &str = if stem.is_empty() { "skill" } else { stem.as_str() };
        let mut filename = format!("{stem}.md");
        // Distinct paths can sanitize to the same stem.
        let mut suffix = 2;
        while filenames.contains(&filename) {
            filename = format!("{stem}-{suffix}.md");
            suffix += 1;
        }
        let rendered = render_skill(path, snapshot, app);
        let file_path: PathBuf = dir.join(&filename);
        std::fs::write(&file_path, rendered)
            .with_context(|| format!("writing skill {}", file_path.display()))?;
        filenames.push(filename);
    }

    std::fs::write(dir.join("MANIFEST.md"), render_manifest(app, &filenames))
        .context("writing MANIFEST.md")?;
    info!(count = filenames.len(), dir = %dir.display(), "skill bundle written");
    Ok(filenames)
}
