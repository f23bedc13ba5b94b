//! Component definition files
//!
//! Definitions live on disk as markdown with YAML front matter and
//! `- key: value` bullets under `## Match Rules`, `## Interaction` and
//! `## Grouping`. Unparseable files are logged and skipped; they never
//! fail a run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::components::catalog;
use crate::components::definition::{
    AbsorbCondition, ChevronMode, ClickResult, ClickTarget, ComponentDefinition, Platform, Zone,
};
use crate::errors::ExplorerError;

#[derive(Debug, Deserialize, Default)]
struct FrontMatter {
    name: Option<String>,
    platform: Option<Platform>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Other,
    Description,
    MatchRules,
    Interaction,
    Grouping,
}

/// Parse one definition file. `fallback_name` is used when the front
/// matter has no `name` (normally the file stem).
pub fn parse_definition(
    content: &str,
    fallback_name: &str,
) -> Result<ComponentDefinition, ExplorerError> {
    let (front, body) = split_front_matter(content);
    let front: FrontMatter = match front {
        Some(yaml) => serde_yaml::from_str(yaml)
            .map_err(|e| ExplorerError::DefinitionParse(format!("front matter: {e}")))?,
        None => FrontMatter::default(),
    };

    let mut def =
        ComponentDefinition::named(front.name.unwrap_or_else(|| fallback_name.to_string()));
    def.platform = front.platform;

    let mut section = Section::Other;
    let mut description_lines: Vec<&str> = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix("## ") {
            section = match header.trim().to_lowercase().as_str() {
                "description" => Section::Description,
                "match rules" => Section::MatchRules,
                "interaction" => Section::Interaction,
                "grouping" => Section::Grouping,
                _ => Section::Other,
            };
            continue;
        }
        match section {
            Section::Description => {
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    description_lines.push(trimmed);
                }
            }
            Section::MatchRules | Section::Interaction | Section::Grouping => {
                if let Some((key, value)) = parse_bullet(trimmed) {
                    apply_key(&mut def, key, value)?;
                }
            }
            Section::Other => {}
        }
    }
    def.description = description_lines.join(" ");
    Ok(def)
}

fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let rest = match content.strip_prefix("---") {
        Some(rest) => rest,
        None => return (None, content),
    };
    match rest.split_once("\n---") {
        Some((front, body)) => {
            let body = body.strip_prefix('\n').unwrap_or(body);
            (Some(front), body)
        }
        None => (None, content),
    }
}

fn parse_bullet(line: &str) -> Option<(&str, &str)> {
    let item = line.strip_prefix("- ")?;
    let (key, value) = item.split_once(':')?;
    Some((key.trim(), value.trim()))
}

fn apply_key(def: &mut ComponentDefinition, key: &str, value: &str) -> Result<(), ExplorerError> {
    match key {
        "row_has_chevron" => def.row_has_chevron = Some(parse_bool(key, value)?),
        "chevron_mode" => {
            def.chevron_mode = Some(match value {
                "required" => ChevronMode::Required,
                "forbidden" => ChevronMode::Forbidden,
                "preferred" => ChevronMode::Preferred,
                other => return Err(bad_value(key, other)),
            })
        }
        "min_elements" => def.min_elements = parse_num(key, value)?,
        "max_elements" => def.max_elements = parse_num(key, value)?,
        "max_row_height_pt" => def.max_row_height_pt = parse_float(key, value)?,
        "zone" => {
            def.zone = match value {
                "nav_bar" => Zone::NavBar,
                "content" => Zone::Content,
                "tab_bar" => Zone::TabBar,
                other => return Err(bad_value(key, other)),
            }
        }
        "has_numeric_value" => def.has_numeric_value = Some(parse_bool(key, value)?),
        "has_long_text" => def.has_long_text = Some(parse_bool(key, value)?),
        "has_dismiss_button" => def.has_dismiss_button = Some(parse_bool(key, value)?),
        "min_confidence" => def.min_confidence = Some(parse_float(key, value)?),
        "exclude_numeric_only" => def.exclude_numeric_only = parse_bool(key, value)?,
        "text_pattern" => {
            regex::Regex::new(value).map_err(|e| {
                ExplorerError::DefinitionParse(format!("text_pattern '{value}': {e}"))
            })?;
            def.text_pattern = Some(value.to_string());
        }
        "clickable" => def.clickable = parse_bool(key, value)?,
        "click_target" => {
            def.click_target = match value {
                "first_navigation_element" => ClickTarget::FirstNavigationElement,
                "first_dismiss_button" => ClickTarget::FirstDismissButton,
                "none" => ClickTarget::None,
                other => return Err(bad_value(key, other)),
            }
        }
        "click_result" => {
            def.click_result = match value {
                "navigates" => ClickResult::Navigates,
                "dismisses" => ClickResult::Dismisses,
                "none" => ClickResult::None,
                other => return Err(bad_value(key, other)),
            }
        }
        "back_after_click" => def.back_after_click = parse_bool(key, value)?,
        "absorbs_same_row" => def.absorbs_same_row = parse_bool(key, value)?,
        "absorbs_below_within_pt" => def.absorbs_below_within_pt = parse_float(key, value)?,
        "absorb_condition" => {
            def.absorb_condition = match value {
                "any" => AbsorbCondition::Any,
                "info_or_decoration_only" => AbsorbCondition::InfoOrDecorationOnly,
                other => return Err(bad_value(key, other)),
            }
        }
        other => {
            debug!(key = other, "ignoring unknown definition key");
        }
    }
    Ok(())
}

fn bad_value(key: &str, value: &str) -> ExplorerError {
    ExplorerError::DefinitionParse(format!("invalid value '{value}' for {key}"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ExplorerError> {
    value.parse().map_err(|_| bad_value(key, value))
}

fn parse_num(key: &str, value: &str) -> Result<usize, ExplorerError> {
    value.parse().map_err(|_| bad_value(key, value))
}

fn parse_float(key: &str, value: &str) -> Result<f64, ExplorerError> {
    value.parse().map_err(|_| bad_value(key, value))
}

/// Definition search paths, lowest precedence first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("./components")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".mirroir-mcp").join("components"));
        paths.push(home.join("mirroir-skills").join("components"));
    }
    paths
}

/// Load every `.md` definition in one directory. Bad files are skipped.
pub fn load_dir(dir: &Path) -> Vec<ComponentDefinition> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut defs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("component")
            .to_string();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable definition");
                continue;
            }
        };
        match parse_definition(&content, &stem) {
            Ok(def) => defs.push(def),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unparseable definition");
            }
        }
    }
    defs
}

/// Load the built-in catalog plus every definition found on the search
/// paths. Later sources override earlier ones by name.
pub fn load_all() -> Vec<ComponentDefinition> {
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut defs: Vec<ComponentDefinition> = Vec::new();

    let mut push = |def: ComponentDefinition, defs: &mut Vec<ComponentDefinition>| {
        if let Some(&i) = by_name.get(&def.name) {
            defs[i] = def;
        } else {
            by_name.insert(def.name.clone(), defs.len());
            defs.push(def);
        }
    };

    for def in catalog::builtin_definitions() {
        push(def, &mut defs);
    }
    for dir in search_paths() {
        for def in load_dir(&dir) {
            push(def, &mut defs);
        }
    }
    defs
}
