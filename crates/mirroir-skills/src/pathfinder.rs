//! Path extraction from a finished exploration graph
//!
//! A skill is a root-to-leaf action path. Leaves are screens with no
//! outgoing transitions, plus screens at the deepest explored level
//! (depth-capped leaves that would have gone further with budget).

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use mirroir::graph::{GraphEdge, GraphNode, GraphSnapshot};
use mirroir::types::{ActionType, Icon, TapPoint};
use serde::Serialize;

/// One interesting root-to-leaf path.
#[derive(Debug, Clone, Serialize)]
pub struct SkillPath {
    pub name: String,
    pub edges: Vec<GraphEdge>,
    pub leaf_fingerprint: String,
}

/// One screen along a replayed path.
#[derive(Debug, Clone, Serialize)]
pub struct ExploredScreen {
    pub index: usize,
    pub elements: Vec<TapPoint>,
    pub hints: Vec<String>,
    pub icons: Vec<Icon>,
    pub action_type: ActionType,
    pub arrived_via: Option<String>,
    pub screenshot_base64: String,
}

pub struct GraphPathFinder;

impl GraphPathFinder {
    /// Extract one shortest path per leaf, named by its route.
    pub fn find_interesting_paths(snapshot: &GraphSnapshot) -> Vec<SkillPath> {
        if snapshot.nodes.is_empty() {
            return Vec::new();
        }
        let max_depth = snapshot.nodes.values().map(|n| n.depth).max().unwrap_or(0);
        let mut out_degree: HashMap<&str, usize> = HashMap::new();
        for edge in &snapshot.edges {
            *out_degree.entry(edge.from_fingerprint.as_str()).or_insert(0) += 1;
        }

        let mut leaves: Vec<&GraphNode> = snapshot
            .nodes
            .values()
            .filter(|n| n.fingerprint != snapshot.root_fingerprint)
            .filter(|n| {
                let degree = out_degree.get(n.fingerprint.as_str()).copied().unwrap_or(0);
                degree == 0 || n.depth == max_depth
            })
            .collect();
        leaves.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));

        leaves
            .iter()
            .filter_map(|leaf| {
                let edges = shortest_path(snapshot, &snapshot.root_fingerprint, &leaf.fingerprint)?;
                if edges.is_empty() {
                    return None;
                }
                let name = path_name(&edges, leaf);
                debug!(name = %name, hops = edges.len(), "extracted path");
                Some(SkillPath {
                    name,
                    edges,
                    leaf_fingerprint: leaf.fingerprint.clone(),
                })
            })
            .collect()
    }

    /// Replay a path through the snapshot: the root screen plus every
    /// destination, with strictly increasing indices.
    pub fn path_to_explored_screens(
        edges: &[GraphEdge],
        snapshot: &GraphSnapshot,
    ) -> Vec<ExploredScreen> {
        let mut screens = Vec::with_capacity(edges.len() + 1);
        let Some(root) = snapshot.nodes.get(&snapshot.root_fingerprint) else {
            return screens;
        };
        screens.push(ExploredScreen {
            index: 0,
            elements: root.elements.clone(),
            hints: root.hints.clone(),
            icons: root.icons.clone(),
            action_type: ActionType::Launch,
            arrived_via: None,
            screenshot_base64: root.screenshot_base64.clone(),
        });
        for edge in edges {
            let Some(node) = snapshot.nodes.get(&edge.to_fingerprint) else {
                break;
            };
            screens.push(ExploredScreen {
                index: screens.len(),
                elements: node.elements.clone(),
                hints: node.hints.clone(),
                icons: node.icons.clone(),
                action_type: edge.action_type,
                arrived_via: Some(edge.element_text.clone()),
                screenshot_base64: node.screenshot_base64.clone(),
            });
        }
        screens
    }
}

/// Short routes are named by their edge labels; longer ones by where
/// they start and where they end up.
fn path_name(edges: &[GraphEdge], leaf: &GraphNode) -> String {
    let labels: Vec<&str> = edges.iter().map(|e| edge_label(e)).collect();
    if edges.len() <= 2 {
        labels.join(" > ")
    } else {
        format!("{} to {}", labels[0], landmark(leaf))
    }
}

fn edge_label(edge: &GraphEdge) -> &str {
    if edge.element_text.is_empty() {
        match edge.action_type {
            ActionType::Swipe => "swipe",
            ActionType::PressKey => "key press",
            ActionType::Launch => "launch",
            ActionType::Tap => "tap",
        }
    } else {
        &edge.element_text
    }
}

/// The longest purely alphabetic element text on a screen; used to name
/// where a long path lands.
pub fn landmark(node: &GraphNode) -> String {
    node.elements
        .iter()
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_alphabetic() || c == ' '))
        .max_by_key(|t| t.chars().count())
        .or_else(|| {
            node.elements
                .iter()
                .map(|e| e.text.trim())
                .max_by_key(|t| t.chars().count())
        })
        .unwrap_or(node.fingerprint.as_str())
        .to_string()
}

/// Breadth-first shortest path over the recorded edges.
fn shortest_path(snapshot: &GraphSnapshot, from: &str, to: &str) -> Option<Vec<GraphEdge>> {
    if from == to {
        return Some(Vec::new());
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
    Some(edges)
}
