//! Derives the effective edge set of a diagram.
//!
//! Connectivity comes either from a declarative branch graph or from a flattened traversal
//! order (a "train"). Disabled nodes are never edge targets: edges that would land on them
//! are re-pointed at the next reachable enabled node. Every call recomputes from scratch, so
//! resolving unchanged input twice yields identical output.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geometry::Side;
use crate::ir::{BranchGraphSpec, Diagram, ModelIssue, NEXT_KEY, Train};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MaterializedEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            from_side: None,
            to_side: None,
            label: None,
        }
    }
}

/// Outgoing edges per node id. Every node of the registry has an entry.
pub type Connections = BTreeMap<String, Vec<MaterializedEdge>>;

/// The two mutually exclusive ways a caller describes connectivity.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionSource {
    Graph(BranchGraphSpec),
    Train(Train),
}

impl ConnectionSource {
    pub fn validate(&self, diagram: &Diagram) -> Vec<ModelIssue> {
        match self {
            ConnectionSource::Graph(graph) => diagram.validate_branch_graph(graph),
            ConnectionSource::Train(train) => diagram.validate_train(train),
        }
    }
}

pub fn resolve_connections(source: &ConnectionSource, diagram: &Diagram) -> Connections {
    match source {
        ConnectionSource::Graph(graph) => resolve_from_graph(graph, diagram),
        ConnectionSource::Train(train) => resolve_from_train(train, diagram),
    }
}

fn empty_connections(diagram: &Diagram) -> Connections {
    diagram
        .nodes
        .keys()
        .map(|id| (id.clone(), Vec::new()))
        .collect()
}

/// Linear connectivity: each enabled entry points at the next enabled entry after it.
pub fn resolve_from_train(train: &Train, diagram: &Diagram) -> Connections {
    let tokens = &train.tokens;
    let enabled: Vec<bool> = tokens
        .iter()
        .map(|token| {
            let known = diagram.node(&token.node_id).is_some();
            if !known {
                debug!("train token `{token}` does not name a node; skipping");
            }
            known && diagram.is_enabled(&token.node_id)
        })
        .collect();

    // next_enabled[i] is the first index after i whose node is enabled.
    let mut next_enabled = vec![None; tokens.len()];
    let mut upcoming = None;
    for idx in (0..tokens.len()).rev() {
        next_enabled[idx] = upcoming;
        if enabled[idx] {
            upcoming = Some(idx);
        }
    }

    let mut connections = empty_connections(diagram);
    for (idx, token) in tokens.iter().enumerate() {
        if !enabled[idx] {
            continue;
        }
        let Some(target_idx) = next_enabled[idx] else {
            continue;
        };
        let mut edge = MaterializedEdge::new(&token.node_id, &tokens[target_idx].node_id);
        edge.label = token.branch.clone();
        if let Some(edges) = connections.get_mut(&token.node_id) {
            push_unique(edges, edge);
        }
    }
    connections
}

/// Branch-graph connectivity with disabled-node bypass.
pub fn resolve_from_graph(graph: &BranchGraphSpec, diagram: &Diagram) -> Connections {
    let mut connections = empty_connections(diagram);
    for (id, spec) in graph {
        if !diagram.is_enabled(id) {
            continue;
        }
        let mut edges = Vec::new();
        let mut emit = |key: &str, initial: &str, label: Option<&str>| {
            for target in resolve_next_enabled(graph, diagram, initial) {
                let to_side = graph.get(&target).and_then(|entry| entry.input_side);
                let edge = MaterializedEdge {
                    from: id.clone(),
                    from_side: spec.output_side_by_branch.get(key).copied(),
                    to: target,
                    to_side,
                    label: label.map(str::to_string),
                };
                push_unique(&mut edges, edge);
            }
        };
        if let Some(next) = &spec.next {
            emit(NEXT_KEY, next, None);
        }
        for (key, initial) in &spec.branch {
            emit(key, initial, Some(key));
        }
        if let Some(slot) = connections.get_mut(id) {
            *slot = edges;
        }
    }
    connections
}

/// Enabled nodes reachable from `start` by walking through disabled nodes.
///
/// An enabled start resolves to itself. A disabled node continues through its skip branch
/// (its own `skipBranch`, else the node's `branchSkipPolicy`) when that names one of its
/// branches, otherwise through every branch, otherwise through `next`. Unknown ids,
/// missing entries and cycles are dead ends. Results are in depth-first discovery order.
pub fn resolve_next_enabled(graph: &BranchGraphSpec, diagram: &Diagram, start: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut found_set: HashSet<&str> = HashSet::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = vec![start];

    while let Some(id) = stack.pop() {
        let Some(node) = diagram.node(id) else {
            debug!("`{id}` is not a node; branch ends here");
            continue;
        };
        if node.enabled {
            if found_set.insert(id) {
                found.push(id.to_string());
            }
            continue;
        }
        if !visited.insert(id) {
            debug!("cycle through disabled node `{id}` truncated while resolving from `{start}`");
            continue;
        }
        let Some(spec) = graph.get(id) else {
            debug!("disabled node `{id}` has no graph entry; branch ends here");
            continue;
        };

        let skip_key = spec
            .skip_branch
            .as_deref()
            .or(node.branch_skip_policy.as_deref());
        let targets: Vec<&str> = match skip_key.and_then(|key| spec.branch.get(key)) {
            Some(target) => vec![target.as_str()],
            None if !spec.branch.is_empty() => spec.branch.values().map(String::as_str).collect(),
            None => spec.next.as_deref().into_iter().collect(),
        };
        // Reverse so the first target is explored first.
        stack.extend(targets.into_iter().rev());
    }
    found
}

fn push_unique(edges: &mut Vec<MaterializedEdge>, edge: MaterializedEdge) {
    let duplicate = edges.iter().any(|existing| {
        existing.to == edge.to
            && existing.from_side == edge.from_side
            && existing.to_side == edge.to_side
    });
    if !duplicate {
        edges.push(edge);
    }
}

/// Follows the first outgoing edge from the start node until it runs out or repeats.
///
/// The start node is the first node whose tag mentions "start", else the first declared node.
pub fn simulate_path(diagram: &Diagram, connections: &Connections) -> Vec<String> {
    let start = diagram
        .ordered_nodes()
        .find(|node| {
            node.tag
                .as_deref()
                .is_some_and(|tag| tag.to_lowercase().contains("start"))
        })
        .or_else(|| diagram.ordered_nodes().next());

    let mut path = Vec::new();
    let mut visited = HashSet::new();
    let mut current = start.map(|node| node.id.as_str());
    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        path.push(id.to_string());
        current = connections
            .get(id)
            .and_then(|edges| edges.first())
            .map(|edge| edge.to.as_str())
            .filter(|next| diagram.node(next).is_some());
    }
    path
}
