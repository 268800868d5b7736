use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{
    Point, Rect, Side, Size, deserialize_lenient_side, deserialize_lenient_side_map,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub position: Point,
    /// Configured size; the presentation layer's measured box takes precedence when present.
    #[serde(default)]
    pub size: Size,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub is_question: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_skip_policy: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, position: Point) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            position,
            size: Size::default(),
            enabled: true,
            group_id: None,
            is_question: false,
            branch_skip_policy: None,
            tag: None,
            category: None,
        }
    }

    pub fn with_size(mut self, w: f32, h: f32) -> Self {
        self.size = Size::new(w, h);
        self
    }

    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.position, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub position: Point,
    pub size: Size,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Group {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            position: Point::new(rect.x, rect.y),
            size: Size::new(rect.w, rect.h),
            parent_group_id: None,
            kind: None,
        }
    }

    pub fn in_group(mut self, parent: impl Into<String>) -> Self {
        self.parent_group_id = Some(parent.into());
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.position, self.size)
    }
}

/// Per-node entry of a declarative branch graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub branch: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_branch: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_lenient_side"
    )]
    pub input_side: Option<Side>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_lenient_side_map"
    )]
    pub output_side_by_branch: BTreeMap<String, Side>,
}

impl BranchSpec {
    pub fn next(target: impl Into<String>) -> Self {
        Self {
            next: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn branches<I, K, V>(branches: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            branch: branches
                .into_iter()
                .map(|(key, target)| (key.into(), target.into()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_skip_branch(mut self, key: impl Into<String>) -> Self {
        self.skip_branch = Some(key.into());
        self
    }

    pub fn with_input_side(mut self, side: Side) -> Self {
        self.input_side = Some(side);
        self
    }

    pub fn with_output_side(mut self, key: impl Into<String>, side: Side) -> Self {
        self.output_side_by_branch.insert(key.into(), side);
        self
    }

    /// Every target this entry points at: `next` first, then branches in key order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.next
            .iter()
            .map(String::as_str)
            .chain(self.branch.values().map(String::as_str))
    }
}

/// Key under which the exit side of a `next` edge is stored.
pub const NEXT_KEY: &str = "next";

pub type BranchGraphSpec = BTreeMap<String, BranchSpec>;

/// One train entry: a node id, optionally suffixed with `:branchKey`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrainToken {
    pub node_id: String,
    pub branch: Option<String>,
}

impl TrainToken {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((node, branch)) => Self {
                node_id: node.trim().to_string(),
                branch: Some(branch.trim().to_string()).filter(|b| !b.is_empty()),
            },
            None => Self {
                node_id: raw.trim().to_string(),
                branch: None,
            },
        }
    }
}

impl std::fmt::Display for TrainToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.branch {
            Some(branch) => write!(f, "{}:{}", self.node_id, branch),
            None => f.write_str(&self.node_id),
        }
    }
}

/// Flattened traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Train {
    pub tokens: Vec<TrainToken>,
}

impl Train {
    pub fn parse<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: raw
                .into_iter()
                .map(|token| TrainToken::parse(token.as_ref()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Serialize for Train {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.tokens.iter().map(ToString::to_string))
    }
}

impl<'de> Deserialize<'de> for Train {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        Ok(Train::parse(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelIssue {
    #[error("group membership cycle through `{group}`")]
    GroupCycle { group: String },
    #[error("`{member}` references unknown group `{group}`")]
    UnknownGroup { member: String, group: String },
    #[error("branch graph entry `{from}` points at unknown node `{target}`")]
    UnknownSpecTarget { from: String, target: String },
    #[error("branch graph has an entry for unknown node `{node}`")]
    UnknownSpecNode { node: String },
    #[error("skip branch `{branch}` of `{node}` is not one of its branches")]
    UnknownSkipBranch { node: String, branch: String },
    #[error("train token `{token}` references unknown node")]
    UnknownTrainNode { token: String },
}

/// Node and group registries. Node order is kept as declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagram {
    pub nodes: BTreeMap<String, Node>,
    pub groups: BTreeMap<String, Group>,
    pub node_order: Vec<String>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        if !self.nodes.contains_key(&node.id) {
            self.node_order.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn add_group(&mut self, group: Group) {
        self.groups.insert(group.id.clone(), group);
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Nodes in declaration order.
    pub fn ordered_nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Unknown ids read as disabled.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(|node| node.enabled)
    }

    pub fn enclosing_group(&self, node_id: &str) -> Option<&Group> {
        let group_id = self.nodes.get(node_id)?.group_id.as_deref()?;
        self.groups.get(group_id)
    }

    /// Walks `parentGroupId` links upward from `group_id`, stopping at the first repeat.
    pub fn group_ancestry(&self, group_id: &str) -> Vec<&Group> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.groups.get(group_id);
        while let Some(group) = current {
            if !seen.insert(group.id.as_str()) {
                break;
            }
            chain.push(group);
            current = group
                .parent_group_id
                .as_deref()
                .and_then(|parent| self.groups.get(parent));
        }
        chain
    }

    /// Checks that group membership forms a forest and every membership resolves.
    pub fn validate(&self) -> Vec<ModelIssue> {
        let mut issues = Vec::new();
        for node in self.ordered_nodes() {
            if let Some(group) = &node.group_id
                && !self.groups.contains_key(group)
            {
                issues.push(ModelIssue::UnknownGroup {
                    member: node.id.clone(),
                    group: group.clone(),
                });
            }
        }
        let mut reported: HashSet<String> = HashSet::new();
        for group in self.groups.values() {
            if let Some(parent) = &group.parent_group_id
                && !self.groups.contains_key(parent)
            {
                issues.push(ModelIssue::UnknownGroup {
                    member: group.id.clone(),
                    group: parent.clone(),
                });
            }
            if let Some(cycle_at) = self.group_cycle_from(&group.id)
                && reported.insert(cycle_at.clone())
            {
                issues.push(ModelIssue::GroupCycle { group: cycle_at });
            }
        }
        issues
    }

    fn group_cycle_from(&self, group_id: &str) -> Option<String> {
        let mut seen = HashSet::new();
        let mut current = self.groups.get(group_id);
        while let Some(group) = current {
            if !seen.insert(group.id.as_str()) {
                // Report the smallest id on the loop so every entry point agrees.
                let mut on_loop = vec![group.id.clone()];
                let mut walk = group.parent_group_id.as_deref();
                while let Some(id) = walk {
                    if id == group.id {
                        break;
                    }
                    on_loop.push(id.to_string());
                    walk = self.groups.get(id).and_then(|g| g.parent_group_id.as_deref());
                }
                return on_loop.into_iter().min();
            }
            current = group
                .parent_group_id
                .as_deref()
                .and_then(|parent| self.groups.get(parent));
        }
        None
    }

    pub fn validate_branch_graph(&self, graph: &BranchGraphSpec) -> Vec<ModelIssue> {
        let mut issues = Vec::new();
        for (from, spec) in graph {
            if !self.nodes.contains_key(from) {
                issues.push(ModelIssue::UnknownSpecNode { node: from.clone() });
            }
            for target in spec.targets() {
                if !self.nodes.contains_key(target) {
                    issues.push(ModelIssue::UnknownSpecTarget {
                        from: from.clone(),
                        target: target.to_string(),
                    });
                }
            }
            if let Some(skip) = &spec.skip_branch
                && !spec.branch.contains_key(skip)
            {
                issues.push(ModelIssue::UnknownSkipBranch {
                    node: from.clone(),
                    branch: skip.clone(),
                });
            }
        }
        issues
    }

    pub fn validate_train(&self, train: &Train) -> Vec<ModelIssue> {
        train
            .tokens
            .iter()
            .filter(|token| !self.nodes.contains_key(&token.node_id))
            .map(|token| ModelIssue::UnknownTrainNode {
                token: token.to_string(),
            })
            .collect()
    }
}
