//! Diagram documents: nodes, groups and connectivity in JSON5.
//!
//! Hand-written editor configuration reads like JavaScript object literals, so documents are
//! parsed with `json5` (unquoted keys, single quotes, comments, trailing commas).

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::geometry::{Point, Side, Size, deserialize_lenient_side, parse_point};
use crate::ir::{BranchGraphSpec, BranchSpec, Diagram, Group, Node, Train};
use crate::resolve::ConnectionSource;

static OUTPUT_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<key>\w+?)OutputPointer$").expect("valid output pointer regex"));

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid diagram document: {0}")]
    Syntax(#[from] json5::Error),
    #[error("duplicate id `{0}`")]
    DuplicateId(String),
    #[error("document has neither a branch graph nor a train")]
    MissingConnectivity,
    #[error("document has both a branch graph and a train; choose one")]
    AmbiguousConnectivity,
    #[error("document has no {0}")]
    MissingMode(ConnectionMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    Graph,
    Train,
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionMode::Graph => f.write_str("branch graph"),
            ConnectionMode::Train => f.write_str("train"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiagramDocument {
    pub diagram: Diagram,
    pub graph: Option<BranchGraphSpec>,
    pub train: Option<Train>,
}

impl DiagramDocument {
    /// Picks the connectivity input. Without an explicit mode the document must carry exactly one.
    pub fn source(&self, mode: Option<ConnectionMode>) -> Result<ConnectionSource, ParseError> {
        match (mode, &self.graph, &self.train) {
            (Some(ConnectionMode::Graph), Some(graph), _) => Ok(ConnectionSource::Graph(graph.clone())),
            (Some(ConnectionMode::Train), _, Some(train)) => Ok(ConnectionSource::Train(train.clone())),
            (Some(mode), _, _) => Err(ParseError::MissingMode(mode)),
            (None, Some(graph), None) => Ok(ConnectionSource::Graph(graph.clone())),
            (None, None, Some(train)) => Ok(ConnectionSource::Train(train.clone())),
            (None, Some(_), Some(_)) => Err(ParseError::AmbiguousConnectivity),
            (None, None, None) => Err(ParseError::MissingConnectivity),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default, alias = "connectGraph")]
    graph: Option<BTreeMap<String, RawBranchSpec>>,
    #[serde(default, alias = "connection")]
    train: Option<Train>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    id: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    position: Option<Point>,
    #[serde(default)]
    loc: Option<String>,
    #[serde(default)]
    size: Option<Size>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default, alias = "question")]
    is_question: Option<bool>,
    #[serde(default)]
    branch_skip_policy: Option<String>,
    #[serde(default)]
    group_kind: Option<String>,
}

impl RawNode {
    fn position(&self) -> Point {
        match (&self.position, &self.loc) {
            (Some(position), _) => *position,
            (None, Some(loc)) => parse_point(loc),
            (None, None) => Point::ORIGIN,
        }
    }

    fn label(&self) -> String {
        self.label
            .clone()
            .or_else(|| self.text.clone())
            .unwrap_or_else(|| self.id.clone())
    }

    fn is_group(&self) -> bool {
        self.kind.as_deref() == Some("group")
    }

    fn into_group(self) -> Group {
        Group {
            position: self.position(),
            label: self.label(),
            size: self.size.unwrap_or_default(),
            parent_group_id: self.group_id,
            kind: self.group_kind,
            id: self.id,
        }
    }

    fn into_node(self) -> Node {
        let enabled = self
            .enabled
            .unwrap_or_else(|| self.state.as_deref() != Some("disabled"));
        Node {
            position: self.position(),
            label: self.label(),
            size: self.size.unwrap_or_default(),
            enabled,
            group_id: self.group_id,
            is_question: self.is_question.unwrap_or(false),
            branch_skip_policy: self.branch_skip_policy,
            tag: self.tag,
            category: self.category,
            id: self.id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBranchSpec {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    branch: BTreeMap<String, String>,
    #[serde(default)]
    skip_branch: Option<String>,
    #[serde(default)]
    on_disable_route: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default, alias = "inputPointer", deserialize_with = "deserialize_lenient_side")]
    input_side: Option<Side>,
    #[serde(default)]
    output_side_by_branch: BTreeMap<String, serde_json::Value>,
    /// `<branchKey>OutputPointer` fields and editor flags such as `question` / `end`.
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl RawBranchSpec {
    fn into_spec(self) -> BranchSpec {
        let mut output_side_by_branch = BTreeMap::new();
        let pointer_fields = self.extra.iter().filter_map(|(field, value)| {
            let caps = OUTPUT_POINTER_RE.captures(field)?;
            Some((caps["key"].to_string(), value))
        });
        let explicit = self
            .output_side_by_branch
            .iter()
            .map(|(key, value)| (key.clone(), value));
        // Explicit map entries win over flattened pointer fields.
        for (key, value) in pointer_fields.chain(explicit) {
            if let Some(side) = value.as_str().and_then(Side::from_token) {
                output_side_by_branch.insert(key, side);
            }
        }
        BranchSpec {
            next: self.next,
            branch: self.branch,
            skip_branch: self
                .skip_branch
                .or(self.on_disable_route)
                .or(self.default_branch),
            input_side: self.input_side,
            output_side_by_branch,
        }
    }
}

pub fn parse_diagram(input: &str) -> Result<DiagramDocument, ParseError> {
    let raw: RawDocument = json5::from_str(input)?;

    let mut seen = HashSet::new();
    let mut diagram = Diagram::new();
    for node in raw.nodes {
        if !seen.insert(node.id.clone()) {
            return Err(ParseError::DuplicateId(node.id));
        }
        if node.is_group() {
            diagram.add_group(node.into_group());
        } else {
            diagram.add_node(node.into_node());
        }
    }

    let graph = raw.graph.map(|entries| {
        entries
            .into_iter()
            .map(|(id, spec)| (id, spec.into_spec()))
            .collect::<BranchGraphSpec>()
    });

    Ok(DiagramDocument {
        diagram,
        graph,
        train: raw.train,
    })
}

pub fn load_diagram(path: &Path) -> anyhow::Result<DiagramDocument> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_diagram(&contents)?)
}
