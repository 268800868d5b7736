use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Side, Size, deserialize_lenient_side};
use crate::ir::Node;
use crate::resolve::MaterializedEdge;

use super::routing::Route;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLayout {
    pub id: String,
    pub rect: Rect,
    pub label: String,
    pub tag: Option<String>,
    pub enabled: bool,
    pub is_question: bool,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLayout {
    pub id: String,
    pub rect: Rect,
    pub label: String,
    /// Nesting depth; top-level groups are 0.
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HandleKind {
    /// Drags the waypoint at `index`.
    Waypoint { index: usize },
    /// Inserts a new waypoint at `index`.
    Insert { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeHandle {
    pub point: Point,
    pub kind: HandleKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLayout {
    pub edge: MaterializedEdge,
    pub route: Route,
    pub label_anchor: Option<Point>,
    pub handles: Vec<EdgeHandle>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Layout {
    pub nodes: Vec<NodeLayout>,
    pub groups: Vec<GroupLayout>,
    pub edges: Vec<EdgeLayout>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    /// First edge from `from` to `to`, whatever its sides.
    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeLayout> {
        self.edges_between(from, to).next()
    }

    /// Every kept edge from `from` to `to`. Converging branches may leave through different sides.
    pub fn edges_between<'a, 'b>(
        &'a self,
        from: &'b str,
        to: &'b str,
    ) -> impl Iterator<Item = &'a EdgeLayout> + use<'a, 'b> {
        self.edges
            .iter()
            .filter(move |layout| layout.edge.from == from && layout.edge.to == to)
    }

    pub fn edge_by_key(&self, key: &EdgeKey) -> Option<&EdgeLayout> {
        self.edges.iter().find(|layout| EdgeKey::of(&layout.edge) == *key)
    }
}

/// Identity of a materialized edge: source, target and the explicit sides it was resolved with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeKey {
    pub from: String,
    pub to: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_lenient_side"
    )]
    pub from_side: Option<Side>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_lenient_side"
    )]
    pub to_side: Option<Side>,
}

impl EdgeKey {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            from_side: None,
            to_side: None,
        }
    }

    pub fn with_sides(mut self, from_side: Option<Side>, to_side: Option<Side>) -> Self {
        self.from_side = from_side;
        self.to_side = to_side;
        self
    }

    pub fn of(edge: &MaterializedEdge) -> Self {
        Self::new(&edge.from, &edge.to).with_sides(edge.from_side, edge.to_side)
    }
}

/// User-placed bend points per edge.
pub type Waypoints = BTreeMap<EdgeKey, Vec<Point>>;

/// Node sizes as measured by the presentation layer after layout.
#[derive(Debug, Clone, Default)]
pub struct BoxCache {
    sizes: HashMap<String, Size>,
}

impl BoxCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: impl Into<String>, size: Size) {
        self.sizes.insert(id.into(), size);
    }

    pub fn get(&self, id: &str) -> Option<Size> {
        self.sizes.get(id).copied()
    }

    /// The node's box: measured size if known, else its configured size.
    pub fn rect_for(&self, node: &Node) -> Rect {
        let size = self.get(&node.id).unwrap_or(node.size);
        Rect::from_parts(node.position, size)
    }
}
