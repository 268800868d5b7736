use crate::geometry::{Size, format_point};
use crate::ir::Diagram;
use crate::layout::Layout;
use crate::layout::routing::PathCommand;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub groups: Vec<GroupDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub enabled: bool,
    pub group_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub from_side: Option<String>,
    pub to_side: Option<String>,
    pub label: Option<String>,
    pub path: Vec<PathCommand>,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDump {
    pub id: String,
    pub label: String,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                x: node.rect.x,
                y: node.rect.y,
                width: node.rect.w,
                height: node.rect.h,
                enabled: node.enabled,
                group_id: node.group_id.clone(),
            })
            .collect();

        // Sides are the ones the router actually used, after defaults and group fallback.
        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.edge.from.clone(),
                to: edge.edge.to.clone(),
                from_side: edge.route.sides.map(|(from, _)| from.as_str().to_string()),
                to_side: edge.route.sides.map(|(_, to)| to.as_str().to_string()),
                label: edge.edge.label.clone(),
                path: edge.route.commands.clone(),
                points: edge.route.points().iter().map(|p| [p.x, p.y]).collect(),
            })
            .collect();

        let groups = layout
            .groups
            .iter()
            .map(|group| GroupDump {
                id: group.id.clone(),
                label: group.label.clone(),
                depth: group.depth,
                x: group.rect.x,
                y: group.rect.y,
                width: group.rect.w,
                height: group.rect.h,
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            nodes,
            edges,
            groups,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedNode<'a> {
    id: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    label: &'a str,
    loc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<Size>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    question: bool,
}

#[derive(Debug, Serialize)]
struct SavedDesign<'a> {
    nodes: Vec<SavedNode<'a>>,
}

/// Serializes the diagram as `{ "nodes": [...] }` in the document format `parse_diagram` reads.
/// Groups come first so they exist before their members on reload.
pub fn save_design(diagram: &Diagram) -> anyhow::Result<String> {
    let groups = diagram.groups.values().map(|group| SavedNode {
        id: &group.id,
        kind: Some("group"),
        label: &group.label,
        loc: format_point(group.position),
        size: Some(group.size),
        state: None,
        group_id: group.parent_group_id.as_deref(),
        tag: None,
        category: None,
        question: false,
    });
    let nodes = diagram.ordered_nodes().map(|node| SavedNode {
        id: &node.id,
        kind: None,
        label: &node.label,
        loc: format_point(node.position),
        size: (!node.size.is_empty()).then_some(node.size),
        state: Some(if node.enabled { "enabled" } else { "disabled" }),
        group_id: node.group_id.as_deref(),
        tag: node.tag.as_deref(),
        category: node.category.as_deref(),
        question: node.is_question,
    });
    let design = SavedDesign {
        nodes: groups.chain(nodes).collect(),
    };
    Ok(serde_json::to_string_pretty(&design)?)
}

/// Writes `save_design` output to a file.
pub fn write_design(path: &Path, diagram: &Diagram) -> anyhow::Result<()> {
    std::fs::write(path, save_design(diagram)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::ir::{Group, Node, Train};
    use crate::layout::{BoxCache, LayoutOptions, Waypoints, compute_layout};
    use crate::parser::parse_diagram;
    use crate::resolve::resolve_from_train;

    fn diagram() -> Diagram {
        let mut diagram = Diagram::new();
        diagram.add_group(Group::new("g", Rect::new(0.0, 0.0, 400.0, 100.0)));
        diagram.add_node(Node::new("a", Point::new(20.4, 20.0)).with_size(100.0, 40.0).in_group("g"));
        diagram.add_node(Node::new("b", Point::new(500.0, 20.0)).with_size(100.0, 40.0).disabled());
        diagram
    }

    #[test]
    fn dump_reports_resolved_sides() {
        let mut diagram = diagram();
        let train = Train::parse(["a:go", "b"]);
        let layout_for = |diagram: &Diagram| {
            compute_layout(
                diagram,
                &resolve_from_train(&train, diagram),
                &BoxCache::new(),
                &Waypoints::new(),
                &LayoutOptions::default(),
            )
        };

        // Disabled tail: `a` has no enabled successor.
        let dump = LayoutDump::from_layout(&layout_for(&diagram));
        assert_eq!(dump.nodes.len(), 2);
        assert_eq!(dump.groups.len(), 1);
        assert!(dump.edges.is_empty());
        let json = serde_json::to_value(&dump).expect("json");
        assert_eq!(json["nodes"][1]["enabled"], false);

        if let Some(node) = diagram.node_mut("b") {
            node.enabled = true;
        }
        let dump = LayoutDump::from_layout(&layout_for(&diagram));
        let edge = &dump.edges[0];
        assert_eq!(edge.from_side.as_deref(), Some("right"));
        assert_eq!(edge.to_side.as_deref(), Some("left"));
        assert_eq!(edge.label.as_deref(), Some("go"));
        assert!(
            edge.points
                .first()
                .is_some_and(|p| (p[0] - 120.4).abs() < 1e-3 && p[1] == 40.0)
        );
    }

    #[test]
    fn saved_design_reloads() {
        let diagram = diagram();
        let saved = save_design(&diagram).expect("save");
        let reloaded = parse_diagram(&saved).expect("reload").diagram;
        assert_eq!(reloaded.groups.len(), 1);
        assert_eq!(reloaded.node("a").map(|n| n.position), Some(Point::new(20.0, 20.0)));
        assert_eq!(reloaded.node("a").and_then(|n| n.group_id.as_deref()), Some("g"));
        assert!(!reloaded.is_enabled("b"));
    }
}
