pub mod routing;
mod types;

pub use types::{
    BoxCache, EdgeHandle, EdgeKey, EdgeLayout, GroupLayout, HandleKind, Layout, NodeLayout,
    Waypoints,
};

use crate::config::RoutingConfig;
use crate::geometry::{Point, Rect};
use crate::ir::Diagram;
use crate::resolve::{Connections, MaterializedEdge};

use routing::{Route, RouteOptions, label_anchor, route_edge, route_through_waypoints};

#[derive(Debug, Clone, Default)]
pub struct LayoutOptions {
    pub routing: RoutingConfig,
    /// Emit drag/insert handles for every edge.
    pub line_controls: bool,
}

/// Routes every materialized edge against the current boxes.
///
/// Pure function of its inputs: unchanged input gives an identical layout.
pub fn compute_layout(
    diagram: &Diagram,
    connections: &Connections,
    boxes: &BoxCache,
    waypoints: &Waypoints,
    options: &LayoutOptions,
) -> Layout {
    let nodes: Vec<NodeLayout> = diagram
        .ordered_nodes()
        .map(|node| NodeLayout {
            id: node.id.clone(),
            rect: boxes.rect_for(node),
            label: node.label.clone(),
            tag: node.tag.clone(),
            enabled: node.enabled,
            is_question: node.is_question,
            group_id: node.group_id.clone(),
        })
        .collect();

    let mut groups: Vec<GroupLayout> = diagram
        .groups
        .values()
        .map(|group| GroupLayout {
            id: group.id.clone(),
            rect: group.rect(),
            label: group.label.clone(),
            depth: diagram.group_ancestry(&group.id).len().saturating_sub(1),
        })
        .collect();
    // Outer groups paint first.
    groups.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.id.cmp(&b.id)));

    let mut edges = Vec::new();
    for list in connections.values() {
        for edge in list {
            let key = EdgeKey::of(edge);
            let points = waypoints.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            let route = route_materialized_edge(diagram, boxes, edge, points, &options.routing);
            let handles = if options.line_controls {
                edge_handles(&route, points)
            } else {
                Vec::new()
            };
            edges.push(EdgeLayout {
                label_anchor: edge.label.as_ref().and_then(|_| label_anchor(&route)),
                edge: edge.clone(),
                route,
                handles,
            });
        }
    }

    let bounds = nodes
        .iter()
        .map(|node| node.rect)
        .chain(groups.iter().map(|group| group.rect))
        .filter(|rect| !rect.is_empty())
        .reduce(|acc, rect| acc.union(&rect));
    let (width, height) = bounds.map_or((0.0, 0.0), |b| (b.right().max(0.0), b.bottom().max(0.0)));

    Layout {
        nodes,
        groups,
        edges,
        width,
        height,
    }
}

/// Route for one edge, using manual waypoints when the user placed any.
pub fn route_materialized_edge(
    diagram: &Diagram,
    boxes: &BoxCache,
    edge: &MaterializedEdge,
    waypoints: &[Point],
    config: &RoutingConfig,
) -> Route {
    let rect_of = |id: &str| {
        diagram
            .node(id)
            .map(|node| boxes.rect_for(node))
            .unwrap_or_default()
    };
    let from = rect_of(&edge.from);
    let to = rect_of(&edge.to);
    if !waypoints.is_empty() {
        return route_through_waypoints(from, to, waypoints, edge.from_side, edge.to_side);
    }
    let group_rect =
        |id: &str| -> Option<Rect> { diagram.enclosing_group(id).map(|group| group.rect()) };
    let options = RouteOptions {
        from_side: edge.from_side,
        to_side: edge.to_side,
        from_group: group_rect(&edge.from),
        to_group: group_rect(&edge.to),
        ..RouteOptions::from_config(config)
    };
    route_edge(from, to, &options)
}

fn edge_handles(route: &Route, waypoints: &[Point]) -> Vec<EdgeHandle> {
    if route.is_degenerate() {
        return Vec::new();
    }
    let mut handles: Vec<EdgeHandle> = waypoints
        .iter()
        .enumerate()
        .map(|(index, point)| EdgeHandle {
            point: *point,
            kind: HandleKind::Waypoint { index },
        })
        .collect();
    let mut chain = Vec::with_capacity(waypoints.len() + 2);
    chain.push(route.start());
    chain.extend_from_slice(waypoints);
    chain.push(route.end());
    for (idx, pair) in chain.windows(2).enumerate() {
        handles.push(EdgeHandle {
            point: Point::new((pair[0].x + pair[1].x) / 2.0, (pair[0].y + pair[1].y) / 2.0),
            kind: HandleKind::Insert {
                index: idx.min(waypoints.len()),
            },
        });
    }
    handles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Side, Size};
    use crate::ir::{BranchGraphSpec, BranchSpec, Group, Node};
    use crate::resolve::resolve_from_graph;

    fn sample() -> (Diagram, BranchGraphSpec) {
        let mut diagram = Diagram::new();
        diagram.add_group(Group::new("g", Rect::new(0.0, 0.0, 600.0, 200.0)));
        diagram.add_node(Node::new("a", Point::new(490.0, 20.0)).with_size(100.0, 40.0).in_group("g"));
        diagram.add_node(Node::new("b", Point::new(900.0, 20.0)).with_size(100.0, 40.0));
        let mut graph = BranchGraphSpec::new();
        graph.insert("a".into(), BranchSpec::next("b"));
        (diagram, graph)
    }

    #[test]
    fn routes_edges_with_group_fallback() {
        let (diagram, graph) = sample();
        let connections = resolve_from_graph(&graph, &diagram);
        let layout = compute_layout(
            &diagram,
            &connections,
            &BoxCache::new(),
            &Waypoints::new(),
            &LayoutOptions::default(),
        );
        let edge = layout.edge("a", "b").expect("edge");
        assert_eq!(edge.route.sides, Some((Side::Bottom, Side::Left)));
        assert!(edge.handles.is_empty());
        assert_eq!(layout.width, 1000.0);
        assert_eq!(layout.height, 200.0);
    }

    #[test]
    fn measured_sizes_override_configured_sizes() {
        let (diagram, graph) = sample();
        let connections = resolve_from_graph(&graph, &diagram);
        let mut boxes = BoxCache::new();
        boxes.record("b", Size::new(0.0, 0.0));
        let layout = compute_layout(
            &diagram,
            &connections,
            &boxes,
            &Waypoints::new(),
            &LayoutOptions::default(),
        );
        assert!(layout.edge("a", "b").expect("edge").route.is_degenerate());
    }

    #[test]
    fn line_controls_expose_waypoint_and_insert_handles() {
        let (diagram, graph) = sample();
        let connections = resolve_from_graph(&graph, &diagram);
        let mut waypoints = Waypoints::new();
        waypoints.insert(EdgeKey::new("a", "b"), vec![Point::new(700.0, 150.0)]);
        let options = LayoutOptions {
            line_controls: true,
            ..LayoutOptions::default()
        };
        let layout = compute_layout(&diagram, &connections, &BoxCache::new(), &waypoints, &options);
        let edge = layout.edge("a", "b").expect("edge");
        let kinds: Vec<_> = edge.handles.iter().map(|h| h.kind).collect();
        assert_eq!(
            kinds,
            vec![
                HandleKind::Waypoint { index: 0 },
                HandleKind::Insert { index: 0 },
                HandleKind::Insert { index: 1 },
            ]
        );
        assert_eq!(edge.route.points()[1], Point::new(700.0, 150.0));
    }

    #[test]
    fn waypoints_attach_to_one_of_two_converging_edges() {
        let mut diagram = Diagram::new();
        diagram.add_node(Node::new("q", Point::new(0.0, 0.0)).with_size(100.0, 40.0));
        diagram.add_node(Node::new("a", Point::ORIGIN).disabled());
        diagram.add_node(Node::new("b", Point::ORIGIN).disabled());
        diagram.add_node(Node::new("z", Point::new(400.0, 300.0)).with_size(100.0, 40.0));
        let mut graph = BranchGraphSpec::new();
        graph.insert(
            "q".into(),
            BranchSpec::branches([("ja", "a"), ("nein", "b")])
                .with_output_side("ja", Side::Right)
                .with_output_side("nein", Side::Left),
        );
        graph.insert("a".into(), BranchSpec::next("z"));
        graph.insert("b".into(), BranchSpec::next("z"));
        let connections = resolve_from_graph(&graph, &diagram);

        let key = EdgeKey::new("q", "z").with_sides(Some(Side::Right), None);
        let mut waypoints = Waypoints::new();
        waypoints.insert(key.clone(), vec![Point::new(450.0, 20.0)]);
        let layout = compute_layout(
            &diagram,
            &connections,
            &BoxCache::new(),
            &waypoints,
            &LayoutOptions::default(),
        );

        assert_eq!(layout.edges_between("q", "z").count(), 2);
        let bent = layout.edge_by_key(&key).expect("right exit");
        assert_eq!(
            bent.route.points(),
            vec![Point::new(100.0, 20.0), Point::new(450.0, 20.0), Point::new(450.0, 320.0)]
        );
        let other = layout
            .edge_by_key(&EdgeKey::new("q", "z").with_sides(Some(Side::Left), None))
            .expect("left exit");
        assert_eq!(other.route.start(), Point::new(0.0, 20.0));
        assert!(!other.route.points().contains(&Point::new(450.0, 20.0)));
    }

    #[test]
    fn nested_groups_paint_outer_first() {
        let mut diagram = Diagram::new();
        diagram.add_group(Group::new("a-inner", Rect::new(10.0, 10.0, 50.0, 50.0)).in_group("z-outer"));
        diagram.add_group(Group::new("z-outer", Rect::new(0.0, 0.0, 100.0, 100.0)));
        let layout = compute_layout(
            &diagram,
            &Connections::new(),
            &BoxCache::new(),
            &Waypoints::new(),
            &LayoutOptions::default(),
        );
        let order: Vec<_> = layout.groups.iter().map(|g| (g.id.as_str(), g.depth)).collect();
        assert_eq!(order, vec![("z-outer", 0), ("a-inner", 1)]);
    }
}
