use std::path::Path;

use flowlink::config::Config;
use flowlink::editor::{Editor, Interaction};
use flowlink::geometry::{Point, Rect, Side};
use flowlink::layout::routing::{PathCommand, RouteOptions, route_edge};
use flowlink::layout::{BoxCache, LayoutOptions, Waypoints, compute_layout};
use flowlink::parser::load_diagram;
use flowlink::render::render_svg;
use flowlink::resolve::resolve_connections;
use flowlink::theme::Theme;
use flowlink::viewport::ViewportTransform;
use proptest::prelude::*;

fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn approx(a: Point, b: Point, tolerance: f32) -> bool {
    (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance
}

#[test]
fn appointment_fixture_routes_every_edge() {
    let document = load_diagram(&fixture_path("appointment.json5")).expect("fixture");
    let source = document.source(None).expect("connectivity");
    let connections = resolve_connections(&source, &document.diagram);
    let layout = compute_layout(
        &document.diagram,
        &connections,
        &BoxCache::new(),
        &Waypoints::new(),
        &LayoutOptions::default(),
    );

    let edge_count: usize = connections.values().map(Vec::len).sum();
    assert_eq!(layout.edges.len(), edge_count);
    for edge in &layout.edges {
        let (from_side, to_side) = edge.route.sides.expect("measured boxes never degenerate");
        let from = document.diagram.node(&edge.edge.from).expect("from").rect();
        let to = document.diagram.node(&edge.edge.to).expect("to").rect();
        assert!(approx(edge.route.start(), from.side_midpoint(from_side), 1e-3));
        assert!(approx(edge.route.end(), to.side_midpoint(to_side), 1e-3));
        if let Some(explicit) = edge.edge.from_side {
            assert_eq!(explicit, from_side);
        }
        if let Some(explicit) = edge.edge.to_side {
            assert_eq!(explicit, to_side);
        }
    }

    let svg = render_svg(&layout, &Theme::editor_default());
    assert!(svg.contains("<svg"));
    assert!(svg.contains("Menübaum"));
}

#[test]
fn editor_drag_changes_route() {
    let document = load_diagram(&fixture_path("preselection_train.json5")).expect("fixture");
    let source = document.source(None).expect("connectivity");
    let mut editor = Editor::new(document.diagram, source, &Config::default());
    let before = editor.layout().edge("start", "einschr").expect("edge").route.clone();

    editor.handle(Interaction::DragStart {
        id: "einschr".into(),
        screen: Point::new(0.0, 0.0),
    });
    editor.handle(Interaction::DragMove {
        screen: Point::new(0.0, 400.0),
    });
    editor.handle(Interaction::DragEnd);

    let after = editor.layout().edge("start", "einschr").expect("edge").route.clone();
    assert_ne!(before, after);
    assert_eq!(before.sides, Some((Side::Right, Side::Left)));
    assert_eq!(after.sides, Some((Side::Bottom, Side::Top)));
}

fn rect_strategy() -> impl Strategy<Value = Rect> {
    (-500.0f32..500.0, -500.0f32..500.0, 1.0f32..200.0, 1.0f32..200.0)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

proptest! {
    /// Unmeasured boxes give a zero-length path at the origin.
    #[test]
    fn prop_degenerate_boxes_route_to_origin(rect in rect_strategy(), source_empty in any::<bool>()) {
        let empty = Rect::new(rect.x, rect.y, 0.0, 0.0);
        let (from, to) = if source_empty { (empty, rect) } else { (rect, empty) };
        let route = route_edge(from, to, &RouteOptions::default());
        prop_assert!(route.is_degenerate());
        prop_assert!(route.points().iter().all(|p| *p == Point::ORIGIN));
    }

    /// The rounded corner never overshoots either lead point.
    #[test]
    fn prop_corner_radius_is_clamped(
        from in rect_strategy(),
        to in rect_strategy(),
        radius in 0.0f32..400.0,
    ) {
        let options = RouteOptions { corner_radius: radius, ..RouteOptions::default() };
        let route = route_edge(from, to, &options);
        if let Some(corner) = route.corner {
            prop_assert!(corner.radius <= corner.before.min(corner.after) + 1e-3);
            prop_assert!(corner.radius <= radius + 1e-3);
            prop_assert!(corner.radius >= 0.0);
        }
        let quads = route
            .commands
            .iter()
            .filter(|command| matches!(command, PathCommand::QuadTo { .. }))
            .count();
        prop_assert!(quads <= 1);
    }

    /// A node hugging its group's left edge leaves through the first clear fallback side.
    #[test]
    fn prop_group_boundary_fallback(
        gap in 0.0f32..16.0,
        y in 200.0f32..700.0,
        target_dx in 300.0f32..600.0,
    ) {
        let group = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        let node = Rect::new(gap, y, 100.0, 40.0);
        let target = Rect::new(gap - target_dx, y, 100.0, 40.0);
        let options = RouteOptions { from_group: Some(group), ..RouteOptions::default() };
        let route = route_edge(node, target, &options);
        let (from_side, to_side) = route.sides.expect("routed");
        prop_assert_eq!(from_side, Side::Bottom);
        prop_assert_eq!(to_side, Side::Right);
    }

    /// The canvas point under the cursor stays under the cursor across a zoom.
    #[test]
    fn prop_zoom_keeps_cursor_anchor(
        scale in 0.4f32..2.5,
        pan_x in -500.0f32..500.0,
        pan_y in -500.0f32..500.0,
        cursor_x in 0.0f32..1200.0,
        cursor_y in 0.0f32..800.0,
        factor in 0.5f32..2.0,
    ) {
        let mut viewport = ViewportTransform::default();
        viewport.set_scale(scale);
        viewport.set_pan(Point::new(pan_x, pan_y));
        let origin = Point::new(8.0, 64.0);
        let cursor = Point::new(cursor_x, cursor_y);
        let anchor = viewport.to_canvas(cursor, origin);
        viewport.zoom_at(cursor, origin, factor);
        prop_assert!(approx(viewport.to_screen(anchor, origin), cursor, 1e-2));
    }
}
