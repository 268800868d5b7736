use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use flowlink::geometry::{Point, Rect};
use flowlink::ir::{BranchGraphSpec, BranchSpec, Diagram, Group, Node, Train};
use flowlink::layout::routing::{RouteOptions, route_edge};
use flowlink::layout::{BoxCache, LayoutOptions, Waypoints, compute_layout};
use flowlink::render::render_svg;
use flowlink::resolve::{resolve_from_graph, resolve_from_train};
use flowlink::theme::Theme;
use std::hint::black_box;

/// Question ladder: every third node is a two-way question, every fifth node is disabled.
fn ladder_diagram(nodes: usize) -> (Diagram, BranchGraphSpec, Train) {
    let mut diagram = Diagram::new();
    let columns = 8;
    for lane in 0..nodes.div_ceil(columns * 4).max(1) {
        diagram.add_group(Group::new(
            format!("g{lane}"),
            Rect::new(0.0, lane as f32 * 400.0, columns as f32 * 240.0, 380.0),
        ));
    }
    let mut graph = BranchGraphSpec::new();
    let mut order = Vec::with_capacity(nodes);
    for i in 0..nodes {
        let id = format!("n{i}");
        let x = (i % columns) as f32 * 240.0 + 20.0;
        let y = (i / columns) as f32 * 100.0 + 20.0;
        let mut node = Node::new(&id, Point::new(x, y))
            .with_size(180.0, 40.0)
            .in_group(format!("g{}", i / (columns * 4)));
        node.enabled = i % 5 != 4;
        diagram.add_node(node);

        let spec = if i % 3 == 0 && i + 2 < nodes {
            BranchSpec::branches([("ja", format!("n{}", i + 1)), ("nein", format!("n{}", i + 2))])
                .with_skip_branch("nein")
        } else if i + 1 < nodes {
            BranchSpec::next(format!("n{}", i + 1))
        } else {
            BranchSpec::default()
        };
        graph.insert(id.clone(), spec);
        order.push(id);
    }
    (diagram, graph, Train::parse(order))
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for nodes in [50usize, 200, 1000] {
        let (diagram, graph, train) = ladder_diagram(nodes);
        group.bench_with_input(BenchmarkId::new("graph", nodes), &nodes, |b, _| {
            b.iter(|| resolve_from_graph(black_box(&graph), black_box(&diagram)))
        });
        group.bench_with_input(BenchmarkId::new("train", nodes), &nodes, |b, _| {
            b.iter(|| resolve_from_train(black_box(&train), black_box(&diagram)))
        });
    }
    group.finish();
}

fn bench_route(c: &mut Criterion) {
    let from = Rect::new(20.0, 20.0, 180.0, 40.0);
    let to = Rect::new(520.0, 260.0, 180.0, 40.0);
    let options = RouteOptions {
        from_group: Some(Rect::new(0.0, 0.0, 400.0, 200.0)),
        ..RouteOptions::default()
    };
    c.bench_function("route_edge", |b| {
        b.iter(|| route_edge(black_box(from), black_box(to), black_box(&options)))
    });
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    for nodes in [200usize, 1000] {
        let (diagram, graph, _) = ladder_diagram(nodes);
        let connections = resolve_from_graph(&graph, &diagram);
        let boxes = BoxCache::new();
        let waypoints = Waypoints::new();
        let options = LayoutOptions::default();
        group.bench_with_input(BenchmarkId::new("compute", nodes), &nodes, |b, _| {
            b.iter(|| {
                compute_layout(
                    black_box(&diagram),
                    black_box(&connections),
                    &boxes,
                    &waypoints,
                    &options,
                )
            })
        });
        let layout = compute_layout(&diagram, &connections, &boxes, &waypoints, &options);
        let theme = Theme::editor_default();
        group.bench_with_input(BenchmarkId::new("render_svg", nodes), &nodes, |b, _| {
            b.iter(|| render_svg(black_box(&layout), &theme))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve, bench_route, bench_layout);
criterion_main!(benches);
