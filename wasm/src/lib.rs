use flowlink::config::RoutingConfig;
use flowlink::geometry::{Point, Rect, Side, Size, deserialize_lenient_side};
use flowlink::layout::{BoxCache, EdgeKey, Layout, LayoutOptions, Waypoints, compute_layout};
use flowlink::layout::routing::{RouteOptions, route_edge};
use flowlink::parser::{ConnectionMode, DiagramDocument, parse_diagram};
use flowlink::resolve::{ConnectionSource, resolve_connections};
use flowlink::render::render_svg;
use flowlink::theme::Theme;
use flowlink::viewport::ViewportTransform;
use log::{Level, info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

/// Initialize logging and panic hooks for the WASM target.
#[wasm_bindgen]
pub fn init_logging() {
    let _ = console_log::init_with_level(Level::Debug);
    console_error_panic_hook::set_once();
    info!("flowlink logging initialized");
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutRequestOptions {
    mode: Option<String>,
    /// Measured node sizes keyed by node id.
    #[serde(default)]
    boxes: BTreeMap<String, Size>,
    #[serde(default)]
    waypoints: Vec<WaypointEntry>,
    #[serde(default)]
    line_controls: bool,
    lead_length: Option<f32>,
    corner_radius: Option<f32>,
    group_margin: Option<f32>,
    theme: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaypointEntry {
    from: String,
    to: String,
    #[serde(default, deserialize_with = "deserialize_lenient_side")]
    from_side: Option<Side>,
    #[serde(default, deserialize_with = "deserialize_lenient_side")]
    to_side: Option<Side>,
    points: Vec<Point>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteRequest {
    from: Rect,
    to: Rect,
    #[serde(default, deserialize_with = "deserialize_lenient_side")]
    from_side: Option<Side>,
    #[serde(default, deserialize_with = "deserialize_lenient_side")]
    to_side: Option<Side>,
    from_group: Option<Rect>,
    to_group: Option<Rect>,
    lead_length: Option<f32>,
    corner_radius: Option<f32>,
}

fn parse_options(options_json: Option<&str>) -> Result<LayoutRequestOptions, String> {
    match options_json {
        Some(raw) => serde_json::from_str(raw).map_err(|error| error.to_string()),
        None => Ok(LayoutRequestOptions::default()),
    }
}

fn connection_mode(mode: Option<&str>) -> Result<Option<ConnectionMode>, String> {
    match mode {
        None => Ok(None),
        Some("graph") => Ok(Some(ConnectionMode::Graph)),
        Some("train") => Ok(Some(ConnectionMode::Train)),
        Some(other) => Err(format!("unknown connection mode `{other}`")),
    }
}

fn load(document: &str, mode: Option<&str>) -> Result<(DiagramDocument, ConnectionSource), String> {
    let parsed = parse_diagram(document).map_err(|error| error.to_string())?;
    let source = parsed
        .source(connection_mode(mode)?)
        .map_err(|error| error.to_string())?;
    for issue in parsed
        .diagram
        .validate()
        .into_iter()
        .chain(source.validate(&parsed.diagram))
    {
        warn!("{issue}");
    }
    Ok((parsed, source))
}

fn routing_config(options: &LayoutRequestOptions) -> RoutingConfig {
    let mut routing = RoutingConfig::default();
    if let Some(v) = options.lead_length {
        routing.lead_length = v;
    }
    if let Some(v) = options.corner_radius {
        routing.corner_radius = v;
    }
    if options.group_margin.is_some() {
        routing.group_margin = options.group_margin;
    }
    routing
}

fn resolve_document(document: &str, mode: Option<&str>) -> Result<String, String> {
    let (parsed, source) = load(document, mode)?;
    let connections = resolve_connections(&source, &parsed.diagram);
    serde_json::to_string(&connections).map_err(|error| error.to_string())
}

fn layout_document(document: &str, options: &LayoutRequestOptions) -> Result<Layout, String> {
    let (parsed, source) = load(document, options.mode.as_deref())?;
    let connections = resolve_connections(&source, &parsed.diagram);

    let mut boxes = BoxCache::new();
    for (id, size) in &options.boxes {
        boxes.record(id.clone(), *size);
    }
    let waypoints: Waypoints = options
        .waypoints
        .iter()
        .map(|entry| {
            let key = EdgeKey::new(&entry.from, &entry.to).with_sides(entry.from_side, entry.to_side);
            (key, entry.points.clone())
        })
        .collect();
    let layout_options = LayoutOptions {
        routing: routing_config(options),
        line_controls: options.line_controls,
    };
    Ok(compute_layout(&parsed.diagram, &connections, &boxes, &waypoints, &layout_options))
}

fn layout_to_json(document: &str, options_json: Option<&str>) -> Result<String, String> {
    let options = parse_options(options_json)?;
    let layout = layout_document(document, &options)?;
    serde_json::to_string(&layout).map_err(|error| error.to_string())
}

fn layout_to_svg(document: &str, options_json: Option<&str>) -> Result<String, String> {
    let options = parse_options(options_json)?;
    let layout = layout_document(document, &options)?;
    let theme = match options.theme.as_deref() {
        Some("dark") => Theme::dark(),
        _ => Theme::editor_default(),
    };
    Ok(render_svg(&layout, &theme))
}

fn route_request(request_json: &str) -> Result<String, String> {
    let request: RouteRequest = serde_json::from_str(request_json).map_err(|error| error.to_string())?;
    let mut options = RouteOptions {
        from_side: request.from_side,
        to_side: request.to_side,
        from_group: request.from_group,
        to_group: request.to_group,
        ..RouteOptions::default()
    };
    if let Some(v) = request.lead_length {
        options.lead_length = v;
    }
    if let Some(v) = request.corner_radius {
        options.corner_radius = v;
    }
    let route = route_edge(request.from, request.to, &options);
    serde_json::to_string(&route).map_err(|error| error.to_string())
}

/// Resolves a diagram document to `{ nodeId: [edge, ...] }` JSON.
#[wasm_bindgen]
pub fn resolve_connections_json(document: &str, mode: Option<String>) -> Result<String, JsValue> {
    resolve_document(document, mode.as_deref()).map_err(|error| JsValue::from_str(&error))
}

/// Resolves and routes a diagram document, returning the layout as JSON.
#[wasm_bindgen]
pub fn layout_json(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    layout_to_json(document, options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
}

/// Resolves, routes and renders a static SVG preview.
#[wasm_bindgen]
pub fn render_svg_preview(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    layout_to_svg(document, options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
}

/// Routes a single edge between two boxes.
#[wasm_bindgen]
pub fn route_edge_json(request_json: &str) -> Result<String, JsValue> {
    route_request(request_json).map_err(|error| JsValue::from_str(&error))
}

#[wasm_bindgen]
pub struct Viewport {
    inner: ViewportTransform,
}

#[wasm_bindgen]
impl Viewport {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Viewport {
        Viewport {
            inner: ViewportTransform::default(),
        }
    }

    pub fn scale(&self) -> f32 {
        self.inner.scale()
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.inner.set_scale(scale);
    }

    pub fn set_pan(&mut self, x: f32, y: f32) {
        self.inner.set_pan(Point::new(x, y));
    }

    /// Returns `[x, y]` in canvas units.
    pub fn to_canvas(&self, screen_x: f32, screen_y: f32, origin_x: f32, origin_y: f32) -> Vec<f32> {
        let point = self
            .inner
            .to_canvas(Point::new(screen_x, screen_y), Point::new(origin_x, origin_y));
        vec![point.x, point.y]
    }

    pub fn wheel(&mut self, delta_y: f32, ctrl: bool, cursor_x: f32, cursor_y: f32, origin_x: f32, origin_y: f32) -> bool {
        self.inner.wheel(
            delta_y,
            ctrl,
            Point::new(cursor_x, cursor_y),
            Point::new(origin_x, origin_y),
        )
    }

    pub fn begin_pan(&mut self, x: f32, y: f32) {
        self.inner.begin_pan(Point::new(x, y));
    }

    pub fn drag_pan(&mut self, x: f32, y: f32) -> bool {
        self.inner.drag_pan(Point::new(x, y))
    }

    pub fn end_pan(&mut self) {
        self.inner.end_pan();
    }

    pub fn css_transform(&self) -> String {
        self.inner.css_transform()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        nodes: [
            { id: 'a', position: {x: 0, y: 0}, size: {w: 100, h: 40} },
            { id: 'b', state: 'disabled', position: {x: 200, y: 0}, size: {w: 100, h: 40} },
            { id: 'c', position: {x: 400, y: 0}, size: {w: 100, h: 40} },
        ],
        train: ['a', 'b', 'c'],
    }"#;

    #[test]
    fn resolves_around_disabled_nodes() {
        let json = resolve_document(DOCUMENT, None).expect("resolve");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["a"][0]["to"], "c");
        assert_eq!(value["b"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn layout_honours_measured_boxes_and_waypoints() {
        let options = r#"{
            "boxes": { "c": { "w": 0, "h": 0 } },
            "waypoints": [{ "from": "a", "to": "c", "points": [{ "x": 250, "y": 120 }] }]
        }"#;
        let json = layout_to_json(DOCUMENT, Some(options)).expect("layout");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        // Unmeasured target degenerates even with waypoints.
        assert!(value["edges"][0]["route"]["sides"].is_null());
        assert!(layout_to_json(DOCUMENT, Some("{\"mode\": \"sideways\"}")).is_err());
    }

    #[test]
    fn renders_dark_preview() {
        let svg = layout_to_svg(DOCUMENT, Some("{\"theme\": \"dark\"}")).expect("svg");
        assert!(svg.contains(&Theme::dark().background));
    }

    #[test]
    fn routes_single_edge() {
        let request = r#"{
            "from": { "x": 0, "y": 0, "w": 100, "h": 40 },
            "to": { "x": 300, "y": 200, "w": 100, "h": 40 }
        }"#;
        let json = route_request(request).expect("route");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["sides"][0], "right");
        assert_eq!(value["sides"][1], "left");
    }

    #[test]
    fn invalid_side_tokens_fall_back_to_defaults() {
        let request = r#"{
            "from": { "x": 0, "y": 0, "w": 100, "h": 40 },
            "to": { "x": 300, "y": 200, "w": 100, "h": 40 },
            "fromSide": "sideways",
            "toSide": 4
        }"#;
        let json = route_request(request).expect("route");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["sides"], serde_json::json!(["right", "left"]));

        let options = r#"{
            "waypoints": [{ "from": "a", "to": "c", "fromSide": "sideways", "points": [{ "x": 250, "y": 120 }] }]
        }"#;
        let json = layout_to_json(DOCUMENT, Some(options)).expect("layout");
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        let bend = &value["edges"][0]["route"]["commands"][1]["lineTo"];
        assert_eq!(bend["x"], 250.0);
        assert_eq!(bend["y"], 120.0);
    }

    #[test]
    fn viewport_wheel_requires_ctrl() {
        let mut viewport = Viewport::new();
        assert!(!viewport.wheel(-1.0, false, 0.0, 0.0, 0.0, 0.0));
        assert!(viewport.wheel(-1.0, true, 0.0, 0.0, 0.0, 0.0));
        assert!((viewport.scale() - 1.1).abs() < 1e-5);
    }
}
