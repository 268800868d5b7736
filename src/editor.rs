//! Interaction state for one editing session.
//!
//! The editor is the only writer of node positions and enabled flags. Resolution and routing
//! read that state and are recomputed from scratch for every [`Editor::layout`] call.

use crate::config::Config;
use crate::dispatch::{Dispatcher, NodeEvent};
use crate::geometry::Point;
use crate::ir::Diagram;
use crate::layout::{BoxCache, EdgeKey, Layout, LayoutOptions, Waypoints, compute_layout};
use crate::resolve::{ConnectionSource, Connections, resolve_connections, simulate_path};
use crate::viewport::ViewportTransform;

#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub viewport: ViewportTransform,
    /// Node the user started a connection gesture from.
    pub connecting_from: Option<String>,
    pub line_controls_enabled: bool,
    pub waypoints: Waypoints,
}

/// Raw input from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    DragStart { id: String, screen: Point },
    DragMove { screen: Point },
    DragEnd,
    SetEnabled { id: String, enabled: bool },
    OpenConfig { id: String },
    OpenEdit { id: String },
    OpenHelp { id: String },
}

#[derive(Debug, Clone)]
struct DragSession {
    id: String,
    origin: Point,
    start: Point,
}

#[derive(Debug)]
pub struct Editor {
    diagram: Diagram,
    source: ConnectionSource,
    state: EditorState,
    boxes: BoxCache,
    dispatcher: Dispatcher,
    options: LayoutOptions,
    drag: Option<DragSession>,
}

impl Editor {
    pub fn new(diagram: Diagram, source: ConnectionSource, config: &Config) -> Self {
        Self {
            diagram,
            source,
            state: EditorState {
                viewport: ViewportTransform::new(&config.viewport),
                ..EditorState::default()
            },
            boxes: BoxCache::new(),
            dispatcher: Dispatcher::new(),
            options: LayoutOptions {
                routing: config.routing.clone(),
                line_controls: false,
            },
            drag: None,
        }
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn source(&self) -> &ConnectionSource {
        &self.source
    }

    pub fn set_source(&mut self, source: ConnectionSource) {
        self.source = source;
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportTransform {
        &mut self.state.viewport
    }

    pub fn boxes_mut(&mut self) -> &mut BoxCache {
        &mut self.boxes
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn set_line_controls_enabled(&mut self, enabled: bool) {
        self.state.line_controls_enabled = enabled;
    }

    /// Applies one interaction and forwards the resulting node event.
    /// Returns whether diagram state changed (and edges need re-rendering).
    pub fn handle(&mut self, interaction: Interaction) -> bool {
        match interaction {
            Interaction::DragStart { id, screen } => {
                let Some(node) = self.diagram.node(&id) else {
                    return false;
                };
                self.drag = Some(DragSession {
                    id: id.clone(),
                    origin: node.position,
                    start: screen,
                });
                self.dispatcher.dispatch(&NodeEvent::DragStarted { id });
                false
            }
            Interaction::DragMove { screen } => {
                let Some(drag) = &self.drag else {
                    return false;
                };
                let scale = match self.state.viewport.scale() {
                    s if s > 0.0 => s,
                    _ => 1.0,
                };
                let position = Point::new(
                    drag.origin.x + (screen.x - drag.start.x) / scale,
                    drag.origin.y + (screen.y - drag.start.y) / scale,
                )
                .rounded();
                let id = drag.id.clone();
                let Some(node) = self.diagram.node_mut(&id) else {
                    return false;
                };
                node.position = position;
                self.dispatcher
                    .dispatch(&NodeEvent::PositionChanged { id, position });
                true
            }
            Interaction::DragEnd => {
                let Some(drag) = self.drag.take() else {
                    return false;
                };
                self.dispatcher.dispatch(&NodeEvent::DragEnded { id: drag.id });
                false
            }
            Interaction::SetEnabled { id, enabled } => {
                let Some(node) = self.diagram.node_mut(&id) else {
                    return false;
                };
                let changed = node.enabled != enabled;
                node.enabled = enabled;
                self.dispatcher
                    .dispatch(&NodeEvent::EnableChanged { id, enabled });
                changed
            }
            Interaction::OpenConfig { id } => {
                self.dispatcher.dispatch(&NodeEvent::OpenConfig { id });
                false
            }
            Interaction::OpenEdit { id } => {
                self.dispatcher.dispatch(&NodeEvent::OpenEdit { id });
                false
            }
            Interaction::OpenHelp { id } => {
                self.dispatcher.dispatch(&NodeEvent::OpenHelp { id });
                false
            }
        }
    }

    pub fn connections(&self) -> Connections {
        resolve_connections(&self.source, &self.diagram)
    }

    pub fn layout(&self) -> Layout {
        let options = LayoutOptions {
            line_controls: self.state.line_controls_enabled,
            ..self.options.clone()
        };
        compute_layout(
            &self.diagram,
            &self.connections(),
            &self.boxes,
            &self.state.waypoints,
            &options,
        )
    }

    pub fn simulate(&self) -> Vec<String> {
        simulate_path(&self.diagram, &self.connections())
    }

    pub fn begin_connect(&mut self, id: &str) -> bool {
        if self.diagram.node(id).is_none() {
            return false;
        }
        self.state.connecting_from = Some(id.to_string());
        true
    }

    pub fn cancel_connect(&mut self) {
        self.state.connecting_from = None;
    }

    /// Finishes a connection gesture, handing `(from, to)` back to the caller.
    pub fn complete_connect(&mut self, target: &str) -> Option<(String, String)> {
        if self.diagram.node(target).is_none() {
            return None;
        }
        let from = self.state.connecting_from.take()?;
        Some((from, target.to_string()))
    }

    /// Inserts a waypoint at `index` (clamped to the end), rounded to whole canvas units.
    pub fn insert_waypoint(&mut self, key: EdgeKey, index: usize, point: Point) {
        let points = self.state.waypoints.entry(key).or_default();
        let index = index.min(points.len());
        points.insert(index, point.rounded());
    }

    pub fn move_waypoint(&mut self, key: &EdgeKey, index: usize, point: Point) -> bool {
        match self
            .state
            .waypoints
            .get_mut(key)
            .and_then(|points| points.get_mut(index))
        {
            Some(slot) => {
                *slot = point.rounded();
                true
            }
            None => false,
        }
    }

    pub fn remove_waypoint(&mut self, key: &EdgeKey, index: usize) -> bool {
        let Some(points) = self.state.waypoints.get_mut(key) else {
            return false;
        };
        if index >= points.len() {
            return false;
        }
        points.remove(index);
        if points.is_empty() {
            self.state.waypoints.remove(key);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::Recorder;
    use crate::geometry::Size;
    use crate::ir::{Node, Train};

    fn editor() -> Editor {
        let mut diagram = Diagram::new();
        for (idx, id) in ["a", "b", "c"].iter().enumerate() {
            diagram.add_node(Node::new(*id, Point::new(idx as f32 * 200.0, 0.0)).with_size(100.0, 40.0));
        }
        let source = ConnectionSource::Train(Train::parse(["a", "b", "c"]));
        Editor::new(diagram, source, &Config::default())
    }

    #[test]
    fn toggling_enabled_reroutes_edges() {
        let mut editor = editor();
        assert!(editor.layout().edge("a", "b").is_some());
        assert!(editor.handle(Interaction::SetEnabled {
            id: "b".into(),
            enabled: false
        }));
        let layout = editor.layout();
        assert!(layout.edge("a", "b").is_none());
        assert!(layout.edge("a", "c").is_some());
        assert!(!editor.handle(Interaction::SetEnabled {
            id: "b".into(),
            enabled: false
        }));
    }

    #[test]
    fn drag_moves_node_in_canvas_units() {
        let mut editor = editor();
        let recorder = Recorder::default();
        editor.dispatcher_mut().set_fallback(Box::new(recorder.clone()));
        editor.viewport_mut().set_scale(2.0);
        editor.handle(Interaction::DragStart {
            id: "b".into(),
            screen: Point::new(10.0, 10.0),
        });
        assert!(editor.handle(Interaction::DragMove {
            screen: Point::new(51.0, 30.0)
        }));
        editor.handle(Interaction::DragEnd);
        assert!(!editor.handle(Interaction::DragMove {
            screen: Point::new(500.0, 500.0)
        }));
        assert_eq!(editor.diagram().node("b").map(|n| n.position), Some(Point::new(221.0, 10.0)));
        assert_eq!(*recorder.calls.borrow(), vec!["moved:b:221:10"]);
    }

    #[test]
    fn layout_is_idempotent() {
        let mut editor = editor();
        editor.boxes_mut().record("a", Size::new(120.0, 50.0));
        let first = serde_json::to_string(&editor.layout()).expect("serialize");
        let second = serde_json::to_string(&editor.layout()).expect("serialize");
        assert_eq!(first, second);
    }

    #[test]
    fn connect_gesture_round_trip() {
        let mut editor = editor();
        assert!(editor.complete_connect("b").is_none());
        assert!(!editor.begin_connect("ghost"));
        assert!(editor.begin_connect("a"));
        assert_eq!(editor.complete_connect("c"), Some(("a".to_string(), "c".to_string())));
        assert!(editor.state().connecting_from.is_none());
        editor.begin_connect("a");
        editor.cancel_connect();
        assert!(editor.state().connecting_from.is_none());
    }

    #[test]
    fn waypoint_editing() {
        let mut editor = editor();
        let key = EdgeKey::new("a", "b");
        editor.insert_waypoint(key.clone(), 5, Point::new(150.4, 80.6));
        editor.insert_waypoint(key.clone(), 0, Point::new(120.0, 60.0));
        assert_eq!(
            editor.state().waypoints[&key],
            vec![Point::new(120.0, 60.0), Point::new(150.0, 81.0)]
        );
        assert!(editor.move_waypoint(&key, 1, Point::new(160.0, 90.0)));
        assert!(!editor.move_waypoint(&key, 7, Point::ORIGIN));
        assert!(editor.remove_waypoint(&key, 0));
        assert!(editor.remove_waypoint(&key, 0));
        assert!(!editor.state().waypoints.contains_key(&key));
        assert!(!editor.remove_waypoint(&key, 0));
    }

    #[test]
    fn simulation_uses_current_state() {
        let mut editor = editor();
        assert_eq!(editor.simulate(), vec!["a", "b", "c"]);
        editor.handle(Interaction::SetEnabled {
            id: "b".into(),
            enabled: false,
        });
        assert_eq!(editor.simulate(), vec!["a", "c"]);
    }
}
