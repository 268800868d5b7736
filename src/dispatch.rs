//! Routes node events to presentation-supplied handlers by node id.
//!
//! Node records stay plain data; behaviour ("open the config dialog for this node") lives in
//! handlers registered here.

use std::collections::HashMap;

use crate::geometry::Point;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    OpenConfig { id: String },
    OpenEdit { id: String },
    OpenHelp { id: String },
    EnableChanged { id: String, enabled: bool },
    DragStarted { id: String },
    PositionChanged { id: String, position: Point },
    DragEnded { id: String },
}

impl NodeEvent {
    pub fn node_id(&self) -> &str {
        match self {
            NodeEvent::OpenConfig { id }
            | NodeEvent::OpenEdit { id }
            | NodeEvent::OpenHelp { id }
            | NodeEvent::EnableChanged { id, .. }
            | NodeEvent::DragStarted { id }
            | NodeEvent::PositionChanged { id, .. }
            | NodeEvent::DragEnded { id } => id,
        }
    }
}

/// Capabilities a presentation layer offers for a node. Every hook defaults to doing nothing.
pub trait NodeActions {
    fn open_config(&mut self, _id: &str) {}
    fn open_edit(&mut self, _id: &str) {}
    fn open_help(&mut self, _id: &str) {}
    fn enable_changed(&mut self, _id: &str, _enabled: bool) {}
    fn drag_started(&mut self, _id: &str) {}
    fn position_changed(&mut self, _id: &str, _position: Point) {}
    fn drag_ended(&mut self, _id: &str) {}
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Box<dyn NodeActions>>,
    fallback: Option<Box<dyn NodeActions>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.handlers.keys().collect();
        ids.sort();
        f.debug_struct("Dispatcher")
            .field("handlers", &ids)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, handler: Box<dyn NodeActions>) {
        self.handlers.insert(id.into(), handler);
    }

    pub fn unregister(&mut self, id: &str) -> Option<Box<dyn NodeActions>> {
        self.handlers.remove(id)
    }

    /// Receives events for nodes without their own handler.
    pub fn set_fallback(&mut self, handler: Box<dyn NodeActions>) {
        self.fallback = Some(handler);
    }

    /// Returns whether some handler received the event.
    pub fn dispatch(&mut self, event: &NodeEvent) -> bool {
        let handler = match self.handlers.get_mut(event.node_id()) {
            Some(handler) => handler,
            None => match self.fallback.as_mut() {
                Some(handler) => handler,
                None => return false,
            },
        };
        match event {
            NodeEvent::OpenConfig { id } => handler.open_config(id),
            NodeEvent::OpenEdit { id } => handler.open_edit(id),
            NodeEvent::OpenHelp { id } => handler.open_help(id),
            NodeEvent::EnableChanged { id, enabled } => handler.enable_changed(id, *enabled),
            NodeEvent::DragStarted { id } => handler.drag_started(id),
            NodeEvent::PositionChanged { id, position } => handler.position_changed(id, *position),
            NodeEvent::DragEnded { id } => handler.drag_ended(id),
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Handler that records every call as a string.
    #[derive(Clone, Default)]
    pub(crate) struct Recorder {
        pub(crate) calls: Rc<RefCell<Vec<String>>>,
    }

    impl NodeActions for Recorder {
        fn open_config(&mut self, id: &str) {
            self.calls.borrow_mut().push(format!("config:{id}"));
        }

        fn enable_changed(&mut self, id: &str, enabled: bool) {
            self.calls.borrow_mut().push(format!("enabled:{id}:{enabled}"));
        }

        fn position_changed(&mut self, id: &str, position: Point) {
            self.calls
                .borrow_mut()
                .push(format!("moved:{id}:{}:{}", position.x, position.y));
        }
    }

    #[test]
    fn dispatches_by_id_then_fallback() {
        let own = Recorder::default();
        let fallback = Recorder::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("a", Box::new(own.clone()));
        dispatcher.set_fallback(Box::new(fallback.clone()));

        assert!(dispatcher.dispatch(&NodeEvent::OpenConfig { id: "a".into() }));
        assert!(dispatcher.dispatch(&NodeEvent::EnableChanged {
            id: "b".into(),
            enabled: false
        }));
        assert_eq!(*own.calls.borrow(), vec!["config:a"]);
        assert_eq!(*fallback.calls.borrow(), vec!["enabled:b:false"]);
    }

    #[test]
    fn unhandled_events_report_false() {
        let mut dispatcher = Dispatcher::new();
        assert!(!dispatcher.dispatch(&NodeEvent::OpenHelp { id: "x".into() }));
        dispatcher.register("x", Box::new(Recorder::default()));
        // Default hooks accept the event even if they ignore it.
        assert!(dispatcher.dispatch(&NodeEvent::OpenHelp { id: "x".into() }));
        assert!(dispatcher.unregister("x").is_some());
    }
}
