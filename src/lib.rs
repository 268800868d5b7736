#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod editor;
pub mod geometry;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod resolve;
pub mod theme;
pub mod viewport;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::Config;
pub use editor::{Editor, EditorState, Interaction};
pub use geometry::{Point, Rect, Side, Size};
pub use ir::{BranchGraphSpec, BranchSpec, Diagram, Group, Node, Train};
pub use layout::routing::{Route, RouteOptions, route_edge};
pub use layout::{Layout, compute_layout};
pub use parser::{DiagramDocument, parse_diagram};
pub use resolve::{ConnectionSource, Connections, MaterializedEdge, resolve_connections};
pub use viewport::ViewportTransform;
