use serde::Serialize;

use crate::config::RoutingConfig;
use crate::geometry::{Point, Rect, Side, Spot};

// ── Lead segments ───────────────────────────────────────────────────
/// Length of the perpendicular stub leaving a node before the edge turns.
pub const DEFAULT_LEAD_LENGTH: f32 = 16.0;
/// Radius of the single rounded corner, before clamping to the adjacent segments.
pub const DEFAULT_CORNER_RADIUS: f32 = 8.0;

// ── Alignment tolerance ─────────────────────────────────────────────
/// Lead points closer than this on one axis are treated as aligned.
const ALIGN_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    QuadTo { control: Point, to: Point },
}

impl PathCommand {
    pub fn end_point(&self) -> Point {
        match self {
            PathCommand::MoveTo(point) | PathCommand::LineTo(point) => *point,
            PathCommand::QuadTo { to, .. } => *to,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOptions {
    /// Explicit exit side. Never subject to group fallback.
    pub from_side: Option<Side>,
    /// Explicit entry side. Never subject to group fallback.
    pub to_side: Option<Side>,
    pub from_group: Option<Rect>,
    pub to_group: Option<Rect>,
    pub lead_length: f32,
    pub corner_radius: f32,
    /// Distance to a group edge that counts as "near". Defaults to the lead length.
    pub group_margin: Option<f32>,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            from_side: None,
            to_side: None,
            from_group: None,
            to_group: None,
            lead_length: DEFAULT_LEAD_LENGTH,
            corner_radius: DEFAULT_CORNER_RADIUS,
            group_margin: None,
        }
    }
}

impl RouteOptions {
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            lead_length: config.lead_length,
            corner_radius: config.corner_radius,
            group_margin: config.group_margin,
            ..Self::default()
        }
    }

    fn margin(&self) -> f32 {
        self.group_margin.unwrap_or(self.lead_length)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Corner {
    pub point: Point,
    pub radius: f32,
    /// Length from the source lead point to the corner.
    pub before: f32,
    /// Length from the corner to the destination lead point.
    pub after: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// `None` for a degenerate route between unmeasured boxes.
    pub sides: Option<(Side, Side)>,
    pub commands: Vec<PathCommand>,
    pub corner: Option<Corner>,
}

impl Route {
    fn degenerate() -> Self {
        Self {
            sides: None,
            commands: vec![
                PathCommand::MoveTo(Point::ORIGIN),
                PathCommand::LineTo(Point::ORIGIN),
            ],
            corner: None,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.sides.is_none()
    }

    /// End points of every command, in order. Quadratic control points are not included.
    pub fn points(&self) -> Vec<Point> {
        self.commands.iter().map(PathCommand::end_point).collect()
    }

    pub fn start(&self) -> Point {
        self.commands.first().map(PathCommand::end_point).unwrap_or(Point::ORIGIN)
    }

    pub fn end(&self) -> Point {
        self.commands.last().map(PathCommand::end_point).unwrap_or(Point::ORIGIN)
    }
}

/// Sides facing each other along the axis of greater center-to-center distance.
pub fn default_sides(from: &Rect, to: &Rect) -> (Side, Side) {
    let from_c = from.center();
    let to_c = to.center();
    let dx = to_c.x - from_c.x;
    let dy = to_c.y - from_c.y;
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 {
            (Side::Right, Side::Left)
        } else {
            (Side::Left, Side::Right)
        }
    } else if dy >= 0.0 {
        (Side::Bottom, Side::Top)
    } else {
        (Side::Top, Side::Bottom)
    }
}

/// Alternates tried, in order, when a side sits too close to its group's edge.
pub fn fallback_order(side: Side) -> [Side; 3] {
    match side {
        Side::Left => [Side::Bottom, Side::Top, Side::Right],
        Side::Right => [Side::Bottom, Side::Top, Side::Left],
        Side::Top => [Side::Right, Side::Left, Side::Bottom],
        Side::Bottom => [Side::Right, Side::Left, Side::Top],
    }
}

pub fn near_group_edge(rect: &Rect, group: &Rect, side: Side, margin: f32) -> bool {
    rect.clearance_to(group, side) <= margin
}

/// Swaps `side` for the first fallback that keeps clear of the group boundary.
/// Keeps `side` when there is no usable group or every alternate is also near an edge.
pub fn adjust_side_for_group(rect: &Rect, side: Side, group: Option<&Rect>, margin: f32) -> Side {
    let Some(group) = group.filter(|group| !group.is_empty()) else {
        return side;
    };
    if !near_group_edge(rect, group, side, margin) {
        return side;
    }
    fallback_order(side)
        .into_iter()
        .find(|alt| !near_group_edge(rect, group, *alt, margin))
        .unwrap_or(side)
}

pub fn lead_point(anchor: Point, side: Side, length: f32) -> Point {
    let (nx, ny) = side.outward_normal();
    anchor.offset(nx * length, ny * length)
}

/// Orthogonal route from `from` to `to` with lead stubs and one rounded corner.
///
/// Unmeasured boxes yield a zero-length path at the origin.
pub fn route_edge(from: Rect, to: Rect, options: &RouteOptions) -> Route {
    if from.is_empty() || to.is_empty() {
        return Route::degenerate();
    }
    let margin = options.margin();
    let (default_from, default_to) = default_sides(&from, &to);
    let from_side = options.from_side.unwrap_or_else(|| {
        adjust_side_for_group(&from, default_from, options.from_group.as_ref(), margin)
    });
    let to_side = options
        .to_side
        .unwrap_or_else(|| adjust_side_for_group(&to, default_to, options.to_group.as_ref(), margin));

    let lead = options.lead_length.max(0.0);
    let start = from.side_midpoint(from_side);
    let end = to.side_midpoint(to_side);
    let lead_a = lead_point(start, from_side, lead);
    let lead_b = lead_point(end, to_side, lead);

    let mut commands = vec![PathCommand::MoveTo(start), PathCommand::LineTo(lead_a)];
    let aligned =
        (lead_a.x - lead_b.x).abs() <= ALIGN_EPSILON || (lead_a.y - lead_b.y).abs() <= ALIGN_EPSILON;
    let corner = if aligned {
        commands.push(PathCommand::LineTo(lead_b));
        None
    } else {
        let point = if from_side.is_horizontal() {
            Point::new(lead_b.x, lead_a.y)
        } else {
            Point::new(lead_a.x, lead_b.y)
        };
        let before = lead_a.distance(point);
        let after = point.distance(lead_b);
        let radius = options.corner_radius.max(0.0).min(before).min(after);
        let pre = point.toward(lead_a, radius);
        let post = point.toward(lead_b, radius);
        commands.push(PathCommand::LineTo(pre));
        commands.push(PathCommand::QuadTo {
            control: point,
            to: post,
        });
        commands.push(PathCommand::LineTo(lead_b));
        Some(Corner {
            point,
            radius,
            before,
            after,
        })
    };
    commands.push(PathCommand::LineTo(end));

    Route {
        sides: Some((from_side, to_side)),
        commands,
        corner,
    }
}

/// Straight polyline through user-placed waypoints.
///
/// Endpoints sit on the explicit sides when given, else on the box centers.
pub fn route_through_waypoints(
    from: Rect,
    to: Rect,
    waypoints: &[Point],
    from_side: Option<Side>,
    to_side: Option<Side>,
) -> Route {
    if from.is_empty() || to.is_empty() {
        return Route::degenerate();
    }
    let start = from.spot(from_side.map_or(Spot::Center, Spot::from));
    let end = to.spot(to_side.map_or(Spot::Center, Spot::from));
    let (default_from, default_to) = default_sides(&from, &to);
    let mut commands = Vec::with_capacity(waypoints.len() + 2);
    commands.push(PathCommand::MoveTo(start));
    commands.extend(waypoints.iter().copied().map(PathCommand::LineTo));
    commands.push(PathCommand::LineTo(end));
    Route {
        sides: Some((from_side.unwrap_or(default_from), to_side.unwrap_or(default_to))),
        commands,
        corner: None,
    }
}

pub fn path_length(points: &[Point]) -> f32 {
    points.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

/// Point halfway along the route, where edge labels sit.
pub fn label_anchor(route: &Route) -> Option<Point> {
    let points = route.points();
    if points.len() < 2 {
        return None;
    }
    let half = path_length(&points) / 2.0;
    let mut walked = 0.0;
    for pair in points.windows(2) {
        let len = pair[0].distance(pair[1]);
        if walked + len >= half {
            return Some(pair[0].toward(pair[1], half - walked));
        }
        walked += len;
    }
    points.last().copied()
}
