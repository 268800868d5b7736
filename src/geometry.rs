use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Moves `self` toward `target` by `amount` along the straight line between them.
    pub fn toward(self, target: Point, amount: f32) -> Self {
        let len = self.distance(target);
        if len <= f32::EPSILON {
            return self;
        }
        let t = amount / len;
        Self::new(self.x + (target.x - self.x) * t, self.y + (target.y - self.y) * t)
    }

    pub fn rounded(self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}

impl Size {
    pub fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }

    pub fn is_empty(&self) -> bool {
        !(self.w.is_finite() && self.h.is_finite()) || self.w <= 0.0 || self.h <= 0.0
    }
}

/// Axis-aligned bounding box in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_parts(position: Point, size: Size) -> Self {
        Self::new(position.x, position.y, size.w, size.h)
    }

    /// A box that has not been measured yet (or was measured as nothing).
    pub fn is_empty(&self) -> bool {
        Size::new(self.w, self.h).is_empty() || !self.x.is_finite() || !self.y.is_finite()
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Smallest box enclosing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }

    /// Midpoint of the given side.
    pub fn side_midpoint(&self, side: Side) -> Point {
        let c = self.center();
        match side {
            Side::Top => Point::new(c.x, self.y),
            Side::Right => Point::new(self.right(), c.y),
            Side::Bottom => Point::new(c.x, self.bottom()),
            Side::Left => Point::new(self.x, c.y),
        }
    }

    pub fn spot(&self, spot: Spot) -> Point {
        match spot {
            Spot::Center => self.center(),
            Spot::Top => self.side_midpoint(Side::Top),
            Spot::Right => self.side_midpoint(Side::Right),
            Spot::Bottom => self.side_midpoint(Side::Bottom),
            Spot::Left => self.side_midpoint(Side::Left),
            Spot::TopLeft => Point::new(self.x, self.y),
            Spot::TopRight => Point::new(self.right(), self.y),
            Spot::BottomLeft => Point::new(self.x, self.bottom()),
            Spot::BottomRight => Point::new(self.right(), self.bottom()),
        }
    }

    /// Distance from this box's edge to `outer`'s edge on `side`.
    /// Negative when this box pokes out of `outer` on that side.
    pub fn clearance_to(&self, outer: &Rect, side: Side) -> f32 {
        match side {
            Side::Top => self.y - outer.y,
            Side::Right => outer.right() - self.right(),
            Side::Bottom => outer.bottom() - self.bottom(),
            Side::Left => self.x - outer.x,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// Parses one of the four canonical side tokens. Anything else is `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
            Side::Left => "left",
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }

    /// Unit vector pointing away from the box on this side.
    pub fn outward_normal(&self) -> (f32, f32) {
        match self {
            Side::Top => (0.0, -1.0),
            Side::Right => (1.0, 0.0),
            Side::Bottom => (0.0, 1.0),
            Side::Left => (-1.0, 0.0),
        }
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Side::from_token(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown side `{raw}`")))
    }
}

/// Lenient side field: invalid tokens become `None` instead of failing the whole document.
pub fn deserialize_lenient_side<'de, D>(deserializer: D) -> Result<Option<Side>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|value| value.as_str()).and_then(Side::from_token))
}

/// Lenient per-branch side map: entries with invalid tokens are dropped.
pub fn deserialize_lenient_side_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Side>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| Some((key, value.as_str().and_then(Side::from_token)?)))
        .collect())
}

/// Anchor point on a box. Edges with manual waypoints attach at these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Spot {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Spot {
    pub fn from_token(token: &str) -> Self {
        match token {
            "Top" => Spot::Top,
            "Bottom" => Spot::Bottom,
            "Left" => Spot::Left,
            "Right" => Spot::Right,
            "TopLeft" => Spot::TopLeft,
            "TopRight" => Spot::TopRight,
            "BottomLeft" => Spot::BottomLeft,
            "BottomRight" => Spot::BottomRight,
            _ => Spot::Center,
        }
    }
}

impl<'de> Deserialize<'de> for Spot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Spot::from_token(&raw))
    }
}

impl From<Side> for Spot {
    fn from(side: Side) -> Self {
        match side {
            Side::Top => Spot::Top,
            Side::Right => Spot::Right,
            Side::Bottom => Spot::Bottom,
            Side::Left => Spot::Left,
        }
    }
}

/// Parses a `"x y"` location string. Missing or non-numeric parts read as 0.
pub fn parse_point(input: &str) -> Point {
    let mut parts = input.split(' ').map(|part| part.parse::<f32>().ok().filter(|v| v.is_finite()));
    let x = parts.next().flatten().unwrap_or(0.0);
    let y = parts.next().flatten().unwrap_or(0.0);
    Point::new(x, y)
}

pub fn format_point(point: Point) -> String {
    format!("{} {}", point.x.round() as i64, point.y.round() as i64)
}
