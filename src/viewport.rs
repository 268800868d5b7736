//! Pan/zoom state and screen ↔ canvas conversion.

use serde::{Deserialize, Serialize};

use crate::config::ViewportConfig;
use crate::geometry::Point;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    scale: f32,
    pan: Point,
    #[serde(skip)]
    limits: ViewportLimits,
    #[serde(skip)]
    pan_anchor: Option<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewportLimits {
    min_scale: f32,
    max_scale: f32,
    zoom_min: f32,
    zoom_max: f32,
    zoom_in_factor: f32,
    zoom_out_factor: f32,
}

impl Default for ViewportLimits {
    fn default() -> Self {
        Self::from(&ViewportConfig::default())
    }
}

impl From<&ViewportConfig> for ViewportLimits {
    fn from(config: &ViewportConfig) -> Self {
        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_min: config.zoom_min,
            zoom_max: config.zoom_max,
            zoom_in_factor: config.zoom_in_factor,
            zoom_out_factor: config.zoom_out_factor,
        }
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(&ViewportConfig::default())
    }
}

impl ViewportTransform {
    pub fn new(config: &ViewportConfig) -> Self {
        Self {
            scale: 1.0,
            pan: Point::ORIGIN,
            limits: ViewportLimits::from(config),
            pan_anchor: None,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    /// Clamped to the programmatic bounds; non-finite input resets to 1.
    pub fn set_scale(&mut self, scale: f32) {
        let scale = if scale.is_finite() && scale != 0.0 { scale } else { 1.0 };
        self.scale = scale.clamp(self.limits.min_scale, self.limits.max_scale);
    }

    pub fn set_pan(&mut self, pan: Point) {
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        self.pan = Point::new(finite(pan.x), finite(pan.y));
    }

    /// `origin` is the screen position of the canvas element's top-left corner.
    pub fn to_canvas(&self, screen: Point, origin: Point) -> Point {
        Point::new(
            (screen.x - origin.x - self.pan.x) / self.scale,
            (screen.y - origin.y - self.pan.y) / self.scale,
        )
    }

    pub fn to_screen(&self, canvas: Point, origin: Point) -> Point {
        Point::new(
            canvas.x * self.scale + self.pan.x + origin.x,
            canvas.y * self.scale + self.pan.y + origin.y,
        )
    }

    /// Multiplies the scale by `factor` (interactive bounds) keeping the canvas point
    /// under `cursor` fixed on screen.
    pub fn zoom_at(&mut self, cursor: Point, origin: Point, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let prev = self.scale;
        let next = (prev * factor).clamp(self.limits.zoom_min, self.limits.zoom_max);
        let anchor = self.to_canvas(cursor, origin);
        self.pan.x -= anchor.x * (next - prev);
        self.pan.y -= anchor.y * (next - prev);
        self.scale = next;
    }

    /// Ctrl+wheel zoom. Returns whether the event was consumed.
    pub fn wheel(&mut self, delta_y: f32, ctrl: bool, cursor: Point, origin: Point) -> bool {
        if !ctrl {
            return false;
        }
        let factor = if delta_y < 0.0 {
            self.limits.zoom_in_factor
        } else {
            self.limits.zoom_out_factor
        };
        self.zoom_at(cursor, origin, factor);
        true
    }

    pub fn begin_pan(&mut self, screen: Point) {
        self.pan_anchor = Some(Point::new(screen.x - self.pan.x, screen.y - self.pan.y));
    }

    pub fn drag_pan(&mut self, screen: Point) -> bool {
        let Some(anchor) = self.pan_anchor else {
            return false;
        };
        self.pan = Point::new(screen.x - anchor.x, screen.y - anchor.y);
        true
    }

    pub fn end_pan(&mut self) {
        self.pan_anchor = None;
    }

    pub fn is_panning(&self) -> bool {
        self.pan_anchor.is_some()
    }

    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.pan.x, self.pan.y, self.scale
        )
    }
}
