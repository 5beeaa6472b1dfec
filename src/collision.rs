//! Axis-aligned box collision for labels and icons.
//!
//! Labels never rotate, so boxes are plain min/max rectangles and the
//! annealer's energy is built from their intersection areas.

use crate::types::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_center(center: Point, width: f64, height: f64) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self::new(center.x - hw, center.y - hh, center.x + hw, center.y + hh)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }
}

/// Area of the intersection of two boxes (0 when disjoint or touching).
pub fn overlap_area(a: &Rect, b: &Rect) -> f64 {
    let w = a.max_x.min(b.max_x) - a.min_x.max(b.min_x);
    if w <= 0.0 {
        return 0.0;
    }
    let h = a.max_y.min(b.max_y) - a.min_y.max(b.min_y);
    if h <= 0.0 {
        return 0.0;
    }
    w * h
}

/// True if the interiors of two boxes overlap.
/// Touching (shared edge or corner) is NOT counted as overlap.
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.min_x < b.max_x && b.min_x < a.max_x && a.min_y < b.max_y && b.min_y < a.max_y
}
