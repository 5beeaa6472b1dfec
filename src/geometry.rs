//! Planar geometry helpers: point math, convex hulls, hull padding and
//! the fallback shapes used when a hull degenerates.

use std::collections::HashSet;
use std::f64::consts::PI;

use crate::types::Point;

/// Hulls thinner than this (pixels) are treated as collinear.
pub const COLLINEAR_EPS: f64 = 0.5;
/// Vertex count of the circle used for single-point territories.
pub const POINT_POLYGON_SIDES: usize = 12;
/// Segments per semicircular cap of a capsule.
pub const CAPSULE_CAP_SEGMENTS: usize = 8;

impl Point {
    pub fn add(self, o: Point) -> Point {
        Point::new(self.x + o.x, self.y + o.y)
    }

    pub fn sub(self, o: Point) -> Point {
        Point::new(self.x - o.x, self.y - o.y)
    }

    pub fn scale(self, k: f64) -> Point {
        Point::new(self.x * k, self.y * k)
    }

    pub fn dot(self, o: Point) -> f64 {
        self.x * o.x + self.y * o.y
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, o: Point) -> f64 {
        self.sub(o).length()
    }

    pub fn distance_sq(self, o: Point) -> f64 {
        let dx = self.x - o.x;
        let dy = self.y - o.y;
        dx * dx + dy * dy
    }

    pub fn lerp(self, o: Point, t: f64) -> Point {
        Point::new(self.x + (o.x - self.x) * t, self.y + (o.y - self.y) * t)
    }

    /// Lexicographic order on (x, y).
    pub fn lex_le(self, o: Point) -> bool {
        self.x < o.x || (self.x == o.x && self.y <= o.y)
    }
}

/// Z component of (a - o) x (b - o). Positive for a left turn.
pub fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Signed shoelace area. Positive for counter-clockwise rings in a
/// y-up frame.
pub fn polygon_area(poly: &[Point]) -> f64 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Even-odd point in polygon test.
pub fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    let mut inside = false;
    let n = poly.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = poly[i];
        let b = poly[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b.sub(a);
    let len_sq = ab.dot(ab);
    if len_sq < 1e-18 {
        return p.distance(a);
    }
    let t = (p.sub(a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a.lerp(b, t))
}

/// Drop points that land on the same `grid`-sized cell, keeping the
/// first occurrence.
pub fn dedupe_points(points: &[Point], grid: f64) -> Vec<Point> {
    let grid = if grid > 0.0 { grid } else { 0.1 };
    let mut seen: HashSet<(i64, i64)> = HashSet::with_capacity(points.len());
    let mut out = Vec::with_capacity(points.len());
    for &p in points {
        let key = ((p.x / grid).round() as i64, (p.y / grid).round() as i64);
        if seen.insert(key) {
            out.push(p);
        }
    }
    out
}

/// Andrew's monotone chain. Returns the hull counter-clockwise (y-up),
/// without collinear points and without repeating the first vertex.
/// Fewer than three input points (or a collinear set) give a hull of
/// one or two points.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// The two points furthest apart.
pub fn farthest_pair(points: &[Point]) -> Option<(Point, Point)> {
    let first = *points.first()?;
    let mut best = (first, first);
    let mut best_d = -1.0;
    for (i, &a) in points.iter().enumerate() {
        for &b in &points[i + 1..] {
            let d = a.distance_sq(b);
            if d > best_d {
                best_d = d;
                best = (a, b);
            }
        }
    }
    Some(best)
}

/// True when every point lies within `eps` of the line through the
/// farthest pair.
pub fn is_near_collinear(points: &[Point], eps: f64) -> bool {
    let Some((a, b)) = farthest_pair(points) else {
        return true;
    };
    let len = a.distance(b);
    if len < 1e-9 {
        return true;
    }
    points.iter().all(|&p| (cross(a, b, p) / len).abs() < eps)
}

/// Offset a convex ring outward by `padding` along per-vertex
/// bisectors. Each vertex moves `padding / cos(half_angle)` so both
/// incident edges end up exactly `padding` away; acute corners
/// (cos < 0.1) are clamped to `2 * padding`.
pub fn expand_hull(hull: &[Point], padding: f64) -> Vec<Point> {
    let n = hull.len();
    if n < 3 {
        return hull.to_vec();
    }
    let orientation = if polygon_area(hull) >= 0.0 { 1.0 } else { -1.0 };

    let outward_normal = |a: Point, b: Point| -> Option<Point> {
        let d = b.sub(a);
        let len = d.length();
        if len < 1e-12 {
            return None;
        }
        Some(Point::new(d.y / len, -d.x / len).scale(orientation))
    };

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let prev = hull[(i + n - 1) % n];
        let cur = hull[i];
        let next = hull[(i + 1) % n];

        let (n1, n2) = match (outward_normal(prev, cur), outward_normal(cur, next)) {
            (Some(a), Some(b)) => (a, b),
            (Some(a), None) | (None, Some(a)) => (a, a),
            (None, None) => {
                out.push(cur);
                continue;
            }
        };

        let sum = n1.add(n2);
        let sum_len = sum.length();
        let bisector = if sum_len < 1e-12 { n1 } else { sum.scale(1.0 / sum_len) };
        let cos_half = bisector.dot(n1);
        let offset = if cos_half < 0.1 {
            padding * 2.0
        } else {
            padding / cos_half
        };
        out.push(cur.add(bisector.scale(offset)));
    }
    out
}

/// Regular polygon around `center`, vertices on the circle.
pub fn regular_polygon(center: Point, radius: f64, sides: usize) -> Vec<Point> {
    let sides = sides.max(3);
    (0..sides)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / sides as f64;
            Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

/// Stadium shape: two semicircular caps of `radius` joined by straight
/// sides along `a`-`b`.
pub fn capsule(a: Point, b: Point, radius: f64, cap_segments: usize) -> Vec<Point> {
    let d = b.sub(a);
    let len = d.length();
    if len < 1e-9 {
        return regular_polygon(a, radius, POINT_POLYGON_SIDES);
    }
    let u = d.scale(1.0 / len);
    let nrm = Point::new(-u.y, u.x);
    let segs = cap_segments.max(2);

    let mut ring = Vec::with_capacity(2 * (segs + 1));
    for i in 0..=segs {
        let theta = -PI / 2.0 + PI * i as f64 / segs as f64;
        let dir = u.scale(theta.cos()).add(nrm.scale(theta.sin()));
        ring.push(b.add(dir.scale(radius)));
    }
    for i in 0..=segs {
        let theta = -PI / 2.0 + PI * i as f64 / segs as f64;
        let dir = u.scale(-theta.cos()).sub(nrm.scale(theta.sin()));
        ring.push(a.add(dir.scale(radius)));
    }
    ring
}

/// Sutherland–Hodgman clip of a polygon to the rectangle
/// [0, width] x [0, height].
pub fn clip_to_rect(poly: &[Point], width: f64, height: f64) -> Vec<Point> {
    // Each boundary: signed distance inside (>= 0) and the crossing point.
    let planes: [(Point, f64); 4] = [
        (Point::new(1.0, 0.0), 0.0),
        (Point::new(-1.0, 0.0), -width),
        (Point::new(0.0, 1.0), 0.0),
        (Point::new(0.0, -1.0), -height),
    ];

    let mut output: Vec<Point> = poly.to_vec();
    for (normal, offset) in planes {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let side = |p: Point| normal.dot(p) - offset;
        for i in 0..input.len() {
            let cur = input[i];
            let prev = input[(i + input.len() - 1) % input.len()];
            let cur_d = side(cur);
            let prev_d = side(prev);
            if cur_d >= 0.0 {
                if prev_d < 0.0 {
                    output.push(prev.lerp(cur, prev_d / (prev_d - cur_d)));
                }
                output.push(cur);
            } else if prev_d >= 0.0 {
                output.push(prev.lerp(cur, prev_d / (prev_d - cur_d)));
            }
        }
    }
    output
}
