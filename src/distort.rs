//! Hand-drawn edge distortion.
//!
//! Every edge is resampled and pushed sideways by smooth noise. The
//! noise is always evaluated in the edge's canonical frame (the
//! lexicographically smaller endpoint first), so two polygons that
//! share an edge produce bit-identical points for it no matter which
//! direction each of them walks it.

use std::f64::consts::PI;

use crate::noise::smooth_noise;
use crate::types::{CanvasSize, Point};

/// Displacement amplitude as a fraction of the shorter canvas side.
pub const AMPLITUDE_RATIO: f64 = 0.018;
pub const DEFAULT_SEGMENTS: usize = 16;
const MIN_EDGE_LENGTH: f64 = 1e-6;
/// Canvas-to-noise coordinate scale for the edge anchor.
const ANCHOR_SCALE: f64 = 0.02;
/// Noise periods travelled along one edge.
const EDGE_FREQUENCY: f64 = 3.0;

pub fn amplitude_for(canvas: CanvasSize) -> f64 {
    canvas.min_side() * AMPLITUDE_RATIO
}

/// Distort one edge. Returns `segments + 1` points from `p0` to `p1`
/// inclusive; both endpoints are returned unchanged. Degenerate edges
/// come back as just their two endpoints.
pub fn distort_edge(p0: Point, p1: Point, amplitude: f64, segments: usize, seed: u32) -> Vec<Point> {
    let forward = p0.lex_le(p1);
    let (a, b) = if forward { (p0, p1) } else { (p1, p0) };
    let d = b.sub(a);
    let len = d.length();
    if len < MIN_EDGE_LENGTH {
        return vec![p0, p1];
    }

    let segments = segments.max(1);
    // Normal of the canonical direction. Walking the edge backwards
    // negates the traversal normal, so this equals direction * normal.
    let normal = Point::new(-d.y / len, d.x / len);
    let anchor = Point::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5);

    (0..=segments)
        .map(|j| {
            // Canonical sample index; derived from integers so both
            // traversal directions hit the exact same `t`.
            let k = if forward { j } else { segments - j };
            if k == 0 {
                return a;
            }
            if k == segments {
                return b;
            }
            let t = k as f64 / segments as f64;
            let n = smooth_noise(
                anchor.x * ANCHOR_SCALE + t * EDGE_FREQUENCY,
                anchor.y * ANCHOR_SCALE - t * EDGE_FREQUENCY,
                seed,
            );
            let envelope = (t * PI).sin();
            a.lerp(b, t).add(normal.scale(n * amplitude * envelope))
        })
        .collect()
}

/// Distort every edge of a closed polygon.
///
/// Output is the concatenation of each edge's samples (edge `i` runs
/// from vertex `i` to vertex `i + 1`, wrapping), so with `segments = s`
/// vertex `i` sits at index `i * (s + 1)` for non-degenerate edges.
pub fn distort_polygon(polygon: &[Point], canvas: CanvasSize, segments: usize, seed: u32) -> Vec<Point> {
    let n = polygon.len();
    if n < 2 {
        return polygon.to_vec();
    }
    let amplitude = amplitude_for(canvas);
    let mut out = Vec::with_capacity(n * (segments.max(1) + 1));
    for i in 0..n {
        out.extend(distort_edge(polygon[i], polygon[(i + 1) % n], amplitude, segments, seed));
    }
    out
}
