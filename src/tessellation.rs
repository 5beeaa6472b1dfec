//! Voronoi territories.
//!
//! Every positioned location seeds a cell, tagged with the nearest
//! territory owner at or above it. A jittered grid of filler seeds
//! covers the rest of the canvas; fillers close to a tagged seed join
//! its territory, the others stay unowned and keep neighbours apart.
//! A territory is the merged outline of all cells tagged with it or
//! with any territory nested inside it, so shapes can be concave.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use spade::handles::FixedVertexHandle;
use spade::{DelaunayTriangulation, Point2, Triangulation};
use tracing::debug;

use crate::error::EngineError;
use crate::geometry::clip_to_rect;
use crate::hierarchy::LocationForest;
use crate::noise::hash_noise;
use crate::territory::{
    child_names, nesting_levels, order_and_cap, positions_by_id, territory_color, territory_owners,
};
use crate::types::{CanvasSize, LayoutItem, Location, Point, TessellationTuning, Territory};

/// Seeds are kept this far inside the canvas so mirrors never coincide
/// with originals.
const EDGE_INSET: f64 = 0.5;
/// Filler seeds closer than this fraction of a grid step to a real
/// location are dropped.
const FILLER_CLEARANCE: f64 = 0.5;
/// Vertex keys are rounded to 1/QUANT px when matching cell edges.
const QUANT: f64 = 1000.0;
const JITTER_Y_SALT: u32 = 0x9E37_79B9;

type Key = (i64, i64);

fn key(p: Point) -> Key {
    ((p.x * QUANT).round() as i64, (p.y * QUANT).round() as i64)
}

#[derive(Debug, Clone, Copy)]
struct Seed {
    point: Point,
    /// Forest id of the territory this cell counts toward.
    tag: Option<usize>,
}

pub fn grid_step(canvas: CanvasSize, tuning: &TessellationTuning) -> f64 {
    canvas.max_side() / tuning.grid_divisions.max(1) as f64
}

fn clamp_to_canvas(p: Point, canvas: CanvasSize) -> Point {
    Point::new(
        p.x.clamp(EDGE_INSET, canvas.width - EDGE_INSET),
        p.y.clamp(EDGE_INSET, canvas.height - EDGE_INSET),
    )
}

/// Real seeds in input order, then the filler grid row by row.
fn seed_points(
    forest: &LocationForest<'_>,
    positions: &HashMap<usize, Point>,
    owners: &HashSet<usize>,
    canvas: CanvasSize,
    tuning: &TessellationTuning,
) -> Vec<Seed> {
    let mut seen: HashSet<Key> = HashSet::new();
    let mut real = Vec::with_capacity(positions.len());
    for id in forest.ids() {
        let Some(&p) = positions.get(&id) else {
            continue;
        };
        let point = clamp_to_canvas(p, canvas);
        if !seen.insert(key(point)) {
            continue;
        }
        let tag = std::iter::once(id)
            .chain(forest.ancestors(id))
            .find(|a| owners.contains(a));
        real.push(Seed { point, tag });
    }

    let step = grid_step(canvas, tuning);
    let clearance = (FILLER_CLEARANCE * step).powi(2);
    let locality = tuning.locality_factor * step * step;
    let cols = (canvas.width / step).ceil() as i32;
    let rows = (canvas.height / step).ceil() as i32;

    let mut fillers = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let jx = hash_noise(col, row, tuning.seed) * tuning.jitter * step;
            let jy = hash_noise(col, row, tuning.seed ^ JITTER_Y_SALT) * tuning.jitter * step;
            let point = clamp_to_canvas(
                Point::new((col as f64 + 0.5) * step + jx, (row as f64 + 0.5) * step + jy),
                canvas,
            );
            if real.iter().any(|s| s.point.distance_sq(point) < clearance) {
                continue;
            }
            if !seen.insert(key(point)) {
                continue;
            }
            let tag = real
                .iter()
                .filter_map(|s| s.tag.map(|t| (s.point.distance_sq(point), t)))
                .filter(|(d, _)| *d <= locality)
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, t)| t);
            fillers.push(Seed { point, tag });
        }
    }

    debug!(real = real.len(), fillers = fillers.len(), step, "tessellation seeds");
    real.extend(fillers);
    real
}

/// Reflections across the four canvas edges. They close off the cells
/// of the real seeds along the canvas border.
fn mirror_points(p: Point, canvas: CanvasSize) -> [Point; 4] {
    [
        Point::new(-p.x, p.y),
        Point::new(2.0 * canvas.width - p.x, p.y),
        Point::new(p.x, -p.y),
        Point::new(p.x, 2.0 * canvas.height - p.y),
    ]
}

fn insert(
    triangulation: &mut DelaunayTriangulation<Point2<f64>>,
    p: Point,
) -> Result<FixedVertexHandle, EngineError> {
    triangulation
        .insert(Point2::new(p.x, p.y))
        .map_err(|err| EngineError::TessellationUnavailable(format!("{err:?} at ({:.2}, {:.2})", p.x, p.y)))
}

/// Voronoi corners around one vertex, sorted by angle. `None` when the
/// vertex touches the outer face.
fn cell_polygon(
    triangulation: &DelaunayTriangulation<Point2<f64>>,
    handle: FixedVertexHandle,
    centers: &[Point],
) -> Option<Vec<Point>> {
    let vertex = triangulation.vertex(handle);
    let origin = vertex.position();
    let mut corners = Vec::new();
    for edge in vertex.out_edges() {
        let face = edge.face().as_inner()?;
        corners.push(centers.get(face.fix().index()).copied()?);
    }
    let angle = |p: &Point| (p.y - origin.y).atan2(p.x - origin.x);
    corners.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
    Some(corners)
}

/// Clipped Voronoi cell of every seed, in seed order.
fn voronoi_cells(seeds: &[Seed], canvas: CanvasSize) -> Result<Vec<Vec<Point>>, EngineError> {
    let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
    let mut handles = Vec::with_capacity(seeds.len());
    for seed in seeds {
        handles.push(insert(&mut triangulation, seed.point)?);
    }
    for seed in seeds {
        for mirror in mirror_points(seed.point, canvas) {
            insert(&mut triangulation, mirror)?;
        }
    }

    // One circumcenter per face, so neighbouring cells share corners
    // bit for bit.
    let mut centers = vec![Point::new(0.0, 0.0); triangulation.num_all_faces()];
    for face in triangulation.inner_faces() {
        let c = face.circumcenter();
        centers[face.fix().index()] = Point::new(c.x, c.y);
    }

    handles
        .iter()
        .zip(seeds)
        .map(|(&handle, seed)| {
            let cell = cell_polygon(&triangulation, handle, &centers).ok_or_else(|| {
                EngineError::TessellationUnavailable(format!(
                    "seed ({:.2}, {:.2}) has an unbounded cell",
                    seed.point.x, seed.point.y
                ))
            })?;
            Ok(clip_to_rect(&cell, canvas.width, canvas.height))
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Key,
    to: Key,
    start: Point,
}

/// Outer boundary of a union of consistently oriented cells.
///
/// Interior edges appear once in each direction and cancel; what is
/// left is chained into closed loops. Loops come back in discovery
/// order.
pub fn boundary_loops(cells: &[&[Point]]) -> Vec<Vec<Point>> {
    let mut reps: HashMap<Key, Point> = HashMap::new();
    let mut edges: Vec<Edge> = Vec::new();
    for cell in cells.iter().filter(|c| c.len() >= 3) {
        let n = cell.len();
        for i in 0..n {
            let (a, b) = (cell[i], cell[(i + 1) % n]);
            let (from, to) = (key(a), key(b));
            if from == to {
                continue;
            }
            let start = *reps.entry(from).or_insert(a);
            reps.entry(to).or_insert(b);
            edges.push(Edge { from, to, start });
        }
    }

    let directed: HashSet<(Key, Key)> = edges.iter().map(|e| (e.from, e.to)).collect();
    let boundary: Vec<Edge> = edges
        .into_iter()
        .filter(|e| !directed.contains(&(e.to, e.from)))
        .collect();

    let mut outgoing: HashMap<Key, Vec<usize>> = HashMap::new();
    for (i, e) in boundary.iter().enumerate() {
        outgoing.entry(e.from).or_default().push(i);
    }

    let mut used = vec![false; boundary.len()];
    let mut loops = Vec::new();
    for first in 0..boundary.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let origin = boundary[first].from;
        let mut ring = vec![boundary[first].start];
        let mut cur = boundary[first].to;
        let mut closed = false;
        while ring.len() <= boundary.len() {
            if cur == origin {
                closed = true;
                break;
            }
            let next = outgoing
                .get(&cur)
                .and_then(|out| out.iter().copied().find(|&e| !used[e]));
            let Some(e) = next else {
                break;
            };
            used[e] = true;
            ring.push(boundary[e].start);
            cur = boundary[e].to;
        }
        if closed && ring.len() >= 3 {
            loops.push(ring);
        }
    }
    loops
}

/// Build tessellated territories. Fails only when the triangulation
/// does; callers are expected to fall back to hulls then.
pub fn generate_territories(
    locations: &[Location],
    layout: &[LayoutItem],
    canvas: CanvasSize,
    tuning: &TessellationTuning,
) -> Result<Vec<Territory>, EngineError> {
    if !canvas.is_valid() || canvas.min_side() <= 2.0 * EDGE_INSET {
        return Err(EngineError::TessellationUnavailable(format!(
            "canvas {}x{} cannot be subdivided",
            canvas.width, canvas.height
        )));
    }
    let forest = LocationForest::build(locations);
    let positions = positions_by_id(&forest, layout);
    let owners = territory_owners(&forest, &positions);
    if owners.is_empty() {
        return Ok(Vec::new());
    }
    let owner_set: HashSet<usize> = owners.iter().copied().collect();

    let seeds = seed_points(&forest, &positions, &owner_set, canvas, tuning);
    let cells = voronoi_cells(&seeds, canvas)?;

    let outlines: Vec<(usize, Vec<Point>)> = owners
        .par_iter()
        .filter_map(|&owner| {
            let tags: HashSet<usize> = std::iter::once(owner)
                .chain(forest.descendants(owner).into_iter().filter(|d| owner_set.contains(d)))
                .collect();
            let owned: Vec<&[Point]> = seeds
                .iter()
                .zip(&cells)
                .filter(|(seed, _)| seed.tag.is_some_and(|t| tags.contains(&t)))
                .map(|(_, cell)| cell.as_slice())
                .collect();
            let mut loops = boundary_loops(&owned);
            if loops.len() > 1 {
                debug!(
                    owner = forest.name(owner),
                    dropped = loops.len() - 1,
                    "territory is disjoint; keeping the longest loop"
                );
            }
            loops.sort_by_key(|l| Reverse(l.len()));
            loops.into_iter().next().map(|polygon| (owner, polygon))
        })
        .collect();

    let rendered: Vec<usize> = outlines.iter().map(|(id, _)| *id).collect();
    let levels = nesting_levels(&forest, &rendered);
    let territories = outlines
        .into_iter()
        .map(|(id, polygon)| {
            let location = forest.location(id);
            Territory {
                name: location.name.clone(),
                polygon,
                color: territory_color(&location.name),
                level: levels.get(&id).copied().unwrap_or(0),
                children: child_names(&forest, id),
                tier: location.tier(),
            }
        })
        .collect();

    Ok(order_and_cap(territories))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{point_in_polygon, polygon_area};

    const CANVAS: CanvasSize = CanvasSize::new(800.0, 600.0);

    fn square(x0: f64, y0: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + 1.0, y0),
            Point::new(x0 + 1.0, y0 + 1.0),
            Point::new(x0, y0 + 1.0),
        ]
    }

    fn triangle_map() -> (Vec<Location>, Vec<LayoutItem>) {
        let locs = vec![
            Location::new("A"),
            Location::new("B").with_parent("A"),
            Location::new("C").with_parent("B"),
        ];
        let layout = vec![
            LayoutItem::new("A", 380.0, 280.0),
            LayoutItem::new("B", 420.0, 290.0),
            LayoutItem::new("C", 400.0, 320.0),
        ];
        (locs, layout)
    }

    #[test]
    fn adjacent_cells_merge_into_one_outline() {
        let a = square(0.0, 0.0);
        let b = square(1.0, 0.0);
        let loops = boundary_loops(&[&a, &b]);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 6);
        assert!((polygon_area(&loops[0]).abs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn separate_cells_stay_separate() {
        let a = square(0.0, 0.0);
        let b = square(5.0, 5.0);
        let loops = boundary_loops(&[&a, &b]);
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| l.len() == 4));
    }

    #[test]
    fn nested_triangle_tessellates() {
        let (locs, layout) = triangle_map();
        let ts = generate_territories(&locs, &layout, CANVAS, &TessellationTuning::default()).unwrap();
        assert_eq!(ts.len(), 2);
        assert_eq!((ts[0].name.as_str(), ts[0].level), ("A", 0));
        assert_eq!((ts[1].name.as_str(), ts[1].level), ("B", 1));
        for t in &ts {
            assert!(t.polygon.len() >= 3);
            for p in &t.polygon {
                assert!(p.x >= -1e-6 && p.x <= CANVAS.width + 1e-6);
                assert!(p.y >= -1e-6 && p.y <= CANVAS.height + 1e-6);
            }
        }
        assert!(polygon_area(&ts[1].polygon).abs() <= polygon_area(&ts[0].polygon).abs());
        assert!(point_in_polygon(Point::new(380.0, 280.0), &ts[0].polygon));
        // Fillers far from the cluster stay unowned.
        assert!(polygon_area(&ts[0].polygon).abs() < CANVAS.width * CANVAS.height * 0.5);
    }

    #[test]
    fn output_is_deterministic() {
        let (locs, layout) = triangle_map();
        let tuning = TessellationTuning::default();
        let a = generate_territories(&locs, &layout, CANVAS, &tuning).unwrap();
        let b = generate_territories(&locs, &layout, CANVAS, &tuning).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fillers_keep_clear_of_real_points() {
        let (locs, layout) = triangle_map();
        let forest = LocationForest::build(&locs);
        let positions = positions_by_id(&forest, &layout);
        let owners: HashSet<usize> = territory_owners(&forest, &positions).into_iter().collect();
        let tuning = TessellationTuning::default();
        let seeds = seed_points(&forest, &positions, &owners, CANVAS, &tuning);
        let step = grid_step(CANVAS, &tuning);
        let (real, fillers) = seeds.split_at(3);
        assert!(real.iter().all(|s| s.tag.is_some()));
        for f in fillers {
            assert!(real.iter().all(|r| r.point.distance(f.point) >= FILLER_CLEARANCE * step));
        }
        assert!(fillers.iter().any(|f| f.tag.is_none()));
    }

    #[test]
    fn invalid_canvas_is_unavailable() {
        let (locs, layout) = triangle_map();
        let res = generate_territories(&locs, &layout, CanvasSize::new(0.0, 600.0), &TessellationTuning::default());
        assert!(matches!(res, Err(EngineError::TessellationUnavailable(_))));
    }

    #[test]
    fn sub_pixel_canvas_is_unavailable() {
        let (locs, layout) = triangle_map();
        let res = generate_territories(&locs, &layout, CanvasSize::new(0.8, 0.8), &TessellationTuning::default());
        assert!(matches!(res, Err(EngineError::TessellationUnavailable(_))));
        let res = generate_territories(&locs, &layout, CanvasSize::new(800.0, 1.0), &TessellationTuning::default());
        assert!(matches!(res, Err(EngineError::TessellationUnavailable(_))));
    }

    #[test]
    fn merged_outline_area_matches_owned_cells() {
        let (locs, layout) = triangle_map();
        let forest = LocationForest::build(&locs);
        let positions = positions_by_id(&forest, &layout);
        let owners: HashSet<usize> = territory_owners(&forest, &positions).into_iter().collect();
        let tuning = TessellationTuning::default();
        let seeds = seed_points(&forest, &positions, &owners, CANVAS, &tuning);
        let cells = voronoi_cells(&seeds, CANVAS).unwrap();

        let total: f64 = cells.iter().map(|c| polygon_area(c).abs()).sum();
        assert!((total - CANVAS.width * CANVAS.height).abs() < 1e-6 * total, "cells tile the canvas");

        let a = forest.id("A").unwrap();
        let owned: Vec<&[Point]> = seeds
            .iter()
            .zip(&cells)
            .filter(|(seed, _)| seed.tag.is_some())
            .map(|(_, cell)| cell.as_slice())
            .collect();
        assert!(owners.contains(&a) && owned.len() > 3);
        // Signed sums, so an enclosed unowned cell counts as a hole.
        let cell_area: f64 = owned.iter().map(|c| polygon_area(c)).sum();
        let loop_area: f64 = boundary_loops(&owned).iter().map(|l| polygon_area(l)).sum();
        assert!(
            (cell_area - loop_area).abs() <= 1e-9 * cell_area.abs(),
            "outline {loop_area} vs cells {cell_area}"
        );
    }

    #[test]
    fn no_owners_no_territories() {
        let locs = vec![Location::new("Lone")];
        let layout = vec![LayoutItem::new("Lone", 10.0, 10.0)];
        let ts = generate_territories(&locs, &layout, CANVAS, &TessellationTuning::default()).unwrap();
        assert!(ts.is_empty());
    }
}
