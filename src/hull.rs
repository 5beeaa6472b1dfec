//! Convex-hull territories.
//!
//! Each location that contains positioned descendants gets the convex
//! hull of those positions, padded outward by a tier-dependent margin.
//! Territories are built deepest level first and every parent hull also
//! takes in the vertices of its rendered children's outlines, so parent
//! outlines enclose their children's. Ancestors get extra margin for
//! every rendered level nested inside them.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use crate::geometry::{
    capsule, convex_hull, dedupe_points, expand_hull, farthest_pair, is_near_collinear,
    regular_polygon, CAPSULE_CAP_SEGMENTS, COLLINEAR_EPS, POINT_POLYGON_SIDES,
};
use crate::hierarchy::LocationForest;
use crate::territory::{
    child_names, levels_below, member_points, nesting_levels, order_and_cap, positions_by_id,
    territory_color, territory_owners,
};
use crate::types::{CanvasSize, HullTuning, LayoutItem, Location, Point, Territory, Tier};

/// Hull padding in pixels on the 1000px reference canvas.
pub fn tier_padding(tier: Tier) -> f64 {
    match tier {
        Tier::World => 60.0,
        Tier::Continent => 50.0,
        Tier::Kingdom => 40.0,
        Tier::Region => 30.0,
        Tier::City => 22.0,
        Tier::Site => 16.0,
        Tier::Building => 12.0,
    }
}

/// Padded outline around `points`.
///
/// One distinct point becomes a 12-gon of radius `padding`; two points
/// or a near-collinear set become a capsule; anything else is the
/// bisector-expanded convex hull. `None` only for an empty input.
pub fn hull_polygon(points: &[Point], padding: f64, dedupe_grid: f64) -> Option<Vec<Point>> {
    let pts = dedupe_points(points, dedupe_grid);
    match pts.len() {
        0 => None,
        1 => Some(regular_polygon(pts[0], padding, POINT_POLYGON_SIDES)),
        _ => {
            let hull = convex_hull(&pts);
            if hull.is_empty() {
                return None;
            }
            if hull.len() < 3 || is_near_collinear(&hull, COLLINEAR_EPS) {
                let (a, b) = farthest_pair(&hull)?;
                Some(capsule(a, b, padding, CAPSULE_CAP_SEGMENTS))
            } else {
                Some(expand_hull(&hull, padding))
            }
        }
    }
}

/// Build nested hull territories for every location that contains
/// positioned descendants.
pub fn generate_hull_territories(
    locations: &[Location],
    layout: &[LayoutItem],
    canvas: CanvasSize,
    tuning: &HullTuning,
) -> Vec<Territory> {
    if !canvas.is_valid() {
        return Vec::new();
    }
    let forest = LocationForest::build(locations);
    let positions = positions_by_id(&forest, layout);
    let total = positions.len();

    let candidates: Vec<(usize, Vec<Point>)> = territory_owners(&forest, &positions)
        .into_iter()
        .filter_map(|id| {
            let points = member_points(&forest, id, &positions);
            let descendants = points.len() - usize::from(positions.contains_key(&id));
            if points.len() < tuning.min_points.max(1) {
                debug!(owner = forest.name(id), points = points.len(), "too few points for a hull");
                return None;
            }
            if total >= tuning.share_floor && descendants as f64 > tuning.max_share * total as f64 {
                debug!(owner = forest.name(id), descendants, total, "hull would span most of the map");
                return None;
            }
            Some((id, points))
        })
        .collect();

    let rendered: Vec<usize> = candidates.iter().map(|(id, _)| *id).collect();
    let levels = nesting_levels(&forest, &rendered);
    let below = levels_below(&forest, &rendered, &levels);
    let scale = canvas.scale();

    // Parents wrap their rendered children's outlines, so build deepest first.
    let mut inner: HashMap<usize, Vec<Point>> = HashMap::new();
    let mut territories: Vec<Territory> = Vec::with_capacity(candidates.len());
    let deepest = levels.values().copied().max().unwrap_or(0);
    for level in (0..=deepest).rev() {
        let built: Vec<(Option<usize>, Territory)> = candidates
            .par_iter()
            .filter(|(id, _)| levels.get(id).copied().unwrap_or(0) == level)
            .filter_map(|(id, points)| {
                let location = forest.location(*id);
                let tier = location.tier();
                let nested = below.get(id).copied().unwrap_or(0) as f64;
                let padding = tier_padding(tier) * scale + tuning.nest_gap * scale * nested;
                let mut members = points.clone();
                if let Some(wrapped) = inner.get(id) {
                    members.extend_from_slice(wrapped);
                }
                let polygon = hull_polygon(&members, padding, tuning.dedupe_grid)?;
                let territory = Territory {
                    name: location.name.clone(),
                    polygon,
                    color: territory_color(&location.name),
                    level,
                    children: child_names(&forest, *id),
                    tier,
                };
                Some((rendered_parent(&forest, *id, &levels), territory))
            })
            .collect();
        for (parent, territory) in built {
            if let Some(parent) = parent {
                inner.entry(parent).or_default().extend_from_slice(&territory.polygon);
            }
            territories.push(territory);
        }
    }

    debug!(candidates = rendered.len(), territories = territories.len(), "hull territories built");
    order_and_cap(territories)
}

/// Nearest ancestor that is itself rendered.
fn rendered_parent(forest: &LocationForest<'_>, id: usize, levels: &HashMap<usize, u32>) -> Option<usize> {
    forest.ancestors(id).find(|a| levels.contains_key(a))
}
