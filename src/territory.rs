//! Shared territory assembly for both generators: which locations own
//! a territory, how deep each one nests, colors, draw order and the
//! density-based depth cap.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::hierarchy::LocationForest;
use crate::types::{
    CanvasSize, HullTuning, LayoutItem, Location, Point, TessellationTuning, Territory, TerritoryStrategy,
};

/// Fill palette, picked by a stable hash of the owner name.
const PALETTE: [&str; 10] = [
    "#6699CC", "#CC9966", "#CC6666", "#66AA99", "#9966AA", "#AA9955", "#5F9EA0", "#B07AA1",
    "#8FA35A", "#D08C60",
];

pub fn territory_color(name: &str) -> String {
    PALETTE[crate::noise::hash_str(name) as usize % PALETTE.len()].to_string()
}

/// Deepest level still drawn for a map with `count` territories.
pub fn max_level_for(count: usize) -> u32 {
    if count > 50 {
        2
    } else if count > 30 {
        3
    } else {
        5
    }
}

/// Canvas position of every located, non-portal forest node.
pub(crate) fn positions_by_id(forest: &LocationForest<'_>, layout: &[LayoutItem]) -> HashMap<usize, Point> {
    let mut out = HashMap::with_capacity(layout.len());
    for item in layout {
        if item.is_portal || !item.x.is_finite() || !item.y.is_finite() {
            continue;
        }
        if let Some(id) = forest.id(&item.name) {
            out.entry(id).or_insert_with(|| item.point());
        }
    }
    out
}

/// Locations with at least one positioned descendant, in input order.
pub(crate) fn territory_owners(forest: &LocationForest<'_>, positions: &HashMap<usize, Point>) -> Vec<usize> {
    forest
        .ids()
        .filter(|&id| {
            !forest.children(id).is_empty()
                && forest.descendants(id).iter().any(|d| positions.contains_key(d))
        })
        .collect()
}

/// Owner position (if any) followed by every positioned descendant.
pub(crate) fn member_points(forest: &LocationForest<'_>, owner: usize, positions: &HashMap<usize, Point>) -> Vec<Point> {
    std::iter::once(owner)
        .chain(forest.descendants(owner))
        .filter_map(|id| positions.get(&id).copied())
        .collect()
}

/// Number of ancestors of each rendered owner that are rendered too.
pub(crate) fn nesting_levels(forest: &LocationForest<'_>, rendered: &[usize]) -> HashMap<usize, u32> {
    let set: HashSet<usize> = rendered.iter().copied().collect();
    rendered
        .iter()
        .map(|&id| {
            let level = forest.ancestors(id).filter(|a| set.contains(a)).count() as u32;
            (id, level)
        })
        .collect()
}

/// How many rendered levels sit below each rendered owner.
pub(crate) fn levels_below(
    forest: &LocationForest<'_>,
    rendered: &[usize],
    levels: &HashMap<usize, u32>,
) -> HashMap<usize, u32> {
    rendered
        .iter()
        .map(|&id| {
            let own = levels.get(&id).copied().unwrap_or(0);
            let deepest = forest
                .descendants(id)
                .iter()
                .filter_map(|d| levels.get(d).copied())
                .max()
                .unwrap_or(own);
            (id, deepest.saturating_sub(own))
        })
        .collect()
}

pub(crate) fn child_names(forest: &LocationForest<'_>, id: usize) -> Vec<String> {
    forest.children(id).iter().map(|&c| forest.name(c).to_string()).collect()
}

/// Outermost first, then drop levels beyond the density cap.
pub(crate) fn order_and_cap(mut territories: Vec<Territory>) -> Vec<Territory> {
    territories.sort_by_key(|t| t.level);
    let max_level = max_level_for(territories.len());
    let before = territories.len();
    territories.retain(|t| t.level <= max_level);
    if territories.len() < before {
        debug!(
            hidden = before - territories.len(),
            max_level, "nested territories hidden by depth cap"
        );
    }
    territories
}

/// Run the requested generator. Tessellation failures fall back to
/// hulls; the returned strategy is the one that produced the output.
pub fn generate_territories_for(
    strategy: TerritoryStrategy,
    locations: &[Location],
    layout: &[LayoutItem],
    canvas: CanvasSize,
    hull: &HullTuning,
    tessellation: &TessellationTuning,
) -> (Vec<Territory>, TerritoryStrategy) {
    match strategy {
        TerritoryStrategy::Hull => (
            crate::hull::generate_hull_territories(locations, layout, canvas, hull),
            TerritoryStrategy::Hull,
        ),
        TerritoryStrategy::Tessellation => {
            match crate::tessellation::generate_territories(locations, layout, canvas, tessellation) {
                Ok(territories) => (territories, TerritoryStrategy::Tessellation),
                Err(err) => {
                    warn!(error = %err, "falling back to hull territories");
                    (
                        crate::hull::generate_hull_territories(locations, layout, canvas, hull),
                        TerritoryStrategy::Hull,
                    )
                }
            }
        }
    }
}
