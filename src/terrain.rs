//! Decorative terrain scatter.
//!
//! Locations whose icon or type reads as mountain, water, forest,
//! desert or cave get a cloud of small glyphs around them. Budgets are
//! per tier, capped globally, and every random draw comes from the
//! stateless noise hash so a map always decorates the same way.

use std::collections::HashSet;
use std::f64::consts::TAU;

use rayon::prelude::*;
use tracing::debug;

use crate::noise::{hash_str, seeded_random};
use crate::types::{
    CanvasSize, LayoutItem, Location, Point, SymbolDef, TerrainCategory, TerrainHint, TerrainLayer,
    TerrainTuning, Tier,
};

/// Edge length of the square every symbol is drawn in.
pub const SYMBOL_VIEW_BOX: f64 = 24.0;
const LIGHT_OPACITY: f64 = 0.5;
const DARK_OPACITY: f64 = 0.35;
const MAX_ROTATION_DEG: f64 = 15.0;

// Random channels, mixed into the per-glyph seed.
const CH_ANGLE: f64 = 0.0;
const CH_RADIUS: f64 = 1.0;
const CH_SIZE: f64 = 2.0;
const CH_ROTATION: f64 = 3.0;
const CH_OPACITY: f64 = 4.0;
const CH_CLUSTER: f64 = 5.0;
const CH_VARIANT: f64 = 6.0;

// -- Classification ------------------------------------------------

const KEYWORDS: [(TerrainCategory, &[&str]); 5] = [
    (TerrainCategory::Cave, &["cave", "cavern", "grotto", "洞", "窟"]),
    (
        TerrainCategory::Water,
        &[
            "river", "lake", "sea", "ocean", "spring", "pond", "stream", "bay", "河", "湖", "海", "泉",
            "潭", "溪", "池",
        ],
    ),
    (
        TerrainCategory::Mountain,
        &["mountain", "peak", "ridge", "cliff", "hill", "山", "峰", "岭", "崖", "岩"],
    ),
    (TerrainCategory::Forest, &["forest", "wood", "grove", "jungle", "林", "森", "丛", "木"]),
    (TerrainCategory::Desert, &["desert", "dune", "waste", "sand", "沙", "漠", "荒"]),
];

/// Terrain category of a location, from its icon first and then from
/// keywords in its type string.
pub fn classify(location: &Location) -> Option<TerrainCategory> {
    if let Some(icon) = location.icon.as_deref() {
        let category = match icon.trim().to_ascii_lowercase().as_str() {
            "mountain" => Some(TerrainCategory::Mountain),
            "water" => Some(TerrainCategory::Water),
            "forest" => Some(TerrainCategory::Forest),
            "desert" => Some(TerrainCategory::Desert),
            "cave" => Some(TerrainCategory::Cave),
            _ => None,
        };
        if category.is_some() {
            return category;
        }
    }
    let kind = location.kind.as_deref()?.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| kind.contains(*w)))
        .map(|(category, _)| *category)
}

/// Glyph count, spread radius and base glyph size for a tier.
pub fn tier_budget(tier: Tier) -> (usize, f64, f64) {
    match tier {
        Tier::World => (50, 160.0, 16.0),
        Tier::Continent => (40, 140.0, 14.0),
        Tier::Kingdom => (28, 110.0, 12.0),
        Tier::Region => (18, 80.0, 11.0),
        Tier::City => (10, 50.0, 9.0),
        Tier::Site => (6, 35.0, 8.0),
        Tier::Building => (4, 30.0, 7.0),
    }
}

pub fn category_color(category: TerrainCategory, dark_background: bool) -> &'static str {
    match (category, dark_background) {
        (TerrainCategory::Mountain, false) => "#8B7765",
        (TerrainCategory::Mountain, true) => "#B8A58F",
        (TerrainCategory::Water, false) => "#4682B4",
        (TerrainCategory::Water, true) => "#7FB3E0",
        (TerrainCategory::Forest, false) => "#228B22",
        (TerrainCategory::Forest, true) => "#6FBF6F",
        (TerrainCategory::Desert, false) => "#D2B48C",
        (TerrainCategory::Desert, true) => "#E6CFA3",
        (TerrainCategory::Cave, false) => "#6B5B4B",
        (TerrainCategory::Cave, true) => "#A89A8A",
    }
}

// -- Symbols -------------------------------------------------------

struct Glyph {
    id: &'static str,
    category: TerrainCategory,
    paths: &'static [&'static str],
}

/// Symbol catalogue. Each category has two single shapes; mountain and
/// forest also have a cluster.
const GLYPHS: [Glyph; 12] = [
    Glyph {
        id: "mountain-1",
        category: TerrainCategory::Mountain,
        paths: &["M2 20 L12 4 L22 20 Z", "M9 9 L12 4 L15 9 L13.5 8 L12 9.5 L10.5 8 Z"],
    },
    Glyph {
        id: "mountain-2",
        category: TerrainCategory::Mountain,
        paths: &["M1 20 L8 9 L12 14 L16 6 L23 20 Z"],
    },
    Glyph {
        id: "mountain-cluster",
        category: TerrainCategory::Mountain,
        paths: &["M0 21 L6 11 L12 21 Z", "M6 21 L13 5 L20 21 Z", "M14 21 L19 12 L24 21 Z"],
    },
    Glyph {
        id: "wave-1",
        category: TerrainCategory::Water,
        paths: &["M2 13 Q5 9 8 13 T14 13 T20 13"],
    },
    Glyph {
        id: "wave-2",
        category: TerrainCategory::Water,
        paths: &["M2 10 Q5 7 8 10 T14 10 T20 10", "M4 16 Q7 13 10 16 T16 16 T22 16"],
    },
    Glyph {
        id: "tree-1",
        category: TerrainCategory::Forest,
        paths: &["M12 3 L19 15 L5 15 Z", "M11 15 L13 15 L13 21 L11 21 Z"],
    },
    Glyph {
        id: "tree-2",
        category: TerrainCategory::Forest,
        paths: &["M12 3 C18 3 19 13 12 15 C5 13 6 3 12 3 Z", "M11 15 L13 15 L13 21 L11 21 Z"],
    },
    Glyph {
        id: "forest-cluster",
        category: TerrainCategory::Forest,
        paths: &["M6 5 L11 15 L1 15 Z", "M17 3 L23 14 L11 14 Z", "M12 9 L17 20 L7 20 Z"],
    },
    Glyph {
        id: "dune-1",
        category: TerrainCategory::Desert,
        paths: &["M1 16 Q9 8 17 16 Q20 14 23 16"],
    },
    Glyph {
        id: "dune-2",
        category: TerrainCategory::Desert,
        paths: &["M1 18 Q7 12 13 18", "M9 12 Q15 6 22 12"],
    },
    Glyph {
        id: "cave-1",
        category: TerrainCategory::Cave,
        paths: &["M3 20 Q12 2 21 20 Z", "M9 20 Q12 12 15 20 Z"],
    },
    Glyph {
        id: "cave-2",
        category: TerrainCategory::Cave,
        paths: &["M2 20 L7 9 L12 6 L18 10 L22 20 Z", "M10 20 Q12 14 14 20 Z"],
    },
];

fn variants(category: TerrainCategory) -> ([&'static str; 2], Option<&'static str>) {
    match category {
        TerrainCategory::Mountain => (["mountain-1", "mountain-2"], Some("mountain-cluster")),
        TerrainCategory::Water => (["wave-1", "wave-2"], None),
        TerrainCategory::Forest => (["tree-1", "tree-2"], Some("forest-cluster")),
        TerrainCategory::Desert => (["dune-1", "dune-2"], None),
        TerrainCategory::Cave => (["cave-1", "cave-2"], None),
    }
}

/// Definitions for the given symbol ids, in catalogue order.
pub fn symbol_defs(used: &HashSet<&str>) -> Vec<SymbolDef> {
    GLYPHS
        .iter()
        .filter(|g| used.contains(g.id))
        .map(|g| SymbolDef {
            id: g.id.to_string(),
            category: g.category,
            view_box: SYMBOL_VIEW_BOX,
            paths: g.paths.iter().map(|p| p.to_string()).collect(),
        })
        .collect()
}

// -- Scatter -------------------------------------------------------

#[derive(Debug, Clone)]
struct Scatter {
    center: Point,
    category: TerrainCategory,
    count: usize,
    spread: f64,
    base_size: f64,
    seed: f64,
}

/// Scale every budget down by the same factor so the total fits `cap`.
fn cap_budgets(scatters: &mut [Scatter], cap: usize) {
    let total: usize = scatters.iter().map(|s| s.count).sum();
    if total <= cap {
        return;
    }
    let factor = cap as f64 / total as f64;
    for s in scatters.iter_mut() {
        s.count = (s.count as f64 * factor).floor() as usize;
    }
    debug!(total, cap, factor, "terrain budgets scaled down");
}

fn scatter_hints(
    s: &Scatter,
    canvas: CanvasSize,
    dark_background: bool,
    tuning: &TerrainTuning,
    occupied: &[Point],
) -> Vec<TerrainHint> {
    let (singles, cluster) = variants(s.category);
    let color = category_color(s.category, dark_background);
    let base_opacity = if dark_background { DARK_OPACITY } else { LIGHT_OPACITY };
    let exclusion_sq = tuning.exclusion_radius * tuning.exclusion_radius;

    let mut hints = Vec::with_capacity(s.count);
    for i in 0..s.count {
        let rand = |channel: f64| seeded_random(s.seed + i as f64 * 17.0 + channel * 3.7);
        let angle = rand(CH_ANGLE) * TAU;
        let radius = s.spread * (0.3 + 0.7 * rand(CH_RADIUS).sqrt());
        let p = Point::new(s.center.x + radius * angle.cos(), s.center.y + radius * angle.sin());

        if p.x < tuning.margin
            || p.y < tuning.margin
            || p.x > canvas.width - tuning.margin
            || p.y > canvas.height - tuning.margin
        {
            continue;
        }
        if occupied.iter().any(|o| o.distance_sq(p) < exclusion_sq) {
            continue;
        }

        let symbol = match cluster {
            Some(id) if rand(CH_CLUSTER) < tuning.cluster_chance => id,
            _ => singles[usize::from(rand(CH_VARIANT) >= 0.5)],
        };
        hints.push(TerrainHint {
            symbol: symbol.to_string(),
            x: p.x,
            y: p.y,
            size: s.base_size * (0.5 + 0.5 * rand(CH_SIZE)),
            rotation: (rand(CH_ROTATION) * 2.0 - 1.0) * MAX_ROTATION_DEG,
            opacity: base_opacity * (0.6 + 0.4 * rand(CH_OPACITY)),
            color: color.to_string(),
        });
    }
    hints
}

/// Scatter terrain glyphs around every terrain-typed, positioned
/// location. The returned symbol list holds only the shapes the hints
/// reference.
pub fn generate_terrain_hints(
    locations: &[Location],
    layout: &[LayoutItem],
    canvas: CanvasSize,
    dark_background: bool,
    tuning: &TerrainTuning,
) -> TerrainLayer {
    if !canvas.is_valid() {
        return TerrainLayer::default();
    }
    let real: Vec<&LayoutItem> = layout
        .iter()
        .filter(|item| !item.is_portal && item.x.is_finite() && item.y.is_finite())
        .collect();
    let occupied: Vec<Point> = real.iter().map(|item| item.point()).collect();

    let mut seen = HashSet::new();
    let mut scatters: Vec<Scatter> = locations
        .iter()
        .filter(|loc| seen.insert(loc.name.as_str()))
        .filter_map(|loc| {
            let category = classify(loc)?;
            let item = real.iter().find(|item| item.name == loc.name)?;
            let (count, spread, base_size) = tier_budget(loc.tier());
            Some(Scatter {
                center: item.point(),
                category,
                count,
                spread,
                base_size,
                seed: (hash_str(&loc.name) % 100_000) as f64,
            })
        })
        .collect();
    cap_budgets(&mut scatters, tuning.max_hints);

    let mut hints: Vec<TerrainHint> = scatters
        .par_iter()
        .map(|s| scatter_hints(s, canvas, dark_background, tuning, &occupied))
        .flatten()
        .collect();
    hints.truncate(tuning.max_hints);

    let used: HashSet<&str> = hints.iter().map(|h| h.symbol.as_str()).collect();
    let symbols = symbol_defs(&used);
    debug!(
        sources = scatters.len(),
        hints = hints.len(),
        symbols = symbols.len(),
        "terrain scattered"
    );
    TerrainLayer { symbols, hints }
}
