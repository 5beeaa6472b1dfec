//! Data types matching the map-engine JSON schema.
//!
//! Every struct here derives Serialize + Deserialize so it can
//! round-trip through the JSON interchange format. Inputs come from
//! the analysis backend; outputs are plain geometry for a renderer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// -- Geometry ------------------------------------------------------

/// A position in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn max_side(&self) -> f64 {
        self.width.max(self.height)
    }

    /// Scale factor relative to the 1000px reference canvas that the
    /// tier paddings are tuned for.
    pub fn scale(&self) -> f64 {
        self.min_side() / 1000.0
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

// -- Locations -----------------------------------------------------

/// Ordinal scope of a location, largest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    World,
    Continent,
    Kingdom,
    Region,
    City,
    Site,
    Building,
}

impl Tier {
    /// Parse a free-form tier label. Unknown labels resolve to `Region`,
    /// the middle of the scale.
    pub fn parse(label: &str) -> Tier {
        match label.trim().to_ascii_lowercase().as_str() {
            "world" => Tier::World,
            "continent" => Tier::Continent,
            "kingdom" => Tier::Kingdom,
            "region" => Tier::Region,
            "city" => Tier::City,
            "site" => Tier::Site,
            "building" => Tier::Building,
            _ => Tier::Region,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            tier: None,
            kind: None,
            icon: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn tier(&self) -> Tier {
        self.tier.as_deref().map(Tier::parse).unwrap_or(Tier::Region)
    }
}

fn is_false(v: &bool) -> bool {
    !v
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutItem {
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_portal: bool,
}

impl LayoutItem {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            is_portal: false,
        }
    }

    pub fn portal(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            is_portal: true,
            ..Self::new(name, x, y)
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

// -- Territories ---------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TerritoryStrategy {
    #[default]
    Hull,
    Tessellation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub name: String,
    /// Closed ring; the first point is not repeated at the end.
    pub polygon: Vec<Point>,
    pub color: String,
    pub level: u32,
    #[serde(default)]
    pub children: Vec<String>,
    pub tier: Tier,
}

// -- Terrain decoration --------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainCategory {
    Mountain,
    Water,
    Forest,
    Desert,
    Cave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDef {
    pub id: String,
    pub category: TerrainCategory,
    /// Square view box edge length the paths are drawn in.
    pub view_box: f64,
    /// SVG path data, one entry per sub-shape.
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainHint {
    pub symbol: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    /// Degrees.
    pub rotation: f64,
    pub opacity: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TerrainLayer {
    pub symbols: Vec<SymbolDef>,
    pub hints: Vec<TerrainHint>,
}

// -- Labels --------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnealItem {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub icon_size: f64,
    pub label_width: f64,
    pub label_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

/// Fixed label positions around an icon, in warm-start preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    Bottom,
    Right,
    TopRight,
    Top,
    TopLeft,
    Left,
    BottomLeft,
    BottomRight,
}

impl Anchor {
    pub const ALL: [Anchor; 8] = [
        Anchor::Bottom,
        Anchor::Right,
        Anchor::TopRight,
        Anchor::Top,
        Anchor::TopLeft,
        Anchor::Left,
        Anchor::BottomLeft,
        Anchor::BottomRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Anchor {
        Anchor::ALL[i % Anchor::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnealPlacement {
    pub anchor: Anchor,
    pub dx: f64,
    pub dy: f64,
    pub text_anchor: TextAlign,
}

// -- Tuning --------------------------------------------------------

fn default_min_points() -> usize {
    2
}
fn default_max_share() -> f64 {
    0.5
}
fn default_share_floor() -> usize {
    8
}
fn default_nest_gap() -> f64 {
    8.0
}
fn default_dedupe_grid() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HullTuning {
    #[serde(default = "default_min_points")]
    pub min_points: usize,
    #[serde(default = "default_max_share")]
    pub max_share: f64,
    #[serde(default = "default_share_floor")]
    pub share_floor: usize,
    #[serde(default = "default_nest_gap")]
    pub nest_gap: f64,
    #[serde(default = "default_dedupe_grid")]
    pub dedupe_grid: f64,
}

impl Default for HullTuning {
    fn default() -> Self {
        Self {
            min_points: default_min_points(),
            max_share: default_max_share(),
            share_floor: default_share_floor(),
            nest_gap: default_nest_gap(),
            dedupe_grid: default_dedupe_grid(),
        }
    }
}

fn default_grid_divisions() -> u32 {
    14
}
fn default_jitter() -> f64 {
    0.3
}
fn default_locality_factor() -> f64 {
    6.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TessellationTuning {
    #[serde(default = "default_grid_divisions")]
    pub grid_divisions: u32,
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    #[serde(default = "default_locality_factor")]
    pub locality_factor: f64,
    #[serde(default)]
    pub seed: u32,
}

impl Default for TessellationTuning {
    fn default() -> Self {
        Self {
            grid_divisions: default_grid_divisions(),
            jitter: default_jitter(),
            locality_factor: default_locality_factor(),
            seed: 0,
        }
    }
}

fn default_segments() -> usize {
    16
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistortParams {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_segments")]
    pub segments: usize,
    #[serde(default)]
    pub seed: u32,
}

impl Default for DistortParams {
    fn default() -> Self {
        Self {
            enabled: true,
            segments: default_segments(),
            seed: 0,
        }
    }
}

fn default_max_hints() -> usize {
    900
}
fn default_exclusion_radius() -> f64 {
    18.0
}
fn default_margin() -> f64 {
    10.0
}
fn default_cluster_chance() -> f64 {
    0.35
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainTuning {
    #[serde(default = "default_max_hints")]
    pub max_hints: usize,
    #[serde(default = "default_exclusion_radius")]
    pub exclusion_radius: f64,
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default = "default_cluster_chance")]
    pub cluster_chance: f64,
}

impl Default for TerrainTuning {
    fn default() -> Self {
        Self {
            max_hints: default_max_hints(),
            exclusion_radius: default_exclusion_radius(),
            margin: default_margin(),
            cluster_chance: default_cluster_chance(),
        }
    }
}

fn default_iterations() -> u32 {
    5000
}
fn default_initial_temperature() -> f64 {
    1.0
}
fn default_cooling() -> f64 {
    0.995
}
fn default_min_temperature() -> f64 {
    0.001
}
fn default_yield_interval() -> u32 {
    500
}
fn default_font_size() -> f64 {
    12.0
}
fn default_anneal_seed() -> u64 {
    42
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnealParams {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,
    #[serde(default = "default_cooling")]
    pub cooling: f64,
    #[serde(default = "default_min_temperature")]
    pub min_temperature: f64,
    #[serde(default = "default_yield_interval")]
    pub yield_interval: u32,
    /// Used for items that carry no font size of their own.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_anneal_seed")]
    pub seed: u64,
}

impl Default for AnnealParams {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            initial_temperature: default_initial_temperature(),
            cooling: default_cooling(),
            min_temperature: default_min_temperature(),
            yield_interval: default_yield_interval(),
            font_size: default_font_size(),
            seed: default_anneal_seed(),
        }
    }
}

// -- Engine I/O ----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapParams {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub layout: Vec<LayoutItem>,
    pub canvas: CanvasSize,
    #[serde(default)]
    pub strategy: TerritoryStrategy,
    #[serde(default)]
    pub dark_background: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<AnnealItem>>,
    #[serde(default)]
    pub hull: HullTuning,
    #[serde(default)]
    pub tessellation: TessellationTuning,
    #[serde(default)]
    pub distort: DistortParams,
    #[serde(default)]
    pub terrain: TerrainTuning,
    #[serde(default)]
    pub anneal: AnnealParams,
}

impl MapParams {
    pub fn new(locations: Vec<Location>, layout: Vec<LayoutItem>, canvas: CanvasSize) -> Self {
        Self {
            locations,
            layout,
            canvas,
            strategy: TerritoryStrategy::default(),
            dark_background: false,
            labels: None,
            hull: HullTuning::default(),
            tessellation: TessellationTuning::default(),
            distort: DistortParams::default(),
            terrain: TerrainTuning::default(),
            anneal: AnnealParams::default(),
        }
    }
}

/// Standalone label-annealing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRequest {
    pub items: Vec<AnnealItem>,
    #[serde(default)]
    pub params: AnnealParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapResult {
    pub territories: Vec<Territory>,
    /// The strategy that actually produced `territories`; differs from
    /// the requested one when tessellation fell back to hulls.
    pub strategy: TerritoryStrategy,
    pub terrain: TerrainLayer,
    #[serde(default)]
    pub labels: BTreeMap<String, AnnealPlacement>,
}

// -- Tests ---------------------------------------------------------
