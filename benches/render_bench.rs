//! Criterion benchmarks for the atlas map engine.
//!
//! Run with: `cargo bench`
//!
//! Maps are synthesized deterministically so every run measures the
//! same workload.

use std::ops::ControlFlow;

use atlas_rs::generate::render_map;
use atlas_rs::hull::generate_hull_territories;
use atlas_rs::labels::anneal_labels;
use atlas_rs::terrain::generate_terrain_hints;
use atlas_rs::tessellation::generate_territories;
use atlas_rs::types::{
    AnnealItem, AnnealParams, CanvasSize, HullTuning, LayoutItem, Location, MapParams,
    TerrainTuning, TessellationTuning, TerritoryStrategy,
};
use criterion::{criterion_group, criterion_main, Criterion};

const CANVAS: CanvasSize = CanvasSize::new(1200.0, 900.0);

/// 4 kingdoms x 4 regions x 5 sites, laid out in clusters.
fn synthetic_map() -> (Vec<Location>, Vec<LayoutItem>) {
    let mut locations = Vec::new();
    let mut layout = Vec::new();
    for k in 0..4 {
        let kingdom = format!("Kingdom {k}");
        let kx = 250.0 + 600.0 * (k % 2) as f64;
        let ky = 200.0 + 450.0 * (k / 2) as f64;
        locations.push(Location::new(kingdom.clone()).with_tier("kingdom"));
        layout.push(LayoutItem::new(kingdom.clone(), kx, ky));
        for r in 0..4 {
            let region = format!("Region {k}.{r}");
            let rx = kx + 110.0 * ((r % 2) as f64 - 0.5);
            let ry = ky + 110.0 * ((r / 2) as f64 - 0.5);
            let icon = ["mountain", "forest", "water", "desert"][r];
            locations.push(
                Location::new(region.clone())
                    .with_parent(kingdom.clone())
                    .with_tier("region")
                    .with_icon(icon),
            );
            layout.push(LayoutItem::new(region.clone(), rx, ry));
            for s in 0..5 {
                let site = format!("Site {k}.{r}.{s}");
                let angle = s as f64 * 1.256;
                locations.push(Location::new(site.clone()).with_parent(region.clone()).with_tier("site"));
                layout.push(LayoutItem::new(site, rx + 35.0 * angle.cos(), ry + 35.0 * angle.sin()));
            }
        }
    }
    (locations, layout)
}

fn label_items(layout: &[LayoutItem]) -> Vec<AnnealItem> {
    layout
        .iter()
        .map(|item| AnnealItem {
            name: item.name.clone(),
            x: item.x,
            y: item.y,
            icon_size: 14.0,
            label_width: 7.0 * item.name.len() as f64,
            label_height: 14.0,
            font_size: None,
        })
        .collect()
}

fn bench_hull(c: &mut Criterion) {
    let (locations, layout) = synthetic_map();
    let tuning = HullTuning::default();
    c.bench_function("hull_territories_84", |b| {
        b.iter(|| generate_hull_territories(&locations, &layout, CANVAS, &tuning));
    });
}

fn bench_tessellation(c: &mut Criterion) {
    let (locations, layout) = synthetic_map();
    let tuning = TessellationTuning::default();
    c.bench_function("tessellation_territories_84", |b| {
        b.iter(|| generate_territories(&locations, &layout, CANVAS, &tuning));
    });
}

fn bench_terrain(c: &mut Criterion) {
    let (locations, layout) = synthetic_map();
    let tuning = TerrainTuning::default();
    c.bench_function("terrain_hints_84", |b| {
        b.iter(|| generate_terrain_hints(&locations, &layout, CANVAS, false, &tuning));
    });
}

fn bench_labels(c: &mut Criterion) {
    let (_, layout) = synthetic_map();
    let items = label_items(&layout);
    let params = AnnealParams::default();
    c.bench_function("anneal_labels_84", |b| {
        b.iter(|| anneal_labels(&items, &params, |_| ControlFlow::Continue(())));
    });
}

fn bench_render(c: &mut Criterion) {
    let (locations, layout) = synthetic_map();
    let mut params = MapParams::new(locations, layout.clone(), CANVAS);
    params.labels = Some(label_items(&layout));
    c.bench_function("render_map_hull", |b| {
        b.iter(|| render_map(&params));
    });
    params.strategy = TerritoryStrategy::Tessellation;
    c.bench_function("render_map_tessellation", |b| {
        b.iter(|| render_map(&params));
    });
}

criterion_group!(
    benches,
    bench_hull,
    bench_tessellation,
    bench_terrain,
    bench_labels,
    bench_render
);
criterion_main!(benches);
