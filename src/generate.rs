//! Map rendering pipeline: territories, edge distortion, terrain and
//! labels from one `MapParams`.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use rayon::prelude::*;
use tracing::{info, info_span};

use crate::distort::distort_polygon;
use crate::error::EngineError;
use crate::labels::anneal_labels;
use crate::terrain::generate_terrain_hints;
use crate::territory::generate_territories_for;
use crate::types::{LabelRequest, MapParams, MapResult};

pub fn render_map(params: &MapParams) -> Result<MapResult, EngineError> {
    let canvas = params.canvas;
    if !canvas.is_valid() {
        return Err(EngineError::InvalidCanvas {
            width: canvas.width,
            height: canvas.height,
        });
    }
    let _span = info_span!(
        "render_map",
        locations = params.locations.len(),
        strategy = ?params.strategy
    )
    .entered();

    let (mut territories, strategy) = generate_territories_for(
        params.strategy,
        &params.locations,
        &params.layout,
        canvas,
        &params.hull,
        &params.tessellation,
    );

    if params.distort.enabled {
        let distort = &params.distort;
        territories.par_iter_mut().for_each(|t| {
            t.polygon = distort_polygon(&t.polygon, canvas, distort.segments, distort.seed);
        });
    }

    let terrain = generate_terrain_hints(
        &params.locations,
        &params.layout,
        canvas,
        params.dark_background,
        &params.terrain,
    );

    let labels = match &params.labels {
        Some(items) => anneal_labels(items, &params.anneal, |_| ControlFlow::Continue(())),
        None => BTreeMap::new(),
    };

    info!(
        territories = territories.len(),
        strategy = ?strategy,
        hints = terrain.hints.len(),
        labels = labels.len(),
        "map rendered"
    );

    Ok(MapResult {
        territories,
        strategy,
        terrain,
        labels,
    })
}

/// Parse `MapParams` JSON, render, and serialize the `MapResult`.
pub fn render_map_json(params_json: &str) -> Result<String, EngineError> {
    let params: MapParams = serde_json::from_str(params_json).map_err(EngineError::InvalidParams)?;
    let result = render_map(&params)?;
    serde_json::to_string(&result).map_err(EngineError::Serialize)
}

/// Parse a `LabelRequest`, anneal, and serialize the placement map.
pub fn anneal_labels_json(request_json: &str) -> Result<String, EngineError> {
    let request: LabelRequest = serde_json::from_str(request_json).map_err(EngineError::InvalidParams)?;
    let placements = anneal_labels(&request.items, &request.params, |_| ControlFlow::Continue(()));
    serde_json::to_string(&placements).map_err(EngineError::Serialize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Anchor, AnnealItem, AnnealPlacement, CanvasSize, LayoutItem, Location, TerritoryStrategy,
    };

    fn make_params() -> MapParams {
        let locations = vec![
            Location::new("Aldmere").with_tier("kingdom"),
            Location::new("Greyspire").with_parent("Aldmere").with_icon("mountain").with_tier("region"),
            Location::new("Tarn").with_parent("Greyspire").with_kind("lake").with_tier("site"),
            Location::new("Harrow").with_parent("Aldmere").with_tier("city"),
        ];
        let layout = vec![
            LayoutItem::new("Aldmere", 400.0, 300.0),
            LayoutItem::new("Greyspire", 300.0, 250.0),
            LayoutItem::new("Tarn", 330.0, 200.0),
            LayoutItem::new("Harrow", 520.0, 380.0),
        ];
        MapParams::new(locations, layout, CanvasSize::new(800.0, 600.0))
    }

    fn label_items() -> Vec<AnnealItem> {
        ["Aldmere", "Greyspire", "Tarn", "Harrow"]
            .iter()
            .zip([(400.0, 300.0), (300.0, 250.0), (330.0, 200.0), (520.0, 380.0)])
            .map(|(name, (x, y))| AnnealItem {
                name: name.to_string(),
                x,
                y,
                icon_size: 16.0,
                label_width: 60.0,
                label_height: 14.0,
                font_size: None,
            })
            .collect()
    }

    #[test]
    fn deterministic() {
        let mut params = make_params();
        params.labels = Some(label_items());
        let j1 = serde_json::to_string(&render_map(&params).unwrap()).unwrap();
        let j2 = serde_json::to_string(&render_map(&params).unwrap()).unwrap();
        assert_eq!(j1, j2);
    }

    #[test]
    fn hull_map_is_distorted() {
        let params = make_params();
        let result = render_map(&params).unwrap();
        assert_eq!(result.strategy, TerritoryStrategy::Hull);
        let names: Vec<&str> = result.territories.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Aldmere", "Greyspire"]);
        assert_eq!(result.territories[1].level, 1);
        for t in &result.territories {
            assert_eq!(t.polygon.len() % (params.distort.segments + 1), 0);
        }
        assert!(!result.terrain.hints.is_empty());
        assert!(result.labels.is_empty());
    }

    #[test]
    fn distortion_can_be_disabled() {
        let mut params = make_params();
        params.distort.enabled = false;
        let plain = render_map(&params).unwrap();
        params.distort.enabled = true;
        let wobbly = render_map(&params).unwrap();
        for (a, b) in plain.territories.iter().zip(&wobbly.territories) {
            assert!(b.polygon.len() > a.polygon.len());
            // Original vertices survive distortion.
            for v in &a.polygon {
                assert!(b.polygon.contains(v));
            }
        }
    }

    #[test]
    fn tessellation_strategy() {
        let mut params = make_params();
        params.strategy = TerritoryStrategy::Tessellation;
        let result = render_map(&params).unwrap();
        assert_eq!(result.strategy, TerritoryStrategy::Tessellation);
        assert_eq!(result.territories.len(), 2);
        assert!(result.territories.windows(2).all(|w| w[0].level <= w[1].level));
    }

    #[test]
    fn tiny_canvas_tessellation_falls_back_to_hulls() {
        let mut params = make_params();
        params.strategy = TerritoryStrategy::Tessellation;
        params.canvas = CanvasSize::new(0.8, 0.8);
        let result = render_map(&params).unwrap();
        assert_eq!(result.strategy, TerritoryStrategy::Hull);
    }

    #[test]
    fn labels_cover_every_item() {
        let mut params = make_params();
        params.labels = Some(label_items());
        let result = render_map(&params).unwrap();
        assert_eq!(result.labels.len(), 4);
    }

    #[test]
    fn invalid_canvas_is_rejected() {
        let mut params = make_params();
        params.canvas = CanvasSize::new(-1.0, 600.0);
        assert!(matches!(render_map(&params), Err(EngineError::InvalidCanvas { .. })));
    }

    #[test]
    fn json_entry_point() {
        let json = r#"{
            "locations": [
                {"name": "A"},
                {"name": "B", "parent": "A"},
                {"name": "C", "parent": "B"}
            ],
            "layout": [
                {"name": "A", "x": 380.0, "y": 280.0},
                {"name": "B", "x": 420.0, "y": 290.0},
                {"name": "C", "x": 400.0, "y": 320.0}
            ],
            "canvas": {"width": 800.0, "height": 600.0}
        }"#;
        let out = render_map_json(json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["strategy"], "hull");
        assert_eq!(value["territories"].as_array().unwrap().len(), 2);
        assert_eq!(value["territories"][0]["name"], "A");
        assert_eq!(value["territories"][1]["level"], 1);
    }

    #[test]
    fn bad_json_is_invalid_params() {
        assert!(matches!(render_map_json("{not json"), Err(EngineError::InvalidParams(_))));
        assert!(matches!(anneal_labels_json("[]"), Err(EngineError::InvalidParams(_))));
    }

    #[test]
    fn label_json_entry_point() {
        let json = r#"{
            "items": [
                {"name": "A", "x": 100, "y": 100, "icon_size": 16, "label_width": 40, "label_height": 14},
                {"name": "B", "x": 400, "y": 100, "icon_size": 16, "label_width": 40, "label_height": 14}
            ]
        }"#;
        let out = anneal_labels_json(json).unwrap();
        let placements: BTreeMap<String, AnnealPlacement> = serde_json::from_str(&out).unwrap();
        assert_eq!(placements.len(), 2);
        assert_eq!(placements["A"].anchor, Anchor::Bottom);
        assert!(out.contains("\"anchor\":\"bottom\""));
    }
}
