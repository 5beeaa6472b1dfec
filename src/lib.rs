//! Atlas map engine: procedural geometry for fantasy-style maps.
//!
//! Territories (convex hulls or merged Voronoi cells) express the
//! location hierarchy, edges get a hand-drawn wobble, terrain glyphs are
//! scattered around terrain-typed places and labels are placed by
//! simulated annealing. Everything is plain data in and out; the JSON
//! entry points in `generate` mirror the Rust API, and the optional
//! `python` feature exposes them to the analysis backend.

pub mod annealing;
pub mod collision;
pub mod distort;
pub mod error;
pub mod generate;
pub mod geometry;
pub mod hierarchy;
pub mod hull;
pub mod labels;
pub mod noise;
pub mod prng;
pub mod terrain;
pub mod territory;
pub mod tessellation;
pub mod types;

pub use error::EngineError;
pub use generate::{anneal_labels_json, render_map, render_map_json};

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;

    /// Render a map.
    ///
    /// Takes a JSON string matching `MapParams` and returns a JSON
    /// string matching `MapResult`.
    #[pyfunction]
    fn render_map_json(params_json: &str) -> PyResult<String> {
        crate::generate::render_map_json(params_json)
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))
    }

    /// Place labels for a JSON `LabelRequest`; returns a JSON object of
    /// placements keyed by item name. Releases the GIL while annealing.
    #[pyfunction]
    fn anneal_labels_json(py: Python<'_>, request_json: &str) -> PyResult<String> {
        py.allow_threads(|| crate::generate::anneal_labels_json(request_json))
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))
    }

    /// Atlas Rust engine, importable from Python.
    #[pymodule]
    fn atlas_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(render_map_json, m)?)?;
        m.add_function(wrap_pyfunction!(anneal_labels_json, m)?)?;
        Ok(())
    }
}
