use thiserror::Error;

/// Failures that can cross the engine boundary.
///
/// Geometry routines never produce these: degenerate input is skipped
/// or replaced by a simpler shape. Only the triangulation call, the
/// JSON boundary and the background label worker are fallible.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The triangulation rejected the seed set. Callers can fall back to
    /// hull territories.
    #[error("tessellation unavailable: {0}")]
    TessellationUnavailable(String),

    #[error("invalid canvas size {width}x{height}")]
    InvalidCanvas { width: f64, height: f64 },

    #[error("invalid engine params: {0}")]
    InvalidParams(#[source] serde_json::Error),

    #[error("failed to serialize engine result: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("label annealing worker panicked")]
    WorkerPanicked,
}
