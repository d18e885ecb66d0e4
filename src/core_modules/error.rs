// THEORY:
// Every failure the merge core can produce lives here. The variants mirror the
// three failure families a frame can hit: a contour that cannot carry a centroid,
// junction bookkeeping that does not line up with the contour it points into,
// and ledger misuse (ids that are unknown or already re-parented).
//
// None of these abort a frame. The orchestrator turns them into `Diagnostic`
// records and moves on to the next pair.

use thiserror::Error;

/// Errors raised by the contour, ledger and merge layers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    /// Fewer than three distinct points, or a polygon that encloses no area.
    #[error("degenerate contour: {points} distinct points, doubled area {doubled_area}")]
    DegenerateContour { points: usize, doubled_area: i64 },
    #[error("invalid piece range {start}..{end} on a contour of {len} points")]
    InvalidPieceRange { start: usize, end: usize, len: usize },
    #[error("unknown sunspot id {0}")]
    UnknownId(usize),
    /// `union` was handed an id that has already been re-parented.
    #[error("sunspot id {0} is not canonical")]
    NotCanonical(usize),
    #[error("sunspot id {0} cannot be merged with itself")]
    SameRoot(usize),
    #[error("registry expected id {expected}, got {found}")]
    IdMismatch { expected: usize, found: usize },
    #[error("bridging point set is empty")]
    EmptyBridge,
}

/// Errors raised while loading or validating a `PipelineConfig`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse pipeline config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid pipeline config: {0}")]
    Invalid(String),
}

/// Errors raised by the multi-frame worker pool.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    #[error("failed to dispatch frame {0} to the worker pool")]
    Dispatch(u64),
    #[error("worker dropped frame {0} before replying")]
    WorkerDropped(u64),
}
