//! Error taxonomy for the spatial analysis engine.
//!
//! Structural errors (geometry, dimension mismatch) indicate caller misuse and
//! abort the whole computation. Per-unit numerical failures during GWR are not
//! represented here; they are isolated inside [`crate::gwr::GwrFit`] so the
//! rest of the batch can still complete.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SpatialError>;

/// Errors produced by weights construction, autocorrelation statistics,
/// spatial regression, and GWR.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Malformed input geometry (too few units, degenerate ring,
    /// non-finite coordinate, self-intersecting exterior).
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// A unit with zero neighbors was encountered while `zero_policy` was
    /// strict. Pass `zero_policy = true` to keep islands as all-zero rows.
    #[error("unit {id} has no neighbors (strict zero policy)")]
    IsolatedUnit { id: u32 },

    /// Misaligned vectors or matrices: wrong lengths, unmatched ids,
    /// duplicated ids, non-finite values, or a zero-variance attribute.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The design matrix is rank-deficient and cannot be solved.
    #[error("design matrix is singular or nearly singular")]
    SingularMatrix,

    /// A one-dimensional search (ML parameter, bandwidth) exhausted its
    /// iteration budget without converging.
    #[error("optimizer failed to converge after {iterations} iterations")]
    Convergence { iterations: usize },

    /// A local regression was starved of data: fewer usable neighbors than
    /// coefficients, or a bandwidth search that never bracketed a finite
    /// cross-validation score.
    #[error("insufficient neighbors: {0}")]
    InsufficientNeighbors(String),

    /// A post-fit query (impacts, spatial diagnostics) was made against a
    /// model kind that has no spatial component to report on.
    #[error("not available for this model: {0}")]
    NotFitted(String),
}
