//! # sdars-core
//!
//! Core algorithms for spatial data analysis in Rust.
//!
//! This crate provides pure Rust implementations of the standard areal-data
//! workflow:
//! - Contiguity adjacency from polygon geometry (rook/queen), plus k-nearest
//!   and distance-band graphs from centroids
//! - Spatial weights matrices (binary, row-standardized) with island handling
//! - Global and local autocorrelation (Moran's I, LISA, Getis-Ord Gi/Gi*)
//!   with analytic and permutation inference
//! - Spatial regression (OLS, SLX, SAR lag, spatial error, spatial Durbin
//!   error) with impacts decomposition and Lagrange Multiplier diagnostics
//! - Geographically weighted regression with cross-validated bandwidths
//!
//! ## Data Layout
//!
//! Attribute data is represented as column-major matrices stored in flat
//! vectors: for n units with k variables, `data[i + j * n]` gives unit i on
//! variable j. Every result is index-aligned with the unit order of the
//! weights matrix it was computed under.
//!
//! ## Determinism
//!
//! All Monte Carlo routines (permutation tests, impact simulation) derive a
//! fresh RNG per trial from a caller-supplied seed, so results are identical
//! with and without the `parallel` feature.

#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod parallel;

pub mod adjacency;
pub mod autocorr;
pub mod error;
pub mod geometry;
pub mod gwr;
pub mod helpers;
pub mod matrix;
pub mod regression;
pub mod weights;

// Re-export commonly used items
pub use error::{Result, SpatialError};
pub use helpers::{DEFAULT_CONVERGENCE_TOL, NUMERICAL_EPS};
pub use matrix::SdMatrix;

// Re-export the geometry and weights types
pub use adjacency::{
    build_adjacency, centroids, distance_band_adjacency, knn_adjacency, AdjacencyGraph,
    ContiguityRule,
};
pub use geometry::{Coord, Geometry};
pub use weights::{AttributeVector, SpatialWeights, WeightsStyle};

// Re-export autocorrelation types
pub use autocorr::{
    getis_ord, local_morans_i, morans_i, morans_i_permutation, GetisOrdResult, LisaCategory,
    LisaOptions, LocalMoranResult, MoranPermutationResult, MoranResult, PermutationOptions,
    VarianceAssumption,
};

// Re-export regression types
pub use regression::{
    fit, impacts, lm_tests, moran_residual_test, FittedModel, ImpactOptions, Impacts, LmStatistic,
    LmTests, ModelKind, RegressionDesign,
};

// Re-export GWR types
pub use gwr::{
    gwr_fit, select_bandwidth, BandwidthKind, BandwidthSelection, GwrKernel, GwrOptions,
    GwrResult, GwrUnitFit,
};
