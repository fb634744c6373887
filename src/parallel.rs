//! Parallel iteration abstraction for WASM compatibility.
//!
//! The engine's hot loops are all data-parallel over independent units:
//! permutation trials in the Monte Carlo Moran test, per-unit local fits in
//! GWR, leave-one-out folds in bandwidth cross-validation, per-draw impact
//! simulations. On native targets with the `parallel` feature these run on
//! rayon; on WASM or without the feature they fall back to sequential
//! iteration with identical results (random seeds are derived per trial
//! index, so the schedule never changes the output).
//!
//! # Usage
//!
//! ```ignore
//! use crate::iter_maybe_parallel;
//!
//! let trial_stats: Vec<f64> = iter_maybe_parallel!(0..nsim)
//!     .map(|trial| permuted_statistic(trial))
//!     .collect();
//! ```

/// Macro for conditionally parallel iteration over ranges or owned collections.
///
/// When the `parallel` feature is enabled, uses `into_par_iter()`.
/// Otherwise, uses `into_iter()` for sequential execution.
#[macro_export]
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

/// Macro for conditionally parallel reference iteration over slices.
///
/// When the `parallel` feature is enabled, uses `par_iter()`.
/// Otherwise, uses `iter()` for sequential execution.
#[macro_export]
macro_rules! slice_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            $expr.par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $expr.iter()
        }
    }};
}

// Re-export macros at module level
pub use iter_maybe_parallel;
pub use slice_maybe_parallel;
