//! Spatial autocorrelation statistics: global and local Moran's I and the
//! Getis-Ord G statistics.
//!
//! All statistics consume an immutable [`SpatialWeights`] plus an attribute
//! slice aligned to the weights' unit order. Islands kept by a permissive
//! `zero_policy` contribute zero spatial lag and are excluded from means and
//! denominators; their local results are reported as zero / not significant.
//!
//! Permutation tests derive one RNG seed per trial (`seed + trial index`), so
//! results are identical under any parallel schedule.

use crate::error::{Result, SpatialError};
use crate::helpers::NUMERICAL_EPS;
use crate::iter_maybe_parallel;
use crate::weights::{SpatialWeights, WeightsStyle};
use rand::prelude::*;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Sampling assumption for the analytic Moran's I variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarianceAssumption {
    /// Attribute values drawn from a normal population.
    Normality,
    /// Values fixed, assignments to units random (the usual default).
    Randomization,
}

/// Global Moran's I with analytic inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoranResult {
    /// The I statistic.
    pub statistic: f64,
    /// Expected value under the null, `-1/(n-1)`.
    pub expected: f64,
    /// Variance under the chosen assumption.
    pub variance: f64,
    /// Standardized deviate.
    pub z_score: f64,
    /// Two-sided analytic p-value.
    pub p_value: f64,
    pub assumption: VarianceAssumption,
}

/// Options for the Monte Carlo Moran test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PermutationOptions {
    /// Number of permutations.
    pub nsim: usize,
    /// RNG seed; trial `t` uses `seed + t`.
    pub seed: u64,
}

impl Default for PermutationOptions {
    fn default() -> Self {
        Self {
            nsim: 999,
            seed: 42,
        }
    }
}

/// Result of the Monte Carlo Moran test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoranPermutationResult {
    /// Observed I.
    pub statistic: f64,
    /// Rank-based pseudo p-value, one-sided on the side of the observed
    /// statistic: `(extreme + 1) / (nsim + 1)`.
    pub p_value: f64,
    /// Mean of the simulated statistics.
    pub sim_mean: f64,
    /// Standard deviation of the simulated statistics.
    pub sim_sd: f64,
    /// Number of permutations actually run.
    pub nsim: usize,
    pub seed: u64,
}

/// LISA cluster classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LisaCategory {
    NotSignificant,
    LowLow,
    LowHigh,
    HighLow,
    HighHigh,
}

/// Options for local Moran's I.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LisaOptions {
    /// Conditional permutations per unit; 0 selects the analytic
    /// approximation instead.
    pub nsim: usize,
    /// RNG seed; unit `i` uses `seed + i`.
    pub seed: u64,
    /// Significance threshold for classification. A p-value exactly equal to
    /// the threshold classifies as `NotSignificant` (inclusive boundary).
    pub alpha: f64,
}

impl Default for LisaOptions {
    fn default() -> Self {
        Self {
            nsim: 999,
            seed: 42,
            alpha: 0.05,
        }
    }
}

/// Per-unit local Moran's I output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMoranResult {
    /// Per-unit statistic (0.0 for islands).
    pub statistics: Vec<f64>,
    /// Per-unit pseudo p-value (1.0 for islands).
    pub p_values: Vec<f64>,
    /// Cluster classification per unit.
    pub categories: Vec<LisaCategory>,
    /// Permutations per unit (0 when the analytic approximation was used).
    pub nsim: usize,
    /// Threshold used for classification.
    pub alpha: f64,
}

/// Getis-Ord G z-scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetisOrdResult {
    /// Standardized Gi (or Gi*) per unit (0.0 for islands).
    pub z_scores: Vec<f64>,
    /// Two-sided normal p-values.
    pub p_values: Vec<f64>,
    /// Whether the self-inclusive Gi* variant was computed.
    pub star: bool,
}

/// Mean-centered values, active-unit index, and the active sum of squares.
///
/// Rejects misaligned or zero-variance attributes.
fn validated_deviations(
    weights: &SpatialWeights,
    values: &[f64],
) -> Result<(Vec<usize>, Vec<f64>, f64)> {
    weights.check_alignment(values.len())?;
    let active = weights.active_units();
    if active.len() < 3 {
        return Err(SpatialError::DimensionMismatch(format!(
            "need at least 3 connected units, got {}",
            active.len()
        )));
    }
    let mean = active.iter().map(|&i| values[i]).sum::<f64>() / active.len() as f64;
    let z: Vec<f64> = values.iter().map(|&v| v - mean).collect();
    let sum_sq: f64 = active.iter().map(|&i| z[i] * z[i]).sum();
    if sum_sq < NUMERICAL_EPS {
        return Err(SpatialError::DimensionMismatch(
            "attribute vector has zero variance".to_string(),
        ));
    }
    Ok((active, z, sum_sq))
}

/// `I = (n/S0) * sum_i z_i (W z)_i / sum_i z_i^2`.
fn moran_statistic(weights: &SpatialWeights, z: &[f64], sum_sq: f64, n_active: usize) -> f64 {
    let mut numerator = 0.0;
    for i in 0..weights.n() {
        let lag: f64 = weights.row(i).iter().map(|&(j, w)| w * z[j]).sum();
        numerator += z[i] * lag;
    }
    (n_active as f64 / weights.s0()) * numerator / sum_sq
}

fn standard_normal_two_sided(z: f64) -> f64 {
    Normal::new(0.0, 1.0)
        .ok()
        .map_or(f64::NAN, |d| 2.0 * (1.0 - d.cdf(z.abs())))
}

/// Global Moran's I with analytic variance under the chosen assumption
/// (Cliff-Ord formulas).
pub fn morans_i(
    weights: &SpatialWeights,
    values: &[f64],
    assumption: VarianceAssumption,
) -> Result<MoranResult> {
    let (active, z, sum_sq) = validated_deviations(weights, values)?;
    let n = active.len() as f64;
    let statistic = moran_statistic(weights, &z, sum_sq, active.len());
    let expected = -1.0 / (n - 1.0);

    let s0 = weights.s0();
    let s1 = weights.s1();
    let s2 = weights.s2();

    let variance = match assumption {
        VarianceAssumption::Normality => {
            (n * n * s1 - n * s2 + 3.0 * s0 * s0) / (s0 * s0 * (n * n - 1.0))
                - expected * expected
        }
        VarianceAssumption::Randomization => {
            let m2 = sum_sq / n;
            let m4 = active.iter().map(|&i| z[i].powi(4)).sum::<f64>() / n;
            let b2 = m4 / (m2 * m2);
            let num = n * ((n * n - 3.0 * n + 3.0) * s1 - n * s2 + 3.0 * s0 * s0)
                - b2 * ((n * n - n) * s1 - 2.0 * n * s2 + 6.0 * s0 * s0);
            num / ((n - 1.0) * (n - 2.0) * (n - 3.0) * s0 * s0) - expected * expected
        }
    };

    let z_score = if variance > NUMERICAL_EPS {
        (statistic - expected) / variance.sqrt()
    } else {
        log::warn!("Moran variance is non-positive ({variance}); z-score set to 0");
        0.0
    };
    let p_value = standard_normal_two_sided(z_score);

    Ok(MoranResult {
        statistic,
        expected,
        variance,
        z_score,
        p_value,
        assumption,
    })
}

/// Monte Carlo Moran test: permute the attribute across connected units with
/// the weights held fixed. Deterministic for a given seed.
pub fn morans_i_permutation(
    weights: &SpatialWeights,
    values: &[f64],
    opts: &PermutationOptions,
) -> Result<MoranPermutationResult> {
    if opts.nsim == 0 {
        return Err(SpatialError::DimensionMismatch(
            "permutation test needs nsim >= 1".to_string(),
        ));
    }
    let (active, z, sum_sq) = validated_deviations(weights, values)?;
    let observed = moran_statistic(weights, &z, sum_sq, active.len());

    let active_z: Vec<f64> = active.iter().map(|&i| z[i]).collect();
    let seed = opts.seed;

    let sims: Vec<f64> = iter_maybe_parallel!(0..opts.nsim)
        .map(|trial| {
            let mut rng = StdRng::seed_from_u64(seed + trial as u64);
            let mut shuffled = active_z.clone();
            shuffled.shuffle(&mut rng);
            // Scatter back to active positions; islands stay at zero lag.
            let mut z_perm = vec![0.0; z.len()];
            for (&pos, &value) in active.iter().zip(shuffled.iter()) {
                z_perm[pos] = value;
            }
            moran_statistic(weights, &z_perm, sum_sq, active.len())
        })
        .collect();

    let sim_mean = sims.iter().sum::<f64>() / sims.len() as f64;
    let sim_sd = (sims.iter().map(|s| (s - sim_mean) * (s - sim_mean)).sum::<f64>()
        / sims.len() as f64)
        .sqrt();

    let extreme = if observed >= sim_mean {
        sims.iter().filter(|&&s| s >= observed).count()
    } else {
        sims.iter().filter(|&&s| s <= observed).count()
    };
    let p_value = (extreme + 1) as f64 / (opts.nsim + 1) as f64;

    Ok(MoranPermutationResult {
        statistic: observed,
        p_value,
        sim_mean,
        sim_sd,
        nsim: opts.nsim,
        seed: opts.seed,
    })
}

fn classify(
    z_i: f64,
    lag_centered: f64,
    p_value: f64,
    alpha: f64,
) -> LisaCategory {
    if p_value >= alpha {
        return LisaCategory::NotSignificant;
    }
    match (z_i > 0.0, lag_centered > 0.0) {
        (true, true) => LisaCategory::HighHigh,
        (false, false) => LisaCategory::LowLow,
        (true, false) => LisaCategory::HighLow,
        (false, true) => LisaCategory::LowHigh,
    }
}

/// Local Moran's I (LISA) with conditional-permutation pseudo p-values
/// (`nsim >= 1`) or the analytic normal approximation (`nsim == 0`), plus the
/// 5-way cluster classification.
pub fn local_morans_i(
    weights: &SpatialWeights,
    values: &[f64],
    opts: &LisaOptions,
) -> Result<LocalMoranResult> {
    if !(0.0..=1.0).contains(&opts.alpha) {
        return Err(SpatialError::DimensionMismatch(format!(
            "alpha must lie in [0, 1], got {}",
            opts.alpha
        )));
    }
    let (active, z, sum_sq) = validated_deviations(weights, values)?;
    let n = active.len();
    let m2 = sum_sq / n as f64;

    // Lag of the raw attribute, centered on its mean over connected units,
    // drives the quadrant assignment.
    let lag_x = weights.lag(values)?;
    let lag_mean = active.iter().map(|&i| lag_x[i]).sum::<f64>() / n as f64;

    let statistics: Vec<f64> = (0..weights.n())
        .map(|i| {
            let lag_z: f64 = weights.row(i).iter().map(|&(j, w)| w * z[j]).sum();
            (z[i] / m2) * lag_z
        })
        .collect();

    let seed = opts.seed;
    let p_values: Vec<f64> = if opts.nsim > 0 {
        iter_maybe_parallel!(0..weights.n())
            .map(|i| {
                if weights.is_island(i) {
                    return 1.0;
                }
                let observed = statistics[i];
                let row = weights.row(i);
                // Pool of deviations at all other connected units.
                let pool: Vec<f64> = active
                    .iter()
                    .filter(|&&j| j != i)
                    .map(|&j| z[j])
                    .collect();
                let mut rng = StdRng::seed_from_u64(seed + i as u64);
                let mut extreme = 0usize;
                for _ in 0..opts.nsim {
                    let lag_z: f64 = pool
                        .choose_multiple(&mut rng, row.len())
                        .zip(row.iter())
                        .map(|(&v, &(_, w))| w * v)
                        .sum();
                    let sim = (z[i] / m2) * lag_z;
                    let hit = if observed >= 0.0 {
                        sim >= observed
                    } else {
                        sim <= observed
                    };
                    if hit {
                        extreme += 1;
                    }
                }
                (extreme + 1) as f64 / (opts.nsim + 1) as f64
            })
            .collect()
    } else {
        // Analytic approximation (total-randomization moments).
        let nf = n as f64;
        let m4 = active.iter().map(|&i| z[i].powi(4)).sum::<f64>() / nf;
        let b2 = m4 / (m2 * m2);
        (0..weights.n())
            .map(|i| {
                if weights.is_island(i) {
                    return 1.0;
                }
                let wi: f64 = weights.row(i).iter().map(|&(_, w)| w).sum();
                let wi2: f64 = weights.row(i).iter().map(|&(_, w)| w * w).sum();
                let e_i = -wi / (nf - 1.0);
                let var_i = wi2 * (nf - b2) / (nf - 1.0)
                    + (wi * wi - wi2) * (2.0 * b2 - nf) / ((nf - 1.0) * (nf - 2.0))
                    - e_i * e_i;
                if var_i <= NUMERICAL_EPS {
                    return 1.0;
                }
                let z_score = (statistics[i] - e_i) / var_i.sqrt();
                // One-sided, matching the permutation pseudo p-value.
                Normal::new(0.0, 1.0)
                    .ok()
                    .map_or(f64::NAN, |d| 1.0 - d.cdf(z_score.abs()))
            })
            .collect()
    };

    let categories: Vec<LisaCategory> = (0..weights.n())
        .map(|i| {
            if weights.is_island(i) {
                return LisaCategory::NotSignificant;
            }
            classify(z[i], lag_x[i] - lag_mean, p_values[i], opts.alpha)
        })
        .collect();

    Ok(LocalMoranResult {
        statistics,
        p_values,
        categories,
        nsim: opts.nsim,
        alpha: opts.alpha,
    })
}

/// Getis-Ord G z-scores: `star = false` excludes the focal unit (Gi),
/// `star = true` includes it (Gi*, the hotspot variant used for mapping).
pub fn getis_ord(weights: &SpatialWeights, values: &[f64], star: bool) -> Result<GetisOrdResult> {
    let (active, _, _) = validated_deviations(weights, values)?;
    let n = active.len() as f64;

    let sum: f64 = active.iter().map(|&i| values[i]).sum();
    let sum_sq: f64 = active.iter().map(|&i| values[i] * values[i]).sum();

    let z_scores: Vec<f64> = (0..weights.n())
        .map(|i| {
            if weights.is_island(i) {
                return 0.0;
            }
            let row = weights.row(i);
            if star {
                // Self-inclusive: the focal unit joins its own neighborhood
                // with a style-consistent weight.
                let deg = row.len() as f64;
                let (weights_iter, w_self): (Vec<(usize, f64)>, f64) = match weights.style() {
                    WeightsStyle::Binary => (row.to_vec(), 1.0),
                    WeightsStyle::Row => {
                        let w = 1.0 / (deg + 1.0);
                        (row.iter().map(|&(j, _)| (j, w)).collect(), w)
                    }
                };
                let lag: f64 = weights_iter.iter().map(|&(j, w)| w * values[j]).sum::<f64>()
                    + w_self * values[i];
                let wi: f64 = weights_iter.iter().map(|&(_, w)| w).sum::<f64>() + w_self;
                let s1i: f64 =
                    weights_iter.iter().map(|&(_, w)| w * w).sum::<f64>() + w_self * w_self;

                let mean = sum / n;
                let s = (sum_sq / n - mean * mean).max(0.0).sqrt();
                let denom = s * ((n * s1i - wi * wi) / (n - 1.0)).max(0.0).sqrt();
                if denom < NUMERICAL_EPS {
                    0.0
                } else {
                    (lag - wi * mean) / denom
                }
            } else {
                // Self-exclusive: mean and spread computed without unit i.
                let mean_i = (sum - values[i]) / (n - 1.0);
                let s_i = ((sum_sq - values[i] * values[i]) / (n - 1.0) - mean_i * mean_i)
                    .max(0.0)
                    .sqrt();
                let lag: f64 = row.iter().map(|&(j, w)| w * values[j]).sum();
                let wi: f64 = row.iter().map(|&(_, w)| w).sum();
                let s1i: f64 = row.iter().map(|&(_, w)| w * w).sum();
                let denom = s_i * (((n - 1.0) * s1i - wi * wi) / (n - 2.0)).max(0.0).sqrt();
                if denom < NUMERICAL_EPS {
                    0.0
                } else {
                    (lag - wi * mean_i) / denom
                }
            }
        })
        .collect();

    let p_values: Vec<f64> = z_scores
        .iter()
        .map(|&z| standard_normal_two_sided(z))
        .collect();

    Ok(GetisOrdResult {
        z_scores,
        p_values,
        star,
    })
}
