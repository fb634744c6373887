//! Geographically weighted regression: local WLS fits with a distance-decay
//! kernel around each unit, bandwidth selection by leave-one-out cross
//! validation, and the effective-parameter accounting (trace of the hat
//! matrix, AICc) needed to compare bandwidths.
//!
//! A unit whose local system is singular or starved of neighbors does not
//! abort the fit: its slot stays `None`, the unit is listed under
//! `failures`, and the global summaries are computed over the units that
//! did fit.
//!
//! Both fitting and cross-validation materialize the full pairwise distance
//! matrix, so memory and time grow quadratically in the number of units.

use crate::error::{Result, SpatialError};
use crate::geometry::Coord;
use crate::helpers::{
    golden_section_min, DEFAULT_CONVERGENCE_TOL, GOLDEN_SECTION_MAX_ITER, NUMERICAL_EPS,
};
use crate::iter_maybe_parallel;
use crate::regression::RegressionDesign;
use nalgebra::{Cholesky, DMatrix, DVector};
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use serde::{Deserialize, Serialize};

/// Distance-decay kernel for the local weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GwrKernel {
    /// `exp(-0.5 (d/b)^2)`; every unit gets positive weight.
    Gaussian,
    /// `(1 - (d/b)^2)^2` inside the bandwidth, zero outside.
    Bisquare,
}

impl GwrKernel {
    fn weight(self, distance: f64, bandwidth: f64) -> f64 {
        let u = distance / bandwidth;
        match self {
            GwrKernel::Gaussian => (-0.5 * u * u).exp(),
            GwrKernel::Bisquare => {
                if u < 1.0 {
                    let v = 1.0 - u * u;
                    v * v
                } else {
                    0.0
                }
            }
        }
    }
}

/// Bandwidth specification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BandwidthKind {
    /// One distance for every unit, in coordinate units.
    Fixed(f64),
    /// Per-unit bandwidth set to the distance of the k-th nearest neighbor,
    /// with `k = round(proportion * n)`.
    Adaptive(f64),
}

/// Options for [`gwr_fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GwrOptions {
    pub kernel: GwrKernel,
    pub bandwidth: BandwidthKind,
}

/// Local fit at one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GwrUnitFit {
    /// Local coefficients, intercept first.
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub fitted: f64,
    pub residual: f64,
    /// Leverage of the unit on its own fit (diagonal of the hat matrix).
    pub hat: f64,
    /// Kernel-weighted R-squared of the local fit.
    pub local_r2: f64,
}

/// Full GWR fit. `fits` is index-aligned with the design rows; failed units
/// hold `None` and appear in `failures`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GwrResult {
    pub coef_names: Vec<String>,
    pub kernel: GwrKernel,
    pub bandwidth: BandwidthKind,
    pub fits: Vec<Option<GwrUnitFit>>,
    /// Row indices of units whose local system could not be solved.
    pub failures: Vec<usize>,
    /// Trace of the hat matrix over the fitted units.
    pub effective_params: f64,
    /// Residual sum of squares over the fitted units.
    pub rss: f64,
    /// Residual variance `RSS / (n - tr(S))`.
    pub sigma2: f64,
    pub aicc: f64,
    /// Global R-squared over the fitted units.
    pub r_squared: f64,
}

impl GwrResult {
    /// Local coefficient surface for one predictor, `None` at failed units.
    pub fn coefficient_surface(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let j = self.coef_names.iter().position(|n| n == name)?;
        Some(
            self.fits
                .iter()
                .map(|f| f.as_ref().map(|u| u.coefficients[j]))
                .collect(),
        )
    }
}

/// Outcome of the cross-validated bandwidth search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandwidthSelection {
    pub bandwidth: BandwidthKind,
    /// Leave-one-out prediction error sum at the selected bandwidth.
    pub cv_score: f64,
    pub iterations: usize,
    pub converged: bool,
}

fn pairwise_distances(coords: &[Coord]) -> Vec<Vec<f64>> {
    coords
        .iter()
        .map(|a| coords.iter().map(|b| a.distance(b)).collect())
        .collect()
}

/// Per-unit bandwidth values implied by the bandwidth kind.
fn resolve_bandwidths(
    kind: BandwidthKind,
    distances: &[Vec<f64>],
    p: usize,
) -> Result<Vec<f64>> {
    let n = distances.len();
    match kind {
        BandwidthKind::Fixed(b) => {
            if !b.is_finite() || b <= 0.0 {
                return Err(SpatialError::DimensionMismatch(format!(
                    "fixed bandwidth must be positive and finite, got {}",
                    b
                )));
            }
            Ok(vec![b; n])
        }
        BandwidthKind::Adaptive(proportion) => {
            if !proportion.is_finite() || proportion <= 0.0 || proportion > 1.0 {
                return Err(SpatialError::DimensionMismatch(format!(
                    "adaptive bandwidth proportion must lie in (0, 1], got {}",
                    proportion
                )));
            }
            let k = (proportion * n as f64).round() as usize;
            if k < p + 1 || k >= n {
                return Err(SpatialError::InsufficientNeighbors(format!(
                    "adaptive proportion {} selects k={} neighbors, outside [{}, {}]",
                    proportion,
                    k,
                    p + 1,
                    n - 1
                )));
            }
            Ok(knn_bandwidths(distances, k))
        }
    }
}

/// Per-unit distance to the k-th nearest neighbor, nudged past the neighbor
/// so a bisquare kernel keeps it strictly inside the support.
fn knn_bandwidths(distances: &[Vec<f64>], k: usize) -> Vec<f64> {
    (0..distances.len())
        .map(|i| {
            let mut others: Vec<f64> = distances[i]
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &d)| d)
                .collect();
            others.sort_by(|a, b| a.partial_cmp(b).unwrap());
            others[k - 1] * (1.0 + NUMERICAL_EPS) + NUMERICAL_EPS
        })
        .collect()
}

/// Intermediate per-unit quantities before the residual variance is known.
struct LocalFit {
    beta: DVector<f64>,
    /// Diagonal of `A^-1 X'W^2 X A^-1`, scaled by sigma2 later.
    cov_diag: Vec<f64>,
    fitted: f64,
    hat: f64,
    local_r2: f64,
}

/// Weighted least squares around unit `i`. Returns `None` when the weighted
/// normal equations are singular (too few effective neighbors).
fn local_solve(
    i: usize,
    xd: &DMatrix<f64>,
    y: &DVector<f64>,
    weights: &[f64],
) -> Option<LocalFit> {
    let n = xd.nrows();
    let p = xd.ncols();

    let mut xtwx = DMatrix::zeros(p, p);
    let mut xtwy = DVector::zeros(p);
    let mut xtw2x = DMatrix::zeros(p, p);
    for j in 0..n {
        let w = weights[j];
        if w < NUMERICAL_EPS {
            continue;
        }
        let xj = xd.row(j);
        for a in 0..p {
            xtwy[a] += w * xj[a] * y[j];
            for b in a..p {
                xtwx[(a, b)] += w * xj[a] * xj[b];
                xtw2x[(a, b)] += w * w * xj[a] * xj[b];
            }
        }
    }
    for a in 0..p {
        for b in 0..a {
            xtwx[(a, b)] = xtwx[(b, a)];
            xtw2x[(a, b)] = xtw2x[(b, a)];
        }
    }

    let chol = Cholesky::new(xtwx)?;
    let beta = chol.solve(&xtwy);
    let a_inv = chol.inverse();

    let xi = xd.row(i).transpose();
    let fitted = xi.dot(&beta);
    let hat = weights[i] * (xi.transpose() * &a_inv * &xi)[(0, 0)];

    let cov = &a_inv * &xtw2x * &a_inv;
    let cov_diag: Vec<f64> = (0..p).map(|j| cov[(j, j)].max(0.0)).collect();

    // Kernel-weighted R-squared of the local surface.
    let w_sum: f64 = weights.iter().sum();
    let y_bar = weights
        .iter()
        .zip(y.iter())
        .map(|(w, v)| w * v)
        .sum::<f64>()
        / w_sum;
    let mut tss = 0.0;
    let mut rss = 0.0;
    for j in 0..n {
        let w = weights[j];
        if w < NUMERICAL_EPS {
            continue;
        }
        let pred = xd.row(j).transpose().dot(&beta);
        tss += w * (y[j] - y_bar) * (y[j] - y_bar);
        rss += w * (y[j] - pred) * (y[j] - pred);
    }
    let local_r2 = if tss > NUMERICAL_EPS {
        1.0 - rss / tss
    } else {
        0.0
    };

    Some(LocalFit {
        beta,
        cov_diag,
        fitted,
        hat,
        local_r2,
    })
}

/// Fit a GWR model at every design row, using `coords` as unit locations.
pub fn gwr_fit(
    design: &RegressionDesign,
    coords: &[Coord],
    opts: &GwrOptions,
) -> Result<GwrResult> {
    let n = design.n();
    let p = design.k() + 1;
    if coords.len() != n {
        return Err(SpatialError::DimensionMismatch(format!(
            "{} coordinates for {} design rows",
            coords.len(),
            n
        )));
    }
    if n <= p + 2 {
        return Err(SpatialError::InsufficientNeighbors(format!(
            "{} units cannot support {} local parameters",
            n, p
        )));
    }

    let distances = pairwise_distances(coords);
    let bandwidths = resolve_bandwidths(opts.bandwidth, &distances, design.k())?;
    let (xd, names) = dense_design(design);
    let y = DVector::from_column_slice(design.y());
    let kernel = opts.kernel;

    let locals: Vec<Option<LocalFit>> = iter_maybe_parallel!(0..n)
        .map(|i| {
            let weights: Vec<f64> = distances[i]
                .iter()
                .map(|&d| kernel.weight(d, bandwidths[i]))
                .collect();
            let fit = local_solve(i, &xd, &y, &weights);
            if fit.is_none() {
                log::warn!("local fit failed at unit {} (singular weighted design)", i);
            }
            fit
        })
        .collect();

    let failures: Vec<usize> = locals
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_none())
        .map(|(i, _)| i)
        .collect();
    let n_ok = n - failures.len();
    if n_ok == 0 {
        return Err(SpatialError::InsufficientNeighbors(
            "every local fit failed; widen the bandwidth".to_string(),
        ));
    }

    let mut trace_s = 0.0;
    let mut rss = 0.0;
    let mut tss = 0.0;
    let y_ok_mean = {
        let mut sum = 0.0;
        for (i, f) in locals.iter().enumerate() {
            if f.is_some() {
                sum += design.y()[i];
            }
        }
        sum / n_ok as f64
    };
    for (i, f) in locals.iter().enumerate() {
        if let Some(f) = f {
            let e = design.y()[i] - f.fitted;
            trace_s += f.hat;
            rss += e * e;
            tss += (design.y()[i] - y_ok_mean) * (design.y()[i] - y_ok_mean);
        }
    }

    let nf = n_ok as f64;
    let denom = nf - trace_s;
    let sigma2 = if denom > NUMERICAL_EPS {
        rss / denom
    } else {
        f64::INFINITY
    };
    let sigma2_ml = rss / nf;
    let aicc_denom = nf - 2.0 - trace_s;
    let aicc = if aicc_denom > NUMERICAL_EPS && sigma2_ml > 0.0 {
        nf * sigma2_ml.ln()
            + nf * (2.0 * std::f64::consts::PI).ln()
            + nf * (nf + trace_s) / aicc_denom
    } else {
        log::warn!("effective parameters {:.2} too close to n={}; AICc unstable", trace_s, n_ok);
        f64::INFINITY
    };
    let r_squared = if tss > NUMERICAL_EPS {
        1.0 - rss / tss
    } else {
        0.0
    };

    let fits: Vec<Option<GwrUnitFit>> = locals
        .into_iter()
        .enumerate()
        .map(|(i, f)| {
            f.map(|f| GwrUnitFit {
                coefficients: f.beta.iter().cloned().collect(),
                std_errors: f
                    .cov_diag
                    .iter()
                    .map(|&v| (sigma2 * v).sqrt())
                    .collect(),
                fitted: f.fitted,
                residual: design.y()[i] - f.fitted,
                hat: f.hat,
                local_r2: f.local_r2,
            })
        })
        .collect();

    Ok(GwrResult {
        coef_names: names,
        kernel: opts.kernel,
        bandwidth: opts.bandwidth,
        fits,
        failures,
        effective_params: trace_s,
        rss,
        sigma2,
        aicc,
        r_squared,
    })
}

/// Intercept-first dense design, mirroring the global estimators.
fn dense_design(design: &RegressionDesign) -> (DMatrix<f64>, Vec<String>) {
    let n = design.n();
    let k = design.k();
    let mut xd = DMatrix::zeros(n, k + 1);
    for i in 0..n {
        xd[(i, 0)] = 1.0;
    }
    for j in 0..k {
        let col = design.x().column(j);
        for i in 0..n {
            xd[(i, j + 1)] = col[i];
        }
    }
    let mut names = Vec::with_capacity(k + 1);
    names.push("(Intercept)".to_string());
    names.extend(design.names().iter().cloned());
    (xd, names)
}

/// Leave-one-out prediction error sum for one bandwidth specification.
/// A candidate that starves any unit scores infinity and is rejected by the
/// search rather than aborting it.
fn cv_score(
    xd: &DMatrix<f64>,
    y: &DVector<f64>,
    distances: &[Vec<f64>],
    kernel: GwrKernel,
    bandwidths: &[f64],
) -> f64 {
    let n = xd.nrows();
    let errors: Vec<f64> = iter_maybe_parallel!(0..n)
        .map(|i| {
            let weights: Vec<f64> = distances[i]
                .iter()
                .enumerate()
                .map(|(j, &d)| {
                    if j == i {
                        0.0
                    } else {
                        kernel.weight(d, bandwidths[i])
                    }
                })
                .collect();
            match local_solve(i, xd, y, &weights) {
                Some(f) => {
                    let e = y[i] - f.fitted;
                    e * e
                }
                None => f64::INFINITY,
            }
        })
        .collect();
    errors.iter().sum()
}

/// Select a bandwidth of the same kind as `template` by minimizing the
/// leave-one-out cross-validation score with a golden-section search. The
/// numeric value inside `template` is ignored; only the kind matters.
pub fn select_bandwidth(
    design: &RegressionDesign,
    coords: &[Coord],
    kernel: GwrKernel,
    template: BandwidthKind,
) -> Result<BandwidthSelection> {
    let n = design.n();
    let p = design.k() + 1;
    if coords.len() != n {
        return Err(SpatialError::DimensionMismatch(format!(
            "{} coordinates for {} design rows",
            coords.len(),
            n
        )));
    }
    if n <= p + 3 {
        return Err(SpatialError::InsufficientNeighbors(format!(
            "{} units are too few for bandwidth cross-validation",
            n
        )));
    }

    let distances = pairwise_distances(coords);
    let (xd, _) = dense_design(design);
    let y = DVector::from_column_slice(design.y());

    let selection = match template {
        BandwidthKind::Fixed(_) => {
            // Lower bound: the largest nearest-neighbor distance, so every
            // unit sees at least one neighbor even under a bisquare kernel.
            let mut lo: f64 = 0.0;
            let mut hi: f64 = 0.0;
            for i in 0..n {
                let nn = distances[i]
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, &d)| d)
                    .fold(f64::INFINITY, f64::min);
                lo = lo.max(nn);
                hi = hi.max(distances[i].iter().cloned().fold(0.0, f64::max));
            }
            let result = golden_section_min(
                |b| {
                    let bandwidths = vec![b; n];
                    cv_score(&xd, &y, &distances, kernel, &bandwidths)
                },
                lo,
                hi,
                DEFAULT_CONVERGENCE_TOL * (hi - lo).max(1.0),
                GOLDEN_SECTION_MAX_ITER,
            );
            BandwidthSelection {
                bandwidth: BandwidthKind::Fixed(result.x),
                cv_score: result.value,
                iterations: result.iterations,
                converged: result.converged,
            }
        }
        BandwidthKind::Adaptive(_) => {
            // Search over the neighbor count and report it as a proportion.
            let lo = (p + 1) as f64;
            let hi = (n - 1) as f64;
            let score_at = |k: f64| -> f64 {
                let k = (k.round() as usize).clamp(p + 1, n - 1);
                cv_score(&xd, &y, &distances, kernel, &knn_bandwidths(&distances, k))
            };
            let result =
                golden_section_min(score_at, lo, hi, 0.5, GOLDEN_SECTION_MAX_ITER);
            let k = (result.x.round() as usize).clamp(p + 1, n - 1);
            BandwidthSelection {
                bandwidth: BandwidthKind::Adaptive(k as f64 / n as f64),
                cv_score: result.value,
                iterations: result.iterations,
                converged: result.converged,
            }
        }
    };

    if !selection.cv_score.is_finite() {
        return Err(SpatialError::InsufficientNeighbors(
            "no bandwidth in the search range produced a solvable fit at every unit".to_string(),
        ));
    }
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::SdMatrix;
    use crate::regression::{fit, ModelKind};

    /// A 6x6 grid of unit locations with a smooth north-south trend in the
    /// x1 effect, plus a small deterministic wobble.
    fn trend_data(side: usize) -> (RegressionDesign, Vec<Coord>) {
        let n = side * side;
        let mut coords = Vec::with_capacity(n);
        let mut x1 = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for r in 0..side {
            for c in 0..side {
                let i = r * side + c;
                coords.push(Coord::new(c as f64, r as f64));
                let xv = ((i * 13) % 17) as f64 / 17.0;
                // Slope varies with latitude: 1 + row / side.
                let slope = 1.0 + r as f64 / side as f64;
                x1.push(xv);
                y.push(0.5 + slope * xv + 0.01 * ((i * 7) % 5) as f64);
            }
        }
        let design = RegressionDesign::new(
            y,
            SdMatrix::from_columns(&[x1]).unwrap(),
            vec!["x1".to_string()],
        )
        .unwrap();
        (design, coords)
    }

    // ============== Fit tests ==============

    #[test]
    fn test_gwr_fits_every_unit_with_wide_gaussian() {
        let (design, coords) = trend_data(6);
        let opts = GwrOptions {
            kernel: GwrKernel::Gaussian,
            bandwidth: BandwidthKind::Fixed(3.0),
        };
        let result = gwr_fit(&design, &coords, &opts).unwrap();
        assert!(result.failures.is_empty());
        assert_eq!(result.fits.len(), 36);
        assert!(result.fits.iter().all(|f| f.is_some()));
        assert!(result.effective_params > 2.0, "tr(S) must exceed the global p");
        assert!(result.effective_params < 36.0);
        assert!(result.sigma2 >= 0.0);
        assert!(result.aicc.is_finite());
        let rss_direct: f64 = result
            .fits
            .iter()
            .flatten()
            .map(|f| f.residual * f.residual)
            .sum();
        assert!((result.rss - rss_direct).abs() < 1e-10);
        assert!(
            (result.sigma2 - result.rss / (36.0 - result.effective_params)).abs() < 1e-10
        );
    }

    #[test]
    fn test_gwr_detects_spatial_slope_trend() {
        let (design, coords) = trend_data(6);
        let opts = GwrOptions {
            kernel: GwrKernel::Bisquare,
            bandwidth: BandwidthKind::Adaptive(1.0 / 3.0),
        };
        let result = gwr_fit(&design, &coords, &opts).unwrap();
        let surface = result.coefficient_surface("x1").unwrap();
        // Slope grows to the north: compare a southern and a northern unit.
        let south = surface[2].unwrap();
        let north = surface[32].unwrap();
        assert!(
            north > south,
            "northern slope {} should exceed southern slope {}",
            north,
            south
        );
    }

    #[test]
    fn test_gwr_huge_bandwidth_approaches_ols() {
        let (design, coords) = trend_data(5);
        let opts = GwrOptions {
            kernel: GwrKernel::Gaussian,
            bandwidth: BandwidthKind::Fixed(1e6),
        };
        let result = gwr_fit(&design, &coords, &opts).unwrap();
        let ols = fit(&design, None, ModelKind::Ols).unwrap();
        for f in result.fits.iter().flatten() {
            for (a, b) in f.coefficients.iter().zip(ols.coefficients.iter()) {
                assert!(
                    (a - b).abs() < 1e-6,
                    "uniform weights must reproduce OLS: {} vs {}",
                    a,
                    b
                );
            }
        }
        // With near-uniform weights the hat trace collapses to p.
        assert!((result.effective_params - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_gwr_starved_bisquare_reports_failures() {
        // One far outlier: a tiny fixed bisquare bandwidth leaves it with
        // zero-weight neighbors only.
        let mut coords: Vec<Coord> = (0..10).map(|i| Coord::new(i as f64, 0.0)).collect();
        coords.push(Coord::new(1000.0, 1000.0));
        let n = coords.len();
        let x1: Vec<f64> = (0..n).map(|i| ((i * 3) % 7) as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| 1.0 + 0.5 * x1[i] + (i % 2) as f64 * 0.1).collect();
        let design = RegressionDesign::new(
            y,
            SdMatrix::from_columns(&[x1]).unwrap(),
            vec!["x1".to_string()],
        )
        .unwrap();

        let opts = GwrOptions {
            kernel: GwrKernel::Bisquare,
            bandwidth: BandwidthKind::Fixed(2.5),
        };
        let result = gwr_fit(&design, &coords, &opts).unwrap();
        assert!(result.failures.contains(&10), "the outlier unit must fail");
        assert!(result.fits[10].is_none());
        assert!(result.fits[5].is_some(), "interior units still fit");
    }

    #[test]
    fn test_gwr_rejects_bad_inputs() {
        let (design, coords) = trend_data(4);
        let opts = GwrOptions {
            kernel: GwrKernel::Gaussian,
            bandwidth: BandwidthKind::Fixed(-1.0),
        };
        assert!(gwr_fit(&design, &coords, &opts).is_err());

        let opts = GwrOptions {
            kernel: GwrKernel::Gaussian,
            bandwidth: BandwidthKind::Fixed(1.0),
        };
        assert!(gwr_fit(&design, &coords[..5], &opts).is_err());

        let opts = GwrOptions {
            kernel: GwrKernel::Bisquare,
            bandwidth: BandwidthKind::Adaptive(0.999),
        };
        assert!(matches!(
            gwr_fit(&design, &coords, &opts),
            Err(SpatialError::InsufficientNeighbors(_))
        ));
    }

    // ============== Bandwidth selection tests ==============

    #[test]
    fn test_select_fixed_bandwidth() {
        let (design, coords) = trend_data(6);
        let selection = select_bandwidth(
            &design,
            &coords,
            GwrKernel::Gaussian,
            BandwidthKind::Fixed(0.0),
        )
        .unwrap();
        match selection.bandwidth {
            BandwidthKind::Fixed(b) => assert!(b > 0.0 && b.is_finite()),
            _ => panic!("expected a fixed bandwidth"),
        }
        assert!(selection.cv_score.is_finite());
        assert!(selection.iterations > 0);
    }

    #[test]
    fn test_select_adaptive_bandwidth_in_range() {
        let (design, coords) = trend_data(6);
        let selection = select_bandwidth(
            &design,
            &coords,
            GwrKernel::Bisquare,
            BandwidthKind::Adaptive(0.0),
        )
        .unwrap();
        match selection.bandwidth {
            BandwidthKind::Adaptive(proportion) => {
                assert!(proportion > 0.0 && proportion < 1.0);
                let k = (proportion * 36.0).round() as usize;
                assert!((3..36).contains(&k));
            }
            _ => panic!("expected an adaptive bandwidth"),
        }
        assert!(selection.cv_score.is_finite());
    }

    #[test]
    fn test_selection_score_matches_direct_evaluation() {
        let (design, coords) = trend_data(6);
        let selection = select_bandwidth(
            &design,
            &coords,
            GwrKernel::Gaussian,
            BandwidthKind::Fixed(0.0),
        )
        .unwrap();

        let distances = pairwise_distances(&coords);
        let (xd, _) = dense_design(&design);
        let y = DVector::from_column_slice(design.y());
        let selected = match selection.bandwidth {
            BandwidthKind::Fixed(b) => b,
            _ => unreachable!(),
        };
        let direct = cv_score(&xd, &y, &distances, GwrKernel::Gaussian, &vec![selected; 36]);
        assert!(
            (selection.cv_score - direct).abs() < 1e-9,
            "reported CV score must match a direct evaluation: {} vs {}",
            selection.cv_score,
            direct
        );
    }

    #[test]
    fn test_gwr_result_serde_roundtrip() {
        let (design, coords) = trend_data(5);
        let opts = GwrOptions {
            kernel: GwrKernel::Gaussian,
            bandwidth: BandwidthKind::Fixed(2.0),
        };
        let result = gwr_fit(&design, &coords, &opts).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        let back: GwrResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
