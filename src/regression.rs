//! Spatial regression: OLS, SLX, SAR lag, spatial error, and spatial Durbin
//! error models, with impacts decomposition and the pre-fit diagnostics
//! (Moran's I on OLS residuals, Lagrange Multiplier tests) used to choose
//! between them.
//!
//! OLS and SLX are closed-form least squares. The SAR lag and (Durbin) error
//! models are fit by maximum likelihood: the log-likelihood is concentrated
//! over the scalar spatial parameter, whose feasible range comes from the
//! eigenvalues of the weights matrix, and maximized by golden-section search
//! with conditional least squares at each candidate.

use crate::autocorr::{self, MoranResult, VarianceAssumption};
use crate::error::{Result, SpatialError};
use crate::helpers::{DEFAULT_CONVERGENCE_TOL, GOLDEN_SECTION_MAX_ITER, NUMERICAL_EPS};
use crate::helpers::golden_section_max;
use crate::matrix::SdMatrix;
use crate::weights::SpatialWeights;
use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use rand::prelude::*;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

/// Model family for [`fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Ordinary least squares; no spatial weights used.
    Ols,
    /// Exogenous spatially lagged predictors: design augmented with `WX`.
    Slx,
    /// `y = rho W y + X beta + eps`, fit by concentrated ML.
    SarLag,
    /// `y = X beta + u`, `u = lambda W u + eps`, fit by concentrated ML.
    SpatialError,
    /// Spatial error model on a `WX`-augmented design (SLX + error).
    SpatialDurbinError,
}

/// Outcome vector and predictor matrix, validated once at construction and
/// read-only to the estimators. The intercept is handled internally.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionDesign {
    y: Vec<f64>,
    x: SdMatrix,
    names: Vec<String>,
}

impl RegressionDesign {
    /// `y` of length n, `x` of shape n x k (no intercept column), one name
    /// per predictor column.
    pub fn new(y: Vec<f64>, x: SdMatrix, names: Vec<String>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(SpatialError::DimensionMismatch(format!(
                "outcome has {} values but design has {} rows",
                y.len(),
                x.nrows()
            )));
        }
        if names.len() != x.ncols() {
            return Err(SpatialError::DimensionMismatch(format!(
                "{} predictor names for {} columns",
                names.len(),
                x.ncols()
            )));
        }
        if y.iter().any(|v| !v.is_finite()) || x.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(SpatialError::DimensionMismatch(
                "design contains non-finite values".to_string(),
            ));
        }
        Ok(Self { y, x, names })
    }

    pub fn n(&self) -> usize {
        self.y.len()
    }

    pub fn k(&self) -> usize {
        self.x.ncols()
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn x(&self) -> &SdMatrix {
        &self.x
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A fitted spatial regression model. Created once per [`fit`] call and
/// immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub kind: ModelKind,
    /// Coefficient estimates, intercept first.
    pub coefficients: Vec<f64>,
    pub coef_names: Vec<String>,
    pub std_errors: Vec<f64>,
    /// t statistics (OLS/SLX) or asymptotic z statistics (ML models).
    pub t_values: Vec<f64>,
    pub p_values: Vec<f64>,
    /// Coefficient covariance, column-major p x p.
    pub coef_cov: Vec<f64>,
    /// Spatial lag parameter (SAR lag only).
    pub rho: Option<f64>,
    /// Profile-likelihood standard error of `rho`.
    pub rho_se: Option<f64>,
    /// Feasible interval the spatial parameter was searched over.
    pub spatial_interval: Option<(f64, f64)>,
    /// Spatial error parameter (error models only).
    pub lambda: Option<f64>,
    pub fitted_values: Vec<f64>,
    pub residuals: Vec<f64>,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    /// R-squared, only meaningful for the least-squares fits.
    pub r_squared: Option<f64>,
    pub adj_r_squared: Option<f64>,
    /// Golden-section iterations of the ML search (0 for closed form).
    pub iterations: usize,
    pub converged: bool,
}

impl FittedModel {
    /// Coefficient by name.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.coef_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.coefficients[i])
    }
}

/// Fit a model of the requested kind. `weights` may be `None` only for OLS.
pub fn fit(
    design: &RegressionDesign,
    weights: Option<&SpatialWeights>,
    kind: ModelKind,
) -> Result<FittedModel> {
    if let Some(w) = weights {
        w.check_alignment(design.n())?;
    }
    match kind {
        ModelKind::Ols => {
            let (xd, names) = base_design(design);
            least_squares_fit(&xd, &outcome(design), names, ModelKind::Ols)
        }
        ModelKind::Slx => {
            let w = require_weights(weights, "SLX")?;
            let (xd, names) = lagged_design(design, w)?;
            least_squares_fit(&xd, &outcome(design), names, ModelKind::Slx)
        }
        ModelKind::SarLag => {
            let w = require_weights(weights, "SAR lag")?;
            let (xd, names) = base_design(design);
            fit_sar(design, w, xd, names)
        }
        ModelKind::SpatialError => {
            let w = require_weights(weights, "spatial error")?;
            let (xd, names) = base_design(design);
            fit_error_model(design, w, xd, names, ModelKind::SpatialError)
        }
        ModelKind::SpatialDurbinError => {
            let w = require_weights(weights, "spatial Durbin error")?;
            let (xd, names) = lagged_design(design, w)?;
            fit_error_model(design, w, xd, names, ModelKind::SpatialDurbinError)
        }
    }
}

fn require_weights<'a>(
    weights: Option<&'a SpatialWeights>,
    label: &str,
) -> Result<&'a SpatialWeights> {
    weights.ok_or_else(|| {
        SpatialError::DimensionMismatch(format!("{} model requires spatial weights", label))
    })
}

fn outcome(design: &RegressionDesign) -> DVector<f64> {
    DVector::from_column_slice(design.y())
}

/// Intercept-first dense design.
fn base_design(design: &RegressionDesign) -> (DMatrix<f64>, Vec<String>) {
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

/// Base design plus one spatially lagged column per predictor. Lag columns
/// that are identically zero (a zero weights matrix) are dropped so the
/// augmented fit degenerates to OLS instead of a singular design.
fn lagged_design(design: &RegressionDesign, w: &SpatialWeights) -> Result<(DMatrix<f64>, Vec<String>)> {
    let (xd, mut names) = base_design(design);
    let n = design.n();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for j in 0..design.k() {
        let lag = w.lag(design.x().column(j))?;
        if lag.iter().all(|v| v.abs() < NUMERICAL_EPS) {
            log::debug!("dropping all-zero lag column for {}", design.names()[j]);
            continue;
        }
        names.push(format!("lag.{}", design.names()[j]));
        columns.push(lag);
    }
    let mut out = DMatrix::zeros(n, xd.ncols() + columns.len());
    out.view_mut((0, 0), (n, xd.ncols())).copy_from(&xd);
    for (c, col) in columns.iter().enumerate() {
        for i in 0..n {
            out[(i, xd.ncols() + c)] = col[i];
        }
    }
    Ok((out, names))
}

/// Least-squares solve with an explicit rank check.
fn solve_ols(xd: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>> {
    let svd = xd.clone().svd(true, true);
    let max_sv = svd.singular_values.iter().cloned().fold(0.0, f64::max);
    let tol = max_sv * xd.nrows().max(xd.ncols()) as f64 * f64::EPSILON;
    if svd.rank(tol) < xd.ncols() {
        return Err(SpatialError::SingularMatrix);
    }
    let solution = svd
        .solve(y, tol)
        .map_err(|_| SpatialError::SingularMatrix)?;
    Ok(DVector::from_column_slice(solution.as_slice()))
}

/// Inverse of `X' X`, for covariance matrices.
fn xtx_inverse(xd: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    (xd.transpose() * xd)
        .try_inverse()
        .ok_or(SpatialError::SingularMatrix)
}

fn gaussian_loglik(n: usize, rss: f64) -> f64 {
    let nf = n as f64;
    -0.5 * nf * ((2.0 * std::f64::consts::PI).ln() + (rss / nf).ln() + 1.0)
}

fn two_sided_t(stat: f64, df: f64) -> f64 {
    StudentsT::new(0.0, 1.0, df)
        .ok()
        .map_or(f64::NAN, |d| 2.0 * (1.0 - d.cdf(stat.abs())))
}

fn two_sided_z(stat: f64) -> f64 {
    Normal::new(0.0, 1.0)
        .ok()
        .map_or(f64::NAN, |d| 2.0 * (1.0 - d.cdf(stat.abs())))
}

/// Closed-form fit shared by OLS and SLX.
fn least_squares_fit(
    xd: &DMatrix<f64>,
    y: &DVector<f64>,
    names: Vec<String>,
    kind: ModelKind,
) -> Result<FittedModel> {
    let n = xd.nrows();
    let p = xd.ncols();
    if n <= p {
        return Err(SpatialError::SingularMatrix);
    }

    let beta = solve_ols(xd, y)?;
    let fitted = xd * &beta;
    let residuals = y - &fitted;
    let rss: f64 = residuals.iter().map(|e| e * e).sum();
    let df = (n - p) as f64;
    let sigma2 = rss / df;

    let cov = xtx_inverse(xd)? * sigma2;
    let std_errors: Vec<f64> = (0..p).map(|j| cov[(j, j)].max(0.0).sqrt()).collect();
    let t_values: Vec<f64> = (0..p)
        .map(|j| {
            if std_errors[j] > NUMERICAL_EPS {
                beta[j] / std_errors[j]
            } else {
                f64::NAN
            }
        })
        .collect();
    let p_values: Vec<f64> = t_values.iter().map(|&t| two_sided_t(t, df)).collect();

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let tss: f64 = y.iter().map(|v| (v - y_mean) * (v - y_mean)).sum();
    let r_squared = if tss > NUMERICAL_EPS {
        1.0 - rss / tss
    } else {
        0.0
    };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df;

    let log_likelihood = gaussian_loglik(n, rss);
    let aic = -2.0 * log_likelihood + 2.0 * (p as f64 + 1.0);

    Ok(FittedModel {
        kind,
        coefficients: beta.iter().cloned().collect(),
        coef_names: names,
        std_errors,
        t_values,
        p_values,
        coef_cov: cov.as_slice().to_vec(),
        rho: None,
        rho_se: None,
        spatial_interval: None,
        lambda: None,
        fitted_values: fitted.iter().cloned().collect(),
        residuals: residuals.iter().cloned().collect(),
        sigma2,
        log_likelihood,
        aic,
        r_squared: Some(r_squared),
        adj_r_squared: Some(adj_r_squared),
        iterations: 0,
        converged: true,
    })
}

/// Eigenvalues of the weights matrix via the symmetric similarity transform
/// `sqrt(w_ij * w_ji)`, which shares the spectrum of W for both binary and
/// row-standardized styles. Island rows stay zero and contribute eigenvalue 0.
fn weights_eigenvalues(w: &SpatialWeights) -> Vec<f64> {
    let n = w.n();
    let mut sym = DMatrix::zeros(n, n);
    for i in 0..n {
        for &(j, wij) in w.row(i) {
            let wji = w.weight(j, i);
            sym[(i, j)] = (wij * wji).max(0.0).sqrt();
        }
    }
    SymmetricEigen::new(sym).eigenvalues.iter().cloned().collect()
}

/// Feasible open interval for the spatial parameter, shrunk slightly so the
/// log-determinant stays finite at the endpoints.
fn feasible_interval(eigenvalues: &[f64]) -> (f64, f64) {
    const SHRINK: f64 = 1e-6;
    let lambda_min = eigenvalues.iter().cloned().fold(f64::INFINITY, f64::min);
    let lambda_max = eigenvalues
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    let lo = if lambda_min < -NUMERICAL_EPS {
        1.0 / lambda_min + SHRINK
    } else {
        -1.0 + SHRINK
    };
    let hi = if lambda_max > NUMERICAL_EPS {
        1.0 / lambda_max - SHRINK
    } else {
        1.0 - SHRINK
    };
    (lo, hi)
}

/// `sum_i ln(1 - param * eigenvalue_i)`, the Jacobian term of the spatial ML
/// log-likelihoods.
fn log_det_term(eigenvalues: &[f64], param: f64) -> f64 {
    eigenvalues
        .iter()
        .map(|&ev| (1.0 - param * ev).max(NUMERICAL_EPS).ln())
        .sum()
}

/// Concentrated SAR log-likelihood at a candidate `rho`, using the
/// precomputed least-squares projector `h = (X'X)^-1 X'`.
fn sar_concentrated_loglik(
    xd: &DMatrix<f64>,
    h: &DMatrix<f64>,
    y: &DVector<f64>,
    wy: &DVector<f64>,
    eigenvalues: &[f64],
    rho: f64,
) -> f64 {
    let ay = y - wy * rho;
    let beta = h * &ay;
    let residual = &ay - xd * &beta;
    let rss: f64 = residual.iter().map(|e| e * e).sum();
    gaussian_loglik(y.len(), rss) + log_det_term(eigenvalues, rho)
}

fn fit_sar(
    design: &RegressionDesign,
    w: &SpatialWeights,
    xd: DMatrix<f64>,
    names: Vec<String>,
) -> Result<FittedModel> {
    let n = design.n();
    let p = xd.ncols();
    if n <= p + 1 {
        return Err(SpatialError::SingularMatrix);
    }

    let y = outcome(design);
    let wy = DVector::from_vec(w.lag(design.y())?);
    let eigenvalues = weights_eigenvalues(w);
    let (lo, hi) = feasible_interval(&eigenvalues);

    // (X'X)^-1 X', reused at every candidate rho.
    let h = xtx_inverse(&xd)? * xd.transpose();

    let search = golden_section_max(
        |rho| sar_concentrated_loglik(&xd, &h, &y, &wy, &eigenvalues, rho),
        lo,
        hi,
        DEFAULT_CONVERGENCE_TOL,
        GOLDEN_SECTION_MAX_ITER,
    );
    if !search.converged {
        return Err(SpatialError::Convergence {
            iterations: search.iterations,
        });
    }
    let rho = search.x;
    let log_likelihood = search.value;

    let ay = &y - &wy * rho;
    let beta = &h * &ay;
    let innovations = &ay - &xd * &beta;
    let rss: f64 = innovations.iter().map(|e| e * e).sum();
    let sigma2 = rss / n as f64;

    // Reduced-form fitted values: (I - rho W) y_hat = X beta.
    let a = DMatrix::identity(n, n) - w.to_dense().to_dmatrix() * rho;
    let fitted = a
        .lu()
        .solve(&(&xd * &beta))
        .ok_or(SpatialError::SingularMatrix)?;
    let residuals = &y - &fitted;

    // Conditional coefficient covariance at rho_hat.
    let cov = xtx_inverse(&xd)? * sigma2;
    let std_errors: Vec<f64> = (0..p).map(|j| cov[(j, j)].max(0.0).sqrt()).collect();
    let t_values: Vec<f64> = (0..p)
        .map(|j| {
            if std_errors[j] > NUMERICAL_EPS {
                beta[j] / std_errors[j]
            } else {
                f64::NAN
            }
        })
        .collect();
    let p_values: Vec<f64> = t_values.iter().map(|&t| two_sided_z(t)).collect();

    // Profile-likelihood curvature for the rho standard error.
    let step = (hi - lo) * 1e-4;
    let ll = |r: f64| sar_concentrated_loglik(&xd, &h, &y, &wy, &eigenvalues, r);
    let curvature = (ll(rho + step) - 2.0 * log_likelihood + ll(rho - step)) / (step * step);
    let rho_se = if curvature < -NUMERICAL_EPS {
        Some((-1.0 / curvature).sqrt())
    } else {
        log::warn!("non-concave profile likelihood at rho={rho}; no rho standard error");
        None
    };

    let aic = -2.0 * log_likelihood + 2.0 * (p as f64 + 2.0);

    Ok(FittedModel {
        kind: ModelKind::SarLag,
        coefficients: beta.iter().cloned().collect(),
        coef_names: names,
        std_errors,
        t_values,
        p_values,
        coef_cov: cov.as_slice().to_vec(),
        rho: Some(rho),
        rho_se,
        spatial_interval: Some((lo, hi)),
        lambda: None,
        fitted_values: fitted.iter().cloned().collect(),
        residuals: residuals.iter().cloned().collect(),
        sigma2,
        log_likelihood,
        aic,
        r_squared: None,
        adj_r_squared: None,
        iterations: search.iterations,
        converged: true,
    })
}

/// Concentrated spatial-error log-likelihood at a candidate `lambda` with the
/// GLS-transformed design `X - lambda WX`, `y - lambda Wy`.
fn sem_concentrated_loglik(
    xd: &DMatrix<f64>,
    wx: &DMatrix<f64>,
    y: &DVector<f64>,
    wy: &DVector<f64>,
    eigenvalues: &[f64],
    lambda: f64,
) -> f64 {
    let xs = xd - wx * lambda;
    let ys = y - wy * lambda;
    let xtx = xs.transpose() * &xs;
    let beta = match Cholesky::new(xtx) {
        Some(chol) => chol.solve(&(xs.transpose() * &ys)),
        None => return f64::NEG_INFINITY,
    };
    let residual = &ys - &xs * &beta;
    let rss: f64 = residual.iter().map(|e| e * e).sum();
    gaussian_loglik(y.len(), rss) + log_det_term(eigenvalues, lambda)
}

fn fit_error_model(
    design: &RegressionDesign,
    w: &SpatialWeights,
    xd: DMatrix<f64>,
    names: Vec<String>,
    kind: ModelKind,
) -> Result<FittedModel> {
    let n = design.n();
    let p = xd.ncols();
    if n <= p + 1 {
        return Err(SpatialError::SingularMatrix);
    }

    let y = outcome(design);
    let wy = DVector::from_vec(w.lag(design.y())?);

    // Lag of every design column, including the intercept column (whose lag
    // is the row sums of W).
    let mut wx = DMatrix::zeros(n, p);
    for j in 0..p {
        let col: Vec<f64> = (0..n).map(|i| xd[(i, j)]).collect();
        let lag = w.lag(&col)?;
        for i in 0..n {
            wx[(i, j)] = lag[i];
        }
    }

    let eigenvalues = weights_eigenvalues(w);
    let (lo, hi) = feasible_interval(&eigenvalues);

    let search = golden_section_max(
        |lambda| sem_concentrated_loglik(&xd, &wx, &y, &wy, &eigenvalues, lambda),
        lo,
        hi,
        DEFAULT_CONVERGENCE_TOL,
        GOLDEN_SECTION_MAX_ITER,
    );
    if !search.converged {
        return Err(SpatialError::Convergence {
            iterations: search.iterations,
        });
    }
    let lambda = search.x;
    let log_likelihood = search.value;

    let xs = &xd - &wx * lambda;
    let ys = &y - &wy * lambda;
    let xtx = xs.transpose() * &xs;
    let chol = Cholesky::new(xtx.clone()).ok_or(SpatialError::SingularMatrix)?;
    let beta = chol.solve(&(xs.transpose() * &ys));
    let innovations = &ys - &xs * &beta;
    let rss: f64 = innovations.iter().map(|e| e * e).sum();
    let sigma2 = rss / n as f64;

    // Structural fit: y_hat = X beta, residuals carry the spatial error.
    let fitted = &xd * &beta;
    let residuals = &y - &fitted;

    let cov = xtx.try_inverse().ok_or(SpatialError::SingularMatrix)? * sigma2;
    let std_errors: Vec<f64> = (0..p).map(|j| cov[(j, j)].max(0.0).sqrt()).collect();
    let t_values: Vec<f64> = (0..p)
        .map(|j| {
            if std_errors[j] > NUMERICAL_EPS {
                beta[j] / std_errors[j]
            } else {
                f64::NAN
            }
        })
        .collect();
    let p_values: Vec<f64> = t_values.iter().map(|&t| two_sided_z(t)).collect();

    let aic = -2.0 * log_likelihood + 2.0 * (p as f64 + 2.0);

    Ok(FittedModel {
        kind,
        coefficients: beta.iter().cloned().collect(),
        coef_names: names,
        std_errors,
        t_values,
        p_values,
        coef_cov: cov.as_slice().to_vec(),
        rho: None,
        rho_se: None,
        spatial_interval: Some((lo, hi)),
        lambda: Some(lambda),
        fitted_values: fitted.iter().cloned().collect(),
        residuals: residuals.iter().cloned().collect(),
        sigma2,
        log_likelihood,
        aic,
        r_squared: None,
        adj_r_squared: None,
        iterations: search.iterations,
        converged: true,
    })
}

/// Options for the simulation-based SAR impacts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactOptions {
    /// Draws from the asymptotic coefficient distribution.
    pub nsim: usize,
    pub seed: u64,
}

impl Default for ImpactOptions {
    fn default() -> Self {
        Self {
            nsim: 200,
            seed: 42,
        }
    }
}

/// Direct / indirect / total effects per predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impacts {
    /// Predictor names (intercept excluded).
    pub names: Vec<String>,
    pub direct: Vec<f64>,
    pub indirect: Vec<f64>,
    pub total: Vec<f64>,
    pub direct_se: Vec<f64>,
    pub indirect_se: Vec<f64>,
    pub total_se: Vec<f64>,
    /// 95% intervals: empirical 2.5/97.5 percentiles of the simulation draws
    /// for SAR, normal approximation for the closed-form paths.
    pub direct_interval: Vec<(f64, f64)>,
    pub indirect_interval: Vec<(f64, f64)>,
    pub total_interval: Vec<(f64, f64)>,
    /// Simulation draws used (0 for the closed-form SLX/SDEM path).
    pub nsim: usize,
    pub seed: u64,
}

/// Impacts decomposition for a fitted model with spatial terms.
///
/// SLX and Durbin error models are closed form: the direct effect is the
/// predictor's own coefficient, the indirect effect its `WX` coefficient.
/// SAR lag impacts flow through `(I - rho W)^-1` and are simulated from the
/// asymptotic coefficient distribution, deterministically for a given seed.
///
/// OLS and the plain spatial error model have no spatial terms to decompose
/// and return [`SpatialError::NotFitted`].
pub fn impacts(
    model: &FittedModel,
    weights: &SpatialWeights,
    opts: &ImpactOptions,
) -> Result<Impacts> {
    match model.kind {
        ModelKind::Slx | ModelKind::SpatialDurbinError => slx_impacts(model, opts.seed),
        ModelKind::SarLag => sar_impacts(model, weights, opts),
        ModelKind::Ols | ModelKind::SpatialError => Err(SpatialError::NotFitted(format!(
            "impacts are not defined for {:?}; fit SLX, SAR lag, or a Durbin model",
            model.kind
        ))),
    }
}

fn coef_cov_entry(model: &FittedModel, i: usize, j: usize) -> f64 {
    let p = model.coefficients.len();
    model.coef_cov[i + j * p]
}

fn slx_impacts(model: &FittedModel, seed: u64) -> Result<Impacts> {
    let mut names = Vec::new();
    let mut direct = Vec::new();
    let mut indirect = Vec::new();
    let mut total = Vec::new();
    let mut direct_se = Vec::new();
    let mut indirect_se = Vec::new();
    let mut total_se = Vec::new();

    for (i, name) in model.coef_names.iter().enumerate() {
        if name == "(Intercept)" || name.starts_with("lag.") {
            continue;
        }
        let lag_name = format!("lag.{}", name);
        let lag_pos = model.coef_names.iter().position(|n| n == &lag_name);

        let beta = model.coefficients[i];
        let var_beta = coef_cov_entry(model, i, i);
        let (theta, var_theta, cov_bt) = match lag_pos {
            Some(j) => (
                model.coefficients[j],
                coef_cov_entry(model, j, j),
                coef_cov_entry(model, i, j),
            ),
            None => (0.0, 0.0, 0.0),
        };

        names.push(name.clone());
        direct.push(beta);
        indirect.push(theta);
        total.push(beta + theta);
        direct_se.push(var_beta.max(0.0).sqrt());
        indirect_se.push(var_theta.max(0.0).sqrt());
        total_se.push((var_beta + var_theta + 2.0 * cov_bt).max(0.0).sqrt());
    }

    let normal_interval = |est: &[f64], se: &[f64]| -> Vec<(f64, f64)> {
        est.iter()
            .zip(se.iter())
            .map(|(&e, &s)| (e - Z_95 * s, e + Z_95 * s))
            .collect()
    };
    let direct_interval = normal_interval(&direct, &direct_se);
    let indirect_interval = normal_interval(&indirect, &indirect_se);
    let total_interval = normal_interval(&total, &total_se);

    Ok(Impacts {
        names,
        direct,
        indirect,
        total,
        direct_se,
        indirect_se,
        total_se,
        direct_interval,
        indirect_interval,
        total_interval,
        nsim: 0,
        seed,
    })
}

/// Two-sided 97.5% standard normal quantile.
const Z_95: f64 = 1.959963984540054;

/// Empirical (2.5%, 97.5%) percentiles of `values`; degenerate inputs
/// collapse to a point interval.
fn empirical_interval(values: &mut [f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let m = values.len();
    let lo = values[((0.025 * (m - 1) as f64).round() as usize).min(m - 1)];
    let hi = values[((0.975 * (m - 1) as f64).round() as usize).min(m - 1)];
    (lo, hi)
}

/// Direct/total multipliers of `(I - rho W)^-1`: diagonal mean and full mean.
fn sar_multipliers(wd: &DMatrix<f64>, rho: f64) -> Option<(f64, f64)> {
    let n = wd.nrows();
    let m = (DMatrix::identity(n, n) - wd * rho).try_inverse()?;
    let trace_mean = m.diagonal().iter().sum::<f64>() / n as f64;
    let full_mean = m.iter().sum::<f64>() / n as f64;
    Some((trace_mean, full_mean))
}

fn sar_impacts(
    model: &FittedModel,
    weights: &SpatialWeights,
    opts: &ImpactOptions,
) -> Result<Impacts> {
    let rho = model
        .rho
        .ok_or_else(|| SpatialError::NotFitted("SAR model carries no rho".to_string()))?;
    if opts.nsim == 0 {
        return Err(SpatialError::DimensionMismatch(
            "SAR impacts need nsim >= 1 simulation draws".to_string(),
        ));
    }
    weights.check_alignment(model.fitted_values.len())?;

    let wd = weights.to_dense().to_dmatrix();
    let (direct_mult, total_mult) =
        sar_multipliers(&wd, rho).ok_or(SpatialError::SingularMatrix)?;

    let predictor_idx: Vec<usize> = model
        .coef_names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.as_str() != "(Intercept)")
        .map(|(i, _)| i)
        .collect();
    let names: Vec<String> = predictor_idx
        .iter()
        .map(|&i| model.coef_names[i].clone())
        .collect();

    // Point estimates at the ML parameters.
    let direct: Vec<f64> = predictor_idx
        .iter()
        .map(|&i| model.coefficients[i] * direct_mult)
        .collect();
    let total: Vec<f64> = predictor_idx
        .iter()
        .map(|&i| model.coefficients[i] * total_mult)
        .collect();
    let indirect: Vec<f64> = direct
        .iter()
        .zip(total.iter())
        .map(|(d, t)| t - d)
        .collect();

    // Cholesky factor of the coefficient covariance for correlated draws;
    // fall back to independent draws when the covariance is not PD.
    let p = model.coefficients.len();
    let cov = DMatrix::from_column_slice(p, p, &model.coef_cov);
    let chol = Cholesky::new(cov.clone());
    if chol.is_none() {
        log::warn!("coefficient covariance not positive definite; using diagonal draws");
    }
    let diag_sd: Vec<f64> = (0..p).map(|j| cov[(j, j)].max(0.0).sqrt()).collect();

    let rho_sd = model.rho_se.unwrap_or(0.0);
    let (lo, hi) = model.spatial_interval.unwrap_or((-1.0, 1.0));

    let mut draws: Vec<Vec<(f64, f64, f64)>> = vec![Vec::with_capacity(opts.nsim); names.len()];
    for r in 0..opts.nsim {
        let mut rng = StdRng::seed_from_u64(opts.seed + r as u64);

        let noise: DVector<f64> =
            DVector::from_iterator(p, (0..p).map(|_| rng.sample::<f64, _>(StandardNormal)));
        let beta_draw: DVector<f64> = match &chol {
            Some(c) => DVector::from_column_slice(model.coefficients.as_slice()) + c.l() * noise,
            None => DVector::from_iterator(
                p,
                (0..p).map(|j| model.coefficients[j] + diag_sd[j] * noise[j]),
            ),
        };

        // Truncated normal draw for rho.
        let mut rho_draw = rho;
        if rho_sd > 0.0 {
            for _ in 0..100 {
                let candidate = rho + rho_sd * rng.sample::<f64, _>(StandardNormal);
                if candidate > lo && candidate < hi {
                    rho_draw = candidate;
                    break;
                }
            }
        }

        if let Some((dm, tm)) = sar_multipliers(&wd, rho_draw) {
            for (slot, &i) in predictor_idx.iter().enumerate() {
                let d = beta_draw[i] * dm;
                let t = beta_draw[i] * tm;
                draws[slot].push((d, t - d, t));
            }
        }
    }

    let summarize = |slot: usize, pick: fn(&(f64, f64, f64)) -> f64| -> f64 {
        let values: Vec<f64> = draws[slot].iter().map(pick).collect();
        if values.len() < 2 {
            return 0.0;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (values.len() - 1) as f64)
            .sqrt()
    };

    let direct_se: Vec<f64> = (0..names.len()).map(|s| summarize(s, |d| d.0)).collect();
    let indirect_se: Vec<f64> = (0..names.len()).map(|s| summarize(s, |d| d.1)).collect();
    let total_se: Vec<f64> = (0..names.len()).map(|s| summarize(s, |d| d.2)).collect();

    let interval = |slot: usize, pick: fn(&(f64, f64, f64)) -> f64| -> (f64, f64) {
        let mut values: Vec<f64> = draws[slot].iter().map(pick).collect();
        empirical_interval(&mut values)
    };
    let direct_interval: Vec<(f64, f64)> =
        (0..names.len()).map(|s| interval(s, |d| d.0)).collect();
    let indirect_interval: Vec<(f64, f64)> =
        (0..names.len()).map(|s| interval(s, |d| d.1)).collect();
    let total_interval: Vec<(f64, f64)> =
        (0..names.len()).map(|s| interval(s, |d| d.2)).collect();

    Ok(Impacts {
        names,
        direct,
        indirect,
        total,
        direct_se,
        indirect_se,
        total_se,
        direct_interval,
        indirect_interval,
        total_interval,
        nsim: opts.nsim,
        seed: opts.seed,
    })
}

/// A single Lagrange Multiplier diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LmStatistic {
    /// Chi-squared(1) statistic.
    pub statistic: f64,
    pub p_value: f64,
}

/// The four Anselin LM diagnostics computed from OLS residuals, used to
/// choose between a lag and an error specification before fitting either.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LmTests {
    pub lm_err: LmStatistic,
    pub lm_lag: LmStatistic,
    pub rlm_err: LmStatistic,
    pub rlm_lag: LmStatistic,
}

fn chi2_1_p(stat: f64) -> f64 {
    ChiSquared::new(1.0)
        .ok()
        .map_or(f64::NAN, |d| 1.0 - d.cdf(stat.max(0.0)))
}

/// Lagrange Multiplier tests (LMerr, LMlag, robust variants) from an OLS fit.
pub fn lm_tests(design: &RegressionDesign, weights: &SpatialWeights) -> Result<LmTests> {
    weights.check_alignment(design.n())?;
    let (xd, _) = base_design(design);
    let y = outcome(design);
    let beta = solve_ols(&xd, &y)?;
    let fitted = &xd * &beta;
    let residuals = &y - &fitted;
    let e: Vec<f64> = residuals.iter().cloned().collect();

    let n = design.n() as f64;
    let sigma2 = e.iter().map(|v| v * v).sum::<f64>() / n;
    if sigma2 < NUMERICAL_EPS {
        return Err(SpatialError::DimensionMismatch(
            "OLS residuals have zero variance".to_string(),
        ));
    }

    let we = weights.lag(&e)?;
    let wy = weights.lag(design.y())?;

    let de = e.iter().zip(we.iter()).map(|(a, b)| a * b).sum::<f64>() / sigma2;
    let dy = e.iter().zip(wy.iter()).map(|(a, b)| a * b).sum::<f64>() / sigma2;

    // T = tr(W'W + WW) for the weights in use.
    let t = weights.s1();

    // J = [ (W X beta)' M (W X beta) + T sigma2 ] / sigma2, M the OLS
    // annihilator.
    let xb: Vec<f64> = fitted.iter().cloned().collect();
    let wxb = DVector::from_vec(weights.lag(&xb)?);
    let gamma = solve_ols(&xd, &wxb)?;
    let m_wxb = &wxb - &xd * &gamma;
    let j = (m_wxb.iter().map(|v| v * v).sum::<f64>() + t * sigma2) / sigma2;

    let lm_err = de * de / t;
    let lm_lag = dy * dy / j;
    let rlm_lag = (dy - de) * (dy - de) / (j - t).max(NUMERICAL_EPS);
    let rlm_err =
        (de - t * dy / j) * (de - t * dy / j) / (t - t * t / j).max(NUMERICAL_EPS);

    Ok(LmTests {
        lm_err: LmStatistic {
            statistic: lm_err,
            p_value: chi2_1_p(lm_err),
        },
        lm_lag: LmStatistic {
            statistic: lm_lag,
            p_value: chi2_1_p(lm_lag),
        },
        rlm_err: LmStatistic {
            statistic: rlm_err,
            p_value: chi2_1_p(rlm_err),
        },
        rlm_lag: LmStatistic {
            statistic: rlm_lag,
            p_value: chi2_1_p(rlm_lag),
        },
    })
}

/// Moran's I test on the OLS residuals of `design` under `weights`: the
/// first diagnostic for whether a spatial model is warranted at all.
pub fn moran_residual_test(
    design: &RegressionDesign,
    weights: &SpatialWeights,
    assumption: VarianceAssumption,
) -> Result<MoranResult> {
    weights.check_alignment(design.n())?;
    let (xd, _) = base_design(design);
    let y = outcome(design);
    let beta = solve_ols(&xd, &y)?;
    let residuals: Vec<f64> = (&y - &xd * &beta).iter().cloned().collect();
    autocorr::morans_i(weights, &residuals, assumption)
}
