//! Shared numeric helpers: summary statistics, distances, and the
//! golden-section search used by the ML estimators and the GWR bandwidth
//! cross-validation.

/// Small epsilon for numerical comparisons (e.g., avoiding division by zero).
pub const NUMERICAL_EPS: f64 = 1e-10;

/// Default convergence tolerance for iterative algorithms.
pub const DEFAULT_CONVERGENCE_TOL: f64 = 1e-6;

/// Default iteration budget for the golden-section search.
pub const GOLDEN_SECTION_MAX_ITER: usize = 200;

/// Arithmetic mean of a slice. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by n). Returns 0.0 for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Subtract the mean from every element.
pub fn center(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    values.iter().map(|&v| v - m).collect()
}

/// Euclidean distance between two planar points.
pub fn euclidean_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    (dx * dx + dy * dy).sqrt()
}

/// Outcome of a golden-section search.
#[derive(Debug, Clone, Copy)]
pub struct GoldenSectionResult {
    /// Argmin (or argmax for [`golden_section_max`]).
    pub x: f64,
    /// Objective value at `x`.
    pub value: f64,
    /// Number of interval contractions performed.
    pub iterations: usize,
    /// Whether the interval shrank below tolerance within the budget.
    pub converged: bool,
}

/// Minimize a unimodal function on `[a, b]` by golden-section search.
///
/// The search always returns its best point; callers that must not accept an
/// unconverged answer check the `converged` flag.
pub fn golden_section_min<F>(
    f: F,
    a: f64,
    b: f64,
    tol: f64,
    max_iter: usize,
) -> GoldenSectionResult
where
    F: Fn(f64) -> f64,
{
    // 1/phi
    const INV_PHI: f64 = 0.618_033_988_749_894_9;

    let (mut lo, mut hi) = if a <= b { (a, b) } else { (b, a) };
    let mut x1 = hi - INV_PHI * (hi - lo);
    let mut x2 = lo + INV_PHI * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);

    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        iterations += 1;
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - INV_PHI * (hi - lo);
            f1 = f(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + INV_PHI * (hi - lo);
            f2 = f(x2);
        }
        if (hi - lo).abs() < tol {
            converged = true;
            break;
        }
    }

    let (x, value) = if f1 <= f2 { (x1, f1) } else { (x2, f2) };
    GoldenSectionResult {
        x,
        value,
        iterations,
        converged,
    }
}

/// Maximize a unimodal function on `[a, b]` by golden-section search.
pub fn golden_section_max<F>(
    f: F,
    a: f64,
    b: f64,
    tol: f64,
    max_iter: usize,
) -> GoldenSectionResult
where
    F: Fn(f64) -> f64,
{
    let result = golden_section_min(|x| -f(x), a, b, tol, max_iter);
    GoldenSectionResult {
        x: result.x,
        value: -result.value,
        iterations: result.iterations,
        converged: result.converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert!((mean(&v) - 2.5).abs() < NUMERICAL_EPS);
        assert!((variance(&v) - 1.25).abs() < NUMERICAL_EPS);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
    }

    #[test]
    fn test_center_sums_to_zero() {
        let v = vec![3.0, 7.0, 11.0, -2.0];
        let c = center(&v);
        let s: f64 = c.iter().sum();
        assert!(s.abs() < NUMERICAL_EPS, "centered values should sum to 0");
    }

    #[test]
    fn test_euclidean_distance() {
        assert!((euclidean_distance(0.0, 0.0, 3.0, 4.0) - 5.0).abs() < NUMERICAL_EPS);
        assert_eq!(euclidean_distance(1.0, 1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_golden_section_min_quadratic() {
        let result = golden_section_min(|x| (x - 2.0) * (x - 2.0), -10.0, 10.0, 1e-8, 200);
        assert!(result.converged);
        assert!(
            (result.x - 2.0).abs() < 1e-6,
            "minimum of (x-2)^2 should be at 2, got {}",
            result.x
        );
        assert!(result.value < 1e-10);
    }

    #[test]
    fn test_golden_section_max_concave() {
        let result = golden_section_max(|x| -(x + 1.0) * (x + 1.0) + 5.0, -10.0, 10.0, 1e-8, 200);
        assert!(result.converged);
        assert!((result.x + 1.0).abs() < 1e-6);
        assert!((result.value - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_golden_section_reports_budget_exhaustion() {
        let result = golden_section_min(|x| x * x, -1.0, 1.0, 1e-12, 3);
        assert!(!result.converged, "3 iterations cannot reach 1e-12");
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_golden_section_swapped_bounds() {
        let result = golden_section_min(|x| (x - 0.5) * (x - 0.5), 1.0, 0.0, 1e-8, 200);
        assert!((result.x - 0.5).abs() < 1e-6);
    }
}
