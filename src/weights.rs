//! Spatial weights matrices derived from adjacency graphs.
//!
//! A [`SpatialWeights`] is an immutable sparse row-wise weighting scheme built
//! once from an [`AdjacencyGraph`] and reused across every statistic and model
//! in this crate. Row standardization, the island `zero_policy`, and the
//! Cliff-Ord spectral sums S0/S1/S2 (cached for the Moran variance formulas)
//! all live here.

use crate::adjacency::AdjacencyGraph;
use crate::error::{Result, SpatialError};
use crate::matrix::SdMatrix;
use serde::{Deserialize, Serialize};

/// Weighting scheme applied to neighbor links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightsStyle {
    /// Every neighbor gets weight 1.
    Binary,
    /// Every neighbor of row `i` gets weight `1/deg(i)` so rows sum to 1
    /// (the "W" style). Rows with zero neighbors stay all-zero.
    Row,
}

/// Immutable sparse spatial weights matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialWeights {
    ids: Vec<u32>,
    /// Per row: sorted `(neighbor position, weight)` entries.
    rows: Vec<Vec<(usize, f64)>>,
    style: WeightsStyle,
    zero_policy: bool,
    island: Vec<bool>,
    s0: f64,
    s1: f64,
    s2: f64,
}

impl SpatialWeights {
    /// Build weights from an adjacency graph.
    ///
    /// With `zero_policy = false`, any zero-neighbor unit is a
    /// [`SpatialError::IsolatedUnit`]. With `zero_policy = true`, islands are
    /// kept as all-zero rows, flagged, and excluded from the denominator
    /// computations of downstream statistics.
    pub fn standardize(
        graph: &AdjacencyGraph,
        style: WeightsStyle,
        zero_policy: bool,
    ) -> Result<Self> {
        let n = graph.n();
        let mut island = vec![false; n];
        let mut rows: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);

        for i in 0..n {
            let neighbors = graph.neighbors(i);
            if neighbors.is_empty() {
                if !zero_policy {
                    return Err(SpatialError::IsolatedUnit {
                        id: graph.ids()[i],
                    });
                }
                island[i] = true;
                rows.push(Vec::new());
                continue;
            }
            let w = match style {
                WeightsStyle::Binary => 1.0,
                WeightsStyle::Row => 1.0 / neighbors.len() as f64,
            };
            rows.push(neighbors.iter().map(|&j| (j, w)).collect());
        }

        let (s0, s1, s2) = spectral_sums(&rows);

        Ok(Self {
            ids: graph.ids().to_vec(),
            rows,
            style,
            zero_policy,
            island,
            s0,
            s1,
            s2,
        })
    }

    /// Number of units.
    pub fn n(&self) -> usize {
        self.ids.len()
    }

    /// Unit ids in row order.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Sorted `(neighbor position, weight)` entries of row `i`.
    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.rows[i]
    }

    /// Weighting style used at construction.
    pub fn style(&self) -> WeightsStyle {
        self.style
    }

    /// Whether islands were kept as all-zero rows.
    pub fn zero_policy(&self) -> bool {
        self.zero_policy
    }

    /// Whether unit `i` has no neighbors.
    pub fn is_island(&self, i: usize) -> bool {
        self.island[i]
    }

    /// Number of zero-neighbor units.
    pub fn n_islands(&self) -> usize {
        self.island.iter().filter(|&&b| b).count()
    }

    /// Positions of units that do have neighbors. Statistics compute their
    /// means and denominators over this subset.
    pub fn active_units(&self) -> Vec<usize> {
        (0..self.n()).filter(|&i| !self.island[i]).collect()
    }

    /// Sum of all weights.
    pub fn s0(&self) -> f64 {
        self.s0
    }

    /// `0.5 * sum_ij (w_ij + w_ji)^2`.
    pub fn s1(&self) -> f64 {
        self.s1
    }

    /// `sum_i (row_sum_i + col_sum_i)^2`.
    pub fn s2(&self) -> f64 {
        self.s2
    }

    /// Weight `w_ij`, 0.0 when not a neighbor.
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        match self.rows[i].binary_search_by_key(&j, |&(idx, _)| idx) {
            Ok(pos) => self.rows[i][pos].1,
            Err(_) => 0.0,
        }
    }

    /// Reject value slices not aligned one-to-one with the units.
    pub fn check_alignment(&self, len: usize) -> Result<()> {
        if len != self.n() {
            return Err(SpatialError::DimensionMismatch(format!(
                "expected {} values aligned to the weights, got {}",
                self.n(),
                len
            )));
        }
        Ok(())
    }

    /// Spatial lag: the weighted sum of neighboring values per unit.
    /// Island rows contribute a lag of exactly 0.0.
    pub fn lag(&self, values: &[f64]) -> Result<Vec<f64>> {
        self.check_alignment(values.len())?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.iter().map(|&(j, w)| w * values[j]).sum())
            .collect())
    }

    /// Dense `n x n` export for the eigenvalue and inverse paths of the
    /// regression estimators.
    pub fn to_dense(&self) -> SdMatrix {
        let n = self.n();
        let mut dense = SdMatrix::zeros(n, n);
        for (i, row) in self.rows.iter().enumerate() {
            for &(j, w) in row {
                dense[(i, j)] = w;
            }
        }
        dense
    }
}

fn spectral_sums(rows: &[Vec<(usize, f64)>]) -> (f64, f64, f64) {
    let n = rows.len();
    let weight_at = |i: usize, j: usize| -> f64 {
        match rows[i].binary_search_by_key(&j, |&(idx, _)| idx) {
            Ok(pos) => rows[i][pos].1,
            Err(_) => 0.0,
        }
    };

    let mut s0 = 0.0;
    let mut s1 = 0.0;
    let mut row_sums = vec![0.0; n];
    let mut col_sums = vec![0.0; n];

    for (i, row) in rows.iter().enumerate() {
        for &(j, w) in row {
            s0 += w;
            row_sums[i] += w;
            col_sums[j] += w;
            let pair = w + weight_at(j, i);
            s1 += 0.5 * pair * pair;
        }
    }

    let s2 = (0..n)
        .map(|i| {
            let t = row_sums[i] + col_sums[i];
            t * t
        })
        .sum();

    (s0, s1, s2)
}

/// Attribute values aligned one-to-one with a weights matrix's unit order.
///
/// Construction validates that every value is finite and that id-keyed input
/// matches the weights' ids exactly (no unmatched, missing, or duplicate ids).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeVector {
    values: Vec<f64>,
}

impl AttributeVector {
    /// From values already in the weights' unit order.
    pub fn from_values(weights: &SpatialWeights, values: Vec<f64>) -> Result<Self> {
        weights.check_alignment(values.len())?;
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(SpatialError::DimensionMismatch(format!(
                "attribute value at position {} is not finite",
                pos
            )));
        }
        Ok(Self { values })
    }

    /// From `(id, value)` pairs, reordered to the weights' unit order.
    ///
    /// Unmatched ids are rejected rather than silently dropped.
    pub fn from_pairs(weights: &SpatialWeights, pairs: &[(u32, f64)]) -> Result<Self> {
        weights.check_alignment(pairs.len())?;
        let mut values = vec![f64::NAN; weights.n()];
        let mut filled = vec![false; weights.n()];
        for &(id, value) in pairs {
            let pos = weights
                .ids()
                .iter()
                .position(|&wid| wid == id)
                .ok_or_else(|| {
                    SpatialError::DimensionMismatch(format!("attribute id {} has no unit", id))
                })?;
            if filled[pos] {
                return Err(SpatialError::DimensionMismatch(format!(
                    "duplicate attribute id {}",
                    id
                )));
            }
            filled[pos] = true;
            values[pos] = value;
        }
        Self::from_values(weights, values)
    }

    /// Values in the weights' unit order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::{build_adjacency, distance_band_adjacency, ContiguityRule};
    use crate::geometry::{Coord, Geometry};
    use crate::helpers::NUMERICAL_EPS;

    fn square_grid(rows: usize, cols: usize) -> Vec<(u32, Geometry)> {
        let mut units = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let (x, y) = (c as f64, r as f64);
                let poly = Geometry::polygon(vec![
                    Coord::new(x, y),
                    Coord::new(x + 1.0, y),
                    Coord::new(x + 1.0, y + 1.0),
                    Coord::new(x, y + 1.0),
                ])
                .unwrap();
                units.push(((r * cols + c) as u32, poly));
            }
        }
        units
    }

    fn grid_weights(rows: usize, cols: usize, style: WeightsStyle) -> SpatialWeights {
        let units = square_grid(rows, cols);
        let graph = build_adjacency(&units, ContiguityRule::Queen).unwrap();
        SpatialWeights::standardize(&graph, style, false).unwrap()
    }

    #[test]
    fn test_row_standardized_rows_sum_to_one() {
        let w = grid_weights(4, 4, WeightsStyle::Row);
        for i in 0..w.n() {
            let row_sum: f64 = w.row(i).iter().map(|&(_, wt)| wt).sum();
            assert!(
                (row_sum - 1.0).abs() < NUMERICAL_EPS,
                "row {} sums to {}",
                i,
                row_sum
            );
        }
    }

    #[test]
    fn test_binary_weights() {
        let w = grid_weights(3, 3, WeightsStyle::Binary);
        for i in 0..w.n() {
            for &(_, wt) in w.row(i) {
                assert_eq!(wt, 1.0);
            }
        }
        // Queen 3x3: 4*3 + 4*5 + 8 = 40 directed links
        assert!((w.s0() - 40.0).abs() < NUMERICAL_EPS);
    }

    #[test]
    fn test_strict_zero_policy_rejects_island() {
        let units = vec![
            (7, Geometry::point(0.0, 0.0).unwrap()),
            (8, Geometry::point(1.0, 0.0).unwrap()),
            (9, Geometry::point(50.0, 0.0).unwrap()),
        ];
        let graph = distance_band_adjacency(&units, 2.0).unwrap();
        let err = SpatialWeights::standardize(&graph, WeightsStyle::Row, false);
        assert!(matches!(err, Err(SpatialError::IsolatedUnit { id: 9 })));

        let w = SpatialWeights::standardize(&graph, WeightsStyle::Row, true).unwrap();
        assert!(w.is_island(2));
        assert_eq!(w.n_islands(), 1);
        assert_eq!(w.active_units(), vec![0, 1]);
        assert!(w.row(2).is_empty());
    }

    #[test]
    fn test_lag_simple_chain() {
        // 1x3 strip: 0 - 1 - 2 (queen == rook here)
        let units = square_grid(1, 3);
        let graph = build_adjacency(&units, ContiguityRule::Queen).unwrap();
        let w = SpatialWeights::standardize(&graph, WeightsStyle::Row, false).unwrap();

        let lag = w.lag(&[10.0, 20.0, 30.0]).unwrap();
        assert!((lag[0] - 20.0).abs() < NUMERICAL_EPS);
        assert!((lag[1] - 20.0).abs() < NUMERICAL_EPS, "mean of 10 and 30");
        assert!((lag[2] - 20.0).abs() < NUMERICAL_EPS);

        assert!(w.lag(&[1.0, 2.0]).is_err(), "length mismatch rejected");
    }

    #[test]
    fn test_island_lag_is_zero() {
        let units = vec![
            (0, Geometry::point(0.0, 0.0).unwrap()),
            (1, Geometry::point(1.0, 0.0).unwrap()),
            (2, Geometry::point(50.0, 0.0).unwrap()),
        ];
        let graph = distance_band_adjacency(&units, 2.0).unwrap();
        let w = SpatialWeights::standardize(&graph, WeightsStyle::Row, true).unwrap();
        let lag = w.lag(&[5.0, 7.0, 100.0]).unwrap();
        assert_eq!(lag[2], 0.0, "island contributes zero spatial lag");
    }

    #[test]
    fn test_spectral_sums_binary_symmetric() {
        let w = grid_weights(2, 2, WeightsStyle::Binary);
        // Queen 2x2 is a complete graph on 4 nodes: 12 directed links.
        assert!((w.s0() - 12.0).abs() < NUMERICAL_EPS);
        // Symmetric binary: S1 = 2 * S0
        assert!((w.s1() - 24.0).abs() < NUMERICAL_EPS);
        // Each unit: row sum 3 + col sum 3 = 6, squared = 36, times 4
        assert!((w.s2() - 144.0).abs() < NUMERICAL_EPS);
    }

    #[test]
    fn test_to_dense_matches_sparse() {
        let w = grid_weights(3, 3, WeightsStyle::Row);
        let dense = w.to_dense();
        for i in 0..w.n() {
            for j in 0..w.n() {
                assert!(
                    (dense[(i, j)] - w.weight(i, j)).abs() < NUMERICAL_EPS,
                    "dense and sparse disagree at ({}, {})",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_attribute_vector_from_pairs_reorders() {
        let w = grid_weights(1, 3, WeightsStyle::Row);
        // Pairs out of order
        let attr = AttributeVector::from_pairs(&w, &[(2, 30.0), (0, 10.0), (1, 20.0)]).unwrap();
        assert_eq!(attr.values(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_attribute_vector_rejects_bad_input() {
        let w = grid_weights(1, 3, WeightsStyle::Row);

        // Unknown id
        assert!(AttributeVector::from_pairs(&w, &[(0, 1.0), (1, 2.0), (42, 3.0)]).is_err());
        // Duplicate id
        assert!(AttributeVector::from_pairs(&w, &[(0, 1.0), (0, 2.0), (1, 3.0)]).is_err());
        // Wrong length
        assert!(AttributeVector::from_values(&w, vec![1.0, 2.0]).is_err());
        // Non-finite value
        assert!(AttributeVector::from_values(&w, vec![1.0, f64::NAN, 3.0]).is_err());
    }

    #[test]
    fn test_weights_immutable_reuse() {
        let w = grid_weights(2, 2, WeightsStyle::Row);
        let lag1 = w.lag(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let lag2 = w.lag(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(lag1, lag2);
    }

    #[test]
    fn test_serde_roundtrip() {
        let w = grid_weights(2, 2, WeightsStyle::Row);
        let json = serde_json::to_string(&w).unwrap();
        let back: SpatialWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(w, back);
    }
}
