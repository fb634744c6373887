//! Neighbor graph construction from geometries.
//!
//! Three builders feed the same weights pipeline:
//! - [`build_adjacency`]: contiguity (Rook / Queen) over polygon boundaries,
//!   with a uniform bounding-box grid so only candidate pairs whose boxes
//!   overlap are tested against the boundary predicates.
//! - [`knn_adjacency`]: k-nearest-neighbor graph on point/centroid
//!   coordinates, symmetrized by union.
//! - [`distance_band_adjacency`]: all pairs within a cutoff distance.
//!
//! The resulting [`AdjacencyGraph`] is symmetric by construction. Units with
//! no neighbors (islands) are legal and recorded with an empty row.

use crate::error::{Result, SpatialError};
use crate::geometry::{collinear_overlap_length, segments_touch, Coord, Geometry};
use crate::helpers::NUMERICAL_EPS;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Contiguity rule for declaring two polygons neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContiguityRule {
    /// Neighbors iff the boundaries share a segment of non-zero length.
    /// Point geometries are always islands under this rule.
    Rook,
    /// Neighbors iff the boundaries intersect at all, including a single
    /// touching point.
    Queen,
}

/// Symmetric neighbor graph over spatial units.
///
/// Row `i` holds the sorted positions (indices into [`AdjacencyGraph::ids`])
/// of the units neighboring unit `i`. Membership tests are O(log deg) via
/// binary search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyGraph {
    ids: Vec<u32>,
    rows: Vec<Vec<usize>>,
}

impl AdjacencyGraph {
    /// Build from an edge list, symmetrizing and deduplicating.
    fn from_pairs(ids: Vec<u32>, pairs: &[(usize, usize)]) -> Self {
        let n = ids.len();
        let mut rows: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(i, j) in pairs {
            if i == j {
                continue;
            }
            rows[i].push(j);
            rows[j].push(i);
        }
        for row in &mut rows {
            row.sort_unstable();
            row.dedup();
        }
        Self { ids, rows }
    }

    /// Number of units.
    pub fn n(&self) -> usize {
        self.ids.len()
    }

    /// Unit ids in row order.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Sorted neighbor positions of unit `i`.
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.rows[i]
    }

    /// Neighbor count of unit `i`.
    pub fn degree(&self, i: usize) -> usize {
        self.rows[i].len()
    }

    /// Whether `j` is a neighbor of `i` (binary search).
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.rows[i].binary_search(&j).is_ok()
    }

    /// Positions of units with no neighbors.
    pub fn islands(&self) -> Vec<usize> {
        (0..self.n()).filter(|&i| self.rows[i].is_empty()).collect()
    }

    /// Total number of directed links.
    pub fn link_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }
}

fn validate_units(units: &[(u32, Geometry)]) -> Result<Vec<u32>> {
    if units.len() < 2 {
        return Err(SpatialError::Geometry(format!(
            "need at least 2 geometries, got {}",
            units.len()
        )));
    }
    let mut seen = HashSet::new();
    for (id, _) in units {
        if !seen.insert(*id) {
            return Err(SpatialError::DimensionMismatch(format!(
                "duplicate unit id {}",
                id
            )));
        }
    }
    Ok(units.iter().map(|(id, _)| *id).collect())
}

/// Centroid coordinates of every unit, in input order.
pub fn centroids(units: &[(u32, Geometry)]) -> Vec<Coord> {
    units.iter().map(|(_, g)| g.centroid()).collect()
}

/// Whether two geometries are neighbors under `rule`.
fn contiguous(a: &Geometry, b: &Geometry, rule: ContiguityRule) -> bool {
    match rule {
        ContiguityRule::Queen => boundaries_touch(a, b),
        ContiguityRule::Rook => shared_boundary_length(a, b) > NUMERICAL_EPS,
    }
}

fn boundaries_touch(a: &Geometry, b: &Geometry) -> bool {
    match (a, b) {
        (Geometry::Point(p), Geometry::Point(q)) => p.distance(q) < NUMERICAL_EPS,
        (Geometry::Point(p), poly) | (poly, Geometry::Point(p)) => poly
            .boundary_segments()
            .iter()
            .any(|&(s1, s2)| point_on_segment(*p, s1, s2)),
        _ => {
            let seg_a = a.boundary_segments();
            let seg_b = b.boundary_segments();
            seg_a.iter().any(|&(a1, a2)| {
                seg_b
                    .iter()
                    .any(|&(b1, b2)| segments_touch(a1, a2, b1, b2))
            })
        }
    }
}

fn shared_boundary_length(a: &Geometry, b: &Geometry) -> f64 {
    let seg_a = a.boundary_segments();
    let seg_b = b.boundary_segments();
    let mut total = 0.0;
    for &(a1, a2) in &seg_a {
        for &(b1, b2) in &seg_b {
            total += collinear_overlap_length(a1, a2, b1, b2);
        }
    }
    total
}

fn point_on_segment(p: Coord, a: Coord, b: Coord) -> bool {
    // Degenerate segment of length ~0 at p counts as contact.
    if a.distance(&b) < NUMERICAL_EPS {
        return p.distance(&a) < NUMERICAL_EPS;
    }
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    cross.abs() < NUMERICAL_EPS
        && p.x >= a.x.min(b.x) - NUMERICAL_EPS
        && p.x <= a.x.max(b.x) + NUMERICAL_EPS
        && p.y >= a.y.min(b.y) - NUMERICAL_EPS
        && p.y <= a.y.max(b.y) + NUMERICAL_EPS
}

/// Build a contiguity graph over polygon (or point) geometries.
///
/// Candidate pairs are pruned with a uniform grid over bounding boxes, so the
/// expensive boundary predicates only run for pairs whose boxes overlap.
///
/// Fewer than 2 geometries or an invalid polygon is a [`SpatialError::Geometry`];
/// duplicated ids are a [`SpatialError::DimensionMismatch`]. A geometry with
/// no touching neighbor is legal and gets an empty neighbor row.
pub fn build_adjacency(units: &[(u32, Geometry)], rule: ContiguityRule) -> Result<AdjacencyGraph> {
    let ids = validate_units(units)?;
    let n = units.len();

    let bboxes: Vec<_> = units.iter().map(|(_, g)| g.bounding_box()).collect();

    // Global extent for the grid index.
    let min_x = bboxes.iter().map(|b| b.min_x).fold(f64::INFINITY, f64::min);
    let min_y = bboxes.iter().map(|b| b.min_y).fold(f64::INFINITY, f64::min);
    let max_x = bboxes
        .iter()
        .map(|b| b.max_x)
        .fold(f64::NEG_INFINITY, f64::max);
    let max_y = bboxes
        .iter()
        .map(|b| b.max_y)
        .fold(f64::NEG_INFINITY, f64::max);

    let cells_per_axis = (n as f64).sqrt().ceil() as usize;
    let cell_w = ((max_x - min_x) / cells_per_axis as f64).max(NUMERICAL_EPS);
    let cell_h = ((max_y - min_y) / cells_per_axis as f64).max(NUMERICAL_EPS);

    let cell_range = |lo: f64, hi: f64, origin: f64, size: f64| -> (usize, usize) {
        let a = (((lo - origin) / size).floor() as isize).max(0) as usize;
        let b = (((hi - origin) / size).floor() as isize).max(0) as usize;
        (a.min(cells_per_axis), b.min(cells_per_axis))
    };

    // Bucket every unit into each grid cell its bbox overlaps.
    let mut buckets: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (idx, bbox) in bboxes.iter().enumerate() {
        let (cx0, cx1) = cell_range(bbox.min_x, bbox.max_x, min_x, cell_w);
        let (cy0, cy1) = cell_range(bbox.min_y, bbox.max_y, min_y, cell_h);
        for cx in cx0..=cx1 {
            for cy in cy0..=cy1 {
                buckets.entry((cx, cy)).or_default().push(idx);
            }
        }
    }

    // Candidate pairs share a cell and have overlapping boxes.
    let mut candidates: HashSet<(usize, usize)> = HashSet::new();
    for bucket in buckets.values() {
        for (a, &i) in bucket.iter().enumerate() {
            for &j in &bucket[a + 1..] {
                let (lo, hi) = if i < j { (i, j) } else { (j, i) };
                if bboxes[lo].overlaps(&bboxes[hi]) {
                    candidates.insert((lo, hi));
                }
            }
        }
    }

    let mut pairs = Vec::new();
    for (i, j) in candidates {
        if contiguous(&units[i].1, &units[j].1, rule) {
            pairs.push((i, j));
        }
    }

    Ok(AdjacencyGraph::from_pairs(ids, &pairs))
}

/// k-nearest-neighbor graph on point/centroid coordinates, symmetrized so
/// that `j` near `i` implies a mutual link even when `i` is not among `j`'s
/// own k nearest.
pub fn knn_adjacency(units: &[(u32, Geometry)], k: usize) -> Result<AdjacencyGraph> {
    let ids = validate_units(units)?;
    let n = units.len();
    if k == 0 || k >= n {
        return Err(SpatialError::DimensionMismatch(format!(
            "k must be in 1..{} for {} units, got {}",
            n - 1,
            n,
            k
        )));
    }

    let coords = centroids(units);
    let mut pairs = Vec::new();
    for i in 0..n {
        let mut dists: Vec<(usize, f64)> = (0..n)
            .filter(|&j| j != i)
            .map(|j| (j, coords[i].distance(&coords[j])))
            .collect();
        dists.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        for &(j, _) in dists.iter().take(k) {
            pairs.push((i, j));
        }
    }

    Ok(AdjacencyGraph::from_pairs(ids, &pairs))
}

/// Graph linking all pairs of units whose centroids lie within `d_max`.
pub fn distance_band_adjacency(units: &[(u32, Geometry)], d_max: f64) -> Result<AdjacencyGraph> {
    let ids = validate_units(units)?;
    if !d_max.is_finite() || d_max <= 0.0 {
        return Err(SpatialError::DimensionMismatch(format!(
            "distance band must be positive and finite, got {}",
            d_max
        )));
    }

    let coords = centroids(units);
    let n = units.len();
    let mut pairs = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if coords[i].distance(&coords[j]) <= d_max {
                pairs.push((i, j));
            }
        }
    }

    Ok(AdjacencyGraph::from_pairs(ids, &pairs))
}
