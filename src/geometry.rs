//! Planar geometry primitives: points and polygons with validation.
//!
//! Geometries are validated once at construction (finite coordinates, rings
//! with at least 3 distinct vertices, non-self-intersecting exterior) so that
//! downstream components can assume well-formed input. A geometry is immutable
//! after construction and is paired with a caller-supplied unique `u32` id by
//! the adjacency builder.

use crate::error::{Result, SpatialError};
use crate::helpers::{euclidean_distance, NUMERICAL_EPS};
use serde::{Deserialize, Serialize};

/// A 2-D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another coordinate.
    pub fn distance(&self, other: &Coord) -> f64 {
        euclidean_distance(self.x, self.y, other.x, other.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn close_to(&self, other: &Coord) -> bool {
        (self.x - other.x).abs() < NUMERICAL_EPS && (self.y - other.y).abs() < NUMERICAL_EPS
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Whether two boxes overlap (touching counts, with a small slack so
    /// shared boundaries survive floating-point noise).
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x + NUMERICAL_EPS
            && other.min_x <= self.max_x + NUMERICAL_EPS
            && self.min_y <= other.max_y + NUMERICAL_EPS
            && other.min_y <= self.max_y + NUMERICAL_EPS
    }
}

/// A spatial unit's shape: a single point or a simple polygon.
///
/// Polygon rings may be passed open or closed; a closing vertex equal to the
/// first is dropped during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Coord),
    Polygon {
        exterior: Vec<Coord>,
        holes: Vec<Vec<Coord>>,
    },
}

impl Geometry {
    /// Construct a point geometry.
    pub fn point(x: f64, y: f64) -> Result<Self> {
        let c = Coord::new(x, y);
        if !c.is_finite() {
            return Err(SpatialError::Geometry(
                "point has non-finite coordinates".to_string(),
            ));
        }
        Ok(Geometry::Point(c))
    }

    /// Construct a polygon from its exterior ring.
    pub fn polygon(exterior: Vec<Coord>) -> Result<Self> {
        Self::polygon_with_holes(exterior, Vec::new())
    }

    /// Construct a polygon with interior holes.
    ///
    /// The exterior ring must have at least 3 distinct vertices, only finite
    /// coordinates, and no self-intersections. Holes are checked for the
    /// first two conditions.
    pub fn polygon_with_holes(exterior: Vec<Coord>, holes: Vec<Vec<Coord>>) -> Result<Self> {
        let exterior = normalize_ring(exterior)?;
        check_self_intersection(&exterior)?;
        let holes = holes
            .into_iter()
            .map(normalize_ring)
            .collect::<Result<Vec<_>>>()?;
        Ok(Geometry::Polygon { exterior, holes })
    }

    /// Axis-aligned bounding box over all vertices.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        let mut grow = |c: &Coord| {
            bbox.min_x = bbox.min_x.min(c.x);
            bbox.min_y = bbox.min_y.min(c.y);
            bbox.max_x = bbox.max_x.max(c.x);
            bbox.max_y = bbox.max_y.max(c.y);
        };
        match self {
            Geometry::Point(c) => grow(c),
            Geometry::Polygon { exterior, holes } => {
                for c in exterior {
                    grow(c);
                }
                for ring in holes {
                    for c in ring {
                        grow(c);
                    }
                }
            }
        }
        bbox
    }

    /// Signed shoelace area of a ring (positive for counter-clockwise).
    fn ring_area(ring: &[Coord]) -> f64 {
        let n = ring.len();
        let mut sum = 0.0;
        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        sum / 2.0
    }

    /// Unsigned area; hole areas are subtracted. Zero for points.
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Point(_) => 0.0,
            Geometry::Polygon { exterior, holes } => {
                let mut area = Self::ring_area(exterior).abs();
                for ring in holes {
                    area -= Self::ring_area(ring).abs();
                }
                area.max(0.0)
            }
        }
    }

    /// Centroid: the point itself, or the area-weighted polygon centroid
    /// (exterior ring only; holes are ignored for simplicity).
    pub fn centroid(&self) -> Coord {
        match self {
            Geometry::Point(c) => *c,
            Geometry::Polygon { exterior, .. } => {
                let n = exterior.len();
                let signed = Self::ring_area(exterior);
                if signed.abs() < NUMERICAL_EPS {
                    // Degenerate ring area: fall back to the vertex mean.
                    let mut cx = 0.0;
                    let mut cy = 0.0;
                    for c in exterior {
                        cx += c.x;
                        cy += c.y;
                    }
                    return Coord::new(cx / n as f64, cy / n as f64);
                }
                let mut cx = 0.0;
                let mut cy = 0.0;
                for i in 0..n {
                    let a = exterior[i];
                    let b = exterior[(i + 1) % n];
                    let cross = a.x * b.y - b.x * a.y;
                    cx += (a.x + b.x) * cross;
                    cy += (a.y + b.y) * cross;
                }
                Coord::new(cx / (6.0 * signed), cy / (6.0 * signed))
            }
        }
    }

    /// All boundary segments (exterior plus holes). Empty for points.
    pub(crate) fn boundary_segments(&self) -> Vec<(Coord, Coord)> {
        match self {
            Geometry::Point(_) => Vec::new(),
            Geometry::Polygon { exterior, holes } => {
                let mut segments = Vec::new();
                push_ring_segments(exterior, &mut segments);
                for ring in holes {
                    push_ring_segments(ring, &mut segments);
                }
                segments
            }
        }
    }
}

fn push_ring_segments(ring: &[Coord], out: &mut Vec<(Coord, Coord)>) {
    let n = ring.len();
    for i in 0..n {
        out.push((ring[i], ring[(i + 1) % n]));
    }
}

/// Drop a closing vertex, then require at least 3 distinct finite vertices.
fn normalize_ring(mut ring: Vec<Coord>) -> Result<Vec<Coord>> {
    if ring.len() >= 2 && ring[0].close_to(&ring[ring.len() - 1]) {
        ring.pop();
    }
    if ring.iter().any(|c| !c.is_finite()) {
        return Err(SpatialError::Geometry(
            "ring has non-finite coordinates".to_string(),
        ));
    }
    // Collapse consecutive duplicates so no zero-length segments remain.
    let mut cleaned: Vec<Coord> = Vec::with_capacity(ring.len());
    for c in &ring {
        if cleaned.last().map_or(true, |last| !last.close_to(c)) {
            cleaned.push(*c);
        }
    }
    let mut distinct: Vec<Coord> = Vec::with_capacity(cleaned.len());
    for c in &cleaned {
        if !distinct.iter().any(|d| d.close_to(c)) {
            distinct.push(*c);
        }
    }
    if distinct.len() < 3 {
        return Err(SpatialError::Geometry(format!(
            "ring has {} distinct vertices, need at least 3",
            distinct.len()
        )));
    }
    Ok(cleaned)
}

/// Reject exteriors whose non-adjacent segments cross or improperly touch.
fn check_self_intersection(ring: &[Coord]) -> Result<()> {
    let n = ring.len();
    for i in 0..n {
        let (a1, a2) = (ring[i], ring[(i + 1) % n]);
        for j in (i + 1)..n {
            // Skip adjacent segments (shared vertex is legal).
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b1, b2) = (ring[j], ring[(j + 1) % n]);
            if segments_touch(a1, a2, b1, b2) {
                return Err(SpatialError::Geometry(format!(
                    "self-intersecting ring: segments {} and {} cross",
                    i, j
                )));
            }
        }
    }
    Ok(())
}

fn cross(o: Coord, a: Coord, b: Coord) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn on_segment(p: Coord, a: Coord, b: Coord) -> bool {
    cross(a, b, p).abs() < NUMERICAL_EPS
        && p.x >= a.x.min(b.x) - NUMERICAL_EPS
        && p.x <= a.x.max(b.x) + NUMERICAL_EPS
        && p.y >= a.y.min(b.y) - NUMERICAL_EPS
        && p.y <= a.y.max(b.y) + NUMERICAL_EPS
}

/// Whether two segments intersect at all, including single-point contact.
pub(crate) fn segments_touch(a1: Coord, a2: Coord, b1: Coord, b2: Coord) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);

    if ((d1 > NUMERICAL_EPS && d2 < -NUMERICAL_EPS) || (d1 < -NUMERICAL_EPS && d2 > NUMERICAL_EPS))
        && ((d3 > NUMERICAL_EPS && d4 < -NUMERICAL_EPS)
            || (d3 < -NUMERICAL_EPS && d4 > NUMERICAL_EPS))
    {
        return true;
    }

    on_segment(a1, b1, b2)
        || on_segment(a2, b1, b2)
        || on_segment(b1, a1, a2)
        || on_segment(b2, a1, a2)
}

/// Length of the collinear overlap between two segments, 0.0 if they are not
/// collinear or only meet at a point.
pub(crate) fn collinear_overlap_length(a1: Coord, a2: Coord, b1: Coord, b2: Coord) -> f64 {
    // All four points must lie on one line.
    if cross(a1, a2, b1).abs() > NUMERICAL_EPS || cross(a1, a2, b2).abs() > NUMERICAL_EPS {
        return 0.0;
    }
    let dx = a2.x - a1.x;
    let dy = a2.y - a1.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < NUMERICAL_EPS {
        return 0.0;
    }
    // Parametric positions along a1 -> a2, in world units.
    let project = |p: Coord| ((p.x - a1.x) * dx + (p.y - a1.y) * dy) / len;
    let (ta, tb) = (0.0, len);
    let (mut tc, mut td) = (project(b1), project(b2));
    if tc > td {
        std::mem::swap(&mut tc, &mut td);
    }
    (td.min(tb) - tc.max(ta)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square(x0: f64, y0: f64) -> Geometry {
        Geometry::polygon(vec![
            Coord::new(x0, y0),
            Coord::new(x0 + 1.0, y0),
            Coord::new(x0 + 1.0, y0 + 1.0),
            Coord::new(x0, y0 + 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_point_validation() {
        assert!(Geometry::point(1.0, 2.0).is_ok());
        assert!(matches!(
            Geometry::point(f64::NAN, 0.0),
            Err(SpatialError::Geometry(_))
        ));
    }

    #[test]
    fn test_polygon_too_few_vertices() {
        let result = Geometry::polygon(vec![Coord::new(0.0, 0.0), Coord::new(1.0, 0.0)]);
        assert!(matches!(result, Err(SpatialError::Geometry(_))));
    }

    #[test]
    fn test_polygon_closed_ring_accepted() {
        // Same square, explicitly closed
        let closed = Geometry::polygon(vec![
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(1.0, 1.0),
            Coord::new(0.0, 1.0),
            Coord::new(0.0, 0.0),
        ])
        .unwrap();
        assert!((closed.area() - 1.0).abs() < NUMERICAL_EPS);
    }

    #[test]
    fn test_self_intersecting_polygon_rejected() {
        // Bowtie
        let result = Geometry::polygon(vec![
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 1.0),
            Coord::new(1.0, 0.0),
            Coord::new(0.0, 1.0),
        ]);
        assert!(matches!(result, Err(SpatialError::Geometry(_))));
    }

    #[test]
    fn test_area_and_centroid_square() {
        let sq = unit_square(2.0, 3.0);
        assert!((sq.area() - 1.0).abs() < NUMERICAL_EPS);
        let c = sq.centroid();
        assert!((c.x - 2.5).abs() < NUMERICAL_EPS);
        assert!((c.y - 3.5).abs() < NUMERICAL_EPS);
    }

    #[test]
    fn test_area_with_hole() {
        let outer = vec![
            Coord::new(0.0, 0.0),
            Coord::new(4.0, 0.0),
            Coord::new(4.0, 4.0),
            Coord::new(0.0, 4.0),
        ];
        let hole = vec![
            Coord::new(1.0, 1.0),
            Coord::new(2.0, 1.0),
            Coord::new(2.0, 2.0),
            Coord::new(1.0, 2.0),
        ];
        let poly = Geometry::polygon_with_holes(outer, vec![hole]).unwrap();
        assert!((poly.area() - 15.0).abs() < NUMERICAL_EPS);
    }

    #[test]
    fn test_bounding_box_overlap() {
        let a = unit_square(0.0, 0.0).bounding_box();
        let b = unit_square(1.0, 0.0).bounding_box(); // shares an edge
        let c = unit_square(3.0, 3.0).bounding_box();
        assert!(a.overlaps(&b), "touching boxes overlap");
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_segments_touch_crossing() {
        let touch = segments_touch(
            Coord::new(0.0, 0.0),
            Coord::new(2.0, 2.0),
            Coord::new(0.0, 2.0),
            Coord::new(2.0, 0.0),
        );
        assert!(touch, "crossing segments touch");
    }

    #[test]
    fn test_segments_touch_endpoint_only() {
        let touch = segments_touch(
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(2.0, 1.0),
        );
        assert!(touch, "endpoint contact counts");

        let apart = segments_touch(
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(0.0, 1.0),
            Coord::new(1.0, 1.0),
        );
        assert!(!apart, "parallel segments at distance do not touch");
    }

    #[test]
    fn test_collinear_overlap_length() {
        // Overlap of length 1 on the x axis
        let len = collinear_overlap_length(
            Coord::new(0.0, 0.0),
            Coord::new(2.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(3.0, 0.0),
        );
        assert!((len - 1.0).abs() < 1e-9);

        // Point contact only
        let len = collinear_overlap_length(
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(2.0, 0.0),
        );
        assert!(len.abs() < 1e-9);

        // Not collinear
        let len = collinear_overlap_length(
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(0.0, 1.0),
            Coord::new(1.0, 1.0),
        );
        assert_eq!(len, 0.0);
    }

    #[test]
    fn test_centroid_point() {
        let p = Geometry::point(4.0, -2.0).unwrap();
        let c = p.centroid();
        assert_eq!((c.x, c.y), (4.0, -2.0));
        assert_eq!(p.area(), 0.0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let sq = unit_square(0.0, 0.0);
        let json = serde_json::to_string(&sq).unwrap();
        let back: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(sq, back);
    }
}
