//! Example 01: Contiguity Adjacency and Spatial Weights
//!
//! Demonstrates building rook/queen adjacency from polygon geometry,
//! distance-based alternatives from centroids, and turning a graph into a
//! binary or row-standardized weights matrix with island handling.

use sdars_core::{
    build_adjacency, centroids, distance_band_adjacency, knn_adjacency, ContiguityRule, Coord,
    Geometry, SpatialWeights, WeightsStyle,
};

fn unit_square(x: f64, y: f64) -> Geometry {
    Geometry::polygon(vec![
        Coord::new(x, y),
        Coord::new(x + 1.0, y),
        Coord::new(x + 1.0, y + 1.0),
        Coord::new(x, y + 1.0),
    ])
    .expect("valid square")
}

fn grid(side: usize) -> Vec<(u32, Geometry)> {
    let mut units = Vec::new();
    for r in 0..side {
        for c in 0..side {
            units.push(((r * side + c) as u32, unit_square(c as f64, r as f64)));
        }
    }
    units
}

fn main() {
    println!("=== Example 01: Adjacency and Weights ===\n");

    let side = 4;
    let units = grid(side);

    // --- Section 1: Rook vs queen contiguity ---
    println!("--- Contiguity on a {side}x{side} lattice ---");
    for rule in [ContiguityRule::Rook, ContiguityRule::Queen] {
        let graph = build_adjacency(&units, rule).expect("adjacency");
        println!(
            "  {:?}: {} links, degrees {:?}",
            rule,
            graph.link_count(),
            (0..4).map(|i| graph.degree(i)).collect::<Vec<_>>()
        );
    }

    // --- Section 2: Distance-based graphs from centroids ---
    println!("\n--- Distance-based graphs ---");
    let pts = centroids(&units);
    println!("  first centroids: {:?}", &pts[..3]);
    let knn = knn_adjacency(&units, 3).expect("knn");
    println!("  3-nearest-neighbor links: {}", knn.link_count());
    let band = distance_band_adjacency(&units, 1.5).expect("band");
    println!("  distance band (d <= 1.5): {} links", band.link_count());

    // --- Section 3: Weights styles ---
    println!("\n--- Weights styles (queen graph) ---");
    let graph = build_adjacency(&units, ContiguityRule::Queen).expect("adjacency");
    for style in [WeightsStyle::Binary, WeightsStyle::Row] {
        let w = SpatialWeights::standardize(&graph, style, false).expect("weights");
        println!(
            "  {:?}: S0={:.2}, S1={:.2}, S2={:.2}, corner row = {:?}",
            style,
            w.s0(),
            w.s1(),
            w.s2(),
            w.row(0)
        );
    }

    // --- Section 4: Islands and the zero policy ---
    println!("\n--- Islands ---");
    let mut with_island = units.clone();
    with_island.push((99, unit_square(50.0, 50.0)));
    let graph = build_adjacency(&with_island, ContiguityRule::Queen).expect("adjacency");
    println!("  island rows: {:?}", graph.islands());
    match SpatialWeights::standardize(&graph, WeightsStyle::Row, false) {
        Err(e) => println!("  strict policy: {e}"),
        Ok(_) => unreachable!(),
    }
    let w = SpatialWeights::standardize(&graph, WeightsStyle::Row, true).expect("weights");
    println!(
        "  permissive policy: {} of {} units active",
        w.active_units().len(),
        w.n()
    );

    // --- Section 5: Spatial lag ---
    println!("\n--- Spatial lag ---");
    let w = SpatialWeights::standardize(&graph, WeightsStyle::Row, true).expect("weights");
    let values: Vec<f64> = (0..w.n()).map(|i| i as f64).collect();
    let lag = w.lag(&values).expect("lag");
    println!("  values[..5] = {:?}", &values[..5]);
    println!("  lag[..5]    = {:?}", &lag[..5]);
    println!("  island lag  = {}", lag[w.n() - 1]);
}
