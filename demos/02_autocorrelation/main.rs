//! Example 02: Spatial Autocorrelation
//!
//! Demonstrates global Moran's I with analytic and permutation inference,
//! the local Moran (LISA) cluster map, and Getis-Ord hotspot detection.

use sdars_core::{
    build_adjacency, getis_ord, local_morans_i, morans_i, morans_i_permutation, ContiguityRule,
    Coord, Geometry, LisaCategory, LisaOptions, PermutationOptions, SpatialWeights,
    VarianceAssumption, WeightsStyle,
};

fn grid(side: usize) -> Vec<(u32, Geometry)> {
    let mut units = Vec::new();
    for r in 0..side {
        for c in 0..side {
            let (x, y) = (c as f64, r as f64);
            let poly = Geometry::polygon(vec![
                Coord::new(x, y),
                Coord::new(x + 1.0, y),
                Coord::new(x + 1.0, y + 1.0),
                Coord::new(x, y + 1.0),
            ])
            .expect("valid square");
            units.push(((r * side + c) as u32, poly));
        }
    }
    units
}

fn category_symbol(c: LisaCategory) -> char {
    match c {
        LisaCategory::NotSignificant => '.',
        LisaCategory::HighHigh => 'H',
        LisaCategory::LowLow => 'L',
        LisaCategory::HighLow => 'h',
        LisaCategory::LowHigh => 'l',
    }
}

fn main() {
    println!("=== Example 02: Spatial Autocorrelation ===\n");

    let side = 8;
    let units = grid(side);
    let graph = build_adjacency(&units, ContiguityRule::Queen).expect("adjacency");
    let w = SpatialWeights::standardize(&graph, WeightsStyle::Row, false).expect("weights");

    // A hotspot block on a noisy background.
    let values: Vec<f64> = (0..side * side)
        .map(|i| {
            let (r, c) = (i / side, i % side);
            let base = if (2..=4).contains(&r) && (2..=4).contains(&c) {
                8.0
            } else {
                1.0
            };
            base + 0.3 * ((i as f64 * 17.3).sin())
        })
        .collect();

    // --- Section 1: Global Moran's I, analytic ---
    println!("--- Global Moran's I ---");
    for assumption in [
        VarianceAssumption::Normality,
        VarianceAssumption::Randomization,
    ] {
        let result = morans_i(&w, &values, assumption).expect("moran");
        println!(
            "  {:?}: I={:.4}, E[I]={:.4}, var={:.6}, z={:.2}, p={:.4}",
            assumption, result.statistic, result.expected, result.variance, result.z_score,
            result.p_value
        );
    }

    // --- Section 2: Permutation inference ---
    println!("\n--- Permutation test (999 sims, seed 42) ---");
    let perm = morans_i_permutation(&w, &values, &PermutationOptions::default()).expect("perm");
    println!(
        "  I={:.4}, pseudo p={:.4}, null mean={:.4}, null sd={:.4}",
        perm.statistic, perm.p_value, perm.sim_mean, perm.sim_sd
    );

    // --- Section 3: LISA cluster map ---
    println!("\n--- Local Moran (LISA) cluster map ---");
    let lisa = local_morans_i(&w, &values, &LisaOptions::default()).expect("lisa");
    for r in 0..side {
        let row: String = (0..side)
            .map(|c| category_symbol(lisa.categories[r * side + c]))
            .collect();
        println!("  {row}");
    }
    let significant = lisa
        .categories
        .iter()
        .filter(|&&c| c != LisaCategory::NotSignificant)
        .count();
    println!("  {significant} of {} units significant at alpha={}", w.n(), lisa.alpha);

    // --- Section 4: Getis-Ord hotspots ---
    println!("\n--- Getis-Ord Gi* ---");
    let gi_star = getis_ord(&w, &values, true).expect("gi*");
    let (hottest, z_max) = gi_star
        .z_scores
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |acc, (i, &z)| {
            if z > acc.1 {
                (i, z)
            } else {
                acc
            }
        });
    println!(
        "  hottest unit: {} (row {}, col {}) with z={:.2}",
        hottest,
        hottest / side,
        hottest % side,
        z_max
    );
    let hot = gi_star.z_scores.iter().filter(|&&z| z > 1.96).count();
    let cold = gi_star.z_scores.iter().filter(|&&z| z < -1.96).count();
    println!("  {hot} hot units, {cold} cold units at |z| > 1.96");
}
