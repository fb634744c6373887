//! Benchmarks for the spatial analysis pipeline
//!
//! Covers the hot paths:
//! - Contiguity adjacency construction (spatial index vs geometry count)
//! - Moran's I permutation testing (the Monte Carlo loop)
//! - SAR lag maximum likelihood (eigenvalues + golden-section search)
//! - GWR local fitting and bandwidth cross-validation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sdars_core::{
    build_adjacency, fit, gwr_fit, local_morans_i, morans_i_permutation, BandwidthKind,
    ContiguityRule, Coord, Geometry, GwrKernel, GwrOptions, LisaOptions, ModelKind,
    PermutationOptions, RegressionDesign, SdMatrix, SpatialWeights, WeightsStyle,
};

/// Generate a side x side lattice of unit-square polygons
fn generate_grid(side: usize) -> Vec<(u32, Geometry)> {
    let mut units = Vec::with_capacity(side * side);
    for r in 0..side {
        for c in 0..side {
            let (x, y) = (c as f64, r as f64);
            let poly = Geometry::polygon(vec![
                Coord::new(x, y),
                Coord::new(x + 1.0, y),
                Coord::new(x + 1.0, y + 1.0),
                Coord::new(x, y + 1.0),
            ])
            .unwrap();
            units.push(((r * side + c) as u32, poly));
        }
    }
    units
}

fn grid_weights(side: usize) -> SpatialWeights {
    let units = generate_grid(side);
    let graph = build_adjacency(&units, ContiguityRule::Queen).unwrap();
    SpatialWeights::standardize(&graph, WeightsStyle::Row, false).unwrap()
}

/// Deterministic pseudo-random attribute with a spatial gradient component
fn generate_attribute(side: usize) -> Vec<f64> {
    (0..side * side)
        .map(|i| {
            let r = (i / side) as f64;
            r + 0.5 * ((17.3 * i as f64).sin())
        })
        .collect()
}

fn generate_design(side: usize) -> RegressionDesign {
    let n = side * side;
    let x1: Vec<f64> = (0..n).map(|i| ((i * 13) % 17) as f64 / 17.0).collect();
    let x2: Vec<f64> = (0..n).map(|i| ((11.7 * i as f64).cos())).collect();
    let y: Vec<f64> = (0..n)
        .map(|i| 1.0 + 2.0 * x1[i] - x2[i] + 0.1 * ((7.9 * i as f64).sin()))
        .collect();
    RegressionDesign::new(
        y,
        SdMatrix::from_columns(&[x1, x2]).unwrap(),
        vec!["x1".to_string(), "x2".to_string()],
    )
    .unwrap()
}

/// Benchmark adjacency construction with different lattice sizes
fn bench_adjacency(c: &mut Criterion) {
    let mut group = c.benchmark_group("Adjacency");

    for side in [10, 20, 40, 60].iter() {
        let units = generate_grid(*side);

        group.bench_with_input(BenchmarkId::new("queen", side * side), side, |b, _| {
            b.iter(|| build_adjacency(black_box(&units), ContiguityRule::Queen))
        });
        group.bench_with_input(BenchmarkId::new("rook", side * side), side, |b, _| {
            b.iter(|| build_adjacency(black_box(&units), ContiguityRule::Rook))
        });
    }

    group.finish();
}

/// Benchmark the Monte Carlo Moran test: nsim dominates
fn bench_moran_permutation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Moran_Permutation");

    for side in [10, 20, 30].iter() {
        let w = grid_weights(*side);
        let x = generate_attribute(*side);
        let opts = PermutationOptions {
            nsim: 499,
            seed: 42,
        };

        group.bench_with_input(BenchmarkId::new("nsim_499", side * side), side, |b, _| {
            b.iter(|| morans_i_permutation(black_box(&w), black_box(&x), &opts))
        });
    }

    // Scaling in nsim at a fixed lattice
    let w = grid_weights(15);
    let x = generate_attribute(15);
    for nsim in [99, 499, 999].iter() {
        let opts = PermutationOptions {
            nsim: *nsim,
            seed: 42,
        };
        group.bench_with_input(BenchmarkId::new("n_225", nsim), nsim, |b, _| {
            b.iter(|| morans_i_permutation(black_box(&w), black_box(&x), &opts))
        });
    }

    group.finish();
}

/// Benchmark the conditional-permutation LISA loop
fn bench_local_moran(c: &mut Criterion) {
    let mut group = c.benchmark_group("Local_Moran");

    for side in [10, 15, 20].iter() {
        let w = grid_weights(*side);
        let x = generate_attribute(*side);
        let opts = LisaOptions {
            nsim: 199,
            seed: 42,
            alpha: 0.05,
        };

        group.bench_with_input(BenchmarkId::new("nsim_199", side * side), side, |b, _| {
            b.iter(|| local_morans_i(black_box(&w), black_box(&x), &opts))
        });
    }

    group.finish();
}

/// Benchmark the ML estimators; the dense eigendecomposition dominates
fn bench_spatial_regression(c: &mut Criterion) {
    let mut group = c.benchmark_group("Spatial_Regression");
    group.sample_size(20);

    for side in [8, 12, 16].iter() {
        let w = grid_weights(*side);
        let design = generate_design(*side);

        group.bench_with_input(BenchmarkId::new("sar_lag", side * side), side, |b, _| {
            b.iter(|| fit(black_box(&design), Some(black_box(&w)), ModelKind::SarLag))
        });
        group.bench_with_input(BenchmarkId::new("error", side * side), side, |b, _| {
            b.iter(|| {
                fit(
                    black_box(&design),
                    Some(black_box(&w)),
                    ModelKind::SpatialError,
                )
            })
        });
        group.bench_with_input(BenchmarkId::new("slx", side * side), side, |b, _| {
            b.iter(|| fit(black_box(&design), Some(black_box(&w)), ModelKind::Slx))
        });
    }

    group.finish();
}

/// Benchmark GWR local fitting across kernels and bandwidth kinds
fn bench_gwr(c: &mut Criterion) {
    let mut group = c.benchmark_group("GWR");
    group.sample_size(20);

    for side in [8, 12, 16].iter() {
        let units = generate_grid(*side);
        let coords: Vec<Coord> = units.iter().map(|(_, g)| g.centroid()).collect();
        let design = generate_design(*side);

        let fixed = GwrOptions {
            kernel: GwrKernel::Gaussian,
            bandwidth: BandwidthKind::Fixed(3.0),
        };
        group.bench_with_input(
            BenchmarkId::new("gaussian_fixed", side * side),
            side,
            |b, _| b.iter(|| gwr_fit(black_box(&design), black_box(&coords), &fixed)),
        );

        let adaptive = GwrOptions {
            kernel: GwrKernel::Bisquare,
            bandwidth: BandwidthKind::Adaptive(0.2),
        };
        group.bench_with_input(
            BenchmarkId::new("bisquare_adaptive", side * side),
            side,
            |b, _| b.iter(|| gwr_fit(black_box(&design), black_box(&coords), &adaptive)),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_adjacency,
    bench_moran_permutation,
    bench_local_moran,
    bench_spatial_regression,
    bench_gwr,
);

criterion_main!(benches);
