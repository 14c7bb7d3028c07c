//! Benchmarks for `tri_weave` triangulation operations.
//!
//! Run with: `cargo bench --bench triangulation_benchmarks`
//!
//! These benchmarks test:
//! - Batch vertex insertion (provided vs randomized order)
//! - Constraint edge insertion
//! - Hole detection and erasure passes
//! - Scalability with increasing point counts

use divan::{Bencher, black_box};
use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tri_weave::{Edge, InsertionOrder, Triangulation, VertIdx};

fn main() {
    divan::main();
}

// ============================================================================
// Test Data Generators
// ============================================================================

/// Uniformly random points in a square
fn random_points(count: usize, seed: u64) -> Vec<DVec2> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            DVec2::new(
                rng.random_range(0.0..100.0),
                rng.random_range(0.0..100.0),
            )
        })
        .collect()
}

/// Points on a regular grid, row by row (a worst case for provided-order
/// insertion: every walk starts far from the target)
#[expect(clippy::cast_precision_loss)]
fn grid_points(side: usize) -> Vec<DVec2> {
    (0..side * side)
        .map(|i| DVec2::new((i % side) as f64, (i / side) as f64))
        .collect()
}

/// A closed ring of vertices plus random interior points, with the ring's
/// loop edges as constraints
#[expect(clippy::cast_precision_loss)]
fn ring_with_interior(ring: usize, interior: usize) -> (Vec<DVec2>, Vec<Edge>) {
    let mut vertices: Vec<DVec2> = (0..ring)
        .map(|i| {
            let angle = std::f64::consts::TAU * (i as f64) / (ring as f64);
            DVec2::new(40.0 * angle.cos() + 50.0, 40.0 * angle.sin() + 50.0)
        })
        .collect();
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..interior {
        vertices.push(DVec2::new(
            rng.random_range(30.0..70.0),
            rng.random_range(30.0..70.0),
        ));
    }
    let edges = (0..ring)
        .map(|i| Edge::new(VertIdx(i), VertIdx((i + 1) % ring)))
        .collect();
    (vertices, edges)
}

// ============================================================================
// Vertex Insertion Benchmarks
// ============================================================================

#[divan::bench(args = [100, 500, 2000])]
fn insert_random_as_provided(bencher: Bencher, count: usize) {
    let vertices = random_points(count, 7);

    bencher.bench_local(|| {
        let mut cdt = Triangulation::new();
        cdt.insert_vertices(&vertices).unwrap();
        black_box(cdt.triangle_count())
    });
}

#[divan::bench(args = [100, 500, 2000])]
fn insert_random_randomized(bencher: Bencher, count: usize) {
    let vertices = random_points(count, 7);

    bencher.bench_local(|| {
        let mut cdt = Triangulation::with_order(InsertionOrder::Randomized);
        cdt.insert_vertices(&vertices).unwrap();
        black_box(cdt.triangle_count())
    });
}

#[divan::bench(args = [16, 32])]
fn insert_grid_randomized(bencher: Bencher, side: usize) {
    let vertices = grid_points(side);

    bencher.bench_local(|| {
        let mut cdt = Triangulation::with_order(InsertionOrder::Randomized);
        cdt.insert_vertices(&vertices).unwrap();
        black_box(cdt.triangle_count())
    });
}

// ============================================================================
// Constraint Insertion Benchmarks
// ============================================================================

#[divan::bench(args = [32, 128])]
fn insert_ring_constraints(bencher: Bencher, ring: usize) {
    let (vertices, edges) = ring_with_interior(ring, 200);

    bencher.bench_local(|| {
        let mut cdt = Triangulation::new();
        cdt.insert_vertices(&vertices).unwrap();
        cdt.insert_edges(&edges).unwrap();
        black_box(cdt.fixed_edges().len())
    });
}

#[divan::bench]
fn insert_forced_chords(bencher: Bencher) {
    // parallel chords across a dense cloud, each cutting a long strip
    let mut vertices = random_points(400, 23);
    let n = vertices.len();
    vertices.push(DVec2::new(-10.0, 30.0));
    vertices.push(DVec2::new(110.0, 30.0));
    vertices.push(DVec2::new(-10.0, 70.0));
    vertices.push(DVec2::new(110.0, 70.0));
    let edges = [
        Edge::new(VertIdx(n), VertIdx(n + 1)),
        Edge::new(VertIdx(n + 2), VertIdx(n + 3)),
    ];

    bencher.bench_local(|| {
        let mut cdt = Triangulation::new();
        cdt.insert_vertices(&vertices).unwrap();
        cdt.insert_edges(&edges).unwrap();
        black_box(cdt.fixed_edges().len())
    });
}

// ============================================================================
// Erasure Benchmarks
// ============================================================================

#[divan::bench]
fn erase_super_triangle(bencher: Bencher) {
    let vertices = random_points(1000, 3);

    bencher.bench_local(|| {
        let mut cdt = Triangulation::with_order(InsertionOrder::Randomized);
        cdt.insert_vertices(&vertices).unwrap();
        cdt.erase_super_triangle();
        black_box(cdt.triangle_count())
    });
}

#[divan::bench]
fn erase_outer_and_holes(bencher: Bencher) {
    let (vertices, edges) = ring_with_interior(64, 400);

    bencher.bench_local(|| {
        let mut cdt = Triangulation::with_order(InsertionOrder::Randomized);
        cdt.insert_vertices(&vertices).unwrap();
        cdt.insert_edges(&edges).unwrap();
        cdt.erase_outer_triangles_and_holes();
        black_box(cdt.triangle_count())
    });
}
