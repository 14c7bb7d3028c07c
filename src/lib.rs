//! # `tri_weave`
//!
//! Incremental **2D constrained Delaunay triangulation** (CDT) in Rust:
//! insert points one at a time, force constraint edges into the mesh, then
//! peel away the outside and auto-detected holes.
//!
//! ## What is this?
//!
//! A constrained Delaunay triangulation covers a planar point set with
//! triangles that satisfy the empty-circumcircle property everywhere except
//! across user-supplied constraint edges, which are guaranteed to appear in
//! the mesh. On top of the core engine this crate classifies triangles by
//! their nesting depth inside constraint boundaries, so outlines with holes
//! (and islands inside holes) come out correctly.
//!
//! ## Quick Start
//!
//! ```rust
//! use glam::DVec2;
//! use tri_weave::{Edge, Triangulation, VertIdx};
//!
//! // A unit square with a constrained diagonal
//! let mut cdt = Triangulation::new();
//! cdt.insert_vertices(&[
//!     DVec2::new(0.0, 0.0),
//!     DVec2::new(1.0, 0.0),
//!     DVec2::new(1.0, 1.0),
//!     DVec2::new(0.0, 1.0),
//! ])
//! .unwrap();
//! cdt.insert_edges(&[Edge::new(VertIdx(0), VertIdx(2))]).unwrap();
//!
//! // Drop the enclosing super-triangle, keeping only the input geometry
//! cdt.erase_super_triangle();
//!
//! assert_eq!(cdt.triangle_count(), 2);
//! assert!(cdt.fixed_edges().contains(&Edge::new(VertIdx(0), VertIdx(2))));
//! ```
//!
//! ## Key Features
//!
//! - **Incremental insertion**: points are located by a short walk seeded
//!   from a k-d tree and spliced in with `O(1)` expected flips
//! - **Constraint edges**: forced in by strip retriangulation; coinciding
//!   constraints are counted as overlapping boundaries
//! - **Hole detection**: layer peeling assigns every triangle a nesting
//!   depth, from which outer-area and hole erasure are derived
//! - **Deterministic**: `Randomized` insertion order uses a fixed-seed,
//!   instance-scoped generator, so equal inputs give equal meshes
//!
//! ## When NOT to Use
//!
//! - Exact arithmetic required (predicates are plain `f64` sign tests)
//! - Vertices must be removed or moved after insertion
//! - Constraint edges that cross each other (reported as an error instead
//!   of inserting Steiner points)

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod dedup;
mod kd_tree;
mod predicates;
mod triangulation;

pub use dedup::{
    DuplicatesInfo, find_duplicates, find_duplicates_with, remap_edges, remove_duplicates,
    remove_duplicates_and_remap_edges,
};
pub use kd_tree::{KdTree, NearPointLocator};
pub use predicates::{
    Box2, PtLineLocation, PtTriLocation, envelop_box, incircle, is_on_segment, locate_point_line,
    locate_point_triangle, orient2d, segments_intersect,
};
pub use triangulation::{
    Edge, InsertionOrder, LayerDepth, SuperGeometry, TopologyError, TriIdx, Triangle,
    Triangulation, TriangulationError, VertIdx, calculate_triangle_depths,
    extract_edges_from_triangles, peel_layer,
};

/// Re-export glam types for convenience
pub mod math {
    pub use glam::DVec2;
}
