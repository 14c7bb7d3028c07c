//! # Incremental Constrained Delaunay Triangulation
//!
//! This module implements an **incremental 2D constrained Delaunay
//! triangulation** (CDT): points are inserted one at a time into a mesh
//! seeded with an enclosing super-triangle, and constraint segments are
//! forced into the mesh afterwards.
//!
//! ## Key Concepts
//!
//! - **Super-triangle**: an auxiliary triangle large enough to contain every
//!   input point; seeds the mesh and is erased at the end
//! - **Fixed edge**: an edge marked as a user constraint; Delaunay flips
//!   never cross it
//! - **Pseudopolygon**: the polygon bounded by a constraint segment on one
//!   side and a chain of existing edges on the other; retriangulated
//!   recursively when a constraint is forced in
//! - **Layer depth**: the nesting level of a triangle inside constraint
//!   boundaries, counted from the outside; drives hole detection
//!
//! ## Algorithm Overview
//!
//! 1. **Point insertion**: walk to the containing triangle from a seed
//!    supplied by the near-point locator, split it (3-way, or 4-way when the
//!    point lands on an edge), then restore the Delaunay property with a
//!    stack of edge flips
//! 2. **Constraint insertion**: walk the strip of triangles crossed by the
//!    segment, remove it, retriangulate the two pseudopolygons on either
//!    side, and mark the edge fixed
//! 3. **Peeling**: flood outward from the super-triangle; crossing a fixed
//!    edge enters a deeper layer, which classifies outside, inside, holes
//!    and islands
//!
//! ## Complexity
//!
//! | Operation          | Complexity        | Notes                          |
//! |--------------------|-------------------|--------------------------------|
//! | Insert vertex      | O(log n) expected | locator query + short walk     |
//! | Insert constraint  | O(k log k)        | k = strip length               |
//! | Depth calculation  | O(n)              | each triangle peeled once      |
//! | Erase passes       | O(n)              | flood + compaction             |

#![allow(clippy::missing_errors_doc)]

use glam::DVec2;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::kd_tree::{KdTree, NearPointLocator};
use crate::predicates::{
    Box2, PtLineLocation, PtTriLocation, envelop_box, incircle, incircle_error_bound,
    is_on_segment, locate_point_line, locate_point_triangle, orient2d, super_triangle_vertices,
};

/// Seed of the instance-scoped generator behind [`InsertionOrder::Randomized`].
const RANDOMIZED_ORDER_SEED: u64 = 9001;

// TYPE-SAFE INDICES - Prevent mixing up different index types at compile time

/// Index into the vertex array. Using a newtype prevents accidentally
/// passing a triangle index where a vertex index is expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertIdx(pub usize);

/// Index into the triangle array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriIdx(pub usize);

/// Nesting level of a triangle inside constraint boundaries.
///
/// `LayerDepth::MAX` marks a triangle not yet reached by peeling.
pub type LayerDepth = u32;

// CORE GEOMETRIC TYPES

/// An undirected edge between two vertices, stored with the lower index
/// first so `(a, b)` and `(b, a)` hash identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    a: VertIdx,
    b: VertIdx,
}

impl Edge {
    /// Create a canonical edge; endpoint order does not matter.
    #[inline]
    #[must_use]
    pub fn new(v1: VertIdx, v2: VertIdx) -> Self {
        if v2 < v1 {
            Self { a: v2, b: v1 }
        } else {
            Self { a: v1, b: v2 }
        }
    }

    /// The lower endpoint.
    #[inline]
    #[must_use]
    pub const fn v1(&self) -> VertIdx {
        self.a
    }

    /// The higher endpoint.
    #[inline]
    #[must_use]
    pub const fn v2(&self) -> VertIdx {
        self.b
    }
}

/// A triangle: three vertices in counter-clockwise order plus the three
/// adjacent triangles.
///
/// `neighbors[i]` is the triangle across the edge opposite `vertices[i]`,
/// i.e. the edge `(vertices[(i+1)%3], vertices[(i+2)%3])`. `None` means no
/// neighbor (the mesh boundary).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [VertIdx; 3],
    pub neighbors: [Option<TriIdx>; 3],
}

impl Triangle {
    #[inline]
    #[must_use]
    pub fn contains_vertex(&self, v: VertIdx) -> bool {
        self.vertices.contains(&v)
    }

    /// Corner index of `v`, if `v` belongs to this triangle.
    #[inline]
    #[must_use]
    pub fn vertex_index(&self, v: VertIdx) -> Option<usize> {
        self.vertices.iter().position(|&x| x == v)
    }

    /// Neighbor slot holding `n`, if `n` is adjacent.
    #[inline]
    #[must_use]
    pub fn neighbor_index(&self, n: TriIdx) -> Option<usize> {
        self.neighbors.iter().position(|&x| x == Some(n))
    }

    /// Endpoints of the edge opposite corner `i`, in CCW order.
    #[inline]
    #[must_use]
    pub const fn edge_opposite(&self, i: usize) -> (VertIdx, VertIdx) {
        (self.vertices[(i + 1) % 3], self.vertices[(i + 2) % 3])
    }
}

/// Strategy for ordering a batch of vertex insertions.
///
/// Vertex indices in the final mesh always match the input order; only the
/// insertion schedule differs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsertionOrder {
    /// Insert in the order vertices were provided.
    #[default]
    AsProvided,
    /// Insert in a deterministic shuffled order (fixed-seed generator),
    /// which keeps the walk lengths and the locator tree balanced on
    /// adversarial inputs.
    Randomized,
}

/// What kind of enclosing geometry the mesh was seeded with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuperGeometry {
    /// The conventional three-vertex super-triangle; erasable.
    SuperTriangle,
    /// User-supplied enclosing geometry; never erased.
    Custom,
}

// RESULT & ERROR TYPES

/// Operational errors. The triangulation is left unchanged when an error is
/// detected before mutation (all of these except a mid-batch
/// [`TriangulationError::ConstraintsCross`], which leaves earlier edges of
/// the batch inserted and the mesh consistent).
#[derive(Clone, Debug, PartialEq)]
pub enum TriangulationError {
    /// A vertex coordinate is NaN or infinite.
    NonFiniteCoordinate { index: usize, x: f64, y: f64 },
    /// A constraint edge references a vertex that does not exist.
    EdgeVertexOutOfRange { edge: Edge, vertex_count: usize },
    /// A constraint properly crosses an existing fixed edge; constraints may
    /// only meet at shared vertices.
    ConstraintsCross { edge: Edge, fixed: Edge },
    /// Bounded search loops exhausted on numerically degenerate input.
    DegenerateInput { detail: &'static str },
}

impl std::fmt::Display for TriangulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFiniteCoordinate { index, x, y } => {
                write!(f, "vertex {index} has non-finite coordinates ({x}, {y})")
            }
            Self::EdgeVertexOutOfRange { edge, vertex_count } => {
                write!(
                    f,
                    "edge ({}, {}) references a vertex outside 0..{vertex_count}",
                    edge.v1().0,
                    edge.v2().0
                )
            }
            Self::ConstraintsCross { edge, fixed } => {
                write!(
                    f,
                    "constraint ({}, {}) crosses fixed edge ({}, {}) away from a vertex",
                    edge.v1().0,
                    edge.v2().0,
                    fixed.v1().0,
                    fixed.v2().0
                )
            }
            Self::DegenerateInput { detail } => {
                write!(f, "degenerate input: {detail}")
            }
        }
    }
}

impl std::error::Error for TriangulationError {}

/// Topology validation errors.
///
/// These indicate inconsistencies in the mesh structure that may result from
/// numerical issues or bugs in the incremental algorithms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// A triangle repeats a vertex.
    DegenerateTriangle { triangle: TriIdx },
    /// A triangle is not counter-clockwise.
    NotCounterClockwise { triangle: TriIdx },
    /// Neighbor links across a shared edge disagree.
    NeighborMismatch { triangle: TriIdx, neighbor: TriIdx },
    /// The vertex-to-triangles index disagrees with the triangle array.
    AdjacencyMismatch { vertex: VertIdx, triangle: TriIdx },
    /// A non-fixed shared edge violates the local Delaunay condition.
    DelaunayViolation { triangle: TriIdx, neighbor: TriIdx },
    /// A fixed edge is no longer an edge of any triangle.
    MissingFixedEdge { edge: Edge },
    /// A live triangle references a free-listed slot.
    DanglingDummy { triangle: TriIdx },
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DegenerateTriangle { triangle } => {
                write!(f, "triangle {triangle:?} repeats a vertex")
            }
            Self::NotCounterClockwise { triangle } => {
                write!(f, "triangle {triangle:?} is not counter-clockwise")
            }
            Self::NeighborMismatch { triangle, neighbor } => {
                write!(f, "neighbor links between {triangle:?} and {neighbor:?} disagree")
            }
            Self::AdjacencyMismatch { vertex, triangle } => {
                write!(
                    f,
                    "vertex-to-triangle index disagrees for {vertex:?} and {triangle:?}"
                )
            }
            Self::DelaunayViolation { triangle, neighbor } => {
                write!(
                    f,
                    "edge between {triangle:?} and {neighbor:?} violates the Delaunay condition"
                )
            }
            Self::MissingFixedEdge { edge } => {
                write!(
                    f,
                    "fixed edge ({}, {}) is not an edge of any triangle",
                    edge.v1().0,
                    edge.v2().0
                )
            }
            Self::DanglingDummy { triangle } => {
                write!(f, "triangle {triangle:?} references a free-listed slot")
            }
        }
    }
}

impl std::error::Error for TopologyError {}

/// Outcome of scanning the triangles around a constraint's start vertex.
enum ConstraintStart {
    /// The segment leaves through the opposite edge of this triangle;
    /// `left`/`right` are the crossed edge's endpoints on either side of the
    /// segment.
    Crossing {
        triangle: TriIdx,
        left: VertIdx,
        right: VertIdx,
    },
    /// The segment passes exactly through an adjacent vertex.
    OnVertex(VertIdx),
}

// MAIN STRUCTURE - The incremental constrained Delaunay triangulation

/// An incrementally constructed 2D constrained Delaunay triangulation.
///
/// # Design Decisions
///
/// **Index graph, not pointers**: triangles and vertices reference each
/// other by indices into flat arrays. References stay trivially copyable and
/// the bidirectional triangle/vertex links cannot form ownership cycles.
///
/// **Free-listed slots**: constraint insertion deletes whole strips of
/// triangles and immediately rebuilds over them, so deleted slots go on a
/// free list and are reused before the array grows. A free-listed slot
/// holds stale data and is never referenced by live triangles; the free
/// list is compacted once per constraint batch.
///
/// **Instance-scoped randomness**: [`InsertionOrder::Randomized`] shuffles
/// with a fixed-seed generator owned by the instance, so two triangulations
/// fed identical input produce identical meshes.
///
/// The first `n` vertices belong to the enclosing geometry (three for the
/// super-triangle); user vertex and edge indices are offset internally.
/// Erasure passes renumber vertices and finalize the triangulation: no
/// further insertions are supported after calling one.
#[derive(Clone, Debug)]
pub struct Triangulation<L = KdTree> {
    vertices: Vec<DVec2>,
    triangles: Vec<Triangle>,
    /// Triangles incident to each vertex; deduplicated by construction.
    vert_tris: Vec<Vec<TriIdx>>,
    fixed_edges: FxHashSet<Edge>,
    /// Extra boundary count per fixed edge; entries exist only when > 0.
    overlap_count: FxHashMap<Edge, LayerDepth>,
    /// Free list of logically deleted triangle slots.
    dummy_tris: Vec<TriIdx>,
    locator: L,
    /// Number of leading vertices that belong to the enclosing geometry.
    n_super_vertices: usize,
    super_geom: SuperGeometry,
    insertion_order: InsertionOrder,
    rng: ChaCha8Rng,
}

impl Triangulation<KdTree> {
    /// Create an empty triangulation with [`InsertionOrder::AsProvided`] and
    /// the default k-d tree locator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_order(InsertionOrder::AsProvided)
    }

    /// Create an empty triangulation with the given insertion order.
    #[must_use]
    pub fn with_order(insertion_order: InsertionOrder) -> Self {
        Self::with_locator(insertion_order, KdTree::new())
    }
}

impl Default for Triangulation<KdTree> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: NearPointLocator> Triangulation<L> {
    // CONSTRUCTION & BASIC QUERIES

    /// Create an empty triangulation with a custom near-point locator.
    #[must_use]
    pub fn with_locator(insertion_order: InsertionOrder, locator: L) -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            vert_tris: Vec::new(),
            fixed_edges: FxHashSet::default(),
            overlap_count: FxHashMap::default(),
            dummy_tris: Vec::new(),
            locator,
            n_super_vertices: 0,
            super_geom: SuperGeometry::SuperTriangle,
            insertion_order,
            rng: ChaCha8Rng::seed_from_u64(RANDOMIZED_ORDER_SEED),
        }
    }

    /// All vertex positions, including the enclosing geometry's.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[DVec2] {
        &self.vertices
    }

    /// All triangle records. Between public operations every slot is live.
    #[inline]
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of stored vertices, including the enclosing geometry's.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of live triangles.
    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() - self.dummy_tris.len()
    }

    /// The constraint edge set.
    #[inline]
    #[must_use]
    pub fn fixed_edges(&self) -> &FxHashSet<Edge> {
        &self.fixed_edges
    }

    /// Boundary overlap counts for fixed edges where more than one
    /// constraint coincides (the count is one less than the number of
    /// coinciding constraints).
    #[inline]
    #[must_use]
    pub fn overlap_counts(&self) -> &FxHashMap<Edge, LayerDepth> {
        &self.overlap_count
    }

    /// Triangles incident to `v`.
    #[inline]
    #[must_use]
    pub fn adjacent_triangles(&self, v: VertIdx) -> &[TriIdx] {
        &self.vert_tris[v.0]
    }

    /// Which kind of enclosing geometry seeds the mesh.
    #[inline]
    #[must_use]
    pub const fn super_geometry(&self) -> SuperGeometry {
        self.super_geom
    }

    // VERTEX INSERTION

    /// Insert a batch of vertices.
    ///
    /// The first batch computes the enclosing super-triangle from its
    /// bounding box; later batches must stay within that region. All
    /// coordinates are validated before any mutation, so an error leaves the
    /// triangulation untouched. Duplicate positions are undefined behavior;
    /// filter them with [`crate::remove_duplicates_and_remap_edges`] first.
    pub fn insert_vertices(&mut self, new_vertices: &[DVec2]) -> Result<(), TriangulationError> {
        for (index, p) in new_vertices.iter().enumerate() {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(TriangulationError::NonFiniteCoordinate {
                    index,
                    x: p.x,
                    y: p.y,
                });
            }
        }
        if new_vertices.is_empty() {
            return Ok(());
        }
        if self.vertices.is_empty() {
            self.add_super_triangle(&envelop_box(new_vertices));
        }
        let n_existing = self.vertices.len();
        self.vertices.reserve(new_vertices.len());
        for &p in new_vertices {
            self.vertices.push(p);
            self.vert_tris.push(Vec::new());
        }
        match self.insertion_order {
            InsertionOrder::AsProvided => {
                for i in n_existing..self.vertices.len() {
                    self.insert_vertex(VertIdx(i));
                }
            }
            InsertionOrder::Randomized => {
                let mut order: Vec<usize> = (n_existing..self.vertices.len()).collect();
                order.shuffle(&mut self.rng);
                for i in order {
                    self.insert_vertex(VertIdx(i));
                }
            }
        }
        Ok(())
    }

    /// [`Self::insert_vertices`] over custom point types via coordinate
    /// accessors.
    pub fn insert_vertices_with<T, I, FX, FY>(
        &mut self,
        items: I,
        get_x: FX,
        get_y: FY,
    ) -> Result<(), TriangulationError>
    where
        I: IntoIterator<Item = T>,
        FX: Fn(&T) -> f64,
        FY: Fn(&T) -> f64,
    {
        let points: Vec<DVec2> = items
            .into_iter()
            .map(|item| DVec2::new(get_x(&item), get_y(&item)))
            .collect();
        self.insert_vertices(&points)
    }

    fn add_super_triangle(&mut self, box2: &Box2) {
        let positions = super_triangle_vertices(box2);
        for (i, &p) in positions.iter().enumerate() {
            self.vertices.push(p);
            self.vert_tris.push(vec![TriIdx(0)]);
            self.locator.add_point(p, VertIdx(i));
        }
        self.triangles.push(Triangle {
            vertices: [VertIdx(0), VertIdx(1), VertIdx(2)],
            neighbors: [None; 3],
        });
        self.n_super_vertices = 3;
        self.super_geom = SuperGeometry::SuperTriangle;
    }

    /// Insert an already-appended vertex into the mesh.
    fn insert_vertex(&mut self, iv: VertIdx) {
        let pos = self.vertices[iv.0];
        let (it1, it2) = self.walking_search_triangles_at(pos);
        let mut flip_stack = Vec::with_capacity(4);
        match it2 {
            Some(it2) => self.insert_point_on_edge(iv, it1, it2, &mut flip_stack),
            None => self.insert_point_in_triangle(iv, it1, &mut flip_stack),
        }
        self.ensure_delaunay(iv, pos, &mut flip_stack);
        self.locator.add_point(pos, iv);
    }

    /// Locate the triangle(s) containing `pos`: one triangle for an interior
    /// point, two for a point on a shared edge.
    fn walking_search_triangles_at(&self, pos: DVec2) -> (TriIdx, Option<TriIdx>) {
        let start = self.locator.near_point(pos).unwrap_or(VertIdx(0));
        let it = self.walk_triangles(start, pos);
        let t = &self.triangles[it.0];
        let [a, b, c] = t.vertices.map(|v| self.vertices[v.0]);
        match locate_point_triangle(pos, a, b, c) {
            PtTriLocation::Inside | PtTriLocation::OnVertex(_) => (it, None),
            PtTriLocation::OnEdge(i) => (it, t.neighbors[i]),
            PtTriLocation::Outside => {
                // The bounded walk gave up; treat the point as lying on the
                // closest edge and let the flips absorb the slack.
                let mut best = 0;
                let mut best_value = f64::INFINITY;
                for i in 0..3 {
                    let (e1, e2) = t.edge_opposite(i);
                    let (p1, p2) = (self.vertices[e1.0], self.vertices[e2.0]);
                    if is_on_segment(pos, p1, p2) {
                        best = i;
                        break;
                    }
                    let value = orient2d(p1, p2, pos).abs();
                    if value < best_value {
                        best_value = value;
                        best = i;
                    }
                }
                (it, t.neighbors[best])
            }
        }
    }

    /// Walk from a triangle incident to `start` towards `pos`, crossing the
    /// edge that separates `pos` from the current triangle at each step.
    ///
    /// The loop is bounded by the triangle count; in exact arithmetic the
    /// walk strictly advances, and on degenerate floating-point input the
    /// bound turns a potential cycle into a best-effort result.
    fn walk_triangles(&self, start: VertIdx, pos: DVec2) -> TriIdx {
        let mut current = self.vert_tris[start.0][0];
        let mut remaining = self.triangles.len() + 1;
        'walk: while remaining > 0 {
            remaining -= 1;
            let t = &self.triangles[current.0];
            for i in 0..3 {
                let (e1, e2) = t.edge_opposite(i);
                let location =
                    locate_point_line(pos, self.vertices[e1.0], self.vertices[e2.0]);
                if location == PtLineLocation::Right
                    && let Some(n) = t.neighbors[i]
                {
                    current = n;
                    continue 'walk;
                }
            }
            break;
        }
        current
    }

    /// Replace triangle `(a, b, c)` with `(a, b, v)`, `(b, c, v)` and
    /// `(c, a, v)`, reusing the original slot for the first.
    fn insert_point_in_triangle(&mut self, iv: VertIdx, it: TriIdx, flip_stack: &mut Vec<TriIdx>) {
        let t = self.triangles[it.0];
        let [a, b, c] = t.vertices;
        let [n_a, n_b, n_c] = t.neighbors;
        let it1 = self.add_triangle_slot();
        let it2 = self.add_triangle_slot();
        self.triangles[it1.0] = Triangle {
            vertices: [b, c, iv],
            neighbors: [Some(it2), Some(it), n_a],
        };
        self.triangles[it2.0] = Triangle {
            vertices: [c, a, iv],
            neighbors: [Some(it), Some(it1), n_b],
        };
        self.triangles[it.0] = Triangle {
            vertices: [a, b, iv],
            neighbors: [Some(it1), Some(it2), n_c],
        };
        if let Some(n) = n_a {
            self.change_neighbor(n, it, Some(it1));
        }
        if let Some(n) = n_b {
            self.change_neighbor(n, it, Some(it2));
        }
        self.add_adjacent_triangles(iv, &[it, it1, it2]);
        self.add_adjacent_triangle(a, it2);
        self.add_adjacent_triangle(b, it1);
        self.remove_adjacent_triangle(c, it);
        self.add_adjacent_triangles(c, &[it1, it2]);
        flip_stack.extend([it, it1, it2]);
    }

    /// Split the two triangles sharing the edge `v` lands on into four.
    fn insert_point_on_edge(
        &mut self,
        iv: VertIdx,
        it_a: TriIdx,
        it_b: TriIdx,
        flip_stack: &mut Vec<TriIdx>,
    ) {
        let t1 = self.triangles[it_a.0];
        let t2 = self.triangles[it_b.0];
        let (Some(i), Some(j)) = (t1.neighbor_index(it_b), t2.neighbor_index(it_a)) else {
            return;
        };
        // t1 = (a, b, c) with apex a, t2 = (d, c, b) with apex d; the shared
        // edge (b, c) is split at iv.
        let a = t1.vertices[i];
        let b = t1.vertices[(i + 1) % 3];
        let c = t1.vertices[(i + 2) % 3];
        let n_b = t1.neighbors[(i + 1) % 3];
        let n_c = t1.neighbors[(i + 2) % 3];
        let d = t2.vertices[j];
        let n_e = t2.neighbors[(j + 1) % 3];
        let n_d = t2.neighbors[(j + 2) % 3];

        let new_b = self.add_triangle_slot();
        let new_d = self.add_triangle_slot();
        self.triangles[it_a.0] = Triangle {
            vertices: [a, b, iv],
            neighbors: [Some(new_d), Some(new_b), n_c],
        };
        self.triangles[new_b.0] = Triangle {
            vertices: [a, iv, c],
            neighbors: [Some(it_b), n_b, Some(it_a)],
        };
        self.triangles[it_b.0] = Triangle {
            vertices: [d, c, iv],
            neighbors: [Some(new_b), Some(new_d), n_d],
        };
        self.triangles[new_d.0] = Triangle {
            vertices: [d, iv, b],
            neighbors: [Some(it_a), n_e, Some(it_b)],
        };
        if let Some(n) = n_b {
            self.change_neighbor(n, it_a, Some(new_b));
        }
        if let Some(n) = n_e {
            self.change_neighbor(n, it_b, Some(new_d));
        }
        self.add_adjacent_triangles(iv, &[it_a, new_b, it_b, new_d]);
        self.add_adjacent_triangle(a, new_b);
        self.add_adjacent_triangle(d, new_d);
        self.remove_adjacent_triangle(b, it_b);
        self.add_adjacent_triangle(b, new_d);
        self.remove_adjacent_triangle(c, it_a);
        self.add_adjacent_triangle(c, new_b);

        // Splitting a fixed edge fixes both halves; overlap counts do not
        // transfer, the constraint must be re-inserted to restore them.
        let shared = Edge::new(b, c);
        if self.fixed_edges.remove(&shared) {
            self.overlap_count.remove(&shared);
            self.fixed_edges.insert(Edge::new(b, iv));
            self.fixed_edges.insert(Edge::new(iv, c));
        }
        flip_stack.extend([it_a, new_b, it_b, new_d]);
    }

    /// Pop triangles containing the new vertex and flip their opposite edge
    /// while the Delaunay condition demands it.
    fn ensure_delaunay(&mut self, iv: VertIdx, pos: DVec2, flip_stack: &mut Vec<TriIdx>) {
        // Each flip strictly improves the triangulation in exact arithmetic;
        // the bound guards against cycling on cocircular float input.
        let mut remaining = 8 * (self.triangles.len() + 1);
        while let Some(it) = flip_stack.pop() {
            if remaining == 0 {
                break;
            }
            remaining -= 1;
            let t = self.triangles[it.0];
            let Some(ip) = t.vertex_index(iv) else {
                continue;
            };
            let Some(it_opo) = t.neighbors[ip] else {
                continue;
            };
            if self.is_flip_needed(pos, it, it_opo, ip) {
                self.flip_edge(it, it_opo);
                flip_stack.push(it);
                flip_stack.push(it_opo);
            }
        }
    }

    /// A flip across the edge opposite corner `ip` of `it` is needed when
    /// that edge is not fixed and the new vertex lies strictly inside the
    /// circumcircle of the opposed triangle.
    fn is_flip_needed(&self, pos: DVec2, it: TriIdx, it_opo: TriIdx, ip: usize) -> bool {
        let (w1, w2) = self.triangles[it.0].edge_opposite(ip);
        if self.fixed_edges.contains(&Edge::new(w1, w2)) {
            return false;
        }
        let [a, b, c] = self.triangles[it_opo.0]
            .vertices
            .map(|v| self.vertices[v.0]);
        incircle(a, b, c, pos) > 0.0
    }

    /// Swap the diagonal of the quadrilateral formed by `it` and `it_opo`.
    fn flip_edge(&mut self, it: TriIdx, it_opo: TriIdx) {
        let t = self.triangles[it.0];
        let t_opo = self.triangles[it_opo.0];
        let (Some(i), Some(j)) = (t.neighbor_index(it_opo), t_opo.neighbor_index(it)) else {
            return;
        };
        // t = (a, b, c), t_opo = (d, c, b); diagonal (b, c) becomes (a, d).
        let a = t.vertices[i];
        let b = t.vertices[(i + 1) % 3];
        let c = t.vertices[(i + 2) % 3];
        let n1 = t.neighbors[(i + 1) % 3];
        let n2 = t.neighbors[(i + 2) % 3];
        let d = t_opo.vertices[j];
        let n3 = t_opo.neighbors[(j + 1) % 3];
        let n4 = t_opo.neighbors[(j + 2) % 3];
        self.triangles[it.0] = Triangle {
            vertices: [a, b, d],
            neighbors: [n3, Some(it_opo), n2],
        };
        self.triangles[it_opo.0] = Triangle {
            vertices: [a, d, c],
            neighbors: [n4, n1, Some(it)],
        };
        if let Some(n) = n3 {
            self.change_neighbor(n, it_opo, Some(it));
        }
        if let Some(n) = n1 {
            self.change_neighbor(n, it, Some(it_opo));
        }
        self.add_adjacent_triangle(a, it_opo);
        self.add_adjacent_triangle(d, it);
        self.remove_adjacent_triangle(b, it_opo);
        self.remove_adjacent_triangle(c, it);
    }

    // CONSTRAINT INSERTION

    /// Insert constraint edges.
    ///
    /// Edge indices are user-space: `VertIdx(0)` is the first vertex passed
    /// to [`Self::insert_vertices`], the enclosing geometry's vertices are
    /// accounted for internally. Inserting the same edge again marks an
    /// overlapping boundary, which deepens layer peeling across it.
    pub fn insert_edges(&mut self, edges: &[Edge]) -> Result<(), TriangulationError> {
        let result = self.insert_user_edges(edges);
        self.erase_dummies();
        result
    }

    /// [`Self::insert_edges`] over custom edge types via endpoint accessors
    /// returning user-space vertex indices.
    pub fn insert_edges_with<T, I, FS, FE>(
        &mut self,
        items: I,
        get_start: FS,
        get_end: FE,
    ) -> Result<(), TriangulationError>
    where
        I: IntoIterator<Item = T>,
        FS: Fn(&T) -> usize,
        FE: Fn(&T) -> usize,
    {
        let edges: Vec<Edge> = items
            .into_iter()
            .map(|item| Edge::new(VertIdx(get_start(&item)), VertIdx(get_end(&item))))
            .collect();
        self.insert_edges(&edges)
    }

    fn insert_user_edges(&mut self, edges: &[Edge]) -> Result<(), TriangulationError> {
        for edge in edges {
            let v1 = edge.v1().0 + self.n_super_vertices;
            let v2 = edge.v2().0 + self.n_super_vertices;
            if v1 >= self.vertices.len() || v2 >= self.vertices.len() {
                return Err(TriangulationError::EdgeVertexOutOfRange {
                    edge: *edge,
                    vertex_count: self.vertices.len() - self.n_super_vertices,
                });
            }
            self.insert_edge(Edge::new(VertIdx(v1), VertIdx(v2)))?;
        }
        Ok(())
    }

    /// Force the edge between two existing vertices into the mesh.
    fn insert_edge(&mut self, edge: Edge) -> Result<(), TriangulationError> {
        let (ia, ib) = (edge.v1(), edge.v2());
        if ia == ib {
            return Ok(());
        }
        if self.has_edge(ia, ib) {
            self.fix_edge(edge);
            return Ok(());
        }
        let a = self.vertices[ia.0];
        let b = self.vertices[ib.0];
        let (first_tri, first_left, first_right) = match self.intersected_triangle(ia, a, b)? {
            ConstraintStart::OnVertex(ic) => {
                // The segment passes through ic: fix the part up to it and
                // restart from there.
                self.fix_edge(Edge::new(ia, ic));
                return self.insert_edge(Edge::new(ic, ib));
            }
            ConstraintStart::Crossing {
                triangle,
                left,
                right,
            } => (triangle, left, right),
        };

        // Walk the strip of triangles crossed by the segment, collecting the
        // pseudopolygon chains on both sides. The walk is read-only: any
        // error here leaves the mesh unchanged.
        let mut intersected = vec![first_tri];
        let mut points_left = vec![first_left];
        let mut points_right = vec![first_right];
        let (mut v_left, mut v_right) = (first_left, first_right);
        let mut current = first_tri;
        let mut target = ib;
        let mut remainder = None;
        let mut remaining = self.triangles.len() + 1;
        loop {
            if remaining == 0 {
                return Err(TriangulationError::DegenerateInput {
                    detail: "constraint walk exceeded the triangle count",
                });
            }
            remaining -= 1;
            let crossed = Edge::new(v_left, v_right);
            if self.fixed_edges.contains(&crossed) {
                return Err(TriangulationError::ConstraintsCross {
                    edge: Edge::new(ia, ib),
                    fixed: crossed,
                });
            }
            let Some(next) = self.neighbor_across(current, v_left, v_right) else {
                return Err(TriangulationError::DegenerateInput {
                    detail: "constraint walk left the mesh",
                });
            };
            let Some(apex) = self.triangles[next.0]
                .vertices
                .iter()
                .copied()
                .find(|&v| v != v_left && v != v_right)
            else {
                return Err(TriangulationError::DegenerateInput {
                    detail: "crossed a degenerate triangle",
                });
            };
            intersected.push(next);
            current = next;
            if apex == ib {
                break;
            }
            match locate_point_line(self.vertices[apex.0], a, b) {
                PtLineLocation::Left => {
                    points_left.push(apex);
                    v_left = apex;
                }
                PtLineLocation::Right => {
                    points_right.push(apex);
                    v_right = apex;
                }
                PtLineLocation::OnLine => {
                    // Passing exactly through a vertex splits the constraint.
                    target = apex;
                    remainder = Some(Edge::new(apex, ib));
                    break;
                }
            }
        }

        for &it in &intersected {
            self.make_dummy(it);
        }
        let left_tri = self.triangulate_pseudopolygon(ia, target, &points_left);
        points_right.reverse();
        let right_tri = self.triangulate_pseudopolygon(target, ia, &points_right);
        if let Some(lt) = left_tri {
            self.triangles[lt.0].neighbors[2] = right_tri;
        }
        if let Some(rt) = right_tri {
            self.triangles[rt.0].neighbors[2] = left_tri;
        }
        self.fix_edge(Edge::new(ia, target));

        match remainder {
            Some(rest) => self.insert_edge(rest),
            None => Ok(()),
        }
    }

    /// Scan the triangles incident to `ia` for the one whose opposite edge
    /// the segment `(a, b)` leaves through, or detect that the segment
    /// passes through an adjacent vertex.
    fn intersected_triangle(
        &self,
        ia: VertIdx,
        a: DVec2,
        b: DVec2,
    ) -> Result<ConstraintStart, TriangulationError> {
        for &it in &self.vert_tris[ia.0] {
            let t = &self.triangles[it.0];
            let Some(i) = t.vertex_index(ia) else {
                continue;
            };
            let p1 = t.vertices[(i + 1) % 3];
            let p2 = t.vertices[(i + 2) % 3];
            let pos1 = self.vertices[p1.0];
            let pos2 = self.vertices[p2.0];
            let loc1 = locate_point_line(pos1, a, b);
            let loc2 = locate_point_line(pos2, a, b);
            if loc1 == PtLineLocation::OnLine && (pos1 - a).dot(b - a) > 0.0 {
                return Ok(ConstraintStart::OnVertex(p1));
            }
            if loc2 == PtLineLocation::OnLine && (pos2 - a).dot(b - a) > 0.0 {
                return Ok(ConstraintStart::OnVertex(p2));
            }
            // The wedge at ia contains the direction towards b exactly when
            // p1 is right of the segment line and p2 left.
            if loc1 == PtLineLocation::Right && loc2 == PtLineLocation::Left {
                return Ok(ConstraintStart::Crossing {
                    triangle: it,
                    left: p2,
                    right: p1,
                });
            }
        }
        Err(TriangulationError::DegenerateInput {
            detail: "no triangle at the constraint start faces the segment",
        })
    }

    /// Retriangulate a pseudopolygon: base edge `(ia, ib)` and the chain of
    /// polygon vertices strictly left of it, ordered from `ia` to `ib`.
    ///
    /// Returns the triangle adjacent to the base edge: a newly created one,
    /// or the surviving outer triangle when the chain is empty. The base
    /// slot (`neighbors[2]`) of a created triangle is wired by the caller.
    fn triangulate_pseudopolygon(
        &mut self,
        ia: VertIdx,
        ib: VertIdx,
        points: &[VertIdx],
    ) -> Option<TriIdx> {
        if points.is_empty() {
            return self.pseudopoly_outer_triangle(ia, ib);
        }
        let split = self.find_delaunay_point(ia, ib, points);
        let ic = points[split];
        let head = &points[..split];
        let tail = &points[split + 1..];
        let first = self.triangulate_pseudopolygon(ia, ic, head);
        let second = self.triangulate_pseudopolygon(ic, ib, tail);
        let it = self.add_triangle_record(Triangle {
            vertices: [ia, ib, ic],
            neighbors: [second, first, None],
        });
        if let Some(n) = first {
            if head.is_empty() {
                self.change_neighbor_across(n, ia, ic, Some(it));
            } else {
                self.triangles[n.0].neighbors[2] = Some(it);
            }
        }
        if let Some(n) = second {
            if tail.is_empty() {
                self.change_neighbor_across(n, ic, ib, Some(it));
            } else {
                self.triangles[n.0].neighbors[2] = Some(it);
            }
        }
        self.add_adjacent_triangle(ia, it);
        self.add_adjacent_triangle(ib, it);
        self.add_adjacent_triangle(ic, it);
        Some(it)
    }

    /// Chain vertex whose circumcircle with the base edge contains no other
    /// chain vertex; the Delaunay-optimal apex for the next triangle.
    fn find_delaunay_point(&self, ia: VertIdx, ib: VertIdx, points: &[VertIdx]) -> usize {
        let a = self.vertices[ia.0];
        let b = self.vertices[ib.0];
        let mut best = 0;
        for i in 1..points.len() {
            let c = self.vertices[points[best].0];
            if incircle(a, b, c, self.vertices[points[i].0]) > 0.0 {
                best = i;
            }
        }
        best
    }

    /// The remaining triangle containing the edge `(ia, ib)` after the
    /// intersected strip was removed.
    fn pseudopoly_outer_triangle(&self, ia: VertIdx, ib: VertIdx) -> Option<TriIdx> {
        self.vert_tris[ia.0]
            .iter()
            .copied()
            .find(|&it| self.triangles[it.0].contains_vertex(ib))
    }

    /// True when `(ia, ib)` is already an edge of the triangulation.
    fn has_edge(&self, ia: VertIdx, ib: VertIdx) -> bool {
        self.vert_tris[ia.0]
            .iter()
            .any(|&it| self.triangles[it.0].contains_vertex(ib))
    }

    // MESH MAINTENANCE - The storage layer under the geometric logic

    /// Reserve a triangle slot, reusing the free list before growing.
    fn add_triangle_slot(&mut self) -> TriIdx {
        if let Some(slot) = self.dummy_tris.pop() {
            slot
        } else {
            self.triangles.push(Triangle {
                vertices: [VertIdx(0); 3],
                neighbors: [None; 3],
            });
            TriIdx(self.triangles.len() - 1)
        }
    }

    fn add_triangle_record(&mut self, t: Triangle) -> TriIdx {
        let it = self.add_triangle_slot();
        self.triangles[it.0] = t;
        it
    }

    /// Logically delete a triangle: drop its adjacency entries and push the
    /// slot onto the free list. Callers must stop referencing it.
    fn make_dummy(&mut self, it: TriIdx) {
        let t = self.triangles[it.0];
        for v in t.vertices {
            self.remove_adjacent_triangle(v, it);
        }
        self.dummy_tris.push(it);
    }

    /// Physically remove free-listed slots, renumbering all triangle
    /// references. References to erased slots become no-neighbor.
    fn erase_dummies(&mut self) {
        if self.dummy_tris.is_empty() {
            return;
        }
        let dummy_set: FxHashSet<usize> = self.dummy_tris.iter().map(|t| t.0).collect();
        let mut map: Vec<Option<usize>> = vec![None; self.triangles.len()];
        let mut kept = 0;
        for i in 0..self.triangles.len() {
            if dummy_set.contains(&i) {
                continue;
            }
            map[i] = Some(kept);
            self.triangles[kept] = self.triangles[i];
            kept += 1;
        }
        self.triangles.truncate(kept);
        for t in &mut self.triangles {
            for n in &mut t.neighbors {
                *n = (*n).and_then(|x| map[x.0]).map(TriIdx);
            }
        }
        for list in &mut self.vert_tris {
            for it in list.iter_mut() {
                if let Some(new) = map[it.0] {
                    *it = TriIdx(new);
                }
            }
        }
        self.dummy_tris.clear();
    }

    /// Replace `old` with `new` in the neighbor slots of `it`.
    fn change_neighbor(&mut self, it: TriIdx, old: TriIdx, new: Option<TriIdx>) {
        for n in &mut self.triangles[it.0].neighbors {
            if *n == Some(old) {
                *n = new;
            }
        }
    }

    /// Set the neighbor of `it` across the edge `(v1, v2)`.
    fn change_neighbor_across(&mut self, it: TriIdx, v1: VertIdx, v2: VertIdx, new: Option<TriIdx>) {
        let t = &mut self.triangles[it.0];
        for i in 0..3 {
            let (e1, e2) = t.edge_opposite(i);
            if (e1 == v1 && e2 == v2) || (e1 == v2 && e2 == v1) {
                t.neighbors[i] = new;
                return;
            }
        }
    }

    fn add_adjacent_triangle(&mut self, v: VertIdx, it: TriIdx) {
        self.vert_tris[v.0].push(it);
    }

    fn add_adjacent_triangles(&mut self, v: VertIdx, tris: &[TriIdx]) {
        self.vert_tris[v.0].extend_from_slice(tris);
    }

    fn remove_adjacent_triangle(&mut self, v: VertIdx, it: TriIdx) {
        let list = &mut self.vert_tris[v.0];
        if let Some(pos) = list.iter().position(|&x| x == it) {
            list.swap_remove(pos);
        }
    }

    /// Mark an edge as a constraint; marking it again records an
    /// overlapping boundary.
    fn fix_edge(&mut self, edge: Edge) {
        if !self.fixed_edges.insert(edge) {
            *self.overlap_count.entry(edge).or_insert(0) += 1;
        }
    }

    fn neighbor_across(&self, it: TriIdx, v1: VertIdx, v2: VertIdx) -> Option<TriIdx> {
        let t = &self.triangles[it.0];
        (0..3).find_map(|i| {
            let (e1, e2) = t.edge_opposite(i);
            if (e1 == v1 && e2 == v2) || (e1 == v2 && e2 == v1) {
                t.neighbors[i]
            } else {
                None
            }
        })
    }

    // ERASURE PASSES

    /// Declare that the mesh was seeded with custom enclosing geometry
    /// instead of the automatic super-triangle.
    ///
    /// The given triangles must form a valid mesh covering the region where
    /// vertices will be inserted. Super-triangle erasure becomes a no-op;
    /// user edge indices are offset by `vertices.len()`.
    pub fn initialize_with_custom_super_geometry(
        &mut self,
        vertices: &[DVec2],
        triangles: &[Triangle],
    ) {
        for (i, &p) in vertices.iter().enumerate() {
            self.vertices.push(p);
            self.vert_tris.push(Vec::new());
            self.locator.add_point(p, VertIdx(i));
        }
        for (i, t) in triangles.iter().enumerate() {
            self.triangles.push(*t);
            for v in t.vertices {
                self.vert_tris[v.0].push(TriIdx(i));
            }
        }
        self.n_super_vertices = self.vertices.len();
        self.super_geom = SuperGeometry::Custom;
    }

    /// Remove the super-triangle vertices and every triangle touching them.
    ///
    /// Does nothing under custom enclosing geometry. Finalizes the
    /// triangulation: remaining vertices are renumbered to user indices.
    pub fn erase_super_triangle(&mut self) {
        if self.super_geom != SuperGeometry::SuperTriangle || self.n_super_vertices == 0 {
            return;
        }
        let to_erase: Vec<TriIdx> = self
            .triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.vertices.iter().any(|v| v.0 < 3))
            .map(|(i, _)| TriIdx(i))
            .collect();
        self.erase_triangles(&to_erase);
        self.erase_super_triangle_vertices();
    }

    /// Remove all triangles reachable from the super-triangle without
    /// crossing a fixed edge, then the super-triangle vertices.
    pub fn erase_outer_triangles(&mut self) {
        if self.n_super_vertices == 0 {
            return;
        }
        let Some(&seed) = self.vert_tris.first().and_then(|list| list.first()) else {
            return;
        };
        let traversed = self.grow_to_boundary(vec![seed]);
        let to_erase: Vec<TriIdx> = traversed.into_iter().collect();
        self.erase_triangles(&to_erase);
        self.erase_super_triangle_vertices();
    }

    /// Remove outer triangles and automatically detected holes.
    ///
    /// Computes the layer depth of every triangle from the super-triangle
    /// seed and erases the even layers: outside the outermost boundary,
    /// inside holes, and so on. Supports overlapping and touching
    /// boundaries through the overlap counts.
    pub fn erase_outer_triangles_and_holes(&mut self) {
        if self.n_super_vertices == 0 {
            return;
        }
        let Some(&seed) = self.vert_tris.first().and_then(|list| list.first()) else {
            return;
        };
        let depths = calculate_triangle_depths(
            seed,
            &self.triangles,
            &self.fixed_edges,
            &self.overlap_count,
        );
        let to_erase: Vec<TriIdx> = depths
            .iter()
            .enumerate()
            .filter(|&(_, &depth)| depth % 2 == 0)
            .map(|(i, _)| TriIdx(i))
            .collect();
        self.erase_triangles(&to_erase);
        self.erase_super_triangle_vertices();
    }

    /// Flood from the seeds across non-fixed edges, returning every
    /// triangle reached.
    fn grow_to_boundary(&self, mut seeds: Vec<TriIdx>) -> FxHashSet<TriIdx> {
        let mut traversed = FxHashSet::default();
        while let Some(it) = seeds.pop() {
            traversed.insert(it);
            let t = &self.triangles[it.0];
            for i in 0..3 {
                let (e1, e2) = t.edge_opposite(i);
                if self.fixed_edges.contains(&Edge::new(e1, e2)) {
                    continue;
                }
                if let Some(n) = t.neighbors[i]
                    && !traversed.contains(&n)
                {
                    seeds.push(n);
                }
            }
        }
        traversed
    }

    fn erase_triangles(&mut self, to_erase: &[TriIdx]) {
        for &it in to_erase {
            self.make_dummy(it);
        }
        self.erase_dummies();
    }

    fn erase_super_triangle_vertices(&mut self) {
        if self.super_geom != SuperGeometry::SuperTriangle || self.n_super_vertices == 0 {
            return;
        }
        self.vertices.drain(..3);
        self.vert_tris.drain(..3);
        for t in &mut self.triangles {
            for v in &mut t.vertices {
                v.0 -= 3;
            }
        }
        let remap = |e: &Edge| Edge::new(VertIdx(e.v1().0 - 3), VertIdx(e.v2().0 - 3));
        self.fixed_edges = self.fixed_edges.iter().map(remap).collect();
        self.overlap_count = self
            .overlap_count
            .iter()
            .map(|(e, &count)| (remap(e), count))
            .collect();
        self.n_super_vertices = 0;
    }

    // VALIDATION

    /// Validate the mesh invariants and return the first violation found.
    ///
    /// Checks, in order: triangle orientation and vertex distinctness,
    /// neighbor symmetry across shared edges, agreement of the
    /// vertex-to-triangles index with the triangle array, absence of
    /// references into the free list, the local Delaunay condition on every
    /// non-fixed shared edge (within a floating-point roundoff bound), and
    /// the presence of every fixed edge.
    pub fn validate_topology(&self) -> Result<(), TopologyError> {
        let dummies: FxHashSet<usize> = self.dummy_tris.iter().map(|t| t.0).collect();
        for (i, t) in self.triangles.iter().enumerate() {
            if dummies.contains(&i) {
                continue;
            }
            let it = TriIdx(i);
            let [v0, v1, v2] = t.vertices;
            if v0 == v1 || v1 == v2 || v0 == v2 {
                return Err(TopologyError::DegenerateTriangle { triangle: it });
            }
            let [a, b, c] = t.vertices.map(|v| self.vertices[v.0]);
            if orient2d(a, b, c) <= 0.0 {
                return Err(TopologyError::NotCounterClockwise { triangle: it });
            }
            for slot in 0..3 {
                let Some(n) = t.neighbors[slot] else {
                    continue;
                };
                if dummies.contains(&n.0) {
                    return Err(TopologyError::DanglingDummy { triangle: it });
                }
                let (w1, w2) = t.edge_opposite(slot);
                let nt = &self.triangles[n.0];
                if !nt.contains_vertex(w1) || !nt.contains_vertex(w2) {
                    return Err(TopologyError::NeighborMismatch {
                        triangle: it,
                        neighbor: n,
                    });
                }
                let Some(back) = nt.vertices.iter().position(|&v| v != w1 && v != w2) else {
                    return Err(TopologyError::NeighborMismatch {
                        triangle: it,
                        neighbor: n,
                    });
                };
                if nt.neighbors[back] != Some(it) {
                    return Err(TopologyError::NeighborMismatch {
                        triangle: it,
                        neighbor: n,
                    });
                }
            }
            for v in t.vertices {
                if !self.vert_tris[v.0].contains(&it) {
                    return Err(TopologyError::AdjacencyMismatch {
                        vertex: v,
                        triangle: it,
                    });
                }
            }
        }
        for (vi, list) in self.vert_tris.iter().enumerate() {
            for &it in list {
                if dummies.contains(&it.0) || !self.triangles[it.0].contains_vertex(VertIdx(vi)) {
                    return Err(TopologyError::AdjacencyMismatch {
                        vertex: VertIdx(vi),
                        triangle: it,
                    });
                }
            }
        }
        for (i, t) in self.triangles.iter().enumerate() {
            if dummies.contains(&i) {
                continue;
            }
            for slot in 0..3 {
                let Some(n) = t.neighbors[slot] else {
                    continue;
                };
                // visit each shared edge once
                if n.0 < i {
                    continue;
                }
                let (w1, w2) = t.edge_opposite(slot);
                if self.fixed_edges.contains(&Edge::new(w1, w2)) {
                    continue;
                }
                let Some(opposite) = self.triangles[n.0]
                    .vertices
                    .iter()
                    .copied()
                    .find(|&v| v != w1 && v != w2)
                else {
                    continue;
                };
                let [a, b, c] = t.vertices.map(|v| self.vertices[v.0]);
                let d = self.vertices[opposite.0];
                if incircle(a, b, c, d) > incircle_error_bound(a, b, c, d) {
                    return Err(TopologyError::DelaunayViolation {
                        triangle: TriIdx(i),
                        neighbor: n,
                    });
                }
            }
        }
        for edge in &self.fixed_edges {
            let present = self.vert_tris[edge.v1().0]
                .iter()
                .any(|&it| self.triangles[it.0].contains_vertex(edge.v2()));
            if !present {
                return Err(TopologyError::MissingFixedEdge { edge: *edge });
            }
        }
        Ok(())
    }
}

// LAYER PEELING - Depth classification of triangles inside boundaries

/// Peel one layer: assign `layer_depth` to every triangle reachable from
/// the seeds without crossing a fixed edge.
///
/// Returns the triangles found *behind* fixed edges, mapped to the depth
/// they should be peeled at: one deeper, plus the edge's overlap count when
/// boundaries coincide there.
pub fn peel_layer(
    mut seeds: Vec<TriIdx>,
    triangles: &[Triangle],
    fixed_edges: &FxHashSet<Edge>,
    overlap_count: &FxHashMap<Edge, LayerDepth>,
    layer_depth: LayerDepth,
    tri_depths: &mut [LayerDepth],
) -> FxHashMap<TriIdx, LayerDepth> {
    let mut behind_boundary: FxHashMap<TriIdx, LayerDepth> = FxHashMap::default();
    while let Some(it) = seeds.pop() {
        tri_depths[it.0] = layer_depth;
        behind_boundary.remove(&it);
        let t = &triangles[it.0];
        for i in 0..3 {
            let (e1, e2) = t.edge_opposite(i);
            let Some(n) = t.neighbors[i] else {
                continue;
            };
            if tri_depths[n.0] <= layer_depth {
                continue;
            }
            let edge = Edge::new(e1, e2);
            if fixed_edges.contains(&edge) {
                let depth_jump = overlap_count.get(&edge).map_or(1, |&c| c + 1);
                behind_boundary.insert(n, layer_depth + depth_jump);
                continue;
            }
            seeds.push(n);
        }
    }
    behind_boundary
}

/// Assign every triangle its layer depth, peeling from `seed` outward.
///
/// Depth 0 is outside any constraint boundary, 1 inside the outermost
/// boundary, 2 inside a hole, 3 inside an island, and so on. Crossing a
/// fixed edge with overlap count `k` jumps `k + 1` layers, so coinciding
/// boundaries are counted as many times as they were inserted. Triangles
/// never reached keep `LayerDepth::MAX`.
#[must_use]
pub fn calculate_triangle_depths(
    seed: TriIdx,
    triangles: &[Triangle],
    fixed_edges: &FxHashSet<Edge>,
    overlap_count: &FxHashMap<Edge, LayerDepth>,
) -> Vec<LayerDepth> {
    let mut tri_depths = vec![LayerDepth::MAX; triangles.len()];
    let mut seeds = vec![seed];
    let mut layer_depth: LayerDepth = 0;
    let mut deepest_seed_depth: LayerDepth = 0;
    // Seeds keyed by the depth they must be peeled at, so layers are
    // entered in sorted order even when boundary crossings jump depths.
    let mut seeds_by_depth: FxHashMap<LayerDepth, FxHashSet<TriIdx>> = FxHashMap::default();
    loop {
        let behind_boundary = peel_layer(
            seeds,
            triangles,
            fixed_edges,
            overlap_count,
            layer_depth,
            &mut tri_depths,
        );
        seeds_by_depth.remove(&layer_depth);
        for (it, depth) in behind_boundary {
            deepest_seed_depth = deepest_seed_depth.max(depth);
            seeds_by_depth.entry(depth).or_default().insert(it);
        }
        layer_depth += 1;
        seeds = seeds_by_depth
            .get(&layer_depth)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        if seeds.is_empty() && deepest_seed_depth <= layer_depth {
            break;
        }
    }
    tri_depths
}

/// Collect every edge of every triangle into a set.
#[must_use]
pub fn extract_edges_from_triangles(triangles: &[Triangle]) -> FxHashSet<Edge> {
    let mut edges = FxHashSet::default();
    for t in triangles {
        let [v0, v1, v2] = t.vertices;
        edges.insert(Edge::new(v0, v1));
        edges.insert(Edge::new(v1, v2));
        edges.insert(Edge::new(v2, v0));
    }
    edges
}

// Tests
