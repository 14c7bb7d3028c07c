//! Incremental k-d tree used to seed point location.
//!
//! The walking search of the triangulation needs a vertex *near* a query
//! position to start from. To answer that:
//! 1. Every inserted vertex is pushed into a 2-d tree (alternating split
//!    axis per level)
//! 2. Nearest-vertex queries descend the tree, then backtrack into the far
//!    subtree only when the splitting line is closer than the best match
//!
//! Exact nearest is not required by the engine (any seed within a short walk
//! of the true containing triangle works), but the tree delivers it anyway
//! on typical inputs.

use glam::DVec2;

use crate::triangulation::VertIdx;

/// Capability the triangulation needs from a point locator.
///
/// Implementations must tolerate duplicate positions and must only be
/// queried after at least one `add_point` call.
pub trait NearPointLocator {
    /// Register an inserted vertex with its position.
    fn add_point(&mut self, position: DVec2, vertex: VertIdx);

    /// Return some vertex close to `position`, or `None` when empty.
    fn near_point(&self, position: DVec2) -> Option<VertIdx>;
}

#[derive(Clone, Debug)]
struct Node {
    position: DVec2,
    vertex: VertIdx,
    /// Child slots: `[0]` below the split coordinate, `[1]` at or above.
    children: [Option<usize>; 2],
}

/// Incrementally grown k-d tree over vertex positions.
///
/// Nodes live in a flat array; tree links are array indices. Insertion
/// order determines the shape, so randomized vertex insertion keeps the
/// tree balanced on average.
#[derive(Clone, Debug, Default)]
pub struct KdTree {
    nodes: Vec<Node>,
}

#[inline]
fn coord(p: DVec2, axis: usize) -> f64 {
    if axis == 0 { p.x } else { p.y }
}

impl KdTree {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, position: DVec2, vertex: VertIdx) {
        let new_index = self.nodes.len();
        let node = Node {
            position,
            vertex,
            children: [None, None],
        };
        if new_index == 0 {
            self.nodes.push(node);
            return;
        }
        let mut current = 0;
        let mut axis = 0;
        loop {
            let side = usize::from(coord(position, axis) >= coord(self.nodes[current].position, axis));
            match self.nodes[current].children[side] {
                Some(child) => current = child,
                None => {
                    self.nodes[current].children[side] = Some(new_index);
                    self.nodes.push(node);
                    return;
                }
            }
            axis ^= 1;
        }
    }

    /// Nearest stored vertex to `query` by Euclidean distance.
    #[must_use]
    pub fn nearest(&self, query: DVec2) -> Option<VertIdx> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best_dist = f64::INFINITY;
        let mut best = VertIdx(0);
        // Explicit stack instead of recursion: insertion-ordered trees can
        // degenerate to linked lists.
        let mut pending: Vec<(usize, usize)> = vec![(0, 0)];
        while let Some((index, axis)) = pending.pop() {
            let node = &self.nodes[index];
            let dist = node.position.distance_squared(query);
            if dist < best_dist {
                best_dist = dist;
                best = node.vertex;
            }
            let delta = coord(query, axis) - coord(node.position, axis);
            let near_side = usize::from(delta >= 0.0);
            // Far subtree can only win when the split line is closer than
            // the current best.
            if delta * delta < best_dist
                && let Some(far) = node.children[1 - near_side]
            {
                pending.push((far, axis ^ 1));
            }
            if let Some(near) = node.children[near_side] {
                pending.push((near, axis ^ 1));
            }
        }
        Some(best)
    }
}

impl NearPointLocator for KdTree {
    fn add_point(&mut self, position: DVec2, vertex: VertIdx) {
        self.insert(position, vertex);
    }

    fn near_point(&self, position: DVec2) -> Option<VertIdx> {
        self.nearest(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.near_point(DVec2::ZERO), None);
    }

    #[test]
    fn test_single_point() {
        let mut tree = KdTree::new();
        tree.add_point(DVec2::new(1.0, 2.0), VertIdx(7));
        assert_eq!(tree.near_point(DVec2::new(50.0, -3.0)), Some(VertIdx(7)));
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let points: Vec<DVec2> = (0..256)
            .map(|_| DVec2::new(rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0)))
            .collect();

        let mut tree = KdTree::new();
        for (i, &p) in points.iter().enumerate() {
            tree.add_point(p, VertIdx(i));
        }

        for _ in 0..64 {
            let q = DVec2::new(rng.random_range(-12.0..12.0), rng.random_range(-12.0..12.0));
            let brute = points
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.distance_squared(q).total_cmp(&b.distance_squared(q))
                })
                .map(|(i, _)| i)
                .unwrap();
            let found = tree.near_point(q).unwrap();
            assert_eq!(
                points[found.0].distance_squared(q),
                points[brute].distance_squared(q),
            );
        }
    }

    #[test]
    fn test_incremental_growth() {
        let mut tree = KdTree::new();
        for i in 0..32 {
            let p = DVec2::new(f64::from(i), f64::from(i % 5));
            tree.add_point(p, VertIdx(i as usize));
            // the just-inserted point is its own nearest
            assert_eq!(tree.near_point(p), Some(VertIdx(i as usize)));
        }
        assert_eq!(tree.len(), 32);
    }
}
