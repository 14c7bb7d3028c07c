//! Duplicate-vertex detection and edge remapping.
//!
//! The triangulation engine requires distinct vertex positions; feeding it
//! duplicates is undefined. These helpers run upstream of insertion:
//! 1. [`find_duplicates`] detects vertices with bit-identical coordinates
//! 2. [`remove_duplicates`] drops them in place, preserving order
//! 3. [`remap_edges`] rewrites edge endpoints through the survivor mapping
//!
//! [`remove_duplicates_and_remap_edges`] chains all three.

use glam::DVec2;
use hashbrown::HashMap;

use crate::triangulation::{Edge, VertIdx};

/// Information about removed duplicate vertices.
///
/// Vertices `{0,1,2,3,4}` where 3 repeats 0 produce `mapping = [0,1,2,0,3]`
/// (into the deduplicated sequence `{0,1,2,3}`) and `duplicates = [3]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DuplicatesInfo {
    /// For every original index, its index after duplicate removal.
    pub mapping: Vec<usize>,
    /// Original indices of removed vertices, ascending.
    pub duplicates: Vec<usize>,
}

/// Find duplicates in a point sequence.
///
/// Duplicates are points with exactly identical coordinates; the comparison
/// is on coordinate bits, so `-0.0` and `0.0` count as distinct.
#[must_use]
pub fn find_duplicates(points: &[DVec2]) -> DuplicatesInfo {
    find_duplicates_with(points.iter(), |p| p.x, |p| p.y)
}

/// [`find_duplicates`] over custom point types via coordinate accessors.
pub fn find_duplicates_with<T, I, FX, FY>(points: I, get_x: FX, get_y: FY) -> DuplicatesInfo
where
    I: IntoIterator<Item = T>,
    FX: Fn(&T) -> f64,
    FY: Fn(&T) -> f64,
{
    let mut seen: HashMap<(u64, u64), usize> = HashMap::new();
    let mut info = DuplicatesInfo::default();
    let mut next_out = 0;
    for (index, point) in points.into_iter().enumerate() {
        let key = (get_x(&point).to_bits(), get_y(&point).to_bits());
        match seen.entry(key) {
            hashbrown::hash_map::Entry::Occupied(entry) => {
                info.mapping.push(*entry.get());
                info.duplicates.push(index);
            }
            hashbrown::hash_map::Entry::Vacant(entry) => {
                entry.insert(next_out);
                info.mapping.push(next_out);
                next_out += 1;
            }
        }
    }
    info
}

/// Remove vertices at the given ascending indices, preserving order.
pub fn remove_duplicates(vertices: &mut Vec<DVec2>, duplicates: &[usize]) {
    if duplicates.is_empty() {
        return;
    }
    let mut drop = duplicates.iter().copied().peekable();
    let mut out = 0;
    for index in 0..vertices.len() {
        if drop.peek() == Some(&index) {
            drop.next();
            continue;
        }
        vertices.swap(out, index);
        out += 1;
    }
    vertices.truncate(out);
}

/// Rewrite every edge endpoint through `mapping` (in place).
pub fn remap_edges(edges: &mut [Edge], mapping: &[usize]) {
    for edge in edges {
        *edge = Edge::new(
            VertIdx(mapping[edge.v1().0]),
            VertIdx(mapping[edge.v2().0]),
        );
    }
}

/// Find duplicates, remove them from `vertices`, and remap `edges`.
pub fn remove_duplicates_and_remap_edges(
    vertices: &mut Vec<DVec2>,
    edges: &mut [Edge],
) -> DuplicatesInfo {
    let info = find_duplicates(vertices);
    remove_duplicates(vertices, &info.duplicates);
    remap_edges(edges, &info.mapping);
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_duplicates() {
        let points = [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 1.0),
        ];
        let info = find_duplicates(&points);
        assert_eq!(info.mapping, vec![0, 1, 0, 2]);
        assert_eq!(info.duplicates, vec![2]);
    }

    #[test]
    fn test_remove_duplicates_preserves_order() {
        let mut vertices = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 1.0),
        ];
        remove_duplicates(&mut vertices, &[2]);
        assert_eq!(
            vertices,
            vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(1.0, 0.0),
                DVec2::new(0.0, 1.0)
            ]
        );
    }

    #[test]
    fn test_remove_duplicates_and_remap_edges() {
        let mut vertices = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 1.0),
        ];
        let mut edges = [
            Edge::new(VertIdx(0), VertIdx(3)),
            Edge::new(VertIdx(2), VertIdx(1)),
        ];
        let info = remove_duplicates_and_remap_edges(&mut vertices, &mut edges);
        assert_eq!(info.mapping, vec![0, 1, 0, 2]);
        assert_eq!(info.duplicates, vec![2]);
        assert_eq!(vertices.len(), 3);
        assert_eq!(edges[0], Edge::new(VertIdx(0), VertIdx(2)));
        assert_eq!(edges[1], Edge::new(VertIdx(0), VertIdx(1)));
    }

    #[test]
    fn test_no_duplicates() {
        let mut vertices = vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 1.0)];
        let mut edges = [Edge::new(VertIdx(0), VertIdx(1))];
        let info = remove_duplicates_and_remap_edges(&mut vertices, &mut edges);
        assert!(info.duplicates.is_empty());
        assert_eq!(info.mapping, vec![0, 1]);
        assert_eq!(vertices.len(), 2);
    }

    #[test]
    fn test_find_duplicates_with_accessors() {
        let raw = [(0.0_f64, 0.0_f64, "a"), (0.0, 0.0, "b"), (1.0, 2.0, "c")];
        let info = find_duplicates_with(raw.iter(), |v| v.0, |v| v.1);
        assert_eq!(info.mapping, vec![0, 0, 1]);
        assert_eq!(info.duplicates, vec![1]);
    }
}
