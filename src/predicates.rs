//! Floating-point geometric predicates for the triangulation core.
//!
//! All predicates are sign tests on polynomial expressions of the input
//! coordinates. Ties (a result of exactly zero) are reported as the
//! degenerate case they name: collinear, cocircular, or touching. There is
//! no exact-arithmetic filtering; callers bound their search loops instead
//! of relying on predicate consistency.

use glam::DVec2;
use itertools::Itertools;

/// Location of a point relative to a directed line through `a` and `b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PtLineLocation {
    /// Strictly on the left of the directed line (positive orientation).
    Left,
    /// Strictly on the right of the directed line (negative orientation).
    Right,
    /// On the line within floating-point exactness.
    OnLine,
}

/// Location of a point relative to a counter-clockwise triangle `(a, b, c)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PtTriLocation {
    /// Strictly inside the triangle.
    Inside,
    /// Strictly outside the triangle.
    Outside,
    /// On the open edge opposite corner `i` (edge `(v_{i+1}, v_{i+2})`).
    OnEdge(usize),
    /// Coincides with corner `i`.
    OnVertex(usize),
}

/// Twice the signed area of the triangle `(a, b, c)`.
///
/// Positive when `(a, b, c)` is counter-clockwise, i.e. when `c` lies to the
/// left of the directed line `a -> b`.
#[inline]
#[must_use]
pub fn orient2d(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Classify `p` against the directed line `a -> b`.
#[inline]
#[must_use]
pub fn locate_point_line(p: DVec2, a: DVec2, b: DVec2) -> PtLineLocation {
    let orientation = orient2d(a, b, p);
    if orientation > 0.0 {
        PtLineLocation::Left
    } else if orientation < 0.0 {
        PtLineLocation::Right
    } else {
        PtLineLocation::OnLine
    }
}

/// In-circle test: positive when `d` lies strictly inside the circumcircle
/// of the counter-clockwise triangle `(a, b, c)`, zero when cocircular.
///
/// Evaluated as the 3x3 determinant of the translated lifted points, the
/// standard expansion of the 4x4 circumcircle determinant.
#[must_use]
pub fn incircle(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> f64 {
    let ad = a - d;
    let bd = b - d;
    let cd = c - d;
    ad.length_squared() * bd.perp_dot(cd) + bd.length_squared() * cd.perp_dot(ad)
        + cd.length_squared() * ad.perp_dot(bd)
}

/// A conservative roundoff magnitude for [`incircle`] on the same operands.
///
/// `|incircle| <= bound` means the sign is not trustworthy at f64 precision;
/// used by the topology audit so near-cocircular configurations are not
/// reported as Delaunay violations.
#[must_use]
pub fn incircle_error_bound(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> f64 {
    let m = (a - d)
        .length_squared()
        .max((b - d).length_squared())
        .max((c - d).length_squared());
    32.0 * f64::EPSILON * m * m
}

/// True when `p` lies on the closed segment `(a, b)`: collinear with the
/// segment and inside its axis-aligned bounding box.
#[must_use]
pub fn is_on_segment(p: DVec2, a: DVec2, b: DVec2) -> bool {
    if locate_point_line(p, a, b) != PtLineLocation::OnLine {
        return false;
    }
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// True when the open segments `(a, b)` and `(c, d)` cross properly.
///
/// Endpoint touches and collinear overlaps report `false`; callers that care
/// about pass-through vertices test those separately with [`is_on_segment`].
#[must_use]
pub fn segments_intersect(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> bool {
    let o1 = orient2d(a, b, c);
    let o2 = orient2d(a, b, d);
    let o3 = orient2d(c, d, a);
    let o4 = orient2d(c, d, b);
    o1 * o2 < 0.0 && o3 * o4 < 0.0
}

/// Classify `p` against the counter-clockwise triangle `(a, b, c)`.
///
/// The `OnEdge` payload is the index of the opposite corner, matching the
/// neighbor-slot convention of the mesh.
#[must_use]
pub fn locate_point_triangle(p: DVec2, a: DVec2, b: DVec2, c: DVec2) -> PtTriLocation {
    // Edge opposite corner i runs v_{i+1} -> v_{i+2}; inside means left of
    // all three.
    let s = [orient2d(b, c, p), orient2d(c, a, p), orient2d(a, b, p)];
    if s.iter().any(|&v| v < 0.0) {
        return PtTriLocation::Outside;
    }
    let zeros: Vec<usize> = (0..3).filter(|&i| s[i] == 0.0).collect();
    match *zeros.as_slice() {
        [] => PtTriLocation::Inside,
        [i] => PtTriLocation::OnEdge(i),
        // Two zero orientations pin p to the corner shared by both edges.
        [i, j] => PtTriLocation::OnVertex(3 - i - j),
        _ => PtTriLocation::Outside,
    }
}

/// Axis-aligned bounding box of a point set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Box2 {
    pub min: DVec2,
    pub max: DVec2,
}

impl Box2 {
    #[inline]
    #[must_use]
    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }
}

/// Bounding box enveloping `points`.
///
/// Degenerate inputs (empty, single point, collinear) produce a valid but
/// possibly zero-area box; super-triangle construction pads it.
#[must_use]
pub fn envelop_box(points: &[DVec2]) -> Box2 {
    let xs = points.iter().map(|p| p.x).minmax().into_option();
    let ys = points.iter().map(|p| p.y).minmax().into_option();
    match (xs, ys) {
        (Some((min_x, max_x)), Some((min_y, max_y))) => Box2 {
            min: DVec2::new(min_x, min_y),
            max: DVec2::new(max_x, max_y),
        },
        _ => Box2 {
            min: DVec2::ZERO,
            max: DVec2::ZERO,
        },
    }
}

/// Vertices of an equilateral triangle strictly containing `box2`.
///
/// The triangle's inscribed circle is the box's circumscribed circle scaled
/// by a comfort factor, so every boxed point is strictly interior. A
/// degenerate (zero-extent) box still gets a positive radius.
#[must_use]
pub fn super_triangle_vertices(box2: &Box2) -> [DVec2; 3] {
    let center = box2.center();
    let half_diagonal = 0.5 * box2.size().length();
    let r = if half_diagonal > 0.0 {
        half_diagonal * 1.25
    } else {
        1.0
    };
    let shift_x = r * 3.0_f64.sqrt();
    [
        DVec2::new(center.x, center.y + 2.0 * r),
        DVec2::new(center.x - shift_x, center.y - r),
        DVec2::new(center.x + shift_x, center.y - r),
    ]
}
