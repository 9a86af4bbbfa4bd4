use tracing::debug;

use crate::geometry::{Plane, Triangle};
use crate::math::intersect_2d::cross_2d;
use crate::math::{points_coincide, Point2, Point3, Vector2, POINT_TOLERANCE, TOLERANCE};

/// A directed 2D segment cut from one facet, with the solid on its right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedSegment {
    pub start: Point2,
    pub end: Point2,
    /// Unit XY projection of the source facet's normal.
    pub normal: Vector2,
}

/// Cuts every facet with a horizontal plane.
///
/// Facets crossing the plane contribute one segment each. The segment is
/// directed so that the facet normal points to its left, which keeps the
/// solid on the right of every segment without building polygons yet.
#[derive(Debug)]
pub struct PlaneSlicer<'a> {
    triangles: &'a [Triangle],
    z: f64,
}

impl<'a> PlaneSlicer<'a> {
    /// Creates a slicer for the plane at height `z`.
    #[must_use]
    pub fn new(triangles: &'a [Triangle], z: f64) -> Self {
        Self { triangles, z }
    }

    /// Returns the unordered bag of segments at this height.
    #[must_use]
    pub fn execute(&self) -> Vec<OrientedSegment> {
        let plane = Plane::horizontal(self.z);
        let segments: Vec<_> = self
            .triangles
            .iter()
            .filter_map(|t| slice_triangle(t, &plane))
            .collect();
        debug!(z = self.z, segments = segments.len(), "sliced plane");
        segments
    }
}

fn slice_triangle(triangle: &Triangle, plane: &Plane) -> Option<OrientedSegment> {
    let mut points: Vec<Point3> = Vec::with_capacity(3);
    for p in triangle.plane_crossings(plane) {
        // A plane through a corner reports it once per adjacent edge.
        if !points
            .iter()
            .any(|q| points_coincide(&q.xy(), &p.xy(), POINT_TOLERANCE))
        {
            points.push(p);
        }
    }
    let [p0, p1] = points.as_slice() else {
        return None;
    };

    // Horizontal facets have no XY normal and contribute nothing.
    let n = triangle.normal.xy().try_normalize(TOLERANCE)?;
    let p0 = p0.xy();
    let p1 = p1.xy();
    let (start, end) = if cross_2d(&(p0 - p1), &n) > 0.0 {
        (p1, p0)
    } else if cross_2d(&(p1 - p0), &n) > 0.0 {
        (p0, p1)
    } else {
        return None;
    };
    Some(OrientedSegment {
        start,
        end,
        normal: n,
    })
}
