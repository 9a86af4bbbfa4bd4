use crate::geometry::Plane;

use super::{Point3, Vector3, TOLERANCE};

/// Relationship between two planes.
#[derive(Debug)]
pub enum PlanePairRelation {
    /// Planes intersect along a line.
    IntersectionLine {
        origin: Point3,
        direction: Vector3,
    },
    /// Planes are parallel but not coincident.
    Parallel { distance: f64 },
    /// Planes are the same (coincident).
    Coincident,
}

/// Computes the intersection of two planes.
///
/// Returns an [`IntersectionLine`](PlanePairRelation::IntersectionLine) with a
/// unit-length `direction` when the planes cross.
#[must_use]
pub fn plane_plane_intersect(a: &Plane, b: &Plane) -> PlanePairRelation {
    let na = a.normal();
    let nb = b.normal();

    let dir = na.cross(nb);
    let dir_len = dir.norm();

    if dir_len < TOLERANCE {
        let dist = (b.origin() - a.origin()).dot(na).abs();
        if dist < TOLERANCE {
            PlanePairRelation::Coincident
        } else {
            PlanePairRelation::Parallel { distance: dist }
        }
    } else {
        // p = oa + s * na + t * nb with na.(p - oa) = 0 and nb.(p - ob) = 0.
        let d2 = nb.dot(&(b.origin() - a.origin()));
        let dot_nn = na.dot(nb);
        let denom = 1.0 - dot_nn * dot_nn;
        let s = -dot_nn * d2 / denom;
        let t = d2 / denom;
        PlanePairRelation::IntersectionLine {
            origin: a.origin() + na * s + nb * t,
            direction: dir / dir_len,
        }
    }
}

/// Relationship of a line with a plane.
#[derive(Debug)]
pub enum LinePlaneRelation {
    /// Line intersects the plane at a single point.
    Point { point: Point3, t: f64 },
    /// Line is parallel to the plane (does not intersect).
    Parallel,
    /// Line lies entirely on the plane.
    OnPlane,
}

/// Computes the intersection of a line `origin + t * dir` with a plane.
#[must_use]
pub fn line_plane_intersect(origin: &Point3, dir: &Vector3, plane: &Plane) -> LinePlaneRelation {
    let normal = plane.normal();
    let denom = normal.dot(dir);
    let numer = normal.dot(&(plane.origin() - origin));

    if denom.abs() < TOLERANCE {
        if numer.abs() < TOLERANCE {
            LinePlaneRelation::OnPlane
        } else {
            LinePlaneRelation::Parallel
        }
    } else {
        let t = numer / denom;
        LinePlaneRelation::Point {
            point: origin + dir * t,
            t,
        }
    }
}

/// Signed distance from a point to a plane.
/// Positive = on the normal side, negative = opposite.
#[must_use]
pub fn signed_distance_to_plane(point: &Point3, plane: &Plane) -> f64 {
    plane.normal().dot(&(point - plane.origin()))
}
