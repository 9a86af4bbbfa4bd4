use super::{Point2, Vector2, TOLERANCE};

/// 2D cross product (z component of the 3D cross product).
#[must_use]
pub fn cross_2d(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Parametric 2D line-line intersection.
///
/// Given lines `p1 + t * d1` and `p2 + u * d2`, returns `(t, u)` if not parallel.
#[must_use]
pub fn line_line_intersect_2d(
    p1: &Point2,
    d1: &Vector2,
    p2: &Point2,
    d2: &Vector2,
) -> Option<(f64, f64)> {
    let cross = cross_2d(d1, d2);
    if cross.abs() < TOLERANCE {
        return None;
    }
    let diff = p2 - p1;
    let t = cross_2d(&diff, d2) / cross;
    let u = cross_2d(&diff, d1) / cross;
    Some((t, u))
}

/// Bounded segment-segment intersection in 2D.
///
/// Returns `(intersection_point, t, u)` where `t` and `u` are in `[0, 1]`.
/// Parallel and collinear segments report no intersection.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<(Point2, f64, f64)> {
    let da = a1 - a0;
    let db = b1 - b0;
    let (t, u) = line_line_intersect_2d(a0, &da, b0, &db)?;

    // Use a small epsilon to include endpoints.
    let eps = TOLERANCE;
    if t >= -eps && t <= 1.0 + eps && u >= -eps && u <= 1.0 + eps {
        let t_clamped = t.clamp(0.0, 1.0);
        Some((a0 + da * t_clamped, t_clamped, u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Intersection of the ray `origin + t * dir` (for `t > min_t`) with the
/// segment `b0 → b1`.
///
/// Returns `(t, u)` with `u` the normalized position along the segment.
#[must_use]
pub fn ray_segment_intersect_2d(
    origin: &Point2,
    dir: &Vector2,
    b0: &Point2,
    b1: &Point2,
    min_t: f64,
) -> Option<(f64, f64)> {
    let db = b1 - b0;
    let (t, u) = line_line_intersect_2d(origin, dir, b0, &db)?;
    let eps = TOLERANCE;
    (t > min_t && u >= -eps && u <= 1.0 + eps).then(|| (t, u.clamp(0.0, 1.0)))
}

/// Scalar projection of `offset` onto `dir`, in units of `dir`.
///
/// For a point moving as `origin + dir * t`, this is the time at which it
/// passes the foot of `origin + offset` on its path.
#[must_use]
pub fn position_along(dir: &Vector2, offset: &Vector2) -> f64 {
    dir.dot(offset) / dir.norm_squared()
}

/// Linear interpolation: `origin + dir * t`.
#[must_use]
pub fn point_at(origin: &Point2, dir: &Vector2, t: f64) -> Point2 {
    origin + dir * t
}

/// Earliest time at which two linearly moving points coincide.
///
/// Each point is given by its position at time zero and its velocity, so
/// point `a` is at `a0 + va * t`. Returns `(t, gap)` for the time of closest
/// approach and the remaining distance there, or `None` if the points do not
/// move relative to each other.
#[must_use]
pub fn closest_approach_2d(
    a0: &Point2,
    va: &Vector2,
    b0: &Point2,
    vb: &Vector2,
) -> Option<(f64, f64)> {
    let d = b0 - a0;
    let w = vb - va;
    let w_sq = w.norm_squared();
    if w_sq < TOLERANCE * TOLERANCE {
        return None;
    }
    let t = -d.dot(&w) / w_sq;
    Some((t, (d + w * t).norm()))
}
