use std::f64::consts::{PI, TAU};

use super::{intersect_2d::cross_2d, Point2, Vector2, ANGLE_EPSILON, TOLERANCE};

/// Computes the signed area of a polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Computes the normalized direction from point `a` to point `b`, or `None`
/// for a zero-length segment.
#[must_use]
pub fn segment_direction(a: &Point2, b: &Point2) -> Option<Vector2> {
    let d = b - a;
    let len = d.norm();
    (len >= TOLERANCE).then(|| d / len)
}

/// Returns the right-pointing normal of a direction vector.
///
/// Contours keep the solid on the right of the walking direction, so this is
/// the inward normal of an edge.
#[must_use]
pub fn right_normal(dir: &Vector2) -> Vector2 {
    Vector2::new(dir.y, -dir.x)
}

/// Signed interior turn angle at a vertex, in `[0, 2π)`.
///
/// `s0` is the incoming edge vector and `s1` the outgoing one. Angles above
/// `π` mark reflex vertices.
#[must_use]
pub fn turn_angle(s0: &Vector2, s1: &Vector2) -> f64 {
    let a = s1.y.atan2(s1.x) - (-s0.y).atan2(-s0.x);
    let a = if a < 0.0 { a + TAU } else { a };
    if a >= TAU {
        a - TAU
    } else {
        a
    }
}

/// Returns `true` when the turn angle `a` is within `tolerance` of a straight
/// pass-through.
#[must_use]
pub fn is_straight(a: f64, tolerance: f64) -> bool {
    (a - PI).abs() <= tolerance.max(ANGLE_EPSILON)
}

/// Returns `true` when the turn angle is so sharp that the bisector speed
/// `1 / sin(a / 2)` is unbounded.
#[must_use]
pub fn is_spike(a: f64) -> bool {
    (a * 0.5).sin() < ANGLE_EPSILON
}

/// Inward bisector velocity for a vertex between edges with unit directions
/// `in_dir` and `out_dir`.
///
/// The magnitude is `1 / sin(a / 2)`, so moving the vertex by `bisector * t`
/// keeps it on both edges offset inward by `t`. Anti-parallel edges have no
/// finite bisector; the outgoing edge normal is used instead.
#[must_use]
pub fn bisector(in_dir: &Vector2, out_dir: &Vector2) -> Vector2 {
    let a = turn_angle(in_dir, out_dir);
    let n0 = right_normal(in_dir);
    let n1 = right_normal(out_dir);
    let sum = n0 + n1;
    let len = sum.norm();
    if len < TOLERANCE || is_spike(a) {
        return n1;
    }
    sum / len * (1.0 / (a * 0.5).sin())
}

/// Cross product of `(b - a)` and `(c - b)`; zero for collinear points.
#[must_use]
pub fn turn_cross(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    cross_2d(&(b - a), &(c - b))
}
