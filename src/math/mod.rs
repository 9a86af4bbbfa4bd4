pub mod intersect_2d;
pub mod intersect_3d;
pub mod polygon_2d;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Distance under which two slice points are considered the same point.
///
/// Coarser than [`TOLERANCE`] because neighbouring triangles compute a shared
/// crossing independently.
pub const POINT_TOLERANCE: f64 = 1e-7;

/// Floor applied to angle comparisons so a zero collinear tolerance still
/// absorbs rounding noise.
pub const ANGLE_EPSILON: f64 = 1e-9;

/// Returns `true` when two 2D points coincide within `tol`.
#[must_use]
pub fn points_coincide(a: &Point2, b: &Point2, tol: f64) -> bool {
    (a - b).norm_squared() <= tol * tol
}
