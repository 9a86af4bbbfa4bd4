use std::f64::consts::PI;

use crate::math::polygon_2d::{bisector, segment_direction, signed_area_2d, turn_angle};
use crate::math::{Point2, Vector2};

/// A vertex of a closed contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathVertex {
    /// Position in the slicing plane.
    pub position: Point2,
    /// Interior turn angle in `[0, 2π)`.
    pub angle: f64,
    /// Inward offset velocity, of magnitude `1 / sin(angle / 2)`.
    pub bisector: Vector2,
}

impl PathVertex {
    /// Returns `true` for a reflex vertex (`angle > π`).
    #[must_use]
    pub fn is_reflex(&self) -> bool {
        self.angle > PI
    }
}

/// A closed contour with the solid on the right of the walking direction.
///
/// Outer boundaries therefore run clockwise and holes counter-clockwise.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    vertices: Vec<PathVertex>,
}

impl Path {
    /// Builds a path from ring positions, deriving each vertex's angle and
    /// bisector from its neighbours.
    #[must_use]
    pub fn from_points(points: &[Point2]) -> Self {
        let n = points.len();
        let vertices = (0..n)
            .map(|i| {
                let prev = points[(i + n - 1) % n];
                let here = points[i];
                let next = points[(i + 1) % n];
                let angle = turn_angle(&(here - prev), &(next - here));
                let bisector = match (
                    segment_direction(&prev, &here),
                    segment_direction(&here, &next),
                ) {
                    (Some(d0), Some(d1)) => bisector(&d0, &d1),
                    _ => Vector2::zeros(),
                };
                PathVertex {
                    position: here,
                    angle,
                    bisector,
                }
            })
            .collect();
        Self { vertices }
    }

    /// Vertices in walking order.
    #[must_use]
    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex positions in walking order.
    #[must_use]
    pub fn points(&self) -> Vec<Point2> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Index of the vertex after `i`, wrapping around; `0` for an empty path.
    #[must_use]
    pub fn next_index(&self, i: usize) -> usize {
        (i + 1).checked_rem(self.vertices.len()).unwrap_or(0)
    }

    /// Index of the vertex before `i`, wrapping around; `0` for an empty path.
    #[must_use]
    pub fn prev_index(&self, i: usize) -> usize {
        let n = self.vertices.len();
        (i + n)
            .checked_sub(1)
            .and_then(|j| j.checked_rem(n))
            .unwrap_or(0)
    }

    /// Edges as `(start_index, start, end)` in walking order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, Point2, Point2)> + '_ {
        (0..self.vertices.len()).map(|i| {
            (
                i,
                self.vertices[i].position,
                self.vertices[self.next_index(i)].position,
            )
        })
    }

    /// Sum of the exterior turns `π − a` over all vertices; `±2π` for a
    /// simple closed contour.
    #[must_use]
    pub fn angle_sum(&self) -> f64 {
        self.vertices.iter().map(|v| PI - v.angle).sum()
    }

    /// Reflex vertices with their indices.
    pub fn reflex_vertices(&self) -> impl Iterator<Item = (usize, &PathVertex)> {
        self.vertices.iter().enumerate().filter(|(_, v)| v.is_reflex())
    }

    /// Shoelace area; negative for an outer boundary.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        signed_area_2d(&self.points())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn l_shape_cw() -> Vec<Point2> {
        vec![
            p(0.0, 0.0),
            p(0.0, 10.0),
            p(5.0, 10.0),
            p(5.0, 5.0),
            p(10.0, 5.0),
            p(10.0, 0.0),
        ]
    }

    #[test]
    fn square_has_right_angles() {
        let path = Path::from_points(&[p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0)]);
        for v in path.vertices() {
            assert_relative_eq!(v.angle, FRAC_PI_2, epsilon = 1e-12);
            assert!(!v.is_reflex());
        }
        assert_relative_eq!(path.angle_sum(), TAU, epsilon = 1e-9);
        assert_relative_eq!(path.signed_area(), -100.0);
    }

    #[test]
    fn l_shape_has_one_reflex_vertex() {
        let path = Path::from_points(&l_shape_cw());
        let reflex: Vec<_> = path.reflex_vertices().collect();
        assert_eq!(reflex.len(), 1);
        let (i, v) = reflex[0];
        assert_eq!(i, 3);
        assert_relative_eq!(v.angle, 3.0 * FRAC_PI_2, epsilon = 1e-12);
        // Inward bisector of the notch points back into the solid.
        assert_relative_eq!(v.bisector.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(v.bisector.y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(path.angle_sum(), TAU, epsilon = 1e-9);
    }

    #[test]
    fn hole_winding_reverses_angle_sum() {
        let hole = Path::from_points(&[p(2.0, 2.0), p(4.0, 2.0), p(4.0, 4.0), p(2.0, 4.0)]);
        assert_relative_eq!(hole.angle_sum(), -TAU, epsilon = 1e-9);
        assert_eq!(hole.reflex_vertices().count(), 4);
    }

    #[test]
    fn neighbour_indices_wrap() {
        let path = Path::from_points(&l_shape_cw());
        assert_eq!(path.next_index(5), 0);
        assert_eq!(path.prev_index(0), 5);
        assert_eq!(path.edges().count(), 6);
    }

    #[test]
    fn empty_path_has_no_neighbours() {
        let path = Path::default();
        assert_eq!(path.next_index(0), 0);
        assert_eq!(path.prev_index(0), 0);
        assert_eq!(path.edges().count(), 0);
        assert!(Path::from_points(&[]).is_empty());
    }
}
