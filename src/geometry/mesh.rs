use crate::error::SliceError;
use crate::math::polygon_2d::signed_area_2d;
use crate::math::{Point2, Point3, Vector3, TOLERANCE};

use super::Triangle;

/// Fewest facets that can enclose a volume (a tetrahedron).
pub const MIN_SOLID_TRIANGLES: usize = 4;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Creates a box from its two corners.
    #[must_use]
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, or `None` for no points.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self::new(first, first), |b, p| Self {
            min: b.min.inf(p),
            max: b.max.sup(p),
        }))
    }

    /// Length of the box diagonal projected onto the XY plane.
    ///
    /// No motorcycle can travel further than this inside the outline.
    #[must_use]
    pub fn diagonal_2d(&self) -> f64 {
        (self.max.xy() - self.min.xy()).norm()
    }

    /// Extent along Z.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.z - self.min.z
    }
}

/// The triangle soup handed to the slicer, with its bounding box.
#[derive(Debug, Clone)]
pub struct Mesh {
    triangles: Vec<Triangle>,
    bounds: Aabb,
}

impl Mesh {
    /// Wraps triangles with caller-supplied bounds.
    #[must_use]
    pub fn new(triangles: Vec<Triangle>, bounds: Aabb) -> Self {
        Self { triangles, bounds }
    }

    /// Wraps triangles, computing the bounds from their corners.
    #[must_use]
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let bounds = Aabb::from_points(triangles.iter().flat_map(|t| t.points.iter()))
            .unwrap_or_else(|| Aabb::new(Point3::origin(), Point3::origin()));
        Self::new(triangles, bounds)
    }

    /// The facets, in input order.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// The bounding box layers and motorcycle lengths are derived from.
    #[must_use]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Returns `true` if there are enough facets to enclose a volume.
    #[must_use]
    pub fn is_solid(&self) -> bool {
        self.triangles.len() >= MIN_SOLID_TRIANGLES
    }

    /// # Errors
    ///
    /// Returns [`SliceError::DegenerateInput`] when the mesh has fewer than
    /// four triangles.
    pub fn check_solid(&self) -> Result<(), SliceError> {
        if self.is_solid() {
            Ok(())
        } else {
            Err(SliceError::DegenerateInput {
                triangles: self.triangles.len(),
            })
        }
    }

    /// Extrudes a polygon between `z0` and `z1` into a closed solid with
    /// outward-facing normals.
    ///
    /// The outline may be given in either winding. Caps are fan-triangulated
    /// from the first vertex, so the outline must be star-shaped from there.
    #[must_use]
    pub fn prism(outline: &[Point2], z0: f64, z1: f64) -> Self {
        let mut ring = outline.to_vec();
        if signed_area_2d(&ring) < 0.0 {
            ring.reverse();
        }
        let n = ring.len();
        let at = |p: &Point2, z: f64| Point3::new(p.x, p.y, z);
        let mut triangles = Vec::with_capacity(4 * n);

        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            let d = b - a;
            let len = d.norm();
            if len < TOLERANCE {
                continue;
            }
            let normal = Vector3::new(d.y / len, -d.x / len, 0.0);
            triangles.push(Triangle::new(at(&a, z0), at(&b, z0), at(&b, z1), normal));
            triangles.push(Triangle::new(at(&a, z0), at(&b, z1), at(&a, z1), normal));
        }

        for i in 1..n.saturating_sub(1) {
            let (a, b, c) = (ring[0], ring[i], ring[i + 1]);
            triangles.push(Triangle::new(at(&a, z1), at(&b, z1), at(&c, z1), Vector3::z()));
            triangles.push(Triangle::new(at(&a, z0), at(&c, z0), at(&b, z0), -Vector3::z()));
        }

        Self::from_triangles(triangles)
    }
}
