use crate::math::intersect_3d::{
    line_plane_intersect, plane_plane_intersect, signed_distance_to_plane, LinePlaneRelation,
    PlanePairRelation,
};
use crate::math::{Point3, Vector3, TOLERANCE};

/// An infinite line defined by an origin point and a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    origin: Point3,
    direction: Vector3,
}

impl Line {
    /// Creates a new line, or `None` if the direction is zero-length.
    #[must_use]
    pub fn new(origin: Point3, direction: Vector3) -> Option<Self> {
        let len = direction.norm();
        (len >= TOLERANCE).then(|| Self {
            origin,
            direction: direction / len,
        })
    }

    /// Returns the origin point of the line.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the unit direction of the line.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    /// Distance from `p` to this line.
    #[must_use]
    pub fn distance_to(&self, p: &Point3) -> f64 {
        (p - self.origin).cross(&self.direction).norm()
    }
}

/// A bounded segment between two 3D points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment3 {
    pub start: Point3,
    pub end: Point3,
}

impl Segment3 {
    /// Creates a new segment between two points.
    #[must_use]
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// Returns the segment length.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Returns `true` when the endpoints coincide.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.length() < TOLERANCE
    }

    /// Returns `true` if `p` lies on the segment: its distance from either
    /// endpoint is no longer than the segment itself.
    #[must_use]
    pub fn contains(&self, p: &Point3) -> bool {
        let len = self.length();
        (p - self.start).norm() <= len + TOLERANCE
            && (p - self.end).norm() <= len + TOLERANCE
            && self.line().is_some_and(|l| l.distance_to(p) < TOLERANCE * 1e3)
    }

    /// The supporting line, or `None` for a degenerate segment.
    #[must_use]
    pub fn line(&self) -> Option<Line> {
        Line::new(self.start, self.end - self.start)
    }

    /// Crossing point of this segment with `plane`.
    ///
    /// The supporting line is intersected with the plane, and the hit is kept
    /// only if its distance from both endpoints does not exceed the segment
    /// length. Segments lying in or parallel to the plane yield `None`.
    #[must_use]
    pub fn plane_crossing(&self, plane: &Plane) -> Option<Point3> {
        if self.is_degenerate() {
            return None;
        }
        match line_plane_intersect(&self.start, &(self.end - self.start), plane) {
            LinePlaneRelation::Point { point, .. } => {
                let len = self.length();
                ((point - self.start).norm() <= len && (point - self.end).norm() <= len)
                    .then_some(point)
            }
            LinePlaneRelation::Parallel | LinePlaneRelation::OnPlane => None,
        }
    }
}

/// An infinite plane given by a point and a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    origin: Point3,
    normal: Vector3,
}

impl Plane {
    /// Creates a plane from an origin and a normal, or `None` if the normal
    /// is zero-length.
    #[must_use]
    pub fn new(origin: Point3, normal: Vector3) -> Option<Self> {
        let len = normal.norm();
        (len >= TOLERANCE).then(|| Self {
            origin,
            normal: normal / len,
        })
    }

    /// The horizontal slicing plane at height `z`.
    #[must_use]
    pub fn horizontal(z: f64) -> Self {
        Self {
            origin: Point3::new(0.0, 0.0, z),
            normal: Vector3::z(),
        }
    }

    /// Returns the origin point of the plane.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the unit normal of the plane.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }
}

/// A mesh facet: three ordered points and the unit face normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub points: [Point3; 3],
    pub normal: Vector3,
}

impl Triangle {
    /// Creates a new triangle with a caller-supplied unit normal.
    #[must_use]
    pub fn new(p0: Point3, p1: Point3, p2: Point3, normal: Vector3) -> Self {
        Self {
            points: [p0, p1, p2],
            normal,
        }
    }

    /// Builds a triangle whose normal follows the right-hand rule.
    #[must_use]
    pub fn from_points(p0: Point3, p1: Point3, p2: Point3) -> Self {
        let n = (p1 - p0).cross(&(p2 - p0));
        let len = n.norm();
        let normal = if len < TOLERANCE { Vector3::zeros() } else { n / len };
        Self::new(p0, p1, p2, normal)
    }

    /// The three edges in winding order.
    #[must_use]
    pub fn edges(&self) -> [Segment3; 3] {
        let [a, b, c] = self.points;
        [Segment3::new(a, b), Segment3::new(b, c), Segment3::new(c, a)]
    }

    /// Points where the triangle's edges cross `plane`, one per crossing edge.
    ///
    /// Each edge is evaluated in a canonical endpoint order so that two
    /// facets sharing an edge produce bit-identical crossings.
    #[must_use]
    pub fn plane_crossings(&self, plane: &Plane) -> Vec<Point3> {
        self.edges()
            .iter()
            .filter_map(|edge| canonical(edge).plane_crossing(plane))
            .collect()
    }

    /// Returns `true` if `p` lies inside the triangle (on its plane).
    #[must_use]
    pub fn contains(&self, p: &Point3) -> bool {
        let Some(plane) = self.plane() else {
            return false;
        };
        if signed_distance_to_plane(p, &plane).abs() > TOLERANCE * 1e3 {
            return false;
        }
        let n = plane.normal();
        (0..3).all(|i| {
            let a = self.points[i];
            let b = self.points[(i + 1) % 3];
            (b - a).cross(&(p - a)).dot(n) >= -TOLERANCE
        })
    }

    /// The supporting plane, or `None` for a degenerate triangle.
    #[must_use]
    pub fn plane(&self) -> Option<Plane> {
        let [a, b, c] = self.points;
        Plane::new(a, (b - a).cross(&(c - a)))
    }
}

fn canonical(edge: &Segment3) -> Segment3 {
    let (a, b) = (edge.start, edge.end);
    if (a.x, a.y, a.z) <= (b.x, b.y, b.z) {
        Segment3::new(a, b)
    } else {
        Segment3::new(b, a)
    }
}

/// Tagged union over the geometric shapes the slicer intersects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Point(Point3),
    Line(Line),
    Segment(Segment3),
    Plane(Plane),
    Triangle(Triangle),
}

/// Result of intersecting two primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intersection {
    Empty,
    Point(Point3),
    Segment(Segment3),
    Line(Line),
    /// The operands overlap in a region of their own dimension.
    Coincident,
}

impl Primitive {
    /// Returns `true` if `p` lies on this primitive.
    #[must_use]
    pub fn contains(&self, p: &Point3) -> bool {
        match self {
            Self::Point(q) => (p - q).norm() < TOLERANCE,
            Self::Line(l) => l.distance_to(p) < TOLERANCE * 1e3,
            Self::Segment(s) => s.contains(p),
            Self::Plane(pl) => signed_distance_to_plane(p, pl).abs() < TOLERANCE * 1e3,
            Self::Triangle(t) => t.contains(p),
        }
    }

    /// Intersects two primitives.
    #[must_use]
    pub fn intersect(&self, other: &Primitive) -> Intersection {
        use Primitive as P;
        match (self, other) {
            (P::Point(p), o) | (o, P::Point(p)) => {
                if o.contains(p) {
                    Intersection::Point(*p)
                } else {
                    Intersection::Empty
                }
            }
            (P::Line(l), P::Plane(pl)) | (P::Plane(pl), P::Line(l)) => {
                match line_plane_intersect(l.origin(), l.direction(), pl) {
                    LinePlaneRelation::Point { point, .. } => Intersection::Point(point),
                    LinePlaneRelation::Parallel => Intersection::Empty,
                    LinePlaneRelation::OnPlane => Intersection::Line(*l),
                }
            }
            (P::Segment(s), P::Plane(pl)) | (P::Plane(pl), P::Segment(s)) => {
                if P::Plane(*pl).contains(&s.start) && P::Plane(*pl).contains(&s.end) {
                    return Intersection::Segment(*s);
                }
                s.plane_crossing(pl)
                    .map_or(Intersection::Empty, Intersection::Point)
            }
            (P::Plane(a), P::Plane(b)) => match plane_plane_intersect(a, b) {
                PlanePairRelation::IntersectionLine { origin, direction } => {
                    Line::new(origin, direction).map_or(Intersection::Empty, Intersection::Line)
                }
                PlanePairRelation::Parallel { .. } => Intersection::Empty,
                PlanePairRelation::Coincident => Intersection::Coincident,
            },
            (P::Line(a), P::Line(b)) => line_line(a, b, |_| true),
            (P::Line(l), P::Segment(s)) | (P::Segment(s), P::Line(l)) => match s.line() {
                Some(sl) => line_line(l, &sl, |p| s.contains(p)),
                None => P::Line(*l).intersect(&P::Point(s.start)),
            },
            (P::Segment(a), P::Segment(b)) => match (a.line(), b.line()) {
                (Some(la), Some(lb)) => {
                    line_line(&la, &lb, |p| a.contains(p) && b.contains(p))
                }
                (None, _) => P::Segment(*b).intersect(&P::Point(a.start)),
                (_, None) => P::Segment(*a).intersect(&P::Point(b.start)),
            },
            (P::Triangle(t), P::Plane(pl)) | (P::Plane(pl), P::Triangle(t)) => {
                match t.plane_crossings(pl).as_slice() {
                    [] => Intersection::Empty,
                    [p] => Intersection::Point(*p),
                    [a, b, ..] if (a - b).norm() < TOLERANCE => Intersection::Point(*a),
                    [a, b, ..] => Intersection::Segment(Segment3::new(*a, *b)),
                }
            }
            (P::Triangle(t), P::Line(l)) | (P::Line(l), P::Triangle(t)) => match t.plane() {
                Some(pl) => match P::Line(*l).intersect(&P::Plane(pl)) {
                    Intersection::Point(p) if t.contains(&p) => Intersection::Point(p),
                    Intersection::Line(_) => Intersection::Coincident,
                    _ => Intersection::Empty,
                },
                None => Intersection::Empty,
            },
            (P::Triangle(t), P::Segment(s)) | (P::Segment(s), P::Triangle(t)) => match s.line() {
                Some(l) => match P::Triangle(*t).intersect(&P::Line(l)) {
                    Intersection::Point(p) if s.contains(&p) => Intersection::Point(p),
                    Intersection::Coincident => Intersection::Coincident,
                    _ => Intersection::Empty,
                },
                None => P::Triangle(*t).intersect(&P::Point(s.start)),
            },
            (P::Triangle(a), P::Triangle(b)) => triangle_triangle(a, b),
        }
    }
}

/// Line-line intersection in 3D, keeping the hit only if `accept` agrees.
fn line_line(a: &Line, b: &Line, accept: impl Fn(&Point3) -> bool) -> Intersection {
    let da = a.direction();
    let db = b.direction();
    let n = da.cross(db);
    let n_sq = n.norm_squared();
    let w = b.origin() - a.origin();
    if n_sq < TOLERANCE * TOLERANCE {
        return if a.distance_to(b.origin()) < TOLERANCE * 1e3 {
            Intersection::Coincident
        } else {
            Intersection::Empty
        };
    }
    let t = w.cross(db).dot(&n) / n_sq;
    let u = w.cross(da).dot(&n) / n_sq;
    let pa = a.origin() + da * t;
    let pb = b.origin() + db * u;
    if (pa - pb).norm() > TOLERANCE * 1e3 || !accept(&pa) {
        return Intersection::Empty;
    }
    Intersection::Point(pa)
}

/// Edge-against-facet test in both directions; coplanar facets report
/// `Coincident` when any corner of one lies in the other.
fn triangle_triangle(a: &Triangle, b: &Triangle) -> Intersection {
    let (Some(pa), Some(pb)) = (a.plane(), b.plane()) else {
        return Intersection::Empty;
    };
    if let PlanePairRelation::Coincident = plane_plane_intersect(&pa, &pb) {
        let overlap = a.points.iter().any(|p| b.contains(p))
            || b.points.iter().any(|p| a.contains(p));
        return if overlap {
            Intersection::Coincident
        } else {
            Intersection::Empty
        };
    }

    let mut hits: Vec<Point3> = Vec::new();
    let mut collect = |tri: &Triangle, edges: [Segment3; 3]| {
        for edge in edges {
            if let Intersection::Point(p) =
                Primitive::Triangle(*tri).intersect(&Primitive::Segment(edge))
            {
                if hits.iter().all(|h| (h - p).norm() > TOLERANCE) {
                    hits.push(p);
                }
            }
        }
    };
    collect(b, a.edges());
    collect(a, b.edges());

    match hits.as_slice() {
        [] => Intersection::Empty,
        [p] => Intersection::Point(*p),
        [p, q, ..] => Intersection::Segment(Segment3::new(*p, *q)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn segment_crossing_uses_distance_containment() {
        let plane = Plane::horizontal(1.0);
        let seg = Segment3::new(p(0.0, 0.0, 0.0), p(0.0, 0.0, 2.0));
        let hit = seg.plane_crossing(&plane).unwrap();
        assert!((hit.z - 1.0).abs() < TOLERANCE);

        let short = Segment3::new(p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.5));
        assert!(short.plane_crossing(&plane).is_none());
    }

    #[test]
    fn crossing_at_endpoint_is_kept() {
        let plane = Plane::horizontal(2.0);
        let seg = Segment3::new(p(0.0, 0.0, 0.0), p(0.0, 0.0, 2.0));
        assert!(seg.plane_crossing(&plane).is_some());
    }

    #[test]
    fn degenerate_edge_is_skipped() {
        let plane = Plane::horizontal(0.0);
        let seg = Segment3::new(p(1.0, 1.0, 0.0), p(1.0, 1.0, 0.0));
        assert!(seg.plane_crossing(&plane).is_none());
    }

    #[test]
    fn triangle_crosses_plane_at_two_points() {
        let tri = Triangle::from_points(p(0.0, 0.0, 0.0), p(2.0, 0.0, 2.0), p(0.0, 0.0, 2.0));
        let hits = tri.plane_crossings(&Plane::horizontal(1.0));
        assert_eq!(hits.len(), 2);
        match Primitive::Triangle(tri).intersect(&Primitive::Plane(Plane::horizontal(1.0))) {
            Intersection::Segment(s) => assert!((s.length() - 1.0).abs() < 1e-9),
            other => panic!("expected Segment, got {other:?}"),
        }
    }

    #[test]
    fn shared_edge_crossings_match_exactly() {
        let a = p(0.3, 0.1, 0.0);
        let b = p(1.7, 2.9, 3.0);
        let t1 = Triangle::from_points(a, b, p(5.0, 0.0, 0.0));
        let t2 = Triangle::from_points(b, a, p(-5.0, 0.0, 3.0));
        let plane = Plane::horizontal(1.1);
        let on_shared = |t: &Triangle| {
            t.plane_crossings(&plane)
                .into_iter()
                .find(|q| Segment3::new(a, b).contains(q))
                .unwrap()
        };
        assert_eq!(on_shared(&t1), on_shared(&t2));
    }

    #[test]
    fn line_pierces_triangle() {
        let tri = Triangle::from_points(p(0.0, 0.0, 0.0), p(4.0, 0.0, 0.0), p(0.0, 4.0, 0.0));
        let inside = Line::new(p(1.0, 1.0, -1.0), Vector3::z()).unwrap();
        let outside = Line::new(p(5.0, 5.0, -1.0), Vector3::z()).unwrap();
        assert!(matches!(
            Primitive::Triangle(tri).intersect(&Primitive::Line(inside)),
            Intersection::Point(_)
        ));
        assert_eq!(
            Primitive::Line(outside).intersect(&Primitive::Triangle(tri)),
            Intersection::Empty
        );
    }

    #[test]
    fn crossing_segments() {
        let a = Segment3::new(p(0.0, 0.0, 0.0), p(2.0, 2.0, 0.0));
        let b = Segment3::new(p(0.0, 2.0, 0.0), p(2.0, 0.0, 0.0));
        match Primitive::Segment(a).intersect(&Primitive::Segment(b)) {
            Intersection::Point(q) => {
                assert!((q.x - 1.0).abs() < 1e-9 && (q.y - 1.0).abs() < 1e-9);
            }
            other => panic!("expected Point, got {other:?}"),
        }
    }

    #[test]
    fn point_containment_is_symmetric() {
        let seg = Primitive::Segment(Segment3::new(p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0)));
        let on = Primitive::Point(p(1.0, 0.0, 0.0));
        let off = Primitive::Point(p(1.0, 1.0, 0.0));
        assert!(matches!(seg.intersect(&on), Intersection::Point(_)));
        assert!(matches!(on.intersect(&seg), Intersection::Point(_)));
        assert_eq!(off.intersect(&seg), Intersection::Empty);
    }

    #[test]
    fn piercing_triangles_meet_along_segment() {
        let a = Triangle::from_points(p(-2.0, -2.0, 0.0), p(2.0, -2.0, 0.0), p(0.0, 2.0, 0.0));
        let b = Triangle::from_points(p(0.0, 0.0, -1.0), p(0.0, 0.0, 1.0), p(0.0, 5.0, 0.0));
        assert!(matches!(
            Primitive::Triangle(a).intersect(&Primitive::Triangle(b)),
            Intersection::Segment(_) | Intersection::Point(_)
        ));
    }

    #[test]
    fn perpendicular_planes_meet_in_line() {
        let a = Plane::horizontal(0.0);
        let b = Plane::new(p(0.0, 0.0, 0.0), Vector3::x()).unwrap();
        assert!(matches!(
            Primitive::Plane(a).intersect(&Primitive::Plane(b)),
            Intersection::Line(_)
        ));
    }
}
