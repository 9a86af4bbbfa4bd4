use crate::math::{Point2, Vector2};
use crate::topology::Path;

/// Default pick radius, in model units, around the nearest vertex.
pub const DEFAULT_PICK_RADIUS: f64 = 0.1;

/// Which set of paths a probed vertex belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathGroup {
    Outline,
    /// Shell with the given index, innermost last.
    Shell(usize),
}

/// Description of a probed vertex and its two edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexInfo {
    pub group: PathGroup,
    pub path: usize,
    pub vertex: usize,
    pub prev: usize,
    pub next: usize,
    pub position: Point2,
    /// Distance from the query point to the vertex.
    pub distance: f64,
    pub prev_length: f64,
    pub next_length: f64,
    pub angle: f64,
    pub bisector: Vector2,
}

/// Finds the vertex closest to a query point over outline and shell paths.
///
/// # Algorithm
///
/// 1. Rank every vertex by its distance to the query point.
/// 2. Keep the vertices within the pick radius of the nearest distance.
/// 3. Among those, prefer the vertex whose bisector tip
///    (`position + bisector`) lies closest to the query point, so coincident
///    vertices can be told apart by pointing into their bisector.
#[derive(Debug)]
pub struct NearestVertex<'a> {
    point: Point2,
    groups: Vec<(PathGroup, &'a [Path])>,
    pick_radius: f64,
}

impl<'a> NearestVertex<'a> {
    /// Creates a probe at `point` with the default pick radius.
    #[must_use]
    pub fn new(point: Point2) -> Self {
        Self {
            point,
            groups: Vec::new(),
            pick_radius: DEFAULT_PICK_RADIUS,
        }
    }

    /// Adds the outline paths to the search.
    #[must_use]
    pub fn with_outline(mut self, paths: &'a [Path]) -> Self {
        self.groups.push((PathGroup::Outline, paths));
        self
    }

    /// Adds the paths of shell `index` to the search.
    #[must_use]
    pub fn with_shell(mut self, index: usize, paths: &'a [Path]) -> Self {
        self.groups.push((PathGroup::Shell(index), paths));
        self
    }

    /// Sets the pick radius; negative values are clamped to zero.
    #[must_use]
    pub fn with_pick_radius(mut self, radius: f64) -> Self {
        self.pick_radius = radius.max(0.0);
        self
    }

    /// Returns the picked vertex, or `None` if there are no vertices.
    #[must_use]
    pub fn execute(&self) -> Option<VertexInfo> {
        let mut ranked: Vec<(f64, PathGroup, usize, usize)> = self
            .groups
            .iter()
            .flat_map(|&(group, paths)| {
                paths.iter().enumerate().flat_map(move |(pi, path)| {
                    path.vertices()
                        .iter()
                        .enumerate()
                        .map(move |(vi, v)| ((v.position - self.point).norm(), group, pi, vi))
                })
            })
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (nearest, ..) = *ranked.first()?;
        let limit = nearest + self.pick_radius;

        let mut best: Option<((PathGroup, usize, usize), f64)> = None;
        for &(_, group, pi, vi) in ranked.iter().take_while(|c| c.0 <= limit) {
            let v = self.path(group, pi)?.vertices()[vi];
            let tip = (v.position + v.bisector - self.point).norm();
            if best.map_or(true, |(_, d)| tip < d) {
                best = Some(((group, pi, vi), tip));
            }
        }

        let ((group, pi, vi), _) = best?;
        let path = self.path(group, pi)?;
        let v = path.vertices()[vi];
        let prev = path.prev_index(vi);
        let next = path.next_index(vi);
        let points = path.vertices();
        Some(VertexInfo {
            group,
            path: pi,
            vertex: vi,
            prev,
            next,
            position: v.position,
            distance: (v.position - self.point).norm(),
            prev_length: (v.position - points[prev].position).norm(),
            next_length: (points[next].position - v.position).norm(),
            angle: v.angle,
            bisector: v.bisector,
        })
    }

    fn path(&self, group: PathGroup, index: usize) -> Option<&'a Path> {
        self.groups
            .iter()
            .find(|(g, _)| *g == group)
            .and_then(|(_, paths)| paths.get(index))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn square(lo: f64, hi: f64) -> Path {
        Path::from_points(&[p(lo, lo), p(lo, hi), p(hi, hi), p(hi, lo)])
    }

    #[test]
    fn finds_nearest_outline_vertex() {
        let outline = vec![square(0.0, 10.0)];
        let info = NearestVertex::new(p(9.5, 10.2))
            .with_outline(&outline)
            .execute()
            .unwrap();
        assert_eq!(info.group, PathGroup::Outline);
        assert_eq!((info.path, info.vertex), (0, 2));
        assert_eq!((info.prev, info.next), (1, 3));
        assert_relative_eq!(info.prev_length, 10.0);
        assert_relative_eq!(info.next_length, 10.0);
        assert_relative_eq!(info.angle, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn searches_shells_too() {
        let outline = vec![square(0.0, 10.0)];
        let shell = vec![square(1.0, 9.0)];
        let info = NearestVertex::new(p(1.1, 1.1))
            .with_outline(&outline)
            .with_shell(0, &shell)
            .execute()
            .unwrap();
        assert_eq!(info.group, PathGroup::Shell(0));
        assert_eq!(info.vertex, 0);
    }

    #[test]
    fn bisector_tip_breaks_ties() {
        // Two blocks touching at the origin, bisectors pointing apart.
        let upper = vec![square(0.0, 10.0)];
        let lower = vec![square(-5.0, 0.0)];

        let info = NearestVertex::new(p(0.3, 0.3))
            .with_outline(&lower)
            .with_shell(0, &upper)
            .execute()
            .unwrap();
        assert_eq!(info.group, PathGroup::Shell(0));
        assert_eq!(info.vertex, 0);

        let info = NearestVertex::new(p(-0.3, -0.3))
            .with_outline(&lower)
            .with_shell(0, &upper)
            .execute()
            .unwrap();
        assert_eq!(info.group, PathGroup::Outline);
        assert_eq!(info.vertex, 2);
    }

    #[test]
    fn pick_radius_limits_tie_break() {
        let near = vec![square(0.0, 10.0)];
        let hole = vec![Path::from_points(&[
            p(0.3, 0.3),
            p(5.0, 0.3),
            p(5.0, 5.0),
            p(0.3, 5.0),
        ])];
        // Nearest to the block corner, but the hole corner's tip is closer.
        let probe = p(-0.1, -0.1);
        let picked = NearestVertex::new(probe)
            .with_outline(&hole)
            .with_shell(0, &near)
            .with_pick_radius(0.0)
            .execute()
            .unwrap();
        assert_eq!(picked.group, PathGroup::Shell(0));

        let wide = NearestVertex::new(probe)
            .with_outline(&hole)
            .with_shell(0, &near)
            .with_pick_radius(1.0)
            .execute()
            .unwrap();
        assert_eq!(wide.group, PathGroup::Outline);
        assert_eq!(wide.vertex, 0);
    }

    #[test]
    fn empty_probe_is_none() {
        assert!(NearestVertex::new(p(0.0, 0.0)).execute().is_none());
    }
}
