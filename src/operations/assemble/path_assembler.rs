use std::collections::VecDeque;
use std::f64::consts::TAU;

use tracing::{debug, trace};

use crate::error::SkeletonError;
use crate::math::polygon_2d::{is_spike, is_straight, turn_angle};
use crate::math::{points_coincide, Point2, ANGLE_EPSILON, POINT_TOLERANCE, TOLERANCE};
use crate::operations::slice::OrientedSegment;
use crate::topology::{Path, RingStore};

/// Closed contours recovered from a segment bag.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub paths: Vec<Path>,
    /// Segments that could not be walked into a closed ring.
    pub remaining: usize,
}

impl Assembly {
    /// Returns `true` when every segment ended up on a closed contour.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.remaining == 0
    }
}

/// Walks a bag of oriented segments into closed contours.
///
/// # Algorithm
///
/// 1. Seed a walk with the first unused segment.
/// 2. Follow the segment whose start coincides with the current end point,
///    dropping points closer than `min_length` to their predecessor, until
///    the walk returns to its first point.
/// 3. Simplify the closed ring: repeatedly remove near-straight vertices and
///    reversals, revisiting the neighbours of every removed vertex.
/// 4. Discard rings left with fewer than three vertices.
///
/// Walks that cannot be closed leave their segments counted in
/// [`Assembly::remaining`].
#[derive(Debug)]
pub struct PathAssembler<'a> {
    segments: &'a [OrientedSegment],
    min_length: f64,
    collinear_tolerance: f64,
}

impl<'a> PathAssembler<'a> {
    /// Creates a new assembler over a bag of segments.
    #[must_use]
    pub fn new(segments: &'a [OrientedSegment], min_length: f64, collinear_tolerance: f64) -> Self {
        Self {
            segments,
            min_length,
            collinear_tolerance,
        }
    }

    /// Executes the assembly.
    ///
    /// # Errors
    ///
    /// Returns [`SkeletonError::InvalidTopology`] if the simplification ring
    /// loses track of a vertex; this indicates a bug rather than bad input.
    pub fn execute(&self) -> Result<Assembly, SkeletonError> {
        let index = StartIndex::new(self.segments);
        let mut used = vec![false; self.segments.len()];
        let mut assembly = Assembly::default();

        while let Some(seed) = used.iter().position(|u| !u) {
            used[seed] = true;
            let first = self.segments[seed].start;
            let mut points = vec![first];
            let mut cursor = self.segments[seed].end;
            let mut walked = 1;
            let mut closed = false;

            while let Some(next) = index.find(&cursor, &used) {
                used[next] = true;
                walked += 1;
                let seg = &self.segments[next];
                let last = points.last().copied().unwrap_or(first);
                if !points_coincide(&last, &seg.start, self.min_length) {
                    points.push(seg.start);
                }
                cursor = seg.end;
                if points_coincide(&cursor, &first, POINT_TOLERANCE) {
                    closed = true;
                    break;
                }
            }

            if !closed {
                trace!(walked, "open walk");
                assembly.remaining += walked;
                continue;
            }

            while points.len() > 1
                && points
                    .last()
                    .is_some_and(|p| points_coincide(p, &first, self.min_length))
            {
                points.pop();
            }
            if points.len() < 3 {
                debug!(points = points.len(), "discarding closed path");
                continue;
            }
            match self.simplify(points)? {
                Some(ring) => assembly.paths.push(Path::from_points(&ring)),
                None => debug!("discarding path collapsed by simplification"),
            }
        }

        debug!(
            segments = self.segments.len(),
            paths = assembly.paths.len(),
            remaining = assembly.remaining,
            "assembled contours"
        );
        Ok(assembly)
    }

    /// Removes straight-through and doubling-back vertices until none remain.
    fn simplify(&self, points: Vec<Point2>) -> Result<Option<Vec<Point2>>, SkeletonError> {
        let mut ring = RingStore::new();
        let Some(mut anchor) = ring.insert_ring(points) else {
            return Ok(None);
        };
        let mut pending: VecDeque<_> = ring.ids().collect();

        while let Some(id) = pending.pop_front() {
            if ring.len() < 3 {
                return Ok(None);
            }
            if !ring.contains(id) {
                continue;
            }
            let prev = ring.prev(id)?;
            let next = ring.next(id)?;
            let s0 = ring.get(id)? - ring.get(prev)?;
            let s1 = ring.get(next)? - ring.get(id)?;
            if s0.norm() >= TOLERANCE && s1.norm() >= TOLERANCE {
                let a = turn_angle(&s0, &s1);
                if !is_straight(a, self.collinear_tolerance)
                    && !is_reversal(a, self.collinear_tolerance)
                {
                    continue;
                }
            }
            ring.remove(id)?;
            if anchor == id {
                anchor = next;
            }
            pending.push_back(prev);
            pending.push_back(next);
        }

        if ring.len() < 3 {
            return Ok(None);
        }
        let points = ring
            .cycle(anchor)
            .map(|id| ring.get(id).copied())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(points))
    }
}

/// A vertex where the contour turns back on itself.
fn is_reversal(a: f64, tolerance: f64) -> bool {
    is_spike(a) || a.min(TAU - a) <= tolerance.max(ANGLE_EPSILON)
}

/// Segment indices sorted by start x, for coincident-point lookup.
struct StartIndex<'a> {
    segments: &'a [OrientedSegment],
    order: Vec<usize>,
}

impl<'a> StartIndex<'a> {
    fn new(segments: &'a [OrientedSegment]) -> Self {
        let mut order: Vec<usize> = (0..segments.len()).collect();
        order.sort_by(|&a, &b| segments[a].start.x.total_cmp(&segments[b].start.x));
        Self { segments, order }
    }

    /// First unused segment whose start coincides with `p`.
    fn find(&self, p: &Point2, used: &[bool]) -> Option<usize> {
        let lo = self
            .order
            .partition_point(|&i| self.segments[i].start.x < p.x - POINT_TOLERANCE);
        self.order[lo..]
            .iter()
            .take_while(|&&i| self.segments[i].start.x <= p.x + POINT_TOLERANCE)
            .copied()
            .find(|&i| !used[i] && points_coincide(&self.segments[i].start, p, POINT_TOLERANCE))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;
    use crate::math::Vector2;
    use crate::operations::slice::PlaneSlicer;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn seg(a: Point2, b: Point2) -> OrientedSegment {
        OrientedSegment {
            start: a,
            end: b,
            normal: Vector2::zeros(),
        }
    }

    fn ring_segments(points: &[Point2]) -> Vec<OrientedSegment> {
        (0..points.len())
            .map(|i| seg(points[i], points[(i + 1) % points.len()]))
            .collect()
    }

    fn assert_same_ring(actual: &[Point2], expected: &[Point2]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?}");
        let offset = actual
            .iter()
            .position(|q| points_coincide(q, &expected[0], 1e-6))
            .unwrap();
        for (i, e) in expected.iter().enumerate() {
            let a = actual[(i + offset) % actual.len()];
            assert!(points_coincide(&a, e, 1e-6), "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn square_prism_closes_into_one_square() {
        let outline = [p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)];
        let mesh = Mesh::prism(&outline, 0.0, 2.0);
        let segments = PlaneSlicer::new(mesh.triangles(), 1.0).execute();
        let assembly = PathAssembler::new(&segments, 0.01, 0.01).execute().unwrap();

        assert!(assembly.is_closed());
        assert_eq!(assembly.paths.len(), 1);
        let path = &assembly.paths[0];
        assert_eq!(path.len(), 4);
        for v in path.vertices() {
            assert_relative_eq!(v.angle, FRAC_PI_2, epsilon = 1e-9);
        }
        assert_eq!(path.reflex_vertices().count(), 0);
        assert_same_ring(
            &path.points(),
            &[p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0)],
        );
    }

    #[test]
    fn convex_prism_keeps_vertex_count_with_zero_tolerance() {
        let hexagon: Vec<Point2> = (0..6)
            .map(|i| {
                let t = f64::from(i) * TAU / 6.0;
                p(5.0 * t.cos(), 5.0 * t.sin())
            })
            .collect();
        let mesh = Mesh::prism(&hexagon, -1.0, 1.0);
        let segments = PlaneSlicer::new(mesh.triangles(), 0.0).execute();
        let assembly = PathAssembler::new(&segments, 0.0, 0.0).execute().unwrap();
        assert_eq!(assembly.paths.len(), 1);
        assert_eq!(assembly.paths[0].len(), 6);
        assert_relative_eq!(assembly.paths[0].angle_sum().abs(), TAU, epsilon = 1e-6);
    }

    #[test]
    fn shuffled_segments_still_close() {
        let ring = [p(0.0, 0.0), p(0.0, 4.0), p(3.0, 4.0), p(3.0, 0.0)];
        let mut segments = ring_segments(&ring);
        segments.swap(0, 2);
        segments.swap(1, 3);
        let assembly = PathAssembler::new(&segments, 0.01, 0.01).execute().unwrap();
        assert!(assembly.is_closed());
        assert_same_ring(&assembly.paths[0].points(), &ring);
    }

    #[test]
    fn collinear_runs_cascade_away() {
        let ring = [
            p(0.0, 0.0),
            p(0.0, 2.0),
            p(0.0, 4.0),
            p(2.0, 4.0),
            p(4.0, 4.0),
            p(4.0, 2.0),
            p(4.0, 0.0),
            p(2.0, 0.0),
        ];
        let assembly = PathAssembler::new(&ring_segments(&ring), 0.01, 0.01)
            .execute()
            .unwrap();
        assert_same_ring(
            &assembly.paths[0].points(),
            &[p(0.0, 0.0), p(0.0, 4.0), p(4.0, 4.0), p(4.0, 0.0)],
        );
    }

    #[test]
    fn short_segments_are_collapsed() {
        let ring = [
            p(0.0, 0.0),
            p(0.0, 4.0),
            p(0.001, 4.0),
            p(4.0, 4.0),
            p(4.0, 0.0),
        ];
        let assembly = PathAssembler::new(&ring_segments(&ring), 0.01, 0.01)
            .execute()
            .unwrap();
        assert_eq!(assembly.paths[0].len(), 4);
    }

    #[test]
    fn two_point_loop_is_discarded() {
        let segments = [seg(p(0.0, 0.0), p(1.0, 0.0)), seg(p(1.0, 0.0), p(0.0, 0.0))];
        let assembly = PathAssembler::new(&segments, 0.01, 0.01).execute().unwrap();
        assert!(assembly.paths.is_empty());
        assert!(assembly.is_closed());
    }

    #[test]
    fn gap_leaves_segments_remaining() {
        let segments = [
            seg(p(0.0, 0.0), p(0.0, 4.0)),
            seg(p(0.0, 4.0), p(4.0, 4.0)),
            seg(p(4.0, 4.0), p(4.0, 0.0)),
        ];
        let assembly = PathAssembler::new(&segments, 0.01, 0.01).execute().unwrap();
        assert!(!assembly.is_closed());
        assert_eq!(assembly.remaining, 3);
        assert!(assembly.paths.is_empty());
    }

    #[test]
    fn hole_and_outline_are_separate_paths() {
        let outer = [p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0)];
        let hole = [p(3.0, 3.0), p(7.0, 3.0), p(7.0, 7.0), p(3.0, 7.0)];
        let mut segments = ring_segments(&outer);
        segments.extend(ring_segments(&hole));
        let assembly = PathAssembler::new(&segments, 0.01, 0.01).execute().unwrap();
        assert_eq!(assembly.paths.len(), 2);
        assert!(assembly.paths[0].signed_area() < 0.0);
        assert!(assembly.paths[1].signed_area() > 0.0);
    }
}
