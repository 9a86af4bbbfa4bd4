use tracing::{debug, trace, warn};

use crate::error::SkeletonError;
use crate::math::intersect_2d::{ray_segment_intersect_2d, segment_segment_intersect_2d};
use crate::topology::Path;

use super::graph::{
    Motorcycle, MotorcycleGraph, MotorcycleState, TrailCrash, VertexRef, WallArrival, WallHit,
    WallRef,
};
use super::queue::EventQueue;

/// Crashes closer to the launch point than this are ignored.
const MIN_CRASH_TIME: f64 = 1e-4;

/// Candidate crash of `crasher` into the trail of `owner`.
#[derive(Debug, Clone, Copy)]
struct TrailCandidate {
    crasher: usize,
    owner: usize,
    point: crate::math::Point2,
}

/// Builds the motorcycle graph of a layer outline.
///
/// # Algorithm
///
/// 1. Launch one motorcycle per reflex vertex along its bisector and find
///    the first outline edge its ray meets, ignoring the two edges at the
///    launch vertex.
/// 2. Intersect every pair of trails. Whichever motorcycle reaches the
///    crossing later is a candidate crash into the other's trail, queued at
///    its own arrival time.
/// 3. Resolve the queue one time bucket at a time. Each candidate is checked
///    against the state before the bucket: the crasher must still be moving
///    and the owner must reach the crossing before its own crash. If a
///    motorcycle has several valid candidates in one bucket the first queued
///    wins.
/// 4. Register the motorcycles that reached a wall on that wall, ordered
///    along it.
#[derive(Debug)]
pub struct MotorcycleBuilder<'a> {
    outline: &'a [Path],
    max_time: f64,
}

impl<'a> MotorcycleBuilder<'a> {
    /// `max_time` bounds every crash time; the XY diagonal of the model's
    /// bounding box is always enough.
    #[must_use]
    pub fn new(outline: &'a [Path], max_time: f64) -> Self {
        Self { outline, max_time }
    }

    /// Executes the construction.
    ///
    /// # Errors
    ///
    /// Returns [`SkeletonError::InvalidTime`] if a crash time is not finite.
    pub fn execute(&self) -> Result<MotorcycleGraph, SkeletonError> {
        let mut motorcycles = self.launch();
        let mut queue = self.trail_candidates(&motorcycles)?;
        let crashes = resolve(&mut motorcycles, &mut queue)?;
        let graph = register(motorcycles);
        debug!(
            motorcycles = graph.len(),
            trail_crashes = crashes,
            walls = graph.wall_arrivals().len(),
            "built motorcycle graph"
        );
        Ok(graph)
    }

    fn launch(&self) -> Vec<Motorcycle> {
        let mut motorcycles = Vec::new();
        for (pi, path) in self.outline.iter().enumerate() {
            for (vi, v) in path.reflex_vertices() {
                let vertex = VertexRef {
                    path: pi,
                    vertex: vi,
                };
                let mut m = Motorcycle::launch(vertex, v.position, v.bisector, self.max_time);
                m.wall = self.first_wall(&m, path.prev_index(vi));
                if let Some(hit) = m.wall {
                    m.crash_point = hit.point;
                    m.crash_time = m.arrival_time(&hit.point);
                    m.initial_crash_time = m.crash_time;
                    m.state = MotorcycleState::WallBound;
                }
                trace!(path = pi, vertex = vi, crash_time = m.crash_time, "launched");
                motorcycles.push(m);
            }
        }
        motorcycles
    }

    /// Nearest wall ahead of `m`, skipping the edges that meet at its vertex.
    fn first_wall(&self, m: &Motorcycle, prev_edge: usize) -> Option<WallHit> {
        let mut best: Option<(f64, WallHit)> = None;
        for (pi, path) in self.outline.iter().enumerate() {
            for (ei, p0, p1) in path.edges() {
                if pi == m.vertex.path && (ei == m.vertex.vertex || ei == prev_edge) {
                    continue;
                }
                let limit = best.map_or(m.crash_time, |(t, _)| t);
                let Some((t, u)) =
                    ray_segment_intersect_2d(&m.origin, &m.velocity, &p0, &p1, MIN_CRASH_TIME)
                else {
                    continue;
                };
                if t < limit {
                    let hit = WallHit {
                        wall: WallRef { path: pi, edge: ei },
                        point: p0 + (p1 - p0) * u,
                        position: u,
                    };
                    best = Some((t, hit));
                }
            }
        }
        best.map(|(_, hit)| hit)
    }

    fn trail_candidates(
        &self,
        motorcycles: &[Motorcycle],
    ) -> Result<EventQueue<TrailCandidate>, SkeletonError> {
        let mut queue = EventQueue::new();
        for i in 0..motorcycles.len() {
            for j in i + 1..motorcycles.len() {
                let (mi, mj) = (&motorcycles[i], &motorcycles[j]);
                let Some((point, _, _)) = segment_segment_intersect_2d(
                    &mi.origin,
                    &mi.crash_point,
                    &mj.origin,
                    &mj.crash_point,
                ) else {
                    continue;
                };
                let ti = mi.arrival_time(&point);
                let tj = mj.arrival_time(&point);
                if ti <= tj {
                    queue.push(tj, TrailCandidate { crasher: j, owner: i, point })?;
                }
                if tj <= ti {
                    queue.push(ti, TrailCandidate { crasher: i, owner: j, point })?;
                }
            }
        }
        Ok(queue)
    }
}

/// Settles trail crashes bucket by bucket; returns how many were accepted.
fn resolve(
    motorcycles: &mut [Motorcycle],
    queue: &mut EventQueue<TrailCandidate>,
) -> Result<usize, SkeletonError> {
    let mut total = 0;
    while let Some((time, bucket)) = queue.pop_bucket() {
        if !time.is_finite() {
            return Err(SkeletonError::InvalidTime(time));
        }
        let mut accepted = Vec::new();
        for c in bucket {
            let crasher = &motorcycles[c.crasher];
            if crasher.crash_time <= time
                || matches!(crasher.state, MotorcycleState::TrailBound { .. })
            {
                continue;
            }
            let owner = &motorcycles[c.owner];
            let owner_time = owner.arrival_time(&c.point);
            if owner_time >= owner.crash_time {
                continue;
            }
            motorcycles[c.crasher].state = MotorcycleState::TrailBound { owner: c.owner };
            accepted.push((c, owner_time));
        }

        for (c, owner_time) in accepted {
            let m = &mut motorcycles[c.crasher];
            debug_assert!(time <= m.crash_time, "crash time may only decrease");
            m.crash_time = time;
            m.crash_point = c.point;
            m.wall = None;
            m.state = MotorcycleState::CrashedIntoTrail { owner: c.owner };
            motorcycles[c.owner].trail_crashes.push(TrailCrash {
                crasher: c.crasher,
                time,
                owner_time,
                point: c.point,
            });
            trace!(crasher = c.crasher, owner = c.owner, time, "trail crash");
            total += 1;
        }
    }
    Ok(total)
}

fn register(mut motorcycles: Vec<Motorcycle>) -> MotorcycleGraph {
    let mut graph = MotorcycleGraph::default();
    for (i, m) in motorcycles.iter_mut().enumerate() {
        match (m.state, m.wall) {
            (MotorcycleState::WallBound, Some(hit)) => {
                m.state = MotorcycleState::CrashedAtWall;
                graph.wall_arrivals.entry(hit.wall).or_default().push(WallArrival {
                    motorcycle: i,
                    point: hit.point,
                    position: hit.position,
                    time: m.crash_time,
                });
            }
            (MotorcycleState::Launched, _) => {
                warn!(motorcycle = i, "motorcycle never crashed");
            }
            _ => {}
        }
    }
    for arrivals in graph.wall_arrivals.values_mut() {
        arrivals.sort_by(|a, b| {
            a.position
                .total_cmp(&b.position)
                .then(a.motorcycle.cmp(&b.motorcycle))
        });
    }
    graph.motorcycles = motorcycles;
    graph
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Point2, Vector2};
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn build(rings: &[Vec<Point2>]) -> MotorcycleGraph {
        let paths: Vec<Path> = rings.iter().map(|r| Path::from_points(r)).collect();
        MotorcycleBuilder::new(&paths, 100.0).execute().unwrap()
    }

    fn l_shape() -> Vec<Point2> {
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
    fn square_launches_nothing() {
        let graph = build(&[vec![p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0)]]);
        assert!(graph.is_empty());
        assert!(graph.wall_arrivals().is_empty());
    }

    #[test]
    fn l_shape_launches_one_motorcycle_into_the_corner() {
        let graph = build(&[l_shape()]);
        assert_eq!(graph.len(), 1);
        let m = &graph.motorcycles()[0];
        assert_eq!(m.vertex(), VertexRef { path: 0, vertex: 3 });
        assert_relative_eq!(m.velocity().x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(m.velocity().y, -1.0, epsilon = 1e-12);

        // The ray along y = x leaves (5,5) and meets the outer corner at (0,0).
        assert_eq!(m.state(), MotorcycleState::CrashedAtWall);
        assert_relative_eq!(m.crash_time(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(m.crash_point().x, 0.0, epsilon = 1e-9);
        let arrivals: usize = graph.wall_arrivals().values().map(Vec::len).sum();
        assert_eq!(arrivals, 1);
    }

    /// Two notches cut from the top and bottom, offset so that each pair of
    /// rays crosses at different arrival times.
    fn staggered_notches() -> Vec<Point2> {
        vec![
            p(0.0, 0.0),
            p(0.0, 30.0),
            p(10.0, 30.0),
            p(10.0, 20.0),
            p(20.0, 20.0),
            p(20.0, 30.0),
            p(30.0, 30.0),
            p(30.0, 0.0),
            p(22.0, 0.0),
            p(22.0, 8.0),
            p(12.0, 8.0),
            p(12.0, 0.0),
        ]
    }

    #[test]
    fn later_arrival_crashes_into_earlier_trail() {
        let graph = build(&[staggered_notches()]);
        assert_eq!(graph.len(), 4);
        let m = graph.motorcycles();

        // (12,8) reaches (5,15) at t = 7, after (10,20) passed it at t = 5.
        assert_eq!(m[3].state(), MotorcycleState::CrashedIntoTrail { owner: 0 });
        assert_relative_eq!(m[3].crash_time(), 7.0, epsilon = 1e-9);
        assert_eq!(m[0].state(), MotorcycleState::CrashedAtWall);
        let crash = m[0].trail_crashes()[0];
        assert_eq!(crash.crasher, 3);
        assert_relative_eq!(crash.owner_time, 5.0, epsilon = 1e-9);
        assert_relative_eq!(crash.point.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(crash.point.y, 15.0, epsilon = 1e-9);

        // Mirror image on the right: (20,20) hits the trail of (22,8).
        assert_eq!(m[1].state(), MotorcycleState::CrashedIntoTrail { owner: 2 });
        assert_eq!(m[2].trail_crashes().len(), 1);

        let arrivals: usize = graph.wall_arrivals().values().map(Vec::len).sum();
        assert_eq!(arrivals, 2);
    }

    #[test]
    fn crash_times_only_decrease() {
        let graph = build(&[staggered_notches()]);
        for m in graph.motorcycles() {
            assert!(m.crash_time() <= m.initial_crash_time());
            assert!(m.crash_time() > 0.0);
        }
    }

    #[test]
    fn head_on_trails_crash_into_each_other() {
        let ring = vec![
            p(0.0, 0.0),
            p(0.0, 30.0),
            p(10.0, 30.0),
            p(10.0, 20.0),
            p(20.0, 20.0),
            p(20.0, 30.0),
            p(30.0, 30.0),
            p(30.0, 0.0),
            p(20.0, 0.0),
            p(20.0, 10.0),
            p(10.0, 10.0),
            p(10.0, 0.0),
        ];
        let graph = build(&[ring]);
        assert_eq!(graph.len(), 4);
        for m in graph.motorcycles() {
            assert!(matches!(m.state(), MotorcycleState::CrashedIntoTrail { .. }));
            assert_relative_eq!(m.crash_time(), 5.0, epsilon = 1e-9);
            assert_eq!(m.trail_crashes().len(), 1);
        }
        assert!(graph.wall_arrivals().is_empty());
    }

    #[test]
    fn hole_corners_hit_the_outer_boundary() {
        let outer = vec![p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0)];
        let hole = vec![p(4.0, 4.0), p(6.0, 4.0), p(6.0, 6.0), p(4.0, 6.0)];
        let graph = build(&[outer, hole]);
        assert_eq!(graph.len(), 4);
        for m in graph.motorcycles() {
            assert_eq!(m.vertex().path, 1);
            assert_relative_eq!(m.crash_time(), 4.0, epsilon = 1e-9);
            assert_eq!(m.wall().map(|w| w.wall.path), Some(0));
        }
    }

    /// A motorcycle whose wall lies at `t = 10`.
    fn wall_bound(vertex: usize, origin: Point2, velocity: Vector2) -> Motorcycle {
        let mut m = Motorcycle::launch(VertexRef { path: 0, vertex }, origin, velocity, 10.0);
        m.state = MotorcycleState::WallBound;
        m
    }

    #[test]
    fn shortened_trail_rejects_later_candidate() {
        // 0 runs into the trail of 1 at (3,0), one time unit after 1 passed.
        // 2 would reach the trail of 0 at (6,0) at t = 8, but 0 stops at 3.
        let mut motorcycles = vec![
            wall_bound(0, p(0.0, 0.0), Vector2::new(1.0, 0.0)),
            wall_bound(1, p(3.0, -1.0), Vector2::new(0.0, 1.0)),
            wall_bound(2, p(6.0, -8.0), Vector2::new(0.0, 1.0)),
        ];
        let mut queue = MotorcycleBuilder::new(&[], 10.0)
            .trail_candidates(&motorcycles)
            .unwrap();
        assert_eq!(queue.len(), 2);

        let accepted = resolve(&mut motorcycles, &mut queue).unwrap();
        assert_eq!(accepted, 1);
        assert_eq!(motorcycles[0].state(), MotorcycleState::CrashedIntoTrail { owner: 1 });
        assert_relative_eq!(motorcycles[0].crash_time(), 3.0, epsilon = 1e-12);
        assert!(motorcycles[0].trail_crashes().is_empty());
        assert_eq!(motorcycles[1].trail_crashes().len(), 1);
        assert_eq!(motorcycles[2].state(), MotorcycleState::WallBound);
        assert_relative_eq!(motorcycles[2].crash_time(), 10.0);
    }

    #[test]
    fn first_queued_candidate_wins_its_bucket() {
        // 1 and 2 both pass (5,0) at t = 1; 0 gets there at t = 5.
        for (first, second) in [(1, 2), (2, 1)] {
            let mut motorcycles = vec![
                wall_bound(0, p(0.0, 0.0), Vector2::new(1.0, 0.0)),
                wall_bound(1, p(5.0, -1.0), Vector2::new(0.0, 1.0)),
                wall_bound(2, p(4.0, -1.0), Vector2::new(1.0, 1.0)),
            ];
            let mut queue = EventQueue::new();
            for owner in [first, second] {
                let candidate = TrailCandidate {
                    crasher: 0,
                    owner,
                    point: p(5.0, 0.0),
                };
                queue.push(5.0, candidate).unwrap();
            }

            let accepted = resolve(&mut motorcycles, &mut queue).unwrap();
            assert_eq!(accepted, 1);
            assert_eq!(
                motorcycles[0].state(),
                MotorcycleState::CrashedIntoTrail { owner: first }
            );
            assert_relative_eq!(motorcycles[0].crash_time(), 5.0);
            let crash = motorcycles[first].trail_crashes()[0];
            assert_eq!(crash.crasher, 0);
            assert_relative_eq!(crash.owner_time, 1.0, epsilon = 1e-12);
            assert!(motorcycles[second].trail_crashes().is_empty());
        }
    }
}
