use std::f64::consts::PI;

use tracing::{debug, trace};

use crate::error::SkeletonError;
use crate::math::intersect_2d::{closest_approach_2d, cross_2d};
use crate::math::polygon_2d::{
    bisector, is_spike, right_normal, segment_direction, turn_angle, turn_cross,
};
use crate::math::{points_coincide, Point2, Vector2, POINT_TOLERANCE, TOLERANCE};
use crate::operations::motorcycle::{EventQueue, MotorcycleGraph, VertexRef, WallRef};
use crate::topology::{Path, RingStore, RingVertexId};

/// Two moving vertices closer than this are taken to meet.
const MEET_TOLERANCE: f64 = 1e-6;

/// Slack allowed when comparing event times.
const TIME_EPSILON: f64 = 1e-9;

/// A vertex of the shrinking outline.
#[derive(Debug, Clone)]
struct Node {
    /// Position at `start_time`.
    origin: Point2,
    start_time: f64,
    velocity: Vector2,
    /// Unit direction of the edge leaving this vertex.
    out_dir: Vector2,
    version: u32,
    deleted: bool,
}

impl Node {
    fn new(origin: Point2, start_time: f64, velocity: Vector2, out_dir: Vector2) -> Self {
        Self {
            origin,
            start_time,
            velocity,
            out_dir,
            version: 0,
            deleted: false,
        }
    }

    fn position_at(&self, time: f64) -> Point2 {
        self.origin + self.velocity * (time - self.start_time)
    }

    /// Where the vertex would have been at time zero on its current motion.
    fn origin_at_zero(&self) -> Point2 {
        self.origin - self.velocity * self.start_time
    }
}

/// A node id together with the motion version an event was computed from.
#[derive(Debug, Clone, Copy)]
struct Stamp {
    id: RingVertexId,
    version: u32,
}

#[derive(Debug, Clone, Copy)]
struct PendingStart {
    owner: Stamp,
    crasher: RingVertexId,
    point: Point2,
    before: bool,
    velocity: Vector2,
    out_dir: Vector2,
}

#[derive(Debug, Clone, Copy)]
enum ShellEvent {
    /// The edge from `a` to `b` shrinks to a point.
    Collapse { a: Stamp, b: Stamp },
    /// A reflex vertex reaches the vertex travelling back along its trail.
    Split { reflex: Stamp, split: Stamp },
    /// A trail owner passes the point where another motorcycle crashed.
    Start(PendingStart),
}

/// Velocity that moves along `dir` while keeping pace with an edge whose
/// inward normal is `normal`, or `None` if `dir` does not move inward.
fn offset_velocity(dir: &Vector2, normal: &Vector2) -> Option<Vector2> {
    let speed = normal.dot(dir);
    (speed > TOLERANCE).then(|| dir / speed)
}

/// Offsets a layer outline inward by a fixed distance.
///
/// # Algorithm
///
/// Every outline ring is copied into one arena of moving vertices. Wall
/// arrivals of the motorcycle graph become extra vertices on their wall,
/// travelling back along the motorcycle trail. Events are then processed in
/// time order up to the offset:
///
/// - **Collapse**: an edge shrinks to a point; its end vertex is dropped and
///   the start vertex continues along a new bisector.
/// - **Split**: a reflex vertex meets the vertex coming back along its trail;
///   the two exchange successors, cutting the ring in two or joining a hole
///   to its outer ring.
/// - **Start**: a trail owner passes a trail crash; a vertex is spliced next
///   to it that travels back along the crashed motorcycle's trail.
///
/// After every event a vertex whose edges fold back onto each other (two
/// opposite edges meeting) is removed together with the overlap.
///
/// Survivors are finally moved to the offset and read out ring by ring.
#[derive(Debug)]
pub struct ShellBuilder<'a> {
    outline: &'a [Path],
    graph: &'a MotorcycleGraph,
    offset: f64,
}

impl<'a> ShellBuilder<'a> {
    /// Creates a new shell builder for one offset distance.
    #[must_use]
    pub fn new(outline: &'a [Path], graph: &'a MotorcycleGraph, offset: f64) -> Self {
        Self {
            outline,
            graph,
            offset,
        }
    }

    /// Executes the offset.
    ///
    /// # Errors
    ///
    /// - [`SkeletonError::InvalidOffset`] for a negative or non-finite offset
    /// - [`SkeletonError::InvalidTopology`] if the graph does not match the
    ///   outline or the rings lose a vertex
    /// - [`SkeletonError::InvalidTime`] if an event time is not finite
    pub fn execute(&self) -> Result<Vec<Path>, SkeletonError> {
        if !(self.offset >= 0.0 && self.offset.is_finite()) {
            return Err(SkeletonError::InvalidOffset {
                offset: self.offset,
                max: f64::INFINITY,
            });
        }
        let mut sim = Simulation::new(self.outline, self.graph)?;
        let processed = sim.run(self.offset)?;
        let paths = sim.finish(self.offset)?;
        debug!(
            offset = self.offset,
            events = processed,
            paths = paths.len(),
            "built shell"
        );
        Ok(paths)
    }
}

enum Tag {
    Vertex(usize),
    Split(usize),
}

struct Simulation {
    ring: RingStore<Node>,
    queue: EventQueue<ShellEvent>,
    now: f64,
}

impl Simulation {
    fn new(outline: &[Path], graph: &MotorcycleGraph) -> Result<Self, SkeletonError> {
        let mut sim = Self {
            ring: RingStore::new(),
            queue: EventQueue::new(),
            now: 0.0,
        };
        let mut reflex_nodes = vec![None; graph.len()];
        let mut split_nodes = vec![None; graph.len()];

        for (pi, path) in outline.iter().enumerate() {
            let mut nodes = Vec::new();
            let mut tags = Vec::new();
            for (vi, v) in path.vertices().iter().enumerate() {
                let next = path.vertices()[path.next_index(vi)].position;
                let out_dir =
                    segment_direction(&v.position, &next).unwrap_or_else(Vector2::zeros);
                nodes.push(Node::new(v.position, 0.0, v.bisector, out_dir));
                tags.push(Tag::Vertex(vi));

                let normal = right_normal(&out_dir);
                for arrival in graph.arrivals_on(WallRef { path: pi, edge: vi }) {
                    let m = graph.motorcycle(arrival.motorcycle).ok_or_else(|| {
                        SkeletonError::InvalidTopology(format!(
                            "wall arrival names unknown motorcycle {}",
                            arrival.motorcycle
                        ))
                    })?;
                    let Some(w) = offset_velocity(&-m.velocity(), &normal) else {
                        trace!(motorcycle = arrival.motorcycle, "arrival runs along its wall");
                        continue;
                    };
                    nodes.push(Node::new(arrival.point, 0.0, w, out_dir));
                    tags.push(Tag::Split(arrival.motorcycle));
                }
            }

            let Some(first) = sim.ring.insert_ring(nodes) else {
                continue;
            };
            let ids: Vec<_> = sim.ring.cycle(first).collect();
            for (id, tag) in ids.into_iter().zip(tags) {
                match tag {
                    Tag::Vertex(vi) => {
                        if let Some(mi) = graph.launched_from(VertexRef {
                            path: pi,
                            vertex: vi,
                        }) {
                            reflex_nodes[mi] = Some(id);
                        }
                    }
                    Tag::Split(mi) => split_nodes[mi] = Some(id),
                }
            }
        }

        let ids: Vec<_> = sim.ring.ids().collect();
        for id in ids {
            sim.schedule_collapse(id)?;
        }
        for (reflex, split) in reflex_nodes.iter().zip(&split_nodes) {
            if let (Some(r), Some(s)) = (reflex, split) {
                sim.schedule_split(*r, *s)?;
            }
        }
        for (oi, owner) in graph.motorcycles().iter().enumerate() {
            for crash in owner.trail_crashes() {
                let (Some(ro), Some(rk)) = (reflex_nodes[oi], reflex_nodes[crash.crasher]) else {
                    continue;
                };
                let Some(crasher) = graph.motorcycle(crash.crasher) else {
                    continue;
                };
                let before = cross_2d(&owner.velocity(), &crasher.velocity()) > 0.0;
                let out_dir = if before {
                    sim.node(sim.ring.prev(ro)?)?.out_dir
                } else {
                    sim.node(ro)?.out_dir
                };
                let Some(velocity) = offset_velocity(&-crasher.velocity(), &right_normal(&out_dir))
                else {
                    trace!(owner = oi, crasher = crash.crasher, "crasher moves away from edge");
                    continue;
                };

                // The spliced vertex only matters if it exists before the
                // crasher's reflex vertex reaches it. This exact ordering
                // stands in for the "crash time below half the owner's crash
                // time" rule of thumb.
                let spliced = Node::new(crash.point, crash.owner_time, velocity, out_dir);
                let splits_after_start = meet_time(sim.node(rk)?, &spliced)
                    .is_some_and(|t| t > crash.owner_time + TIME_EPSILON);
                if !splits_after_start {
                    trace!(owner = oi, crasher = crash.crasher, "start preempted");
                    continue;
                }
                let pending = PendingStart {
                    owner: sim.stamp(ro)?,
                    crasher: rk,
                    point: crash.point,
                    before,
                    velocity,
                    out_dir,
                };
                sim.queue.push(crash.owner_time, ShellEvent::Start(pending))?;
            }
        }
        Ok(sim)
    }

    fn node(&self, id: RingVertexId) -> Result<&Node, SkeletonError> {
        self.ring.get(id)
    }

    fn node_mut(&mut self, id: RingVertexId) -> Result<&mut Node, SkeletonError> {
        self.ring.get_mut(id)
    }

    fn stamp(&self, id: RingVertexId) -> Result<Stamp, SkeletonError> {
        Ok(Stamp {
            id,
            version: self.node(id)?.version,
        })
    }

    fn is_current(&self, stamp: Stamp) -> bool {
        self.ring
            .get(stamp.id)
            .is_ok_and(|n| !n.deleted && n.version == stamp.version)
    }

    fn is_alive(&self, id: RingVertexId) -> bool {
        self.ring.get(id).is_ok_and(|n| !n.deleted)
    }

    /// Processes every event up to and including `offset`.
    fn run(&mut self, offset: f64) -> Result<usize, SkeletonError> {
        let mut processed = 0;
        while self.queue.peek_time().is_some_and(|t| t <= offset) {
            let Some((time, event)) = self.queue.pop() else {
                break;
            };
            self.now = time;
            match event {
                ShellEvent::Collapse { a, b } => self.collapse(a, b)?,
                ShellEvent::Split { reflex, split } => self.split(reflex, split)?,
                ShellEvent::Start(pending) => self.start(pending)?,
            }
            processed += 1;
        }
        Ok(processed)
    }

    /// Schedules the moment the edge leaving `a` shrinks to nothing.
    ///
    /// Both endpoints stay on the offset line of the edge, so its signed
    /// length along the edge direction changes linearly.
    fn schedule_collapse(&mut self, a: RingVertexId) -> Result<(), SkeletonError> {
        let b = self.ring.next(a)?;
        if a == b {
            return Ok(());
        }
        let (na, nb) = (self.node(a)?, self.node(b)?);
        let dir = na.out_dir;
        let length = (nb.position_at(self.now) - na.position_at(self.now)).dot(&dir);
        let rate = (nb.velocity - na.velocity).dot(&dir);
        if rate > -TOLERANCE {
            return Ok(());
        }
        let time = self.now - length / rate;
        let event = ShellEvent::Collapse {
            a: self.stamp(a)?,
            b: self.stamp(b)?,
        };
        self.queue.push(time.max(self.now), event)
    }

    fn schedule_split(&mut self, reflex: RingVertexId, split: RingVertexId) -> Result<(), SkeletonError> {
        let Some(time) = meet_time(self.node(reflex)?, self.node(split)?) else {
            trace!("split vertex never meets its reflex vertex");
            return Ok(());
        };
        if time < self.now - TIME_EPSILON {
            return Ok(());
        }
        let event = ShellEvent::Split {
            reflex: self.stamp(reflex)?,
            split: self.stamp(split)?,
        };
        self.queue.push(time.max(self.now), event)
    }

    /// Moves a node to `at` as of now and bumps its motion version.
    fn restart(&mut self, id: RingVertexId, at: Point2, out_dir: Vector2) -> Result<(), SkeletonError> {
        let now = self.now;
        let node = self.node_mut(id)?;
        node.origin = at;
        node.start_time = now;
        node.out_dir = out_dir;
        node.version += 1;
        Ok(())
    }

    fn refresh_bisector(&mut self, id: RingVertexId) -> Result<(), SkeletonError> {
        let in_dir = self.node(self.ring.prev(id)?)?.out_dir;
        let node = self.node_mut(id)?;
        node.velocity = bisector(&in_dir, &node.out_dir);
        Ok(())
    }

    /// Deletes the ring containing `id` if it has fewer than three vertices.
    fn prune_ring(&mut self, id: RingVertexId) -> Result<bool, SkeletonError> {
        if self.ring.ring_len(id) >= 3 {
            return Ok(false);
        }
        let members: Vec<_> = self.ring.cycle(id).collect();
        for m in members {
            self.node_mut(m)?.deleted = true;
        }
        trace!(time = self.now, "ring vanished");
        Ok(true)
    }

    /// Settles a vertex whose edges just changed.
    ///
    /// A convex vertex whose edges fold back onto each other marks two
    /// opposite edges that met. It is removed together with the shorter of
    /// the two overlapping edges, and the neighbour that inherits a new edge
    /// is settled in turn. The edges around the final vertex are rescheduled.
    fn settle(&mut self, mut id: RingVertexId) -> Result<(), SkeletonError> {
        loop {
            if self.prune_ring(id)? {
                return Ok(());
            }
            let prev = self.ring.prev(id)?;
            let next = self.ring.next(id)?;
            let in_dir = self.node(prev)?.out_dir;
            let out_dir = self.node(id)?.out_dir;
            let angle = turn_angle(&in_dir, &out_dir);
            if angle >= PI || !is_spike(angle) {
                return self.reschedule_around(id);
            }

            let here = self.node(id)?.position_at(self.now);
            let prev_at = self.node(prev)?.position_at(self.now);
            let next_at = self.node(next)?.position_at(self.now);
            let in_is_shorter = (here - prev_at).norm() <= (next_at - here).norm();

            self.ring.detach(id)?;
            self.node_mut(id)?.deleted = true;
            let prev_out = if in_is_shorter { out_dir } else { in_dir };
            let next_out = self.node(next)?.out_dir;
            self.restart(prev, prev_at, prev_out)?;
            self.restart(next, next_at, next_out)?;
            self.refresh_bisector(prev)?;
            self.refresh_bisector(next)?;
            trace!(time = self.now, "folded edges removed");

            if in_is_shorter {
                self.schedule_collapse(next)?;
                id = prev;
            } else {
                let before = self.ring.prev(prev)?;
                self.schedule_collapse(before)?;
                id = next;
            }
        }
    }

    fn reschedule_around(&mut self, id: RingVertexId) -> Result<(), SkeletonError> {
        let prev = self.ring.prev(id)?;
        self.schedule_collapse(prev)?;
        self.schedule_collapse(id)
    }

    fn collapse(&mut self, a: Stamp, b: Stamp) -> Result<(), SkeletonError> {
        if !self.is_current(a) || !self.is_current(b) || self.ring.next(a.id)? != b.id {
            return Ok(());
        }
        let pa = self.node(a.id)?.position_at(self.now);
        let pb = self.node(b.id)?.position_at(self.now);
        let out_dir = self.node(b.id)?.out_dir;

        self.ring.detach(b.id)?;
        self.node_mut(b.id)?.deleted = true;
        self.restart(a.id, nalgebra::center(&pa, &pb), out_dir)?;
        self.refresh_bisector(a.id)?;
        trace!(time = self.now, "edge collapsed");
        self.settle(a.id)
    }

    fn split(&mut self, reflex: Stamp, split: Stamp) -> Result<(), SkeletonError> {
        if !self.is_current(reflex) || !self.is_current(split) || reflex.id == split.id {
            return Ok(());
        }
        let (r, s) = (reflex.id, split.id);
        // Neighbours meet through their shared edge instead.
        if self.ring.next(r)? == s || self.ring.prev(r)? == s {
            return Ok(());
        }
        let at = nalgebra::center(
            &self.node(r)?.position_at(self.now),
            &self.node(s)?.position_at(self.now),
        );
        let r_out = self.node(r)?.out_dir;
        let s_out = self.node(s)?.out_dir;

        self.ring.swap_next(r, s)?;
        self.restart(r, at, s_out)?;
        self.restart(s, at, r_out)?;
        self.refresh_bisector(r)?;
        self.refresh_bisector(s)?;
        trace!(time = self.now, "ring split");

        self.settle(r)?;
        self.settle(s)
    }

    fn start(&mut self, pending: PendingStart) -> Result<(), SkeletonError> {
        if !self.is_current(pending.owner) {
            trace!(time = self.now, "stale start");
            return Ok(());
        }
        let node = Node::new(pending.point, self.now, pending.velocity, pending.out_dir);
        let id = if pending.before {
            self.ring.insert_before(pending.owner.id, node)?
        } else {
            self.ring.insert_after(pending.owner.id, node)?
        };
        trace!(time = self.now, "trail vertex started");

        self.reschedule_around(id)?;
        if self.is_alive(pending.crasher) {
            self.schedule_split(pending.crasher, id)?;
        }
        Ok(())
    }

    /// Moves every surviving vertex to `offset` and reads out the rings.
    fn finish(mut self, offset: f64) -> Result<Vec<Path>, SkeletonError> {
        let dead: Vec<_> = self
            .ring
            .ids()
            .filter(|&id| self.ring.get(id).is_ok_and(|n| n.deleted))
            .collect();
        for id in dead {
            self.ring.remove(id)?;
        }

        let mut paths = Vec::new();
        for start in self.ring.ring_starts() {
            let points = self
                .ring
                .cycle(start)
                .map(|id| self.node(id).map(|n| n.position_at(offset)))
                .collect::<Result<Vec<_>, _>>()?;
            let cleaned = clean_ring(&points);
            if cleaned.len() >= 3 {
                paths.push(Path::from_points(&cleaned));
            }
        }
        Ok(paths)
    }
}

/// Earliest time two nodes occupy the same point, if they ever do.
fn meet_time(a: &Node, b: &Node) -> Option<f64> {
    let (t, gap) =
        closest_approach_2d(&a.origin_at_zero(), &a.velocity, &b.origin_at_zero(), &b.velocity)?;
    let earliest = a.start_time.max(b.start_time);
    (gap <= MEET_TOLERANCE && t >= earliest - TIME_EPSILON).then(|| t.max(earliest))
}

/// Drops coincident and collinear vertices.
fn clean_ring(points: &[Point2]) -> Vec<Point2> {
    let mut deduped: Vec<Point2> = Vec::with_capacity(points.len());
    for &pt in points {
        if deduped
            .last()
            .is_some_and(|last| points_coincide(last, &pt, POINT_TOLERANCE))
        {
            continue;
        }
        deduped.push(pt);
    }
    while deduped.len() > 1
        && points_coincide(&deduped[0], &deduped[deduped.len() - 1], POINT_TOLERANCE)
    {
        deduped.pop();
    }
    if deduped.len() < 3 {
        return deduped;
    }

    let n = deduped.len();
    (0..n)
        .filter(|&i| {
            let prev = deduped[(i + n - 1) % n];
            let next = deduped[(i + 1) % n];
            turn_cross(&prev, &deduped[i], &next).abs() >= TOLERANCE
        })
        .map(|i| deduped[i])
        .collect()
}
