use std::collections::BTreeMap;

use crate::math::intersect_2d::{point_at, position_along};
use crate::math::{Point2, Vector2};

/// A vertex of a layer outline: path index and vertex index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexRef {
    pub path: usize,
    pub vertex: usize,
}

/// An outline edge, named by the path and the index of its start vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallRef {
    pub path: usize,
    pub edge: usize,
}

/// Where a motorcycle's ray first meets an outline edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    pub wall: WallRef,
    pub point: Point2,
    /// Normalised position along the wall, `0` at its start vertex.
    pub position: f64,
}

/// Lifecycle of a motorcycle.
///
/// `Launched` motorcycles become `WallBound` once a wall lies ahead of them.
/// Trail resolution may turn any of them `TrailBound`, which settles into
/// `CrashedIntoTrail`; the wall-bound ones that survive end `CrashedAtWall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorcycleState {
    Launched,
    WallBound,
    TrailBound { owner: usize },
    CrashedAtWall,
    CrashedIntoTrail { owner: usize },
}

/// Another motorcycle ending on this one's trail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailCrash {
    /// Index of the motorcycle that crashed.
    pub crasher: usize,
    /// When the crasher reached the trail.
    pub time: f64,
    /// When the trail owner itself passed the crash point.
    pub owner_time: f64,
    pub point: Point2,
}

/// A motorcycle registered on the wall it crashed into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallArrival {
    pub motorcycle: usize,
    pub point: Point2,
    pub position: f64,
    pub time: f64,
}

/// A ray launched from a reflex vertex along its bisector.
#[derive(Debug, Clone, PartialEq)]
pub struct Motorcycle {
    pub(crate) vertex: VertexRef,
    pub(crate) origin: Point2,
    pub(crate) velocity: Vector2,
    pub(crate) initial_crash_time: f64,
    pub(crate) crash_time: f64,
    pub(crate) crash_point: Point2,
    pub(crate) wall: Option<WallHit>,
    pub(crate) state: MotorcycleState,
    pub(crate) trail_crashes: Vec<TrailCrash>,
}

impl Motorcycle {
    /// Launches a motorcycle that crashes at `max_time` unless something stops it sooner.
    pub(crate) fn launch(vertex: VertexRef, origin: Point2, velocity: Vector2, max_time: f64) -> Self {
        Self {
            vertex,
            origin,
            velocity,
            initial_crash_time: max_time,
            crash_time: max_time,
            crash_point: point_at(&origin, &velocity, max_time),
            wall: None,
            state: MotorcycleState::Launched,
            trail_crashes: Vec::new(),
        }
    }

    /// The reflex vertex this motorcycle launched from.
    #[must_use]
    pub fn vertex(&self) -> VertexRef {
        self.vertex
    }

    /// Returns the launch point.
    #[must_use]
    pub fn origin(&self) -> Point2 {
        self.origin
    }

    /// Returns the velocity, equal to the launch vertex's bisector.
    #[must_use]
    pub fn velocity(&self) -> Vector2 {
        self.velocity
    }

    /// Crash time found against the walls, before trail resolution.
    #[must_use]
    pub fn initial_crash_time(&self) -> f64 {
        self.initial_crash_time
    }

    /// Returns the resolved crash time.
    #[must_use]
    pub fn crash_time(&self) -> f64 {
        self.crash_time
    }

    /// Returns the point where the motorcycle stops.
    #[must_use]
    pub fn crash_point(&self) -> Point2 {
        self.crash_point
    }

    /// Returns the wall hit, or `None` if the motorcycle ended on a trail.
    #[must_use]
    pub fn wall(&self) -> Option<&WallHit> {
        self.wall.as_ref()
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> MotorcycleState {
        self.state
    }

    /// Crashes absorbed by this motorcycle's trail, in resolution order.
    #[must_use]
    pub fn trail_crashes(&self) -> &[TrailCrash] {
        &self.trail_crashes
    }

    /// Returns the position at `time` on the unbounded ray.
    #[must_use]
    pub fn position_at(&self, time: f64) -> Point2 {
        point_at(&self.origin, &self.velocity, time)
    }

    /// Time at which this motorcycle passes the foot of `p` on its path.
    #[must_use]
    pub fn arrival_time(&self, p: &Point2) -> f64 {
        position_along(&self.velocity, &(p - self.origin))
    }
}

/// Motorcycles of one layer with their resolved crashes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotorcycleGraph {
    pub(crate) motorcycles: Vec<Motorcycle>,
    pub(crate) wall_arrivals: BTreeMap<WallRef, Vec<WallArrival>>,
}

impl MotorcycleGraph {
    /// Returns every motorcycle in launch order.
    #[must_use]
    pub fn motorcycles(&self) -> &[Motorcycle] {
        &self.motorcycles
    }

    /// Returns the motorcycle at `index`.
    #[must_use]
    pub fn motorcycle(&self, index: usize) -> Option<&Motorcycle> {
        self.motorcycles.get(index)
    }

    /// Returns the number of motorcycles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.motorcycles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.motorcycles.is_empty()
    }

    /// Wall arrivals per edge, each list ordered along the edge.
    #[must_use]
    pub fn wall_arrivals(&self) -> &BTreeMap<WallRef, Vec<WallArrival>> {
        &self.wall_arrivals
    }

    /// Returns the arrivals on `wall`, ordered along it.
    #[must_use]
    pub fn arrivals_on(&self, wall: WallRef) -> &[WallArrival] {
        self.wall_arrivals.get(&wall).map_or(&[], Vec::as_slice)
    }

    /// Index of the motorcycle launched from `vertex`, if that vertex is reflex.
    #[must_use]
    pub fn launched_from(&self, vertex: VertexRef) -> Option<usize> {
        self.motorcycles.iter().position(|m| m.vertex == vertex)
    }
}
