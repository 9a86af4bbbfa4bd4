mod builder;
mod graph;
mod queue;

pub use builder::MotorcycleBuilder;
pub use graph::{
    Motorcycle, MotorcycleGraph, MotorcycleState, TrailCrash, VertexRef, WallArrival, WallHit,
    WallRef,
};
pub use queue::EventQueue;
