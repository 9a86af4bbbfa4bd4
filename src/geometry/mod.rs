pub mod mesh;
pub mod primitive;

pub use mesh::{Aabb, Mesh};
pub use primitive::{Intersection, Line, Plane, Primitive, Segment3, Triangle};
