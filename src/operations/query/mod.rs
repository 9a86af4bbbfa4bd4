mod nearest_vertex;

pub use nearest_vertex::{NearestVertex, PathGroup, VertexInfo, DEFAULT_PICK_RADIUS};
