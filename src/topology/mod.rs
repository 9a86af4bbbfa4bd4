pub mod path;
pub mod ring;

pub use path::{Path, PathVertex};
pub use ring::{RingCycle, RingStore, RingVertexId};
