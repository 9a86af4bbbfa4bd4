mod plane_slicer;

pub use plane_slicer::{OrientedSegment, PlaneSlicer};
