use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::SliceParams;
use crate::error::{ConfigError, Result, SliceError};
use crate::geometry::Mesh;
use crate::layer::Layer;
use crate::operations::assemble::PathAssembler;
use crate::operations::motorcycle::{MotorcycleBuilder, MotorcycleGraph};
use crate::operations::slice::PlaneSlicer;
use crate::topology::Path;

/// Cuts a mesh into layers.
///
/// # Algorithm
///
/// Layer `i` is cut at `h * i + h / 2 + zmin`. If its segments cannot all be
/// walked into closed contours the plane is nudged up by `fudge_step * h`
/// and the layer is cut again, until it closes, the nudge exceeds half a
/// layer, or `max_attempts` cuts have failed.
#[derive(Debug)]
pub struct Slicer<'a> {
    mesh: &'a Mesh,
    params: SliceParams,
}

impl<'a> Slicer<'a> {
    /// # Errors
    ///
    /// Returns [`ConfigError::ParameterOutOfRange`] for unusable parameters.
    pub fn new(mesh: &'a Mesh, params: SliceParams) -> std::result::Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { mesh, params })
    }

    /// Returns the validated parameters.
    #[must_use]
    pub fn params(&self) -> &SliceParams {
        &self.params
    }

    /// Number of layers that fit in the mesh height.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn layer_count(&self) -> usize {
        let h = self.params.layer_height;
        let span = self.mesh.bounds().height() - h * 0.5;
        if span < 0.0 {
            return 0;
        }
        (span / h).floor() as usize + 1
    }

    /// Height of the cutting plane of layer `index`, raised by `fudge`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn plane_height(&self, index: usize, fudge: f64) -> f64 {
        let h = self.params.layer_height;
        h * index as f64 + h * 0.5 + self.mesh.bounds().min.z + fudge
    }

    /// Cuts one layer and builds its motorcycle graph.
    ///
    /// A mesh too small to be a solid yields an empty layer.
    ///
    /// # Errors
    ///
    /// - [`SliceError::OffsetOutOfRange`] if retries push the plane more than
    ///   half a layer up
    /// - [`SliceError::UnclosableContour`] if every attempt leaves segments over
    /// - [`crate::error::SkeletonError`] for internal topology failures
    pub fn slice_layer(&self, index: usize) -> Result<Layer> {
        let params = &self.params;
        if let Err(e) = self.mesh.check_solid() {
            warn!(layer = index, error = %e, "skipping layer");
            let z = self.plane_height(index, 0.0);
            return Ok(self.layer(index, z, Vec::new(), MotorcycleGraph::default()));
        }

        let h = params.layer_height;
        let mut fudge = 0.0;
        let mut z = self.plane_height(index, fudge);
        let mut remaining = 0;
        for attempt in 1..=params.max_attempts {
            let segments = PlaneSlicer::new(self.mesh.triangles(), z).execute();
            debug!(layer = index, z, attempt, segments = segments.len(), "cut plane");

            let assembly = PathAssembler::new(
                &segments,
                params.min_segment_length,
                params.collinear_angle_tolerance,
            )
            .execute()?;
            if assembly.is_closed() {
                let graph =
                    MotorcycleBuilder::new(&assembly.paths, self.mesh.bounds().diagonal_2d())
                        .execute()?;
                info!(
                    layer = index,
                    z,
                    paths = assembly.paths.len(),
                    motorcycles = graph.len(),
                    "sliced layer"
                );
                return Ok(self.layer(index, z, assembly.paths, graph));
            }

            remaining = assembly.remaining;
            if attempt == params.max_attempts {
                break;
            }
            fudge += params.fudge_step * h;
            if fudge > h * 0.5 {
                return Err(SliceError::OffsetOutOfRange {
                    z,
                    fudge,
                    layer_height: h,
                }
                .into());
            }
            z = self.plane_height(index, fudge);
            warn!(layer = index, remaining, fudge, z, "reslicing with offset");
        }

        Err(SliceError::UnclosableContour {
            z,
            attempts: params.max_attempts,
            remaining,
        }
        .into())
    }

    fn layer(&self, index: usize, z: f64, outline: Vec<Path>, graph: MotorcycleGraph) -> Layer {
        Layer::new(
            index,
            z,
            outline,
            graph,
            self.params.shell_offsets(),
            self.params.max_offset(),
        )
    }

    /// Yields the layers bottom to top, cutting each one when asked for.
    pub fn layers(&self) -> impl Iterator<Item = Result<Layer>> + '_ {
        (0..self.layer_count()).map(|i| self.slice_layer(i))
    }

    /// Cuts every layer in parallel, in layer order.
    #[must_use]
    pub fn slice_all(&self) -> Vec<Result<Layer>> {
        (0..self.layer_count())
            .into_par_iter()
            .map(|i| self.slice_layer(i))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SkeinError;
    use crate::geometry::Triangle;
    use crate::math::{points_coincide, Point2};
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn square() -> Vec<Point2> {
        vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)]
    }

    /// A square prism with the wall along `y = 0` missing.
    fn open_box() -> Mesh {
        let closed = Mesh::prism(&square(), 0.0, 2.0);
        let triangles: Vec<Triangle> = closed
            .triangles()
            .iter()
            .filter(|t| t.normal.y > -0.5)
            .copied()
            .collect();
        Mesh::from_triangles(triangles)
    }

    #[test]
    fn layer_geometry() {
        let mesh = Mesh::prism(&square(), 0.0, 2.0);
        let slicer = Slicer::new(&mesh, SliceParams::default()).unwrap();
        assert_eq!(slicer.layer_count(), 5);
        assert_relative_eq!(slicer.plane_height(0, 0.0), 0.2);
        assert_relative_eq!(slicer.plane_height(2, 0.01), 1.01, epsilon = 1e-12);
    }

    #[test]
    fn square_prism_end_to_end() {
        let mesh = Mesh::prism(&square(), 0.0, 2.0);
        let slicer = Slicer::new(&mesh, SliceParams::default()).unwrap();
        let mut layer = slicer.slice_layer(0).unwrap();

        assert_eq!(layer.outline().len(), 1);
        let outline = &layer.outline()[0];
        assert_eq!(outline.len(), 4);
        for v in outline.vertices() {
            assert_relative_eq!(v.angle, FRAC_PI_2, epsilon = 1e-9);
            assert!(!v.is_reflex());
        }
        assert!(layer.motorcycle_graph().is_empty());

        let shell = layer.shell(1.0).unwrap();
        assert_eq!(shell.len(), 1);
        let points = shell[0].points();
        assert_eq!(points.len(), 4);
        for expected in [p(1.0, 1.0), p(9.0, 1.0), p(9.0, 9.0), p(1.0, 9.0)] {
            assert!(points.iter().any(|q| points_coincide(q, &expected, 1e-6)));
        }
    }

    #[test]
    fn l_prism_launches_one_motorcycle() {
        let outline = [
            p(0.0, 0.0),
            p(10.0, 0.0),
            p(10.0, 5.0),
            p(5.0, 5.0),
            p(5.0, 10.0),
            p(0.0, 10.0),
        ];
        let mesh = Mesh::prism(&outline, 0.0, 1.0);
        let slicer = Slicer::new(&mesh, SliceParams::default()).unwrap();
        let layer = slicer.slice_layer(0).unwrap();
        let graph = layer.motorcycle_graph();
        assert_eq!(graph.len(), 1);
        assert!(points_coincide(&graph.motorcycles()[0].origin(), &p(5.0, 5.0), 1e-9));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let mesh = Mesh::prism(&square(), 0.0, 2.0);
        let slicer = Slicer::new(&mesh, SliceParams::default()).unwrap();
        let sequential: Vec<_> = slicer.layers().map(|l| l.unwrap().z()).collect();
        let parallel: Vec<_> = slicer.slice_all().into_iter().map(|l| l.unwrap().z()).collect();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.len(), 5);
    }

    #[test]
    fn open_mesh_gives_up_after_max_attempts() {
        let mesh = open_box();
        let slicer = Slicer::new(&mesh, SliceParams::default()).unwrap();
        let err = slicer.slice_layer(0).unwrap_err();
        assert!(matches!(
            err,
            SkeinError::Slice(SliceError::UnclosableContour {
                attempts: 8,
                remaining: 6,
                ..
            })
        ));
    }

    #[test]
    fn large_fudge_is_out_of_range() {
        let mesh = open_box();
        let params = SliceParams {
            fudge_step: 0.3,
            ..SliceParams::default()
        };
        let slicer = Slicer::new(&mesh, params).unwrap();
        assert!(matches!(
            slicer.slice_layer(0),
            Err(SkeinError::Slice(SliceError::OffsetOutOfRange { .. }))
        ));
    }

    #[test]
    fn degenerate_mesh_gives_empty_layer() {
        let full = Mesh::prism(&square(), 0.0, 2.0);
        let mesh = Mesh::from_triangles(full.triangles()[..2].to_vec());
        let slicer = Slicer::new(&mesh, SliceParams::default()).unwrap();
        let layer = slicer.slice_layer(0).unwrap();
        assert!(layer.outline().is_empty());
    }

    #[test]
    fn invalid_params_are_rejected() {
        let mesh = Mesh::prism(&square(), 0.0, 2.0);
        let params = SliceParams {
            layer_height: 0.0,
            ..SliceParams::default()
        };
        assert!(Slicer::new(&mesh, params).is_err());
    }
}
