use std::collections::BTreeMap;

use tracing::debug;

use crate::error::SkeletonError;
use crate::math::Point2;
use crate::operations::motorcycle::MotorcycleGraph;
use crate::operations::query::{NearestVertex, VertexInfo};
use crate::operations::shell::ShellBuilder;
use crate::topology::Path;

/// One slice of the model: its outline, motorcycle graph and shells.
///
/// Shells are built on demand and memoised per offset, so asking for the
/// same offset twice returns the cached paths.
#[derive(Debug, Clone)]
pub struct Layer {
    index: usize,
    z: f64,
    outline: Vec<Path>,
    graph: MotorcycleGraph,
    shell_offsets: Vec<f64>,
    max_offset: f64,
    /// Keyed by the bit pattern of the offset, which sorts like the value
    /// for non-negative offsets.
    shells: BTreeMap<u64, Vec<Path>>,
    shell_builds: usize,
}

impl Layer {
    /// Creates a layer with an empty shell cache.
    pub(crate) fn new(
        index: usize,
        z: f64,
        outline: Vec<Path>,
        graph: MotorcycleGraph,
        shell_offsets: Vec<f64>,
        max_offset: f64,
    ) -> Self {
        Self {
            index,
            z,
            outline,
            graph,
            shell_offsets,
            max_offset,
            shells: BTreeMap::new(),
            shell_builds: 0,
        }
    }

    /// Returns the layer index, counted from the bottom of the mesh.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Height of the plane the layer was cut at, including any retry
    /// perturbation.
    #[must_use]
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Returns the closed outline contours.
    #[must_use]
    pub fn outline(&self) -> &[Path] {
        &self.outline
    }

    /// Returns the motorcycle graph built over the outline.
    #[must_use]
    pub fn motorcycle_graph(&self) -> &MotorcycleGraph {
        &self.graph
    }

    /// Returns the configured shell offsets, outermost first.
    #[must_use]
    pub fn shell_offsets(&self) -> &[f64] {
        &self.shell_offsets
    }

    /// Number of shells actually computed, cache hits excluded.
    #[must_use]
    pub fn shell_builds(&self) -> usize {
        self.shell_builds
    }

    /// Returns the outline offset inward by `offset`.
    ///
    /// # Errors
    ///
    /// - [`SkeletonError::InvalidOffset`] unless `0 <= offset < max_offset`
    /// - any error of [`ShellBuilder::execute`]
    pub fn shell(&mut self, offset: f64) -> Result<&[Path], SkeletonError> {
        if !(offset >= 0.0 && offset < self.max_offset) {
            return Err(SkeletonError::InvalidOffset {
                offset,
                max: self.max_offset,
            });
        }
        let key = offset.to_bits();
        if !self.shells.contains_key(&key) {
            let paths = ShellBuilder::new(&self.outline, &self.graph, offset).execute()?;
            self.shell_builds += 1;
            debug!(layer = self.index, offset, paths = paths.len(), "cached shell");
            self.shells.insert(key, paths);
        }
        Ok(self.shells.get(&key).map_or(&[], Vec::as_slice))
    }

    /// Builds every configured shell, outermost first.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`Layer::shell`].
    pub fn shells(&mut self) -> Result<Vec<&[Path]>, SkeletonError> {
        for offset in self.shell_offsets.clone() {
            self.shell(offset)?;
        }
        Ok(self.cached_shells().map(|(_, paths)| paths).collect())
    }

    /// Configured shells already computed, as (shell index, paths).
    fn cached_shells(&self) -> impl Iterator<Item = (usize, &[Path])> + '_ {
        self.shell_offsets.iter().enumerate().filter_map(|(n, offset)| {
            self.shells
                .get(&offset.to_bits())
                .map(|paths| (n, paths.as_slice()))
        })
    }

    /// Probes the vertex nearest to `point` over the outline and every
    /// configured shell built so far.
    #[must_use]
    pub fn nearest_vertex(&self, point: Point2) -> Option<VertexInfo> {
        self.cached_shells()
            .fold(
                NearestVertex::new(point).with_outline(&self.outline),
                |probe, (n, paths)| probe.with_shell(n, paths),
            )
            .execute()
    }
}
