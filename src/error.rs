use thiserror::Error;

/// Top-level error type for the skein slicer.
#[derive(Debug, Error)]
pub enum SkeinError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Slice(#[from] SliceError),

    #[error(transparent)]
    Skeleton(#[from] SkeletonError),
}

/// Errors raised while validating slicing parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Errors raised while cutting a layer out of the mesh.
///
/// These abort only the layer being sliced; other layers are unaffected.
#[derive(Debug, Error)]
pub enum SliceError {
    /// The mesh cannot enclose a volume. Not fatal: the layer comes out empty.
    #[error("degenerate input: {triangles} triangles cannot form a solid")]
    DegenerateInput { triangles: usize },

    /// Segments were left over after every retry.
    #[error(
        "could not close contour at z = {z} after {attempts} attempts \
         ({remaining} segments remaining)"
    )]
    UnclosableContour {
        z: f64,
        attempts: usize,
        remaining: usize,
    },

    /// The retry perturbation grew past half a layer.
    #[error("layer offset {fudge} exceeds half the layer height {layer_height} at z = {z}")]
    OffsetOutOfRange {
        z: f64,
        fudge: f64,
        layer_height: f64,
    },
}

/// Internal invariant violations of the motorcycle graph and shell builder.
///
/// These indicate a topology bug rather than floating-point noise and are
/// never retried.
#[derive(Debug, Error)]
pub enum SkeletonError {
    #[error("non-finite event time {0}")]
    InvalidTime(f64),

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("shell offset {offset} is outside [0, {max})")]
    InvalidOffset { offset: f64, max: f64 },
}

/// Convenience type alias for results using [`SkeinError`].
pub type Result<T> = std::result::Result<T, SkeinError>;
