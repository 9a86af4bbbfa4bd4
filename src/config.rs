use crate::error::ConfigError;

/// Parameters controlling layer slicing and shell construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceParams {
    /// Distance between slicing planes.
    pub layer_height: f64,
    /// Points closer than this to their predecessor are dropped.
    pub min_segment_length: f64,
    /// Vertices whose turn is within this many radians of straight are dropped.
    pub collinear_angle_tolerance: f64,
    /// Spacing between consecutive shells.
    pub extrusion_width: f64,
    /// Number of shells built per layer.
    pub shell_count: usize,
    /// Slicing attempts per layer before giving up on an open contour.
    pub max_attempts: usize,
    /// Plane perturbation added per retry, as a fraction of the layer height.
    pub fudge_step: f64,
}

impl Default for SliceParams {
    fn default() -> Self {
        Self {
            layer_height: 0.4,
            min_segment_length: 0.01,
            collinear_angle_tolerance: 0.01,
            extrusion_width: 0.5,
            shell_count: 3,
            max_attempts: 8,
            fudge_step: 0.01,
        }
    }
}

fn check(parameter: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::ParameterOutOfRange {
            parameter,
            value,
            min,
            max,
        })
    }
}

impl SliceParams {
    /// Default parameters with the extrusion width derived from the layer
    /// height and a width-over-thickness ratio.
    #[must_use]
    pub fn with_width_over_thickness(layer_height: f64, width_over_thickness: f64) -> Self {
        Self {
            layer_height,
            extrusion_width: layer_height * width_over_thickness,
            ..Self::default()
        }
    }

    /// Checks that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParameterOutOfRange`] for the first parameter
    /// found outside its range.
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("layer_height", self.layer_height, f64::MIN_POSITIVE, f64::MAX)?;
        check("min_segment_length", self.min_segment_length, 0.0, f64::MAX)?;
        check(
            "collinear_angle_tolerance",
            self.collinear_angle_tolerance,
            0.0,
            std::f64::consts::FRAC_PI_2,
        )?;
        check("extrusion_width", self.extrusion_width, f64::MIN_POSITIVE, f64::MAX)?;
        check("max_attempts", self.max_attempts as f64, 1.0, f64::MAX)?;
        check("fudge_step", self.fudge_step, 0.0, 0.5)?;
        Ok(())
    }

    /// Shell offsets `w/2, w/2 + w, …`, one per shell.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn shell_offsets(&self) -> Vec<f64> {
        let w = self.extrusion_width;
        (0..self.shell_count)
            .map(|n| w * 0.5 + w * n as f64)
            .collect()
    }

    /// Exclusive upper bound on shell offsets.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn max_offset(&self) -> f64 {
        self.extrusion_width * self.shell_count as f64
    }
}
