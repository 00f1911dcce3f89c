//! Design requests: what lattice to build.

use tracing::warn;

use crate::error::{LatticeError, LatticeResult};

/// Default cube edge length in mm.
pub const DEFAULT_SIZE: f64 = 25.0;
/// Default number of unit cells per axis.
pub const DEFAULT_PERIODS: u32 = 3;
/// Default samples per axis over the design cube.
pub const DEFAULT_RESOLUTION: usize = 100;

/// Upper bound on an explicit thickness.
pub const MAX_THICKNESS: f64 = 2.0;

/// The single quantity that determines wall thickness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DesignTarget {
    /// Target void fraction in (0, 1); thickness is calibrated to reach it.
    Porosity(f64),
    /// Explicit iso-band half-width in (0, 2]; porosity is measured from it.
    Thickness(f64),
}

impl std::fmt::Display for DesignTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DesignTarget::Porosity(p) => write!(f, "porosity {:.1}%", p * 100.0),
            DesignTarget::Thickness(t) => write!(f, "thickness {:.3}", t),
        }
    }
}

/// Non-fatal findings from [`DesignRequest::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestWarning {
    /// A grading ratio was given together with an explicit thickness.
    GradingIgnored { ratio: f64 },
}

impl std::fmt::Display for RequestWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestWarning::GradingIgnored { ratio } => write!(
                f,
                "grading ratio {:.2} ignored when thickness is specified directly",
                ratio
            ),
        }
    }
}

/// A gyroid lattice design.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignRequest {
    /// Cube edge length in mm.
    pub size: f64,
    /// Unit cells per axis.
    pub periods: u32,
    /// Porosity or thickness.
    pub target: DesignTarget,
    /// Bottom-to-top thickness ratio; 1.0 is uniform.
    pub grading_ratio: f64,
    /// Samples per axis over the design cube.
    pub resolution: usize,
    /// Keep components disconnected from the main lattice.
    pub keep_floaters: bool,
}

impl DesignRequest {
    /// Request with the given target and default geometry.
    pub fn new(target: DesignTarget) -> Self {
        Self {
            size: DEFAULT_SIZE,
            periods: DEFAULT_PERIODS,
            target,
            grading_ratio: 1.0,
            resolution: DEFAULT_RESOLUTION,
            keep_floaters: false,
        }
    }

    /// Request a target porosity fraction.
    pub fn with_porosity(porosity: f64) -> Self {
        Self::new(DesignTarget::Porosity(porosity))
    }

    /// Request an explicit wall thickness.
    pub fn with_thickness(thickness: f64) -> Self {
        Self::new(DesignTarget::Thickness(thickness))
    }

    /// Build a request from an optional porosity and an optional thickness.
    ///
    /// Exactly one must be present.
    pub fn from_options(porosity: Option<f64>, thickness: Option<f64>) -> LatticeResult<Self> {
        match (porosity, thickness) {
            (Some(p), None) => Ok(Self::with_porosity(p)),
            (None, Some(t)) => Ok(Self::with_thickness(t)),
            (Some(_), Some(_)) => Err(LatticeError::BothTargetsGiven),
            (None, None) => Err(LatticeError::NoTargetGiven),
        }
    }

    /// Set the cube edge length.
    pub fn size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    /// Set the unit cell count per axis.
    pub fn periods(mut self, periods: u32) -> Self {
        self.periods = periods;
        self
    }

    /// Set the samples per axis.
    pub fn resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the bottom-to-top thickness ratio.
    pub fn grading_ratio(mut self, ratio: f64) -> Self {
        self.grading_ratio = ratio;
        self
    }

    /// Keep or drop floating components.
    pub fn keep_floaters(mut self, keep: bool) -> Self {
        self.keep_floaters = keep;
        self
    }

    /// Grading ratio that actually applies: 1.0 unless a porosity target is set.
    pub fn effective_grading_ratio(&self) -> f64 {
        match self.target {
            DesignTarget::Porosity(_) => self.grading_ratio,
            DesignTarget::Thickness(_) => 1.0,
        }
    }

    /// Check every field, returning non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> LatticeResult<Vec<RequestWarning>> {
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(LatticeError::InvalidSize { size: self.size });
        }
        if self.periods == 0 {
            return Err(LatticeError::InvalidPeriods {
                periods: self.periods,
            });
        }
        if self.resolution < 2 {
            return Err(LatticeError::InvalidResolution {
                resolution: self.resolution,
            });
        }
        match self.target {
            DesignTarget::Porosity(porosity) => {
                if !(porosity > 0.0 && porosity < 1.0) {
                    return Err(LatticeError::InvalidPorosity { porosity });
                }
            }
            DesignTarget::Thickness(thickness) => {
                if !(thickness > 0.0 && thickness <= MAX_THICKNESS) {
                    return Err(LatticeError::InvalidThickness { thickness });
                }
            }
        }
        if !(self.grading_ratio.is_finite() && self.grading_ratio >= 1.0) {
            return Err(LatticeError::InvalidGradingRatio {
                ratio: self.grading_ratio,
            });
        }

        let mut warnings = Vec::new();
        if matches!(self.target, DesignTarget::Thickness(_)) && self.grading_ratio > 1.0 {
            warn!(
                ratio = self.grading_ratio,
                "Grading ratio ignored when thickness specified directly"
            );
            warnings.push(RequestWarning::GradingIgnored {
                ratio: self.grading_ratio,
            });
        }

        Ok(warnings)
    }
}
