// thiserror reads these fields through its Display impls; newer compilers still
// flag them as never read.
#![allow(unused_assignments)]

//! Error types for lattice generation with rich diagnostics.
//!
//! Codes follow the pattern `LATTICE-XXXX` where:
//! - 1xxx = Request validation errors (raised before any grid is allocated)
//! - 2xxx = Computation errors
//! - 3xxx = Output errors
//!
//! Calibration non-convergence, boundary edges and degenerate geometry are not
//! errors. They are reported in [`LatticeBuildResult`](crate::LatticeBuildResult).

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for lattice operations.
pub type LatticeResult<T> = Result<T, LatticeError>;

/// Machine-readable error codes for lattice operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LatticeErrorCode {
    /// LATTICE-1001: Cube size is not a positive finite number
    InvalidSize = 1001,
    /// LATTICE-1002: Period count is zero
    InvalidPeriods = 1002,
    /// LATTICE-1003: Resolution below two samples per axis
    InvalidResolution = 1003,
    /// LATTICE-1004: Porosity outside (0, 1)
    InvalidPorosity = 1004,
    /// LATTICE-1005: Thickness outside (0, 2]
    InvalidThickness = 1005,
    /// LATTICE-1006: Grading ratio below 1
    InvalidGradingRatio = 1006,
    /// LATTICE-1007: Both porosity and thickness were given
    BothTargetsGiven = 1007,
    /// LATTICE-1008: Neither porosity nor thickness was given
    NoTargetGiven = 1008,
    /// LATTICE-1009: Invalid generation parameter
    InvalidParams = 1009,

    /// LATTICE-2001: Padded lattice exceeds the point limit
    GridTooLarge = 2001,
    /// LATTICE-2002: Thicker walls produced higher porosity
    NonMonotonicCalibration = 2002,
    /// LATTICE-2003: Iso-surface extraction produced no triangles
    EmptyIsosurface = 2003,

    /// LATTICE-3001: Mesh output failed
    MeshOutput = 3001,
}

impl LatticeErrorCode {
    /// Returns the error code as a string in the format `LATTICE-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LatticeErrorCode::InvalidSize => "LATTICE-1001",
            LatticeErrorCode::InvalidPeriods => "LATTICE-1002",
            LatticeErrorCode::InvalidResolution => "LATTICE-1003",
            LatticeErrorCode::InvalidPorosity => "LATTICE-1004",
            LatticeErrorCode::InvalidThickness => "LATTICE-1005",
            LatticeErrorCode::InvalidGradingRatio => "LATTICE-1006",
            LatticeErrorCode::BothTargetsGiven => "LATTICE-1007",
            LatticeErrorCode::NoTargetGiven => "LATTICE-1008",
            LatticeErrorCode::InvalidParams => "LATTICE-1009",
            LatticeErrorCode::GridTooLarge => "LATTICE-2001",
            LatticeErrorCode::NonMonotonicCalibration => "LATTICE-2002",
            LatticeErrorCode::EmptyIsosurface => "LATTICE-2003",
            LatticeErrorCode::MeshOutput => "LATTICE-3001",
        }
    }

    /// True for errors raised while validating a request.
    pub fn is_request_error(&self) -> bool {
        (*self as u32) < 2000
    }
}

impl std::fmt::Display for LatticeErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for lattice errors.
#[derive(Debug, Clone, PartialEq)]
pub enum LatticeRecoverySuggestion {
    /// Lower the lattice points per axis (resolution plus padding).
    ReduceResolution { current: usize, suggested: usize },
    /// Pick exactly one of porosity or thickness.
    ChooseOneTarget,
    /// Adjust a request value into its valid range.
    AdjustParameter { name: &'static str, range: &'static str },
    /// Report the calibration inputs; the field construction is broken.
    ReportBug,
    /// Change the target so that the lattice has material.
    AdjustTarget,
    /// Check the output location.
    CheckOutputPath,
}

impl std::fmt::Display for LatticeRecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LatticeRecoverySuggestion::ReduceResolution { current, suggested } => {
                write!(
                    f,
                    "Reduce the lattice from {} to at most {} points per axis",
                    current, suggested
                )
            }
            LatticeRecoverySuggestion::ChooseOneTarget => {
                write!(f, "Specify exactly one of --porosity or --thickness")
            }
            LatticeRecoverySuggestion::AdjustParameter { name, range } => {
                write!(f, "Set {} within {}", name, range)
            }
            LatticeRecoverySuggestion::ReportBug => {
                write!(f, "Report the size, periods and resolution that triggered this")
            }
            LatticeRecoverySuggestion::AdjustTarget => {
                write!(f, "Lower the porosity or raise the thickness")
            }
            LatticeRecoverySuggestion::CheckOutputPath => {
                write!(f, "Check that the output directory exists and is writable")
            }
        }
    }
}

/// Errors that can occur during lattice generation.
#[derive(Debug, Error, Diagnostic)]
pub enum LatticeError {
    /// Cube size is not positive.
    #[error("invalid cube size {size}: must be a positive finite number")]
    #[diagnostic(code(lattice::request::size), help("Use a cube size in mm greater than zero"))]
    InvalidSize { size: f64 },

    /// Period count is zero.
    #[error("invalid period count {periods}: must be at least 1")]
    #[diagnostic(
        code(lattice::request::periods),
        help("Use at least one unit cell per axis (2-5 is typical)")
    )]
    InvalidPeriods { periods: u32 },

    /// Resolution too small to define a spacing.
    #[error("invalid resolution {resolution}: need at least 2 samples per axis")]
    #[diagnostic(
        code(lattice::request::resolution),
        help("80-120 samples per axis is a good range")
    )]
    InvalidResolution { resolution: usize },

    /// Porosity fraction outside (0, 1).
    #[error("invalid porosity {porosity}: must lie strictly between 0 and 1")]
    #[diagnostic(
        code(lattice::request::porosity),
        help("Porosity is the void fraction; on the command line it is a percentage between 0 and 100")
    )]
    InvalidPorosity { porosity: f64 },

    /// Thickness outside (0, 2].
    #[error("invalid thickness {thickness}: must lie in (0, 2]")]
    #[diagnostic(
        code(lattice::request::thickness),
        help("The gyroid field lies in [-1.5, 1.5]; useful thickness values are 0.2-1.0")
    )]
    InvalidThickness { thickness: f64 },

    /// Grading ratio below 1.
    #[error("invalid grading ratio {ratio}: must be at least 1")]
    #[diagnostic(
        code(lattice::request::grading),
        help("The ratio is bottom thickness over top thickness; 1.0 means uniform")
    )]
    InvalidGradingRatio { ratio: f64 },

    /// Both porosity and thickness were given.
    #[error("porosity and thickness are mutually exclusive")]
    #[diagnostic(
        code(lattice::request::both_targets),
        help("Specify a target porosity or a wall thickness, not both")
    )]
    BothTargetsGiven,

    /// Neither porosity nor thickness was given.
    #[error("either porosity or thickness must be specified")]
    #[diagnostic(
        code(lattice::request::no_target),
        help("Specify a target porosity or a wall thickness")
    )]
    NoTargetGiven,

    /// Invalid tuning parameter.
    #[error("invalid parameter {name}: {details}")]
    #[diagnostic(code(lattice::params::invalid))]
    InvalidParams { name: &'static str, details: String },

    /// The padded lattice would exceed the point limit.
    #[error("lattice too large: {points_per_axis}^3 = {total} points exceeds limit of {max}")]
    #[diagnostic(
        code(lattice::grid::too_large),
        help("Reduce the resolution or raise the point limit")
    )]
    GridTooLarge {
        points_per_axis: usize,
        total: usize,
        max: usize,
    },

    /// A calibration sample contradicted the thickness/porosity ordering.
    #[error(
        "non-monotonic calibration: thickness {thicker:.4} gave porosity {thicker_porosity:.4}, \
         above {thinner_porosity:.4} at thinner {thinner:.4}"
    )]
    #[diagnostic(
        code(lattice::calibration::non_monotonic),
        help("Thicker walls must never raise porosity; the calibration result cannot be trusted")
    )]
    NonMonotonicCalibration {
        thinner: f64,
        thinner_porosity: f64,
        thicker: f64,
        thicker_porosity: f64,
    },

    /// The cleaned solid produced no iso-surface.
    #[error("iso-surface extraction produced no triangles")]
    #[diagnostic(
        code(lattice::isosurface::empty),
        help("The solid is entirely empty at this thickness. Lower the porosity target.")
    )]
    EmptyIsosurface,

    /// Underlying mesh error.
    #[error("mesh operation failed: {0}")]
    #[diagnostic(code(lattice::mesh::error))]
    MeshError(#[from] tpms_mesh::MeshError),
}

impl LatticeError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> LatticeErrorCode {
        match self {
            LatticeError::InvalidSize { .. } => LatticeErrorCode::InvalidSize,
            LatticeError::InvalidPeriods { .. } => LatticeErrorCode::InvalidPeriods,
            LatticeError::InvalidResolution { .. } => LatticeErrorCode::InvalidResolution,
            LatticeError::InvalidPorosity { .. } => LatticeErrorCode::InvalidPorosity,
            LatticeError::InvalidThickness { .. } => LatticeErrorCode::InvalidThickness,
            LatticeError::InvalidGradingRatio { .. } => LatticeErrorCode::InvalidGradingRatio,
            LatticeError::BothTargetsGiven => LatticeErrorCode::BothTargetsGiven,
            LatticeError::NoTargetGiven => LatticeErrorCode::NoTargetGiven,
            LatticeError::InvalidParams { .. } => LatticeErrorCode::InvalidParams,
            LatticeError::GridTooLarge { .. } => LatticeErrorCode::GridTooLarge,
            LatticeError::NonMonotonicCalibration { .. } => {
                LatticeErrorCode::NonMonotonicCalibration
            }
            LatticeError::EmptyIsosurface => LatticeErrorCode::EmptyIsosurface,
            LatticeError::MeshError(_) => LatticeErrorCode::MeshOutput,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> LatticeRecoverySuggestion {
        match self {
            LatticeError::InvalidSize { .. } => LatticeRecoverySuggestion::AdjustParameter {
                name: "size",
                range: "(0, inf)",
            },
            LatticeError::InvalidPeriods { .. } => LatticeRecoverySuggestion::AdjustParameter {
                name: "periods",
                range: "[1, inf)",
            },
            LatticeError::InvalidResolution { .. } => {
                LatticeRecoverySuggestion::AdjustParameter {
                    name: "resolution",
                    range: "[2, inf)",
                }
            }
            LatticeError::InvalidPorosity { .. } => LatticeRecoverySuggestion::AdjustParameter {
                name: "porosity",
                range: "(0, 100) percent",
            },
            LatticeError::InvalidThickness { .. } => LatticeRecoverySuggestion::AdjustParameter {
                name: "thickness",
                range: "(0, 2]",
            },
            LatticeError::InvalidGradingRatio { .. } => {
                LatticeRecoverySuggestion::AdjustParameter {
                    name: "grading ratio",
                    range: "[1, inf)",
                }
            }
            LatticeError::BothTargetsGiven | LatticeError::NoTargetGiven => {
                LatticeRecoverySuggestion::ChooseOneTarget
            }
            LatticeError::InvalidParams { name, .. } => {
                LatticeRecoverySuggestion::AdjustParameter {
                    name: *name,
                    range: "its documented range",
                }
            }
            LatticeError::GridTooLarge {
                points_per_axis,
                max,
                ..
            } => LatticeRecoverySuggestion::ReduceResolution {
                current: *points_per_axis,
                suggested: ((*max as f64).cbrt().floor() as usize).max(2),
            },
            LatticeError::NonMonotonicCalibration { .. } => LatticeRecoverySuggestion::ReportBug,
            LatticeError::EmptyIsosurface => LatticeRecoverySuggestion::AdjustTarget,
            LatticeError::MeshError(_) => LatticeRecoverySuggestion::CheckOutputPath,
        }
    }

    // Constructor helpers

    /// Create a grid too large error.
    pub fn grid_too_large(points_per_axis: usize, max: usize) -> Self {
        LatticeError::GridTooLarge {
            points_per_axis,
            total: points_per_axis.saturating_pow(3),
            max,
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_params(name: &'static str, details: impl Into<String>) -> Self {
        LatticeError::InvalidParams {
            name,
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LatticeError::BothTargetsGiven.code().as_str(), "LATTICE-1007");
        assert_eq!(LatticeError::EmptyIsosurface.code().as_str(), "LATTICE-2003");
        assert!(LatticeError::NoTargetGiven.code().is_request_error());
        assert!(!LatticeError::grid_too_large(500, 1000).code().is_request_error());
    }

    #[test]
    fn test_grid_too_large_suggestion() {
        let err = LatticeError::grid_too_large(406, 50_000_000);
        match err.recovery_suggestion() {
            LatticeRecoverySuggestion::ReduceResolution { current, suggested } => {
                assert_eq!(current, 406);
                assert!(suggested.pow(3) <= 50_000_000);
            }
            other => panic!("Expected ReduceResolution, got {:?}", other),
        }
    }

    #[test]
    fn test_mesh_error_conversion() {
        let mesh_err = tpms_mesh::MeshError::empty_mesh("nothing");
        let err: LatticeError = mesh_err.into();
        assert_eq!(err.code(), LatticeErrorCode::MeshOutput);
        assert!(format!("{}", err).contains("nothing"));
    }

    #[test]
    fn test_error_display() {
        let err = LatticeError::InvalidPorosity { porosity: 1.5 };
        assert!(format!("{}", err).contains("1.5"));
    }
}
