//! Thickness calibration against a target porosity.
//!
//! The solid is the iso-band `|g| <= theta`, so a larger `theta` can only add
//! material: porosity is non-increasing in thickness. The calibrator binary
//! searches `theta` on the unpadded lattice and checks that ordering on every
//! sample it takes.

use rayon::prelude::*;
use tpms_mesh::tracing_ext::OperationTimer;
use tracing::{debug, info, warn};

use crate::error::{LatticeError, LatticeResult};
use crate::field::{GridSpec, ScalarField, evaluate_gyroid};
use crate::request::{DesignRequest, DesignTarget};

/// Parameters for the thickness search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParams {
    /// Accepted absolute porosity error.
    pub tolerance: f64,
    /// Maximum bisection steps.
    pub max_iterations: usize,
    /// Upper end of the thickness search interval (lower end is 0).
    pub search_max: f64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            max_iterations: 20,
            search_max: 1.5,
        }
    }
}

impl CalibrationParams {
    /// Check tolerance, iteration budget and search interval.
    pub fn validate(&self) -> LatticeResult<()> {
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(LatticeError::invalid_params(
                "tolerance",
                format!("{} is not in (0, 1)", self.tolerance),
            ));
        }
        if self.max_iterations == 0 {
            return Err(LatticeError::invalid_params(
                "max_iterations",
                "at least one iteration is required",
            ));
        }
        if !(self.search_max.is_finite() && self.search_max > 0.0) {
            return Err(LatticeError::invalid_params(
                "search_max",
                format!("{} is not a positive finite number", self.search_max),
            ));
        }
        Ok(())
    }
}

/// Wall thickness over the cube: constant, or linear in z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThicknessProfile {
    /// Same thickness everywhere.
    Uniform(f64),
    /// `bottom` at z = 0 blending linearly to `top` at z = size.
    Graded { bottom: f64, top: f64 },
}

impl ThicknessProfile {
    /// Split an average thickness by a bottom-to-top ratio, preserving the average.
    ///
    /// A ratio of 1 (or below) gives a uniform profile.
    pub fn from_average(average: f64, ratio: f64) -> Self {
        if ratio <= 1.0 {
            return ThicknessProfile::Uniform(average);
        }
        let top = 2.0 * average / (ratio + 1.0);
        ThicknessProfile::Graded {
            bottom: ratio * top,
            top,
        }
    }

    /// Thickness at normalized height `t`, clamped to `[0, 1]`.
    #[inline]
    pub fn at(&self, t: f64) -> f64 {
        match *self {
            ThicknessProfile::Uniform(theta) => theta,
            ThicknessProfile::Graded { bottom, top } => {
                bottom + (top - bottom) * t.clamp(0.0, 1.0)
            }
        }
    }

    /// Thickness at z = 0.
    pub fn bottom(&self) -> f64 {
        self.at(0.0)
    }

    /// Thickness at z = size.
    pub fn top(&self) -> f64 {
        self.at(1.0)
    }

    /// Mean of bottom and top.
    pub fn average(&self) -> f64 {
        (self.bottom() + self.top()) / 2.0
    }

    /// Bottom-to-top ratio.
    pub fn ratio(&self) -> f64 {
        match *self {
            ThicknessProfile::Uniform(_) => 1.0,
            ThicknessProfile::Graded { bottom, top } => bottom / top,
        }
    }

    /// Thickness change per unit of height over a cube of edge `size`.
    pub fn gradient(&self, size: f64) -> f64 {
        (self.bottom() - self.top()) / size
    }

    /// True for a z-dependent profile.
    pub fn is_graded(&self) -> bool {
        matches!(self, ThicknessProfile::Graded { .. })
    }
}

impl std::fmt::Display for ThicknessProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThicknessProfile::Uniform(theta) => write!(f, "uniform {:.3}", theta),
            ThicknessProfile::Graded { bottom, top } => {
                write!(f, "graded {:.3} (bottom) to {:.3} (top)", bottom, top)
            }
        }
    }
}

/// One measured point of the thickness/porosity relation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSample {
    pub thickness: f64,
    pub porosity: f64,
}

/// Outcome of calibration or of the inverse measurement.
#[derive(Debug, Clone)]
pub struct CalibrationReport {
    /// Requested porosity, if porosity drove the calibration.
    pub target_porosity: Option<f64>,
    /// Thickness chosen for the whole cube (the average when graded).
    pub thickness: f64,
    /// Profile applied by the voxel builder.
    pub profile: ThicknessProfile,
    /// Porosity measured on the calibration lattice at `thickness`.
    pub achieved_porosity: f64,
    /// Whether the search met the tolerance. Always true for explicit thickness.
    pub converged: bool,
    /// Bisection steps taken.
    pub iterations: usize,
    /// Every measurement, in order.
    pub samples: Vec<CalibrationSample>,
}

impl CalibrationReport {
    /// Absolute porosity error, if there was a target.
    pub fn error(&self) -> Option<f64> {
        self.target_porosity
            .map(|target| (self.achieved_porosity - target).abs())
    }
}

impl std::fmt::Display for CalibrationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Calibration:")?;
        if let Some(target) = self.target_porosity {
            writeln!(f, "  Target porosity: {:.1}%", target * 100.0)?;
        }
        writeln!(f, "  Thickness: {:.3}", self.thickness)?;
        if self.profile.is_graded() {
            writeln!(f, "  Profile: {}", self.profile)?;
        }
        writeln!(
            f,
            "  Achieved porosity: {:.1}%",
            self.achieved_porosity * 100.0
        )?;
        if let Some(error) = self.error() {
            writeln!(
                f,
                "  Error: {:.2}% after {} iteration(s){}",
                error * 100.0,
                self.iterations,
                if self.converged { "" } else { " (not converged)" }
            )?;
        }
        Ok(())
    }
}

/// Porosity of the iso-band `|g| <= thickness` over every sample of `field`.
pub fn measure_porosity(field: &ScalarField, thickness: f64) -> f64 {
    let values = field.values();
    if values.is_empty() {
        return 1.0;
    }
    let solid = values.par_iter().filter(|g| g.abs() <= thickness).count();
    1.0 - solid as f64 / values.len() as f64
}

fn check_monotonic(samples: &[CalibrationSample], new: CalibrationSample) -> LatticeResult<()> {
    for s in samples {
        let (thinner, thicker) = if s.thickness <= new.thickness {
            (s, &new)
        } else {
            (&new, s)
        };
        if thicker.thickness > thinner.thickness && thicker.porosity > thinner.porosity {
            return Err(LatticeError::NonMonotonicCalibration {
                thinner: thinner.thickness,
                thinner_porosity: thinner.porosity,
                thicker: thicker.thickness,
                thicker_porosity: thicker.porosity,
            });
        }
    }
    Ok(())
}

/// Binary search for the uniform thickness giving `target` porosity on `field`.
///
/// Returns the first midpoint within tolerance. When the iteration budget
/// runs out, returns the sample with the smallest error and `converged = false`.
///
/// # Errors
///
/// Returns `NonMonotonicCalibration` if a thicker sample ever measures a
/// higher porosity than a thinner one.
pub fn calibrate_thickness(
    field: &ScalarField,
    target: f64,
    params: &CalibrationParams,
) -> LatticeResult<CalibrationReport> {
    let _timer = OperationTimer::new("calibrate_thickness");
    info!(target_porosity = target, "Calculating thickness for target porosity");

    let mut low = 0.0;
    let mut high = params.search_max;
    let mut samples: Vec<CalibrationSample> = Vec::with_capacity(params.max_iterations);

    for iteration in 0..params.max_iterations {
        let thickness = (low + high) / 2.0;
        let porosity = measure_porosity(field, thickness);
        let sample = CalibrationSample {
            thickness,
            porosity,
        };
        check_monotonic(&samples, sample)?;
        samples.push(sample);

        let error = (porosity - target).abs();
        debug!(
            iteration = iteration + 1,
            thickness, porosity, error, "Calibration step"
        );

        if error < params.tolerance {
            info!(thickness, porosity, iterations = iteration + 1, "Converged");
            return Ok(CalibrationReport {
                target_porosity: Some(target),
                thickness,
                profile: ThicknessProfile::Uniform(thickness),
                achieved_porosity: porosity,
                converged: true,
                iterations: iteration + 1,
                samples,
            });
        }

        if porosity < target {
            // Too much material: thinner walls.
            high = thickness;
        } else {
            low = thickness;
        }
    }

    let best = samples
        .iter()
        .copied()
        .min_by(|a, b| {
            let ea = (a.porosity - target).abs();
            let eb = (b.porosity - target).abs();
            ea.total_cmp(&eb)
        })
        .unwrap_or(CalibrationSample {
            thickness: (low + high) / 2.0,
            porosity: f64::NAN,
        });

    warn!(
        thickness = best.thickness,
        porosity = best.porosity,
        target_porosity = target,
        iterations = params.max_iterations,
        "Calibration did not converge; using best sample"
    );

    Ok(CalibrationReport {
        target_porosity: Some(target),
        thickness: best.thickness,
        profile: ThicknessProfile::Uniform(best.thickness),
        achieved_porosity: best.porosity,
        converged: false,
        iterations: params.max_iterations,
        samples,
    })
}

/// Calibrate a request on its unpadded lattice.
///
/// A porosity target runs the thickness search and then applies the grading
/// ratio to the result. An explicit thickness skips the search and only
/// measures the porosity it produces.
pub fn calibrate(
    request: &DesignRequest,
    params: &CalibrationParams,
) -> LatticeResult<CalibrationReport> {
    request.validate()?;
    params.validate()?;
    calibrate_validated(request, params)
}

/// [`calibrate`] for a request and params the caller has already validated.
pub(crate) fn calibrate_validated(
    request: &DesignRequest,
    params: &CalibrationParams,
) -> LatticeResult<CalibrationReport> {
    let spec = GridSpec::unpadded(request.size, request.periods, request.resolution);
    let field = evaluate_gyroid(&spec)?;

    match request.target {
        DesignTarget::Porosity(target) => {
            let mut report = calibrate_thickness(&field, target, params)?;
            report.profile = ThicknessProfile::from_average(report.thickness, request.grading_ratio);
            if report.profile.is_graded() {
                info!(
                    average = report.thickness,
                    bottom = report.profile.bottom(),
                    top = report.profile.top(),
                    gradient_per_mm = report.profile.gradient(request.size),
                    "Applied thickness grading"
                );
            }
            Ok(report)
        }
        DesignTarget::Thickness(thickness) => {
            let porosity = measure_porosity(&field, thickness);
            info!(thickness, porosity, "Measured porosity for explicit thickness");
            Ok(CalibrationReport {
                target_porosity: None,
                thickness,
                profile: ThicknessProfile::Uniform(thickness),
                achieved_porosity: porosity,
                converged: true,
                iterations: 0,
                samples: vec![CalibrationSample {
                    thickness,
                    porosity,
                }],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_field() -> ScalarField {
        evaluate_gyroid(&GridSpec::unpadded(10.0, 2, 40)).unwrap()
    }

    #[test]
    fn test_porosity_bounds() {
        let field = small_field();
        assert_eq!(measure_porosity(&field, 1.6), 0.0);
        assert!(measure_porosity(&field, 0.0) > 0.99);
    }

    #[test]
    fn test_porosity_monotonic_in_thickness() {
        let field = small_field();
        let mut last = 1.0;
        for step in 0..=15 {
            let p = measure_porosity(&field, step as f64 * 0.1);
            assert!(p <= last);
            last = p;
        }
    }

    #[test]
    fn test_calibration_converges() {
        let field = small_field();
        let report = calibrate_thickness(&field, 0.6, &CalibrationParams::default()).unwrap();
        assert!(report.converged);
        assert!(report.error().unwrap() < 0.02);
        assert_eq!(report.samples.len(), report.iterations);
        assert!(report.thickness > 0.0 && report.thickness < 1.5);
    }

    #[test]
    fn test_non_convergence_returns_best_sample() {
        let field = small_field();
        let params = CalibrationParams {
            tolerance: 1e-9,
            max_iterations: 4,
            search_max: 1.5,
        };
        let report = calibrate_thickness(&field, 0.55, &params).unwrap();
        assert!(!report.converged);
        assert_eq!(report.iterations, 4);

        let best_error = report
            .samples
            .iter()
            .map(|s| (s.porosity - 0.55).abs())
            .fold(f64::INFINITY, f64::min);
        assert_eq!(report.error().unwrap(), best_error);
    }

    #[test]
    fn test_monotonic_check_rejects_inversion() {
        let samples = [CalibrationSample {
            thickness: 0.5,
            porosity: 0.4,
        }];
        let inverted = CalibrationSample {
            thickness: 0.7,
            porosity: 0.6,
        };
        assert!(matches!(
            check_monotonic(&samples, inverted),
            Err(LatticeError::NonMonotonicCalibration { .. })
        ));

        let ordered = CalibrationSample {
            thickness: 0.7,
            porosity: 0.3,
        };
        assert!(check_monotonic(&samples, ordered).is_ok());
    }

    #[test]
    fn test_grading_preserves_average() {
        let profile = ThicknessProfile::from_average(0.6, 2.0);
        assert!((profile.ratio() - 2.0).abs() < 1e-12);
        assert!((profile.average() - 0.6).abs() < 1e-12);
        assert!((profile.bottom() - 0.8).abs() < 1e-12);
        assert!((profile.top() - 0.4).abs() < 1e-12);
        assert!((profile.at(0.5) - 0.6).abs() < 1e-12);
        assert_eq!(profile.at(-1.0), profile.bottom());
        assert_eq!(profile.at(2.0), profile.top());

        assert_eq!(
            ThicknessProfile::from_average(0.6, 1.0),
            ThicknessProfile::Uniform(0.6)
        );
    }

    #[test]
    fn test_explicit_thickness_skips_search() {
        let request = DesignRequest::with_thickness(0.5)
            .size(10.0)
            .periods(2)
            .resolution(30)
            .grading_ratio(3.0);
        let report = calibrate(&request, &CalibrationParams::default()).unwrap();
        assert_eq!(report.iterations, 0);
        assert!(report.target_porosity.is_none());
        assert_eq!(report.profile, ThicknessProfile::Uniform(0.5));
        assert!(report.achieved_porosity > 0.0 && report.achieved_porosity < 1.0);
    }

    #[test]
    fn test_invalid_params() {
        let params = CalibrationParams {
            tolerance: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        let params = CalibrationParams {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
