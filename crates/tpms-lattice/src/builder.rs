//! Fluent builder for the lattice generation pipeline.
//!
//! ```no_run
//! use std::path::Path;
//! use tpms_lattice::{DesignRequest, LatticeBuilder};
//!
//! let request = DesignRequest::with_porosity(0.7).periods(3).resolution(100);
//! let result = LatticeBuilder::new(request)
//!     .closing_iterations(2)
//!     .edge_precision(6)
//!     .build()
//!     .unwrap();
//!
//! if result.status.has_mesh() {
//!     tpms_mesh::save_stl(&result.mesh, Path::new("gyroid.stl")).unwrap();
//! }
//! println!("{}", result);
//! ```

use std::path::Path;

use tpms_mesh::tracing_ext::{OperationTimer, log_mesh_quality};
use tpms_mesh::{
    DefectSeverity, OrientationReport, SurfaceMesh, VerifyParams, WatertightReport,
    certify_watertight, orient_outward,
};
use tracing::{info, warn};

use crate::calibrate::{CalibrationParams, CalibrationReport, calibrate_validated};
use crate::error::{LatticeError, LatticeResult};
use crate::extract::extract_surface;
use crate::field::{GridSpec, evaluate_gyroid};
use crate::request::{DesignRequest, RequestWarning};
use crate::topology::{close_holes, count_components, keep_largest_component};
use crate::voxel::VoxelSolid;

/// Highest edge-key precision; keeps rounded coordinates well inside `i64`.
pub const MAX_EDGE_PRECISION: u32 = 12;

/// Every tunable of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Lattice points added on each side of the design cube.
    pub padding: usize,
    /// Thickness search settings.
    pub calibration: CalibrationParams,
    /// Dilation and erosion steps of the hole-closing pass.
    pub closing_iterations: usize,
    /// Decimal places used to match corners when certifying.
    pub edge_precision: u32,
    /// Boundary edges below which defects count as minor.
    pub minor_defect_limit: usize,
    /// Largest padded lattice accepted, in points.
    pub max_points: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            padding: 3,
            calibration: CalibrationParams::default(),
            closing_iterations: 2,
            edge_precision: 6,
            minor_defect_limit: 100,
            max_points: 50_000_000,
        }
    }
}

impl GenerationParams {
    /// Certification parameters.
    pub fn verify_params(&self) -> VerifyParams {
        VerifyParams {
            precision: self.edge_precision,
            minor_defect_limit: self.minor_defect_limit,
        }
    }

    /// Check every tunable.
    pub fn validate(&self) -> LatticeResult<()> {
        if self.padding == 0 {
            return Err(LatticeError::invalid_params(
                "padding",
                "at least one padding sample is needed to close the surface at the cube faces",
            ));
        }
        if self.edge_precision > MAX_EDGE_PRECISION {
            return Err(LatticeError::invalid_params(
                "edge_precision",
                format!("{} exceeds {}", self.edge_precision, MAX_EDGE_PRECISION),
            ));
        }
        self.calibration.validate()
    }
}

/// Final classification of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    /// Closed surface, every edge matched.
    Watertight,
    /// A few boundary edges; usually still meshable.
    MinorDefects,
    /// Many boundary edges; regenerate at a higher resolution.
    SevereDefects,
    /// The cleaned solid has no iso-surface.
    NoSurface,
    /// Triangles exist but enclose no volume.
    ZeroVolume,
}

impl GenerationStatus {
    /// True when the result carries a usable mesh.
    pub fn has_mesh(&self) -> bool {
        !matches!(self, GenerationStatus::NoSurface | GenerationStatus::ZeroVolume)
    }

    fn from_severity(severity: DefectSeverity) -> Self {
        match severity {
            DefectSeverity::Watertight => GenerationStatus::Watertight,
            DefectSeverity::Minor => GenerationStatus::MinorDefects,
            DefectSeverity::Severe => GenerationStatus::SevereDefects,
        }
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStatus::Watertight => write!(f, "watertight"),
            GenerationStatus::MinorDefects => write!(f, "minor defects"),
            GenerationStatus::SevereDefects => write!(f, "severe defects"),
            GenerationStatus::NoSurface => write!(f, "no surface"),
            GenerationStatus::ZeroVolume => write!(f, "zero volume"),
        }
    }
}

/// Porosity of the design cube after each voxel stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PorosityStages {
    /// Right after thresholding and masking.
    pub thresholded: f64,
    /// After component filtering; `None` when floaters were kept.
    pub filtered: Option<f64>,
    /// After hole closing. This is the porosity of the emitted solid.
    pub closed: f64,
}

/// Statistics of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationStats {
    /// Padded lattice points per axis.
    pub points_per_axis: usize,
    /// Lattice spacing in mm.
    pub spacing: f64,
    /// Porosity after each stage.
    pub porosity: PorosityStages,
    /// Components right after thresholding.
    pub components_before: usize,
    /// Voxels dropped by component filtering.
    pub removed_voxels: usize,
    /// Voxels added by hole closing.
    pub closing_added_voxels: usize,
    /// Detached specks created by closing and dropped again.
    pub closing_removed_voxels: usize,
    /// Components of the final solid.
    pub components_after: usize,
    /// Distinct surface vertices.
    pub vertex_count: usize,
    /// Surface triangles.
    pub triangle_count: usize,
    /// Orientation correction, absent without a surface.
    pub orientation: Option<OrientationReport>,
    /// Watertightness certificate, absent without a surface.
    pub watertight: Option<WatertightReport>,
}

/// Output of [`LatticeBuilder::build`].
#[derive(Debug, Clone)]
pub struct LatticeBuildResult {
    /// Outward-oriented surface; empty for `NoSurface`.
    pub mesh: SurfaceMesh,
    /// Calibration or inverse measurement.
    pub calibration: CalibrationReport,
    /// Stage statistics, all taken from the final state.
    pub stats: GenerationStats,
    /// Overall classification.
    pub status: GenerationStatus,
    /// Non-fatal request findings.
    pub warnings: Vec<RequestWarning>,
}

impl LatticeBuildResult {
    /// Porosity of the emitted solid.
    pub fn achieved_porosity(&self) -> f64 {
        self.stats.porosity.closed
    }

    /// Boundary edges of the emitted mesh (zero without a surface).
    pub fn boundary_edge_count(&self) -> usize {
        self.stats
            .watertight
            .as_ref()
            .map_or(0, |w| w.boundary_edge_count)
    }

    /// Write the mesh as binary STL.
    ///
    /// # Errors
    ///
    /// Returns `LatticeError::MeshError` when the file cannot be written.
    pub fn save_stl(&self, path: &Path) -> LatticeResult<()> {
        tpms_mesh::save_stl(&self.mesh, path)?;
        info!(path = ?path, triangles = self.mesh.triangle_count(), "Saved lattice");
        Ok(())
    }
}

impl std::fmt::Display for LatticeBuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = &self.stats;
        write!(f, "{}", self.calibration)?;
        writeln!(f, "Solid:")?;
        writeln!(
            f,
            "  Lattice: {}^3 points, spacing {:.4} mm",
            stats.points_per_axis, stats.spacing
        )?;
        writeln!(
            f,
            "  Porosity after thresholding: {:.1}%",
            stats.porosity.thresholded * 100.0
        )?;
        if let Some(filtered) = stats.porosity.filtered {
            writeln!(
                f,
                "  Porosity after filtering: {:.1}% ({} component(s), {} voxels removed)",
                filtered * 100.0,
                stats.components_before,
                stats.removed_voxels
            )?;
        }
        writeln!(
            f,
            "  Final porosity: {:.1}% ({} component(s))",
            stats.porosity.closed * 100.0,
            stats.components_after
        )?;
        writeln!(f, "Surface:")?;
        writeln!(f, "  Vertices: {}", stats.vertex_count)?;
        writeln!(f, "  Triangles: {}", stats.triangle_count)?;
        if let Some(orientation) = &stats.orientation {
            write!(f, "{}", orientation)?;
        }
        if let Some(watertight) = &stats.watertight {
            write!(f, "{}", watertight)?;
        }
        writeln!(f, "Status: {}", self.status)
    }
}

/// Fluent builder for lattice generation.
///
/// ```no_run
/// use tpms_lattice::{DesignRequest, LatticeBuilder};
///
/// let result = LatticeBuilder::new(DesignRequest::with_thickness(0.45))
///     .padding(4)
///     .build()
///     .unwrap();
/// println!("porosity {:.3}", result.achieved_porosity());
/// ```
#[derive(Debug, Clone)]
pub struct LatticeBuilder {
    request: DesignRequest,
    params: GenerationParams,
}

impl LatticeBuilder {
    /// Builder with default parameters.
    pub fn new(request: DesignRequest) -> Self {
        Self {
            request,
            params: GenerationParams::default(),
        }
    }

    /// Replace every parameter at once.
    pub fn params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Set the padding in lattice points per side.
    pub fn padding(mut self, padding: usize) -> Self {
        self.params.padding = padding;
        self
    }

    /// Set the accepted absolute porosity error.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.params.calibration.tolerance = tolerance;
        self
    }

    /// Set the thickness search iteration budget.
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.params.calibration.max_iterations = iterations;
        self
    }

    /// Set the hole-closing iteration count.
    pub fn closing_iterations(mut self, iterations: usize) -> Self {
        self.params.closing_iterations = iterations;
        self
    }

    /// Set the corner rounding precision used by certification.
    pub fn edge_precision(mut self, decimals: u32) -> Self {
        self.params.edge_precision = decimals;
        self
    }

    /// Set the boundary-edge count separating minor from severe defects.
    pub fn minor_defect_limit(mut self, limit: usize) -> Self {
        self.params.minor_defect_limit = limit;
        self
    }

    /// Set the largest accepted padded lattice.
    pub fn max_points(mut self, max: usize) -> Self {
        self.params.max_points = max;
        self
    }

    /// The request being built.
    pub fn request(&self) -> &DesignRequest {
        &self.request
    }

    /// The current parameters.
    pub fn generation_params(&self) -> &GenerationParams {
        &self.params
    }

    fn check(&self) -> LatticeResult<(Vec<RequestWarning>, GridSpec)> {
        let warnings = self.request.validate()?;
        self.params.validate()?;

        let spec = GridSpec::new(
            self.request.size,
            self.request.periods,
            self.request.resolution,
            self.params.padding,
        );
        if spec.total_points() > self.params.max_points {
            return Err(LatticeError::grid_too_large(
                spec.points_per_axis(),
                self.params.max_points,
            ));
        }
        Ok((warnings, spec))
    }

    /// Run only the calibrator (or its inverse for an explicit thickness).
    pub fn calibrate_only(self) -> LatticeResult<CalibrationReport> {
        self.check()?;
        calibrate_validated(&self.request, &self.params.calibration)
    }

    /// Run the full pipeline.
    ///
    /// # Errors
    ///
    /// Request and parameter errors are returned before any lattice is
    /// allocated. Non-convergence, boundary edges and degenerate geometry are
    /// reported through [`LatticeBuildResult::status`] instead.
    pub fn build(self) -> LatticeResult<LatticeBuildResult> {
        let (warnings, spec) = self.check()?;
        let _timer = OperationTimer::with_points("generate_lattice", spec.total_points());
        let request = &self.request;

        info!(
            size = request.size,
            periods = request.periods,
            resolution = request.resolution,
            target = %request.target,
            grading_ratio = request.effective_grading_ratio(),
            "Generating gyroid lattice"
        );

        let calibration = calibrate_validated(request, &self.params.calibration)?;

        let mut solid = {
            let field = evaluate_gyroid(&spec)?;
            VoxelSolid::from_field(&field, &calibration.profile)
        };
        let thresholded = solid.porosity();

        let (components_before, removed_voxels, filtered) = if request.keep_floaters {
            (count_components(&solid), 0, None)
        } else {
            let report = keep_largest_component(&mut solid);
            (
                report.component_count,
                report.removed_voxels,
                Some(solid.porosity()),
            )
        };

        let closing = close_holes(&mut solid, self.params.closing_iterations);
        // Closing can leave detached voxels beside thin walls. The filtered
        // solid is connected, so it stays whole in the largest component.
        let closing_removed_voxels = if request.keep_floaters {
            0
        } else {
            keep_largest_component(&mut solid).removed_voxels
        };
        let closed = solid.porosity();
        let components_after = count_components(&solid);
        info!(
            porosity = closed,
            components = components_after,
            "Final solid"
        );

        let mut stats = GenerationStats {
            points_per_axis: spec.points_per_axis(),
            spacing: spec.spacing(),
            porosity: PorosityStages {
                thresholded,
                filtered,
                closed,
            },
            components_before,
            removed_voxels,
            closing_added_voxels: closing.added_voxels,
            closing_removed_voxels,
            components_after,
            vertex_count: 0,
            triangle_count: 0,
            orientation: None,
            watertight: None,
        };

        let surface = match extract_surface(&solid) {
            Ok(surface) => surface,
            Err(LatticeError::EmptyIsosurface) => {
                warn!("No iso-surface found; the solid is empty");
                return Ok(LatticeBuildResult {
                    mesh: SurfaceMesh::new(),
                    calibration,
                    stats,
                    status: GenerationStatus::NoSurface,
                    warnings,
                });
            }
            Err(e) => return Err(e),
        };
        drop(solid);

        let mut mesh = surface.mesh;
        let orientation = orient_outward(&mut mesh);
        let watertight = certify_watertight(&mesh, &self.params.verify_params());
        log_mesh_quality(&orientation, &watertight);

        // Volume on the order of rounding noise relative to the cube.
        let zero_volume = orientation.is_zero_volume(1e-12 * request.size.powi(3));
        let status = if zero_volume {
            warn!(volume = orientation.volume, "Surface encloses no volume");
            GenerationStatus::ZeroVolume
        } else {
            GenerationStatus::from_severity(watertight.severity)
        };

        stats.vertex_count = surface.vertex_count;
        stats.triangle_count = mesh.triangle_count();
        stats.orientation = Some(orientation);
        stats.watertight = Some(watertight);

        Ok(LatticeBuildResult {
            mesh,
            calibration,
            stats,
            status,
            warnings,
        })
    }
}

/// Generate a lattice with default parameters.
pub fn generate_lattice(request: &DesignRequest) -> LatticeResult<LatticeBuildResult> {
    LatticeBuilder::new(request.clone()).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_request() -> DesignRequest {
        DesignRequest::with_porosity(0.7)
            .size(10.0)
            .periods(2)
            .resolution(24)
    }

    #[test]
    fn test_builder_defaults() {
        let builder = LatticeBuilder::new(small_request());
        let params = builder.generation_params();
        assert_eq!(params.padding, 3);
        assert_eq!(params.closing_iterations, 2);
        assert_eq!(params.edge_precision, 6);
        assert_eq!(params.calibration.tolerance, 0.02);
        assert_eq!(params.calibration.max_iterations, 20);
        assert_eq!(params.max_points, 50_000_000);
    }

    #[test]
    fn test_builder_chaining() {
        let builder = LatticeBuilder::new(small_request())
            .padding(4)
            .tolerance(0.01)
            .max_iterations(30)
            .closing_iterations(1)
            .edge_precision(8)
            .minor_defect_limit(10)
            .max_points(1_000_000);
        let params = builder.generation_params();
        assert_eq!(params.padding, 4);
        assert_eq!(params.calibration.tolerance, 0.01);
        assert_eq!(params.calibration.max_iterations, 30);
        assert_eq!(params.closing_iterations, 1);
        assert_eq!(params.verify_params().precision, 8);
        assert_eq!(params.verify_params().minor_defect_limit, 10);
        assert_eq!(params.max_points, 1_000_000);
    }

    #[test]
    fn test_build_small_lattice() {
        let result = LatticeBuilder::new(small_request()).build().unwrap();

        assert_eq!(result.status, GenerationStatus::Watertight);
        assert!(result.stats.components_before >= 1);
        assert_eq!(result.stats.components_after, 1);
        assert_eq!(result.boundary_edge_count(), 0);
        assert!(result.stats.orientation.as_ref().unwrap().volume > 0.0);
        assert_eq!(result.stats.triangle_count, result.mesh.triangle_count());

        // Closing only adds material.
        let stages = result.stats.porosity;
        assert!(stages.closed <= stages.filtered.unwrap());
        assert!(stages.filtered.unwrap() >= stages.thresholded);
    }

    #[test]
    fn test_steep_grading_emits_single_component() {
        // Thin top walls leave gaps that closing bridges into detached voxels.
        let request = DesignRequest::with_porosity(0.7)
            .periods(3)
            .resolution(50)
            .grading_ratio(4.0);
        let result = LatticeBuilder::new(request).build().unwrap();

        assert_eq!(result.stats.components_after, 1);
        assert_eq!(result.status, GenerationStatus::Watertight);
        assert!(result.stats.porosity.closed <= result.stats.porosity.filtered.unwrap());
    }

    #[test]
    fn test_keep_floaters_skips_second_filter() {
        let result = LatticeBuilder::new(small_request().keep_floaters(true))
            .build()
            .unwrap();
        assert_eq!(result.stats.closing_removed_voxels, 0);
        assert_eq!(result.stats.removed_voxels, 0);
    }

    #[test]
    fn test_save_stl_reports_output_error() {
        let result = LatticeBuilder::new(small_request()).build().unwrap();

        let dir = tempfile::tempdir().unwrap();
        result.save_stl(&dir.path().join("gyroid.stl")).unwrap();

        let err = result
            .save_stl(&dir.path().join("missing").join("gyroid.stl"))
            .unwrap_err();
        assert!(matches!(err, LatticeError::MeshError(_)));
        assert_eq!(err.code().as_str(), "LATTICE-3001");
    }

    #[test]
    fn test_ignored_grading_reported_once() {
        let request = DesignRequest::with_thickness(0.5)
            .size(10.0)
            .periods(2)
            .resolution(20)
            .grading_ratio(2.0);
        let result = LatticeBuilder::new(request.clone()).build().unwrap();
        assert_eq!(
            result.warnings,
            vec![RequestWarning::GradingIgnored { ratio: 2.0 }]
        );
        assert!(!result.calibration.profile.is_graded());

        let report = LatticeBuilder::new(request).calibrate_only().unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(report.thickness, 0.5);
    }

    #[test]
    fn test_grid_too_large_before_allocation() {
        let err = LatticeBuilder::new(small_request())
            .max_points(1000)
            .build()
            .unwrap_err();
        assert!(matches!(err, LatticeError::GridTooLarge { .. }));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let err = LatticeBuilder::new(small_request())
            .padding(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, LatticeError::InvalidParams { name: "padding", .. }));

        let err = LatticeBuilder::new(small_request())
            .edge_precision(20)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            LatticeError::InvalidParams {
                name: "edge_precision",
                ..
            }
        ));
    }

    #[test]
    fn test_request_errors_surface_first() {
        let err = LatticeBuilder::new(DesignRequest::with_porosity(1.2))
            .max_points(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, LatticeError::InvalidPorosity { .. }));
    }

    #[test]
    fn test_status_has_mesh() {
        assert!(GenerationStatus::Watertight.has_mesh());
        assert!(GenerationStatus::SevereDefects.has_mesh());
        assert!(!GenerationStatus::NoSurface.has_mesh());
        assert!(!GenerationStatus::ZeroVolume.has_mesh());
    }
}
