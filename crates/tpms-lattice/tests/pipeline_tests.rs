//! End-to-end tests of the lattice pipeline.

use tpms_lattice::{
    CalibrationParams, DesignRequest, GenerationStatus, GridSpec, LatticeBuilder, LatticeError,
    ThicknessProfile, VoxelSolid, calibrate, count_components, evaluate_gyroid,
    generate_lattice, keep_largest_component, measure_porosity,
};
use tpms_mesh::{VerifyParams, certify_watertight, load_stl, save_stl};

fn small_request(porosity: f64) -> DesignRequest {
    DesignRequest::with_porosity(porosity)
        .size(10.0)
        .periods(2)
        .resolution(30)
}

#[test]
fn test_calibration_hits_target_at_full_resolution() {
    let request = DesignRequest::with_porosity(0.70).periods(3).resolution(100);
    let report = calibrate(&request, &CalibrationParams::default()).unwrap();

    assert!(report.converged);
    assert!(
        (0.68..=0.72).contains(&report.achieved_porosity),
        "achieved {}",
        report.achieved_porosity
    );
}

#[test]
fn test_thicker_walls_never_raise_porosity() {
    let field = evaluate_gyroid(&GridSpec::unpadded(25.0, 3, 60)).unwrap();
    let thin = measure_porosity(&field, 0.2);
    let thick = measure_porosity(&field, 0.6);
    assert!(thick <= thin);
    assert!(thin < 1.0);
}

#[test]
fn test_explicit_thickness_measures_porosity() {
    let request = DesignRequest::with_thickness(0.6).size(10.0).periods(2).resolution(30);
    let report = calibrate(&request, &CalibrationParams::default()).unwrap();
    assert_eq!(report.iterations, 0);
    assert_eq!(report.target_porosity, None);
    assert_eq!(report.thickness, 0.6);
    assert!(report.achieved_porosity > 0.0 && report.achieved_porosity < 1.0);
}

#[test]
fn test_grading_preserves_average() {
    let request = small_request(0.7).grading_ratio(2.0);
    let report = calibrate(&request, &CalibrationParams::default()).unwrap();

    let profile = report.profile;
    assert!(profile.is_graded());
    assert!((profile.bottom() / profile.top() - 2.0).abs() < 1e-12);
    assert!(((profile.bottom() + profile.top()) / 2.0 - report.thickness).abs() < 1e-12);
}

#[test]
fn test_component_filter_leaves_one_component() {
    let spec = GridSpec::new(10.0, 2, 30, 3);
    let field = evaluate_gyroid(&spec).unwrap();

    // Thin walls fragment at the cube faces.
    let mut solid = VoxelSolid::from_field(&field, &ThicknessProfile::Uniform(0.1));
    let before = count_components(&solid);
    let report = keep_largest_component(&mut solid);

    assert_eq!(report.component_count, before);
    assert_eq!(count_components(&solid), 1);
    assert_eq!(solid.filled_count(), report.largest_size);
}

#[test]
fn test_generated_lattice_is_watertight_and_inside_cube() {
    let result = generate_lattice(&small_request(0.7)).unwrap();

    assert_eq!(result.status, GenerationStatus::Watertight);
    let watertight = result.stats.watertight.as_ref().unwrap();
    assert_eq!(watertight.boundary_edge_count, 0);
    assert_eq!(watertight.inconsistent_edge_count, 0);

    let orientation = result.stats.orientation.as_ref().unwrap();
    assert!(orientation.volume > 0.0);
    assert!(orientation.volume < 1000.0);

    let (min, max) = result.mesh.bounds().unwrap();
    for axis in 0..3 {
        assert!(min[axis] >= 0.0);
        assert!(max[axis] <= 10.0);
    }
}

#[test]
fn test_reported_porosity_matches_final_solid() {
    let result = generate_lattice(&small_request(0.7)).unwrap();
    let stages = result.stats.porosity;

    assert_eq!(result.achieved_porosity(), stages.closed);
    assert!(stages.closed <= stages.filtered.unwrap());
    // Closing only fills pinholes; the solid stays near its calibrated porosity.
    assert!((stages.closed - result.calibration.achieved_porosity).abs() < 0.1);
}

#[test]
fn test_pipeline_is_deterministic() {
    let request = small_request(0.6).grading_ratio(1.5);
    let first = generate_lattice(&request).unwrap();
    let second = generate_lattice(&request).unwrap();

    assert_eq!(first.stats.triangle_count, second.stats.triangle_count);
    assert_eq!(first.stats.vertex_count, second.stats.vertex_count);
    assert_eq!(first.boundary_edge_count(), second.boundary_edge_count());
    assert_eq!(first.calibration.thickness, second.calibration.thickness);
    assert_eq!(first.mesh.triangles, second.mesh.triangles);
}

#[test]
fn test_coarse_lattice_does_not_crash() {
    let request = DesignRequest::with_porosity(0.7).periods(8).resolution(20);
    let result = generate_lattice(&request).unwrap();

    assert!(result.status.has_mesh() || result.status == GenerationStatus::NoSurface);
    if result.status.has_mesh() {
        assert!(result.stats.orientation.as_ref().unwrap().volume > 0.0);
    }
}

#[test]
fn test_keep_floaters_skips_filtering() {
    let request = small_request(0.8).keep_floaters(true);
    let result = generate_lattice(&request).unwrap();
    assert_eq!(result.stats.porosity.filtered, None);
    assert_eq!(result.stats.removed_voxels, 0);
}

#[test]
fn test_target_errors_before_computation() {
    assert!(matches!(
        DesignRequest::from_options(Some(0.7), Some(0.5)),
        Err(LatticeError::BothTargetsGiven)
    ));
    assert!(matches!(
        DesignRequest::from_options(None, None),
        Err(LatticeError::NoTargetGiven)
    ));
    assert!(matches!(
        generate_lattice(&DesignRequest::with_porosity(1.0)),
        Err(LatticeError::InvalidPorosity { .. })
    ));
}

#[test]
fn test_grid_too_large() {
    let request = DesignRequest::with_porosity(0.7).resolution(2000);
    let err = LatticeBuilder::new(request).build().unwrap_err();
    assert!(matches!(err, LatticeError::GridTooLarge { .. }));
    assert!(err.code().as_str().starts_with("LATTICE-2"));
}

#[test]
fn test_stl_roundtrip_stays_watertight() {
    let result = generate_lattice(&small_request(0.7)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gyroid.stl");
    save_stl(&result.mesh, &path).unwrap();

    let loaded = load_stl(&path).unwrap();
    assert_eq!(loaded.triangle_count(), result.mesh.triangle_count());

    // Binary STL stores f32, so compare at a coarser precision.
    let report = certify_watertight(&loaded, &VerifyParams::with_precision(4));
    assert!(report.is_watertight());
}
