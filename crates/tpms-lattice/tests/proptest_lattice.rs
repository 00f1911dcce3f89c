//! Property-based tests for voxel cleanup and surface extraction.

use proptest::prelude::*;
use tpms_lattice::{
    GridSpec, ThicknessProfile, VoxelSolid, close_holes, count_components, extract_surface,
    keep_largest_component,
};
use tpms_mesh::{VerifyParams, certify_watertight};

const N: usize = 8;

/// Random occupancy of the interior of an 8^3 lattice with one layer of padding.
fn random_solid() -> impl Strategy<Value = VoxelSolid> {
    prop::collection::vec(any::<bool>(), (N - 2) * (N - 2) * (N - 2)).prop_map(|bits| {
        let spec = GridSpec::new(6.0, 1, N - 2, 1);
        VoxelSolid::from_fn(spec, |i, j, k| {
            let inner = 1..N - 1;
            inner.contains(&i)
                && inner.contains(&j)
                && inner.contains(&k)
                && bits[((i - 1) * (N - 2) + (j - 1)) * (N - 2) + (k - 1)]
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn extracted_surface_is_closed_and_outward(solid in random_solid()) {
        prop_assume!(!solid.is_empty());
        let surface = extract_surface(&solid).unwrap();
        let report = certify_watertight(&surface.mesh, &VerifyParams::default());

        prop_assert_eq!(report.boundary_edge_count, 0);
        prop_assert_eq!(report.inconsistent_edge_count, 0);
        prop_assert!(surface.mesh.signed_volume() > 0.0);
    }

    #[test]
    fn filtering_leaves_single_component(mut solid in random_solid()) {
        prop_assume!(!solid.is_empty());
        let filled = solid.filled_count();
        let report = keep_largest_component(&mut solid);

        prop_assert_eq!(count_components(&solid), 1);
        prop_assert_eq!(solid.filled_count(), report.largest_size);
        prop_assert_eq!(filled - report.removed_voxels, report.largest_size);
    }

    #[test]
    fn closing_never_removes_material(solid in random_solid(), iterations in 0usize..3) {
        let mut closed = solid.clone();
        let report = close_holes(&mut closed, iterations);

        for (before, after) in solid.cells().iter().zip(closed.cells()) {
            prop_assert!(!*before || *after);
        }
        prop_assert_eq!(closed.filled_count(), solid.filled_count() + report.added_voxels);
    }

    #[test]
    fn thicker_profile_never_raises_porosity(a in 0.05f64..1.4, b in 0.05f64..1.4) {
        let (thin, thick) = if a <= b { (a, b) } else { (b, a) };
        let spec = GridSpec::new(5.0, 1, 12, 1);
        let field = tpms_lattice::evaluate_gyroid(&spec).unwrap();

        let thin_solid = VoxelSolid::from_field(&field, &ThicknessProfile::Uniform(thin));
        let thick_solid = VoxelSolid::from_field(&field, &ThicknessProfile::Uniform(thick));
        prop_assert!(thick_solid.porosity() <= thin_solid.porosity());
    }
}
