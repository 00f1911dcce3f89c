//! Outward orientation via the sign of the enclosed volume.

use nalgebra::Point3;
use tracing::{debug, info};

use crate::SurfaceMesh;

/// Outcome of [`orient_outward`].
#[derive(Debug, Clone)]
pub struct OrientationReport {
    /// Signed volume before any correction.
    pub signed_volume_before: f64,
    /// Whether every triangle's winding was reversed.
    pub flipped: bool,
    /// Enclosed volume after correction (non-negative).
    pub volume: f64,
    /// Centroid of the enclosed volume, if the volume is non-zero.
    pub centroid: Option<Point3<f64>>,
    /// Total surface area.
    pub surface_area: f64,
}

impl OrientationReport {
    /// True when the enclosed volume is zero (within `epsilon`).
    pub fn is_zero_volume(&self, epsilon: f64) -> bool {
        self.volume <= epsilon
    }
}

impl std::fmt::Display for OrientationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Orientation:")?;
        writeln!(
            f,
            "  Volume: {:.3} (signed before correction: {:.3})",
            self.volume, self.signed_volume_before
        )?;
        if let Some(c) = &self.centroid {
            writeln!(f, "  Centroid: [{:.3}, {:.3}, {:.3}]", c.x, c.y, c.z)?;
        }
        writeln!(f, "  Surface area: {:.3}", self.surface_area)?;
        writeln!(
            f,
            "  Winding: {}",
            if self.flipped { "reversed" } else { "unchanged" }
        )
    }
}

/// Make the mesh's normals point outward.
///
/// Computes the signed enclosed volume; if it is negative every triangle is
/// reversed and the volume and centroid are recomputed from the corrected mesh.
/// After this call the signed volume of `mesh` is never negative.
pub fn orient_outward(mesh: &mut SurfaceMesh) -> OrientationReport {
    let signed_volume_before = mesh.signed_volume();
    let flipped = signed_volume_before < 0.0;

    if flipped {
        info!(
            volume = signed_volume_before,
            triangles = mesh.triangle_count(),
            "Fixing inverted normals"
        );
        mesh.flip_all();
    }

    let volume = mesh.signed_volume();
    let centroid = mesh.centroid();
    let surface_area = mesh.surface_area();

    debug!(volume, ?centroid, surface_area, flipped, "Orientation complete");

    OrientationReport {
        signed_volume_before,
        flipped,
        volume: volume.max(0.0),
        centroid,
        surface_area,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_meshes::cube;

    #[test]
    fn test_correct_cube_unchanged() {
        let mut mesh = cube([0.0, 0.0, 0.0], 2.0);
        let before = mesh.clone();
        let report = orient_outward(&mut mesh);

        assert!(!report.flipped);
        assert!((report.volume - 8.0).abs() < 1e-10);
        assert_eq!(mesh.triangles, before.triangles);
    }

    #[test]
    fn test_inverted_cube_is_flipped() {
        let mut mesh = cube([0.0, 0.0, 0.0], 2.0);
        mesh.flip_all();
        assert!(mesh.signed_volume() < 0.0);

        let report = orient_outward(&mut mesh);

        assert!(report.flipped);
        assert!((report.signed_volume_before + 8.0).abs() < 1e-10);
        assert!((report.volume - 8.0).abs() < 1e-10);
        assert!(mesh.signed_volume() > 0.0);

        let centroid = report.centroid.unwrap();
        assert!((centroid - Point3::new(1.0, 1.0, 1.0)).norm() < 1e-10);

        // Bottom face normal points down again after correction.
        let bottom = &mesh.triangles[0];
        assert!(bottom.normal.z < -0.99);
    }

    #[test]
    fn test_empty_mesh() {
        let mut mesh = SurfaceMesh::new();
        let report = orient_outward(&mut mesh);
        assert!(!report.flipped);
        assert!(report.is_zero_volume(1e-12));
        assert!(report.centroid.is_none());
    }
}
