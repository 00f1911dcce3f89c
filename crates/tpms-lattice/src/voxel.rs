//! Boolean voxel solid thresholded from the gyroid field.

use tpms_mesh::tracing_ext::OperationTimer;
use tracing::info;

use crate::calibrate::ThicknessProfile;
use crate::field::{GridSpec, ScalarField};

/// Occupancy of every lattice point.
///
/// Owns its buffer; the field it was built from can be dropped afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelSolid {
    spec: GridSpec,
    cells: Vec<bool>,
}

impl VoxelSolid {
    /// All-empty solid over `spec`.
    pub fn empty(spec: GridSpec) -> Self {
        let n = spec.points_per_axis();
        Self {
            spec,
            cells: vec![false; n * n * n],
        }
    }

    /// Solid with `f(i, j, k)` at every lattice point.
    pub fn from_fn(spec: GridSpec, f: impl Fn(usize, usize, usize) -> bool) -> Self {
        let n = spec.points_per_axis();
        let mut cells = Vec::with_capacity(n * n * n);
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    cells.push(f(i, j, k));
                }
            }
        }
        Self { spec, cells }
    }

    /// Threshold `field` into the iso-band `|g| <= theta(z)`, masked to the design cube.
    ///
    /// For a graded profile the threshold follows the z coordinate of each
    /// sample, normalized by the cube size.
    pub fn from_field(field: &ScalarField, profile: &ThicknessProfile) -> Self {
        let spec = *field.spec();
        let _timer = OperationTimer::with_points("threshold_solid", spec.total_points());

        let interior = spec.interior();
        let thresholds: Vec<f64> = (0..spec.points_per_axis())
            .map(|k| profile.at(spec.coordinate(k) / spec.size))
            .collect();

        let solid = Self::from_fn(spec, |i, j, k| {
            interior.contains(&i)
                && interior.contains(&j)
                && interior.contains(&k)
                && field.get(i, j, k).abs() <= thresholds[k]
        });

        info!(
            filled = solid.filled_count(),
            porosity = solid.porosity(),
            "Thresholded solid"
        );
        solid
    }

    /// Lattice geometry.
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Occupancy in flat x-major order.
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut Vec<bool> {
        &mut self.cells
    }

    /// Occupancy at `(i, j, k)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> bool {
        self.cells[self.spec.index(i, j, k)]
    }

    /// Set occupancy at `(i, j, k)`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: bool) {
        let idx = self.spec.index(i, j, k);
        self.cells[idx] = value;
    }

    /// Number of occupied lattice points.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// True when nothing is occupied.
    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }

    /// Occupied fraction of the lattice points inside the design cube.
    pub fn volume_fraction(&self) -> f64 {
        let interior = self.spec.interior_points();
        if interior == 0 {
            return 0.0;
        }
        self.filled_count() as f64 / interior as f64
    }

    /// Void fraction of the design cube.
    pub fn porosity(&self) -> f64 {
        1.0 - self.volume_fraction()
    }
}
