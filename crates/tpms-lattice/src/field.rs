//! Gyroid field evaluation on a padded cubic lattice.
//!
//! The lattice has `resolution + 2 * padding` points per axis spanning
//! `[-pad, size + pad]` with `pad = padding * size / resolution`. With zero
//! padding this is the plain `resolution`-point sampling of `[0, size]` used
//! for calibration.
//!
//! Samples are stored flat, x-major: index `(i * n + j) * n + k` for x, y, z
//! indices `i`, `j`, `k`.

use std::f64::consts::PI;
use std::ops::Range;

use rayon::prelude::*;
use tpms_mesh::tracing_ext::OperationTimer;
use tracing::debug;

use crate::error::{LatticeError, LatticeResult};

/// Geometry of a cubic sampling lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    /// Design cube edge length.
    pub size: f64,
    /// Unit cells per axis.
    pub periods: u32,
    /// Samples per axis over the design cube.
    pub resolution: usize,
    /// Extra samples on each side of the cube.
    pub padding: usize,
}

impl GridSpec {
    /// Padded lattice.
    pub fn new(size: f64, periods: u32, resolution: usize, padding: usize) -> Self {
        Self {
            size,
            periods,
            resolution,
            padding,
        }
    }

    /// Unpadded lattice used for porosity calibration.
    pub fn unpadded(size: f64, periods: u32, resolution: usize) -> Self {
        Self::new(size, periods, resolution, 0)
    }

    /// Check size, periods and resolution.
    pub fn validate(&self) -> LatticeResult<()> {
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
        Ok(())
    }

    /// Points per axis including padding.
    #[inline]
    pub fn points_per_axis(&self) -> usize {
        self.resolution + 2 * self.padding
    }

    /// Total lattice points, saturating on overflow.
    pub fn total_points(&self) -> usize {
        self.points_per_axis().saturating_pow(3)
    }

    /// Physical width of the padding on each side.
    #[inline]
    pub fn pad_offset(&self) -> f64 {
        self.padding as f64 * self.size / self.resolution as f64
    }

    /// Distance between neighbouring samples, identical on every axis.
    #[inline]
    pub fn spacing(&self) -> f64 {
        (self.size + 2.0 * self.pad_offset()) / (self.points_per_axis() - 1) as f64
    }

    /// Coordinate of lattice index `i` along any axis.
    #[inline]
    pub fn coordinate(&self, i: usize) -> f64 {
        i as f64 * self.spacing() - self.pad_offset()
    }

    /// Coordinate of a half-integer lattice position `half / 2`.
    #[inline]
    pub fn half_coordinate(&self, half: usize) -> f64 {
        half as f64 * 0.5 * self.spacing() - self.pad_offset()
    }

    /// Indices whose coordinates lie inside `[0, size]`.
    ///
    /// The padding band is slightly narrower than `padding` spacings, so the
    /// first `padding` samples fall just below zero and the next
    /// `resolution` samples fall inside the cube.
    #[inline]
    pub fn interior(&self) -> Range<usize> {
        self.padding..self.padding + self.resolution
    }

    /// Number of lattice points inside the design cube.
    pub fn interior_points(&self) -> usize {
        self.resolution.pow(3)
    }

    /// Gyroid wave number `2 pi periods / size`.
    #[inline]
    pub fn wave_number(&self) -> f64 {
        2.0 * PI * self.periods as f64 / self.size
    }

    /// Flat index of `(i, j, k)`.
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        let n = self.points_per_axis();
        (i * n + j) * n + k
    }
}

/// Gyroid values sampled on a [`GridSpec`].
#[derive(Debug, Clone)]
pub struct ScalarField {
    spec: GridSpec,
    values: Vec<f64>,
}

impl ScalarField {
    /// Lattice geometry.
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// All samples in flat x-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sample at `(i, j, k)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.values[self.spec.index(i, j, k)]
    }
}

/// Evaluate `sin(kx)cos(ky) + sin(ky)cos(kz) + sin(kz)cos(kx)` on the lattice.
///
/// Pure and deterministic: every sample depends only on its own index, so the
/// x-slabs are filled in parallel without affecting the result.
///
/// # Errors
///
/// Returns a request error for a non-positive size, zero periods, or fewer
/// than two samples per axis.
pub fn evaluate_gyroid(spec: &GridSpec) -> LatticeResult<ScalarField> {
    spec.validate()?;

    let n = spec.points_per_axis();
    let _timer = OperationTimer::with_points("evaluate_gyroid", spec.total_points());

    // The field is separable per axis; only n sines and n cosines are needed.
    let k = spec.wave_number();
    let (sin, cos): (Vec<f64>, Vec<f64>) = (0..n)
        .map(|i| {
            let phase = k * spec.coordinate(i);
            (phase.sin(), phase.cos())
        })
        .unzip();

    let mut values = vec![0.0; n * n * n];
    values
        .par_chunks_mut(n * n)
        .enumerate()
        .for_each(|(i, slab)| {
            let (sx, cx) = (sin[i], cos[i]);
            for j in 0..n {
                let (sy, cy) = (sin[j], cos[j]);
                let row = &mut slab[j * n..(j + 1) * n];
                for (kz, value) in row.iter_mut().enumerate() {
                    let (sz, cz) = (sin[kz], cos[kz]);
                    *value = sx * cy + sy * cz + sz * cx;
                }
            }
        });

    debug!(
        points_per_axis = n,
        spacing = spec.spacing(),
        pad_offset = spec.pad_offset(),
        "Gyroid field evaluated"
    );

    Ok(ScalarField {
        spec: *spec,
        values,
    })
}
