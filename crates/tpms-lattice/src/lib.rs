//! Gyroid lattice generation for porous scaffolds.
//!
//! Turns a design request (cube size, unit cells, porosity or wall thickness,
//! optional bottom-to-top grading) into a watertight, outward-oriented
//! triangle surface ready for volumetric meshing.
//!
//! # Pipeline
//!
//! 1. **Field**: sample `sin x cos y + sin y cos z + sin z cos x` on a padded lattice
//! 2. **Calibration**: bisect the wall thickness until the porosity matches the target
//! 3. **Thresholding**: keep the band `|g| <= theta(z)` inside the design cube
//! 4. **Cleanup**: drop floating regions, then close pinholes
//! 5. **Extraction**: contour the solid at 0.5 with marching tetrahedra
//! 6. **Certification**: orient outward and count unmatched edges
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use tpms_lattice::{DesignRequest, GenerationStatus, generate_lattice};
//!
//! let request = DesignRequest::with_porosity(0.7).size(25.0).periods(3);
//! let result = generate_lattice(&request).unwrap();
//!
//! if result.status == GenerationStatus::Watertight {
//!     tpms_mesh::save_stl(&result.mesh, Path::new("gyroid.stl")).unwrap();
//! }
//! ```
//!
//! # Features
//!
//! - `design-config`: load and save designs as TOML with [`DesignConfig`]

mod builder;
mod calibrate;
#[cfg(feature = "design-config")]
mod config;
mod error;
mod extract;
mod field;
mod request;
mod topology;
mod voxel;

pub use builder::{
    GenerationParams, GenerationStats, GenerationStatus, LatticeBuildResult, LatticeBuilder,
    MAX_EDGE_PRECISION, PorosityStages, generate_lattice,
};
pub use calibrate::{
    CalibrationParams, CalibrationReport, CalibrationSample, ThicknessProfile, calibrate,
    calibrate_thickness, measure_porosity,
};
#[cfg(feature = "design-config")]
pub use config::{DesignConfig, DesignConfigError, DesignSection, TuningSection};
pub use error::{LatticeError, LatticeErrorCode, LatticeRecoverySuggestion, LatticeResult};
pub use extract::{ExtractedSurface, extract_surface};
pub use field::{GridSpec, ScalarField, evaluate_gyroid};
pub use request::{
    DEFAULT_PERIODS, DEFAULT_RESOLUTION, DEFAULT_SIZE, DesignRequest, DesignTarget, MAX_THICKNESS,
    RequestWarning,
};
pub use topology::{
    ClosingReport, ComponentFilterReport, close_holes, count_components, keep_largest_component,
};
pub use voxel::VoxelSolid;
