//! Per-triangle surface meshes for lattice export.
//!
//! This crate holds the mesh-side half of lattice generation: the triangle
//! soup produced by surface extraction, the checks that make it usable for
//! volumetric meshing, and STL I/O.
//!
//! # Features
//!
//! - **Orientation**: Flip an inside-out mesh so its enclosed volume is positive
//! - **Certification**: Count boundary and inconsistently wound edges by position
//! - **File I/O**: Binary STL out, binary or ASCII STL in
//!
//! # Units
//!
//! Coordinates are unitless; lattice generation uses millimeters by convention.
//! Edge matching rounds corners to a fixed number of decimals (6 by default),
//! so the precision should be chosen relative to the model's scale.
//!
//! Triangle winding is **counter-clockwise (CCW) when viewed from outside**.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use tpms_mesh::{VerifyParams, certify_watertight, load_stl, orient_outward};
//!
//! let mut mesh = load_stl(Path::new("lattice.stl")).unwrap();
//! let orientation = orient_outward(&mut mesh);
//! let report = certify_watertight(&mesh, &VerifyParams::default());
//! println!("{}{}", orientation, report);
//! ```

mod error;
mod io;
mod types;
mod validate;
mod winding;

pub mod tracing_ext;

pub use error::{ErrorCode, MeshError, MeshResult, RecoverySuggestion};
pub use io::{load_stl, save_stl};
pub use types::{SurfaceMesh, Triangle};
pub use validate::{DefectSeverity, VerifyParams, WatertightReport, certify_watertight};
pub use winding::{OrientationReport, orient_outward};
