//! Tracing extensions for mesh and lattice operations.
//!
//! Provides a drop-guard timer and a few structured logging helpers shared by
//! the generation pipeline and the CLI.
//!
//! # Log Levels
//!
//! - **WARN**: Boundary edges, non-converged calibration
//! - **INFO**: Stage summaries, timing
//! - **DEBUG**: Per-iteration calibration values, intermediate mesh state
//! - **TRACE**: Detailed bounds dumps

use std::time::Instant;
use tracing::{Span, debug, info, trace};

use crate::{OrientationReport, SurfaceMesh, WatertightReport};

/// A performance timer that logs duration on drop.
///
/// ```rust,ignore
/// use tpms_mesh::tracing_ext::OperationTimer;
///
/// fn extract() {
///     let _timer = OperationTimer::new("extract_surface");
///     // ... do work ...
/// } // Timer logs duration when dropped
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    /// Create a new operation timer.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("lattice_operation", operation = name);
        debug!(target: "tpms_mesh::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Create a timer tagged with the number of lattice points being processed.
    pub fn with_points(name: &'static str, points: usize) -> Self {
        let span = tracing::info_span!("lattice_operation", operation = name, points = points);
        debug!(
            target: "tpms_mesh::timing",
            operation = name,
            points = points,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Get the elapsed time.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        let _enter = self.span.enter();
        info!(
            target: "tpms_mesh::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", elapsed_ms),
            "Operation completed"
        );
    }
}

/// Log mesh statistics at debug level.
pub fn log_mesh_stats(mesh: &SurfaceMesh, context: &str) {
    let (min_bounds, max_bounds) = mesh.bounds().unwrap_or_default();
    let dims = max_bounds - min_bounds;

    debug!(
        target: "tpms_mesh::mesh_state",
        context = context,
        triangles = mesh.triangle_count(),
        dimensions = format!("{:.2} x {:.2} x {:.2}", dims.x, dims.y, dims.z),
        "Mesh state"
    );

    trace!(
        target: "tpms_mesh::mesh_state",
        context = context,
        min_x = format!("{:.4}", min_bounds.x),
        min_y = format!("{:.4}", min_bounds.y),
        min_z = format!("{:.4}", min_bounds.z),
        max_x = format!("{:.4}", max_bounds.x),
        max_y = format!("{:.4}", max_bounds.y),
        max_z = format!("{:.4}", max_bounds.z),
        "Mesh bounds"
    );
}

/// Log the combined orientation and watertightness outcome.
pub fn log_mesh_quality(orientation: &OrientationReport, watertight: &WatertightReport) {
    info!(
        target: "tpms_mesh::validation",
        volume = format!("{:.3}", orientation.volume),
        surface_area = format!("{:.3}", orientation.surface_area),
        flipped = orientation.flipped,
        boundary_edges = watertight.boundary_edge_count,
        inconsistent_edges = watertight.inconsistent_edge_count,
        severity = %watertight.severity,
        "Mesh quality"
    );
}
