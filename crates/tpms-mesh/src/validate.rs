//! Watertightness certification for per-triangle meshes.
//!
//! Triangles do not share a vertex table, so edges are matched by position:
//! every corner is rounded to a fixed number of decimals and each undirected
//! edge is keyed by its pair of rounded corners. A closed, consistently
//! oriented 2-manifold has every edge traversed exactly twice, once in each
//! direction.
//!
//! Rounding trades two failure modes against each other. Too few decimals can
//! merge genuinely distinct corners (hiding a real boundary edge); too many can
//! split corners that are the same point computed along different paths
//! (reporting a spurious boundary edge). The precision is therefore a parameter.

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::SurfaceMesh;

/// Corner position rounded to a fixed number of decimals.
type CornerKey = [i64; 3];

/// Parameters for [`certify_watertight`].
#[derive(Debug, Clone, Copy)]
pub struct VerifyParams {
    /// Decimal places kept when matching corners.
    pub precision: u32,
    /// Boundary-edge count below which defects are considered minor.
    pub minor_defect_limit: usize,
}

impl Default for VerifyParams {
    fn default() -> Self {
        Self {
            precision: 6,
            minor_defect_limit: 100,
        }
    }
}

impl VerifyParams {
    /// Params with a specific corner rounding precision.
    pub fn with_precision(precision: u32) -> Self {
        Self {
            precision,
            ..Self::default()
        }
    }
}

/// Graded watertightness outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefectSeverity {
    /// Every edge is shared by exactly two triangles.
    Watertight,
    /// A few boundary edges; usually acceptable for volumetric meshing.
    Minor,
    /// Many boundary edges; regenerate at a higher resolution.
    Severe,
}

impl std::fmt::Display for DefectSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefectSeverity::Watertight => write!(f, "watertight"),
            DefectSeverity::Minor => write!(f, "minor defects"),
            DefectSeverity::Severe => write!(f, "severe defects"),
        }
    }
}

/// Watertightness certificate for a mesh.
#[derive(Debug, Clone)]
pub struct WatertightReport {
    /// Number of distinct undirected edges.
    pub edge_count: usize,
    /// Edges not shared by exactly two triangles.
    pub boundary_edge_count: usize,
    /// Edges shared by two triangles that traverse them in the same direction.
    pub inconsistent_edge_count: usize,
    /// Precision used to match corners.
    pub precision: u32,
    /// Graded result.
    pub severity: DefectSeverity,
}

impl WatertightReport {
    /// Check if the mesh has no boundary edges.
    pub fn is_watertight(&self) -> bool {
        self.boundary_edge_count == 0
    }

    /// Check if every shared edge is traversed in opposite directions.
    pub fn is_consistently_oriented(&self) -> bool {
        self.inconsistent_edge_count == 0
    }
}

impl std::fmt::Display for WatertightReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Watertightness ({} decimals):", self.precision)?;
        writeln!(f, "  Edges: {}", self.edge_count)?;
        writeln!(f, "  Boundary edges: {}", self.boundary_edge_count)?;
        writeln!(f, "  Inconsistent edges: {}", self.inconsistent_edge_count)?;
        writeln!(f, "  Result: {}", self.severity)
    }
}

#[derive(Default, Clone, Copy)]
struct EdgeUse {
    count: u32,
    // Traversals running from the smaller key to the larger one.
    forward: u32,
}

fn corner_key(p: &nalgebra::Point3<f64>, scale: f64) -> CornerKey {
    [
        (p.x * scale).round() as i64,
        (p.y * scale).round() as i64,
        (p.z * scale).round() as i64,
    ]
}

/// Certify that every edge of `mesh` is shared by exactly two triangles.
///
/// Returns the number of boundary edges rather than failing: zero is success,
/// a count below `params.minor_defect_limit` is a soft warning, anything above
/// means the caller should increase resolution.
pub fn certify_watertight(mesh: &SurfaceMesh, params: &VerifyParams) -> WatertightReport {
    let scale = 10f64.powi(params.precision as i32);
    let mut edges: HashMap<(CornerKey, CornerKey), EdgeUse> =
        HashMap::with_capacity(mesh.triangle_count() * 3 / 2);

    for tri in &mesh.triangles {
        let keys = tri.vertices.map(|p| corner_key(&p, scale));
        for i in 0..3 {
            let a = keys[i];
            let b = keys[(i + 1) % 3];
            let (key, forward) = if a <= b { ((a, b), true) } else { ((b, a), false) };
            let entry = edges.entry(key).or_default();
            entry.count += 1;
            if forward {
                entry.forward += 1;
            }
        }
    }

    let mut boundary_edge_count = 0;
    let mut inconsistent_edge_count = 0;
    for edge in edges.values() {
        if edge.count != 2 {
            boundary_edge_count += 1;
        } else if edge.forward != 1 {
            inconsistent_edge_count += 1;
        }
    }

    let severity = match boundary_edge_count {
        0 => DefectSeverity::Watertight,
        n if n < params.minor_defect_limit => DefectSeverity::Minor,
        _ => DefectSeverity::Severe,
    };

    match severity {
        DefectSeverity::Watertight => info!(edges = edges.len(), "Mesh is watertight"),
        DefectSeverity::Minor => warn!(
            boundary_edges = boundary_edge_count,
            "Boundary edges detected (small number, should be okay for meshing)"
        ),
        DefectSeverity::Severe => warn!(
            boundary_edges = boundary_edge_count,
            "Boundary edges detected (try increasing resolution)"
        ),
    }

    if inconsistent_edge_count > 0 {
        debug!(
            inconsistent_edges = inconsistent_edge_count,
            "Shared edges with matching traversal direction"
        );
    }

    WatertightReport {
        edge_count: edges.len(),
        boundary_edge_count,
        inconsistent_edge_count,
        precision: params.precision,
        severity,
    }
}
