//! Iso-surface extraction from the voxel solid.
//!
//! The solid is read as a 0/1 field and contoured at 0.5. Every lattice cell
//! is split into the six tetrahedra that share its main diagonal, and each
//! tetrahedron is contoured on its own (marching tetrahedra). Neighbouring
//! cells split their shared face along the same diagonal, so the triangles
//! meet edge to edge and the surface is closed wherever the solid stays
//! inside the lattice.
//!
//! Crossing vertices sit at lattice-edge midpoints and are shared per edge.
//! Orientation tests run on doubled lattice indices, so they are exact.

use hashbrown::HashMap;
use nalgebra::Point3;
use tpms_mesh::tracing_ext::{OperationTimer, log_mesh_stats};
use tpms_mesh::{SurfaceMesh, Triangle};
use tracing::info;

use crate::error::{LatticeError, LatticeResult};
use crate::voxel::VoxelSolid;

/// Cell corner offsets; bit `c` of the cell mask is corner `c`.
const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// The six tetrahedra of a cell, one per axis ordering, as corner indices.
/// Each walks from corner 0 to corner 6 one axis step at a time.
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 2, 6], // x, y, z
    [0, 1, 5, 6], // x, z, y
    [0, 3, 2, 6], // y, x, z
    [0, 3, 7, 6], // y, z, x
    [0, 4, 5, 6], // z, x, y
    [0, 4, 7, 6], // z, y, x
];

/// Triangulated boundary of a voxel solid.
#[derive(Debug, Clone)]
pub struct ExtractedSurface {
    /// Triangles, each with its own corners and outward normal.
    pub mesh: SurfaceMesh,
    /// Distinct vertices (crossed lattice edges) before per-triangle expansion.
    pub vertex_count: usize,
}

type Lattice = [i64; 3];

/// Vertex table keyed by the lattice edge a vertex sits on.
struct EdgeVertices {
    index: HashMap<(usize, usize), u32>,
    // Doubled lattice coordinates (sum of both edge endpoints).
    doubled: Vec<Lattice>,
}

impl EdgeVertices {
    fn vertex(&mut self, a: (usize, Lattice), b: (usize, Lattice)) -> u32 {
        let key = if a.0 < b.0 { (a.0, b.0) } else { (b.0, a.0) };
        let doubled = &mut self.doubled;
        *self.index.entry(key).or_insert_with(|| {
            doubled.push([a.1[0] + b.1[0], a.1[1] + b.1[1], a.1[2] + b.1[2]]);
            (doubled.len() - 1) as u32
        })
    }
}

fn sub(a: Lattice, b: Lattice) -> Lattice {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: Lattice, b: Lattice) -> Lattice {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: Lattice, b: Lattice) -> i64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Wind `tri` so its normal has a positive component along `outward`.
fn orient(tri: [u32; 3], doubled: &[Lattice], outward: Lattice) -> [u32; 3] {
    let [p0, p1, p2] = tri.map(|v| doubled[v as usize]);
    let normal = cross(sub(p1, p0), sub(p2, p0));
    if dot(normal, outward) < 0 {
        [tri[0], tri[2], tri[1]]
    } else {
        tri
    }
}

/// Contour the 0/1 solid at 0.5.
///
/// Vertices are shifted by the padding offset so the design cube starts at
/// the origin, then clamped into `[0, size]`. Clamping only moves vertices
/// on edges that leave the cube, and it moves them monotonically per axis,
/// so no triangle folds over.
///
/// # Errors
///
/// Returns `EmptyIsosurface` when no cell contains both solid and void.
pub fn extract_surface(solid: &VoxelSolid) -> LatticeResult<ExtractedSurface> {
    let spec = *solid.spec();
    let n = spec.points_per_axis();
    let _timer = OperationTimer::with_points("extract_surface", spec.total_points());

    let mut vertices = EdgeVertices {
        index: HashMap::new(),
        doubled: Vec::new(),
    };
    let mut faces: Vec<[u32; 3]> = Vec::new();

    for i in 0..n - 1 {
        for j in 0..n - 1 {
            for k in 0..n - 1 {
                let mut mask = 0u8;
                for (c, [dx, dy, dz]) in CORNERS.iter().enumerate() {
                    if solid.get(i + dx, j + dy, k + dz) {
                        mask |= 1 << c;
                    }
                }
                if mask == 0 || mask == 0xFF {
                    continue;
                }

                let corner = |c: usize| {
                    let [dx, dy, dz] = CORNERS[c];
                    let (x, y, z) = (i + dx, j + dy, k + dz);
                    (spec.index(x, y, z), [x as i64, y as i64, z as i64])
                };

                for tet in &TETRAHEDRA {
                    let mut inside = [0usize; 4];
                    let mut outside = [0usize; 4];
                    let (mut n_in, mut n_out) = (0, 0);
                    for &c in tet {
                        if mask & (1 << c) != 0 {
                            inside[n_in] = c;
                            n_in += 1;
                        } else {
                            outside[n_out] = c;
                            n_out += 1;
                        }
                    }
                    if n_in == 0 || n_out == 0 {
                        continue;
                    }

                    // Points from solid to void, scaled by n_in * n_out.
                    let mut outward = [0i64; 3];
                    for &c in &outside[..n_out] {
                        let p = corner(c).1;
                        for a in 0..3 {
                            outward[a] += n_in as i64 * p[a];
                        }
                    }
                    for &c in &inside[..n_in] {
                        let p = corner(c).1;
                        for a in 0..3 {
                            outward[a] -= n_out as i64 * p[a];
                        }
                    }

                    let mut edge = |a: usize, b: usize| vertices.vertex(corner(a), corner(b));
                    match n_in {
                        1 => {
                            let a = inside[0];
                            let tri = [edge(a, outside[0]), edge(a, outside[1]), edge(a, outside[2])];
                            faces.push(orient(tri, &vertices.doubled, outward));
                        }
                        3 => {
                            let a = outside[0];
                            let tri = [edge(a, inside[0]), edge(a, inside[1]), edge(a, inside[2])];
                            faces.push(orient(tri, &vertices.doubled, outward));
                        }
                        _ => {
                            // Quad around the cycle AC, AD, BD, BC.
                            let (a, b) = (inside[0], inside[1]);
                            let (c, d) = (outside[0], outside[1]);
                            let ac = edge(a, c);
                            let ad = edge(a, d);
                            let bd = edge(b, d);
                            let bc = edge(b, c);
                            faces.push(orient([ac, ad, bd], &vertices.doubled, outward));
                            faces.push(orient([ac, bd, bc], &vertices.doubled, outward));
                        }
                    }
                }
            }
        }
    }

    if faces.is_empty() {
        return Err(LatticeError::EmptyIsosurface);
    }

    let positions: Vec<Point3<f64>> = vertices
        .doubled
        .iter()
        .map(|d| {
            let coord = |v: i64| spec.half_coordinate(v as usize).clamp(0.0, spec.size);
            Point3::new(coord(d[0]), coord(d[1]), coord(d[2]))
        })
        .collect();

    let mesh: SurfaceMesh = faces
        .iter()
        .map(|f| {
            Triangle::new(
                positions[f[0] as usize],
                positions[f[1] as usize],
                positions[f[2] as usize],
            )
        })
        .collect();

    info!(
        vertices = positions.len(),
        triangles = mesh.triangle_count(),
        "Extracted surface"
    );
    log_mesh_stats(&mesh, "extract_surface");

    Ok(ExtractedSurface {
        vertex_count: positions.len(),
        mesh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::GridSpec;
    use tpms_mesh::{VerifyParams, certify_watertight};

    #[test]
    fn test_single_voxel() {
        let spec = GridSpec::new(4.0, 1, 4, 1);
        let solid = VoxelSolid::from_fn(spec, |i, j, k| (i, j, k) == (2, 2, 2));
        let surface = extract_surface(&solid).unwrap();

        // One triangle per incident tetrahedron, one vertex per incident edge.
        assert_eq!(surface.mesh.triangle_count(), 24);
        assert_eq!(surface.vertex_count, 14);

        let report = certify_watertight(&surface.mesh, &VerifyParams::default());
        assert!(report.is_watertight());
        assert!(report.is_consistently_oriented());

        let h = spec.spacing();
        assert!((surface.mesh.signed_volume() - 0.5 * h * h * h).abs() < 1e-9);
    }

    #[test]
    fn test_block_is_closed_and_outward() {
        let spec = GridSpec::new(10.0, 1, 10, 2);
        let solid = VoxelSolid::from_fn(spec, |i, j, k| {
            (4..=8).contains(&i) && (3..=7).contains(&j) && (5..=9).contains(&k)
        });
        let surface = extract_surface(&solid).unwrap();

        let report = certify_watertight(&surface.mesh, &VerifyParams::default());
        assert_eq!(report.boundary_edge_count, 0);
        assert_eq!(report.inconsistent_edge_count, 0);
        assert!(surface.mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_full_cube_is_clamped() {
        let spec = GridSpec::new(5.0, 1, 8, 3);
        let interior = spec.interior();
        let solid = VoxelSolid::from_fn(spec, |i, j, k| {
            interior.contains(&i) && interior.contains(&j) && interior.contains(&k)
        });
        let surface = extract_surface(&solid).unwrap();

        let (min, max) = surface.mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(5.0, 5.0, 5.0));

        let report = certify_watertight(&surface.mesh, &VerifyParams::default());
        assert!(report.is_watertight());
        assert!(report.is_consistently_oriented());

        // Chamfered along the cube edges, never larger than the cube.
        let volume = surface.mesh.signed_volume();
        assert!(volume <= 125.0 + 1e-9);
        assert!(volume > 0.8 * 125.0);
    }

    #[test]
    fn test_empty_solid() {
        let solid = VoxelSolid::empty(GridSpec::new(1.0, 1, 4, 1));
        assert!(matches!(
            extract_surface(&solid),
            Err(LatticeError::EmptyIsosurface)
        ));
    }

    #[test]
    fn test_diagonal_voxels_share_the_cell_diagonal() {
        // Two voxels touching along the (1, 1, 1) diagonal form one closed surface.
        let spec = GridSpec::new(6.0, 1, 6, 1);
        let solid =
            VoxelSolid::from_fn(spec, |i, j, k| (i, j, k) == (3, 3, 3) || (i, j, k) == (4, 4, 4));
        let surface = extract_surface(&solid).unwrap();
        let report = certify_watertight(&surface.mesh, &VerifyParams::default());
        assert!(report.is_watertight());
        assert!(report.is_consistently_oriented());
        assert!(surface.mesh.signed_volume() > 0.0);
    }
}
