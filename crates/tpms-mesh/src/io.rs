//! Binary STL reading and writing.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use tracing::{debug, info};

use crate::error::{MeshError, MeshResult};
use crate::{SurfaceMesh, Triangle};

/// Save a mesh as binary STL: one normal and three corners per triangle.
pub fn save_stl(mesh: &SurfaceMesh, path: &Path) -> MeshResult<()> {
    info!("Saving mesh to {:?}", path);

    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles
        .iter()
        .map(|tri| {
            let [v0, v1, v2] = tri.vertices;
            let n = tri.normal;
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [
                    stl_io::Vertex::new([v0.x as f32, v0.y as f32, v0.z as f32]),
                    stl_io::Vertex::new([v1.x as f32, v1.y as f32, v1.z as f32]),
                    stl_io::Vertex::new([v2.x as f32, v2.y as f32, v2.z as f32]),
                ],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter())
        .map_err(|e| MeshError::io_write(path, std::io::Error::other(e.to_string())))?;

    writer.flush().map_err(|e| MeshError::io_write(path, e))?;

    info!("Saved {} triangles to {:?}", mesh.triangle_count(), path);

    Ok(())
}

/// Load a binary or ASCII STL into per-triangle form.
///
/// Stored normals are ignored and recomputed from the winding.
pub fn load_stl(path: &Path) -> MeshResult<SurfaceMesh> {
    let file = File::open(path).map_err(|e| MeshError::io_read(path, e))?;
    let mut reader = BufReader::new(file);

    let stl = stl_io::read_stl(&mut reader)
        .map_err(|e| MeshError::parse_error(path, e.to_string()))?;

    debug!(
        "STL contains {} vertices, {} triangles",
        stl.vertices.len(),
        stl.faces.len()
    );

    // stl_io::Vertex is Vector<f32> with .0 being [f32; 3]
    let corner = |i: usize| {
        let v = &stl.vertices[i];
        Point3::new(v.0[0] as f64, v.0[1] as f64, v.0[2] as f64)
    };

    let mesh: SurfaceMesh = stl
        .faces
        .iter()
        .map(|face| {
            let [a, b, c] = face.vertices;
            Triangle::new(corner(a), corner(b), corner(c))
        })
        .collect();

    if mesh.is_empty() {
        return Err(MeshError::empty_mesh(format!(
            "{} contains no triangles",
            path.display()
        )));
    }

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_meshes::cube;
    use crate::{VerifyParams, certify_watertight};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_save_and_reload_cube() {
        let mesh = cube([0.0, 0.0, 0.0], 10.0);
        let file = NamedTempFile::with_suffix(".stl").unwrap();
        save_stl(&mesh, file.path()).expect("should save");

        let reloaded = load_stl(file.path()).expect("should reload");
        assert_eq!(reloaded.triangle_count(), 12);
        assert!((reloaded.signed_volume() - 1000.0).abs() < 1e-3);

        let report = certify_watertight(&reloaded, &VerifyParams::default());
        assert!(report.is_watertight());
    }

    #[test]
    fn test_binary_layout_size() {
        let mesh = cube([0.0, 0.0, 0.0], 1.0);
        let file = NamedTempFile::with_suffix(".stl").unwrap();
        save_stl(&mesh, file.path()).unwrap();

        // 80-byte header + u32 count + 50 bytes per triangle.
        let len = std::fs::metadata(file.path()).unwrap().len();
        assert_eq!(len, 84 + 50 * 12);
    }

    #[test]
    fn test_load_ascii_stl() {
        let mut file = NamedTempFile::with_suffix(".stl").unwrap();
        writeln!(file, "solid test").unwrap();
        writeln!(file, "  facet normal 0 0 1").unwrap();
        writeln!(file, "    outer loop").unwrap();
        writeln!(file, "      vertex 0 0 0").unwrap();
        writeln!(file, "      vertex 10 0 0").unwrap();
        writeln!(file, "      vertex 0 10 0").unwrap();
        writeln!(file, "    endloop").unwrap();
        writeln!(file, "  endfacet").unwrap();
        writeln!(file, "endsolid test").unwrap();
        file.flush().unwrap();

        let mesh = load_stl(file.path()).expect("should load");
        assert_eq!(mesh.triangle_count(), 1);
        assert!((mesh.triangles[0].normal.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_stl(Path::new("/nonexistent/lattice.stl")).unwrap_err();
        assert!(matches!(err, MeshError::IoRead { .. }));
    }
}
