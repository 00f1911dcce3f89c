//! Core surface mesh data types.
//!
//! Meshes are stored per triangle: every triangle owns its three corner
//! positions and a unit normal, matching the binary STL layout. There is no
//! shared vertex table, so adjacency is recovered by position (see
//! [`certify_watertight`](crate::certify_watertight)).

use nalgebra::{Point3, Vector3};

/// A triangle with its own corner positions and outward unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Corner positions with counter-clockwise winding seen from outside.
    pub vertices: [Point3<f64>; 3],
    /// Unit normal; zero for degenerate triangles.
    pub normal: Vector3<f64>,
}

impl Triangle {
    /// Create a triangle and compute its normal from the winding.
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        let mut tri = Self {
            vertices: [v0, v1, v2],
            normal: Vector3::zeros(),
        };
        tri.update_normal();
        tri
    }

    /// Create a triangle from raw coordinates.
    pub fn from_coords(v0: [f64; 3], v1: [f64; 3], v2: [f64; 3]) -> Self {
        Self::new(Point3::from(v0), Point3::from(v1), Point3::from(v2))
    }

    /// Unnormalized normal (twice the area vector).
    #[inline]
    pub fn area_vector(&self) -> Vector3<f64> {
        let [v0, v1, v2] = self.vertices;
        (v1 - v0).cross(&(v2 - v0))
    }

    /// Triangle area.
    #[inline]
    pub fn area(&self) -> f64 {
        self.area_vector().norm() * 0.5
    }

    /// Recompute the unit normal from the current winding.
    pub fn update_normal(&mut self) {
        let n = self.area_vector();
        let len = n.norm();
        self.normal = if len > f64::EPSILON {
            n / len
        } else {
            Vector3::zeros()
        };
    }

    /// Reverse the winding (v0, v1, v2) -> (v2, v1, v0) and negate the normal.
    #[inline]
    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.normal = -self.normal;
    }

    /// Signed volume of the tetrahedron spanned by the origin and this triangle.
    #[inline]
    pub fn signed_volume(&self) -> f64 {
        let [v0, v1, v2] = self.vertices;
        v0.coords.dot(&v1.coords.cross(&v2.coords)) / 6.0
    }
}

/// A triangulated surface with per-triangle vertex storage.
#[derive(Debug, Clone, Default)]
pub struct SurfaceMesh {
    /// Triangles in emission order.
    pub triangles: Vec<Triangle>,
}

impl SurfaceMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Check if the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Iterate over all corner positions (three per triangle, duplicates included).
    pub fn corners(&self) -> impl Iterator<Item = &Point3<f64>> + '_ {
        self.triangles.iter().flat_map(|t| t.vertices.iter())
    }

    /// Compute the axis-aligned bounding box.
    /// Returns (min_corner, max_corner) or None if mesh is empty.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut corners = self.corners();
        let first = *corners.next()?;
        let mut min = first;
        let mut max = first;

        for p in corners {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some((min, max))
    }

    /// Signed enclosed volume (divergence theorem).
    ///
    /// Positive when normals point outward. Only meaningful for closed meshes.
    pub fn signed_volume(&self) -> f64 {
        self.triangles.iter().map(Triangle::signed_volume).sum()
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        self.triangles.iter().map(Triangle::area).sum()
    }

    /// Centroid of the enclosed volume, or None when the volume is zero.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        let mut volume = 0.0;
        let mut moment = Vector3::zeros();

        for tri in &self.triangles {
            let v = tri.signed_volume();
            let [a, b, c] = tri.vertices;
            // Centroid of tetrahedron (origin, a, b, c) is (a + b + c) / 4.
            moment += (a.coords + b.coords + c.coords) * (v / 4.0);
            volume += v;
        }

        if volume.abs() <= f64::EPSILON {
            return None;
        }

        Some(Point3::from(moment / volume))
    }

    /// Reverse the winding of every triangle.
    pub fn flip_all(&mut self) {
        for tri in &mut self.triangles {
            tri.flip();
        }
    }
}

impl FromIterator<Triangle> for SurfaceMesh {
    fn from_iter<I: IntoIterator<Item = Triangle>>(iter: I) -> Self {
        Self {
            triangles: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_meshes {
    use super::*;

    /// Closed axis-aligned cube from `min` to `min + size`, 12 triangles, outward winding.
    pub fn cube(min: [f64; 3], size: f64) -> SurfaceMesh {
        let [x0, y0, z0] = min;
        let (x1, y1, z1) = (x0 + size, y0 + size, z0 + size);
        let p = [
            [x0, y0, z0],
            [x1, y0, z0],
            [x1, y1, z0],
            [x0, y1, z0],
            [x0, y0, z1],
            [x1, y0, z1],
            [x1, y1, z1],
            [x0, y1, z1],
        ];
        let faces = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 7, 6],
            [3, 6, 2],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];

        faces
            .iter()
            .map(|&[a, b, c]| Triangle::from_coords(p[a], p[b], p[c]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_meshes::cube;
    use super::*;

    #[test]
    fn test_triangle_normal() {
        let tri = Triangle::from_coords([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert!((tri.normal - Vector3::z()).norm() < 1e-12);
        assert!((tri.area() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_triangle_has_zero_normal() {
        let tri = Triangle::from_coords([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        assert_eq!(tri.normal, Vector3::zeros());
    }

    #[test]
    fn test_flip_reverses_winding() {
        let mut tri = Triangle::from_coords([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        tri.flip();
        assert_eq!(tri.vertices[0], Point3::new(0.0, 1.0, 0.0));
        assert_eq!(tri.vertices[2], Point3::origin());
        assert!((tri.normal + Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_cube_volume_and_area() {
        let mesh = cube([0.0, 0.0, 0.0], 2.0);
        assert_eq!(mesh.triangle_count(), 12);
        assert!((mesh.signed_volume() - 8.0).abs() < 1e-10);
        assert!((mesh.surface_area() - 24.0).abs() < 1e-10);
    }

    #[test]
    fn test_cube_centroid() {
        let mesh = cube([1.0, 2.0, 3.0], 2.0);
        let c = mesh.centroid().unwrap();
        assert!((c - Point3::new(2.0, 3.0, 4.0)).norm() < 1e-10);
    }

    #[test]
    fn test_flip_all_negates_volume() {
        let mut mesh = cube([0.0, 0.0, 0.0], 1.0);
        mesh.flip_all();
        assert!((mesh.signed_volume() + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_bounds() {
        let mesh = cube([-1.0, 0.0, 1.0], 3.0);
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(-1.0, 0.0, 1.0));
        assert_eq!(max, Point3::new(2.0, 3.0, 4.0));
        assert!(SurfaceMesh::new().bounds().is_none());
    }
}
