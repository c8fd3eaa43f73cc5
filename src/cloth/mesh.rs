//! Triangle meshes used to build cloth.

use glam::Vec3;

#[derive(Debug, Clone, Default)]
pub struct ClothMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl ClothMesh {
    /// # Panics
    ///
    /// Panics if a triangle references a missing vertex.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        let n = vertices.len() as u32;
        assert!(
            triangles.iter().flatten().all(|&v| v < n),
            "cloth triangle references a missing vertex"
        );
        Self {
            vertices,
            triangles,
        }
    }

    /// A `columns × rows` grid of quads in the XZ plane centered at the
    /// origin, two triangles per quad, wound so the normals face +Y.
    pub fn rectangle(columns: u32, rows: u32, cell_size: f32) -> Self {
        assert!(columns > 0 && rows > 0);
        let half_x = 0.5 * columns as f32 * cell_size;
        let half_z = 0.5 * rows as f32 * cell_size;

        let mut vertices = Vec::with_capacity(((columns + 1) * (rows + 1)) as usize);
        for j in 0..=rows {
            for i in 0..=columns {
                vertices.push(Vec3::new(
                    i as f32 * cell_size - half_x,
                    0.0,
                    j as f32 * cell_size - half_z,
                ));
            }
        }

        let index = |i: u32, j: u32| i + j * (columns + 1);
        let mut triangles = Vec::with_capacity((2 * columns * rows) as usize);
        for j in 0..rows {
            for i in 0..columns {
                let v1 = index(i, j);
                let v2 = index(i + 1, j);
                let v3 = index(i + 1, j + 1);
                let v4 = index(i, j + 1);
                triangles.push([v1, v3, v2]);
                triangles.push([v1, v4, v3]);
            }
        }

        Self {
            vertices,
            triangles,
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    pub fn triangle_normal(&self, triangle: usize) -> Vec3 {
        let [a, b, c] = self.triangles[triangle].map(|v| self.vertices[v as usize]);
        (b - a).cross(c - a).normalize_or_zero()
    }

    /// Unique undirected edges, each with its lower vertex index first.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut edges: Vec<[u32; 2]> = self
            .triangles
            .iter()
            .flat_map(|t| [[t[0], t[1]], [t[1], t[2]], [t[2], t[0]]])
            .map(|[a, b]| [a.min(b), a.max(b)])
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_counts() {
        let mesh = ClothMesh::rectangle(3, 2, 0.5);
        assert_eq!(mesh.vertices.len(), 12);
        assert_eq!(mesh.triangles.len(), 12);
        // 3×3 horizontal + 4×2 vertical + 6 diagonals.
        assert_eq!(mesh.edges().len(), 9 + 8 + 6);
    }

    #[test]
    fn test_rectangle_faces_up() {
        let mesh = ClothMesh::rectangle(2, 2, 1.0);
        for t in 0..mesh.triangles.len() {
            assert!((mesh.triangle_normal(t) - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    #[should_panic]
    fn test_bad_index() {
        ClothMesh::new(vec![Vec3::ZERO], vec![[0, 1, 2]]);
    }
}
