use glam::Vec3;

/// Tetrahedral mesh for a soft body.
#[derive(Debug, Clone, Default)]
pub struct SoftBodyMesh {
    pub vertices: Vec<Vec3>,
    /// Positively oriented tetrahedra.
    pub tetrahedra: Vec<[u32; 4]>,
}

/// Corner offsets of a cell, indexed by `x | y << 1 | z << 2`.
const CORNERS: [[u32; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// Six tetrahedra sharing the cell diagonal 0-7.
const CELL_TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 1, 5, 7],
    [0, 2, 3, 7],
    [0, 2, 6, 7],
    [0, 4, 5, 7],
    [0, 4, 6, 7],
];

impl SoftBodyMesh {
    pub fn new(vertices: Vec<Vec3>, tetrahedra: Vec<[u32; 4]>) -> Self {
        let n = vertices.len() as u32;
        assert!(
            tetrahedra.iter().flatten().all(|&v| v < n),
            "tetrahedron vertex out of range"
        );
        let mut mesh = Self {
            vertices,
            tetrahedra,
        };
        mesh.orient();
        mesh
    }

    /// Regular block of `columns × rows × layers` cubic cells with its
    /// minimum corner at the origin.
    pub fn block(columns: u32, rows: u32, layers: u32, cell_size: f32) -> Self {
        let index = |x: u32, y: u32, z: u32| (z * (rows + 1) + y) * (columns + 1) + x;

        let mut vertices = Vec::with_capacity(((columns + 1) * (rows + 1) * (layers + 1)) as usize);
        for z in 0..=layers {
            for y in 0..=rows {
                for x in 0..=columns {
                    vertices.push(cell_size * Vec3::new(x as f32, y as f32, z as f32));
                }
            }
        }

        let mut tetrahedra = Vec::with_capacity((6 * columns * rows * layers) as usize);
        for z in 0..layers {
            for y in 0..rows {
                for x in 0..columns {
                    let corners = CORNERS.map(|[dx, dy, dz]| index(x + dx, y + dy, z + dz));
                    for tet in CELL_TETRAHEDRA {
                        tetrahedra.push(tet.map(|c| corners[c]));
                    }
                }
            }
        }

        Self::new(vertices, tetrahedra)
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    /// Signed volume of tetrahedron `index`.
    pub fn volume(&self, index: usize) -> f32 {
        let [a, b, c, d] = self.tetrahedra[index].map(|v| self.vertices[v as usize]);
        (b - a).cross(c - a).dot(d - a) / 6.0
    }

    pub fn total_volume(&self) -> f32 {
        (0..self.tetrahedra.len()).map(|i| self.volume(i)).sum()
    }

    fn orient(&mut self) {
        for i in 0..self.tetrahedra.len() {
            if self.volume(i) < 0.0 {
                self.tetrahedra[i].swap(2, 3);
            }
        }
    }
}
