//! Half-edge convex polyhedra.

use std::collections::HashMap;

use glam::Vec3;

use crate::math::Plane;

/// A directed edge of a face loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    /// Start vertex.
    pub origin: u32,
    /// Opposite half-edge on the neighbouring face.
    pub twin: u32,
    /// Next half-edge around the same face.
    pub next: u32,
    pub face: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HullFace {
    /// Any half-edge of the face loop.
    pub edge: u32,
}

/// A closed convex polyhedron with counter-clockwise (outward) faces.
#[derive(Debug, Clone)]
pub struct Hull {
    pub vertices: Vec<Vec3>,
    pub edges: Vec<HalfEdge>,
    pub faces: Vec<HullFace>,
    /// One outward plane per face.
    pub planes: Vec<Plane>,
    /// Average of the vertices; lies inside the hull.
    pub centroid: Vec3,
}

impl Hull {
    /// Box centered at the origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let faces: [&[u32]; 6] = [
            &[1, 2, 6, 5],
            &[0, 4, 7, 3],
            &[3, 7, 6, 2],
            &[0, 1, 5, 4],
            &[4, 5, 6, 7],
            &[0, 3, 2, 1],
        ];
        Self::from_polygons(vertices, &faces)
    }

    /// Build a hull from its vertices and counter-clockwise face loops.
    ///
    /// # Panics
    ///
    /// Panics with fewer than four vertices, a face with fewer than three
    /// vertices, or an edge without an opposite twin (open surface).
    pub fn from_polygons(vertices: Vec<Vec3>, faces: &[&[u32]]) -> Self {
        assert!(vertices.len() >= 4, "a hull needs at least four vertices");

        let mut edges = Vec::new();
        let mut hull_faces = Vec::with_capacity(faces.len());
        let mut planes = Vec::with_capacity(faces.len());
        let mut by_endpoints = HashMap::new();

        for (face_index, face) in faces.iter().enumerate() {
            assert!(face.len() >= 3, "face {face_index} has fewer than three vertices");
            let first = edges.len() as u32;
            let n = face.len() as u32;

            for (k, &origin) in face.iter().enumerate() {
                assert!((origin as usize) < vertices.len());
                let k = k as u32;
                let dest = face[((k + 1) % n) as usize];
                let index = first + k;
                edges.push(HalfEdge {
                    origin,
                    twin: u32::MAX,
                    next: first + (k + 1) % n,
                    face: face_index as u32,
                });
                let duplicate = by_endpoints.insert((origin, dest), index);
                assert!(duplicate.is_none(), "edge {origin}->{dest} appears twice");
            }

            hull_faces.push(HullFace { edge: first });
            planes.push(polygon_plane(&vertices, face));
        }

        // Twins: the opposite of origin->dest is dest->origin.
        let ends: Vec<(u32, u32)> = edges
            .iter()
            .map(|e| (e.origin, edges_origin(&edges, e.next)))
            .collect();
        for (edge, &(origin, dest)) in edges.iter_mut().zip(ends.iter()) {
            match by_endpoints.get(&(dest, origin)) {
                Some(&twin) => edge.twin = twin,
                None => panic!("edge {origin}->{dest} has no twin"),
            }
        }

        let centroid = vertices.iter().copied().sum::<Vec3>() / vertices.len() as f32;

        Self {
            vertices,
            edges,
            faces: hull_faces,
            planes,
            centroid,
        }
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Vec3 {
        self.vertices[index]
    }

    #[inline]
    pub fn edge(&self, index: usize) -> &HalfEdge {
        &self.edges[index]
    }

    #[inline]
    pub fn plane(&self, face: usize) -> &Plane {
        &self.planes[face]
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Vertex indices of a face in loop order.
    pub fn face_vertices(&self, face: usize) -> FaceVertices<'_> {
        let begin = self.faces[face].edge;
        FaceVertices {
            hull: self,
            begin,
            current: Some(begin),
        }
    }

    /// Face vertex positions in loop order.
    pub fn face_polygon(&self, face: usize) -> Vec<Vec3> {
        self.face_vertices(face)
            .map(|v| self.vertices[v as usize])
            .collect()
    }

    /// Vertex furthest along `direction`.
    pub fn support_index(&self, direction: Vec3) -> usize {
        let mut best = 0;
        let mut best_dot = f32::MIN;
        for (i, v) in self.vertices.iter().enumerate() {
            let d = v.dot(direction);
            if d > best_dot {
                best = i;
                best_dot = d;
            }
        }
        best
    }

    /// Face whose normal is most aligned with `direction`.
    pub fn support_face(&self, direction: Vec3) -> usize {
        let mut best = 0;
        let mut best_dot = f32::MIN;
        for (i, plane) in self.planes.iter().enumerate() {
            let d = plane.normal.dot(direction);
            if d > best_dot {
                best = i;
                best_dot = d;
            }
        }
        best
    }

    /// Check the half-edge links and that every vertex lies behind every
    /// face plane.
    pub fn validate(&self) {
        for (i, edge) in self.edges.iter().enumerate() {
            let twin = &self.edges[edge.twin as usize];
            assert_eq!(twin.twin as usize, i);
            assert_ne!(twin.face, edge.face);
            assert_eq!(self.edges[edge.next as usize].face, edge.face);
            // The twin starts where this edge ends.
            assert_eq!(twin.origin, self.edges[edge.next as usize].origin);
        }
        for plane in &self.planes {
            for v in &self.vertices {
                assert!(plane.distance(*v) <= 1.0e-4);
            }
        }
    }
}

fn edges_origin(edges: &[HalfEdge], index: u32) -> u32 {
    edges[index as usize].origin
}

/// Newell normal of a polygon and the plane through its vertex average.
fn polygon_plane(vertices: &[Vec3], face: &[u32]) -> Plane {
    let mut normal = Vec3::ZERO;
    let mut center = Vec3::ZERO;
    for (k, &i) in face.iter().enumerate() {
        let v1 = vertices[i as usize];
        let v2 = vertices[face[(k + 1) % face.len()] as usize];
        normal += v1.cross(v2);
        center += v1;
    }
    center /= face.len() as f32;
    Plane::from_point(normal.normalize_or_zero(), center)
}

/// Iterator over the vertex indices of one hull face.
pub struct FaceVertices<'a> {
    hull: &'a Hull,
    begin: u32,
    current: Option<u32>,
}

impl Iterator for FaceVertices<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let index = self.current?;
        let edge = &self.hull.edges[index as usize];
        self.current = (edge.next != self.begin).then_some(edge.next);
        Some(edge.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Hull {
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let faces: [&[u32]; 4] = [&[0, 2, 1], &[0, 1, 3], &[0, 3, 2], &[1, 2, 3]];
        Hull::from_polygons(vertices, &faces)
    }

    #[test]
    fn test_cuboid_topology() {
        let hull = Hull::cuboid(Vec3::ONE);
        assert_eq!(hull.vertices.len(), 8);
        assert_eq!(hull.edges.len(), 24);
        assert_eq!(hull.face_count(), 6);
        hull.validate();
    }

    #[test]
    fn test_cuboid_planes_face_outward() {
        let hull = Hull::cuboid(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(hull.plane(0).normal, Vec3::X);
        assert!((hull.plane(0).offset - 1.0).abs() < 1e-6);
        assert_eq!(hull.plane(2).normal, Vec3::Y);
        assert!((hull.plane(2).offset - 2.0).abs() < 1e-6);
        assert_eq!(hull.plane(5).normal, -Vec3::Z);
        assert!((hull.plane(5).offset - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_tetrahedron() {
        let hull = tetrahedron();
        hull.validate();
        assert_eq!(hull.edges.len(), 12);
        let slanted = hull.plane(3);
        let expected = Vec3::ONE.normalize();
        assert!((slanted.normal - expected).length() < 1e-6);
    }

    #[test]
    fn test_face_vertices_loop() {
        let hull = Hull::cuboid(Vec3::ONE);
        let verts: Vec<u32> = hull.face_vertices(0).collect();
        assert_eq!(verts, vec![1, 2, 6, 5]);
        assert_eq!(hull.face_polygon(4).len(), 4);
    }

    #[test]
    fn test_supports() {
        let hull = Hull::cuboid(Vec3::ONE);
        assert_eq!(hull.support_index(Vec3::new(1.0, 1.0, 1.0)), 6);
        assert_eq!(hull.support_face(Vec3::new(0.1, -1.0, 0.0)), 3);
    }

    #[test]
    #[should_panic]
    fn test_open_surface_rejected() {
        let vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        let faces: [&[u32]; 2] = [&[0, 2, 1], &[0, 1, 3]];
        let _ = Hull::from_polygons(vertices, &faces);
    }
}
