//! Sutherland–Hodgman clipping of incident polygons against the side planes
//! of a reference face.

use glam::Vec3;

use crate::collision::Hull;
use crate::math::{Plane, Transform};

/// A polygon vertex with a key identifying the features that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex {
    pub position: Vec3,
    pub key: u32,
}

impl ClipVertex {
    pub fn new(position: Vec3, key: u32) -> Self {
        Self { position, key }
    }
}

/// Key of a vertex created where the edge `a -> b` crosses a clip plane.
fn crossing_key(plane_key: u32, a: u32, b: u32) -> u32 {
    0x8000_0000 | (plane_key & 0x7fff) << 16 | (a & 0xff) << 8 | (b & 0xff)
}

fn lerp(a: &ClipVertex, b: &ClipVertex, da: f32, db: f32, plane_key: u32) -> ClipVertex {
    let t = da / (da - db);
    ClipVertex::new(
        a.position + t * (b.position - a.position),
        crossing_key(plane_key, a.key, b.key),
    )
}

/// Keep the part of a segment behind `plane`.
pub fn clip_segment(segment: &[ClipVertex; 2], plane: &Plane, plane_key: u32) -> Vec<ClipVertex> {
    let [a, b] = segment;
    let da = plane.distance(a.position);
    let db = plane.distance(b.position);

    match (da <= 0.0, db <= 0.0) {
        (true, true) => vec![*a, *b],
        (true, false) => vec![*a, lerp(a, b, da, db, plane_key)],
        (false, true) => vec![lerp(a, b, da, db, plane_key), *b],
        (false, false) => Vec::new(),
    }
}

/// Keep the part of a polygon behind `plane`.
///
/// Two-vertex input is treated as an open segment, one vertex as a point.
pub fn clip_polygon(polygon: &[ClipVertex], plane: &Plane, plane_key: u32) -> Vec<ClipVertex> {
    match polygon {
        [] => Vec::new(),
        [p] => {
            if plane.distance(p.position) <= 0.0 {
                vec![*p]
            } else {
                Vec::new()
            }
        }
        [a, b] => clip_segment(&[*a, *b], plane, plane_key),
        _ => {
            let mut out = Vec::with_capacity(polygon.len() + 1);
            let n = polygon.len();
            for i in 0..n {
                let a = &polygon[i];
                let b = &polygon[(i + 1) % n];
                let da = plane.distance(a.position);
                let db = plane.distance(b.position);
                if da <= 0.0 {
                    out.push(*a);
                }
                if (da <= 0.0) != (db <= 0.0) {
                    out.push(lerp(a, b, da, db, plane_key));
                }
            }
            out
        }
    }
}

/// Clip an incident polygon (world space) against the side planes of a
/// reference hull face.
pub fn clip_against_face(
    hull: &Hull,
    xf: &Transform,
    face: usize,
    incident: &[ClipVertex],
) -> Vec<ClipVertex> {
    let normal = xf.transform_vector(hull.plane(face).normal);
    let begin = hull.faces[face].edge;

    let mut polygon = incident.to_vec();
    let mut index = begin;
    loop {
        let edge = hull.edge(index as usize);
        let next = hull.edge(edge.next as usize);
        let p = xf.transform_point(hull.vertex(edge.origin as usize));
        let q = xf.transform_point(hull.vertex(next.origin as usize));

        let side = (q - p).cross(normal).normalize_or_zero();
        polygon = clip_polygon(&polygon, &Plane::from_point(side, p), index);
        if polygon.is_empty() {
            break;
        }

        index = edge.next;
        if index == begin {
            break;
        }
    }
    polygon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(half: f32, z: f32) -> Vec<ClipVertex> {
        [(-half, -half), (half, -half), (half, half), (-half, half)]
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| ClipVertex::new(Vec3::new(x, y, z), i as u32))
            .collect()
    }

    #[test]
    fn test_clip_polygon_half() {
        let plane = Plane::new(Vec3::X, 0.0);
        let out = clip_polygon(&square(1.0, 0.0), &plane, 7);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|v| v.position.x <= 1e-6));
        // Two original vertices survive with their keys.
        assert_eq!(out.iter().filter(|v| v.key < 4).count(), 2);
    }

    #[test]
    fn test_clip_segment() {
        let plane = Plane::new(Vec3::X, 0.5);
        let seg = [
            ClipVertex::new(Vec3::new(-1.0, 0.0, 0.0), 0),
            ClipVertex::new(Vec3::new(1.0, 0.0, 0.0), 1),
        ];
        let out = clip_segment(&seg, &plane, 3);
        assert_eq!(out.len(), 2);
        assert!((out[1].position.x - 0.5).abs() < 1e-6);
        assert_ne!(out[1].key, 1);
    }

    #[test]
    fn test_clip_fully_outside() {
        let plane = Plane::new(Vec3::X, -2.0);
        assert!(clip_polygon(&square(1.0, 0.0), &plane, 0).is_empty());
    }

    #[test]
    fn test_clip_against_box_face() {
        let hull = Hull::cuboid(Vec3::ONE);
        // Larger square slightly above the +z face.
        let incident = square(2.0, 1.1);
        let out = clip_against_face(&hull, &Transform::IDENTITY, 4, &incident);
        assert_eq!(out.len(), 4);
        for v in &out {
            assert!(v.position.x.abs() <= 1.0 + 1e-5);
            assert!(v.position.y.abs() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn test_clip_keys_stable() {
        let hull = Hull::cuboid(Vec3::ONE);
        let a = clip_against_face(&hull, &Transform::IDENTITY, 4, &square(2.0, 1.1));
        let b = clip_against_face(&hull, &Transform::IDENTITY, 4, &square(2.0, 1.05));
        let ka: Vec<u32> = a.iter().map(|v| v.key).collect();
        let kb: Vec<u32> = b.iter().map(|v| v.key).collect();
        assert_eq!(ka, kb);
    }
}
