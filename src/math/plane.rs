//! Planes in Hessian normal form.

use glam::Vec3;

use super::Transform;

/// The set of points `p` with `normal · p = offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self { normal, offset }
    }

    /// Plane with the given unit normal passing through `point`.
    pub fn from_point(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal,
            offset: normal.dot(point),
        }
    }

    /// Plane through three counter-clockwise points.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Self::from_point(normal, a)
    }

    /// Signed distance of `p` (positive on the normal side).
    #[inline]
    pub fn distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) - self.offset
    }

    #[inline]
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p - self.distance(p) * self.normal
    }

    /// This plane expressed in the parent frame of `xf`.
    pub fn transformed(&self, xf: &Transform) -> Plane {
        let normal = xf.transform_vector(self.normal);
        Plane {
            normal,
            offset: self.offset + normal.dot(xf.translation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_signed_distance_and_projection() {
        let plane = Plane::from_point(Vec3::Y, Vec3::new(0.0, 2.0, 0.0));
        assert!((plane.distance(Vec3::new(5.0, 3.0, -1.0)) - 1.0).abs() < 1e-6);
        let q = plane.closest_point(Vec3::new(5.0, -1.0, 2.0));
        assert!((q - Vec3::new(5.0, 2.0, 2.0)).length() < 1e-6);
    }

    #[test]
    fn test_transformed_plane_keeps_points() {
        let plane = Plane::from_points(Vec3::ZERO, Vec3::X, Vec3::Y);
        let xf = Transform::from_rotation_translation(Quat::from_rotation_x(0.4), Vec3::ONE);
        let moved = plane.transformed(&xf);
        let p = xf.transform_point(Vec3::new(0.3, 0.2, 0.0));
        assert!(moved.distance(p).abs() < 1e-5);
    }
}
