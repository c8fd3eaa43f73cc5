//! Math support built on `glam`: rigid transforms, planes and a few
//! matrix helpers used by mass and inertia computations.

pub mod plane;
pub mod transform;

pub use plane::Plane;
pub use transform::Transform;

use glam::{Mat3, Vec3};

/// Tolerance used to guard divisions and near-degenerate geometry.
pub const EPSILON: f32 = f32::EPSILON;

/// Scalar triple product `a · (b × c)`.
#[inline]
pub fn det(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    a.dot(b.cross(c))
}

/// Parallel-axis (Steiner) matrix `(v·v)·I − v·vᵀ`.
///
/// `m * steiner(c)` shifts an inertia tensor by the offset `c`.
#[inline]
pub fn steiner(v: Vec3) -> Mat3 {
    let xx = v.x * v.x;
    let yy = v.y * v.y;
    let zz = v.z * v.z;
    let xy = v.x * v.y;
    let xz = v.x * v.z;
    let yz = v.y * v.z;
    Mat3::from_cols(
        Vec3::new(yy + zz, -xy, -xz),
        Vec3::new(-xy, xx + zz, -yz),
        Vec3::new(-xz, -yz, xx + yy),
    )
}

/// Outer product `a·bᵀ`.
#[inline]
pub fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Rotation taking the +Y axis onto `axis` (normalised).
pub fn rotation_from_y(axis: Vec3) -> Mat3 {
    let y = axis.normalize_or_zero();
    if y == Vec3::ZERO {
        return Mat3::IDENTITY;
    }
    let x = y.any_orthonormal_vector();
    let z = x.cross(y);
    Mat3::from_cols(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steiner_matches_definition() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let expected = Mat3::IDENTITY * v.dot(v) - outer(v, v);
        let s = steiner(v);
        for (a, b) in s.to_cols_array().iter().zip(expected.to_cols_array().iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_det_unit_axes() {
        assert!((det(Vec3::X, Vec3::Y, Vec3::Z) - 1.0).abs() < 1e-6);
        assert!((det(Vec3::Y, Vec3::X, Vec3::Z) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_from_y_maps_axis() {
        let axis = Vec3::new(1.0, 1.0, 0.0).normalize();
        let r = rotation_from_y(axis);
        assert!((r * Vec3::Y - axis).length() < 1e-5);
        assert!((r.determinant() - 1.0).abs() < 1e-4);
    }
}
