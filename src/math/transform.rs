//! Rigid transform (rotation + translation).

use std::ops::Mul;

use glam::{Mat3, Quat, Vec3};

/// A rigid transform mapping local points into a parent frame:
/// `p' = rotation * p + translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub rotation: Mat3,
    pub translation: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rotation: Mat3::IDENTITY,
        translation: Vec3::ZERO,
    };

    pub fn new(rotation: Mat3, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a pure translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            rotation: Mat3::IDENTITY,
            translation,
        }
    }

    /// Create a transform from a unit quaternion and a translation.
    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        Self {
            rotation: Mat3::from_quat(rotation),
            translation,
        }
    }

    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    #[inline]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    /// Map a parent-frame point into the local frame.
    #[inline]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.transpose() * (p - self.translation)
    }

    #[inline]
    pub fn inverse_transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation.transpose() * v
    }

    /// `self⁻¹ * other`: express `other` in the frame of `self`.
    pub fn inv_mul(&self, other: &Transform) -> Transform {
        let rt = self.rotation.transpose();
        Transform {
            rotation: rt * other.rotation,
            translation: rt * (other.translation - self.translation),
        }
    }

    pub fn inverse(&self) -> Transform {
        let rt = self.rotation.transpose();
        Transform {
            rotation: rt,
            translation: -(rt * self.translation),
        }
    }
}

/// `a * b` applies `b` first, then `a`.
impl Mul for Transform {
    type Output = Transform;

    fn mul(self, other: Transform) -> Transform {
        Transform {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
