//! ECS components read by the rigid contact manager.
//!
//! Colliders pair with a [`Transform`](crate::math::Transform) component on
//! the same entity.

use crate::shapes::Shape;

/// Rigid body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Affected by forces and collisions.
    Dynamic,
    /// Immovable.
    Static,
    /// Position controlled by user, but affects dynamic bodies.
    Kinematic,
}

/// Collision shape of an entity.
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: Shape,
    pub body_type: RigidBodyType,
    /// Friction coefficient (0.0 - 1.0).
    pub friction: f32,
    /// If true, the collider is found by queries but never gets contacts.
    pub is_sensor: bool,
}

impl Collider {
    pub fn new(shape: Shape, body_type: RigidBodyType) -> Self {
        Self {
            shape,
            body_type,
            friction: 0.5,
            is_sensor: false,
        }
    }

    pub fn new_dynamic(shape: Shape) -> Self {
        Self::new(shape, RigidBodyType::Dynamic)
    }

    pub fn new_static(shape: Shape) -> Self {
        Self::new(shape, RigidBodyType::Static)
    }

    pub fn new_kinematic(shape: Shape) -> Self {
        Self::new(shape, RigidBodyType::Kinematic)
    }

    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    pub fn is_dynamic(&self) -> bool {
        self.body_type == RigidBodyType::Dynamic
    }
}
