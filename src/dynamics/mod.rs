//! Rigid colliders stored as `hecs` entities.
//!
//! The [`RigidContactManager`] owns the broad phase and the convex contacts
//! between entities carrying a [`Collider`] and a
//! [`Transform`](crate::math::Transform).

pub mod components;
pub mod contact_manager;

pub use components::{Collider, RigidBodyType};
pub use contact_manager::{RigidContact, RigidContactManager};
