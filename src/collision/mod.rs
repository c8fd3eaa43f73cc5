//! Geometric queries: bounds, the GJK distance engine, the broad phase,
//! half-edge hulls, polygon clipping and signed distance fields.

pub mod aabb;
pub mod broadphase;
pub mod clip;
pub mod gjk;
pub mod hull;
pub mod sdf;

pub use aabb::Aabb;
pub use broadphase::{BroadPhase, DynamicTree, ProxyId};
pub use gjk::{feature_pair, gjk, gjk_distance, FeaturePair, GjkOutput, GjkProxy, SimplexCache};
pub use hull::Hull;
pub use sdf::Sdf;

use glam::Vec3;

/// A segment query `p1 + t (p2 - p1)` with `t ∈ [0, max_fraction]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastInput {
    pub p1: Vec3,
    pub p2: Vec3,
    pub max_fraction: f32,
}

impl RayCastInput {
    pub fn new(p1: Vec3, p2: Vec3) -> Self {
        Self {
            p1,
            p2,
            max_fraction: 1.0,
        }
    }

    /// Point at parameter `fraction` along the segment.
    #[inline]
    pub fn point_at(&self, fraction: f32) -> Vec3 {
        self.p1 + fraction * (self.p2 - self.p1)
    }
}

/// A ray hit: the fraction along the input segment and the surface normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastOutput {
    pub fraction: f32,
    pub normal: Vec3,
}
