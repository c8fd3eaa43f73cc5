//! rein collision core
//!
//! Collision detection and contact bookkeeping for rigid bodies, cloth and
//! soft bodies.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **math** - Rigid transforms and planes on top of `glam`
//! 2. **collision** - Bounds, GJK with simplex caching, the dynamic tree broad
//!    phase, half-edge hulls, polygon clipping and signed distance fields
//! 3. **shapes** - Sphere, capsule, hull and SDF shapes and their queries
//! 4. **sparse** - 3×3 block vectors and matrices backed by a per-step arena
//! 5. **contact** - Block pools, intrusive lists, manifolds and contact kinds
//! 6. **dynamics** - Rigid contacts between `hecs` entities (feature = "ecs")
//! 7. **cloth** - Mass-spring cloth with an implicit solver and self contacts
//! 8. **softbody** - Tetrahedral soft bodies against world shapes

pub mod cloth;
pub mod collision;
pub mod config;
pub mod contact;
pub mod error;
pub mod math;
pub mod shapes;
pub mod softbody;
pub mod sparse;

#[cfg(feature = "ecs")]
pub mod dynamics;

// Re-export commonly used types
pub use collision::{Aabb, BroadPhase, GjkOutput, GjkProxy, Hull, RayCastInput, Sdf, SimplexCache};

pub use config::{
    BroadPhaseConfig, ClothConfig, CollisionConfig, GjkConfig, PoolConfig, SoftBodyConfig,
};

pub use contact::{BlockPool, Handle, Manifold, ManifoldPoint};

pub use error::SdfError;

pub use math::Transform;

pub use shapes::{Shape, WorldShape};

pub use sparse::{DenseVec3, DiagMat33, FrameArena, SparseMat33};

#[cfg(feature = "ecs")]
pub use dynamics::{Collider, RigidBodyType, RigidContactManager};

// Re-export glam for convenience
pub use glam;
