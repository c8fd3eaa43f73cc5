//! Contact objects and the storage that keeps them alive across steps.
//!
//! Every contact variant lives in its own [`BlockPool`] and is threaded on
//! an intrusive [`List`] owned by the domain's contact manager.

pub mod capsule_capsule;
pub mod convex;
pub mod list;
pub mod manifold;
pub mod pool;
pub mod sphere_shape;
pub mod sphere_triangle;

pub use capsule_capsule::CapsuleCapsuleContact;
pub use convex::{collide, ConvexContact};
pub use list::{Linked, Links, List};
pub use manifold::{Manifold, ManifoldPoint, MAX_MANIFOLD_POINTS};
pub use pool::{BlockPool, Handle};
pub use sphere_shape::SphereShapeContact;
pub use sphere_triangle::SphereTriangleContact;
