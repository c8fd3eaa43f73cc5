//! Collision shapes and their queries.
//!
//! [`Shape`] is a closed set of shape kinds. Every kind answers the same
//! queries: mass properties, world bounds, segment casts and sphere tests.
//! Convex kinds also expose a [`GjkProxy`]; distance fields do not and never
//! take part in convex pairings.

pub mod capsule;
pub mod hull;
pub mod sdf;
pub mod sphere;

pub use capsule::CapsuleShape;
pub use hull::HullShape;
pub use sdf::SdfShape;
pub use sphere::SphereShape;

use std::sync::Arc;

use glam::{Mat3, Vec3};

use crate::collision::{Aabb, GjkProxy, Hull, RayCastInput, RayCastOutput, Sdf};
use crate::math::Transform;

/// Mass, center of mass and inertia about the shape origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassData {
    pub mass: f32,
    pub center: Vec3,
    pub inertia: Mat3,
}

/// A world-space query sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Contact between a shape and a query sphere: a point on the shape surface
/// and the unit normal pointing from the shape towards the sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestSphereOutput {
    pub point: Vec3,
    pub normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Sphere,
    Capsule,
    Hull,
    Sdf,
}

#[derive(Debug, Clone)]
pub enum Shape {
    Sphere(SphereShape),
    Capsule(CapsuleShape),
    Hull(HullShape),
    Sdf(SdfShape),
}

impl Shape {
    pub fn sphere(radius: f32) -> Self {
        Shape::Sphere(SphereShape::new(Vec3::ZERO, radius))
    }

    pub fn capsule(vertex1: Vec3, vertex2: Vec3, radius: f32) -> Self {
        Shape::Capsule(CapsuleShape::new(vertex1, vertex2, radius))
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Shape::Hull(HullShape::cuboid(half_extents))
    }

    pub fn hull(hull: Arc<Hull>, radius: f32) -> Self {
        Shape::Hull(HullShape::new(hull, radius))
    }

    pub fn sdf(sdf: Arc<Sdf>, radius: f32) -> Self {
        Shape::Sdf(SdfShape::new(sdf, radius))
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere(_) => ShapeKind::Sphere,
            Shape::Capsule(_) => ShapeKind::Capsule,
            Shape::Hull(_) => ShapeKind::Hull,
            Shape::Sdf(_) => ShapeKind::Sdf,
        }
    }

    /// Skin radius.
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Sphere(s) => s.radius,
            Shape::Capsule(s) => s.radius,
            Shape::Hull(s) => s.radius,
            Shape::Sdf(s) => s.radius,
        }
    }

    pub fn is_convex(&self) -> bool {
        !matches!(self, Shape::Sdf(_))
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            Shape::Sphere(s) => s.compute_mass(density),
            Shape::Capsule(s) => s.compute_mass(density),
            Shape::Hull(s) => s.compute_mass(density),
            Shape::Sdf(s) => s.compute_mass(density),
        }
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        match self {
            Shape::Sphere(s) => s.compute_aabb(xf),
            Shape::Capsule(s) => s.compute_aabb(xf),
            Shape::Hull(s) => s.compute_aabb(xf),
            Shape::Sdf(s) => s.compute_aabb(xf),
        }
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        match self {
            Shape::Sphere(s) => s.ray_cast(input, xf),
            Shape::Capsule(s) => s.ray_cast(input, xf),
            Shape::Hull(s) => s.ray_cast(input, xf),
            Shape::Sdf(s) => s.ray_cast(input, xf),
        }
    }

    pub fn test_sphere(&self, sphere: &Sphere, xf: &Transform) -> Option<TestSphereOutput> {
        match self {
            Shape::Sphere(s) => s.test_sphere(sphere, xf),
            Shape::Capsule(s) => s.test_sphere(sphere, xf),
            Shape::Hull(s) => s.test_sphere(sphere, xf),
            Shape::Sdf(s) => s.test_sphere(sphere, xf),
        }
    }

    /// Boolean overlap with a query sphere.
    pub fn overlaps_sphere(&self, sphere: &Sphere, xf: &Transform) -> bool {
        match self {
            Shape::Hull(s) => s.overlaps_sphere(sphere, xf),
            Shape::Sdf(s) => s.overlaps_sphere(sphere, xf),
            _ => self.test_sphere(sphere, xf).is_some(),
        }
    }

    /// Support set for GJK, `None` for non-convex kinds.
    pub fn gjk_proxy(&self) -> Option<GjkProxy<'_>> {
        match self {
            Shape::Sphere(s) => Some(s.gjk_proxy()),
            Shape::Capsule(s) => Some(s.gjk_proxy()),
            Shape::Hull(s) => Some(s.gjk_proxy()),
            Shape::Sdf(_) => None,
        }
    }

    pub fn as_hull(&self) -> Option<&HullShape> {
        match self {
            Shape::Hull(s) => Some(s),
            _ => None,
        }
    }
}

impl From<SphereShape> for Shape {
    fn from(s: SphereShape) -> Self {
        Shape::Sphere(s)
    }
}

impl From<CapsuleShape> for Shape {
    fn from(s: CapsuleShape) -> Self {
        Shape::Capsule(s)
    }
}

impl From<HullShape> for Shape {
    fn from(s: HullShape) -> Self {
        Shape::Hull(s)
    }
}

impl From<SdfShape> for Shape {
    fn from(s: SdfShape) -> Self {
        Shape::Sdf(s)
    }
}

/// A shape placed in the world, as seen by the deformable-body domains.
#[derive(Debug, Clone)]
pub struct WorldShape {
    pub shape: Shape,
    pub transform: Transform,
    pub friction: f32,
}

impl WorldShape {
    pub fn new(shape: Shape, transform: Transform) -> Self {
        Self {
            shape,
            transform,
            friction: 0.5,
        }
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn compute_aabb(&self) -> Aabb {
        self.shape.compute_aabb(&self.transform)
    }

    pub fn test_sphere(&self, sphere: &Sphere) -> Option<TestSphereOutput> {
        self.shape.test_sphere(sphere, &self.transform)
    }

    pub fn ray_cast(&self, input: &RayCastInput) -> Option<RayCastOutput> {
        self.shape.ray_cast(input, &self.transform)
    }
}
