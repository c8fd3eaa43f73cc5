//! Particle or node against world shape contacts, shared by the cloth and
//! soft body domains.

use glam::Vec3;

use crate::shapes::{Sphere, WorldShape};

use super::list::{Linked, Links};

/// Contact between a sphere of a deformable body and a world shape.
///
/// The normal points out of the shape towards the sphere.
#[derive(Debug, Clone)]
pub struct SphereShapeContact {
    pub sphere: u32,
    pub shape: u32,
    pub touching: bool,
    /// Closest point on the shape surface.
    pub point: Vec3,
    pub normal: Vec3,
    pub separation: f32,
    pub normal_impulse: f32,
    pub tangent_impulse: [f32; 2],
    links: Links<Self>,
}

impl SphereShapeContact {
    pub fn new(sphere: u32, shape: u32) -> Self {
        Self {
            sphere,
            shape,
            touching: false,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            separation: 0.0,
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
            links: Links::default(),
        }
    }

    pub fn update(&mut self, sphere: &Sphere, shape: &WorldShape) -> bool {
        match shape.test_sphere(sphere) {
            Some(out) => {
                self.point = out.point;
                self.normal = out.normal;
                self.separation = (sphere.center - out.point).dot(out.normal) - sphere.radius;
                self.touching = true;
            }
            None => {
                self.touching = false;
                self.normal_impulse = 0.0;
                self.tangent_impulse = [0.0; 2];
            }
        }
        self.touching
    }
}

impl Linked for SphereShapeContact {
    fn links(&self) -> &Links<Self> {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links<Self> {
        &mut self.links
    }
}
