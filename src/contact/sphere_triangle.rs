//! Particle against triangle contacts.

use glam::Vec3;

use crate::collision::{gjk, GjkProxy, SimplexCache};
use crate::config::CollisionConfig;
use crate::math::{Transform, EPSILON};
use crate::shapes::Sphere;

use super::list::{Linked, Links};

/// Contact between a particle sphere and a triangle of another body.
///
/// The normal points from the triangle towards the particle.
#[derive(Debug, Clone)]
pub struct SphereTriangleContact {
    pub particle: u32,
    pub triangle: u32,
    pub cache: SimplexCache,
    pub touching: bool,
    pub normal: Vec3,
    pub separation: f32,
    /// Barycentric coordinates of the closest point on the triangle.
    pub weights: [f32; 3],
    pub normal_impulse: f32,
    pub tangent_impulse: [f32; 2],
    links: Links<Self>,
}

impl SphereTriangleContact {
    pub fn new(particle: u32, triangle: u32) -> Self {
        Self {
            particle,
            triangle,
            cache: SimplexCache::new(),
            touching: false,
            normal: Vec3::ZERO,
            separation: 0.0,
            weights: [0.0; 3],
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
            links: Links::default(),
        }
    }

    pub fn update(
        &mut self,
        sphere: &Sphere,
        triangle: &[Vec3; 3],
        triangle_radius: f32,
        config: &CollisionConfig,
    ) -> bool {
        let center = [sphere.center];
        let out = gjk(
            &Transform::IDENTITY,
            &GjkProxy::new(&center, sphere.radius),
            &Transform::IDENTITY,
            &GjkProxy::new(triangle, triangle_radius),
            false,
            &mut self.cache,
            &config.gjk,
        );

        let total = sphere.radius + triangle_radius;
        if out.distance > total {
            self.touching = false;
            self.normal_impulse = 0.0;
            self.tangent_impulse = [0.0; 2];
            return false;
        }

        let [a, b, c] = *triangle;
        self.normal = if out.distance > EPSILON {
            (out.point1 - out.point2) / out.distance
        } else {
            // Center on the triangle: keep the side it came from.
            let n = (b - a).cross(c - a).normalize_or_zero();
            if self.touching && n.dot(self.normal) < 0.0 {
                -n
            } else {
                n
            }
        };
        self.separation = out.distance - total;
        self.weights = barycentric(out.point2, a, b, c);
        self.touching = true;
        true
    }
}

impl Linked for SphereTriangleContact {
    fn links(&self) -> &Links<Self> {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links<Self> {
        &mut self.links
    }
}

/// Barycentric coordinates of `p` in the triangle `a b c`.
pub(crate) fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> [f32; 3] {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < EPSILON {
        return [1.0, 0.0, 0.0];
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    [1.0 - v - w, v, w]
}
