//! Static geometry described by a signed distance field.

use std::sync::Arc;

use glam::{Mat3, Vec3};

use crate::collision::{Aabb, RayCastInput, RayCastOutput, Sdf};
use crate::math::Transform;

use super::{MassData, Sphere, TestSphereOutput};

/// Upper bound on sphere-tracing steps per ray.
const MAX_TRACE_STEPS: u32 = 64;

#[derive(Debug, Clone)]
pub struct SdfShape {
    pub sdf: Arc<Sdf>,
    /// Offset of the collision surface from the zero level set.
    pub radius: f32,
}

impl SdfShape {
    pub fn new(sdf: Arc<Sdf>, radius: f32) -> Self {
        Self { sdf, radius }
    }

    /// Distance fields are static geometry and carry no mass.
    pub fn compute_mass(&self, _density: f32) -> MassData {
        MassData {
            mass: 0.0,
            center: Vec3::ZERO,
            inertia: Mat3::ZERO,
        }
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let d = self.sdf.domain();
        let corners = [
            Vec3::new(d.min.x, d.min.y, d.min.z),
            Vec3::new(d.max.x, d.min.y, d.min.z),
            Vec3::new(d.min.x, d.max.y, d.min.z),
            Vec3::new(d.max.x, d.max.y, d.min.z),
            Vec3::new(d.min.x, d.min.y, d.max.z),
            Vec3::new(d.max.x, d.min.y, d.max.z),
            Vec3::new(d.min.x, d.max.y, d.max.z),
            Vec3::new(d.max.x, d.max.y, d.max.z),
        ];
        Aabb::from_points_transformed(&corners, xf).extended(self.radius)
    }

    pub fn test_sphere(&self, sphere: &Sphere, xf: &Transform) -> Option<TestSphereOutput> {
        let local = xf.inverse_transform_point(sphere.center);
        let (distance, gradient) = self.sdf.evaluate(local)?;
        let distance = distance as f32;

        if distance > self.radius + sphere.radius {
            return None;
        }

        let normal = xf.transform_vector(gradient);
        Some(TestSphereOutput {
            point: sphere.center - (distance - self.radius) * normal,
            normal,
        })
    }

    pub fn overlaps_sphere(&self, sphere: &Sphere, xf: &Transform) -> bool {
        self.test_sphere(sphere, xf).is_some()
    }

    /// Sphere tracing inside the field's domain.
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.inverse_transform_point(input.p1);
        let p2 = xf.inverse_transform_point(input.p2);
        let length = p1.distance(p2);
        if length <= f32::EPSILON {
            return None;
        }

        let (enter, exit) = self.sdf.domain().ray_interval(p1, p2, input.max_fraction)?;
        let tolerance = 1.0e-4 * length.max(1.0);

        let mut t = enter;
        for step in 0..MAX_TRACE_STEPS {
            let p = p1 + t * (p2 - p1);
            let (distance, gradient) = self.sdf.evaluate(p)?;
            let distance = distance as f32 - self.radius;

            if distance <= tolerance {
                // A segment that starts inside the surface reports no hit.
                if step == 0 && distance < 0.0 && t == 0.0 {
                    return None;
                }
                return Some(RayCastOutput {
                    fraction: t,
                    normal: xf.transform_vector(gradient),
                });
            }

            t += distance / length;
            if t > exit {
                return None;
            }
        }
        None
    }
}
