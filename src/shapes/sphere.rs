//! Solid spheres.

use std::f32::consts::PI;

use glam::{Mat3, Vec3};

use crate::collision::{Aabb, GjkProxy, RayCastInput, RayCastOutput};
use crate::math::{steiner, Transform, EPSILON};

use super::{MassData, Sphere, TestSphereOutput};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereShape {
    /// Center in the shape frame.
    pub center: Vec3,
    pub radius: f32,
}

impl SphereShape {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        let volume = 4.0 / 3.0 * PI * self.radius.powi(3);
        let mass = density * volume;
        let inertia = Mat3::from_diagonal(Vec3::splat(0.4 * mass * self.radius * self.radius));
        MassData {
            mass,
            center: self.center,
            inertia: inertia + mass * steiner(self.center),
        }
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        Aabb::from_sphere(xf.transform_point(self.center), self.radius)
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let center = xf.transform_point(self.center);
        ray_cast_sphere(input, center, self.radius)
    }

    pub fn test_sphere(&self, sphere: &Sphere, xf: &Transform) -> Option<TestSphereOutput> {
        let center = xf.transform_point(self.center);
        let d = sphere.center - center;
        let radius = self.radius + sphere.radius;
        let dd = d.length_squared();
        if dd > radius * radius {
            return None;
        }

        let distance = dd.sqrt();
        let normal = if distance > EPSILON {
            d / distance
        } else {
            Vec3::Y
        };
        Some(TestSphereOutput {
            point: center + self.radius * normal,
            normal,
        })
    }

    pub fn gjk_proxy(&self) -> GjkProxy<'_> {
        GjkProxy::new(std::slice::from_ref(&self.center), self.radius)
    }
}

/// Segment against a world-space sphere. Segments starting inside miss.
pub(crate) fn ray_cast_sphere(
    input: &RayCastInput,
    center: Vec3,
    radius: f32,
) -> Option<RayCastOutput> {
    let s = input.p1 - center;
    let b = s.length_squared() - radius * radius;
    if b < 0.0 {
        return None;
    }

    let d = input.p2 - input.p1;
    let c = s.dot(d);
    let rr = d.length_squared();
    let sigma = c * c - rr * b;
    if sigma < 0.0 || rr < EPSILON {
        return None;
    }

    let a = -(c + sigma.sqrt());
    if a >= 0.0 && a <= input.max_fraction * rr {
        let fraction = a / rr;
        Some(RayCastOutput {
            fraction,
            normal: (s + fraction * d).normalize_or_zero(),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_mass() {
        let shape = SphereShape::new(Vec3::ZERO, 1.0);
        let mass = shape.compute_mass(1.0);
        assert!((mass.mass - 4.0 / 3.0 * PI).abs() < 1e-5);
        assert!((mass.inertia.x_axis.x - 0.4 * mass.mass).abs() < 1e-5);
    }

    #[test]
    fn test_offset_sphere_mass_uses_steiner() {
        let shape = SphereShape::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
        let mass = shape.compute_mass(1.0);
        let ic = 0.4 * mass.mass;
        // Axis x passes through the center; y and z are shifted by 2.
        assert!((mass.inertia.x_axis.x - ic).abs() < 1e-4);
        assert!((mass.inertia.y_axis.y - (ic + 4.0 * mass.mass)).abs() < 1e-4);
    }

    #[test]
    fn test_sphere_ray_cast() {
        let shape = SphereShape::new(Vec3::ZERO, 1.0);
        let xf = Transform::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let input = RayCastInput::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        let out = shape.ray_cast(&input, &xf).unwrap();
        assert!((out.fraction - 0.4).abs() < 1e-5);
        assert!((out.normal + Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_sphere_ray_miss_and_inside() {
        let shape = SphereShape::new(Vec3::ZERO, 1.0);
        let xf = Transform::IDENTITY;
        let miss = RayCastInput::new(Vec3::new(-5.0, 2.0, 0.0), Vec3::new(5.0, 2.0, 0.0));
        assert!(shape.ray_cast(&miss, &xf).is_none());
        let inside = RayCastInput::new(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0));
        assert!(shape.ray_cast(&inside, &xf).is_none());
    }

    #[test]
    fn test_sphere_test_sphere() {
        let shape = SphereShape::new(Vec3::ZERO, 1.0);
        let probe = Sphere::new(Vec3::new(1.05, 0.0, 0.0), 0.1);
        let out = shape.test_sphere(&probe, &Transform::IDENTITY).unwrap();
        assert!((out.normal - Vec3::X).length() < 1e-6);
        assert!((out.point - Vec3::X).length() < 1e-6);

        let far = Sphere::new(Vec3::new(1.2, 0.0, 0.0), 0.1);
        assert!(shape.test_sphere(&far, &Transform::IDENTITY).is_none());
    }
}
