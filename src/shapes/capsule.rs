//! Capsules: a segment inflated by a radius.

use std::f32::consts::PI;

use glam::{Mat3, Vec3};

use crate::collision::{Aabb, GjkProxy, RayCastInput, RayCastOutput};
use crate::math::{rotation_from_y, steiner, Transform, EPSILON};

use super::sphere::ray_cast_sphere;
use super::{MassData, Sphere, TestSphereOutput};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleShape {
    /// Segment end points in the shape frame.
    pub vertices: [Vec3; 2],
    pub radius: f32,
}

impl CapsuleShape {
    pub fn new(vertex1: Vec3, vertex2: Vec3, radius: f32) -> Self {
        Self {
            vertices: [vertex1, vertex2],
            radius,
        }
    }

    #[inline]
    pub fn vertex1(&self) -> Vec3 {
        self.vertices[0]
    }

    #[inline]
    pub fn vertex2(&self) -> Vec3 {
        self.vertices[1]
    }

    /// Cylinder plus two hemispherical caps, rebased to the shape origin.
    pub fn compute_mass(&self, density: f32) -> MassData {
        let (v1, v2) = (self.vertex1(), self.vertex2());
        let r = self.radius;
        let axis = v2 - v1;
        let h = axis.length();
        let center = 0.5 * (v1 + v2);

        let cylinder_mass = density * PI * r * r * h;
        let sphere_mass = density * 4.0 / 3.0 * PI * r * r * r;
        let mass = cylinder_mass + sphere_mass;

        // Inertia about the center with the segment along +Y.
        let i_axis = 0.5 * cylinder_mass * r * r + 0.4 * sphere_mass * r * r;
        let i_perp = cylinder_mass * (h * h / 12.0 + r * r / 4.0)
            + sphere_mass * (0.4 * r * r + h * h / 4.0 + 3.0 * h * r / 8.0);
        let local = Mat3::from_diagonal(Vec3::new(i_perp, i_axis, i_perp));

        let rotation = rotation_from_y(axis);
        let inertia = rotation * local * rotation.transpose();

        MassData {
            mass,
            center,
            inertia: inertia + mass * steiner(center),
        }
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        Aabb::from_points_transformed(&self.vertices, xf).extended(self.radius)
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let a = xf.transform_point(self.vertex1());
        let b = xf.transform_point(self.vertex2());
        let r = self.radius;

        // Segments starting inside the capsule do not report a hit.
        if closest_on_segment(input.p1, a, b).distance_squared(input.p1) <= r * r {
            return None;
        }

        let e = b - a;
        let ee = e.length_squared();
        if ee < EPSILON {
            return ray_cast_sphere(input, a, r);
        }

        let mut best: Option<RayCastOutput> = None;
        let mut keep = |hit: Option<RayCastOutput>| {
            if let Some(hit) = hit {
                if best.is_none_or(|current| hit.fraction < current.fraction) {
                    best = Some(hit);
                }
            }
        };

        // Side of the cylinder.
        let d = input.p2 - input.p1;
        let m = input.p1 - a;
        let dp = d - (d.dot(e) / ee) * e;
        let mp = m - (m.dot(e) / ee) * e;
        let qa = dp.length_squared();
        if qa > EPSILON {
            let qb = mp.dot(dp);
            let qc = mp.length_squared() - r * r;
            let disc = qb * qb - qa * qc;
            if disc >= 0.0 {
                let t = (-qb - disc.sqrt()) / qa;
                if t >= 0.0 && t <= input.max_fraction {
                    let p = m + t * d;
                    let s = p.dot(e) / ee;
                    if (0.0..=1.0).contains(&s) {
                        keep(Some(RayCastOutput {
                            fraction: t,
                            normal: (p - s * e).normalize_or_zero(),
                        }));
                    }
                }
            }
        }

        // End caps.
        keep(ray_cast_sphere(input, a, r));
        keep(ray_cast_sphere(input, b, r));

        best
    }

    pub fn test_sphere(&self, sphere: &Sphere, xf: &Transform) -> Option<TestSphereOutput> {
        let a = xf.transform_point(self.vertex1());
        let b = xf.transform_point(self.vertex2());
        let q = closest_on_segment(sphere.center, a, b);

        let radius = self.radius + sphere.radius;
        let d = sphere.center - q;
        let dd = d.length_squared();
        if dd > radius * radius {
            return None;
        }

        let distance = dd.sqrt();
        let normal = if distance > EPSILON {
            d / distance
        } else {
            (b - a).any_orthonormal_vector()
        };
        Some(TestSphereOutput {
            point: q + self.radius * normal,
            normal,
        })
    }

    pub fn gjk_proxy(&self) -> GjkProxy<'_> {
        GjkProxy::new(&self.vertices, self.radius)
    }
}

/// Closest point to `p` on the segment `a b`.
pub(crate) fn closest_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let e = b - a;
    let ee = e.length_squared();
    if ee < EPSILON {
        return a;
    }
    let t = ((p - a).dot(e) / ee).clamp(0.0, 1.0);
    a + t * e
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capsule() -> CapsuleShape {
        CapsuleShape::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.5)
    }

    #[test]
    fn test_capsule_mass_degenerates_to_sphere() {
        let c = CapsuleShape::new(Vec3::ZERO, Vec3::ZERO, 1.0);
        let mass = c.compute_mass(1.0);
        assert!((mass.mass - 4.0 / 3.0 * PI).abs() < 1e-5);
        assert!((mass.inertia.x_axis.x - 0.4 * mass.mass).abs() < 1e-4);
        assert!((mass.inertia.y_axis.y - 0.4 * mass.mass).abs() < 1e-4);
    }

    #[test]
    fn test_capsule_mass_axis() {
        let c = capsule();
        let mass = c.compute_mass(2.0);
        let expected = 2.0 * (PI * 0.25 * 2.0 + 4.0 / 3.0 * PI * 0.125);
        assert!((mass.mass - expected).abs() < 1e-4);
        // Long axis is y: smallest moment.
        assert!(mass.inertia.y_axis.y < mass.inertia.x_axis.x);
        assert!((mass.inertia.x_axis.x - mass.inertia.z_axis.z).abs() < 1e-4);
    }

    #[test]
    fn test_capsule_aabb() {
        let aabb = capsule().compute_aabb(&Transform::from_translation(Vec3::X));
        assert!((aabb.min - Vec3::new(0.5, -1.5, -0.5)).length() < 1e-6);
        assert!((aabb.max - Vec3::new(1.5, 1.5, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_capsule_ray_side_and_cap() {
        let c = capsule();
        let xf = Transform::IDENTITY;

        let side = RayCastInput::new(Vec3::new(-2.0, 0.5, 0.0), Vec3::new(2.0, 0.5, 0.0));
        let hit = c.ray_cast(&side, &xf).unwrap();
        assert!((hit.fraction - 0.375).abs() < 1e-5);
        assert!((hit.normal + Vec3::X).length() < 1e-5);

        let cap = RayCastInput::new(Vec3::new(0.0, 4.0, 0.0), Vec3::new(0.0, -4.0, 0.0));
        let hit = c.ray_cast(&cap, &xf).unwrap();
        assert!((hit.fraction - 2.5 / 8.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_capsule_ray_from_inside_misses() {
        let input = RayCastInput::new(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0));
        assert!(capsule().ray_cast(&input, &Transform::IDENTITY).is_none());
    }

    #[test]
    fn test_capsule_test_sphere() {
        let c = capsule();
        let probe = Sphere::new(Vec3::new(0.55, 0.3, 0.0), 0.1);
        let out = c.test_sphere(&probe, &Transform::IDENTITY).unwrap();
        assert!((out.normal - Vec3::X).length() < 1e-5);
        assert!((out.point - Vec3::new(0.5, 0.3, 0.0)).length() < 1e-5);

        let far = Sphere::new(Vec3::new(0.0, 2.0, 0.0), 0.1);
        assert!(c.test_sphere(&far, &Transform::IDENTITY).is_none());
    }
}
