//! Convex polyhedra with an optional skin radius.

use std::sync::Arc;

use glam::{Mat3, Vec3};

use crate::collision::{gjk_distance, Aabb, GjkProxy, Hull, RayCastInput, RayCastOutput};
use crate::math::{det, steiner, Transform, EPSILON};

use super::{MassData, Sphere, TestSphereOutput};

#[derive(Debug, Clone)]
pub struct HullShape {
    pub hull: Arc<Hull>,
    pub radius: f32,
}

impl HullShape {
    pub fn new(hull: Arc<Hull>, radius: f32) -> Self {
        Self { hull, radius }
    }

    /// Box centered at the shape origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(Arc::new(Hull::cuboid(half_extents)), 0.0)
    }

    /// Mass properties by signed tetrahedral decomposition of the faces.
    ///
    /// Integration runs relative to the vertex average to reduce round-off;
    /// the inertia is returned about the shape origin.
    ///
    /// # Panics
    ///
    /// Panics for hulls with fewer than four vertices or zero volume.
    pub fn compute_mass(&self, density: f32) -> MassData {
        let hull = &*self.hull;
        assert!(hull.vertices.len() >= 4);

        let s = hull.centroid;

        let mut volume = 0.0;
        let mut center = Vec3::ZERO;
        let (mut xx, mut yy, mut zz) = (0.0, 0.0, 0.0);
        let (mut xy, mut xz, mut yz) = (0.0, 0.0, 0.0);

        for face in 0..hull.face_count() {
            let mut verts = hull.face_vertices(face).map(|v| hull.vertex(v as usize) - s);
            let Some(v1) = verts.next() else { continue };
            let Some(mut v2) = verts.next() else { continue };

            // Fan triangulation of the face.
            for v3 in verts {
                let d = det(v1, v2, v3);
                volume += d;

                let v4 = v1 + v2 + v3;
                center += d * v4;

                xx += d * (v1.x * v1.x + v2.x * v2.x + v3.x * v3.x + v4.x * v4.x);
                yy += d * (v1.y * v1.y + v2.y * v2.y + v3.y * v3.y + v4.y * v4.y);
                zz += d * (v1.z * v1.z + v2.z * v2.z + v3.z * v3.z + v4.z * v4.z);
                xy += d * (v1.x * v1.y + v2.x * v2.y + v3.x * v3.y + v4.x * v4.y);
                xz += d * (v1.x * v1.z + v2.x * v2.z + v3.x * v3.z + v4.x * v4.z);
                yz += d * (v1.y * v1.z + v2.y * v2.z + v3.y * v3.z + v4.y * v4.z);

                v2 = v3;
            }
        }

        assert!(volume > EPSILON, "hull has no volume");

        let inertia = Mat3::from_cols(
            Vec3::new(yy + zz, -xy, -xz),
            Vec3::new(-xy, xx + zz, -yz),
            Vec3::new(-xz, -yz, xx + yy),
        );

        let mass = density * volume / 6.0;
        center /= 4.0 * volume;
        let center_origin = center + s;

        // Inertia about s, shifted to the center of mass, then to the origin.
        let inertia = (density / 120.0) * inertia
            + mass * (steiner(center_origin) - steiner(center));

        MassData {
            mass,
            center: center_origin,
            inertia,
        }
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        Aabb::from_points_transformed(&self.hull.vertices, xf).extended(self.radius)
    }

    /// Closest point and normal between the hull and a world sphere.
    pub fn test_sphere(&self, sphere: &Sphere, xf: &Transform) -> Option<TestSphereOutput> {
        let hull = &*self.hull;
        let radius = self.radius + sphere.radius;
        let local = xf.inverse_transform_point(sphere.center);

        // Face of minimum penetration.
        let mut face = 0;
        let mut separation = f32::MIN;
        for (i, plane) in hull.planes.iter().enumerate() {
            let s = plane.distance(local);
            if s > radius {
                return None;
            }
            if s > separation {
                face = i;
                separation = s;
            }
        }

        if separation < 0.0 {
            // Center inside the hull.
            let plane = hull.plane(face).transformed(xf);
            return Some(TestSphereOutput {
                point: plane.closest_point(sphere.center),
                normal: plane.normal,
            });
        }

        let polygon = hull.face_polygon(face);
        let center = [sphere.center];
        let out = gjk_distance(
            xf,
            &GjkProxy::new(&polygon, 0.0),
            &Transform::IDENTITY,
            &GjkProxy::new(&center, 0.0),
            false,
        );

        if out.distance > radius || out.distance <= 0.0 {
            return None;
        }

        Some(TestSphereOutput {
            point: out.point1,
            normal: (out.point2 - out.point1) / out.distance,
        })
    }

    /// GJK distance test against a world sphere.
    pub fn overlaps_sphere(&self, sphere: &Sphere, xf: &Transform) -> bool {
        let center = [xf.inverse_transform_point(sphere.center)];
        let out = gjk_distance(
            &Transform::IDENTITY,
            &GjkProxy::new(&self.hull.vertices, 0.0),
            &Transform::IDENTITY,
            &GjkProxy::new(&center, 0.0),
            false,
        );
        out.distance <= self.radius + sphere.radius
    }

    /// Clip the segment against every face half-space in the hull frame.
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.inverse_transform_point(input.p1);
        let p2 = xf.inverse_transform_point(input.p2);
        let d = p2 - p1;

        let mut lower = 0.0;
        let mut upper = input.max_fraction;
        let mut index = None;

        // The segment p1 + t d crosses a plane where
        // t = (offset - n·p1) / (n·d).
        for (i, plane) in self.hull.planes.iter().enumerate() {
            let numerator = plane.offset - plane.normal.dot(p1);
            let denominator = plane.normal.dot(d);

            if denominator == 0.0 {
                // Parallel and outside.
                if numerator < 0.0 {
                    return None;
                }
                continue;
            }

            if denominator < 0.0 {
                // Entering the half-space.
                if numerator < lower * denominator {
                    lower = numerator / denominator;
                    index = Some(i);
                }
            } else if numerator < upper * denominator {
                // Leaving the half-space.
                upper = numerator / denominator;
            }

            if upper < lower {
                return None;
            }
        }

        let index = index?;
        debug_assert!(lower >= 0.0 && lower <= input.max_fraction);
        Some(RayCastOutput {
            fraction: lower,
            normal: xf.transform_vector(self.hull.plane(index).normal),
        })
    }

    pub fn gjk_proxy(&self) -> GjkProxy<'_> {
        GjkProxy::new(&self.hull.vertices, self.radius)
    }
}
