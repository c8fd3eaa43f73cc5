//! Manifolds between two convex shapes.
//!
//! Separated cores reuse the GJK features; a hull face on either side is
//! expanded to a polygon and the other shape's incident feature is clipped
//! against it. Overlapping cores fall back to a face-axis separating axis
//! search plus the axis between the shape centers.

use glam::Vec3;

use crate::collision::clip::{clip_against_face, ClipVertex};
use crate::collision::{feature_pair, gjk, FeaturePair, GjkProxy, SimplexCache};
use crate::config::CollisionConfig;
use crate::math::{Transform, EPSILON};
use crate::shapes::{HullShape, Shape};

use super::list::{Linked, Links};
use super::manifold::{Manifold, ManifoldPoint};

/// Minimum cosine between a hull face normal and the contact normal for
/// the face to be used as a reference face.
const FACE_ALIGNMENT: f32 = 0.99;

/// Maximum cosine between a capsule axis and the contact normal for the
/// whole segment to be clipped.
const SEGMENT_ALIGNMENT: f32 = 0.1;

const FLIP_BIT: u64 = 1 << 63;
const SINGLE_POINT_BIT: u64 = 1 << 62;

/// A persistent contact between two convex shapes.
///
/// `K` identifies the shapes in the owning domain.
#[derive(Debug, Clone)]
pub struct ConvexContact<K> {
    pub shape1: K,
    pub shape2: K,
    pub cache: SimplexCache,
    pub manifold: Manifold,
    pub touching: bool,
    links: Links<Self>,
}

impl<K> ConvexContact<K> {
    pub fn new(shape1: K, shape2: K) -> Self {
        Self {
            shape1,
            shape2,
            cache: SimplexCache::new(),
            manifold: Manifold::default(),
            touching: false,
            links: Links::default(),
        }
    }

    /// Rebuild the manifold from the current transforms. Impulses of
    /// persisting points survive a touching to touching update.
    pub fn update(
        &mut self,
        shape1: &Shape,
        xf1: &Transform,
        shape2: &Shape,
        xf2: &Transform,
        config: &CollisionConfig,
    ) -> bool {
        let was_touching = self.touching;
        let mut manifold = collide(shape1, xf1, shape2, xf2, &mut self.cache, config);
        self.touching = !manifold.is_empty();
        if was_touching && self.touching {
            manifold.warm_start_from(&self.manifold);
        }
        self.manifold = manifold;
        self.touching
    }
}

impl<K> Linked for ConvexContact<K> {
    fn links(&self) -> &Links<Self> {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links<Self> {
        &mut self.links
    }
}

/// Contact manifold between two convex shapes. Empty when the shapes do
/// not touch or one of them is not convex.
pub fn collide(
    shape1: &Shape,
    xf1: &Transform,
    shape2: &Shape,
    xf2: &Transform,
    cache: &mut SimplexCache,
    config: &CollisionConfig,
) -> Manifold {
    let (Some(proxy1), Some(proxy2)) = (shape1.gjk_proxy(), shape2.gjk_proxy()) else {
        return Manifold::default();
    };

    let out = gjk(xf1, &proxy1, xf2, &proxy2, false, cache, &config.gjk);
    let total_radius = proxy1.radius + proxy2.radius;
    if out.distance > total_radius {
        return Manifold::default();
    }

    let pair = Pair {
        shape1,
        xf1,
        proxy1: &proxy1,
        shape2,
        xf2,
        proxy2: &proxy2,
        config,
    };

    if out.distance > EPSILON && !cache.is_overlapping() {
        let normal = (out.point2 - out.point1) / out.distance;
        let features = feature_pair(cache);
        pair.separated(normal, &features, out.point1, out.point2, out.distance)
    } else {
        pair.overlapping()
    }
}

struct Pair<'s, 'p> {
    shape1: &'s Shape,
    xf1: &'s Transform,
    proxy1: &'p GjkProxy<'s>,
    shape2: &'s Shape,
    xf2: &'s Transform,
    proxy2: &'p GjkProxy<'s>,
    config: &'s CollisionConfig,
}

enum Axis {
    Face1(usize),
    Face2(usize),
    Center(Vec3),
}

impl Pair<'_, '_> {
    fn total_radius(&self) -> f32 {
        self.proxy1.radius + self.proxy2.radius
    }

    fn separated(
        &self,
        normal: Vec3,
        features: &FeaturePair,
        point1: Vec3,
        point2: Vec3,
        distance: f32,
    ) -> Manifold {
        let face1 = reference_face(self.shape1, self.xf1, normal, features.count1());
        let face2 = reference_face(self.shape2, self.xf2, -normal, features.count2());

        let manifold = match (face1, face2) {
            (Some((f1, a1)), Some((_, a2))) if a1 >= a2 => self.clip(Axis::Face1(f1)),
            (Some((f1, _)), None) => self.clip(Axis::Face1(f1)),
            (_, Some((f2, _))) => self.clip(Axis::Face2(f2)),
            (None, None) => None,
        };
        if let Some(manifold) = manifold {
            return manifold;
        }

        let r1 = self.proxy1.radius;
        let r2 = self.proxy2.radius;
        let c1 = point1 + r1 * normal;
        let c2 = point2 - r2 * normal;
        let key = SINGLE_POINT_BIT
            | (features.count1() as u64) << 56
            | (features.count2() as u64) << 52
            | (u64::from(features.index1[0]) & 0x3ff_ffff) << 26
            | (u64::from(features.index2[0]) & 0x3ff_ffff);
        Manifold::from_candidates(
            normal,
            &[ManifoldPoint::new(0.5 * (c1 + c2), distance - (r1 + r2), key)],
        )
    }

    fn overlapping(&self) -> Manifold {
        let total = self.total_radius();
        let mut best_separation = f32::MIN;
        let mut best_axis = None;

        if let Shape::Hull(hull) = self.shape1 {
            for (i, plane) in hull.hull.planes.iter().enumerate() {
                let plane = plane.transformed(self.xf1);
                let (_, p2) = world_support(self.proxy2, self.xf2, -plane.normal);
                let s = plane.distance(p2) - total;
                if s > best_separation {
                    best_separation = s;
                    best_axis = Some(Axis::Face1(i));
                }
            }
        }

        if let Shape::Hull(hull) = self.shape2 {
            for (i, plane) in hull.hull.planes.iter().enumerate() {
                let plane = plane.transformed(self.xf2);
                let (_, p1) = world_support(self.proxy1, self.xf1, -plane.normal);
                let s = plane.distance(p1) - total;
                if s > best_separation {
                    best_separation = s;
                    best_axis = Some(Axis::Face2(i));
                }
            }
        }

        let c1 = self.xf1.transform_point(shape_center(self.shape1));
        let c2 = self.xf2.transform_point(shape_center(self.shape2));
        let d = (c2 - c1).try_normalize().unwrap_or(Vec3::Y);
        let (_, s1) = world_support(self.proxy1, self.xf1, d);
        let (_, s2) = world_support(self.proxy2, self.xf2, -d);
        let center_separation = (s2 - s1).dot(d) - total;
        if best_axis.is_none() || center_separation > best_separation + self.config.linear_slop {
            best_axis = Some(Axis::Center(d));
        }

        match best_axis {
            Some(Axis::Center(d)) => self.center_point(d),
            Some(axis) => self
                .clip(axis)
                .unwrap_or_else(|| self.center_point(d)),
            None => Manifold::default(),
        }
    }

    /// Single deepest point along the center axis.
    fn center_point(&self, normal: Vec3) -> Manifold {
        let (i1, s1) = world_support(self.proxy1, self.xf1, normal);
        let (i2, s2) = world_support(self.proxy2, self.xf2, -normal);
        let separation = (s2 - s1).dot(normal) - self.total_radius();
        let surface2 = s2 - self.proxy2.radius * normal;
        let key = SINGLE_POINT_BIT | (i1 as u64) << 26 | i2 as u64;
        Manifold::from_candidates(
            normal,
            &[ManifoldPoint::new(
                surface2 - 0.5 * separation * normal,
                separation,
                key,
            )],
        )
    }

    /// Clip the incident feature against a reference hull face.
    fn clip(&self, axis: Axis) -> Option<Manifold> {
        let (reference, ref_xf, face, incident, inc_xf, inc_proxy, flip) = match axis {
            Axis::Face1(face) => (
                self.shape1.as_hull()?,
                self.xf1,
                face,
                self.shape2,
                self.xf2,
                self.proxy2,
                false,
            ),
            Axis::Face2(face) => (
                self.shape2.as_hull()?,
                self.xf2,
                face,
                self.shape1,
                self.xf1,
                self.proxy1,
                true,
            ),
            Axis::Center(_) => return None,
        };

        let plane = reference.hull.plane(face).transformed(ref_xf);
        let n = plane.normal;
        let polygon = incident_polygon(incident, inc_xf, inc_proxy, n);
        let clipped = clip_against_face(&reference.hull, ref_xf, face, &polygon);

        let r_ref = reference.radius;
        let r_inc = inc_proxy.radius;
        let candidates: Vec<ManifoldPoint> = clipped
            .iter()
            .filter_map(|v| {
                let distance = plane.distance(v.position);
                let separation = distance - r_ref - r_inc;
                if separation > self.config.linear_slop {
                    return None;
                }
                let on_reference = v.position - distance * n + r_ref * n;
                let on_incident = v.position - r_inc * n;
                let key = (if flip { FLIP_BIT } else { 0 })
                    | (face as u64) << 32
                    | u64::from(v.key);
                Some(ManifoldPoint::new(
                    0.5 * (on_reference + on_incident),
                    separation,
                    key,
                ))
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }
        let normal = if flip { -n } else { n };
        Some(Manifold::from_candidates(normal, &candidates))
    }
}

/// Face of a hull participant usable as reference face for `normal`
/// (world, pointing away from the shape), with its alignment.
fn reference_face(
    shape: &Shape,
    xf: &Transform,
    normal: Vec3,
    feature_count: usize,
) -> Option<(usize, f32)> {
    let hull: &HullShape = shape.as_hull()?;
    let local = xf.inverse_transform_vector(normal);
    let face = hull.hull.support_face(local);
    let alignment = hull.hull.plane(face).normal.dot(local);
    (feature_count == 3 || alignment > FACE_ALIGNMENT).then_some((face, alignment))
}

/// World polygon of the incident feature facing against `normal`.
fn incident_polygon(
    shape: &Shape,
    xf: &Transform,
    proxy: &GjkProxy<'_>,
    normal: Vec3,
) -> Vec<ClipVertex> {
    match shape {
        Shape::Hull(hull) => {
            let face = hull.hull.support_face(xf.inverse_transform_vector(-normal));
            hull.hull
                .face_vertices(face)
                .map(|v| ClipVertex::new(xf.transform_point(hull.hull.vertex(v as usize)), v))
                .collect()
        }
        Shape::Capsule(capsule) => {
            let a = xf.transform_point(capsule.vertex1());
            let b = xf.transform_point(capsule.vertex2());
            let axis = (b - a).normalize_or_zero();
            if axis.dot(normal).abs() < SEGMENT_ALIGNMENT {
                vec![ClipVertex::new(a, 0), ClipVertex::new(b, 1)]
            } else if a.dot(normal) < b.dot(normal) {
                vec![ClipVertex::new(a, 0)]
            } else {
                vec![ClipVertex::new(b, 1)]
            }
        }
        _ => {
            let (index, point) = world_support(proxy, xf, -normal);
            vec![ClipVertex::new(point, index as u32)]
        }
    }
}

fn world_support(proxy: &GjkProxy<'_>, xf: &Transform, direction: Vec3) -> (usize, Vec3) {
    let index = proxy.support_index(xf.inverse_transform_vector(direction));
    (index, xf.transform_point(proxy.vertex(index)))
}

fn shape_center(shape: &Shape) -> Vec3 {
    match shape {
        Shape::Sphere(s) => s.center,
        Shape::Capsule(c) => 0.5 * (c.vertex1() + c.vertex2()),
        Shape::Hull(h) => h.hull.centroid,
        Shape::Sdf(s) => s.sdf.domain().center(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32, z: f32) -> Transform {
        Transform::from_translation(Vec3::new(x, y, z))
    }

    fn collide_cold(s1: &Shape, xf1: &Transform, s2: &Shape, xf2: &Transform) -> Manifold {
        let mut cache = SimplexCache::new();
        collide(s1, xf1, s2, xf2, &mut cache, &CollisionConfig::default())
    }

    #[test]
    fn test_separated_shapes_have_no_points() {
        let m = collide_cold(
            &Shape::sphere(0.5),
            &at(0.0, 0.0, 0.0),
            &Shape::sphere(0.5),
            &at(3.0, 0.0, 0.0),
        );
        assert!(m.is_empty());
    }

    #[test]
    fn test_box_resting_on_box() {
        let m = collide_cold(
            &Shape::cuboid(Vec3::ONE),
            &at(0.0, 0.0, 0.0),
            &Shape::cuboid(Vec3::splat(0.5)),
            &at(0.0, 1.49, 0.0),
        );
        assert_eq!(m.point_count(), 4);
        assert!((m.normal - Vec3::Y).length() < 1e-4);
        for p in &m.points {
            assert!((p.separation + 0.01).abs() < 1e-4);
            assert!((p.point.x.abs() - 0.5).abs() < 1e-4);
            assert!((p.point.z.abs() - 0.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_sphere_above_box_face() {
        let m = collide_cold(
            &Shape::cuboid(Vec3::ONE),
            &at(0.0, 0.0, 0.0),
            &Shape::sphere(0.5),
            &at(0.2, 1.4, 0.0),
        );
        assert_eq!(m.point_count(), 1);
        assert!((m.normal - Vec3::Y).length() < 1e-4);
        assert!((m.points[0].separation + 0.1).abs() < 1e-4);
        assert!((m.points[0].point - Vec3::new(0.2, 0.95, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_normal_points_from_first_to_second() {
        let m = collide_cold(
            &Shape::sphere(0.5),
            &at(0.2, 1.4, 0.0),
            &Shape::cuboid(Vec3::ONE),
            &at(0.0, 0.0, 0.0),
        );
        assert_eq!(m.point_count(), 1);
        assert!((m.normal + Vec3::Y).length() < 1e-4);
        assert!((m.points[0].separation + 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_capsule_lying_on_box() {
        let capsule = Shape::capsule(Vec3::new(-0.5, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0), 0.25);
        let m = collide_cold(
            &Shape::cuboid(Vec3::ONE),
            &at(0.0, 0.0, 0.0),
            &capsule,
            &at(0.0, 1.2, 0.0),
        );
        assert_eq!(m.point_count(), 2);
        for p in &m.points {
            assert!((p.separation + 0.05).abs() < 1e-4);
        }
    }

    #[test]
    fn test_deep_sphere_uses_center_axis() {
        let m = collide_cold(
            &Shape::sphere(1.0),
            &at(0.0, 0.0, 0.0),
            &Shape::sphere(1.0),
            &at(0.0, 0.0, 0.0),
        );
        assert_eq!(m.point_count(), 1);
        assert!((m.points[0].separation + 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_update_preserves_impulses() {
        let config = CollisionConfig::default();
        let ground = Shape::cuboid(Vec3::ONE);
        let ball = Shape::sphere(0.5);
        let mut contact = ConvexContact::new(0u32, 1u32);

        assert!(contact.update(&ground, &at(0.0, 0.0, 0.0), &ball, &at(0.0, 1.45, 0.0), &config));
        contact.manifold.points[0].normal_impulse = 2.5;

        assert!(contact.update(&ground, &at(0.0, 0.0, 0.0), &ball, &at(0.0, 1.44, 0.0), &config));
        assert!(contact.manifold.points[0].persisted);
        assert_eq!(contact.manifold.points[0].normal_impulse, 2.5);

        assert!(!contact.update(&ground, &at(0.0, 0.0, 0.0), &ball, &at(0.0, 3.0, 0.0), &config));
        assert!(contact.manifold.is_empty());
    }
}
