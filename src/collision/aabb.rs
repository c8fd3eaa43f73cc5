//! Axis-aligned bounding boxes for the broad phase and shape bounds.

use glam::Vec3;

use crate::math::Transform;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bound of a sphere.
    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        Self {
            min: center - Vec3::splat(radius),
            max: center + Vec3::splat(radius),
        }
    }

    /// Tight bound of a point set. Empty input yields a degenerate box at the origin.
    pub fn from_points(points: &[Vec3]) -> Self {
        Self::from_points_transformed(points, &Transform::IDENTITY)
    }

    /// Tight bound of `points` after applying `xf`.
    pub fn from_points_transformed(points: &[Vec3], xf: &Transform) -> Self {
        let Some((first, rest)) = points.split_first() else {
            let c = xf.translation;
            return Self { min: c, max: c };
        };
        let p = xf.transform_point(*first);
        let mut min = p;
        let mut max = p;
        for v in rest {
            let p = xf.transform_point(*v);
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    /// Grow uniformly by `radius` on every side.
    #[inline]
    pub fn extended(&self, radius: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(radius),
            max: self.max + Vec3::splat(radius),
        }
    }

    /// Test whether two AABBs overlap.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Whether `other` lies entirely inside this box.
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
            && other.max.z <= self.max.z
    }

    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    #[inline]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    /// Half-widths along each axis.
    #[inline]
    pub fn extents(&self) -> Vec3 {
        0.5 * (self.max - self.min)
    }

    /// Surface area, the insertion cost metric of the dynamic tree.
    #[inline]
    pub fn surface_area(&self) -> f32 {
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Slab test of the segment `p1 + t (p2 - p1)`, `t ∈ [0, max_fraction]`.
    pub fn test_ray(&self, p1: Vec3, p2: Vec3, max_fraction: f32) -> bool {
        self.ray_interval(p1, p2, max_fraction).is_some()
    }

    /// Parameter interval `[enter, exit]` of the segment inside the box,
    /// clipped to `[0, max_fraction]`.
    pub fn ray_interval(&self, p1: Vec3, p2: Vec3, max_fraction: f32) -> Option<(f32, f32)> {
        let d = p2 - p1;
        let mut lower = 0.0f32;
        let mut upper = max_fraction;
        for axis in 0..3 {
            let (o, dir, lo, hi) = (p1[axis], d[axis], self.min[axis], self.max[axis]);
            if dir.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
            } else {
                let inv = 1.0 / dir;
                let mut t1 = (lo - o) * inv;
                let mut t2 = (hi - o) * inv;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                lower = lower.max(t1);
                upper = upper.min(t2);
                if lower > upper {
                    return None;
                }
            }
        }
        Some((lower, upper))
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}
