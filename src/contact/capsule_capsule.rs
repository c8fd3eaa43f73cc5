//! Edge against edge contacts between capsules.

use glam::Vec3;

use crate::collision::{gjk, GjkProxy, SimplexCache};
use crate::config::CollisionConfig;
use crate::math::{Transform, EPSILON};

use super::list::{Linked, Links};

/// Contact between two edges inflated to capsules.
///
/// The normal points from edge 1 towards edge 2.
#[derive(Debug, Clone)]
pub struct CapsuleCapsuleContact {
    pub edge1: u32,
    pub edge2: u32,
    pub cache: SimplexCache,
    pub touching: bool,
    pub normal: Vec3,
    pub separation: f32,
    /// Parameter of the closest point along edge 1.
    pub s: f32,
    /// Parameter of the closest point along edge 2.
    pub t: f32,
    pub normal_impulse: f32,
    links: Links<Self>,
}

impl CapsuleCapsuleContact {
    pub fn new(edge1: u32, edge2: u32) -> Self {
        Self {
            edge1,
            edge2,
            cache: SimplexCache::new(),
            touching: false,
            normal: Vec3::ZERO,
            separation: 0.0,
            s: 0.0,
            t: 0.0,
            normal_impulse: 0.0,
            links: Links::default(),
        }
    }

    pub fn update(
        &mut self,
        segment1: &[Vec3; 2],
        radius1: f32,
        segment2: &[Vec3; 2],
        radius2: f32,
        config: &CollisionConfig,
    ) -> bool {
        let out = gjk(
            &Transform::IDENTITY,
            &GjkProxy::new(segment1, radius1),
            &Transform::IDENTITY,
            &GjkProxy::new(segment2, radius2),
            false,
            &mut self.cache,
            &config.gjk,
        );

        let total = radius1 + radius2;
        if out.distance > total {
            self.touching = false;
            self.normal_impulse = 0.0;
            return false;
        }

        self.normal = if out.distance > EPSILON {
            (out.point2 - out.point1) / out.distance
        } else {
            let e1 = segment1[1] - segment1[0];
            let e2 = segment2[1] - segment2[0];
            let n = e1.cross(e2).normalize_or_zero();
            if n.dot(self.normal) < 0.0 {
                -n
            } else {
                n
            }
        };
        self.separation = out.distance - total;
        self.s = segment_parameter(out.point1, segment1);
        self.t = segment_parameter(out.point2, segment2);
        self.touching = true;
        true
    }
}

impl Linked for CapsuleCapsuleContact {
    fn links(&self) -> &Links<Self> {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links<Self> {
        &mut self.links
    }
}

fn segment_parameter(p: Vec3, segment: &[Vec3; 2]) -> f32 {
    let e = segment[1] - segment[0];
    let ee = e.length_squared();
    if ee < EPSILON {
        0.0
    } else {
        ((p - segment[0]).dot(e) / ee).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_edges() {
        let mut c = CapsuleCapsuleContact::new(0, 1);
        let a = [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let b = [Vec3::new(0.5, 0.15, -1.0), Vec3::new(0.5, 0.15, 1.0)];
        assert!(c.update(&a, 0.1, &b, 0.1, &CollisionConfig::default()));
        assert!((c.normal - Vec3::Y).length() < 1e-4);
        assert!((c.separation + 0.05).abs() < 1e-4);
        assert!((c.s - 0.75).abs() < 1e-4);
        assert!((c.t - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_distant_edges() {
        let mut c = CapsuleCapsuleContact::new(0, 1);
        let a = [Vec3::ZERO, Vec3::X];
        let b = [Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)];
        assert!(!c.update(&a, 0.1, &b, 0.1, &CollisionConfig::default()));
        assert!(!c.touching);
    }
}
