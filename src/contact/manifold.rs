//! Contact manifolds and their reduction to four points.

use arrayvec::ArrayVec;
use glam::Vec3;

pub const MAX_MANIFOLD_POINTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldPoint {
    /// Contact point in world space, halfway between the surfaces.
    pub point: Vec3,
    /// Signed surface distance along the manifold normal, negative when
    /// penetrating.
    pub separation: f32,
    /// Identifies the features that produced this point.
    pub key: u64,
    pub normal_impulse: f32,
    pub tangent_impulse: [f32; 2],
    /// The point matched a point of the previous manifold.
    pub persisted: bool,
}

impl ManifoldPoint {
    pub fn new(point: Vec3, separation: f32, key: u64) -> Self {
        Self {
            point,
            separation,
            key,
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
            persisted: false,
        }
    }
}

/// Contact points sharing one normal, pointing from shape 1 to shape 2.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifold {
    pub normal: Vec3,
    pub points: ArrayVec<ManifoldPoint, MAX_MANIFOLD_POINTS>,
}

impl Manifold {
    /// Build a manifold from any number of candidate points, keeping at
    /// most four that span the largest area.
    pub fn from_candidates(normal: Vec3, candidates: &[ManifoldPoint]) -> Self {
        Self {
            normal,
            points: reduce(normal, candidates),
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Copy accumulated impulses from `old` into points with the same key.
    pub fn warm_start_from(&mut self, old: &Manifold) {
        for point in &mut self.points {
            if let Some(prev) = old.points.iter().find(|p| p.key == point.key) {
                point.normal_impulse = prev.normal_impulse;
                point.tangent_impulse = prev.tangent_impulse;
                point.persisted = true;
            }
        }
    }

    pub fn deepest(&self) -> Option<&ManifoldPoint> {
        self.points
            .iter()
            .min_by(|a, b| a.separation.total_cmp(&b.separation))
    }
}

/// Pick up to four points: the deepest, the one farthest from it, the one
/// making the largest triangle with both, then the one furthest outside
/// that triangle.
fn reduce(normal: Vec3, candidates: &[ManifoldPoint]) -> ArrayVec<ManifoldPoint, MAX_MANIFOLD_POINTS> {
    if candidates.len() <= MAX_MANIFOLD_POINTS {
        return candidates.iter().copied().collect();
    }

    let mut out = ArrayVec::new();

    let Some(i1) = argmax(candidates, |p| -p.separation) else {
        return out;
    };
    let a = candidates[i1].point;
    out.push(candidates[i1]);

    let Some(i2) = argmax(candidates, |p| p.point.distance_squared(a)) else {
        return out;
    };
    let b = candidates[i2].point;
    out.push(candidates[i2]);

    let area = |p: Vec3, q: Vec3, r: Vec3| (q - p).cross(r - p).dot(normal);

    let Some(i3) = argmax(candidates, |p| area(a, b, p.point).abs()) else {
        return out;
    };
    let mut c = candidates[i3].point;
    let mut third = candidates[i3];
    let mut b = b;
    if area(a, b, c) < 0.0 {
        // Keep the triangle counter-clockwise about the normal.
        std::mem::swap(&mut b, &mut c);
        out[1] = third;
        third = candidates[i2];
    }
    out.push(third);

    let outside = |p: Vec3| {
        -area(a, b, p)
            .min(area(b, c, p))
            .min(area(c, a, p))
    };
    if let Some(i4) = argmax(candidates, |p| outside(p.point)) {
        if outside(candidates[i4].point) > 0.0 {
            out.push(candidates[i4]);
        }
    }
    out
}

fn argmax(candidates: &[ManifoldPoint], score: impl Fn(&ManifoldPoint) -> f32) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .max_by(|(_, x), (_, y)| score(x).total_cmp(&score(y)))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Vec<ManifoldPoint> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let x = i as f32 / (n - 1) as f32 * 2.0 - 1.0;
                let z = j as f32 / (n - 1) as f32 * 2.0 - 1.0;
                let depth = if i == 1 && j == 1 { -0.2 } else { -0.1 };
                points.push(ManifoldPoint::new(
                    Vec3::new(x, 0.0, z),
                    depth,
                    (i * n + j) as u64,
                ));
            }
        }
        points
    }

    #[test]
    fn test_small_sets_are_kept() {
        let points = grid(2);
        let m = Manifold::from_candidates(Vec3::Y, &points);
        assert_eq!(m.point_count(), 4);
    }

    #[test]
    fn test_reduction_keeps_deepest_and_spans() {
        let points = grid(4);
        let m = Manifold::from_candidates(Vec3::Y, &points);
        assert_eq!(m.point_count(), 4);
        assert!((m.points[0].separation + 0.2).abs() < 1e-6);
        let keys: Vec<u64> = m.points.iter().map(|p| p.key).collect();
        let mut unique = keys.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);
        // The deepest point is interior; the others are grid corners.
        for p in &m.points[1..] {
            assert!((p.point.x.abs() - 1.0).abs() < 1e-6);
            assert!((p.point.z.abs() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_warm_start_by_key() {
        let mut old = Manifold::from_candidates(
            Vec3::Y,
            &[ManifoldPoint::new(Vec3::ZERO, -0.1, 7)],
        );
        old.points[0].normal_impulse = 3.0;
        old.points[0].tangent_impulse = [1.0, -1.0];

        let mut new = Manifold::from_candidates(
            Vec3::Y,
            &[
                ManifoldPoint::new(Vec3::ZERO, -0.1, 7),
                ManifoldPoint::new(Vec3::X, -0.1, 9),
            ],
        );
        new.warm_start_from(&old);
        assert!(new.points[0].persisted);
        assert_eq!(new.points[0].normal_impulse, 3.0);
        assert_eq!(new.points[0].tangent_impulse, [1.0, -1.0]);
        assert!(!new.points[1].persisted);
        assert_eq!(new.points[1].normal_impulse, 0.0);
    }
}
