//! Simplex bookkeeping for the GJK query: sub-simplex solvers, closest
//! points and the conversion to and from [`SimplexCache`].

use glam::Vec3;

use crate::math::{det, Transform, EPSILON};

use super::cache::SimplexCache;
use super::proxy::GjkProxy;

/// One vertex of the Minkowski difference `B - A`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SimplexVertex {
    /// Support point on proxy 1 (world).
    pub point1: Vec3,
    /// Support point on proxy 2 (world).
    pub point2: Vec3,
    /// `point2 - point1`.
    pub point: Vec3,
    /// Barycentric weight of this vertex for the closest point.
    pub weight: f32,
    pub index1: u32,
    pub index2: u32,
}

impl SimplexVertex {
    pub fn new(
        index1: u32,
        index2: u32,
        xf1: &Transform,
        proxy1: &GjkProxy<'_>,
        xf2: &Transform,
        proxy2: &GjkProxy<'_>,
    ) -> Self {
        let point1 = xf1.transform_point(proxy1.vertex(index1 as usize));
        let point2 = xf2.transform_point(proxy2.vertex(index2 as usize));
        Self {
            point1,
            point2,
            point: point2 - point1,
            weight: 1.0,
            index1,
            index2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Simplex {
    pub vertices: [SimplexVertex; 4],
    pub count: usize,
}

impl Simplex {
    /// Rebuild a simplex from a cache, falling back to a single vertex when
    /// the cache is cold or its geometry changed too much.
    pub fn read_cache(
        cache: &SimplexCache,
        xf1: &Transform,
        proxy1: &GjkProxy<'_>,
        xf2: &Transform,
        proxy2: &GjkProxy<'_>,
    ) -> Self {
        debug_assert!(cache.count <= 4);

        let mut simplex = Simplex::default();
        let in_range = (0..cache.count).all(|i| {
            (cache.index1[i] as usize) < proxy1.vertex_count()
                && (cache.index2[i] as usize) < proxy2.vertex_count()
        });

        if in_range {
            for i in 0..cache.count {
                simplex.vertices[i] = SimplexVertex::new(
                    cache.index1[i],
                    cache.index2[i],
                    xf1,
                    proxy1,
                    xf2,
                    proxy2,
                );
            }
            simplex.count = cache.count;
        }

        // Flush if the simplex grew or shrank a lot since it was cached.
        if simplex.count > 1 {
            let old = cache.metric;
            let new = simplex.metric();
            if new < 0.5 * old || 2.0 * old < new || new < EPSILON {
                simplex.count = 0;
            }
        }

        if simplex.count == 0 {
            simplex.vertices[0] = SimplexVertex::new(0, 0, xf1, proxy1, xf2, proxy2);
            simplex.count = 1;
        }

        simplex
    }

    pub fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.metric();
        cache.count = self.count;
        for i in 0..self.count {
            cache.index1[i] = self.vertices[i].index1;
            cache.index2[i] = self.vertices[i].index2;
        }
    }

    /// Length, area or volume of the simplex.
    pub fn metric(&self) -> f32 {
        let v = &self.vertices;
        match self.count {
            0 | 1 => 0.0,
            2 => v[0].point.distance(v[1].point),
            3 => (v[1].point - v[0].point)
                .cross(v[2].point - v[0].point)
                .length(),
            4 => det(
                v[1].point - v[0].point,
                v[2].point - v[0].point,
                v[3].point - v[0].point,
            )
            .abs(),
            _ => unreachable!("simplex holds at most four vertices"),
        }
    }

    /// Point of the simplex closest to the origin.
    pub fn closest_point(&self) -> Vec3 {
        if self.count == 4 {
            return Vec3::ZERO;
        }
        self.vertices[..self.count]
            .iter()
            .fold(Vec3::ZERO, |acc, v| acc + v.weight * v.point)
    }

    /// Closest points on proxy 1 and proxy 2.
    pub fn witness_points(&self) -> (Vec3, Vec3) {
        let active = &self.vertices[..self.count];
        let point1 = active
            .iter()
            .fold(Vec3::ZERO, |acc, v| acc + v.weight * v.point1);
        if self.count == 4 {
            return (point1, point1);
        }
        let point2 = active
            .iter()
            .fold(Vec3::ZERO, |acc, v| acc + v.weight * v.point2);
        (point1, point2)
    }

    /// Reduce the simplex to the smallest sub-simplex containing the point
    /// closest to the origin and set the barycentric weights.
    pub fn solve(&mut self) {
        match self.count {
            1 => self.vertices[0].weight = 1.0,
            2 => self.solve2(),
            3 => self.solve3(),
            4 => self.solve4(),
            _ => unreachable!("simplex holds one to four vertices"),
        }
    }

    fn subset(&self, ids: &[usize]) -> Simplex {
        let mut s = Simplex::default();
        for (slot, &i) in ids.iter().enumerate() {
            s.vertices[slot] = self.vertices[i];
        }
        s.count = ids.len();
        s
    }

    /// Replace the simplex with the solved subset nearest to the origin.
    fn solve_best_of(&mut self, subsets: &[&[usize]]) {
        let mut best: Option<(f32, Simplex)> = None;
        for ids in subsets {
            let mut candidate = self.subset(ids);
            candidate.solve();
            let d = candidate.closest_point().length_squared();
            if best.as_ref().is_none_or(|(best_d, _)| d < *best_d) {
                best = Some((d, candidate));
            }
        }
        if let Some((_, simplex)) = best {
            *self = simplex;
        }
    }

    fn keep_vertex(&mut self, i: usize) {
        self.vertices[0] = self.vertices[i];
        self.vertices[0].weight = 1.0;
        self.count = 1;
    }

    fn keep_edge(&mut self, i: usize, j: usize, wi: f32, wj: f32) {
        let inv = 1.0 / (wi + wj);
        let (a, b) = (self.vertices[i], self.vertices[j]);
        self.vertices[0] = a;
        self.vertices[1] = b;
        self.vertices[0].weight = wi * inv;
        self.vertices[1].weight = wj * inv;
        self.count = 2;
    }

    // Voronoi regions of a segment.
    fn solve2(&mut self) {
        let w1 = self.vertices[0].point;
        let w2 = self.vertices[1].point;
        let e12 = w2 - w1;

        let d12_2 = -w1.dot(e12);
        if d12_2 <= 0.0 {
            self.keep_vertex(0);
            return;
        }

        let d12_1 = w2.dot(e12);
        if d12_1 <= 0.0 {
            self.keep_vertex(1);
            return;
        }

        self.keep_edge(0, 1, d12_1, d12_2);
    }

    // Voronoi regions of a triangle.
    fn solve3(&mut self) {
        let w1 = self.vertices[0].point;
        let w2 = self.vertices[1].point;
        let w3 = self.vertices[2].point;

        let e12 = w2 - w1;
        let d12_1 = w2.dot(e12);
        let d12_2 = -w1.dot(e12);

        let e13 = w3 - w1;
        let d13_1 = w3.dot(e13);
        let d13_2 = -w1.dot(e13);

        let e23 = w3 - w2;
        let d23_1 = w3.dot(e23);
        let d23_2 = -w2.dot(e23);

        let n = e12.cross(e13);
        let d123_1 = n.dot(w2.cross(w3));
        let d123_2 = n.dot(w3.cross(w1));
        let d123_3 = n.dot(w1.cross(w2));

        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.keep_vertex(0);
            return;
        }

        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            self.keep_edge(0, 1, d12_1, d12_2);
            return;
        }

        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            self.keep_edge(0, 2, d13_1, d13_2);
            return;
        }

        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.keep_vertex(1);
            return;
        }

        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.keep_vertex(2);
            return;
        }

        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            self.keep_edge(1, 2, d23_1, d23_2);
            return;
        }

        // The three weights sum to |n|².
        let area2 = n.length_squared();
        if area2 <= EPSILON * e12.length_squared() * e13.length_squared() {
            self.solve_best_of(&[&[0, 1], &[0, 2], &[1, 2]]);
            return;
        }

        let inv = 1.0 / area2;
        self.vertices[0].weight = d123_1 * inv;
        self.vertices[1].weight = d123_2 * inv;
        self.vertices[2].weight = d123_3 * inv;
    }

    // Signed sub-volumes of a tetrahedron. Origin inside keeps all four
    // vertices; otherwise the closest of the faces it lies outside of wins.
    fn solve4(&mut self) {
        let w1 = self.vertices[0].point;
        let w2 = self.vertices[1].point;
        let w3 = self.vertices[2].point;
        let w4 = self.vertices[3].point;

        let e12 = w2 - w1;
        let e13 = w3 - w1;
        let e14 = w4 - w1;
        let volume = det(e12, e13, e14);
        let scale = e12.length() * e13.length() * e14.length();

        if volume.abs() <= EPSILON * scale {
            self.solve_best_of(&[&[1, 2, 3], &[0, 2, 3], &[0, 1, 3], &[0, 1, 2]]);
            return;
        }

        let inv = 1.0 / volume;
        let b1 = det(w2, w3, w4) * inv;
        let b2 = det(-w1, e13, e14) * inv;
        let b3 = det(e12, -w1, e14) * inv;
        let b4 = det(e12, e13, -w1) * inv;

        if b1 >= 0.0 && b2 >= 0.0 && b3 >= 0.0 && b4 >= 0.0 {
            self.vertices[0].weight = b1;
            self.vertices[1].weight = b2;
            self.vertices[2].weight = b3;
            self.vertices[3].weight = b4;
            return;
        }

        const FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 2, 3], [0, 1, 3], [0, 1, 2]];
        let weights = [b1, b2, b3, b4];
        let mut candidates: [&[usize]; 4] = [&[]; 4];
        let mut n = 0;
        for (face, &b) in FACES.iter().zip(weights.iter()) {
            if b < 0.0 {
                candidates[n] = face;
                n += 1;
            }
        }
        self.solve_best_of(&candidates[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simplex_of(points: &[Vec3]) -> Simplex {
        let mut s = Simplex::default();
        for (i, &p) in points.iter().enumerate() {
            s.vertices[i] = SimplexVertex {
                point1: Vec3::ZERO,
                point2: p,
                point: p,
                weight: 1.0,
                index1: 0,
                index2: i as u32,
            };
        }
        s.count = points.len();
        s
    }

    #[test]
    fn test_solve2_interior() {
        let mut s = simplex_of(&[Vec3::new(-1.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)]);
        s.solve();
        assert_eq!(s.count, 2);
        assert!((s.closest_point() - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_solve2_vertex_region() {
        let mut s = simplex_of(&[Vec3::new(1.0, 1.0, 0.0), Vec3::new(2.0, 1.0, 0.0)]);
        s.solve();
        assert_eq!(s.count, 1);
        assert_eq!(s.vertices[0].point, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_solve3_face_region() {
        let mut s = simplex_of(&[
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ]);
        s.solve();
        assert_eq!(s.count, 3);
        assert!((s.closest_point() - Vec3::Z).length() < 1e-5);
        let sum: f32 = s.vertices[..3].iter().map(|v| v.weight).sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_solve3_edge_region() {
        let mut s = simplex_of(&[
            Vec3::new(-1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 3.0, 0.0),
        ]);
        s.solve();
        assert_eq!(s.count, 2);
        assert!((s.closest_point() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_solve4_contains_origin() {
        let mut s = simplex_of(&[
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
        ]);
        s.solve();
        assert_eq!(s.count, 4);
        assert_eq!(s.closest_point(), Vec3::ZERO);
    }

    #[test]
    fn test_solve4_outside_reduces_to_face() {
        let mut s = simplex_of(&[
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(0.0, 0.0, 3.0),
        ]);
        s.solve();
        assert_eq!(s.count, 3);
        assert!((s.closest_point() - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_metric_is_volume_for_tetrahedron() {
        let s = simplex_of(&[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]);
        assert!((s.metric() - 1.0).abs() < 1e-6);
    }
}
