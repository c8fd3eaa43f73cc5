//! Convex support sets fed to the GJK query.

use glam::Vec3;

/// A non-owning view of a convex vertex set with an optional skin radius.
///
/// The convex shape is the hull of `vertices` inflated by `radius`.
#[derive(Debug, Clone, Copy)]
pub struct GjkProxy<'a> {
    pub vertices: &'a [Vec3],
    pub radius: f32,
}

impl<'a> GjkProxy<'a> {
    pub fn new(vertices: &'a [Vec3], radius: f32) -> Self {
        debug_assert!(!vertices.is_empty(), "GJK proxy needs at least one vertex");
        Self { vertices, radius }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Vec3 {
        self.vertices[index]
    }

    /// Index of the vertex furthest along `direction` (local frame).
    pub fn support_index(&self, direction: Vec3) -> usize {
        let mut best = 0;
        let mut best_dot = self.vertices[0].dot(direction);
        for (i, v) in self.vertices.iter().enumerate().skip(1) {
            let d = v.dot(direction);
            if d > best_dot {
                best = i;
                best_dot = d;
            }
        }
        best
    }

    #[inline]
    pub fn support(&self, direction: Vec3) -> Vec3 {
        self.vertices[self.support_index(direction)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_index() {
        let verts = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(-1.0, 0.0, 0.0)];
        let proxy = GjkProxy::new(&verts, 0.0);
        assert_eq!(proxy.support_index(Vec3::X), 1);
        assert_eq!(proxy.support_index(Vec3::Y), 2);
        assert_eq!(proxy.support(-Vec3::X), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_support_ties_pick_first() {
        let verts = [Vec3::X, Vec3::X];
        let proxy = GjkProxy::new(&verts, 0.0);
        assert_eq!(proxy.support_index(Vec3::X), 0);
    }
}
