//! GJK distance between two convex proxies.
//!
//! The query works on the Minkowski difference `B - A` and keeps a simplex of
//! up to four support vertices. The final simplex can be persisted in a
//! [`SimplexCache`] so the next query on the same pair starts close to the
//! answer, and [`feature_pair`] turns a cache into the vertex, edge or face
//! features that contain the closest points.

mod cache;
mod proxy;
mod simplex;

pub use cache::{feature_pair, FeaturePair, SimplexCache};
pub use proxy::GjkProxy;

use glam::Vec3;
use tracing::trace;

use crate::config::GjkConfig;
use crate::math::{Transform, EPSILON};

use simplex::{Simplex, SimplexVertex};

/// Result of a GJK query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GjkOutput {
    /// Closest point on proxy 1 (world).
    pub point1: Vec3,
    /// Closest point on proxy 2 (world).
    pub point2: Vec3,
    /// Distance between the closest points, `0` when overlapping.
    pub distance: f32,
    /// Number of support iterations performed.
    pub iterations: u32,
}

/// Compute the closest points between two convex proxies.
///
/// `cache` is read to warm-start the query and overwritten with the final
/// simplex. With `apply_radius` the proxies' radii are honored: the
/// distance shrinks by `r1 + r2` and the points move onto the rounded
/// surfaces, or collapse to their midpoint when the rounded shapes overlap.
pub fn gjk(
    xf1: &Transform,
    proxy1: &GjkProxy<'_>,
    xf2: &Transform,
    proxy2: &GjkProxy<'_>,
    apply_radius: bool,
    cache: &mut SimplexCache,
    config: &GjkConfig,
) -> GjkOutput {
    let mut simplex = Simplex::read_cache(cache, xf1, proxy1, xf2, proxy2);

    let mut save1 = [0u32; 4];
    let mut save2 = [0u32; 4];
    let mut iterations = 0;
    let mut solved = false;

    while iterations < config.max_iterations {
        let save_count = simplex.count;
        for i in 0..save_count {
            save1[i] = simplex.vertices[i].index1;
            save2[i] = simplex.vertices[i].index2;
        }

        simplex.solve();
        solved = true;

        if simplex.count == 4 {
            break;
        }

        let v = simplex.closest_point();
        let vv = v.length_squared();
        if vv < EPSILON * EPSILON {
            // Touching: the origin lies on the simplex.
            break;
        }

        let d = -v;
        let index1 = proxy1.support_index(xf1.inverse_transform_vector(-d)) as u32;
        let index2 = proxy2.support_index(xf2.inverse_transform_vector(d)) as u32;
        let vertex = SimplexVertex::new(index1, index2, xf1, proxy1, xf2, proxy2);

        iterations += 1;

        // A repeated support vertex means the simplex cannot improve.
        let duplicate =
            (0..save_count).any(|i| save1[i] == index1 && save2[i] == index2);
        if duplicate {
            break;
        }

        if vv - v.dot(vertex.point) <= config.tolerance * vv {
            break;
        }

        simplex.vertices[simplex.count] = vertex;
        simplex.count += 1;
        solved = false;
    }

    // The cap can leave the last support vertex unweighted.
    if !solved {
        simplex.solve();
    }

    if iterations >= config.max_iterations {
        trace!(
            iterations,
            count = simplex.count,
            "GJK stopped at the iteration cap"
        );
    }

    let (mut point1, mut point2) = simplex.witness_points();
    let mut distance = point1.distance(point2);

    simplex.write_cache(cache);
    cache.iterations = iterations;

    if apply_radius {
        let r1 = proxy1.radius;
        let r2 = proxy2.radius;
        if distance > r1 + r2 && distance > EPSILON {
            let normal = (point2 - point1) / distance;
            distance -= r1 + r2;
            point1 += r1 * normal;
            point2 -= r2 * normal;
        } else {
            let mid = 0.5 * (point1 + point2);
            point1 = mid;
            point2 = mid;
            distance = 0.0;
        }
    }

    GjkOutput {
        point1,
        point2,
        distance,
        iterations,
    }
}

/// Cold-start GJK with the default configuration.
pub fn gjk_distance(
    xf1: &Transform,
    proxy1: &GjkProxy<'_>,
    xf2: &Transform,
    proxy2: &GjkProxy<'_>,
    apply_radius: bool,
) -> GjkOutput {
    let mut cache = SimplexCache::new();
    gjk(
        xf1,
        proxy1,
        xf2,
        proxy2,
        apply_radius,
        &mut cache,
        &GjkConfig::default(),
    )
}
