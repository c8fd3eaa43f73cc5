//! Persisted simplex state and feature extraction.
//!
//! A [`SimplexCache`] is owned by the caller and associated with one ordered
//! pair of proxies. Passing the same cache to repeated queries lets GJK resume
//! from the previous simplex, which usually converges in one or two
//! iterations when the pair moves only slightly between calls.

use arrayvec::ArrayVec;

/// Support vertices of the last simplex built for a proxy pair.
///
/// A default (cold) cache has `count == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimplexCache {
    /// Length, area or volume of the cached simplex.
    pub metric: f32,
    /// Iterations used by the query that wrote this cache.
    pub iterations: u32,
    /// Number of cached support vertices, `0..=4`.
    pub count: usize,
    /// Support vertices on proxy 1.
    pub index1: [u32; 4],
    /// Support vertices on proxy 2.
    pub index2: [u32; 4],
}

impl SimplexCache {
    /// A cold cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the cached simplex.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_cold(&self) -> bool {
        self.count == 0
    }

    /// The cached simplex is a tetrahedron enclosing the origin.
    pub fn is_overlapping(&self) -> bool {
        self.count == 4
    }
}

/// Vertices of the features (vertex, edge or face) holding the closest points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeaturePair {
    /// Vertices on proxy 1.
    pub index1: ArrayVec<u32, 3>,
    /// Vertices on proxy 2.
    pub index2: ArrayVec<u32, 3>,
}

impl FeaturePair {
    pub fn count1(&self) -> usize {
        self.index1.len()
    }

    pub fn count2(&self) -> usize {
        self.index2.len()
    }
}

/// Identify the features containing the closest points from a cache written
/// by a GJK query on a separated pair.
///
/// # Panics
///
/// Panics if the cache is cold or overlapping (`count == 0` or `count == 4`).
pub fn feature_pair(cache: &SimplexCache) -> FeaturePair {
    assert!(
        cache.count > 0 && cache.count < 4,
        "feature extraction requires a separated simplex (count = {})",
        cache.count
    );

    let mut pair = FeaturePair::default();
    for i in 0..cache.count {
        if !pair.index1.contains(&cache.index1[i]) {
            pair.index1.push(cache.index1[i]);
        }
        if !pair.index2.contains(&cache.index2[i]) {
            pair.index2.push(cache.index2[i]);
        }
    }
    pair
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_against_vertex() {
        let cache = SimplexCache {
            count: 2,
            index1: [4, 7, 0, 0],
            index2: [2, 2, 0, 0],
            ..Default::default()
        };
        let pair = feature_pair(&cache);
        assert_eq!(pair.index1.as_slice(), &[4, 7]);
        assert_eq!(pair.index2.as_slice(), &[2]);
    }

    #[test]
    fn test_face_against_vertex() {
        let cache = SimplexCache {
            count: 3,
            index1: [1, 2, 3, 0],
            index2: [0, 0, 0, 0],
            ..Default::default()
        };
        let pair = feature_pair(&cache);
        assert_eq!(pair.count1(), 3);
        assert_eq!(pair.count2(), 1);
    }

    #[test]
    fn test_edge_against_edge_with_repeats() {
        let cache = SimplexCache {
            count: 3,
            index1: [1, 1, 5, 0],
            index2: [3, 6, 6, 0],
            ..Default::default()
        };
        let pair = feature_pair(&cache);
        assert_eq!(pair.index1.as_slice(), &[1, 5]);
        assert_eq!(pair.index2.as_slice(), &[3, 6]);
    }

    #[test]
    #[should_panic]
    fn test_overlapping_cache_is_rejected() {
        let cache = SimplexCache {
            count: 4,
            ..Default::default()
        };
        let _ = feature_pair(&cache);
    }

    #[test]
    fn test_reset_makes_cache_cold() {
        let mut cache = SimplexCache {
            count: 2,
            metric: 1.0,
            ..Default::default()
        };
        assert!(!cache.is_cold());
        cache.reset();
        assert!(cache.is_cold());
    }
}
