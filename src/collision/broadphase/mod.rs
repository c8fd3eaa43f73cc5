//! Broad phase: a [`DynamicTree`] plus a move buffer that turns leaf
//! updates into candidate pairs.
//!
//! Only proxies created, re-inserted or touched since the last
//! [`BroadPhase::find_new_pairs`] are queried, so a pair that keeps
//! overlapping without moving is not reported again. Reported pairs are
//! sorted and deduplicated, which makes the stream deterministic for a fixed
//! sequence of updates.

mod tree;

pub use tree::{DynamicTree, ProxyId};

use glam::Vec3;

use crate::collision::{Aabb, RayCastInput};
use crate::config::BroadPhaseConfig;

pub struct BroadPhase<T> {
    tree: DynamicTree<T>,
    move_buffer: Vec<ProxyId>,
    pair_buffer: Vec<(ProxyId, ProxyId)>,
}

impl<T: Copy> BroadPhase<T> {
    pub fn new(config: &BroadPhaseConfig) -> Self {
        Self {
            tree: DynamicTree::new(config.aabb_margin, config.initial_capacity),
            move_buffer: Vec::new(),
            pair_buffer: Vec::new(),
        }
    }

    pub fn create_proxy(&mut self, aabb: Aabb, user_data: T) -> ProxyId {
        let proxy = self.tree.create_proxy(aabb, user_data);
        self.move_buffer.push(proxy);
        proxy
    }

    pub fn destroy_proxy(&mut self, proxy: ProxyId) -> T {
        self.move_buffer.retain(|&p| p != proxy);
        self.tree.destroy_proxy(proxy)
    }

    /// Refit a proxy; it is queued for pair finding only when its fat bound
    /// had to be rebuilt.
    pub fn move_proxy(&mut self, proxy: ProxyId, aabb: Aabb, displacement: Vec3) {
        if self.tree.move_proxy(proxy, aabb, displacement) {
            self.move_buffer.push(proxy);
        }
    }

    /// Queue a proxy for pair finding without moving it.
    pub fn touch_proxy(&mut self, proxy: ProxyId) {
        self.move_buffer.push(proxy);
    }

    /// Whether two proxies' fat bounds overlap.
    pub fn test_overlap(&self, a: ProxyId, b: ProxyId) -> bool {
        self.tree.fat_aabb(a).overlaps(&self.tree.fat_aabb(b))
    }

    pub fn fat_aabb(&self, proxy: ProxyId) -> Aabb {
        self.tree.fat_aabb(proxy)
    }

    pub fn user_data(&self, proxy: ProxyId) -> T {
        self.tree.user_data(proxy)
    }

    pub fn proxy_count(&self) -> usize {
        self.tree.proxy_count()
    }

    pub fn tree(&self) -> &DynamicTree<T> {
        &self.tree
    }

    /// Report pairs whose fat bounds overlap and involve a queued proxy.
    pub fn find_new_pairs<F: FnMut(T, T)>(&mut self, mut callback: F) {
        self.pair_buffer.clear();

        let tree = &self.tree;
        let pairs = &mut self.pair_buffer;
        for &query_proxy in &self.move_buffer {
            let fat = tree.fat_aabb(query_proxy);
            tree.query(&fat, |proxy| {
                if proxy == query_proxy {
                    return true;
                }
                // Both queued: the pair is reported from the smaller id.
                if tree.was_moved(proxy) && proxy < query_proxy {
                    return true;
                }
                pairs.push((proxy.min(query_proxy), proxy.max(query_proxy)));
                true
            });
        }

        self.pair_buffer.sort_unstable();
        self.pair_buffer.dedup();

        for &(a, b) in &self.pair_buffer {
            callback(self.tree.user_data(a), self.tree.user_data(b));
        }

        for &proxy in &self.move_buffer {
            self.tree.clear_moved(proxy);
        }
        self.move_buffer.clear();
    }

    pub fn query<F: FnMut(ProxyId) -> bool>(&self, aabb: &Aabb, callback: F) {
        self.tree.query(aabb, callback);
    }

    pub fn ray_cast<F>(&self, input: &RayCastInput, callback: F)
    where
        F: FnMut(&RayCastInput, ProxyId) -> f32,
    {
        self.tree.ray_cast(input, callback);
    }
}
