//! Dynamic AABB tree.
//!
//! Leaves store fattened bounds so small motions do not force re-insertion.
//! Insertion picks a sibling with a surface-area cost and every update walks
//! back to the root rotating unbalanced nodes.

use glam::Vec3;

use crate::collision::{Aabb, RayCastInput};

pub(crate) const NULL_NODE: u32 = u32::MAX;

/// Fat-bound growth along the predicted displacement on re-insertion.
const DISPLACEMENT_MULTIPLIER: f32 = 4.0;

/// Stable handle of a leaf in a [`DynamicTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(u32);

impl ProxyId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct TreeNode<T> {
    aabb: Aabb,
    user_data: Option<T>,
    /// Parent node, or the next free node while on the free list.
    parent: u32,
    child1: u32,
    child2: u32,
    /// Leaf = 0, free node = -1.
    height: i32,
    moved: bool,
}

impl<T> TreeNode<T> {
    fn new() -> Self {
        Self {
            aabb: Aabb::default(),
            user_data: None,
            parent: NULL_NODE,
            child1: NULL_NODE,
            child2: NULL_NODE,
            height: 0,
            moved: false,
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

/// A bounding volume hierarchy over fattened leaf bounds.
#[derive(Debug, Clone)]
pub struct DynamicTree<T> {
    nodes: Vec<TreeNode<T>>,
    root: u32,
    free_list: u32,
    proxy_count: usize,
    margin: f32,
}

impl<T: Copy> DynamicTree<T> {
    pub fn new(margin: f32, capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: NULL_NODE,
            free_list: NULL_NODE,
            proxy_count: 0,
            margin,
        }
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    /// Insert a leaf for a tight bound; the stored bound is fattened.
    pub fn create_proxy(&mut self, aabb: Aabb, user_data: T) -> ProxyId {
        let id = self.allocate_node();
        let node = &mut self.nodes[id as usize];
        node.aabb = aabb.extended(self.margin);
        node.user_data = Some(user_data);
        node.height = 0;
        node.moved = true;

        self.insert_leaf(id);
        self.proxy_count += 1;
        ProxyId(id)
    }

    /// Remove a leaf and return its user data.
    pub fn destroy_proxy(&mut self, proxy: ProxyId) -> T {
        let id = proxy.0;
        let data = self.user_data(proxy);
        debug_assert!(self.nodes[id as usize].is_leaf());

        self.remove_leaf(id);
        self.free_node(id);
        self.proxy_count -= 1;
        data
    }

    /// Refit a leaf to a new tight bound.
    ///
    /// Returns `false` when the fat bound still contains `aabb` and is not
    /// excessively large; otherwise the leaf is re-inserted with a fresh fat
    /// bound stretched along `displacement` and `true` is returned.
    pub fn move_proxy(&mut self, proxy: ProxyId, aabb: Aabb, displacement: Vec3) -> bool {
        let id = proxy.0;
        debug_assert!(self.nodes[id as usize].is_leaf());

        let fat = self.nodes[id as usize].aabb;
        if fat.contains(&aabb) {
            let huge = aabb.extended(4.0 * self.margin);
            if huge.contains(&fat) {
                return false;
            }
        }

        self.remove_leaf(id);

        let mut fat = aabb.extended(self.margin);
        let d = DISPLACEMENT_MULTIPLIER * displacement;
        for axis in 0..3 {
            if d[axis] < 0.0 {
                fat.min[axis] += d[axis];
            } else {
                fat.max[axis] += d[axis];
            }
        }

        let node = &mut self.nodes[id as usize];
        node.aabb = fat;
        node.moved = true;
        self.insert_leaf(id);
        true
    }

    #[inline]
    pub fn fat_aabb(&self, proxy: ProxyId) -> Aabb {
        self.nodes[proxy.index()].aabb
    }

    /// User data of a live leaf.
    ///
    /// # Panics
    ///
    /// Panics if the proxy was destroyed.
    pub fn user_data(&self, proxy: ProxyId) -> T {
        match self.nodes.get(proxy.index()).and_then(|n| n.user_data) {
            Some(data) => data,
            None => panic!("stale tree proxy {proxy:?}"),
        }
    }

    #[inline]
    pub fn was_moved(&self, proxy: ProxyId) -> bool {
        self.nodes[proxy.index()].moved
    }

    #[inline]
    pub fn clear_moved(&mut self, proxy: ProxyId) {
        self.nodes[proxy.index()].moved = false;
    }

    /// Visit every leaf whose fat bound overlaps `aabb`. The callback returns
    /// `false` to stop the query.
    pub fn query<F: FnMut(ProxyId) -> bool>(&self, aabb: &Aabb, mut callback: F) {
        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(id) = stack.pop() {
            if id == NULL_NODE {
                continue;
            }
            let node = &self.nodes[id as usize];
            if !node.aabb.overlaps(aabb) {
                continue;
            }
            if node.is_leaf() {
                if !callback(ProxyId(id)) {
                    return;
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Visit leaves whose fat bound is crossed by the segment.
    ///
    /// The callback receives the clipped input and returns the new maximum
    /// fraction: `0` terminates, a negative value ignores the leaf, a
    /// positive value clips the remaining search.
    pub fn ray_cast<F>(&self, input: &RayCastInput, mut callback: F)
    where
        F: FnMut(&RayCastInput, ProxyId) -> f32,
    {
        let mut sub = *input;
        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(id) = stack.pop() {
            if id == NULL_NODE {
                continue;
            }
            let node = &self.nodes[id as usize];
            if !node.aabb.test_ray(sub.p1, sub.p2, sub.max_fraction) {
                continue;
            }
            if node.is_leaf() {
                let value = callback(&sub, ProxyId(id));
                if value == 0.0 {
                    return;
                }
                if value > 0.0 {
                    sub.max_fraction = value;
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Height of the root, `0` for an empty tree or a single leaf.
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Largest height difference between sibling subtrees.
    pub fn max_balance(&self) -> i32 {
        self.nodes
            .iter()
            .filter(|n| n.height >= 1)
            .map(|n| {
                (self.nodes[n.child2 as usize].height - self.nodes[n.child1 as usize].height).abs()
            })
            .max()
            .unwrap_or(0)
    }

    /// Sum of node areas over the root area.
    pub fn area_ratio(&self) -> f32 {
        if self.root == NULL_NODE {
            return 0.0;
        }
        let root_area = self.nodes[self.root as usize].aabb.surface_area();
        let total: f32 = self
            .nodes
            .iter()
            .filter(|n| n.height >= 0)
            .map(|n| n.aabb.surface_area())
            .sum();
        total / root_area
    }

    /// Check parent links, heights, bounds and the free list.
    pub fn validate(&self) {
        self.validate_node(self.root);

        let mut free_count = 0;
        let mut free = self.free_list;
        while free != NULL_NODE {
            assert!((free as usize) < self.nodes.len());
            free = self.nodes[free as usize].parent;
            free_count += 1;
        }

        let live = self.nodes.iter().filter(|n| n.height >= 0).count();
        assert_eq!(live + free_count, self.nodes.len());
        assert_eq!(self.height(), self.compute_height(self.root));
    }

    fn validate_node(&self, id: u32) {
        if id == NULL_NODE {
            return;
        }
        let node = &self.nodes[id as usize];
        if id == self.root {
            assert_eq!(node.parent, NULL_NODE);
        }
        if node.is_leaf() {
            assert_eq!(node.child2, NULL_NODE);
            assert_eq!(node.height, 0);
            assert!(node.user_data.is_some());
            return;
        }

        let (c1, c2) = (node.child1, node.child2);
        assert_eq!(self.nodes[c1 as usize].parent, id);
        assert_eq!(self.nodes[c2 as usize].parent, id);

        let h1 = self.nodes[c1 as usize].height;
        let h2 = self.nodes[c2 as usize].height;
        assert_eq!(node.height, 1 + h1.max(h2));

        let union = self.nodes[c1 as usize]
            .aabb
            .union(&self.nodes[c2 as usize].aabb);
        assert!(node.aabb.contains(&union));

        self.validate_node(c1);
        self.validate_node(c2);
    }

    fn compute_height(&self, id: u32) -> i32 {
        if id == NULL_NODE {
            return 0;
        }
        let node = &self.nodes[id as usize];
        if node.is_leaf() {
            return 0;
        }
        1 + self
            .compute_height(node.child1)
            .max(self.compute_height(node.child2))
    }

    fn allocate_node(&mut self) -> u32 {
        if self.free_list == NULL_NODE {
            self.nodes.push(TreeNode::new());
            return (self.nodes.len() - 1) as u32;
        }
        let id = self.free_list;
        self.free_list = self.nodes[id as usize].parent;
        self.nodes[id as usize] = TreeNode::new();
        id
    }

    fn free_node(&mut self, id: u32) {
        let node = &mut self.nodes[id as usize];
        node.parent = self.free_list;
        node.child1 = NULL_NODE;
        node.child2 = NULL_NODE;
        node.user_data = None;
        node.height = -1;
        node.moved = false;
        self.free_list = id;
    }

    /// Cost of descending into `child` when inserting `leaf_aabb`.
    fn descend_cost(&self, child: u32, leaf_aabb: &Aabb) -> f32 {
        let node = &self.nodes[child as usize];
        let area = leaf_aabb.union(&node.aabb).surface_area();
        if node.is_leaf() {
            area
        } else {
            area - node.aabb.surface_area()
        }
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        // Find the best sibling.
        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut index = self.root;
        while !self.nodes[index as usize].is_leaf() {
            let node = &self.nodes[index as usize];
            let (child1, child2) = (node.child1, node.child2);

            let area = node.aabb.surface_area();
            let combined_area = node.aabb.union(&leaf_aabb).surface_area();

            // Cost of a new parent for this node and the leaf.
            let cost = 2.0 * combined_area;
            // Minimum cost of pushing the leaf further down.
            let inheritance = 2.0 * (combined_area - area);

            let cost1 = self.descend_cost(child1, &leaf_aabb) + inheritance;
            let cost2 = self.descend_cost(child2, &leaf_aabb) + inheritance;

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { child1 } else { child2 };
        }
        let sibling = index;

        let old_parent = self.nodes[sibling as usize].parent;
        let new_parent = self.allocate_node();
        {
            let sibling_node = &self.nodes[sibling as usize];
            let aabb = leaf_aabb.union(&sibling_node.aabb);
            let height = sibling_node.height + 1;
            let node = &mut self.nodes[new_parent as usize];
            node.parent = old_parent;
            node.aabb = aabb;
            node.height = height;
            node.child1 = sibling;
            node.child2 = leaf;
        }

        if old_parent != NULL_NODE {
            let parent = &mut self.nodes[old_parent as usize];
            if parent.child1 == sibling {
                parent.child1 = new_parent;
            } else {
                parent.child2 = new_parent;
            }
        } else {
            self.root = new_parent;
        }
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        self.refit_ancestors(self.nodes[leaf as usize].parent);
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grand_parent = self.nodes[parent as usize].parent;
        let sibling = if self.nodes[parent as usize].child1 == leaf {
            self.nodes[parent as usize].child2
        } else {
            self.nodes[parent as usize].child1
        };

        if grand_parent != NULL_NODE {
            let gp = &mut self.nodes[grand_parent as usize];
            if gp.child1 == parent {
                gp.child1 = sibling;
            } else {
                gp.child2 = sibling;
            }
            self.nodes[sibling as usize].parent = grand_parent;
            self.free_node(parent);
            self.refit_ancestors(grand_parent);
        } else {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_NODE;
            self.free_node(parent);
        }
    }

    /// Rebalance and refit from `index` up to the root.
    fn refit_ancestors(&mut self, mut index: u32) {
        while index != NULL_NODE {
            index = self.balance(index);

            let (c1, c2) = {
                let node = &self.nodes[index as usize];
                (node.child1, node.child2)
            };
            let height = 1 + self.nodes[c1 as usize]
                .height
                .max(self.nodes[c2 as usize].height);
            let aabb = self.nodes[c1 as usize]
                .aabb
                .union(&self.nodes[c2 as usize].aabb);

            let node = &mut self.nodes[index as usize];
            node.height = height;
            node.aabb = aabb;
            index = node.parent;
        }
    }

    /// Rotate `a` if its children differ in height by more than one.
    /// Returns the index of the subtree root.
    fn balance(&mut self, a: u32) -> u32 {
        let node = &self.nodes[a as usize];
        if node.is_leaf() || node.height < 2 {
            return a;
        }

        let (b, c) = (node.child1, node.child2);
        let balance = self.nodes[c as usize].height - self.nodes[b as usize].height;

        if balance > 1 {
            self.rotate_up(a, c, b, true)
        } else if balance < -1 {
            self.rotate_up(a, b, c, false)
        } else {
            a
        }
    }

    /// Promote the taller child `high` of `a` into `a`'s place. `a` keeps
    /// `low` and adopts the shorter grandchild in the slot `high` occupied.
    fn rotate_up(&mut self, a: u32, high: u32, low: u32, high_is_child2: bool) -> u32 {
        let (g1, g2) = {
            let n = &self.nodes[high as usize];
            (n.child1, n.child2)
        };

        let a_parent = self.nodes[a as usize].parent;
        self.nodes[high as usize].child1 = a;
        self.nodes[high as usize].parent = a_parent;
        self.nodes[a as usize].parent = high;

        if a_parent != NULL_NODE {
            let p = &mut self.nodes[a_parent as usize];
            if p.child1 == a {
                p.child1 = high;
            } else {
                p.child2 = high;
            }
        } else {
            self.root = high;
        }

        let (keep, give) = if self.nodes[g1 as usize].height > self.nodes[g2 as usize].height {
            (g1, g2)
        } else {
            (g2, g1)
        };

        self.nodes[high as usize].child2 = keep;
        if high_is_child2 {
            self.nodes[a as usize].child2 = give;
        } else {
            self.nodes[a as usize].child1 = give;
        }
        self.nodes[give as usize].parent = a;

        let a_aabb = self.nodes[low as usize]
            .aabb
            .union(&self.nodes[give as usize].aabb);
        let a_height = 1 + self.nodes[low as usize]
            .height
            .max(self.nodes[give as usize].height);
        self.nodes[a as usize].aabb = a_aabb;
        self.nodes[a as usize].height = a_height;

        let keep_node = &self.nodes[keep as usize];
        let high_aabb = a_aabb.union(&keep_node.aabb);
        let high_height = 1 + a_height.max(keep_node.height);
        self.nodes[high as usize].aabb = high_aabb;
        self.nodes[high as usize].height = high_height;

        high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(center: Vec3) -> Aabb {
        Aabb::new(center - Vec3::splat(0.5), center + Vec3::splat(0.5))
    }

    #[test]
    fn test_create_and_query() {
        let mut tree = DynamicTree::new(0.1, 16);
        let a = tree.create_proxy(unit_box(Vec3::ZERO), 1u32);
        let b = tree.create_proxy(unit_box(Vec3::new(5.0, 0.0, 0.0)), 2u32);
        tree.validate();

        let mut hits = Vec::new();
        tree.query(&unit_box(Vec3::new(0.5, 0.0, 0.0)), |id| {
            hits.push(id);
            true
        });
        assert_eq!(hits, vec![a]);
        assert_eq!(tree.user_data(b), 2);
        assert_eq!(tree.proxy_count(), 2);
    }

    #[test]
    fn test_fat_margin() {
        let mut tree = DynamicTree::new(0.1, 4);
        let id = tree.create_proxy(unit_box(Vec3::ZERO), ());
        let fat = tree.fat_aabb(id);
        assert!((fat.min.x + 0.6).abs() < 1e-6);
        assert!((fat.max.z - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_small_move_keeps_leaf() {
        let mut tree = DynamicTree::new(0.1, 4);
        let id = tree.create_proxy(unit_box(Vec3::ZERO), ());
        let moved = tree.move_proxy(id, unit_box(Vec3::new(0.05, 0.0, 0.0)), Vec3::ZERO);
        assert!(!moved);

        let moved = tree.move_proxy(id, unit_box(Vec3::new(1.0, 0.0, 0.0)), Vec3::X);
        assert!(moved);
        let fat = tree.fat_aabb(id);
        assert!(fat.contains(&unit_box(Vec3::new(1.0, 0.0, 0.0))));
        assert!(fat.max.x > 1.5 + 0.1 + 3.9);
        tree.validate();
    }

    #[test]
    fn test_destroy_reuses_nodes() {
        let mut tree = DynamicTree::new(0.1, 16);
        let ids: Vec<_> = (0..8)
            .map(|i| tree.create_proxy(unit_box(Vec3::new(i as f32 * 2.0, 0.0, 0.0)), i))
            .collect();
        let node_count = tree.nodes.len();
        for &id in &ids[..4] {
            tree.destroy_proxy(id);
        }
        tree.validate();
        for i in 0..4 {
            tree.create_proxy(unit_box(Vec3::new(0.0, i as f32 * 2.0, 0.0)), 10 + i);
        }
        tree.validate();
        assert_eq!(tree.nodes.len(), node_count);
        assert_eq!(tree.proxy_count(), 8);
    }

    #[test]
    fn test_balanced_for_sorted_insertion() {
        let mut tree = DynamicTree::new(0.0, 256);
        for i in 0..128 {
            tree.create_proxy(unit_box(Vec3::new(i as f32 * 2.0, 0.0, 0.0)), i);
        }
        tree.validate();
        assert!(tree.max_balance() <= 1);
        // 128 leaves: a perfectly balanced tree has height 7.
        assert!(tree.height() <= 14, "height {}", tree.height());
    }

    #[test]
    fn test_ray_cast_visits_crossed_leaves() {
        let mut tree = DynamicTree::new(0.0, 16);
        let near = tree.create_proxy(unit_box(Vec3::new(2.0, 0.0, 0.0)), 0);
        let _far = tree.create_proxy(unit_box(Vec3::new(6.0, 0.0, 0.0)), 1);
        let _off = tree.create_proxy(unit_box(Vec3::new(2.0, 5.0, 0.0)), 2);

        let input = RayCastInput {
            p1: Vec3::ZERO,
            p2: Vec3::new(10.0, 0.0, 0.0),
            max_fraction: 1.0,
        };
        let mut visited = Vec::new();
        tree.ray_cast(&input, |sub, id| {
            visited.push(id);
            if id == near {
                // Clip at the near box entry.
                0.15
            } else {
                sub.max_fraction
            }
        });
        assert!(visited.contains(&near));
        assert_eq!(tree.user_data(near), 0);
        // The raised box is never crossed.
        assert!(visited.iter().all(|&id| tree.user_data(id) != 2));
    }
}
