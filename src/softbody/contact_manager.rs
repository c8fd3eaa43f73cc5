//! Node against world shape contacts for soft bodies.

use std::collections::HashMap;

use glam::Vec3;
use tracing::trace;

use crate::collision::{Aabb, BroadPhase, ProxyId};
use crate::config::CollisionConfig;
use crate::contact::{BlockPool, Handle, List, SphereShapeContact};
use crate::shapes::{Sphere, WorldShape};

use super::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoftBodyProxy {
    Node(u32),
    Shape(u32),
}

#[derive(Debug, Clone, Copy)]
struct ProxyEntry {
    proxy: ProxyId,
    center: Vec3,
}

pub struct SoftBodyContactManager {
    broad_phase: BroadPhase<SoftBodyProxy>,
    node_proxies: Vec<ProxyEntry>,
    shape_proxies: Vec<ProxyEntry>,
    pool: BlockPool<SphereShapeContact>,
    list: List<SphereShapeContact>,
    pairs: HashMap<(u32, u32), Handle<SphereShapeContact>>,
}

impl SoftBodyContactManager {
    pub fn new(config: &CollisionConfig) -> Self {
        Self {
            broad_phase: BroadPhase::new(&config.broad_phase),
            node_proxies: Vec::new(),
            shape_proxies: Vec::new(),
            pool: BlockPool::new(&config.contact_pool),
            list: List::new(),
            pairs: HashMap::new(),
        }
    }

    pub fn broad_phase(&self) -> &BroadPhase<SoftBodyProxy> {
        &self.broad_phase
    }

    pub fn sync_proxies(&mut self, nodes: &[Node], shapes: &[WorldShape]) {
        let bp = &mut self.broad_phase;
        let node_aabbs = nodes
            .iter()
            .map(|n| Aabb::from_sphere(n.position, n.radius));
        for (i, aabb) in node_aabbs.enumerate() {
            sync_one(bp, &mut self.node_proxies, i, aabb, SoftBodyProxy::Node);
        }
        for (i, shape) in shapes.iter().enumerate() {
            sync_one(
                bp,
                &mut self.shape_proxies,
                i,
                shape.compute_aabb(),
                SoftBodyProxy::Shape,
            );
        }
    }

    pub fn find_new_contacts(&mut self, nodes: &[Node]) {
        let mut new_pairs = Vec::new();
        self.broad_phase
            .find_new_pairs(|a, b| new_pairs.push((a, b)));
        for (a, b) in new_pairs {
            self.add_pair(nodes, a, b);
        }
    }

    pub fn add_pair(&mut self, nodes: &[Node], a: SoftBodyProxy, b: SoftBodyProxy) {
        let (node, shape) = match (a, b) {
            (SoftBodyProxy::Node(n), SoftBodyProxy::Shape(s))
            | (SoftBodyProxy::Shape(s), SoftBodyProxy::Node(n)) => (n, s),
            _ => return,
        };
        if !nodes[node as usize].is_dynamic() || self.pairs.contains_key(&(node, shape)) {
            return;
        }
        self.create_contact(node, shape);
    }

    pub fn update_contacts(&mut self, nodes: &[Node], shapes: &[WorldShape]) {
        let mut current = self.list.head();
        while let Some(handle) = current {
            current = self.list.next(&self.pool, handle);
            let (n, s) = {
                let c = &self.pool[handle];
                (c.sphere, c.shape)
            };
            let overlap = self.broad_phase.test_overlap(
                self.node_proxies[n as usize].proxy,
                self.shape_proxies[s as usize].proxy,
            );
            if !overlap {
                self.destroy_contact(handle);
                continue;
            }
            let node = &nodes[n as usize];
            self.pool[handle].update(
                &Sphere::new(node.position, node.radius),
                &shapes[s as usize],
            );
        }
    }

    pub fn create_contact(&mut self, node: u32, shape: u32) -> Handle<SphereShapeContact> {
        let handle = self.pool.allocate(SphereShapeContact::new(node, shape));
        self.list.push_front(&mut self.pool, handle);
        self.pairs.insert((node, shape), handle);
        trace!(node, shape, "node-shape contact created");
        handle
    }

    pub fn destroy_contact(&mut self, handle: Handle<SphereShapeContact>) {
        self.list.remove(&mut self.pool, handle);
        let c = self.pool.free(handle);
        self.pairs.remove(&(c.sphere, c.shape));
        trace!(node = c.sphere, shape = c.shape, "node-shape contact destroyed");
    }

    pub fn contacts(&self) -> impl Iterator<Item = &SphereShapeContact> {
        self.list.iter(&self.pool).map(|(_, c)| c)
    }

    pub fn contact_count(&self) -> usize {
        self.list.len()
    }

    pub fn pool(&self) -> &BlockPool<SphereShapeContact> {
        &self.pool
    }
}

fn sync_one(
    bp: &mut BroadPhase<SoftBodyProxy>,
    entries: &mut Vec<ProxyEntry>,
    index: usize,
    aabb: Aabb,
    make: fn(u32) -> SoftBodyProxy,
) {
    let center = aabb.center();
    match entries.get_mut(index) {
        Some(entry) => {
            bp.move_proxy(entry.proxy, aabb, center - entry.center);
            entry.center = center;
        }
        None => {
            let proxy = bp.create_proxy(aabb, make(index as u32));
            entries.push(ProxyEntry { proxy, center });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;
    use crate::shapes::Shape;
    use crate::softbody::NodeType;

    #[test]
    fn test_node_on_ground() {
        let shapes = vec![WorldShape::new(Shape::cuboid(Vec3::ONE), Transform::IDENTITY)];
        let nodes = vec![
            Node::new(Vec3::new(0.0, 1.05, 0.0), 1.0, 0.1, NodeType::Dynamic),
            Node::new(Vec3::new(0.5, 1.05, 0.0), 1.0, 0.1, NodeType::Static),
            Node::new(Vec3::new(0.0, 4.0, 0.0), 1.0, 0.1, NodeType::Dynamic),
        ];

        let mut manager = SoftBodyContactManager::new(&CollisionConfig::default());
        manager.sync_proxies(&nodes, &shapes);
        manager.find_new_contacts(&nodes);
        manager.update_contacts(&nodes, &shapes);

        assert_eq!(manager.contact_count(), 1);
        let c = manager.contacts().next().unwrap();
        assert_eq!(c.sphere, 0);
        assert!(c.touching);
        assert!((c.separation + 0.05).abs() < 1e-4);
        assert!((c.normal - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_contact_destroyed_when_node_leaves() {
        let shapes = vec![WorldShape::new(Shape::cuboid(Vec3::ONE), Transform::IDENTITY)];
        let mut nodes = vec![Node::new(Vec3::new(0.0, 1.05, 0.0), 1.0, 0.1, NodeType::Dynamic)];
        let mut manager = SoftBodyContactManager::new(&CollisionConfig::default());
        manager.sync_proxies(&nodes, &shapes);
        manager.find_new_contacts(&nodes);
        assert_eq!(manager.contact_count(), 1);

        nodes[0].position.y = 10.0;
        manager.sync_proxies(&nodes, &shapes);
        manager.update_contacts(&nodes, &shapes);
        assert_eq!(manager.contact_count(), 0);
        assert!(manager.pool().is_empty());
    }
}
