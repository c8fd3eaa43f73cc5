//! Contact lifecycle for cloth.
//!
//! Particles, triangles, edges and world shapes share one broad phase.
//! New overlaps become particle–triangle, particle–shape or edge–edge
//! contacts, each variant with its own pool and list.

use std::collections::HashMap;

use glam::Vec3;
use tracing::trace;

use crate::collision::{Aabb, BroadPhase, ProxyId};
use crate::config::CollisionConfig;
use crate::contact::{
    BlockPool, CapsuleCapsuleContact, Handle, List, SphereShapeContact, SphereTriangleContact,
};
use crate::shapes::{Sphere, WorldShape};

use super::{ClothEdge, ClothTriangle, Particle};

/// Broad phase payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClothProxy {
    Particle(u32),
    Triangle(u32),
    Edge(u32),
    Shape(u32),
}

/// Borrowed cloth state handed to the contact manager.
#[derive(Debug, Clone, Copy)]
pub struct ClothView<'a> {
    pub particles: &'a [Particle],
    pub triangles: &'a [ClothTriangle],
    pub edges: &'a [ClothEdge],
    pub shapes: &'a [WorldShape],
}

impl ClothView<'_> {
    fn sphere(&self, particle: u32) -> Sphere {
        let p = &self.particles[particle as usize];
        Sphere::new(p.position, p.radius)
    }

    fn triangle_points(&self, triangle: u32) -> [Vec3; 3] {
        self.triangles[triangle as usize]
            .vertices
            .map(|v| self.particles[v as usize].position)
    }

    fn edge_points(&self, edge: u32) -> [Vec3; 2] {
        self.edges[edge as usize]
            .vertices
            .map(|v| self.particles[v as usize].position)
    }

    fn is_dynamic(&self, particle: u32) -> bool {
        self.particles[particle as usize].is_dynamic()
    }
}

#[derive(Debug, Clone, Copy)]
struct ProxyEntry {
    proxy: ProxyId,
    center: Vec3,
}

pub struct ClothContactManager {
    config: CollisionConfig,
    broad_phase: BroadPhase<ClothProxy>,
    particle_proxies: Vec<ProxyEntry>,
    triangle_proxies: Vec<ProxyEntry>,
    edge_proxies: Vec<ProxyEntry>,
    shape_proxies: Vec<ProxyEntry>,

    sphere_triangle_pool: BlockPool<SphereTriangleContact>,
    sphere_triangle_list: List<SphereTriangleContact>,
    sphere_triangle_pairs: HashMap<(u32, u32), Handle<SphereTriangleContact>>,

    sphere_shape_pool: BlockPool<SphereShapeContact>,
    sphere_shape_list: List<SphereShapeContact>,
    sphere_shape_pairs: HashMap<(u32, u32), Handle<SphereShapeContact>>,

    capsule_capsule_pool: BlockPool<CapsuleCapsuleContact>,
    capsule_capsule_list: List<CapsuleCapsuleContact>,
    capsule_capsule_pairs: HashMap<(u32, u32), Handle<CapsuleCapsuleContact>>,
}

impl ClothContactManager {
    pub fn new(config: CollisionConfig) -> Self {
        Self {
            broad_phase: BroadPhase::new(&config.broad_phase),
            particle_proxies: Vec::new(),
            triangle_proxies: Vec::new(),
            edge_proxies: Vec::new(),
            shape_proxies: Vec::new(),
            sphere_triangle_pool: BlockPool::new(&config.contact_pool),
            sphere_triangle_list: List::new(),
            sphere_triangle_pairs: HashMap::new(),
            sphere_shape_pool: BlockPool::new(&config.contact_pool),
            sphere_shape_list: List::new(),
            sphere_shape_pairs: HashMap::new(),
            capsule_capsule_pool: BlockPool::new(&config.contact_pool),
            capsule_capsule_list: List::new(),
            capsule_capsule_pairs: HashMap::new(),
            config,
        }
    }

    pub fn broad_phase(&self) -> &BroadPhase<ClothProxy> {
        &self.broad_phase
    }

    /// Create proxies for new elements and refit the others.
    pub fn sync_proxies(&mut self, view: &ClothView<'_>) {
        let bp = &mut self.broad_phase;
        sync(
            bp,
            &mut self.particle_proxies,
            view.particles
                .iter()
                .map(|p| Aabb::from_sphere(p.position, p.radius)),
            ClothProxy::Particle,
        );
        sync(
            bp,
            &mut self.triangle_proxies,
            (0..view.triangles.len() as u32).map(|t| {
                Aabb::from_points(&view.triangle_points(t))
                    .extended(view.triangles[t as usize].radius)
            }),
            ClothProxy::Triangle,
        );
        sync(
            bp,
            &mut self.edge_proxies,
            (0..view.edges.len() as u32).map(|e| {
                Aabb::from_points(&view.edge_points(e)).extended(view.edges[e as usize].radius)
            }),
            ClothProxy::Edge,
        );
        sync(
            bp,
            &mut self.shape_proxies,
            view.shapes.iter().map(WorldShape::compute_aabb),
            ClothProxy::Shape,
        );
    }

    /// Turn new broad phase pairs into contacts.
    pub fn find_new_contacts(&mut self, view: &ClothView<'_>) {
        let mut new_pairs = Vec::new();
        self.broad_phase
            .find_new_pairs(|a, b| new_pairs.push((a, b)));
        for (a, b) in new_pairs {
            self.add_pair(view, a, b);
        }
    }

    /// Create the contact matching two proxies, if the pair is eligible.
    pub fn add_pair(&mut self, view: &ClothView<'_>, a: ClothProxy, b: ClothProxy) {
        match (a, b) {
            (ClothProxy::Particle(p), ClothProxy::Triangle(t))
            | (ClothProxy::Triangle(t), ClothProxy::Particle(p)) => {
                let vertices = view.triangles[t as usize].vertices;
                if vertices.contains(&p) {
                    return;
                }
                if !view.is_dynamic(p) && !vertices.iter().any(|&v| view.is_dynamic(v)) {
                    return;
                }
                if self.sphere_triangle_pairs.contains_key(&(p, t)) {
                    return;
                }
                self.create_sphere_triangle_contact(p, t);
            }
            (ClothProxy::Particle(p), ClothProxy::Shape(s))
            | (ClothProxy::Shape(s), ClothProxy::Particle(p)) => {
                if !view.is_dynamic(p) || self.sphere_shape_pairs.contains_key(&(p, s)) {
                    return;
                }
                self.create_sphere_shape_contact(p, s);
            }
            (ClothProxy::Edge(e1), ClothProxy::Edge(e2)) => {
                let (e1, e2) = (e1.min(e2), e1.max(e2));
                let v1 = view.edges[e1 as usize].vertices;
                let v2 = view.edges[e2 as usize].vertices;
                if v1.iter().any(|v| v2.contains(v)) {
                    return;
                }
                if !v1.iter().chain(v2.iter()).any(|&v| view.is_dynamic(v)) {
                    return;
                }
                if self.capsule_capsule_pairs.contains_key(&(e1, e2)) {
                    return;
                }
                self.create_capsule_capsule_contact(e1, e2);
            }
            _ => {}
        }
    }

    /// Refresh every contact; contacts whose fat bounds separated are
    /// destroyed.
    pub fn update_contacts(&mut self, view: &ClothView<'_>) {
        let mut current = self.sphere_triangle_list.head();
        while let Some(handle) = current {
            current = self
                .sphere_triangle_list
                .next(&self.sphere_triangle_pool, handle);
            let (p, t) = {
                let c = &self.sphere_triangle_pool[handle];
                (c.particle, c.triangle)
            };
            let overlap = self.broad_phase.test_overlap(
                self.particle_proxies[p as usize].proxy,
                self.triangle_proxies[t as usize].proxy,
            );
            if !overlap {
                self.destroy_sphere_triangle_contact(handle);
                continue;
            }
            let radius = view.triangles[t as usize].radius;
            self.sphere_triangle_pool[handle].update(
                &view.sphere(p),
                &view.triangle_points(t),
                radius,
                &self.config,
            );
        }

        let mut current = self.sphere_shape_list.head();
        while let Some(handle) = current {
            current = self.sphere_shape_list.next(&self.sphere_shape_pool, handle);
            let (p, s) = {
                let c = &self.sphere_shape_pool[handle];
                (c.sphere, c.shape)
            };
            let overlap = self.broad_phase.test_overlap(
                self.particle_proxies[p as usize].proxy,
                self.shape_proxies[s as usize].proxy,
            );
            if !overlap {
                self.destroy_sphere_shape_contact(handle);
                continue;
            }
            self.sphere_shape_pool[handle].update(&view.sphere(p), &view.shapes[s as usize]);
        }

        let mut current = self.capsule_capsule_list.head();
        while let Some(handle) = current {
            current = self
                .capsule_capsule_list
                .next(&self.capsule_capsule_pool, handle);
            let (e1, e2) = {
                let c = &self.capsule_capsule_pool[handle];
                (c.edge1, c.edge2)
            };
            let overlap = self.broad_phase.test_overlap(
                self.edge_proxies[e1 as usize].proxy,
                self.edge_proxies[e2 as usize].proxy,
            );
            if !overlap {
                self.destroy_capsule_capsule_contact(handle);
                continue;
            }
            let r1 = view.edges[e1 as usize].radius;
            let r2 = view.edges[e2 as usize].radius;
            self.capsule_capsule_pool[handle].update(
                &view.edge_points(e1),
                r1,
                &view.edge_points(e2),
                r2,
                &self.config,
            );
        }
    }

    pub fn create_sphere_triangle_contact(
        &mut self,
        particle: u32,
        triangle: u32,
    ) -> Handle<SphereTriangleContact> {
        let handle = self
            .sphere_triangle_pool
            .allocate(SphereTriangleContact::new(particle, triangle));
        self.sphere_triangle_list
            .push_front(&mut self.sphere_triangle_pool, handle);
        self.sphere_triangle_pairs.insert((particle, triangle), handle);
        trace!(particle, triangle, "particle-triangle contact created");
        handle
    }

    pub fn destroy_sphere_triangle_contact(&mut self, handle: Handle<SphereTriangleContact>) {
        self.sphere_triangle_list
            .remove(&mut self.sphere_triangle_pool, handle);
        let c = self.sphere_triangle_pool.free(handle);
        self.sphere_triangle_pairs.remove(&(c.particle, c.triangle));
        trace!(particle = c.particle, triangle = c.triangle, "particle-triangle contact destroyed");
    }

    pub fn create_sphere_shape_contact(
        &mut self,
        particle: u32,
        shape: u32,
    ) -> Handle<SphereShapeContact> {
        let handle = self
            .sphere_shape_pool
            .allocate(SphereShapeContact::new(particle, shape));
        self.sphere_shape_list
            .push_front(&mut self.sphere_shape_pool, handle);
        self.sphere_shape_pairs.insert((particle, shape), handle);
        trace!(particle, shape, "particle-shape contact created");
        handle
    }

    pub fn destroy_sphere_shape_contact(&mut self, handle: Handle<SphereShapeContact>) {
        self.sphere_shape_list
            .remove(&mut self.sphere_shape_pool, handle);
        let c = self.sphere_shape_pool.free(handle);
        self.sphere_shape_pairs.remove(&(c.sphere, c.shape));
        trace!(particle = c.sphere, shape = c.shape, "particle-shape contact destroyed");
    }

    pub fn create_capsule_capsule_contact(
        &mut self,
        edge1: u32,
        edge2: u32,
    ) -> Handle<CapsuleCapsuleContact> {
        let handle = self
            .capsule_capsule_pool
            .allocate(CapsuleCapsuleContact::new(edge1, edge2));
        self.capsule_capsule_list
            .push_front(&mut self.capsule_capsule_pool, handle);
        self.capsule_capsule_pairs.insert((edge1, edge2), handle);
        trace!(edge1, edge2, "edge-edge contact created");
        handle
    }

    pub fn destroy_capsule_capsule_contact(&mut self, handle: Handle<CapsuleCapsuleContact>) {
        self.capsule_capsule_list
            .remove(&mut self.capsule_capsule_pool, handle);
        let c = self.capsule_capsule_pool.free(handle);
        self.capsule_capsule_pairs.remove(&(c.edge1, c.edge2));
        trace!(edge1 = c.edge1, edge2 = c.edge2, "edge-edge contact destroyed");
    }

    pub fn sphere_triangle_contacts(&self) -> impl Iterator<Item = &SphereTriangleContact> {
        self.sphere_triangle_list
            .iter(&self.sphere_triangle_pool)
            .map(|(_, c)| c)
    }

    pub fn sphere_shape_contacts(&self) -> impl Iterator<Item = &SphereShapeContact> {
        self.sphere_shape_list
            .iter(&self.sphere_shape_pool)
            .map(|(_, c)| c)
    }

    pub fn capsule_capsule_contacts(&self) -> impl Iterator<Item = &CapsuleCapsuleContact> {
        self.capsule_capsule_list
            .iter(&self.capsule_capsule_pool)
            .map(|(_, c)| c)
    }

    pub fn sphere_triangle_pool(&self) -> &BlockPool<SphereTriangleContact> {
        &self.sphere_triangle_pool
    }

    pub fn sphere_shape_pool(&self) -> &BlockPool<SphereShapeContact> {
        &self.sphere_shape_pool
    }

    pub fn capsule_capsule_pool(&self) -> &BlockPool<CapsuleCapsuleContact> {
        &self.capsule_capsule_pool
    }
}

/// Create proxies past the end of `entries` and move the existing ones.
fn sync(
    bp: &mut BroadPhase<ClothProxy>,
    entries: &mut Vec<ProxyEntry>,
    aabbs: impl Iterator<Item = Aabb>,
    make: fn(u32) -> ClothProxy,
) {
    for (i, aabb) in aabbs.enumerate() {
        let center = aabb.center();
        match entries.get_mut(i) {
            Some(entry) => {
                bp.move_proxy(entry.proxy, aabb, center - entry.center);
                entry.center = center;
            }
            None => {
                let proxy = bp.create_proxy(aabb, make(i as u32));
                entries.push(ProxyEntry { proxy, center });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloth::ParticleType;
    use crate::math::Transform;
    use crate::shapes::Shape;

    fn particle(position: Vec3, kind: ParticleType) -> Particle {
        let mut p = Particle::new(position, 1.0, kind);
        p.radius = 0.05;
        p
    }

    fn triangle(vertices: [u32; 3]) -> ClothTriangle {
        ClothTriangle {
            vertices,
            radius: 0.05,
            friction: 0.5,
            rest_area: 0.5,
        }
    }

    #[test]
    fn test_particle_over_triangle() {
        let particles = vec![
            particle(Vec3::new(0.0, 0.0, 0.0), ParticleType::Static),
            particle(Vec3::new(1.0, 0.0, 0.0), ParticleType::Static),
            particle(Vec3::new(0.0, 0.0, 1.0), ParticleType::Static),
            particle(Vec3::new(0.25, 0.08, 0.25), ParticleType::Dynamic),
        ];
        let triangles = vec![triangle([0, 1, 2])];
        let view = ClothView {
            particles: &particles,
            triangles: &triangles,
            edges: &[],
            shapes: &[],
        };

        let mut manager = ClothContactManager::new(CollisionConfig::default());
        manager.sync_proxies(&view);
        manager.find_new_contacts(&view);
        assert_eq!(manager.sphere_triangle_contacts().count(), 1);

        manager.update_contacts(&view);
        let c = manager.sphere_triangle_contacts().next().unwrap();
        assert!(c.touching);
        assert!((c.separation + 0.02).abs() < 1e-4);

        // Vertices of the triangle never pair with it.
        assert!(manager
            .sphere_triangle_contacts()
            .all(|c| c.particle == 3 && c.triangle == 0));
    }

    #[test]
    fn test_static_particles_do_not_pair() {
        let particles = vec![particle(Vec3::new(0.0, 1.0, 0.0), ParticleType::Static)];
        let shapes = vec![WorldShape::new(Shape::cuboid(Vec3::ONE), Transform::IDENTITY)];
        let view = ClothView {
            particles: &particles,
            triangles: &[],
            edges: &[],
            shapes: &shapes,
        };
        let mut manager = ClothContactManager::new(CollisionConfig::default());
        manager.sync_proxies(&view);
        manager.find_new_contacts(&view);
        assert_eq!(manager.sphere_shape_contacts().count(), 0);
    }

    #[test]
    fn test_contact_lifecycle_with_shape() {
        let shapes = vec![WorldShape::new(Shape::cuboid(Vec3::ONE), Transform::IDENTITY)];
        let mut particles = vec![particle(Vec3::new(0.0, 1.02, 0.0), ParticleType::Dynamic)];
        let mut manager = ClothContactManager::new(CollisionConfig::default());

        for cycle in 0..20 {
            let view = ClothView {
                particles: &particles,
                triangles: &[],
                edges: &[],
                shapes: &shapes,
            };
            manager.sync_proxies(&view);
            manager.find_new_contacts(&view);
            manager.update_contacts(&view);
            // Alternate between resting on the box and hovering far above.
            particles[0].position.y = if cycle % 2 == 0 { 5.0 } else { 1.02 };
        }
        assert_eq!(manager.sphere_shape_pool().high_water_mark(), 1);
    }

    #[test]
    fn test_adjacent_edges_do_not_pair() {
        let particles = vec![
            particle(Vec3::new(0.0, 0.0, 0.0), ParticleType::Dynamic),
            particle(Vec3::new(1.0, 0.0, 0.0), ParticleType::Dynamic),
            particle(Vec3::new(0.5, 0.05, -0.5), ParticleType::Dynamic),
            particle(Vec3::new(0.5, 0.05, 0.5), ParticleType::Dynamic),
        ];
        let edges = vec![
            ClothEdge { vertices: [0, 1], radius: 0.05 },
            ClothEdge { vertices: [1, 2], radius: 0.05 },
            ClothEdge { vertices: [2, 3], radius: 0.05 },
        ];
        let view = ClothView {
            particles: &particles,
            triangles: &[],
            edges: &edges,
            shapes: &[],
        };
        let mut manager = ClothContactManager::new(CollisionConfig::default());
        manager.sync_proxies(&view);
        manager.find_new_contacts(&view);
        let pairs: Vec<(u32, u32)> = manager
            .capsule_capsule_contacts()
            .map(|c| (c.edge1, c.edge2))
            .collect();
        assert_eq!(pairs, vec![(0, 2)]);

        manager.update_contacts(&view);
        let c = manager.capsule_capsule_contacts().next().unwrap();
        assert!(c.touching);
        assert!((c.normal - Vec3::Y).length() < 1e-4);
    }
}
