//! Contact lifecycle for rigid colliders stored in a `hecs` world.

use std::collections::HashMap;

use glam::Vec3;
use tracing::trace;

use crate::collision::{BroadPhase, ProxyId, RayCastInput, RayCastOutput};
use crate::config::CollisionConfig;
use crate::contact::{BlockPool, ConvexContact, Handle, List};
use crate::math::Transform;

use super::components::Collider;

pub type RigidContact = ConvexContact<hecs::Entity>;

#[derive(Debug, Clone, Copy)]
struct ProxyEntry {
    proxy: ProxyId,
    position: Vec3,
}

/// Broad phase plus persistent convex contacts for every collider entity.
pub struct RigidContactManager {
    config: CollisionConfig,
    broad_phase: BroadPhase<hecs::Entity>,
    proxies: HashMap<hecs::Entity, ProxyEntry>,
    pool: BlockPool<RigidContact>,
    list: List<RigidContact>,
    pairs: HashMap<(hecs::Entity, hecs::Entity), Handle<RigidContact>>,
}

impl RigidContactManager {
    pub fn new(config: CollisionConfig) -> Self {
        Self {
            broad_phase: BroadPhase::new(&config.broad_phase),
            pool: BlockPool::new(&config.contact_pool),
            proxies: HashMap::new(),
            list: List::new(),
            pairs: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    pub fn broad_phase(&self) -> &BroadPhase<hecs::Entity> {
        &self.broad_phase
    }

    /// Sync proxies with the world, then find and update contacts.
    pub fn step(&mut self, world: &hecs::World) {
        self.sync_proxies(world);
        self.find_new_contacts(world);
        self.update_contacts(world);
    }

    /// Create, move and destroy proxies so the broad phase matches the
    /// entities carrying a [`Collider`] and a [`Transform`].
    pub fn sync_proxies(&mut self, world: &hecs::World) {
        let mut seen = Vec::with_capacity(self.proxies.len());

        for (entity, (collider, transform)) in world.query::<(&Collider, &Transform)>().iter() {
            let aabb = collider.shape.compute_aabb(transform);
            let position = transform.translation;
            match self.proxies.get_mut(&entity) {
                Some(entry) => {
                    let displacement = position - entry.position;
                    self.broad_phase.move_proxy(entry.proxy, aabb, displacement);
                    entry.position = position;
                }
                None => {
                    let proxy = self.broad_phase.create_proxy(aabb, entity);
                    self.proxies.insert(entity, ProxyEntry { proxy, position });
                }
            }
            seen.push(entity);
        }

        if seen.len() == self.proxies.len() {
            return;
        }

        let mut removed: Vec<hecs::Entity> = self
            .proxies
            .keys()
            .copied()
            .filter(|e| !seen.contains(e))
            .collect();
        removed.sort_unstable_by_key(|e| e.to_bits());

        for entity in removed {
            self.destroy_entity_contacts(entity);
            if let Some(entry) = self.proxies.remove(&entity) {
                self.broad_phase.destroy_proxy(entry.proxy);
            }
        }
    }

    /// Turn new broad phase pairs into contacts.
    pub fn find_new_contacts(&mut self, world: &hecs::World) {
        let mut new_pairs = Vec::new();
        self.broad_phase
            .find_new_pairs(|a, b| new_pairs.push((a, b)));
        for (a, b) in new_pairs {
            self.add_pair(world, a, b);
        }
    }

    /// Create a contact for an eligible pair. Ineligible pairs are ignored.
    pub fn add_pair(&mut self, world: &hecs::World, a: hecs::Entity, b: hecs::Entity) {
        if a == b {
            return;
        }
        let key = pair_key(a, b);
        if self.pairs.contains_key(&key) {
            return;
        }

        let (Ok(c1), Ok(c2)) = (world.get::<&Collider>(key.0), world.get::<&Collider>(key.1)) else {
            return;
        };
        if !should_collide(&c1, &c2) {
            return;
        }

        let handle = self.pool.allocate(RigidContact::new(key.0, key.1));
        self.list.push_front(&mut self.pool, handle);
        self.pairs.insert(key, handle);
        trace!(entity1 = ?key.0, entity2 = ?key.1, "rigid contact created");
    }

    /// Refresh every contact; contacts whose fat bounds separated are
    /// destroyed.
    pub fn update_contacts(&mut self, world: &hecs::World) {
        let mut current = self.list.head();
        while let Some(handle) = current {
            current = self.list.next(&self.pool, handle);

            let (e1, e2) = {
                let c = &self.pool[handle];
                (c.shape1, c.shape2)
            };
            let (Some(p1), Some(p2)) = (self.proxies.get(&e1), self.proxies.get(&e2)) else {
                self.destroy_contact(handle);
                continue;
            };
            if !self.broad_phase.test_overlap(p1.proxy, p2.proxy) {
                self.destroy_contact(handle);
                continue;
            }

            let (Ok(mut q1), Ok(mut q2)) = (
                world.query_one::<(&Collider, &Transform)>(e1),
                world.query_one::<(&Collider, &Transform)>(e2),
            ) else {
                self.destroy_contact(handle);
                continue;
            };
            let (Some((c1, xf1)), Some((c2, xf2))) = (q1.get(), q2.get()) else {
                self.destroy_contact(handle);
                continue;
            };

            self.pool[handle].update(&c1.shape, xf1, &c2.shape, xf2, &self.config);
        }
    }

    pub fn destroy_contact(&mut self, handle: Handle<RigidContact>) {
        self.list.remove(&mut self.pool, handle);
        let contact = self.pool.free(handle);
        self.pairs.remove(&(contact.shape1, contact.shape2));
        trace!(
            entity1 = ?contact.shape1,
            entity2 = ?contact.shape2,
            "rigid contact destroyed"
        );
    }

    fn destroy_entity_contacts(&mut self, entity: hecs::Entity) {
        let handles: Vec<_> = self
            .list
            .iter(&self.pool)
            .filter(|(_, c)| c.shape1 == entity || c.shape2 == entity)
            .map(|(h, _)| h)
            .collect();
        for handle in handles {
            self.destroy_contact(handle);
        }
    }

    /// All live contacts, touching or not.
    pub fn contacts(&self) -> impl Iterator<Item = &RigidContact> {
        self.list.iter(&self.pool).map(|(_, c)| c)
    }

    pub fn contact_count(&self) -> usize {
        self.list.len()
    }

    pub fn touching_count(&self) -> usize {
        self.contacts().filter(|c| c.touching).count()
    }

    pub fn contact(&self, a: hecs::Entity, b: hecs::Entity) -> Option<&RigidContact> {
        self.pairs.get(&pair_key(a, b)).map(|&h| &self.pool[h])
    }

    pub fn pool(&self) -> &BlockPool<RigidContact> {
        &self.pool
    }

    /// Closest collider hit by a segment.
    pub fn ray_cast(
        &self,
        world: &hecs::World,
        input: &RayCastInput,
    ) -> Option<(hecs::Entity, RayCastOutput)> {
        let mut best = None;
        self.broad_phase.ray_cast(input, |sub, proxy| {
            let entity = self.broad_phase.user_data(proxy);
            let Ok(mut query) = world.query_one::<(&Collider, &Transform)>(entity) else {
                return -1.0;
            };
            let Some((collider, xf)) = query.get() else {
                return -1.0;
            };
            match collider.shape.ray_cast(sub, xf) {
                Some(out) => {
                    best = Some((entity, out));
                    out.fraction
                }
                None => -1.0,
            }
        });
        best
    }
}

fn pair_key(a: hecs::Entity, b: hecs::Entity) -> (hecs::Entity, hecs::Entity) {
    if a.to_bits() <= b.to_bits() {
        (a, b)
    } else {
        (b, a)
    }
}

/// At least one dynamic body, no sensors, both shapes convex.
fn should_collide(c1: &Collider, c2: &Collider) -> bool {
    if !c1.is_dynamic() && !c2.is_dynamic() {
        return false;
    }
    if c1.is_sensor || c2.is_sensor {
        return false;
    }
    c1.shape.is_convex() && c2.shape.is_convex()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Sdf;
    use crate::shapes::Shape;
    use std::sync::Arc;

    fn at(x: f32, y: f32, z: f32) -> Transform {
        Transform::from_translation(Vec3::new(x, y, z))
    }

    fn ground() -> (Collider, Transform) {
        (
            Collider::new_static(Shape::cuboid(Vec3::new(5.0, 0.5, 5.0))),
            at(0.0, -0.5, 0.0),
        )
    }

    #[test]
    fn test_resting_sphere_gets_touching_contact() {
        let mut world = hecs::World::new();
        let g = world.spawn(ground());
        let ball = world.spawn((Collider::new_dynamic(Shape::sphere(0.5)), at(0.0, 0.45, 0.0)));

        let mut manager = RigidContactManager::new(CollisionConfig::default());
        manager.step(&world);
        assert_eq!(manager.contact_count(), 1);
        assert_eq!(manager.touching_count(), 1);

        let contact = manager.contact(ball, g).unwrap();
        assert_eq!(contact.manifold.point_count(), 1);
        assert!((contact.manifold.points[0].separation + 0.05).abs() < 1e-4);
    }

    #[test]
    fn test_repeated_steps_keep_one_contact() {
        let mut world = hecs::World::new();
        world.spawn(ground());
        let ball = world.spawn((Collider::new_dynamic(Shape::sphere(0.5)), at(0.0, 0.45, 0.0)));

        let mut manager = RigidContactManager::new(CollisionConfig::default());
        for i in 0..10 {
            world.get::<&mut Transform>(ball).unwrap().translation.x = i as f32 * 0.3;
            manager.step(&world);
            assert_eq!(manager.contact_count(), 1);
        }
        assert_eq!(manager.pool().high_water_mark(), 1);
    }

    #[test]
    fn test_separated_pair_is_destroyed() {
        let mut world = hecs::World::new();
        world.spawn(ground());
        let ball = world.spawn((Collider::new_dynamic(Shape::sphere(0.5)), at(0.0, 0.45, 0.0)));

        let mut manager = RigidContactManager::new(CollisionConfig::default());
        manager.step(&world);
        assert_eq!(manager.contact_count(), 1);

        *world.get::<&mut Transform>(ball).unwrap() = at(0.0, 10.0, 0.0);
        manager.step(&world);
        assert_eq!(manager.contact_count(), 0);
        assert_eq!(manager.pool().len(), 0);
    }

    #[test]
    fn test_despawn_removes_proxy_and_contacts() {
        let mut world = hecs::World::new();
        world.spawn(ground());
        let ball = world.spawn((Collider::new_dynamic(Shape::sphere(0.5)), at(0.0, 0.45, 0.0)));

        let mut manager = RigidContactManager::new(CollisionConfig::default());
        manager.step(&world);
        world.despawn(ball).unwrap();
        manager.step(&world);
        assert_eq!(manager.contact_count(), 0);
        assert_eq!(manager.broad_phase().proxy_count(), 1);
    }

    #[test]
    fn test_ineligible_pairs_are_rejected() {
        let mut world = hecs::World::new();
        world.spawn(ground());
        world.spawn((Collider::new_static(Shape::sphere(0.5)), at(0.0, 0.45, 0.0)));
        world.spawn((
            Collider::new_dynamic(Shape::sphere(0.5)).sensor(),
            at(1.0, 0.45, 0.0),
        ));
        let sdf = Arc::new(Sdf::from_fn(
            crate::collision::Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
            [4, 4, 4],
            |p| f64::from(p.length() - 0.5),
        ));
        world.spawn((Collider::new_dynamic(Shape::sdf(sdf, 0.0)), at(-1.0, 0.45, 0.0)));

        let mut manager = RigidContactManager::new(CollisionConfig::default());
        manager.step(&world);
        assert_eq!(manager.contact_count(), 0);
    }

    #[test]
    fn test_ray_cast_hits_closest() {
        let mut world = hecs::World::new();
        let g = world.spawn(ground());
        let ball = world.spawn((Collider::new_dynamic(Shape::sphere(0.5)), at(0.0, 2.0, 0.0)));

        let mut manager = RigidContactManager::new(CollisionConfig::default());
        manager.step(&world);

        let input = RayCastInput::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -5.0, 0.0));
        let (entity, out) = manager.ray_cast(&world, &input).unwrap();
        assert_eq!(entity, ball);
        assert!((out.fraction - 0.25).abs() < 1e-4);

        let input = RayCastInput::new(Vec3::new(3.0, 5.0, 0.0), Vec3::new(3.0, -5.0, 0.0));
        let (entity, out) = manager.ray_cast(&world, &input).unwrap();
        assert_eq!(entity, g);
        assert!((out.normal - Vec3::Y).length() < 1e-4);
    }
}
