//! Shared setup helpers for rein-collision benchmarks.
//!
//! ## Running
//!
//! Wall-clock time (criterion):
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench collision
//!
//! iai-callgrind (instruction counts, requires valgrind):
//!   cargo install iai-callgrind-runner
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench collision_iai
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench collision -- broadphase

use glam::{Mat3, Quat, Vec3};
use rein_collision::cloth::{Cloth, ClothDef, ClothMesh};
use rein_collision::collision::{Aabb, BroadPhase};
use rein_collision::config::{BroadPhaseConfig, ClothConfig, CollisionConfig};
use rein_collision::dynamics::{Collider, RigidContactManager};
use rein_collision::math::Transform;
use rein_collision::shapes::{Shape, WorldShape};
use rein_collision::sparse::{DenseVec3, FrameArena, SparseMat33};

// ---------------------------------------------------------------------------
// Rigid scenes
// ---------------------------------------------------------------------------

/// Spawn `n` dynamic spheres in a grid so neighbours overlap.
pub fn setup_sphere_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let cols = (n as f32).sqrt().ceil() as usize;

    for i in 0..n {
        let x = (i % cols) as f32 * 1.5;
        let z = (i / cols) as f32 * 1.5;
        world.spawn((
            Transform::from_translation(Vec3::new(x, 0.0, z)),
            Collider::new_dynamic(Shape::sphere(1.0)),
        ));
    }
    world
}

/// Boxes resting on a static ground slab, slightly rotated.
pub fn setup_box_stack(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    world.spawn((
        Transform::from_translation(Vec3::new(0.0, -0.5, 0.0)),
        Collider::new_static(Shape::cuboid(Vec3::new(50.0, 0.5, 50.0))),
    ));

    let cols = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let x = (i % cols) as f32 * 2.5;
        let z = (i / cols) as f32 * 2.5;
        world.spawn((
            Transform::from_rotation_translation(
                Quat::from_rotation_y(0.1 * i as f32),
                Vec3::new(x, 0.49, z),
            ),
            Collider::new_dynamic(Shape::cuboid(Vec3::splat(0.5))),
        ));
    }
    world
}

/// Contact manager that has already found every pair in `world`.
pub fn setup_contact_manager(world: &hecs::World) -> RigidContactManager {
    let mut manager = RigidContactManager::new(CollisionConfig::default());
    manager.step(world);
    manager
}

// ---------------------------------------------------------------------------
// Broad phase
// ---------------------------------------------------------------------------

/// Broad phase holding `n` unit boxes on a jittered grid.
pub fn setup_broad_phase(n: usize) -> BroadPhase<u32> {
    let mut bp = BroadPhase::new(&BroadPhaseConfig::default());
    let cols = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let x = (i % cols) as f32 * 1.8;
        let z = (i / cols) as f32 * 1.8;
        let jitter = ((i * 7919) % 13) as f32 * 0.05;
        let center = Vec3::new(x + jitter, jitter, z);
        bp.create_proxy(Aabb::new(center - Vec3::ONE, center + Vec3::ONE), i as u32);
    }
    bp
}

// ---------------------------------------------------------------------------
// Narrow phase
// ---------------------------------------------------------------------------

/// Two overlapping boxes, the second rotated about two axes.
pub fn box_pair() -> (Shape, Transform, Shape, Transform) {
    let shape = Shape::cuboid(Vec3::splat(0.5));
    let xf1 = Transform::IDENTITY;
    let xf2 = Transform::from_rotation_translation(
        Quat::from_rotation_y(0.4) * Quat::from_rotation_x(0.3),
        Vec3::new(0.3, 0.95, 0.1),
    );
    (shape.clone(), xf1, shape, xf2)
}

// ---------------------------------------------------------------------------
// Sparse algebra and cloth
// ---------------------------------------------------------------------------

/// Block tridiagonal matrix of `n` rows plus a matching vector.
pub fn setup_sparse_system(arena: &FrameArena, n: usize) -> (SparseMat33<'_>, DenseVec3) {
    let mut a = SparseMat33::new(arena, n);
    let block = Mat3::from_diagonal(Vec3::new(4.0, 4.0, 4.0));
    for i in 0..n {
        a[(i, i)] = block;
        if i > 0 {
            a[(i, i - 1)] = -Mat3::IDENTITY;
        }
        if i + 1 < n {
            a[(i, i + 1)] = -Mat3::IDENTITY;
        }
    }
    let x = DenseVec3::from_vec((0..n).map(|i| Vec3::splat(i as f32 * 0.01)).collect());
    (a, x)
}

/// Square sheet of `cells × cells` quads above a ground box.
pub fn setup_cloth(cells: u32) -> Cloth {
    let mut mesh = ClothMesh::rectangle(cells, cells, 1.0 / cells as f32);
    mesh.translate(Vec3::new(-0.5, 0.2, -0.5));
    let mut cloth = Cloth::new(&mesh, &ClothDef::default(), ClothConfig::default());
    cloth.add_world_shape(WorldShape::new(
        Shape::cuboid(Vec3::new(2.0, 0.5, 2.0)),
        Transform::from_translation(Vec3::new(0.0, -0.5, 0.0)),
    ));
    cloth
}
