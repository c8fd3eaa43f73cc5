//! Mass-spring cloth integrated implicitly, with particle, triangle and edge
//! contacts against itself and against world shapes.

pub mod contact_manager;
pub mod mesh;
pub mod solver;

pub use contact_manager::{ClothContactManager, ClothProxy, ClothView};
pub use mesh::ClothMesh;
pub use solver::{ClothSolver, SolverOutput};

use glam::Vec3;

use crate::config::ClothConfig;
use crate::shapes::WorldShape;
use crate::sparse::FrameArena;

/// How a particle responds to forces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleType {
    /// Never moves.
    Static,
    /// Moves with its velocity but ignores forces.
    Kinematic,
    /// Integrated from forces.
    Dynamic,
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub kind: ParticleType,
    pub position: Vec3,
    pub velocity: Vec3,
    /// External force applied during the next step.
    pub force: Vec3,
    pub mass: f32,
    pub inv_mass: f32,
    pub radius: f32,
    pub friction: f32,
}

impl Particle {
    pub fn new(position: Vec3, mass: f32, kind: ParticleType) -> Self {
        let mut particle = Self {
            kind,
            position,
            velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            mass,
            inv_mass: 0.0,
            radius: 0.0,
            friction: 0.0,
        };
        particle.set_kind(kind);
        particle
    }

    pub fn set_kind(&mut self, kind: ParticleType) {
        self.kind = kind;
        self.inv_mass = if kind == ParticleType::Dynamic && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        };
        if kind == ParticleType::Static {
            self.velocity = Vec3::ZERO;
        }
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.kind == ParticleType::Dynamic
    }
}

#[derive(Debug, Clone)]
pub struct ClothTriangle {
    pub vertices: [u32; 3],
    pub radius: f32,
    pub friction: f32,
    pub rest_area: f32,
}

#[derive(Debug, Clone)]
pub struct ClothEdge {
    pub vertices: [u32; 2],
    pub radius: f32,
}

/// A stretch spring between two particles.
#[derive(Debug, Clone)]
pub struct Spring {
    pub particles: [u32; 2],
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
}

/// Material and collision parameters for [`Cloth::new`].
#[derive(Debug, Clone)]
pub struct ClothDef {
    /// Mass per unit area. Default: 0.2.
    pub density: f32,
    /// Collision radius of particles, triangles and edges. Default: 0.05.
    pub thickness: f32,
    /// Default: 0.5.
    pub friction: f32,
}

impl Default for ClothDef {
    fn default() -> Self {
        Self {
            density: 0.2,
            thickness: 0.05,
            friction: 0.5,
        }
    }
}

pub struct Cloth {
    config: ClothConfig,
    particles: Vec<Particle>,
    triangles: Vec<ClothTriangle>,
    edges: Vec<ClothEdge>,
    springs: Vec<Spring>,
    shapes: Vec<WorldShape>,
    contact_manager: ClothContactManager,
    arena: FrameArena,
    last_solve: Option<SolverOutput>,
}

impl Cloth {
    pub fn new(mesh: &ClothMesh, def: &ClothDef, config: ClothConfig) -> Self {
        let mut particles: Vec<Particle> = mesh
            .vertices
            .iter()
            .map(|&p| {
                let mut particle = Particle::new(p, 0.0, ParticleType::Dynamic);
                particle.radius = def.thickness;
                particle.friction = def.friction;
                particle
            })
            .collect();

        let triangles: Vec<ClothTriangle> = mesh
            .triangles
            .iter()
            .map(|&vertices| {
                let [a, b, c] = vertices.map(|v| mesh.vertices[v as usize]);
                let rest_area = 0.5 * (b - a).cross(c - a).length();
                let share = def.density * rest_area / 3.0;
                for v in vertices {
                    particles[v as usize].mass += share;
                }
                ClothTriangle {
                    vertices,
                    radius: def.thickness,
                    friction: def.friction,
                    rest_area,
                }
            })
            .collect();

        for particle in &mut particles {
            let kind = particle.kind;
            particle.set_kind(kind);
        }

        let edge_list = mesh.edges();
        let springs = edge_list
            .iter()
            .map(|&[a, b]| Spring {
                particles: [a, b],
                rest_length: mesh.vertices[a as usize].distance(mesh.vertices[b as usize]),
                stiffness: config.stretch_stiffness,
                damping: config.damping_stiffness,
            })
            .collect();
        let edges = edge_list
            .into_iter()
            .map(|vertices| ClothEdge {
                vertices,
                radius: def.thickness,
            })
            .collect();

        let mut cloth = Self {
            contact_manager: ClothContactManager::new(config.collision.clone()),
            config,
            particles,
            triangles,
            edges,
            springs,
            shapes: Vec::new(),
            arena: FrameArena::new(),
            last_solve: None,
        };
        cloth.refresh_contacts();
        cloth
    }

    pub fn config(&self) -> &ClothConfig {
        &self.config
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle(&self, index: usize) -> &Particle {
        &self.particles[index]
    }

    pub fn triangles(&self) -> &[ClothTriangle] {
        &self.triangles
    }

    pub fn edges(&self) -> &[ClothEdge] {
        &self.edges
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    pub fn shapes(&self) -> &[WorldShape] {
        &self.shapes
    }

    pub fn contact_manager(&self) -> &ClothContactManager {
        &self.contact_manager
    }

    /// Result of the linear solve in the last step.
    pub fn last_solve(&self) -> Option<&SolverOutput> {
        self.last_solve.as_ref()
    }

    pub fn set_particle_type(&mut self, index: usize, kind: ParticleType) {
        self.particles[index].set_kind(kind);
    }

    pub fn set_particle_velocity(&mut self, index: usize, velocity: Vec3) {
        if self.particles[index].kind != ParticleType::Static {
            self.particles[index].velocity = velocity;
        }
    }

    pub fn apply_force(&mut self, index: usize, force: Vec3) {
        self.particles[index].force += force;
    }

    /// Register a world shape for particle contacts. Returns its index.
    pub fn add_world_shape(&mut self, shape: WorldShape) -> u32 {
        self.shapes.push(shape);
        self.refresh_contacts();
        (self.shapes.len() - 1) as u32
    }

    /// Kinetic plus spring potential energy.
    pub fn energy(&self) -> f32 {
        let kinetic: f32 = self
            .particles
            .iter()
            .map(|p| 0.5 * p.mass * p.velocity.length_squared())
            .sum();
        let potential: f32 = self
            .springs
            .iter()
            .map(|s| {
                let [i, j] = s.particles;
                let l = self.particles[i as usize]
                    .position
                    .distance(self.particles[j as usize].position);
                0.5 * s.stiffness * (l - s.rest_length).powi(2)
            })
            .sum();
        kinetic + potential
    }

    /// Advance the cloth by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        self.contact_manager.update_contacts(&ClothView {
            particles: &self.particles,
            triangles: &self.triangles,
            edges: &self.edges,
            shapes: &self.shapes,
        });

        self.arena.reset();
        let solver = ClothSolver::new(&self.arena, &self.config);
        let output = solver.solve(&mut self.particles, &self.springs, dt);
        self.last_solve = Some(output);

        for p in &mut self.particles {
            if p.kind != ParticleType::Static {
                p.position += dt * p.velocity;
            }
            p.force = Vec3::ZERO;
        }

        self.refresh_contacts();
    }

    fn refresh_contacts(&mut self) {
        let view = ClothView {
            particles: &self.particles,
            triangles: &self.triangles,
            edges: &self.edges,
            shapes: &self.shapes,
        };
        self.contact_manager.sync_proxies(&view);
        self.contact_manager.find_new_contacts(&view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;
    use crate::shapes::Shape;

    fn sheet() -> Cloth {
        let mut mesh = ClothMesh::rectangle(4, 4, 0.25);
        mesh.translate(Vec3::new(0.0, 1.0, 0.0));
        Cloth::new(&mesh, &ClothDef::default(), ClothConfig::default())
    }

    #[test]
    fn test_mass_from_area() {
        let cloth = sheet();
        let total: f32 = cloth.particles().iter().map(|p| p.mass).sum();
        // 1 m² at density 0.2.
        assert!((total - 0.2).abs() < 1e-5);
        assert!(cloth.particles().iter().all(|p| p.inv_mass > 0.0));
    }

    #[test]
    fn test_static_particles_stay_put() {
        let mut cloth = sheet();
        cloth.set_particle_type(0, ParticleType::Static);
        let anchor = cloth.particle(0).position;
        for _ in 0..10 {
            cloth.step(1.0 / 60.0);
        }
        assert_eq!(cloth.particle(0).position, anchor);
        assert!(cloth.particle(24).position.y < 1.0);
    }

    #[test]
    fn test_falling_sheet_touches_ground() {
        let mut cloth = sheet();
        cloth.add_world_shape(WorldShape::new(
            Shape::cuboid(Vec3::new(2.0, 0.5, 2.0)),
            Transform::from_translation(Vec3::new(0.0, 0.45, 0.0)),
        ));
        for _ in 0..30 {
            cloth.step(1.0 / 60.0);
        }
        let manager = cloth.contact_manager();
        assert!(manager.sphere_shape_contacts().any(|c| c.touching));
    }

    #[test]
    fn test_energy_of_rest_state() {
        let cloth = sheet();
        assert!(cloth.energy().abs() < 1e-6);
    }
}
