//! Tetrahedral soft bodies colliding with static world shapes.
//!
//! Nodes are integrated with symplectic Euler under gravity. Collision
//! response is left to the caller; the contact manager reports node
//! contacts every step.

mod contact_manager;
mod mesh;

pub use contact_manager::{SoftBodyContactManager, SoftBodyProxy};
pub use mesh::SoftBodyMesh;

use glam::Vec3;

use crate::config::SoftBodyConfig;
use crate::shapes::WorldShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Static,
    Kinematic,
    Dynamic,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeType,
    pub position: Vec3,
    pub velocity: Vec3,
    pub mass: f32,
    pub inv_mass: f32,
    pub radius: f32,
}

impl Node {
    pub fn new(position: Vec3, mass: f32, radius: f32, kind: NodeType) -> Self {
        let mut node = Self {
            kind,
            position,
            velocity: Vec3::ZERO,
            mass,
            inv_mass: 0.0,
            radius,
        };
        node.set_kind(kind);
        node
    }

    /// Change the node type. Only dynamic nodes keep a nonzero inverse mass.
    pub fn set_kind(&mut self, kind: NodeType) {
        self.kind = kind;
        self.inv_mass = if kind == NodeType::Dynamic && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        };
        if kind == NodeType::Static {
            self.velocity = Vec3::ZERO;
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == NodeType::Dynamic
    }
}

#[derive(Debug, Clone)]
pub struct SoftBodyDef {
    /// Mass per unit volume. Default: 1000.
    pub density: f32,
    /// Collision radius of every node. Default: 0.05.
    pub radius: f32,
    /// Default: 0.6.
    pub friction: f32,
}

impl Default for SoftBodyDef {
    fn default() -> Self {
        Self {
            density: 1000.0,
            radius: 0.05,
            friction: 0.6,
        }
    }
}

pub struct SoftBody {
    config: SoftBodyConfig,
    nodes: Vec<Node>,
    tetrahedra: Vec<[u32; 4]>,
    friction: f32,
    shapes: Vec<WorldShape>,
    contact_manager: SoftBodyContactManager,
}

impl SoftBody {
    pub fn new(mesh: &SoftBodyMesh, def: &SoftBodyDef, config: SoftBodyConfig) -> Self {
        let mut nodes: Vec<Node> = mesh
            .vertices
            .iter()
            .map(|&p| Node::new(p, 0.0, def.radius, NodeType::Dynamic))
            .collect();
        for i in 0..mesh.tetrahedra.len() {
            let share = def.density * mesh.volume(i).abs() / 4.0;
            for v in mesh.tetrahedra[i] {
                nodes[v as usize].mass += share;
            }
        }
        for node in &mut nodes {
            let kind = node.kind;
            node.set_kind(kind);
        }

        let mut body = Self {
            contact_manager: SoftBodyContactManager::new(&config.collision),
            config,
            nodes,
            tetrahedra: mesh.tetrahedra.clone(),
            friction: def.friction,
            shapes: Vec::new(),
        };
        body.refresh_contacts();
        body
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn tetrahedra(&self) -> &[[u32; 4]] {
        &self.tetrahedra
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn shapes(&self) -> &[WorldShape] {
        &self.shapes
    }

    pub fn contact_manager(&self) -> &SoftBodyContactManager {
        &self.contact_manager
    }

    pub fn total_mass(&self) -> f32 {
        self.nodes.iter().map(|n| n.mass).sum()
    }

    pub fn set_node_type(&mut self, index: usize, kind: NodeType) {
        self.nodes[index].set_kind(kind);
    }

    pub fn set_node_velocity(&mut self, index: usize, velocity: Vec3) {
        if self.nodes[index].kind != NodeType::Static {
            self.nodes[index].velocity = velocity;
        }
    }

    /// Register a world shape. Returns its index.
    pub fn add_world_shape(&mut self, shape: WorldShape) -> u32 {
        self.shapes.push(shape);
        self.refresh_contacts();
        (self.shapes.len() - 1) as u32
    }

    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.contact_manager
            .update_contacts(&self.nodes, &self.shapes);

        let gravity = self.config.gravity;
        for node in &mut self.nodes {
            match node.kind {
                NodeType::Static => {}
                NodeType::Kinematic => node.position += dt * node.velocity,
                NodeType::Dynamic => {
                    node.velocity += dt * gravity;
                    node.position += dt * node.velocity;
                }
            }
        }

        self.refresh_contacts();
    }

    fn refresh_contacts(&mut self) {
        self.contact_manager.sync_proxies(&self.nodes, &self.shapes);
        self.contact_manager.find_new_contacts(&self.nodes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;
    use crate::shapes::Shape;

    fn cube() -> SoftBody {
        let mut mesh = SoftBodyMesh::block(2, 2, 2, 0.25);
        mesh.translate(Vec3::new(-0.25, 1.5, -0.25));
        let def = SoftBodyDef {
            density: 100.0,
            ..SoftBodyDef::default()
        };
        SoftBody::new(&mesh, &def, SoftBodyConfig::default())
    }

    #[test]
    fn test_mass_from_volume() {
        let body = cube();
        // 0.125 m³ at density 100.
        assert!((body.total_mass() - 12.5).abs() < 1e-3);
        assert!(body.nodes().iter().all(|n| n.inv_mass > 0.0));
    }

    #[test]
    fn test_falling_body_touches_ground() {
        let mut body = cube();
        body.add_world_shape(WorldShape::new(
            Shape::cuboid(Vec3::new(2.0, 0.5, 2.0)),
            Transform::from_translation(Vec3::new(0.0, 0.5, 0.0)),
        ));
        assert_eq!(body.contact_manager().contact_count(), 0);

        for _ in 0..20 {
            body.step(1.0 / 60.0);
        }
        assert!(body.contact_manager().contacts().any(|c| c.touching));
    }

    #[test]
    fn test_static_and_kinematic_nodes() {
        let mut body = cube();
        body.set_node_type(0, NodeType::Static);
        body.set_node_type(1, NodeType::Kinematic);
        body.set_node_velocity(1, Vec3::X);
        let start0 = body.node(0).position;
        let start1 = body.node(1).position;
        body.step(0.5);
        assert_eq!(body.node(0).position, start0);
        assert!((body.node(1).position - (start1 + 0.5 * Vec3::X)).length() < 1e-6);
    }
}
