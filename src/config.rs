//! Tunable parameters for queries, the broad phase, contact pools and the
//! deformable-body domains.

use glam::Vec3;

/// Convergence controls for the GJK distance query.
#[derive(Debug, Clone)]
pub struct GjkConfig {
    /// Relative tolerance on the distance improvement between iterations.
    /// Iteration stops once `|v|² − v·w <= tolerance * |v|²`. Default: 1e-5.
    pub tolerance: f32,
    /// Hard iteration cap for degenerate input. Default: 32.
    pub max_iterations: u32,
}

impl Default for GjkConfig {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-5,
            max_iterations: 32,
        }
    }
}

/// Dynamic AABB tree settings.
#[derive(Debug, Clone)]
pub struct BroadPhaseConfig {
    /// Margin added on every side of a tight bound. Default: 0.1.
    pub aabb_margin: f32,
    /// Number of tree nodes reserved up front. Default: 64.
    pub initial_capacity: usize,
}

impl Default for BroadPhaseConfig {
    fn default() -> Self {
        Self {
            aabb_margin: 0.1,
            initial_capacity: 64,
        }
    }
}

/// Block pool sizing for one contact variant.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Blocks reserved when the pool is created. Default: 256.
    pub block_count: usize,
    /// Whether the pool may grow past `block_count`. Exhausting a
    /// non-growable pool is a fatal error. Default: true.
    pub growable: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_count: 256,
            growable: true,
        }
    }
}

/// Settings shared by every contact manager.
#[derive(Debug, Clone)]
pub struct CollisionConfig {
    pub gjk: GjkConfig,
    pub broad_phase: BroadPhaseConfig,
    pub contact_pool: PoolConfig,
    /// Distance tolerance used when clipping manifolds. Default: 0.005.
    pub linear_slop: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            gjk: GjkConfig::default(),
            broad_phase: BroadPhaseConfig::default(),
            contact_pool: PoolConfig::default(),
            linear_slop: 0.005,
        }
    }
}

/// Cloth simulation parameters.
#[derive(Debug, Clone)]
pub struct ClothConfig {
    /// Gravity vector. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    /// Stretch spring stiffness. Default: 1000.
    pub stretch_stiffness: f32,
    /// Stretch spring damping. Default: 0.5.
    pub damping_stiffness: f32,
    /// Conjugate gradient iteration cap. Default: 100.
    pub solver_max_iterations: u32,
    /// Relative residual at which conjugate gradient stops. Default: 1e-6.
    pub solver_tolerance: f32,
    pub collision: CollisionConfig,
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            stretch_stiffness: 1000.0,
            damping_stiffness: 0.5,
            solver_max_iterations: 100,
            solver_tolerance: 1.0e-6,
            collision: CollisionConfig::default(),
        }
    }
}

/// Soft body parameters.
#[derive(Debug, Clone)]
pub struct SoftBodyConfig {
    /// Gravity vector. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    pub collision: CollisionConfig,
}

impl Default for SoftBodyConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            collision: CollisionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_config_default() {
        let config = CollisionConfig::default();
        assert_eq!(config.gjk.max_iterations, 32);
        assert!((config.broad_phase.aabb_margin - 0.1).abs() < 1e-6);
        assert!(config.contact_pool.growable);
        assert!((config.linear_slop - 0.005).abs() < 1e-6);
    }

    #[test]
    fn test_cloth_config_default() {
        let config = ClothConfig::default();
        assert_eq!(config.gravity, Vec3::new(0.0, -9.81, 0.0));
        assert_eq!(config.solver_max_iterations, 100);
    }
}
