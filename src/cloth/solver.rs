//! Implicit Euler step for mass-spring cloth.
//!
//! Solves `(M - h ∂f/∂v - h² ∂f/∂x) Δv = h (f + h ∂f/∂x v)` with a block
//! Jacobi preconditioned conjugate gradient. Static and kinematic particles
//! are filtered out of the system so their velocity change is zero.

use glam::{Mat3, Vec3};
use tracing::debug;

use crate::config::ClothConfig;
use crate::math::outer;
use crate::sparse::{DenseVec3, DiagMat33, FrameArena, SparseMat33};

use super::{Particle, Spring};

/// Outcome of one linear solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOutput {
    pub iterations: u32,
    /// Preconditioned residual norm at exit.
    pub residual: f32,
    pub converged: bool,
}

pub struct ClothSolver<'a> {
    arena: &'a FrameArena,
    config: &'a ClothConfig,
}

impl<'a> ClothSolver<'a> {
    pub fn new(arena: &'a FrameArena, config: &'a ClothConfig) -> Self {
        Self { arena, config }
    }

    /// Update particle velocities for a step of `h` seconds.
    pub fn solve(&self, particles: &mut [Particle], springs: &[Spring], h: f32) -> SolverOutput {
        let n = particles.len();
        let mut f = DenseVec3::zeros(n);
        let mut v = DenseVec3::zeros(n);
        let mut mass = DiagMat33::zeros(n);
        let mut dfdx = SparseMat33::new(self.arena, n);
        let mut dfdv = SparseMat33::new(self.arena, n);

        for (i, p) in particles.iter().enumerate() {
            v[i] = p.velocity;
            mass[i] = Mat3::from_diagonal(Vec3::splat(p.mass));
            if p.is_dynamic() {
                f[i] = p.force + p.mass * self.config.gravity;
            }
        }

        for spring in springs {
            apply_spring(spring, particles, &mut f, &mut dfdx, &mut dfdv);
        }

        // A = M - h dfdv - h² dfdx
        let mut a = SparseMat33::from_diag(self.arena, &mass);
        a -= &(h * &dfdv);
        a -= &((h * h) * &dfdx);

        // b = h (f + h dfdx v)
        let mut b = &dfdx * &v;
        b *= h;
        b += &f;
        b *= h;

        let mut dv = DenseVec3::zeros(n);
        let output = self.conjugate_gradient(&a, &b, &mut dv, particles);

        for (i, p) in particles.iter_mut().enumerate() {
            if p.is_dynamic() {
                p.velocity += dv[i];
            }
        }
        output
    }

    fn conjugate_gradient(
        &self,
        a: &SparseMat33<'_>,
        b: &DenseVec3,
        x: &mut DenseVec3,
        particles: &[Particle],
    ) -> SolverOutput {
        let n = b.len();
        let mut diagonal = DiagMat33::zeros(n);
        for i in 0..n {
            diagonal[i] = *a.get(i, i);
        }
        let inv_p = diagonal.inverse();

        let mut bf = b.clone();
        filter(&mut bf, particles);
        let mut tmp = DenseVec3::zeros(n);
        inv_p.mul_vec(&bf, &mut tmp);
        let delta0 = bf.dot(&tmp);

        x.set_zero();
        if delta0 <= f32::EPSILON * f32::EPSILON {
            return SolverOutput {
                iterations: 0,
                residual: 0.0,
                converged: true,
            };
        }

        let mut r = bf;
        let mut c = DenseVec3::zeros(n);
        inv_p.mul_vec(&r, &mut c);
        filter(&mut c, particles);
        let mut delta = r.dot(&c);

        let tolerance = self.config.solver_tolerance * self.config.solver_tolerance * delta0;
        let mut q = DenseVec3::zeros(n);
        let mut s = DenseVec3::zeros(n);
        let mut iterations = 0;

        while delta > tolerance && iterations < self.config.solver_max_iterations {
            a.mul_vec(&c, &mut q);
            filter(&mut q, particles);

            let cq = c.dot(&q);
            if cq.abs() <= f32::MIN_POSITIVE {
                break;
            }
            let alpha = delta / cq;
            x.add_scaled(alpha, &c);
            r.add_scaled(-alpha, &q);

            inv_p.mul_vec(&r, &mut s);
            filter(&mut s, particles);

            let delta_old = delta;
            delta = r.dot(&s);

            let beta = delta / delta_old;
            c *= beta;
            c += &s;
            filter(&mut c, particles);

            iterations += 1;
        }

        let converged = delta <= tolerance;
        if !converged {
            debug!(
                iterations,
                residual = delta.max(0.0).sqrt(),
                "cloth solver did not converge"
            );
        }
        SolverOutput {
            iterations,
            residual: delta.max(0.0).sqrt(),
            converged,
        }
    }
}

/// Zero the entries of particles that are not integrated.
fn filter(x: &mut DenseVec3, particles: &[Particle]) {
    for (i, p) in particles.iter().enumerate() {
        if !p.is_dynamic() {
            x[i] = Vec3::ZERO;
        }
    }
}

/// Accumulate a spring's force and its position and velocity Jacobians.
fn apply_spring(
    spring: &Spring,
    particles: &[Particle],
    f: &mut DenseVec3,
    dfdx: &mut SparseMat33<'_>,
    dfdv: &mut SparseMat33<'_>,
) {
    let [i, j] = spring.particles.map(|p| p as usize);
    let d = particles[i].position - particles[j].position;
    let length = d.length();
    if length <= f32::EPSILON {
        return;
    }
    let n = d / length;
    let nn = outer(n, n);

    let dv = particles[i].velocity - particles[j].velocity;
    let force = -spring.stiffness * (length - spring.rest_length) * n
        - spring.damping * dv.dot(n) * n;
    f[i] += force;
    f[j] -= force;

    // Compressed springs drop the geometric term to keep the system definite.
    let ratio = (1.0 - spring.rest_length / length).max(0.0);
    let jx = -spring.stiffness * (nn + ratio * (Mat3::IDENTITY - nn));
    let jv = -spring.damping * nn;

    add_pair_block(dfdx, i, j, jx);
    add_pair_block(dfdv, i, j, jv);
}

fn add_pair_block(m: &mut SparseMat33<'_>, i: usize, j: usize, block: Mat3) {
    *m.get_mut(i, i) += block;
    *m.get_mut(i, j) -= block;
    *m.get_mut(j, i) -= block;
    *m.get_mut(j, j) += block;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloth::ParticleType;

    fn config() -> ClothConfig {
        ClothConfig {
            solver_tolerance: 1.0e-5,
            ..ClothConfig::default()
        }
    }

    #[test]
    fn test_free_fall_velocity() {
        let arena = FrameArena::new();
        let config = config();
        let mut particles = vec![Particle::new(Vec3::ZERO, 2.0, ParticleType::Dynamic)];
        let h = 0.1;
        let out = ClothSolver::new(&arena, &config).solve(&mut particles, &[], h);
        assert!(out.converged);
        assert!((particles[0].velocity - h * config.gravity).length() < 1e-4);
    }

    #[test]
    fn test_hanging_spring_settles() {
        let mut arena = FrameArena::new();
        let config = config();
        let mut particles = vec![
            Particle::new(Vec3::ZERO, 1.0, ParticleType::Static),
            Particle::new(Vec3::new(0.0, -1.0, 0.0), 1.0, ParticleType::Dynamic),
        ];
        let springs = [Spring {
            particles: [0, 1],
            rest_length: 1.0,
            stiffness: 100.0,
            damping: 1.0,
        }];

        let h = 1.0 / 60.0;
        for _ in 0..600 {
            arena.reset();
            let out = ClothSolver::new(&arena, &config).solve(&mut particles, &springs, h);
            assert!(out.converged);
            for p in &mut particles {
                if p.is_dynamic() {
                    p.position += h * p.velocity;
                }
            }
        }

        let expected = -1.0 - 9.81 / 100.0;
        assert!((particles[1].position.y - expected).abs() < 1e-3);
        assert_eq!(particles[0].position, Vec3::ZERO);
        assert_eq!(particles[0].velocity, Vec3::ZERO);
    }

    #[test]
    fn test_spring_jacobian_is_symmetric() {
        let arena = FrameArena::new();
        let particles = vec![
            Particle::new(Vec3::ZERO, 1.0, ParticleType::Dynamic),
            Particle::new(Vec3::new(1.5, 0.5, 0.0), 1.0, ParticleType::Dynamic),
        ];
        let spring = Spring {
            particles: [0, 1],
            rest_length: 1.0,
            stiffness: 10.0,
            damping: 0.5,
        };
        let mut f = DenseVec3::zeros(2);
        let mut dfdx = SparseMat33::new(&arena, 2);
        let mut dfdv = SparseMat33::new(&arena, 2);
        apply_spring(&spring, &particles, &mut f, &mut dfdx, &mut dfdv);

        assert!((f[0] + f[1]).length() < 1e-6);
        assert!(f[0].dot(particles[1].position) > 0.0);
        assert!(dfdx[(0, 1)].abs_diff_eq(dfdx[(0, 1)].transpose(), 1e-6));
        assert!(dfdx[(0, 0)].abs_diff_eq(-dfdx[(0, 1)], 1e-6));
        assert_eq!(dfdx.nnz(), 4);
        assert_eq!(dfdv.nnz(), 4);
    }
}
