use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A single simulated particle of a soft body.
///
/// An infinite mass marks the point as immovable; forces and velocities are
/// still accumulated on it but integration leaves its position untouched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointMass {
    pub mass: f32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub force: Vec2,
}

impl PointMass {
    pub fn new(mass: f32, position: Vec2) -> Self {
        Self {
            mass,
            position,
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
        }
    }

    /// Accumulates a force to be applied on the next integration step.
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
    }

    /// Symplectic Euler step. The force accumulator is cleared even for
    /// infinite-mass points.
    pub fn integrate(&mut self, elapsed: f32) {
        if self.mass.is_finite() {
            let elapsed_mass = elapsed / self.mass;
            self.velocity += self.force * elapsed_mass;
            self.position += self.velocity * elapsed;
        }

        self.force = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn integration_applies_accumulated_force() {
        let mut pm = PointMass::new(2.0, Vec2::ZERO);
        pm.apply_force(Vec2::new(4.0, 0.0));
        pm.integrate(0.5);

        assert_relative_eq!(pm.velocity.x, 1.0);
        assert_relative_eq!(pm.position.x, 0.5);
        assert_eq!(pm.force, Vec2::ZERO);
    }

    #[test]
    fn infinite_mass_point_never_moves_but_clears_force() {
        let mut pm = PointMass::new(f32::INFINITY, Vec2::new(1.0, 1.0));
        pm.apply_force(Vec2::new(100.0, 100.0));
        pm.integrate(1.0);

        assert_eq!(pm.position, Vec2::new(1.0, 1.0));
        assert_eq!(pm.velocity, Vec2::ZERO);
        assert_eq!(pm.force, Vec2::ZERO);
    }
}
