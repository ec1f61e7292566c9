use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_GRAVITY;
use crate::core::Body;

/// Constant acceleration applied to every point mass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GravityComponent {
    pub gravity: Vec2,
}

impl GravityComponent {
    pub fn new(gravity: Vec2) -> Self {
        Self { gravity }
    }

    pub fn accumulate_external_forces(&mut self, body: &mut Body) {
        for pm in &mut body.point_masses {
            if pm.mass.is_finite() {
                pm.apply_force(self.gravity * pm.mass);
            }
        }
    }
}

impl Default for GravityComponent {
    fn default() -> Self {
        Self {
            gravity: Vec2::from(DEFAULT_GRAVITY),
        }
    }
}
