//! Per-body force generators.
//!
//! Components are attached to bodies and run every update in two passes:
//! internal forces (springs, pressure, bending) act between the body's own
//! point masses, external forces (gravity) act on the body from outside.

mod bend;
mod gravity;
mod pressure;
mod spring;

pub use bend::BendComponent;
pub use gravity::GravityComponent;
pub use pressure::PressureComponent;
pub use spring::SpringComponent;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_BEND_STIFFNESS, DEFAULT_EDGE_SPRING_DAMP, DEFAULT_EDGE_SPRING_K,
    DEFAULT_SHAPE_SPRING_DAMP, DEFAULT_SHAPE_SPRING_K,
};
use crate::core::Body;
use crate::dynamics::spring::SpringPlasticity;

/// A force generator attached to a body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BodyComponent {
    Spring(SpringComponent),
    Pressure(PressureComponent),
    Bend(BendComponent),
    Gravity(GravityComponent),
}

impl BodyComponent {
    /// Called when the component is attached or the body's shape changes.
    pub fn prepare(&mut self, body: &mut Body) {
        match self {
            BodyComponent::Spring(spring) => spring.prepare(body),
            BodyComponent::Pressure(_)
            | BodyComponent::Bend(_)
            | BodyComponent::Gravity(_) => {}
        }
    }

    /// Accumulates forces the body exerts on itself.
    pub fn accumulate_internal_forces(&mut self, body: &mut Body, relaxing: bool) {
        match self {
            BodyComponent::Spring(spring) => spring.accumulate_internal_forces(body, relaxing),
            BodyComponent::Pressure(pressure) => pressure.accumulate_internal_forces(body),
            BodyComponent::Bend(bend) => bend.accumulate_internal_forces(body),
            BodyComponent::Gravity(_) => {}
        }
    }

    /// Accumulates forces acting on the body from outside.
    pub fn accumulate_external_forces(&mut self, body: &mut Body) {
        match self {
            BodyComponent::Gravity(gravity) => gravity.accumulate_external_forces(body),
            BodyComponent::Spring(_)
            | BodyComponent::Pressure(_)
            | BodyComponent::Bend(_) => {}
        }
    }
}

/// Serializable recipe for a [`BodyComponent`].
///
/// Bodies are built from creators so component setups can live in asset
/// files alongside shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ComponentCreator {
    Spring {
        edge_coefficient: f32,
        edge_damping: f32,
        shape_matching: bool,
        shape_coefficient: f32,
        shape_damping: f32,
        plasticity: Option<SpringPlasticity>,
    },
    Pressure {
        gas_pressure: f32,
    },
    Bend {
        stiffness: f32,
        /// Point mass indices the constraint acts on, or every point when
        /// `None`.
        indices: Option<Vec<usize>>,
    },
    Gravity {
        gravity: Vec2,
    },
}

impl ComponentCreator {
    /// Edge springs with default stiffness and no shape matching.
    pub fn edge_springs() -> Self {
        ComponentCreator::Spring {
            edge_coefficient: DEFAULT_EDGE_SPRING_K,
            edge_damping: DEFAULT_EDGE_SPRING_DAMP,
            shape_matching: false,
            shape_coefficient: DEFAULT_SHAPE_SPRING_K,
            shape_damping: DEFAULT_SHAPE_SPRING_DAMP,
            plasticity: None,
        }
    }

    /// Edge springs plus shape matching toward the rest shape.
    pub fn shape_matched_springs(shape_coefficient: f32, shape_damping: f32) -> Self {
        ComponentCreator::Spring {
            edge_coefficient: DEFAULT_EDGE_SPRING_K,
            edge_damping: DEFAULT_EDGE_SPRING_DAMP,
            shape_matching: true,
            shape_coefficient,
            shape_damping,
            plasticity: None,
        }
    }

    pub fn pressure(gas_pressure: f32) -> Self {
        ComponentCreator::Pressure { gas_pressure }
    }

    pub fn bend() -> Self {
        ComponentCreator::Bend {
            stiffness: DEFAULT_BEND_STIFFNESS,
            indices: None,
        }
    }

    pub fn gravity(gravity: Vec2) -> Self {
        ComponentCreator::Gravity { gravity }
    }

    pub fn create(&self) -> BodyComponent {
        match self.clone() {
            ComponentCreator::Spring {
                edge_coefficient,
                edge_damping,
                shape_matching,
                shape_coefficient,
                shape_damping,
                plasticity,
            } => BodyComponent::Spring(SpringComponent::new(
                edge_coefficient,
                edge_damping,
                shape_matching,
                shape_coefficient,
                shape_damping,
                plasticity,
            )),
            ComponentCreator::Pressure { gas_pressure } => {
                BodyComponent::Pressure(PressureComponent::new(gas_pressure))
            }
            ComponentCreator::Bend { stiffness, indices } => {
                BodyComponent::Bend(BendComponent::new(stiffness, indices))
            }
            ComponentCreator::Gravity { gravity } => {
                BodyComponent::Gravity(GravityComponent::new(gravity))
            }
        }
    }
}
