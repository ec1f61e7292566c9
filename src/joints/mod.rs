//! Joints connecting point masses across bodies.

mod link;

pub use link::{JointLink, LinkKind};

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::Body;
use crate::dynamics::spring::{
    calculate_plasticity, calculate_spring_force, RestDistance, SpringPlasticity,
};
use crate::utils::geometry::wrap_angle;
use crate::utils::{BodyId, JointId};

/// Constraint behavior of a [`BodyJoint`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JointKind {
    /// Damped spring holding the two links at the rest distance.
    Spring {
        coefficient: f32,
        damping: f32,
        plasticity: Option<SpringPlasticity>,
    },
    /// Spring plus an angular constraint: the second link is kept on the
    /// axis through the first link at its current angle, and is spun toward
    /// `reference_angle` relative to it.
    Prismatic {
        coefficient: f32,
        damping: f32,
        reference_angle: f32,
        angular_stiffness: f32,
        angular_damping: f32,
        /// Angle of the second link on the previous step, used to estimate
        /// its angular velocity. `None` until the first resolve.
        last_angle: Option<f32>,
    },
}

/// A distance constraint between two body links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyJoint {
    pub id: JointId,
    pub link_a: JointLink,
    pub link_b: JointLink,
    pub rest_distance: RestDistance,
    pub initial_rest_distance: RestDistance,
    /// Whether the two joined bodies may still collide with each other.
    pub allow_collisions: bool,
    pub enabled: bool,
    pub kind: JointKind,
}

impl BodyJoint {
    pub fn spring(
        link_a: JointLink,
        link_b: JointLink,
        rest_distance: RestDistance,
        coefficient: f32,
        damping: f32,
    ) -> Self {
        Self {
            id: JointId::null(),
            link_a,
            link_b,
            rest_distance,
            initial_rest_distance: rest_distance,
            allow_collisions: false,
            enabled: true,
            kind: JointKind::Spring {
                coefficient,
                damping,
                plasticity: None,
            },
        }
    }

    pub fn prismatic(
        link_a: JointLink,
        link_b: JointLink,
        rest_distance: RestDistance,
        coefficient: f32,
        damping: f32,
        reference_angle: f32,
        angular_stiffness: f32,
        angular_damping: f32,
    ) -> Self {
        Self {
            id: JointId::null(),
            link_a,
            link_b,
            rest_distance,
            initial_rest_distance: rest_distance,
            allow_collisions: false,
            enabled: true,
            kind: JointKind::Prismatic {
                coefficient,
                damping,
                reference_angle,
                angular_stiffness,
                angular_damping,
                last_angle: None,
            },
        }
    }

    /// Whether the joint attaches the two given bodies, in either order.
    pub fn connects(&self, body_a: BodyId, body_b: BodyId) -> bool {
        (self.link_a.body == body_a && self.link_b.body == body_b)
            || (self.link_a.body == body_b && self.link_b.body == body_a)
    }

    /// Applies one step of the joint constraint.
    ///
    /// `id_map` maps body handles to indices in `bodies`; joints referencing
    /// bodies outside the slice are skipped.
    pub fn resolve(
        &mut self,
        bodies: &mut [Body],
        id_map: &HashMap<BodyId, usize>,
        elapsed: f32,
    ) {
        if !self.enabled {
            return;
        }

        let (Some(&index_a), Some(&index_b)) = (
            id_map.get(&self.link_a.body),
            id_map.get(&self.link_b.body),
        ) else {
            return;
        };

        let position_a = self.link_a.position(&bodies[index_a]);
        let position_b = self.link_b.position(&bodies[index_b]);
        let distance = position_a.distance(position_b);

        let (coefficient, damping) = match &self.kind {
            JointKind::Spring {
                coefficient,
                damping,
                ..
            }
            | JointKind::Prismatic {
                coefficient,
                damping,
                ..
            } => (*coefficient, *damping),
        };

        if !self.rest_distance.in_range(distance) {
            let velocity_a = self.link_a.velocity(&bodies[index_a]);
            let velocity_b = self.link_b.velocity(&bodies[index_b]);
            let force = calculate_spring_force(
                position_a,
                velocity_a,
                position_b,
                velocity_b,
                self.rest_distance.clamp(distance),
                coefficient,
                damping,
            );

            let static_a = self.link_a.is_static(&bodies[index_a]);
            let static_b = self.link_b.is_static(&bodies[index_b]);

            match (static_a, static_b) {
                (false, false) => {
                    let mass_a = self.link_a.mass(&bodies[index_a]);
                    let mass_b = self.link_b.mass(&bodies[index_b]);
                    let mass_sum = mass_a + mass_b;

                    self.link_a
                        .apply_force(&mut bodies[index_a], force * (mass_sum / mass_a));
                    self.link_b
                        .apply_force(&mut bodies[index_b], -force * (mass_sum / mass_b));
                }
                (false, true) => self.link_a.apply_force(&mut bodies[index_a], force),
                (true, false) => self.link_b.apply_force(&mut bodies[index_b], -force),
                (true, true) => {}
            }
        }

        match &mut self.kind {
            JointKind::Spring { plasticity, .. } => {
                if let Some(plasticity) = plasticity {
                    self.rest_distance = calculate_plasticity(
                        distance,
                        self.rest_distance,
                        self.initial_rest_distance,
                        *plasticity,
                    );
                }
            }
            JointKind::Prismatic {
                reference_angle,
                angular_stiffness,
                angular_damping,
                last_angle,
                ..
            } => {
                let angle_a = self.link_a.angle(&bodies[index_a]);
                let angle_b = self.link_b.angle(&bodies[index_b]);

                let omega_b = match *last_angle {
                    Some(last) if elapsed > 0.0 => wrap_angle(angle_b - last) / elapsed,
                    _ => 0.0,
                };

                let angle_error = wrap_angle(angle_a + *reference_angle - angle_b);
                let torque = angle_error * *angular_stiffness - omega_b * *angular_damping;
                self.link_b.apply_torque(&mut bodies[index_b], torque);

                // Project the second link back onto the sliding axis.
                let axis = Vec2::from_angle(angle_a);
                let relative = position_b - position_a;
                let projected = position_a + axis * relative.dot(axis);
                self.link_b
                    .translate(&mut bodies[index_b], projected - position_b);

                *last_angle = Some(angle_b);
            }
        }
    }
}
