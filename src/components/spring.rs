use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::Body;
use crate::dynamics::spring::{
    calculate_plasticity, calculate_spring_force, InternalSpring, RestDistance, SpringPlasticity,
};

/// Maintains the springs that hold a soft body together.
///
/// On attach, one spring is created per perimeter edge at its current
/// length. Additional springs (cross-bracing and the like) can be added on
/// top and survive until the body's shape is replaced. Optional shape
/// matching pulls every point toward its slot in the transformed rest shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpringComponent {
    springs: Vec<InternalSpring>,
    /// Number of leading entries in `springs` that belong to perimeter edges.
    edge_spring_count: usize,
    pub edge_coefficient: f32,
    pub edge_damping: f32,
    pub shape_matching_on: bool,
    pub shape_coefficient: f32,
    pub shape_damping: f32,
    pub plasticity: Option<SpringPlasticity>,
}

impl SpringComponent {
    pub fn new(
        edge_coefficient: f32,
        edge_damping: f32,
        shape_matching: bool,
        shape_coefficient: f32,
        shape_damping: f32,
        plasticity: Option<SpringPlasticity>,
    ) -> Self {
        Self {
            springs: Vec::new(),
            edge_spring_count: 0,
            edge_coefficient,
            edge_damping,
            shape_matching_on: shape_matching,
            shape_coefficient,
            shape_damping,
            plasticity,
        }
    }

    pub fn springs(&self) -> &[InternalSpring] {
        &self.springs
    }

    /// Rebuilds the perimeter edge springs from the body's current point
    /// positions. Any custom springs are discarded since their indices may
    /// no longer be valid.
    pub fn prepare(&mut self, body: &mut Body) {
        self.springs.clear();

        let count = body.point_masses.len();
        for i in 0..count {
            let j = (i + 1) % count;
            let rest = body.point_masses[i]
                .position
                .distance(body.point_masses[j].position);

            let mut spring = InternalSpring::new(
                i,
                j,
                RestDistance::Fixed(rest),
                self.edge_coefficient,
                self.edge_damping,
            );
            spring.plasticity = self.plasticity;
            self.springs.push(spring);
        }

        self.edge_spring_count = self.springs.len();
    }

    /// Adds a spring between two point masses at their current distance.
    pub fn add_internal_spring(
        &mut self,
        body: &Body,
        point_mass_a: usize,
        point_mass_b: usize,
        coefficient: f32,
        damping: f32,
    ) {
        let rest = body.point_masses[point_mass_a]
            .position
            .distance(body.point_masses[point_mass_b].position);

        self.springs.push(InternalSpring::new(
            point_mass_a,
            point_mass_b,
            RestDistance::Fixed(rest),
            coefficient,
            damping,
        ));
    }

    /// Updates the rest distance of every edge spring.
    pub fn set_edge_spring_distances(&mut self, rest_distance: RestDistance) {
        for spring in &mut self.springs[..self.edge_spring_count] {
            spring.rest_distance = rest_distance;
            spring.initial_rest_distance = rest_distance;
        }
    }

    pub fn accumulate_internal_forces(&mut self, body: &mut Body, relaxing: bool) {
        for spring in &mut self.springs {
            let a = body.point_masses[spring.point_mass_a];
            let b = body.point_masses[spring.point_mass_b];

            let distance = a.position.distance(b.position);
            let force = calculate_spring_force(
                a.position,
                a.velocity,
                b.position,
                b.velocity,
                spring.rest_distance.clamp(distance),
                spring.coefficient,
                spring.damping,
            );

            body.point_masses[spring.point_mass_a].apply_force(force);
            body.point_masses[spring.point_mass_b].apply_force(-force);

            // Relaxation steps settle a body into place and must not
            // permanently deform it.
            if !relaxing {
                if let Some(plasticity) = spring.plasticity {
                    spring.rest_distance = calculate_plasticity(
                        distance,
                        spring.rest_distance,
                        spring.initial_rest_distance,
                        plasticity,
                    );
                }
            }
        }

        if self.shape_matching_on && self.shape_coefficient > 0.0 {
            self.accumulate_shape_matching(body);
        }
    }

    fn accumulate_shape_matching(&self, body: &mut Body) {
        body.base_shape.transform_into(
            &mut body.global_shape,
            body.derived_position,
            body.derived_angle,
            body.scale,
        );

        let Body {
            ref mut point_masses,
            ref global_shape,
            is_kinematic,
            ..
        } = *body;

        for (pm, &target) in point_masses.iter_mut().zip(global_shape) {
            let target_velocity = if is_kinematic { Vec2::ZERO } else { pm.velocity };
            let force = calculate_spring_force(
                pm.position,
                pm.velocity,
                target,
                target_velocity,
                0.0,
                self.shape_coefficient,
                self.shape_damping,
            );
            pm.apply_force(force);
        }
    }
}
