use std::collections::HashMap;

use crate::collision::{body_collide, CollisionInfo, GridMask};
use crate::core::{Body, MaterialPair};
use crate::joints::BodyJoint;
use crate::utils::geometry::perpendicular;
use crate::utils::{BodyId, JointId};

/// One independent group of interacting bodies.
///
/// The world clones each island's bodies and joints into a job, resolves the
/// jobs (in parallel when enabled) and writes the results back. Bodies in
/// different islands cannot interact during a step, so jobs never share
/// state. Static bodies may be cloned into several islands; the solver never
/// moves them, so any copy can be written back.
#[derive(Debug)]
pub struct IslandJob {
    pub ids: Vec<BodyId>,
    pub bodies: Vec<Body>,
    pub id_map: HashMap<BodyId, usize>,
    pub joint_ids: Vec<JointId>,
    pub joints: Vec<BodyJoint>,
    /// Every contact found by the narrow phase this step.
    pub collisions: Vec<CollisionInfo>,
    /// The subset of contacts that received a collision response.
    pub resolved_collisions: Vec<CollisionInfo>,
    /// Contacts skipped because they exceeded the penetration threshold.
    pub deep_collisions: Vec<CollisionInfo>,
}

impl IslandJob {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            bodies: Vec::new(),
            id_map: HashMap::new(),
            joint_ids: Vec::new(),
            joints: Vec::new(),
            collisions: Vec::new(),
            resolved_collisions: Vec::new(),
            deep_collisions: Vec::new(),
        }
    }

    pub fn push_body(&mut self, id: BodyId, body: Body) {
        self.id_map.insert(id, self.bodies.len());
        self.ids.push(id);
        self.bodies.push(body);
    }

    pub fn push_joint(&mut self, id: JointId, joint: BodyJoint) {
        self.joint_ids.push(id);
        self.joints.push(joint);
    }

    /// Runs one full step over the island.
    pub fn resolve(
        &mut self,
        elapsed: f32,
        materials: &[Vec<MaterialPair>],
        grid: &GridMask,
        penetration_threshold: f32,
        relaxing: bool,
    ) {
        self.collisions.clear();
        self.resolved_collisions.clear();
        self.deep_collisions.clear();

        self.step_bodies(elapsed, grid, relaxing);
        self.resolve_joints(elapsed);
        self.detect_collisions(materials, penetration_threshold);
        self.handle_collisions(materials, penetration_threshold);

        for body in &mut self.bodies {
            body.dampen_velocity(elapsed);
        }
    }

    fn step_bodies(&mut self, elapsed: f32, grid: &GridMask, relaxing: bool) {
        for body in &mut self.bodies {
            body.derive_position_and_angle(elapsed);

            if body.components.is_empty() {
                // Collision detection still needs fresh point normals.
                body.update_normals();
            } else {
                body.update_edges_and_normals();

                let mut components = std::mem::take(&mut body.components);
                for component in &mut components {
                    component.accumulate_external_forces(body);
                }
                for component in &mut components {
                    component.accumulate_internal_forces(body, relaxing);
                }
                body.components = components;
            }

            body.integrate(elapsed);
            body.update_aabb(elapsed, true);
            body.refresh_bitmasks(grid);
        }
    }

    fn resolve_joints(&mut self, elapsed: f32) {
        let mut joints = std::mem::take(&mut self.joints);
        for joint in &mut joints {
            joint.resolve(&mut self.bodies, &self.id_map, elapsed);
        }
        self.joints = joints;
    }

    fn detect_collisions(&mut self, materials: &[Vec<MaterialPair>], penetration_threshold: f32) {
        let count = self.bodies.len();

        for i in 0..count {
            for j in (i + 1)..count {
                let body_a = &self.bodies[i];
                let body_b = &self.bodies[j];

                if body_a.bitmask & body_b.bitmask == 0 {
                    continue;
                }
                if body_a.is_static && body_b.is_static {
                    continue;
                }
                if body_a.bitmask_x & body_b.bitmask_x == 0
                    || body_a.bitmask_y & body_b.bitmask_y == 0
                {
                    continue;
                }
                if !body_a.aabb.intersects(&body_b.aabb) {
                    continue;
                }
                if !materials[body_a.material][body_b.material].collide {
                    continue;
                }
                if self
                    .joints
                    .iter()
                    .any(|joint| joint.connects(body_a.id, body_b.id) && !joint.allow_collisions)
                {
                    continue;
                }

                body_collide(body_a, body_b, penetration_threshold, &mut self.collisions);
                body_collide(body_b, body_a, penetration_threshold, &mut self.collisions);
            }
        }
    }

    fn handle_collisions(&mut self, materials: &[Vec<MaterialPair>], penetration_threshold: f32) {
        for contact_index in 0..self.collisions.len() {
            let info = self.collisions[contact_index];
            let (Some(&index_a), Some(&index_b)) = (
                self.id_map.get(&info.body_a),
                self.id_map.get(&info.body_b),
            ) else {
                continue;
            };

            let (body_a, body_b) = pair_mut(&mut self.bodies, index_a, index_b);
            let material = &materials[body_a.material][body_b.material];

            let a = body_a.point_masses[info.body_a_point];
            let b1 = body_b.point_masses[info.body_b_edge_a];
            let b2 = body_b.point_masses[info.body_b_edge_b];

            let b_velocity = (b1.velocity + b2.velocity) * 0.5;
            let relative_velocity = a.velocity - b_velocity;
            let relative_dot = relative_velocity.dot(info.normal);

            if !material.accepts(&info, relative_dot) {
                continue;
            }

            // Too deep to resolve cleanly; report it and leave the bodies
            // alone.
            if info.penetration > penetration_threshold {
                self.deep_collisions.push(info);
                continue;
            }

            let b1_influence = 1.0 - info.edge_ratio;
            let b2_influence = info.edge_ratio;
            let b_mass_sum = b1.mass + b2.mass;
            let mass_sum = a.mass + b_mass_sum;

            // Positional correction split by relative mass; an immovable
            // side pushes the other fully out, with a small margin.
            let (a_move, b_move) = if a.mass.is_infinite() {
                (0.0, info.penetration + 0.001)
            } else if b_mass_sum.is_infinite() {
                (info.penetration + 0.001, 0.0)
            } else {
                (
                    info.penetration * (b_mass_sum / mass_sum),
                    info.penetration * (a.mass / mass_sum),
                )
            };

            if a.mass.is_finite() {
                body_a.point_masses[info.body_a_point].position += info.normal * a_move;
            }
            if b1.mass.is_finite() {
                body_b.point_masses[info.body_b_edge_a].position -=
                    info.normal * (b_move * b1_influence);
            }
            if b2.mass.is_finite() {
                body_b.point_masses[info.body_b_edge_b].position -=
                    info.normal * (b_move * b2_influence);
            }

            // Impulses only while the bodies approach each other.
            if relative_dot <= 0.0001 && (a.mass.is_finite() || b_mass_sum.is_finite()) {
                let a_inv_mass = if a.mass.is_infinite() { 0.0 } else { 1.0 / a.mass };
                let b_inv_mass = if b_mass_sum.is_infinite() {
                    0.0
                } else {
                    1.0 / b_mass_sum
                };
                let j_denom = a_inv_mass + b_inv_mass;

                let elasticity = 1.0 + material.elasticity;
                let j = -((relative_velocity * elasticity).dot(info.normal)) / j_denom;

                let tangent = perpendicular(info.normal);
                let friction = relative_velocity.dot(tangent) * material.friction / j_denom;

                if a.mass.is_finite() {
                    body_a.point_masses[info.body_a_point].velocity +=
                        info.normal * (j / a.mass) - tangent * (friction / a.mass);
                }

                if b_mass_sum.is_finite() {
                    let j_component = info.normal * (j / b_mass_sum);
                    let f_component = tangent * (friction * b_mass_sum);

                    body_b.point_masses[info.body_b_edge_a].velocity +=
                        -(j_component * b1_influence - f_component * b1_influence);
                    body_b.point_masses[info.body_b_edge_b].velocity +=
                        -(j_component * b2_influence - f_component * b2_influence);
                }
            }

            body_a.bitmasks_stale = true;
            body_b.bitmasks_stale = true;
            self.resolved_collisions.push(info);
        }
    }
}

impl Default for IslandJob {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable references to two distinct bodies in a slice.
fn pair_mut(bodies: &mut [Body], a: usize, b: usize) -> (&mut Body, &mut Body) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = bodies.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = bodies.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
