use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::utils::BodyId;

/// One point-versus-edge contact produced by the narrow phase.
///
/// `body_a_point` penetrated the edge of `body_b` spanned by
/// `body_b_edge_a` and `body_b_edge_b`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CollisionInfo {
    pub body_a: BodyId,
    pub body_a_point: usize,
    pub body_b: BodyId,
    pub body_b_edge_a: usize,
    pub body_b_edge_b: usize,
    /// Closest point on the penetrated edge.
    pub hit_point: Vec2,
    /// Position of the hit along the edge, 0 at `body_b_edge_a`.
    pub edge_ratio: f32,
    /// Outward normal of the penetrated edge.
    pub normal: Vec2,
    pub penetration: f32,
}

impl CollisionInfo {
    pub fn new(body_a: BodyId, body_b: BodyId) -> Self {
        Self {
            body_a,
            body_a_point: 0,
            body_b,
            body_b_edge_a: 0,
            body_b_edge_b: 0,
            hit_point: Vec2::ZERO,
            edge_ratio: 0.0,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Receives collision notifications from a world after each update.
///
/// Deep penetrations are reported separately so callers can intervene when
/// the solver skipped a contact past the penetration threshold.
pub trait CollisionObserver: Send {
    /// Called once per update with every contact the narrow phase found
    /// that step, before material filters and the penetration threshold
    /// discard any of them.
    fn bodies_did_collide(&mut self, _contacts: &[CollisionInfo]) {}

    /// Called for each contact whose penetration exceeded the threshold.
    fn collision_exceeded_threshold(&mut self, _contact: &CollisionInfo, _penetration: f32) {}
}
