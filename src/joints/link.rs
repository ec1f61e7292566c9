use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::Body;
use crate::utils::geometry::{averaged_angle, perpendicular, vector_ratio};
use crate::utils::BodyId;

/// Which part of a body a joint attaches to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkKind {
    /// The whole body, attached at its derived position.
    Body,
    /// A single point mass.
    Point { index: usize },
    /// A point along an edge, at `ratio` between the edge's endpoints.
    Edge { index: usize, ratio: f32 },
    /// The average of a subset of point masses, plus a rotating offset.
    Shape { indices: Vec<usize>, offset: Vec2 },
    /// A weighted average of point masses, plus a rotating offset.
    WeightedShape {
        entries: Vec<(usize, f32)>,
        offset: Vec2,
    },
}

/// One endpoint of a body joint.
///
/// Links store the body handle and local indices only; the owning world
/// resolves the handle before every operation, so stale joints degrade to
/// no-ops instead of touching recycled bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointLink {
    pub body: BodyId,
    pub kind: LinkKind,
}

impl JointLink {
    pub fn body(body: BodyId) -> Self {
        Self {
            body,
            kind: LinkKind::Body,
        }
    }

    pub fn point(body: BodyId, index: usize) -> Self {
        Self {
            body,
            kind: LinkKind::Point { index },
        }
    }

    pub fn edge(body: BodyId, index: usize, ratio: f32) -> Self {
        Self {
            body,
            kind: LinkKind::Edge { index, ratio },
        }
    }

    pub fn shape(body: BodyId, indices: Vec<usize>, offset: Vec2) -> Self {
        Self {
            body,
            kind: LinkKind::Shape { indices, offset },
        }
    }

    pub fn weighted_shape(body: BodyId, entries: Vec<(usize, f32)>, offset: Vec2) -> Self {
        Self {
            body,
            kind: LinkKind::WeightedShape { entries, offset },
        }
    }

    /// World position of the link point.
    pub fn position(&self, body: &Body) -> Vec2 {
        match &self.kind {
            LinkKind::Body => body.derived_position,
            LinkKind::Point { index } => body.point_masses[*index].position,
            LinkKind::Edge { index, ratio } => {
                let count = body.point_masses.len();
                vector_ratio(
                    body.point_masses[*index].position,
                    body.point_masses[(*index + 1) % count].position,
                    *ratio,
                )
            }
            LinkKind::Shape { indices, offset } => {
                let sum: Vec2 = indices
                    .iter()
                    .map(|&i| body.point_masses[i].position)
                    .sum();
                sum / indices.len().max(1) as f32
                    + Vec2::from_angle(body.derived_angle).rotate(*offset)
            }
            LinkKind::WeightedShape { entries, offset } => {
                let mut sum = Vec2::ZERO;
                let mut total = 0.0;
                for &(i, weight) in entries {
                    sum += body.point_masses[i].position * weight;
                    total += weight;
                }
                let average = if total > 0.0 { sum / total } else { sum };
                average + Vec2::from_angle(body.derived_angle).rotate(*offset)
            }
        }
    }

    /// World velocity of the link point.
    pub fn velocity(&self, body: &Body) -> Vec2 {
        match &self.kind {
            LinkKind::Body => body.derived_velocity,
            LinkKind::Point { index } => body.point_masses[*index].velocity,
            LinkKind::Edge { index, ratio } => {
                let count = body.point_masses.len();
                vector_ratio(
                    body.point_masses[*index].velocity,
                    body.point_masses[(*index + 1) % count].velocity,
                    *ratio,
                )
            }
            LinkKind::Shape { indices, .. } => {
                let sum: Vec2 = indices
                    .iter()
                    .map(|&i| body.point_masses[i].velocity)
                    .sum();
                sum / indices.len().max(1) as f32
            }
            LinkKind::WeightedShape { entries, .. } => {
                let mut sum = Vec2::ZERO;
                let mut total = 0.0;
                for &(i, weight) in entries {
                    sum += body.point_masses[i].velocity * weight;
                    total += weight;
                }
                if total > 0.0 {
                    sum / total
                } else {
                    sum
                }
            }
        }
    }

    /// Mass carried by the link.
    pub fn mass(&self, body: &Body) -> f32 {
        match &self.kind {
            LinkKind::Body => body.total_mass(),
            LinkKind::Point { index } => body.point_masses[*index].mass,
            LinkKind::Edge { index, ratio } => {
                let count = body.point_masses.len();
                body.point_masses[*index].mass * (1.0 - ratio)
                    + body.point_masses[(*index + 1) % count].mass * ratio
            }
            LinkKind::Shape { indices, .. } => {
                indices.iter().map(|&i| body.point_masses[i].mass).sum()
            }
            LinkKind::WeightedShape { entries, .. } => {
                entries.iter().map(|&(i, _)| body.point_masses[i].mass).sum()
            }
        }
    }

    /// Whether the link point cannot be moved by forces.
    pub fn is_static(&self, body: &Body) -> bool {
        match &self.kind {
            LinkKind::Body => body.is_static || body.is_pinned,
            LinkKind::Point { index } => body.point_masses[*index].mass.is_infinite(),
            LinkKind::Edge { index, ratio: _ } => {
                let count = body.point_masses.len();
                body.point_masses[*index].mass.is_infinite()
                    && body.point_masses[(*index + 1) % count].mass.is_infinite()
            }
            LinkKind::Shape { indices, .. } => indices
                .iter()
                .any(|&i| body.point_masses[i].mass.is_infinite()),
            LinkKind::WeightedShape { entries, .. } => entries
                .iter()
                .any(|&(i, _)| body.point_masses[i].mass.is_infinite()),
        }
    }

    /// Orientation of the link.
    pub fn angle(&self, body: &Body) -> f32 {
        match &self.kind {
            LinkKind::Body | LinkKind::Point { .. } => body.derived_angle,
            LinkKind::Edge { index, ratio: _ } => {
                let difference = body.edges[*index].difference;
                difference.y.atan2(difference.x)
            }
            LinkKind::Shape { indices, .. } => averaged_angle(indices.iter().map(|&i| {
                (
                    body.base_shape.vertices()[i],
                    body.point_masses[i].position - body.derived_position,
                )
            })),
            LinkKind::WeightedShape { entries, .. } => {
                averaged_angle(entries.iter().map(|&(i, _)| {
                    (
                        body.base_shape.vertices()[i],
                        body.point_masses[i].position - body.derived_position,
                    )
                }))
            }
        }
    }

    /// Applies a force at the link point.
    pub fn apply_force(&self, body: &mut Body, force: Vec2) {
        match &self.kind {
            LinkKind::Body => body.apply_global_force(force),
            LinkKind::Point { index } => body.point_masses[*index].apply_force(force),
            LinkKind::Edge { index, ratio } => {
                let count = body.point_masses.len();
                let next = (*index + 1) % count;
                body.point_masses[*index].apply_force(force * (1.0 - ratio));
                body.point_masses[next].apply_force(force * *ratio);

                // An off-center edge attachment also spins the body.
                if *ratio > 0.0 && *ratio < 1.0 {
                    let link_position = self.position(body);
                    let torque = (body.derived_position - link_position)
                        .dot(perpendicular(force))
                        * (1.0 - (1.0 - ratio * 2.0).abs());
                    body.apply_torque(torque);
                }
            }
            LinkKind::Shape { indices, offset } => {
                let link_position = self.position(body);
                let world_offset = Vec2::from_angle(body.derived_angle).rotate(*offset);
                let torque = world_offset.dot(perpendicular(force));

                for &i in indices {
                    let arm = perpendicular(
                        body.point_masses[i].position - link_position + world_offset,
                    );
                    body.point_masses[i].apply_force(force + arm * torque);
                }
            }
            LinkKind::WeightedShape { entries, offset } => {
                let link_position = self.position(body);
                let world_offset = Vec2::from_angle(body.derived_angle).rotate(*offset);
                let torque = world_offset.dot(perpendicular(force));

                for &(i, weight) in entries {
                    let arm = perpendicular(
                        body.point_masses[i].position - link_position + world_offset,
                    );
                    body.point_masses[i].apply_force((force + arm * torque) * weight);
                }
            }
        }
    }

    /// Applies a torque around the link.
    pub fn apply_torque(&self, body: &mut Body, torque: f32) {
        match &self.kind {
            LinkKind::Edge { index, ratio } => {
                let count = body.point_masses.len();
                let next = (*index + 1) % count;
                let direction = perpendicular(body.edges[*index].difference);
                body.point_masses[*index].apply_force(direction * (torque * (1.0 - ratio)));
                body.point_masses[next].apply_force(-direction * (torque * ratio));
            }
            _ => body.apply_torque(torque),
        }
    }

    /// Moves the linked point masses by a world offset.
    pub fn translate(&self, body: &mut Body, offset: Vec2) {
        match &self.kind {
            LinkKind::Body => {
                for pm in &mut body.point_masses {
                    pm.position += offset;
                }
                body.derived_position += offset;
            }
            LinkKind::Point { index } => body.point_masses[*index].position += offset,
            LinkKind::Edge { index, ratio: _ } => {
                let count = body.point_masses.len();
                let next = (*index + 1) % count;
                body.point_masses[*index].position += offset;
                body.point_masses[next].position += offset;
            }
            LinkKind::Shape { indices, .. } => {
                for &i in indices {
                    body.point_masses[i].position += offset;
                }
            }
            LinkKind::WeightedShape { entries, .. } => {
                for &(i, _) in entries {
                    body.point_masses[i].position += offset;
                }
            }
        }
        body.bitmasks_stale = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClosedShape;

    fn square_body() -> Body {
        Body::new(ClosedShape::square(2.0), Vec2::ZERO, 0.0, Vec2::ONE, 1.0)
    }

    #[test]
    fn edge_link_interpolates_between_endpoints() {
        let body = square_body();
        let link = JointLink::edge(body.id, 0, 0.5);

        // Edge 0 runs along the top of the square.
        let position = link.position(&body);
        assert!((position.x - 0.0).abs() < 1e-5);
        assert!((position.y - 1.0).abs() < 1e-5);
        assert!((link.mass(&body) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn body_link_is_static_for_pinned_bodies() {
        let mut body = square_body();
        let link = JointLink::body(body.id);
        assert!(!link.is_static(&body));

        body.is_pinned = true;
        assert!(link.is_static(&body));
    }

    #[test]
    fn edge_link_is_static_only_when_both_endpoints_are() {
        let mut body = square_body();
        let link = JointLink::edge(body.id, 0, 0.5);

        body.set_mass_for_point(0, f32::INFINITY);
        assert!(!link.is_static(&body));

        body.set_mass_for_point(1, f32::INFINITY);
        assert!(link.is_static(&body));
    }

    #[test]
    fn shape_link_offset_rotates_with_the_body() {
        let mut body = square_body();
        let link = JointLink::shape(body.id, vec![0, 1, 2, 3], Vec2::new(1.0, 0.0));

        let position = link.position(&body);
        assert!((position.x - 1.0).abs() < 1e-5);

        body.derived_angle = std::f32::consts::FRAC_PI_2;
        let rotated = link.position(&body);
        assert!(rotated.x.abs() < 1e-5);
        assert!((rotated.y - 1.0).abs() < 1e-5);
    }
}
