use serde::{Deserialize, Serialize};

use crate::core::Body;

/// Resists sharp creases in the body perimeter.
///
/// Each constrained point receives a stiffness-scaled force toward the line
/// between its two perimeter neighbors, with the neighbors forced the
/// opposite way. Forces only accumulate here; integration applies them, so
/// immovable points are unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BendComponent {
    pub stiffness: f32,
    /// Point mass indices to constrain, or every point when `None`.
    pub indices: Option<Vec<usize>>,
}

impl BendComponent {
    pub fn new(stiffness: f32, indices: Option<Vec<usize>>) -> Self {
        Self { stiffness, indices }
    }

    pub fn accumulate_internal_forces(&mut self, body: &mut Body) {
        let count = body.point_masses.len();
        if count < 3 {
            return;
        }

        match &self.indices {
            Some(indices) => {
                for &index in indices {
                    if index < count {
                        Self::constrain(body, index, self.stiffness);
                    }
                }
            }
            None => {
                for index in 0..count {
                    Self::constrain(body, index, self.stiffness);
                }
            }
        }
    }

    fn constrain(body: &mut Body, index: usize, stiffness: f32) {
        let count = body.point_masses.len();
        let prev = (index + 1) % count;
        let next = if index == 0 { count - 1 } else { index - 1 };

        let prev_pos = body.point_masses[prev].position;
        let next_pos = body.point_masses[next].position;
        let point_pos = body.point_masses[index].position;

        let base_length = prev_pos.distance(next_pos);
        if base_length == 0.0 {
            return;
        }

        let base = (next_pos - prev_pos) / base_length;
        let along = (prev_pos - point_pos).dot(base);
        let base_position = prev_pos - base * along;
        let offset = base_position - point_pos;

        body.point_masses[prev].apply_force(-offset * stiffness);
        body.point_masses[index].apply_force(offset * stiffness);
        body.point_masses[next].apply_force(-offset * stiffness);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Body, ClosedShape};
    use glam::Vec2;

    fn creased_square() -> Body {
        let mut body = Body::new(ClosedShape::square(2.0), Vec2::ZERO, 0.0, Vec2::ONE, 1.0);
        // Push one corner inward to crease the perimeter.
        body.point_masses[1].position = Vec2::new(0.5, 0.5);
        body.update_edges_and_normals();
        body
    }

    #[test]
    fn creased_point_is_forced_toward_the_base_line() {
        let mut body = creased_square();
        let mut bend = BendComponent::new(0.1, Some(vec![1]));
        bend.accumulate_internal_forces(&mut body);

        let force = body.point_masses[1].force;
        assert_ne!(force, Vec2::ZERO);
        // The point at (0.5, 0.5) projects onto the chord through its
        // neighbors at the origin, so the restoring force points there.
        assert!(force.x < 0.0);
        assert!(force.y < 0.0);
    }

    #[test]
    fn constraint_accumulates_forces_without_moving_points() {
        let mut body = creased_square();
        body.set_mass_for_point(1, f32::INFINITY);
        let before: Vec<Vec2> = body.point_masses.iter().map(|pm| pm.position).collect();

        let mut bend = BendComponent::new(0.1, None);
        bend.accumulate_internal_forces(&mut body);

        let after: Vec<Vec2> = body.point_masses.iter().map(|pm| pm.position).collect();
        assert_eq!(before, after);

        // The immovable point keeps its position through integration too.
        body.point_masses[1].integrate(1.0 / 60.0);
        assert_eq!(body.point_masses[1].position, before[1]);
    }
}
