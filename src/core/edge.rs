use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::utils::geometry::perpendicular;

/// Cached world-space data for one perimeter edge of a body.
///
/// Rebuilt by the body whenever its point masses move; collision and
/// component code read these instead of recomputing edge vectors per query.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BodyEdge {
    pub start: Vec2,
    pub end: Vec2,
    /// Normalized direction from `start` to `end`.
    pub difference: Vec2,
    /// Outward normal, perpendicular to `difference`.
    pub normal: Vec2,
    pub length: f32,
    pub length_squared: f32,
}

impl BodyEdge {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        let difference = (end - start).normalize_or_zero();
        let length = start.distance(end);

        Self {
            start,
            end,
            difference,
            normal: perpendicular(difference),
            length,
            length_squared: length * length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn edge_caches_direction_normal_and_length() {
        let edge = BodyEdge::new(Vec2::ZERO, Vec2::new(3.0, 0.0));

        assert_relative_eq!(edge.difference.x, 1.0);
        assert_relative_eq!(edge.normal.y, 1.0);
        assert_relative_eq!(edge.length, 3.0);
        assert_relative_eq!(edge.length_squared, 9.0);
    }

    #[test]
    fn degenerate_edge_has_zero_direction() {
        let edge = BodyEdge::new(Vec2::ONE, Vec2::ONE);

        assert_eq!(edge.difference, Vec2::ZERO);
        assert_eq!(edge.normal, Vec2::ZERO);
        assert_eq!(edge.length, 0.0);
    }
}
