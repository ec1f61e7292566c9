use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box with explicit validity tracking.
///
/// A freshly cleared box is invalid: it contains and intersects nothing until
/// it is expanded to include at least one point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    valid: bool,
    min: Vec2,
    max: Vec2,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::invalid()
    }
}

impl Aabb {
    /// An empty, invalid box.
    pub fn invalid() -> Self {
        Self {
            valid: false,
            min: Vec2::ZERO,
            max: Vec2::ZERO,
        }
    }

    /// A valid box from raw bounds. The coordinates are not reordered.
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            valid: true,
            min,
            max,
        }
    }

    /// The smallest box containing every given point.
    pub fn of_points(points: &[Vec2]) -> Self {
        let mut aabb = Self::invalid();
        aabb.expand_to_include_points(points);
        aabb
    }

    /// The smallest box containing both endpoints of a segment.
    pub fn of_segment(start: Vec2, end: Vec2) -> Self {
        Self::new(start.min(end), start.max(end))
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn min(&self) -> Vec2 {
        self.min
    }

    pub fn max(&self) -> Vec2 {
        self.max
    }

    pub fn mid_x(&self) -> f32 {
        (self.min.x + self.max.x) / 2.0
    }

    pub fn mid_y(&self) -> f32 {
        (self.min.y + self.max.y) / 2.0
    }

    /// Invalidates this box.
    pub fn clear(&mut self) {
        self.valid = false;
    }

    /// Grows the box to include the given point, validating it if needed.
    pub fn expand_to_include(&mut self, point: Vec2) {
        if !self.valid {
            self.min = point;
            self.max = point;
            self.valid = true;
        } else {
            self.min = self.min.min(point);
            self.max = self.max.max(point);
        }
    }

    /// Grows the box to include every given point. Empty slices are a no-op.
    pub fn expand_to_include_points(&mut self, points: &[Vec2]) {
        for &point in points {
            self.expand_to_include(point);
        }
    }

    /// Inclusive point containment. Always false for an invalid box.
    pub fn contains_point(&self, point: Vec2) -> bool {
        if !self.valid {
            return false;
        }
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Whether this box completely contains another box.
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        if !self.valid || !other.valid {
            return false;
        }
        other.min.cmpge(self.min).all() && other.max.cmple(self.max).all()
    }

    /// Inclusive box-box intersection test. False if either box is invalid.
    pub fn intersects(&self, other: &Aabb) -> bool {
        if !self.valid || !other.valid {
            return false;
        }
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }
}
