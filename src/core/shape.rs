use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

use crate::utils::geometry::polygon_area;

/// An untransformed closed polygon, the rest shape of a soft body.
///
/// Vertices are stored in local space and wound so that edge perpendiculars
/// point outward. The shape is implicitly closed from the last vertex back to
/// the first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosedShape {
    vertices: Vec<Vec2>,
}

impl ClosedShape {
    pub fn new(vertices: Vec<Vec2>) -> Self {
        Self { vertices }
    }

    /// An axis-aligned rectangle of the given total side lengths, centered on
    /// the local origin.
    pub fn rectangle(sides: Vec2) -> Self {
        let half = sides / 2.0;
        Self::new(vec![
            Vec2::new(-half.x, half.y),
            Vec2::new(half.x, half.y),
            Vec2::new(half.x, -half.y),
            Vec2::new(-half.x, -half.y),
        ])
    }

    /// A square with the given total side length.
    pub fn square(side: f32) -> Self {
        Self::rectangle(Vec2::splat(side))
    }

    /// A regular polygon approximating a circle, centered on the local origin.
    pub fn circle(radius: f32, point_count: usize) -> Self {
        let mut vertices = Vec::with_capacity(point_count);
        for i in 0..point_count {
            let n = std::f32::consts::TAU * (i as f32 / point_count as f32);
            vertices.push(Vec2::new((-n).cos(), (-n).sin()) * radius);
        }
        Self::new(vertices)
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Signed rest area of the shape.
    pub fn area(&self) -> f32 {
        polygon_area(self.vertices.iter().copied())
    }

    /// Reverses the vertex order, flipping the winding direction.
    pub fn invert_points(&mut self) {
        self.vertices.reverse();
    }

    /// Rotates and scales the vertices in place, scale first.
    pub fn transform_own(&mut self, angle: f32, scale: Vec2) {
        let transform = Affine2::from_scale_angle_translation(scale, angle, Vec2::ZERO);
        for v in &mut self.vertices {
            *v = transform.transform_point2(*v);
        }
    }

    /// A new shape with every vertex run through the given transform.
    pub fn transformed_by(&self, transform: Affine2) -> ClosedShape {
        ClosedShape::new(
            self.vertices
                .iter()
                .map(|&v| transform.transform_point2(v))
                .collect(),
        )
    }

    /// Recenters the vertices so their average sits on the local origin.
    pub fn centered(mut self) -> Self {
        if self.vertices.is_empty() {
            return self;
        }

        let sum: Vec2 = self.vertices.iter().copied().sum();
        let center = sum / self.vertices.len() as f32;
        for v in &mut self.vertices {
            *v -= center;
        }
        self
    }

    /// Transforms every vertex into world space, writing into `out`.
    ///
    /// `out` is resized to match the vertex count.
    pub fn transform_into(&self, out: &mut Vec<Vec2>, position: Vec2, angle: f32, scale: Vec2) {
        out.resize(self.vertices.len(), Vec2::ZERO);

        let transform = Affine2::from_scale_angle_translation(scale, angle, position);
        for (dst, &src) in out.iter_mut().zip(&self.vertices) {
            *dst = transform.transform_point2(src);
        }
    }

    /// Transforms every vertex into world space, returning a new list.
    pub fn transformed(&self, position: Vec2, angle: f32, scale: Vec2) -> Vec<Vec2> {
        let mut out = Vec::new();
        self.transform_into(&mut out, position, angle, scale);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn square_area_matches_side_product() {
        let shape = ClosedShape::square(2.0);
        assert_eq!(shape.len(), 4);
        assert_relative_eq!(shape.area(), 4.0);
    }

    #[test]
    fn circle_vertices_sit_on_radius() {
        let shape = ClosedShape::circle(3.0, 16);
        assert_eq!(shape.len(), 16);
        for v in shape.vertices() {
            assert_relative_eq!(v.length(), 3.0, epsilon = 1e-5);
        }
        // Positive area under the body winding convention.
        assert!(shape.area() > 0.0);
    }

    #[test]
    fn transform_applies_scale_rotation_translation() {
        let shape = ClosedShape::new(vec![Vec2::new(1.0, 0.0)]);
        let out = shape.transformed(
            Vec2::new(10.0, 0.0),
            std::f32::consts::FRAC_PI_2,
            Vec2::splat(2.0),
        );

        assert_relative_eq!(out[0].x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(out[0].y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn invert_points_flips_the_winding() {
        let mut shape = ClosedShape::square(2.0);
        let area = shape.area();

        shape.invert_points();
        assert_relative_eq!(shape.area(), -area);
    }

    #[test]
    fn transform_own_rewrites_the_local_vertices() {
        let mut shape = ClosedShape::new(vec![Vec2::new(1.0, 0.0)]);
        shape.transform_own(std::f32::consts::FRAC_PI_2, Vec2::splat(3.0));

        assert_relative_eq!(shape.vertices()[0].x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(shape.vertices()[0].y, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn transformed_by_leaves_the_original_untouched() {
        let shape = ClosedShape::square(2.0);
        let shifted = shape.transformed_by(Affine2::from_translation(Vec2::new(5.0, 0.0)));

        assert_relative_eq!(shifted.vertices()[0].x, 4.0);
        assert_relative_eq!(shape.vertices()[0].x, -1.0);
    }

    #[test]
    fn centered_moves_average_to_origin() {
        let shape = ClosedShape::new(vec![
            Vec2::new(1.0, 1.0),
            Vec2::new(3.0, 1.0),
            Vec2::new(2.0, 3.0),
        ])
        .centered();

        let sum: Vec2 = shape.vertices().iter().copied().sum();
        assert_relative_eq!(sum.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(sum.y, 0.0, epsilon = 1e-5);
    }
}
