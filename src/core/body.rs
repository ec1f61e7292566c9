use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::collision::{Bitmask, GridMask};
use crate::components::{BodyComponent, ComponentCreator, SpringComponent};
use crate::config::DEFAULT_VELOCITY_DAMPING;
use crate::core::{Aabb, BodyEdge, ClosedShape, PointMass};
use crate::utils::geometry::{line_intersect, perpendicular};
use crate::utils::BodyId;

/// The closest point on a body's perimeter to a query point.
#[derive(Debug, Clone, Copy)]
pub struct ClosestPoint {
    pub point: Vec2,
    /// Outward normal of the edge the point lies on.
    pub normal: Vec2,
    pub point_a: usize,
    pub point_b: usize,
    /// Position of the point along the edge, 0 at `point_a`.
    pub edge_ratio: f32,
    pub distance: f32,
}

/// The closest perimeter edge to a query point, within a tolerance.
#[derive(Debug, Clone, Copy)]
pub struct ClosestEdge {
    pub point: Vec2,
    pub edge_ratio: f32,
    pub point_a: usize,
    pub point_b: usize,
}

/// A deformable body made of point masses connected along a closed polygon.
///
/// The rest shape is kept in `base_shape`; the simulated perimeter lives in
/// `point_masses`. Derived quantities (position, angle, velocities, edges,
/// normals, AABB) are recomputed by the world during each update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub base_shape: ClosedShape,
    /// Scratch buffer holding `base_shape` transformed to world space.
    pub global_shape: Vec<Vec2>,
    pub point_masses: Vec<PointMass>,
    /// Per-point outward normals, averaged from the adjacent edges.
    pub point_normals: Vec<Vec2>,
    pub edges: Vec<BodyEdge>,
    pub scale: Vec2,

    pub derived_position: Vec2,
    pub derived_velocity: Vec2,
    pub derived_angle: f32,
    pub derived_omega: f32,
    last_angle: f32,

    pub aabb: Aabb,
    /// Index into the world's material list.
    pub material: usize,

    /// Static bodies never move and are skipped by integration.
    pub is_static: bool,
    /// Kinematic bodies are driven externally through `set_position_angle`.
    pub is_kinematic: bool,
    /// Pinned bodies deform freely but keep their derived position fixed.
    pub is_pinned: bool,
    /// Whether the derived angle tracks the point masses.
    pub free_rotate: bool,

    /// User collision mask; bodies only collide when their masks share a bit.
    pub bitmask: Bitmask,
    #[serde(skip)]
    pub(crate) bitmask_x: Bitmask,
    #[serde(skip)]
    pub(crate) bitmask_y: Bitmask,
    #[serde(skip)]
    pub(crate) bitmasks_stale: bool,

    pub velocity_damping: f32,
    pub components: Vec<BodyComponent>,
}

impl Body {
    pub fn new(shape: ClosedShape, position: Vec2, angle: f32, scale: Vec2, mass: f32) -> Self {
        let mut body = Self {
            id: BodyId::null(),
            base_shape: ClosedShape::default(),
            global_shape: Vec::new(),
            point_masses: Vec::new(),
            point_normals: Vec::new(),
            edges: Vec::new(),
            scale,
            derived_position: position,
            derived_velocity: Vec2::ZERO,
            derived_angle: angle,
            derived_omega: 0.0,
            last_angle: angle,
            aabb: Aabb::invalid(),
            material: 0,
            is_static: false,
            is_kinematic: false,
            is_pinned: false,
            free_rotate: true,
            bitmask: 0xFFFF_FFFF,
            bitmask_x: 0,
            bitmask_y: 0,
            bitmasks_stale: true,
            velocity_damping: DEFAULT_VELOCITY_DAMPING,
            components: Vec::new(),
        };

        body.set_shape(shape);
        body.set_mass_all(mass);
        body.update_aabb(0.0, true);
        body
    }

    /// Attaches a component built from the given creator.
    pub fn add_component(&mut self, creator: &ComponentCreator) {
        let mut component = creator.create();
        component.prepare(self);
        self.components.push(component);
    }

    /// The body's spring component, if one is attached.
    pub fn spring_component_mut(&mut self) -> Option<&mut SpringComponent> {
        self.components.iter_mut().find_map(|component| match component {
            BodyComponent::Spring(spring) => Some(spring),
            _ => None,
        })
    }

    /// Replaces the rest shape.
    ///
    /// When the vertex count changes, the point masses are rebuilt at the
    /// transformed shape positions with zero mass; call a mass setter
    /// afterwards.
    pub fn set_shape(&mut self, shape: ClosedShape) {
        self.base_shape = shape;
        self.base_shape.transform_into(
            &mut self.global_shape,
            self.derived_position,
            self.derived_angle,
            self.scale,
        );

        if self.base_shape.len() != self.point_masses.len() {
            self.point_masses = self
                .global_shape
                .iter()
                .map(|&position| PointMass::new(0.0, position))
                .collect();
            self.point_normals = vec![Vec2::ZERO; self.point_masses.len()];
        }

        let mut components = std::mem::take(&mut self.components);
        for component in &mut components {
            component.prepare(self);
        }
        self.components = components;

        self.update_edges();
        self.bitmasks_stale = true;
    }

    /// Sets every point mass to the same mass. The body becomes static when
    /// the mass is infinite.
    pub fn set_mass_all(&mut self, mass: f32) {
        for pm in &mut self.point_masses {
            pm.mass = mass;
        }
        self.is_static = mass.is_infinite();
    }

    pub fn set_mass_for_point(&mut self, index: usize, mass: f32) {
        if let Some(pm) = self.point_masses.get_mut(index) {
            pm.mass = mass;
        }
        self.refresh_static_flag();
    }

    /// Sets per-point masses from a list, in point order. Extra entries are
    /// ignored.
    pub fn set_mass_from_list(&mut self, masses: &[f32]) {
        for (pm, &mass) in self.point_masses.iter_mut().zip(masses) {
            pm.mass = mass;
        }
        self.refresh_static_flag();
    }

    fn refresh_static_flag(&mut self) {
        self.is_static = self.point_masses.iter().any(|pm| pm.mass.is_infinite());
    }

    /// Teleports the body, overwriting every point position from the rest
    /// shape.
    pub fn set_position_angle(&mut self, position: Vec2, angle: f32) {
        self.base_shape
            .transform_into(&mut self.global_shape, position, angle, self.scale);

        for (pm, &vertex) in self.point_masses.iter_mut().zip(&self.global_shape) {
            pm.position = vertex;
        }
        self.update_edges();

        self.derived_position = position;
        self.derived_angle = angle;
        self.last_angle = angle;

        // Static bodies skip the per-update AABB refresh.
        if self.is_static {
            self.update_aabb(0.0, true);
        }
        self.bitmasks_stale = true;
    }

    /// Moves a single point mass, marking the broad-phase masks stale.
    pub fn set_point_position(&mut self, index: usize, position: Vec2) {
        if let Some(pm) = self.point_masses.get_mut(index) {
            pm.position = position;
            self.bitmasks_stale = true;
        }
    }

    /// Rebuilds the cached world-space edges from the point positions.
    pub fn update_edges(&mut self) {
        let count = self.point_masses.len();
        self.edges.resize(count, BodyEdge::default());

        for i in 0..count {
            let start = self.point_masses[i].position;
            let end = self.point_masses[(i + 1) % count].position;
            self.edges[i] = BodyEdge::new(start, end);
        }
    }

    /// Recomputes per-point normals by averaging the two adjacent edge
    /// directions.
    pub fn update_normals(&mut self) {
        let count = self.edges.len();
        self.point_normals.resize(count, Vec2::ZERO);

        let Some(&last) = self.edges.last() else {
            return;
        };

        let mut prev = last;
        for i in 0..count {
            let current = self.edges[i];
            let sum = prev.difference + current.difference;

            // Opposing edge directions mean a fold; fall back to the
            // incoming edge direction.
            self.point_normals[i] = if sum == Vec2::ZERO {
                prev.difference
            } else {
                perpendicular(sum).normalize_or_zero()
            };
            prev = current;
        }
    }

    pub fn update_edges_and_normals(&mut self) {
        self.update_edges();
        self.update_normals();
    }

    /// Refits the AABB around the point masses, predicting one step of
    /// motion for moving bodies.
    ///
    /// Static bodies are skipped unless `force_update` is set.
    pub fn update_aabb(&mut self, elapsed: f32, force_update: bool) {
        if self.is_static && !force_update {
            return;
        }

        self.aabb.clear();
        for pm in &self.point_masses {
            self.aabb.expand_to_include(pm.position);
            if !self.is_static {
                self.aabb.expand_to_include(pm.position + pm.velocity * elapsed);
            }
        }
        self.bitmasks_stale = true;
    }

    /// Recomputes the broad-phase grid masks if the AABB moved.
    pub(crate) fn refresh_bitmasks(&mut self, grid: &GridMask) {
        if !self.bitmasks_stale {
            return;
        }
        let (x, y) = grid.masks_for(&self.aabb);
        self.bitmask_x = x;
        self.bitmask_y = y;
        self.bitmasks_stale = false;
    }

    /// Derives the body's position, velocity, angle and angular velocity
    /// from its point masses.
    pub fn derive_position_and_angle(&mut self, elapsed: f32) {
        if self.is_static || self.is_kinematic {
            return;
        }

        let count = self.point_masses.len();
        if count == 0 {
            return;
        }
        let inv_count = 1.0 / count as f32;

        let mut position_sum = Vec2::ZERO;
        let mut velocity_sum = Vec2::ZERO;
        for pm in &self.point_masses {
            position_sum += pm.position;
            velocity_sum += pm.velocity;
        }
        let average_position = position_sum * inv_count;

        if !self.is_pinned {
            self.derived_position = average_position;
            self.derived_velocity = velocity_sum * inv_count;
        }

        if !self.free_rotate {
            return;
        }

        // A pinned body rotates around its current center of mass, not its
        // frozen derived position.
        let mean = if self.is_pinned {
            average_position
        } else {
            self.derived_position
        };

        use std::f32::consts::PI;

        self.derived_angle = crate::utils::geometry::averaged_angle(
            self.base_shape
                .vertices()
                .iter()
                .zip(&self.point_masses)
                .map(|(&base, pm)| (base, pm.position - mean)),
        );

        let mut angle_change = self.derived_angle - self.last_angle;
        if angle_change.abs() >= PI {
            if angle_change < 0.0 {
                angle_change += PI * 2.0;
            } else {
                angle_change -= PI * 2.0;
            }
        }

        self.derived_omega = angle_change / elapsed;
        self.last_angle = self.derived_angle;
    }

    /// Integrates every point mass forward by `elapsed` seconds.
    pub fn integrate(&mut self, elapsed: f32) {
        if self.is_static {
            return;
        }

        for pm in &mut self.point_masses {
            pm.integrate(elapsed);
        }
        self.bitmasks_stale = true;
    }

    /// Applies per-update velocity damping.
    pub fn dampen_velocity(&mut self, elapsed: f32) {
        if self.is_static {
            return;
        }

        for pm in &mut self.point_masses {
            pm.velocity -= (pm.velocity - pm.velocity * self.velocity_damping) * (elapsed * 200.0);
        }
    }

    /// Applies a force at a world point, producing both linear and angular
    /// acceleration.
    pub fn apply_force(&mut self, force: Vec2, at: Vec2) {
        if self.is_static {
            return;
        }

        let torque = (self.derived_position - at).dot(perpendicular(force));
        for pm in &mut self.point_masses {
            let arm = perpendicular(pm.position - at);
            pm.apply_force(force + arm * torque);
        }
    }

    /// Applies the same force to every point mass.
    pub fn apply_global_force(&mut self, force: Vec2) {
        if self.is_static {
            return;
        }
        for pm in &mut self.point_masses {
            pm.apply_force(force);
        }
    }

    /// Applies a torque around the derived position.
    pub fn apply_torque(&mut self, force: f32) {
        if self.is_static {
            return;
        }

        for pm in &mut self.point_masses {
            let direction = perpendicular((pm.position - self.derived_position).normalize_or_zero());
            pm.apply_force(direction * force);
        }
    }

    /// Adds a velocity to every point mass.
    pub fn add_velocity(&mut self, velocity: Vec2) {
        if self.is_static {
            return;
        }
        for pm in &mut self.point_masses {
            pm.velocity += velocity;
        }
    }

    /// Sets the average velocity, preserving each point's deviation from it.
    pub fn set_average_velocity(&mut self, velocity: Vec2) {
        for pm in &mut self.point_masses {
            pm.velocity = velocity + (pm.velocity - self.derived_velocity);
        }
    }

    /// Replaces the angular velocity around the derived position.
    pub fn set_angular_velocity(&mut self, omega: f32) {
        for pm in &mut self.point_masses {
            let direction = perpendicular((pm.position - self.derived_position).normalize_or_zero());
            pm.velocity = self.derived_velocity + direction * omega;
        }
    }

    /// Adds to the angular velocity around the derived position.
    pub fn add_angular_velocity(&mut self, omega: f32) {
        for pm in &mut self.point_masses {
            let direction = perpendicular((pm.position - self.derived_position).normalize_or_zero());
            pm.velocity += direction * omega;
        }
    }

    /// Point-in-polygon test against the simulated perimeter.
    ///
    /// Casts a horizontal ray toward the nearer side of the AABB and counts
    /// edge crossings. The crossing test is half-open in Y (an edge counts
    /// the endpoint at its lower Y, not the upper), so a point lying exactly
    /// on the perimeter gets a deterministic answer that is stable across
    /// repeated queries: points on a vertical edge or on the lower boundary
    /// count as inside, points on the topmost boundary as outside.
    pub fn contains(&self, point: Vec2) -> bool {
        if !self.aabb.contains_point(point) {
            return false;
        }

        let mut inside = false;

        if point.x < self.aabb.mid_x() {
            let ray_end_x = self.aabb.min().x - 0.1;

            for edge in &self.edges {
                let (start, end) = (edge.start, edge.end);
                if start.x > point.x && end.x > point.x {
                    continue;
                }

                if (start.y <= point.y && end.y > point.y)
                    || (start.y > point.y && end.y <= point.y)
                {
                    let slope = (end.x - start.x) / (end.y - start.y);
                    let hit_x = start.x + (point.y - start.y) * slope;
                    if hit_x <= point.x && hit_x >= ray_end_x {
                        inside = !inside;
                    }
                }
            }
        } else {
            let ray_end_x = self.aabb.max().x + 0.1;

            for edge in &self.edges {
                let (start, end) = (edge.start, edge.end);
                if start.x < point.x && end.x < point.x {
                    continue;
                }

                if (start.y <= point.y && end.y > point.y)
                    || (start.y > point.y && end.y <= point.y)
                {
                    let slope = (end.x - start.x) / (end.y - start.y);
                    let hit_x = start.x + (point.y - start.y) * slope;
                    if hit_x >= point.x && hit_x <= ray_end_x {
                        inside = !inside;
                    }
                }
            }
        }

        inside
    }

    /// Whether any perimeter edge crosses the given segment.
    pub fn intersects_line(&self, start: Vec2, end: Vec2) -> bool {
        if !self.aabb.intersects(&Aabb::of_segment(start, end)) {
            return false;
        }

        self.edges
            .iter()
            .any(|edge| line_intersect(start, end, edge.start, edge.end).is_some())
    }

    /// Casts a ray against the perimeter, returning the hit closest to
    /// `start`.
    pub fn raycast(&self, start: Vec2, end: Vec2) -> Option<Vec2> {
        if !self.aabb.intersects(&Aabb::of_segment(start, end)) {
            return None;
        }

        let mut closest: Option<Vec2> = None;
        for edge in &self.edges {
            // Shorten the ray to the best hit so far.
            let farthest = closest.unwrap_or(end);
            if let Some((hit, _, _)) = line_intersect(start, farthest, edge.start, edge.end) {
                closest = Some(hit);
            }
        }
        closest
    }

    /// Closest point on one edge to a query point.
    ///
    /// Returns the point, the edge normal, the ratio along the edge and the
    /// squared distance.
    pub fn closest_point_on_edge_squared(
        &self,
        point: Vec2,
        edge_index: usize,
    ) -> (Vec2, Vec2, f32, f32) {
        let edge = &self.edges[edge_index];
        let to_point = point - edge.start;
        let along = to_point.dot(edge.difference);

        if along <= 0.0 {
            (edge.start, edge.normal, 0.0, point.distance_squared(edge.start))
        } else if along >= edge.length {
            (edge.end, edge.normal, 1.0, point.distance_squared(edge.end))
        } else {
            let normal_distance = to_point.dot(edge.normal);
            (
                edge.start + edge.difference * along,
                edge.normal,
                along / edge.length,
                normal_distance * normal_distance,
            )
        }
    }

    /// Closest point on the whole perimeter to a query point.
    pub fn closest_point(&self, point: Vec2) -> Option<ClosestPoint> {
        let count = self.edges.len();
        let mut best: Option<ClosestPoint> = None;
        let mut best_distance_sq = f32::INFINITY;

        for i in 0..count {
            let (hit, normal, edge_ratio, distance_sq) =
                self.closest_point_on_edge_squared(point, i);

            if distance_sq < best_distance_sq {
                best_distance_sq = distance_sq;
                best = Some(ClosestPoint {
                    point: hit,
                    normal,
                    point_a: i,
                    point_b: (i + 1) % count,
                    edge_ratio,
                    distance: 0.0,
                });
            }
        }

        best.map(|mut closest| {
            closest.distance = best_distance_sq.sqrt();
            closest
        })
    }

    /// Closest perimeter edge within `tolerance` of a query point.
    pub fn closest_edge(&self, point: Vec2, tolerance: f32) -> Option<ClosestEdge> {
        let count = self.point_masses.len();
        let mut best: Option<ClosestEdge> = None;
        let mut best_distance = tolerance;

        for i in 0..count {
            let edge = &self.edges[i];
            let start = self.point_masses[i].position;

            let along = ((start - point).dot(edge.difference)).clamp(0.0, edge.length);
            let offset = edge.difference * along;
            let edge_position = start - offset;
            let distance = (point - edge_position).length();

            if distance < best_distance {
                best_distance = distance;
                best = Some(ClosestEdge {
                    point: edge_position,
                    edge_ratio: if edge.length > 0.0 { along / edge.length } else { 0.0 },
                    point_a: i,
                    point_b: (i + 1) % count,
                });
            }
        }

        best
    }

    /// Index of the closest point mass and its distance to the query point.
    pub fn closest_point_mass(&self, point: Vec2) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;

        for (i, pm) in self.point_masses.iter().enumerate() {
            let distance_sq = point.distance_squared(pm.position);
            if best.map(|(_, d)| distance_sq < d).unwrap_or(true) {
                best = Some((i, distance_sq));
            }
        }

        best.map(|(i, distance_sq)| (i, distance_sq.sqrt()))
    }

    /// Sum of all point masses. Infinite if any point is immovable.
    pub fn total_mass(&self) -> f32 {
        self.point_masses.iter().map(|pm| pm.mass).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square_body() -> Body {
        Body::new(
            ClosedShape::square(2.0),
            Vec2::ZERO,
            0.0,
            Vec2::ONE,
            1.0,
        )
    }

    #[test]
    fn contains_distinguishes_inside_from_outside() {
        let body = unit_square_body();

        assert!(body.contains(Vec2::ZERO));
        assert!(!body.contains(Vec2::new(2.0, 0.0)));
        assert!(body.contains(Vec2::new(0.9, -0.9)));
        assert!(!body.contains(Vec2::new(0.0, 1.5)));
    }

    #[test]
    fn contains_is_deterministic_on_the_boundary() {
        let body = unit_square_body();

        // Half-open crossing rule: vertical edges and the bottom edge are
        // inside, the top edge is outside.
        assert!(body.contains(Vec2::new(1.0, 0.0)));
        assert!(body.contains(Vec2::new(-1.0, 0.0)));
        assert!(body.contains(Vec2::new(0.0, -1.0)));
        assert!(!body.contains(Vec2::new(0.0, 1.0)));

        // Repeated queries agree.
        for _ in 0..3 {
            assert!(body.contains(Vec2::new(1.0, 0.0)));
            assert!(!body.contains(Vec2::new(0.0, 1.0)));
        }
    }

    #[test]
    fn update_edges_closes_the_polygon() {
        let body = unit_square_body();

        assert_eq!(body.edges.len(), body.point_masses.len());
        for (i, edge) in body.edges.iter().enumerate() {
            let next = (i + 1) % body.point_masses.len();
            assert_eq!(edge.start, body.point_masses[i].position);
            assert_eq!(edge.end, body.point_masses[next].position);
            assert_relative_eq!(edge.length, 2.0);
        }
    }

    #[test]
    fn edge_normals_point_outward() {
        let mut body = unit_square_body();
        body.update_normals();

        // Top edge of the square runs left to right, so its normal is +Y.
        assert_relative_eq!(body.edges[0].normal.y, 1.0);
        // And the point normals roughly bisect their corners.
        for (pm, normal) in body.point_masses.iter().zip(&body.point_normals) {
            assert!(normal.dot(pm.position) > 0.0);
        }
    }

    #[test]
    fn infinite_point_mass_makes_the_body_static() {
        let mut body = unit_square_body();
        assert!(!body.is_static);

        body.set_mass_for_point(2, f32::INFINITY);
        assert!(body.is_static);

        body.set_mass_for_point(2, 1.0);
        assert!(!body.is_static);

        body.set_mass_all(f32::INFINITY);
        assert!(body.is_static);
    }

    #[test]
    fn derive_position_tracks_the_point_average() {
        let mut body = unit_square_body();
        for pm in &mut body.point_masses {
            pm.position += Vec2::new(3.0, -1.0);
        }
        body.update_edges_and_normals();
        body.derive_position_and_angle(1.0 / 60.0);

        assert_relative_eq!(body.derived_position.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(body.derived_position.y, -1.0, epsilon = 1e-5);
        assert_relative_eq!(body.derived_angle, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn derive_angle_follows_a_rigid_rotation() {
        let mut body = unit_square_body();
        let angle = 0.4;
        let rotation = Vec2::from_angle(angle);
        for pm in &mut body.point_masses {
            pm.position = rotation.rotate(pm.position);
        }
        body.update_edges_and_normals();
        body.derive_position_and_angle(1.0 / 60.0);

        assert_relative_eq!(body.derived_angle, angle, epsilon = 1e-4);
        assert!(body.derived_omega > 0.0);
    }

    #[test]
    fn pinned_body_keeps_its_derived_position() {
        let mut body = unit_square_body();
        body.is_pinned = true;

        for pm in &mut body.point_masses {
            pm.position += Vec2::new(5.0, 5.0);
        }
        body.update_edges_and_normals();
        body.derive_position_and_angle(1.0 / 60.0);

        assert_eq!(body.derived_position, Vec2::ZERO);
    }

    #[test]
    fn raycast_hits_the_nearest_edge() {
        let mut body = unit_square_body();
        body.update_aabb(0.0, true);

        let hit = body.raycast(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0));
        let hit = hit.unwrap();
        assert_relative_eq!(hit.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(hit.y, 0.0, epsilon = 1e-5);

        assert!(body.raycast(Vec2::new(-5.0, 3.0), Vec2::new(5.0, 3.0)).is_none());
    }

    #[test]
    fn closest_point_projects_onto_the_perimeter() {
        let body = unit_square_body();

        let closest = body.closest_point(Vec2::new(0.5, 3.0)).unwrap();
        assert_relative_eq!(closest.point.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(closest.point.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(closest.distance, 2.0, epsilon = 1e-5);
        assert_relative_eq!(closest.normal.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn set_position_angle_teleports_without_velocity() {
        let mut body = unit_square_body();
        body.set_position_angle(Vec2::new(10.0, 0.0), 0.0);

        assert_eq!(body.derived_position, Vec2::new(10.0, 0.0));
        for pm in &body.point_masses {
            assert_eq!(pm.velocity, Vec2::ZERO);
            assert!(pm.position.x >= 9.0 && pm.position.x <= 11.0);
        }
    }
}
