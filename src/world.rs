use std::collections::HashSet;
use std::time::Instant;

use glam::Vec2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::collision::{CollisionInfo, CollisionObserver, GridMask, QuadTree};
use crate::config::{DEFAULT_PENETRATION_THRESHOLD, DEFAULT_WORLD_HALF_EXTENT, FRAME_BUDGET_MS};
use crate::core::{Aabb, Body, ClosedShape, CollisionFilter, MaterialPair};
use crate::dynamics::island::IslandJob;
use crate::joints::BodyJoint;
use crate::utils::logging::{warn_if_frame_budget_exceeded, ScopedTimer};
use crate::utils::{Arena, BodyId, JointId};

/// The simulation container: bodies, joints, materials and world limits.
///
/// Each [`update`](World::update) splits the scene into islands of bodies
/// that can interact this step, resolves every island independently and
/// writes the results back. With the `parallel` feature, islands run on the
/// rayon thread pool.
pub struct World {
    bodies: Arena<Body>,
    joints: Arena<BodyJoint>,

    material_pairs: Vec<Vec<MaterialPair>>,
    material_count: usize,

    world_limits: Aabb,
    grid: GridMask,

    pub penetration_threshold: f32,
    relaxing: bool,

    observer: Option<Box<dyn CollisionObserver>>,
    collision_list: Vec<CollisionInfo>,

    #[cfg(feature = "parallel")]
    parallel_enabled: bool,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let limit = Vec2::splat(DEFAULT_WORLD_HALF_EXTENT);
        Self {
            bodies: Arena::new(),
            joints: Arena::new(),
            material_pairs: vec![vec![MaterialPair::default()]],
            material_count: 1,
            world_limits: Aabb::new(-limit, limit),
            grid: GridMask::new(-limit, limit),
            penetration_threshold: DEFAULT_PENETRATION_THRESHOLD,
            relaxing: false,
            observer: None,
            collision_list: Vec::new(),
            #[cfg(feature = "parallel")]
            parallel_enabled: true,
        }
    }

    /// Sets the world limits used for the broad-phase grid.
    ///
    /// Bodies outside the limits clamp onto the border cells and lose broad
    /// phase precision, but still simulate.
    pub fn set_world_limits(&mut self, min: Vec2, max: Vec2) {
        self.world_limits = Aabb::new(min, max);
        self.grid = GridMask::new(min, max);

        for body in self.bodies.iter_mut() {
            body.bitmasks_stale = true;
        }
    }

    pub fn world_limits(&self) -> &Aabb {
        &self.world_limits
    }

    /// Whether islands resolve on the rayon thread pool.
    #[cfg(feature = "parallel")]
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.parallel_enabled = enabled;
    }

    // MATERIALS

    /// Registers a new material, keeping all existing pair data intact.
    /// Returns the material index.
    pub fn add_material(&mut self) -> usize {
        self.material_count += 1;

        for row in &mut self.material_pairs {
            row.push(MaterialPair::default());
        }
        self.material_pairs
            .push(vec![MaterialPair::default(); self.material_count]);

        self.material_count - 1
    }

    pub fn material_count(&self) -> usize {
        self.material_count
    }

    /// Enables or disables collision between two materials.
    pub fn set_material_pair_collide(&mut self, a: usize, b: usize, collide: bool) {
        if a < self.material_count && b < self.material_count {
            self.material_pairs[a][b].collide = collide;
            self.material_pairs[b][a].collide = collide;
        }
    }

    /// Sets friction and elasticity for a pair of materials.
    pub fn set_material_pair_data(&mut self, a: usize, b: usize, friction: f32, elasticity: f32) {
        if a < self.material_count && b < self.material_count {
            self.material_pairs[a][b].friction = friction;
            self.material_pairs[a][b].elasticity = elasticity;
            self.material_pairs[b][a].friction = friction;
            self.material_pairs[b][a].elasticity = elasticity;
        }
    }

    /// Installs a collision filter called for every contact between the two
    /// materials.
    pub fn set_material_pair_filter(&mut self, a: usize, b: usize, filter: CollisionFilter) {
        if a < self.material_count && b < self.material_count {
            self.material_pairs[a][b].filter = Some(filter.clone());
            self.material_pairs[b][a].filter = Some(filter);
        }
    }

    // BODIES AND JOINTS

    /// Adds a body, returning its handle.
    pub fn add_body(&mut self, mut body: Body) -> BodyId {
        body.update_aabb(0.0, true);
        let id = self.bodies.insert(body);
        if let Some(body) = self.bodies.get_mut(id) {
            body.id = id;
        }
        id
    }

    /// Removes a body along with every joint attached to it.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let attached: Vec<JointId> = self
            .joints
            .iter_with_ids()
            .filter(|(_, joint)| joint.link_a.body == id || joint.link_b.body == id)
            .map(|(joint_id, _)| joint_id)
            .collect();
        for joint_id in attached {
            self.joints.remove(joint_id);
        }

        self.bodies.remove(id)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    pub fn body_ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies.ids()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Adds a joint, returning its handle. Joints referencing removed bodies
    /// become inert.
    pub fn add_joint(&mut self, mut joint: BodyJoint) -> JointId {
        let id = self.joints.insert({
            joint.id = JointId::null();
            joint
        });
        if let Some(joint) = self.joints.get_mut(id) {
            joint.id = id;
        }
        id
    }

    pub fn remove_joint(&mut self, id: JointId) -> Option<BodyJoint> {
        self.joints.remove(id)
    }

    pub fn joint(&self, id: JointId) -> Option<&BodyJoint> {
        self.joints.get(id)
    }

    pub fn joint_mut(&mut self, id: JointId) -> Option<&mut BodyJoint> {
        self.joints.get_mut(id)
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Whether a joint connects the two bodies, in either order.
    pub fn are_bodies_joined(&self, a: BodyId, b: BodyId) -> bool {
        self.joints.iter().any(|joint| joint.connects(a, b))
    }

    // OBSERVERS

    pub fn set_collision_observer(&mut self, observer: Box<dyn CollisionObserver>) {
        self.observer = Some(observer);
    }

    pub fn take_collision_observer(&mut self) -> Option<Box<dyn CollisionObserver>> {
        self.observer.take()
    }

    /// Contacts resolved during the last update.
    pub fn collision_list(&self) -> &[CollisionInfo] {
        &self.collision_list
    }

    // QUERIES

    /// The closest point mass in the world to a given point.
    pub fn closest_point_mass(&self, point: Vec2) -> Option<(BodyId, usize, f32)> {
        let mut best: Option<(BodyId, usize, f32)> = None;

        for (id, body) in self.bodies.iter_with_ids() {
            if let Some((index, distance)) = body.closest_point_mass(point) {
                if best.map(|(_, _, d)| distance < d).unwrap_or(true) {
                    best = Some((id, index, distance));
                }
            }
        }

        best
    }

    /// The closest point on any body's perimeter to a given point.
    pub fn closest_point(&self, point: Vec2) -> Option<(BodyId, Vec2)> {
        let mut best: Option<(BodyId, Vec2, f32)> = None;

        for (id, body) in self.bodies.iter_with_ids() {
            if let Some(closest) = body.closest_point(point) {
                if best.map(|(_, _, d)| closest.distance < d).unwrap_or(true) {
                    best = Some((id, closest.point, closest.distance));
                }
            }
        }

        best.map(|(id, hit, _)| (id, hit))
    }

    /// The first body containing the given point. A zero bitmask matches
    /// every body.
    pub fn body_under_point(&self, point: Vec2, bitmask: u64) -> Option<BodyId> {
        self.bodies.iter_with_ids().find_map(|(id, body)| {
            ((bitmask == 0 || body.bitmask & bitmask != 0) && body.contains(point)).then_some(id)
        })
    }

    /// All bodies containing the given point.
    pub fn bodies_under_point(&self, point: Vec2, bitmask: u64) -> Vec<BodyId> {
        self.bodies
            .iter_with_ids()
            .filter(|(_, body)| {
                (bitmask == 0 || body.bitmask & bitmask != 0) && body.contains(point)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// All bodies whose perimeter crosses the given segment.
    pub fn bodies_intersecting_line(
        &mut self,
        start: Vec2,
        end: Vec2,
        bitmask: u64,
    ) -> Vec<BodyId> {
        let grid = self.grid;
        let mut results = Vec::new();

        for body in self.bodies.iter_mut() {
            body.refresh_bitmasks(&grid);
            if (bitmask == 0 || body.bitmask & bitmask != 0) && body.intersects_line(start, end) {
                results.push(body.id);
            }
        }

        results
    }

    /// All bodies overlapping a closed shape placed at `world_position`.
    pub fn bodies_intersecting_shape(
        &mut self,
        shape: &ClosedShape,
        world_position: Vec2,
    ) -> Vec<BodyId> {
        if shape.len() < 2 {
            return Vec::new();
        }

        let query_points = shape.transformed(world_position, 0.0, Vec2::ONE);
        let shape_aabb = Aabb::of_points(&query_points);
        let (shape_x, shape_y) = self.grid.masks_for(&shape_aabb);

        let grid = self.grid;
        let mut results = Vec::new();

        for body in self.bodies.iter_mut() {
            body.refresh_bitmasks(&grid);

            if shape_x & body.bitmask_x == 0 || shape_y & body.bitmask_y == 0 {
                continue;
            }
            if !shape_aabb.intersects(&body.aabb) {
                continue;
            }

            let mut last = query_points[query_points.len() - 1];
            for &point in &query_points {
                if body.intersects_line(last, point) {
                    results.push(body.id);
                    break;
                }
                last = point;
            }
        }

        results
    }

    /// Casts a ray and returns the closest hit point and body, if any.
    ///
    /// Bodies for which `ignore` returns true are skipped entirely.
    pub fn ray_cast(
        &mut self,
        start: Vec2,
        end: Vec2,
        bitmask: u64,
        ignore: Option<&dyn Fn(BodyId) -> bool>,
    ) -> Option<(Vec2, BodyId)> {
        let grid = self.grid;
        let mut ray_aabb = Aabb::of_segment(start, end);
        let (mut ray_x, mut ray_y) = grid.masks_for(&ray_aabb);
        let mut result: Option<(Vec2, BodyId)> = None;

        for body in self.bodies.iter_mut() {
            if bitmask != 0 && body.bitmask & bitmask == 0 {
                continue;
            }

            body.refresh_bitmasks(&grid);

            if ray_x & body.bitmask_x == 0 || ray_y & body.bitmask_y == 0 {
                continue;
            }
            if !body.aabb.intersects(&ray_aabb) {
                continue;
            }
            if ignore.map(|test| test(body.id)).unwrap_or(false) {
                continue;
            }

            let Some(hit) = body.raycast(start, end) else {
                continue;
            };

            result = Some((hit, body.id));

            // Shrink the search region to the hit found so far.
            ray_aabb = Aabb::of_segment(start, hit);
            (ray_x, ray_y) = grid.masks_for(&ray_aabb);
        }

        result
    }

    // SIMULATION

    /// Steps the simulation forward by `elapsed` seconds.
    pub fn update(&mut self, elapsed: f32) {
        let _timer = ScopedTimer::new("world::update");
        let started = Instant::now();

        for body in self.bodies.iter_mut() {
            body.update_aabb(elapsed, true);
        }

        let mut jobs = self.build_islands();
        self.resolve_islands(&mut jobs, elapsed);
        self.write_back(jobs);

        warn_if_frame_budget_exceeded(started.elapsed(), FRAME_BUDGET_MS);
    }

    /// Groups bodies into islands of possible interaction.
    ///
    /// Two bodies land in the same island when their AABBs overlap or a
    /// joint connects them. Static bodies join every island that touches
    /// them but never merge islands, since no motion can flow through them.
    fn build_islands(&self) -> Vec<IslandJob> {
        let _timer = ScopedTimer::new("islands::build");

        let tree = {
            let _timer = ScopedTimer::new("broadphase::build");
            let mut tree = QuadTree::new(self.world_limits);
            for (id, body) in self.bodies.iter_with_ids() {
                tree.insert(body.aabb, id);
            }
            tree
        };

        let mut jobs = Vec::new();
        let mut visited: HashSet<BodyId> = HashSet::new();
        let mut used_joints: HashSet<JointId> = HashSet::new();

        for seed in self.bodies.ids() {
            if visited.contains(&seed) {
                continue;
            }
            if self.bodies.get(seed).map(|body| body.is_static) != Some(false) {
                continue;
            }

            let mut island: Vec<BodyId> = Vec::new();
            let mut stack = vec![seed];
            let mut candidates = Vec::new();

            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                let Some(body) = self.bodies.get(current) else {
                    continue;
                };
                island.push(current);

                if body.is_static {
                    continue;
                }

                for joint in self.joints.iter() {
                    if joint.link_a.body == current {
                        stack.push(joint.link_b.body);
                    } else if joint.link_b.body == current {
                        stack.push(joint.link_a.body);
                    }
                }

                candidates.clear();
                tree.query(&body.aabb, &mut candidates);
                for &candidate in &candidates {
                    if !visited.contains(&candidate) {
                        stack.push(candidate);
                    }
                }
            }

            let mut job = IslandJob::new();
            for &id in &island {
                if let Some(body) = self.bodies.get(id) {
                    job.push_body(id, body.clone());
                }
            }
            for (joint_id, joint) in self.joints.iter_with_ids() {
                if used_joints.contains(&joint_id) {
                    continue;
                }
                if job.id_map.contains_key(&joint.link_a.body)
                    && job.id_map.contains_key(&joint.link_b.body)
                {
                    used_joints.insert(joint_id);
                    job.push_joint(joint_id, joint.clone());
                }
            }

            // Statics can appear in several islands.
            for &id in &island {
                if self.bodies.get(id).map(|body| body.is_static) == Some(true) {
                    visited.remove(&id);
                }
            }

            jobs.push(job);
        }

        jobs
    }

    fn resolve_islands(&mut self, jobs: &mut [IslandJob], elapsed: f32) {
        let grid = self.grid;
        let threshold = self.penetration_threshold;
        let relaxing = self.relaxing;
        let materials = &self.material_pairs;

        #[cfg(feature = "parallel")]
        if self.parallel_enabled && jobs.len() > 1 {
            let _timer = ScopedTimer::new("islands::resolve_parallel");
            jobs.par_iter_mut().for_each(|job| {
                job.resolve(elapsed, materials, &grid, threshold, relaxing);
            });
            return;
        }

        let _timer = ScopedTimer::new("islands::resolve");
        for job in jobs.iter_mut() {
            job.resolve(elapsed, materials, &grid, threshold, relaxing);
        }
    }

    /// Writes resolved island state back into the arenas and delivers
    /// observer notifications.
    fn write_back(&mut self, jobs: Vec<IslandJob>) {
        self.collision_list.clear();
        let mut detected = Vec::new();
        let mut deep = Vec::new();

        for job in jobs {
            for (id, body) in job.ids.iter().zip(job.bodies) {
                if let Some(slot) = self.bodies.get_mut(*id) {
                    *slot = body;
                }
            }
            for (joint_id, joint) in job.joint_ids.iter().zip(job.joints) {
                if let Some(slot) = self.joints.get_mut(*joint_id) {
                    *slot = joint;
                }
            }

            detected.extend_from_slice(&job.collisions);
            self.collision_list.extend_from_slice(&job.resolved_collisions);
            deep.extend_from_slice(&job.deep_collisions);
        }

        // Observer callbacks run serially, outside any island work. The
        // observer sees every detected contact, including ones a filter or
        // the penetration threshold later discarded.
        if !self.relaxing {
            if let Some(mut observer) = self.observer.take() {
                observer.bodies_did_collide(&detected);
                for info in &deep {
                    observer.collision_exceeded_threshold(info, info.penetration);
                }
                self.observer = Some(observer);
            }
        }
    }

    // RELAXATION

    /// Settles every body toward a rest configuration, then zeroes all
    /// velocities.
    ///
    /// Springs do not accumulate plastic deformation while relaxing.
    pub fn relax_world(&mut self, timestep: f32, iterations: usize) {
        self.relaxing = true;
        for _ in 0..iterations {
            self.update(timestep);
        }
        self.relaxing = false;

        for body in self.bodies.iter_mut() {
            for pm in &mut body.point_masses {
                pm.velocity = Vec2::ZERO;
            }
        }
    }

    /// Relaxes only the given bodies, resolving just the joints fully
    /// contained in the set.
    pub fn relax_bodies(&mut self, ids: &[BodyId], timestep: f32, iterations: usize) {
        let mut job = IslandJob::new();
        for &id in ids {
            if let Some(body) = self.bodies.get(id) {
                job.push_body(id, body.clone());
            }
        }
        for (joint_id, joint) in self.joints.iter_with_ids() {
            if job.id_map.contains_key(&joint.link_a.body)
                && job.id_map.contains_key(&joint.link_b.body)
            {
                job.push_joint(joint_id, joint.clone());
            }
        }

        let grid = self.grid;
        let threshold = self.penetration_threshold;
        for _ in 0..iterations {
            job.resolve(timestep, &self.material_pairs, &grid, threshold, true);
        }

        for (id, mut body) in job.ids.iter().zip(job.bodies) {
            for pm in &mut body.point_masses {
                pm.velocity = Vec2::ZERO;
            }
            if let Some(slot) = self.bodies.get_mut(*id) {
                *slot = body;
            }
        }
        for (joint_id, joint) in job.joint_ids.iter().zip(job.joints) {
            if let Some(slot) = self.joints.get_mut(*joint_id) {
                *slot = joint;
            }
        }
    }
}
