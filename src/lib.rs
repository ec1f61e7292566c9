//! soft2d – Soft-body physics engine for Rust.
//!
//! Simulates deformable 2D bodies made of point masses joined along a
//! closed polygon. Springs, internal gas pressure and bend constraints give
//! bodies their structure; a grid-bitmask broad phase, point-versus-edge
//! narrow phase and impulse response handle contact; joints link bodies
//! together. Worlds step in independent islands, optionally in parallel.
//!
//! ```
//! use glam::Vec2;
//! use soft2d::{Body, ClosedShape, ComponentCreator, World};
//!
//! let mut world = World::new();
//!
//! let mut ball = Body::new(
//!     ClosedShape::circle(1.0, 12),
//!     Vec2::new(0.0, 5.0),
//!     0.0,
//!     Vec2::ONE,
//!     1.0,
//! );
//! ball.add_component(&ComponentCreator::shape_matched_springs(200.0, 10.0));
//! ball.add_component(&ComponentCreator::gravity(Vec2::new(0.0, -9.8)));
//! let ball = world.add_body(ball);
//!
//! for _ in 0..60 {
//!     world.update(1.0 / 60.0);
//! }
//!
//! let body = world.body(ball).unwrap();
//! assert!(body.derived_position.y < 5.0);
//! ```

pub mod collision;
pub mod components;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod joints;
pub mod utils;
pub mod world;

pub use glam::Vec2;

pub use crate::collision::{Bitmask, CollisionInfo, CollisionObserver, GridMask, QuadTree};
pub use crate::components::{
    BendComponent, BodyComponent, ComponentCreator, GravityComponent, PressureComponent,
    SpringComponent,
};
pub use crate::core::{
    Aabb, Body, BodyEdge, ClosedShape, ClosestEdge, ClosestPoint, CollisionFilter, MaterialPair,
    PointMass,
};
pub use crate::dynamics::{
    calculate_plasticity, calculate_spring_force, InternalSpring, IslandJob, RestDistance,
    SpringPlasticity,
};
pub use crate::joints::{BodyJoint, JointKind, JointLink, LinkKind};
pub use crate::utils::{Arena, BodyId, Handle, JointId};
pub use crate::world::World;
