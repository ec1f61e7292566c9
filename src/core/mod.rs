//! Core simulation types: bodies, point masses, shapes and bounds.

mod aabb;
mod body;
mod edge;
mod material;
mod point_mass;
mod shape;

pub use aabb::Aabb;
pub use body::{Body, ClosestEdge, ClosestPoint};
pub use edge::BodyEdge;
pub use material::{CollisionFilter, MaterialPair};
pub use point_mass::PointMass;
pub use shape::ClosedShape;
