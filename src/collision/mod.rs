//! Broad and narrow phase collision detection.

mod bitmask;
mod contact;
mod narrowphase;
mod quadtree;

pub use bitmask::{Bitmask, GridMask};
pub use contact::{CollisionInfo, CollisionObserver};
pub use narrowphase::body_collide;
pub use quadtree::QuadTree;
