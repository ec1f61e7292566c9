//! Utility helpers: generational allocation, logging, and geometry primitives.

pub mod allocator;
pub mod geometry;
pub mod logging;

pub use allocator::{Arena, BodyId, Handle, JointId};
