//! Spring math and per-island solving.

pub mod island;
pub mod spring;

pub use island::IslandJob;
pub use spring::{
    calculate_plasticity, calculate_spring_force, InternalSpring, RestDistance, SpringPlasticity,
};
