use std::fmt;
use std::sync::Arc;

use crate::collision::CollisionInfo;
use crate::config::{DEFAULT_ELASTICITY, DEFAULT_FRICTION};

/// Optional per-pair collision veto. Called with the contact and the relative
/// velocity along the normal; returning false discards the contact before any
/// response is applied.
pub type CollisionFilter = Arc<dyn Fn(&CollisionInfo, f32) -> bool + Send + Sync>;

/// Collision response parameters for one ordered pair of materials.
///
/// The world keeps a symmetric matrix of these, one entry per material pair.
#[derive(Clone)]
pub struct MaterialPair {
    /// Whether bodies of these materials collide at all.
    pub collide: bool,
    pub friction: f32,
    pub elasticity: f32,
    pub filter: Option<CollisionFilter>,
}

impl Default for MaterialPair {
    fn default() -> Self {
        Self {
            collide: true,
            friction: DEFAULT_FRICTION,
            elasticity: DEFAULT_ELASTICITY,
            filter: None,
        }
    }
}

impl MaterialPair {
    /// Applies the filter, accepting the contact when none is set.
    pub fn accepts(&self, info: &CollisionInfo, relative_dot: f32) -> bool {
        match &self.filter {
            Some(filter) => filter(info, relative_dot),
            None => true,
        }
    }
}

impl fmt::Debug for MaterialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialPair")
            .field("collide", &self.collide)
            .field("friction", &self.friction)
            .field("elasticity", &self.elasticity)
            .field("filter", &self.filter.as_ref().map(|_| "fn"))
            .finish()
    }
}
