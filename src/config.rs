//! Global configuration constants for the soft2d engine.

/// Default gravity vector applied by gravity components (Y-up).
pub const DEFAULT_GRAVITY: [f32; 2] = [0.0, -9.8];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Default velocity damping applied to bodies.
/// Values closer to 0 decelerate faster, values closer to 1 decelerate slower.
pub const DEFAULT_VELOCITY_DAMPING: f32 = 0.999;

/// Contact depth beyond which a collision is reported and dropped instead of
/// resolved.
pub const DEFAULT_PENETRATION_THRESHOLD: f32 = 0.3;

/// Default friction used for newly created material pairs.
pub const DEFAULT_FRICTION: f32 = 0.3;

/// Default elasticity used for newly created material pairs.
pub const DEFAULT_ELASTICITY: f32 = 0.2;

/// Half-extent of the default world limits, centered on the origin.
pub const DEFAULT_WORLD_HALF_EXTENT: f32 = 20.0;

/// Number of cells per axis the world limits are divided into when
/// projecting AABBs into broad-phase grid bitmasks.
pub const WORLD_GRID_SUBDIVISIONS: u32 = 64;

/// Maximum number of items stored in a single quad-tree node before it
/// subdivides.
pub const QUAD_TREE_MAX_ITEMS: usize = 3;

/// Maximum quad-tree depth; nodes at this depth never subdivide further.
pub const QUAD_TREE_MAX_DEPTH: usize = 6;

/// Default spring constant for body edge springs.
pub const DEFAULT_EDGE_SPRING_K: f32 = 50.0;

/// Default spring damping for body edge springs.
pub const DEFAULT_EDGE_SPRING_DAMP: f32 = 2.0;

/// Default spring constant for shape matching.
pub const DEFAULT_SHAPE_SPRING_K: f32 = 200.0;

/// Default spring damping for shape matching.
pub const DEFAULT_SHAPE_SPRING_DAMP: f32 = 10.0;

/// Default stiffness coefficient for bend constraints.
pub const DEFAULT_BEND_STIFFNESS: f32 = 0.04;

/// Frame budget (in milliseconds) above which a world update logs a warning.
pub const FRAME_BUDGET_MS: f32 = 8.0;
