use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Rest length of a spring, either exact or a slack range.
///
/// A ranged rest distance exerts no force while the current length stays
/// inside the range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RestDistance {
    Fixed(f32),
    Ranged { min: f32, max: f32 },
}

impl RestDistance {
    pub fn min(&self) -> f32 {
        match *self {
            RestDistance::Fixed(value) => value,
            RestDistance::Ranged { min, .. } => min,
        }
    }

    pub fn max(&self) -> f32 {
        match *self {
            RestDistance::Fixed(value) => value,
            RestDistance::Ranged { max, .. } => max,
        }
    }

    pub fn set_min(&mut self, value: f32) {
        match self {
            RestDistance::Fixed(fixed) => *fixed = value,
            RestDistance::Ranged { min, .. } => *min = value,
        }
    }

    pub fn set_max(&mut self, value: f32) {
        match self {
            RestDistance::Fixed(fixed) => *fixed = value,
            RestDistance::Ranged { max, .. } => *max = value,
        }
    }

    /// Whether a length requires no correction.
    pub fn in_range(&self, distance: f32) -> bool {
        match *self {
            RestDistance::Fixed(value) => value == distance,
            RestDistance::Ranged { min, max } => (min..=max).contains(&distance),
        }
    }

    /// Clamps a length into the rest range.
    pub fn clamp(&self, distance: f32) -> f32 {
        match *self {
            RestDistance::Fixed(value) => value,
            RestDistance::Ranged { min, max } => distance.clamp(min, max),
        }
    }
}

impl From<f32> for RestDistance {
    fn from(value: f32) -> Self {
        RestDistance::Fixed(value)
    }
}

/// Parameters for permanent spring deformation.
///
/// When a spring is stretched or compressed past its yield point, its rest
/// distance creeps toward the current length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringPlasticity {
    /// Fraction of the rest distance the spring tolerates before yielding.
    pub yield_ratio: f32,
    /// Fraction of the excess deformation absorbed per update.
    pub rate: f32,
    /// Maximum factor the rest distance may drift from its initial value.
    pub limit: f32,
}

impl Default for SpringPlasticity {
    fn default() -> Self {
        Self {
            yield_ratio: 0.3,
            rate: 0.5,
            limit: 2.0,
        }
    }
}

/// A spring connecting two point masses of the same body, by index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InternalSpring {
    pub point_mass_a: usize,
    pub point_mass_b: usize,
    pub rest_distance: RestDistance,
    pub initial_rest_distance: RestDistance,
    pub coefficient: f32,
    pub damping: f32,
    pub plasticity: Option<SpringPlasticity>,
}

impl InternalSpring {
    pub fn new(
        point_mass_a: usize,
        point_mass_b: usize,
        rest_distance: RestDistance,
        coefficient: f32,
        damping: f32,
    ) -> Self {
        Self {
            point_mass_a,
            point_mass_b,
            rest_distance,
            initial_rest_distance: rest_distance,
            coefficient,
            damping,
            plasticity: None,
        }
    }
}

/// Damped Hooke force exerted on the endpoint at `pos_a`.
///
/// Degenerate springs with near-coincident endpoints produce no force since
/// no direction can be derived for them.
pub fn calculate_spring_force(
    pos_a: Vec2,
    vel_a: Vec2,
    pos_b: Vec2,
    vel_b: Vec2,
    rest_distance: f32,
    coefficient: f32,
    damping: f32,
) -> Vec2 {
    let distance = pos_a.distance(pos_b);
    if distance <= 0.000_000_5 {
        return Vec2::ZERO;
    }

    let b_to_a = (pos_a - pos_b) / distance;
    let stretch = rest_distance - distance;
    let relative_dot = (vel_a - vel_b).dot(b_to_a);

    b_to_a * (stretch * coefficient - relative_dot * damping)
}

/// Applies plastic deformation to a rest distance.
///
/// Returns the updated rest distance given the current spring length, the
/// spring's original rest distance and its plasticity parameters.
pub fn calculate_plasticity(
    distance: f32,
    rest_distance: RestDistance,
    initial: RestDistance,
    plasticity: SpringPlasticity,
) -> RestDistance {
    if rest_distance.in_range(distance) {
        return rest_distance;
    }

    let mut out = rest_distance;

    if distance > rest_distance.max() {
        let yield_distance = plasticity.yield_ratio * rest_distance.max();
        if distance > rest_distance.max() + yield_distance {
            let new_max =
                out.max() + plasticity.rate * (distance - out.max() - yield_distance);
            out.set_max(new_max.min(initial.max() * plasticity.limit));
        }
    } else if distance < rest_distance.min() {
        let yield_distance = plasticity.yield_ratio * rest_distance.min();
        if distance < rest_distance.min() - yield_distance {
            let new_min =
                out.min() - plasticity.rate * (out.min() - yield_distance - distance);
            out.set_min(new_min.max(initial.min() / plasticity.limit));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn spring_at_rest_exerts_no_force() {
        let force = calculate_spring_force(
            Vec2::new(2.0, 0.0),
            Vec2::ZERO,
            Vec2::ZERO,
            Vec2::ZERO,
            2.0,
            100.0,
            5.0,
        );
        assert_relative_eq!(force.x, 0.0);
        assert_relative_eq!(force.y, 0.0);
    }

    #[test]
    fn stretched_spring_pulls_endpoints_together() {
        let force = calculate_spring_force(
            Vec2::new(3.0, 0.0),
            Vec2::ZERO,
            Vec2::ZERO,
            Vec2::ZERO,
            2.0,
            100.0,
            0.0,
        );
        // Endpoint A sits beyond the rest distance along +X, so the force
        // points back toward B.
        assert!(force.x < 0.0);
        assert_relative_eq!(force.x, -100.0);
    }

    #[test]
    fn coincident_endpoints_produce_no_force() {
        let force = calculate_spring_force(
            Vec2::ONE,
            Vec2::new(5.0, 0.0),
            Vec2::ONE,
            Vec2::ZERO,
            1.0,
            100.0,
            5.0,
        );
        assert_eq!(force, Vec2::ZERO);
    }

    #[test]
    fn plasticity_stretches_rest_distance_past_yield() {
        let plasticity = SpringPlasticity {
            yield_ratio: 0.1,
            rate: 0.5,
            limit: 2.0,
        };
        let rest = RestDistance::Fixed(1.0);

        // Within yield tolerance, nothing changes.
        let same = calculate_plasticity(1.05, rest, rest, plasticity);
        assert_eq!(same, rest);

        // Past it, the rest distance creeps toward the current length.
        let stretched = calculate_plasticity(2.0, rest, rest, plasticity);
        assert!(stretched.max() > 1.0);
        assert!(stretched.max() <= 2.0);
    }

    #[test]
    fn plasticity_respects_the_deformation_limit() {
        let plasticity = SpringPlasticity {
            yield_ratio: 0.0,
            rate: 1.0,
            limit: 2.0,
        };
        let rest = RestDistance::Fixed(1.0);

        let stretched = calculate_plasticity(100.0, rest, rest, plasticity);
        assert_relative_eq!(stretched.max(), 2.0);

        let squashed = calculate_plasticity(0.0001, rest, rest, plasticity);
        assert_relative_eq!(squashed.min(), 0.5);
    }

    #[test]
    fn ranged_rest_distance_is_slack_inside_the_range() {
        let rest = RestDistance::Ranged { min: 1.0, max: 2.0 };

        assert!(rest.in_range(1.5));
        assert!(!rest.in_range(2.5));
        assert_relative_eq!(rest.clamp(2.5), 2.0);
        assert_relative_eq!(rest.clamp(0.5), 1.0);
    }
}
