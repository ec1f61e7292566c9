use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::WORLD_GRID_SUBDIVISIONS;
use crate::core::Aabb;

/// 64-bit occupancy mask, one bit per world grid column or row.
pub type Bitmask = u64;

/// Sets the bit at `index`, saturating at the first bit for index zero.
#[inline]
fn set_bit_on(mask: &mut Bitmask, index: u32) {
    *mask |= 1u64.checked_shl(index.saturating_sub(1)).unwrap_or(0);
}

/// Maps body AABBs onto a fixed 64x64 grid covering the world limits.
///
/// Each body gets one mask per axis; two bodies can only touch when both
/// their X and Y masks share a bit, which makes the pairwise broad phase a
/// couple of AND instructions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridMask {
    min: Vec2,
    inv_grid_step: Vec2,
}

impl GridMask {
    pub fn new(limit_min: Vec2, limit_max: Vec2) -> Self {
        let size = limit_max - limit_min;
        Self {
            min: limit_min,
            inv_grid_step: Vec2::new(
                WORLD_GRID_SUBDIVISIONS as f32 / size.x,
                WORLD_GRID_SUBDIVISIONS as f32 / size.y,
            ),
        }
    }

    /// Computes the per-axis masks for an AABB.
    ///
    /// NaN coordinates produce empty masks, dropping the body from the
    /// broad phase instead of poisoning it.
    pub fn masks_for(&self, aabb: &Aabb) -> (Bitmask, Bitmask) {
        if !aabb.is_valid() {
            return (0, 0);
        }

        let min = aabb.min();
        let max = aabb.max();
        if min.is_nan() || max.is_nan() {
            return (0, 0);
        }

        let grid_min = ((min - self.min) * self.inv_grid_step)
            .clamp(Vec2::ZERO, Vec2::splat(WORLD_GRID_SUBDIVISIONS as f32));
        let grid_max = ((max - self.min) * self.inv_grid_step)
            .clamp(Vec2::ZERO, Vec2::splat(WORLD_GRID_SUBDIVISIONS as f32));

        (
            Self::axis_mask(grid_min.x as u32, grid_max.x as u32),
            Self::axis_mask(grid_min.y as u32, grid_max.y as u32),
        )
    }

    /// Contiguous run of set bits from `min_cell` to `max_cell`.
    fn axis_mask(min_cell: u32, max_cell: u32) -> Bitmask {
        let min_shift = u64::MAX
            .checked_shr(WORLD_GRID_SUBDIVISIONS.saturating_sub(max_cell))
            .unwrap_or(0);
        let max_shift = u64::MAX.checked_shl(min_cell).unwrap_or(0);

        let mut mask = min_shift & max_shift;
        set_bit_on(&mut mask, min_cell);
        set_bit_on(&mut mask, max_cell);
        mask
    }
}

impl Default for GridMask {
    fn default() -> Self {
        use crate::config::DEFAULT_WORLD_HALF_EXTENT;
        Self::new(
            Vec2::splat(-DEFAULT_WORLD_HALF_EXTENT),
            Vec2::splat(DEFAULT_WORLD_HALF_EXTENT),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_boxes_share_bits() {
        let grid = GridMask::default();
        let a = Aabb::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0));
        let b = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));

        let (ax, ay) = grid.masks_for(&a);
        let (bx, by) = grid.masks_for(&b);
        assert!(ax & bx != 0);
        assert!(ay & by != 0);
    }

    #[test]
    fn distant_boxes_share_no_bits() {
        let grid = GridMask::default();
        let a = Aabb::new(Vec2::new(-19.0, -19.0), Vec2::new(-15.0, -15.0));
        let b = Aabb::new(Vec2::new(15.0, 15.0), Vec2::new(19.0, 19.0));

        let (ax, ay) = grid.masks_for(&a);
        let (bx, by) = grid.masks_for(&b);
        assert_eq!(ax & bx, 0);
        assert_eq!(ay & by, 0);
    }

    #[test]
    fn boxes_outside_limits_clamp_to_the_border() {
        let grid = GridMask::default();
        let outside = Aabb::new(Vec2::new(100.0, 100.0), Vec2::new(110.0, 110.0));

        let (x, y) = grid.masks_for(&outside);
        assert!(x != 0);
        assert!(y != 0);
    }

    #[test]
    fn nan_boxes_produce_empty_masks() {
        let grid = GridMask::default();
        let bad = Aabb::new(Vec2::new(f32::NAN, 0.0), Vec2::new(1.0, 1.0));

        assert_eq!(grid.masks_for(&bad), (0, 0));
    }
}
