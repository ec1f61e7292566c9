use glam::Vec2;

use crate::config::{QUAD_TREE_MAX_DEPTH, QUAD_TREE_MAX_ITEMS};
use crate::core::Aabb;

/// Loose quadtree over AABBs, used to find island neighbors.
///
/// Items that straddle a subdivision boundary stay on the inner node that
/// first received them, so queries always walk every intersecting node.
#[derive(Debug, Clone)]
pub struct QuadTree<T> {
    bounds: Aabb,
    depth: usize,
    storage: Vec<(Aabb, T)>,
    children: Option<Box<[QuadTree<T>; 4]>>,
}

impl<T> QuadTree<T> {
    pub fn new(bounds: Aabb) -> Self {
        Self::with_depth(bounds, 0)
    }

    fn with_depth(bounds: Aabb, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            storage: Vec::new(),
            children: None,
        }
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Inserts an item keyed by its bounds.
    ///
    /// Returns false if the item does not intersect this node at all.
    pub fn insert(&mut self, bounds: Aabb, item: T) -> bool {
        if !self.bounds.intersects(&bounds) {
            return false;
        }

        if self.children.is_none()
            && (self.storage.len() < QUAD_TREE_MAX_ITEMS || self.depth >= QUAD_TREE_MAX_DEPTH)
        {
            self.storage.push((bounds, item));
            return true;
        }

        if self.children.is_none() {
            self.subdivide();
        }

        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                if child.bounds.contains_aabb(&bounds) {
                    return child.insert(bounds, item);
                }
            }
        }

        // Straddles a boundary; keep it here.
        self.storage.push((bounds, item));
        true
    }

    fn subdivide(&mut self) {
        let min = self.bounds.min();
        let max = self.bounds.max();
        let mid = Vec2::new(self.bounds.mid_x(), self.bounds.mid_y());
        let depth = self.depth + 1;

        self.children = Some(Box::new([
            QuadTree::with_depth(Aabb::new(min, mid), depth),
            QuadTree::with_depth(
                Aabb::new(Vec2::new(mid.x, min.y), Vec2::new(max.x, mid.y)),
                depth,
            ),
            QuadTree::with_depth(
                Aabb::new(Vec2::new(min.x, mid.y), Vec2::new(mid.x, max.y)),
                depth,
            ),
            QuadTree::with_depth(Aabb::new(mid, max), depth),
        ]));
    }

    /// Collects every item whose bounds intersect the query box.
    pub fn query(&self, bounds: &Aabb, out: &mut Vec<T>)
    where
        T: Clone,
    {
        if !self.bounds.intersects(bounds) {
            return;
        }

        for (item_bounds, item) in &self.storage {
            if item_bounds.intersects(bounds) {
                out.push(item.clone());
            }
        }

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(bounds, out);
            }
        }
    }

    /// Removes the first item equal to `item`, then collapses child nodes
    /// whose combined contents fit back into this node.
    pub fn remove(&mut self, item: &T) -> bool
    where
        T: PartialEq,
    {
        let mut removed = false;
        if let Some(index) = self.storage.iter().position(|(_, stored)| stored == item) {
            self.storage.remove(index);
            removed = true;
        } else if let Some(children) = &mut self.children {
            removed = children.iter_mut().any(|child| child.remove(item));
        }

        if removed {
            self.try_flatten();
        }
        removed
    }

    fn try_flatten(&mut self) {
        let Some(children) = &mut self.children else {
            return;
        };

        let leaf_children = children.iter().all(|child| child.children.is_none());
        let total: usize = children.iter().map(|child| child.storage.len()).sum();
        if !leaf_children || self.storage.len() + total >= QUAD_TREE_MAX_ITEMS {
            return;
        }

        for child in children.iter_mut() {
            self.storage.append(&mut child.storage);
        }
        self.children = None;
    }

    pub fn clear(&mut self) {
        self.storage.clear();
        self.children = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_bounds() -> Aabb {
        Aabb::new(Vec2::splat(-10.0), Vec2::splat(10.0))
    }

    fn unit_box_at(center: Vec2) -> Aabb {
        Aabb::new(center - Vec2::splat(0.5), center + Vec2::splat(0.5))
    }

    #[test]
    fn query_finds_only_intersecting_items() {
        let mut tree = QuadTree::new(world_bounds());
        for i in 0..8 {
            let center = Vec2::new(-8.0 + i as f32 * 2.0, 5.0);
            assert!(tree.insert(unit_box_at(center), i));
        }

        let mut found = Vec::new();
        tree.query(&unit_box_at(Vec2::new(-8.0, 5.0)), &mut found);
        assert_eq!(found, vec![0]);

        found.clear();
        tree.query(&unit_box_at(Vec2::new(0.0, -5.0)), &mut found);
        assert!(found.is_empty());
    }

    #[test]
    fn items_outside_bounds_are_rejected() {
        let mut tree = QuadTree::new(world_bounds());
        assert!(!tree.insert(unit_box_at(Vec2::new(100.0, 100.0)), 0));
    }

    #[test]
    fn boundary_straddling_items_still_show_in_queries() {
        let mut tree = QuadTree::new(world_bounds());
        // Force a subdivision with items in one quadrant.
        for i in 0..4 {
            tree.insert(unit_box_at(Vec2::new(5.0, 5.0 - i as f32)), i);
        }
        // An item crossing the center belongs to no single child.
        tree.insert(unit_box_at(Vec2::ZERO), 99);

        let mut found = Vec::new();
        tree.query(&unit_box_at(Vec2::new(0.2, 0.2)), &mut found);
        assert!(found.contains(&99));
    }

    #[test]
    fn remove_collapses_empty_children() {
        let mut tree = QuadTree::new(world_bounds());
        for i in 0..6 {
            tree.insert(unit_box_at(Vec2::new(-5.0, -5.0 + i as f32)), i);
        }
        for i in 0..6 {
            assert!(tree.remove(&i));
        }
        assert!(tree.children.is_none());

        let mut found: Vec<i32> = Vec::new();
        tree.query(&world_bounds(), &mut found);
        assert!(found.is_empty());
    }
}
