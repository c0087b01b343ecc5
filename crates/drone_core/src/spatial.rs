//! Spatial queries over drone bodies and static obstacles.
//!
//! [`SpatialIndex`] is a sparse uniform grid rebuilt from a snapshot of drone
//! positions whenever the simulation needs fresh neighbor data. It owns no
//! entities: callers push plain [`Neighbor`] records in and read copies back.

use std::collections::HashMap;

use crate::components::{DroneId, Obstacle};
use crate::math::Vec2;

/// A snapshot of another body, as seen by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Owning drone.
    pub owner: DroneId,
    /// Position at snapshot time.
    pub position: Vec2,
    /// Velocity at snapshot time.
    pub velocity: Vec2,
}

/// Read-only spatial query surface.
pub trait SpatialQuery {
    /// All bodies strictly closer than `radius` to `position` that pass
    /// `filter`, ordered by owner id.
    fn query_neighbors(
        &self,
        position: Vec2,
        radius: f32,
        filter: &dyn Fn(&Neighbor) -> bool,
    ) -> Vec<Neighbor>;

    /// Whether a circle at `position` touches any static obstacle.
    fn overlaps_obstacle(&self, position: Vec2, radius: f32) -> bool;
}

/// Sparse hash grid over drone bodies plus a flat obstacle list.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
    bodies: Vec<Neighbor>,
    obstacles: Vec<Obstacle>,
}

impl SpatialIndex {
    /// Create an empty index. `cell_size` should be close to the most common
    /// query radius.
    #[must_use]
    pub fn new(cell_size: f32, obstacles: Vec<Obstacle>) -> Self {
        Self {
            cell_size: cell_size.max(0.1),
            cells: HashMap::new(),
            bodies: Vec::new(),
            obstacles,
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Replace every body with a fresh snapshot.
    pub fn rebuild(&mut self, bodies: impl IntoIterator<Item = Neighbor>) {
        self.cells.clear();
        self.bodies.clear();
        for body in bodies {
            let idx = self.bodies.len();
            let coord = self.cell_coord(body.position);
            self.cells.entry(coord).or_default().push(idx);
            self.bodies.push(body);
        }
    }

    /// Number of indexed bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the index holds no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl SpatialQuery for SpatialIndex {
    fn query_neighbors(
        &self,
        position: Vec2,
        radius: f32,
        filter: &dyn Fn(&Neighbor) -> bool,
    ) -> Vec<Neighbor> {
        if radius <= 0.0 || self.bodies.is_empty() {
            return Vec::new();
        }

        let radius_sq = radius * radius;
        let (min_x, min_y) = self.cell_coord(position - Vec2::splat(radius));
        let (max_x, max_y) = self.cell_coord(position + Vec2::splat(radius));

        let mut found: Vec<Neighbor> = Vec::new();
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                let Some(cell) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for &idx in cell {
                    let body = &self.bodies[idx];
                    if body.position.distance_squared(position) < radius_sq && filter(body) {
                        found.push(*body);
                    }
                }
            }
        }

        // Cell iteration order depends on coordinates; sort for stable output
        found.sort_unstable_by_key(|n| n.owner);
        found
    }

    fn overlaps_obstacle(&self, position: Vec2, radius: f32) -> bool {
        self.obstacles.iter().any(|o| o.overlaps(position, radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(id: u32, x: f32, y: f32) -> Neighbor {
        Neighbor {
            owner: DroneId(id),
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
        }
    }

    #[test]
    fn test_query_radius_is_strict() {
        let mut index = SpatialIndex::new(2.0, Vec::new());
        index.rebuild([body(1, 0.0, 0.0), body(2, 1.9, 0.0), body(3, 2.0, 0.0)]);

        let hits = index.query_neighbors(Vec2::ZERO, 2.0, &|_| true);
        let ids: Vec<u32> = hits.iter().map(|n| n.owner.0).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_query_spans_cells_and_negative_coords() {
        let mut index = SpatialIndex::new(1.0, Vec::new());
        index.rebuild([
            body(1, -0.5, -0.5),
            body(2, 0.5, 0.5),
            body(3, -2.4, 0.0),
            body(4, 10.0, 10.0),
        ]);

        let hits = index.query_neighbors(Vec2::ZERO, 2.5, &|_| true);
        let ids: Vec<u32> = hits.iter().map(|n| n.owner.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_query_filter_excludes_self() {
        let mut index = SpatialIndex::new(2.0, Vec::new());
        index.rebuild([body(1, 0.0, 0.0), body(2, 0.5, 0.0)]);

        let me = DroneId(1);
        let hits = index.query_neighbors(Vec2::ZERO, 2.0, &|n| n.owner != me);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].owner, DroneId(2));
    }

    #[test]
    fn test_rebuild_replaces_snapshot() {
        let mut index = SpatialIndex::new(2.0, Vec::new());
        index.rebuild([body(1, 0.0, 0.0)]);
        index.rebuild([body(2, 50.0, 50.0)]);
        assert_eq!(index.len(), 1);
        assert!(index.query_neighbors(Vec2::ZERO, 5.0, &|_| true).is_empty());
    }

    #[test]
    fn test_obstacle_overlap_query() {
        let index = SpatialIndex::new(
            2.0,
            vec![Obstacle {
                center: Vec2::new(3.0, 0.0),
                radius: 1.0,
            }],
        );
        assert!(index.overlaps_obstacle(Vec2::new(2.0, 0.0), 0.5));
        assert!(!index.overlaps_obstacle(Vec2::new(0.0, 0.0), 0.5));
        assert!(index.is_empty());
    }
}
