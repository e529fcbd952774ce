// Obstacle field: the sparse set of blocked cells on the map.
//
// Generated once per map size. The walkability mask (navigation.rs) is
// derived from it and must be rebuilt whenever the field is replaced.

use std::collections::HashSet;

use bevy_ecs::prelude::*;
use glam::IVec2;
use log::{debug, info};
use rand::Rng;

/// Attempt budget multiplier for reject-and-retry sampling.
const ATTEMPTS_PER_OBSTACLE: usize = 10;

#[derive(Resource, Debug, Clone, Default)]
pub struct ObstacleField {
    blocked: HashSet<IVec2>,
    grid_size: i32,
}

impl ObstacleField {
    /// Field with no obstacles.
    pub fn empty(grid_size: i32) -> Self {
        Self {
            blocked: HashSet::new(),
            grid_size,
        }
    }

    /// Field from an explicit cell list. Out-of-bounds cells are dropped.
    pub fn from_cells(grid_size: i32, cells: impl IntoIterator<Item = IVec2>) -> Self {
        let blocked = cells
            .into_iter()
            .filter(|c| in_bounds(*c, grid_size))
            .collect();
        Self { blocked, grid_size }
    }

    /// Random field with roughly `density * grid_size²` obstacles.
    ///
    /// Cells within `exclusion_radius` (Chebyshev) of `spawn` stay free.
    /// If the attempt budget runs out first the field simply holds fewer
    /// obstacles.
    pub fn generate<R: Rng + ?Sized>(
        grid_size: i32,
        density: f32,
        spawn: IVec2,
        exclusion_radius: i32,
        rng: &mut R,
    ) -> Self {
        let mut field = Self::empty(grid_size);
        if grid_size <= 0 {
            return field;
        }

        let total = (grid_size as usize) * (grid_size as usize);
        let target = ((density.clamp(0.0, 1.0) * total as f32).floor() as usize).min(total);
        let budget = target * ATTEMPTS_PER_OBSTACLE;

        let mut attempts = 0;
        while field.blocked.len() < target && attempts < budget {
            attempts += 1;
            let cell = IVec2::new(rng.gen_range(0..grid_size), rng.gen_range(0..grid_size));
            if field.blocked.contains(&cell) || chebyshev(cell, spawn) <= exclusion_radius {
                continue;
            }
            field.blocked.insert(cell);
        }

        if field.blocked.len() < target {
            debug!(
                "obstacle budget exhausted after {} attempts: placed {}/{}",
                attempts,
                field.blocked.len(),
                target
            );
        }
        info!(
            "generated {} obstacles on a {}x{} grid (spawn {}, exclusion {})",
            field.blocked.len(),
            grid_size,
            grid_size,
            spawn,
            exclusion_radius
        );
        field
    }

    pub fn is_blocked(&self, cell: IVec2) -> bool {
        self.blocked.contains(&cell)
    }

    pub fn in_bounds(&self, cell: IVec2) -> bool {
        in_bounds(cell, self.grid_size)
    }

    pub fn grid_size(&self) -> i32 {
        self.grid_size
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    /// Blocked cells in row-major order, so mask construction and rendering
    /// see a stable sequence regardless of hash order.
    pub fn iter(&self) -> impl Iterator<Item = IVec2> + '_ {
        let mut cells: Vec<IVec2> = self.blocked.iter().copied().collect();
        cells.sort_by_key(|c| (c.y, c.x));
        cells.into_iter()
    }
}

/// Chebyshev (king-move) distance between two cells.
pub fn chebyshev(a: IVec2, b: IVec2) -> i32 {
    let d = (a - b).abs();
    d.x.max(d.y)
}

fn in_bounds(cell: IVec2, grid_size: i32) -> bool {
    cell.x >= 0 && cell.y >= 0 && cell.x < grid_size && cell.y < grid_size
}
