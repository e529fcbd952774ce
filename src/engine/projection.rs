// Grid <-> projected-plane transforms.
//
// Projected space is the continuous 2D plane the agent moves on and the
// renderer draws into (before the camera offset). +X right, +Y down, matching
// screen coordinates.

use bevy_ecs::prelude::*;
use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Layout of the tile lattice on the projected plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionMode {
    /// Diamond tiles, 2:1 aspect.
    Isometric,
    /// Square tiles, axis aligned.
    TopDown,
}

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub mode: ProjectionMode,
    /// Isometric: half the diamond width. Top-down: square side length.
    pub tile_size: f32,
}

impl Projection {
    pub fn new(mode: ProjectionMode, tile_size: f32) -> Self {
        Self { mode, tile_size }
    }

    /// Tile centre of `cell` on the projected plane.
    pub fn grid_to_projected(&self, cell: IVec2) -> Vec2 {
        self.fractional_to_projected(cell.as_vec2())
    }

    pub fn fractional_to_projected(&self, g: Vec2) -> Vec2 {
        let t = self.tile_size;
        match self.mode {
            ProjectionMode::Isometric => Vec2::new((g.x - g.y) * t, (g.x + g.y) * t * 0.5),
            ProjectionMode::TopDown => g * t,
        }
    }

    /// Fractional grid coordinate of a projected point. Callers round or floor.
    pub fn projected_to_grid(&self, p: Vec2) -> Vec2 {
        let t = self.tile_size;
        if t.abs() <= f32::EPSILON {
            return Vec2::ZERO;
        }
        match self.mode {
            // px = (x - y) t, py = (x + y) t / 2
            //   => x - y = px / t, x + y = 2 py / t
            ProjectionMode::Isometric => {
                let diff = p.x / t;
                let sum = 2.0 * p.y / t;
                Vec2::new((sum + diff) * 0.5, (sum - diff) * 0.5)
            }
            ProjectionMode::TopDown => p / t,
        }
    }

    /// Half extents of one tile's footprint (half width, half height).
    pub fn tile_half_extents(&self) -> Vec2 {
        match self.mode {
            ProjectionMode::Isometric => Vec2::new(self.tile_size, self.tile_size * 0.5),
            ProjectionMode::TopDown => Vec2::splat(self.tile_size * 0.5),
        }
    }

    /// Projected length of one orthogonal grid step.
    pub fn step_length(&self) -> f32 {
        match self.mode {
            ProjectionMode::Isometric => self.tile_size * 1.25_f32.sqrt(),
            ProjectionMode::TopDown => self.tile_size,
        }
    }

    /// True if `p` lies on the footprint of the tile centred at `center`.
    pub fn tile_contains(&self, center: Vec2, p: Vec2) -> bool {
        let half = self.tile_half_extents();
        let d = (p - center).abs();
        match self.mode {
            ProjectionMode::Isometric => d.x / half.x + d.y / half.y <= 1.0,
            ProjectionMode::TopDown => d.x <= half.x && d.y <= half.y,
        }
    }

    /// Silhouette of a tile footprint extruded `height` units upward
    /// (screen -Y), as a convex polygon in clockwise screen order.
    ///
    /// The silhouette is the union of the base footprint, the top face and
    /// the side faces joining them.
    pub fn extruded_outline(&self, center: Vec2, height: f32) -> Vec<Vec2> {
        let half = self.tile_half_extents();
        let lift = Vec2::new(0.0, height.max(0.0));
        match self.mode {
            ProjectionMode::Isometric => vec![
                center + Vec2::new(0.0, -half.y) - lift,
                center + Vec2::new(half.x, 0.0) - lift,
                center + Vec2::new(half.x, 0.0),
                center + Vec2::new(0.0, half.y),
                center + Vec2::new(-half.x, 0.0),
                center + Vec2::new(-half.x, 0.0) - lift,
            ],
            ProjectionMode::TopDown => vec![
                center + Vec2::new(-half.x, -half.y) - lift,
                center + Vec2::new(half.x, -half.y) - lift,
                center + Vec2::new(half.x, half.y),
                center + Vec2::new(-half.x, half.y),
            ],
        }
    }

    /// Extruded-volume hit test for an obstacle standing on `center`.
    pub fn volume_contains(&self, center: Vec2, height: f32, p: Vec2) -> bool {
        convex_contains(&self.extruded_outline(center, height), p)
    }
}

/// Point-in-convex-polygon. Boundary points count as inside.
fn convex_contains(outline: &[Vec2], p: Vec2) -> bool {
    if outline.len() < 3 {
        return false;
    }
    let mut sign = 0.0_f32;
    for (i, &a) in outline.iter().enumerate() {
        let b = outline[(i + 1) % outline.len()];
        let cross = (b - a).perp_dot(p - a);
        if cross.abs() <= 1e-4 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}
