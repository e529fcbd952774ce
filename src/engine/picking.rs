// Click resolution: screen point → targeted cell or obstacle → move order.
//
// Hit testing runs in two passes. Obstacle volumes are tested first, front
// to back, because an extruded block is drawn over the tiles behind it. Then
// the four tiles around the inverse-projected point are tested against their
// footprints. If nothing contains the point the fractional coordinate is
// rounded and clamped onto the grid.

use glam::{IVec2, Vec2};
use log::debug;

use super::navigation::{cardinal_neighbors, WalkabilityMask};
use super::obstacles::ObstacleField;
use super::projection::{Projection, ProjectionMode};

/// What the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetResolution {
    Cell(IVec2),
    Obstacle(IVec2),
}

impl TargetResolution {
    pub fn cell(&self) -> IVec2 {
        match *self {
            TargetResolution::Cell(c) | TargetResolution::Obstacle(c) => c,
        }
    }
}

/// Where to path to, and what to face once there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOrder {
    pub goal: IVec2,
    /// Cell to face on arrival when it differs from the goal (an obstacle).
    pub facing_target: Option<IVec2>,
}

/// Click-feedback data for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub cell: IVec2,
    pub blocked: bool,
    pub walkable_neighbors: Vec<IVec2>,
}

/// Resolve a screen-space pointer position against the map.
///
/// `offset` is the camera translation (screen = projected + offset).
/// Returns None only for an empty grid.
pub fn resolve_target(
    screen: Vec2,
    offset: Vec2,
    projection: &Projection,
    field: &ObstacleField,
    obstacle_height: f32,
) -> Option<TargetResolution> {
    let size = field.grid_size();
    if size <= 0 {
        return None;
    }

    let world = screen - offset;
    let frac = projection.projected_to_grid(world);
    let base = frac.floor().as_ivec2();
    let candidates = [
        base,
        base + IVec2::X,
        base + IVec2::Y,
        base + IVec2::ONE,
    ];

    if let Some(hit) = volume_candidates(projection, base, obstacle_height)
        .into_iter()
        .filter(|c| field.is_blocked(*c))
        .find(|c| projection.volume_contains(projection.grid_to_projected(*c), obstacle_height, world))
    {
        return Some(TargetResolution::Obstacle(hit));
    }

    if let Some(hit) = candidates
        .into_iter()
        .filter(|c| field.in_bounds(*c) && !field.is_blocked(*c))
        .find(|c| projection.tile_contains(projection.grid_to_projected(*c), world))
    {
        return Some(TargetResolution::Cell(hit));
    }

    let fallback = frac
        .round()
        .as_ivec2()
        .clamp(IVec2::ZERO, IVec2::splat(size - 1));
    Some(classify(field, fallback))
}

fn classify(field: &ObstacleField, cell: IVec2) -> TargetResolution {
    if field.is_blocked(cell) {
        TargetResolution::Obstacle(cell)
    } else {
        TargetResolution::Cell(cell)
    }
}

/// Cells whose extruded volume can reach `base`'s neighbourhood on screen,
/// front-most first.
///
/// A volume rises toward screen -Y, so cells drawn lower on screen (further
/// "forward") can cover the point. One forward step moves a tile centre down
/// by `tile_size` in both layouts.
fn volume_candidates(projection: &Projection, base: IVec2, height: f32) -> Vec<IVec2> {
    let rise = if projection.tile_size > 0.0 {
        (height.max(0.0) / projection.tile_size).ceil() as i32
    } else {
        0
    };
    let forward = match projection.mode {
        ProjectionMode::Isometric => IVec2::ONE,
        ProjectionMode::TopDown => IVec2::Y,
    };

    let mut cells = Vec::new();
    for k in (0..=rise).rev() {
        let anchor = base + forward * k;
        for d in [IVec2::ONE, IVec2::Y, IVec2::X, IVec2::ZERO] {
            let c = anchor + d;
            if !cells.contains(&c) {
                cells.push(c);
            }
        }
    }
    cells.sort_by_key(|c| std::cmp::Reverse(depth(projection.mode, *c)));
    cells
}

/// Draw order key: larger is nearer the viewer.
fn depth(mode: ProjectionMode, cell: IVec2) -> i32 {
    match mode {
        ProjectionMode::Isometric => cell.x + cell.y,
        ProjectionMode::TopDown => cell.y,
    }
}

/// Turn a resolved target into candidate pathing goals, best first.
///
/// A walkable cell is its own single goal. An obstacle yields its walkable
/// orthogonal neighbours ordered by distance to `agent_cell` (ties keep
/// N, E, S, W order), each with the obstacle as the facing target. The
/// caller takes the first one it can reach. Empty when there is nothing
/// to walk to.
pub fn plan_move(
    target: TargetResolution,
    agent_cell: IVec2,
    mask: &WalkabilityMask,
) -> Vec<MoveOrder> {
    match target {
        TargetResolution::Cell(cell) => {
            if mask.is_walkable(cell) {
                vec![MoveOrder {
                    goal: cell,
                    facing_target: None,
                }]
            } else {
                Vec::new()
            }
        }
        TargetResolution::Obstacle(cell) => {
            let from = agent_cell.as_vec2();
            let mut sides: Vec<IVec2> = cardinal_neighbors(mask, cell)
                .filter(|nb| mask.is_walkable(*nb))
                .collect();
            // Stable sort keeps the neighbour order for equal distances.
            sides.sort_by(|a, b| {
                a.as_vec2()
                    .distance_squared(from)
                    .total_cmp(&b.as_vec2().distance_squared(from))
            });
            if sides.is_empty() {
                debug!("obstacle {} has no walkable side; click ignored", cell);
            }
            sides
                .into_iter()
                .map(|goal| MoveOrder {
                    goal,
                    facing_target: Some(cell),
                })
                .collect()
        }
    }
}

/// Highlight data for a resolved target: the cell and its walkable
/// orthogonal neighbours.
pub fn highlight(target: TargetResolution, mask: &WalkabilityMask) -> Highlight {
    let cell = target.cell();
    Highlight {
        cell,
        blocked: !mask.is_walkable(cell),
        walkable_neighbors: cardinal_neighbors(mask, cell)
            .filter(|nb| mask.is_walkable(*nb))
            .collect(),
    }
}
