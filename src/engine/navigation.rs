// Grid pathfinding for click-to-move navigation.
//
// Layer 1: WalkabilityMask: static walkability per tile, derived from the
//          obstacle field and rebuilt only when that field changes.
// Layer 2: find_path: 8-directional A* with an octile heuristic and
//          configurable corner-cutting rules.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::*;
use glam::IVec2;
use log::debug;
use serde::{Deserialize, Serialize};

use super::obstacles::ObstacleField;

const SQRT_2: f32 = std::f32::consts::SQRT_2;

// ============================================================================
// WALKABILITY MASK
// ============================================================================

/// Static tile walkability. Rebuilt when the obstacle field is regenerated.
#[derive(Resource, Debug, Clone)]
pub struct WalkabilityMask {
    /// True if the agent can stand on this cell. Row-major.
    pub walkable: Vec<bool>,
    pub width: i32,
    pub height: i32,
}

impl WalkabilityMask {
    /// Fully open grid, all cells walkable.
    pub fn new_open(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            walkable: vec![true; (width * height) as usize],
            width,
            height,
        }
    }

    /// Square mask with every obstacle cell marked unwalkable.
    pub fn from_obstacles(field: &ObstacleField) -> Self {
        let size = field.grid_size();
        let mut mask = Self::new_open(size, size);
        for cell in field.iter() {
            if let Some(i) = mask.idx(cell) {
                mask.walkable[i] = false;
            }
        }
        debug!(
            "rebuilt {}x{} walkability mask ({} blocked)",
            size,
            size,
            field.len()
        );
        mask
    }

    #[inline]
    fn idx(&self, cell: IVec2) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }

    pub fn in_bounds(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Out-of-bounds cells are never walkable.
    pub fn is_walkable(&self, cell: IVec2) -> bool {
        self.idx(cell).is_some_and(|i| self.walkable[i])
    }

    pub fn clamp(&self, cell: IVec2) -> IVec2 {
        cell.clamp(
            IVec2::ZERO,
            IVec2::new(self.width - 1, self.height - 1).max(IVec2::ZERO),
        )
    }
}

// ============================================================================
// A* SEARCH
// ============================================================================

/// When a diagonal step is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiagonalMovement {
    /// Orthogonal steps only.
    Never,
    /// Refuse the diagonal only when both flanking orthogonal cells are blocked.
    IfAtMostOneObstacle,
    /// Refuse the diagonal when either flanking orthogonal cell is blocked.
    #[default]
    OnlyWhenNoObstacles,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenNode {
    f: f32,
    /// Insertion counter. Equal-f entries pop in discovery order.
    seq: u32,
    index: usize,
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: invert so the smallest f (then the
        // earliest seq) comes out first.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Octile distance: the exact cost on an open 8-connected grid.
pub fn octile(a: IVec2, b: IVec2) -> f32 {
    let d = (a - b).abs();
    let (lo, hi) = (d.x.min(d.y) as f32, d.x.max(d.y) as f32);
    (hi - lo) + lo * SQRT_2
}

/// Shortest path from `start` to `goal`.
///
/// The result excludes `start` and ends with `goal`. An empty vector means
/// "no movement": start equals goal, the goal is not walkable, or the goal is
/// unreachable. The start cell itself is never tested for walkability.
pub fn find_path(
    mask: &WalkabilityMask,
    start: IVec2,
    goal: IVec2,
    diagonal: DiagonalMovement,
) -> Vec<IVec2> {
    if start == goal || !mask.in_bounds(start) || !mask.is_walkable(goal) {
        return Vec::new();
    }

    let size = mask.walkable.len();
    let mut g_score = vec![f32::INFINITY; size];
    let mut came_from: Vec<Option<usize>> = vec![None; size];
    let mut closed = vec![false; size];
    let mut open = BinaryHeap::new();
    let mut seq = 0u32;

    let (Some(start_idx), Some(goal_idx)) = (mask.idx(start), mask.idx(goal)) else {
        return Vec::new();
    };
    g_score[start_idx] = 0.0;
    open.push(OpenNode {
        f: octile(start, goal),
        seq,
        index: start_idx,
    });

    while let Some(OpenNode { index, .. }) = open.pop() {
        if closed[index] {
            continue;
        }
        if index == goal_idx {
            return reconstruct_path(mask, &came_from, goal_idx);
        }
        closed[index] = true;

        let pos = cell_at(mask, index);
        for nb in passable_neighbors(mask, pos, diagonal) {
            let Some(ni) = mask.idx(nb) else { continue };
            if closed[ni] {
                continue;
            }
            let step = if nb.x != pos.x && nb.y != pos.y { SQRT_2 } else { 1.0 };
            let tentative = g_score[index] + step;
            if tentative < g_score[ni] {
                g_score[ni] = tentative;
                came_from[ni] = Some(index);
                seq += 1;
                open.push(OpenNode {
                    f: tentative + octile(nb, goal),
                    seq,
                    index: ni,
                });
            }
        }
    }

    debug!("no path from {} to {}", start, goal);
    Vec::new()
}

fn cell_at(mask: &WalkabilityMask, index: usize) -> IVec2 {
    let i = index as i32;
    IVec2::new(i % mask.width, i / mask.width)
}

fn reconstruct_path(mask: &WalkabilityMask, came_from: &[Option<usize>], goal_idx: usize) -> Vec<IVec2> {
    let mut path = Vec::new();
    let mut current = goal_idx;
    // The start node is the only one without a parent and is dropped.
    while let Some(prev) = came_from[current] {
        path.push(cell_at(mask, current));
        current = prev;
    }
    path.reverse();
    path
}

// ============================================================================
// NEIGHBOR ITERATORS
// ============================================================================

/// The four cardinal (N/E/S/W) neighbors of a cell, clamped to bounds.
pub fn cardinal_neighbors(mask: &WalkabilityMask, pos: IVec2) -> impl Iterator<Item = IVec2> + '_ {
    [IVec2::NEG_Y, IVec2::X, IVec2::Y, IVec2::NEG_X]
        .into_iter()
        .map(move |d| pos + d)
        .filter(move |nb| mask.in_bounds(*nb))
}

/// Walkable neighbors reachable in one step under the diagonal rule.
/// Orthogonal neighbors come first, then diagonals.
fn passable_neighbors(
    mask: &WalkabilityMask,
    pos: IVec2,
    diagonal: DiagonalMovement,
) -> impl Iterator<Item = IVec2> + '_ {
    let orthogonal = cardinal_neighbors(mask, pos).filter(move |nb| mask.is_walkable(*nb));
    let diagonals = [
        IVec2::new(1, -1),
        IVec2::new(1, 1),
        IVec2::new(-1, 1),
        IVec2::new(-1, -1),
    ]
    .into_iter()
    .filter(move |d| {
        let nb = pos + *d;
        if !mask.is_walkable(nb) {
            return false;
        }
        let flank_x = mask.is_walkable(IVec2::new(pos.x + d.x, pos.y));
        let flank_y = mask.is_walkable(IVec2::new(pos.x, pos.y + d.y));
        match diagonal {
            DiagonalMovement::Never => false,
            DiagonalMovement::IfAtMostOneObstacle => flank_x || flank_y,
            DiagonalMovement::OnlyWhenNoObstacles => flank_x && flank_y,
        }
    })
    .map(move |d| pos + d);
    orthogonal.chain(diagonals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(size: i32, blocked: &[(i32, i32)]) -> WalkabilityMask {
        let field = ObstacleField::from_cells(size, blocked.iter().map(|&(x, y)| IVec2::new(x, y)));
        WalkabilityMask::from_obstacles(&field)
    }

    fn assert_valid(mask: &WalkabilityMask, start: IVec2, path: &[IVec2]) {
        let mut prev = start;
        for &cell in path {
            let d = (cell - prev).abs();
            assert!(d.x <= 1 && d.y <= 1 && d != IVec2::ZERO, "{prev} -> {cell}");
            assert!(mask.is_walkable(cell), "{cell} blocked");
            if d.x == 1 && d.y == 1 {
                assert!(
                    mask.is_walkable(IVec2::new(cell.x, prev.y)) || mask.is_walkable(IVec2::new(prev.x, cell.y)),
                    "corner cut {prev} -> {cell}"
                );
            }
            prev = cell;
        }
    }

    #[test]
    fn straight_line_on_open_grid() {
        let mask = WalkabilityMask::new_open(20, 20);
        let path = find_path(&mask, IVec2::new(10, 10), IVec2::new(15, 10), DiagonalMovement::default());
        assert_eq!(path.len(), 5);
        assert!(path.iter().all(|c| c.y == 10));
        assert_eq!(path.last(), Some(&IVec2::new(15, 10)));
    }

    #[test]
    fn start_equals_goal_is_empty() {
        let mask = WalkabilityMask::new_open(5, 5);
        assert!(find_path(&mask, IVec2::new(2, 2), IVec2::new(2, 2), DiagonalMovement::default()).is_empty());
    }

    #[test]
    fn blocked_goal_is_empty() {
        let mask = mask_with(5, &[(4, 4)]);
        assert!(find_path(&mask, IVec2::ZERO, IVec2::new(4, 4), DiagonalMovement::default()).is_empty());
    }

    #[test]
    fn strict_rule_refuses_diagonal_past_one_obstacle() {
        let mask = mask_with(5, &[(1, 0)]);
        let path = find_path(&mask, IVec2::new(0, 0), IVec2::new(1, 1), DiagonalMovement::OnlyWhenNoObstacles);
        assert_eq!(path, vec![IVec2::new(0, 1), IVec2::new(1, 1)]);

        let loose = find_path(&mask, IVec2::new(0, 0), IVec2::new(1, 1), DiagonalMovement::IfAtMostOneObstacle);
        assert_eq!(loose, vec![IVec2::new(1, 1)]);
    }

    #[test]
    fn no_diagonal_squeeze_between_two_obstacles() {
        // (1,0) and (0,1) wall off the corner; only the squeeze through (1,1) would connect.
        let mask = mask_with(3, &[(1, 0), (0, 1)]);
        for rule in [DiagonalMovement::OnlyWhenNoObstacles, DiagonalMovement::IfAtMostOneObstacle] {
            assert!(find_path(&mask, IVec2::ZERO, IVec2::new(2, 2), rule).is_empty());
        }
    }

    #[test]
    fn never_rule_is_manhattan() {
        let mask = WalkabilityMask::new_open(6, 6);
        let path = find_path(&mask, IVec2::ZERO, IVec2::new(3, 2), DiagonalMovement::Never);
        assert_eq!(path.len(), 5);
        assert_valid(&mask, IVec2::ZERO, &path);
        let mut prev = IVec2::ZERO;
        for c in &path {
            assert_eq!((*c - prev).abs().element_sum(), 1);
            prev = *c;
        }
    }

    #[test]
    fn detours_around_a_wall() {
        let blocked: Vec<_> = (0..9).map(|y| (5, y)).collect();
        let mask = mask_with(10, &blocked);
        let start = IVec2::new(2, 2);
        let path = find_path(&mask, start, IVec2::new(8, 2), DiagonalMovement::default());
        assert!(!path.is_empty());
        assert!(path.contains(&IVec2::new(5, 9)));
        assert_valid(&mask, start, &path);
    }

    #[test]
    fn ties_resolve_identically_across_runs() {
        let mask = mask_with(12, &[(5, 5), (6, 6), (4, 7)]);
        let first = find_path(&mask, IVec2::new(1, 1), IVec2::new(10, 9), DiagonalMovement::default());
        for _ in 0..10 {
            assert_eq!(find_path(&mask, IVec2::new(1, 1), IVec2::new(10, 9), DiagonalMovement::default()), first);
        }
    }

    #[test]
    fn octile_matches_open_grid_cost() {
        assert_eq!(octile(IVec2::ZERO, IVec2::new(3, 0)), 3.0);
        assert!((octile(IVec2::ZERO, IVec2::new(2, 3)) - (1.0 + 2.0 * SQRT_2)).abs() < 1e-6);
    }

    #[test]
    fn clamp_pulls_cells_into_bounds() {
        let mask = WalkabilityMask::new_open(4, 4);
        assert_eq!(mask.clamp(IVec2::new(-3, 9)), IVec2::new(0, 3));
    }
}
