//! End-to-end navigation checks through the Scene API and the planner.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{IVec2, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tile_walker::engine::{
    find_path, DiagonalMovement, NavConfig, ObstacleField, ProjectionMode, Scene, WalkabilityMask,
};

const VIEWPORT: Vec2 = Vec2::new(1200.0, 960.0);
const DT: f32 = 1.0 / 60.0;

fn scene_with(blocked: &[(i32, i32)], mode: ProjectionMode) -> Scene {
    build_scene(blocked, mode, NavConfig::default().obstacles.height_in_tiles)
}

/// Zero-height obstacles, so a raised block never covers the tile behind it.
fn flat_scene_with(blocked: &[(i32, i32)]) -> Scene {
    build_scene(blocked, ProjectionMode::Isometric, 0.0)
}

fn build_scene(blocked: &[(i32, i32)], mode: ProjectionMode, height_in_tiles: f32) -> Scene {
    let mut config = NavConfig::default();
    config.grid.projection = mode;
    config.obstacles.seed = Some(3);
    config.obstacles.height_in_tiles = height_in_tiles;
    let field = ObstacleField::from_cells(20, blocked.iter().map(|&(x, y)| IVec2::new(x, y)));
    Scene::with_obstacles(config, VIEWPORT, field)
}

fn screen_of(scene: &Scene, cell: IVec2) -> Vec2 {
    scene
        .camera()
        .world_to_screen(scene.projection().grid_to_projected(cell))
}

fn run_until_idle(scene: &mut Scene) {
    let mut ticks = 1;
    while scene.tick(DT) {
        ticks += 1;
        assert!(ticks < 10_000, "agent never arrived");
    }
}

fn is_canonical(angle: f32) -> bool {
    [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2]
        .iter()
        .any(|c| (angle - c).abs() < 1e-5)
}

fn path_is_valid(mask: &WalkabilityMask, start: IVec2, path: &[IVec2]) -> bool {
    let mut prev = start;
    for &cell in path {
        let d = (cell - prev).abs();
        if d.max_element() != 1 || !mask.is_walkable(cell) {
            return false;
        }
        if d.x == 1 && d.y == 1 {
            let flank_a = mask.is_walkable(IVec2::new(cell.x, prev.y));
            let flank_b = mask.is_walkable(IVec2::new(prev.x, cell.y));
            if !flank_a && !flank_b {
                return false;
            }
        }
        prev = cell;
    }
    true
}

/// Cells reachable from `start` with 8-connected, no-corner-cutting steps.
fn reachable(mask: &WalkabilityMask, start: IVec2) -> Vec<IVec2> {
    let mut seen = vec![start];
    let mut frontier = vec![start];
    while let Some(cell) = frontier.pop() {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let nb = cell + IVec2::new(dx, dy);
                if nb == cell || !mask.is_walkable(nb) || seen.contains(&nb) {
                    continue;
                }
                if dx != 0 && dy != 0
                    && !(mask.is_walkable(IVec2::new(nb.x, cell.y)) && mask.is_walkable(IVec2::new(cell.x, nb.y)))
                {
                    continue;
                }
                seen.push(nb);
                frontier.push(nb);
            }
        }
    }
    seen
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn scenario_a_straight_walk_on_open_grid() {
    let mask = WalkabilityMask::new_open(20, 20);
    let path = find_path(&mask, IVec2::new(10, 10), IVec2::new(15, 10), DiagonalMovement::default());
    assert_eq!(path.len(), 5);
    assert!(path.iter().all(|c| c.y == 10));

    let mut scene = scene_with(&[], ProjectionMode::Isometric);
    let order = scene.click(screen_of(&scene, IVec2::new(15, 10))).unwrap();
    assert_eq!(order.goal, IVec2::new(15, 10));
    assert_eq!(scene.agent().unwrap().remaining_path().len(), 5);
    run_until_idle(&mut scene);
    assert_eq!(scene.agent_cell(), Some(IVec2::new(15, 10)));
}

#[test]
fn scenario_b_detour_around_single_obstacle() {
    let field = ObstacleField::from_cells(20, [IVec2::new(11, 10)]);
    let mask = WalkabilityMask::from_obstacles(&field);
    let start = IVec2::new(10, 10);
    let path = find_path(&mask, start, IVec2::new(12, 10), DiagonalMovement::default());
    assert!(path.len() >= 3, "{path:?}");
    assert!(path.contains(&IVec2::new(11, 9)) || path.contains(&IVec2::new(11, 11)));
    assert!(path_is_valid(&mask, start, &path));
    assert_eq!(path.last(), Some(&IVec2::new(12, 10)));
}

#[test]
fn scenario_c_click_on_obstacle_walks_to_nearest_side() {
    let mut scene = scene_with(&[(13, 10)], ProjectionMode::Isometric);
    let order = scene.click(screen_of(&scene, IVec2::new(13, 10))).unwrap();
    // West side (12,10) is closest to the agent at (10,10).
    assert_eq!(order.goal, IVec2::new(12, 10));
    assert_eq!(order.facing_target, Some(IVec2::new(13, 10)));

    let obstacle_pos = scene.projection().grid_to_projected(IVec2::new(13, 10));
    assert_eq!(scene.agent().unwrap().final_facing_target(), Some(obstacle_pos));

    run_until_idle(&mut scene);
    assert_eq!(scene.agent_cell(), Some(IVec2::new(12, 10)));
    let facing = scene.agent_facing().unwrap();
    assert!(is_canonical(facing), "facing {facing}");
}

#[test]
fn scenario_c_top_down_faces_the_obstacle() {
    let mut scene = scene_with(&[(10, 13)], ProjectionMode::TopDown);
    let order = scene.click(screen_of(&scene, IVec2::new(10, 13))).unwrap();
    assert_eq!(order.goal, IVec2::new(10, 12));
    run_until_idle(&mut scene);
    // Obstacle is straight "down" the screen: +y.
    assert!((scene.agent_facing().unwrap() - FRAC_PI_2).abs() < 1e-5);
}

#[test]
fn walled_in_nearest_side_falls_back_to_next_reachable_side() {
    // West side (12,10) of the obstacle is walkable but sealed off.
    let walls = [(11, 9), (11, 10), (11, 11), (12, 9), (12, 11)];
    let mut blocked = walls.to_vec();
    blocked.push((13, 10));
    let mut scene = scene_with(&blocked, ProjectionMode::Isometric);

    let order = scene.click(screen_of(&scene, IVec2::new(13, 10))).unwrap();
    assert_eq!(order.goal, IVec2::new(13, 9));
    assert_eq!(order.facing_target, Some(IVec2::new(13, 10)));
    assert!(scene.agent().unwrap().is_moving());

    run_until_idle(&mut scene);
    assert_eq!(scene.agent_cell(), Some(IVec2::new(13, 9)));
    assert!(is_canonical(scene.agent_facing().unwrap()));
}

#[test]
fn scenario_d_enclosed_cell_is_a_no_op() {
    // (15,15) is walkable but ringed by obstacles on all eight sides.
    let ring: Vec<_> = (-1..=1)
        .flat_map(|dy| (-1..=1).map(move |dx| (15 + dx, 15 + dy)))
        .filter(|&c| c != (15, 15))
        .collect();
    let mut scene = flat_scene_with(&ring);
    let before = scene.agent_position().unwrap();

    assert!(scene.click(screen_of(&scene, IVec2::new(15, 15))).is_none());
    assert!(!scene.tick(DT));
    assert_eq!(scene.agent_position().unwrap(), before);
}

#[test]
fn clicking_fully_enclosed_obstacle_is_ignored() {
    let mut scene = flat_scene_with(&[(4, 4), (4, 3), (5, 4), (4, 5), (3, 4)]);
    let before = scene.agent_position().unwrap();
    assert!(scene.click(screen_of(&scene, IVec2::new(4, 4))).is_none());
    assert!(!scene.tick(DT));
    assert_eq!(scene.agent_position().unwrap(), before);
}

#[test]
fn click_outside_the_map_clamps_to_edge() {
    let mut scene = scene_with(&[], ProjectionMode::TopDown);
    let order = scene.click(screen_of(&scene, IVec2::new(10, 45))).unwrap();
    assert_eq!(order.goal, IVec2::new(10, 19));
}

#[test]
fn new_click_mid_walk_replans_from_current_cell() {
    let mut scene = scene_with(&[], ProjectionMode::Isometric);
    scene.click(screen_of(&scene, IVec2::new(16, 10))).unwrap();
    for _ in 0..20 {
        scene.tick(DT);
    }
    scene.click(screen_of(&scene, IVec2::new(10, 4))).unwrap();
    run_until_idle(&mut scene);
    assert_eq!(scene.agent_cell(), Some(IVec2::new(10, 4)));
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn paths_on_random_fields_are_valid_and_complete() {
    for seed in 0..60 {
        let mut rng = StdRng::seed_from_u64(seed);
        let spawn = IVec2::new(rng.gen_range(0..20), rng.gen_range(0..20));
        let field = ObstacleField::generate(20, 0.3, spawn, 1, &mut rng);
        let mask = WalkabilityMask::from_obstacles(&field);
        let reach = reachable(&mask, spawn);

        for _ in 0..10 {
            let goal = IVec2::new(rng.gen_range(0..20), rng.gen_range(0..20));
            let path = find_path(&mask, spawn, goal, DiagonalMovement::default());
            if goal == spawn || !reach.contains(&goal) {
                assert!(path.is_empty(), "seed {seed}: {spawn} -> {goal} should have no path");
            } else {
                assert_eq!(path.last(), Some(&goal), "seed {seed}");
                assert!(path_is_valid(&mask, spawn, &path), "seed {seed}: {path:?}");
            }
        }
    }
}

#[test]
fn obstacle_exclusion_holds_across_sizes() {
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let size = rng.gen_range(5..40);
        let spawn = IVec2::new(rng.gen_range(0..size), rng.gen_range(0..size));
        let radius = rng.gen_range(0..4);
        let field = ObstacleField::generate(size, 0.4, spawn, radius, &mut rng);
        for cell in field.iter() {
            assert!((cell - spawn).abs().max_element() > radius);
        }
    }
}

#[test]
fn arrival_within_expected_ticks_and_facing_is_canonical() {
    for (goal, mode) in [
        (IVec2::new(15, 10), ProjectionMode::Isometric),
        (IVec2::new(4, 17), ProjectionMode::Isometric),
        (IVec2::new(18, 2), ProjectionMode::TopDown),
    ] {
        let mut scene = scene_with(&[(12, 12), (12, 11), (7, 13)], mode);
        scene.click(screen_of(&scene, goal)).unwrap();

        let agent = scene.agent().unwrap();
        let mut length = 0.0;
        let mut prev = agent.position;
        for wp in agent.remaining_path() {
            length += prev.distance(wp.position);
            prev = wp.position;
        }
        let final_pos = prev;
        let speed = scene.config().motion.speed * scene.projection().step_length();
        let budget = (length / (speed * DT)).ceil() as usize;

        let mut moving = true;
        for _ in 0..budget {
            moving = scene.tick(DT);
        }
        assert!(!moving, "{mode:?} {goal}: still moving after {budget} ticks");
        let eps = scene.config().motion.arrival_epsilon;
        assert!(scene.agent_position().unwrap().distance(final_pos) <= eps);
        assert!(is_canonical(scene.agent_facing().unwrap()));
    }
}
