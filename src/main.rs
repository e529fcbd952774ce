// Headless driver for the navigation core
// Plays a scripted sequence of pointer events through the same input path a
// windowed host would use, and logs the agent as it walks.
//
// Usage: tile_walker [config.ron]
// RUST_LOG=tile_walker=debug shows planner and scene events.

use glam::{IVec2, Vec2};
use log::info;
use tile_walker::engine::{InputState, NavConfig, Scene};

// ============================================================================
// SCRIPT
// ============================================================================

const DEFAULT_CONFIG_PATH: &str = "assets/nav_config.ron";
const VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);
const TICK: f32 = 1.0 / 60.0;
/// Upper bound on ticks spent on one order.
const MAX_TICKS_PER_ORDER: usize = 60 * 30;

/// Grid cells to click, in order.
const CLICK_CELLS: &[IVec2] = &[
    IVec2::new(15, 10),
    IVec2::new(15, 16),
    IVec2::new(3, 16),
    IVec2::new(3, 3),
    IVec2::new(10, 10),
];

// ============================================================================
// MAIN
// ============================================================================

fn main() {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = NavConfig::load_or_default(&path);

    let mut scene = Scene::new(config, VIEWPORT);
    let mut input = InputState::new(VIEWPORT);
    println!(
        "Scene: {}x{} grid, {} obstacles, tile size {:.1}",
        scene.obstacles().grid_size(),
        scene.obstacles().grid_size(),
        scene.obstacles().len(),
        scene.projection().tile_size
    );

    for (i, &cell) in CLICK_CELLS.iter().enumerate() {
        // Screen position of the cell's tile under the current camera.
        let screen = scene
            .camera()
            .world_to_screen(scene.projection().grid_to_projected(cell));
        input.pointer_moved(screen);
        input.pointer_pressed();
        scene.apply_input(&input);
        input.end_frame();

        let mut ticks = 0;
        while scene.tick(TICK) && ticks < MAX_TICKS_PER_ORDER {
            ticks += 1;
        }

        let cell_now = scene.agent_cell().unwrap_or_default();
        let facing = scene.agent_facing().unwrap_or_default();
        info!("order {} finished after {} ticks", i + 1, ticks);
        println!(
            "Click {} on {} -> agent at {} facing {:.0}° ({:.2}s)",
            i + 1,
            cell,
            cell_now,
            facing.to_degrees(),
            ticks as f32 * TICK
        );
    }

    // Shrink the window enough to force a new obstacle layout.
    input.resized_to(VIEWPORT * 0.5);
    scene.apply_input(&input);
    input.end_frame();
    println!(
        "Resized to {}: {} obstacles, tile size {:.1}",
        VIEWPORT * 0.5,
        scene.obstacles().len(),
        scene.projection().tile_size
    );
}
