// Scene: the single owner of all navigation state.
//
// The ECS World holds the agent entity and the shared resources (obstacle
// field, walkability mask, projection, camera, config). The obstacle field
// and mask only change through &mut Scene (regenerate / resize), so a path
// query can never observe a half-rebuilt mask.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use glam::{IVec2, Vec2};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::camera::FollowCamera;
use super::components::{FrameTime, Player};
use super::config::NavConfig;
use super::input::InputState;
use super::motion::{AgentState, MotionConfig, Waypoint, heading_angle, snap_to_canonical};
use super::navigation::{WalkabilityMask, find_path};
use super::obstacles::ObstacleField;
use super::picking::{Highlight, MoveOrder, highlight, plan_move, resolve_target};
use super::projection::{Projection, ProjectionMode};
use super::systems::{follow_camera_system, motion_system};

/// One tile as the renderer needs it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileView {
    pub cell: IVec2,
    pub blocked: bool,
    /// Tile centre in screen space (camera offset applied).
    pub screen: Vec2,
}

pub struct Scene {
    world: World,
    schedule: Schedule,
    agent: Entity,
    rng: StdRng,
}

impl Scene {
    /// Random obstacle field around the spawn cell.
    pub fn new(config: NavConfig, viewport: Vec2) -> Self {
        let mut rng = match config.obstacles.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let field = ObstacleField::generate(
            config.grid.grid_size,
            config.obstacles.density,
            spawn_cell(&config),
            config.obstacles.exclusion_radius,
            &mut rng,
        );
        Self::build(config, viewport, field, rng)
    }

    /// Fixed obstacle field. Later regenerations are random again.
    pub fn with_obstacles(config: NavConfig, viewport: Vec2, field: ObstacleField) -> Self {
        let rng = StdRng::seed_from_u64(config.obstacles.seed.unwrap_or_default());
        Self::build(config, viewport, field, rng)
    }

    fn build(config: NavConfig, viewport: Vec2, field: ObstacleField, rng: StdRng) -> Self {
        let projection = Projection::new(
            config.grid.projection,
            config.tile_size_for(viewport.x, viewport.y),
        );
        let mut motion = config.motion;
        motion.units_per_tile = projection.step_length();

        let spawn = spawn_cell(&config);
        let start = projection.grid_to_projected(spawn);
        let mut camera = FollowCamera::new(viewport);
        camera.update(start);

        let mut world = World::new();
        world.insert_resource(WalkabilityMask::from_obstacles(&field));
        world.insert_resource(field);
        world.insert_resource(projection);
        world.insert_resource(camera);
        world.insert_resource(motion);
        world.insert_resource(FrameTime::default());
        world.insert_resource(config);
        let agent = world.spawn((AgentState::new(spawn, start), Player)).id();

        let mut schedule = Schedule::default();
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        schedule.add_systems((motion_system, follow_camera_system).chain());

        info!("scene ready: agent at {} ({} tile size {:.1})", spawn, mode_name(&projection), projection.tile_size);
        Self {
            world,
            schedule,
            agent,
            rng,
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Handle a click at `screen`. Returns the move order when the agent
    /// starts moving (or turns in place toward a clicked obstacle).
    ///
    /// A clicked obstacle is approached from its nearest reachable side.
    /// The order also releases any hover look target, so the agent comes to
    /// rest on a canonical facing until the pointer moves again.
    pub fn click(&mut self, screen: Vec2) -> Option<MoveOrder> {
        let config = self.config().clone();
        let projection = *self.projection();
        let start = self.agent_cell()?;

        let target = resolve_target(
            screen,
            self.camera().offset(),
            &projection,
            self.obstacles(),
            config.obstacles.height_in_tiles * projection.tile_size,
        )?;

        let mut chosen = None;
        for order in plan_move(target, start, self.mask()) {
            if order.goal == start {
                chosen = Some((order, Vec::new()));
                break;
            }
            let cells = find_path(self.mask(), start, order.goal, config.diagonal_movement);
            if !cells.is_empty() {
                chosen = Some((order, cells));
                break;
            }
        }
        let Some((order, cells)) = chosen else {
            debug!("click on {:?}: nothing reachable from {}", target, start);
            return None;
        };

        let facing_point = order.facing_target.map(|c| projection.grid_to_projected(c));
        let motion = *self.world.resource::<MotionConfig>();
        let mut agent = self.world.get_mut::<AgentState>(self.agent)?;

        if cells.is_empty() {
            // Already beside the clicked obstacle: just turn toward it.
            let angle = facing_point
                .and_then(|p| heading_angle(p - agent.position, motion.facing_offset))?;
            agent.set_look_target(None);
            agent.target_facing = snap_to_canonical(angle);
            return Some(order);
        }

        let waypoints = cells
            .into_iter()
            .map(|cell| Waypoint {
                cell,
                position: projection.grid_to_projected(cell),
            })
            .collect::<Vec<_>>();
        info!("moving {} -> {} ({} steps)", start, order.goal, waypoints.len());
        agent.cell = start;
        agent.set_look_target(None);
        agent.set_path(waypoints, facing_point);
        Some(order)
    }

    /// Pointer hover: the idle agent turns toward the hovered tile.
    /// Returns the highlight for click feedback.
    pub fn hover(&mut self, screen: Option<Vec2>) -> Option<Highlight> {
        let projection = *self.projection();
        let height = self.config().obstacles.height_in_tiles * projection.tile_size;
        let target = screen.and_then(|s| {
            resolve_target(s, self.camera().offset(), &projection, self.obstacles(), height)
        });
        let look = target.map(|t| projection.grid_to_projected(t.cell()));
        let result = target.map(|t| highlight(t, self.mask()));

        if let Some(mut agent) = self.world.get_mut::<AgentState>(self.agent) {
            agent.set_look_target(look);
        }
        result
    }

    /// Advance the scene by `dt` seconds. Returns whether the agent is still
    /// moving.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.world.resource_mut::<FrameTime>().delta = dt.max(0.0);
        self.schedule.run(&mut self.world);
        self.agent().is_some_and(AgentState::is_moving)
    }

    /// Apply one frame of winit-derived input: resize, hover, then clicks.
    /// Hover is only re-evaluated on frames where the pointer changed.
    pub fn apply_input(&mut self, input: &InputState) {
        if let Some(size) = input.resize() {
            self.resize(size);
        }
        if input.pointer_changed() {
            self.hover(input.pointer_position);
        }
        for &click in input.clicks() {
            self.click(click);
        }
    }

    /// React to a new viewport size.
    ///
    /// A tile-size change above the configured threshold regenerates the
    /// obstacle field; smaller changes only re-project the agent and rebuild
    /// the mask from the existing field.
    pub fn resize(&mut self, viewport: Vec2) {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return;
        }
        let config = self.config().clone();
        let old = *self.projection();
        let new = Projection::new(old.mode, config.tile_size_for(viewport.x, viewport.y));
        let change = if old.tile_size > 0.0 {
            ((new.tile_size - old.tile_size) / old.tile_size).abs()
        } else {
            f32::INFINITY
        };

        self.world.insert_resource(new);
        self.world.resource_mut::<MotionConfig>().units_per_tile = new.step_length();
        self.world.resource_mut::<FollowCamera>().set_viewport(viewport);
        if let Some(mut agent) = self.world.get_mut::<AgentState>(self.agent) {
            agent.reproject(
                |p| new.fractional_to_projected(old.projected_to_grid(p)),
                |c| new.grid_to_projected(c),
            );
        }

        if change > config.regen_threshold {
            info!(
                "tile size {:.1} -> {:.1}: regenerating obstacles",
                old.tile_size, new.tile_size
            );
            self.regenerate();
        } else {
            let mask = WalkabilityMask::from_obstacles(self.obstacles());
            self.world.insert_resource(mask);
        }
        self.recenter();
    }

    /// New random obstacle field around the agent's current cell.
    /// Any in-flight path is dropped and the agent is settled on the tile
    /// under it.
    pub fn regenerate(&mut self) {
        let config = self.config().clone();
        let spawn = self.agent_cell().unwrap_or_else(|| spawn_cell(&config));
        let rest = self.projection().grid_to_projected(spawn);
        let field = ObstacleField::generate(
            config.grid.grid_size,
            config.obstacles.density,
            spawn,
            config.obstacles.exclusion_radius,
            &mut self.rng,
        );
        if let Some(mut agent) = self.world.get_mut::<AgentState>(self.agent) {
            agent.stop();
            agent.position = rest;
            agent.cell = spawn;
        }
        self.set_obstacles(field);
    }

    /// Replace the obstacle field and rebuild the mask with it.
    pub fn set_obstacles(&mut self, field: ObstacleField) {
        self.world.insert_resource(WalkabilityMask::from_obstacles(&field));
        self.world.insert_resource(field);
    }

    fn recenter(&mut self) {
        let Some(position) = self.agent().map(|a| a.position) else {
            return;
        };
        self.world.resource_mut::<FollowCamera>().update(position);
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn agent(&self) -> Option<&AgentState> {
        self.world.get::<AgentState>(self.agent)
    }

    /// Grid cell nearest the agent's current position.
    pub fn agent_cell(&self) -> Option<IVec2> {
        let agent = self.agent()?;
        let frac = self.projection().projected_to_grid(agent.position);
        Some(self.mask().clamp(frac.round().as_ivec2()))
    }

    pub fn agent_position(&self) -> Option<Vec2> {
        self.agent().map(|a| a.position)
    }

    pub fn agent_facing(&self) -> Option<f32> {
        self.agent().map(|a| a.facing)
    }

    pub fn camera(&self) -> &FollowCamera {
        self.world.resource::<FollowCamera>()
    }

    pub fn projection(&self) -> &Projection {
        self.world.resource::<Projection>()
    }

    pub fn obstacles(&self) -> &ObstacleField {
        self.world.resource::<ObstacleField>()
    }

    pub fn mask(&self) -> &WalkabilityMask {
        self.world.resource::<WalkabilityMask>()
    }

    pub fn config(&self) -> &NavConfig {
        self.world.resource::<NavConfig>()
    }

    /// Every tile in row-major order with its blocked flag and screen centre.
    pub fn tiles(&self) -> impl Iterator<Item = TileView> + '_ {
        let size = self.obstacles().grid_size();
        let projection = *self.projection();
        let offset = self.camera().offset();
        (0..size).flat_map(move |y| {
            (0..size).map(move |x| {
                let cell = IVec2::new(x, y);
                TileView {
                    cell,
                    blocked: self.obstacles().is_blocked(cell),
                    screen: projection.grid_to_projected(cell) + offset,
                }
            })
        })
    }
}

fn spawn_cell(config: &NavConfig) -> IVec2 {
    let max = (config.grid.grid_size - 1).max(0);
    config.spawn_cell().clamp(IVec2::ZERO, IVec2::splat(max))
}

fn mode_name(projection: &Projection) -> &'static str {
    match projection.mode {
        ProjectionMode::Isometric => "isometric",
        ProjectionMode::TopDown => "top-down",
    }
}
