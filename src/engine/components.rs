// Core ECS types shared by the scene and its systems

use bevy_ecs::prelude::*;

/// Marks the agent the camera follows and clicks steer.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// Seconds elapsed since the previous tick.
/// Written by the scene before each schedule run.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FrameTime {
    pub delta: f32,
}
