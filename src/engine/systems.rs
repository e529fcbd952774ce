// ECS systems run once per tick by the scene schedule
// Order matters: motion first, then the camera follows the moved agent

use bevy_ecs::prelude::*;

use super::camera::FollowCamera;
use super::components::{FrameTime, Player};
use super::motion::{AgentState, MotionConfig};

/// Advance every agent along its path and update its facing
pub fn motion_system(
    time: Res<FrameTime>,
    config: Res<MotionConfig>,
    mut query: Query<&mut AgentState>,
) {
    for mut agent in query.iter_mut() {
        agent.tick(time.delta, &config);
    }
}

/// Recentre the viewport on the player agent
pub fn follow_camera_system(
    mut camera: ResMut<FollowCamera>,
    query: Query<&AgentState, With<Player>>,
) {
    if let Ok(agent) = query.get_single() {
        camera.update(agent.position);
    }
}
