// Follow camera
//
// Camera model:
//   - The viewport is a screen-sized window onto the projected plane.
//   - Every tick the window is recentred on the agent by direct assignment.
//     No easing: the renderer draws the agent at the screen centre, so any lag
//     here would slide the tile layer out from under it.

use bevy_ecs::prelude::*;
use glam::Vec2;

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct FollowCamera {
    /// Screen size in pixels.
    /// Private: resizing goes through set_viewport(). Use viewport() to read.
    viewport: Vec2,

    /// Translation added to projected coordinates to get screen coordinates.
    offset: Vec2,
}

impl FollowCamera {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            viewport: viewport.max(Vec2::ZERO),
            offset: Vec2::ZERO,
        }
    }

    /// Recentre on `focus`. Call once per tick after motion has run.
    pub fn update(&mut self, focus: Vec2) {
        self.offset = recenter(focus, self.viewport);
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport.max(Vec2::ZERO);
    }

    pub fn viewport(&self) -> Vec2 { self.viewport }
    pub fn offset(&self) -> Vec2 { self.offset }

    /// Screen point → projected plane.
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        screen - self.offset
    }

    /// Projected plane → screen point.
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world + self.offset
    }
}

/// Offset that places `focus` at the centre of a `viewport`-sized screen.
pub fn recenter(focus: Vec2, viewport: Vec2) -> Vec2 {
    viewport * 0.5 - focus
}
