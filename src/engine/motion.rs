// Motion controller: constant-speed waypoint following plus the facing model.
//
// State machine per agent:
//   Idle:    no path; facing holds, or chases a passive look target (pointer).
//   Moving:  advancing through waypoints; facing chases the travel direction.
//   Arrived: back to Idle on path exhaustion, facing snapped to 0, π/2, π or 3π/2.
//
// Position and facing are updated independently: position is time based
// (speed * dt), facing uses a per-tick interpolation fraction.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use bevy_ecs::prelude::*;
use glam::{IVec2, Vec2};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Squared length below which a direction vector is treated as zero.
const MIN_DIR_LENGTH_SQ: f32 = 1e-8;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Travel speed in tiles per second.
    pub speed: f32,
    /// Projected-space length of one tile step. Set from the active projection.
    #[serde(skip, default = "unit_scale")]
    pub units_per_tile: f32,
    /// Distance below which a waypoint counts as reached (projected units).
    pub arrival_epsilon: f32,
    /// Interpolation fraction per tick while following a path.
    pub path_turn_rate: f32,
    /// Interpolation fraction per tick while idle-tracking a look target.
    pub track_turn_rate: f32,
    /// Angular gap (radians) below which facing snaps onto its target.
    pub snap_threshold: f32,
    /// Added to every computed heading. Aligns a model's rest pose with the view.
    pub facing_offset: f32,
}

fn unit_scale() -> f32 {
    1.0
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 4.0,
            units_per_tile: 1.0,
            arrival_epsilon: 0.5,
            path_turn_rate: 0.15,
            track_turn_rate: 0.4,
            snap_threshold: 0.01,
            facing_offset: 0.0,
        }
    }
}

impl MotionConfig {
    /// Speed in projected units per second.
    pub fn linear_speed(&self) -> f32 {
        self.speed * self.units_per_tile
    }
}

// ============================================================================
// AGENT STATE
// ============================================================================

/// A point on the agent's route: a tile centre and the cell it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub cell: IVec2,
    pub position: Vec2,
}

#[derive(Component, Debug, Clone)]
pub struct AgentState {
    /// Continuous position on the projected plane.
    pub position: Vec2,
    /// Last cell the agent stood on or passed through.
    pub cell: IVec2,
    /// Current facing angle in radians.
    pub facing: f32,
    /// Angle `facing` is interpolating toward.
    pub target_facing: f32,
    moving: bool,
    path: Vec<Waypoint>,
    path_index: usize,
    final_facing: Option<Vec2>,
    look_target: Option<Vec2>,
    last_heading: Vec2,
}

impl AgentState {
    pub fn new(cell: IVec2, position: Vec2) -> Self {
        Self {
            position,
            cell,
            facing: 0.0,
            target_facing: 0.0,
            moving: false,
            path: Vec::new(),
            path_index: 0,
            final_facing: None,
            look_target: None,
            last_heading: Vec2::ZERO,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Position of the waypoint currently being approached.
    pub fn target_position(&self) -> Option<Vec2> {
        self.path.get(self.path_index).map(|wp| wp.position)
    }

    /// Waypoints not yet reached, current one first.
    pub fn remaining_path(&self) -> &[Waypoint] {
        self.path.get(self.path_index..).unwrap_or(&[])
    }

    pub fn final_facing_target(&self) -> Option<Vec2> {
        self.final_facing
    }

    /// Replace any in-flight path and start moving.
    ///
    /// `final_facing` is the point the agent should face on arrival; when
    /// absent the last waypoint is used. An empty path stops the agent.
    pub fn set_path(&mut self, waypoints: Vec<Waypoint>, final_facing: Option<Vec2>) {
        if waypoints.is_empty() {
            self.stop();
            return;
        }
        debug!("path of {} waypoints from {}", waypoints.len(), self.cell);
        self.path = waypoints;
        self.path_index = 0;
        self.final_facing = final_facing;
        self.moving = true;
    }

    /// Drop the current path without snapping the facing.
    pub fn stop(&mut self) {
        self.path.clear();
        self.path_index = 0;
        self.final_facing = None;
        self.moving = false;
    }

    /// Point to track while idle (usually the hovered tile).
    pub fn set_look_target(&mut self, target: Option<Vec2>) {
        self.look_target = target;
    }

    /// Re-express position and waypoints after the projection changed.
    pub fn reproject(&mut self, remap: impl Fn(Vec2) -> Vec2, cell_center: impl Fn(IVec2) -> Vec2) {
        self.position = remap(self.position);
        for wp in &mut self.path {
            wp.position = cell_center(wp.cell);
        }
        self.final_facing = self.final_facing.map(&remap);
        self.look_target = self.look_target.map(&remap);
    }

    /// Advance by `dt` seconds. Returns whether the agent is still moving.
    pub fn tick(&mut self, dt: f32, cfg: &MotionConfig) -> bool {
        if !self.moving {
            self.update_idle_facing(cfg);
            return false;
        }

        let mut budget = (cfg.linear_speed() * dt).max(0.0);
        loop {
            let Some(wp) = self.path.get(self.path_index).copied() else {
                self.arrive(cfg);
                return false;
            };

            let to = wp.position - self.position;
            let dist = to.length();
            if dist <= cfg.arrival_epsilon {
                self.reach(wp);
                continue;
            }
            if budget <= 0.0 {
                break;
            }

            let dir = to / dist;
            let step = budget.min(dist);
            self.position += dir * step;
            self.last_heading = dir;
            budget -= step;
            if step >= dist {
                self.position = wp.position;
            }
        }

        self.update_path_facing(cfg);
        true
    }

    fn reach(&mut self, wp: Waypoint) {
        let leg = wp.position - self.position;
        if leg.length_squared() > MIN_DIR_LENGTH_SQ {
            self.last_heading = leg.normalize();
        }
        self.position = wp.position;
        self.cell = wp.cell;
        self.path_index += 1;
    }

    fn arrive(&mut self, cfg: &MotionConfig) {
        let toward_target = self
            .final_facing
            .map(|t| t - self.position)
            .filter(|v| v.length_squared() > MIN_DIR_LENGTH_SQ);
        let reference = toward_target.unwrap_or(self.last_heading);
        let raw = heading_angle(reference, cfg.facing_offset).unwrap_or(self.facing);
        let snapped = snap_to_canonical(raw);

        self.facing = snapped;
        self.target_facing = snapped;
        self.stop();
        info!("arrived at {} facing {:.0}°", self.cell, snapped.to_degrees());
    }

    fn update_path_facing(&mut self, cfg: &MotionConfig) {
        if let Some(angle) = self.path_target_angle(cfg) {
            self.target_facing = angle;
        }
        self.facing = approach_angle(
            self.facing,
            self.target_facing,
            cfg.path_turn_rate,
            cfg.snap_threshold,
        );
    }

    fn update_idle_facing(&mut self, cfg: &MotionConfig) {
        if let Some(angle) = self
            .look_target
            .and_then(|t| heading_angle(t - self.position, cfg.facing_offset))
        {
            self.target_facing = angle;
        }
        self.facing = approach_angle(
            self.facing,
            self.target_facing,
            cfg.track_turn_rate,
            cfg.snap_threshold,
        );
    }

    /// Toward the next waypoint, except on axis-aligned legs where the agent
    /// faces the overall destination instead.
    fn path_target_angle(&self, cfg: &MotionConfig) -> Option<f32> {
        let wp = self.path.get(self.path_index)?;
        let leg = wp.cell - self.cell;
        let axis_aligned = leg.x == 0 || leg.y == 0;
        let next = heading_angle(wp.position - self.position, cfg.facing_offset);
        if !axis_aligned {
            return next;
        }
        let destination = self
            .final_facing
            .or_else(|| self.path.last().map(|last| last.position))?;
        heading_angle(destination - self.position, cfg.facing_offset).or(next)
    }
}

// ============================================================================
// ANGLE HELPERS
// ============================================================================

/// Heading of `dir` plus `offset`, wrapped to [-π, π]. None for a zero vector.
pub fn heading_angle(dir: Vec2, offset: f32) -> Option<f32> {
    (dir.length_squared() > MIN_DIR_LENGTH_SQ).then(|| wrap_angle(dir.y.atan2(dir.x) + offset))
}

/// Wrap into [-π, π].
pub fn wrap_angle(angle: f32) -> f32 {
    let a = (angle + PI).rem_euclid(TAU) - PI;
    if a < -PI { a + TAU } else { a }
}

/// Exponential step from `current` toward `target` along the shortest arc.
/// Lands exactly on `target` once the gap is within `threshold`.
pub fn approach_angle(current: f32, target: f32, rate: f32, threshold: f32) -> f32 {
    let diff = wrap_angle(target - current);
    if diff.abs() <= threshold {
        return target;
    }
    wrap_angle(current + diff * rate.clamp(0.0, 1.0))
}

/// Nearest of 0, π/2, π, 3π/2 to `angle`, wraparound aware.
pub fn snap_to_canonical(angle: f32) -> f32 {
    let quarter = (angle.rem_euclid(TAU) / FRAC_PI_2).round() as i32 % 4;
    quarter as f32 * FRAC_PI_2
}
