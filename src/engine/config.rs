use bevy_ecs::prelude::*;
use log::{error, info};
use serde::{Deserialize, Serialize};

use super::motion::MotionConfig;
use super::navigation::DiagonalMovement;
use super::projection::ProjectionMode;

/// Scene configuration, loaded once at startup from a RON file.
///
/// Every section has defaults, so a config file only needs the fields it
/// overrides.
#[derive(Resource, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NavConfig {
    pub grid: GridConfig,
    pub obstacles: ObstacleConfig,
    pub diagonal_movement: DiagonalMovement,
    pub motion: MotionConfig,
    /// Relative tile-size change on resize above which the obstacle field is
    /// regenerated instead of just re-projected.
    pub regen_threshold: f32,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    /// Cells per side; the map is square.
    pub grid_size: i32,
    pub projection: ProjectionMode,
    /// Tile size is derived as min(viewport w, h) / tiles_across.
    pub tiles_across: f32,
    pub min_tile_size: f32,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Fraction of cells to block.
    pub density: f32,
    /// Chebyshev radius around the spawn cell kept free.
    pub exclusion_radius: i32,
    /// Obstacle extrusion as a multiple of tile size, for hit testing.
    pub height_in_tiles: f32,
    /// Fixed RNG seed; None draws from entropy.
    pub seed: Option<u64>,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            obstacles: ObstacleConfig::default(),
            diagonal_movement: DiagonalMovement::default(),
            motion: MotionConfig::default(),
            regen_threshold: 0.1,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_size: 20,
            projection: ProjectionMode::Isometric,
            tiles_across: 12.0,
            min_tile_size: 8.0,
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            density: 0.15,
            exclusion_radius: 2,
            height_in_tiles: 0.75,
            seed: None,
        }
    }
}

impl NavConfig {
    pub fn from_ron(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(ron::from_str(contents)?)
    }

    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    /// Load `path`, falling back to defaults (and logging why) on any failure.
    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded nav config from {}", path);
                config
            }
            Err(e) => {
                error!("Failed to load nav config from {}: {}", path, e);
                error!("Using default NavConfig");
                Self::default()
            }
        }
    }

    /// Tile size for a viewport, per the grid section.
    pub fn tile_size_for(&self, viewport_w: f32, viewport_h: f32) -> f32 {
        let across = self.grid.tiles_across.max(1.0);
        (viewport_w.min(viewport_h) / across).max(self.grid.min_tile_size)
    }

    /// Spawn cell: the middle of the map.
    pub fn spawn_cell(&self) -> glam::IVec2 {
        glam::IVec2::splat(self.grid.grid_size / 2)
    }
}
