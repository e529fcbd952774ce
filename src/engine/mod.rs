// Engine module - navigation core for the click-to-move scene
// The renderer is external: it reads positions, facing and tiles from Scene

pub mod camera;
pub mod components;
pub mod config;
pub mod input;
pub mod motion;
pub mod navigation;
pub mod obstacles;
pub mod picking;
pub mod projection;
pub mod scene;
pub mod systems;

// Re-export commonly used items
pub use camera::FollowCamera;
pub use config::NavConfig;
pub use input::InputState;
pub use motion::{AgentState, MotionConfig, Waypoint};
pub use navigation::{DiagonalMovement, WalkabilityMask, find_path};
pub use obstacles::ObstacleField;
pub use picking::{Highlight, MoveOrder, TargetResolution};
pub use projection::{Projection, ProjectionMode};
pub use scene::{Scene, TileView};
