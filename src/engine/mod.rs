// Engine module - rendering, input and ECS plumbing around the streaming world

pub mod camera;
pub mod components;
pub mod debug_overlay;
pub mod input;
pub mod mesh;
pub mod systems;

// Re-export commonly used items
pub use components::*;
