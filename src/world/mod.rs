// Streaming world - the simulation core of the runner.
// Pure in-memory state; the front end in main.rs drives it one tick at a time
// and mirrors its chunk events into the ECS world for rendering.

pub mod agent;
pub mod chunk_store;
pub mod collision;
pub mod config;
pub mod grid;
pub mod obstacles;
pub mod streaming;
pub mod stride;

pub use agent::{MotionState, MovementIntent};
pub use chunk_store::ChunkEvent;
pub use config::StreamingConfig;
pub use grid::CHUNK_SIZE;
pub use obstacles::{ObstacleId, ObstacleShape};
pub use streaming::{LAYER_COUNT, StreamingLoop};
