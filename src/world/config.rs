// Tuning for the streaming world.
//
// All motion constants are per simulation tick, not per second. The front end
// runs ticks at a fixed rate, so these values read the same at any frame rate.

use std::env;
use glam::Vec3;
use thiserror::Error;
use super::grid::{CHUNK_SIZE, MAX_RADIUS};

pub const ENV_SEED: &str = "DREAM_RUNNER_SEED";
pub const ENV_LOAD_RADIUS: &str = "DREAM_RUNNER_LOAD_RADIUS";
pub const ENV_EVICT_RADIUS: &str = "DREAM_RUNNER_EVICT_RADIUS";

const DEFAULT_WORLD_SEED: u64 = 0x5EED_D2EA_3000_0001;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("evict radius {evict} must be larger than load radius {load}")]
    RadiusOrder { load: u32, evict: u32 },

    #[error("{which} radius {radius} exceeds the limit of {max}")]
    RadiusTooLarge { which: &'static str, radius: u32, max: u32 },

    #[error("collision radius {collision} must be between 1 and load radius {load}")]
    CollisionRadius { collision: u32, load: u32 },

    #[error("obstacle and runner half-extents on {axis} reach {reach}, not less than one chunk")]
    ObstacleReach { axis: &'static str, reach: f32 },

    #[error("obstacle size range is empty on {axis} ({min} > {max})")]
    EmptySizeRange { axis: &'static str, min: f32, max: f32 },

    #[error("flight band is empty: ground {ground} >= ceiling {ceiling}")]
    FlightBand { ground: f32, ceiling: f32 },

    #[error("{var}={value:?} is not valid: {reason}")]
    InvalidEnv { var: &'static str, value: String, reason: String },
}

// ============================================================================
// SEEDING
// ============================================================================

/// How obstacle layouts are randomised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedMode {
    /// Layout is a pure function of (world seed, chunk key). Revisiting an
    /// evicted region regenerates the same obstacles.
    PerChunk(u64),
    /// Fresh OS entropy for every generated chunk.
    Entropy,
}

impl Default for SeedMode {
    fn default() -> Self {
        SeedMode::PerChunk(DEFAULT_WORLD_SEED)
    }
}

// ============================================================================
// OBSTACLE TUNING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleTuning {
    /// Obstacles generated in every chunk.
    pub per_chunk: usize,
    /// Smallest full size on each axis (width, height, depth).
    pub min_size: Vec3,
    /// Largest full size on each axis.
    pub max_size: Vec3,
    /// Highest elevation of an obstacle's underside above the ground.
    pub max_hover: f32,
}

impl Default for ObstacleTuning {
    fn default() -> Self {
        Self {
            per_chunk: 60,
            min_size: Vec3::new(0.5, 0.5, 0.5),
            max_size: Vec3::new(3.0, 4.0, 3.0),
            max_hover: 6.0,
        }
    }
}

// ============================================================================
// AGENT TUNING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentTuning {
    /// Lateral distance per tick while advancing.
    pub speed: f32,
    /// Heading change in radians per tick while turning.
    pub turn_rate: f32,
    /// Vertical velocity gained per tick while ascend is held.
    pub ascend_accel: f32,
    /// Upper bound on vertical velocity.
    pub max_rise: f32,
    /// Vertical velocity lost per tick while ascend is released.
    pub gravity: f32,
    /// Lower bound on vertical velocity (negative).
    pub max_fall: f32,
    pub ground_height: f32,
    pub max_flight_height: f32,
    /// Full size of the agent's collision box. The agent position is the
    /// bottom centre of this box.
    pub body_size: Vec3,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            speed: 0.1,
            turn_rate: 0.04,
            ascend_accel: 0.02,
            max_rise: 0.2,
            gravity: 0.01,
            max_fall: -0.3,
            ground_height: 0.0,
            max_flight_height: 12.0,
            body_size: Vec3::new(1.0, 1.2, 0.8),
        }
    }
}

// ============================================================================
// STREAMING CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    /// Chunks within this Chebyshev radius of the agent are populated.
    pub load_radius: u32,
    /// Chunks beyond this radius are evicted. Must exceed `load_radius`.
    pub evict_radius: u32,
    /// Radius of chunks scanned for collisions around the agent's chunk.
    pub collision_radius: u32,
    pub seed: SeedMode,
    pub obstacles: ObstacleTuning,
    pub agent: AgentTuning,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            load_radius: 2,
            evict_radius: 3,
            collision_radius: 1,
            seed: SeedMode::default(),
            obstacles: ObstacleTuning::default(),
            agent: AgentTuning::default(),
        }
    }
}

impl StreamingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (which, radius) in [("load", self.load_radius), ("evict", self.evict_radius), ("collision", self.collision_radius)] {
            if radius > MAX_RADIUS {
                return Err(ConfigError::RadiusTooLarge { which, radius, max: MAX_RADIUS });
            }
        }
        if self.evict_radius <= self.load_radius {
            return Err(ConfigError::RadiusOrder {
                load: self.load_radius,
                evict: self.evict_radius,
            });
        }
        if self.collision_radius == 0 || self.collision_radius > self.load_radius {
            return Err(ConfigError::CollisionRadius {
                collision: self.collision_radius,
                load: self.load_radius,
            });
        }

        let (min, max) = (self.obstacles.min_size, self.obstacles.max_size);
        for (axis, lo, hi) in [("width", min.x, max.x), ("height", min.y, max.y), ("depth", min.z, max.z)] {
            if lo > hi {
                return Err(ConfigError::EmptySizeRange { axis, min: lo, max: hi });
            }
        }

        // The collision scan only covers neighbouring chunks, so nothing may
        // reach a runner from two chunks away.
        let body = self.agent.body_size;
        for (axis, obstacle, runner) in [("x", max.x, body.x), ("z", max.z, body.z)] {
            let reach = obstacle * 0.5 + runner * 0.5;
            if reach >= CHUNK_SIZE {
                return Err(ConfigError::ObstacleReach { axis, reach });
            }
        }

        let agent = &self.agent;
        if agent.ground_height >= agent.max_flight_height {
            return Err(ConfigError::FlightBand {
                ground: agent.ground_height,
                ceiling: agent.max_flight_height,
            });
        }
        Ok(())
    }

    /// Defaults overridden by `DREAM_RUNNER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_SEED) {
            config.seed = parse_seed(&raw)?;
        }
        if let Some(raw) = lookup(ENV_LOAD_RADIUS) {
            config.load_radius = parse_radius(ENV_LOAD_RADIUS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_EVICT_RADIUS) {
            config.evict_radius = parse_radius(ENV_EVICT_RADIUS, &raw)?;
        }

        config.validate()?;
        log::info!(
            "streaming config: load radius {}, evict radius {}, seed {:?}",
            config.load_radius, config.evict_radius, config.seed
        );
        Ok(config)
    }
}

fn parse_seed(raw: &str) -> Result<SeedMode, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("entropy") {
        return Ok(SeedMode::Entropy);
    }
    trimmed
        .parse::<u64>()
        .map(SeedMode::PerChunk)
        .map_err(|e| ConfigError::InvalidEnv {
            var: ENV_SEED,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

fn parse_radius(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim().parse::<u32>().map_err(|e| ConfigError::InvalidEnv {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
