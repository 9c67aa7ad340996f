// Per-tick orchestration of the streaming world.
//
// Order inside one tick is fixed: locate the agent's chunk, load the load
// neighbourhood, evict outside the eviction neighbourhood, snapshot collision
// bounds, then step the agent. The collision snapshot therefore always sees
// this tick's final chunk set.

use glam::Vec3;
use super::agent::{Agent, AgentController, MovementIntent, StepReport};
use super::chunk_store::{ChunkEvent, ChunkStore};
use super::collision::CollisionIndex;
use super::config::StreamingConfig;
use super::grid::{ChunkKey, chunk_key_at, neighborhood};
use super::obstacles::{ObstacleFactory, ObstacleSource};
use super::stride::StrideAnimation;

/// Number of dream layers cycled by launches.
pub const LAYER_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamingStats {
    pub ticks: u64,
    /// Lateral distance actually covered, excluding rejected moves.
    pub distance: f32,
    pub chunks_loaded: u64,
    pub chunks_evicted: u64,
    pub launches: u64,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Chunk the agent stood in when the tick started.
    pub chunk: ChunkKey,
    pub loaded: usize,
    pub evicted: usize,
    /// Obstacles scanned for collisions this tick.
    pub nearby_obstacles: usize,
    pub step: StepReport,
    /// Set when a launch switched the dream layer.
    pub layer_changed: Option<usize>,
}

pub struct StreamingLoop<S = ObstacleFactory> {
    config: StreamingConfig,
    store: ChunkStore<S>,
    controller: AgentController,
    stride: StrideAnimation,
    layer: usize,
    stats: StreamingStats,
}

impl StreamingLoop<ObstacleFactory> {
    pub fn new(config: StreamingConfig) -> Self {
        let factory = ObstacleFactory::new(config.obstacles, config.seed);
        Self::with_source(config, factory)
    }
}

impl<S: ObstacleSource> StreamingLoop<S> {
    pub fn with_source(config: StreamingConfig, source: S) -> Self {
        let controller = AgentController::new(config.agent);
        Self {
            config,
            store: ChunkStore::new(source),
            controller,
            stride: StrideAnimation::default(),
            layer: 0,
            stats: StreamingStats::default(),
        }
    }

    pub fn tick(&mut self, intent: &MovementIntent) -> TickReport {
        let chunk = chunk_key_at(self.controller.agent().position);

        let loaded = self
            .store
            .ensure_loaded(&neighborhood(chunk, self.config.load_radius));
        let evicted = self
            .store
            .evict_outside(&neighborhood(chunk, self.config.evict_radius));

        let index = CollisionIndex::gather(&self.store, chunk, self.config.collision_radius);
        let before = self.controller.agent().position;
        let step = self.controller.step(intent, |volume| index.hits(volume));
        let after = self.controller.agent().position;

        let layer_changed = if step.launched {
            self.layer = (self.layer + 1) % LAYER_COUNT;
            self.stats.launches += 1;
            log::info!("launch{} -> dream layer {}", if step.bounced { " (bounce)" } else { "" }, self.layer);
            Some(self.layer)
        } else {
            None
        };

        self.stride.update(intent.drive());
        self.stats.ticks += 1;
        self.stats.distance += Vec3::new(after.x - before.x, 0.0, after.z - before.z).length();
        self.stats.chunks_loaded += loaded as u64;
        self.stats.chunks_evicted += evicted as u64;

        TickReport {
            chunk,
            loaded,
            evicted,
            nearby_obstacles: index.len(),
            step,
            layer_changed,
        }
    }

    /// Move the agent without simulating the path in between. Chunks follow on
    /// the next tick.
    pub fn place_agent(&mut self, position: Vec3) {
        self.controller.place(position);
    }

    pub fn drain_events(&mut self) -> Vec<ChunkEvent> {
        self.store.drain_events()
    }

    pub fn agent(&self) -> &Agent {
        self.controller.agent()
    }

    pub fn controller(&self) -> &AgentController {
        &self.controller
    }

    pub fn store(&self) -> &ChunkStore<S> {
        &self.store
    }

    pub fn stride(&self) -> &StrideAnimation {
        &self.stride
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn stats(&self) -> &StreamingStats {
        &self.stats
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use crate::world::agent::MotionState;
    use crate::world::config::SeedMode;
    use crate::world::grid::MAX_RADIUS;
    use crate::world::obstacles::{Obstacle, ObstacleIds, ObstacleShape};

    /// Places a fixed set of obstacles, each in the chunk that contains it.
    struct HandPlaced {
        obstacles: Vec<(Vec3, Vec3)>,
    }

    impl ObstacleSource for HandPlaced {
        fn generate(&mut self, key: ChunkKey, ids: &mut ObstacleIds) -> Vec<Obstacle> {
            self.obstacles
                .iter()
                .filter(|(center, _)| chunk_key_at(*center) == key)
                .map(|&(center, size)| Obstacle {
                    id: ids.next_id(),
                    key,
                    shape: ObstacleShape::Sphere,
                    center,
                    size,
                })
                .collect()
        }
    }

    fn keys_in(cx: std::ops::RangeInclusive<i32>, cz: std::ops::RangeInclusive<i32>) -> HashSet<ChunkKey> {
        cx.flat_map(|x| cz.clone().map(move |z| ChunkKey::new(x, z))).collect()
    }

    #[test]
    fn streams_with_hysteresis_around_agent() {
        let mut world = StreamingLoop::new(StreamingConfig {
            seed: SeedMode::PerChunk(3),
            ..Default::default()
        });

        let first = world.tick(&MovementIntent::default());
        assert_eq!(first.chunk, ChunkKey::new(0, 0));
        assert_eq!(first.loaded, 25);
        assert_eq!(world.store().keys(), keys_in(-2..=2, -2..=2));

        world.place_agent(Vec3::new(250.0, 0.0, 0.0));
        let second = world.tick(&MovementIntent::default());
        assert_eq!(second.chunk, ChunkKey::new(2, 0));

        // Load radius 2 around (2, 0) adds cx 3..=4; evict radius 3 drops cx -2.
        let expected = keys_in(-1..=4, -2..=2);
        assert_eq!(world.store().keys(), expected);
        assert_eq!(second.loaded, 10);
        assert_eq!(second.evicted, 5);
        assert!(world.store().keys().iter().all(|k| (k.cx - 2).abs() <= 3));
        assert!(neighborhood(ChunkKey::new(2, 0), 2).iter().all(|k| world.store().contains(*k)));
    }

    #[test]
    fn boundary_jitter_does_not_thrash() {
        let mut world = StreamingLoop::new(StreamingConfig::default());
        world.place_agent(Vec3::new(99.5, 0.0, 50.0));
        world.tick(&MovementIntent::default());
        world.drain_events();

        for i in 0..20 {
            let x = if i % 2 == 0 { 100.5 } else { 99.5 };
            world.place_agent(Vec3::new(x, 0.0, 50.0));
            let report = world.tick(&MovementIntent::default());
            assert_eq!(report.evicted, 0, "evicted while crossing back and forth");
        }
        // Only the first crossing loads the new column.
        let attached = world
            .drain_events()
            .iter()
            .filter(|e| matches!(e, ChunkEvent::Attached { .. }))
            .count();
        assert_eq!(attached, 5);
    }

    #[test]
    fn obstacle_blocks_the_runner() {
        // Pillar straight ahead of the agent, which faces -Z.
        let source = HandPlaced {
            obstacles: vec![(Vec3::new(0.0, 1.0, -3.0), Vec3::new(2.0, 2.0, 0.5))],
        };
        let mut world = StreamingLoop::with_source(StreamingConfig::default(), source);
        let run = MovementIntent { advance: true, ..Default::default() };

        let mut blocked = false;
        for _ in 0..100 {
            blocked |= world.tick(&run).step.blocked_z;
        }
        assert!(blocked);
        // Pillar face at z = -2.75, agent half depth 0.4.
        assert!(world.agent().position.z >= -2.35 - 1e-4);
        assert!(world.agent().position.z < -2.0);
        assert!(world.stats().distance < 2.4);
    }

    #[test]
    fn flying_clears_low_obstacles() {
        let source = HandPlaced {
            obstacles: vec![(Vec3::new(0.0, 0.25, -3.0), Vec3::new(2.0, 0.5, 0.5))],
        };
        let mut world = StreamingLoop::with_source(StreamingConfig::default(), source);
        let fly = MovementIntent { advance: true, ascend: true, ..Default::default() };
        for _ in 0..100 {
            let report = world.tick(&fly);
            assert!(!report.step.blocked_z);
        }
        assert!(world.agent().position.z < -5.0);
    }

    #[test]
    fn launches_cycle_dream_layers() {
        let mut world = StreamingLoop::new(StreamingConfig::default());
        let up = MovementIntent { ascend: true, ..Default::default() };
        let idle = MovementIntent::default();

        let mut layers = Vec::new();
        for _ in 0..LAYER_COUNT + 1 {
            let report = world.tick(&up);
            layers.push(report.layer_changed.expect("grounded launch"));
            while !world.tick(&idle).step.landed {}
        }
        assert_eq!(layers, vec![1, 2, 0, 1]);
        assert_eq!(world.stats().launches, LAYER_COUNT as u64 + 1);
    }

    #[test]
    fn stats_and_stride_follow_ticks() {
        let mut world = StreamingLoop::with_source(StreamingConfig::default(), HandPlaced { obstacles: Vec::new() });
        let run = MovementIntent { advance: true, ..Default::default() };
        for _ in 0..10 {
            world.tick(&run);
        }
        assert_eq!(world.stats().ticks, 10);
        assert!((world.stats().distance - 1.0).abs() < 1e-4);
        assert!(world.stride().is_running());

        world.tick(&MovementIntent::default());
        assert!(!world.stride().is_running());
    }

    #[test]
    fn revisiting_region_regenerates_same_layout() {
        let mut world = StreamingLoop::new(StreamingConfig {
            seed: SeedMode::PerChunk(11),
            ..Default::default()
        });
        world.tick(&MovementIntent::default());
        let layout = |w: &StreamingLoop| {
            let mut v: Vec<_> = w
                .store()
                .obstacles(ChunkKey::new(0, 0))
                .unwrap()
                .iter()
                .map(|o| (o.center.to_array(), o.size.to_array()))
                .collect();
            v.sort_by(|a, b| a.partial_cmp(b).unwrap());
            v
        };
        let before = layout(&world);

        world.place_agent(Vec3::new(1000.0, 0.0, 0.0));
        world.tick(&MovementIntent::default());
        assert!(!world.store().contains(ChunkKey::new(0, 0)));

        world.place_agent(Vec3::ZERO);
        world.tick(&MovementIntent::default());
        assert_eq!(layout(&world), before);
    }

    #[test]
    fn respawn_grounds_the_runner_and_restreams_origin() {
        let mut world = StreamingLoop::with_source(StreamingConfig::default(), HandPlaced { obstacles: Vec::new() });
        let fly = MovementIntent { advance: true, ascend: true, ..Default::default() };
        for _ in 0..30 {
            world.tick(&fly);
        }
        world.place_agent(Vec3::new(450.0, 0.0, 0.0));
        world.tick(&MovementIntent::default());
        assert!(!world.store().contains(ChunkKey::new(0, 0)));

        world.place_agent(Vec3::ZERO);
        assert_eq!(world.agent().state, MotionState::Grounded);
        assert_eq!(world.agent().vertical_velocity, 0.0);

        let report = world.tick(&MovementIntent::default());
        let origin = ChunkKey::new(0, 0);
        assert_eq!(report.chunk, origin);
        let keys = world.store().keys();
        assert!(neighborhood(origin, 2).is_subset(&keys));
        assert!(keys.iter().all(|k| origin.chebyshev(*k) <= 3));
    }

    #[test]
    fn oversized_radii_are_capped_instead_of_overflowing() {
        let mut config = StreamingConfig {
            load_radius: 2_147_483_648,
            evict_radius: 2_147_483_649,
            ..Default::default()
        };
        config.obstacles.per_chunk = 0;
        let mut world = StreamingLoop::new(config);

        let report = world.tick(&MovementIntent::default());
        let side = (2 * MAX_RADIUS + 1) as usize;
        assert_eq!(report.loaded, side * side);
        assert_eq!(world.store().len(), side * side);
    }
}
