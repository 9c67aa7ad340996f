// Procedural obstacle generation, one batch per chunk.
//
// Obstacles float at random heights inside their chunk's square, like the
// dream shapes they are drawn as. Collision always uses the box footprint;
// the shape only picks the mesh the renderer draws.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use super::collision::Aabb;
use super::config::{ObstacleTuning, SeedMode};
use super::grid::{CHUNK_SIZE, ChunkKey};

// ============================================================================
// OBSTACLE
// ============================================================================

/// Store-assigned identity of one obstacle. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObstacleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleShape {
    Sphere,
    Tetrahedron,
    Torus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub id: ObstacleId,
    /// Chunk that owns this obstacle. The obstacle lives exactly as long as it.
    pub key: ChunkKey,
    pub shape: ObstacleShape,
    pub center: Vec3,
    /// Full edge lengths (width, height, depth).
    pub size: Vec3,
}

impl Obstacle {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.size)
    }
}

/// Hands out obstacle ids in increasing order.
#[derive(Debug, Default)]
pub struct ObstacleIds {
    next: u64,
}

impl ObstacleIds {
    pub fn next_id(&mut self) -> ObstacleId {
        let id = ObstacleId(self.next);
        self.next += 1;
        id
    }
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// Anything that can fill a chunk with obstacles.
///
/// The chunk store calls `generate` at most once per key while that key stays
/// loaded. Every returned obstacle must carry `key` and an id from `ids`.
pub trait ObstacleSource {
    fn generate(&mut self, key: ChunkKey, ids: &mut ObstacleIds) -> Vec<Obstacle>;
}

// ============================================================================
// FACTORY
// ============================================================================

pub struct ObstacleFactory {
    tuning: ObstacleTuning,
    seed: SeedMode,
}

impl ObstacleFactory {
    pub fn new(tuning: ObstacleTuning, seed: SeedMode) -> Self {
        Self { tuning, seed }
    }

    fn rng_for(&self, key: ChunkKey) -> StdRng {
        match self.seed {
            SeedMode::PerChunk(world_seed) => StdRng::seed_from_u64(chunk_seed(world_seed, key)),
            SeedMode::Entropy => StdRng::from_entropy(),
        }
    }
}

impl ObstacleSource for ObstacleFactory {
    fn generate(&mut self, key: ChunkKey, ids: &mut ObstacleIds) -> Vec<Obstacle> {
        let mut rng = self.rng_for(key);
        let origin = key.origin();
        let t = &self.tuning;

        let mut obstacles = Vec::with_capacity(t.per_chunk);
        for _ in 0..t.per_chunk {
            let size = Vec3::new(
                sample(&mut rng, t.min_size.x, t.max_size.x),
                sample(&mut rng, t.min_size.y, t.max_size.y),
                sample(&mut rng, t.min_size.z, t.max_size.z),
            );
            let elevation = sample(&mut rng, 0.0, t.max_hover.max(0.0));
            let center = Vec3::new(
                origin.x + rng.gen_range(0.0..CHUNK_SIZE),
                elevation + size.y * 0.5,
                origin.y + rng.gen_range(0.0..CHUNK_SIZE),
            );
            let shape = match rng.gen_range(0..3u8) {
                0 => ObstacleShape::Sphere,
                1 => ObstacleShape::Tetrahedron,
                _ => ObstacleShape::Torus,
            };

            obstacles.push(Obstacle {
                id: ids.next_id(),
                key,
                shape,
                center,
                size,
            });
        }

        log::trace!("generated {} obstacles for chunk ({}, {})", obstacles.len(), key.cx, key.cz);
        obstacles
    }
}

// Inclusive sample that tolerates a degenerate range.
fn sample(rng: &mut StdRng, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.gen_range(lo..=hi) } else { lo }
}

/// Mixes the world seed with a chunk key (splitmix64 finaliser).
fn chunk_seed(world_seed: u64, key: ChunkKey) -> u64 {
    let packed = ((key.cx as u32 as u64) << 32) | key.cz as u32 as u64;
    let mut z = world_seed ^ packed.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> ObstacleFactory {
        ObstacleFactory::new(ObstacleTuning::default(), SeedMode::PerChunk(seed))
    }

    #[test]
    fn fixed_count_inside_chunk_bounds() {
        let tuning = ObstacleTuning::default();
        let mut factory = seeded(7);
        let mut ids = ObstacleIds::default();
        for key in [ChunkKey::new(0, 0), ChunkKey::new(-3, 5), ChunkKey::new(41, -17)] {
            let obstacles = factory.generate(key, &mut ids);
            assert_eq!(obstacles.len(), tuning.per_chunk);

            let (min, max) = key.bounds();
            for o in &obstacles {
                assert_eq!(o.key, key);
                assert!(o.center.x >= min.x && o.center.x <= max.x);
                assert!(o.center.z >= min.y && o.center.z <= max.y);
                assert!(o.size.cmpge(tuning.min_size).all());
                assert!(o.size.cmple(tuning.max_size).all());
                let bottom = o.center.y - o.size.y * 0.5;
                assert!(bottom >= -1e-4 && bottom <= tuning.max_hover + 1e-4);
            }
        }
    }

    #[test]
    fn ids_are_unique_across_chunks() {
        let mut factory = seeded(1);
        let mut ids = ObstacleIds::default();
        let mut seen = std::collections::HashSet::new();
        for cx in -2..=2 {
            for o in factory.generate(ChunkKey::new(cx, 0), &mut ids) {
                assert!(seen.insert(o.id), "duplicate id {:?}", o.id);
            }
        }
    }

    #[test]
    fn per_chunk_seed_reproduces_layout() {
        let key = ChunkKey::new(-4, 9);
        let a = seeded(99).generate(key, &mut ObstacleIds::default());
        let b = seeded(99).generate(key, &mut ObstacleIds::default());
        let layout = |v: &[Obstacle]| v.iter().map(|o| (o.center, o.size, o.shape)).collect::<Vec<_>>();
        assert_eq!(layout(&a), layout(&b));

        let other = seeded(99).generate(ChunkKey::new(-4, 10), &mut ObstacleIds::default());
        assert_ne!(layout(&a), layout(&other));
    }

    #[test]
    fn chunk_seed_separates_neighbours() {
        let seeds: std::collections::HashSet<u64> = (-3..=3)
            .flat_map(|cx| (-3..=3).map(move |cz| chunk_seed(5, ChunkKey::new(cx, cz))))
            .collect();
        assert_eq!(seeds.len(), 49);
    }

    #[test]
    fn degenerate_ranges_pin_the_size() {
        let tuning = ObstacleTuning {
            per_chunk: 4,
            min_size: Vec3::splat(1.5),
            max_size: Vec3::splat(1.5),
            max_hover: 0.0,
        };
        let mut factory = ObstacleFactory::new(tuning, SeedMode::Entropy);
        for o in factory.generate(ChunkKey::new(0, 0), &mut ObstacleIds::default()) {
            assert_eq!(o.size, Vec3::splat(1.5));
            assert_eq!(o.center.y, 0.75);
        }
    }
}
