// Chunk grid for the infinite ground plane.
//
// The XZ plane is cut into CHUNK_SIZE squares. Chunk (cx, cz) covers
// [cx*C, (cx+1)*C) x [cz*C, (cz+1)*C). Negative coordinates floor toward
// -infinity, so chunk (-1, 0) sits directly left of chunk (0, 0).

use std::collections::HashSet;
use glam::{Vec2, Vec3};

/// Whole world units per chunk edge.
pub const CHUNK_SIZE_UNITS: u32 = 100;
/// World units per chunk edge, as a float for coordinate math.
pub const CHUNK_SIZE: f32 = CHUNK_SIZE_UNITS as f32;

/// Largest neighbourhood radius the grid will enumerate.
pub const MAX_RADIUS: u32 = 32;

const _: () = assert!(CHUNK_SIZE_UNITS > 0, "chunk size must be positive");

// ============================================================================
// CHUNK KEY
// ============================================================================

/// Identifies one square chunk of the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkKey {
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// World-space XZ corner with the smallest coordinates.
    pub fn origin(self) -> Vec2 {
        Vec2::new(self.cx as f32 * CHUNK_SIZE, self.cz as f32 * CHUNK_SIZE)
    }

    /// Half-open XZ rectangle covered by this chunk as (min, max).
    #[cfg(test)]
    pub fn bounds(self) -> (Vec2, Vec2) {
        let min = self.origin();
        (min, min + Vec2::splat(CHUNK_SIZE))
    }

    /// Chebyshev (chessboard) distance in chunks.
    #[cfg(test)]
    pub fn chebyshev(self, other: ChunkKey) -> u32 {
        let dx = (self.cx - other.cx).unsigned_abs();
        let dz = (self.cz - other.cz).unsigned_abs();
        dx.max(dz)
    }
}

// ============================================================================
// LOOKUPS
// ============================================================================

/// Chunk containing the world-space point (x, z).
pub fn chunk_key_of(x: f32, z: f32) -> ChunkKey {
    ChunkKey {
        cx: (x / CHUNK_SIZE).floor() as i32,
        cz: (z / CHUNK_SIZE).floor() as i32,
    }
}

/// Chunk containing a 3D position (Y is ignored).
pub fn chunk_key_at(position: Vec3) -> ChunkKey {
    chunk_key_of(position.x, position.z)
}

/// Every key within Chebyshev distance `radius` of `center`, inclusive.
/// Always a (2r+1)^2 square that contains `center`. `radius` is capped at
/// `MAX_RADIUS`; the square is clipped at the edge of the i32 key space.
pub fn neighborhood(center: ChunkKey, radius: u32) -> HashSet<ChunkKey> {
    let r = radius.min(MAX_RADIUS) as i32;
    let side = 2 * r as usize + 1;
    let mut keys = HashSet::with_capacity(side * side);
    for cz in center.cz.saturating_sub(r)..=center.cz.saturating_add(r) {
        for cx in center.cx.saturating_sub(r)..=center.cx.saturating_add(r) {
            keys.insert(ChunkKey::new(cx, cz));
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_toward_negative_infinity() {
        assert_eq!(chunk_key_of(0.0, 0.0), ChunkKey::new(0, 0));
        assert_eq!(chunk_key_of(99.9, 0.0), ChunkKey::new(0, 0));
        assert_eq!(chunk_key_of(100.0, 0.0), ChunkKey::new(1, 0));
        assert_eq!(chunk_key_of(-0.1, -100.0), ChunkKey::new(-1, -1));
        assert_eq!(chunk_key_of(-100.1, 250.0), ChunkKey::new(-2, 2));
    }

    #[test]
    fn key_bounds_contain_points_that_map_to_it() {
        for &(x, z) in &[(12.5, -3.0), (-250.0, 999.0), (0.0, -0.01)] {
            let key = chunk_key_of(x, z);
            let (min, max) = key.bounds();
            assert!(x >= min.x && x < max.x, "x={x} not in {min}..{max}");
            assert!(z >= min.y && z < max.y, "z={z} not in {min}..{max}");
        }
    }

    #[test]
    fn neighborhood_is_full_square_around_center() {
        let centers = [ChunkKey::new(0, 0), ChunkKey::new(-7, 3), ChunkKey::new(120, -45)];
        for center in centers {
            for radius in 0..5u32 {
                let keys = neighborhood(center, radius);
                let side = (2 * radius + 1) as usize;
                assert_eq!(keys.len(), side * side);
                assert!(keys.contains(&center));
                assert!(keys.iter().all(|k| center.chebyshev(*k) <= radius));
            }
        }
    }

    #[test]
    fn oversized_radius_is_capped() {
        let keys = neighborhood(ChunkKey::new(0, 0), u32::MAX);
        let side = (2 * MAX_RADIUS + 1) as usize;
        assert_eq!(keys.len(), side * side);
        assert_eq!(neighborhood(ChunkKey::new(5, 5), 2_147_483_648), keys_around(5, 5));
    }

    fn keys_around(cx: i32, cz: i32) -> HashSet<ChunkKey> {
        neighborhood(ChunkKey::new(cx, cz), MAX_RADIUS)
    }

    #[test]
    fn edge_of_key_space_does_not_overflow() {
        let keys = neighborhood(ChunkKey::new(i32::MAX, i32::MIN), 1);
        assert_eq!(keys.len(), 4);
        assert!(keys.contains(&ChunkKey::new(i32::MAX - 1, i32::MIN + 1)));
    }

    #[test]
    fn chebyshev_takes_larger_axis() {
        let a = ChunkKey::new(2, 0);
        assert_eq!(a.chebyshev(ChunkKey::new(-2, 1)), 4);
        assert_eq!(a.chebyshev(ChunkKey::new(3, -3)), 3);
        assert_eq!(a.chebyshev(a), 0);
    }
}
