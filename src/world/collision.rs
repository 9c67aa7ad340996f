// Axis-aligned box collision against the live obstacle set.
//
// Every volume in the world is an AABB. Faces that only touch do not count
// as an intersection, so an agent can stand flush against an obstacle.

use glam::Vec3;
use super::chunk_store::ChunkStore;
use super::obstacles::ObstacleSource;
use super::grid::ChunkKey;

// ============================================================================
// AABB
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box centred on `center` with full edge lengths `size`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    #[cfg(test)]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[cfg(test)]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Strict overlap on all three axes.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
            && self.min.z < other.max.z
            && other.min.z < self.max.z
    }
}

/// True iff `volume` overlaps any box in `obstacles`. Empty input is open world.
pub fn intersects<'a, I>(volume: &Aabb, obstacles: I) -> bool
where
    I: IntoIterator<Item = &'a Aabb>,
{
    obstacles.into_iter().any(|other| volume.intersects(other))
}

// ============================================================================
// COLLISION INDEX
// ============================================================================

/// Per-tick snapshot of obstacle bounds around one chunk.
///
/// Built after the chunk store has been loaded and evicted for the tick, so
/// every query in the same tick sees one consistent obstacle set.
pub struct CollisionIndex {
    bounds: Vec<Aabb>,
}

impl CollisionIndex {
    pub fn gather<S: ObstacleSource>(store: &ChunkStore<S>, center: ChunkKey, radius: u32) -> Self {
        let bounds = store
            .obstacles_near(center, radius)
            .into_iter()
            .map(|o| o.bounds())
            .collect();
        Self { bounds }
    }

    #[cfg(test)]
    pub fn from_bounds(bounds: Vec<Aabb>) -> Self {
        Self { bounds }
    }

    pub fn hits(&self, volume: &Aabb) -> bool {
        !self.is_empty() && intersects(volume, &self.bounds)
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_box(center: Vec3) -> Aabb {
        Aabb::from_center_size(center, Vec3::new(1.0, 1.2, 0.8))
    }

    #[test]
    fn agent_overlapping_thin_pillar() {
        let pillar = Aabb::from_center_size(Vec3::new(10.0, 1.0, 10.0), Vec3::new(0.5, 2.0, 0.5));
        assert!(intersects(&agent_box(Vec3::new(10.0, 1.0, 10.0)), [&pillar]));
        assert!(!intersects(&agent_box(Vec3::new(10.0, 1.0, 13.0)), [&pillar]));
    }

    #[test]
    fn touching_faces_do_not_intersect() {
        let a = Aabb::from_center_size(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_center_size(Vec3::new(1.0, 0.0, 0.0), Vec3::ONE);
        assert!(!a.intersects(&b));
        let c = Aabb::from_center_size(Vec3::new(0.999, 0.0, 0.0), Vec3::ONE);
        assert!(a.intersects(&c));
    }

    #[test]
    fn separation_on_any_single_axis_is_enough() {
        let a = Aabb::from_center_size(Vec3::ZERO, Vec3::splat(2.0));
        for offset in [Vec3::X * 3.0, Vec3::Y * 3.0, Vec3::Z * 3.0] {
            let b = Aabb::from_center_size(offset, Vec3::splat(2.0));
            assert!(!a.intersects(&b), "offset {offset}");
        }
    }

    #[test]
    fn overlap_is_order_independent() {
        let boxes = [
            Aabb::from_center_size(Vec3::ZERO, Vec3::ONE),
            Aabb::from_center_size(Vec3::new(0.4, 0.2, -0.3), Vec3::new(0.2, 3.0, 0.2)),
            Aabb::from_center_size(Vec3::new(5.0, 0.0, 0.0), Vec3::splat(0.5)),
            Aabb::from_center_size(Vec3::new(0.5, 0.5, 0.5), Vec3::ZERO),
            Aabb::from_center_size(Vec3::new(-0.75, 0.0, 0.0), Vec3::new(0.5, 1.0, 1.0)),
        ];
        for a in &boxes {
            for b in &boxes {
                assert_eq!(intersects(a, [b]), intersects(b, [a]), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn empty_obstacle_set_never_collides() {
        let index = CollisionIndex::from_bounds(Vec::new());
        assert!(index.is_empty());
        assert!(!index.hits(&agent_box(Vec3::ZERO)));
        assert!(!intersects(&agent_box(Vec3::ZERO), std::iter::empty()));
    }

    #[test]
    fn center_and_size_round_out() {
        let b = Aabb::from_center_size(Vec3::new(1.0, 2.0, 3.0), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(b.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(b.center(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.size(), Vec3::new(2.0, 4.0, 6.0));
    }
}
