// Live chunk records and their obstacles.
//
// A key is present iff its obstacles are attached to the world. Loading a
// present key never regenerates it: layouts must stay stable while loaded,
// otherwise collision state would shift under the agent's feet.
//
// Every attach and detach is queued as a ChunkEvent. The renderer drains the
// queue once per frame and mirrors it; the store never touches GPU objects.

use std::collections::{HashMap, HashSet};
use super::grid::{ChunkKey, neighborhood};
use super::obstacles::{Obstacle, ObstacleId, ObstacleIds, ObstacleSource};

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkEvent {
    Attached { key: ChunkKey, obstacles: Vec<Obstacle> },
    Detached { key: ChunkKey, ids: Vec<ObstacleId> },
}

pub struct ChunkStore<S> {
    source: S,
    ids: ObstacleIds,
    chunks: HashMap<ChunkKey, Vec<Obstacle>>,
    events: Vec<ChunkEvent>,
}

impl<S: ObstacleSource> ChunkStore<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            ids: ObstacleIds::default(),
            chunks: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Populate every key in `keys` that is not already present.
    /// Returns how many chunks were generated.
    pub fn ensure_loaded(&mut self, keys: &HashSet<ChunkKey>) -> usize {
        let mut loaded = 0;
        for &key in keys {
            if self.chunks.contains_key(&key) {
                continue;
            }
            let obstacles = self.source.generate(key, &mut self.ids);
            debug_assert!(obstacles.iter().all(|o| o.key == key));
            self.events.push(ChunkEvent::Attached { key, obstacles: obstacles.clone() });
            self.chunks.insert(key, obstacles);
            loaded += 1;
        }
        if loaded > 0 {
            log::debug!("loaded {} chunks ({} live)", loaded, self.chunks.len());
        }
        loaded
    }

    /// Remove every chunk whose key is not in `keep`.
    /// Returns how many chunks were evicted.
    pub fn evict_outside(&mut self, keep: &HashSet<ChunkKey>) -> usize {
        if self.is_empty() {
            return 0;
        }
        let doomed: Vec<ChunkKey> = self
            .chunks
            .keys()
            .filter(|key| !keep.contains(key))
            .copied()
            .collect();

        for &key in &doomed {
            if let Some(obstacles) = self.chunks.remove(&key) {
                let ids = obstacles.iter().map(|o| o.id).collect();
                self.events.push(ChunkEvent::Detached { key, ids });
            }
        }
        if !doomed.is_empty() {
            log::debug!("evicted {} chunks ({} live)", doomed.len(), self.chunks.len());
        }
        doomed.len()
    }

    /// Obstacles of the loaded chunks within `radius` of `center`.
    pub fn obstacles_near(&self, center: ChunkKey, radius: u32) -> Vec<&Obstacle> {
        neighborhood(center, radius)
            .iter()
            .filter_map(|key| self.chunks.get(key))
            .flatten()
            .collect()
    }
}

impl<S> ChunkStore<S> {
    #[cfg(test)]
    pub fn contains(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    #[cfg(test)]
    pub fn obstacles(&self, key: ChunkKey) -> Option<&[Obstacle]> {
        self.chunks.get(&key).map(Vec::as_slice)
    }

    #[cfg(test)]
    pub fn keys(&self) -> HashSet<ChunkKey> {
        self.chunks.keys().copied().collect()
    }

    /// Number of loaded chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn obstacle_count(&self) -> usize {
        self.chunks.values().map(Vec::len).sum()
    }

    /// Take every event queued since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<ChunkEvent> {
        std::mem::take(&mut self.events)
    }
}
