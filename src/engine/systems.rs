// ECS updates driven by the streaming world.
// Chunk events become entity spawns and despawns; layer changes recolor
// every live obstacle.

use bevy_ecs::prelude::*;
use crate::world::ChunkEvent;
use super::components::*;

/// Mirror attach/detach events into `world`, oldest first.
/// Returns (spawned, despawned) entity counts.
pub fn apply_chunk_events(world: &mut World, events: Vec<ChunkEvent>) -> (usize, usize) {
    let layer = world.get_resource_or_insert_with(ActiveLayer::default).0;
    world.init_resource::<ObstacleEntities>();

    let mut spawned = 0;
    let mut despawned = 0;
    for event in events {
        match event {
            ChunkEvent::Attached { obstacles, .. } => {
                for obstacle in obstacles {
                    let entity = world
                        .spawn((
                            Transform::from_position(obstacle.center),
                            Extent { size: obstacle.size },
                            obstacle_color(layer, obstacle.shape),
                            ObstacleVisual { id: obstacle.id, shape: obstacle.shape },
                        ))
                        .id();
                    world.resource_mut::<ObstacleEntities>().by_id.insert(obstacle.id, entity);
                    spawned += 1;
                }
            }
            ChunkEvent::Detached { key, ids } => {
                for id in ids {
                    let entity = world.resource_mut::<ObstacleEntities>().by_id.remove(&id);
                    // Only despawn the entity that still draws this obstacle.
                    let entity = entity.filter(|&e| world.get::<ObstacleVisual>(e).is_some_and(|v| v.id == id));
                    match entity {
                        Some(entity) if world.despawn(entity) => despawned += 1,
                        _ => log::warn!("chunk ({}, {}) detached unknown obstacle {:?}", key.cx, key.cz, id),
                    }
                }
            }
        }
    }
    (spawned, despawned)
}

/// Switch the active dream layer and retint every obstacle entity.
pub fn recolor_obstacles(world: &mut World, layer: usize) {
    world.insert_resource(ActiveLayer(layer));
    let mut query = world.query::<(&ObstacleVisual, &mut Color)>();
    for (visual, mut color) in query.iter_mut(world) {
        *color = obstacle_color(layer, visual.shape);
    }
}
