// ECS components for the render-side mirror of the streaming world.
// The world module owns obstacle data; these entities only exist so the
// renderer can query what to draw.

use std::collections::HashMap;
use bevy_ecs::prelude::*;
use glam::Vec3;
use crate::world::{ObstacleId, ObstacleShape, LAYER_COUNT};

/// Centre of an entity in 3D space
#[derive(Component, Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position }
    }
}

/// Full edge lengths of the box drawn for an entity
#[derive(Component, Debug, Clone, Copy)]
pub struct Extent {
    pub size: Vec3,
}

/// RGB color for rendering
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
        }
    }

    pub fn scaled(self, k: f32) -> Self {
        Self { r: self.r * k, g: self.g * k, b: self.b * k }
    }

    pub fn to_array(self, alpha: f32) -> [f32; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

/// Purple, teal, golden: one theme per dream layer.
pub const LAYER_COLORS: [Color; LAYER_COUNT] = [
    Color::from_hex(0x9B4F96),
    Color::from_hex(0x48A9A6),
    Color::from_hex(0xD4B483),
];

/// Obstacle tint for a layer. Shapes get slightly different shades so
/// neighbouring boxes stay distinguishable.
pub fn obstacle_color(layer: usize, shape: ObstacleShape) -> Color {
    let base = LAYER_COLORS[layer % LAYER_COUNT];
    match shape {
        ObstacleShape::Sphere => base,
        ObstacleShape::Tetrahedron => base.scaled(0.8),
        ObstacleShape::Torus => base.scaled(0.6),
    }
}

/// Marks an entity as the visual of one streamed obstacle.
#[derive(Component, Debug, Clone, Copy)]
pub struct ObstacleVisual {
    pub id: ObstacleId,
    pub shape: ObstacleShape,
}

/// Lookup from obstacle id to the entity drawing it.
#[derive(Resource, Debug, Default)]
pub struct ObstacleEntities {
    pub by_id: HashMap<ObstacleId, Entity>,
}

/// Dream layer currently used to tint obstacles.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct ActiveLayer(pub usize);
