use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::input::Key;
use super::scene::{EntityId, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn channels(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDesc {
    pub width: f32,
    pub height: f32,
    pub color: Color,
}

impl SpriteDesc {
    pub fn square(size: f32, color: Color) -> Self {
        Self {
            width: size,
            height: size,
            color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Player,
    CameraTarget,
    WorldElement,
    Overlay,
    Agent,
}

impl Tag {
    pub const fn name(self) -> &'static str {
        match self {
            Tag::Player => "player",
            Tag::CameraTarget => "camera_target",
            Tag::WorldElement => "world_element",
            Tag::Overlay => "overlay",
            Tag::Agent => "agent",
        }
    }
}

/// `current` is stored as written; the host never clamps it to `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
    #[error("entity {0} has no health")]
    NoHealth(EntityId),
}

pub type HostResult<T> = Result<T, HostError>;

/// Primitives a host exposes to gameplay behaviors. The host owns entity
/// storage; behaviors only ever hold `EntityId`s.
pub trait Host {
    fn spawn_visual_entity(&mut self, sprite: SpriteDesc, position: Vec2, z_order: f32)
        -> EntityId;
    fn despawn_entity(&mut self, id: EntityId) -> HostResult<()>;
    fn tag_entity(&mut self, id: EntityId, tag: Tag) -> HostResult<()>;
    /// Sets current health. An entity without a health record gets one with
    /// `max == value`.
    fn set_health(&mut self, id: EntityId, value: f32) -> HostResult<()>;
    fn get_health(&self, id: EntityId) -> HostResult<Health>;
    fn get_position(&self, id: EntityId) -> HostResult<Vec2>;
    fn set_position(&mut self, id: EntityId, position: Vec2) -> HostResult<()>;
    fn set_sprite_size(&mut self, id: EntityId, width: f32, height: f32) -> HostResult<()>;
    fn camera_position(&self) -> Vec2;
    fn set_camera_position(&mut self, position: Vec2);
    fn is_key_pressed(&self, key: Key) -> bool;
    fn delta_time(&self) -> f32;
    fn log(&self, message: &str);
}
