use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::host::{Health, Host, HostError, HostResult, SpriteDesc, Tag};
use super::input::{Key, KeyStates};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    keys: KeyStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, keys: KeyStates) -> Self {
        Self {
            quit_requested,
            keys,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys.is_down(key)
    }

    pub fn with_key_down(mut self, key: Key, is_down: bool) -> Self {
        self.keys.set(key, is_down);
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = Key> + '_ {
        Key::ALL.into_iter().filter(|key| self.keys.is_down(*key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn lerp(self, target: Vec2, t: f32) -> Vec2 {
        self + (target - self) * t
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Camera2D {
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub z_order: f32,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub transform: Transform,
    pub sprite: SpriteDesc,
    pub health: Option<Health>,
    tags: Vec<Tag>,
    applied_spawn_order: u64,
}

impl Entity {
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Order in which the entity landed in the world. Stable across
    /// despawns of other entities, used to break z-order ties.
    pub fn spawn_order(&self) -> u64 {
        self.applied_spawn_order
    }

    fn add_tag(&mut self, tag: Tag) {
        if !self.has_tag(tag) {
            self.tags.push(tag);
        }
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Host-owned entity storage for one scene.
///
/// Spawns and despawns are queued and land in `apply_pending`, which the
/// loop runs after every tick. Lookups see queued spawns immediately and
/// hide entities already queued for despawn, so a behavior can spawn and
/// then position an entity within the same call.
#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    next_applied_spawn_order: u64,
    camera: Camera2D,
    input: InputSnapshot,
    delta_seconds: f32,
}

impl SceneWorld {
    pub fn spawn(&mut self, transform: Transform, sprite: SpriteDesc) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            transform,
            sprite,
            health: None,
            tags: Vec::new(),
            applied_spawn_order: 0,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_spawns.is_empty() {
            for mut entity in self.pending_spawns.drain(..) {
                entity.applied_spawn_order = self.next_applied_spawn_order;
                self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
                self.entities.push(entity);
            }
        }

        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_unstable();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.pending_despawns.clear();
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.next_applied_spawn_order = 0;
        self.camera = Camera2D::default();
        self.input = InputSnapshot::empty();
        self.delta_seconds = 0.0;
    }

    /// Publishes the per-tick state behaviors read through `Host`.
    pub fn begin_tick(&mut self, fixed_dt_seconds: f32, input: InputSnapshot) {
        self.delta_seconds = fixed_dt_seconds.max(0.0);
        self.input = input;
    }

    pub fn input(&self) -> &InputSnapshot {
        &self.input
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_with_tag(&self, tag: Tag) -> impl Iterator<Item = &Entity> + '_ {
        self.entities
            .iter()
            .chain(self.pending_spawns.iter())
            .filter(move |entity| entity.has_tag(tag) && !self.is_pending_despawn(entity.id))
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        if self.is_pending_despawn(id) {
            return None;
        }
        self.entities
            .iter()
            .chain(self.pending_spawns.iter())
            .find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if self.is_pending_despawn(id) {
            return None;
        }
        self.entities
            .iter_mut()
            .chain(self.pending_spawns.iter_mut())
            .find(|entity| entity.id == id)
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    fn is_pending_despawn(&self, id: EntityId) -> bool {
        self.pending_despawns.contains(&id)
    }

    fn entity_or_err(&self, id: EntityId) -> HostResult<&Entity> {
        self.find_entity(id).ok_or(HostError::UnknownEntity(id))
    }

    fn entity_mut_or_err(&mut self, id: EntityId) -> HostResult<&mut Entity> {
        self.find_entity_mut(id).ok_or(HostError::UnknownEntity(id))
    }
}

impl Host for SceneWorld {
    fn spawn_visual_entity(
        &mut self,
        sprite: SpriteDesc,
        position: Vec2,
        z_order: f32,
    ) -> EntityId {
        self.spawn(Transform { position, z_order }, sprite)
    }

    fn despawn_entity(&mut self, id: EntityId) -> HostResult<()> {
        if self.is_pending_despawn(id) || !self.despawn(id) {
            return Err(HostError::UnknownEntity(id));
        }
        Ok(())
    }

    fn tag_entity(&mut self, id: EntityId, tag: Tag) -> HostResult<()> {
        self.entity_mut_or_err(id)?.add_tag(tag);
        Ok(())
    }

    fn set_health(&mut self, id: EntityId, value: f32) -> HostResult<()> {
        let entity = self.entity_mut_or_err(id)?;
        match entity.health.as_mut() {
            Some(health) => health.current = value,
            None => {
                entity.health = Some(Health {
                    current: value,
                    max: value,
                })
            }
        }
        Ok(())
    }

    fn get_health(&self, id: EntityId) -> HostResult<Health> {
        self.entity_or_err(id)?
            .health
            .ok_or(HostError::NoHealth(id))
    }

    fn get_position(&self, id: EntityId) -> HostResult<Vec2> {
        Ok(self.entity_or_err(id)?.transform.position)
    }

    fn set_position(&mut self, id: EntityId, position: Vec2) -> HostResult<()> {
        self.entity_mut_or_err(id)?.transform.position = position;
        Ok(())
    }

    fn set_sprite_size(&mut self, id: EntityId, width: f32, height: f32) -> HostResult<()> {
        let sprite = &mut self.entity_mut_or_err(id)?.sprite;
        sprite.width = width;
        sprite.height = height;
        Ok(())
    }

    fn camera_position(&self) -> Vec2 {
        self.camera.position
    }

    fn set_camera_position(&mut self, position: Vec2) {
        self.camera.position = position;
    }

    fn is_key_pressed(&self, key: Key) -> bool {
        self.input.is_key_pressed(key)
    }

    fn delta_time(&self) -> f32 {
        self.delta_seconds
    }

    fn log(&self, message: &str) {
        info!(target: "behavior", "{message}");
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

/// Owns one scene and the world it mutates, and enforces the
/// load/update/unload lifecycle.
pub struct SceneRunner {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneRunner {
    pub fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    pub fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        self.world.begin_tick(fixed_dt_seconds, *input);
        self.scene.update(fixed_dt_seconds, input, &mut self.world)
    }

    pub fn apply_pending(&mut self) {
        self.world.apply_pending();
    }

    pub fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }

    pub fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
            self.world.clear();
            self.is_loaded = false;
        }
    }
}
