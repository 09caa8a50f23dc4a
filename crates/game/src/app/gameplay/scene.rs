use engine::{Host, InputSnapshot, Scene, SceneCommand, SceneWorld};
use tracing::info;

use super::binding::EntityBinding;
use super::config::BehaviorConfig;
use super::reload::ConfigReloader;

/// Drives the bound behaviors once per tick: config reload first, then
/// player movement, health bar, camera follow and agents.
pub(crate) struct GameplayScene {
    binding: EntityBinding,
    reloader: Option<ConfigReloader>,
    ticks: u64,
}

impl GameplayScene {
    pub(crate) fn new(config: BehaviorConfig, reloader: Option<ConfigReloader>) -> Self {
        Self {
            binding: EntityBinding::new(config),
            reloader,
            ticks: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn binding(&self) -> &EntityBinding {
        &self.binding
    }

    fn poll_reload(&mut self, world: &mut SceneWorld) {
        let Some(config) = self.reloader.as_mut().and_then(ConfigReloader::tick) else {
            return;
        };
        let outcome = self.binding.reload(config);
        if outcome.world_changed {
            self.binding.spawn_world(world);
        }
        if outcome.agent_toggled {
            self.sync_agents(world);
        }
    }

    fn sync_agents(&mut self, world: &mut SceneWorld) {
        match (self.binding.config().agent.enabled, self.binding.player()) {
            (true, Some(player)) if !self.binding.has_agents() => {
                self.binding.spawn_agent(world, player);
            }
            (false, _) => self.binding.despawn_agents(world),
            _ => {}
        }
    }
}

impl Scene for GameplayScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.ticks = 0;
        self.binding.spawn_world(world);
        if let Some(player) = self.binding.spawn_player(world) {
            if let Ok(position) = world.get_position(player) {
                world.set_camera_position(position);
            }
        }
        self.sync_agents(world);
        info!(
            world_elements = self.binding.world_elements().len(),
            player = ?self.binding.player().map(|id| id.0),
            hot_reload = ?self.reloader.as_ref().map(|reloader| reloader.path().display().to_string()),
            "gameplay_loaded"
        );
    }

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        self.ticks = self.ticks.saturating_add(1);
        self.poll_reload(world);

        if let Some(player) = self.binding.player() {
            self.binding.update_player(world, player);
            self.binding.update_healthbar(world, player);
            self.binding.update_camera(world, player);
            self.binding.update_agents(world, player);
        }
        SceneCommand::None
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        self.binding.despawn_agents(world);
        if let Some(player) = self.binding.player() {
            self.binding.despawn_player(world, player);
        }
        self.binding.despawn_world(world);
    }

    fn debug_title(&self, world: &SceneWorld) -> Option<String> {
        let player = self
            .binding
            .player()
            .and_then(|id| world.get_position(id).ok())?;
        let camera = world.camera_position();
        Some(format!(
            "gridrun | tick {} | player ({:.1}, {:.1}) | camera ({:.1}, {:.1}) | entities {}",
            self.ticks,
            player.x,
            player.y,
            camera.x,
            camera.y,
            world.entity_count()
        ))
    }
}
