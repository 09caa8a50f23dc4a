use engine::{EntityId, Host, HostError};
use tracing::{debug, info, warn};

use super::agent::{spawn_agent, update_agent};
use super::camera::update_camera;
use super::config::BehaviorConfig;
use super::health_bar::{despawn_health_bar, update_health_bar, BarUpdate};
use super::movement::{update_player, StaminaState};
use super::player::spawn_player;
use super::roles::RoleStore;
use super::world::{despawn_world, spawn_world};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReloadOutcome {
    pub(crate) world_changed: bool,
    pub(crate) agent_toggled: bool,
}

/// Binds gameplay behaviors to host entities.
///
/// Holds the active `BehaviorConfig` and the `RoleStore` side by side.
/// Every host failure is contained here: it is logged and the call becomes
/// a no-op for that frame.
#[derive(Debug, Default)]
pub(crate) struct EntityBinding {
    config: BehaviorConfig,
    roles: RoleStore,
}

impl EntityBinding {
    pub(crate) fn new(config: BehaviorConfig) -> Self {
        Self {
            config,
            roles: RoleStore::default(),
        }
    }

    pub(crate) fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn roles(&self) -> &RoleStore {
        &self.roles
    }

    pub(crate) fn player(&self) -> Option<EntityId> {
        self.roles.player
    }

    /// Swaps the config between frames. Cached ids are kept.
    pub(crate) fn reload(&mut self, config: BehaviorConfig) -> ReloadOutcome {
        let outcome = ReloadOutcome {
            world_changed: config.world != self.config.world,
            agent_toggled: config.agent.enabled != self.config.agent.enabled,
        };
        self.config = config;
        info!(
            world_changed = outcome.world_changed,
            agent_toggled = outcome.agent_toggled,
            tracked_entities = self.roles.tracked_entity_count(),
            "config_reloaded"
        );
        outcome
    }

    pub(crate) fn spawn_player<H: Host + ?Sized>(&mut self, host: &mut H) -> Option<EntityId> {
        match spawn_player(host, &self.config.player) {
            Ok(id) => {
                self.roles.player = Some(id);
                self.roles
                    .stamina
                    .insert(id, StaminaState::full(&self.config.player.stamina));
                host.log(&format!("player spawned as {id}"));
                Some(id)
            }
            Err(error) => {
                warn!(error = %error, "player_spawn_failed");
                None
            }
        }
    }

    pub(crate) fn update_player<H: Host + ?Sized>(&mut self, host: &mut H, player: EntityId) {
        let config = &self.config.player;
        let stamina = if config.stamina.enabled {
            Some(
                self.roles
                    .stamina
                    .entry(player)
                    .or_insert_with(|| StaminaState::full(&config.stamina)),
            )
        } else {
            None
        };
        if let Err(error) = update_player(host, player, config, stamina) {
            warn_host_error("player_update_failed", player, error);
        }
    }

    pub(crate) fn update_camera<H: Host + ?Sized>(&mut self, host: &mut H, target: EntityId) {
        if let Err(error) = update_camera(host, target, &self.config.camera) {
            warn_host_error("camera_update_failed", target, error);
        }
    }

    /// Spawns the ground and grid markers, replacing any earlier set.
    pub(crate) fn spawn_world<H: Host + ?Sized>(&mut self, host: &mut H) -> &[EntityId] {
        if !self.roles.world_elements.is_empty() {
            self.despawn_world(host);
        }
        if let Err(error) = spawn_world(host, &self.config.world, &mut self.roles.world_elements) {
            warn!(
                error = %error,
                spawned = self.roles.world_elements.len(),
                "world_spawn_failed"
            );
        }
        let markers = self.roles.world_elements.len().saturating_sub(1);
        host.log(&format!("world spawned with {markers} grid markers"));
        &self.roles.world_elements
    }

    pub(crate) fn world_elements(&self) -> &[EntityId] {
        &self.roles.world_elements
    }

    pub(crate) fn despawn_world<H: Host + ?Sized>(&mut self, host: &mut H) {
        let requested = self.roles.world_elements.len();
        let removed = despawn_world(host, &mut self.roles.world_elements);
        if removed < requested {
            warn!(requested, removed, "world_elements_already_gone");
        }
        debug!(removed, "world_despawned");
    }

    pub(crate) fn update_healthbar<H: Host + ?Sized>(&mut self, host: &mut H, tracked: EntityId) {
        let mut state = self.roles.health_bar(tracked);
        let outcome = update_health_bar(host, tracked, &mut state, &self.config.health_bar);
        self.roles.store_health_bar(tracked, state);
        match outcome {
            Ok(BarUpdate::Spawned) => debug!(entity = %tracked, "health_bar_spawned"),
            Ok(BarUpdate::Respawned) => {
                warn!(entity = %tracked, "health_bar_overlay_lost; respawned")
            }
            Ok(BarUpdate::Updated) => {}
            Err(error) => warn_host_error("health_bar_update_failed", tracked, error),
        }
    }

    /// Removes the player and every overlay or cache tied to it.
    pub(crate) fn despawn_player<H: Host + ?Sized>(&mut self, host: &mut H, player: EntityId) {
        if let Some(mut bar) = self.roles.forget_entity(player) {
            despawn_health_bar(host, &mut bar);
        }
        if let Err(error) = host.despawn_entity(player) {
            warn_host_error("player_despawn_failed", player, error);
        }
    }

    pub(crate) fn spawn_agent<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        anchor: EntityId,
    ) -> Option<EntityId> {
        let anchor_position = match host.get_position(anchor) {
            Ok(position) => position,
            Err(error) => {
                warn_host_error("agent_spawn_failed", anchor, error);
                return None;
            }
        };
        match spawn_agent(host, anchor_position, &self.config.agent) {
            Ok((id, state)) => {
                self.roles.agents.insert(id, state);
                host.log(&format!("orbiter agent spawned as {id}"));
                Some(id)
            }
            Err(error) => {
                warn!(error = %error, "agent_spawn_failed");
                None
            }
        }
    }

    pub(crate) fn update_agents<H: Host + ?Sized>(&mut self, host: &mut H, anchor: EntityId) {
        let mut lost = Vec::new();
        for (&agent, state) in self.roles.agents.iter_mut() {
            match update_agent(host, agent, anchor, state, &self.config.agent) {
                Ok(_) => {}
                Err(HostError::UnknownEntity(id)) if id == agent => lost.push(agent),
                Err(error) => warn_host_error("agent_update_failed", agent, error),
            }
        }
        for agent in lost {
            warn!(entity = %agent, "agent_lost; dropped");
            self.roles.agents.remove(&agent);
        }
    }

    pub(crate) fn despawn_agents<H: Host + ?Sized>(&mut self, host: &mut H) {
        for agent in std::mem::take(&mut self.roles.agents).into_keys() {
            if let Err(error) = host.despawn_entity(agent) {
                warn_host_error("agent_despawn_failed", agent, error);
            }
        }
    }

    pub(crate) fn has_agents(&self) -> bool {
        !self.roles.agents.is_empty()
    }
}

fn warn_host_error(event: &'static str, entity: EntityId, error: HostError) {
    warn!(event, entity = %entity, error = %error, "behavior_skipped");
}
