use std::collections::BTreeMap;

use engine::EntityId;

use super::agent::AgentState;
use super::health_bar::HealthBarState;
use super::movement::StaminaState;

/// Identifiers the binding has handed out, keyed by the role they play.
///
/// Lives beside the reloadable config, never inside it, so swapping config
/// keeps every cached id. Everything here can be rebuilt from the host.
#[derive(Debug, Default)]
pub(crate) struct RoleStore {
    pub(crate) player: Option<EntityId>,
    pub(crate) health_bars: BTreeMap<EntityId, HealthBarState>,
    pub(crate) stamina: BTreeMap<EntityId, StaminaState>,
    pub(crate) world_elements: Vec<EntityId>,
    pub(crate) agents: BTreeMap<EntityId, AgentState>,
}

impl RoleStore {
    pub(crate) fn health_bar(&self, tracked: EntityId) -> HealthBarState {
        self.health_bars.get(&tracked).copied().unwrap_or_default()
    }

    /// Unspawned bars are not kept, so ids the host never knew leave no
    /// entry behind.
    pub(crate) fn store_health_bar(&mut self, tracked: EntityId, state: HealthBarState) {
        if state == HealthBarState::Unspawned {
            self.health_bars.remove(&tracked);
        } else {
            self.health_bars.insert(tracked, state);
        }
    }

    /// Forgets every per-entity cache tied to `id`; returns its health bar
    /// state so the caller can remove the overlays.
    pub(crate) fn forget_entity(&mut self, id: EntityId) -> Option<HealthBarState> {
        if self.player == Some(id) {
            self.player = None;
        }
        self.stamina.remove(&id);
        self.agents.remove(&id);
        self.health_bars.remove(&id)
    }

    pub(crate) fn tracked_entity_count(&self) -> usize {
        usize::from(self.player.is_some()) + self.world_elements.len() + self.agents.len()
    }
}
