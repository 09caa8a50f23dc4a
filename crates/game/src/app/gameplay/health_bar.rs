use engine::{EntityId, Health, Host, HostError, HostResult, SpriteDesc, Tag, Vec2};

use super::config::HealthBarConfig;

/// Gap between background and foreground z so the fill draws on top.
const FOREGROUND_Z_LIFT: f32 = 0.01;

pub(crate) fn health_ratio(health: Health) -> f32 {
    let ratio = health.current / health.max.max(1.0);
    if ratio.is_nan() {
        return 0.0;
    }
    ratio.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BarLayout {
    pub(crate) anchor: Vec2,
    pub(crate) foreground_position: Vec2,
    pub(crate) foreground_width: f32,
}

/// Background sits centered on the anchor at full width; the foreground
/// shrinks from the right so its left edge stays put.
pub(crate) fn bar_layout(tracked: Vec2, health: Health, config: &HealthBarConfig) -> BarLayout {
    let anchor = Vec2::new(tracked.x, tracked.y + config.offset_y);
    let foreground_width = config.width * health_ratio(health);
    BarLayout {
        anchor,
        foreground_position: Vec2::new(
            anchor.x - (config.width - foreground_width) / 2.0,
            anchor.y,
        ),
        foreground_width,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum HealthBarState {
    #[default]
    Unspawned,
    Spawned {
        background: EntityId,
        foreground: EntityId,
    },
}

impl HealthBarState {
    pub(crate) fn overlay_ids(self) -> Option<[EntityId; 2]> {
        match self {
            HealthBarState::Unspawned => None,
            HealthBarState::Spawned {
                background,
                foreground,
            } => Some([background, foreground]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BarUpdate {
    Spawned,
    Respawned,
    Updated,
}

/// Spawns, moves and resizes the overlay pair for `tracked`. When the host
/// no longer knows `tracked`, its overlays are removed before the error is
/// returned.
pub(crate) fn update_health_bar<H: Host + ?Sized>(
    host: &mut H,
    tracked: EntityId,
    state: &mut HealthBarState,
    config: &HealthBarConfig,
) -> HostResult<BarUpdate> {
    let sampled = host
        .get_position(tracked)
        .and_then(|position| host.get_health(tracked).map(|health| (position, health)));
    let (position, health) = match sampled {
        Ok(sampled) => sampled,
        Err(HostError::UnknownEntity(gone)) if gone == tracked => {
            despawn_health_bar(host, state);
            return Err(HostError::UnknownEntity(gone));
        }
        Err(error) => return Err(error),
    };
    let layout = bar_layout(position, health, config);

    let [background, foreground] = match state.overlay_ids() {
        Some(ids) => ids,
        None => {
            *state = spawn_overlays(host, &layout, config)?;
            place_overlays(host, *state, &layout, config)?;
            return Ok(BarUpdate::Spawned);
        }
    };

    match place_overlays(host, *state, &layout, config) {
        Err(HostError::UnknownEntity(lost)) if lost == background || lost == foreground => {
            for id in [background, foreground] {
                let _ = host.despawn_entity(id);
            }
            *state = HealthBarState::Unspawned;
            *state = spawn_overlays(host, &layout, config)?;
            place_overlays(host, *state, &layout, config)?;
            Ok(BarUpdate::Respawned)
        }
        Err(error) => Err(error),
        Ok(()) => Ok(BarUpdate::Updated),
    }
}

pub(crate) fn despawn_health_bar<H: Host + ?Sized>(host: &mut H, state: &mut HealthBarState) {
    if let Some(ids) = state.overlay_ids() {
        for id in ids {
            let _ = host.despawn_entity(id);
        }
    }
    *state = HealthBarState::Unspawned;
}

fn spawn_overlays<H: Host + ?Sized>(
    host: &mut H,
    layout: &BarLayout,
    config: &HealthBarConfig,
) -> HostResult<HealthBarState> {
    let background = host.spawn_visual_entity(
        SpriteDesc {
            width: config.width,
            height: config.height,
            color: config.background,
        },
        layout.anchor,
        config.z_order,
    );
    let foreground = host.spawn_visual_entity(
        SpriteDesc {
            width: layout.foreground_width,
            height: config.height,
            color: config.foreground,
        },
        layout.foreground_position,
        config.z_order + FOREGROUND_Z_LIFT,
    );
    host.tag_entity(background, Tag::Overlay)?;
    host.tag_entity(foreground, Tag::Overlay)?;
    Ok(HealthBarState::Spawned {
        background,
        foreground,
    })
}

fn place_overlays<H: Host + ?Sized>(
    host: &mut H,
    state: HealthBarState,
    layout: &BarLayout,
    config: &HealthBarConfig,
) -> HostResult<()> {
    let HealthBarState::Spawned {
        background,
        foreground,
    } = state
    else {
        return Ok(());
    };
    host.set_position(background, layout.anchor)?;
    host.set_sprite_size(background, config.width, config.height)?;
    host.set_position(foreground, layout.foreground_position)?;
    host.set_sprite_size(foreground, layout.foreground_width, config.height)
}
