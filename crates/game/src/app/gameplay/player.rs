use engine::{EntityId, Host, HostResult, SpriteDesc, Tag};

use super::config::PlayerConfig;

pub(crate) fn spawn_player<H: Host + ?Sized>(
    host: &mut H,
    config: &PlayerConfig,
) -> HostResult<EntityId> {
    let id = host.spawn_visual_entity(
        SpriteDesc::square(config.size, config.color),
        config.spawn,
        config.z_order,
    );
    host.tag_entity(id, Tag::Player)?;
    host.tag_entity(id, Tag::CameraTarget)?;
    host.set_health(id, config.max_health)?;
    Ok(id)
}
