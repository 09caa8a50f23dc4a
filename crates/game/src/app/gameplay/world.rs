use engine::{EntityId, Host, HostResult, SpriteDesc, Tag, Vec2};

use super::config::WorldConfig;

const STEP_RATIO_TOLERANCE: f32 = 1e-5;

/// Whole grid cells per axis. A trailing partial cell is dropped, but a
/// ratio within float rounding of an integer counts as that integer, so
/// `0.9 / 0.3` is three cells and not two.
pub(crate) fn grid_steps(ground_size: f32, spacing: f32) -> u32 {
    if !(ground_size.is_finite() && spacing.is_finite()) || spacing <= 0.0 || ground_size <= 0.0 {
        return 0;
    }
    let ratio = ground_size / spacing;
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= ratio * STEP_RATIO_TOLERANCE {
        nearest as u32
    } else {
        ratio.floor() as u32
    }
}

/// Marker positions on the integer lattice `k * spacing` with `k` in
/// `[-steps/2, steps - steps/2)` on both axes, origin excluded.
///
/// The lattice is anchored on the origin cell, so for an even step count it
/// is lopsided: the default 2000 / 200 grid puts markers from -1000 to 800 on
/// each axis. Markers land on the left and bottom ground edges but not on
/// the right and top ones.
pub(crate) fn grid_positions(config: &WorldConfig) -> Vec<Vec2> {
    let steps = i64::from(grid_steps(config.ground_size, config.grid_spacing));
    if steps == 0 {
        return Vec::new();
    }
    let low = -(steps / 2);
    let high = steps - steps / 2;

    let mut positions = Vec::with_capacity((steps * steps - 1) as usize);
    for kx in low..high {
        for ky in low..high {
            if kx == 0 && ky == 0 {
                continue;
            }
            positions.push(Vec2::new(
                kx as f32 * config.grid_spacing,
                ky as f32 * config.grid_spacing,
            ));
        }
    }
    positions
}

/// Spawns ground then markers, appending every id to `elements` as it is
/// created so a failure part way through still leaves them removable.
pub(crate) fn spawn_world<H: Host + ?Sized>(
    host: &mut H,
    config: &WorldConfig,
    elements: &mut Vec<EntityId>,
) -> HostResult<()> {
    let ground = host.spawn_visual_entity(
        SpriteDesc::square(config.ground_size, config.ground_color),
        Vec2::ZERO,
        config.ground_z,
    );
    elements.push(ground);
    host.tag_entity(ground, Tag::WorldElement)?;

    for position in grid_positions(config) {
        let marker = host.spawn_visual_entity(
            SpriteDesc::square(config.marker_size, config.marker_color),
            position,
            config.marker_z,
        );
        elements.push(marker);
        host.tag_entity(marker, Tag::WorldElement)?;
    }
    Ok(())
}

/// Returns how many elements the host still knew about.
pub(crate) fn despawn_world<H: Host + ?Sized>(host: &mut H, elements: &mut Vec<EntityId>) -> usize {
    elements
        .drain(..)
        .filter(|id| host.despawn_entity(*id).is_ok())
        .count()
}
