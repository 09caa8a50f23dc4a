use engine::{EntityId, Host, HostResult, Vec2};

use super::config::CameraConfig;

/// One frame of camera chase. Returns `None` when the camera should stay
/// put: inside the deadzone, or when the lerp factor is not a usable
/// positive number.
pub(crate) fn follow_step(
    camera: Vec2,
    target: Vec2,
    config: &CameraConfig,
    dt_seconds: f32,
) -> Option<Vec2> {
    if camera.distance(target) <= config.deadzone {
        return None;
    }

    let raw_factor = config.follow_speed * dt_seconds;
    if !raw_factor.is_finite() || raw_factor <= 0.0 {
        return None;
    }

    Some(camera.lerp(target, raw_factor.min(1.0)))
}

pub(crate) fn update_camera<H: Host + ?Sized>(
    host: &mut H,
    target: EntityId,
    config: &CameraConfig,
) -> HostResult<Vec2> {
    let target_position = host.get_position(target)?;
    let camera = host.camera_position();
    match follow_step(camera, target_position, config, host.delta_time()) {
        Some(next) => {
            host.set_camera_position(next);
            Ok(next)
        }
        None => Ok(camera),
    }
}
