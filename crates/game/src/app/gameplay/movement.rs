use engine::{EntityId, Host, HostResult, Key, Vec2};

use super::config::{PlayerConfig, StaminaConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoveAxis {
    Up,
    Down,
    Left,
    Right,
}

impl MoveAxis {
    /// Both keys of an axis drive it; either one held is enough.
    pub(crate) const fn keys(self) -> [Key; 2] {
        match self {
            MoveAxis::Up => [Key::W, Key::Up],
            MoveAxis::Down => [Key::S, Key::Down],
            MoveAxis::Left => [Key::A, Key::Left],
            MoveAxis::Right => [Key::D, Key::Right],
        }
    }
}

/// Logical movement axes, resolved once per update from raw key state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MoveIntent {
    pub(crate) up: bool,
    pub(crate) down: bool,
    pub(crate) left: bool,
    pub(crate) right: bool,
}

impl MoveIntent {
    pub(crate) fn resolve(is_pressed: impl Fn(Key) -> bool) -> Self {
        let axis = |axis: MoveAxis| axis.keys().into_iter().any(&is_pressed);
        Self {
            up: axis(MoveAxis::Up),
            down: axis(MoveAxis::Down),
            left: axis(MoveAxis::Left),
            right: axis(MoveAxis::Right),
        }
    }

    /// Unnormalized direction; opposite axes cancel.
    pub(crate) fn direction(self) -> Vec2 {
        let mut x = 0.0f32;
        let mut y = 0.0f32;
        if self.right {
            x += 1.0;
        }
        if self.left {
            x -= 1.0;
        }
        if self.up {
            y += 1.0;
        }
        if self.down {
            y -= 1.0;
        }
        Vec2 { x, y }
    }

    pub(crate) fn is_idle(self) -> bool {
        self.direction() == Vec2::ZERO
    }
}

pub(crate) fn movement_delta(intent: MoveIntent, dt_seconds: f32, speed: f32) -> Vec2 {
    let Vec2 { mut x, mut y } = intent.direction();

    let len_sq = x * x + y * y;
    if len_sq > 0.0 {
        let inv_len = len_sq.sqrt().recip();
        x *= inv_len;
        y *= inv_len;
    }

    Vec2 {
        x: x * speed * dt_seconds,
        y: y * speed * dt_seconds,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StaminaState {
    pub(crate) current: f32,
}

impl StaminaState {
    pub(crate) fn full(config: &StaminaConfig) -> Self {
        Self {
            current: config.max,
        }
    }

    pub(crate) fn speed_factor(self, config: &StaminaConfig) -> f32 {
        let ratio = (self.current / config.max.max(f32::EPSILON)).clamp(0.0, 1.0);
        config.min_speed_factor + (1.0 - config.min_speed_factor) * ratio
    }

    /// Drains while moving, recharges while idle; stays within `[0, max]`.
    pub(crate) fn step(&mut self, config: &StaminaConfig, moving: bool, dt_seconds: f32) {
        self.current = if moving {
            (self.current - config.drain_rate * dt_seconds).max(0.0)
        } else {
            (self.current + config.recharge_rate * dt_seconds).min(config.max)
        };
    }
}

/// Moves `player` by one frame of keyboard input and returns its new
/// position. `stamina` is only consulted when the config enables it.
pub(crate) fn update_player<H: Host + ?Sized>(
    host: &mut H,
    player: EntityId,
    config: &PlayerConfig,
    stamina: Option<&mut StaminaState>,
) -> HostResult<Vec2> {
    let position = host.get_position(player)?;
    let dt = host.delta_time().max(0.0);
    let intent = MoveIntent::resolve(|key| host.is_key_pressed(key));

    let mut speed = config.speed;
    if config.stamina.enabled {
        if let Some(stamina) = stamina {
            speed *= stamina.speed_factor(&config.stamina);
            stamina.step(&config.stamina, !intent.is_idle(), dt);
        }
    }

    let next = position + movement_delta(intent, dt, speed);
    host.set_position(player, next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent_from(keys: &[Key]) -> MoveIntent {
        MoveIntent::resolve(|key| keys.contains(&key))
    }

    fn assert_vec2_close(actual: Vec2, expected: Vec2) {
        assert!(
            (actual.x - expected.x).abs() < 1e-4 && (actual.y - expected.y).abs() < 1e-4,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn both_key_aliases_drive_each_axis() {
        assert!(intent_from(&[Key::W]).up);
        assert!(intent_from(&[Key::Up]).up);
        assert!(intent_from(&[Key::S]).down);
        assert!(intent_from(&[Key::Down]).down);
        assert!(intent_from(&[Key::A]).left);
        assert!(intent_from(&[Key::Left]).left);
        assert!(intent_from(&[Key::D]).right);
        assert!(intent_from(&[Key::Right]).right);
        assert_eq!(intent_from(&[Key::Escape]), MoveIntent::default());
    }

    #[test]
    fn axis_aligned_move_scales_by_speed_and_dt() {
        let delta = movement_delta(intent_from(&[Key::D]), 0.5, 200.0);
        assert_vec2_close(delta, Vec2::new(100.0, 0.0));

        let delta = movement_delta(intent_from(&[Key::Down]), 0.25, 200.0);
        assert_vec2_close(delta, Vec2::new(0.0, -50.0));
    }

    #[test]
    fn diagonal_speed_matches_axis_speed() {
        let dt = 1.0 / 60.0;
        let speed = 200.0;
        for keys in [
            [Key::W, Key::D],
            [Key::Up, Key::Left],
            [Key::S, Key::A],
            [Key::Down, Key::Right],
        ] {
            let delta = movement_delta(intent_from(&keys), dt, speed);
            assert!((delta.length() - speed * dt).abs() < 1e-4, "{keys:?}");
        }
    }

    #[test]
    fn opposite_keys_cancel_without_nan() {
        let intent = intent_from(&[Key::W, Key::S, Key::A, Key::Right]);
        assert!(intent.is_idle());
        assert_eq!(movement_delta(intent, 0.016, 200.0), Vec2::ZERO);

        let only_vertical = intent_from(&[Key::Left, Key::D, Key::Up]);
        assert_vec2_close(movement_delta(only_vertical, 1.0, 10.0), Vec2::new(0.0, 10.0));
    }

    #[test]
    fn stamina_speed_factor_spans_min_to_full() {
        let config = StaminaConfig {
            enabled: true,
            ..StaminaConfig::default()
        };
        assert_eq!(StaminaState::full(&config).speed_factor(&config), 1.0);
        assert!((StaminaState { current: 0.0 }.speed_factor(&config) - 0.2).abs() < 1e-6);
        assert!((StaminaState { current: 50.0 }.speed_factor(&config) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn stamina_drains_while_moving_and_recharges_while_idle() {
        let config = StaminaConfig::default();
        let mut stamina = StaminaState::full(&config);

        stamina.step(&config, true, 1.0);
        assert_eq!(stamina.current, 80.0);
        for _ in 0..10 {
            stamina.step(&config, true, 1.0);
        }
        assert_eq!(stamina.current, 0.0);

        stamina.step(&config, false, 2.0);
        assert_eq!(stamina.current, 30.0);
        for _ in 0..10 {
            stamina.step(&config, false, 1.0);
        }
        assert_eq!(stamina.current, config.max);
    }
}
