use std::fmt::Display;

use engine::{Color, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on grid cells per axis; keeps a typo in `ground_size` from
/// spawning millions of markers.
pub(crate) const MAX_GRID_STEPS: f32 = 1000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum ConfigError {
    #[error("parse behavior config: {message}")]
    Parse { message: String },
    #[error("parse behavior config at {path}: {message}")]
    ParseAt { path: String, message: String },
    #[error("validation failed at {path}: {message}")]
    Invalid { path: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct BehaviorConfig {
    pub(crate) player: PlayerConfig,
    pub(crate) camera: CameraConfig,
    pub(crate) health_bar: HealthBarConfig,
    pub(crate) world: WorldConfig,
    pub(crate) agent: AgentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlayerConfig {
    pub(crate) speed: f32,
    pub(crate) size: f32,
    pub(crate) color: Color,
    pub(crate) max_health: f32,
    pub(crate) spawn: Vec2,
    pub(crate) z_order: f32,
    pub(crate) stamina: StaminaConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 200.0,
            size: 50.0,
            color: Color::rgb(0.204, 0.596, 0.859),
            max_health: 100.0,
            spawn: Vec2::ZERO,
            z_order: 0.0,
            stamina: StaminaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct StaminaConfig {
    pub(crate) enabled: bool,
    pub(crate) max: f32,
    pub(crate) drain_rate: f32,
    pub(crate) recharge_rate: f32,
    /// Speed multiplier at zero stamina; full stamina always moves at 1.0.
    pub(crate) min_speed_factor: f32,
}

impl Default for StaminaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max: 100.0,
            drain_rate: 20.0,
            recharge_rate: 15.0,
            min_speed_factor: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CameraConfig {
    pub(crate) follow_speed: f32,
    pub(crate) deadzone: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_speed: 5.0,
            deadzone: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct HealthBarConfig {
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) offset_y: f32,
    pub(crate) background: Color,
    pub(crate) foreground: Color,
    pub(crate) z_order: f32,
}

impl Default for HealthBarConfig {
    fn default() -> Self {
        Self {
            width: 50.0,
            height: 6.0,
            offset_y: 40.0,
            background: Color::rgb(0.2, 0.2, 0.2),
            foreground: Color::rgb(0.18, 0.8, 0.443),
            z_order: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorldConfig {
    pub(crate) ground_size: f32,
    pub(crate) grid_spacing: f32,
    pub(crate) marker_size: f32,
    pub(crate) ground_color: Color,
    pub(crate) marker_color: Color,
    pub(crate) ground_z: f32,
    pub(crate) marker_z: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            ground_size: 2000.0,
            grid_spacing: 200.0,
            marker_size: 20.0,
            ground_color: Color::rgb(0.176, 0.353, 0.153),
            marker_color: Color::rgb(0.333, 0.333, 0.333),
            ground_z: -1.0,
            marker_z: -0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AgentConfig {
    pub(crate) enabled: bool,
    pub(crate) orbit_radius: f32,
    /// Radians per second.
    pub(crate) orbit_speed: f32,
    pub(crate) move_speed: f32,
    pub(crate) circle_duration: f32,
    pub(crate) interact_duration: f32,
    pub(crate) size: f32,
    pub(crate) color: Color,
    pub(crate) z_order: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            orbit_radius: 150.0,
            orbit_speed: 1.5,
            move_speed: 300.0,
            circle_duration: 5.0,
            interact_duration: 0.4,
            size: 30.0,
            color: Color::rgb(0.906, 0.298, 0.235),
            z_order: 0.1,
        }
    }
}

impl BehaviorConfig {
    pub(crate) fn parse_json(raw: &str) -> Result<Self, ConfigError> {
        let config = parse_config_json(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let player = &self.player;
        non_negative("player.speed", player.speed)?;
        non_negative("player.size", player.size)?;
        color("player.color", player.color)?;
        non_negative("player.max_health", player.max_health)?;
        finite("player.spawn.x", player.spawn.x)?;
        finite("player.spawn.y", player.spawn.y)?;
        finite("player.z_order", player.z_order)?;

        let stamina = &player.stamina;
        positive("player.stamina.max", stamina.max)?;
        non_negative("player.stamina.drain_rate", stamina.drain_rate)?;
        non_negative("player.stamina.recharge_rate", stamina.recharge_rate)?;
        unit_interval("player.stamina.min_speed_factor", stamina.min_speed_factor)?;

        non_negative("camera.follow_speed", self.camera.follow_speed)?;
        non_negative("camera.deadzone", self.camera.deadzone)?;

        let bar = &self.health_bar;
        non_negative("health_bar.width", bar.width)?;
        non_negative("health_bar.height", bar.height)?;
        finite("health_bar.offset_y", bar.offset_y)?;
        color("health_bar.background", bar.background)?;
        color("health_bar.foreground", bar.foreground)?;
        finite("health_bar.z_order", bar.z_order)?;

        let world = &self.world;
        non_negative("world.ground_size", world.ground_size)?;
        positive("world.grid_spacing", world.grid_spacing)?;
        let steps = world.ground_size / world.grid_spacing;
        if steps > MAX_GRID_STEPS {
            return Err(expected_actual(
                "world.grid_spacing",
                format!("at most {MAX_GRID_STEPS} grid steps per axis"),
                steps.floor(),
            ));
        }
        non_negative("world.marker_size", world.marker_size)?;
        color("world.ground_color", world.ground_color)?;
        color("world.marker_color", world.marker_color)?;
        finite("world.ground_z", world.ground_z)?;
        finite("world.marker_z", world.marker_z)?;

        let agent = &self.agent;
        non_negative("agent.orbit_radius", agent.orbit_radius)?;
        finite("agent.orbit_speed", agent.orbit_speed)?;
        non_negative("agent.move_speed", agent.move_speed)?;
        non_negative("agent.circle_duration", agent.circle_duration)?;
        non_negative("agent.interact_duration", agent.interact_duration)?;
        non_negative("agent.size", agent.size)?;
        color("agent.color", agent.color)?;
        finite("agent.z_order", agent.z_order)?;
        Ok(())
    }
}

fn parse_config_json(raw: &str) -> Result<BehaviorConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, BehaviorConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let message = error.into_inner().to_string();
            if path.is_empty() || path == "." {
                Err(ConfigError::Parse { message })
            } else {
                Err(ConfigError::ParseAt { path, message })
            }
        }
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        message: message.into(),
    }
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> ConfigError {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

fn finite(path: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(expected_actual(path, "finite number", value))
    }
}

fn non_negative(path: &str, value: f32) -> Result<(), ConfigError> {
    finite(path, value)?;
    if value < 0.0 {
        return Err(expected_actual(path, "non-negative number", value));
    }
    Ok(())
}

fn positive(path: &str, value: f32) -> Result<(), ConfigError> {
    finite(path, value)?;
    if value <= 0.0 {
        return Err(expected_actual(path, "positive number", value));
    }
    Ok(())
}

fn unit_interval(path: &str, value: f32) -> Result<(), ConfigError> {
    finite(path, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(expected_actual(path, "value in [0, 1]", value));
    }
    Ok(())
}

fn color(path: &str, value: Color) -> Result<(), ConfigError> {
    unit_interval(&format!("{path}.r"), value.r)?;
    unit_interval(&format!("{path}.g"), value.g)?;
    unit_interval(&format!("{path}.b"), value.b)
}
