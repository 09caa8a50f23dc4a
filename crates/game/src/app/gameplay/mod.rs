mod agent;
mod binding;
mod camera;
mod config;
mod health_bar;
mod movement;
mod player;
mod reload;
mod roles;
mod scene;
mod world;

pub(crate) use config::{BehaviorConfig, ConfigError};
pub(crate) use reload::{ConfigReloader, DEFAULT_POLL_INTERVAL_TICKS};
pub(crate) use scene::GameplayScene;

#[cfg(test)]
mod tests;
