use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use engine::{
    resolve_app_paths, write_text_if_missing, InputFeed, LoopConfig, NoInput, Pacing,
    ReloadError, Scene, StartupError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::{
    BehaviorConfig, ConfigError, ConfigReloader, GameplayScene, DEFAULT_POLL_INTERVAL_TICKS,
};
use super::input_script::{InputScriptError, ScriptedInput};

const CONFIG_ENV_VAR: &str = "GRIDRUN_CONFIG";
const INPUT_SCRIPT_ENV_VAR: &str = "GRIDRUN_INPUT_SCRIPT";
const MAX_TICKS_ENV_VAR: &str = "GRIDRUN_MAX_TICKS";
const UNPACED_ENV_VAR: &str = "GRIDRUN_UNPACED";
const DEFAULT_CONFIG_FILE: &str = "behavior.json";

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Reload(#[from] ReloadError),
    #[error("behavior config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error("failed to read behavior config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize default behavior config: {0}")]
    SerializeDefaults(#[source] serde_json::Error),
    #[error(transparent)]
    InputScript(#[from] InputScriptError),
    #[error("environment variable {var} has invalid value '{value}': expected {expected}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) input: Box<dyn InputFeed>,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== gridrun startup ===");

    let config_path = resolve_config_path()?;
    let (behavior, applied_text) = load_or_create_config(&config_path)?;
    info!(
        path = %config_path.display(),
        stamina = behavior.player.stamina.enabled,
        agent = behavior.agent.enabled,
        "behavior_config_loaded"
    );
    let reloader = match ConfigReloader::new(
        &config_path,
        DEFAULT_POLL_INTERVAL_TICKS,
        Some(applied_text.as_str()),
    ) {
        Ok(reloader) => Some(reloader),
        Err(error) => {
            warn!(error = %error, "config_watch_unavailable; hot reload disabled");
            None
        }
    };
    let scene = GameplayScene::new(behavior, reloader);

    let input: Box<dyn InputFeed> = match env_value(INPUT_SCRIPT_ENV_VAR) {
        Some(path) => {
            let script = ScriptedInput::load(Path::new(&path))?;
            info!(path = %path, total_ticks = script.total_ticks(), "input_script_loaded");
            Box::new(script)
        }
        None => Box::new(NoInput),
    };

    let config = LoopConfig {
        max_ticks: parse_max_ticks()?,
        pacing: if env_flag(UNPACED_ENV_VAR) {
            Pacing::Unpaced
        } else {
            Pacing::RealTime
        },
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        scene: Box::new(scene),
        input,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn resolve_config_path() -> Result<PathBuf, AppError> {
    if let Some(path) = env_value(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        config_dir = %paths.config_dir.display(),
        "startup"
    );
    Ok(paths.config_dir.join(DEFAULT_CONFIG_FILE))
}

/// Loads the config at `path`, writing the defaults there first when the
/// file does not exist. Returns the parsed config and the exact text it was
/// parsed from.
pub(crate) fn load_or_create_config(path: &Path) -> Result<(BehaviorConfig, String), AppError> {
    let defaults = BehaviorConfig::default()
        .to_pretty_json()
        .map_err(AppError::SerializeDefaults)?;
    if write_text_if_missing(path, &defaults)? {
        info!(path = %path.display(), "default_config_written");
    }

    let text = fs::read_to_string(path).map_err(|source| AppError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let config = BehaviorConfig::parse_json(&text).map_err(|source| AppError::Config {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((config, text))
}

fn env_value(var: &'static str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_flag(var: &'static str) -> bool {
    env_value(var).is_some_and(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_max_ticks() -> Result<Option<u64>, AppError> {
    env_value(MAX_TICKS_ENV_VAR)
        .map(|value| parse_tick_limit(MAX_TICKS_ENV_VAR, value))
        .transpose()
}

fn parse_tick_limit(var: &'static str, value: String) -> Result<u64, AppError> {
    match value.parse::<u64>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(AppError::InvalidEnv {
            var,
            value,
            expected: "positive integer",
        }),
    }
}
