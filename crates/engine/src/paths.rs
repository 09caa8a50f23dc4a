use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const ROOT_ENV_VAR: &str = "GRIDRUN_ROOT";
const CONFIG_DIR_NAME: &str = "config";

/// Directories the binary works from, all derived from the project root.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub config_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create config directory at {path}: {source}")]
    CreateConfigDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "{env_var} points at {path}, which is not a gridrun checkout \
(expected Cargo.toml next to crates/ or config/)"
    )]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "no gridrun checkout found above {start_dir} \
(expected Cargo.toml next to crates/ or config/); set {env_var}, e.g. \
export {env_var}=\"/path/to/gridrun\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Resolves the project root and makes sure `config/` exists under it.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match env::var_os(ROOT_ENV_VAR).filter(|value| !value.is_empty()) {
        Some(value) => root_from_env(value)?,
        None => root_from_exe()?,
    };
    let config_dir = root.join(CONFIG_DIR_NAME);
    fs::create_dir_all(&config_dir).map_err(|source| StartupError::CreateConfigDir {
        path: config_dir.clone(),
        source,
    })?;
    Ok(AppPaths { root, config_dir })
}

fn root_from_env(value: OsString) -> Result<PathBuf, StartupError> {
    let path = canonical_or_raw(Path::new(&value));
    if looks_like_root(&path) {
        Ok(path)
    } else {
        Err(StartupError::InvalidEnvRoot {
            path,
            env_var: ROOT_ENV_VAR,
        })
    }
}

fn root_from_exe() -> Result<PathBuf, StartupError> {
    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let start_dir = exe
        .parent()
        .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
    find_root_above(start_dir).ok_or_else(|| StartupError::RootNotFound {
        start_dir: canonical_or_raw(start_dir),
        env_var: ROOT_ENV_VAR,
    })
}

/// Nearest ancestor of `start` (inclusive) that looks like a checkout.
fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| looks_like_root(candidate))
        .map(canonical_or_raw)
}

fn looks_like_root(path: &Path) -> bool {
    path.join("Cargo.toml").is_file()
        && (path.join("crates").is_dir() || path.join(CONFIG_DIR_NAME).is_dir())
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
