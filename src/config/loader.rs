//! Settings file discovery and loading.
//!
//! Resolution order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Settings file (`--config`, else `{config_dir}/lcadata/config.yml`)
//! 3. Environment (`LCADATA_LOCAL_ROOT`, `LCADATA_REMOTE_ROOT`)
//! 4. Explicit overrides from the command line

use crate::config::settings::Settings;
use crate::error::{LcaError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the local cache root.
pub const ENV_LOCAL_ROOT: &str = "LCADATA_LOCAL_ROOT";

/// Environment variable overriding the remote bucket URL.
pub const ENV_REMOTE_ROOT: &str = "LCADATA_REMOTE_ROOT";

/// Values that take priority over the file and environment.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub local_root: Option<PathBuf>,
    pub remote_root: Option<String>,
}

/// Default settings file location: `{config_dir}/lcadata/config.yml`.
pub fn default_settings_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("lcadata").join("config.yml");
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Load a single settings file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_settings_file(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LcaError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LcaError::Io(e)
        }
    })?;

    parse_settings(&content, path)
}

/// Parse YAML content into settings. An empty document yields defaults.
pub fn parse_settings(content: &str, source_path: &Path) -> Result<Settings> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(content).map_err(|e| LcaError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Apply environment overrides from the given variable map.
pub fn apply_env(settings: &mut Settings, env: &HashMap<String, String>) {
    if let Some(local) = env.get(ENV_LOCAL_ROOT).filter(|v| !v.is_empty()) {
        settings.local_root = Some(PathBuf::from(local));
    }
    if let Some(remote) = env.get(ENV_REMOTE_ROOT).filter(|v| !v.is_empty()) {
        settings.remote_root = remote.clone();
    }
}

/// Resolve settings from every layer and validate the result.
///
/// An explicit `config_path` must exist; the default location is optional.
pub fn load_settings(
    config_path: Option<&Path>,
    overrides: &SettingsOverrides,
) -> Result<Settings> {
    let mut settings = match config_path {
        Some(path) => load_settings_file(path)?,
        None => match default_settings_path() {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                load_settings_file(&path)?
            }
            None => Settings::default(),
        },
    };

    let env: HashMap<String, String> = std::env::vars().collect();
    apply_env(&mut settings, &env);

    if let Some(local) = &overrides.local_root {
        settings.local_root = Some(local.clone());
    }
    if let Some(remote) = &overrides.remote_root {
        settings.remote_root = remote.clone();
    }

    settings.validate()?;
    Ok(settings)
}
