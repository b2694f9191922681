//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use filestacker_core::config::{ClientConfig, ENV_API_URL, ENV_POLL_INTERVAL_SECS};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const ENV_PROFILE: &str = "FILESTACKER_PROFILE";
const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("filestacker").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("no user config directory on this platform".to_string()))
}

pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    filestacker_core::util::normalize_text_option(value)
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    normalize_text_option(value.map(str::to_string))
}

fn config_error(action: &str, path: &Path, error: impl std::fmt::Display) -> CliError {
    CliError::Config(format!("cannot {action} {}: {error}", path.display()))
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, CliError> {
        Self::load_from_path(&default_config_path()?)
    }

    /// A missing file is an empty configuration.
    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default())
            }
            Err(error) => return Err(config_error("read", path, error)),
        };
        let mut config: Self =
            serde_json::from_str(&raw).map_err(|error| config_error("parse", path, error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, CliError> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), CliError> {
        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)?;

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|error| config_error("create", dir, error))?;
        }
        std::fs::write(path, serialized).map_err(|error| config_error("write", path, error))
    }

    /// Profile selection order: `--profile`, `FILESTACKER_PROFILE`, the
    /// active profile, then `default`.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        normalize_profile_name(explicit)
            .or_else(|| normalize_text_option(std::env::var(ENV_PROFILE).ok()))
            .or_else(|| normalize_profile_name(self.active_profile.as_deref()))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    pub fn api_base_url(&self) -> Option<String> {
        normalize_text_option(self.api_base_url.clone())
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.clone())
            .map(|url| url.trim_end_matches('/').to_string());
        self.poll_interval_secs = self.poll_interval_secs.filter(|secs| *secs > 0);
    }
}

/// Pick the API base URL: explicit flag, then environment, then profile.
/// `None` means the built-in default applies.
pub fn resolve_api_base_url(
    explicit: Option<String>,
    from_env: Option<String>,
    profile: Option<&CliProfile>,
) -> Option<String> {
    normalize_text_option(explicit)
        .or_else(|| normalize_text_option(from_env))
        .or_else(|| profile.and_then(CliProfile::api_base_url))
}

/// Build the client configuration for a profile, layering the `--api-url`
/// flag, the environment, and the profile over the defaults.
pub fn resolve_client_config(
    explicit_api_url: Option<String>,
    profile: Option<&CliProfile>,
) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;

    let env_api_url = std::env::var(ENV_API_URL).ok();
    if let Some(url) = resolve_api_base_url(explicit_api_url, env_api_url, profile) {
        config = config.with_api_base_url(url)?;
    }

    let env_poll = normalize_text_option(std::env::var(ENV_POLL_INTERVAL_SECS).ok());
    if env_poll.is_none() {
        if let Some(interval) = profile.and_then(CliProfile::poll_interval) {
            config = config.with_poll_interval(interval);
        }
    }

    Ok(config)
}
