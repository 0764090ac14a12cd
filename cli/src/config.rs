// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot configuration, stored as TOML

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where session files and finished games are kept
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Users allowed to start and resign games
    #[serde(default)]
    pub admins: Vec<String>,
    /// Users who play white in teachers games
    #[serde(default)]
    pub teachers: Vec<String>,
    /// Channels the bot answers in; empty means every channel
    #[serde(default)]
    pub permitted_channels: Vec<String>,
    #[serde(default = "default_komi")]
    pub default_komi: f32,
}

fn default_state_dir() -> PathBuf {
    ProjectDirs::from("io", "rengo", "rengo")
        .map(|dirs| dirs.data_dir().join("state"))
        .unwrap_or_else(|| PathBuf::from("state"))
}

fn default_komi() -> f32 {
    rengo_core::setup::DEFAULT_KOMI
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            admins: Vec::new(),
            teachers: Vec::new(),
            permitted_channels: Vec::new(),
            default_komi: default_komi(),
        }
    }
}

impl Config {
    pub fn is_admin(&self, user: &str) -> bool {
        self.admins.iter().any(|a| a == user)
    }

    pub fn is_permitted(&self, channel: &str) -> bool {
        self.permitted_channels.is_empty() || self.permitted_channels.iter().any(|c| c == channel)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("io", "rengo", "rengo")
        .context("Failed to determine config directory")?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Load the config at `path`, or at the default location.
///
/// A missing file is created with default contents.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => get_config_path().context("Failed to determine config path")?,
    };

    if !config_path.exists() {
        tracing::info!("Config file not found, creating default at: {}", config_path.display());

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_config = Config::default();
        save_config(&config_path, &default_config)?;
        return Ok(default_config);
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
}

pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let toml_content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, toml_content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    tracing::info!("Saved config to: {}", path.display());
    Ok(())
}
