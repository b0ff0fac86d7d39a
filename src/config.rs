//! User configuration management
//!
//! Configuration is stored in TOML format at `~/.addonpm/config.toml`.
//! Every setting has a default, so the file is optional.
//!
//! # Examples
//!
//! ```no_run
//! use addonpm::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//!
//! println!("git executable: {}", config.git.executable);
//! println!("max depth: {:?}", config.install.max_depth);
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// User configuration file (`~/.addonpm/config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Install defaults
    #[serde(default)]
    pub install: InstallConfig,

    /// Git settings
    #[serde(default)]
    pub git: GitConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Maximum number of manifests visited per install (unset = unlimited)
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Manifest file name to use instead of addons.json / addons.jsonc
    #[serde(default)]
    pub manifest_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Git executable name or path
    #[serde(default = "default_git_executable")]
    pub executable: String,
}

fn default_git_executable() -> String {
    "git".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            executable: default_git_executable(),
        }
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// Uses ADDONPM_CONFIG_DIR if set, otherwise ~/.addonpm/config.toml
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(config_dir) = std::env::var("ADDONPM_CONFIG_DIR") {
            return Ok(PathBuf::from(config_dir).join("config.toml"));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Other("Could not find home directory".to_string()))?;

        Ok(home.join(".addonpm").join("config.toml"))
    }

    /// Load config from file, or use defaults if it doesn't exist
    ///
    /// Environment variable overrides:
    /// - `ADDONPM_GIT`: Overrides `git.executable`
    /// - `ADDONPM_CONFIG_DIR`: Overrides the config directory location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;

        let mut config = if path.exists() {
            Self::parse(&fs::read_to_string(&path)?)?
        } else {
            Self::default()
        };

        if let Ok(git) = std::env::var("ADDONPM_GIT") {
            if !git.is_empty() {
                config.git.executable = git;
            }
        }

        Ok(config)
    }

    /// Parse config file contents
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
