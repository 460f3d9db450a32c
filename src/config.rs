//! Optional TOML configuration.
//!
//! Looked up in `./.tdo/config.toml` first, then `~/.tdo/config.toml`.
//! Everything in it has a working default, so running with no config file
//! at all is the normal case.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://playground.4geeks.com/todo";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Service base URL; CLI flag and TDO_BASE_URL take precedence.
    #[serde(default)]
    pub base_url: Option<String>,
    /// User to open at startup.
    #[serde(default)]
    pub username: Option<String>,
    /// Skip y/N confirmation prompts (same as --yes).
    #[serde(default)]
    pub auto_confirm: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::find() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = toml::from_str(&text)?;
        Ok(config)
    }

    /// Project-level config wins over the user-level one.
    fn find() -> Option<PathBuf> {
        let project = Path::new(".tdo").join("config.toml");
        if project.exists() {
            return Some(project);
        }
        let user = dirs::home_dir()?.join(".tdo").join("config.toml");
        if user.exists() {
            return Some(user);
        }
        None
    }
}
