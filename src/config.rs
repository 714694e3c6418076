use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

pub const CONFIG_FILENAME: &str = "config.toml";

/// Settings read from `.familycart/config.toml`. Every key is optional.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Name or id of the user commands act as.
    pub current_user: Option<String>,
    pub default_category: String,
    pub default_quantity: String,
    pub share_base_url: String,
    pub notification_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            current_user: None,
            default_category: "Groceries".to_string(),
            default_quantity: "1".to_string(),
            share_base_url: "https://familycart.app".to_string(),
            notification_limit: 50,
        }
    }
}

pub fn parse(text: &str, path: &Path) -> Result<Config> {
    toml::from_str(text).map_err(|source| Error::Config {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the config in `dir`, falling back to defaults when absent. `FC_USER`
/// overrides `current_user`.
pub fn load(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILENAME);
    let mut config = match std::fs::read_to_string(&path) {
        Ok(text) => parse(&text, &path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(e) => return Err(Error::io(path, e)),
    };
    if let Ok(user) = std::env::var("FC_USER") {
        if !user.trim().is_empty() {
            config.current_user = Some(user);
        }
    }
    Ok(config)
}
