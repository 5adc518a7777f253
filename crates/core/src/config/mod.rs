//! Framework configuration
//!
//! `core.toml` holds plugin-level settings that are not tied to a game
//! binary. Per-game data (vtable slots, tunables) lives in `config.ini`,
//! see [`crate::gamedata`].
//!
//! # Example
//!
//! ```ignore
//! use ncz_core::config::{core_config_path, CoreConfig};
//!
//! let config = CoreConfig::load(&core_config_path(game_dir)).unwrap_or_default();
//! println!("Jump block window: {}s", config.bhop_block_window_seconds);
//! ```

mod loader;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use loader::{config_ini_path, core_config_path, plugin_base_dir, PLUGIN_DIR_NAME};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Core framework configuration.
///
/// Loaded from `<gamedir>/addons/NoCheatZ/core.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// Minimum time between landing and the next accepted jump press
    pub bhop_block_window_seconds: f32,

    /// How long a player must be in game before detection systems see them
    pub in_tests_delay_seconds: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            bhop_block_window_seconds: 0.15,
            in_tests_delay_seconds: 1.0,
        }
    }
}

impl CoreConfig {
    /// Load core config from file, creating default if missing.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded core config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default core config at {:?}", path);
            Ok(default)
        }
    }

    /// Save core config to file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved core config to {:?}", path);
        Ok(())
    }

    /// Reload core config from file.
    pub fn reload(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded core config from {:?}", path);
        Ok(())
    }
}
