//! Config path resolution
//!
//! Handles resolving paths for configuration files based on the game directory.

use std::path::{Path, PathBuf};

/// Plugin folder name under `addons/`
pub const PLUGIN_DIR_NAME: &str = "NoCheatZ";

/// Returns the plugin base directory.
///
/// Path: `<gamedir>/addons/NoCheatZ/`
pub fn plugin_base_dir(game_dir: &Path) -> PathBuf {
    game_dir.join("addons").join(PLUGIN_DIR_NAME)
}

/// Returns the gamedata (vtable slots) config path.
///
/// Path: `<gamedir>/addons/NoCheatZ/config.ini`
pub fn config_ini_path(game_dir: &Path) -> PathBuf {
    plugin_base_dir(game_dir).join("config.ini")
}

/// Returns the core framework config path.
///
/// Path: `<gamedir>/addons/NoCheatZ/core.toml`
pub fn core_config_path(game_dir: &Path) -> PathBuf {
    plugin_base_dir(game_dir).join("core.toml")
}
