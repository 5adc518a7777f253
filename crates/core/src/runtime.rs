//! Composition root
//!
//! [`Runtime`] owns everything the plugin builds at load time and routes
//! the host's lifecycle callbacks to it. It is the only place that knows
//! about every component.

use std::sync::Arc;

use ncz_engine::{EdictRef, Host};
use ncz_sdk::Edict;

use crate::config::{config_ini_path, CoreConfig};
use crate::gamedata::{GameConfig, TargetIdentity};
use crate::hooks::{FrameStats, HookSet};
use crate::players::{EntityIndex, PlayerDirectory, PlayerTable};
use crate::systems::{BhopBlocker, SystemManager};

pub struct Runtime {
    host: Arc<dyn Host>,
    config: CoreConfig,
    game_config: Option<GameConfig>,
    players: Arc<PlayerTable>,
    hooks: HookSet,
    systems: SystemManager,
    frames: FrameStats,
    shut_down: bool,
}

impl Runtime {
    /// Load config.ini for the running game and build every component
    ///
    /// A config.ini that fails to load leaves every hook inert.
    pub fn new(host: Arc<dyn Host>, config: CoreConfig) -> Self {
        let path = config_ini_path(host.game_dir());
        let target = TargetIdentity::current(host.identity());

        let game_config = match GameConfig::load_from_file(&path, &target) {
            Ok(game_config) => Some(game_config),
            Err(e) => {
                tracing::error!("Unable to load {:?} for {}: {}", path, target, e);
                None
            }
        };

        Self::with_game_config(host, config, game_config)
    }

    pub fn with_game_config(
        host: Arc<dyn Host>,
        config: CoreConfig,
        game_config: Option<GameConfig>,
    ) -> Self {
        let players = Arc::new(PlayerTable::new());
        let directory: Arc<dyn PlayerDirectory> = players.clone();

        let hooks = HookSet::build(&host, &directory, game_config.as_ref().map(|c| &c.slots));

        let mut systems = SystemManager::new();
        systems.register(Arc::new(BhopBlocker::new(
            host.clone(),
            directory,
            config.bhop_block_window_seconds,
        )));
        if let Some(game_config) = &game_config {
            systems.disable_from_config(&game_config.disabled_systems, &hooks);
        }

        hooks.attach();

        tracing::info!(
            "NoCheatZ runtime ready for {} ({} systems)",
            host.identity().game,
            systems.len()
        );

        Self {
            host,
            config,
            game_config,
            players,
            hooks,
            systems,
            frames: FrameStats::new(),
            shut_down: false,
        }
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn game_config(&self) -> Option<&GameConfig> {
        self.game_config.as_ref()
    }

    pub fn players(&self) -> &Arc<PlayerTable> {
        &self.players
    }

    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    pub fn systems(&self) -> &SystemManager {
        &self.systems
    }

    pub fn frames(&self) -> &FrameStats {
        &self.frames
    }

    pub fn on_client_connect(&mut self, index: i32, name: &str, is_bot: bool) {
        let Some(index) = EntityIndex::from_raw(index) else {
            tracing::warn!("ClientConnect with invalid index {}", index);
            return;
        };
        self.reset_player(index);
        self.players.connect(index, name, is_bot);
    }

    /// The client's entity exists; hook its class
    pub fn on_client_active(&mut self, index: i32, edict: *mut Edict) {
        let Some(index) = EntityIndex::from_raw(index) else {
            tracing::warn!("ClientActive with invalid index {}", index);
            return;
        };
        let Some(edict) = EdictRef::from_ptr(edict).filter(|e| self.host.is_valid_edict(*e)) else {
            tracing::error!("ClientActive for player {} with invalid edict", index);
            return;
        };
        let Some(entity) = self.host.edict_to_entity(edict) else {
            tracing::error!("ClientActive for player {}: edict has no entity", index);
            return;
        };

        if self
            .players
            .activate(index, edict, entity, self.host.tick_count())
            .is_none()
        {
            tracing::warn!("ClientActive for player {} that never connected", index);
            return;
        }

        if let Err(e) = self.hooks.hook_player(edict) {
            tracing::error!("Unable to hook player {}: {}", index, e);
        }
    }

    pub fn on_client_disconnect(&mut self, index: i32) {
        let Some(index) = EntityIndex::from_raw(index) else {
            tracing::warn!("ClientDisconnect with invalid index {}", index);
            return;
        };
        self.players.disconnect(index);
        self.reset_player(index);
    }

    fn reset_player(&self, index: EntityIndex) {
        self.hooks.reset_player(index);
        self.systems.reset_player(index);
    }

    pub fn on_game_frame(&mut self, simulating: bool) {
        let host = &self.host;
        let players = &self.players;
        let systems = &mut self.systems;
        let hooks = &self.hooks;
        let delay_seconds = self.config.in_tests_delay_seconds;

        self.frames.measure(|| {
            if simulating {
                let interval = host.tick_interval();
                if interval > 0.0 && interval < 1.0 {
                    let delay_ticks = (delay_seconds / interval).floor() as i32;
                    players.promote(host.tick_count(), delay_ticks);
                }
            }
            systems.think(hooks);
        });
    }

    /// Unload systems, restore every patched slot and detach dispatchers
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.systems.unload_all(&self.hooks);
        let restored = self.hooks.uninstall_all();
        self.hooks.detach();

        tracing::info!("NoCheatZ runtime shut down ({} hooks removed)", restored);
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
