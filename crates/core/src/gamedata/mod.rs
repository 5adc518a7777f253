//! Gamedata: vtable slot indices and tunables from `config.ini`
//!
//! Slot indices depend on the exact game binary, so they are loaded from a
//! per-game section of `config.ini` instead of being compiled in:
//!
//! ```ini
//! [CONFIG]
//! config_version=1
//!
//! [csgo]
//! weaponequip_linux=286
//! weaponequip_windows=285
//! ...
//! disable_systems=AutoTVRecord;BadUserCmdBlocker
//! ```
//!
//! Loading is all-or-nothing. Any missing key, unparsable number, or schema
//! version other than [`CONFIG_VERSION`] fails the whole load, and no slot
//! index from a failed load is ever exposed.

mod ini;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use ncz_engine::GameIdentity;
use thiserror::Error;

pub use ini::IniDocument;

/// Layout version of config.ini this build understands
pub const CONFIG_VERSION: i32 = 1;

/// Section holding `config_version`
pub const CONFIG_SECTION: &str = "CONFIG";

/// Symbolic hook names (config keys without the platform suffix)
pub mod slots {
    pub const GET_DATADESC_MAP: &str = "getdatadescmap";
    pub const SET_TRANSMIT: &str = "settransmit";
    pub const GROUND_ENTITY: &str = "mhgroundentity";
    pub const WEAPON_EQUIP: &str = "weaponequip";
    pub const WEAPON_DROP: &str = "weapondrop";
    pub const PLAYER_RUN_COMMAND: &str = "playerruncommand";
    pub const DISPATCH: &str = "dispatch";
    pub const THINK_POST: &str = "thinkpost";

    /// Every slot a game section must define
    pub const ALL: &[&str] = &[
        GET_DATADESC_MAP,
        SET_TRANSMIT,
        GROUND_ENTITY,
        WEAPON_EQUIP,
        WEAPON_DROP,
        PLAYER_RUN_COMMAND,
        DISPATCH,
        THINK_POST,
    ];
}

/// Errors that can occur when loading gamedata
#[derive(Debug, Error)]
pub enum GamedataError {
    #[error("Failed to read config.ini: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cannot find section [{0}]")]
    SectionNotFound(String),

    #[error("Cannot find attribute {section} -> {key}")]
    KeyNotFound { section: String, key: String },

    #[error("Invalid number for {key}: '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("config_version mismatch: expected {expected}, found '{found}'")]
    VersionMismatch { expected: i32, found: String },

    #[error("Slot not found: {0}")]
    SlotNotFound(String),

    #[error("Slot {name} is bound to {bound}, not {requested}")]
    BindingMismatch {
        name: String,
        bound: TargetIdentity,
        requested: TargetIdentity,
    },
}

/// Platform whose slot indices apply (config key suffix)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    /// Platform this plugin was compiled for
    pub const fn current() -> Self {
        #[cfg(target_os = "windows")]
        {
            Platform::Windows
        }
        #[cfg(not(target_os = "windows"))]
        {
            Platform::Linux
        }
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Platform::Linux => "_linux",
            Platform::Windows => "_windows",
        }
    }
}

/// Game binary + platform a slot index is valid for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetIdentity {
    pub game: String,
    pub platform: Platform,
}

impl TargetIdentity {
    pub fn new(game: impl Into<String>, platform: Platform) -> Self {
        Self {
            game: game.into(),
            platform,
        }
    }

    /// The running game on the compiled platform
    pub fn current(identity: &GameIdentity) -> Self {
        Self::new(identity.game.clone(), Platform::current())
    }

    fn matches(&self, other: &TargetIdentity) -> bool {
        self.platform == other.platform && self.game.eq_ignore_ascii_case(&other.game)
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.game, self.platform.suffix())
    }
}

/// One resolved vtable slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotBinding {
    pub name: String,
    pub index: usize,
    pub target: TargetIdentity,
}

/// Symbolic hook name -> vtable slot, for one game binary
#[derive(Debug, Clone)]
pub struct SlotTable {
    target: TargetIdentity,
    bindings: HashMap<String, SlotBinding>,
}

impl SlotTable {
    /// Read `<name><suffix>` for every name from the target's section
    pub fn from_document(
        doc: &IniDocument,
        target: &TargetIdentity,
        names: &[&str],
    ) -> Result<Self, GamedataError> {
        let mut bindings = HashMap::with_capacity(names.len());

        for name in names {
            let key = format!("{}{}", name, target.platform.suffix());
            let index = parse_number::<usize>(doc, &target.game, &key)?;

            bindings.insert(
                name.to_ascii_lowercase(),
                SlotBinding {
                    name: name.to_string(),
                    index,
                    target: target.clone(),
                },
            );
        }

        Ok(Self {
            target: target.clone(),
            bindings,
        })
    }

    /// Slot index of `name` for `target`
    ///
    /// Fails closed when the table was loaded for a different game or
    /// platform than the object about to be patched.
    pub fn resolve(&self, name: &str, target: &TargetIdentity) -> Result<usize, GamedataError> {
        let binding = self
            .bindings
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| GamedataError::SlotNotFound(name.to_string()))?;

        if !binding.target.matches(target) {
            return Err(GamedataError::BindingMismatch {
                name: binding.name.clone(),
                bound: binding.target.clone(),
                requested: target.clone(),
            });
        }

        Ok(binding.index)
    }

    pub fn binding(&self, name: &str) -> Option<&SlotBinding> {
        self.bindings.get(&name.to_ascii_lowercase())
    }

    pub fn target(&self) -> &TargetIdentity {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Smoke grenade geometry used by the anti-smoke system
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmokeSettings {
    pub time: f32,
    pub time_to_bang: f32,
    pub inner_radius_sqr: f32,
    pub radius: f32,
}

/// Everything loaded from config.ini for the running game
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub slots: SlotTable,

    /// Network class name of the player entity
    pub player_data_class: String,

    pub smoke: SmokeSettings,

    /// System names listed in `disable_systems`
    pub disabled_systems: Vec<String>,
}

impl GameConfig {
    /// Load from a config.ini file
    pub fn load_from_file<P: AsRef<Path>>(
        path: P,
        target: &TargetIdentity,
    ) -> Result<Self, GamedataError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, target)
    }

    /// Load from config.ini content
    pub fn load_from_str(text: &str, target: &TargetIdentity) -> Result<Self, GamedataError> {
        let doc = IniDocument::parse(text);

        let version = require(&doc, CONFIG_SECTION, "config_version")?;
        if version.parse::<i32>().ok() != Some(CONFIG_VERSION) {
            return Err(GamedataError::VersionMismatch {
                expected: CONFIG_VERSION,
                found: version.to_string(),
            });
        }

        let game = target.game.as_str();
        if !doc.has_section(game) {
            return Err(GamedataError::SectionNotFound(game.to_string()));
        }

        let slots = SlotTable::from_document(&doc, target, slots::ALL)?;

        let player_data_class = require(&doc, game, "playerdataclass")?.to_string();

        let smoke = SmokeSettings {
            time: parse_number(&doc, game, "f_smoketime")?,
            time_to_bang: parse_number(&doc, game, "f_smoke_time_to_bang")?,
            inner_radius_sqr: parse_number(&doc, game, "f_inner_smoke_radius_sqr")?,
            radius: parse_number(&doc, game, "f_smoke_radius")?,
        };

        let disabled_systems = split_list(require(&doc, game, "disable_systems")?);

        tracing::info!(
            "Loaded config.ini for {}: {} slots, {} disabled systems",
            target,
            slots.len(),
            disabled_systems.len()
        );

        Ok(Self {
            slots,
            player_data_class,
            smoke,
            disabled_systems,
        })
    }
}

fn require<'a>(doc: &'a IniDocument, section: &str, key: &str) -> Result<&'a str, GamedataError> {
    doc.get(section, key).ok_or_else(|| GamedataError::KeyNotFound {
        section: section.to_string(),
        key: key.to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(
    doc: &IniDocument,
    section: &str,
    key: &str,
) -> Result<T, GamedataError> {
    let value = require(doc, section, key)?;
    value.parse().map_err(|_| GamedataError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Split a `;`-delimited list, dropping empty entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
