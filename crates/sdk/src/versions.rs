//! Host build variants and game identities
//!
//! The game identity is the game directory name reported by the engine
//! (e.g. `csgo`). It doubles as the section name in `config.ini`.

/// Host binary family
///
/// Selects the `CUserCmd` layout and which convars exist.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostBuild {
    /// Orange Box derived builds (CS:S, TF2, HL2DM, ...)
    Generic = 0,
    /// CS:GO
    CounterStrikeGlobalOffensive = 1,
}

impl HostBuild {
    /// Convert from the raw value passed across the FFI boundary
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Generic),
            1 => Some(Self::CounterStrikeGlobalOffensive),
            _ => None,
        }
    }

    /// Guess the build from a game directory name
    pub fn from_game_dir(game: &str) -> Self {
        if game.eq_ignore_ascii_case("csgo") {
            Self::CounterStrikeGlobalOffensive
        } else {
            Self::Generic
        }
    }
}

/// Game directories the shipped config.ini has sections for
pub const KNOWN_GAMES: &[(&str, HostBuild)] = &[
    ("cstrike", HostBuild::Generic),
    ("csgo", HostBuild::CounterStrikeGlobalOffensive),
    ("tf", HostBuild::Generic),
    ("hl2mp", HostBuild::Generic),
    ("dod", HostBuild::Generic),
];
