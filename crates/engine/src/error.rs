//! Error types for host table loading

/// Error type for host loading operations
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The table pointer itself was null
    #[error("Host API table is null")]
    NullTable,

    /// The shim was built against a different table layout
    #[error("Host API version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },

    /// A required function pointer was not filled in
    #[error("Host API function missing: {0}")]
    MissingFunction(&'static str),

    /// Unknown host build discriminant
    #[error("Unknown host build: {0}")]
    UnknownBuild(i32),

    /// The engine reported an empty or non UTF-8 game directory
    #[error("Invalid game directory: {0}")]
    InvalidGameDir(String),
}
