use std::path::PathBuf;

/// Errors raised while turning a persisted snapshot back into a board.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid tile value {value} at row {row}, column {col}")]
    InvalidTile { row: usize, col: usize, value: u32 },
}

/// Errors that can occur inside a persistence store.
///
/// None of these ever reach gameplay; the engine logs them and carries on.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] SnapshotError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
