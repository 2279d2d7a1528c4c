use std::path::{Path, PathBuf};

use crate::engine::{Tile, BOARD_SIZE};
use crate::error::ConfigError;

/// Game settings, loadable from TOML.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Tile value that triggers the one-time win notification.
    pub win_value: u32,
    /// Probability that a spawned tile is a 4 rather than a 2.
    pub four_probability: f64,
    /// Number of tiles placed on a fresh board.
    pub initial_tiles: usize,
    /// Directory used by the file-backed store.
    pub save_dir: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            win_value: 2048,
            four_probability: 0.1,
            initial_tiles: 2,
            save_dir: PathBuf::from(".game_2048"),
        }
    }
}

impl GameConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: GameConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !Tile::is_valid_value(self.win_value) || self.win_value < 4 {
            return Err(ConfigError::Validation(
                "win_value must be a power of two of at least 4".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.four_probability) {
            return Err(ConfigError::Validation(
                "four_probability must be within [0, 1]".into(),
            ));
        }
        if self.initial_tiles == 0 || self.initial_tiles > BOARD_SIZE * BOARD_SIZE {
            return Err(ConfigError::Validation(format!(
                "initial_tiles must be between 1 and {}",
                BOARD_SIZE * BOARD_SIZE
            )));
        }
        Ok(())
    }
}
