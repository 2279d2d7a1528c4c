//! # 2048 Game Library
//!
//! This library provides the core logic for the single-player 2048 tile-merging
//! puzzle: a 4x4 board, four-direction moves, scoring, single-level undo, and
//! save/restore of the game through a pluggable store.
//!
//! It is used by the `human_player` binary, which plays the game in a terminal.
//!
//! ## Modules
//! - `engine`: The board representation (`Board`), tiles (`Tile`), move directions
//!   (`Direction`), and the grid transform every move is built on.
//! - `game`: The `GameEngine` lifecycle: new game, moves, undo, win and game-over state.
//! - `persistence`: The persisted `Snapshot` format and the `Store` trait with its
//!   in-memory and JSON-file implementations.
//! - `config`: `GameConfig`, loadable from TOML.
//! - `error`: Error types for persistence and configuration.
//! - `utils`: Helpers such as parsing boards from text rows.

pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod persistence;
pub mod utils;

// Items are reached through their module path, e.g. `game_2048::game::GameEngine`,
// which keeps the top-level namespace limited to the modules themselves.
