//! Game lifecycle for a 2048 session.
//!
//! `GameEngine` owns the board, the score and the single-level undo record. Every
//! operation runs to completion synchronously: a successful move commits the slide,
//! spawns the next tile, saves, and re-evaluates game over before it returns.
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::engine::{Board, Direction};
use crate::persistence::{Snapshot, Store};

#[derive(Clone, Debug)]
struct UndoRecord {
    board: Board,
    score: u32,
}

/// Manages the state and progression of a 2048 game session.
///
/// The engine restores the saved game from its store when it is constructed, or
/// starts a new one if nothing usable was saved. Store failures never interrupt play.
///
/// # Examples
/// ```
/// use game_2048::config::GameConfig;
/// use game_2048::engine::Direction;
/// use game_2048::game::GameEngine;
/// use game_2048::persistence::MemoryStore;
///
/// let mut game = GameEngine::with_seed(MemoryStore::new(), GameConfig::default(), 42);
/// assert_eq!(game.board().tile_count(), 2);
///
/// for direction in Direction::ALL {
///     if game.process_move(direction) {
///         break;
///     }
/// }
/// assert!(game.can_undo());
/// assert!(game.undo_last_move());
/// assert!(!game.undo_last_move());
/// ```
#[derive(Debug)]
pub struct GameEngine<S: Store> {
    board: Board,
    score: u32,
    high_score: u32,
    is_over: bool,
    has_won: bool,
    win_shown: bool,
    win_message: Option<String>,
    started_at: Option<Instant>,
    undo: Option<UndoRecord>,
    config: GameConfig,
    rng: SmallRng,
    store: S,
}

impl<S: Store> GameEngine<S> {
    /// Creates an engine whose tile spawns are seeded from system entropy.
    ///
    /// A `config` that fails `GameConfig::validate` is replaced by the default one.
    pub fn new(store: S, config: GameConfig) -> Self {
        Self::with_rng(store, config, SmallRng::from_entropy())
    }

    /// Creates an engine with a deterministic tile spawn sequence.
    pub fn with_seed(store: S, config: GameConfig, seed: u64) -> Self {
        Self::with_rng(store, config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(mut store: S, config: GameConfig, rng: SmallRng) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "invalid game config, using defaults");
                GameConfig::default()
            }
        };
        let high_score = store.load_high_score().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load high score");
            0
        });
        let win_shown = store.load_win_shown().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load win flag");
            false
        });

        let mut engine = GameEngine {
            board: Board::new_empty(),
            score: 0,
            high_score,
            is_over: false,
            has_won: false,
            win_shown,
            win_message: None,
            started_at: None,
            undo: None,
            config,
            rng,
            store,
        };
        if !engine.restore() {
            engine.new_game();
        }
        engine
    }

    /// Restores the saved game, returning `false` if there is none or it is unusable.
    fn restore(&mut self) -> bool {
        let snapshot = match self.store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "discarding unreadable saved game");
                return false;
            }
        };
        let board = match snapshot.to_board() {
            Ok(board) => board,
            Err(e) => {
                warn!(error = %e, "discarding invalid saved game");
                return false;
            }
        };

        self.board = board;
        self.score = snapshot.score;
        self.is_over = self.board.is_terminal();
        self.record_high_score();
        info!(score = self.score, is_over = self.is_over, "restored saved game");
        true
    }

    /// Starts over: empty board, zero score, no undo, win notification re-armed.
    ///
    /// Places `initial_tiles` random tiles and saves the result.
    pub fn new_game(&mut self) {
        self.board = Board::new_empty();
        self.score = 0;
        self.is_over = false;
        self.has_won = false;
        self.win_message = None;
        self.started_at = None;
        self.undo = None;
        self.set_win_shown(false);

        for _ in 0..self.config.initial_tiles {
            self.board
                .insert_random_tile(&mut self.rng, self.config.four_probability);
        }
        info!("started new game");
        self.save_game();
    }

    /// Slides the board in `direction`.
    ///
    /// The undo record is replaced with the current state before anything else, even
    /// if the move turns out not to change the board. When the board does change, the
    /// score delta is added, one random tile is spawned, the game is saved, and game
    /// over is re-evaluated.
    ///
    /// # Returns
    /// * `true` if the board changed.
    /// * `false` if the game is already over or nothing could slide or merge.
    pub fn process_move(&mut self, direction: Direction) -> bool {
        if self.is_over {
            return false;
        }

        self.undo = Some(UndoRecord {
            board: self.board.clone(),
            score: self.score,
        });
        self.started_at.get_or_insert_with(Instant::now);
        self.board.clear_merge_flags();

        let shift = self.board.shift(direction);
        if !shift.changed {
            debug!(?direction, "move did not change the board");
            return false;
        }

        self.board = shift.board;
        self.score = self.score.saturating_add(shift.score_delta);
        if !self.win_shown && shift.merged.contains(&self.config.win_value) {
            self.announce_win();
        }

        let spawned = self
            .board
            .insert_random_tile(&mut self.rng, self.config.four_probability);
        debug!(
            ?direction,
            score_delta = shift.score_delta,
            merges = shift.merged.len(),
            ?spawned,
            "applied move"
        );

        self.save_game();
        self.is_over = self.board.is_terminal();
        if self.is_over {
            info!(score = self.score, "game over");
        }
        true
    }

    /// Reverts the most recent move.
    ///
    /// The undo record is consumed, so a second call without an intervening move
    /// does nothing. Clears the game-over and win state; the win notification itself
    /// stays spent for this game.
    ///
    /// # Returns
    /// `true` if a state was restored, `false` if there was nothing to undo.
    pub fn undo_last_move(&mut self) -> bool {
        let Some(record) = self.undo.take() else {
            return false;
        };
        self.board = record.board;
        self.score = record.score;
        self.is_over = false;
        self.has_won = false;
        self.win_message = None;
        debug!(score = self.score, "undid last move");
        self.save_game();
        true
    }

    fn announce_win(&mut self) {
        let elapsed = self
            .started_at
            .map_or(Duration::ZERO, |started| started.elapsed());
        self.has_won = true;
        self.win_message = Some(win_message(self.config.win_value, elapsed));
        self.set_win_shown(true);
        info!(elapsed_secs = elapsed.as_secs(), "reached win value");
    }

    fn set_win_shown(&mut self, shown: bool) {
        self.win_shown = shown;
        if let Err(e) = self.store.save_win_shown(shown) {
            warn!(error = %e, "failed to save win flag");
        }
    }

    fn save_game(&mut self) {
        if let Err(e) = self.store.save(&self.snapshot()) {
            warn!(error = %e, "failed to save game");
        }
        self.record_high_score();
    }

    fn record_high_score(&mut self) {
        if self.score <= self.high_score {
            return;
        }
        self.high_score = self.score;
        if let Err(e) = self.store.save_high_score(self.high_score) {
            warn!(error = %e, "failed to save high score");
        }
    }

    /// Returns the current board, including tile ids and merge flags for animation.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the score of the current game.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Best score seen so far, across games. Never decreases.
    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    /// True once the board is full with no possible merge. Cleared by undo and new game.
    pub fn is_over(&self) -> bool {
        self.is_over
    }

    /// True right after the move that first reached the win value in this game.
    pub fn has_won(&self) -> bool {
        self.has_won
    }

    /// The one-time win message, e.g. `"You reached 2048 in 01:05!"`.
    pub fn win_message(&self) -> Option<&str> {
        self.win_message.as_deref()
    }

    /// True iff an undo record is held, i.e. `undo_last_move` would restore something.
    pub fn can_undo(&self) -> bool {
        self.undo.is_some()
    }

    /// When the first move of this session was made.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Returns the persisted form of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_board(&self.board, self.score)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Formats the win notification with the elapsed time as `MM:SS`.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use game_2048::game::win_message;
/// assert_eq!(win_message(2048, Duration::from_secs(125)), "You reached 2048 in 02:05!");
/// ```
pub fn win_message(win_value: u32, elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "You reached {} in {:02}:{:02}!",
        win_value,
        secs / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{JsonFileStore, MemoryStore, Store};

    fn engine_with(grid: [[u32; 4]; 4], score: u32) -> GameEngine<MemoryStore> {
        let store = MemoryStore::new().with_snapshot(Snapshot { grid, score });
        GameEngine::with_seed(store, GameConfig::default(), 7)
    }

    // Full board that becomes terminal after sliding right, whatever tile spawns.
    const ONE_MOVE_FROM_OVER: [[u32; 4]; 4] = [
        [8, 16, 8, 16],
        [16, 8, 16, 8],
        [8, 16, 8, 16],
        [32, 64, 128, 0],
    ];

    #[test]
    fn test_new_game_on_empty_store() {
        let game = GameEngine::with_seed(MemoryStore::new(), GameConfig::default(), 1);
        assert_eq!(game.board().tile_count(), 2);
        assert_eq!(game.score(), 0);
        assert!(!game.is_over());
        assert!(!game.has_won());
        assert!(!game.can_undo());
        assert!(game.started_at().is_none());
        assert_eq!(game.store().saves(), 1);
        assert_eq!(game.store().snapshot(), Some(&game.snapshot()));
        for value in game.board().values().iter().flatten() {
            assert!(matches!(*value, 0 | 2 | 4));
        }
    }

    #[test]
    fn test_same_seed_same_game() {
        let a = GameEngine::with_seed(MemoryStore::new(), GameConfig::default(), 99);
        let b = GameEngine::with_seed(MemoryStore::new(), GameConfig::default(), 99);
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_restores_saved_game() {
        let game = engine_with([[2, 2, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]], 36);
        assert_eq!(game.score(), 36);
        assert_eq!(game.board().values()[0], [2, 2, 0, 0]);
        assert_eq!(game.board().tile_count(), 3);
        assert_eq!(game.high_score(), 36);
        assert_eq!(game.store().saves(), 0);
    }

    #[test]
    fn test_invalid_snapshot_starts_new_game() {
        let game = engine_with([[3, 0, 0, 0], [0; 4], [0; 4], [0; 4]], 10);
        assert_eq!(game.score(), 0);
        assert_eq!(game.board().tile_count(), 2);
        assert_eq!(game.store().saves(), 1);
    }

    #[test]
    fn test_corrupt_file_starts_new_game() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("game_state.json"), "{ not json").unwrap();

        let game = GameEngine::with_seed(JsonFileStore::new(dir.path()), GameConfig::default(), 3);
        assert_eq!(game.score(), 0);
        assert_eq!(game.board().tile_count(), 2);

        let mut reopened = JsonFileStore::new(dir.path());
        assert_eq!(reopened.load().unwrap(), Some(game.snapshot()));
    }

    #[test]
    fn test_move_merges_and_spawns() {
        let mut game = engine_with([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]], 0);

        assert!(game.process_move(Direction::Left));
        assert_eq!(game.score(), 4);
        let merged = game.board().get_tile(0, 0).unwrap();
        assert_eq!(merged.value(), 4);
        assert!(merged.just_merged());
        // Two tiles, one merge, one spawn.
        assert_eq!(game.board().tile_count(), 2);
        assert!(game.can_undo());
        assert!(game.started_at().is_some());
        assert_eq!(game.store().saves(), 1);
        assert_eq!(game.store().snapshot(), Some(&game.snapshot()));
    }

    #[test]
    fn test_merge_flags_reset_on_next_move() {
        // Only 2s spawn, and only into row 0, so the second move is fully determined.
        let config = GameConfig {
            four_probability: 0.0,
            ..GameConfig::default()
        };
        let store = MemoryStore::new().with_snapshot(Snapshot {
            grid: [
                [2, 2, 8, 0],
                [32, 64, 32, 64],
                [64, 32, 64, 32],
                [32, 64, 32, 64],
            ],
            score: 0,
        });
        let mut game = GameEngine::with_seed(store, config, 13);

        assert!(game.process_move(Direction::Left));
        let merged = game.board().get_tile(0, 0).unwrap();
        assert_eq!(merged.value(), 4);
        assert!(merged.just_merged());

        assert!(game.process_move(Direction::Right));
        let slid = game.board().get_tile(0, 1).unwrap();
        assert_eq!(slid.value(), 4);
        assert_eq!(slid.id(), merged.id());
        assert!(!slid.just_merged());
    }

    #[test]
    fn test_noop_move_is_idempotent() {
        let mut game = engine_with([[2, 4, 0, 0], [0; 4], [0; 4], [0; 4]], 12);
        let before = game.snapshot();

        assert!(!game.process_move(Direction::Left));
        assert_eq!(game.snapshot(), before);
        assert!(!game.process_move(Direction::Left));
        assert_eq!(game.snapshot(), before);
        assert!(!game.process_move(Direction::Up));
        assert_eq!(game.snapshot(), before);

        assert_eq!(game.store().saves(), 0);
        assert!(game.can_undo(), "undo record kept after a no-op move");
    }

    #[test]
    fn test_undo_round_trip() {
        let mut game = engine_with([[2, 2, 4, 0], [0, 0, 0, 8], [0; 4], [0; 4]], 20);
        let before = game.snapshot();

        assert!(game.process_move(Direction::Left));
        let after = game.snapshot();
        assert_ne!(after, before);

        assert!(game.undo_last_move());
        assert_eq!(game.snapshot(), before);
        assert!(!game.can_undo());

        assert!(!game.undo_last_move());
        assert_eq!(game.snapshot(), before);
        assert_eq!(game.store().snapshot(), Some(&before));
    }

    #[test]
    fn test_undo_preserves_tile_identity() {
        let mut game = engine_with([[0, 0, 0, 2], [0; 4], [0; 4], [0; 4]], 0);
        let id = game.board().get_tile(0, 3).unwrap().id();
        assert!(game.process_move(Direction::Left));
        assert_eq!(game.board().get_tile(0, 0).unwrap().id(), id);
        assert!(game.undo_last_move());
        assert_eq!(game.board().get_tile(0, 3).unwrap().id(), id);
    }

    #[test]
    fn test_game_over_detection() {
        let mut game = engine_with(ONE_MOVE_FROM_OVER, 100);
        assert!(!game.is_over());

        assert!(game.process_move(Direction::Right));
        assert!(game.is_over());
        assert_eq!(game.board().tile_count(), 16);

        let saves = game.store().saves();
        let over = game.snapshot();
        for direction in Direction::ALL {
            assert!(!game.process_move(direction));
        }
        assert_eq!(game.snapshot(), over);
        assert_eq!(game.store().saves(), saves);

        assert!(game.undo_last_move());
        assert!(!game.is_over());
        assert_eq!(game.board().values(), ONE_MOVE_FROM_OVER);
    }

    #[test]
    fn test_terminal_snapshot_restores_as_over() {
        let game = engine_with(
            [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]],
            500,
        );
        assert!(game.is_over());
        assert!(!game.can_undo());
    }

    #[test]
    fn test_win_is_announced_once() {
        let mut game = engine_with([[1024, 1024, 0, 0], [0; 4], [0; 4], [0; 4]], 0);

        assert!(game.process_move(Direction::Left));
        assert!(game.has_won());
        assert_eq!(game.win_message(), Some("You reached 2048 in 00:00!"));
        assert!(game.store().win_shown());
        assert!(!game.is_over(), "winning does not end the game");

        assert!(game.undo_last_move());
        assert!(!game.has_won());
        assert!(game.win_message().is_none());

        assert!(game.process_move(Direction::Left));
        assert!(!game.has_won(), "win notification is one-shot per game");
        assert!(game.win_message().is_none());
    }

    #[test]
    fn test_win_flag_survives_restart() {
        let store = MemoryStore::new()
            .with_snapshot(Snapshot {
                grid: [[1024, 1024, 0, 0], [0; 4], [0; 4], [0; 4]],
                score: 0,
            })
            .with_win_shown(true);
        let mut game = GameEngine::with_seed(store, GameConfig::default(), 5);
        assert!(game.process_move(Direction::Left));
        assert!(!game.has_won());

        game.new_game();
        assert!(!game.store().win_shown(), "new game re-arms the win notification");
    }

    #[test]
    fn test_custom_win_value() {
        let config = GameConfig {
            win_value: 8,
            ..GameConfig::default()
        };
        let store = MemoryStore::new().with_snapshot(Snapshot {
            grid: [[4, 4, 0, 0], [0; 4], [0; 4], [0; 4]],
            score: 0,
        });
        let mut game = GameEngine::with_seed(store, config, 11);
        assert!(game.process_move(Direction::Right));
        assert_eq!(game.win_message(), Some("You reached 8 in 00:00!"));
    }

    #[test]
    fn test_high_score_never_decreases() {
        let store = MemoryStore::new()
            .with_snapshot(Snapshot {
                grid: [[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]],
                score: 50,
            })
            .with_high_score(40);
        let mut game = GameEngine::with_seed(store, GameConfig::default(), 8);
        assert_eq!(game.high_score(), 50);

        assert!(game.process_move(Direction::Left));
        assert_eq!(game.high_score(), 54);
        assert_eq!(game.store().high_score(), 54);

        assert!(game.undo_last_move());
        assert_eq!(game.score(), 50);
        assert_eq!(game.high_score(), 54);

        game.new_game();
        assert_eq!(game.score(), 0);
        assert_eq!(game.high_score(), 54);
    }

    #[test]
    fn test_store_failures_do_not_block_play() {
        let store = MemoryStore::new()
            .with_snapshot(Snapshot {
                grid: [[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]],
                score: 0,
            })
            .failing_writes();
        let mut game = GameEngine::with_seed(store, GameConfig::default(), 9);
        assert!(game.process_move(Direction::Left));
        assert_eq!(game.score(), 4);
        assert_eq!(game.high_score(), 4);
        assert_eq!(game.store().saves(), 0);
        assert!(game.undo_last_move());
        game.new_game();
        assert_eq!(game.board().tile_count(), 2);
    }

    #[test]
    fn test_largest_valid_tiles_do_not_overflow() {
        let big = crate::engine::MAX_TILE_VALUE;
        let mut game = engine_with([[big, big, 0, 0], [0; 4], [0; 4], [0; 4]], 0);
        assert_eq!(game.board().tile_count(), 2, "snapshot was accepted");
        assert!(game.process_move(Direction::Left));
        assert_eq!(game.board().get_tile(0, 0).unwrap().value(), big * 2);
        assert_eq!(game.score(), big * 2);
    }

    #[test]
    fn test_oversized_tile_snapshot_starts_new_game() {
        let game = engine_with([[1 << 31, 1 << 31, 0, 0], [0; 4], [0; 4], [0; 4]], 0);
        assert_eq!(game.score(), 0);
        assert_eq!(game.board().tile_count(), 2);
        assert!(game.board().values().iter().flatten().all(|v| *v <= 4));
    }

    #[test]
    fn test_score_saturates_instead_of_overflowing() {
        let mut game = engine_with([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]], u32::MAX);
        assert!(game.process_move(Direction::Left));
        assert_eq!(game.score(), u32::MAX);
        assert_eq!(game.high_score(), u32::MAX);
    }

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        let config = GameConfig {
            four_probability: 1.5,
            ..GameConfig::default()
        };
        let mut game = GameEngine::with_seed(MemoryStore::new(), config, 4);
        assert_eq!(game.config(), &GameConfig::default());
        assert_eq!(game.board().tile_count(), 2);
        assert!(Direction::ALL
            .into_iter()
            .any(|direction| game.process_move(direction)));
    }

    #[test]
    fn test_random_play_accounting() {
        let mut game = GameEngine::with_seed(MemoryStore::new(), GameConfig::default(), 2024);
        let mut high_water = 0;
        for step in 0..500 {
            if game.is_over() {
                break;
            }
            let direction = Direction::ALL[step % 4];
            let expected = game.board().shift(direction);
            let tiles_before = game.board().tile_count();
            let score_before = game.score();

            let moved = game.process_move(direction);
            assert_eq!(moved, expected.changed);
            if moved {
                assert_eq!(expected.score_delta, expected.merged.iter().sum::<u32>());
                assert_eq!(game.score(), score_before + expected.score_delta);
                assert_eq!(
                    game.board().tile_count(),
                    tiles_before - expected.merged.len() + 1
                );
            } else {
                assert_eq!(game.score(), score_before);
                assert_eq!(game.board().tile_count(), tiles_before);
            }
            high_water = high_water.max(game.score());
            assert_eq!(game.high_score(), high_water);
        }
    }
}
