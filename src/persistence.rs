//! Saved-game snapshots and the stores that keep them.
//!
//! The engine never touches storage directly. It hands a [`Snapshot`] to a [`Store`]
//! at each save point and asks the store for one when it starts up. Two stores are
//! provided:
//! - [`MemoryStore`]: keeps everything in memory, for tests and embedders.
//! - [`JsonFileStore`]: one directory holding `game_state.json` and `preferences.json`.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::{Board, Tile, BOARD_SIZE};
use crate::error::{PersistenceError, SnapshotError};

const GAME_STATE_FILE: &str = "game_state.json";
const PREFERENCES_FILE: &str = "preferences.json";

/// Persisted form of a game: tile values (`0` for empty) and the score.
///
/// Serialises as `{"grid": [[int; 4]; 4], "score": int}`. Tile identity and merge
/// flags are not kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub grid: [[u32; BOARD_SIZE]; BOARD_SIZE],
    pub score: u32,
}

impl Snapshot {
    /// Captures the values on `board` together with `score`.
    ///
    /// # Arguments
    /// * `board`: The board to record. Tile ids and merge flags are dropped.
    /// * `score`: The score at the time of the capture.
    pub fn from_board(board: &Board, score: u32) -> Self {
        Snapshot {
            grid: board.values(),
            score,
        }
    }

    /// Rebuilds a board, with fresh tiles, from the stored values.
    ///
    /// # Errors
    /// Returns `SnapshotError::InvalidTile` for the first cell that is neither `0` nor a
    /// power of two between 2 and `MAX_TILE_VALUE`.
    ///
    /// # Examples
    /// ```
    /// use game_2048::persistence::Snapshot;
    /// let snapshot: Snapshot = serde_json::from_str(
    ///     r#"{"grid":[[2,0,0,0],[0,0,0,0],[0,0,4,0],[0,0,0,0]],"score":12}"#,
    /// ).unwrap();
    /// let board = snapshot.to_board().unwrap();
    /// assert_eq!(board.tile_count(), 2);
    /// assert_eq!(board.get_tile(2, 2).unwrap().value(), 4);
    /// ```
    pub fn to_board(&self) -> Result<Board, SnapshotError> {
        for (row, values) in self.grid.iter().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                if value != 0 && !Tile::is_valid_value(value) {
                    return Err(SnapshotError::InvalidTile { row, col, value });
                }
            }
        }
        Ok(Board::from_values(self.grid))
    }

    /// Decodes and validates a snapshot from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        snapshot.to_board()?;
        Ok(snapshot)
    }

    /// Encodes the snapshot as compact JSON, e.g. `{"grid":[[2,0,0,0],...],"score":4}`.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Load/save contract between the engine and whatever keeps saved data.
///
/// All calls are synchronous. The engine treats every error as non-fatal: a failed
/// load means "nothing saved", a failed save is logged and forgotten.
pub trait Store {
    /// Returns the saved game, or `Ok(None)` if there is none.
    fn load(&mut self) -> Result<Option<Snapshot>, PersistenceError>;

    /// Replaces the saved game with `snapshot`.
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError>;

    /// Returns the best score recorded so far, `0` if none.
    fn load_high_score(&mut self) -> Result<u32, PersistenceError>;

    /// Records a new best score. Kept separately from the saved game.
    fn save_high_score(&mut self, score: u32) -> Result<(), PersistenceError>;

    /// Whether the win notification has already been shown in the current game.
    fn load_win_shown(&mut self) -> Result<bool, PersistenceError>;

    /// Records whether the win notification has been shown; `false` re-arms it.
    fn save_win_shown(&mut self, shown: bool) -> Result<(), PersistenceError>;
}

/// In-memory store.
///
/// # Examples
/// ```
/// use game_2048::persistence::{MemoryStore, Snapshot, Store};
/// let mut store = MemoryStore::new();
/// assert_eq!(store.load().unwrap(), None);
/// let snapshot = Snapshot { grid: [[0; 4]; 4], score: 8 };
/// store.save(&snapshot).unwrap();
/// assert_eq!(store.load().unwrap(), Some(snapshot));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    snapshot: Option<Snapshot>,
    high_score: u32,
    win_shown: bool,
    fail_writes: bool,
    saves: usize,
}

impl MemoryStore {
    /// Creates an empty store: no saved game, high score 0, win not yet shown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a saved game, as if a previous session had saved it.
    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Seeds the stored high score.
    pub fn with_high_score(mut self, high_score: u32) -> Self {
        self.high_score = high_score;
        self
    }

    /// Seeds the stored "win already shown" flag.
    pub fn with_win_shown(mut self, shown: bool) -> Self {
        self.win_shown = shown;
        self
    }

    /// Makes every write fail, as a full disk would.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// The most recently saved snapshot.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// The last high score written to the store.
    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    /// The last win flag written to the store.
    pub fn win_shown(&self) -> bool {
        self.win_shown
    }

    /// Number of snapshots successfully saved.
    pub fn saves(&self) -> usize {
        self.saves
    }

    fn check_writable(&self) -> Result<(), PersistenceError> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "store is read-only").into());
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn load(&mut self) -> Result<Option<Snapshot>, PersistenceError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        self.check_writable()?;
        self.snapshot = Some(snapshot.clone());
        self.saves += 1;
        Ok(())
    }

    fn load_high_score(&mut self) -> Result<u32, PersistenceError> {
        Ok(self.high_score)
    }

    fn save_high_score(&mut self, score: u32) -> Result<(), PersistenceError> {
        self.check_writable()?;
        self.high_score = score;
        Ok(())
    }

    fn load_win_shown(&mut self) -> Result<bool, PersistenceError> {
        Ok(self.win_shown)
    }

    fn save_win_shown(&mut self, shown: bool) -> Result<(), PersistenceError> {
        self.check_writable()?;
        self.win_shown = shown;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Preferences {
    high_score: u32,
    win_shown: bool,
}

/// Directory-backed store writing JSON files.
///
/// Missing files read as "nothing saved" and default preferences. The directory is
/// created on the first write.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. Nothing is touched on disk until the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    /// Returns the directory holding the store's files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_file(&self, name: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.dir.join(name)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes through a temporary file and a rename, so readers never see half a file.
    ///
    /// The temporary file is removed again if either step fails.
    fn write_file(&self, name: &str, content: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{}.tmp", name));
        let result = fs::write(&tmp, content).and_then(|()| fs::rename(&tmp, self.dir.join(name)));
        if let Err(e) = result {
            // Best effort; the original error is the one worth reporting.
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn read_preferences(&self) -> Result<Preferences, PersistenceError> {
        match self.read_file(PREFERENCES_FILE)? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(Preferences::default()),
        }
    }

    fn update_preferences(
        &self,
        update: impl FnOnce(&mut Preferences),
    ) -> Result<(), PersistenceError> {
        // An unreadable preferences file is replaced rather than blocking the write.
        let mut prefs = self.read_preferences().unwrap_or_default();
        update(&mut prefs);
        self.write_file(PREFERENCES_FILE, &serde_json::to_string_pretty(&prefs)?)
    }
}

impl Store for JsonFileStore {
    fn load(&mut self) -> Result<Option<Snapshot>, PersistenceError> {
        self.read_file(GAME_STATE_FILE)?
            .map(|content| Snapshot::from_json(&content))
            .transpose()
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        self.write_file(GAME_STATE_FILE, &snapshot.to_json()?)
    }

    fn load_high_score(&mut self) -> Result<u32, PersistenceError> {
        Ok(self.read_preferences()?.high_score)
    }

    fn save_high_score(&mut self, score: u32) -> Result<(), PersistenceError> {
        self.update_preferences(|prefs| prefs.high_score = score)
    }

    fn load_win_shown(&mut self) -> Result<bool, PersistenceError> {
        Ok(self.read_preferences()?.win_shown)
    }

    fn save_win_shown(&mut self, shown: bool) -> Result<(), PersistenceError> {
        self.update_preferences(|prefs| prefs.win_shown = shown)
    }
}
