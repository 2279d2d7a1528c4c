//! Board model and grid transform for the 2048 puzzle.
//!
//! This module defines the game's fundamental components:
//! - `Direction`: The four directions a move can slide the tiles.
//! - `Tile`: A numbered piece with a stable identity and a per-move merge flag.
//! - `Board`: The 4x4 grid, including the compact/merge/pad transform, random tile
//!   insertion and terminal-state detection.
//!
//! Every direction is derived from the single left-slide primitive: `Right` reverses
//! each row around it, `Up` transposes around it and `Down` transposes around `Right`.
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Defines the size of the game board (width and height).
pub const BOARD_SIZE: usize = 4;

/// Largest tile value accepted on a board.
///
/// This is the biggest tile a 4x4 game can reach (every cell filled with a descending
/// chain ending in a spawned 4). Even a board of sixteen such tiles cannot merge past
/// 2^21, so merge values and score deltas always fit in a `u32`.
pub const MAX_TILE_VALUE: u32 = 1 << 17;

/// One of the four directions a move can slide the tiles towards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions, in a fixed order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

static NEXT_TILE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a tile.
///
/// A tile keeps its id while it slides around unmerged, so a presentation layer can
/// animate it from its old cell to its new one. Merged and spawned tiles get fresh ids.
/// Game logic never compares ids, only values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(u64);

impl TileId {
    fn next() -> Self {
        TileId(NEXT_TILE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A single numbered piece occupying one board cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tile {
    id: TileId,
    value: u32,
    just_merged: bool,
}

impl Tile {
    /// Creates a fresh tile with a new identity.
    ///
    /// # Examples
    ///
    /// ```
    /// use game_2048::engine::Tile;
    /// let a = Tile::new(2);
    /// let b = Tile::new(2);
    /// assert_eq!(a.value(), b.value());
    /// assert_ne!(a.id(), b.id());
    /// assert!(!a.just_merged());
    /// ```
    pub fn new(value: u32) -> Self {
        Tile {
            id: TileId::next(),
            value,
            just_merged: false,
        }
    }

    fn merged(value: u32) -> Self {
        Tile {
            just_merged: true,
            ..Tile::new(value)
        }
    }

    /// Returns the tile's identity, stable for as long as it slides without merging.
    pub fn id(&self) -> TileId {
        self.id
    }

    /// Returns the number shown on the tile.
    pub fn value(&self) -> u32 {
        self.value
    }

    /// True only for tiles created by a merge during the most recent move.
    pub fn just_merged(&self) -> bool {
        self.just_merged
    }

    /// Returns `true` if `value` can appear on a tile.
    ///
    /// A valid value is a power of two between 2 and `MAX_TILE_VALUE` inclusive.
    ///
    /// # Examples
    /// ```
    /// use game_2048::engine::{Tile, MAX_TILE_VALUE};
    /// assert!(Tile::is_valid_value(2048));
    /// assert!(!Tile::is_valid_value(6));
    /// assert!(!Tile::is_valid_value(1));
    /// assert!(!Tile::is_valid_value(MAX_TILE_VALUE * 2));
    /// ```
    pub fn is_valid_value(value: u32) -> bool {
        (2..=MAX_TILE_VALUE).contains(&value) && value.is_power_of_two()
    }

    /// Returns the ANSI background colour code used for terminal output.
    fn to_ansi_color_code(tile: Option<Tile>) -> &'static str {
        match tile.map_or(0, |t| t.value) {
            0 => "100",
            2 => "47",
            4 => "107",
            8 => "43",
            16 => "103",
            32 => "41",
            64 => "101",
            128 => "42",
            256 => "102",
            512 => "46",
            1024 => "106",
            2048 => "45",
            _ => "44",
        }
    }
}

/// One row (or, after a transpose, one column) of the board.
pub type Row = [Option<Tile>; BOARD_SIZE];

/// Outcome of sliding a single row to the left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowShift {
    /// The resulting row, tiles left-aligned.
    pub row: Row,
    /// Whether the value sequence differs from the input row.
    pub changed: bool,
    /// Sum of the values of all tiles created by merges.
    pub score_delta: u32,
    /// Values of the tiles created by merges, in scan order.
    pub merged: Vec<u32>,
}

/// Slides one row to the left: compact, merge, then pad.
///
/// Empty cells are removed first, then equal neighbours are merged left to right.
/// A tile takes part in at most one merge per move, so a freshly merged tile is never
/// compared against the next original tile.
///
/// # Examples
///
/// ```
/// use game_2048::engine::{transform_row, Tile};
/// let row = [Some(Tile::new(2)), Some(Tile::new(2)), Some(Tile::new(4)), None];
/// let shift = transform_row(&row);
/// let values: Vec<u32> = shift.row.iter().map(|t| t.map_or(0, |t| t.value())).collect();
/// assert_eq!(values, vec![4, 4, 0, 0]);
/// assert_eq!(shift.score_delta, 4);
/// assert!(shift.changed);
/// ```
pub fn transform_row(row: &Row) -> RowShift {
    let compacted: Vec<Tile> = row.iter().flatten().copied().collect();

    let mut kept = Vec::with_capacity(BOARD_SIZE);
    let mut merged = Vec::new();
    let mut score_delta = 0;
    let mut i = 0;
    while i < compacted.len() {
        if i + 1 < compacted.len() && compacted[i].value == compacted[i + 1].value {
            let value = compacted[i].value * 2;
            kept.push(Tile::merged(value));
            merged.push(value);
            score_delta += value;
            i += 2;
        } else {
            kept.push(compacted[i]);
            i += 1;
        }
    }

    let mut new_row: Row = [None; BOARD_SIZE];
    for (slot, tile) in new_row.iter_mut().zip(kept) {
        *slot = Some(tile);
    }

    RowShift {
        changed: row_values(&new_row) != row_values(row),
        row: new_row,
        score_delta,
        merged,
    }
}

fn row_values(row: &Row) -> [u32; BOARD_SIZE] {
    row.map(|tile| tile.map_or(0, |t| t.value))
}

/// Outcome of sliding the whole board in one direction, before any new tile is spawned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shift {
    /// The candidate board.
    pub board: Board,
    /// Whether any row changed.
    pub changed: bool,
    /// Sum of all row score deltas.
    pub score_delta: u32,
    /// Values of every tile created by a merge during the move.
    pub merged: Vec<u32>,
}

/// Represents the game board as a 4x4 grid of optional `Tile`s.
///
/// Row-major, with the origin at the top-left. Exactly the cells holding a tile are
/// `Some`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    grid: [Row; BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Board::new_empty()
    }
}

impl Board {
    /// Creates a board with no tiles.
    ///
    /// # Examples
    /// ```
    /// use game_2048::engine::Board;
    /// let board = Board::new_empty();
    /// assert_eq!(board.tile_count(), 0);
    /// assert!(board.get_tile(0, 0).is_none());
    /// ```
    pub fn new_empty() -> Self {
        Board {
            grid: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Creates a board from a grid of values, where `0` marks an empty cell.
    ///
    /// Every non-zero value becomes a fresh tile. The values are not validated here;
    /// see `Snapshot::to_board` for the checked conversion. Non-zero values are expected
    /// to satisfy `Tile::is_valid_value`, which keeps every later merge within `u32`.
    pub fn from_values(values: [[u32; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        let mut board = Board::new_empty();
        for (r, row) in values.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                if value != 0 {
                    board.grid[r][c] = Some(Tile::new(value));
                }
            }
        }
        board
    }

    /// Returns the grid of tile values, `0` for empty cells.
    pub fn values(&self) -> [[u32; BOARD_SIZE]; BOARD_SIZE] {
        self.grid.map(|row| row_values(&row))
    }

    /// Compares two boards cell for cell by value, ignoring tile identity and flags.
    pub fn same_values(&self, other: &Board) -> bool {
        self.values() == other.values()
    }

    /// Returns the tile at row `r` and column `c`.
    ///
    /// # Panics
    /// Panics if `r` or `c` are outside the board.
    pub fn get_tile(&self, r: usize, c: usize) -> Option<Tile> {
        self.grid[r][c]
    }

    /// Places `tile` (or clears the cell with `None`) at row `r` and column `c`.
    ///
    /// # Panics
    /// Panics if `r` or `c` are outside the board.
    pub fn set_tile(&mut self, r: usize, c: usize, tile: Option<Tile>) {
        self.grid[r][c] = tile;
    }

    /// Returns an immutable reference to the underlying grid.
    pub fn get_grid(&self) -> &[Row; BOARD_SIZE] {
        &self.grid
    }

    /// Number of occupied cells.
    pub fn tile_count(&self) -> usize {
        self.grid.iter().flatten().filter(|t| t.is_some()).count()
    }

    /// Coordinates of every empty cell, in row-major order.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                if self.grid[r][c].is_none() {
                    cells.push((r, c));
                }
            }
        }
        cells
    }

    /// Returns `true` if at least one cell is empty.
    pub fn has_empty_cells(&self) -> bool {
        self.grid.iter().flatten().any(|t| t.is_none())
    }

    /// Returns `true` if two horizontally or vertically adjacent tiles share a value.
    pub fn can_merge(&self) -> bool {
        let values = self.values();
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                let value = values[r][c];
                if value == 0 {
                    continue;
                }
                if c + 1 < BOARD_SIZE && values[r][c + 1] == value {
                    return true;
                }
                if r + 1 < BOARD_SIZE && values[r + 1][c] == value {
                    return true;
                }
            }
        }
        false
    }

    /// A board is terminal when it is full and no adjacent pair can merge.
    ///
    /// # Examples
    /// ```
    /// use game_2048::engine::Board;
    /// let stuck = Board::from_values([
    ///     [2, 4, 2, 4],
    ///     [4, 2, 4, 2],
    ///     [2, 4, 2, 4],
    ///     [4, 2, 4, 2],
    /// ]);
    /// assert!(stuck.is_terminal());
    /// assert!(!Board::new_empty().is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        !self.has_empty_cells() && !self.can_merge()
    }

    /// Resets the `just_merged` flag on every tile.
    pub fn clear_merge_flags(&mut self) {
        for tile in self.grid.iter_mut().flatten().flatten() {
            tile.just_merged = false;
        }
    }

    /// Returns the board with rows and columns swapped.
    pub fn transposed(&self) -> Board {
        let mut board = Board::new_empty();
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                board.grid[c][r] = self.grid[r][c];
            }
        }
        board
    }

    /// Returns the board with every row reversed.
    pub fn reversed_rows(&self) -> Board {
        let mut board = self.clone();
        for row in board.grid.iter_mut() {
            row.reverse();
        }
        board
    }

    /// Slides the board in `direction`, producing a candidate board.
    ///
    /// No tile is spawned; `self` is left untouched.
    ///
    /// # Examples
    /// ```
    /// use game_2048::engine::{Board, Direction};
    /// let board = Board::from_values([
    ///     [2, 0, 0, 0],
    ///     [2, 0, 0, 0],
    ///     [0, 0, 0, 0],
    ///     [0, 0, 0, 0],
    /// ]);
    /// let shift = board.shift(Direction::Down);
    /// assert!(shift.changed);
    /// assert_eq!(shift.score_delta, 4);
    /// assert_eq!(shift.board.values()[3][0], 4);
    /// ```
    pub fn shift(&self, direction: Direction) -> Shift {
        match direction {
            Direction::Left => self.shift_left(),
            Direction::Right => {
                let shifted = self.reversed_rows().shift_left();
                Shift {
                    board: shifted.board.reversed_rows(),
                    ..shifted
                }
            }
            Direction::Up => {
                let shifted = self.transposed().shift_left();
                Shift {
                    board: shifted.board.transposed(),
                    ..shifted
                }
            }
            Direction::Down => {
                let shifted = self.transposed().shift(Direction::Right);
                Shift {
                    board: shifted.board.transposed(),
                    ..shifted
                }
            }
        }
    }

    fn shift_left(&self) -> Shift {
        let mut board = Board::new_empty();
        let mut changed = false;
        let mut score_delta: u32 = 0;
        let mut merged = Vec::new();

        for (r, row) in self.grid.iter().enumerate() {
            let row_shift = transform_row(row);
            board.grid[r] = row_shift.row;
            changed |= row_shift.changed;
            score_delta = score_delta.saturating_add(row_shift.score_delta);
            merged.extend(row_shift.merged);
        }

        Shift {
            board,
            changed,
            score_delta,
            merged,
        }
    }

    /// Places one new tile in a uniformly chosen empty cell.
    ///
    /// The tile is a 4 with probability `four_probability` and a 2 otherwise.
    ///
    /// # Returns
    /// The coordinates of the new tile, or `None` if the board is full.
    ///
    /// # Panics
    /// Panics if `four_probability` is outside `[0, 1]`.
    pub fn insert_random_tile(
        &mut self,
        rng: &mut impl Rng,
        four_probability: f64,
    ) -> Option<(usize, usize)> {
        let empty = self.empty_cells();
        let &(r, c) = empty.choose(rng)?;
        let value = if rng.gen_bool(four_probability) { 4 } else { 2 };
        self.grid[r][c] = Some(Tile::new(value));
        Some((r, c))
    }
}

impl fmt::Display for Board {
    /// Draws the board with ANSI background colours, one line per row.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.grid.iter().enumerate() {
            for tile in row {
                let label = tile.map_or(String::new(), |t| t.value.to_string());
                write!(
                    f,
                    "\x1b[1;30;{}m{:^6}\x1b[m",
                    Tile::to_ansi_color_code(*tile),
                    label
                )?;
            }
            if r < BOARD_SIZE - 1 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
