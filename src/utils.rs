use crate::engine::{Board, Tile, BOARD_SIZE};

/// Parses an array of string slices into a `Board` object.
///
/// Each string slice represents a row on the board, starting from row 0, and holds
/// whitespace-separated cells. A cell is either a tile value (a power of two, at least
/// 2) or `.` / `0` for an empty cell. Missing rows and missing trailing cells are empty.
///
/// # Returns
/// * `Ok(Board)` with a fresh tile for every value.
/// * `Err(String)` if there are more than `BOARD_SIZE` rows, a row has more than
///   `BOARD_SIZE` cells, or a cell is not a valid tile value.
///
/// # Examples
/// ```
/// use game_2048::utils::board_from_str_array;
///
/// let board = board_from_str_array(&["2 . 4", "", ". . . 2048"]).unwrap();
/// assert_eq!(board.get_tile(0, 0).unwrap().value(), 2);
/// assert!(board.get_tile(0, 1).is_none());
/// assert_eq!(board.get_tile(2, 3).unwrap().value(), 2048);
/// assert!(board.get_tile(3, 0).is_none());
///
/// assert!(board_from_str_array(&["3"]).is_err());
/// ```
pub fn board_from_str_array(s: &[&str]) -> Result<Board, String> {
    if s.len() > BOARD_SIZE {
        return Err(format!(
            "Invalid number of rows. Expected at most {}, found {}",
            BOARD_SIZE,
            s.len()
        ));
    }

    let mut values = [[0u32; BOARD_SIZE]; BOARD_SIZE];

    for (r, row_str) in s.iter().enumerate() {
        let cells: Vec<&str> = row_str.split_whitespace().collect();
        if cells.len() > BOARD_SIZE {
            return Err(format!(
                "Row {} is too long. Expected at most {} cells, found {}",
                r,
                BOARD_SIZE,
                cells.len()
            ));
        }

        for (c, cell) in cells.iter().enumerate() {
            values[r][c] = match *cell {
                "." | "0" => 0,
                _ => match cell.parse::<u32>() {
                    Ok(value) if Tile::is_valid_value(value) => value,
                    _ => {
                        return Err(format!(
                            "Unrecognized cell '{}' in row {} col {}",
                            cell, r, c
                        ))
                    }
                },
            };
        }
    }

    Ok(Board::from_values(values))
}
