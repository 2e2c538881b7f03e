//! Board representation and line evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// A player's mark. The first player to join a room conventionally plays `X`.
///
/// Serializes as the bare string `"X"` or `"O"` so the mark can appear
/// directly inside board cells and roster records on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// Returns the other mark.
    pub fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::O => write!(f, "O"),
        }
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// One cell of the grid: empty or marked.
pub type Cell = Option<Symbol>;

/// The flat 9-cell grid, row-major:
///
/// ```text
///  0 | 1 | 2
/// ---+---+---
///  3 | 4 | 5
/// ---+---+---
///  6 | 7 | 8
/// ```
pub type Board = [Cell; 9];

/// The 8 winning lines: 3 rows, 3 columns, 2 diagonals.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The decided result of a game.
///
/// `X` and `O` serialize as the winning mark; a drawn game serializes as
/// `"tie"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    X,
    O,
    #[serde(rename = "tie")]
    Tie,
}

impl From<Symbol> for Outcome {
    fn from(symbol: Symbol) -> Self {
        match symbol {
            Symbol::X => Self::X,
            Symbol::O => Self::O,
        }
    }
}

/// Evaluates a board.
///
/// A line wins if all three of its cells hold the same mark. If no line wins
/// and every cell is occupied the game is a tie; otherwise the game is still
/// open and `None` is returned.
///
/// Pure and O(1) — at most 8 line checks plus one occupancy scan.
pub fn evaluate(board: &Board) -> Option<Outcome> {
    for line in &LINES {
        if let Some(symbol) = board[line[0]] {
            if board[line[1]] == Some(symbol) && board[line[2]] == Some(symbol) {
                return Some(symbol.into());
            }
        }
    }

    if board.iter().all(|cell| cell.is_some()) {
        return Some(Outcome::Tie);
    }

    None
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(cells: &[(usize, Symbol)]) -> Board {
        let mut board: Board = [None; 9];
        for &(index, symbol) in cells {
            board[index] = Some(symbol);
        }
        board
    }

    #[test]
    fn test_empty_board_is_open() {
        assert_eq!(evaluate(&[None; 9]), None);
    }

    #[test]
    fn test_every_line_wins() {
        for line in LINES {
            let board = board_with(&[
                (line[0], Symbol::X),
                (line[1], Symbol::X),
                (line[2], Symbol::X),
            ]);
            assert_eq!(evaluate(&board), Some(Outcome::X), "line {line:?}");
        }
    }

    #[test]
    fn test_o_win_reports_o() {
        let board = board_with(&[(0, Symbol::O), (4, Symbol::O), (8, Symbol::O)]);
        assert_eq!(evaluate(&board), Some(Outcome::O));
    }

    #[test]
    fn test_mixed_line_does_not_win() {
        let board = board_with(&[(0, Symbol::X), (1, Symbol::O), (2, Symbol::X)]);
        assert_eq!(evaluate(&board), None);
    }

    #[test]
    fn test_full_board_without_line_is_tie() {
        //  X | O | X
        //  X | O | O
        //  O | X | X
        let board = board_with(&[
            (0, Symbol::X),
            (1, Symbol::O),
            (2, Symbol::X),
            (3, Symbol::X),
            (4, Symbol::O),
            (5, Symbol::O),
            (6, Symbol::O),
            (7, Symbol::X),
            (8, Symbol::X),
        ]);
        assert_eq!(evaluate(&board), Some(Outcome::Tie));
    }

    #[test]
    fn test_symbol_opponent_flips() {
        assert_eq!(Symbol::X.opponent(), Symbol::O);
        assert_eq!(Symbol::O.opponent(), Symbol::X);
    }

    #[test]
    fn test_symbol_serializes_as_bare_mark() {
        assert_eq!(serde_json::to_string(&Symbol::X).unwrap(), "\"X\"");
        assert_eq!(serde_json::to_string(&Symbol::O).unwrap(), "\"O\"");
    }

    #[test]
    fn test_outcome_tie_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Outcome::Tie).unwrap(), "\"tie\"");
        assert_eq!(serde_json::to_string(&Outcome::X).unwrap(), "\"X\"");
    }
}
