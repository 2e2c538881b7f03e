//! Game state and move application.

use serde::{Deserialize, Serialize};

use crate::{evaluate, Board, MoveError, Outcome, Symbol};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// The lifecycle of one game inside a room.
///
/// ```text
/// Waiting ──(second player joins)──→ Active ──(win / tie / departure)──→ Finished
///    ↑                                  │
///    └───────────(reset, timeout)───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Fewer than two players seated; no moves accepted.
    Waiting,
    /// Two players seated, moves accepted.
    Active,
    /// Decided, drawn, or abandoned. Board is frozen until a reset.
    Finished,
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// What a successful move did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveReport {
    /// The game continues; the turn has passed to the opponent.
    InProgress,
    /// The move decided the game (win or tie).
    Decided(Outcome),
}

/// The full state of one game.
///
/// Invariant: `move_count` always equals the number of occupied cells, and
/// `winner` is only `Some` when `status` is [`Status::Finished`]. An
/// abandoned game is `Finished` with `winner` still `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub current_turn: Symbol,
    pub status: Status,
    pub winner: Option<Outcome>,
    pub move_count: u8,
}

impl GameState {
    /// A fresh game: empty board, `X` to move, waiting for players.
    pub fn new() -> Self {
        Self {
            board: [None; 9],
            current_turn: Symbol::X,
            status: Status::Waiting,
            winner: None,
            move_count: 0,
        }
    }

    /// Starts play. Called when the second player is seated.
    pub fn begin(&mut self) {
        self.status = Status::Active;
        self.current_turn = Symbol::X;
    }

    /// Wipes the board back to a waiting state, keeping nothing.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Force-ends the game with no winner (a player left mid-game).
    pub fn abandon(&mut self) {
        self.status = Status::Finished;
        self.winner = None;
    }

    /// Applies one move for `symbol` at `index`.
    ///
    /// Validation happens before any mutation, so an `Err` return means the
    /// state is exactly as it was. On success the cell is set, the move
    /// count incremented, and the board evaluated: a decided game freezes
    /// with its winner recorded, an open game passes the turn.
    pub fn apply_move(
        &mut self,
        index: usize,
        symbol: Symbol,
    ) -> Result<MoveReport, MoveError> {
        if self.status != Status::Active {
            return Err(MoveError::InvalidState);
        }
        if symbol != self.current_turn {
            return Err(MoveError::WrongTurn);
        }
        let cell = self.board.get(index).ok_or(MoveError::OutOfRange(index))?;
        if cell.is_some() {
            return Err(MoveError::CellOccupied(index));
        }

        self.board[index] = Some(symbol);
        self.move_count += 1;

        match evaluate(&self.board) {
            Some(outcome) => {
                self.status = Status::Finished;
                self.winner = Some(outcome);
                Ok(MoveReport::Decided(outcome))
            }
            None => {
                self.current_turn = symbol.opponent();
                Ok(MoveReport::InProgress)
            }
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
