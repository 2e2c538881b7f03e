//! Error types for move application.

/// Typed rejection of an illegal move.
///
/// Checks run in this order, and a rejected move leaves the game state
/// completely untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// The game is not active (still waiting for players, or already over).
    #[error("game is not active")]
    InvalidState,

    /// It is the other player's turn.
    #[error("not your turn")]
    WrongTurn,

    /// The cell index is outside the 9-cell grid.
    #[error("cell index {0} is out of range")]
    OutOfRange(usize),

    /// The cell already holds a mark.
    #[error("cell {0} is already occupied")]
    CellOccupied(usize),
}
