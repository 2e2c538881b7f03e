//! Tic-tac-toe rules for Noxo.
//!
//! Pure game logic: board representation, win/tie evaluation, and move
//! application. No I/O and no async — the room layer drives this from its
//! actor task and broadcasts the resulting state.
//!
//! # Key types
//!
//! - [`Symbol`] — a player's mark, `X` or `O`
//! - [`Board`] — the flat 9-cell grid
//! - [`GameState`] — board plus turn, status, winner, and move count
//! - [`MoveError`] — typed rejection of an illegal move

mod board;
mod error;
mod state;

pub use board::{evaluate, Board, Cell, Outcome, Symbol};
pub use error::MoveError;
pub use state::{GameState, MoveReport, Status};
