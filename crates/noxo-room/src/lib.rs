//! Room coordination for the Noxo server.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! roster, game state, and inactivity deadline. All mutations of one room
//! happen on that single task, and broadcasts are sent only after a
//! mutation completed — members always observe a consistent snapshot.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — room-id → room map; lazy creation, eager deletion,
//!   stale sweep
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`Player`] — one seated player, owned by its room
//! - [`RoomConfig`] — capacities, timeouts, and field limits

mod config;
mod error;
mod player;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use player::Player;
pub use registry::RoomRegistry;
pub use room::{LeaveOutcome, MemberSender, RoomHandle, RoomMeta};
