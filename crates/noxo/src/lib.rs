//! # Noxo
//!
//! A real-time two-player tic-tac-toe room server.
//!
//! Clients connect over WebSocket, identify themselves, and join named
//! rooms. Each room runs its own small turn-based state machine — turn
//! order, win detection, membership, chat, inactivity cleanup — and every
//! mutation is broadcast to the room as a consistent snapshot.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use noxo::{AnonymousIdentity, NoxoServerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), noxo::NoxoError> {
//!     let server = NoxoServerBuilder::new()
//!         .bind("0.0.0.0:8080")
//!         .build(AnonymousIdentity)
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::NoxoError;
pub use server::{NoxoServer, NoxoServerBuilder};

// Re-export the layer types a server embedder or client crate needs.
pub use noxo_engine::{GameState, MoveError, Outcome, Status, Symbol};
pub use noxo_identity::{AnonymousIdentity, Identity, IdentityError, IdentityProvider};
pub use noxo_protocol::{
    ClientEvent, Codec, JsonCodec, PlayerInfo, RoomId, RoomSnapshot, RoomSummary,
    ServerEvent,
};
pub use noxo_room::{RoomConfig, RoomError};
