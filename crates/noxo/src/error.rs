//! Unified error type for the Noxo server.

use noxo_identity::IdentityError;
use noxo_protocol::ProtocolError;
use noxo_room::RoomError;
use noxo_transport::TransportError;

/// Top-level error that wraps all layer-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts layer errors automatically inside the server and
/// handler code.
#[derive(Debug, thiserror::Error)]
pub enum NoxoError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid event).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An identity-resolution error.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// A room-level error (full, not found, not a member).
    #[error(transparent)]
    Room(#[from] RoomError),
}
