//! Wire types for the Noxo room server.
//!
//! Every structure here is serialized to JSON and crosses the socket.
//! Events use internally tagged enums (`{"type": "JoinRoom", ...}`) so a
//! JavaScript client can switch on a single `type` field.

use std::fmt;

use noxo_engine::{GameState, Symbol};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A client-chosen room key.
///
/// Rooms are keyed by short strings ("lobby3", a friend code, …) rather
/// than server-issued numbers: joining an unknown id creates the room.
/// Length limits are enforced at the session edge, not here.
///
/// `#[serde(transparent)]` makes `RoomId("ab".into())` serialize as the
/// bare string `"ab"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Length in characters, as the join validation counts it.
    pub fn len_chars(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Roster and snapshot records
// ---------------------------------------------------------------------------

/// One seated player, as broadcast to the room.
///
/// `id` is the transport-level connection id — the only identity the
/// server vouches for. `external_id` is whatever the identity provider
/// returned and is passed through opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: u64,
    pub external_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub symbol: Symbol,
    pub ready: bool,
}

/// A consistent view of one room after a mutation completed.
///
/// Every room broadcast carries one of these, so all members converge on
/// the same roster and game state regardless of which event they acted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: RoomId,
    pub players: Vec<PlayerInfo>,
    pub game: GameState,
}

/// A public-listing record for one joinable room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub player_count: usize,
    pub max_players: usize,
    /// Room creation time, unix milliseconds.
    pub created_ms: u64,
}

// ---------------------------------------------------------------------------
// ClientEvent — inbound
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// `Hello` must be the first event on a fresh connection; everything else
/// is rejected until the server has answered with
/// [`ServerEvent::Welcome`]. Room-scoped events repeat the room id so the
/// server can refuse actions against rooms the connection never joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Identify this connection. `token` is opaque to the server and
    /// handed to the configured identity provider.
    Hello { token: String },

    /// Join `room`, creating it if the id is unknown. The first joiner's
    /// `private` flag fixes the room's visibility permanently.
    JoinRoom {
        room: RoomId,
        name: String,
        symbol: Symbol,
        #[serde(default)]
        avatar: Option<String>,
        #[serde(default)]
        private: bool,
    },

    /// Place `symbol` at `index` (0–8, row-major).
    MakeMove {
        room: RoomId,
        index: usize,
        symbol: Symbol,
    },

    /// Wipe the board and start over. Any member, any time.
    ResetGame { room: RoomId },

    /// Toggle the sender's ready flag (UI feedback only).
    PlayerReady { room: RoomId },

    /// Say something to the room. Not stored anywhere.
    Chat { room: RoomId, message: String },

    /// Ask for the public room listing.
    ListRooms,

    /// Leave the room but keep the connection.
    Leave { room: RoomId },
}

// ---------------------------------------------------------------------------
// ServerEvent — outbound
// ---------------------------------------------------------------------------

/// Events the server sends to clients.
///
/// Broadcasts (`RoomUpdate`, `GameStart`, `MoveUpdate`, …) go to every
/// member of the affected room. Rejections (`RoomFull`, `SymbolTaken`,
/// `Error`) go only to the connection whose request failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Identity accepted; the connection may now join a room.
    Welcome { connection_id: u64 },

    /// The caller's join succeeded. Broadcasts with the same snapshot go
    /// to the rest of the room separately.
    JoinSuccess {
        symbol: Symbol,
        snapshot: RoomSnapshot,
    },

    /// Roster or state changed without starting or ending a game.
    RoomUpdate { snapshot: RoomSnapshot },

    /// The second player is seated; the game is now active with X to move.
    GameStart { snapshot: RoomSnapshot },

    /// A move was placed and the game continues.
    MoveUpdate {
        index: usize,
        symbol: Symbol,
        snapshot: RoomSnapshot,
    },

    /// A move decided the game; `snapshot.game.winner` holds the result.
    GameEnd { snapshot: RoomSnapshot },

    /// A member reset the room.
    GameReset { snapshot: RoomSnapshot },

    /// A member toggled their ready flag.
    PlayerReadyUpdate { snapshot: RoomSnapshot },

    /// A member left mid-game; the snapshot shows the abandoned,
    /// finished game with no winner.
    PlayerLeft { snapshot: RoomSnapshot },

    /// A chat line. `id` is a server-generated unique message id.
    Chat {
        id: String,
        name: String,
        avatar: Option<String>,
        message: String,
        timestamp_ms: u64,
    },

    /// The public room listing.
    RoomList { rooms: Vec<RoomSummary> },

    /// Join rejected: both seats are taken.
    RoomFull { room: RoomId },

    /// Join rejected: the requested mark is already claimed.
    SymbolTaken { room: RoomId },

    /// The inactivity timer fired; the room is back to waiting with the
    /// players still seated.
    GameTimeout { snapshot: RoomSnapshot },

    /// Anything else that went wrong with the caller's request.
    Error { message: String },
}

// =========================================================================
// Tests
// =========================================================================
