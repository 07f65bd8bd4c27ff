//! WebSocket protocol messages for tactics multiplayer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tactics_core::{Action, ClientId, GameConfig, GameSnapshot, GameSummary, Seat, StateUpdate};

/// Index of a room in the registry
pub type RoomId = u32;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Join a room, taking a free seat or spectating
    JoinGame { room_id: RoomId },

    /// Leave the current room and return to the lobby
    LeaveGame,

    /// Submit a game action
    Action { action: Action },

    /// Open a new room
    CreateGame { config: GameConfig },

    /// Request the room list
    ListGames,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned client ID
    Welcome { client_id: ClientId },

    /// Replace the local game wholesale
    FullState { state: GameSnapshot },

    /// Merge the fields present
    StateUpdate { update: StateUpdate },

    /// Action performed by another player
    Action { action: Action },

    /// Seat this client controls; `None` for spectators
    PlayingAs { seat: Option<Seat> },

    /// Lobby listing
    GameList { games: BTreeMap<RoomId, GameSummary> },

    /// The requested room does not exist
    Kick,

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}
