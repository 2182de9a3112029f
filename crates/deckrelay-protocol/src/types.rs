//! Core wire types for Deckrelay's JSON protocol.
//!
//! Every recognized envelope shape lives here. Inbound traffic is a
//! single permissive shape ([`ClientEnvelope`]) whose present/absent
//! fields decide whether it is a handshake, a state update, or a
//! liveness ping. Outbound traffic is either the full [`RoomState`]
//! or a [`ServerEvent`] notification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error text for a first message that carries no session id.
pub const ERR_MISSING_ID: &str = "First message missing session ID";

/// Error text for a later message whose id doesn't match the session.
pub const ERR_WRONG_ID: &str = "Session ID incorrect";

/// Error text for a state update with a stale version.
pub const ERR_OUT_OF_ORDER: &str = "Message out of order";

/// WebSocket close codes used by the room.
///
/// Application close codes live in the 4000–4999 range, mirroring HTTP
/// status classes for readability.
pub mod close_code {
    /// The first message on the connection carried no session id.
    pub const MISSING_ID: u16 = 4400;

    /// A message arrived for a session the room already terminated.
    pub const BROKEN: u16 = 4500;
}

/// The versioned room state blob.
///
/// `state` is opaque application data; the relay never inspects it
/// beyond passing it through. `id` is the room id, echoed in every
/// payload; `version` is the monotonic counter used as the sole
/// conflict check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomState {
    /// The room/game id this state belongs to.
    pub id: String,
    /// Monotonically increasing version.
    pub version: u64,
    /// Opaque application payload.
    pub state: Value,
}

/// The single inbound envelope shape.
///
/// All fields are optional so the same struct covers every recognized
/// inbound message:
///
/// - `{id}` as first message → handshake
/// - `{id, version, state}` → state update
/// - `{id}` after handshake → liveness ping
///
/// Which one it is depends on the session's phase, not the payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientEnvelope {
    /// The client's self-asserted session id.
    #[serde(default)]
    pub id: Option<String>,
    /// Candidate version for a state update.
    #[serde(default)]
    pub version: Option<u64>,
    /// Candidate state payload for a state update.
    #[serde(default)]
    pub state: Option<Value>,
}

/// Outbound notification envelopes.
///
/// Serialized untagged, so each variant produces exactly the bare JSON
/// object clients expect: `{"joined": ...}`, `{"quit": ...}`,
/// `{"error": ...}` or `{"error": ..., "gameState": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerEvent {
    /// A session completed the handshake.
    Joined {
        /// The new session's id.
        joined: String,
    },

    /// An identified session left (disconnect or dead connection).
    Quit {
        /// The departed session's id.
        quit: String,
    },

    /// A sender-only diagnostic. `game_state` is set only for
    /// out-of-order rejections, echoing the still-current state.
    Error {
        /// Human-readable diagnostic.
        error: String,
        /// The still-current state, on out-of-order rejection.
        #[serde(
            rename = "gameState",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        game_state: Option<RoomState>,
    },
}

impl ServerEvent {
    /// Builds a plain error event with no state echo.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
            game_state: None,
        }
    }

    /// Builds an out-of-order rejection echoing the current state.
    pub fn out_of_order(current: RoomState) -> Self {
        Self::Error {
            error: ERR_OUT_OF_ORDER.to_string(),
            game_state: Some(current),
        }
    }
}
