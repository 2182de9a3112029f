//! Error types for the room layer.

use deckrelay_protocol::ProtocolError;
use deckrelay_store::StoreError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room's command channel is closed: the actor is gone.
    #[error("room {0} is unavailable")]
    Unavailable(String),

    /// Reading or writing the persisted state mirror failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An envelope failed to encode or decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
