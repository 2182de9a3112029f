//! Unified error type for the Deckrelay server.

use deckrelay_protocol::ProtocolError;
use deckrelay_room::RoomError;
use deckrelay_store::StoreError;
use deckrelay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A persistence-level error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A room-level error (actor gone, store, protocol).
    #[error(transparent)]
    Room(#[from] RoomError),
}
