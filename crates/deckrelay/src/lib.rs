//! # Deckrelay
//!
//! A single-room, multi-client realtime state relay. Clients connect
//! over WebSocket, assert an identity in their first message, and from
//! then on receive every other client's versioned state updates plus
//! join/leave notifications. The relay is domain-agnostic about the
//! payload: it enforces identity, ordering, and fan-out, nothing else.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deckrelay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RelayError> {
//!     let server = RelayServer::builder()
//!         .bind("0.0.0.0:8080")
//!         .room_id("table-1")
//!         .build(MemoryStore::new())
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder};

/// Commonly used types, re-exported for one-line imports.
pub mod prelude {
    pub use crate::{RelayError, RelayServer, RelayServerBuilder};
    pub use deckrelay_protocol::{
        close_code, ClientEnvelope, RoomState, ServerEvent,
    };
    pub use deckrelay_room::{RoomHandle, RoomInfo, SessionId};
    pub use deckrelay_store::{MemoryStore, StateStore};
}
