//! The Deckrelay room core.
//!
//! Each room runs as an isolated Tokio task (actor model) owning the
//! session registry and the versioned state cell. All mutation for one
//! room is serialized through the actor's command channel, so the
//! version-conflict check in [`GameStateCell::accept`] is race-free by
//! construction: no locks anywhere in the core.
//!
//! # Key types
//!
//! - [`spawn_room`]: load persisted state, then start the actor
//! - [`RoomHandle`]: send connection/message/close events to a room
//! - [`SessionRegistry`] / [`Session`]: who is connected, and whether
//!   they have identified yet
//! - [`GameStateCell`]: the latest accepted state plus its persisted
//!   mirror

mod error;
mod room;
mod session;
mod state;

pub use error::RoomError;
pub use room::{spawn_room, RoomHandle, RoomInfo};
pub use session::{
    Session, SessionId, SessionOutbound, SessionPhase, SessionRegistry,
    SessionSender,
};
pub use state::{Accept, GameStateCell};
