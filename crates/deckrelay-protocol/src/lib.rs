//! Wire protocol for Deckrelay.
//!
//! This crate defines the "language" that clients and the room speak:
//!
//! - **Types** ([`ClientEnvelope`], [`RoomState`], [`ServerEvent`]):
//!   the JSON envelopes that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those envelopes
//!   are converted to/from text frames.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer sits between transport (text frames) and the room
//! (session identity and state). It doesn't know about connections or
//! registries: it only knows how to serialize and deserialize messages.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    close_code, ClientEnvelope, RoomState, ServerEvent, ERR_MISSING_ID,
    ERR_OUT_OF_ORDER, ERR_WRONG_ID,
};
