//! The game state cell: latest accepted state plus its persisted mirror.

use deckrelay_protocol::{Codec, JsonCodec, RoomState};
use deckrelay_store::StateStore;
use serde_json::Value;

use crate::RoomError;

/// Outcome of offering a candidate state to the cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Accept {
    /// The candidate replaced the current state (already persisted).
    Applied(RoomState),
    /// The candidate's version was stale; the still-current state is
    /// returned for the caller to report.
    OutOfOrder(RoomState),
}

/// Holds the latest accepted [`RoomState`] and keeps the store's copy
/// in sync.
///
/// The cell is owned by the room actor, so all access is serialized;
/// `accept` is the only suspension point besides the initial load.
pub struct GameStateCell<S: StateStore> {
    room_id: String,
    store: S,
    current: Option<RoomState>,
    codec: JsonCodec,
}

impl<S: StateStore> GameStateCell<S> {
    /// Reads the last known state from the store. Called once, before
    /// the room handles anything.
    pub async fn load(room_id: String, store: S) -> Result<Self, RoomError> {
        let codec = JsonCodec;
        let current = match store.get(&room_id).await? {
            Some(text) => Some(codec.decode::<RoomState>(&text)?),
            None => None,
        };
        if let Some(state) = &current {
            tracing::info!(
                room_id = %room_id,
                version = state.version,
                "loaded persisted state"
            );
        }
        Ok(Self {
            room_id,
            store,
            current,
            codec,
        })
    }

    /// The in-memory snapshot. Never touches the store.
    pub fn current(&self) -> Option<&RoomState> {
        self.current.as_ref()
    }

    /// Offers a candidate state.
    ///
    /// Rejects with [`Accept::OutOfOrder`] when a current state exists
    /// and the candidate's version is not strictly greater. Otherwise
    /// the new value is persisted first and swapped in afterwards, so a
    /// failed write leaves memory and disk consistent. The accepted
    /// state carries the room's own id, whatever the sender put in the
    /// envelope.
    ///
    /// # Errors
    /// Propagates store and encode failures; the caller reports them to
    /// the offending client.
    pub async fn accept(
        &mut self,
        version: u64,
        state: Value,
    ) -> Result<Accept, RoomError> {
        if let Some(current) = &self.current {
            if version <= current.version {
                return Ok(Accept::OutOfOrder(current.clone()));
            }
        }

        let candidate = RoomState {
            id: self.room_id.clone(),
            version,
            state,
        };
        let text = self.codec.encode(&candidate)?;
        self.store.put(&self.room_id, &text).await?;
        self.current = Some(candidate.clone());
        Ok(Accept::Applied(candidate))
    }
}
