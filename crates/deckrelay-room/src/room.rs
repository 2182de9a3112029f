//! Room actor: an isolated Tokio task that owns one room's registry and
//! state cell.
//!
//! All events for a room (connections, inbound frames, transport
//! closes) are funneled through one mpsc channel and handled one at a
//! time, so no two state acceptances can interleave and the version
//! check is race-free. The only suspension points are the persistence
//! write in `accept` and the initial load (which completes before the
//! actor starts draining commands).

use std::collections::VecDeque;

use deckrelay_protocol::{
    close_code, ClientEnvelope, Codec, JsonCodec, ProtocolError, ServerEvent,
    ERR_MISSING_ID, ERR_WRONG_ID,
};
use deckrelay_store::StateStore;
use tokio::sync::{mpsc, oneshot};

use crate::state::{Accept, GameStateCell};
use crate::{RoomError, SessionId, SessionOutbound, SessionRegistry, SessionSender};

/// Commands sent to a room actor through its channel.
enum RoomCommand {
    /// Admit a new connection as an unidentified session.
    Connect {
        sender: SessionSender,
        reply: oneshot::Sender<SessionId>,
    },

    /// Deliver an inbound text frame from a session's connection.
    Inbound { session: SessionId, text: String },

    /// The transport reported the connection closed or errored.
    Closed { session: SessionId },

    /// Request a metadata snapshot.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Shut down the room.
    Shutdown,
}

/// A snapshot of room metadata (not the game state itself).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    /// The room's id.
    pub room_id: String,
    /// Number of live sessions, identified or not.
    pub sessions: usize,
    /// Number of sessions that have completed the handshake.
    pub identified: usize,
    /// Version of the current state, if any state has been accepted
    /// or loaded.
    pub version: Option<u64>,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: String,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's id.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Admits a new connection and returns its session id.
    ///
    /// `sender` is the channel the room will push [`SessionOutbound`]
    /// instructions through; the caller owns the receiving side and the
    /// socket.
    pub async fn connect(
        &self,
        sender: SessionSender,
    ) -> Result<SessionId, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Connect {
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Delivers an inbound text frame (fire-and-forget).
    pub async fn message(
        &self,
        session: SessionId,
        text: impl Into<String>,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Inbound {
                session,
                text: text.into(),
            })
            .await
            .map_err(|_| self.unavailable())
    }

    /// Reports that a session's connection closed or errored.
    pub async fn closed(&self, session: SessionId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Closed { session })
            .await
            .map_err(|_| self.unavailable())
    }

    /// Requests a metadata snapshot.
    ///
    /// Because commands are handled in order, awaiting this also acts
    /// as a barrier: everything sent before it has been processed.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<S: StateStore> {
    room_id: String,
    registry: SessionRegistry,
    cell: GameStateCell<S>,
    codec: JsonCodec,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<S: StateStore> RoomActor<S> {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Connect { sender, reply } => {
                    let id = self.handle_connect(sender);
                    let _ = reply.send(id);
                }
                RoomCommand::Inbound { session, text } => {
                    self.handle_inbound(session, text).await;
                }
                RoomCommand::Closed { session } => {
                    self.handle_closed(session);
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room_id = %self.room_id, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    /// Admits a connection. The current state snapshot, if any, is
    /// queued on the new session rather than sent, since the client
    /// hasn't identified yet.
    fn handle_connect(&mut self, sender: SessionSender) -> SessionId {
        let snapshot = self
            .cell
            .current()
            .map(|state| self.codec.encode(state));

        let id = self.registry.admit(sender);
        tracing::info!(
            room_id = %self.room_id,
            session = %id,
            sessions = self.registry.len(),
            "session admitted"
        );

        match snapshot {
            Some(Ok(text)) => {
                if let Some(session) = self.registry.get_mut(id) {
                    session.enqueue(text);
                }
            }
            Some(Err(e)) => {
                tracing::error!(
                    room_id = %self.room_id,
                    error = %e,
                    "failed to encode state snapshot"
                );
            }
            None => {}
        }

        id
    }

    /// Routes one inbound frame through the session state machine. Any
    /// processing error is echoed to the sender only; the session is
    /// not terminated by that path.
    async fn handle_inbound(&mut self, id: SessionId, text: String) {
        let identified = match self.registry.get(id) {
            Some(session) => session.is_identified(),
            None => {
                // Already terminated; the handler closes the socket when
                // its outbound channel drops.
                tracing::debug!(
                    room_id = %self.room_id,
                    session = %id,
                    "frame for terminated session, dropping"
                );
                return;
            }
        };

        let result = if identified {
            self.handle_update(id, &text).await
        } else {
            self.handle_handshake(id, &text)
        };

        if let Err(e) = result {
            tracing::debug!(
                room_id = %self.room_id,
                session = %id,
                error = %e,
                "inbound frame rejected"
            );
            self.send_event(id, &ServerEvent::error(e.to_string()));
        }
    }

    /// First message on a session: handshake only. A valid id flushes
    /// the pending queue and announces the join to everyone else; a
    /// missing id is terminal for the session.
    fn handle_handshake(
        &mut self,
        id: SessionId,
        text: &str,
    ) -> Result<(), RoomError> {
        let envelope: ClientEnvelope = self.codec.decode(text)?;

        let Some(name) = envelope.id.filter(|id| !id.is_empty()) else {
            self.send_event(id, &ServerEvent::error(ERR_MISSING_ID));
            if let Some(session) = self.registry.remove(id) {
                let _ = session.send(SessionOutbound::Close {
                    code: close_code::MISSING_ID,
                    reason: ERR_MISSING_ID.to_string(),
                });
            }
            tracing::info!(
                room_id = %self.room_id,
                session = %id,
                "closed session: first message missing id"
            );
            return Ok(());
        };

        // Handshake-only: any state/version on the first message is
        // deliberately ignored.
        let Some(session) = self.registry.get_mut(id) else {
            return Ok(());
        };
        let queued = session.identify(name.clone());
        for message in queued {
            // A failed flush means the connection just died; the next
            // broadcast pass prunes it.
            let _ = session.send(SessionOutbound::Message(message));
        }

        tracing::info!(
            room_id = %self.room_id,
            session = %id,
            name = %name,
            "session identified"
        );

        let joined = self.codec.encode(&ServerEvent::Joined { joined: name })?;
        self.broadcast(joined, Some(id));
        Ok(())
    }

    /// A message after the handshake: identity check, then ping or
    /// state update.
    async fn handle_update(
        &mut self,
        id: SessionId,
        text: &str,
    ) -> Result<(), RoomError> {
        let envelope: ClientEnvelope = self.codec.decode(text)?;

        let name = self
            .registry
            .get(id)
            .and_then(|s| s.name())
            .map(str::to_owned);
        if envelope.id.as_deref() != name.as_deref() {
            self.send_event(id, &ServerEvent::error(ERR_WRONG_ID));
            return Ok(());
        }

        // No state payload: liveness ping, nothing to do.
        let Some(state) = envelope.state else {
            return Ok(());
        };

        let version = envelope.version.ok_or_else(|| {
            ProtocolError::InvalidMessage("state update missing version".into())
        })?;

        match self.cell.accept(version, state).await? {
            Accept::Applied(new_state) => {
                tracing::info!(
                    room_id = %self.room_id,
                    version = new_state.version,
                    "state accepted"
                );
                let text = self.codec.encode(&new_state)?;
                self.broadcast(text, None);
            }
            Accept::OutOfOrder(current) => {
                tracing::debug!(
                    room_id = %self.room_id,
                    session = %id,
                    candidate = version,
                    current = current.version,
                    "stale update rejected"
                );
                self.send_event(id, &ServerEvent::out_of_order(current));
            }
        }
        Ok(())
    }

    /// Transport close/error event: remove the session and, if it had
    /// identified, tell the rest it quit. Idempotent: a session
    /// already pruned by a failed broadcast send is a no-op here.
    fn handle_closed(&mut self, id: SessionId) {
        let Some(session) = self.registry.remove(id) else {
            return;
        };
        tracing::info!(
            room_id = %self.room_id,
            session = %id,
            sessions = self.registry.len(),
            "session closed"
        );
        if let Some(name) = session.name() {
            match self.codec.encode(&ServerEvent::Quit {
                quit: name.to_string(),
            }) {
                Ok(text) => self.broadcast(text, None),
                Err(e) => tracing::error!(
                    room_id = %self.room_id,
                    error = %e,
                    "failed to encode quit notice"
                ),
            }
        }
    }

    /// Fans a message out to the whole registry: identified sessions
    /// get it sent, unidentified ones get it queued.
    ///
    /// Runs as an iterative fixed-point: each round snapshots the
    /// membership, prunes sessions whose send failed, and schedules a
    /// `{quit}` round for each pruned session that had identified.
    /// Terminates because every extra round strictly shrinks the
    /// registry.
    fn broadcast(&mut self, message: String, except: Option<SessionId>) {
        let mut rounds = VecDeque::new();
        rounds.push_back((message, except));

        while let Some((message, except)) = rounds.pop_front() {
            let mut quitters = Vec::new();

            for id in self.registry.ids() {
                if Some(id) == except {
                    continue;
                }
                let Some(session) = self.registry.get_mut(id) else {
                    continue;
                };
                if session.is_identified() {
                    if session
                        .send(SessionOutbound::Message(message.clone()))
                        .is_err()
                    {
                        quitters.push(id);
                    }
                } else {
                    session.enqueue(message.clone());
                }
            }

            for id in quitters {
                let Some(session) = self.registry.remove(id) else {
                    continue;
                };
                tracing::info!(
                    room_id = %self.room_id,
                    session = %id,
                    sessions = self.registry.len(),
                    "pruned dead session during broadcast"
                );
                // Only identified sessions can be quitters (unidentified
                // ones just queue), but keep the guard anyway.
                if let Some(name) = session.name() {
                    match self.codec.encode(&ServerEvent::Quit {
                        quit: name.to_string(),
                    }) {
                        Ok(text) => rounds.push_back((text, None)),
                        Err(e) => tracing::error!(
                            room_id = %self.room_id,
                            error = %e,
                            "failed to encode quit notice"
                        ),
                    }
                }
            }
        }
    }

    /// Sends an event to a single session, ignoring delivery failure;
    /// a dead connection is discovered and pruned by the next broadcast.
    fn send_event(&mut self, id: SessionId, event: &ServerEvent) {
        let text = match self.codec.encode(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(
                    room_id = %self.room_id,
                    error = %e,
                    "failed to encode event"
                );
                return;
            }
        };
        if let Some(session) = self.registry.get(id) {
            let _ = session.send(SessionOutbound::Message(text));
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            sessions: self.registry.len(),
            identified: self.registry.identified(),
            version: self.cell.current().map(|s| s.version),
        }
    }
}

/// Loads the room's persisted state, then spawns the actor task and
/// returns a handle to it.
///
/// The load completes before the actor starts draining commands, so no
/// connection or message is handled against an unloaded cell.
///
/// # Errors
/// Fails if the initial store read fails or the persisted state is
/// corrupt.
pub async fn spawn_room<S: StateStore>(
    room_id: impl Into<String>,
    store: S,
) -> Result<RoomHandle, RoomError> {
    let room_id = room_id.into();
    let cell = GameStateCell::load(room_id.clone(), store).await?;

    let (tx, rx) = mpsc::channel(64);
    let actor = RoomActor {
        room_id: room_id.clone(),
        registry: SessionRegistry::new(),
        cell,
        codec: JsonCodec,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    Ok(RoomHandle {
        room_id,
        sender: tx,
    })
}
