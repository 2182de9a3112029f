//! Session types: one entry per connected client.
//!
//! A session is either **unidentified** (carrying a queue of messages
//! it may not receive yet) or **identified** (named, receiving live
//! broadcasts). The queue exists only in the unidentified phase;
//! identification consumes it, so an identified session can never hold
//! a stale queue.
//!
//! Termination is structural: a terminated session is simply no longer
//! in the [`SessionRegistry`], and its outbound channel is dropped,
//! which tells the connection handler to close the socket.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc;

/// Registry-internal identifier for one connection's session.
///
/// Never appears on the wire; clients are known to each other only by
/// the name they assert in their handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// An outbound instruction from the room to a session's connection
/// handler.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutbound {
    /// Deliver a text frame to the client.
    Message(String),
    /// Close the connection with the given code and reason.
    Close {
        /// Protocol-level close code.
        code: u16,
        /// Human-readable close reason.
        reason: String,
    },
}

/// Channel sender for delivering outbound instructions to a session.
pub type SessionSender = mpsc::UnboundedSender<SessionOutbound>;

/// Which side of the handshake a session is on.
#[derive(Debug)]
pub enum SessionPhase {
    /// Handshake not yet completed; broadcasts are queued, not sent.
    Unidentified {
        /// Messages awaiting delivery, in arrival order.
        queue: Vec<String>,
    },
    /// Handshake completed; the name is immutable from here on.
    Identified {
        /// The client's self-asserted id.
        name: String,
    },
}

/// One connected client's registry entry.
#[derive(Debug)]
pub struct Session {
    sender: SessionSender,
    phase: SessionPhase,
}

impl Session {
    fn new(sender: SessionSender) -> Self {
        Self {
            sender,
            phase: SessionPhase::Unidentified { queue: Vec::new() },
        }
    }

    /// Returns the session's name once identified.
    pub fn name(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Identified { name } => Some(name),
            SessionPhase::Unidentified { .. } => None,
        }
    }

    /// Returns `true` once the handshake has completed.
    pub fn is_identified(&self) -> bool {
        matches!(self.phase, SessionPhase::Identified { .. })
    }

    /// Appends a message to the pending queue.
    ///
    /// Only meaningful while unidentified; an identified session
    /// receives messages directly and this is a no-op for it.
    pub fn enqueue(&mut self, message: String) {
        if let SessionPhase::Unidentified { queue } = &mut self.phase {
            queue.push(message);
        }
    }

    /// Completes the handshake: sets the name and consumes the pending
    /// queue, returning it in FIFO order for delivery.
    pub fn identify(&mut self, name: String) -> Vec<String> {
        let previous =
            std::mem::replace(&mut self.phase, SessionPhase::Identified { name });
        match previous {
            SessionPhase::Unidentified { queue } => queue,
            // Identification is one-shot; re-identifying keeps the new
            // name and has nothing queued to flush.
            SessionPhase::Identified { .. } => Vec::new(),
        }
    }

    /// Pushes an outbound instruction to the connection handler.
    ///
    /// Fails when the handler is gone, i.e. the connection is dead.
    pub fn send(
        &self,
        out: SessionOutbound,
    ) -> Result<(), mpsc::error::SendError<SessionOutbound>> {
        self.sender.send(out)
    }
}

/// The set of all live (non-terminated) sessions for one room.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: u64,
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a new connection: inserts an unidentified session with an
    /// empty queue and returns its id. Infallible.
    pub fn admit(&mut self, sender: SessionSender) -> SessionId {
        self.next_id += 1;
        let id = SessionId(self.next_id);
        self.sessions.insert(id, Session::new(sender));
        id
    }

    /// Removes a session, returning it if it was present. Idempotent.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    /// Looks up a session.
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Looks up a session mutably.
    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Snapshots the current membership for broadcast iteration.
    ///
    /// The broadcaster mutates the registry while walking this copy, so
    /// removals during a pass never skip or double-visit a session.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions that have completed the handshake.
    pub fn identified(&self) -> usize {
        self.sessions.values().filter(|s| s.is_identified()).count()
    }
}
