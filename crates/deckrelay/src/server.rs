//! `RelayServer` builder and accept loop.
//!
//! This ties the layers together: transport → room. The room actor is
//! spawned at build time (loading persisted state first), then every
//! accepted connection gets its own handler task wired to that room.

use deckrelay_room::{spawn_room, RoomHandle};
use deckrelay_store::StateStore;
use deckrelay_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::RelayError;

/// Builder for configuring and starting a relay server.
pub struct RelayServerBuilder {
    bind_addr: String,
    room_id: String,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_id: "room".to_string(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room id: the key its state persists under, echoed in
    /// every state payload.
    pub fn room_id(mut self, id: &str) -> Self {
        self.room_id = id.to_string();
        self
    }

    /// Binds the transport, loads the room's persisted state from
    /// `store`, and spawns the room actor.
    pub async fn build(
        self,
        store: impl StateStore,
    ) -> Result<RelayServer, RelayError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let room = spawn_room(self.room_id, store).await?;
        Ok(RelayServer { transport, room })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running relay server: one room, many connections.
pub struct RelayServer {
    transport: WebSocketTransport,
    room: RoomHandle,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the server's room.
    pub fn room(&self) -> RoomHandle {
        self.room.clone()
    }

    /// Runs the accept loop.
    ///
    /// Each accepted connection gets a handler task; a failed upgrade
    /// (wrong path, non-upgrade request) is logged and the loop keeps
    /// accepting. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!(room_id = %self.room.room_id(), "relay server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let room = self.room.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, room).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::debug!(error = %e, "accept failed");
                }
            }
        }
    }
}
