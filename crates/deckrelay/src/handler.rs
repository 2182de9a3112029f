//! Per-connection handler: wires one WebSocket to the room actor.
//!
//! The handler admits the connection as a session, then splits the
//! work: a writer task pumps the room's outbound instructions to the
//! socket, while this task reads inbound frames into the room. The
//! room itself never touches the socket.

use deckrelay_protocol::close_code;
use deckrelay_room::{RoomHandle, SessionId, SessionOutbound};
use deckrelay_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::RelayError;

/// Drop guard that reports the session's disconnect when the handler
/// exits, even if it panics. `Drop` is synchronous, so it spawns a
/// fire-and-forget task for the async send.
struct DisconnectGuard {
    session: SessionId,
    room: RoomHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let session = self.session;
        let room = self.room.clone();
        tokio::spawn(async move {
            let _ = room.closed(session).await;
        });
    }
}

/// Handles a single connection from admission to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    room: RoomHandle,
) -> Result<(), RelayError> {
    let conn_id = conn.id();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = room.connect(tx).await?;
    tracing::debug!(%conn_id, %session, "session admitted");

    // --- Writer: room → socket ---
    let writer_conn = conn.clone();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Some(SessionOutbound::Message(text)) => {
                    if writer_conn.send(&text).await.is_err() {
                        // Dead socket. Drop the receiver so the room's
                        // next broadcast send fails and prunes us.
                        return;
                    }
                }
                Some(SessionOutbound::Close { code, reason }) => {
                    let _ = writer_conn.close(code, &reason).await;
                    return;
                }
                None => {
                    // The room dropped the session (pruned or shut
                    // down); close out the socket, swallowing errors.
                    let _ = writer_conn
                        .close(close_code::BROKEN, "session broken")
                        .await;
                    return;
                }
            }
        }
    });

    let _guard = DisconnectGuard {
        session,
        room: room.clone(),
    };

    // --- Reader: socket → room ---
    loop {
        match conn.recv().await {
            Ok(Some(text)) => {
                if room.message(session, text).await.is_err() {
                    // Room actor is gone; nothing left to relay to.
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    // _guard drops here → the room gets the Closed event.
    Ok(())
}
