//! Per-link handler: handshake, then event ingestion.
//!
//! Each accepted link gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Hello → check version, resolve connect code
//!   2. Send HelloAck → lobby link state becomes Connected
//!   3. Loop: apply events, answer heartbeats

use std::sync::Arc;

use crewhush_lobby::{Lobby, LobbyError, Platform};
use crewhush_protocol::{AgentMessage, Codec, PROTOCOL_VERSION, ProtocolError, ServerMessage};
use crewhush_transport::{Connection, WebSocketConnection};

use crate::CrewhushError;
use crate::server::ServerState;

/// Detaches the link from its lobby when the handler exits. The lobby
/// reports disconnected once its last agent is gone.
///
/// `Drop` is synchronous, so the async update runs on a spawned task.
struct LinkGuard<P: Platform> {
    lobby: Lobby<P>,
}

impl<P: Platform> Drop for LinkGuard<P> {
    fn drop(&mut self) {
        let lobby = self.lobby.clone();
        tokio::spawn(async move {
            if lobby.is_stopped() {
                return;
            }
            match lobby.link_detached().await {
                Ok(remaining) => tracing::debug!(remaining, "capture link detached"),
                Err(e) => tracing::debug!(error = %e, "could not detach capture link"),
            }
        });
    }
}

/// Handles a single agent link from accept to close.
pub(crate) async fn handle_connection<P, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<P, C>>,
) -> Result<(), CrewhushError>
where
    P: Platform,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new agent link");

    // --- Step 1: Handshake ---
    let lobby = match perform_handshake(&conn, &state).await {
        Ok(lobby) => lobby,
        Err(e) => {
            let _ = conn.close().await;
            return Err(e);
        }
    };
    let voice_session = lobby.voice_session();
    tracing::info!(%conn_id, %voice_session, code = %lobby.connect_code(), "capture agent connected");

    let links = lobby.link_attached().await?;
    let _guard = LinkGuard { lobby: lobby.clone() };
    if links > 1 {
        tracing::warn!(%voice_session, links, "several capture agents share one lobby");
    }

    // --- Step 2: Event loop ---
    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%voice_session, "agent link closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%voice_session, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%voice_session, "agent link timed out");
                break;
            }
        };

        let msg: AgentMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%voice_session, error = %e, "failed to decode agent message");
                send_error(&conn, &state.codec, 400, &e.to_string()).await?;
                continue;
            }
        };

        match msg {
            AgentMessage::Event { event } => {
                let kind = event.kind();
                let name = event.name().to_string();
                match lobby.apply_game_event(event).await {
                    Ok(()) => {
                        tracing::debug!(%voice_session, kind, %name, "game event applied");
                    }
                    Err(e @ LobbyError::Stopped(_)) => {
                        send_error(&conn, &state.codec, 410, &e.to_string()).await?;
                        break;
                    }
                    Err(e) => {
                        // No one is waiting on this event; log it and tell the agent.
                        tracing::error!(%voice_session, kind, %name, error = %e, "game event failed");
                        send_error(&conn, &state.codec, 422, &e.to_string()).await?;
                    }
                }
            }
            AgentMessage::Heartbeat { client_time } => {
                send(&conn, &state.codec, &ServerMessage::HeartbeatAck { client_time }).await?;
            }
            AgentMessage::Hello { .. } => {
                send_error(&conn, &state.codec, 400, "link is already bound to a lobby").await?;
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → the lobby counts one link fewer.
    Ok(())
}

/// Receives `Hello`, validates it, and resolves the lobby.
async fn perform_handshake<P, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<P, C>>,
) -> Result<Lobby<P>, CrewhushError>
where
    P: Platform,
    C: Codec,
{
    let data = match tokio::time::timeout(state.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before Hello".into()).into());
        }
        Ok(Err(e)) => return Err(CrewhushError::Transport(e)),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let msg: AgentMessage = match state.codec.decode(&data) {
        Ok(msg) => msg,
        Err(e) => {
            send_error(conn, &state.codec, 400, &e.to_string()).await?;
            return Err(e.into());
        }
    };

    let (version, connect_code) = match msg {
        AgentMessage::Hello { version, connect_code } => (version, connect_code),
        _ => {
            send_error(conn, &state.codec, 400, "expected Hello").await?;
            return Err(ProtocolError::InvalidMessage("first message must be Hello".into()).into());
        }
    };

    if version != PROTOCOL_VERSION {
        let message = format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}");
        send_error(conn, &state.codec, 400, &message).await?;
        return Err(ProtocolError::InvalidMessage(message).into());
    }

    let lobby = state.registry.lock().await.find_by_connect_code(&connect_code);
    let Some(lobby) = lobby else {
        let message = format!("no lobby uses connect code {connect_code}");
        send_error(conn, &state.codec, 404, &message).await?;
        return Err(ProtocolError::InvalidMessage(message).into());
    };

    send(
        conn,
        &state.codec,
        &ServerMessage::HelloAck { voice_session: lobby.voice_session() },
    )
    .await?;
    Ok(lobby)
}

async fn send<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    msg: &ServerMessage,
) -> Result<(), CrewhushError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

async fn send_error<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    code: u16,
    message: &str,
) -> Result<(), CrewhushError> {
    send(conn, codec, &ServerMessage::Error { code, message: message.to_string() }).await
}
