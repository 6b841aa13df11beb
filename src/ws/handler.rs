//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{PlayerId, SessionEvent, SessionEventKind};
use crate::util::rate_limit::{ConnectionRateLimiter, ControlCoalescer, PENDING_FLUSH_INTERVAL};
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg, GREETING};

/// WebSocket upgrade handler. Anyone may connect; the connection id is
/// the player's identity for as long as the socket stays open.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let player_id = Uuid::new_v4();
    ws.on_upgrade(move |socket| handle_socket(socket, player_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, player_id: PlayerId, state: AppState) {
    info!(player_id = %player_id, "A user connected");

    let (mut ws_sink, ws_stream) = socket.split();

    let greeting = ServerMsg::Message {
        text: GREETING.to_string(),
    };
    let welcome = ServerMsg::Welcome {
        id: player_id,
        server_time: unix_millis(),
    };
    for msg in [&greeting, &welcome] {
        if let Err(e) = send_msg(&mut ws_sink, msg).await {
            error!(player_id = %player_id, error = %e, "Failed to send greeting");
            return;
        }
    }

    // Subscribe before joining so the first state containing us is not missed
    let snapshot_rx = state.game.subscribe();
    let event_tx = state.game.event_tx.clone();

    if event_tx
        .send(session_event(player_id, SessionEventKind::Connected))
        .await
        .is_err()
    {
        error!(player_id = %player_id, "Match loop is gone, dropping connection");
        return;
    }

    run_session(player_id, ws_sink, ws_stream, event_tx, snapshot_rx).await;

    info!(player_id = %player_id, "User disconnected");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: PlayerId,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    event_tx: mpsc::Sender<SessionEvent>,
    mut snapshot_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Spawn writer task: broadcast snapshots -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match snapshot_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        player_id = %player_id,
                        lagged_count = n,
                        "Client lagged, skipping {} snapshots", n
                    );
                    // Full snapshots: the next one supersedes what was missed
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(player_id = %player_id, "Snapshot channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> match loop. Only control updates are
    // rate limited, and the latest limited one is always delivered.
    let mut controls = ControlCoalescer::new(rate_limiter);
    let mut flush = interval(PENDING_FLUSH_INTERVAL);
    flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let client_msg = tokio::select! {
            frame = ws_stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientMsg::parse(&text) {
                    Ok(ClientMsg::ClientUpdate(update)) => match controls.offer(update) {
                        Some(update) => ClientMsg::ClientUpdate(update),
                        None => {
                            debug!(player_id = %player_id, "Holding back rate limited controls");
                            continue;
                        }
                    },
                    Ok(client_msg) => client_msg,
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Dropping invalid client message");
                        continue;
                    }
                },
                Some(Ok(Message::Binary(_))) => {
                    warn!(player_id = %player_id, "Received binary message, ignoring");
                    continue;
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    debug!(player_id = %player_id, "Client initiated close");
                    break;
                }
                Some(Err(e)) => {
                    error!(player_id = %player_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = flush.tick(), if controls.has_pending() => match controls.take_pending() {
                Some(update) => ClientMsg::ClientUpdate(update),
                None => continue,
            },
        };

        let event = session_event(player_id, SessionEventKind::Message(client_msg));
        if event_tx.send(event).await.is_err() {
            debug!(player_id = %player_id, "Event channel closed");
            break;
        }
    }

    // Signal disconnect to match loop
    let _ = event_tx
        .send(session_event(player_id, SessionEventKind::Disconnected))
        .await;

    writer_handle.abort();
}

fn session_event(player_id: PlayerId, kind: SessionEventKind) -> SessionEvent {
    SessionEvent {
        player_id,
        kind,
        received_at: unix_millis(),
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
