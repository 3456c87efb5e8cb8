//! WebSocket connection handler.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{domain::OutboundFrame, ui::state::AppState};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that drains the connection's outbound queue into the socket.
///
/// The task ends when the queue is closed, a `Close` frame is queued, or the
/// socket stops accepting writes.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = state.dispatcher.connect(tx).await;
    tracing::info!("Connection {} accepted", id);

    let (sender, mut receiver) = socket.split();

    let dispatcher = state.dispatcher.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            let message = match result {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!("Connection {} read error: {}", id, e);
                    break;
                }
            };
            match message {
                Message::Text(text) => dispatcher.handle_text(id, text.as_str()).await,
                Message::Binary(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    dispatcher.handle_text(id, &text).await;
                }
                Message::Close(_) => {
                    tracing::debug!("Connection {} requested close", id);
                    break;
                }
                // Transport-level ping/pong is answered by axum
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Already gone if the liveness sweep closed it
    state.dispatcher.disconnect(id).await;
}
