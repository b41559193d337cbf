use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::core::connection::WsChannel;
use crate::core::router::RouteOutcome;
use crate::core::server::SharedRelayServer;

// Handle a WebSocket connection for its whole lifetime
pub async fn handle_ws_client(ws: WebSocket, server: SharedRelayServer) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Spawn a task to forward messages from our channel to the WebSocket
    tokio::task::spawn(async move {
        let mut rx = rx;
        while let Some(message) = rx.recv().await {
            let closing = message.is_close();
            if let Err(e) = ws_tx.send(message).await {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
            if closing {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let channel = Arc::new(WsChannel::new(tx));
    let terminated = channel.termination_signal();

    let client_id = match server.accept(channel).await {
        Ok(id) => id,
        Err(e) => {
            error!("Failed to register connection: {}", e);
            return;
        }
    };

    // Handle incoming messages until the peer goes away or we are evicted
    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            _ = terminated.notified() => {
                debug!("Connection {} terminated by server", client_id);
                break;
            }
        };

        match frame {
            Some(Ok(msg)) => {
                if msg.is_close() {
                    break;
                }

                // Text frames carry JSON; binary frames are accepted if they hold UTF-8 JSON
                let text = match msg.to_str() {
                    Ok(text) => text,
                    Err(_) if msg.is_binary() => match std::str::from_utf8(msg.as_bytes()) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Discarding non UTF-8 frame from {}: {}", client_id, e);
                            continue;
                        }
                    },
                    // ping / pong
                    Err(_) => continue,
                };

                if server.handle_message(&client_id, text).await == RouteOutcome::StaleClient {
                    debug!("Frame from {} arrived after it was removed", client_id);
                }
            }
            Some(Err(e)) => {
                error!("WebSocket error for {}: {}", client_id, e);
                break;
            }
            None => break,
        }
    }

    // Both a peer close and a transport error are handled as a departure
    if server.disconnect(&client_id).await {
        info!("Current connections: {}", server.connection_count().await);
    }
}
