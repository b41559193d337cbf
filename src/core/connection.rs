//! Client channel management
//! Abstracts the per-client duplex transport the relay sends through

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use warp::ws::Message;

use crate::error::{RelayError, Result};

/// Outbound half of a client connection as seen by the relay core
pub trait Channel: Send + Sync {
    /// Queue a serialized message for delivery
    fn send_text(&self, text: &str) -> Result<()>;

    /// Forcibly terminate the connection
    fn close(&self);

    /// Whether the channel still accepts sends
    fn is_open(&self) -> bool;
}

/// Shared handle to a client channel
pub type SharedChannel = Arc<dyn Channel>;

/// WebSocket channel backed by the connection's writer task queue
pub struct WsChannel {
    sender: mpsc::UnboundedSender<Message>,
    closed: AtomicBool,
    terminate: Arc<Notify>,
}

impl WsChannel {
    pub fn new(sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            sender,
            closed: AtomicBool::new(false),
            terminate: Arc::new(Notify::new()),
        }
    }

    /// Signal fired when the channel is closed from the server side.
    /// The connection's read loop waits on it to drop the socket.
    pub fn termination_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.terminate)
    }
}

impl Channel for WsChannel {
    fn send_text(&self, text: &str) -> Result<()> {
        if !self.is_open() {
            return Err(RelayError::ConnectionClosed);
        }

        self.sender
            .send(Message::text(text))
            .map_err(|_| RelayError::ConnectionError("writer task has stopped".to_string()))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Best effort: the writer may already be gone
        let _ = self.sender.send(Message::close());
        self.terminate.notify_one();
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.sender.is_closed()
    }
}
