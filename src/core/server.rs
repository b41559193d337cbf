//! Relay server service that ties connection lifecycle, routing and sweeping together

use log::{debug, error, info};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::broadcast::broadcast;
use crate::core::connection::SharedChannel;
use crate::core::message::ServerMessage;
use crate::core::registry::{create_registry, Client, SharedRegistry};
use crate::core::router::{MessageRouter, RouteOutcome};
use crate::core::sweeper::LivenessSweeper;
use crate::error::Result;

/// Owns the client registry and exposes the transport-facing entry points
pub struct RelayServer {
    registry: SharedRegistry,
    router: MessageRouter,
    started_at: Instant,
}

impl RelayServer {
    pub fn new() -> Self {
        Self::with_registry(create_registry())
    }

    pub fn with_registry(registry: SharedRegistry) -> Self {
        Self {
            router: MessageRouter::new(registry.clone()),
            registry,
            started_at: Instant::now(),
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Register a freshly accepted connection and greet it with its id.
    ///
    /// The `connected` frame is queued before the registry lock is released,
    /// so it is always the first message the client receives.
    pub async fn accept(&self, channel: SharedChannel) -> Result<String> {
        let client_id = Uuid::new_v4().to_string();

        let total_clients = self
            .registry
            .insert_with(client_id.clone(), Client::new(channel), |client, total_clients| {
                let connected = ServerMessage::Connected {
                    client_id: client_id.clone(),
                    total_clients,
                };
                let sent = connected
                    .to_json()
                    .and_then(|payload| client.channel.send_text(&payload));
                if let Err(e) = sent {
                    error!("Failed to send connect acknowledgment to {}: {}", client_id, e);
                }
            })
            .await?;

        info!("Client connected: {} ({} online)", client_id, total_clients);

        Ok(client_id)
    }

    /// Route one inbound frame from `client_id`
    pub async fn handle_message(&self, client_id: &str, text: &str) -> RouteOutcome {
        self.router.handle_text(client_id, text).await
    }

    /// Handle a client-initiated or transport-detected close.
    /// Returns false if the client was already gone.
    pub async fn disconnect(&self, client_id: &str) -> bool {
        // Removal comes first so no join can list the departing client
        // after the announcement has gone out
        let client = match self.registry.remove(client_id).await {
            Some(client) => client,
            None => {
                debug!("Disconnect for unknown client {}", client_id);
                return false;
            }
        };

        info!(
            "Client disconnected: {} ({})",
            client_id,
            client.callsign.as_deref().unwrap_or("Unknown")
        );

        let left = ServerMessage::PlayerLeft {
            client_id: client_id.to_string(),
            callsign: client.callsign,
        };
        if let Err(e) = broadcast(&self.registry, &left, Some(client_id)).await {
            error!("Failed to announce departure of {}: {}", client_id, e);
        }

        true
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.size().await
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Start the periodic liveness sweep
    pub fn start_sweeper(&self, period: Duration, timeout: Duration) -> JoinHandle<()> {
        info!(
            "Liveness sweep every {}s, timeout {}s",
            period.as_secs(),
            timeout.as_secs()
        );
        LivenessSweeper::new(self.registry.clone(), period, timeout).spawn()
    }
}

impl Default for RelayServer {
    fn default() -> Self {
        Self::new()
    }
}

// Shared reference to the relay server
pub type SharedRelayServer = Arc<RelayServer>;
