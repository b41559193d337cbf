//! Message router: decodes inbound frames and dispatches them by kind

use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::time::Instant;

use crate::core::broadcast::{broadcast, send_to};
use crate::core::message::{ClientMessage, ServerMessage};
use crate::core::registry::SharedRegistry;

/// What happened to an inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Handled,
    /// Well-formed frame with an unrecognized kind
    Ignored,
    /// The sender is no longer registered
    StaleClient,
    /// Frame could not be decoded
    Rejected,
}

pub struct MessageRouter {
    registry: SharedRegistry,
}

impl MessageRouter {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Decode and dispatch a raw frame. Never fails the connection.
    pub async fn handle_text(&self, sender_id: &str, text: &str) -> RouteOutcome {
        match ClientMessage::decode(text) {
            Ok(message) => self.dispatch(sender_id, message).await,
            Err(e) => {
                warn!("Discarding invalid message from {}: {}", sender_id, e);
                RouteOutcome::Rejected
            }
        }
    }

    pub async fn dispatch(&self, sender_id: &str, message: ClientMessage) -> RouteOutcome {
        debug!("Routing {} message from {}", message.kind(), sender_id);

        match message {
            ClientMessage::Join { callsign, aircraft } => {
                self.handle_join(sender_id, callsign, aircraft).await
            }
            ClientMessage::Position { position } => self.handle_position(sender_id, position).await,
            ClientMessage::Chat { message } => self.handle_chat(sender_id, message).await,
            ClientMessage::Unknown => {
                debug!("Ignoring unrecognized message kind from {}", sender_id);
                RouteOutcome::Ignored
            }
        }
    }

    async fn handle_join(&self, sender_id: &str, callsign: String, aircraft: String) -> RouteOutcome {
        let players = match self
            .registry
            .join(sender_id, callsign.clone(), aircraft.clone())
            .await
        {
            Some(players) => players,
            None => return RouteOutcome::StaleClient,
        };

        info!("{} joined with {} ({})", callsign, aircraft, sender_id);

        // The list was built before this join became visible, so it never
        // contains the joining client
        if let Err(e) = send_to(&self.registry, sender_id, &ServerMessage::PlayerList { players }).await {
            warn!("Failed to send player list to {}: {}", sender_id, e);
        }

        let joined = ServerMessage::PlayerJoined {
            client_id: sender_id.to_string(),
            callsign,
            aircraft,
        };
        if let Err(e) = broadcast(&self.registry, &joined, Some(sender_id)).await {
            warn!("Failed to broadcast join of {}: {}", sender_id, e);
        }

        RouteOutcome::Handled
    }

    async fn handle_position(&self, sender_id: &str, position: Map<String, Value>) -> RouteOutcome {
        let callsign = match self.registry.touch(sender_id, Instant::now()).await {
            Some(callsign) => callsign,
            None => return RouteOutcome::StaleClient,
        };

        let relay = ServerMessage::position(sender_id.to_string(), callsign, position);
        if let Err(e) = broadcast(&self.registry, &relay, Some(sender_id)).await {
            warn!("Failed to relay position from {}: {}", sender_id, e);
        }

        RouteOutcome::Handled
    }

    async fn handle_chat(&self, sender_id: &str, message: String) -> RouteOutcome {
        let callsign = match self.registry.get(sender_id).await {
            Some(client) => client.callsign,
            None => return RouteOutcome::StaleClient,
        };

        info!("[CHAT] {}: {}", callsign.as_deref().unwrap_or("Unknown"), message);

        // Chat is the one kind echoed back to its sender
        if let Err(e) = broadcast(&self.registry, &ServerMessage::chat(callsign, message), None).await {
            warn!("Failed to broadcast chat from {}: {}", sender_id, e);
        }

        RouteOutcome::Handled
    }
}
