//! Core relay functionality: client registry, routing and fan-out

pub mod broadcast;
pub mod connection;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;
pub mod sweeper;

// Re-export main components for convenience
pub use broadcast::{broadcast, send_to, BroadcastStats};
pub use connection::{Channel, SharedChannel, WsChannel};
pub use message::{ClientMessage, PlayerInfo, ServerMessage};
pub use registry::{create_registry, Client, ClientRegistry, SharedRegistry};
pub use router::{MessageRouter, RouteOutcome};
pub use server::{RelayServer, SharedRelayServer};
pub use sweeper::LivenessSweeper;
