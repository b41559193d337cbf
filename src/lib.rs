//! P3D Relay - real-time relay server for multiplayer flight-simulation sessions
//!
//! Clients connect over WebSocket, announce a callsign and aircraft, and the
//! relay fans their position updates and chat out to everyone else.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;

// Re-export main components
pub use config::*;
pub use constants::*;
