//! Wire message types exchanged with simulator clients

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{RelayError, Result};

/// Keys owned by the relay in an outbound position message
const RESERVED_POSITION_KEYS: [&str; 3] = ["type", "clientId", "callsign"];

// An explicit `null` payload relays like an absent one
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Client-to-server message types
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Announce identity
    Join { callsign: String, aircraft: String },

    /// Aircraft state update, relayed opaquely
    Position {
        #[serde(default, deserialize_with = "null_as_empty")]
        position: Map<String, Value>,
    },

    /// Chat line for everyone
    Chat { message: String },

    /// Any other tag
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Decode an inbound frame
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| RelayError::MessageParseError(format!("Invalid client message: {}", e)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Position { .. } => "position",
            Self::Chat { .. } => "chat",
            Self::Unknown => "unknown",
        }
    }
}

/// Server-to-client message types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection accepted
    #[serde(rename_all = "camelCase")]
    Connected { client_id: String, total_clients: usize },

    /// Players already in the session, sent to a joining client
    PlayerList { players: Vec<PlayerInfo> },

    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        client_id: String,
        callsign: String,
        aircraft: String,
    },

    /// Relayed position with the payload fields flattened in
    #[serde(rename_all = "camelCase")]
    Position {
        client_id: String,
        callsign: Option<String>,
        #[serde(flatten)]
        position: Map<String, Value>,
    },

    Chat {
        callsign: Option<String>,
        message: String,
        /// Unix epoch milliseconds
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        client_id: String,
        callsign: Option<String>,
    },
}

impl ServerMessage {
    /// Build a position relay, dropping payload keys the relay owns
    pub fn position(client_id: String, callsign: Option<String>, mut position: Map<String, Value>) -> Self {
        for key in RESERVED_POSITION_KEYS {
            position.remove(key);
        }

        Self::Position {
            client_id,
            callsign,
            position,
        }
    }

    /// Build a chat line stamped with the current time
    pub fn chat(callsign: Option<String>, message: String) -> Self {
        Self::Chat {
            callsign,
            message,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Player entry in a `player_list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub client_id: String,
    pub callsign: String,
    pub aircraft: Option<String>,
}
