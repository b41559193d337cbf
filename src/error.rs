use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum RelayError {
    // Registry errors
    DuplicateClient(String),
    ClientNotFound(String),

    // Connection errors
    ConnectionError(String),
    ConnectionClosed,

    // Message errors
    MessageParseError(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateClient(id) => write!(f, "Client already registered: {}", id),
            Self::ClientNotFound(id) => write!(f, "Client not found: {}", id),
            Self::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RelayError {}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::MessageParseError(err.to_string())
    }
}

// Generic result type for the relay
pub type Result<T> = std::result::Result<T, RelayError>;
