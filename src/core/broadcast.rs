//! Broadcast engine
//!
//! Messages are serialized once, the registry is snapshotted and released,
//! and only then is each recipient's channel written to. Channel sends are
//! queue pushes, so a slow client never stalls the fan-out.

use log::{debug, trace};

use crate::core::message::ServerMessage;
use crate::core::registry::ClientRegistry;
use crate::error::{RelayError, Result};

/// Outcome of a single fan-out
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Registered clients considered (exclusion already applied)
    pub total_recipients: usize,
    pub sent_count: usize,
    /// Channels found not open
    pub skipped: usize,
}

impl BroadcastStats {
    pub fn failed(&self) -> usize {
        self.total_recipients - self.sent_count - self.skipped
    }
}

/// Send `message` to every registered client except `exclude_id`
pub async fn broadcast(
    registry: &ClientRegistry,
    message: &ServerMessage,
    exclude_id: Option<&str>,
) -> Result<BroadcastStats> {
    let payload = message.to_json()?;

    let recipients: Vec<_> = registry
        .snapshot()
        .await
        .into_iter()
        .filter(|(id, _)| Some(id.as_str()) != exclude_id)
        .collect();

    let mut stats = BroadcastStats {
        total_recipients: recipients.len(),
        ..BroadcastStats::default()
    };

    for (id, client) in recipients {
        if !client.channel.is_open() {
            stats.skipped += 1;
            continue;
        }

        match client.channel.send_text(&payload) {
            Ok(()) => stats.sent_count += 1,
            Err(e) => trace!("Dropped broadcast to {}: {}", id, e),
        }
    }

    debug!(
        "Broadcast to {}/{} clients ({} not ready)",
        stats.sent_count, stats.total_recipients, stats.skipped
    );

    Ok(stats)
}

/// Send `message` to a single client
pub async fn send_to(registry: &ClientRegistry, client_id: &str, message: &ServerMessage) -> Result<()> {
    let client = registry
        .get(client_id)
        .await
        .ok_or_else(|| RelayError::ClientNotFound(client_id.to_string()))?;

    if !client.channel.is_open() {
        return Err(RelayError::ConnectionClosed);
    }

    client.channel.send_text(&message.to_json()?)
}
