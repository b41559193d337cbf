//! Registry of live clients
//!
//! A single `RwLock` guards the map. Every read-then-write sequence (join,
//! touch, stale eviction) runs under one write guard so it is atomic with
//! respect to the other operations. Callers never hold the lock while
//! sending to a channel: they take a snapshot and release it first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::connection::SharedChannel;
use crate::core::message::PlayerInfo;
use crate::error::{RelayError, Result};

/// Per-connection state
#[derive(Clone)]
pub struct Client {
    pub channel: SharedChannel,
    pub callsign: Option<String>,
    pub aircraft: Option<String>,
    pub last_update: Instant,
}

impl Client {
    /// Fresh record for a just-accepted connection
    pub fn new(channel: SharedChannel) -> Self {
        Self {
            channel,
            callsign: None,
            aircraft: None,
            last_update: Instant::now(),
        }
    }

    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_update) > timeout
    }

    /// Joined with a non-empty callsign
    fn is_named(&self) -> bool {
        self.callsign.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Concurrency-safe mapping from connection id to client record
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, Client>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new client and report the live count including it.
    /// The id must not be live already.
    pub async fn insert(&self, id: String, client: Client) -> Result<usize> {
        self.insert_with(id, client, |_, _| {}).await
    }

    /// Register a new client and run `on_insert` with the record and the new
    /// live count before the write guard is released. Nothing else can observe
    /// the client until `on_insert` returns, so it must not block.
    pub async fn insert_with<F>(&self, id: String, client: Client, on_insert: F) -> Result<usize>
    where
        F: FnOnce(&Client, usize),
    {
        let mut clients = self.clients.write().await;
        if clients.contains_key(&id) {
            return Err(RelayError::DuplicateClient(id));
        }

        let count = clients.len() + 1;
        on_insert(&client, count);
        clients.insert(id, client);

        Ok(count)
    }

    pub async fn get(&self, id: &str) -> Option<Client> {
        self.clients.read().await.get(id).cloned()
    }

    /// Remove a client. Absent ids are a no-op.
    pub async fn remove(&self, id: &str) -> Option<Client> {
        self.clients.write().await.remove(id)
    }

    /// Point-in-time copy of all records, in no particular order
    pub async fn snapshot(&self) -> Vec<(String, Client)> {
        self.clients
            .read()
            .await
            .iter()
            .map(|(id, client)| (id.clone(), client.clone()))
            .collect()
    }

    pub async fn size(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Record a client's identity and list the other named players as they
    /// were before this join. Returns `None` if the id is no longer live.
    pub async fn join(&self, id: &str, callsign: String, aircraft: String) -> Option<Vec<PlayerInfo>> {
        let mut clients = self.clients.write().await;

        let players = clients
            .iter()
            .filter(|(other_id, client)| other_id.as_str() != id && client.is_named())
            .map(|(other_id, client)| PlayerInfo {
                client_id: other_id.clone(),
                callsign: client.callsign.clone().unwrap_or_default(),
                aircraft: client.aircraft.clone(),
            })
            .collect();

        let client = clients.get_mut(id)?;
        client.callsign = Some(callsign);
        client.aircraft = Some(aircraft);

        Some(players)
    }

    /// Refresh a client's liveness timestamp and return its callsign.
    /// The outer `None` means the id is no longer live.
    pub async fn touch(&self, id: &str, now: Instant) -> Option<Option<String>> {
        let mut clients = self.clients.write().await;
        let client = clients.get_mut(id)?;
        client.last_update = now;
        Some(client.callsign.clone())
    }

    /// Remove and return every client idle for longer than `timeout`
    pub async fn evict_stale(&self, now: Instant, timeout: Duration) -> Vec<(String, Client)> {
        let mut clients = self.clients.write().await;

        let stale_ids: Vec<String> = clients
            .iter()
            .filter(|(_, client)| client.is_stale(now, timeout))
            .map(|(id, _)| id.clone())
            .collect();

        stale_ids
            .into_iter()
            .filter_map(|id| clients.remove(&id).map(|client| (id, client)))
            .collect()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Shared registry handle held by the router, sweeper and lifecycle handlers
pub type SharedRegistry = Arc<ClientRegistry>;

pub fn create_registry() -> SharedRegistry {
    Arc::new(ClientRegistry::new())
}
