//! Periodic eviction of clients that stopped sending position updates

use log::{debug, info};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::registry::SharedRegistry;

pub struct LivenessSweeper {
    registry: SharedRegistry,
    period: Duration,
    timeout: Duration,
}

impl LivenessSweeper {
    pub fn new(registry: SharedRegistry, period: Duration, timeout: Duration) -> Self {
        Self {
            registry,
            period,
            timeout,
        }
    }

    /// Run one sweep as of `now`, returning the evicted client ids.
    ///
    /// Evicted channels are closed hard. No `player_left` is broadcast for
    /// them, unlike a client-initiated disconnect.
    pub async fn sweep_once(&self, now: Instant) -> Vec<String> {
        let evicted = self.registry.evict_stale(now, self.timeout).await;

        evicted
            .into_iter()
            .map(|(id, client)| {
                info!("Removing stale client: {}", id);
                client.channel.close();
                id
            })
            .collect()
    }

    /// Start the sweep loop on the runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let evicted = self.sweep_once(Instant::now()).await;
                if !evicted.is_empty() {
                    debug!("Sweep evicted {} clients", evicted.len());
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection::WsChannel;
    use crate::core::registry::{create_registry, Client};
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use warp::ws::Message;

    async fn register(registry: &SharedRegistry, id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry
            .insert(id.to_string(), Client::new(Arc::new(WsChannel::new(tx))))
            .await
            .unwrap();
        rx
    }

    #[tokio::test]
    async fn test_sweep_evicts_idle_and_closes_hard() {
        let registry = create_registry();
        let sweeper = LivenessSweeper::new(registry.clone(), Duration::from_secs(10), Duration::from_secs(30));
        let mut rx_idle = register(&registry, "idle").await;
        let mut rx_other = register(&registry, "other").await;

        let now = Instant::now() + Duration::from_secs(31);
        registry.touch("other", now).await;

        let evicted = sweeper.sweep_once(now).await;

        assert_eq!(evicted, vec!["idle".to_string()]);
        assert_eq!(registry.size().await, 1);
        assert!(rx_idle.try_recv().unwrap().is_close());
        // no departure notice for swept clients
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_recent_updates_survive() {
        let registry = create_registry();
        let sweeper = LivenessSweeper::new(registry.clone(), Duration::from_secs(10), Duration::from_secs(30));
        let _rx = register(&registry, "a").await;

        let start = Instant::now();
        for tick in 1..=6u64 {
            let now = start + Duration::from_secs(tick * 10);
            registry.touch("a", now - Duration::from_secs(5)).await;
            assert!(sweeper.sweep_once(now).await.is_empty());
        }
        assert_eq!(registry.size().await, 1);
    }

    #[tokio::test]
    async fn test_spawned_loop_evicts() {
        let registry = create_registry();
        let _rx = register(&registry, "a").await;

        let handle = LivenessSweeper::new(registry.clone(), Duration::from_millis(20), Duration::from_millis(10)).spawn();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(registry.size().await, 0);

        handle.abort();
    }
}
