//! Heartbeat ticker (§4.F): pings every registered connection on a fixed
//! interval and reports which ones blew past `max_missed_pongs`
//! consecutive misses so the caller can close them with
//! `HEARTBEAT_TIMEOUT`. This crate never spawns its own background
//! tasks (same convention as `rbp_gameroom::GameLoop`) — the server
//! binary owns the interval ticker and calls [`run_once`] from it.
use crate::ConnectionId;
use crate::Envelope;
use crate::Registry;
use rbp_gameroom::ServerMessage;
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    pub max_missed_pongs: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(15), max_missed_pongs: 3 }
    }
}

/// Runs a single heartbeat pass, returning connections that exceeded
/// `max_missed_pongs` and should be closed with `HEARTBEAT_TIMEOUT`.
/// Timed-out connections are also deregistered here so the next
/// broadcast doesn't waste a send on a dead socket.
pub async fn run_once(registry: &Registry, config: &HeartbeatConfig) -> Vec<ConnectionId> {
    let ping = Envelope::new(ServerMessage::Ping);
    let timed_out = registry.tick_heartbeat(&ping, config.max_missed_pongs).await;
    for &id in &timed_out {
        registry.deregister(id).await;
    }
    timed_out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn evicts_connections_past_threshold() {
        let registry = Registry::new();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let id = registry.register(tx).await;
        drop(rx);
        let config = HeartbeatConfig { interval: Duration::from_millis(1), max_missed_pongs: 1 };
        run_once(&registry, &config).await;
        let timed_out = run_once(&registry, &config).await;
        assert_eq!(timed_out, vec![id]);
        assert_eq!(registry.len().await, 0);
    }
}
