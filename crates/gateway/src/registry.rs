//! Connection registry (§4.F): a concurrent map from connection ID to
//! everything the gateway needs to know about a live socket — identity,
//! subscriptions, heartbeat bookkeeping, and per-channel recovery
//! versions. Broadcast/send primitives live on [`Registry`] directly so
//! the game loop's [`rbp_gameroom::TableBroadcaster`] impl (see
//! `broadcaster.rs`) has a single thing to hold.
use crate::Channel;
use crate::Envelope;
use rbp_core::UserId;
use rbp_core::Version;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// A single live WebSocket session. The actual socket write half lives
/// behind `outbox`; everything else here is state the gateway reasons
/// about without touching the socket.
pub struct Connection {
    pub user_id: Option<UserId>,
    pub channels: HashSet<Channel>,
    pub last_seen_version: HashMap<Channel, Version>,
    pub outbox: UnboundedSender<String>,
    pub last_pong: std::sync::Mutex<Instant>,
    pub missed_pongs: AtomicU32,
}

impl Connection {
    fn new(outbox: UnboundedSender<String>) -> Self {
        Self {
            user_id: None,
            channels: HashSet::new(),
            last_seen_version: HashMap::new(),
            outbox,
            last_pong: std::sync::Mutex::new(Instant::now()),
            missed_pongs: AtomicU32::new(0),
        }
    }

    fn send(&self, json: String) -> bool {
        self.outbox.send(json).is_ok()
    }
}

#[derive(Default)]
pub struct Registry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    /// Reverse index so [`Registry::send_to_user`] doesn't scan every
    /// connection — a user may have more than one open tab/device.
    by_user: RwLock<HashMap<UserId, HashSet<ConnectionId>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, outbox: UnboundedSender<String>) -> ConnectionId {
        let id = Uuid::now_v7();
        self.connections.write().await.insert(id, Connection::new(outbox));
        id
    }

    pub async fn identify(&self, id: ConnectionId, user_id: UserId) {
        if let Some(conn) = self.connections.write().await.get_mut(&id) {
            conn.user_id = Some(user_id);
        }
        self.by_user.write().await.entry(user_id).or_default().insert(id);
    }

    pub async fn deregister(&self, id: ConnectionId) {
        let removed = self.connections.write().await.remove(&id);
        if let Some(user_id) = removed.and_then(|c| c.user_id) {
            let mut by_user = self.by_user.write().await;
            if let Some(ids) = by_user.get_mut(&user_id) {
                ids.remove(&id);
                if ids.is_empty() {
                    by_user.remove(&user_id);
                }
            }
        }
    }

    pub async fn subscribe(&self, id: ConnectionId, channel: Channel) {
        if let Some(conn) = self.connections.write().await.get_mut(&id) {
            conn.channels.insert(channel);
        }
    }

    pub async fn unsubscribe(&self, id: ConnectionId, channel: Channel) {
        if let Some(conn) = self.connections.write().await.get_mut(&id) {
            conn.channels.remove(&channel);
        }
    }

    pub async fn set_last_seen(&self, id: ConnectionId, channel: Channel, version: Version) {
        if let Some(conn) = self.connections.write().await.get_mut(&id) {
            conn.last_seen_version.insert(channel, version);
        }
    }

    pub async fn last_seen_versions(&self, id: ConnectionId) -> HashMap<Channel, Version> {
        self.connections
            .read()
            .await
            .get(&id)
            .map(|c| c.last_seen_version.clone())
            .unwrap_or_default()
    }

    /// Non-blocking fan-out to every connection subscribed to `channel`.
    /// Per §5's backpressure rule, failure to enqueue is not "dropped" —
    /// the only queue here is the connection's own `UnboundedSender`,
    /// which never applies backpressure; a send failure means the peer
    /// already hung up, so the connection is collected for eviction.
    pub async fn broadcast(&self, channel: Channel, envelope: &Envelope) -> Vec<ConnectionId> {
        let json = envelope.to_json();
        let connections = self.connections.read().await;
        connections
            .iter()
            .filter(|(_, conn)| conn.channels.contains(&channel))
            .filter(|(_, conn)| !conn.send(json.clone()))
            .map(|(&id, _)| id)
            .collect()
    }

    pub async fn send_to_connection(&self, id: ConnectionId, envelope: &Envelope) -> bool {
        match self.connections.read().await.get(&id) {
            Some(conn) => conn.send(envelope.to_json()),
            None => true,
        }
    }

    pub async fn send_to_user(&self, user_id: UserId, envelope: &Envelope) -> Vec<ConnectionId> {
        let json = envelope.to_json();
        let ids: Vec<ConnectionId> = {
            let by_user = self.by_user.read().await;
            by_user.get(&user_id).map(|ids| ids.iter().copied().collect()).unwrap_or_default()
        };
        let connections = self.connections.read().await;
        ids.into_iter()
            .filter(|id| connections.get(id).is_some_and(|c| !c.send(json.clone())))
            .collect()
    }

    pub async fn record_pong(&self, id: ConnectionId) {
        if let Some(conn) = self.connections.read().await.get(&id) {
            *conn.last_pong.lock().unwrap() = Instant::now();
            conn.missed_pongs.store(0, Ordering::Relaxed);
        }
    }

    /// Pings every connection, returning the ones that have now exceeded
    /// `max_missed_pongs` consecutive misses (§4.F) and should be closed
    /// with `HEARTBEAT_TIMEOUT`.
    pub async fn tick_heartbeat(&self, ping: &Envelope, max_missed_pongs: u32) -> Vec<ConnectionId> {
        let json = ping.to_json();
        let connections = self.connections.read().await;
        let mut timed_out = Vec::new();
        for (&id, conn) in connections.iter() {
            let missed = conn.missed_pongs.fetch_add(1, Ordering::Relaxed) + 1;
            if missed >= max_missed_pongs {
                timed_out.push(id);
                continue;
            }
            conn.send(json.clone());
        }
        timed_out
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Channel;
    use rbp_gameroom::ServerMessage;

    #[tokio::test]
    async fn broadcast_only_reaches_subscribers() {
        let registry = Registry::new();
        let (tx_a, mut rx_a) = tokio::sync::mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = tokio::sync::mpsc::unbounded_channel();
        let a = registry.register(tx_a).await;
        let b = registry.register(tx_b).await;
        registry.subscribe(a, Channel::Lobby).await;
        let _ = b;

        let env = Envelope::new(ServerMessage::Error { message: "hi".into() });
        let dead = registry.broadcast(Channel::Lobby, &env).await;
        assert!(dead.is_empty());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn heartbeat_times_out_after_max_misses() {
        let registry = Registry::new();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let id = registry.register(tx).await;
        drop(rx);
        let ping = Envelope::new(ServerMessage::Error { message: "ping".into() });
        let mut timed_out = Vec::new();
        for _ in 0..5 {
            timed_out = registry.tick_heartbeat(&ping, 2).await;
        }
        assert_eq!(timed_out, vec![id]);
    }

    #[tokio::test]
    async fn record_pong_resets_miss_counter() {
        let registry = Registry::new();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let id = registry.register(tx).await;
        let ping = Envelope::new(ServerMessage::Error { message: "ping".into() });
        registry.tick_heartbeat(&ping, 5).await;
        registry.record_pong(id).await;
        let timed_out = registry.tick_heartbeat(&ping, 1).await;
        assert!(timed_out.is_empty());
    }
}
