//! Bridges `rbp_gameroom::GameLoop`'s [`TableBroadcaster`] seam to this
//! crate's [`Registry`]. The game loop knows nothing about WebSockets;
//! this is the one place that knowledge is introduced.
use crate::Channel;
use crate::Envelope;
use crate::Registry;
use rbp_core::TableId;
use rbp_core::UserId;
use rbp_gameroom::ServerMessage;
use rbp_gameroom::TableBroadcaster;
use std::sync::Arc;

pub struct GatewayBroadcaster {
    registry: Arc<Registry>,
}

impl GatewayBroadcaster {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Evicts any connection that a broadcast found dead (send failed —
    /// the peer already disconnected). The heartbeat loop would reach the
    /// same connections eventually; this just reclaims memory sooner.
    async fn reap(&self, dead: Vec<crate::ConnectionId>) {
        for id in dead {
            self.registry.deregister(id).await;
        }
    }
}

#[async_trait::async_trait]
impl TableBroadcaster for GatewayBroadcaster {
    async fn broadcast(&self, table_id: TableId, message: ServerMessage) {
        let envelope = Envelope::new(message);
        let dead = self.registry.broadcast(Channel::Table(table_id), &envelope).await;
        self.reap(dead).await;
    }

    async fn send_to(&self, table_id: TableId, user_id: UserId, message: ServerMessage) {
        let _ = table_id;
        let envelope = Envelope::new(message);
        let dead = self.registry.send_to_user(user_id, &envelope).await;
        self.reap(dead).await;
    }
}
