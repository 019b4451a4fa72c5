//! HTTP/WebSocket entrypoints (§4.F): bridges an `actix-ws` session to the
//! [`Registry`]/[`GameLoop`] pair. One bridge task per connection forwards
//! the registry's outbound channel into the socket and decodes inbound
//! text frames into [`ClientFrame`]s.
use crate::Channel;
use crate::ClientFrame;
use crate::Envelope;
use crate::GatewayBroadcaster;
use crate::Registry;
use actix_web::web;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use futures::StreamExt;
use rbp_core::TableId;
use rbp_core::UserId;
use rbp_gameroom::ChatMessage;
use rbp_gameroom::GameLoop;
use rbp_gameroom::Protocol;
use rbp_gameroom::ServerMessage;
use std::sync::Arc;

pub struct Casino {
    pub registry: Arc<Registry>,
    pub game_loop: Arc<GameLoop<GatewayBroadcaster>>,
}

impl Casino {
    pub fn new(registry: Arc<Registry>, game_loop: Arc<GameLoop<GatewayBroadcaster>>) -> Self {
        Self { registry, game_loop }
    }

    /// Accepts the upgraded WebSocket, subscribes the connection to
    /// `table_id`'s channel, sends an initial personalized snapshot, then
    /// spawns the bidirectional bridge.
    async fn bridge_table(
        self: Arc<Self>,
        table_id: TableId,
        user_id: Option<UserId>,
        mut session: actix_ws::Session,
        mut stream: actix_ws::MessageStream,
    ) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let connection_id = self.registry.register(tx).await;
        if let Some(user_id) = user_id {
            self.registry.identify(connection_id, user_id).await;
        }
        self.registry.subscribe(connection_id, Channel::Table(table_id)).await;
        let _ = session
            .text(Envelope::new(ServerMessage::ConnectionState { state: "connected".into() }).to_json())
            .await;

        let mut outbound_session = session.clone();
        actix_web::rt::spawn(async move {
            while let Some(json) = rx.recv().await {
                if outbound_session.text(json).await.is_err() {
                    break;
                }
            }
        });

        loop {
            match stream.next().await {
                Some(Ok(actix_ws::Message::Text(text))) => {
                    self.handle_frame(connection_id, table_id, user_id, &text).await;
                }
                Some(Ok(actix_ws::Message::Close(_))) | None => break,
                Some(Err(_)) => break,
                _ => continue,
            }
        }
        self.registry.deregister(connection_id).await;
        let _ = session.close(None).await;
    }

    async fn handle_frame(&self, connection_id: crate::ConnectionId, table_id: TableId, user_id: Option<UserId>, text: &str) {
        let frame: ClientFrame = match serde_json::from_str(text) {
            Ok(f) => f,
            Err(e) => {
                log::debug!("[gateway] bad frame from {connection_id}: {e}");
                return;
            }
        };
        match frame {
            ClientFrame::Pong => self.registry.record_pong(connection_id).await,
            ClientFrame::SubscribeTable { room_id } => {
                if let Some(channel) = Channel::parse(&format!("table:{room_id}")) {
                    self.registry.subscribe(connection_id, channel).await;
                }
            }
            ClientFrame::UnsubscribeTable { room_id } => {
                if let Some(channel) = Channel::parse(&format!("table:{room_id}")) {
                    self.registry.unsubscribe(connection_id, channel).await;
                }
            }
            ClientFrame::SubscribeLobby => self.registry.subscribe(connection_id, Channel::Lobby).await,
            ClientFrame::UnsubscribeLobby => self.registry.unsubscribe(connection_id, Channel::Lobby).await,
            ClientFrame::RecoveryRequest { last_seen_versions } => {
                let channels = crate::recovery::parse_requested_channels(&last_seen_versions);
                let names = channels.iter().map(|(c, _)| c.to_string()).collect();
                let response = Envelope::new(ServerMessage::RecoveryResponse { channels: names });
                self.registry.send_to_connection(connection_id, &response).await;
            }
            ClientFrame::Action { action, amount } => {
                let Some(user_id) = user_id else { return };
                match Protocol::decode(&serde_json::json!({ "action": action, "amount": amount }).to_string()) {
                    Ok(act) => {
                        if let Err(e) = self.game_loop.apply_action(table_id, user_id, act).await {
                            let err = Envelope::new(ServerMessage::Error { message: e.to_string() });
                            self.registry.send_to_connection(connection_id, &err).await;
                        }
                    }
                    Err(e) => {
                        let err = Envelope::new(ServerMessage::Error { message: e.to_string() });
                        self.registry.send_to_connection(connection_id, &err).await;
                    }
                }
            }
            ClientFrame::Chat { channel: _, body } => {
                let Some(user_id) = user_id else { return };
                self.game_loop.chat(table_id, ChatMessage { user_id, nickname: user_id.to_string(), body }).await;
            }
            ClientFrame::SubscribeTournament { .. } | ClientFrame::UnsubscribeTournament { .. } => {}
        }
    }
}

fn parse_user_id(query: &std::collections::HashMap<String, String>) -> Option<UserId> {
    query.get("user_id").and_then(|s| s.parse().ok())
}

/// `GET /ws/table/{table_id}` (§4.F). Authentication is an explicit
/// non-goal of this core — the caller's auth layer is expected to have
/// already validated `user_id` before routing here.
pub async fn table_ws(
    casino: web::Data<Arc<Casino>>,
    path: web::Path<String>,
    query: web::Query<std::collections::HashMap<String, String>>,
    req: HttpRequest,
    body: web::Payload,
) -> impl Responder {
    let Ok(table_id) = path.into_inner().parse::<TableId>() else {
        return HttpResponse::BadRequest().body("invalid table id");
    };
    let user_id = parse_user_id(&query);
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            let casino = casino.into_inner();
            actix_web::rt::spawn(casino.bridge_table(table_id, user_id, session, stream));
            response
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_id_from_query() {
        let mut q = std::collections::HashMap::new();
        let id = UserId::default();
        q.insert("user_id".to_string(), id.to_string());
        assert_eq!(parse_user_id(&q), Some(id));
    }

    #[test]
    fn missing_user_id_is_anonymous() {
        let q = std::collections::HashMap::new();
        assert_eq!(parse_user_id(&q), None);
    }
}
