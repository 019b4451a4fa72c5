//! Wire envelope (§6): every text frame in either direction is
//! `{"type": ..., "payload": ..., "correlationId"?: ..., "timestamp": ...}`.
//! `ServerMessage`'s own `#[serde(tag = "type")]` already produces a
//! `{"type": ..., ...fields}` shape with the payload fields flattened in
//! alongside `type` rather than nested under a `payload` key, which is the
//! simpler and more common framing in this codebase's own protocol
//! (`rbp_gameroom::message`) — the envelope here adds exactly the two
//! fields that shape doesn't carry: `correlationId` (client-request
//! round-trip) and `timestamp` (recovery ordering within a channel).
use rbp_gameroom::ServerMessage;
use serde::Serialize;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

fn now_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[derive(Clone, Debug, Serialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub message: ServerMessage,
    #[serde(rename = "correlationId", skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub timestamp: u64,
}

impl Envelope {
    pub fn new(message: ServerMessage) -> Self {
        Self { message, correlation_id: None, timestamp: now_millis() }
    }

    pub fn with_correlation(message: ServerMessage, correlation_id: impl Into<String>) -> Self {
        Self { message, correlation_id: Some(correlation_id.into()), timestamp: now_millis() }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("envelope is always serializable")
    }
}

/// A client→server system frame that isn't a table action — subscription
/// management, heartbeat replies, and the recovery handshake (§4.F, §6).
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Pong,
    SubscribeLobby,
    UnsubscribeLobby,
    SubscribeTable { room_id: String },
    UnsubscribeTable { room_id: String },
    SubscribeTournament { tournament_id: String },
    UnsubscribeTournament { tournament_id: String },
    RecoveryRequest { last_seen_versions: std::collections::HashMap<String, rbp_core::Version> },
    Action { action: String, amount: Option<rbp_core::Chips> },
    Chat { channel: String, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_flattens_message_fields() {
        let env = Envelope::new(ServerMessage::Error { message: "boom".into() });
        let json = env.to_json();
        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("\"message\":\"boom\""));
        assert!(json.contains("\"timestamp\""));
        assert!(!json.contains("correlationId"));
    }

    #[test]
    fn envelope_with_correlation_includes_it() {
        let env = Envelope::with_correlation(ServerMessage::Error { message: "boom".into() }, "req-1");
        assert!(env.to_json().contains("\"correlationId\":\"req-1\""));
    }

    #[test]
    fn decodes_recovery_request() {
        let body = r#"{"type":"recovery_request","last_seen_versions":{"lobby":4}}"#;
        let frame: ClientFrame = serde_json::from_str(body).unwrap();
        assert!(matches!(frame, ClientFrame::RecoveryRequest { .. }));
    }

    #[test]
    fn decodes_subscribe_table() {
        let body = r#"{"type":"subscribe_table","room_id":"x"}"#;
        let frame: ClientFrame = serde_json::from_str(body).unwrap();
        assert!(matches!(frame, ClientFrame::SubscribeTable { .. }));
    }
}
