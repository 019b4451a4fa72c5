//! Fault-tolerance snapshotting: a gzip+HMAC-sealed full state snapshot per
//! tournament, plus a lighter in-flight hand snapshot per table so a crash
//! mid-hand doesn't cost a player their seat.
use crate::models::TournamentState;
use hmac::Hmac;
use hmac::Mac;
use rbp_core::Chips;
use rbp_core::TableId;
use rbp_core::TournamentId;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::io::Read;
use std::io::Write;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;
use thiserror::Error;

const KEY_PREFIX: &str = "tournament:snapshot";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no snapshot found")]
    NotFound,
    #[error("snapshot checksum mismatch, refusing to load")]
    ChecksumMismatch,
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub tournament_id: TournamentId,
    pub blind_level: u32,
    pub active_players: usize,
    pub size_bytes: usize,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandSnapshot {
    pub table_id: TableId,
    pub hand_id: String,
    pub hand_state: Vec<u8>,
    pub starting_stacks: HashMap<String, Chips>,
}

pub struct SnapshotManager {
    conn: ConnectionManager,
    hmac_key: Vec<u8>,
}

impl SnapshotManager {
    pub fn new(conn: ConnectionManager, hmac_key: impl Into<Vec<u8>>) -> Self {
        Self {
            conn,
            hmac_key: hmac_key.into(),
        }
    }

    fn latest_key(tournament_id: TournamentId) -> String {
        format!("{KEY_PREFIX}:{tournament_id}:latest")
    }

    fn hand_key(tournament_id: TournamentId, table_id: TableId) -> String {
        format!("{KEY_PREFIX}:{tournament_id}:hand:{table_id}")
    }

    fn seal(&self, payload: &[u8]) -> Result<Vec<u8>, SnapshotError> {
        seal_with_key(&self.hmac_key, payload)
    }

    fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>, SnapshotError> {
        unseal_with_key(&self.hmac_key, sealed)
    }

    pub async fn save_full_snapshot(&self, state: &TournamentState) -> Result<SnapshotMetadata, SnapshotError> {
        let payload = serde_json::to_vec(state)?;
        let sealed = self.seal(&payload)?;
        let size_bytes = sealed.len();

        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(Self::latest_key(state.tournament_id), sealed).await?;

        Ok(SnapshotMetadata {
            tournament_id: state.tournament_id,
            blind_level: state.current_blind_level,
            active_players: state.active_player_count(),
            size_bytes,
            created_at_ms: now_ms(),
        })
    }

    pub async fn load_latest(&self, tournament_id: TournamentId) -> Result<TournamentState, SnapshotError> {
        let mut conn = self.conn.clone();
        let sealed: Option<Vec<u8>> = conn.get(Self::latest_key(tournament_id)).await?;
        let sealed = sealed.ok_or(SnapshotError::NotFound)?;
        let payload = self.unseal(&sealed)?;
        Ok(serde_json::from_slice(&payload)?)
    }

    pub async fn save_hand_snapshot(
        &self,
        tournament_id: TournamentId,
        table_id: TableId,
        hand_id: String,
        hand_state: Vec<u8>,
        starting_stacks: HashMap<String, Chips>,
    ) -> Result<(), SnapshotError> {
        let snapshot = HandSnapshot {
            table_id,
            hand_id,
            hand_state,
            starting_stacks,
        };
        let payload = serde_json::to_vec(&snapshot)?;
        let sealed = self.seal(&payload)?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(Self::hand_key(tournament_id, table_id), sealed).await?;
        Ok(())
    }

    pub async fn load_hand(
        &self,
        tournament_id: TournamentId,
        table_id: TableId,
    ) -> Result<Option<HandSnapshot>, SnapshotError> {
        let mut conn = self.conn.clone();
        let sealed: Option<Vec<u8>> = conn.get(Self::hand_key(tournament_id, table_id)).await?;
        let Some(sealed) = sealed else { return Ok(None) };
        let payload = self.unseal(&sealed)?;
        Ok(Some(serde_json::from_slice(&payload)?))
    }

    pub async fn complete_hand(&self, tournament_id: TournamentId, table_id: TableId) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.del(Self::hand_key(tournament_id, table_id)).await
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

fn sign_with_key(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn seal_with_key(key: &[u8], payload: &[u8]) -> Result<Vec<u8>, SnapshotError> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(payload)?;
    let compressed = encoder.finish()?;
    let checksum = sign_with_key(key, &compressed);
    let mut sealed = Vec::with_capacity(checksum.len() + compressed.len());
    sealed.extend_from_slice(&checksum);
    sealed.extend_from_slice(&compressed);
    Ok(sealed)
}

fn unseal_with_key(key: &[u8], sealed: &[u8]) -> Result<Vec<u8>, SnapshotError> {
    if sealed.len() < 32 {
        return Err(SnapshotError::ChecksumMismatch);
    }
    let (checksum, compressed) = sealed.split_at(32);
    if sign_with_key(key, compressed) != checksum {
        return Err(SnapshotError::ChecksumMismatch);
    }
    let mut decoder = flate2::read::GzDecoder::new(compressed);
    let mut payload = Vec::new();
    decoder.read_to_end(&mut payload)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_payload_roundtrips() {
        let payload = b"hello tournament state";
        let sealed = seal_with_key(b"test-key", payload).unwrap();
        let unsealed = unseal_with_key(b"test-key", &sealed).unwrap();
        assert_eq!(unsealed, payload);
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let mut sealed = seal_with_key(b"test-key", b"hello").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(matches!(
            unseal_with_key(b"test-key", &sealed),
            Err(SnapshotError::ChecksumMismatch) | Err(SnapshotError::Io(_))
        ));
    }

    #[test]
    fn wrong_key_fails_checksum() {
        let sealed = seal_with_key(b"key-a", b"hello").unwrap();
        assert!(matches!(unseal_with_key(b"key-b", &sealed), Err(SnapshotError::ChecksumMismatch)));
    }
}
