//! Real-time ranking backed by a Redis sorted set: O(log n) rank lookups,
//! O(log n + k) top-k/nearby-k windows, full snapshots cached for a second
//! at a time and rebuilt in the background.
use crate::models::TournamentState;
use rbp_core::Chips;
use rbp_core::TableId;
use rbp_core::TournamentId;
use rbp_core::UserId;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

pub const SNAPSHOT_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub nickname: String,
    pub chip_count: Chips,
    pub table_id: Option<TableId>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct RankingSnapshot {
    pub tournament_id: TournamentId,
    pub generated_at: Instant,
    pub entries: Vec<RankingEntry>,
    pub total_players: usize,
    pub active_players: usize,
    pub total_chips: Chips,
    pub average_stack: Chips,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlayerInfo {
    nickname: String,
    table_id: Option<TableId>,
    is_active: bool,
}

pub struct RankingEngine {
    conn: ConnectionManager,
    snapshots: Mutex<HashMap<TournamentId, RankingSnapshot>>,
}

impl RankingEngine {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    fn ranking_key(tournament_id: TournamentId) -> String {
        format!("tournament:ranking:{tournament_id}")
    }

    fn info_key(tournament_id: TournamentId) -> String {
        format!("tournament:ranking:{tournament_id}:info")
    }

    pub async fn register_player(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        nickname: &str,
        chip_count: Chips,
        table_id: Option<TableId>,
    ) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        let ranking_key = Self::ranking_key(tournament_id);
        let info_key = Self::info_key(tournament_id);
        conn.zadd::<_, _, _, ()>(&ranking_key, user_id.to_string(), chip_count as f64)
            .await?;
        let info = PlayerInfo {
            nickname: nickname.to_string(),
            table_id,
            is_active: true,
        };
        conn.hset::<_, _, _, ()>(&info_key, user_id.to_string(), serde_json::to_string(&info).unwrap())
            .await?;
        Ok(())
    }

    /// Returns the player's new 1-indexed rank, or `None` if not registered.
    pub async fn update_chips(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        chip_count: Chips,
        table_id: Option<TableId>,
    ) -> redis::RedisResult<Option<usize>> {
        let mut conn = self.conn.clone();
        let ranking_key = Self::ranking_key(tournament_id);
        conn.zadd::<_, _, _, ()>(&ranking_key, user_id.to_string(), chip_count as f64)
            .await?;

        if let Some(table_id) = table_id {
            let info_key = Self::info_key(tournament_id);
            let existing: Option<String> = conn.hget(&info_key, user_id.to_string()).await?;
            if let Some(raw) = existing {
                if let Ok(mut info) = serde_json::from_str::<PlayerInfo>(&raw) {
                    info.table_id = Some(table_id);
                    conn.hset::<_, _, _, ()>(&info_key, user_id.to_string(), serde_json::to_string(&info).unwrap())
                        .await?;
                }
            }
        }

        let rank0: Option<isize> = conn.zrevrank(&ranking_key, user_id.to_string()).await?;
        Ok(rank0.map(|r| r as usize + 1))
    }

    pub async fn update_batch(
        &self,
        tournament_id: TournamentId,
        updates: &[(UserId, Chips)],
    ) -> redis::RedisResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let ranking_key = Self::ranking_key(tournament_id);
        let pairs: Vec<(f64, String)> = updates.iter().map(|(u, c)| (*c as f64, u.to_string())).collect();
        conn.zadd_multiple::<_, _, _, ()>(&ranking_key, &pairs).await
    }

    pub async fn eliminate_player(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        final_rank: usize,
    ) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        let ranking_key = Self::ranking_key(tournament_id);
        let info_key = Self::info_key(tournament_id);
        conn.zadd::<_, _, _, ()>(&ranking_key, user_id.to_string(), 0.0).await?;

        let existing: Option<String> = conn.hget(&info_key, user_id.to_string()).await?;
        if let Some(raw) = existing {
            if let Ok(mut info) = serde_json::from_str::<PlayerInfo>(&raw) {
                info.is_active = false;
                let _ = final_rank;
                conn.hset::<_, _, _, ()>(&info_key, user_id.to_string(), serde_json::to_string(&info).unwrap())
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn get_rank(&self, tournament_id: TournamentId, user_id: UserId) -> redis::RedisResult<Option<usize>> {
        let mut conn = self.conn.clone();
        let ranking_key = Self::ranking_key(tournament_id);
        let rank0: Option<isize> = conn.zrevrank(&ranking_key, user_id.to_string()).await?;
        Ok(rank0.map(|r| r as usize + 1))
    }

    pub async fn get_top_players(
        &self,
        tournament_id: TournamentId,
        count: isize,
    ) -> redis::RedisResult<Vec<RankingEntry>> {
        self.get_range(tournament_id, 0, count - 1).await
    }

    pub async fn get_nearby_players(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        above: isize,
        below: isize,
    ) -> redis::RedisResult<Vec<RankingEntry>> {
        let mut conn = self.conn.clone();
        let ranking_key = Self::ranking_key(tournament_id);
        let rank0: Option<isize> = conn.zrevrank(&ranking_key, user_id.to_string()).await?;
        let Some(rank0) = rank0 else { return Ok(Vec::new()) };
        let start = (rank0 - above).max(0);
        let end = rank0 + below;
        self.get_range(tournament_id, start, end).await
    }

    async fn get_range(
        &self,
        tournament_id: TournamentId,
        start: isize,
        end: isize,
    ) -> redis::RedisResult<Vec<RankingEntry>> {
        let mut conn = self.conn.clone();
        let ranking_key = Self::ranking_key(tournament_id);
        let info_key = Self::info_key(tournament_id);

        let range: Vec<(String, f64)> = conn.zrevrange_withscores(&ranking_key, start as isize, end as isize).await?;
        let mut entries = Vec::with_capacity(range.len());
        for (idx, (uid_str, chips)) in range.into_iter().enumerate() {
            let rank = start as usize + idx + 1;
            let user_id: UserId = uid_str.parse().unwrap_or_default();
            let info_raw: Option<String> = conn.hget(&info_key, &uid_str).await?;
            let (nickname, table_id, is_active) = match info_raw.and_then(|raw| serde_json::from_str::<PlayerInfo>(&raw).ok()) {
                Some(info) => (info.nickname, info.table_id, info.is_active),
                None => (uid_str.chars().take(8).collect(), None, true),
            };
            entries.push(RankingEntry {
                rank,
                user_id,
                nickname,
                chip_count: chips as Chips,
                table_id,
                is_active,
            });
        }
        Ok(entries)
    }

    /// Returns the cached snapshot if fresh, otherwise regenerates it.
    pub async fn get_snapshot(&self, tournament_id: TournamentId) -> redis::RedisResult<RankingSnapshot> {
        let cached = self.snapshots.lock().unwrap().get(&tournament_id).cloned();
        if let Some(snapshot) = cached {
            if snapshot.generated_at.elapsed() < SNAPSHOT_INTERVAL {
                return Ok(snapshot);
            }
        }
        self.generate_snapshot(tournament_id).await
    }

    pub async fn generate_snapshot(&self, tournament_id: TournamentId) -> redis::RedisResult<RankingSnapshot> {
        let entries = self.get_range(tournament_id, 0, -1).await?;
        let total_players = entries.len();
        let active_players = entries.iter().filter(|e| e.is_active).count();
        let total_chips: Chips = entries.iter().map(|e| e.chip_count).sum();
        let average_stack = if active_players > 0 {
            total_chips / active_players as Chips
        } else {
            0
        };

        let snapshot = RankingSnapshot {
            tournament_id,
            generated_at: Instant::now(),
            entries,
            total_players,
            active_players,
            total_chips,
            average_stack,
        };
        self.snapshots.lock().unwrap().insert(tournament_id, snapshot.clone());
        Ok(snapshot)
    }

    /// Rebuilds Redis ranking state from the authoritative in-memory
    /// [`TournamentState`] — used on recovery after a restart.
    pub async fn sync_from_state(&self, state: &TournamentState) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        let ranking_key = Self::ranking_key(state.tournament_id);
        let info_key = Self::info_key(state.tournament_id);

        let mut pipe = redis::pipe();
        pipe.atomic().del(&ranking_key).del(&info_key);
        for player in state.players.values() {
            let info = PlayerInfo {
                nickname: player.nickname.clone(),
                table_id: player.table_id,
                is_active: player.is_active,
            };
            pipe.zadd(&ranking_key, player.user_id.to_string(), player.chip_count as f64)
                .hset(&info_key, player.user_id.to_string(), serde_json::to_string(&info).unwrap());
        }
        pipe.query_async::<()>(&mut conn).await
    }

    pub async fn cleanup(&self, tournament_id: TournamentId) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        let ranking_key = Self::ranking_key(tournament_id);
        let info_key = Self::info_key(tournament_id);
        conn.del::<_, ()>((&ranking_key, &info_key)).await?;
        self.snapshots.lock().unwrap().remove(&tournament_id);
        Ok(())
    }
}
