//! Immutable tournament state types. Mutations construct a new
//! [`TournamentState`] and replace the stored value under the tournament's
//! lock scope rather than mutating in place.
use rbp_core::Chips;
use rbp_core::Position;
use rbp_core::TableId;
use rbp_core::TournamentId;
use rbp_core::UserId;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatus {
    Registering,
    Starting,
    Running,
    Paused,
    FinalTable,
    HeadsUp,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindLevel {
    pub level: u32,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub ante: Chips,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentConfig {
    pub name: String,
    pub min_players: usize,
    pub max_players: usize,
    pub players_per_table: usize,
    pub buy_in: Chips,
    pub starting_chips: Chips,
    pub blind_levels: Vec<BlindLevel>,
    pub payout_structure: Vec<f64>,
    pub itm_percentage: f64,
    pub shotgun_countdown: Duration,
    pub final_table_size: usize,
}

impl TournamentConfig {
    pub fn blind_level(&self, level: u32) -> Option<BlindLevel> {
        self.blind_levels.iter().copied().find(|bl| bl.level == level)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentPlayer {
    pub user_id: UserId,
    pub nickname: String,
    pub chip_count: Chips,
    pub table_id: Option<TableId>,
    pub seat_position: Option<Position>,
    pub is_active: bool,
    pub elimination_rank: Option<usize>,
}

impl TournamentPlayer {
    pub fn new(user_id: UserId, nickname: String, starting_chips: Chips) -> Self {
        Self {
            user_id,
            nickname,
            chip_count: starting_chips,
            table_id: None,
            seat_position: None,
            is_active: true,
            elimination_rank: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentTable {
    pub table_id: TableId,
    pub table_number: u32,
    pub seats: Vec<Option<UserId>>,
    pub hand_in_progress: bool,
    pub is_breaking: bool,
}

impl TournamentTable {
    pub fn new(table_id: TableId, table_number: u32, max_seats: usize) -> Self {
        Self {
            table_id,
            table_number,
            seats: vec![None; max_seats],
            hand_in_progress: false,
            is_breaking: false,
        }
    }

    pub fn player_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    pub fn empty_seats(&self) -> Vec<Position> {
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn seat_player(&mut self, user_id: UserId, position: Position) {
        self.seats[position] = Some(user_id);
    }

    pub fn remove_player(&mut self, user_id: UserId) {
        if let Some(seat) = self.seats.iter_mut().find(|s| **s == Some(user_id)) {
            *seat = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentEventType {
    TournamentCreated,
    TournamentStarted { target_start_time_ms: u64 },
    TournamentCompleted,
    TournamentCancelled,
    TournamentPaused,
    TournamentResumed,
    PlayerRegistered,
    PlayerEliminated { rank: usize },
    PlayerMoved,
    TableHandStarted,
    TableHandCompleted,
    TableBalancingExecuted,
    BlindLevelChanged { level: u32, next_level_at_ms: u64 },
    BlindIncreaseWarning { seconds_remaining: u64 },
    RankingUpdated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentEvent {
    pub tournament_id: TournamentId,
    pub event_type: TournamentEventType,
    pub table_id: Option<TableId>,
    pub user_id: Option<UserId>,
}

/// Full tournament state. Every mutation method on [`crate::engine::TournamentEngine`]
/// consumes the previous value and produces one of these, which then
/// replaces the engine's stored copy under the tournament lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentState {
    pub tournament_id: TournamentId,
    pub config: TournamentConfig,
    pub status: TournamentStatus,
    pub current_blind_level: u32,
    #[serde(with = "option_millis")]
    pub level_started_at: Option<SystemTime>,
    #[serde(with = "option_millis")]
    pub next_level_at: Option<SystemTime>,
    pub players: HashMap<UserId, TournamentPlayer>,
    pub tables: HashMap<TableId, TournamentTable>,
    pub ranking: Vec<UserId>,
    pub total_prize_pool: Chips,
    pub pause_reason: Option<String>,
    pub(crate) paused_from: Option<TournamentStatus>,
}

impl TournamentState {
    pub fn new(tournament_id: TournamentId, config: TournamentConfig) -> Self {
        Self {
            tournament_id,
            config,
            status: TournamentStatus::Registering,
            current_blind_level: 1,
            level_started_at: None,
            next_level_at: None,
            players: HashMap::new(),
            tables: HashMap::new(),
            ranking: Vec::new(),
            total_prize_pool: 0,
            pause_reason: None,
            paused_from: None,
        }
    }

    pub fn active_player_count(&self) -> usize {
        self.players.values().filter(|p| p.is_active).count()
    }

    pub fn current_blind(&self) -> Option<BlindLevel> {
        self.config.blind_level(self.current_blind_level)
    }
}

/// Serializes `Option<SystemTime>` as millis-since-epoch for a stable,
/// language-agnostic snapshot wire format.
mod option_millis {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use std::time::Duration;
    use std::time::SystemTime;
    use std::time::UNIX_EPOCH;

    pub fn serialize<S: Serializer>(value: &Option<SystemTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => {
                let millis = t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64;
                s.serialize_some(&millis)
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SystemTime>, D::Error> {
        let millis: Option<u64> = Option::deserialize(d)?;
        Ok(millis.map(|m| UNIX_EPOCH + Duration::from_millis(m)))
    }
}
