use rbp_core::Chips;
use rbp_core::UserId;
use serde::Deserialize;

/// Published on `fraud:hand_completed` once a hand settles.
#[derive(Debug, Clone, Deserialize)]
pub struct HandCompletedEvent {
    pub hand_id: String,
    pub table_id: String,
    pub participants: Vec<HandParticipant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandParticipant {
    pub user_id: UserId,
    pub net: Chips,
}

/// Published on `fraud:player_action` for every decision a player makes.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerActionEvent {
    pub user_id: UserId,
    pub action_type: String,
    pub response_time_ms: u64,
    pub timestamp_ms: u64,
}

/// Published on `fraud:player_stats` when a session ends or checkpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerStatsEvent {
    pub user_id: UserId,
    pub table_id: String,
    pub hands_played: u32,
    pub total_bet: Chips,
    pub total_won: Chips,
    pub session_duration_seconds: u64,
}
