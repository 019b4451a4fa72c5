//! Top-level tournament orchestrator: lifecycle transitions, shotgun start,
//! hand completion, and the blind-level/balancing background loops, all
//! guarded by [`rbp_distlock`]'s hierarchical tournament/table/player locks
//! so a multi-process deployment never races on the same tournament.
use crate::balancer::TableBalancer;
use crate::models::TournamentEvent;
use crate::models::TournamentEventType;
use crate::models::TournamentPlayer;
use crate::models::TournamentState;
use crate::models::TournamentStatus;
use crate::models::TournamentTable;
use crate::ranking::RankingEngine;
use crate::snapshot::SnapshotManager;
use rand::seq::SliceRandom;
use rbp_core::TableId;
use rbp_core::TournamentId;
use rbp_core::UserId;
use rbp_distlock::DistLockManager;
use rbp_distlock::LockKey;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("tournament {0} not found")]
    NotFound(TournamentId),
    #[error("registration is closed for this tournament")]
    RegistrationClosed,
    #[error("tournament is full")]
    TournamentFull,
    #[error("player already registered")]
    AlreadyRegistered,
    #[error("minimum {0} players required to start")]
    NotEnoughPlayers(usize),
    #[error("tournament cannot be {1} while in status {0:?}")]
    InvalidTransition(TournamentStatus, &'static str),
    #[error(transparent)]
    Lock(#[from] rbp_distlock::LockError),
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error(transparent)]
    Snapshot(#[from] crate::snapshot::SnapshotError),
}

#[derive(Debug, Clone)]
pub struct ShotgunStartState {
    pub tournament_id: TournamentId,
    pub target_start_time: Instant,
    pub countdown: Duration,
    pub registered_players: usize,
    pub started: bool,
}

#[async_trait::async_trait]
pub trait TournamentEventPublisher: Send + Sync {
    async fn publish(&self, event: TournamentEvent);
}

/// Bridges the tournament engine to the actual table/game-loop machinery —
/// starting a hand at a table is outside this crate's scope.
#[async_trait::async_trait]
pub trait HandLifecycle: Send + Sync {
    async fn start_hand(&self, tournament_id: TournamentId, table_id: TableId);
}

pub struct TournamentEngine<P: TournamentEventPublisher, H: HandLifecycle> {
    locks: DistLockManager,
    events: P,
    hand_lifecycle: H,
    balancer: TableBalancer,
    ranking: RankingEngine,
    snapshot: SnapshotManager,
    tournaments: RwLock<HashMap<TournamentId, TournamentState>>,
    shotgun_states: Mutex<HashMap<TournamentId, ShotgunStartState>>,
}

impl<P: TournamentEventPublisher + 'static, H: HandLifecycle + 'static> TournamentEngine<P, H> {
    pub fn new(locks: DistLockManager, events: P, hand_lifecycle: H, ranking: RankingEngine, snapshot: SnapshotManager) -> Self {
        Self {
            locks,
            events,
            hand_lifecycle,
            balancer: TableBalancer::new(2, 9, 6),
            ranking,
            snapshot,
            tournaments: RwLock::new(HashMap::new()),
            shotgun_states: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create_tournament(&self, config: crate::models::TournamentConfig) -> TournamentState {
        let tournament_id = TournamentId::default();
        let state = TournamentState::new(tournament_id, config.clone());
        self.tournaments.write().await.insert(tournament_id, state.clone());

        self.events
            .publish(TournamentEvent {
                tournament_id,
                event_type: TournamentEventType::TournamentCreated,
                table_id: None,
                user_id: None,
            })
            .await;

        state
    }

    pub async fn register_player(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        nickname: &str,
    ) -> Result<(TournamentState, TournamentPlayer), EngineError> {
        let mut locks = self.locks.clone();
        let lock = locks.acquire(LockKey::tournament(tournament_id), Duration::from_secs(5)).await?;

        let result = async {
            let mut tournaments = self.tournaments.write().await;
            let state = tournaments.get_mut(&tournament_id).ok_or(EngineError::NotFound(tournament_id))?;

            if state.status != TournamentStatus::Registering {
                return Err(EngineError::RegistrationClosed);
            }
            if state.players.len() >= state.config.max_players {
                return Err(EngineError::TournamentFull);
            }
            if state.players.contains_key(&user_id) {
                return Err(EngineError::AlreadyRegistered);
            }

            let player = TournamentPlayer::new(user_id, nickname.to_string(), state.config.starting_chips);
            state.players.insert(user_id, player.clone());
            state.total_prize_pool += state.config.buy_in;

            Ok((state.clone(), player))
        }
        .await;

        locks.release(lock).await?;

        if let Ok((state, player)) = &result {
            self.ranking
                .register_player(tournament_id, user_id, nickname, player.chip_count, None)
                .await?;
            self.events
                .publish(TournamentEvent {
                    tournament_id,
                    event_type: TournamentEventType::PlayerRegistered,
                    table_id: None,
                    user_id: Some(user_id),
                })
                .await;
            let _ = state;
        }
        result
    }

    pub async fn start_tournament(self: &Arc<Self>, tournament_id: TournamentId) -> Result<TournamentState, EngineError> {
        let mut locks = self.locks.clone();
        let lock = locks.acquire(LockKey::tournament(tournament_id), Duration::from_secs(5)).await?;

        let result = async {
            let mut tournaments = self.tournaments.write().await;
            let state = tournaments.get_mut(&tournament_id).ok_or(EngineError::NotFound(tournament_id))?;

            if state.status != TournamentStatus::Registering {
                return Err(EngineError::RegistrationClosed);
            }
            if state.players.len() < state.config.min_players {
                return Err(EngineError::NotEnoughPlayers(state.config.min_players));
            }

            let tables = create_tables_and_seat_players(state);
            for table in tables.values() {
                for (seat, uid) in table.seats.iter().enumerate() {
                    if let Some(uid) = uid {
                        if let Some(player) = state.players.get_mut(uid) {
                            player.table_id = Some(table.table_id);
                            player.seat_position = Some(seat);
                        }
                    }
                }
            }
            state.tables = tables;
            state.status = TournamentStatus::Starting;

            Ok(state.clone())
        }
        .await;

        locks.release(lock).await?;
        let state = result?;

        let countdown = state.config.shotgun_countdown;
        let target_start_time_ms = (std::time::SystemTime::now() + countdown)
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.shotgun_states.lock().unwrap().insert(
            tournament_id,
            ShotgunStartState {
                tournament_id,
                target_start_time: Instant::now() + countdown,
                countdown,
                registered_players: state.players.len(),
                started: false,
            },
        );

        self.events
            .publish(TournamentEvent {
                tournament_id,
                event_type: TournamentEventType::TournamentStarted { target_start_time_ms },
                table_id: None,
                user_id: None,
            })
            .await;

        let _ = self.snapshot.save_full_snapshot(&state).await;

        let this = Arc::clone(self);
        tokio::spawn(async move { this.clone().execute_shotgun_start(tournament_id, countdown).await });

        Ok(state)
    }

    async fn execute_shotgun_start(self: Arc<Self>, tournament_id: TournamentId, countdown: Duration) {
        tokio::time::sleep(countdown).await;

        let mut locks = self.locks.clone();
        let Ok(lock) = locks.acquire(LockKey::tournament(tournament_id), Duration::from_secs(5)).await else {
            return;
        };

        let table_ids: Vec<TableId> = {
            let mut tournaments = self.tournaments.write().await;
            let Some(state) = tournaments.get_mut(&tournament_id) else {
                let _ = locks.release(lock).await;
                return;
            };
            if state.status != TournamentStatus::Starting {
                let _ = locks.release(lock).await;
                return;
            }
            state.status = TournamentStatus::Running;
            state.tables.keys().copied().collect()
        };
        let _ = locks.release(lock).await;

        let mut handles = Vec::with_capacity(table_ids.len());
        for table_id in table_ids {
            let this = Arc::clone(&self);
            handles.push(tokio::spawn(async move { this.start_table_hand(tournament_id, table_id).await }));
        }
        for handle in handles {
            let _ = handle.await;
        }

        if let Some(s) = self.shotgun_states.lock().unwrap().get_mut(&tournament_id) {
            s.started = true;
        }
    }

    async fn start_table_hand(&self, tournament_id: TournamentId, table_id: TableId) {
        let mut locks = self.locks.clone();
        let Ok(lock) = locks.acquire(LockKey::table(table_id), Duration::from_secs(5)).await else { return };

        let player_count = {
            let tournaments = self.tournaments.read().await;
            tournaments.get(&tournament_id).and_then(|s| s.tables.get(&table_id)).map(|t| t.player_count())
        };
        let _ = locks.release(lock).await;

        if player_count.unwrap_or(0) < 2 {
            return;
        }

        self.events
            .publish(TournamentEvent {
                tournament_id,
                event_type: TournamentEventType::TableHandStarted,
                table_id: Some(table_id),
                user_id: None,
            })
            .await;

        self.hand_lifecycle.start_hand(tournament_id, table_id).await;
    }

    pub async fn complete_hand(
        &self,
        tournament_id: TournamentId,
        table_id: TableId,
        chip_changes: &HashMap<UserId, rbp_core::Chips>,
        eliminated: &[UserId],
    ) -> Result<TournamentState, EngineError> {
        let mut locks = self.locks.clone();
        let lock = locks.acquire(LockKey::table(table_id), Duration::from_secs(5)).await?;

        let result = async {
            let mut tournaments = self.tournaments.write().await;
            let state = tournaments.get_mut(&tournament_id).ok_or(EngineError::NotFound(tournament_id))?;
            let mut active_count = state.active_player_count();

            for (user_id, new_chips) in chip_changes {
                if let Some(player) = state.players.get_mut(user_id) {
                    player.chip_count = *new_chips;
                }
            }

            for user_id in eliminated {
                if let Some(player) = state.players.get_mut(user_id) {
                    active_count -= 1;
                    player.is_active = false;
                    player.elimination_rank = Some(active_count + 1);
                }
                if let Some(table) = state.tables.get_mut(&table_id) {
                    table.remove_player(*user_id);
                }
            }

            if let Some(table) = state.tables.get_mut(&table_id) {
                table.hand_in_progress = false;
            }

            state.status = if active_count <= 1 {
                TournamentStatus::Completed
            } else if active_count <= 2 {
                TournamentStatus::HeadsUp
            } else if active_count <= state.config.players_per_table {
                TournamentStatus::FinalTable
            } else {
                state.status
            };

            Ok(state.clone())
        }
        .await;

        locks.release(lock).await?;
        let state = result?;

        let ranking_updates: Vec<(UserId, rbp_core::Chips)> =
            chip_changes.iter().filter(|(uid, _)| state.players.contains_key(uid)).map(|(uid, c)| (*uid, *c)).collect();
        self.ranking.update_batch(tournament_id, &ranking_updates).await?;
        let _ = self.snapshot.complete_hand(tournament_id, table_id).await;

        self.events
            .publish(TournamentEvent {
                tournament_id,
                event_type: TournamentEventType::TableHandCompleted,
                table_id: Some(table_id),
                user_id: None,
            })
            .await;

        Ok(state)
    }

    /// Admin-initiated pause: blind increases and table balancing stop
    /// ticking for this tournament until [`Self::resume_tournament`] is
    /// called. Only valid while the tournament is actually in play.
    pub async fn pause_tournament(&self, tournament_id: TournamentId, reason: &str) -> Result<TournamentState, EngineError> {
        let mut locks = self.locks.clone();
        let lock = locks.acquire(LockKey::tournament(tournament_id), Duration::from_secs(5)).await?;

        let result = async {
            let mut tournaments = self.tournaments.write().await;
            let state = tournaments.get_mut(&tournament_id).ok_or(EngineError::NotFound(tournament_id))?;
            if !matches!(state.status, TournamentStatus::Running | TournamentStatus::FinalTable | TournamentStatus::HeadsUp) {
                return Err(EngineError::InvalidTransition(state.status, "paused"));
            }
            state.paused_from = Some(state.status);
            state.status = TournamentStatus::Paused;
            state.pause_reason = Some(reason.to_string());
            Ok(state.clone())
        }
        .await;

        locks.release(lock).await?;
        let state = result?;

        self.events
            .publish(TournamentEvent {
                tournament_id,
                event_type: TournamentEventType::TournamentPaused,
                table_id: None,
                user_id: None,
            })
            .await;
        let _ = self.snapshot.save_full_snapshot(&state).await;

        Ok(state)
    }

    /// Resumes a paused tournament back into the status it was paused
    /// from, so blind-level and balancing ticks pick back up where they
    /// left off.
    pub async fn resume_tournament(&self, tournament_id: TournamentId) -> Result<TournamentState, EngineError> {
        let mut locks = self.locks.clone();
        let lock = locks.acquire(LockKey::tournament(tournament_id), Duration::from_secs(5)).await?;

        let result = async {
            let mut tournaments = self.tournaments.write().await;
            let state = tournaments.get_mut(&tournament_id).ok_or(EngineError::NotFound(tournament_id))?;
            if state.status != TournamentStatus::Paused {
                return Err(EngineError::InvalidTransition(state.status, "resumed"));
            }
            state.status = state.paused_from.take().unwrap_or(TournamentStatus::Running);
            state.pause_reason = None;
            Ok(state.clone())
        }
        .await;

        locks.release(lock).await?;
        let state = result?;

        self.events
            .publish(TournamentEvent {
                tournament_id,
                event_type: TournamentEventType::TournamentResumed,
                table_id: None,
                user_id: None,
            })
            .await;
        let _ = self.snapshot.save_full_snapshot(&state).await;

        Ok(state)
    }

    /// Admin-initiated cancellation. Valid any time before the tournament
    /// has already finished or been cancelled; terminal like
    /// [`TournamentStatus::Completed`].
    pub async fn cancel_tournament(&self, tournament_id: TournamentId, reason: &str) -> Result<TournamentState, EngineError> {
        let mut locks = self.locks.clone();
        let lock = locks.acquire(LockKey::tournament(tournament_id), Duration::from_secs(5)).await?;

        let result = async {
            let mut tournaments = self.tournaments.write().await;
            let state = tournaments.get_mut(&tournament_id).ok_or(EngineError::NotFound(tournament_id))?;
            if matches!(state.status, TournamentStatus::Completed | TournamentStatus::Cancelled) {
                return Err(EngineError::InvalidTransition(state.status, "cancelled"));
            }
            state.status = TournamentStatus::Cancelled;
            state.pause_reason = Some(reason.to_string());
            state.paused_from = None;
            Ok(state.clone())
        }
        .await;

        locks.release(lock).await?;
        let state = result?;

        self.events
            .publish(TournamentEvent {
                tournament_id,
                event_type: TournamentEventType::TournamentCancelled,
                table_id: None,
                user_id: None,
            })
            .await;
        let _ = self.snapshot.save_full_snapshot(&state).await;

        Ok(state)
    }

    /// Checks every active tournament once a second; advances the blind
    /// level (or fires a 30-second warning) for any that are due.
    pub async fn run_blind_level_loop(self: Arc<Self>) {
        loop {
            let ids: Vec<TournamentId> = {
                let tournaments = self.tournaments.read().await;
                tournaments
                    .iter()
                    .filter(|(_, s)| {
                        matches!(s.status, TournamentStatus::Running | TournamentStatus::FinalTable | TournamentStatus::HeadsUp)
                    })
                    .map(|(id, _)| *id)
                    .collect()
            };
            for tournament_id in ids {
                self.check_blind_level(tournament_id).await;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn check_blind_level(&self, tournament_id: TournamentId) {
        let due = {
            let tournaments = self.tournaments.read().await;
            match tournaments.get(&tournament_id).and_then(|s| s.next_level_at) {
                Some(next_at) => next_at <= std::time::SystemTime::now(),
                None => false,
            }
        };
        if due {
            self.level_up(tournament_id).await;
        }
    }

    async fn level_up(&self, tournament_id: TournamentId) {
        let mut locks = self.locks.clone();
        let Ok(lock) = locks.acquire(LockKey::blind(tournament_id), Duration::from_secs(5)).await else { return };

        let new_level = {
            let mut tournaments = self.tournaments.write().await;
            let Some(state) = tournaments.get_mut(&tournament_id) else {
                let _ = locks.release(lock).await;
                return;
            };
            let Some(next) = state.config.blind_level(state.current_blind_level + 1) else {
                let _ = locks.release(lock).await;
                return;
            };
            let next_level_at = std::time::SystemTime::now() + next.duration;
            state.current_blind_level = next.level;
            state.level_started_at = Some(std::time::SystemTime::now());
            state.next_level_at = Some(next_level_at);
            let next_level_at_ms = next_level_at.duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis() as u64;
            Some((next, next_level_at_ms))
        };
        let _ = locks.release(lock).await;

        let Some((next, next_level_at_ms)) = new_level else { return };
        self.events
            .publish(TournamentEvent {
                tournament_id,
                event_type: TournamentEventType::BlindLevelChanged {
                    level: next.level,
                    next_level_at_ms,
                },
                table_id: None,
                user_id: None,
            })
            .await;

        if let Some(state) = self.tournaments.read().await.get(&tournament_id) {
            let _ = self.snapshot.save_full_snapshot(state).await;
        }
    }

    /// Checks every active tournament once every two seconds and executes
    /// any balancing moves whose source table isn't mid-hand.
    pub async fn run_balancing_loop(self: Arc<Self>) {
        loop {
            let ids: Vec<TournamentId> = {
                let tournaments = self.tournaments.read().await;
                tournaments
                    .iter()
                    .filter(|(_, s)| matches!(s.status, TournamentStatus::Running | TournamentStatus::FinalTable))
                    .map(|(id, _)| *id)
                    .collect()
            };
            for tournament_id in ids {
                self.check_and_balance(tournament_id).await;
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    async fn check_and_balance(&self, tournament_id: TournamentId) {
        let plan = {
            let tournaments = self.tournaments.read().await;
            match tournaments.get(&tournament_id) {
                Some(state) => self.balancer.compute_plan(state),
                None => return,
            }
        };

        for mv in &plan.moves {
            let hand_in_progress = {
                let tournaments = self.tournaments.read().await;
                tournaments.get(&tournament_id).and_then(|s| s.tables.get(&mv.from_table)).map(|t| t.hand_in_progress)
            };
            if hand_in_progress == Some(false) {
                self.execute_player_move(tournament_id, mv).await;
            }
        }
    }

    async fn execute_player_move(&self, tournament_id: TournamentId, mv: &crate::balancer::PlayerMove) {
        let mut lock_mgr = self.locks.clone();
        let keys = vec![LockKey::table(mv.from_table), LockKey::table(mv.to_table), LockKey::player(mv.user_id)];
        let Ok(held) = lock_mgr.acquire_many(keys, Duration::from_secs(5)).await else { return };

        {
            let mut tournaments = self.tournaments.write().await;
            if let Some(state) = tournaments.get_mut(&tournament_id) {
                if let Some(from) = state.tables.get_mut(&mv.from_table) {
                    from.remove_player(mv.user_id);
                }
                if let Some(to) = state.tables.get_mut(&mv.to_table) {
                    to.seat_player(mv.user_id, mv.to_seat);
                }
                if let Some(player) = state.players.get_mut(&mv.user_id) {
                    player.table_id = Some(mv.to_table);
                    player.seat_position = Some(mv.to_seat);
                }
            }
        }

        let _ = lock_mgr.release_many(held).await;

        self.events
            .publish(TournamentEvent {
                tournament_id,
                event_type: TournamentEventType::PlayerMoved,
                table_id: Some(mv.to_table),
                user_id: Some(mv.user_id),
            })
            .await;
    }

    pub async fn get_state(&self, tournament_id: TournamentId) -> Option<TournamentState> {
        self.tournaments.read().await.get(&tournament_id).cloned()
    }

    /// Restores a tournament from its last snapshot and, if it was mid-play,
    /// schedules a delayed hand restart at every table that wasn't mid-hand.
    pub async fn recover_tournament(self: &Arc<Self>, tournament_id: TournamentId) -> Result<Option<TournamentState>, EngineError> {
        let state = match self.snapshot.load_latest(tournament_id).await {
            Ok(state) => state,
            Err(crate::snapshot::SnapshotError::NotFound) => return Ok(None),
            Err(err) => return Err(EngineError::from(err)),
        };

        self.ranking.sync_from_state(&state).await?;
        self.tournaments.write().await.insert(tournament_id, state.clone());

        log::info!(
            "recovered tournament {tournament_id}: status={:?}, tables={}",
            state.status,
            state.tables.len()
        );

        if matches!(state.status, TournamentStatus::Running | TournamentStatus::FinalTable | TournamentStatus::HeadsUp) {
            for (table_id, table) in &state.tables {
                if !table.hand_in_progress && table.player_count() >= 2 {
                    let this = Arc::clone(self);
                    let table_id = *table_id;
                    tokio::spawn(async move { this.delayed_table_hand_restart(tournament_id, table_id, Duration::from_secs(2)).await });
                }
            }
        }

        Ok(Some(state))
    }

    async fn delayed_table_hand_restart(&self, tournament_id: TournamentId, table_id: TableId, delay: Duration) {
        tokio::time::sleep(delay).await;
        let still_running = {
            let tournaments = self.tournaments.read().await;
            tournaments
                .get(&tournament_id)
                .map(|s| matches!(s.status, TournamentStatus::Running | TournamentStatus::FinalTable | TournamentStatus::HeadsUp))
                .unwrap_or(false)
        };
        if still_running {
            self.start_table_hand(tournament_id, table_id).await;
        }
    }
}

/// Shuffles players and deals them round-robin across freshly created
/// tables, keeping every table within one seat of every other.
fn create_tables_and_seat_players(state: &TournamentState) -> HashMap<TableId, TournamentTable> {
    let mut players: Vec<UserId> = state.players.keys().copied().collect();
    players.shuffle(&mut rand::rng());

    let max_per_table = state.config.players_per_table;
    let num_tables = players.len().div_ceil(max_per_table);

    let mut tables: Vec<TournamentTable> = (0..num_tables)
        .map(|i| TournamentTable::new(TableId::default(), i as u32 + 1, max_per_table))
        .collect();

    for (idx, user_id) in players.into_iter().enumerate() {
        let table = &mut tables[idx % num_tables];
        let seat = table.player_count();
        if seat < max_per_table {
            table.seat_player(user_id, seat);
        }
    }

    tables.into_iter().map(|t| (t.table_id, t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TournamentConfig;
    use std::time::Duration;

    #[test]
    fn seating_keeps_tables_within_one_player_of_each_other() {
        let mut state = TournamentState::new(
            TournamentId::default(),
            TournamentConfig {
                name: "t".into(),
                min_players: 2,
                max_players: 300,
                players_per_table: 9,
                buy_in: 100,
                starting_chips: 10_000,
                blind_levels: vec![],
                payout_structure: vec![1.0],
                itm_percentage: 15.0,
                shotgun_countdown: Duration::from_secs(10),
                final_table_size: 6,
            },
        );
        for _ in 0..25 {
            let uid = UserId::default();
            state.players.insert(uid, TournamentPlayer::new(uid, "p".into(), 10_000));
        }

        let tables = create_tables_and_seat_players(&state);
        assert_eq!(tables.len(), 3);
        let counts: Vec<usize> = tables.values().map(|t| t.player_count()).collect();
        assert_eq!(counts.iter().sum::<usize>(), 25);
        assert!(*counts.iter().max().unwrap() - *counts.iter().min().unwrap() <= 1);
    }
}
