//! Bot orchestrator (§4.E): keeps a configurable number of autonomous
//! sessions occupying seats across whatever tables the caller's
//! [`TableMatcher`] points it at, rate-limited so a busy lobby doesn't
//! spawn or retire a hundred bots in one tick.
use crate::player::Strategy;
use crate::players::LiveBot;
use crate::OrchestratorConfig;
use rbp_core::Chips;
use rbp_core::Position;
use rbp_core::TableId;
use rbp_core::UserId;
use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Idle,
    Joining,
    Playing,
    /// Cooling off between sessions; wakes once `Instant` passes.
    Resting,
    Leaving,
}

pub struct BotSession {
    pub state: BotState,
    pub table_id: Option<TableId>,
    pub seat: Option<Position>,
    pub rest_until: Option<Instant>,
    pub retire_after_hand: bool,
}

impl BotSession {
    fn idle() -> Self {
        Self { state: BotState::Idle, table_id: None, seat: None, rest_until: None, retire_after_hand: false }
    }
}

/// Finds an open seat for a freshly-spawned bot. Which table and which
/// seat is deliberately out of scope here (§4.E) — the caller (the
/// server binary, with visibility into lobby occupancy and stakes) owns
/// that policy.
#[async_trait::async_trait]
pub trait TableMatcher: Send + Sync {
    async fn find_seat(&self) -> Option<(TableId, Position, Chips)>;
}

/// The subset of game-loop operations the orchestrator needs to actually
/// seat, remove, and kick off hands for the bots it manages.
#[async_trait::async_trait]
pub trait BotTableOps: Send + Sync {
    async fn seat_bot(&self, table_id: TableId, seat: Position, user_id: UserId, stack: Chips, strategy: Box<dyn Strategy>) -> bool;
    async fn remove_bot(&self, table_id: TableId, seat: Position);
    async fn try_start_game(&self, table_id: TableId);
    /// Seats whose tables are idle (no hand in progress) — a retiring
    /// PLAYING bot must wait for its table to reach this state first.
    async fn is_table_idle(&self, table_id: TableId) -> bool;
}

pub struct BotOrchestrator<M: TableMatcher, O: BotTableOps> {
    matcher: M,
    ops: O,
    config: OrchestratorConfig,
    sessions: RwLock<HashMap<UserId, BotSession>>,
    spawns_this_minute: std::sync::atomic::AtomicUsize,
    retires_this_minute: std::sync::atomic::AtomicUsize,
    minute_started: std::sync::Mutex<Instant>,
}

impl<M: TableMatcher, O: BotTableOps> BotOrchestrator<M, O> {
    pub fn new(matcher: M, ops: O, config: OrchestratorConfig) -> Self {
        Self {
            matcher,
            ops,
            config,
            sessions: RwLock::new(HashMap::new()),
            spawns_this_minute: std::sync::atomic::AtomicUsize::new(0),
            retires_this_minute: std::sync::atomic::AtomicUsize::new(0),
            minute_started: std::sync::Mutex::new(Instant::now()),
        }
    }

    pub async fn bot_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn reset_minute_counters_if_elapsed(&self) {
        let mut started = self.minute_started.lock().unwrap();
        if started.elapsed() >= Duration::from_secs(60) {
            self.spawns_this_minute.store(0, std::sync::atomic::Ordering::Relaxed);
            self.retires_this_minute.store(0, std::sync::atomic::Ordering::Relaxed);
            *started = Instant::now();
        }
    }

    /// Runs one pass of the control loop: wake rested bots, clean up
    /// retire-requested bots whose tables are idle, then spawn or retire
    /// toward `target_bot_count` within this minute's rate limits.
    pub async fn tick(&self) {
        self.reset_minute_counters_if_elapsed();
        self.wake_rested_bots().await;
        self.cleanup_retiring_bots().await;

        let count = self.bot_count().await;
        let target = self.config.target_bot_count;
        if count < target {
            let spawned = self.spawns_this_minute.load(std::sync::atomic::Ordering::Relaxed);
            let budget = self.config.max_spawns_per_minute.saturating_sub(spawned);
            let to_spawn = (target - count).min(budget);
            for _ in 0..to_spawn {
                if self.spawn_bot().await.is_some() {
                    self.spawns_this_minute.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
            }
        } else if count > target {
            let retired = self.retires_this_minute.load(std::sync::atomic::Ordering::Relaxed);
            let budget = self.config.max_retires_per_minute.saturating_sub(retired);
            let to_retire = (count - target).min(budget);
            for _ in 0..to_retire {
                if self.retire_one().await {
                    self.retires_this_minute.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
            }
        }
    }

    /// Wakes each `Resting` bot past its deadline: reactivates it into a
    /// fresh seat if the lobby still needs it, otherwise retires it.
    async fn wake_rested_bots(&self) {
        let now = Instant::now();
        let rested: Vec<UserId> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, s)| s.state == BotState::Resting && s.rest_until.is_some_and(|d| now >= d))
                .map(|(&id, _)| id)
                .collect()
        };
        for user_id in rested {
            let old_seat = {
                let mut sessions = self.sessions.write().await;
                sessions.get_mut(&user_id).and_then(|s| {
                    let seat = s.table_id.zip(s.seat);
                    s.table_id = None;
                    s.seat = None;
                    seat
                })
            };
            if let Some((table_id, seat)) = old_seat {
                self.ops.remove_bot(table_id, seat).await;
            }

            let still_needed = self.bot_count().await <= self.config.target_bot_count;
            let reseated = still_needed
                && match self.matcher.find_seat().await {
                    Some((table_id, seat, stack)) => {
                        if self.ops.seat_bot(table_id, seat, user_id, stack, Box::new(LiveBot)).await {
                            let mut sessions = self.sessions.write().await;
                            if let Some(session) = sessions.get_mut(&user_id) {
                                session.state = BotState::Playing;
                                session.table_id = Some(table_id);
                                session.seat = Some(seat);
                                session.rest_until = None;
                            }
                            drop(sessions);
                            self.ops.try_start_game(table_id).await;
                            true
                        } else {
                            false
                        }
                    }
                    None => false,
                };
            if !reseated {
                self.retire_bot(user_id).await;
            }
        }
    }

    async fn cleanup_retiring_bots(&self) {
        let candidates: Vec<UserId> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, s)| s.state == BotState::Playing && s.retire_after_hand)
                .filter_map(|(&id, s)| s.table_id.map(|_| id))
                .collect()
        };
        for user_id in candidates {
            let table_id = { self.sessions.read().await.get(&user_id).and_then(|s| s.table_id) };
            let Some(table_id) = table_id else { continue };
            if !self.ops.is_table_idle(table_id).await {
                continue;
            }
            self.retire_bot(user_id).await;
        }
    }

    /// `SpawnBot`: finds a seat via the matcher, seats a fresh
    /// random-strategy ([`LiveBot`]) session, and kicks the table's loop.
    pub async fn spawn_bot(&self) -> Option<UserId> {
        let (table_id, seat, stack) = self.matcher.find_seat().await?;
        let user_id = UserId::default();
        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(user_id, BotSession { state: BotState::Joining, ..BotSession::idle() });
        }
        let seated = self.ops.seat_bot(table_id, seat, user_id, stack, Box::new(LiveBot)).await;
        if !seated {
            self.sessions.write().await.remove(&user_id);
            return None;
        }
        {
            let mut sessions = self.sessions.write().await;
            if let Some(session) = sessions.get_mut(&user_id) {
                session.state = BotState::Playing;
                session.table_id = Some(table_id);
                session.seat = Some(seat);
            }
        }
        self.ops.try_start_game(table_id).await;
        log::info!("[orchestrator] spawned bot {user_id} at {table_id} seat {seat}");
        Some(user_id)
    }

    /// `RetireBot`: pulls a bot out of its seat immediately and drops its
    /// session back to idle, free to be reused by a future spawn.
    pub async fn retire_bot(&self, user_id: UserId) {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(&user_id)
        };
        if let Some(session) = removed {
            if let (Some(table_id), Some(seat)) = (session.table_id, session.seat) {
                self.ops.remove_bot(table_id, seat).await;
            }
        }
        log::info!("[orchestrator] retired bot {user_id}");
    }

    async fn retire_one(&self) -> bool {
        let candidate = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, s)| s.state == BotState::Resting)
                .map(|(&id, _)| id)
                .next()
                .or_else(|| sessions.iter().filter(|(_, s)| s.state == BotState::Idle).map(|(&id, _)| id).next())
        };
        if let Some(user_id) = candidate {
            self.retire_bot(user_id).await;
            return true;
        }
        let marked = {
            let mut sessions = self.sessions.write().await;
            sessions
                .iter_mut()
                .find(|(_, s)| s.state == BotState::Playing && !s.retire_after_hand)
                .map(|(&id, s)| {
                    s.retire_after_hand = true;
                    id
                })
        };
        marked.is_some()
    }

    /// `NotifyHandComplete`: the session may choose to leave (low stack,
    /// no rebuy available) or rest a while before rejoining.
    pub async fn notify_hand_complete(&self, user_id: UserId, new_stack: Chips, starting_stack: Chips) {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&user_id) else { return };
        if session.retire_after_hand {
            return;
        }
        let low_stack = (new_stack as f64) < (starting_stack as f64) * self.config.low_stack_fraction;
        if low_stack {
            session.retire_after_hand = true;
        } else if rand::random::<f64>() < 0.05 {
            session.state = BotState::Resting;
            session.rest_until = Some(Instant::now() + self.config.rest_duration);
        }
    }

    /// `ForceRemoveAllBots`: the admin kill switch. Evicts every session
    /// and sets the target to zero so the control loop doesn't respawn.
    pub async fn force_remove_all(&mut self) {
        self.config.target_bot_count = 0;
        let ids: Vec<UserId> = self.sessions.read().await.keys().copied().collect();
        for user_id in ids {
            self.retire_bot(user_id).await;
        }
    }

    pub fn set_target(&mut self, target: usize) {
        self.config.target_bot_count = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    struct FixedMatcher(TableId, Position, Chips);
    #[async_trait::async_trait]
    impl TableMatcher for FixedMatcher {
        async fn find_seat(&self) -> Option<(TableId, Position, Chips)> {
            Some((self.0, self.1, self.2))
        }
    }

    struct CountingOps {
        seated: Arc<AtomicUsize>,
        removed: Arc<AtomicUsize>,
    }
    #[async_trait::async_trait]
    impl BotTableOps for CountingOps {
        async fn seat_bot(&self, _: TableId, _: Position, _: UserId, _: Chips, _: Box<dyn Strategy>) -> bool {
            self.seated.fetch_add(1, Ordering::Relaxed);
            true
        }
        async fn remove_bot(&self, _: TableId, _: Position) {
            self.removed.fetch_add(1, Ordering::Relaxed);
        }
        async fn try_start_game(&self, _: TableId) {}
        async fn is_table_idle(&self, _: TableId) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn tick_spawns_up_to_target() {
        let seated = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));
        let ops = CountingOps { seated: seated.clone(), removed: removed.clone() };
        let matcher = FixedMatcher(TableId::default(), 0, 10_000);
        let config = OrchestratorConfig { target_bot_count: 3, max_spawns_per_minute: 10, ..OrchestratorConfig::default() };
        let orchestrator = BotOrchestrator::new(matcher, ops, config);
        orchestrator.tick().await;
        assert_eq!(orchestrator.bot_count().await, 3);
        assert_eq!(seated.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn tick_respects_spawn_rate_limit() {
        let seated = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));
        let ops = CountingOps { seated, removed };
        let matcher = FixedMatcher(TableId::default(), 0, 10_000);
        let config = OrchestratorConfig { target_bot_count: 10, max_spawns_per_minute: 2, ..OrchestratorConfig::default() };
        let orchestrator = BotOrchestrator::new(matcher, ops, config);
        orchestrator.tick().await;
        assert_eq!(orchestrator.bot_count().await, 2);
    }
}
