//! Per-table game loop supervisor (§4.D): `TryStartGame` deals a new hand
//! when enough seats are active, `ProcessBotTurns` drives the hand forward
//! through every bot-controlled seat and stops the moment a human is on
//! the clock, handing control back to whatever WebSocket handler will
//! forward that human's decision back into [`GameLoop::apply_action`].
use crate::chat::ChatLog;
use crate::message::HandResultView;
use crate::message::ServerMessage;
use crate::message::TableSnapshot;
use crate::player::Strategy;
use crate::timer::Timer;
use crate::timer::TimerConfig;
use crate::waitlist::Waitlist;
use crate::GameLoopConfig;
use rbp_core::Chips;
use rbp_core::Position;
use rbp_core::TableId;
use rbp_core::UserId;
use rbp_engine::Action;
use rbp_engine::AvailableActions;
use rbp_engine::Outcome;
use rbp_engine::Phase;
use rbp_engine::Table;
use rbp_engine::TableError;
use rbp_integrity::ChipIntegrityService;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex as SyncMutex;
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::RwLock;
use tokio::time::sleep;

/// A table plus the bot-orchestration and chat/waitlist state that rides
/// along with it — everything the game loop needs that `rbp_engine::Table`
/// deliberately doesn't track.
pub struct GameTable {
    pub table: Table,
    pub bots: HashMap<Position, Box<dyn Strategy>>,
    pub waitlist: Waitlist,
    pub chat: ChatLog,
    pub timer: Timer,
}

impl GameTable {
    pub fn new(table: Table, chat_buffer_size: usize, turn_timeout: std::time::Duration) -> Self {
        let timer_config = TimerConfig { decision: turn_timeout, ..TimerConfig::default() };
        Self {
            table,
            bots: HashMap::new(),
            waitlist: Waitlist::new(),
            chat: ChatLog::new(chat_buffer_size),
            timer: Timer::new(timer_config),
        }
    }
}

/// Per-seat chip stacks in seat order, empty seats counted as zero — the
/// shape [`rbp_integrity::ChipIntegrityService`] seals and reconciles.
fn stacks_by_seat(table: &Table) -> Vec<Chips> {
    table.seats().iter().map(|s| s.occupant().map(|o| o.stack()).unwrap_or(0)).collect()
}

/// Destination for everything the game loop broadcasts. The gateway crate
/// is the real implementation; this seam keeps `rbp-gameroom` ignorant of
/// WebSocket connections entirely.
#[async_trait::async_trait]
pub trait TableBroadcaster: Send + Sync {
    async fn broadcast(&self, table_id: TableId, message: ServerMessage);
    async fn send_to(&self, table_id: TableId, user_id: UserId, message: ServerMessage);
}

pub struct GameLoop<B: TableBroadcaster> {
    tables: RwLock<HashMap<TableId, GameTable>>,
    processing: SyncMutex<HashSet<TableId>>,
    broadcaster: B,
    config: GameLoopConfig,
    /// Seals each hand's starting chip distribution and reconciles it
    /// against the final stacks once the hand settles (§4.C). A mismatch
    /// is logged, never used to unwind or block the hand.
    integrity: TokioMutex<ChipIntegrityService>,
}

impl<B: TableBroadcaster> GameLoop<B> {
    pub fn new(broadcaster: B, config: GameLoopConfig, integrity_key: impl Into<Vec<u8>>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            processing: SyncMutex::new(HashSet::new()),
            broadcaster,
            config,
            integrity: TokioMutex::new(ChipIntegrityService::new(integrity_key)),
        }
    }

    pub async fn register_table(&self, table_id: TableId, table: Table) {
        let gt = GameTable::new(table, self.config.chat_buffer_size, self.config.turn_timeout);
        self.tables.write().await.insert(table_id, gt);
    }

    pub async fn seat_bot(
        &self,
        table_id: TableId,
        seat: Position,
        user_id: UserId,
        stack: Chips,
        strategy: Box<dyn Strategy>,
    ) -> Result<(), TableError> {
        let mut tables = self.tables.write().await;
        let gt = tables.get_mut(&table_id).ok_or(TableError::NotSeated)?;
        gt.table.seat_player(seat, user_id, stack)?;
        gt.table.sit_in(seat);
        gt.bots.insert(seat, strategy);
        Ok(())
    }

    pub async fn seat_human(
        &self,
        table_id: TableId,
        seat: Position,
        user_id: UserId,
        stack: Chips,
    ) -> Result<(), TableError> {
        let mut tables = self.tables.write().await;
        let gt = tables.get_mut(&table_id).ok_or(TableError::NotSeated)?;
        gt.table.seat_player(seat, user_id, stack)?;
        gt.table.sit_in(seat);
        Ok(())
    }

    pub async fn remove_bot(&self, table_id: TableId, seat: Position) {
        {
            let mut tables = self.tables.write().await;
            if let Some(gt) = tables.get_mut(&table_id) {
                gt.table.vacate(seat);
                gt.bots.remove(&seat);
            }
        }
        self.seat_next_waitlisted(table_id, seat).await;
    }

    /// Pops the next waitlisted player, if any, into a seat that just
    /// freed up at `table_id` and broadcasts the refreshed waitlist size
    /// plus a fresh snapshot. A no-op if nobody is waiting.
    async fn seat_next_waitlisted(&self, table_id: TableId, seat: Position) {
        let (user_id, stack, remaining) = {
            let mut tables = self.tables.write().await;
            let Some(gt) = tables.get_mut(&table_id) else { return };
            let Some(user_id) = gt.waitlist.pop_next() else { return };
            (user_id, gt.table.min_buyin(), gt.waitlist.len())
        };
        if self.seat_human(table_id, seat, user_id, stack).await.is_err() {
            // Seat turned out to be unusable (e.g. stack out of range);
            // the player stays off the table rather than being reinserted
            // at the back of the queue.
            return;
        }
        self.broadcaster
            .broadcast(table_id, ServerMessage::WaitlistUpdate { table_id, user_id, position: 0, size: remaining })
            .await;
        self.broadcast_personalized_snapshots(table_id).await;
    }

    /// Removes `user_id` from the table's waitlist, e.g. if they leave the
    /// lobby before a seat opens up.
    pub async fn leave_waitlist(&self, table_id: TableId, user_id: UserId) {
        let mut tables = self.tables.write().await;
        if let Some(gt) = tables.get_mut(&table_id) {
            gt.waitlist.leave(user_id);
        }
    }

    pub async fn rebuy(&self, table_id: TableId, seat: Position, amount: Chips) -> Result<(), TableError> {
        let mut tables = self.tables.write().await;
        let gt = tables.get_mut(&table_id).ok_or(TableError::NotSeated)?;
        gt.table.rebuy(seat, amount)
    }

    /// Seats currently occupied at `table_id`, for callers (e.g. a
    /// [`crate::TableMatcher`]) that need to find an open chair.
    pub async fn occupied_seats(&self, table_id: TableId) -> Option<HashSet<Position>> {
        let tables = self.tables.read().await;
        let gt = tables.get(&table_id)?;
        Some(gt.table.seats().iter().enumerate().filter(|(_, s)| !s.is_empty()).map(|(i, _)| i).collect())
    }

    /// Whether `table_id` has no hand in progress. A retiring bot must
    /// wait for this before its seat can be freed mid-session.
    pub async fn is_table_idle(&self, table_id: TableId) -> bool {
        let tables = self.tables.read().await;
        tables.get(&table_id).map(|gt| gt.table.phase() == Phase::Waiting).unwrap_or(true)
    }

    async fn snapshot_for(&self, table_id: TableId, recipient: Option<UserId>) -> Option<TableSnapshot> {
        let tables = self.tables.read().await;
        tables.get(&table_id).map(|gt| TableSnapshot::personalized(table_id, &gt.table, recipient))
    }

    async fn seated_user_ids(&self, table_id: TableId) -> Vec<UserId> {
        let tables = self.tables.read().await;
        tables
            .get(&table_id)
            .map(|gt| gt.table.seats().iter().filter_map(|s| s.occupant().map(|o| o.player())).collect())
            .unwrap_or_default()
    }

    async fn broadcast_personalized_snapshots(&self, table_id: TableId) {
        for user_id in self.seated_user_ids(table_id).await {
            if let Some(snapshot) = self.snapshot_for(table_id, Some(user_id)).await {
                self.broadcaster.send_to(table_id, user_id, ServerMessage::TableSnapshot(snapshot)).await;
            }
        }
    }

    /// Deals a new hand if the table is idle and has two or more active
    /// seats. Guarded against re-entrant calls for the same table: a
    /// caller firing `TryStartGame` twice in quick succession only ever
    /// starts one hand.
    pub async fn try_start_game(&self, table_id: TableId) {
        {
            let mut processing = self.processing.lock().unwrap();
            if processing.contains(&table_id) {
                return;
            }
            processing.insert(table_id);
        }

        let started = {
            let mut tables = self.tables.write().await;
            match tables.get_mut(&table_id) {
                Some(gt) if gt.table.can_start_hand() => {
                    let stacks_before = stacks_by_seat(&gt.table);
                    gt.table.start_new_hand().ok().map(|started| (started, stacks_before))
                }
                _ => None,
            }
        };

        let Some((started, stacks_before)) = started else {
            self.processing.lock().unwrap().remove(&table_id);
            return;
        };
        self.integrity.lock().await.capture_hand_start(table_id, started.hand_number, stacks_before);

        self.broadcaster
            .broadcast(table_id, ServerMessage::HandStarted {
                table_id,
                hand_number: started.hand_number,
                dealer: started.dealer,
            })
            .await;
        self.broadcast_personalized_snapshots(table_id).await;
        sleep(self.config.phase_transition_delay).await;

        self.processing.lock().unwrap().remove(&table_id);
        self.process_bot_turns(table_id).await;
    }

    /// (seat, user, is_bot) for the table's current actor, or `None` if no
    /// hand is in progress or the table vanished.
    async fn current_actor(&self, table_id: TableId) -> Option<(Position, UserId, bool)> {
        let tables = self.tables.read().await;
        let gt = tables.get(&table_id)?;
        let seat = gt.table.current_turn_seat()?;
        let user_id = gt.table.current_turn_user()?;
        Some((seat, user_id, gt.bots.contains_key(&seat)))
    }

    async fn available_actions(&self, table_id: TableId, user_id: UserId) -> Option<AvailableActions> {
        let tables = self.tables.read().await;
        tables.get(&table_id).map(|gt| gt.table.available_actions(user_id))
    }

    async fn thinking_delay(&self) {
        let min = self.config.thinking_min.as_secs_f64();
        let mode = self.config.thinking_mode.as_secs_f64();
        let max = self.config.thinking_max.as_secs_f64();
        let delay = triangular_sample(min, mode, max);
        sleep(std::time::Duration::from_secs_f64(delay)).await;
        if rand::random::<f64>() < self.config.thinking_pause_chance {
            let min = self.config.thinking_pause_min.as_secs_f64();
            let max = self.config.thinking_pause_max.as_secs_f64();
            let extra = min + rand::random::<f64>() * (max - min);
            sleep(std::time::Duration::from_secs_f64(extra)).await;
        }
    }

    fn decide(&self, tables: &HashMap<TableId, GameTable>, table_id: TableId, seat: Position, actions: &AvailableActions) -> Action {
        tables
            .get(&table_id)
            .and_then(|gt| gt.bots.get(&seat))
            .map(|strategy| strategy.decide(actions))
            .unwrap_or(Action::Fold)
    }

    async fn handle_hand_complete(&self, table_id: TableId, result: rbp_engine::HandResult) {
        let stacks_after = {
            let tables = self.tables.read().await;
            tables.get(&table_id).map(|gt| stacks_by_seat(&gt.table)).unwrap_or_default()
        };
        match self.integrity.lock().await.validate_hand_completion(table_id, &stacks_after, 0) {
            Ok(report) if !report.valid => {
                log::error!("chip conservation violation at {table_id}: {report:?}");
            }
            Ok(_) => {}
            Err(err) => log::warn!("chip integrity check skipped for {table_id}: {err}"),
        }
        let view = HandResultView::from_result(table_id, &result);
        self.broadcaster.broadcast(table_id, ServerMessage::HandResult(view)).await;
        let phase = self.phase_of(table_id).await;
        self.broadcaster
            .broadcast(table_id, ServerMessage::TableStateUpdate { table_id, phase, pot: 0 })
            .await;
        self.broadcast_personalized_snapshots(table_id).await;
        sleep(self.config.hand_result_display).await;
        Box::pin(self.try_start_game(table_id)).await;
    }

    async fn phase_of(&self, table_id: TableId) -> String {
        let tables = self.tables.read().await;
        match tables.get(&table_id).map(|gt| gt.table.phase()) {
            Some(Phase::Waiting) | None => "waiting",
            Some(Phase::Preflop) => "preflop",
            Some(Phase::Flop) => "flop",
            Some(Phase::Turn) => "turn",
            Some(Phase::River) => "river",
        }
        .to_string()
    }

    /// Drives bot decisions forward until a human is on the clock, the
    /// hand completes, or `max_bot_turn_iterations` is hit (a stuck table
    /// never spins forever).
    pub async fn process_bot_turns(&self, table_id: TableId) {
        for _ in 0..self.config.max_bot_turn_iterations {
            let phase = { self.tables.read().await.get(&table_id).map(|gt| gt.table.phase()) };
            match phase {
                None | Some(Phase::Waiting) => return,
                _ => {}
            }

            let mut actor = self.current_actor(table_id).await;
            if actor.is_none() {
                for _ in 0..self.config.actor_retry_attempts {
                    sleep(self.config.actor_retry_backoff).await;
                    actor = self.current_actor(table_id).await;
                    if actor.is_some() {
                        break;
                    }
                }
            }
            let Some((seat, user_id, is_bot)) = actor else {
                log::warn!("no current actor at {table_id} after retries, abandoning this pass");
                return;
            };

            if !is_bot {
                if let Some(actions) = self.available_actions(table_id, user_id).await {
                    if let Some(gt) = self.tables.write().await.get_mut(&table_id) {
                        gt.timer.start_decision();
                    }
                    self.broadcaster
                        .broadcast(table_id, ServerMessage::TurnChanged { table_id, seat, player: user_id })
                        .await;
                    self.broadcaster
                        .send_to(table_id, user_id, ServerMessage::TurnPrompt {
                            table_id,
                            seat,
                            actions: actions.into(),
                            timeout_seconds: self.config.turn_timeout.as_secs(),
                        })
                        .await;
                }
                return;
            }

            self.thinking_delay().await;

            let mut actions = self.available_actions(table_id, user_id).await;
            for _ in 0..self.config.available_actions_retry_attempts {
                if actions.as_ref().is_some_and(|a| a.can_check || a.can_call || a.can_fold || a.can_raise) {
                    break;
                }
                sleep(self.config.actor_retry_backoff).await;
                actions = self.available_actions(table_id, user_id).await;
            }
            let Some(actions) = actions else { continue };

            let street_before = { self.tables.read().await.get(&table_id).map(|gt| gt.table.phase()) };

            let decision = {
                let tables = self.tables.read().await;
                self.decide(&tables, table_id, seat, &actions)
            };

            let outcome = {
                let mut tables = self.tables.write().await;
                match tables.get_mut(&table_id) {
                    Some(gt) => gt.table.process_action(user_id, decision),
                    None => return,
                }
            };

            match outcome {
                Ok(Outcome::HandComplete(result)) => {
                    self.handle_hand_complete(table_id, result).await;
                    return;
                }
                Ok(Outcome::Continue) => {
                    let street_after = { self.tables.read().await.get(&table_id).map(|gt| gt.table.phase()) };
                    if street_after != street_before {
                        let board = {
                            self.tables
                                .read()
                                .await
                                .get(&table_id)
                                .and_then(|gt| gt.table.board().map(|b| b.to_string()))
                                .unwrap_or_default()
                        };
                        self.broadcaster
                            .broadcast(table_id, ServerMessage::CommunityCards {
                                table_id,
                                phase: self.phase_of(table_id).await,
                                board,
                            })
                            .await;
                        sleep(self.config.phase_transition_delay).await;
                    }
                    continue;
                }
                Err(TableError::NotYourTurn) => continue,
                Err(err) => {
                    log::warn!("process_bot_turns: {table_id} seat {seat}: {err}");
                    return;
                }
            }
        }
        log::warn!("process_bot_turns hit its iteration cap for {table_id}");
    }

    /// Applies a human's decision (already decoded and validated by the
    /// caller) and continues the loop from there.
    pub async fn apply_action(&self, table_id: TableId, user_id: UserId, action: Action) -> Result<(), TableError> {
        let outcome = {
            let mut tables = self.tables.write().await;
            let gt = tables.get_mut(&table_id).ok_or(TableError::NotSeated)?;
            let outcome = gt.table.process_action(user_id, action)?;
            gt.timer.clear();
            outcome
        };
        match outcome {
            Outcome::HandComplete(result) => self.handle_hand_complete(table_id, result).await,
            Outcome::Continue => self.process_bot_turns(table_id).await,
        }
        Ok(())
    }

    /// Auto-folds (or checks, if free) any table whose human decision
    /// timer has expired. Intended to be polled on a short interval by the
    /// caller's own ticker — this crate never spawns its own background
    /// tasks so the server binary stays in control of task lifetimes.
    pub async fn expire_timed_out_turns(&self) {
        let expired: Vec<(TableId, UserId)> = {
            let tables = self.tables.read().await;
            tables
                .iter()
                .filter(|(_, gt)| gt.timer.expired())
                .filter_map(|(&table_id, gt)| gt.table.current_turn_user().map(|u| (table_id, u)))
                .collect()
        };
        for (table_id, user_id) in expired {
            let Some(actions) = self.available_actions(table_id, user_id).await else { continue };
            let action = if actions.can_check { Action::Check } else { Action::Fold };
            log::info!("turn timer expired at {table_id}, auto-{action:?} for {user_id}");
            let _ = self.apply_action(table_id, user_id, action).await;
        }
    }

    pub async fn chat(&self, table_id: TableId, message: crate::chat::ChatMessage) {
        let view = ServerMessage::Chat {
            channel: format!("table:{table_id}"),
            user_id: message.user_id,
            nickname: message.nickname.clone(),
            body: message.body.clone(),
        };
        if let Some(gt) = self.tables.write().await.get_mut(&table_id) {
            gt.chat.push(message);
        }
        self.broadcaster.broadcast(table_id, view).await;
    }

    pub async fn join_waitlist(&self, table_id: TableId, user_id: UserId) -> Option<usize> {
        let mut tables = self.tables.write().await;
        let gt = tables.get_mut(&table_id)?;
        let position = gt.waitlist.join(user_id);
        let size = gt.waitlist.len();
        drop(tables);
        self.broadcaster
            .broadcast(table_id, ServerMessage::WaitlistUpdate { table_id, user_id, position, size })
            .await;
        Some(position)
    }
}

/// Samples a triangular distribution with the given min/mode/max via
/// inverse-transform sampling.
fn triangular_sample(min: f64, mode: f64, max: f64) -> f64 {
    let u: f64 = rand::random();
    let fc = (mode - min) / (max - min);
    if u < fc {
        min + (u * (max - min) * (mode - min)).sqrt()
    } else {
        max - ((1.0 - u) * (max - min) * (max - mode)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangular_sample_stays_in_range() {
        for _ in 0..1000 {
            let s = triangular_sample(1.0, 2.0, 3.0);
            assert!((1.0..=3.0).contains(&s));
        }
    }
}
