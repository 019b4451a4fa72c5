//! Blind-level scheduling with drift-corrected timing: each registered
//! tournament gets its own background task that sleeps precisely until the
//! next warning or level-up, broadcasting through a caller-supplied
//! [`BlindBroadcaster`] and persisting recoverable state to Redis.
use crate::models::BlindLevel;
use crate::models::TournamentEventType;
use rbp_core::TournamentId;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;
use tokio::task::JoinHandle;

const SCHEDULER_STATE_PREFIX: &str = "tournament:scheduler:";
const WARNING_SECONDS: [u64; 3] = [30, 10, 5];
const MAX_DRIFT_CORRECTIONS: u32 = 100;

/// Sleeps until `target`, tapering the sleep duration as the deadline nears
/// so the wakeup lands within a few milliseconds regardless of scheduler load.
pub async fn sleep_until_precise(target: Instant) {
    let mut corrections = 0;
    loop {
        if corrections >= MAX_DRIFT_CORRECTIONS {
            break;
        }
        let now = Instant::now();
        if now >= target {
            break;
        }
        let remaining = target - now;
        if remaining > Duration::from_millis(100) {
            tokio::time::sleep(remaining.mul_f64(0.9)).await;
        } else if remaining > Duration::from_millis(10) {
            tokio::time::sleep(remaining.mul_f64(0.5)).await;
        } else {
            tokio::task::yield_now().await;
        }
        corrections += 1;
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub tournament_id: TournamentId,
    pub event_type: TournamentEventType,
}

#[async_trait::async_trait]
pub trait BlindBroadcaster: Send + Sync {
    async fn broadcast(&self, event: ScheduledEvent);
}

#[derive(Debug, Clone)]
struct BlindSchedule {
    levels: Vec<BlindLevel>,
    current_level: u32,
    level_started_at: Instant,
    paused_at: Option<Instant>,
    accumulated_pause: Duration,
}

impl BlindSchedule {
    fn current_blind(&self) -> Option<BlindLevel> {
        self.levels.iter().copied().find(|l| l.level == self.current_level)
    }

    fn next_blind(&self) -> Option<BlindLevel> {
        self.levels.iter().copied().find(|l| l.level == self.current_level + 1)
    }

    fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    fn elapsed(&self) -> Duration {
        let reference = self.paused_at.unwrap_or_else(Instant::now);
        reference.saturating_duration_since(self.level_started_at).saturating_sub(self.accumulated_pause)
    }

    fn remaining(&self) -> Duration {
        match self.current_blind() {
            Some(level) => level.duration.saturating_sub(self.elapsed()),
            None => Duration::MAX,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    current_level: u32,
    elapsed_seconds: f64,
    levels: Vec<BlindLevel>,
}

struct Inner {
    schedules: Mutex<HashMap<TournamentId, BlindSchedule>>,
    warnings_sent: Mutex<HashMap<TournamentId, HashSet<u64>>>,
    tasks: Mutex<HashMap<TournamentId, JoinHandle<()>>>,
}

/// Drives one independent timer loop per tournament. Cloning is cheap — all
/// state lives behind the shared `Arc<Inner>`.
#[derive(Clone)]
pub struct BlindScheduler<B: BlindBroadcaster + 'static> {
    conn: ConnectionManager,
    broadcaster: Arc<B>,
    inner: Arc<Inner>,
}

impl<B: BlindBroadcaster + 'static> BlindScheduler<B> {
    pub fn new(conn: ConnectionManager, broadcaster: B) -> Self {
        Self {
            conn,
            broadcaster: Arc::new(broadcaster),
            inner: Arc::new(Inner {
                schedules: Mutex::new(HashMap::new()),
                warnings_sent: Mutex::new(HashMap::new()),
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub async fn register_tournament(
        &self,
        tournament_id: TournamentId,
        levels: Vec<BlindLevel>,
        start_level: u32,
        elapsed: Duration,
    ) {
        self.unregister_tournament(tournament_id).await;

        let schedule = BlindSchedule {
            levels,
            current_level: start_level,
            level_started_at: Instant::now() - elapsed,
            paused_at: None,
            accumulated_pause: Duration::ZERO,
        };
        self.inner.schedules.lock().unwrap().insert(tournament_id, schedule.clone());
        self.inner.warnings_sent.lock().unwrap().insert(tournament_id, HashSet::new());
        self.save_schedule_state(tournament_id, &schedule).await;

        let this = self.clone();
        let handle = tokio::spawn(async move { this.scheduler_loop(tournament_id).await });
        self.inner.tasks.lock().unwrap().insert(tournament_id, handle);
    }

    pub async fn unregister_tournament(&self, tournament_id: TournamentId) -> bool {
        let task = self.inner.tasks.lock().unwrap().remove(&tournament_id);
        if let Some(task) = task {
            task.abort();
        }
        let existed = self.inner.schedules.lock().unwrap().remove(&tournament_id).is_some();
        self.inner.warnings_sent.lock().unwrap().remove(&tournament_id);
        if existed {
            let mut conn = self.conn.clone();
            let _: redis::RedisResult<()> = conn.del(format!("{SCHEDULER_STATE_PREFIX}{tournament_id}")).await;
        }
        existed
    }

    pub fn pause_tournament(&self, tournament_id: TournamentId) -> bool {
        let mut schedules = self.inner.schedules.lock().unwrap();
        let Some(schedule) = schedules.get_mut(&tournament_id) else { return false };
        if schedule.is_paused() {
            return false;
        }
        schedule.paused_at = Some(Instant::now());
        true
    }

    pub fn resume_tournament(&self, tournament_id: TournamentId) -> bool {
        let mut schedules = self.inner.schedules.lock().unwrap();
        let Some(schedule) = schedules.get_mut(&tournament_id) else { return false };
        let Some(paused_at) = schedule.paused_at.take() else { return false };
        schedule.accumulated_pause += paused_at.elapsed();
        true
    }

    pub fn current_blind(&self, tournament_id: TournamentId) -> Option<BlindLevel> {
        self.inner.schedules.lock().unwrap().get(&tournament_id)?.current_blind()
    }

    pub fn next_level_at(&self, tournament_id: TournamentId) -> Option<Instant> {
        let schedules = self.inner.schedules.lock().unwrap();
        let schedule = schedules.get(&tournament_id)?;
        Some(Instant::now() + schedule.remaining())
    }

    async fn scheduler_loop(&self, tournament_id: TournamentId) {
        loop {
            let snapshot = match self.inner.schedules.lock().unwrap().get(&tournament_id) {
                Some(s) => s.clone(),
                None => return,
            };
            if snapshot.is_paused() {
                tokio::time::sleep(Duration::from_millis(500)).await;
                continue;
            }

            let remaining = snapshot.remaining();
            if remaining.is_zero() {
                self.level_up(tournament_id).await;
                continue;
            }

            self.check_and_send_warnings(tournament_id, remaining).await;
            let wait = self.next_event_wait(tournament_id, remaining);
            if wait > Duration::ZERO {
                sleep_until_precise(Instant::now() + wait).await;
            } else {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }

    fn next_event_wait(&self, tournament_id: TournamentId, remaining: Duration) -> Duration {
        let sent = self.inner.warnings_sent.lock().unwrap();
        let sent = sent.get(&tournament_id).cloned().unwrap_or_default();
        let mut sorted = WARNING_SECONDS;
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        for warning_sec in sorted {
            let warning_duration = Duration::from_secs(warning_sec);
            if !sent.contains(&warning_sec) && remaining > warning_duration {
                return remaining - warning_duration;
            }
        }
        remaining
    }

    async fn check_and_send_warnings(&self, tournament_id: TournamentId, remaining: Duration) {
        for warning_sec in WARNING_SECONDS {
            let warning_duration = Duration::from_secs(warning_sec);
            let already_sent = self
                .inner
                .warnings_sent
                .lock()
                .unwrap()
                .get(&tournament_id)
                .is_some_and(|s| s.contains(&warning_sec));
            if !already_sent && remaining <= warning_duration {
                self.broadcaster
                    .broadcast(ScheduledEvent {
                        tournament_id,
                        event_type: TournamentEventType::BlindIncreaseWarning {
                            seconds_remaining: warning_sec,
                        },
                    })
                    .await;
                self.inner
                    .warnings_sent
                    .lock()
                    .unwrap()
                    .entry(tournament_id)
                    .or_default()
                    .insert(warning_sec);
            }
        }
    }

    async fn level_up(&self, tournament_id: TournamentId) {
        let next = {
            let mut schedules = self.inner.schedules.lock().unwrap();
            let Some(schedule) = schedules.get_mut(&tournament_id) else { return };
            let Some(next_blind) = schedule.next_blind() else {
                log::info!("tournament {tournament_id} reached its final blind level");
                return;
            };
            schedule.current_level = next_blind.level;
            schedule.level_started_at = Instant::now();
            schedule.accumulated_pause = Duration::ZERO;
            next_blind
        };
        self.inner.warnings_sent.lock().unwrap().insert(tournament_id, HashSet::new());

        if let Some(schedule) = self.inner.schedules.lock().unwrap().get(&tournament_id) {
            self.save_schedule_state(tournament_id, schedule).await;
        }

        let next_level_at_ms = std::time::SystemTime::now()
            .checked_add(next.duration)
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.broadcaster
            .broadcast(ScheduledEvent {
                tournament_id,
                event_type: TournamentEventType::BlindLevelChanged {
                    level: next.level,
                    next_level_at_ms,
                },
            })
            .await;
    }

    async fn save_schedule_state(&self, tournament_id: TournamentId, schedule: &BlindSchedule) {
        let state = PersistedState {
            current_level: schedule.current_level,
            elapsed_seconds: schedule.elapsed().as_secs_f64(),
            levels: schedule.levels.clone(),
        };
        let Ok(json) = serde_json::to_string(&state) else { return };
        let mut conn = self.conn.clone();
        let key = format!("{SCHEDULER_STATE_PREFIX}{tournament_id}");
        let _: redis::RedisResult<()> = conn.set_ex(&key, json, 86400 * 7).await;
    }

    /// Restores a tournament's schedule from its last persisted state,
    /// recomputing `level_started_at` from the recorded elapsed time.
    pub async fn recover(&self, tournament_id: TournamentId) -> redis::RedisResult<bool> {
        let mut conn = self.conn.clone();
        let key = format!("{SCHEDULER_STATE_PREFIX}{tournament_id}");
        let raw: Option<String> = conn.get(&key).await?;
        let Some(raw) = raw else { return Ok(false) };
        let Ok(state) = serde_json::from_str::<PersistedState>(&raw) else { return Ok(false) };

        self.register_tournament(
            tournament_id,
            state.levels,
            state.current_level,
            Duration::from_secs_f64(state.elapsed_seconds),
        )
        .await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(n: u32, duration_secs: u64) -> BlindLevel {
        BlindLevel {
            level: n,
            small_blind: n as i64 * 10,
            big_blind: n as i64 * 20,
            ante: 0,
            duration: Duration::from_secs(duration_secs),
        }
    }

    #[test]
    fn schedule_computes_remaining_time() {
        let schedule = BlindSchedule {
            levels: vec![level(1, 600)],
            current_level: 1,
            level_started_at: Instant::now() - Duration::from_secs(100),
            paused_at: None,
            accumulated_pause: Duration::ZERO,
        };
        let remaining = schedule.remaining();
        assert!(remaining <= Duration::from_secs(500) && remaining > Duration::from_secs(495));
    }

    #[test]
    fn paused_schedule_does_not_advance() {
        let mut schedule = BlindSchedule {
            levels: vec![level(1, 600)],
            current_level: 1,
            level_started_at: Instant::now() - Duration::from_secs(100),
            paused_at: None,
            accumulated_pause: Duration::ZERO,
        };
        schedule.paused_at = Some(Instant::now());
        let at_pause = schedule.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(schedule.elapsed(), at_pause);
    }

    #[tokio::test]
    async fn sleep_until_precise_returns_near_target() {
        let target = Instant::now() + Duration::from_millis(20);
        sleep_until_precise(target).await;
        assert!(Instant::now() >= target);
    }
}
