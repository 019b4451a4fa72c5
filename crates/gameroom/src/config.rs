use std::time::Duration;

/// Tuning for the per-table game loop (§4.D).
#[derive(Debug, Clone)]
pub struct GameLoopConfig {
    /// Pause after a hand starts / a street turns, before the next actor
    /// is prompted, so clients can render the deal/board before acting.
    pub phase_transition_delay: Duration,
    /// How long a completed hand's result stays on screen before the next
    /// hand is scheduled.
    pub hand_result_display: Duration,
    /// Hard cap on `ProcessBotTurns` iterations per invocation, so a stuck
    /// table can never spin the loop forever.
    pub max_bot_turn_iterations: usize,
    /// Retries when the engine reports no current actor (mid-transition).
    pub actor_retry_attempts: usize,
    pub actor_retry_backoff: Duration,
    /// Retries when `available_actions` comes back empty for the actor.
    pub available_actions_retry_attempts: usize,
    /// Triangular "thinking time" distribution for bot decisions.
    pub thinking_min: Duration,
    pub thinking_mode: Duration,
    pub thinking_max: Duration,
    /// Chance of an additional pause layered on top of the thinking delay.
    pub thinking_pause_chance: f64,
    pub thinking_pause_min: Duration,
    pub thinking_pause_max: Duration,
    /// Time-bank per decision before a human player is auto-folded/checked.
    pub turn_timeout: Duration,
    /// Messages retained per chat channel, replayed to a fresh subscriber.
    pub chat_buffer_size: usize,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self {
            phase_transition_delay: Duration::from_millis(800),
            hand_result_display: Duration::from_secs(3),
            max_bot_turn_iterations: 50,
            actor_retry_attempts: 5,
            actor_retry_backoff: Duration::from_millis(300),
            available_actions_retry_attempts: 3,
            thinking_min: Duration::from_secs_f64(1.0),
            thinking_mode: Duration::from_secs_f64(2.0),
            thinking_max: Duration::from_secs_f64(3.0),
            thinking_pause_chance: 0.20,
            thinking_pause_min: Duration::from_secs(1),
            thinking_pause_max: Duration::from_secs(2),
            turn_timeout: Duration::from_secs(20),
            chat_buffer_size: 50,
        }
    }
}

/// Tuning for the bot orchestrator's control loop (§4.E).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub control_interval: Duration,
    pub target_bot_count: usize,
    pub max_spawns_per_minute: usize,
    pub max_retires_per_minute: usize,
    pub rest_duration: Duration,
    /// A bot whose stack falls below this fraction of the starting buy-in
    /// is marked to leave (or rebuy, if the table allows it) at hand end.
    pub low_stack_fraction: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            control_interval: Duration::from_secs(3),
            target_bot_count: 0,
            max_spawns_per_minute: 10,
            max_retires_per_minute: 10,
            rest_duration: Duration::from_secs(60),
            low_stack_fraction: 0.2,
        }
    }
}
