use crate::events::PlayerActionEvent;
use rbp_core::UserId;
use std::collections::HashMap;
use std::collections::VecDeque;

const BUFFER_SIZE: usize = 20;
const MIN_SAMPLE_SIZE: usize = 10;
const STD_DEV_THRESHOLD_MS: f64 = 50.0;
const MIN_RESPONSE_TIME_MS: u64 = 100;
const TIME_RANGE_THRESHOLD_MS: u64 = 200;
const EXCESSIVE_FOLD_RATIO: f64 = 0.85;
const NEVER_FOLD_RATIO: f64 = 0.02;
const EXCESSIVE_RAISE_RATIO: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct BotSuspicion {
    pub user_id: UserId,
    pub suspicion_score: u32,
    pub severity: Severity,
    pub reasons: Vec<&'static str>,
}

/// Per-user ring buffer of recent actions, scored for bot-like regularity
/// the instant the buffer fills. A human's reaction time and fold/raise mix
/// both vary; a scripted client tends not to.
pub struct BotDetector {
    buffers: HashMap<UserId, VecDeque<PlayerActionEvent>>,
}

impl BotDetector {
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
        }
    }

    /// Appends an action to the user's buffer. Once it reaches
    /// [`BUFFER_SIZE`], runs detection and clears the buffer to avoid
    /// re-flagging the same window of actions.
    pub fn record_action(&mut self, event: PlayerActionEvent) -> Option<BotSuspicion> {
        let buffer = self.buffers.entry(event.user_id).or_default();
        buffer.push_back(event.clone());
        if buffer.len() > BUFFER_SIZE {
            buffer.pop_front();
        }
        if buffer.len() < BUFFER_SIZE {
            return None;
        }
        let suspicion = Self::analyze(event.user_id, buffer);
        self.buffers.remove(&event.user_id);
        suspicion
    }

    fn analyze(user_id: UserId, buffer: &VecDeque<PlayerActionEvent>) -> Option<BotSuspicion> {
        let response_times: Vec<u64> = buffer.iter().map(|a| a.response_time_ms).collect();
        let mut reasons = Vec::new();
        let mut score = 0u32;

        if let Some(timing) = Self::analyze_timing(&response_times) {
            score += 50;
            reasons.extend(timing);
        }
        if let Some(pattern) = Self::analyze_action_ratios(buffer) {
            score += 30;
            reasons.extend(pattern);
        }

        if score == 0 {
            return None;
        }
        let severity = if score >= 60 {
            Severity::High
        } else if score >= 40 {
            Severity::Medium
        } else {
            Severity::Low
        };
        Some(BotSuspicion {
            user_id,
            suspicion_score: score,
            severity,
            reasons,
        })
    }

    fn analyze_timing(response_times: &[u64]) -> Option<Vec<&'static str>> {
        if response_times.len() < MIN_SAMPLE_SIZE {
            return None;
        }
        let mut reasons = Vec::new();
        let n = response_times.len() as f64;
        let mean = response_times.iter().sum::<u64>() as f64 / n;
        let variance = response_times
            .iter()
            .map(|&t| {
                let d = t as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();
        let min = *response_times.iter().min().unwrap();
        let max = *response_times.iter().max().unwrap();

        if std_dev < STD_DEV_THRESHOLD_MS {
            reasons.push("very_consistent_timing");
        }
        if min < MIN_RESPONSE_TIME_MS {
            reasons.push("superhuman_reaction");
        }
        if max - min < TIME_RANGE_THRESHOLD_MS {
            reasons.push("narrow_time_range");
        }
        if reasons.is_empty() {
            None
        } else {
            Some(reasons)
        }
    }

    fn analyze_action_ratios(buffer: &VecDeque<PlayerActionEvent>) -> Option<Vec<&'static str>> {
        let total = buffer.len() as f64;
        let fold_count = buffer.iter().filter(|a| a.action_type == "fold").count() as f64;
        let raise_count = buffer.iter().filter(|a| a.action_type == "raise").count() as f64;
        let mut reasons = Vec::new();

        let fold_ratio = fold_count / total;
        if fold_ratio > EXCESSIVE_FOLD_RATIO {
            reasons.push("excessive_folding");
        } else if fold_ratio < NEVER_FOLD_RATIO {
            reasons.push("never_folds");
        }
        if raise_count / total > EXCESSIVE_RAISE_RATIO {
            reasons.push("excessive_raising");
        }
        if reasons.is_empty() {
            None
        } else {
            Some(reasons)
        }
    }
}

impl Default for BotDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(user_id: UserId, kind: &str, response_time_ms: u64) -> PlayerActionEvent {
        PlayerActionEvent {
            user_id,
            action_type: kind.to_string(),
            response_time_ms,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn short_buffer_does_not_trigger_analysis() {
        let mut detector = BotDetector::new();
        let user = UserId::default();
        for _ in 0..BUFFER_SIZE - 1 {
            assert!(detector.record_action(action(user, "call", 120)).is_none());
        }
    }

    #[test]
    fn constant_fast_timing_is_flagged() {
        let mut detector = BotDetector::new();
        let user = UserId::default();
        let mut suspicion = None;
        for _ in 0..BUFFER_SIZE {
            suspicion = detector.record_action(action(user, "call", 50));
        }
        let suspicion = suspicion.unwrap();
        assert!(suspicion.reasons.contains(&"superhuman_reaction"));
        assert_eq!(suspicion.severity, Severity::High);
    }

    #[test]
    fn varied_human_like_timing_is_not_flagged() {
        let mut detector = BotDetector::new();
        let user = UserId::default();
        let times = [800, 1200, 650, 2100, 1500, 900, 3000, 700, 1100, 1900, 600, 2500, 1300, 950, 1700, 800, 1400, 2200, 1000, 1600];
        let mut suspicion = None;
        for t in times {
            suspicion = detector.record_action(action(user, "call", t));
        }
        assert!(suspicion.is_none());
    }
}
