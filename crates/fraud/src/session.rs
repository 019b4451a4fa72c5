use crate::events::PlayerStatsEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnomaly {
    pub reasons: Vec<&'static str>,
}

/// Cheap session-level heuristics that need no history beyond the single
/// reported checkpoint: an implausible win rate, profit, or session length
/// is worth a flag even before the DB-backed anomaly detector weighs in.
pub fn analyze_session(event: &PlayerStatsEvent) -> Option<SessionAnomaly> {
    if event.hands_played < 5 {
        return None;
    }
    let mut reasons = Vec::new();
    let win_rate = if event.total_bet > 0 {
        event.total_won as f64 / event.total_bet as f64
    } else {
        0.0
    };
    let profit = event.total_won - event.total_bet;

    if win_rate > 2.0 && event.hands_played >= 10 {
        reasons.push("excessive_win_rate");
    }
    if profit > event.total_bet * 2 && event.hands_played >= 10 {
        reasons.push("excessive_profit");
    }
    if event.session_duration_seconds > 12 * 3600 {
        reasons.push("excessive_session_duration");
    }

    if reasons.is_empty() {
        None
    } else {
        Some(SessionAnomaly { reasons })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbp_core::UserId;

    fn event(hands: u32, bet: i64, won: i64, duration: u64) -> PlayerStatsEvent {
        PlayerStatsEvent {
            user_id: UserId::default(),
            table_id: "t1".into(),
            hands_played: hands,
            total_bet: bet,
            total_won: won,
            session_duration_seconds: duration,
        }
    }

    #[test]
    fn flags_excessive_win_rate() {
        let anomaly = analyze_session(&event(20, 1000, 2500, 3600)).unwrap();
        assert!(anomaly.reasons.contains(&"excessive_win_rate"));
    }

    #[test]
    fn ordinary_session_is_not_flagged() {
        assert!(analyze_session(&event(20, 1000, 1050, 3600)).is_none());
    }

    #[test]
    fn short_sessions_are_skipped() {
        assert!(analyze_session(&event(3, 1000, 5000, 3600)).is_none());
    }
}
