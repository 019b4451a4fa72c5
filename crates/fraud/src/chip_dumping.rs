use rbp_core::UserId;
use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

/// One recorded hand outcome between two specific players.
#[derive(Debug, Clone, Copy)]
struct HeadToHeadResult {
    at: Instant,
    winner: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipDumpingSuspicion {
    pub winner: UserId,
    pub loser: UserId,
    pub win_rate: f64,
    pub hands: usize,
}

/// Flags one-way chip flow between a pair of players: the same side winning
/// almost every contested hand is a classic chip-dumping signature, far more
/// likely to be collusion than variance once the sample is large enough.
pub struct ChipDumpingDetector {
    window: Duration,
    min_hands: usize,
    min_win_rate: f64,
    history: HashMap<(UserId, UserId), Vec<HeadToHeadResult>>,
}

impl ChipDumpingDetector {
    pub fn new() -> Self {
        Self {
            window: Duration::from_secs(3600),
            min_hands: 3,
            min_win_rate: 0.9,
            history: HashMap::new(),
        }
    }

    fn pair_key(a: UserId, b: UserId) -> (UserId, UserId) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Records who won a heads-up confrontation between `a` and `b`, then
    /// returns a suspicion if the pair's recent history within the window
    /// now shows a one-sided result.
    pub fn record_result(&mut self, a: UserId, b: UserId, winner: UserId) -> Option<ChipDumpingSuspicion> {
        let now = Instant::now();
        let key = Self::pair_key(a, b);
        let entries = self.history.entry(key).or_default();
        entries.retain(|r| now.duration_since(r.at) <= self.window);
        entries.push(HeadToHeadResult { at: now, winner });

        if entries.len() < self.min_hands {
            return None;
        }
        let mut wins: HashMap<UserId, usize> = HashMap::new();
        for r in entries.iter() {
            *wins.entry(r.winner).or_insert(0) += 1;
        }
        let total = entries.len();
        wins.into_iter().find_map(|(player, count)| {
            let win_rate = count as f64 / total as f64;
            if win_rate >= self.min_win_rate {
                let loser = if player == a { b } else { a };
                Some(ChipDumpingSuspicion {
                    winner: player,
                    loser,
                    win_rate,
                    hands: total,
                })
            } else {
                None
            }
        })
    }
}

impl Default for ChipDumpingDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_one_sided_head_to_head_series() {
        let mut detector = ChipDumpingDetector::new();
        let a = UserId::default();
        let b = UserId::default();
        assert!(detector.record_result(a, b, a).is_none());
        assert!(detector.record_result(a, b, a).is_none());
        let suspicion = detector.record_result(a, b, a).unwrap();
        assert_eq!(suspicion.winner, a);
        assert_eq!(suspicion.loser, b);
        assert_eq!(suspicion.hands, 3);
    }

    #[test]
    fn mixed_results_do_not_flag() {
        let mut detector = ChipDumpingDetector::new();
        let a = UserId::default();
        let b = UserId::default();
        detector.record_result(a, b, a);
        detector.record_result(a, b, b);
        assert!(detector.record_result(a, b, a).is_none());
    }
}
