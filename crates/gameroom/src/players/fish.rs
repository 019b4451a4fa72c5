use crate::player::Strategy;
use rbp_engine::Action;
use rbp_engine::AvailableActions;

/// The trivial fallback strategy: check when free, otherwise call seven
/// times out of ten and fold the rest. Never raises. Used for
/// `ProcessBotTurns`'s built-in heuristic path, independent of whatever
/// strategy the bot orchestrator assigned a given session.
pub struct Fish;

impl Strategy for Fish {
    fn decide(&self, actions: &AvailableActions) -> Action {
        if actions.can_check {
            return Action::Check;
        }
        if actions.can_call && rand::random::<f64>() < 0.70 {
            return Action::Call(actions.call_amount);
        }
        if actions.can_fold {
            return Action::Fold;
        }
        Action::Check
    }

    fn name(&self) -> &'static str {
        "fish"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checks_when_free() {
        let actions = AvailableActions {
            can_check: true,
            can_fold: false,
            can_call: false,
            call_amount: 0,
            can_raise: false,
            min_raise: None,
            max_raise: None,
        };
        assert_eq!(Fish.decide(&actions), Action::Check);
    }

    #[test]
    fn never_raises() {
        let actions = AvailableActions {
            can_check: false,
            can_fold: true,
            can_call: true,
            call_amount: 10,
            can_raise: true,
            min_raise: Some(20),
            max_raise: Some(500),
        };
        for _ in 0..50 {
            assert!(!matches!(Fish.decide(&actions), Action::Raise(_)));
        }
    }
}
