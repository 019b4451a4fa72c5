use crate::player::Strategy;
use rbp_engine::Action;
use rbp_engine::AvailableActions;

/// Conservative: checks when free, calls small bets, folds to anything
/// that needs a raise back. Never opens the betting with a raise.
pub struct Tight;

const CALL_CHANCE: f64 = 0.35;

impl Strategy for Tight {
    fn decide(&self, actions: &AvailableActions) -> Action {
        if actions.can_check {
            return Action::Check;
        }
        if actions.can_call && rand::random::<f64>() < CALL_CHANCE {
            return Action::Call(actions.call_amount);
        }
        if actions.can_fold {
            return Action::Fold;
        }
        Action::Check
    }

    fn name(&self) -> &'static str {
        "tight"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_to_bets_it_wont_call() {
        let actions = AvailableActions {
            can_check: false,
            can_fold: true,
            can_call: true,
            call_amount: 500,
            can_raise: true,
            min_raise: Some(1000),
            max_raise: Some(5000),
        };
        let folded = (0..200).filter(|_| matches!(Tight.decide(&actions), Action::Fold)).count();
        assert!(folded > 80);
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
            assert!(!matches!(Tight.decide(&actions), Action::Raise(_)));
        }
    }
}
