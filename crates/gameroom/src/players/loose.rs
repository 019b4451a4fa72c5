use crate::player::Strategy;
use rbp_engine::Action;
use rbp_engine::AvailableActions;

/// Aggressive: raises whenever it's an option, calls almost everything
/// otherwise, and only folds when there's no cheaper way to stay in.
pub struct Loose;

const RAISE_CHANCE: f64 = 0.45;
const CALL_CHANCE: f64 = 0.85;

impl Strategy for Loose {
    fn decide(&self, actions: &AvailableActions) -> Action {
        if actions.can_raise && rand::random::<f64>() < RAISE_CHANCE {
            if let (Some(min), Some(max)) = (actions.min_raise, actions.max_raise) {
                if max > min {
                    return Action::Raise(rand::random_range(min..=max));
                }
                return Action::Raise(min);
            }
        }
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
        "loose"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raises_more_often_than_it_folds() {
        let actions = AvailableActions {
            can_check: false,
            can_fold: true,
            can_call: true,
            call_amount: 10,
            can_raise: true,
            min_raise: Some(20),
            max_raise: Some(100),
        };
        let raises = (0..500).filter(|_| matches!(Loose.decide(&actions), Action::Raise(_))).count();
        let folds = (0..500).filter(|_| matches!(Loose.decide(&actions), Action::Fold)).count();
        assert!(raises > folds);
    }

    #[test]
    fn raise_amount_stays_in_legal_range() {
        let actions = AvailableActions {
            can_check: false,
            can_fold: true,
            can_call: true,
            call_amount: 10,
            can_raise: true,
            min_raise: Some(20),
            max_raise: Some(100),
        };
        for _ in 0..200 {
            if let Action::Raise(amount) = Loose.decide(&actions) {
                assert!((20..=100).contains(&amount));
            }
        }
    }
}
