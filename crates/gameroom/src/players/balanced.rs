use crate::player::Strategy;
use rbp_engine::Action;
use rbp_engine::AvailableActions;

/// Randomized middle ground between [`super::Tight`] and [`super::Loose`]:
/// raises occasionally, calls more often than it folds, checks when free.
pub struct Balanced;

const RAISE_CHANCE: f64 = 0.20;
const CALL_CHANCE: f64 = 0.60;

impl Strategy for Balanced {
    fn decide(&self, actions: &AvailableActions) -> Action {
        if actions.can_check {
            return Action::Check;
        }
        if actions.can_raise && rand::random::<f64>() < RAISE_CHANCE {
            if let (Some(min), Some(max)) = (actions.min_raise, actions.max_raise) {
                if max > min {
                    return Action::Raise(rand::random_range(min..=max));
                }
                return Action::Raise(min);
            }
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
        "balanced"
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
        assert_eq!(Balanced.decide(&actions), Action::Check);
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
            if let Action::Raise(amount) = Balanced.decide(&actions) {
                assert!((20..=100).contains(&amount));
            }
        }
    }
}
