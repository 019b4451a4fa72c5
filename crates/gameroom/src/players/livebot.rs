use crate::player::Strategy;
use rbp_engine::Action;
use rbp_engine::AvailableActions;

/// The strategy the bot orchestrator assigns to an autonomously-spawned
/// session (§4.E "random strategy"): picks uniformly among whatever's
/// legal, with an occasional raise thrown in so spawned tables don't play
/// out as pure limp-fests.
pub struct LiveBot;

const RAISE_CHANCE: f64 = 0.15;

impl Strategy for LiveBot {
    fn decide(&self, actions: &AvailableActions) -> Action {
        if actions.can_raise && rand::random::<f64>() < RAISE_CHANCE {
            if let (Some(min), Some(max)) = (actions.min_raise, actions.max_raise) {
                if max > min {
                    let amount = rand::random_range(min..=max);
                    return Action::Raise(amount);
                }
                return Action::Raise(min);
            }
        }
        let mut options = Vec::with_capacity(3);
        if actions.can_check {
            options.push(Action::Check);
        }
        if actions.can_call {
            options.push(Action::Call(actions.call_amount));
        }
        if actions.can_fold {
            options.push(Action::Fold);
        }
        if options.is_empty() {
            return Action::Check;
        }
        let idx = rand::random_range(0..options.len());
        options[idx]
    }

    fn name(&self) -> &'static str {
        "livebot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_only_legal_actions() {
        let actions = AvailableActions {
            can_check: true,
            can_fold: false,
            can_call: false,
            call_amount: 0,
            can_raise: false,
            min_raise: None,
            max_raise: None,
        };
        for _ in 0..50 {
            assert_eq!(LiveBot.decide(&actions), Action::Check);
        }
    }
}
