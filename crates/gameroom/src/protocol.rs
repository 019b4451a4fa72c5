//! Decodes client text frames into table [`Action`]s, and validates a
//! decoded action against the legal range the engine currently allows.
use rbp_core::Chips;
use rbp_engine::Action;
use rbp_engine::AvailableActions;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub enum ProtocolError {
    InvalidAction(String),
    IllegalAction(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAction(s) => write!(f, "invalid action: {s}"),
            Self::IllegalAction(s) => write!(f, "illegal action: {s}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: String,
    amount: Option<Chips>,
}

pub struct Protocol;

impl Protocol {
    /// Parses a client `{"action": "...", "amount": ...}` frame into an
    /// [`Action`]. Blind posts and card deals are never client-originated.
    pub fn decode(body: &str) -> Result<Action, ProtocolError> {
        let request: ActionRequest =
            serde_json::from_str(body).map_err(|e| ProtocolError::InvalidAction(e.to_string()))?;
        match request.action.as_str() {
            "fold" => Ok(Action::Fold),
            "check" => Ok(Action::Check),
            "call" => Ok(Action::Call(request.amount.unwrap_or(0))),
            "raise" => request
                .amount
                .map(Action::Raise)
                .ok_or_else(|| ProtocolError::InvalidAction("raise requires an amount".into())),
            "shove" => request
                .amount
                .map(Action::Shove)
                .ok_or_else(|| ProtocolError::InvalidAction("shove requires an amount".into())),
            other => Err(ProtocolError::InvalidAction(format!("unknown action '{other}'"))),
        }
    }

    /// Confirms `action` falls within what [`AvailableActions`] currently
    /// permits, re-clamping call/raise/shove amounts rather than trusting
    /// the client's numbers verbatim.
    pub fn validate(action: Action, legal: &AvailableActions) -> Result<Action, ProtocolError> {
        match action {
            Action::Fold if legal.can_fold => Ok(Action::Fold),
            Action::Check if legal.can_check => Ok(Action::Check),
            Action::Call(_) if legal.can_call => Ok(Action::Call(legal.call_amount)),
            Action::Raise(amount) if legal.can_raise => {
                let min = legal.min_raise.unwrap_or(Chips::MAX);
                let max = legal.max_raise.unwrap_or(0);
                if amount >= min && amount <= max {
                    Ok(Action::Raise(amount))
                } else {
                    Err(ProtocolError::IllegalAction(format!("raise {amount} outside [{min}, {max}]")))
                }
            }
            Action::Shove(_) if legal.can_raise => match legal.max_raise {
                Some(max) => Ok(Action::Shove(max)),
                None => Err(ProtocolError::IllegalAction("no shove available".into())),
            },
            other => Err(ProtocolError::IllegalAction(format!("{other:?} is not legal right now"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legal_with_raise() -> AvailableActions {
        AvailableActions {
            can_check: false,
            can_fold: true,
            can_call: true,
            call_amount: 10,
            can_raise: true,
            min_raise: Some(20),
            max_raise: Some(1_000),
        }
    }

    #[test]
    fn decode_valid_actions() {
        assert!(matches!(Protocol::decode(r#"{"action":"fold"}"#), Ok(Action::Fold)));
        assert!(matches!(Protocol::decode(r#"{"action":"check"}"#), Ok(Action::Check)));
        assert!(matches!(Protocol::decode(r#"{"action":"raise","amount":50}"#), Ok(Action::Raise(50))));
    }

    #[test]
    fn decode_rejects_missing_amount() {
        assert!(Protocol::decode(r#"{"action":"raise"}"#).is_err());
    }

    #[test]
    fn validate_clamps_call_to_exact_amount() {
        let legal = legal_with_raise();
        assert_eq!(Protocol::validate(Action::Call(999), &legal).unwrap(), Action::Call(10));
    }

    #[test]
    fn validate_rejects_raise_below_minimum() {
        let legal = legal_with_raise();
        assert!(Protocol::validate(Action::Raise(5), &legal).is_err());
    }

    #[test]
    fn validate_rejects_check_when_unavailable() {
        let legal = legal_with_raise();
        assert!(Protocol::validate(Action::Check, &legal).is_err());
    }
}
