use rbp_core::Position;
use rbp_core::TableId;
use rbp_core::UserId;
use rbp_engine::Action;
use rbp_engine::AvailableActions;
use rbp_engine::HandResult;

/// Internal per-table notifications, fed to every seated [`crate::player::Player`]
/// (human or bot) regardless of whether it's their turn. The wire-format
/// counterpart broadcast to WebSocket clients is [`crate::message::ServerMessage`].
#[derive(Clone, Debug)]
pub enum Event {
    HandStarted { table_id: TableId, dealer: Position },
    Turn { seat: Position, player: UserId, actions: AvailableActions },
    ActionTaken { seat: Position, action: Action },
    HandComplete(HandResult),
    Disconnect(Position),
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Event::HandStarted { table_id, dealer } => write!(f, "hand started at {table_id} (dealer P{dealer})"),
            Event::Turn { seat, .. } => write!(f, "turn: P{seat}"),
            Event::ActionTaken { seat, action } => write!(f, "P{seat}: {action:?}"),
            Event::HandComplete(result) => write!(f, "hand complete, pot {}", result.pot),
            Event::Disconnect(seat) => write!(f, "P{seat}: disconnected"),
        }
    }
}
