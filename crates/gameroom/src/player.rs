//! The decision source behind a seat: a human (decisions arrive over the
//! WebSocket, this trait is never consulted) or one of the bot [`Strategy`]
//! implementations under [`crate::players`].
use rbp_engine::Action;
use rbp_engine::AvailableActions;

/// A pluggable bot decision-maker. Stateless by convention — any memory a
/// strategy wants across turns belongs on the bot session that owns it, not
/// here, so the same `Strategy` can be shared across every bot seat.
pub trait Strategy: Send + Sync {
    fn decide(&self, actions: &AvailableActions) -> Action;
    fn name(&self) -> &'static str;
}
