//! Concrete bot strategies.
mod balanced;
mod fish;
mod livebot;
mod loose;
mod tight;

pub use balanced::Balanced;
pub use fish::Fish;
pub use livebot::LiveBot;
pub use loose::Loose;
pub use tight::Tight;

/// Looks up a strategy by the name returned from [`crate::player::Strategy::name`].
/// Falls back to [`Fish`] for anything unrecognized — the same trivial
/// heuristic `ProcessBotTurns` uses when a seat has no assigned strategy.
pub fn by_name(name: &str) -> Box<dyn crate::player::Strategy> {
    match name {
        "tight" => Box::new(Tight),
        "loose" => Box::new(Loose),
        "balanced" => Box::new(Balanced),
        "livebot" => Box::new(LiveBot),
        _ => Box::new(Fish),
    }
}
