//! Poker table engine: rules adapter, seats, hand lifecycle, and settlement.
//!
//! Tracks a single table's state across betting rounds: automated blind
//! posting and board dealing ([`Snapshot`]), seat occupancy and sit-in/
//! sit-out ([`Seat`]), the hand lifecycle and WSOP under-raise rule
//! ([`Table`]), and showdown/pot distribution ([`Showdown`],
//! [`Settlement`], [`PnL`]).
mod action;
mod pnl;
mod rules;
mod seat;
mod settlement;
mod showdown;
mod table;
mod turn;

pub use action::*;
pub use pnl::*;
pub use rules::*;
pub use seat::*;
pub use settlement::*;
pub use showdown::*;
pub use table::*;
pub use turn::*;
