//! Per-table game loop supervisor and bot orchestrator (§4.D, §4.E).
//!
//! This crate owns everything that rides along with a live
//! `rbp_engine::Table` but isn't the engine's own concern: chat, the
//! waitlist, turn timers, the bot decision surface, and the loop that
//! sequences hand starts and bot turns between human actions. It never
//! touches a WebSocket directly — the gateway crate implements
//! [`TableBroadcaster`] and [`BotTableOps`] against its own connection
//! registry.
//!
//! ## Submodules
//!
//! - [`gameloop`] — `GameLoop`: `try_start_game` / `process_bot_turns` / `apply_action`
//! - [`orchestrator`] — `BotOrchestrator`: spawn/rest/retire control loop
//! - [`players`] — concrete bot [`Strategy`] implementations
//! - [`message`] — wire-format `ServerMessage` envelopes
//! - [`protocol`] — client action decode/validate
mod chat;
mod config;
mod event;
mod gameloop;
mod message;
mod orchestrator;
mod player;
mod protocol;
mod timer;
mod waitlist;

pub mod players;

pub use chat::*;
pub use config::*;
pub use event::*;
pub use gameloop::*;
pub use message::*;
pub use orchestrator::*;
pub use player::*;
pub use protocol::*;
pub use timer::*;
pub use waitlist::*;
