//! WebSocket gateway (§4.F): connection registry, channel subscriptions,
//! envelope framing, heartbeat, and reconnect recovery. Bridges
//! `rbp_gameroom::GameLoop` to `actix-ws` sessions without either crate
//! knowing about the other's internals — [`broadcaster::GatewayBroadcaster`]
//! is the only seam between them.
mod broadcaster;
mod casino;
mod channel;
mod envelope;
mod heartbeat;
mod recovery;
mod registry;

pub use broadcaster::*;
pub use casino::*;
pub use channel::*;
pub use envelope::*;
pub use heartbeat::*;
pub use recovery::parse_requested_channels;
pub use recovery::ConnectionState;
pub use registry::*;
