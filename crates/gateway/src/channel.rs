//! Subscription channels (§4.F, §6). A connection subscribes to one or
//! more channels explicitly; broadcast delivery is always scoped to a
//! single channel string so ordering is per-channel FIFO (§5) without the
//! registry needing to understand what's inside the payload.
use rbp_core::TableId;
use rbp_core::TournamentId;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Lobby,
    Table(TableId),
    Tournament(TournamentId),
    TournamentTable(TournamentId, TableId),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Lobby => write!(f, "lobby"),
            Channel::Table(id) => write!(f, "table:{id}"),
            Channel::Tournament(id) => write!(f, "tournament:{id}"),
            Channel::TournamentTable(tid, table) => write!(f, "tournament:{tid}:table:{table}"),
        }
    }
}

impl Channel {
    /// Parses the wire-format channel name a client sends in a
    /// `SUBSCRIBE_*` request. Returns `None` for anything malformed rather
    /// than guessing.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("lobby"), None, None, None) => Some(Channel::Lobby),
            (Some("table"), Some(id), None, None) => id.parse().ok().map(Channel::Table),
            (Some("tournament"), Some(id), None, None) => id.parse().ok().map(Channel::Tournament),
            (Some("tournament"), Some(tid), Some("table"), Some(table)) => {
                match (tid.parse().ok(), table.parse().ok()) {
                    (Some(tid), Some(table)) => Some(Channel::TournamentTable(tid, table)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_lobby() {
        assert_eq!(Channel::parse("lobby"), Some(Channel::Lobby));
        assert_eq!(Channel::Lobby.to_string(), "lobby");
    }

    #[test]
    fn round_trips_table() {
        let id = TableId::default();
        let chan = Channel::Table(id);
        assert_eq!(Channel::parse(&chan.to_string()), Some(chan));
    }

    #[test]
    fn round_trips_tournament_table() {
        let tid = TournamentId::default();
        let table = TableId::default();
        let chan = Channel::TournamentTable(tid, table);
        assert_eq!(Channel::parse(&chan.to_string()), Some(chan));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Channel::parse("not-a-channel"), None);
        assert_eq!(Channel::parse("table"), None);
    }
}
