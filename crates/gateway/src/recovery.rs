//! Reconnect recovery protocol (§4.F): a client that dropped and
//! reconnected sends `RECOVERY_REQUEST { last_seen_versions }`; since this
//! gateway doesn't buffer a per-channel replay log (no event sourcing
//! behind the broadcast primitives), recovery always falls back to the
//! "fresh snapshot" branch the spec allows — for each channel the client
//! asks about, the caller is handed back a current snapshot to send
//! rather than a replayed delta, and the connection's own last-seen
//! version is bumped so the next `RECOVERY_REQUEST` only asks about
//! channels touched since.
use crate::Channel;
use rbp_core::Version;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Recovering,
    Recovered,
}

/// Parses the client's `{channel: version}` map into typed channels,
/// dropping anything unparseable rather than failing the whole recovery.
pub fn parse_requested_channels(last_seen_versions: &HashMap<String, Version>) -> Vec<(Channel, Version)> {
    last_seen_versions
        .iter()
        .filter_map(|(name, &version)| Channel::parse(name).map(|c| (c, version)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_channels_and_drops_garbage() {
        let mut requested = HashMap::new();
        requested.insert("lobby".to_string(), 3u64);
        requested.insert("not-a-channel".to_string(), 1u64);
        let parsed = parse_requested_channels(&requested);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].0, Channel::Lobby);
        assert_eq!(parsed[0].1, 3);
    }
}
