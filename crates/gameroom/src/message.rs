//! Wire-format envelopes sent from the server to clients over WebSocket.
//!
//! Every variant is tagged with a snake_case `type` field so a client can
//! dispatch on a single `match` without a secondary lookup. `TableSnapshot`
//! and `HandResult` are built per-recipient: a seated player's own hole
//! cards are included, everyone else's are not.
use rbp_core::Chips;
use rbp_core::HandNumber;
use rbp_core::Position;
use rbp_core::TableId;
use rbp_core::UserId;
use rbp_engine::AvailableActions;
use rbp_engine::HandResult;
use rbp_engine::Phase;
use rbp_engine::Table;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    HandStarted {
        table_id: TableId,
        hand_number: HandNumber,
        dealer: Position,
    },
    TableSnapshot(TableSnapshot),
    TurnChanged {
        table_id: TableId,
        seat: Position,
        player: UserId,
    },
    TurnPrompt {
        table_id: TableId,
        seat: Position,
        actions: ActionsView,
        timeout_seconds: u64,
    },
    CommunityCards {
        table_id: TableId,
        phase: String,
        board: String,
    },
    HandResult(HandResultView),
    TableStateUpdate {
        table_id: TableId,
        phase: String,
        pot: Chips,
    },
    WaitlistUpdate {
        table_id: TableId,
        user_id: UserId,
        position: usize,
        size: usize,
    },
    Chat {
        channel: String,
        user_id: UserId,
        nickname: String,
        body: String,
    },
    Error {
        message: String,
    },
    /// Server heartbeat (§4.F). The client's `PONG` reply is a
    /// [`crate::envelope`]-level `ClientFrame::Pong`, not a `ServerMessage`.
    Ping,
    /// Sent once on connect and again after a successful recovery
    /// handshake so the client knows which state it's in.
    ConnectionState {
        state: String,
    },
    /// Reply to a client's `RECOVERY_REQUEST` (§4.F): since this gateway
    /// doesn't keep a replay log, recovery always resolves to a fresh
    /// snapshot per requested channel rather than a replayed delta.
    RecoveryResponse {
        channels: Vec<String>,
    },
    Announcement {
        body: String,
    },
    RoomForceClosed {
        table_id: TableId,
        reason: String,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct ActionsView {
    pub can_check: bool,
    pub can_fold: bool,
    pub can_call: bool,
    pub call_amount: Chips,
    pub can_raise: bool,
    pub min_raise: Option<Chips>,
    pub max_raise: Option<Chips>,
}

impl From<AvailableActions> for ActionsView {
    fn from(a: AvailableActions) -> Self {
        Self {
            can_check: a.can_check,
            can_fold: a.can_fold,
            can_call: a.can_call,
            call_amount: a.call_amount,
            can_raise: a.can_raise,
            min_raise: a.min_raise,
            max_raise: a.max_raise,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SeatView {
    pub seat: Position,
    pub player: Option<UserId>,
    pub stack: Chips,
    pub is_active: bool,
    /// Present only for the snapshot's own recipient, or at showdown.
    pub hole: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TableSnapshot {
    pub table_id: TableId,
    pub hand_number: HandNumber,
    pub phase: String,
    pub pot: Chips,
    pub board: String,
    pub dealer: Option<Position>,
    pub current_turn: Option<Position>,
    pub seats: Vec<SeatView>,
}

fn phase_name(phase: Phase) -> String {
    match phase {
        Phase::Waiting => "waiting",
        Phase::Preflop => "preflop",
        Phase::Flop => "flop",
        Phase::Turn => "turn",
        Phase::River => "river",
    }
    .to_string()
}

impl TableSnapshot {
    /// Builds a snapshot personalized for `recipient` — only their own hole
    /// cards are included, everyone else's are masked.
    pub fn personalized(table_id: TableId, table: &Table, recipient: Option<UserId>) -> Self {
        let board = table.board().map(|b| b.to_string()).unwrap_or_default();
        let seats = table
            .seats()
            .iter()
            .enumerate()
            .map(|(seat, s)| match s.occupant() {
                Some(o) => {
                    let reveal = recipient.is_some_and(|r| r == o.player());
                    SeatView {
                        seat,
                        player: Some(o.player()),
                        stack: o.stack(),
                        is_active: o.is_active(),
                        hole: if reveal { o.cards().map(|h| h.to_string()) } else { None },
                    }
                }
                None => SeatView {
                    seat,
                    player: None,
                    stack: 0,
                    is_active: false,
                    hole: None,
                },
            })
            .collect();
        Self {
            table_id,
            hand_number: table.hand_number(),
            phase: phase_name(table.phase()),
            pot: table.pot(),
            board,
            dealer: table.dealer(),
            current_turn: table.current_turn_seat(),
            seats,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WinnerView {
    pub seat: Position,
    pub player: UserId,
    pub amount: Chips,
}

#[derive(Clone, Debug, Serialize)]
pub struct HandResultView {
    pub table_id: TableId,
    pub winners: Vec<WinnerView>,
    pub showdown: Vec<(Position, String)>,
    pub pot: Chips,
    pub board: String,
    pub zero_stack_seats: Vec<Position>,
    pub refund: Option<WinnerView>,
}

impl HandResultView {
    pub fn from_result(table_id: TableId, result: &HandResult) -> Self {
        Self {
            table_id,
            winners: result
                .winners
                .iter()
                .map(|w| WinnerView { seat: w.seat, player: w.player, amount: w.amount })
                .collect(),
            showdown: result
                .showdown_cards
                .iter()
                .map(|(seat, hole)| (*seat, hole.to_string()))
                .collect(),
            pot: result.pot,
            board: result.community_cards.to_string(),
            zero_stack_seats: result.zero_stack_players.clone(),
            refund: result.refund.map(|w| WinnerView { seat: w.seat, player: w.player, amount: w.amount }),
        }
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("server message is always serializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_hides_other_players_hole_cards() {
        let mut table = Table::new(6, 5, 10, 0);
        let a = UserId::default();
        let b = UserId::default();
        table.seat_player(0, a, 1_000).unwrap();
        table.seat_player(1, b, 1_000).unwrap();
        table.sit_in(0);
        table.sit_in(1);
        table.start_new_hand().unwrap();

        let table_id = TableId::default();
        let snap = TableSnapshot::personalized(table_id, &table, Some(a));
        let seat_a = snap.seats.iter().find(|s| s.player == Some(a)).unwrap();
        let seat_b = snap.seats.iter().find(|s| s.player == Some(b)).unwrap();
        assert!(seat_a.hole.is_some());
        assert!(seat_b.hole.is_none());
    }
}
