//! Table engine: seats, sit-in/sit-out, hand lifecycle, under-raise tracking.
//!
//! Wraps a [`crate::rules::Snapshot`] with everything the rules adapter
//! deliberately leaves out: which physical chairs are occupied, whose turn
//! it is to act in the *table's* terms (a `UserId`, not a rules-adapter
//! index), the WSOP under-raise rule, and end-of-hand settlement.
use crate::action::Action;
use crate::pnl::State;
use crate::rules::RulesError;
use crate::rules::Snapshot;
use crate::seat::Seat;
use crate::seat::SeatError;
use crate::settlement::Settlement;
use crate::showdown::Showdown;
use rbp_cards::Board;
use rbp_cards::Hole;
use rbp_core::Chips;
use rbp_core::HandNumber;
use rbp_core::Position;
use rbp_core::UserId;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error(transparent)]
    Seat(#[from] SeatError),
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error("fewer than two active players")]
    NotEnoughPlayers,
    #[error("a hand is already in progress")]
    HandInProgress,
    #[error("no hand in progress")]
    NoHandInProgress,
    #[error("not this player's turn")]
    NotYourTurn,
    #[error("player is not seated at this table")]
    NotSeated,
    #[error("blinds and deals are posted automatically, not via ProcessAction")]
    InvalidActionKind,
}

/// Mirrors the rules adapter's street, plus the idle state between hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
}

impl From<rbp_cards::Street> for Phase {
    fn from(street: rbp_cards::Street) -> Self {
        match street {
            rbp_cards::Street::Pref => Self::Preflop,
            rbp_cards::Street::Flop => Self::Flop,
            rbp_cards::Street::Turn => Self::Turn,
            rbp_cards::Street::Rive => Self::River,
        }
    }
}

pub struct HandStarted {
    pub hand_number: HandNumber,
    pub dealer: Position,
    pub auto_activated_seats: Vec<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailableActions {
    pub can_check: bool,
    pub can_fold: bool,
    pub can_call: bool,
    pub call_amount: Chips,
    pub can_raise: bool,
    pub min_raise: Option<Chips>,
    pub max_raise: Option<Chips>,
}

impl AvailableActions {
    fn none() -> Self {
        Self {
            can_check: false,
            can_fold: false,
            can_call: false,
            call_amount: 0,
            can_raise: false,
            min_raise: None,
            max_raise: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinnerShare {
    pub seat: Position,
    pub player: UserId,
    pub amount: Chips,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandResult {
    pub winners: Vec<WinnerShare>,
    pub showdown_cards: Vec<(Position, Hole)>,
    pub pot: Chips,
    pub community_cards: Board,
    pub zero_stack_players: Vec<Position>,
    pub refund: Option<WinnerShare>,
}

pub enum Outcome {
    Continue,
    HandComplete(HandResult),
}

/// A cash table: a fixed array of seats (6 or 9 per §4.B) plus whatever hand
/// is currently in progress.
pub struct Table {
    seats: Vec<Seat>,
    dealer: Option<Position>,
    hand: Option<Snapshot>,
    /// `order[i]` is the seat occupying rules-adapter position `i` for the
    /// hand currently in progress.
    order: Vec<Position>,
    hand_number: HandNumber,
    sb: Chips,
    bb: Chips,
    ante: Chips,
    buyin_range: (Chips, Chips),
    last_full_raise: Chips,
    acted_on_full_raise: HashSet<Position>,
    under_raise: bool,
}

impl Table {
    pub fn new(seats: usize, sb: Chips, bb: Chips, ante: Chips) -> Self {
        assert!(
            rbp_core::TABLE_SIZES.contains(&seats),
            "table size must be one of {:?}",
            rbp_core::TABLE_SIZES
        );
        Self {
            seats: vec![Seat::Empty; seats],
            dealer: None,
            hand: None,
            order: Vec::new(),
            hand_number: 0,
            sb,
            bb,
            ante,
            buyin_range: (bb * 40, bb * 200),
            last_full_raise: bb,
            acted_on_full_raise: HashSet::new(),
            under_raise: false,
        }
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }
    pub fn phase(&self) -> Phase {
        match &self.hand {
            Some(hand) => Phase::from(hand.street()),
            None => Phase::Waiting,
        }
    }
    pub fn hand_number(&self) -> HandNumber {
        self.hand_number
    }
    pub fn dealer(&self) -> Option<Position> {
        self.dealer
    }
    pub fn board(&self) -> Option<&Board> {
        self.hand.as_ref().map(|h| h.board())
    }
    pub fn pot(&self) -> Chips {
        self.hand.as_ref().map(|h| h.pot()).unwrap_or(0)
    }

    fn seat_of(&self, user: UserId) -> Option<Position> {
        self.seats.iter().position(|seat| {
            seat.occupant().map(|o| o.player()) == Some(user)
        })
    }

    /// Seats a player. Fails if the seat is taken, the player is already
    /// seated elsewhere, or the stack is outside the buy-in range.
    pub fn seat_player(
        &mut self,
        seat: Position,
        player: UserId,
        stack: Chips,
    ) -> Result<(), TableError> {
        if stack < self.buyin_range.0 || stack > self.buyin_range.1 {
            return Err(SeatError::StackOutOfRange.into());
        }
        if self.seat_of(player).is_some() {
            return Err(SeatError::AlreadySeatedElsewhere.into());
        }
        self.seats[seat].seat_player(player, stack)?;
        Ok(())
    }

    pub fn sit_in(&mut self, seat: Position) {
        self.seats[seat].sit_in();
    }
    pub fn sit_out(&mut self, seat: Position) {
        self.seats[seat].sit_out();
    }
    /// Empties a seat entirely, freeing it for a new occupant. Distinct
    /// from `sit_out`, which keeps the player's stack at the table.
    pub fn vacate(&mut self, seat: Position) {
        self.seats[seat].vacate();
    }

    /// Lowest stack this table will let a new arrival sit down with.
    pub fn min_buyin(&self) -> Chips {
        self.buyin_range.0
    }

    /// Tops up a seated player's stack between hands. Cash tables only —
    /// tournament chip counts are fixed except through hand settlement.
    pub fn rebuy(&mut self, seat: Position, amount: Chips) -> Result<(), TableError> {
        if self.hand.is_some() && self.order.contains(&seat) {
            return Err(TableError::HandInProgress);
        }
        match &mut self.seats[seat] {
            Seat::Occupied(occupant) => {
                occupant.rebuy(amount);
                Ok(())
            }
            Seat::Empty => Err(TableError::NotSeated),
        }
    }

    fn active_seats(&self) -> Vec<Position> {
        (0..self.seats.len())
            .filter(|&s| self.seats[s].is_active())
            .collect()
    }

    pub fn can_start_hand(&self) -> bool {
        self.hand.is_none() && self.active_seats().len() >= 2
    }

    /// Seat index one clockwise step after `current` that satisfies
    /// `predicate`, or `None` if no seat does. Table seats are laid out in
    /// clockwise index order, so "clockwise" is just increasing index mod n.
    fn next_clockwise(&self, current: Position, predicate: impl Fn(Position) -> bool) -> Option<Position> {
        let n = self.seats.len();
        (1..=n)
            .map(|offset| (current + offset) % n)
            .find(|&s| predicate(s))
    }

    /// Flips the seat that will post the next hand's big blind from
    /// `sitting_out` to `active`, if it was waiting. Per the full seated
    /// set (including currently-sitting-out seats, not just active ones):
    /// heads-up the BB is the seat right after the dealer; 3+-handed it's
    /// two seats after, mirroring [`Self::build_order`]'s convention.
    fn activate_bb_waiters_for_next_hand(&mut self, next_dealer: Position) -> Vec<Position> {
        let n = self.seats.len();
        let occupied_order: Vec<Position> = (1..=n)
            .map(|offset| (next_dealer + offset) % n)
            .filter(|&s| !self.seats[s].is_empty())
            .collect();
        let bb_seat = match occupied_order.len() {
            0 | 1 => return Vec::new(),
            2 => occupied_order[0],
            _ => occupied_order[1],
        };
        if self.seats[bb_seat].is_sitting_out() {
            self.seats[bb_seat].sit_in();
            vec![bb_seat]
        } else {
            Vec::new()
        }
    }

    /// Builds the rules-adapter seating order for a hand with the given
    /// dealer: clockwise starting one seat after the dealer, wrapping back
    /// to (and including) the dealer. Per §4.A this yields `[BB, SB]`
    /// heads-up (the lone other seat is first, the dealer/SB last) and
    /// `[SB, ..., BTN]` for 3+ seats.
    fn build_order(&self, dealer: Position) -> Vec<Position> {
        let n = self.seats.len();
        (1..=n)
            .map(|offset| (dealer + offset) % n)
            .filter(|&s| self.seats[s].is_active())
            .collect()
    }

    pub fn start_new_hand(&mut self) -> Result<HandStarted, TableError> {
        if self.hand.is_some() {
            return Err(TableError::HandInProgress);
        }
        if self.active_seats().len() < 2 {
            return Err(TableError::NotEnoughPlayers);
        }
        let dealer = match self.dealer {
            None => self
                .active_seats()
                .into_iter()
                .next()
                .expect("at least two active seats"),
            Some(prev) => self
                .next_clockwise(prev, |s| self.seats[s].is_active())
                .unwrap_or(prev),
        };
        let auto_activated_seats = self.activate_bb_waiters_for_next_hand(dealer);
        self.dealer = Some(dealer);
        self.order = self.build_order(dealer);

        let stacks: Vec<Chips> = self
            .order
            .iter()
            .map(|&s| self.seats[s].occupant().expect("active seat is occupied").stack())
            .collect();

        let snapshot = Snapshot::create_hand(stacks, self.sb, self.bb, self.ante);
        for (i, &seat) in self.order.iter().enumerate() {
            if let Seat::Occupied(occupant) = &mut self.seats[seat] {
                occupant.deal(snapshot.hole_cards(i));
                occupant.set_state(State::Betting);
            }
        }
        self.hand = Some(snapshot);
        self.hand_number += 1;
        self.last_full_raise = self.bb;
        self.acted_on_full_raise.clear();
        self.under_raise = false;

        Ok(HandStarted {
            hand_number: self.hand_number,
            dealer,
            auto_activated_seats,
        })
    }

    fn rules_index_of(&self, seat: Position) -> Option<usize> {
        self.order.iter().position(|&s| s == seat)
    }

    pub fn current_turn_seat(&self) -> Option<Position> {
        let hand = self.hand.as_ref()?;
        let idx = hand.actor_index()?;
        self.order.get(idx).copied()
    }
    pub fn current_turn_user(&self) -> Option<UserId> {
        let seat = self.current_turn_seat()?;
        self.seats[seat].occupant().map(|o| o.player())
    }

    pub fn available_actions(&self, user: UserId) -> AvailableActions {
        let (Some(hand), Some(seat)) = (self.hand.as_ref(), self.seat_of(user)) else {
            return AvailableActions::none();
        };
        if self.current_turn_seat() != Some(seat) {
            return AvailableActions::none();
        }
        let idx = match self.rules_index_of(seat) {
            Some(idx) => idx,
            None => return AvailableActions::none(),
        };
        let call_amount = hand.checking_or_calling_amount(idx);
        let raise_suppressed = self.under_raise && self.acted_on_full_raise.contains(&seat);
        let rules_allow_raise =
            hand.min_completion_raise().is_some() && hand.max_completion_raise(idx).is_some();
        let can_raise = !raise_suppressed && rules_allow_raise;
        AvailableActions {
            can_check: call_amount <= 0,
            can_fold: call_amount > 0,
            can_call: call_amount > 0,
            call_amount,
            can_raise,
            min_raise: if can_raise { hand.min_completion_raise() } else { None },
            max_raise: if can_raise { hand.max_completion_raise(idx) } else { None },
        }
    }

    /// Applies a player's action. `action` must be `Fold`, `Check`,
    /// `Call(_)`, `Raise(_)`, or `Shove(_)`.
    pub fn process_action(&mut self, user: UserId, action: Action) -> Result<Outcome, TableError> {
        let seat = self.seat_of(user).ok_or(TableError::NotSeated)?;
        if self.current_turn_seat() != Some(seat) {
            return Err(TableError::NotYourTurn);
        }
        let idx = self.rules_index_of(seat).ok_or(TableError::NotYourTurn)?;
        let hand = self.hand.as_mut().ok_or(TableError::NoHandInProgress)?;
        let street_before = hand.street();
        let current_bet = hand.current_bet();

        match action {
            Action::Fold => {
                hand.apply_fold(idx)?;
            }
            Action::Check | Action::Call(_) => {
                hand.apply_check_or_call(idx)?;
                self.acted_on_full_raise.insert(seat);
            }
            Action::Raise(amount) | Action::Shove(amount) => {
                let increment = amount - current_bet;
                hand.apply_complete_bet_or_raise_to(idx, amount)?;
                if increment >= self.last_full_raise {
                    self.last_full_raise = increment;
                    self.acted_on_full_raise.clear();
                    self.under_raise = false;
                } else {
                    self.under_raise = true;
                }
            }
            Action::Blind(_) | Action::Draw(_) => return Err(TableError::InvalidActionKind),
        }

        let hand = self.hand.as_ref().unwrap();
        if hand.street() != street_before {
            self.last_full_raise = self.bb;
            self.acted_on_full_raise.clear();
            self.under_raise = false;
        }
        if hand.is_hand_complete() {
            let result = self.complete_hand();
            return Ok(Outcome::HandComplete(result));
        }
        Ok(Outcome::Continue)
    }

    fn complete_hand(&mut self) -> HandResult {
        let hand = self.hand.take().expect("hand in progress");
        let n = self.order.len();
        let remaining: Vec<usize> = (0..n).filter(|&i| !hand.folded()[i]).collect();
        let board = *hand.board();

        let mut rewards = vec![0 as Chips; n];
        if remaining.len() == 1 {
            let winner = remaining[0];
            rewards[winner] = hand.total_bets().iter().sum();
        } else {
            let settlements: Vec<Settlement> = (0..n)
                .map(|i| {
                    let status = if hand.folded()[i] {
                        State::Folding
                    } else if hand.all_in()[i] {
                        State::Shoving
                    } else {
                        State::Betting
                    };
                    let strength = if hand.folded()[i] {
                        // never read for folded seats by Showdown, but a
                        // value is still required to construct one.
                        hand.strength(remaining[0])
                    } else {
                        hand.strength(i)
                    };
                    Settlement::from((hand.total_bets()[i], status, strength))
                })
                .collect();
            for (i, settled) in Showdown::from(settlements).settle().into_iter().enumerate() {
                rewards[i] = settled.pnl().reward();
            }
        }

        let mut winners = Vec::new();
        let mut zero_stack_players = Vec::new();
        for i in 0..n {
            let seat = self.order[i];
            let final_stack = hand.stacks()[i] + rewards[i];
            if rewards[i] > 0 {
                if let Some(player) = self.seats[seat].occupant().map(|o| o.player()) {
                    winners.push(WinnerShare {
                        seat,
                        player,
                        amount: rewards[i],
                    });
                }
            }
            if let Seat::Occupied(occupant) = &mut self.seats[seat] {
                occupant.sync_from_hand(final_stack);
                if final_stack == 0 {
                    occupant.set_state(State::SittingOut);
                    zero_stack_players.push(seat);
                } else {
                    occupant.set_state(State::Betting);
                }
            }
        }

        let showdown_cards = if remaining.len() >= 2 {
            remaining
                .iter()
                .map(|&i| (self.order[i], hand.hole_cards(i)))
                .collect()
        } else {
            Vec::new()
        };

        let refund = if remaining.len() == 1 && winners.len() == 1 {
            let winner_idx = remaining[0];
            let winner_total = hand.total_bets()[winner_idx];
            let max_other = (0..n)
                .filter(|&i| i != winner_idx)
                .map(|i| hand.total_bets()[i])
                .max()
                .unwrap_or(0);
            let refund_amount = winner_total - max_other;
            if refund_amount > 0 {
                Some(WinnerShare {
                    seat: self.order[winner_idx],
                    player: winners[0].player,
                    amount: refund_amount,
                })
            } else {
                None
            }
        } else {
            None
        };

        let pot = rewards.iter().sum();
        self.order.clear();
        self.acted_on_full_raise.clear();
        self.under_raise = false;

        HandResult {
            winners,
            showdown_cards,
            pot,
            community_cards: board,
            zero_stack_players,
            refund,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat_two(table: &mut Table) -> (UserId, UserId) {
        let a = UserId::default();
        let b = UserId::default();
        table.seat_player(0, a, 1_000).unwrap();
        table.seat_player(1, b, 1_000).unwrap();
        table.sit_in(0);
        table.sit_in(1);
        (a, b)
    }

    #[test]
    fn cannot_start_with_fewer_than_two_active() {
        let mut table = Table::new(6, 5, 10, 0);
        let a = UserId::default();
        table.seat_player(0, a, 1_000).unwrap();
        table.sit_in(0);
        assert!(!table.can_start_hand());
        assert_eq!(table.start_new_hand().unwrap_err(), TableError::NotEnoughPlayers);
    }

    #[test]
    fn heads_up_hand_runs_to_completion() {
        let mut table = Table::new(6, 5, 10, 0);
        let (a, b) = seat_two(&mut table);
        table.start_new_hand().unwrap();
        assert_eq!(table.phase(), Phase::Preflop);

        loop {
            let actor = table.current_turn_user().expect("actor present mid-hand");
            match table.process_action(actor, Action::Call(0)) {
                Ok(Outcome::Continue) => continue,
                Ok(Outcome::HandComplete(result)) => {
                    assert_eq!(
                        result.winners.iter().map(|w| w.amount).sum::<Chips>(),
                        result.pot
                    );
                    break;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        let _ = (a, b);
        assert_eq!(table.phase(), Phase::Waiting);
    }

    #[test]
    fn rejects_out_of_turn_action() {
        let mut table = Table::new(6, 5, 10, 0);
        let (a, b) = seat_two(&mut table);
        table.start_new_hand().unwrap();
        let actor = table.current_turn_user().unwrap();
        let other = if actor == a { b } else { a };
        assert_eq!(
            table.process_action(other, Action::Call(0)).unwrap_err(),
            TableError::NotYourTurn
        );
    }

    #[test]
    fn raise_reopens_action_for_the_other_player() {
        let mut table = Table::new(6, 5, 10, 0);
        let (_, _) = seat_two(&mut table);
        table.start_new_hand().unwrap();
        let actor = table.current_turn_user().unwrap();
        let actions = table.available_actions(actor);
        assert!(actions.can_raise);
    }
}
