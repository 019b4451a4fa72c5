use crate::pnl::State;
use rbp_cards::Hole;
use rbp_core::Chips;
use rbp_core::UserId;

/// A physical chair at the table, independent of any particular hand.
///
/// A `Seat` is `Empty` until `SeatPlayer` occupies it; an occupied seat
/// carries the player's identity, stack, and per-hand betting state even
/// between hands, so sit-out/sit-in and stack persist across deals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Empty,
    Occupied(Occupant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occupant {
    player: UserId,
    state: State,
    stack: Chips,
    stake: Chips,
    spent: Chips,
    cards: Option<Hole>,
}

impl Seat {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
    pub fn occupant(&self) -> Option<&Occupant> {
        match self {
            Self::Occupied(o) => Some(o),
            Self::Empty => None,
        }
    }
    /// Seats a player. Fails if the seat is already occupied.
    ///
    /// New arrivals default to `SittingOut` ("wait for big blind").
    pub fn seat_player(&mut self, player: UserId, stack: Chips) -> Result<(), SeatError> {
        if !self.is_empty() {
            return Err(SeatError::AlreadyOccupied);
        }
        *self = Self::Occupied(Occupant {
            player,
            stack,
            stake: 0,
            spent: 0,
            state: State::SittingOut,
            cards: None,
        });
        Ok(())
    }
    pub fn vacate(&mut self) {
        *self = Self::Empty;
    }
    /// Transitions `sitting_out → active` (i.e. `Betting`, ready to be
    /// dealt into the next hand).
    pub fn sit_in(&mut self) {
        if let Self::Occupied(o) = self {
            if o.state == State::SittingOut {
                o.state = State::Betting;
            }
        }
    }
    pub fn sit_out(&mut self) {
        if let Self::Occupied(o) = self {
            o.state = State::SittingOut;
        }
    }
    pub fn is_active(&self) -> bool {
        matches!(
            self.occupant().map(|o| o.state),
            Some(State::Betting) | Some(State::Shoving)
        )
    }
    pub fn is_sitting_out(&self) -> bool {
        matches!(self.occupant().map(|o| o.state), Some(State::SittingOut))
    }
}

impl Occupant {
    pub fn player(&self) -> UserId {
        self.player
    }
    pub fn state(&self) -> State {
        self.state
    }
    pub fn stack(&self) -> Chips {
        self.stack
    }
    pub fn stake(&self) -> Chips {
        self.stake
    }
    pub fn spent(&self) -> Chips {
        self.spent
    }
    pub fn cards(&self) -> Option<Hole> {
        self.cards
    }
    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }
    pub fn deal(&mut self, cards: Hole) {
        self.cards = Some(cards);
    }
    pub fn muck(&mut self) {
        self.cards = None;
    }
    /// Adds winnings directly to the stack (outside any hand).
    pub fn win(&mut self, amount: Chips) {
        self.stack += amount;
    }
    /// Resets a seat's stack to a fresh buy-in, e.g. on rebuy.
    pub fn rebuy(&mut self, amount: Chips) {
        self.stack += amount;
    }
    /// Reconciles the seat's stack/stake/spent against the rules adapter's
    /// view at the end of a hand.
    pub fn sync_from_hand(&mut self, stack: Chips) {
        self.stack = stack;
        self.stake = 0;
        self.spent = 0;
        self.cards = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SeatError {
    #[error("seat is already occupied")]
    AlreadyOccupied,
    #[error("player is already seated elsewhere")]
    AlreadySeatedElsewhere,
    #[error("stack is outside the buy-in range")]
    StackOutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_player_then_sit_in() {
        let mut seat = Seat::Empty;
        let player = UserId::default();
        seat.seat_player(player, 10_000).unwrap();
        assert!(seat.is_sitting_out());
        seat.sit_in();
        assert!(seat.is_active());
        assert_eq!(seat.occupant().unwrap().player(), player);
    }

    #[test]
    fn cannot_double_seat() {
        let mut seat = Seat::Empty;
        seat.seat_player(UserId::default(), 10_000).unwrap();
        assert_eq!(
            seat.seat_player(UserId::default(), 10_000),
            Err(SeatError::AlreadyOccupied)
        );
    }

    #[test]
    fn vacate_clears_occupant() {
        let mut seat = Seat::Empty;
        seat.seat_player(UserId::default(), 10_000).unwrap();
        seat.vacate();
        assert!(seat.is_empty());
    }
}
