//! Poker rules adapter (automated blind posting, bet collection, board
//! dealing, hand completion) wrapped around the primitives in `rbp_cards`.
//!
//! The adapter is positional: callers pass seats already reordered so that
//! index 0 posts the earlier blind. Heads-up the order is `[BB, SB]` with
//! SB on the button; 3+ handed it's `[SB, BB, UTG, ..., BTN]`.
use rbp_cards::Board;
use rbp_cards::Card;
use rbp_cards::Hand;
use rbp_cards::Hole;
use rbp_cards::Rank;
use rbp_cards::Strength;
use rbp_cards::Street;
use rbp_cards::Suit;
use rbp_core::Chips;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("no current actor")]
    NoActor,
    #[error("not this seat's turn")]
    OutOfTurn,
    #[error("cannot fold, a free check is available")]
    CannotFoldFreeCheck,
    #[error("amount {0} out of legal range")]
    InvalidAmount(Chips),
    #[error("hand is already complete")]
    HandComplete,
}

/// Opaque hand state. Only the rules adapter mutates it; everything else
/// reads it through the accessors below.
#[derive(Debug, Clone)]
pub struct Snapshot {
    stacks: Vec<Chips>,
    street_bets: Vec<Chips>,
    total_bets: Vec<Chips>,
    folded: Vec<bool>,
    all_in: Vec<bool>,
    acted: Vec<bool>,
    holes: Vec<Hole>,
    board: Board,
    deck: Vec<Card>,
    pot: Chips,
    street: Street,
    current_bet: Chips,
    min_raise: Chips,
    actor: Option<usize>,
    sb: Chips,
    bb: Chips,
}

fn shuffled_deck() -> Vec<Card> {
    use rand::seq::SliceRandom;
    let mut deck: Vec<Card> = Rank::all()
        .into_iter()
        .flat_map(|r| Suit::all().into_iter().map(move |s| Card::new(r, s)))
        .collect();
    deck.shuffle(&mut rand::rng());
    deck
}

impl Snapshot {
    /// Deals hole cards and posts blinds/antes for a fresh hand.
    pub fn create_hand(stacks: Vec<Chips>, sb: Chips, bb: Chips, ante: Chips) -> Self {
        let n = stacks.len();
        assert!(n >= 2, "a hand needs at least two seats");
        let mut deck = shuffled_deck();
        let holes: Vec<Hole> = (0..n)
            .map(|_| {
                let a = deck.pop().expect("deck has enough cards");
                let b = deck.pop().expect("deck has enough cards");
                Hole::from((a, b))
            })
            .collect();

        let mut stacks = stacks;
        let mut street_bets = vec![0 as Chips; n];
        let mut pot = 0 as Chips;
        for stack in stacks.iter_mut() {
            let paid = ante.min(*stack);
            *stack -= paid;
            pot += paid;
        }
        let (sb_idx, bb_idx) = if n == 2 { (1, 0) } else { (0, 1) };
        let sb_paid = sb.min(stacks[sb_idx]);
        stacks[sb_idx] -= sb_paid;
        street_bets[sb_idx] = sb_paid;
        let bb_paid = bb.min(stacks[bb_idx]);
        stacks[bb_idx] -= bb_paid;
        street_bets[bb_idx] = bb_paid;

        let actor = Some((bb_idx + 1) % n);
        Self {
            folded: vec![false; n],
            all_in: stacks.iter().map(|s| *s == 0).collect(),
            acted: vec![false; n],
            total_bets: street_bets.clone(),
            street_bets,
            holes,
            board: Board::empty(),
            deck,
            pot,
            street: Street::Pref,
            current_bet: bb,
            min_raise: bb,
            actor,
            sb,
            bb,
            stacks,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
    pub fn stacks(&self) -> &[Chips] {
        &self.stacks
    }
    pub fn bets(&self) -> &[Chips] {
        &self.street_bets
    }
    pub fn total_bets(&self) -> &[Chips] {
        &self.total_bets
    }
    pub fn folded(&self) -> &[bool] {
        &self.folded
    }
    pub fn all_in(&self) -> &[bool] {
        &self.all_in
    }
    pub fn pot(&self) -> Chips {
        self.pot + self.street_bets.iter().sum::<Chips>()
    }
    pub fn street(&self) -> Street {
        self.street
    }
    pub fn current_bet(&self) -> Chips {
        self.current_bet
    }
    pub fn hole_cards(&self, seat: usize) -> Hole {
        self.holes[seat]
    }
    pub fn actor_index(&self) -> Option<usize> {
        self.actor
    }

    fn in_hand(&self, seat: usize) -> bool {
        !self.folded[seat]
    }
    fn can_act(&self, seat: usize) -> bool {
        self.in_hand(seat) && !self.all_in[seat]
    }
    fn active_count(&self) -> usize {
        (0..self.stacks.len()).filter(|&s| self.in_hand(s)).count()
    }

    pub fn checking_or_calling_amount(&self, seat: usize) -> Chips {
        (self.current_bet - self.street_bets[seat]).max(0)
    }
    pub fn can_fold(&self, seat: usize) -> bool {
        self.checking_or_calling_amount(seat) > 0 && self.can_act(seat)
    }
    pub fn can_check_or_call(&self, seat: usize) -> bool {
        self.can_act(seat)
    }
    pub fn min_completion_raise(&self) -> Option<Chips> {
        if self.stacks.iter().enumerate().all(|(s, stack)| {
            !self.can_act(s) || *stack <= self.checking_or_calling_amount(s)
        }) {
            return None;
        }
        Some(self.current_bet + self.min_raise)
    }
    pub fn max_completion_raise(&self, seat: usize) -> Option<Chips> {
        let ceiling = self.street_bets[seat] + self.stacks[seat];
        if ceiling <= self.current_bet {
            None
        } else {
            Some(ceiling)
        }
    }
    pub fn can_bet_or_raise_to(&self, seat: usize, amount: Chips) -> bool {
        match (self.min_completion_raise(), self.max_completion_raise(seat)) {
            (Some(min), Some(max)) => amount >= min.min(max) && amount <= max,
            _ => false,
        }
    }

    fn require_actor(&self, seat: usize) -> Result<(), RulesError> {
        match self.actor {
            Some(a) if a == seat => Ok(()),
            Some(_) => Err(RulesError::OutOfTurn),
            None => Err(RulesError::NoActor),
        }
    }

    pub fn apply_fold(&mut self, seat: usize) -> Result<(), RulesError> {
        self.require_actor(seat)?;
        if self.checking_or_calling_amount(seat) <= 0 {
            return Err(RulesError::CannotFoldFreeCheck);
        }
        self.folded[seat] = true;
        self.acted[seat] = true;
        self.advance_or_close_street(seat);
        Ok(())
    }

    pub fn apply_check_or_call(&mut self, seat: usize) -> Result<(), RulesError> {
        self.require_actor(seat)?;
        let owed = self.checking_or_calling_amount(seat).min(self.stacks[seat]);
        self.stacks[seat] -= owed;
        self.street_bets[seat] += owed;
        self.total_bets[seat] += owed;
        if self.stacks[seat] == 0 {
            self.all_in[seat] = true;
        }
        self.acted[seat] = true;
        self.advance_or_close_street(seat);
        Ok(())
    }

    pub fn apply_complete_bet_or_raise_to(
        &mut self,
        seat: usize,
        amount: Chips,
    ) -> Result<(), RulesError> {
        self.require_actor(seat)?;
        if !self.can_bet_or_raise_to(seat, amount) {
            return Err(RulesError::InvalidAmount(amount));
        }
        let increment = amount - self.current_bet;
        let added = amount - self.street_bets[seat];
        self.stacks[seat] -= added;
        self.street_bets[seat] = amount;
        self.total_bets[seat] += added;
        if self.stacks[seat] == 0 {
            self.all_in[seat] = true;
        }
        self.current_bet = amount;
        self.min_raise = increment.max(self.min_raise);
        self.acted[seat] = true;
        self.advance_or_close_street(seat);
        Ok(())
    }

    /// Moves the actor pointer, or closes the street (and deals the next
    /// one) when betting is settled.
    fn advance_or_close_street(&mut self, seat: usize) {
        let n = self.stacks.len();
        if self.active_count() <= 1 {
            self.actor = None;
            return;
        }
        if !self.is_betting_settled() {
            self.actor = self.next_actor(seat);
            return;
        }
        self.pot += self.street_bets.iter().sum::<Chips>();
        self.street_bets = vec![0; n];
        if self.street == Street::Rive {
            self.actor = None;
            return;
        }
        // Fewer than two seats can still act (the rest are all-in): no more
        // betting is possible, but the board still has to run out before
        // showdown.
        if (0..n).filter(|&s| self.can_act(s)).count() < 2 {
            while self.street != Street::Rive {
                self.deal_next_street();
            }
            self.actor = None;
            return;
        }
        self.deal_next_street();
        self.current_bet = 0;
        self.min_raise = self.bb;
        self.acted = vec![false; n];
        self.actor = self.first_to_act_postflop();
    }

    fn is_betting_settled(&self) -> bool {
        let n = self.stacks.len();
        (0..n).all(|s| {
            !self.can_act(s) || (self.acted[s] && self.street_bets[s] == self.current_bet)
        }) && (0..n).any(|s| self.can_act(s))
    }

    fn next_actor(&self, from: usize) -> Option<usize> {
        let n = self.stacks.len();
        for offset in 1..=n {
            let candidate = (from + offset) % n;
            if candidate == from {
                break;
            }
            if self.can_act(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn first_to_act_postflop(&self) -> Option<usize> {
        let n = self.stacks.len();
        let start = if n == 2 { 0 } else { 0 };
        for offset in 0..n {
            let candidate = (start + offset) % n;
            if self.can_act(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn deal_next_street(&mut self) {
        let burn = self.deck.pop();
        debug_assert!(burn.is_some(), "burn card available");
        let reveal = match self.street {
            Street::Pref => 3,
            Street::Flop => 1,
            Street::Turn => 1,
            Street::Rive => 0,
        };
        let mut dealt = Hand::empty();
        for _ in 0..reveal {
            if let Some(card) = self.deck.pop() {
                dealt = Hand::add(dealt, Hand::from(card.bit()));
            }
        }
        self.board.add(dealt);
        if self.street != Street::Rive {
            self.street = self.street.next();
        }
    }

    pub fn is_hand_complete(&self) -> bool {
        self.actor.is_none()
    }

    /// Runs the showdown evaluator for a seat still in the hand. Only
    /// meaningful once the river is dealt (board + hole = 7 cards).
    pub fn strength(&self, seat: usize) -> Strength {
        let hole = Hand::from(self.holes[seat]);
        let board = Hand::from(self.board.clone());
        Strength::from(Hand::add(hole, board))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heads_up_preflop_closes_after_sb_calls_and_bb_checks() {
        let mut hand = Snapshot::create_hand(vec![1000, 1000], 5, 10, 0);
        let sb = hand.actor_index().unwrap();
        hand.apply_check_or_call(sb).unwrap();
        assert!(!hand.is_hand_complete());
        let bb = hand.actor_index().unwrap();
        hand.apply_check_or_call(bb).unwrap();
        assert_eq!(hand.street(), Street::Flop);
        assert!(!hand.is_hand_complete());
    }

    #[test]
    fn new_street_requires_fresh_action_even_with_matched_bets() {
        let mut hand = Snapshot::create_hand(vec![1000, 1000, 1000], 5, 10, 0);
        while hand.street() == Street::Pref {
            let actor = hand.actor_index().unwrap();
            hand.apply_check_or_call(actor).unwrap();
        }
        assert_eq!(hand.street(), Street::Flop);
        let first = hand.actor_index().unwrap();
        assert!(!hand.is_betting_settled());
        hand.apply_check_or_call(first).unwrap();
        assert_eq!(hand.street(), Street::Flop, "street shouldn't close after only one of three checks");
    }

    #[test]
    fn raise_requires_others_to_act_again() {
        let mut hand = Snapshot::create_hand(vec![1000, 1000, 1000], 5, 10, 0);
        let utg = hand.actor_index().unwrap();
        hand.apply_complete_bet_or_raise_to(utg, 30).unwrap();
        let sb = hand.actor_index().unwrap();
        hand.apply_fold(sb).unwrap();
        let bb = hand.actor_index().unwrap();
        hand.apply_check_or_call(bb).unwrap();
        assert_eq!(hand.street(), Street::Flop);
    }

    #[test]
    fn folding_to_one_player_ends_hand_without_showdown() {
        let mut hand = Snapshot::create_hand(vec![1000, 1000], 5, 10, 0);
        let sb = hand.actor_index().unwrap();
        hand.apply_fold(sb).unwrap();
        assert!(hand.is_hand_complete());
    }

    #[test]
    fn out_of_turn_is_rejected() {
        let mut hand = Snapshot::create_hand(vec![1000, 1000], 5, 10, 0);
        let actor = hand.actor_index().unwrap();
        let other = (actor + 1) % 2;
        assert_eq!(
            hand.apply_check_or_call(other),
            Err(RulesError::OutOfTurn)
        );
    }

    #[test]
    fn all_in_before_river_runs_the_board_out() {
        let mut hand = Snapshot::create_hand(vec![100, 100], 5, 10, 0);
        let sb = hand.actor_index().unwrap();
        let max = hand.max_completion_raise(sb).unwrap();
        hand.apply_complete_bet_or_raise_to(sb, max).unwrap();
        let bb = hand.actor_index().unwrap();
        hand.apply_check_or_call(bb).unwrap();
        assert!(hand.is_hand_complete());
        assert_eq!(Hand::from(*hand.board()).size(), 5);
    }

    #[test]
    fn cannot_fold_a_free_check() {
        let mut hand = Snapshot::create_hand(vec![1000, 1000, 1000], 5, 10, 0);
        while hand.street() == Street::Pref {
            let actor = hand.actor_index().unwrap();
            hand.apply_check_or_call(actor).unwrap();
        }
        let first = hand.actor_index().unwrap();
        assert_eq!(
            hand.apply_fold(first),
            Err(RulesError::CannotFoldFreeCheck)
        );
    }
}
