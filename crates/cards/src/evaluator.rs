use super::card::Card;
use super::hand::Hand;
use super::kicks::Kickers;
use super::rank::Rank;
use super::ranking::Ranking;

/// Brute-force best-hand evaluator.
///
/// Given 5 to 7 cards, checks every 5-card subset and keeps the strongest
/// `(Ranking, Kickers)` pair. With at most `C(7,5) = 21` subsets this is
/// simple and fast enough not to need a lookup table.
pub struct Evaluator {
    best: (Ranking, Kickers),
}

impl From<Hand> for Evaluator {
    fn from(hand: Hand) -> Self {
        let cards = Vec::<Card>::from(hand);
        assert!(cards.len() >= 5, "evaluator needs at least 5 cards");
        let best = combinations(&cards, 5)
            .into_iter()
            .map(|five| evaluate_five(&five))
            .max()
            .expect("at least one 5-card combination");
        Self { best }
    }
}

impl Evaluator {
    pub fn find_ranking(&self) -> Ranking {
        self.best.0
    }
    pub fn find_kickers(&self, _ranking: Ranking) -> Kickers {
        self.best.1
    }
}

/// All size-`k` subsets of `cards`, order-independent.
fn combinations(cards: &[Card], k: usize) -> Vec<Vec<Card>> {
    if k == 0 {
        return vec![vec![]];
    }
    if cards.len() < k {
        return vec![];
    }
    let mut out = Vec::new();
    for i in 0..cards.len() {
        let rest = combinations(&cards[i + 1..], k - 1);
        for mut tail in rest {
            tail.insert(0, cards[i]);
            out.push(tail);
        }
    }
    out
}

fn evaluate_five(cards: &[Card]) -> (Ranking, Kickers) {
    debug_assert_eq!(cards.len(), 5);
    let mut ranks: Vec<Rank> = cards.iter().map(|c| c.rank()).collect();
    ranks.sort_by(|a, b| b.cmp(a));

    let flush = cards.windows(2).all(|w| w[0].suit() == w[1].suit());
    let (straight, straight_high) = detect_straight(&ranks);

    let mut groups: Vec<(Rank, u8)> = Vec::new();
    for &rank in &ranks {
        if let Some(entry) = groups.iter_mut().find(|(r, _)| *r == rank) {
            entry.1 += 1;
        } else {
            groups.push((rank, 1));
        }
    }
    groups.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

    let kickers_for = |ranks: Vec<Rank>| Kickers::new(ranks);

    if straight && flush {
        return (Ranking::StraightFlush, kickers_for(vec![straight_high]));
    }
    if groups[0].1 == 4 {
        let kicker = groups[1].0;
        return (Ranking::Quads, kickers_for(vec![groups[0].0, kicker]));
    }
    if groups[0].1 == 3 && groups.len() > 1 && groups[1].1 == 2 {
        return (Ranking::FullHouse, kickers_for(vec![groups[0].0, groups[1].0]));
    }
    if flush {
        return (Ranking::Flush, kickers_for(ranks));
    }
    if straight {
        return (Ranking::Straight, kickers_for(vec![straight_high]));
    }
    if groups[0].1 == 3 {
        let mut kicks = vec![groups[0].0];
        kicks.extend(groups[1..].iter().map(|(r, _)| *r));
        return (Ranking::Trips, kickers_for(kicks));
    }
    if groups[0].1 == 2 && groups.len() > 1 && groups[1].1 == 2 {
        let kicker = groups[2].0;
        return (
            Ranking::TwoPair,
            kickers_for(vec![groups[0].0, groups[1].0, kicker]),
        );
    }
    if groups[0].1 == 2 {
        let mut kicks = vec![groups[0].0];
        kicks.extend(groups[1..].iter().map(|(r, _)| *r));
        return (Ranking::Pair, kickers_for(kicks));
    }
    (Ranking::HighCard, kickers_for(ranks))
}

/// Detects a 5-card straight, including the wheel (A-2-3-4-5), returning
/// `(is_straight, high_card_rank)`.
fn detect_straight(sorted_desc: &[Rank]) -> (bool, Rank) {
    let mut unique: Vec<u8> = sorted_desc.iter().map(|r| u8::from(*r)).collect();
    unique.dedup();
    if unique.len() != 5 {
        return (false, Rank::Two);
    }
    if unique[0] - unique[4] == 4 {
        return (true, Rank::from(unique[0]));
    }
    let is_wheel = unique == [12, 3, 2, 1, 0];
    if is_wheel {
        return (true, Rank::Five);
    }
    (false, Rank::Two)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::suit::Suit;

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn detects_straight_flush() {
        let cards = vec![
            card(Rank::Nine, Suit::S),
            card(Rank::Eight, Suit::S),
            card(Rank::Seven, Suit::S),
            card(Rank::Six, Suit::S),
            card(Rank::Five, Suit::S),
        ];
        let (ranking, _) = evaluate_five(&cards);
        assert_eq!(ranking, Ranking::StraightFlush);
    }

    #[test]
    fn detects_wheel_straight() {
        let cards = vec![
            card(Rank::Ace, Suit::S),
            card(Rank::Two, Suit::H),
            card(Rank::Three, Suit::D),
            card(Rank::Four, Suit::C),
            card(Rank::Five, Suit::S),
        ];
        let (ranking, kickers) = evaluate_five(&cards);
        assert_eq!(ranking, Ranking::Straight);
        assert_eq!(kickers.ranks()[0], Rank::Five);
    }

    #[test]
    fn detects_full_house() {
        let cards = vec![
            card(Rank::King, Suit::S),
            card(Rank::King, Suit::H),
            card(Rank::King, Suit::D),
            card(Rank::Two, Suit::C),
            card(Rank::Two, Suit::S),
        ];
        let (ranking, _) = evaluate_five(&cards);
        assert_eq!(ranking, Ranking::FullHouse);
    }

    #[test]
    fn seven_card_picks_best_five() {
        let hand = Hand::try_from("AsKsQsJsTs2h3d").unwrap();
        let eval = Evaluator::from(hand);
        assert_eq!(eval.find_ranking(), Ranking::StraightFlush);
    }

    #[test]
    fn high_card_beats_nothing_but_itself() {
        let cards = vec![
            card(Rank::Ace, Suit::S),
            card(Rank::King, Suit::H),
            card(Rank::Nine, Suit::D),
            card(Rank::Five, Suit::C),
            card(Rank::Two, Suit::S),
        ];
        let (ranking, _) = evaluate_five(&cards);
        assert_eq!(ranking, Ranking::HighCard);
    }
}
