use super::card::Card;

/// A set of cards represented as a 52-bit mask.
///
/// Bit layout matches [`super::card::Card::index`]: each of the 13 ranks
/// occupies a 4-bit nibble, and within a nibble each suit occupies one bit
/// (see [`super::suit::Suit`]'s `u64` conversion). A `Hand` has no notion of
/// ordering among its cards; [`super::hole::Hole`] and [`super::board::Board`]
/// layer size constraints on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hand(u64);

impl Hand {
    /// The empty hand (no cards).
    pub fn empty() -> Self {
        Self(0)
    }
    /// Full 52-bit mask covering every card in a standard deck.
    pub const fn mask() -> u64 {
        0x000F_FFFF_FFFF_FFFF
    }
    /// Unions two disjoint hands. Panics (debug builds) on overlap.
    pub fn add(a: Hand, b: Hand) -> Hand {
        debug_assert!(a.0 & b.0 == 0, "overlapping cards");
        Self(a.0 | b.0)
    }
    /// Removes `other`'s cards from `self`.
    pub fn remove(&self, other: Hand) -> Hand {
        Self(self.0 & !other.0)
    }
    /// True if `self` contains every card in `other`.
    pub fn contains(&self, other: Hand) -> bool {
        self.0 & other.0 == other.0
    }
    /// Number of cards in the hand.
    pub fn size(&self) -> usize {
        self.0.count_ones() as usize
    }
    /// Bitwise complement within the 52-card universe.
    pub fn complement(&self) -> Hand {
        Self(!self.0 & Self::mask())
    }
}

impl From<u64> for Hand {
    fn from(bits: u64) -> Self {
        debug_assert!(bits & !Self::mask() == 0, "bits outside 52-card mask");
        Self(bits)
    }
}
impl From<Hand> for u64 {
    fn from(hand: Hand) -> u64 {
        hand.0
    }
}

impl From<Vec<Card>> for Hand {
    fn from(cards: Vec<Card>) -> Self {
        cards.into_iter().fold(Hand::empty(), |acc, c| {
            Hand::add(acc, Hand::from(c.bit()))
        })
    }
}
impl From<Hand> for Vec<Card> {
    fn from(hand: Hand) -> Self {
        (0..52)
            .filter(|i| hand.0 & (1 << i) != 0)
            .map(|i| Card::try_from(1u64 << i).expect("single bit"))
            .collect()
    }
}

impl TryFrom<&str> for Hand {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let chars: Vec<char> = s.trim().chars().collect();
        if chars.len() % 2 != 0 {
            return Err(format!("odd-length hand string: {}", s));
        }
        let mut hand = Hand::empty();
        for pair in chars.chunks(2) {
            let token: String = pair.iter().collect();
            let card = Card::try_from(token.as_str())?;
            if hand.contains(Hand::from(card.bit())) {
                return Err(format!("duplicate card in hand string: {}", token));
            }
            hand = Hand::add(hand, Hand::from(card.bit()));
        }
        Ok(hand)
    }
}

impl std::fmt::Display for Hand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            Vec::<Card>::from(*self)
                .into_iter()
                .map(|c| c.to_string())
                .collect::<Vec<String>>()
                .join("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(Hand::empty().size(), 0);
    }

    #[test]
    fn add_remove_roundtrip() {
        let a = Hand::from(0b0011u64);
        let b = Hand::from(0b1100u64);
        let union = Hand::add(a, b);
        assert_eq!(union.size(), 4);
        assert_eq!(union.remove(b), a);
    }

    #[test]
    fn complement_is_involution() {
        let hand = Hand::from(0b1010u64);
        assert_eq!(hand.complement().complement(), hand);
    }

    #[test]
    fn str_roundtrip() {
        let hand = Hand::try_from("AsKhQd").unwrap();
        assert_eq!(hand.size(), 3);
        assert!(Hand::try_from("AsAs").is_err());
    }
}
