use crate::pnl::PnL;
use crate::pnl::State;
use rbp_cards::Strength;
use rbp_core::Chips;

/// One seat's stake and showdown strength, consumed by [`crate::Showdown`]
/// and produced back out with `pnl().reward()` set.
#[derive(Debug, Clone, Copy)]
pub struct Settlement {
    pnl: PnL,
    strength: Strength,
}

impl Settlement {
    pub fn pnl(&self) -> &PnL {
        &self.pnl
    }
    pub fn strength(&self) -> &Strength {
        &self.strength
    }
    pub fn add(&mut self, amount: Chips) {
        self.pnl.add(amount);
    }
}

impl From<(Chips, State, Strength)> for Settlement {
    fn from((risked, status, strength): (Chips, State, Strength)) -> Self {
        Self {
            pnl: PnL::new(risked, status),
            strength,
        }
    }
}
