//! Discrete trading signals.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::types::Symbol;

/// One strategy's opinion about one asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Tie-break precedence used when votes are equal: buy, then sell, then hold.
    pub const PRECEDENCE: [Signal; 3] = [Signal::Buy, Signal::Sell, Signal::Hold];

    pub(crate) fn index(self) -> usize {
        match self {
            Signal::Buy => 0,
            Signal::Sell => 1,
            Signal::Hold => 2,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "buy"),
            Signal::Sell => write!(f, "sell"),
            Signal::Hold => write!(f, "hold"),
        }
    }
}

/// Signals for a set of assets.
pub type Signals = FxHashMap<Symbol, Signal>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_matches_index() {
        for (i, s) in Signal::PRECEDENCE.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn display() {
        assert_eq!(Signal::Buy.to_string(), "buy");
        assert_eq!(Signal::Hold.to_string(), "hold");
    }
}
