//! Point-in-time valuation of the portfolio.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::types::Symbol;

/// One asset's row in a [`PortfolioSnapshot`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Holding {
    pub balance: f64,
    pub price: f64,
    pub value: f64,
    /// Fraction of total portfolio value.
    pub allocation: f64,
}

/// Balances valued at current prices.
///
/// `total_value` is the sum of every holding's `value`; allocations sum to
/// 1.0 whenever the total is positive and are all zero otherwise.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioSnapshot {
    holdings: Vec<(Symbol, Holding)>,
    total_value: f64,
}

impl PortfolioSnapshot {
    /// Value `balances` at `prices`. Assets without a price are valued at 0.
    ///
    /// Holdings keep the order of `balances`.
    pub fn new(balances: &[(Symbol, f64)], prices: &FxHashMap<Symbol, f64>) -> Self {
        let mut holdings: Vec<(Symbol, Holding)> = balances
            .iter()
            .map(|&(symbol, balance)| {
                let price = prices.get(&symbol).copied().unwrap_or(0.0);
                (
                    symbol,
                    Holding {
                        balance,
                        price,
                        value: balance * price,
                        allocation: 0.0,
                    },
                )
            })
            .collect();

        let total_value: f64 = holdings.iter().map(|(_, h)| h.value).sum();
        if total_value > 0.0 {
            for (_, holding) in &mut holdings {
                holding.allocation = holding.value / total_value;
            }
        }

        Self {
            holdings,
            total_value,
        }
    }

    pub fn total_value(&self) -> f64 {
        self.total_value
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Holding> {
        self.holdings
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, h)| h)
    }

    /// Current value of `symbol`, zero when not held.
    pub fn value_of(&self, symbol: &Symbol) -> f64 {
        self.get(symbol).map_or(0.0, |h| h.value)
    }

    /// Current price of `symbol`, zero when unknown.
    pub fn price_of(&self, symbol: &Symbol) -> f64 {
        self.get(symbol).map_or(0.0, |h| h.price)
    }

    /// Current weights as (symbol, allocation) pairs.
    pub fn weights(&self) -> Vec<(Symbol, f64)> {
        self.holdings
            .iter()
            .map(|(s, h)| (*s, h.allocation))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Holding)> {
        self.holdings.iter().map(|(s, h)| (s, h))
    }

    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.holdings.iter().map(|(s, _)| *s)
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

impl fmt::Display for PortfolioSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PORTFOLIO: ${:.2}", self.total_value)?;
        for (symbol, h) in &self.holdings {
            writeln!(
                f,
                "  {:8} {:>16.6} @ ${:>10.2} = ${:>12.2}  ({:.1}%)",
                symbol,
                h.balance,
                h.price,
                h.value,
                h.allocation * 100.0,
            )?;
        }
        Ok(())
    }
}
