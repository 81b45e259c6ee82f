//! Target allocations: validated, normalized weight vectors.

use std::fmt;

use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::AllocationError;
use crate::types::Symbol;

/// Largest deviation of the weight sum from 1.0 accepted without normalizing.
pub const SUM_TOLERANCE: f64 = 0.001;

/// Desired fraction of portfolio value per asset.
///
/// Fractions are finite, non-negative, and sum to 1.0 (within
/// [`SUM_TOLERANCE`]). Entry order is preserved; the planner emits trades
/// in this order within each side.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetAllocation {
    weights: Vec<(Symbol, f64)>,
}

impl TargetAllocation {
    /// Validate `weights` and normalize them if they do not sum to 1.0.
    pub fn new(weights: Vec<(Symbol, f64)>) -> Result<Self, AllocationError> {
        if weights.is_empty() {
            return Err(AllocationError::Empty);
        }

        let mut seen = FxHashSet::default();
        for &(symbol, value) in &weights {
            if !seen.insert(symbol) {
                return Err(AllocationError::Duplicate(symbol));
            }
            if !value.is_finite() || value < 0.0 {
                return Err(AllocationError::InvalidFraction { symbol, value });
            }
        }

        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Err(AllocationError::ZeroSum);
        }

        let mut allocation = Self { weights };
        if (total - 1.0).abs() > SUM_TOLERANCE {
            warn!("Target allocation sums to {total:.4}, normalizing");
            allocation.scale(1.0 / total);
        }
        Ok(allocation)
    }

    /// Build from a map; entries are ordered by symbol.
    pub fn from_map(map: &FxHashMap<Symbol, f64>) -> Result<Self, AllocationError> {
        let mut weights: Vec<(Symbol, f64)> = map.iter().map(|(s, w)| (*s, *w)).collect();
        weights.sort_by_key(|(s, _)| *s);
        Self::new(weights)
    }

    fn scale(&mut self, factor: f64) {
        for (_, w) in &mut self.weights {
            *w *= factor;
        }
    }

    /// Weight for `symbol`, zero when absent.
    pub fn weight(&self, symbol: &Symbol) -> f64 {
        self.weights
            .iter()
            .find(|(s, _)| s == symbol)
            .map_or(0.0, |(_, w)| *w)
    }

    pub fn weights(&self) -> &[(Symbol, f64)] {
        &self.weights
    }

    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.weights.iter().map(|(s, _)| *s)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.weights.iter().any(|(s, _)| s == symbol)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().map(|(_, w)| w).sum()
    }

    /// Clamp every weight into `[min, max]` and renormalize.
    ///
    /// The input is normalized first, so a suggestion that does not sum to
    /// one is judged by its proportions. After the final renormalization
    /// weights can sit slightly outside the bounds.
    pub fn clamped(&self, min: f64, max: f64) -> Self {
        let mut clamped = self.clone();
        let total = clamped.sum();
        if total > 0.0 && (total - 1.0).abs() > f64::EPSILON {
            clamped.scale(1.0 / total);
        }
        for (symbol, w) in &mut clamped.weights {
            if *w < min {
                warn!("Weight {w:.3} for {symbol} below minimum, raising to {min:.2}");
                *w = min;
            } else if *w > max {
                warn!("Weight {w:.3} for {symbol} above maximum, lowering to {max:.2}");
                *w = max;
            }
        }
        let total = clamped.sum();
        if total > 0.0 {
            clamped.scale(1.0 / total);
        }
        clamped
    }

    /// Scale every non-quote weight by `factor` and move the freed weight
    /// to `quote` (added as a new entry if absent).
    pub fn derisked(&self, factor: f64, quote: Symbol) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let mut out = self.clone();
        let mut freed = 0.0;
        for (symbol, w) in &mut out.weights {
            if *symbol != quote {
                freed += *w * (1.0 - factor);
                *w *= factor;
            }
        }
        match out.weights.iter_mut().find(|(s, _)| *s == quote) {
            Some((_, w)) => *w += freed,
            None => out.weights.push((quote, freed)),
        }
        out
    }

    /// Largest absolute per-asset weight change between two allocations.
    pub fn max_change(&self, other: &TargetAllocation) -> f64 {
        self.symbols()
            .chain(other.symbols())
            .map(|s| (self.weight(&s) - other.weight(&s)).abs())
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for TargetAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .weights
            .iter()
            .map(|(s, w)| format!("{s}: {:.1}%", w * 100.0))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> Symbol {
        Symbol::new("USDC")
    }
    fn weth() -> Symbol {
        Symbol::new("WETH")
    }
    fn wbtc() -> Symbol {
        Symbol::new("WBTC")
    }

    #[test]
    fn accepts_within_tolerance_unchanged() {
        let alloc = TargetAllocation::new(vec![(usdc(), 0.5), (weth(), 0.5005)]).unwrap();
        assert_eq!(alloc.weight(&weth()), 0.5005);
    }

    #[test]
    fn normalizes_outside_tolerance() {
        let alloc = TargetAllocation::new(vec![(usdc(), 1.0), (weth(), 3.0)]).unwrap();
        assert!((alloc.weight(&usdc()) - 0.25).abs() < 1e-12);
        assert!((alloc.weight(&weth()) - 0.75).abs() < 1e-12);
        assert!((alloc.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(TargetAllocation::new(vec![]), Err(AllocationError::Empty));
        assert_eq!(
            TargetAllocation::new(vec![(usdc(), 0.0)]),
            Err(AllocationError::ZeroSum)
        );
        assert!(matches!(
            TargetAllocation::new(vec![(usdc(), -0.1), (weth(), 1.1)]),
            Err(AllocationError::InvalidFraction { .. })
        ));
        assert!(matches!(
            TargetAllocation::new(vec![(usdc(), f64::NAN)]),
            Err(AllocationError::InvalidFraction { .. })
        ));
        assert_eq!(
            TargetAllocation::new(vec![(usdc(), 0.5), (usdc(), 0.5)]),
            Err(AllocationError::Duplicate(usdc()))
        );
    }

    #[test]
    fn clamp_to_bounds_then_renormalize() {
        let suggestion =
            TargetAllocation::new(vec![(usdc(), 0.01), (weth(), 0.90), (wbtc(), 0.09)]).unwrap();
        let clamped = suggestion.clamped(0.05, 0.70);
        // 0.05 + 0.70 + 0.09 = 0.84 → renormalized
        assert!((clamped.sum() - 1.0).abs() < 1e-12);
        assert!((clamped.weight(&usdc()) - 0.05 / 0.84).abs() < 1e-12);
        assert!((clamped.weight(&weth()) - 0.70 / 0.84).abs() < 1e-12);
    }

    #[test]
    fn derisk_moves_weight_to_quote() {
        let alloc = TargetAllocation::new(vec![(usdc(), 0.2), (weth(), 0.8)]).unwrap();
        let halved = alloc.derisked(0.5, usdc());
        assert!((halved.weight(&weth()) - 0.4).abs() < 1e-12);
        assert!((halved.weight(&usdc()) - 0.6).abs() < 1e-12);
        assert!((halved.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn derisk_adds_missing_quote() {
        let alloc = TargetAllocation::new(vec![(weth(), 1.0)]).unwrap();
        let halved = alloc.derisked(0.5, usdc());
        assert_eq!(halved.weight(&usdc()), 0.5);
        assert_eq!(halved.len(), 2);
    }

    #[test]
    fn max_change_covers_both_sides() {
        let a = TargetAllocation::new(vec![(usdc(), 0.5), (weth(), 0.5)]).unwrap();
        let b = TargetAllocation::new(vec![(usdc(), 0.4), (wbtc(), 0.6)]).unwrap();
        assert!((a.max_change(&b) - 0.6).abs() < 1e-12);
    }
}
