//! Target → trades planner and drift report.
//!
//! Computes the trades needed to move a valued portfolio to its target
//! weights. Trades are sized in asset units at the snapshot price; the
//! caller decides how each leg is funded.

use std::fmt;

use log::{debug, warn};

use crate::allocation::TargetAllocation;
use crate::side::Side;
use crate::snapshot::PortfolioSnapshot;
use crate::types::Symbol;

/// A single rebalancing trade.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannedTrade {
    pub symbol: Symbol,
    pub side: Side,
    /// Quantity of `symbol` to buy or sell.
    pub amount: f64,
    /// Snapshot price used to size the trade.
    pub price: f64,
    pub current_weight: f64,
    pub target_weight: f64,
    /// `current_weight - target_weight`; positive means overweight.
    pub weight_diff: f64,
}

impl PlannedTrade {
    /// Trade value in quote terms.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.amount * self.price
    }
}

impl fmt::Display for PlannedTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:4} {:>14.6} {:8} @ ${:.2} (${:.2}, {:.1}% → {:.1}%)",
            self.side,
            self.amount,
            self.symbol,
            self.price,
            self.notional(),
            self.current_weight * 100.0,
            self.target_weight * 100.0,
        )
    }
}

/// Compute the trades that bring `snapshot` to `target`.
///
/// Assets whose weight is within `threshold` of the target, or that have no
/// positive price, are skipped. All sells come before all buys; within a
/// side the target's order is kept.
pub fn plan_trades(
    target: &TargetAllocation,
    snapshot: &PortfolioSnapshot,
    threshold: f64,
) -> Vec<PlannedTrade> {
    let total = snapshot.total_value();
    if total <= 0.0 {
        warn!("Portfolio value is zero; no trades planned");
        return Vec::new();
    }

    let mut trades = Vec::new();

    for &(symbol, target_weight) in target.weights() {
        let current_value = snapshot.value_of(&symbol);
        let current_weight = current_value / total;
        let weight_diff = current_weight - target_weight;

        if weight_diff.abs() < threshold {
            continue;
        }

        let price = snapshot.price_of(&symbol);
        if price <= 0.0 {
            debug!("Skipping {symbol}: no price");
            continue;
        }

        let target_value = total * target_weight;
        let amount = (current_value - target_value).abs() / price;
        if amount == 0.0 {
            debug!("Skipping {symbol}: trade amount rounds to zero");
            continue;
        }

        let side = if weight_diff > 0.0 { Side::Sell } else { Side::Buy };

        trades.push(PlannedTrade {
            symbol,
            side,
            amount,
            price,
            current_weight,
            target_weight,
            weight_diff,
        });
    }

    // stable: keeps target order within each side
    trades.sort_by_key(|t| t.side.execution_rank());
    trades
}

/// Per-asset comparison of actual and target weights.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriftEntry {
    pub symbol: Symbol,
    pub current_weight: f64,
    pub target_weight: f64,
    pub weight_diff: f64,
}

/// Drift of a portfolio from its target.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriftReport {
    pub entries: Vec<DriftEntry>,
    /// Root mean square of the weight diffs, in percent.
    pub tracking_error_pct: f64,
}

impl DriftReport {
    /// Largest absolute weight diff.
    pub fn max_abs_diff(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.weight_diff.abs())
            .fold(0.0, f64::max)
    }

    /// Largest absolute weight diff among assets in `target`. Untargeted
    /// holdings are left out since the planner never trades them.
    pub fn max_target_diff(&self, target: &TargetAllocation) -> f64 {
        self.entries
            .iter()
            .filter(|e| target.contains(&e.symbol))
            .map(|e| e.weight_diff.abs())
            .fold(0.0, f64::max)
    }

    /// Whether any asset has drifted at least `limit` from its target.
    pub fn exceeds(&self, limit: f64) -> bool {
        self.entries.iter().any(|e| e.weight_diff.abs() >= limit)
    }
}

/// Compare `snapshot` against `target` for every asset in either.
///
/// Target assets come first in target order, followed by held assets
/// without a target (target weight 0).
pub fn drift(target: &TargetAllocation, snapshot: &PortfolioSnapshot) -> DriftReport {
    let total = snapshot.total_value();
    let weight_of = |symbol: &Symbol| {
        if total > 0.0 {
            snapshot.value_of(symbol) / total
        } else {
            0.0
        }
    };

    let mut symbols: Vec<Symbol> = target.symbols().collect();
    symbols.extend(snapshot.symbols().filter(|s| !target.contains(s)));

    let entries: Vec<DriftEntry> = symbols
        .into_iter()
        .map(|symbol| {
            let current_weight = weight_of(&symbol);
            let target_weight = target.weight(&symbol);
            DriftEntry {
                symbol,
                current_weight,
                target_weight,
                weight_diff: current_weight - target_weight,
            }
        })
        .collect();

    let sum_sq: f64 = entries.iter().map(|e| e.weight_diff * e.weight_diff).sum();
    let tracking_error_pct = (sum_sq / entries.len().max(1) as f64).sqrt() * 100.0;

    DriftReport {
        entries,
        tracking_error_pct,
    }
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DRIFT:")?;
        writeln!(
            f,
            "  {:8} {:>10} {:>10} {:>10}",
            "Asset", "Target%", "Actual%", "Diff%"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "  {:8} {:>9.2}% {:>9.2}% {:>+9.2}%",
                e.symbol,
                e.target_weight * 100.0,
                e.current_weight * 100.0,
                e.weight_diff * 100.0,
            )?;
        }
        writeln!(f, "\n  Tracking error: {:.3}%", self.tracking_error_pct)
    }
}
