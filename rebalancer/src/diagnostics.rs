//! Offline diagnostics behind the `signals` and `risk-check` commands.

use std::fmt;

use ballast::{Observations, Side, Signal, Signals, StrategySet, Symbol};
use ballast_risk::{RiskConfig, RiskGate, RiskMetrics, RiskReport};
use chrono::{DateTime, TimeDelta, Utc};
use rustc_hash::FxHashMap;

/// Per-strategy and combined signals plus each strategy's allocation.
#[derive(Debug, Clone)]
pub struct SignalReport {
    pub observations: Observations,
    pub combined: Signals,
    pub strategies: Vec<StrategyView>,
}

#[derive(Debug, Clone)]
pub struct StrategyView {
    pub name: String,
    pub signals: Signals,
    pub allocation: FxHashMap<Symbol, f64>,
}

pub fn signal_report(
    strategies: &StrategySet,
    observations: Observations,
    portfolio_value: f64,
) -> SignalReport {
    let combined = strategies.combined_signals(&observations);
    let views = strategies
        .signals_by_strategy(&observations)
        .into_iter()
        .map(|(name, signals)| StrategyView {
            name: name.to_string(),
            allocation: strategies
                .allocation_for(name, &observations, portfolio_value)
                .unwrap_or_default(),
            signals,
        })
        .collect();
    SignalReport {
        observations,
        combined,
        strategies: views,
    }
}

fn sorted<V: Copy>(map: &FxHashMap<Symbol, V>) -> Vec<(Symbol, V)> {
    let mut rows: Vec<(Symbol, V)> = map.iter().map(|(s, v)| (*s, *v)).collect();
    rows.sort_by_key(|(s, _)| *s);
    rows
}

impl fmt::Display for SignalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MARKET DATA:")?;
        let mut symbols: Vec<&Symbol> = self.observations.keys().collect();
        symbols.sort();
        for symbol in symbols {
            let obs = &self.observations[symbol];
            writeln!(
                f,
                "  {:8} ${:>12.2}  24h {:>+7.2}%  7d {:>+7.2}%  30d {:>+7.2}%",
                symbol, obs.price, obs.change_24h_pct, obs.change_7d_pct, obs.change_30d_pct
            )?;
        }

        writeln!(f, "\nCOMBINED SIGNALS:")?;
        for (symbol, signal) in sorted(&self.combined) {
            writeln!(f, "  {symbol:8} {signal}")?;
        }

        for view in &self.strategies {
            writeln!(f, "\n{} STRATEGY:", view.name.to_uppercase())?;
            for (symbol, signal) in sorted(&view.signals) {
                if signal != Signal::Hold {
                    writeln!(f, "  {symbol:8} {signal}")?;
                }
            }
            for (symbol, weight) in sorted(&view.allocation) {
                writeln!(f, "  {symbol:8} {:>6.1}%", weight * 100.0)?;
            }
        }
        Ok(())
    }
}

/// Result of replaying sample trades through a fresh risk gate.
#[derive(Debug, Clone)]
pub struct RiskSelfTest {
    pub metrics: RiskMetrics,
    pub validation: RiskReport,
    pub reduce_risk: bool,
    pub emergency_stop: bool,
}

impl fmt::Display for RiskSelfTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.metrics)?;
        write!(f, "{}", self.validation)?;
        writeln!(
            f,
            "Trade validation: {}",
            self.validation.reason().unwrap_or_else(|| "approved".into())
        )?;
        writeln!(f, "Should reduce risk: {}", self.reduce_risk)?;
        writeln!(f, "Emergency stop: {}", self.emergency_stop)
    }
}

/// Record four sample trades a minute apart, then validate a WETH buy
/// worth 2000 against a 10000 portfolio.
pub fn risk_self_test(config: RiskConfig, now: DateTime<Utc>) -> Result<RiskSelfTest, String> {
    let mut gate = RiskGate::try_new(config)?;
    let weth = Symbol::new("WETH");
    let wbtc = Symbol::new("WBTC");
    let samples = [
        (weth, Side::Buy, 0.5, 2000.0, true),
        (wbtc, Side::Buy, 0.1, 45000.0, true),
        (weth, Side::Sell, 0.2, 2100.0, true),
        (wbtc, Side::Sell, 0.05, 44000.0, false),
    ];

    let start = now - TimeDelta::minutes(samples.len() as i64 + 1);
    for (i, (symbol, side, amount, price, success)) in samples.into_iter().enumerate() {
        let at = start + TimeDelta::minutes(i as i64);
        gate.record_trade_at(at, symbol, side, amount, price, success, "risk self-test");
    }

    let validation = gate.validate_trade_at(now, weth, Side::Buy, 1.0, 2000.0, 10_000.0);
    Ok(RiskSelfTest {
        metrics: gate.metrics_at(now),
        reduce_risk: gate.should_reduce_risk_at(now),
        emergency_stop: gate.emergency_stop_at(now),
        validation,
    })
}
