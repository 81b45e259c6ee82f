//! Stateful pre-trade risk gate for ballast.
//!
//! The gate owns the trade log and the daily P&L table for the life of the
//! process. It approves or rejects each prospective trade, records every
//! attempt, and reports the reduce-risk and emergency-stop conditions.
//! Enforcing those conditions is the caller's job.
//!
//! Every time-dependent operation has an `_at` form taking the current time
//! explicitly; the plain form reads the wall clock.

pub mod checks;
pub mod config;
pub mod daily;
pub mod history;
pub mod report;

pub use checks::PositionKind;
pub use config::RiskConfig;
pub use daily::{DailyEntry, DailyPnl};
pub use history::{TradeLog, TradeRecord, TradeStats};
pub use report::{RiskCheck, RiskReport, RiskStatus};

use ballast::{Side, Symbol};
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;

/// Rolling statistics plus today's P&L.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RiskMetrics {
    #[serde(flatten)]
    pub window: TradeStats,
    /// Today's P&L fraction, if today has been valued.
    pub daily_pnl: Option<f64>,
    /// Today's P&L in quote terms.
    pub daily_pnl_value: Option<f64>,
}

impl std::fmt::Display for RiskMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "RISK METRICS (24h):")?;
        writeln!(
            f,
            "  Trades: {} ({} ok, {} failed, {:.0}% success)",
            self.window.total_trades,
            self.window.successful_trades,
            self.window.failed_trades,
            self.window.success_rate * 100.0
        )?;
        writeln!(
            f,
            "  Volume: ${:.2} (avg ${:.2})",
            self.window.total_volume, self.window.avg_trade_value
        )?;
        match (self.daily_pnl, self.daily_pnl_value) {
            (Some(pnl), Some(value)) => writeln!(f, "  Daily P&L: {:+.2}% (${value:+.2})", pnl * 100.0),
            _ => writeln!(f, "  Daily P&L: n/a"),
        }
    }
}

/// Pre-trade risk gate.
///
/// Single-writer: every mutating call takes `&mut self`, so two cycles can
/// never interleave on the same gate.
#[derive(Debug, Clone)]
pub struct RiskGate {
    config: RiskConfig,
    log: TradeLog,
    daily: DailyPnl,
}

impl RiskGate {
    /// Create a new risk gate with the given config.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails validation. Use [`RiskGate::try_new`] to
    /// handle the error instead.
    #[track_caller]
    pub fn new(config: RiskConfig) -> Self {
        match Self::try_new(config) {
            Ok(gate) => gate,
            Err(msg) => panic!("invalid RiskConfig: {msg}"),
        }
    }

    pub fn try_new(config: RiskConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            log: TradeLog::new(config.trade_log_capacity),
            daily: DailyPnl::new(config.daily_retention_days),
            config,
        })
    }

    /// Access the current config.
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn trade_log(&self) -> &TradeLog {
        &self.log
    }

    pub fn daily(&self) -> &DailyPnl {
        &self.daily
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validate a trade: position size, daily loss, then frequency,
    /// stopping at the first failure.
    pub fn validate_trade(
        &mut self,
        symbol: Symbol,
        side: Side,
        amount: f64,
        price: f64,
        portfolio_value: f64,
    ) -> RiskReport {
        self.validate_trade_at(Utc::now(), symbol, side, amount, price, portfolio_value)
    }

    pub fn validate_trade_at(
        &mut self,
        now: DateTime<Utc>,
        symbol: Symbol,
        side: Side,
        amount: f64,
        price: f64,
        portfolio_value: f64,
    ) -> RiskReport {
        let mut report = RiskReport::default();

        let check = checks::position_size(&self.config, amount, price, portfolio_value);
        if !push(&mut report, check) {
            return rejected(report, symbol, side);
        }

        let check = self.check_daily_loss_at(now, portfolio_value);
        if !push(&mut report, check) {
            return rejected(report, symbol, side);
        }

        let check = self.check_trade_frequency_at(now);
        if !push(&mut report, check) {
            return rejected(report, symbol, side);
        }

        debug!("Risk checks passed for {side} {amount:.6} {symbol}");
        report
    }

    /// Value the portfolio for today and check the daily loss limit.
    pub fn check_daily_loss_at(&mut self, now: DateTime<Utc>, portfolio_value: f64) -> RiskCheck {
        let pnl = self.daily.observe(now.date_naive(), portfolio_value);
        let start = self
            .daily
            .get(now.date_naive())
            .map_or(portfolio_value, |e| e.start_value);
        checks::daily_loss(&self.config, start, pnl)
    }

    pub fn check_trade_frequency_at(&self, now: DateTime<Utc>) -> RiskCheck {
        let since_last = self.log.last().map(|r| now - r.timestamp);
        let window = TimeDelta::seconds(self.config.frequency_window_secs);
        checks::trade_frequency(&self.config, since_last, self.log.count_within(now, window))
    }

    /// Stop-loss check for an open position. Not part of [`validate_trade`](Self::validate_trade).
    pub fn check_stop_loss(
        &self,
        symbol: Symbol,
        entry_price: f64,
        current_price: f64,
        kind: PositionKind,
    ) -> RiskCheck {
        let check = checks::stop_loss(&self.config, entry_price, current_price, kind);
        if !check.passed() {
            warn!("Stop loss triggered for {symbol}: {}", check.detail);
        }
        check
    }

    /// Record today's portfolio value without validating a trade.
    ///
    /// Returns today's P&L, or `None` if this was the first valuation.
    pub fn observe_value_at(&mut self, now: DateTime<Utc>, portfolio_value: f64) -> Option<f64> {
        self.daily.observe(now.date_naive(), portfolio_value)
    }

    pub fn observe_value(&mut self, portfolio_value: f64) -> Option<f64> {
        self.observe_value_at(Utc::now(), portfolio_value)
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Append an attempted trade to the log.
    pub fn record_trade(
        &mut self,
        symbol: Symbol,
        side: Side,
        amount: f64,
        price: f64,
        success: bool,
        reason: &str,
    ) {
        self.record_trade_at(Utc::now(), symbol, side, amount, price, success, reason);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_trade_at(
        &mut self,
        now: DateTime<Utc>,
        symbol: Symbol,
        side: Side,
        amount: f64,
        price: f64,
        success: bool,
        reason: &str,
    ) {
        let value = amount * price;
        self.log.push(TradeRecord {
            timestamp: now,
            symbol,
            side,
            amount,
            price,
            value,
            success,
            reason: reason.to_string(),
        });
        info!(
            "Recorded {} {side} {amount:.6} {symbol} (${value:.2})",
            if success { "successful" } else { "failed" }
        );
    }

    // ========================================================================
    // Derived conditions
    // ========================================================================

    pub fn metrics(&self) -> RiskMetrics {
        self.metrics_at(Utc::now())
    }

    /// Rolling statistics over the metrics window ending at `now`.
    pub fn metrics_at(&self, now: DateTime<Utc>) -> RiskMetrics {
        let window = TimeDelta::seconds(self.config.metrics_window_secs);
        let today = self.daily.get(now.date_naive());
        RiskMetrics {
            window: self.log.stats_within(now, window),
            daily_pnl: today.map(|e| e.pnl),
            daily_pnl_value: today.map(DailyEntry::pnl_value),
        }
    }

    pub fn should_reduce_risk(&self) -> bool {
        self.should_reduce_risk_at(Utc::now())
    }

    /// Low recent success rate or a moderate daily loss.
    pub fn should_reduce_risk_at(&self, now: DateTime<Utc>) -> bool {
        let metrics = self.metrics_at(now);
        let cfg = &self.config;

        if metrics.window.total_trades >= cfg.reduce_risk_min_trades
            && metrics.window.success_rate < cfg.reduce_risk_success_rate
        {
            warn!(
                "Low success rate: {:.1}%, reduce risk",
                metrics.window.success_rate * 100.0
            );
            return true;
        }
        if let Some(pnl) = metrics.daily_pnl {
            if pnl < -cfg.reduce_risk_daily_loss {
                warn!("Daily P&L {:+.2}%, reduce risk", pnl * 100.0);
                return true;
            }
        }
        false
    }

    pub fn emergency_stop(&self) -> bool {
        self.emergency_stop_at(Utc::now())
    }

    /// Circuit breaker: severe daily loss or a very low success rate.
    pub fn emergency_stop_at(&self, now: DateTime<Utc>) -> bool {
        let metrics = self.metrics_at(now);
        let cfg = &self.config;

        if let Some(pnl) = metrics.daily_pnl {
            if pnl < -cfg.emergency_daily_loss {
                error!("EMERGENCY STOP: daily P&L {:+.2}%", pnl * 100.0);
                return true;
            }
        }
        if metrics.window.total_trades >= cfg.emergency_min_trades
            && metrics.window.success_rate < cfg.emergency_success_rate
        {
            error!(
                "EMERGENCY STOP: success rate {:.1}% over {} trades",
                metrics.window.success_rate * 100.0,
                metrics.window.total_trades
            );
            return true;
        }
        false
    }

    pub fn adjusted_position_size(&self, base_size: f64, market_volatility: f64) -> f64 {
        self.adjusted_position_size_at(Utc::now(), base_size, market_volatility)
    }

    /// Scale `base_size` down for high volatility and reduced risk, capped
    /// at `max_position_size`.
    pub fn adjusted_position_size_at(
        &self,
        now: DateTime<Utc>,
        base_size: f64,
        market_volatility: f64,
    ) -> f64 {
        let target = self.config.volatility_target;
        let mut size = base_size;
        if market_volatility > target {
            size *= (target / market_volatility).min(1.0);
        }
        if self.should_reduce_risk_at(now) {
            size *= 0.5;
        }
        size.min(self.config.max_position_size)
    }
}

/// Append `check`; returns whether validation may continue.
fn push(report: &mut RiskReport, check: RiskCheck) -> bool {
    let passed = check.passed();
    report.checks.push(check);
    passed
}

fn rejected(report: RiskReport, symbol: Symbol, side: Side) -> RiskReport {
    if let Some(reason) = report.reason() {
        info!("Rejected {side} {symbol}: {reason}");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn weth() -> Symbol {
        Symbol::new("WETH")
    }

    fn gate() -> RiskGate {
        RiskGate::new(RiskConfig::default())
    }

    #[test]
    #[should_panic(expected = "invalid RiskConfig")]
    fn invalid_config_panics() {
        RiskGate::new(RiskConfig {
            max_position_size: 0.0,
            ..RiskConfig::default()
        });
    }

    #[test]
    fn position_failure_short_circuits() {
        let mut gate = gate();
        let report = gate.validate_trade_at(t0(), weth(), Side::Buy, 1.0, 2000.0, 1000.0);
        assert!(!report.is_approved());
        assert_eq!(report.checks.len(), 1);
        // daily table untouched
        assert!(gate.daily().is_empty());
    }

    #[test]
    fn first_trade_of_day_passes() {
        let mut gate = gate();
        let report = gate.validate_trade_at(t0(), weth(), Side::Buy, 0.1, 2000.0, 10_000.0);
        assert!(report.is_approved(), "{report}");
        assert_eq!(report.checks.len(), 3);
    }

    #[test]
    fn metrics_track_window_and_pnl() {
        let mut gate = gate();
        gate.observe_value_at(t0(), 10_000.0);
        gate.observe_value_at(t0(), 9_900.0);
        gate.record_trade_at(t0(), weth(), Side::Buy, 0.1, 2000.0, true, "rebalance");
        gate.record_trade_at(t0(), weth(), Side::Sell, 0.1, 2000.0, false, "rebalance");

        let m = gate.metrics_at(t0() + TimeDelta::minutes(1));
        assert_eq!(m.window.total_trades, 2);
        assert_eq!(m.window.success_rate, 0.5);
        assert_eq!(m.window.total_volume, 400.0);
        assert!((m.daily_pnl.unwrap() + 0.01).abs() < 1e-12);
        assert_eq!(m.daily_pnl_value, Some(-100.0));

        // a day later the window is empty and today has no entry
        let later = gate.metrics_at(t0() + TimeDelta::hours(25));
        assert_eq!(later.window.total_trades, 0);
        assert_eq!(later.daily_pnl, None);
    }

    #[test]
    fn reduce_risk_on_failures() {
        let mut gate = gate();
        for i in 0..5 {
            let ok = i == 0;
            gate.record_trade_at(t0() + TimeDelta::minutes(i), weth(), Side::Buy, 0.1, 2000.0, ok, "");
        }
        let now = t0() + TimeDelta::minutes(10);
        assert!(gate.should_reduce_risk_at(now));
        assert!(!gate.emergency_stop_at(now));
    }

    #[test]
    fn reduce_risk_needs_min_trades() {
        let mut gate = gate();
        for i in 0..4 {
            gate.record_trade_at(t0() + TimeDelta::minutes(i), weth(), Side::Buy, 0.1, 2000.0, false, "");
        }
        assert!(!gate.should_reduce_risk_at(t0() + TimeDelta::minutes(10)));
    }

    #[test]
    fn daily_loss_levels() {
        let mut gate = gate();
        gate.observe_value_at(t0(), 10_000.0);

        gate.observe_value_at(t0(), 9_800.0);
        assert!(!gate.should_reduce_risk_at(t0()));

        gate.observe_value_at(t0(), 9_600.0);
        assert!(gate.should_reduce_risk_at(t0()));
        assert!(!gate.emergency_stop_at(t0()));

        gate.observe_value_at(t0(), 9_250.0);
        assert!(gate.emergency_stop_at(t0()));
    }

    #[test]
    fn emergency_on_low_success_rate() {
        let mut gate = gate();
        for i in 0..10 {
            let ok = i < 2;
            gate.record_trade_at(t0() + TimeDelta::minutes(i), weth(), Side::Buy, 0.1, 2000.0, ok, "");
        }
        assert!(gate.emergency_stop_at(t0() + TimeDelta::minutes(20)));
    }

    #[test]
    fn adjusted_position_size_scaling() {
        let gate = gate();
        // calm market, no reduction
        assert_eq!(gate.adjusted_position_size_at(t0(), 0.2, 0.05), 0.2);
        // vol 0.2 → half
        assert!((gate.adjusted_position_size_at(t0(), 0.2, 0.2) - 0.1).abs() < 1e-12);
        // capped
        assert_eq!(gate.adjusted_position_size_at(t0(), 0.9, 0.0), 0.30);
    }

    #[test]
    fn adjusted_position_size_halves_when_reducing() {
        let mut gate = gate();
        gate.observe_value_at(t0(), 10_000.0);
        gate.observe_value_at(t0(), 9_600.0);
        assert!((gate.adjusted_position_size_at(t0(), 0.2, 0.05) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn stop_loss_on_gate() {
        let gate = gate();
        assert!(!gate.check_stop_loss(weth(), 2000.0, 1850.0, PositionKind::Long).passed());
        assert!(gate.check_stop_loss(weth(), 2000.0, 1950.0, PositionKind::Long).passed());
    }

    #[test]
    fn metrics_display() {
        let gate = gate();
        let text = gate.metrics_at(t0()).to_string();
        assert!(text.contains("RISK METRICS"));
        assert!(text.contains("n/a"));
    }
}
