//! Execution coordinator: snapshot → plan → risk gate → venue → record.
//!
//! One [`Coordinator`] owns the risk gate for the life of the process and
//! runs every cycle (rebalance, monitor, review) sequentially.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use ballast::{
    Asset, AssetRegistry, DriftReport, PlannedTrade, PortfolioSnapshot, Side, Symbol,
    TargetAllocation, drift, plan_trades,
};
use ballast_broker::{BrokerError, TradeRequest, Venue};
use ballast_risk::RiskGate;
use chrono::{NaiveDate, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::json;

use crate::advisor::{self, Advisor, Review};
use crate::audit::{self, AuditSink, NullAudit};
use crate::config::{AdvisorConfig, Config};
use crate::error::Result;
use crate::market::MarketData;
use crate::target;

/// Non-quote weights are scaled by this factor while risk is reduced.
pub const DERISK_FACTOR: f64 = 0.5;

/// Per-cycle settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub quote: Symbol,
    pub threshold: f64,
    /// Pause between trade attempts.
    pub pause: Duration,
    /// Plan and run risk checks without calling the venue.
    pub dry_run: bool,
}

impl CycleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            quote: config.quote(),
            threshold: config.trading.rebalance_threshold,
            pause: config.trade_pause(),
            dry_run: false,
        }
    }
}

/// What a cycle did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    /// Trades produced by the planner, quote legs included.
    pub planned: usize,
    /// Quote-asset legs settled by the other trades.
    pub quote_legs: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Trades in assets the registry cannot settle.
    pub skipped: usize,
    /// Trades sent to the venue.
    pub executed: usize,
    pub successful: usize,
    pub failed: usize,
    pub reduced_risk: bool,
    /// Skipped because the emergency stop holds for today.
    pub suspended: bool,
    pub dry_run: bool,
}

impl CycleSummary {
    /// Planned trades that needed the venue. Rejected, skipped and failed
    /// trades all count here.
    pub fn total(&self) -> usize {
        self.planned.saturating_sub(self.quote_legs)
    }

    /// Successful share of [`total`](Self::total); 1.0 when nothing needed trading.
    pub fn success_ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            1.0
        } else {
            self.successful as f64 / total as f64
        }
    }

    /// Every planned trade succeeded. A dry run succeeds when every trade
    /// was approved.
    pub fn is_success(&self) -> bool {
        if self.suspended {
            return false;
        }
        let done = if self.dry_run { self.approved } else { self.successful };
        done == self.total()
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.suspended {
            return write!(f, "Cycle suspended: emergency stop in effect");
        }
        if self.dry_run {
            return write!(
                f,
                "[DRY RUN] {} planned, {} approved, {} rejected, {} skipped, {} quote legs",
                self.planned, self.approved, self.rejected, self.skipped, self.quote_legs
            );
        }
        write!(
            f,
            "Rebalancing complete: {}/{} trades successful ({} rejected, {} skipped, {} failed)",
            self.successful,
            self.total(),
            self.rejected,
            self.skipped,
            self.failed
        )
    }
}

/// Sequences planned trades through the risk gate and the venue.
pub struct Coordinator<V, M> {
    venue: V,
    market: M,
    registry: AssetRegistry,
    risk: RiskGate,
    settings: CycleSettings,
    audit: Box<dyn AuditSink>,
    halted_on: Option<NaiveDate>,
}

impl<V: Venue, M: MarketData> Coordinator<V, M> {
    pub fn new(venue: V, market: M, risk: RiskGate, settings: CycleSettings) -> Self {
        Self {
            venue,
            market,
            registry: AssetRegistry::builtin(),
            risk,
            settings,
            audit: Box::new(NullAudit),
            halted_on: None,
        }
    }

    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_registry(mut self, registry: AssetRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn market(&self) -> &M {
        &self.market
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn risk(&self) -> &RiskGate {
        &self.risk
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.settings.dry_run = dry_run;
    }

    /// Value venue balances at market prices.
    ///
    /// Target assets that are not held appear with a zero balance so the
    /// planner can price buys into them.
    pub fn snapshot(&self, target: Option<&TargetAllocation>) -> Result<PortfolioSnapshot> {
        let mut balances: Vec<(Symbol, f64)> = self
            .venue
            .balances()?
            .into_iter()
            .map(|b| (b.symbol, b.amount))
            .collect();
        if let Some(target) = target {
            for symbol in target.symbols() {
                if !balances.iter().any(|(s, _)| *s == symbol) {
                    balances.push((symbol, 0.0));
                }
            }
        }

        let symbols: Vec<Symbol> = balances.iter().map(|(s, _)| *s).collect();
        let prices = self.market.prices(&symbols)?;
        for symbol in &symbols {
            if !prices.contains_key(symbol) {
                warn!("No price for {symbol}; valued at 0");
            }
        }
        Ok(PortfolioSnapshot::new(&balances, &prices))
    }

    /// Snapshot plus drift from `target`.
    pub fn status(&self, target: &TargetAllocation) -> Result<(PortfolioSnapshot, DriftReport)> {
        let snapshot = self.snapshot(Some(target))?;
        let report = drift(target, &snapshot);
        Ok((snapshot, report))
    }

    /// Run one rebalancing cycle toward `target`.
    pub fn rebalance(&mut self, target: &TargetAllocation) -> Result<CycleSummary> {
        info!("Starting portfolio rebalancing...");
        let mut summary = CycleSummary {
            dry_run: self.settings.dry_run,
            ..CycleSummary::default()
        };
        audit::log_cycle_started(self.audit.as_mut(), "rebalance", self.settings.dry_run)?;

        self.registry.require(&self.settings.quote)?;

        let snapshot = self.snapshot(Some(target))?;
        info!("Portfolio value: ${:.2}", snapshot.total_value());
        audit::log_snapshot(self.audit.as_mut(), &snapshot)?;

        if self.emergency_halt(snapshot.total_value())? {
            summary.suspended = true;
            audit::log_cycle_completed(self.audit.as_mut(), &summary)?;
            return Ok(summary);
        }

        let target = if self.risk.should_reduce_risk() {
            let reduced = target.derisked(DERISK_FACTOR, self.settings.quote);
            warn!("Reducing risk: target {target} → {reduced}");
            summary.reduced_risk = true;
            reduced
        } else {
            target.clone()
        };

        let trades = plan_trades(&target, &snapshot, self.settings.threshold);
        audit::log_plan(self.audit.as_mut(), &target, &trades)?;
        summary.planned = trades.len();
        if trades.is_empty() {
            info!("Portfolio is already balanced within threshold");
        }

        let portfolio_value = snapshot.total_value();
        let mut attempted = false;
        for trade in &trades {
            if trade.symbol == self.settings.quote {
                debug!("{} {} settles through the other legs", trade.side, trade.symbol);
                summary.quote_legs += 1;
                continue;
            }
            if self.registry.get(&trade.symbol).is_none() {
                warn!("Skipping {} {}: unsupported asset", trade.side, trade.symbol);
                audit::log_trade_skipped(self.audit.as_mut(), trade, "unsupported asset")?;
                summary.skipped += 1;
                continue;
            }

            let report = self.risk.validate_trade(
                trade.symbol,
                trade.side,
                trade.amount,
                trade.price,
                portfolio_value,
            );
            if let Some(reason) = report.reason() {
                info!("Skipping {} {}: {reason}", trade.side, trade.symbol);
                audit::log_trade_rejected(self.audit.as_mut(), trade, &report)?;
                summary.rejected += 1;
                continue;
            }
            summary.approved += 1;

            if self.settings.dry_run {
                info!("[DRY RUN] would execute {trade}");
                continue;
            }

            if attempted && !self.settings.pause.is_zero() {
                std::thread::sleep(self.settings.pause);
            }
            attempted = true;
            self.execute(trade, &mut summary)?;
        }

        if self.settings.dry_run {
            info!("{summary}");
        } else if summary.is_success() {
            info!("{summary}");
        } else {
            warn!("{summary}");
        }
        audit::log_cycle_completed(self.audit.as_mut(), &summary)?;
        Ok(summary)
    }

    /// Check the circuit breaker after valuing the portfolio.
    ///
    /// Once tripped, cycles stay suspended until the UTC day changes.
    fn emergency_halt(&mut self, portfolio_value: f64) -> Result<bool> {
        let today = Utc::now().date_naive();
        if self.halted_on == Some(today) {
            error!("Emergency stop in effect for {today}; cycle suspended");
            return Ok(true);
        }

        self.risk.observe_value(portfolio_value);
        if self.risk.emergency_stop() {
            self.halted_on = Some(today);
            let metrics = self.risk.metrics();
            error!("Emergency stop triggered; suspending trading for {today}\n{metrics}");
            audit::log_emergency_stop(self.audit.as_mut(), &metrics)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Send one approved trade to the venue and record the outcome.
    fn execute(&mut self, trade: &PlannedTrade, summary: &mut CycleSummary) -> Result<()> {
        let reason = format!(
            "Rebalancing: {:.3} -> {:.3}",
            trade.current_weight, trade.target_weight
        );
        summary.executed += 1;

        let outcome = self.send(trade, &reason);
        let success = matches!(&outcome, Ok(receipt) if receipt.success);
        match &outcome {
            Ok(receipt) if receipt.success => {
                info!("Trade executed: {} {:.6} {}", trade.side, trade.amount, trade.symbol);
            }
            Ok(receipt) => {
                error!(
                    "Trade failed: {} {}: {}",
                    trade.side,
                    trade.symbol,
                    receipt.message.as_deref().unwrap_or("declined")
                );
            }
            Err(e) => error!("Error executing {} {}: {e}", trade.side, trade.symbol),
        }

        if success {
            summary.successful += 1;
        } else {
            summary.failed += 1;
        }
        self.risk.record_trade(
            trade.symbol,
            trade.side,
            trade.amount,
            trade.price,
            success,
            &reason,
        );

        let error = outcome.as_ref().err().map(ToString::to_string);
        audit::log_trade_executed(
            self.audit.as_mut(),
            trade,
            outcome.as_ref().ok(),
            error.as_deref(),
        )
    }

    fn send(
        &self,
        trade: &PlannedTrade,
        reason: &str,
    ) -> std::result::Result<ballast_broker::TradeReceipt, BrokerError> {
        let asset = self.asset(&trade.symbol)?;
        let quote = self.asset(&self.settings.quote)?;
        let request = match trade.side {
            Side::Sell => TradeRequest::from_amount(asset, quote, trade.amount, reason)?,
            Side::Buy => TradeRequest::from_amount(quote, asset, trade.notional(), reason)?,
        };
        self.venue.execute_trade(&request)
    }

    fn asset(&self, symbol: &Symbol) -> std::result::Result<&Asset, BrokerError> {
        self.registry
            .get(symbol)
            .ok_or_else(|| BrokerError::UnknownAsset(symbol.to_string()))
    }

    /// Hourly check: rebalance immediately when any asset drifts more than
    /// twice the threshold.
    pub fn monitor(&mut self, target: &TargetAllocation) -> Result<Option<CycleSummary>> {
        let (snapshot, report) = self.status(target)?;
        info!(
            "Portfolio monitoring - Total value: ${:.2}, tracking error {:.2}%",
            snapshot.total_value(),
            report.tracking_error_pct
        );

        let limit = 2.0 * self.settings.threshold;
        let max_diff = report.max_target_diff(target);
        if max_diff > limit {
            warn!(
                "Large portfolio drift detected ({:.2}% > {:.2}%), rebalancing",
                max_diff * 100.0,
                limit * 100.0
            );
            return self.rebalance(target).map(Some);
        }
        Ok(None)
    }

    /// Ask `advisor` for a new target. An adopted target is saved to
    /// `target_path` and rebalanced toward immediately.
    pub fn review<A: Advisor + ?Sized>(
        &mut self,
        advisor: &A,
        current: &TargetAllocation,
        target_path: &Path,
        config: &AdvisorConfig,
    ) -> Result<Option<TargetAllocation>> {
        info!("Starting strategy review...");
        let snapshot = self.snapshot(Some(current))?;
        let symbols: Vec<Symbol> = snapshot.symbols().collect();
        let observations = self.market.observations(&symbols);
        let context = json!({
            "portfolio": snapshot,
            "market_data": observations
                .iter()
                .map(|(s, o)| (s.as_str(), o))
                .collect::<std::collections::BTreeMap<_, _>>(),
        });

        match advisor::review(advisor, current, &context, config)? {
            Review::Update {
                allocation,
                max_change,
            } => {
                target::save(target_path, &allocation)?;
                audit::log_allocation_updated(self.audit.as_mut(), current, &allocation, max_change)?;
                info!("Portfolio allocation updated: {allocation}");
                self.rebalance(&allocation)?;
                Ok(Some(allocation))
            }
            Review::Keep { .. } => Ok(None),
        }
    }
}
