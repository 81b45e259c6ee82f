//! Risk configuration.

use serde::{Deserialize, Serialize};

/// Limits and circuit-breaker levels for the risk gate.
///
/// Every field has a default, so a partial `[risk]` table deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Max single-trade value as a fraction of portfolio value (0.30 = 30%).
    pub max_position_size: f64,
    /// Adverse move that triggers a stop-loss.
    pub stop_loss_percentage: f64,
    /// Daily loss that rejects further trades.
    pub max_daily_loss: f64,
    /// Max trades in the trailing frequency window.
    pub max_trades_per_hour: usize,
    /// Min seconds between consecutive trades.
    pub min_trade_interval_secs: i64,
    /// Length of the trade-frequency window in seconds.
    pub frequency_window_secs: i64,
    /// Length of the rolling metrics window in seconds.
    pub metrics_window_secs: i64,
    /// Trade records kept in memory.
    pub trade_log_capacity: usize,
    /// Calendar days of P&L kept (today included).
    pub daily_retention_days: usize,

    /// Success rate below which risk should be reduced.
    pub reduce_risk_success_rate: f64,
    /// Trades in the metrics window before the success rate counts.
    pub reduce_risk_min_trades: usize,
    /// Daily loss at which risk should be reduced.
    pub reduce_risk_daily_loss: f64,

    /// Daily loss that trips the emergency stop.
    pub emergency_daily_loss: f64,
    /// Success rate below which the emergency stop trips.
    pub emergency_success_rate: f64,
    pub emergency_min_trades: usize,

    /// Volatility above which position sizes are scaled down.
    pub volatility_target: f64,
}

impl RiskConfig {
    /// Validate the config. Returns `Err` with a description if any field is nonsensical.
    pub fn validate(&self) -> Result<(), String> {
        let fractions = [
            ("max_position_size", self.max_position_size),
            ("stop_loss_percentage", self.stop_loss_percentage),
            ("max_daily_loss", self.max_daily_loss),
            ("reduce_risk_success_rate", self.reduce_risk_success_rate),
            ("reduce_risk_daily_loss", self.reduce_risk_daily_loss),
            ("emergency_daily_loss", self.emergency_daily_loss),
            ("emergency_success_rate", self.emergency_success_rate),
        ];
        for (name, value) in fractions {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(format!("{name} must be in (0, 1], got {value}"));
            }
        }
        if !self.volatility_target.is_finite() || self.volatility_target <= 0.0 {
            return Err(format!(
                "volatility_target must be > 0 and finite, got {}",
                self.volatility_target
            ));
        }
        if self.max_trades_per_hour == 0 {
            return Err("max_trades_per_hour must be >= 1".into());
        }
        if self.min_trade_interval_secs < 0 {
            return Err(format!(
                "min_trade_interval_secs must be >= 0, got {}",
                self.min_trade_interval_secs
            ));
        }
        if self.frequency_window_secs <= 0 || self.metrics_window_secs <= 0 {
            return Err("frequency and metrics windows must be positive".into());
        }
        if self.trade_log_capacity == 0 {
            return Err("trade_log_capacity must be >= 1".into());
        }
        if self.daily_retention_days == 0 {
            return Err("daily_retention_days must be >= 1".into());
        }
        if self.emergency_daily_loss < self.reduce_risk_daily_loss {
            return Err(format!(
                "emergency_daily_loss ({}) must be >= reduce_risk_daily_loss ({})",
                self.emergency_daily_loss, self.reduce_risk_daily_loss
            ));
        }
        Ok(())
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size: 0.30,
            stop_loss_percentage: 0.05,
            max_daily_loss: 0.05,
            max_trades_per_hour: 10,
            min_trade_interval_secs: 60,
            frequency_window_secs: 3_600,
            metrics_window_secs: 86_400,
            trade_log_capacity: 1_000,
            daily_retention_days: 2,
            reduce_risk_success_rate: 0.5,
            reduce_risk_min_trades: 5,
            reduce_risk_daily_loss: 0.03,
            emergency_daily_loss: 0.07,
            emergency_success_rate: 0.3,
            emergency_min_trades: 10,
            volatility_target: 0.10,
        }
    }
}
