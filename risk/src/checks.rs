//! Individual risk check implementations.
//!
//! Each check is a pure function of the config and the numbers it judges;
//! the gate supplies state (trade log, daily P&L) and decides ordering.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::report::{RiskCheck, RiskStatus};

/// Returns `"<="` if the check passed, `">"` if it failed or warned.
fn cmp_symbol(status: RiskStatus) -> &'static str {
    if status == RiskStatus::Pass {
        "<="
    } else {
        ">"
    }
}

/// Trade value as a fraction of portfolio value must stay within
/// `max_position_size`. Negative or non-finite fractions fail, as does a
/// non-positive portfolio value.
pub fn position_size(config: &RiskConfig, amount: f64, price: f64, portfolio_value: f64) -> RiskCheck {
    const NAME: &str = "Position size";

    if portfolio_value.is_nan() || portfolio_value <= 0.0 {
        return RiskCheck::new(
            NAME,
            RiskStatus::Fail,
            format!("portfolio value ${portfolio_value:.2} is not positive"),
        );
    }

    let fraction = amount * price / portfolio_value;
    if !fraction.is_finite() || fraction < 0.0 {
        return RiskCheck::new(
            NAME,
            RiskStatus::Fail,
            format!("invalid position fraction {fraction}"),
        );
    }

    let status = if fraction > config.max_position_size {
        RiskStatus::Fail
    } else {
        RiskStatus::Pass
    };
    RiskCheck::new(
        NAME,
        status,
        format!(
            "{:.1}% {} {:.1}% limit",
            fraction * 100.0,
            cmp_symbol(status),
            config.max_position_size * 100.0,
        ),
    )
}

/// Today's P&L against `max_daily_loss`. `None` means this is the first
/// valuation of the day, which always passes.
pub fn daily_loss(config: &RiskConfig, start_value: f64, pnl: Option<f64>) -> RiskCheck {
    const NAME: &str = "Daily loss";

    let Some(pnl) = pnl else {
        return RiskCheck::new(
            NAME,
            RiskStatus::Pass,
            format!("first check today, start value ${start_value:.2}"),
        );
    };

    let status = if pnl < -config.max_daily_loss {
        RiskStatus::Fail
    } else {
        RiskStatus::Pass
    };
    let cmp = if status == RiskStatus::Pass { ">=" } else { "<" };
    RiskCheck::new(
        NAME,
        status,
        format!(
            "{:+.2}% {} -{:.2}% limit",
            pnl * 100.0,
            cmp,
            config.max_daily_loss * 100.0
        ),
    )
}

/// Spacing since the previous trade and count inside the frequency window.
///
/// `since_last` is `None` when no trade has been recorded. Reaching one
/// below the hourly cap warns.
pub fn trade_frequency(
    config: &RiskConfig,
    since_last: Option<TimeDelta>,
    trades_in_window: usize,
) -> RiskCheck {
    const NAME: &str = "Trade frequency";

    if let Some(elapsed) = since_last {
        let min = TimeDelta::seconds(config.min_trade_interval_secs);
        if elapsed < min {
            return RiskCheck::new(
                NAME,
                RiskStatus::Fail,
                format!(
                    "{}s since last trade < {}s minimum interval",
                    elapsed.num_seconds().max(0),
                    config.min_trade_interval_secs
                ),
            );
        }
    }

    let max = config.max_trades_per_hour;
    let status = if trades_in_window >= max {
        RiskStatus::Fail
    } else if trades_in_window + 1 == max {
        RiskStatus::Warn
    } else {
        RiskStatus::Pass
    };
    RiskCheck::new(
        NAME,
        status,
        format!(
            "{trades_in_window} trades in last {}s, limit {max}",
            config.frequency_window_secs
        ),
    )
}

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Long,
    Short,
}

/// Adverse move of a position as a fraction of its entry price.
///
/// Positive means a loss. Zero for a non-positive entry price.
pub fn adverse_move(entry_price: f64, current_price: f64, kind: PositionKind) -> f64 {
    if entry_price <= 0.0 {
        return 0.0;
    }
    match kind {
        PositionKind::Long => (entry_price - current_price) / entry_price,
        PositionKind::Short => (current_price - entry_price) / entry_price,
    }
}

/// Fails when the adverse move exceeds `stop_loss_percentage`.
pub fn stop_loss(
    config: &RiskConfig,
    entry_price: f64,
    current_price: f64,
    kind: PositionKind,
) -> RiskCheck {
    let loss = adverse_move(entry_price, current_price, kind);
    let status = if loss > config.stop_loss_percentage {
        RiskStatus::Fail
    } else {
        RiskStatus::Pass
    };
    RiskCheck::new(
        "Stop loss",
        status,
        format!(
            "{:.2}% adverse move {} {:.2}% stop",
            loss * 100.0,
            cmp_symbol(status),
            config.stop_loss_percentage * 100.0
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RiskConfig {
        RiskConfig::default()
    }

    #[test]
    fn position_within_limit() {
        // 0.1 × 2000 / 1000 = 20%
        let check = position_size(&config(), 0.1, 2000.0, 1000.0);
        assert_eq!(check.status, RiskStatus::Pass);
    }

    #[test]
    fn position_over_limit() {
        // 31%
        let check = position_size(&config(), 310.0, 1.0, 1000.0);
        assert_eq!(check.status, RiskStatus::Fail);
        assert!(check.detail.contains("31.0%"));
    }

    #[test]
    fn position_at_limit_passes() {
        let check = position_size(&config(), 300.0, 1.0, 1000.0);
        assert_eq!(check.status, RiskStatus::Pass);
    }

    #[test]
    fn position_negative_or_zero_portfolio() {
        assert_eq!(
            position_size(&config(), -1.0, 1.0, 1000.0).status,
            RiskStatus::Fail
        );
        assert_eq!(
            position_size(&config(), 1.0, 1.0, 0.0).status,
            RiskStatus::Fail
        );
        assert_eq!(
            position_size(&config(), 1.0, 1.0, f64::NAN).status,
            RiskStatus::Fail
        );
    }

    #[test]
    fn daily_loss_first_check_passes() {
        let check = daily_loss(&config(), 10_000.0, None);
        assert_eq!(check.status, RiskStatus::Pass);
        assert!(check.detail.contains("first check"));
    }

    #[test]
    fn daily_loss_limits() {
        assert_eq!(daily_loss(&config(), 10_000.0, Some(-0.08)).status, RiskStatus::Fail);
        assert_eq!(daily_loss(&config(), 10_000.0, Some(-0.05)).status, RiskStatus::Pass);
        assert_eq!(daily_loss(&config(), 10_000.0, Some(0.02)).status, RiskStatus::Pass);
    }

    #[test]
    fn frequency_interval() {
        let check = trade_frequency(&config(), Some(TimeDelta::seconds(30)), 1);
        assert_eq!(check.status, RiskStatus::Fail);
        assert!(check.detail.contains("30s"));

        let check = trade_frequency(&config(), Some(TimeDelta::seconds(60)), 1);
        assert_eq!(check.status, RiskStatus::Pass);
    }

    #[test]
    fn frequency_hourly_cap() {
        assert_eq!(trade_frequency(&config(), None, 10).status, RiskStatus::Fail);
        assert_eq!(trade_frequency(&config(), None, 9).status, RiskStatus::Warn);
        assert_eq!(trade_frequency(&config(), None, 0).status, RiskStatus::Pass);
    }

    #[test]
    fn stop_loss_long_and_short() {
        let long = stop_loss(&config(), 100.0, 94.0, PositionKind::Long);
        assert_eq!(long.status, RiskStatus::Fail);

        let long = stop_loss(&config(), 100.0, 96.0, PositionKind::Long);
        assert_eq!(long.status, RiskStatus::Pass);

        let short = stop_loss(&config(), 100.0, 106.0, PositionKind::Short);
        assert_eq!(short.status, RiskStatus::Fail);

        // a short gains when price falls
        let short = stop_loss(&config(), 100.0, 80.0, PositionKind::Short);
        assert_eq!(short.status, RiskStatus::Pass);
    }

    #[test]
    fn adverse_move_zero_entry() {
        assert_eq!(adverse_move(0.0, 10.0, PositionKind::Long), 0.0);
    }
}
