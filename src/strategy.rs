//! Signal generators.
//!
//! Each strategy maps market observations to a buy/sell/hold signal per
//! asset and turns a signal set into target weights. Strategies are a closed
//! set: adding one means adding a variant and its two rules below.
//!
//! | strategy | signal input | cash buffer | sell weight |
//! |----------|--------------|-------------|-------------|
//! | Momentum | 7d change vs ±threshold | 20% | 5% |
//! | MeanReversion | 30d change vs ∓threshold | 30% | 0% |
//! | Volatility | `(|24h|·7 + |7d|)/2` vs low/high | 25% | 10% |

use std::fmt;

use log::debug;
use rustc_hash::FxHashMap;

use crate::market::{MarketObservation, Observations};
use crate::signal::{Signal, Signals};
use crate::types::Symbol;

/// Observation window a change-based strategy reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Window {
    Day,
    Week,
    Month,
}

impl Window {
    /// Price change over this window, as a fraction.
    pub fn change(self, obs: &MarketObservation) -> f64 {
        match self {
            Window::Day => obs.change_24h(),
            Window::Week => obs.change_7d(),
            Window::Month => obs.change_30d(),
        }
    }
}

/// A parameterized signal generator.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Strategy {
    /// Follow the trend: buy strength, sell weakness.
    Momentum { window: Window, threshold: f64 },
    /// Fade large moves: buy after drops, sell after rallies.
    MeanReversion { window: Window, threshold: f64 },
    /// Buy quiet assets (breakout expected), sell turbulent ones.
    Volatility { low: f64, high: f64 },
}

/// Cash buffer and residual sell weight of a strategy's sizing rule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sizing {
    /// Weight always kept in the quote asset when anything is bought.
    pub cash_buffer: f64,
    /// Weight given to each asset with a sell signal.
    pub sell_weight: f64,
}

impl Strategy {
    /// Momentum over 7 days with a 5% threshold.
    pub fn momentum() -> Self {
        Strategy::Momentum {
            window: Window::Week,
            threshold: 0.05,
        }
    }

    /// Mean reversion over 30 days with a 15% threshold.
    pub fn mean_reversion() -> Self {
        Strategy::MeanReversion {
            window: Window::Month,
            threshold: 0.15,
        }
    }

    /// Volatility bands at 2% and 8%.
    pub fn volatility() -> Self {
        Strategy::Volatility {
            low: 0.02,
            high: 0.08,
        }
    }

    /// Default-parameter strategy for a configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "momentum" => Some(Self::momentum()),
            "mean_reversion" => Some(Self::mean_reversion()),
            "volatility" => Some(Self::volatility()),
            _ => None,
        }
    }

    /// Configuration name of this strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Momentum { .. } => "momentum",
            Strategy::MeanReversion { .. } => "mean_reversion",
            Strategy::Volatility { .. } => "volatility",
        }
    }

    pub fn sizing(&self) -> Sizing {
        match self {
            Strategy::Momentum { .. } => Sizing {
                cash_buffer: 0.20,
                sell_weight: 0.05,
            },
            Strategy::MeanReversion { .. } => Sizing {
                cash_buffer: 0.30,
                sell_weight: 0.0,
            },
            Strategy::Volatility { .. } => Sizing {
                cash_buffer: 0.25,
                sell_weight: 0.10,
            },
        }
    }

    /// Signal for every observed asset. The quote asset always holds.
    pub fn generate_signals(&self, observations: &Observations, quote: Symbol) -> Signals {
        observations
            .iter()
            .map(|(&symbol, obs)| {
                let signal = if symbol == quote {
                    Signal::Hold
                } else {
                    self.signal_for(obs)
                };
                if signal != Signal::Hold {
                    debug!("{}: {symbol} {signal}", self.name());
                }
                (symbol, signal)
            })
            .collect()
    }

    fn signal_for(&self, obs: &MarketObservation) -> Signal {
        match *self {
            Strategy::Momentum { window, threshold } => {
                let change = window.change(obs);
                if change > threshold {
                    Signal::Buy
                } else if change < -threshold {
                    Signal::Sell
                } else {
                    Signal::Hold
                }
            }
            Strategy::MeanReversion { window, threshold } => {
                let change = window.change(obs);
                if change < -threshold {
                    Signal::Buy
                } else if change > threshold {
                    Signal::Sell
                } else {
                    Signal::Hold
                }
            }
            Strategy::Volatility { low, high } => {
                let vol = volatility_proxy(obs);
                if vol < low {
                    Signal::Buy
                } else if vol > high {
                    Signal::Sell
                } else {
                    Signal::Hold
                }
            }
        }
    }

    /// Target weights implied by `signals`.
    ///
    /// Buys split `1 - cash_buffer` equally; sells get the residual sell
    /// weight; holds get nothing. Without any buy the quote asset takes
    /// the whole allocation.
    pub fn position_sizes(
        &self,
        signals: &Signals,
        _portfolio_value: f64,
        quote: Symbol,
    ) -> FxHashMap<Symbol, f64> {
        let mut weights = FxHashMap::default();

        let buys = signals.values().filter(|s| **s == Signal::Buy).count();
        if buys == 0 {
            weights.insert(quote, 1.0);
            return weights;
        }

        let sizing = self.sizing();
        let per_buy = (1.0 - sizing.cash_buffer) / buys as f64;
        weights.insert(quote, sizing.cash_buffer);

        for (&symbol, &signal) in signals {
            match signal {
                Signal::Buy => {
                    weights.insert(symbol, per_buy);
                }
                Signal::Sell => {
                    weights.insert(symbol, sizing.sell_weight);
                }
                Signal::Hold => {}
            }
        }

        weights
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Momentum { window, threshold } => {
                write!(f, "momentum({window:?}, ±{:.1}%)", threshold * 100.0)
            }
            Strategy::MeanReversion { window, threshold } => {
                write!(f, "mean_reversion({window:?}, ±{:.1}%)", threshold * 100.0)
            }
            Strategy::Volatility { low, high } => {
                write!(f, "volatility({:.1}%..{:.1}%)", low * 100.0, high * 100.0)
            }
        }
    }
}

/// Volatility estimate from recent changes: `(|24h| × 7 + |7d|) / 2`.
pub fn volatility_proxy(obs: &MarketObservation) -> f64 {
    (obs.change_24h().abs() * 7.0 + obs.change_7d().abs()) / 2.0
}
