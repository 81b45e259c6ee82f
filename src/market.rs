//! Per-asset market observations consumed by the strategies.

use rustc_hash::FxHashMap;

use crate::types::Symbol;

/// Latest market statistics for one asset.
///
/// Price changes are percent points as market-data sources publish them
/// (`5.0` means +5%).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketObservation {
    pub price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub change_24h_pct: f64,
    pub change_7d_pct: f64,
    pub change_30d_pct: f64,
    pub high_24h: f64,
    pub low_24h: f64,
}

impl MarketObservation {
    /// Observation carrying only a price; all changes are zero.
    pub fn at_price(price: f64) -> Self {
        Self {
            price,
            ..Self::default()
        }
    }

    /// Set the 24h / 7d / 30d changes in percent points.
    pub fn with_changes(mut self, change_24h: f64, change_7d: f64, change_30d: f64) -> Self {
        self.change_24h_pct = change_24h;
        self.change_7d_pct = change_7d;
        self.change_30d_pct = change_30d;
        self
    }

    /// 24h change as a fraction.
    #[inline]
    pub fn change_24h(&self) -> f64 {
        self.change_24h_pct / 100.0
    }

    /// 7d change as a fraction.
    #[inline]
    pub fn change_7d(&self) -> f64 {
        self.change_7d_pct / 100.0
    }

    /// 30d change as a fraction.
    #[inline]
    pub fn change_30d(&self) -> f64 {
        self.change_30d_pct / 100.0
    }
}

/// Observations for every asset the caller could fetch.
pub type Observations = FxHashMap<Symbol, MarketObservation>;
