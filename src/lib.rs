//! # ballast
//!
//! Core engine for a target-allocation rebalancing agent: strategy signals,
//! majority voting, and trade planning.
//!
//! ## Features
//!
//! - **Strategies**: Momentum, Mean-Reversion, and Volatility signal generators
//! - **Voting**: per-asset majority vote across strategies, ties resolved buy > sell > hold
//! - **Planning**: weight drift → ordered trades, sells before buys
//! - **Base units**: exact decimal truncation for on-chain token amounts
//!
//! ## Quick Start
//!
//! ```
//! use ballast::{plan_trades, PortfolioSnapshot, Side, Symbol, TargetAllocation};
//! use rustc_hash::FxHashMap;
//!
//! let usdc = Symbol::new("USDC");
//! let weth = Symbol::new("WETH");
//!
//! let prices: FxHashMap<Symbol, f64> = [(usdc, 1.0), (weth, 2000.0)].into_iter().collect();
//! let snapshot = PortfolioSnapshot::new(&[(usdc, 1000.0), (weth, 0.5)], &prices);
//!
//! let target = TargetAllocation::new(vec![(usdc, 0.2), (weth, 0.8)]).unwrap();
//! let trades = plan_trades(&target, &snapshot, 0.02);
//!
//! // Sell 600 USDC first, then buy 0.3 WETH with it
//! assert_eq!(trades[0].side, Side::Sell);
//! assert_eq!(trades[1].side, Side::Buy);
//! assert!((trades[1].amount - 0.3).abs() < 1e-12);
//! ```
//!
//! ## Signals
//!
//! ```
//! use ballast::{MarketObservation, Observations, Signal, StrategySet, Symbol};
//!
//! let usdc = Symbol::new("USDC");
//! let weth = Symbol::new("WETH");
//!
//! let mut observations = Observations::default();
//! observations.insert(usdc, MarketObservation::at_price(1.0));
//! // +8% over 7 days, calm day, flat month
//! observations.insert(weth, MarketObservation::at_price(2000.0).with_changes(0.1, 8.0, 0.0));
//!
//! let strategies = StrategySet::standard(usdc);
//! let combined = strategies.combined_signals(&observations);
//! assert_eq!(combined[&usdc], Signal::Hold);
//! ```
//!
//! ## Base Units
//!
//! ```
//! use ballast::AssetRegistry;
//!
//! let registry = AssetRegistry::builtin();
//! let usdc = registry.lookup("USDC").unwrap();
//! assert_eq!(usdc.to_base_units(1.2345678).unwrap(), 1_234_567);  // truncated
//! ```

pub mod aggregate;
mod allocation;
pub mod asset;
mod error;
mod market;
pub mod plan;
mod side;
mod signal;
mod snapshot;
pub mod strategy;
mod types;

// Re-export public API
pub use aggregate::{StrategySet, combine};
pub use allocation::{SUM_TOLERANCE, TargetAllocation};
pub use asset::{Asset, AssetRegistry, Chain, from_base_units, to_base_units};
pub use error::AllocationError;
pub use market::{MarketObservation, Observations};
pub use plan::{DriftEntry, DriftReport, PlannedTrade, drift, plan_trades};
pub use side::Side;
pub use signal::{Signal, Signals};
pub use snapshot::{Holding, PortfolioSnapshot};
pub use strategy::{Sizing, Strategy, Window, volatility_proxy};
pub use types::{SYMBOL_CAPACITY, Symbol};
