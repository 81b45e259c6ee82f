//! ballast-rebalancer: risk-gated portfolio rebalancing agent for the
//! Recall trading venue.
//!
//! Reads target weights from a JSON file, values venue balances with
//! CoinGecko prices, plans sells before buys, passes every trade through
//! the risk gate, and records outcomes in a JSONL audit trail. The daemon
//! rebalances daily, monitors drift on an interval, and optionally lets an
//! advisor revise the target once a week.

pub mod advisor;
pub mod audit;
pub mod broker;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod execution;
pub mod market;
pub mod schedule;
pub mod target;
