//! Mock venue for testing: implements the `Venue` trait with configurable behavior.
//!
//! Use this in integration tests to simulate venue responses without network calls.
//!
//! ```
//! use ballast::Symbol;
//! use ballast_broker::mock::{FillMode, MockVenue};
//! use ballast_broker::Venue;
//!
//! let venue = MockVenue::builder()
//!     .fill_mode(FillMode::Fill)
//!     .with_balance(Symbol::new("USDC"), 1_000.0)
//!     .with_price(Symbol::new("WETH"), 2_000.0)
//!     .build();
//!
//! assert_eq!(venue.balances().unwrap().len(), 1);
//! ```

use std::sync::{Mutex, MutexGuard};

use ballast::Symbol;

use crate::Venue;
use crate::error::BrokerError;
use crate::types::*;

/// How the mock venue handles trade requests.
#[derive(Clone, Debug, PartialEq)]
pub enum FillMode {
    /// Swap at the configured prices and update balances.
    Fill,
    /// Answer with `success: false`.
    Decline,
    /// Fail with a connection error.
    Unreachable,
    /// Fill the first `n` trades, then decline.
    FillFirst(usize),
}

/// A recorded trade request for assertion in tests.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedTrade {
    pub from: Symbol,
    pub to: Symbol,
    /// Base units of `from`.
    pub amount: u128,
    pub reason: String,
}

/// Builder for `MockVenue`.
pub struct MockVenueBuilder {
    fill_mode: FillMode,
    balances: Vec<(Symbol, f64)>,
    prices: Vec<(Symbol, f64)>,
    healthy: bool,
}

impl MockVenueBuilder {
    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn with_balance(mut self, symbol: Symbol, amount: f64) -> Self {
        self.balances.push((symbol, amount));
        self
    }

    /// Price used to settle fills. Unpriced tokens are worth 1.0.
    pub fn with_price(mut self, symbol: Symbol, price: f64) -> Self {
        self.prices.push((symbol, price));
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn build(self) -> MockVenue {
        MockVenue {
            fill_mode: self.fill_mode,
            prices: self.prices,
            healthy: self.healthy,
            state: Mutex::new(State {
                balances: self.balances,
                trades: Vec::new(),
            }),
        }
    }
}

struct State {
    balances: Vec<(Symbol, f64)>,
    trades: Vec<RecordedTrade>,
}

/// A mock venue that records trade requests and returns configurable responses.
pub struct MockVenue {
    fill_mode: FillMode,
    prices: Vec<(Symbol, f64)>,
    healthy: bool,
    state: Mutex<State>,
}

impl MockVenue {
    pub fn builder() -> MockVenueBuilder {
        MockVenueBuilder {
            fill_mode: FillMode::Fill,
            balances: Vec::new(),
            prices: Vec::new(),
            healthy: true,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn price(&self, symbol: Symbol) -> f64 {
        self.prices
            .iter()
            .find(|(s, _)| *s == symbol)
            .map_or(1.0, |(_, p)| *p)
    }

    /// Get all trades that were requested (for assertion in tests).
    pub fn recorded_trades(&self) -> Vec<RecordedTrade> {
        self.state().trades.clone()
    }

    /// Current balance of `symbol`.
    pub fn balance(&self, symbol: Symbol) -> f64 {
        self.state()
            .balances
            .iter()
            .find(|(s, _)| *s == symbol)
            .map_or(0.0, |(_, a)| *a)
    }
}

impl Venue for MockVenue {
    fn health_check(&self) -> Result<(), BrokerError> {
        if self.healthy {
            Ok(())
        } else {
            Err(BrokerError::Connection("mock: venue unreachable".into()))
        }
    }

    fn profile(&self) -> Result<AgentProfile, BrokerError> {
        self.health_check()?;
        Ok(AgentProfile {
            id: "mock-agent".into(),
            name: "Mock Agent".into(),
            status: "active".into(),
        })
    }

    fn balances(&self) -> Result<Vec<Balance>, BrokerError> {
        self.health_check()?;
        Ok(self
            .state()
            .balances
            .iter()
            .map(|&(symbol, amount)| Balance { symbol, amount })
            .collect())
    }

    fn execute_trade(&self, request: &TradeRequest<'_>) -> Result<TradeReceipt, BrokerError> {
        let mut state = self.state();
        let filled_so_far = state.trades.len();

        state.trades.push(RecordedTrade {
            from: request.from.symbol,
            to: request.to.symbol,
            amount: request.amount,
            reason: request.reason.to_string(),
        });

        let fill = match &self.fill_mode {
            FillMode::Fill => true,
            FillMode::Decline => false,
            FillMode::FillFirst(n) => filled_so_far < *n,
            FillMode::Unreachable => {
                return Err(BrokerError::Connection("mock: venue unreachable".into()));
            }
        };

        if !fill {
            return Ok(TradeReceipt {
                success: false,
                message: Some("mock: trade declined".into()),
                ..TradeReceipt::default()
            });
        }

        let spent = request.whole_amount();
        let received = spent * self.price(request.from.symbol) / self.price(request.to.symbol);

        let mut adjust = |symbol: Symbol, delta: f64| {
            match state.balances.iter_mut().find(|(s, _)| *s == symbol) {
                Some((_, amount)) => *amount += delta,
                None => state.balances.push((symbol, delta)),
            }
        };
        adjust(request.from.symbol, -spent);
        adjust(request.to.symbol, received);

        Ok(TradeReceipt {
            success: true,
            transaction_id: Some(format!("mock-{}", filled_so_far + 1)),
            from_amount: Some(spent),
            to_amount: Some(received),
            message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast::AssetRegistry;

    fn usdc() -> Symbol {
        Symbol::new("USDC")
    }
    fn weth() -> Symbol {
        Symbol::new("WETH")
    }

    #[test]
    fn builder_basic() {
        let venue = MockVenue::builder()
            .with_balance(usdc(), 1_000.0)
            .with_balance(weth(), 0.5)
            .build();

        venue.health_check().unwrap();
        let balances = venue.balances().unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[1], Balance { symbol: weth(), amount: 0.5 });
        assert_eq!(venue.profile().unwrap().id, "mock-agent");
    }

    #[test]
    fn unhealthy_errors() {
        let venue = MockVenue::builder().unhealthy().build();
        assert!(venue.health_check().is_err());
        assert!(venue.balances().is_err());
    }

    #[test]
    fn fill_moves_balances() {
        let registry = AssetRegistry::builtin();
        let venue = MockVenue::builder()
            .with_balance(usdc(), 1_000.0)
            .with_price(usdc(), 1.0)
            .with_price(weth(), 2_000.0)
            .build();

        let req = TradeRequest::from_amount(
            registry.require(&usdc()).unwrap(),
            registry.require(&weth()).unwrap(),
            600.0,
            "rebalance",
        )
        .unwrap();
        let receipt = venue.execute_trade(&req).unwrap();

        assert!(receipt.success);
        assert_eq!(receipt.transaction_id.as_deref(), Some("mock-1"));
        assert!((venue.balance(usdc()) - 400.0).abs() < 1e-9);
        assert!((venue.balance(weth()) - 0.3).abs() < 1e-12);

        let recorded = venue.recorded_trades();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].amount, 600_000_000);
    }

    #[test]
    fn decline_and_unreachable() {
        let registry = AssetRegistry::builtin();
        let usdc_asset = registry.require(&usdc()).unwrap();
        let weth_asset = registry.require(&weth()).unwrap();
        let req = TradeRequest::from_amount(usdc_asset, weth_asset, 1.0, "t").unwrap();

        let declined = MockVenue::builder().fill_mode(FillMode::Decline).build();
        assert!(!declined.execute_trade(&req).unwrap().success);
        assert_eq!(declined.recorded_trades().len(), 1);

        let down = MockVenue::builder().fill_mode(FillMode::Unreachable).build();
        assert!(down.execute_trade(&req).is_err());
    }

    #[test]
    fn fill_first_n() {
        let registry = AssetRegistry::builtin();
        let req = TradeRequest::from_amount(
            registry.require(&usdc()).unwrap(),
            registry.require(&weth()).unwrap(),
            1.0,
            "t",
        )
        .unwrap();

        let venue = MockVenue::builder().fill_mode(FillMode::FillFirst(1)).build();
        assert!(venue.execute_trade(&req).unwrap().success);
        assert!(!venue.execute_trade(&req).unwrap().success);
    }
}
