//! Trading venue trait and implementations for ballast.
//!
//! Provides a generic `Venue` trait over token-swap venues.
//! Implementations:
//!
//! - **Recall** (feature `recall`): Recall competition trading API
//! - **Mock** ([`mock::MockVenue`]): in-memory venue for tests and dry runs

pub mod error;
pub mod mock;
pub mod retry;
pub mod types;

#[cfg(feature = "recall")]
pub mod recall;

pub use error::BrokerError;
pub use retry::RetryPolicy;
pub use types::*;

/// A venue that holds balances and swaps one token into another.
pub trait Venue {
    /// Check that the venue is reachable.
    fn health_check(&self) -> Result<(), BrokerError>;

    /// Get the authenticated account's profile.
    fn profile(&self) -> Result<AgentProfile, BrokerError>;

    /// Get all token balances.
    fn balances(&self) -> Result<Vec<Balance>, BrokerError>;

    /// Swap `request.amount` base units of `request.from` into `request.to`.
    ///
    /// A receipt with `success == false` means the venue answered but
    /// declined; an `Err` means no usable answer arrived.
    fn execute_trade(&self, request: &TradeRequest<'_>) -> Result<TradeReceipt, BrokerError>;
}

impl<V: Venue + ?Sized> Venue for &V {
    fn health_check(&self) -> Result<(), BrokerError> {
        (**self).health_check()
    }

    fn profile(&self) -> Result<AgentProfile, BrokerError> {
        (**self).profile()
    }

    fn balances(&self) -> Result<Vec<Balance>, BrokerError> {
        (**self).balances()
    }

    fn execute_trade(&self, request: &TradeRequest<'_>) -> Result<TradeReceipt, BrokerError> {
        (**self).execute_trade(request)
    }
}

impl<V: Venue + ?Sized> Venue for Box<V> {
    fn health_check(&self) -> Result<(), BrokerError> {
        (**self).health_check()
    }

    fn profile(&self) -> Result<AgentProfile, BrokerError> {
        (**self).profile()
    }

    fn balances(&self) -> Result<Vec<Balance>, BrokerError> {
        (**self).balances()
    }

    fn execute_trade(&self, request: &TradeRequest<'_>) -> Result<TradeReceipt, BrokerError> {
        (**self).execute_trade(request)
    }
}
