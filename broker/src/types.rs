//! Shared venue types: balances, profile, trade requests and receipts.

use ballast::{Asset, Symbol};

use crate::error::BrokerError;

/// Balance of one token held at the venue.
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub symbol: Symbol,
    /// Whole tokens, not base units.
    pub amount: f64,
}

/// Identity of the trading account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub status: String,
}

/// A swap of `amount` base units of `from` into `to`.
#[derive(Debug, Clone, Copy)]
pub struct TradeRequest<'a> {
    pub from: &'a Asset,
    pub to: &'a Asset,
    /// Base units of `from`.
    pub amount: u128,
    pub reason: &'a str,
}

impl<'a> TradeRequest<'a> {
    /// Build a request for `amount` whole tokens of `from`, truncated to
    /// its base units. Zero after truncation is an error.
    pub fn from_amount(
        from: &'a Asset,
        to: &'a Asset,
        amount: f64,
        reason: &'a str,
    ) -> Result<Self, BrokerError> {
        let base = from
            .to_base_units(amount)
            .map_err(|e| BrokerError::Amount(e.to_string()))?;
        if base == 0 {
            return Err(BrokerError::Amount(format!(
                "{amount} {} is below one base unit",
                from.symbol
            )));
        }
        Ok(Self {
            from,
            to,
            amount: base,
            reason,
        })
    }

    /// Amount in whole tokens of `from`.
    pub fn whole_amount(&self) -> f64 {
        self.from.from_base_units(self.amount)
    }
}

/// Venue's answer to a trade request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeReceipt {
    pub success: bool,
    pub transaction_id: Option<String>,
    /// Whole tokens spent, when reported.
    pub from_amount: Option<f64>,
    /// Whole tokens received, when reported.
    pub to_amount: Option<f64>,
    /// Error or status message, when reported.
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast::AssetRegistry;

    #[test]
    fn request_truncates_to_base_units() {
        let registry = AssetRegistry::builtin();
        let usdc = registry.lookup("USDC").unwrap();
        let weth = registry.lookup("WETH").unwrap();

        let req = TradeRequest::from_amount(usdc, weth, 600.1234567, "rebalance").unwrap();
        assert_eq!(req.amount, 600_123_456);
        assert!((req.whole_amount() - 600.123456).abs() < 1e-9);
    }

    #[test]
    fn dust_is_rejected() {
        let registry = AssetRegistry::builtin();
        let usdc = registry.lookup("USDC").unwrap();
        let weth = registry.lookup("WETH").unwrap();

        let err = TradeRequest::from_amount(usdc, weth, 0.0000001, "dust").unwrap_err();
        assert!(matches!(err, BrokerError::Amount(_)));

        let err = TradeRequest::from_amount(usdc, weth, -1.0, "neg").unwrap_err();
        assert!(matches!(err, BrokerError::Amount(_)));
    }
}
