//! Recall competition venue implementation.

pub mod client;
pub mod types;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ballast::Symbol;
use log::{debug, error, info};

use crate::Venue;
use crate::error::BrokerError;
use crate::types::*;
use client::RecallClient;
use types::{BalancesResponse, ExecuteRequest, ExecuteResponse};

/// Recall deployment to trade against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Sandbox => "https://api.sandbox.competitions.recall.network",
            Environment::Production => "https://api.competitions.recall.network",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Sandbox => write!(f, "sandbox"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(Environment::Sandbox),
            "production" => Ok(Environment::Production),
            other => Err(format!(
                "environment must be \"sandbox\" or \"production\", got {other:?}"
            )),
        }
    }
}

/// Recall venue implementing the generic `Venue` trait.
///
/// Blocking (sync) via reqwest::blocking.
pub struct RecallVenue {
    client: RecallClient,
    slippage_tolerance: String,
}

impl RecallVenue {
    /// Connect to `environment` with `api_key`.
    pub fn new(api_key: &str, environment: Environment, timeout: Duration) -> Result<Self, BrokerError> {
        Ok(Self::from_client(RecallClient::new(api_key, environment, timeout)?))
    }

    pub fn from_client(client: RecallClient) -> Self {
        Self {
            client,
            slippage_tolerance: "0.5".to_string(),
        }
    }

    /// Set the slippage tolerance in percent (default "0.5").
    pub fn with_slippage_tolerance(mut self, percent: f64) -> Self {
        self.slippage_tolerance = percent.to_string();
        self
    }

    pub fn client(&self) -> &RecallClient {
        &self.client
    }
}

/// Convert a balances response, skipping entries without a usable symbol.
pub fn parse_balances(resp: BalancesResponse) -> Vec<Balance> {
    resp.balances
        .into_iter()
        .filter_map(|entry| {
            let name = entry.symbol?;
            let Some(symbol) = Symbol::try_new(&name) else {
                debug!("Skipping balance for unsupported symbol {name:?}");
                return None;
            };
            let amount = entry.amount.and_then(|a| a.value()).unwrap_or(0.0);
            Some(Balance { symbol, amount })
        })
        .collect()
}

/// Convert an execute response into a receipt.
pub fn parse_receipt(resp: ExecuteResponse) -> TradeReceipt {
    let tx = resp.transaction.unwrap_or_default();
    TradeReceipt {
        success: resp.success,
        transaction_id: tx.id,
        from_amount: tx.from_amount.and_then(|a| a.value()),
        to_amount: tx.to_amount.and_then(|a| a.value()),
        message: resp.error.or(resp.message),
    }
}

impl Venue for RecallVenue {
    fn health_check(&self) -> Result<(), BrokerError> {
        self.client.health()
    }

    fn profile(&self) -> Result<AgentProfile, BrokerError> {
        let agent = self.client.profile()?.agent;
        Ok(AgentProfile {
            id: agent.id,
            name: agent.name,
            status: agent.status,
        })
    }

    fn balances(&self) -> Result<Vec<Balance>, BrokerError> {
        Ok(parse_balances(self.client.balances()?))
    }

    fn execute_trade(&self, request: &TradeRequest<'_>) -> Result<TradeReceipt, BrokerError> {
        info!(
            "Executing trade: {} {} -> {}",
            request.whole_amount(),
            request.from.symbol,
            request.to.symbol
        );
        let body = ExecuteRequest {
            from_token: &request.from.address,
            to_token: &request.to.address,
            amount: request.amount.to_string(),
            reason: request.reason,
            slippage_tolerance: &self.slippage_tolerance,
        };
        let receipt = parse_receipt(self.client.execute(&body)?);
        if receipt.success {
            info!("Trade executed: {:?}", receipt.transaction_id);
        } else {
            error!("Trade failed: {}", receipt.message.as_deref().unwrap_or("no reason given"));
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing() {
        assert_eq!("sandbox".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("staging".parse::<Environment>().is_err());
        assert!(Environment::Sandbox.base_url().contains("sandbox"));
    }
}
