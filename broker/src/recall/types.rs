//! Recall-specific API request and response types.

use serde::{Deserialize, Serialize};

/// A numeric field the API sends either as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    /// Numeric value; unparsable text reads as `None`.
    pub fn value(&self) -> Option<f64> {
        match self {
            Amount::Number(n) => Some(*n),
            Amount::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// One entry of `GET /api/agent/balances`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
}

/// `GET /api/agent/balances` response.
#[derive(Debug, Deserialize)]
pub struct BalancesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub balances: Vec<BalanceEntry>,
}

/// Agent identity inside the profile response.
#[derive(Debug, Default, Deserialize)]
pub struct AgentInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// `GET /api/agent/profile` response.
#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub agent: AgentInfo,
}

/// `POST /api/trade/execute` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest<'a> {
    pub from_token: &'a str,
    pub to_token: &'a str,
    /// Base units as a decimal string.
    pub amount: String,
    pub reason: &'a str,
    pub slippage_tolerance: &'a str,
}

/// Transaction details of an executed trade.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub from_amount: Option<Amount>,
    #[serde(default)]
    pub to_amount: Option<Amount>,
}

/// `POST /api/trade/execute` response.
#[derive(Debug, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub transaction: Option<TransactionInfo>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
