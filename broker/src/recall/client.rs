//! Recall REST API client.

use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use super::Environment;
use super::types::{BalancesResponse, ExecuteRequest, ExecuteResponse, ProfileResponse};
use crate::error::BrokerError;
use crate::retry::RetryPolicy;

/// Blocking Recall REST client with bearer auth and retries.
pub struct RecallClient {
    client: Client,
    api_key: Zeroizing<String>,
    base_url: String,
    retry: RetryPolicy,
}

impl RecallClient {
    /// Create a client for `environment`.
    pub fn new(api_key: &str, environment: Environment, timeout: Duration) -> Result<Self, BrokerError> {
        Self::with_base_url(api_key, environment.base_url(), timeout)
    }

    /// Create a client against an explicit base URL.
    pub fn with_base_url(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, BrokerError> {
        if api_key.trim().is_empty() {
            return Err(BrokerError::Auth("API key is empty".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: Zeroizing::new(api_key.to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Override the retry policy (default: 3 attempts, 1 s / 2 s backoff).
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /api/health.
    pub fn health(&self) -> Result<(), BrokerError> {
        self.get::<serde_json::Value>("/api/health").map(|_| ())
    }

    /// GET /api/agent/profile.
    pub fn profile(&self) -> Result<ProfileResponse, BrokerError> {
        self.get("/api/agent/profile")
    }

    /// GET /api/agent/balances.
    pub fn balances(&self) -> Result<BalancesResponse, BrokerError> {
        self.get("/api/agent/balances")
    }

    /// POST /api/trade/execute.
    pub fn execute(&self, request: &ExecuteRequest<'_>) -> Result<ExecuteResponse, BrokerError> {
        debug!(
            "Executing trade: {} {} -> {}",
            request.amount, request.from_token, request.to_token
        );
        self.post("/api/trade/execute", request)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, BrokerError> {
        let url = self.url(endpoint);
        self.retry
            .run(endpoint, || self.send(self.client.get(&url), endpoint))
    }

    fn post<T: DeserializeOwned, B: Serialize>(&self, endpoint: &str, body: &B) -> Result<T, BrokerError> {
        let url = self.url(endpoint);
        self.retry
            .run(endpoint, || self.send(self.client.post(&url).json(body), endpoint))
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &str) -> Result<T, BrokerError> {
        let resp = request
            .bearer_auth(self.api_key.as_str())
            .send()
            .map_err(|e| BrokerError::Connection(format!("{endpoint} request failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BrokerError::Auth(format!("{endpoint} returned {status}")));
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(BrokerError::Http {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .map_err(|e| BrokerError::Decode(format!("failed to parse {endpoint} response: {e}")))
    }
}
