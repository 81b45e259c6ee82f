//! Market data: spot prices and per-asset observations.
//!
//! [`CoinGecko`] talks to the public CoinGecko API; [`StaticMarketData`]
//! serves fixed values for tests and offline runs.

use std::time::Duration;

use ballast::{AssetRegistry, MarketObservation, Observations, Symbol};
use ballast_broker::{BrokerError, RetryPolicy};
use log::{debug, error, info};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Spot prices in the quote currency (USD).
pub type Prices = FxHashMap<Symbol, f64>;

/// Source of prices and market statistics.
///
/// A lookup that cannot resolve some assets leaves them out of the result
/// rather than failing.
pub trait MarketData {
    /// Current prices for `symbols`. Errors only when nothing could be fetched.
    fn prices(&self, symbols: &[Symbol]) -> Result<Prices>;

    /// Detailed statistics for one asset.
    fn market_data(&self, symbol: Symbol) -> Option<MarketObservation>;

    /// Observations for every symbol that resolves.
    fn observations(&self, symbols: &[Symbol]) -> Observations {
        symbols
            .iter()
            .filter_map(|&s| self.market_data(s).map(|obs| (s, obs)))
            .collect()
    }
}

impl<M: MarketData + ?Sized> MarketData for &M {
    fn prices(&self, symbols: &[Symbol]) -> Result<Prices> {
        (**self).prices(symbols)
    }

    fn market_data(&self, symbol: Symbol) -> Option<MarketObservation> {
        (**self).market_data(symbol)
    }
}

impl<M: MarketData + ?Sized> MarketData for Box<M> {
    fn prices(&self, symbols: &[Symbol]) -> Result<Prices> {
        (**self).prices(symbols)
    }

    fn market_data(&self, symbol: Symbol) -> Option<MarketObservation> {
        (**self).market_data(symbol)
    }
}

// ============================================================================
// CoinGecko
// ============================================================================

pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko REST client. Asset ids come from the registry's `market_id`.
pub struct CoinGecko {
    client: Client,
    base_url: String,
    api_key: Option<Zeroizing<String>>,
    registry: AssetRegistry,
    retry: RetryPolicy,
}

#[derive(Debug, Default, Deserialize)]
struct UsdValue {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct CoinMarketData {
    #[serde(default)]
    current_price: UsdValue,
    #[serde(default)]
    market_cap: UsdValue,
    #[serde(default)]
    total_volume: UsdValue,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    price_change_percentage_7d: Option<f64>,
    #[serde(default)]
    price_change_percentage_30d: Option<f64>,
    #[serde(default)]
    high_24h: UsdValue,
    #[serde(default)]
    low_24h: UsdValue,
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    #[serde(default)]
    market_data: CoinMarketData,
}

impl CoinMarketData {
    fn into_observation(self) -> MarketObservation {
        MarketObservation {
            price: self.current_price.usd.unwrap_or(0.0),
            market_cap: self.market_cap.usd.unwrap_or(0.0),
            volume_24h: self.total_volume.usd.unwrap_or(0.0),
            change_24h_pct: self.price_change_percentage_24h.unwrap_or(0.0),
            change_7d_pct: self.price_change_percentage_7d.unwrap_or(0.0),
            change_30d_pct: self.price_change_percentage_30d.unwrap_or(0.0),
            high_24h: self.high_24h.usd.unwrap_or(0.0),
            low_24h: self.low_24h.usd.unwrap_or(0.0),
        }
    }
}

impl CoinGecko {
    pub fn new(registry: AssetRegistry, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(COINGECKO_BASE_URL, registry, api_key, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        registry: AssetRegistry,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::MarketData(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(Zeroizing::new),
            registry,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> std::result::Result<T, BrokerError> {
        let url = format!("{}{endpoint}", self.base_url);
        self.retry.run(endpoint, || {
            let mut request = self.client.get(&url).query(query);
            if let Some(key) = &self.api_key {
                request = request.header("x-cg-demo-api-key", key.as_str());
            }
            let resp = request
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
        })
    }
}

/// Map a `/simple/price` response back to symbols.
fn parse_simple_prices(
    registry: &AssetRegistry,
    symbols: &[Symbol],
    data: &FxHashMap<String, UsdValue>,
) -> Prices {
    symbols
        .iter()
        .filter_map(|s| {
            let id = &registry.get(s)?.market_id;
            let price = data.get(id.as_str())?.usd?;
            Some((*s, price))
        })
        .collect()
}

impl MarketData for CoinGecko {
    fn prices(&self, symbols: &[Symbol]) -> Result<Prices> {
        let ids: Vec<&str> = symbols
            .iter()
            .filter_map(|s| self.registry.get(s).map(|a| a.market_id.as_str()))
            .collect();
        if ids.is_empty() {
            return Ok(Prices::default());
        }

        let joined = ids.join(",");
        let data: FxHashMap<String, UsdValue> = self
            .get("/simple/price", &[("ids", &joined), ("vs_currencies", "usd")])
            .map_err(|e| Error::MarketData(e.to_string()))?;

        let prices = parse_simple_prices(&self.registry, symbols, &data);
        info!("Fetched prices for {} tokens", prices.len());
        Ok(prices)
    }

    fn market_data(&self, symbol: Symbol) -> Option<MarketObservation> {
        let Some(asset) = self.registry.get(&symbol) else {
            error!("Unknown token symbol: {symbol}");
            return None;
        };
        let endpoint = format!("/coins/{}", asset.market_id);
        let query = [
            ("localization", "false"),
            ("tickers", "false"),
            ("market_data", "true"),
            ("community_data", "false"),
            ("developer_data", "false"),
            ("sparkline", "false"),
        ];
        match self.get::<CoinResponse>(&endpoint, &query) {
            Ok(resp) => {
                debug!("Market data for {symbol} fetched");
                Some(resp.market_data.into_observation())
            }
            Err(e) => {
                error!("Failed to fetch market data for {symbol}: {e}");
                None
            }
        }
    }
}

// ============================================================================
// Static
// ============================================================================

/// Fixed market data.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    observations: Observations,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: Symbol, observation: MarketObservation) -> Self {
        self.observations.insert(symbol, observation);
        self
    }

    pub fn with_price(self, symbol: Symbol, price: f64) -> Self {
        self.with(symbol, MarketObservation::at_price(price))
    }
}

impl MarketData for StaticMarketData {
    fn prices(&self, symbols: &[Symbol]) -> Result<Prices> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.observations.get(s).map(|o| (*s, o.price)))
            .collect())
    }

    fn market_data(&self, symbol: Symbol) -> Option<MarketObservation> {
        self.observations.get(&symbol).cloned()
    }
}
