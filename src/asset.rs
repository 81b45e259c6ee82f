//! Asset reference data and base-unit conversion.
//!
//! Venues move integer amounts in each token's smallest unit. Conversions
//! work on the decimal text of the amount so that truncation is exact: an
//! amount is never rounded up on its way to base units.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::AllocationError;
use crate::types::Symbol;

/// Chain family the token lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Chain {
    Evm,
    Svm,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Evm => write!(f, "evm"),
            Chain::Svm => write!(f, "svm"),
        }
    }
}

/// Immutable reference data for one tradable token.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Asset {
    pub symbol: Symbol,
    /// Number of decimal places in one whole token.
    pub decimals: u8,
    /// Token address on the venue.
    pub address: String,
    pub chain: Chain,
    /// Identifier used by the market-data source.
    pub market_id: String,
}

impl Asset {
    pub fn new(symbol: &str, decimals: u8, address: &str, chain: Chain, market_id: &str) -> Self {
        Self {
            symbol: Symbol::new(symbol),
            decimals,
            address: address.to_string(),
            chain,
            market_id: market_id.to_string(),
        }
    }

    /// Convert a human-readable amount to base units, truncating toward zero.
    pub fn to_base_units(&self, amount: f64) -> Result<u128, AllocationError> {
        to_base_units(amount, self.decimals)
    }

    /// Convert base units back to a human-readable amount.
    pub fn from_base_units(&self, base: u128) -> f64 {
        from_base_units(base, self.decimals)
    }
}

/// Lookup table of known assets, keyed by symbol.
#[derive(Clone, Debug, Default)]
pub struct AssetRegistry {
    assets: FxHashMap<Symbol, Asset>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the tokens the agent trades by default.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(Asset::new(
            "USDC",
            6,
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            Chain::Evm,
            "usd-coin",
        ));
        registry.insert(Asset::new(
            "WETH",
            18,
            "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            Chain::Evm,
            "weth",
        ));
        registry.insert(Asset::new(
            "WBTC",
            8,
            "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599",
            Chain::Evm,
            "wrapped-bitcoin",
        ));
        registry.insert(Asset::new(
            "SOL",
            9,
            "So11111111111111111111111111111111111111112",
            Chain::Svm,
            "solana",
        ));
        registry
    }

    /// Add or replace an asset.
    pub fn insert(&mut self, asset: Asset) {
        self.assets.insert(asset.symbol, asset);
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Asset> {
        self.assets.get(symbol)
    }

    /// Like [`get`](Self::get) but reports unknown assets as an error.
    pub fn require(&self, symbol: &Symbol) -> Result<&Asset, AllocationError> {
        self.get(symbol)
            .ok_or_else(|| AllocationError::UnknownAsset(symbol.as_str().to_string()))
    }

    /// Resolve a textual ticker (e.g. from a venue response).
    pub fn lookup(&self, ticker: &str) -> Option<&Asset> {
        Symbol::try_new(ticker).and_then(|sym| self.assets.get(&sym))
    }

    /// Find the asset whose venue address matches `address` (case-insensitive).
    pub fn by_address(&self, address: &str) -> Option<&Asset> {
        self.assets
            .values()
            .find(|a| a.address.eq_ignore_ascii_case(address))
    }

    /// All registered symbols, sorted.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.assets.keys().copied().collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Convert `amount` whole tokens into integer base units with `decimals`
/// places, discarding any digits beyond the token's precision.
pub fn to_base_units(amount: f64, decimals: u8) -> Result<u128, AllocationError> {
    if !amount.is_finite() {
        return Err(AllocationError::Units {
            amount: amount.to_string(),
            reason: "amount is not finite",
        });
    }
    if amount < 0.0 {
        return Err(AllocationError::Units {
            amount: amount.to_string(),
            reason: "amount is negative",
        });
    }
    if amount == 0.0 {
        return Ok(0);
    }

    // f64's Display never uses exponent notation, so this is plain decimal text.
    let text = amount.to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let decimals = decimals as usize;
    let mut digits = String::with_capacity(int_part.len() + decimals);
    digits.push_str(int_part);
    digits.extend(frac_part.chars().chain(std::iter::repeat('0')).take(decimals));

    digits.parse::<u128>().map_err(|_| AllocationError::Units {
        amount: text.clone(),
        reason: "amount overflows base units",
    })
}

/// Convert integer base units back into whole tokens.
pub fn from_base_units(base: u128, decimals: u8) -> f64 {
    let digits = base.to_string();
    let decimals = decimals as usize;
    let text = if digits.len() > decimals {
        let (int_part, frac_part) = digits.split_at(digits.len() - decimals);
        format!("{int_part}.{frac_part}")
    } else {
        format!("0.{digits:0>decimals$}")
    };
    text.parse().unwrap_or(0.0)
}
