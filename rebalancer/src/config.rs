//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ballast::{Strategy, Symbol};
use ballast_broker::recall::Environment;
use ballast_risk::RiskConfig;
use chrono::{NaiveTime, Weekday};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub strategies: StrategiesConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    /// "sandbox" or "production".
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Inline key; takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_recall_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_venue_timeout")]
    pub timeout_secs: u64,
    /// Percent.
    #[serde(default = "default_slippage")]
    pub slippage_tolerance: f64,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            api_key: None,
            api_key_env: default_recall_key_env(),
            timeout_secs: default_venue_timeout(),
            slippage_tolerance: default_slippage(),
        }
    }
}

fn default_environment() -> String {
    "sandbox".into()
}
fn default_recall_key_env() -> String {
    "RECALL_API_KEY".into()
}
fn default_venue_timeout() -> u64 {
    30
}
fn default_slippage() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_coingecko_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_market_timeout")]
    pub timeout_secs: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_coingecko_key_env(),
            timeout_secs: default_market_timeout(),
        }
    }
}

fn default_coingecko_key_env() -> String {
    "COINGECKO_API_KEY".into()
}
fn default_market_timeout() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    #[serde(default = "default_quote")]
    pub quote_asset: String,
    #[serde(default = "default_threshold")]
    pub rebalance_threshold: f64,
    #[serde(default = "default_pause")]
    pub trade_pause_ms: u64,
    #[serde(default = "default_target_file")]
    pub target_file: PathBuf,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            quote_asset: default_quote(),
            rebalance_threshold: default_threshold(),
            trade_pause_ms: default_pause(),
            target_file: default_target_file(),
        }
    }
}

fn default_quote() -> String {
    "USDC".into()
}
fn default_threshold() -> f64 {
    0.02
}
fn default_pause() -> u64 {
    1000
}
fn default_target_file() -> PathBuf {
    PathBuf::from("config/portfolio.json")
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategiesConfig {
    #[serde(default = "default_active")]
    pub active: Vec<String>,
}

impl Default for StrategiesConfig {
    fn default() -> Self {
        Self {
            active: default_active(),
        }
    }
}

fn default_active() -> Vec<String> {
    vec!["momentum".into(), "mean_reversion".into(), "volatility".into()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Daily rebalance time, "HH:MM" local.
    #[serde(default = "default_rebalance_time")]
    pub rebalance_time: String,
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_mins: u64,
    #[serde(default = "default_review_weekday")]
    pub review_weekday: String,
    #[serde(default = "default_review_time")]
    pub review_time: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            rebalance_time: default_rebalance_time(),
            monitor_interval_mins: default_monitor_interval(),
            review_weekday: default_review_weekday(),
            review_time: default_review_time(),
        }
    }
}

fn default_rebalance_time() -> String {
    "09:00".into()
}
fn default_monitor_interval() -> u64 {
    60
}
fn default_review_weekday() -> String {
    "monday".into()
}
fn default_review_time() -> String {
    "08:00".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_advisor_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    /// Largest per-asset change below which a suggestion is ignored.
    #[serde(default = "default_min_change")]
    pub min_change: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_model(),
            api_key_env: default_openai_key_env(),
            timeout_secs: default_advisor_timeout(),
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            min_change: default_min_change(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_advisor_timeout() -> u64 {
    60
}
fn default_min_weight() -> f64 {
    0.05
}
fn default_max_weight() -> f64 {
    0.70
}
fn default_min_change() -> f64 {
    0.05
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        self.environment()?;

        let threshold = self.trading.rebalance_threshold;
        if !(0.001..=0.1).contains(&threshold) {
            return Err(Error::Config(format!(
                "rebalance_threshold must be in [0.001, 0.1], got {threshold}"
            )));
        }
        if Symbol::try_new(&self.trading.quote_asset).is_none() {
            return Err(Error::Config(format!(
                "quote_asset {:?} is not a valid symbol",
                self.trading.quote_asset
            )));
        }
        if self.venue.timeout_secs == 0 || self.market_data.timeout_secs == 0 {
            return Err(Error::Config("timeouts must be > 0".into()));
        }
        if !(0.0..=100.0).contains(&self.venue.slippage_tolerance) {
            return Err(Error::Config(
                "slippage_tolerance must be in [0, 100] percent".into(),
            ));
        }
        self.risk.validate().map_err(Error::Config)?;

        for name in &self.strategies.active {
            if Strategy::from_name(name).is_none() {
                return Err(Error::Config(format!("unknown strategy: {name}")));
            }
        }

        parse_time(&self.schedule.rebalance_time)?;
        parse_time(&self.schedule.review_time)?;
        self.review_weekday()?;
        if self.schedule.monitor_interval_mins == 0 {
            return Err(Error::Config("monitor_interval_mins must be > 0".into()));
        }

        let a = &self.advisor;
        if !(0.0 <= a.min_weight && a.min_weight < a.max_weight && a.max_weight <= 1.0) {
            return Err(Error::Config(
                "advisor weights must satisfy 0 <= min_weight < max_weight <= 1".into(),
            ));
        }
        Ok(())
    }

    pub fn environment(&self) -> Result<Environment> {
        self.venue.environment.parse().map_err(Error::Config)
    }

    pub fn quote(&self) -> Symbol {
        Symbol::new(&self.trading.quote_asset)
    }

    pub fn trade_pause(&self) -> Duration {
        Duration::from_millis(self.trading.trade_pause_ms)
    }

    /// Recall API key: inline value or the configured environment variable.
    pub fn venue_api_key(&self) -> Result<String> {
        if let Some(key) = self.venue.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        read_env(&self.venue.api_key_env)
            .ok_or_else(|| Error::Config(format!("{} not set", self.venue.api_key_env)))
    }

    /// Market data key; absence means the free tier.
    pub fn market_data_api_key(&self) -> Option<String> {
        read_env(&self.market_data.api_key_env)
    }

    pub fn advisor_api_key(&self) -> Option<String> {
        read_env(&self.advisor.api_key_env)
    }

    pub fn rebalance_time(&self) -> Result<NaiveTime> {
        parse_time(&self.schedule.rebalance_time)
    }

    pub fn review_time(&self) -> Result<NaiveTime> {
        parse_time(&self.schedule.review_time)
    }

    pub fn review_weekday(&self) -> Result<Weekday> {
        self.schedule
            .review_weekday
            .parse()
            .map_err(|_| Error::Config(format!("bad weekday: {}", self.schedule.review_weekday)))
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| Error::Config(format!("bad time {s:?} (expected HH:MM): {e}")))
}
