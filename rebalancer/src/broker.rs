//! Connections to the external services named in the config.

use std::time::Duration;

use ballast::AssetRegistry;
use ballast_broker::Venue;
use ballast_broker::recall::RecallVenue;
use log::{info, warn};

use crate::advisor::OpenAiAdvisor;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::market::CoinGecko;

/// Connect to the trading venue for the configured environment.
pub fn connect_venue(config: &Config) -> Result<RecallVenue> {
    let environment = config.environment()?;
    let api_key = config.venue_api_key()?;
    let venue = RecallVenue::new(
        &api_key,
        environment,
        Duration::from_secs(config.venue.timeout_secs),
    )?
    .with_slippage_tolerance(config.venue.slippage_tolerance);
    info!("Connecting to venue at {} ({environment})", venue.client().base_url());
    Ok(venue)
}

/// Check the venue answers before starting a cycle.
pub fn ensure_healthy<V: Venue>(venue: &V) -> Result<()> {
    venue.health_check().map_err(Error::from)
}

pub fn market_data(config: &Config) -> Result<CoinGecko> {
    let api_key = config.market_data_api_key();
    if api_key.is_none() {
        warn!(
            "{} not set; using the public CoinGecko rate limit",
            config.market_data.api_key_env
        );
    }
    CoinGecko::new(
        AssetRegistry::builtin(),
        api_key,
        Duration::from_secs(config.market_data.timeout_secs),
    )
}

/// The allocation advisor, when enabled and a key is available.
pub fn advisor(config: &Config) -> Result<Option<OpenAiAdvisor>> {
    if !config.advisor.enabled {
        return Ok(None);
    }
    match config.advisor_api_key() {
        Some(key) => OpenAiAdvisor::new(&key, &config.advisor).map(Some),
        None => {
            warn!(
                "Advisor enabled but {} is not set; weekly review disabled",
                config.advisor.api_key_env
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast::Symbol;
    use ballast_broker::mock::MockVenue;

    #[test]
    fn advisor_disabled_by_default() {
        assert!(advisor(&Config::default()).unwrap().is_none());
    }

    #[test]
    fn advisor_without_key_is_skipped() {
        let mut config = Config::default();
        config.advisor.enabled = true;
        config.advisor.api_key_env = "BALLAST_TEST_UNSET_ADVISOR_KEY".into();
        assert!(advisor(&config).unwrap().is_none());
    }

    #[test]
    fn venue_requires_key() {
        let mut config = Config::default();
        config.venue.api_key = None;
        config.venue.api_key_env = "BALLAST_TEST_UNSET_VENUE_KEY".into();
        assert!(matches!(connect_venue(&config), Err(Error::Config(_))));
    }

    #[test]
    fn unhealthy_venue_is_error() {
        let venue = MockVenue::builder()
            .with_balance(Symbol::new("USDC"), 1.0)
            .unhealthy()
            .build();
        assert!(matches!(ensure_healthy(&venue), Err(Error::Venue(_))));
    }
}
