//! Majority-vote aggregation of strategy signals.

use log::{info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::AllocationError;
use crate::market::Observations;
use crate::signal::{Signal, Signals};
use crate::strategy::Strategy;
use crate::types::Symbol;

/// Combine per-strategy signals into one signal per asset.
///
/// Every asset seen by any strategy gets a vote from each strategy; a
/// strategy that did not report the asset votes hold. The signal with the
/// most votes wins, and equal counts resolve as buy > sell > hold.
pub fn combine<'a, I>(per_strategy: I) -> Signals
where
    I: IntoIterator<Item = &'a Signals>,
{
    let per_strategy: Vec<&Signals> = per_strategy.into_iter().collect();

    let symbols: FxHashSet<Symbol> = per_strategy
        .iter()
        .flat_map(|signals| signals.keys().copied())
        .collect();

    symbols
        .into_iter()
        .map(|symbol| {
            let mut votes = [0usize; 3];
            for signals in &per_strategy {
                let signal = signals.get(&symbol).copied().unwrap_or(Signal::Hold);
                votes[signal.index()] += 1;
            }
            (symbol, winner(&votes))
        })
        .collect()
}

/// First signal in precedence order holding the maximum vote count.
fn winner(votes: &[usize; 3]) -> Signal {
    let best = votes.iter().copied().max().unwrap_or(0);
    Signal::PRECEDENCE
        .into_iter()
        .find(|s| votes[s.index()] == best)
        .unwrap_or(Signal::Hold)
}

/// Named, ordered set of strategies whose signals are combined by vote.
#[derive(Clone, Debug)]
pub struct StrategySet {
    strategies: Vec<(String, Strategy)>,
    quote: Symbol,
}

impl StrategySet {
    /// Empty set; `quote` is the asset every strategy holds.
    pub fn new(quote: Symbol) -> Self {
        Self {
            strategies: Vec::new(),
            quote,
        }
    }

    /// Momentum, mean reversion, and volatility with default parameters.
    pub fn standard(quote: Symbol) -> Self {
        let mut set = Self::new(quote);
        for strategy in [
            Strategy::momentum(),
            Strategy::mean_reversion(),
            Strategy::volatility(),
        ] {
            set.add(strategy.name(), strategy);
        }
        set
    }

    /// Build from configuration names, rejecting unknown ones.
    pub fn from_names<S: AsRef<str>>(quote: Symbol, names: &[S]) -> Result<Self, AllocationError> {
        let mut set = Self::new(quote);
        for name in names {
            let name = name.as_ref();
            let strategy = Strategy::from_name(name)
                .ok_or_else(|| AllocationError::UnknownStrategy(name.to_string()))?;
            set.add(name, strategy);
        }
        Ok(set)
    }

    /// Add a strategy, replacing any existing one with the same name.
    pub fn add(&mut self, name: &str, strategy: Strategy) {
        match self.strategies.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = strategy,
            None => self.strategies.push((name.to_string(), strategy)),
        }
        info!("Added strategy: {name}");
    }

    /// Remove a strategy by name. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.strategies.len();
        self.strategies.retain(|(n, _)| n != name);
        let removed = self.strategies.len() != before;
        if removed {
            info!("Removed strategy: {name}");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.strategies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|(n, _)| n.as_str())
    }

    pub fn quote(&self) -> Symbol {
        self.quote
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Signals from each strategy, in insertion order.
    pub fn signals_by_strategy(&self, observations: &Observations) -> Vec<(&str, Signals)> {
        self.strategies
            .iter()
            .map(|(name, strategy)| {
                (
                    name.as_str(),
                    strategy.generate_signals(observations, self.quote),
                )
            })
            .collect()
    }

    /// Run every strategy and combine the results by majority vote.
    pub fn combined_signals(&self, observations: &Observations) -> Signals {
        if self.strategies.is_empty() {
            warn!("No strategies configured; every asset holds");
        }
        let per_strategy = self.signals_by_strategy(observations);
        combine(per_strategy.iter().map(|(_, signals)| signals))
    }

    /// Target weights proposed by a single named strategy.
    pub fn allocation_for(
        &self,
        name: &str,
        observations: &Observations,
        portfolio_value: f64,
    ) -> Result<FxHashMap<Symbol, f64>, AllocationError> {
        let strategy = self
            .get(name)
            .ok_or_else(|| AllocationError::UnknownStrategy(name.to_string()))?;
        let signals = strategy.generate_signals(observations, self.quote);
        Ok(strategy.position_sizes(&signals, portfolio_value, self.quote))
    }
}
