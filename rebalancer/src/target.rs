//! Target allocation file (portfolio.json) loading and saving.
//!
//! Two layouts are accepted:
//!
//! ```json
//! { "USDC": 0.25, "WETH": 0.50, "WBTC": 0.25 }
//! ```
//!
//! ```json
//! { "timestamp": "2026-02-08T15:30:00Z",
//!   "targets": [ { "symbol": "WETH", "weight": 0.5 }, { "symbol": "USDC", "weight": 0.5 } ] }
//! ```
//!
//! The listed form keeps its order; the flat form is ordered by symbol.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use ballast::{AllocationError, Symbol, TargetAllocation};
use chrono::{DateTime, Utc};
use log::warn;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetFile {
    Listed {
        #[serde(default)]
        #[allow(dead_code)]
        timestamp: Option<DateTime<Utc>>,
        targets: Vec<TargetEntry>,
    },
    Flat(BTreeMap<String, f64>),
}

#[derive(Debug, Deserialize)]
struct TargetEntry {
    symbol: String,
    weight: f64,
}

fn symbol(name: &str) -> Result<Symbol> {
    Symbol::try_new(name).ok_or_else(|| AllocationError::UnknownAsset(name.to_string()).into())
}

/// Parse a target allocation from JSON text.
pub fn from_json(json: &str) -> Result<TargetAllocation> {
    let weights = match serde_json::from_str::<TargetFile>(json)? {
        TargetFile::Listed { targets, .. } => targets
            .iter()
            .map(|t| Ok((symbol(&t.symbol)?, t.weight)))
            .collect::<Result<Vec<_>>>()?,
        TargetFile::Flat(map) => map
            .iter()
            .map(|(name, w)| Ok((symbol(name)?, *w)))
            .collect::<Result<Vec<_>>>()?,
    };
    Ok(TargetAllocation::new(weights)?)
}

/// Allocation used when no target file exists yet.
pub fn default_allocation() -> Result<TargetAllocation> {
    Ok(TargetAllocation::new(vec![
        (Symbol::new("USDC"), 0.4),
        (Symbol::new("WETH"), 0.4),
        (Symbol::new("WBTC"), 0.2),
    ])?)
}

/// Load and validate a target file. A missing file yields
/// [`default_allocation`].
pub fn load(path: &Path) -> Result<TargetAllocation> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("No target file at {}, using default allocation", path.display());
            return default_allocation();
        }
        Err(e) => {
            return Err(Error::TargetRead {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    from_json(&contents)
}

/// Write `target` in the flat layout, creating parent directories.
pub fn save(path: &Path, target: &TargetAllocation) -> Result<()> {
    let map: BTreeMap<&str, f64> = target
        .weights()
        .iter()
        .map(|(s, w)| (s.as_str(), *w))
        .collect();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&map)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> Symbol {
        Symbol::new("USDC")
    }
    fn weth() -> Symbol {
        Symbol::new("WETH")
    }

    #[test]
    fn parse_flat() {
        let target = from_json(r#"{ "USDC": 0.25, "WETH": 0.50, "WBTC": 0.25 }"#).unwrap();
        assert_eq!(target.len(), 3);
        assert_eq!(target.weight(&weth()), 0.5);
        assert_eq!(target.weights()[0].0, usdc());
    }

    #[test]
    fn parse_listed_keeps_order() {
        let json = r#"{
            "timestamp": "2026-02-08T15:30:00Z",
            "targets": [
                { "symbol": "WETH", "weight": 0.8 },
                { "symbol": "USDC", "weight": 0.2 }
            ]
        }"#;
        let target = from_json(json).unwrap();
        assert_eq!(target.weights()[0].0, weth());
        assert_eq!(target.weight(&usdc()), 0.2);
    }

    #[test]
    fn normalizes_off_sum() {
        let target = from_json(r#"{ "USDC": 1.0, "WETH": 1.0 }"#).unwrap();
        assert!((target.weight(&usdc()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn reject_malformed() {
        assert!(matches!(from_json("{}"), Err(Error::Target(AllocationError::Empty))));
        assert!(matches!(
            from_json(r#"{ "USDC": -0.1, "WETH": 1.1 }"#),
            Err(Error::Target(AllocationError::InvalidFraction { .. }))
        ));
        assert!(matches!(
            from_json(r#"{ "USDC": 0.0 }"#),
            Err(Error::Target(AllocationError::ZeroSum))
        ));
        assert!(matches!(
            from_json(r#"{ "TOOLONGNAME": 1.0 }"#),
            Err(Error::Target(AllocationError::UnknownAsset(_)))
        ));
        assert!(matches!(from_json("[1, 2]"), Err(Error::TargetParse(_))));
    }

    #[test]
    fn reject_duplicate_listed() {
        let json = r#"{ "targets": [
            { "symbol": "WETH", "weight": 0.5 },
            { "symbol": "WETH", "weight": 0.5 }
        ] }"#;
        assert!(matches!(
            from_json(json),
            Err(Error::Target(AllocationError::Duplicate(_)))
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("portfolio.json");
        let target = TargetAllocation::new(vec![(weth(), 0.6), (usdc(), 0.4)]).unwrap();

        save(&path, &target).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.weight(&weth()), 0.6);
        assert_eq!(loaded.weight(&usdc()), 0.4);
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let target = load(&dir.path().join("portfolio.json")).unwrap();

        assert_eq!(target.len(), 3);
        assert_eq!(target.weight(&usdc()), 0.4);
        assert_eq!(target.weight(&weth()), 0.4);
        assert_eq!(target.weight(&Symbol::new("WBTC")), 0.2);
    }

    #[test]
    fn unreadable_path_is_error() {
        // a directory exists but cannot be read as a file
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::TargetRead { .. }));
    }

    #[test]
    fn shipped_portfolio_parses() {
        let target = from_json(include_str!("../config/portfolio.json")).unwrap();
        assert_eq!(target.len(), 3);
        assert_eq!(target.weight(&weth()), 0.5);
    }
}
