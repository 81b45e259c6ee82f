//! End-to-end scenarios: observations → signals → allocation → trades.

use ballast::{
    AssetRegistry, MarketObservation, Observations, PortfolioSnapshot, Side, Signal,
    StrategySet, Symbol, TargetAllocation, drift, plan_trades,
};
use rustc_hash::FxHashMap;

fn usdc() -> Symbol {
    Symbol::new("USDC")
}
fn weth() -> Symbol {
    Symbol::new("WETH")
}
fn wbtc() -> Symbol {
    Symbol::new("WBTC")
}

fn snapshot(balances: &[(Symbol, f64)], prices: &[(Symbol, f64)]) -> PortfolioSnapshot {
    let prices: FxHashMap<Symbol, f64> = prices.iter().copied().collect();
    PortfolioSnapshot::new(balances, &prices)
}

fn half_and_half() -> PortfolioSnapshot {
    snapshot(
        &[(usdc(), 1000.0), (weth(), 0.5)],
        &[(usdc(), 1.0), (weth(), 2000.0)],
    )
}

#[test]
fn already_balanced_portfolio() {
    let snap = half_and_half();
    assert_eq!(snap.total_value(), 2000.0);

    let target = TargetAllocation::new(vec![(usdc(), 0.5), (weth(), 0.5)]).unwrap();
    assert!(plan_trades(&target, &snap, 0.02).is_empty());
}

#[test]
fn shift_into_weth() {
    let target = TargetAllocation::new(vec![(usdc(), 0.2), (weth(), 0.8)]).unwrap();
    let trades = plan_trades(&target, &half_and_half(), 0.02);

    assert_eq!(trades.len(), 2);

    let sell = &trades[0];
    assert_eq!((sell.symbol, sell.side), (usdc(), Side::Sell));
    assert!((sell.amount - 600.0).abs() < 1e-9);

    let buy = &trades[1];
    assert_eq!((buy.symbol, buy.side), (weth(), Side::Buy));
    assert!((buy.amount - 0.3).abs() < 1e-12);
    // the sell leg funds the buy leg exactly
    assert!((buy.notional() - sell.notional()).abs() < 1e-9);
}

#[test]
fn three_asset_rebalance_orders_sells_first() {
    let snap = snapshot(
        &[(weth(), 1.0), (usdc(), 500.0), (wbtc(), 0.05)],
        &[(usdc(), 1.0), (weth(), 2500.0), (wbtc(), 50_000.0)],
    );
    // total 5500: WETH 45.5%, USDC 9.1%, WBTC 45.5%
    let target =
        TargetAllocation::new(vec![(weth(), 0.3), (usdc(), 0.4), (wbtc(), 0.3)]).unwrap();
    let trades = plan_trades(&target, &snap, 0.02);

    let sides: Vec<(Symbol, Side)> = trades.iter().map(|t| (t.symbol, t.side)).collect();
    assert_eq!(
        sides,
        [
            (weth(), Side::Sell),
            (wbtc(), Side::Sell),
            (usdc(), Side::Buy)
        ]
    );

    let report = drift(&target, &snap);
    assert!(report.exceeds(0.1));
}

#[test]
fn strategy_allocation_feeds_planner() {
    let observations: Observations = [
        (usdc(), MarketObservation::at_price(1.0)),
        // strong week, calm day, flat month
        (weth(), MarketObservation::at_price(2000.0).with_changes(0.2, 9.0, 1.0)),
        // sharp drop over the month
        (wbtc(), MarketObservation::at_price(50_000.0).with_changes(0.1, -1.0, -20.0)),
    ]
    .into_iter()
    .collect();

    let strategies = StrategySet::standard(usdc());
    let combined = strategies.combined_signals(&observations);
    assert_eq!(combined[&usdc()], Signal::Hold);

    let weights = strategies
        .allocation_for("mean_reversion", &observations, 10_000.0)
        .unwrap();
    let target = TargetAllocation::from_map(&weights).unwrap();
    assert!(target.weight(&wbtc()) > 0.0);
    assert!((target.sum() - 1.0).abs() < 1e-9);

    let snap = snapshot(
        &[(usdc(), 10_000.0), (weth(), 0.0), (wbtc(), 0.0)],
        &[(usdc(), 1.0), (weth(), 2000.0), (wbtc(), 50_000.0)],
    );
    let trades = plan_trades(&target, &snap, 0.02);
    assert_eq!(trades[0].symbol, usdc());
    assert_eq!(trades[0].side, Side::Sell);
    assert!(trades.iter().any(|t| t.symbol == wbtc() && t.side == Side::Buy));
}

#[test]
fn planned_amounts_convert_to_base_units() {
    let registry = AssetRegistry::builtin();
    let target = TargetAllocation::new(vec![(usdc(), 0.2), (weth(), 0.8)]).unwrap();
    let trades = plan_trades(&target, &half_and_half(), 0.02);

    let buy = &trades[1];
    let quote = registry.require(&usdc()).unwrap();
    // buys spend quote: 0.3 WETH × 2000 = 600 USDC
    assert_eq!(quote.to_base_units(buy.notional()).unwrap(), 600_000_000);

    let sell = &trades[0];
    assert_eq!(quote.to_base_units(sell.amount).unwrap(), 600_000_000);
}
