//! CLI entry point for the ballast rebalancer.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use ballast::{PortfolioSnapshot, StrategySet, Symbol, TargetAllocation};
use ballast_broker::Venue;
use ballast_broker::recall::{Environment, RecallVenue};
use ballast_risk::RiskGate;
use chrono::Utc;
use clap::{Parser, Subcommand};

use ballast_rebalancer::advisor::Advisor;
use ballast_rebalancer::audit::AuditLog;
use ballast_rebalancer::broker;
use ballast_rebalancer::config::Config;
use ballast_rebalancer::diagnostics;
use ballast_rebalancer::error::Error;
use ballast_rebalancer::execution::{Coordinator, CycleSettings};
use ballast_rebalancer::market::{CoinGecko, MarketData};
use ballast_rebalancer::schedule;
use ballast_rebalancer::target;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Risk-gated portfolio rebalancer for the Recall trading venue")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Log filter, e.g. "debug" or "ballast_rebalancer=trace" (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one rebalancing cycle toward the target file
    Run {
        /// Plan and risk-check without trading
        #[arg(long)]
        dry_run: bool,

        /// Skip the production confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Rebalance daily, monitor drift, and review the target weekly
    Daemon,

    /// Show holdings and drift from the target
    Status,

    /// Show strategy signals and allocations from live market data
    Signals,

    /// Exercise the risk gate with sample trades
    RiskCheck,

    /// Check the venue connection and account
    Health,
}

fn main() {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    logger.format_timestamp_secs();
    if let Some(level) = &cli.log_level {
        logger.parse_filters(level);
    }
    logger.init();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run { dry_run, force } => run(&config, dry_run, force),
        Command::Daemon => daemon(&config),
        Command::Status => status(&config),
        Command::Signals => signals(&config),
        Command::RiskCheck => risk_check(&config),
        Command::Health => health(&config),
    };

    if let Err(e) = result {
        match e.downcast_ref::<Error>() {
            Some(Error::Aborted(msg)) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e:#}");
                process::exit(1);
            }
        }
    }
}

fn load_target(config: &Config) -> anyhow::Result<TargetAllocation> {
    let path = &config.trading.target_file;
    target::load(path).with_context(|| format!("loading target {}", path.display()))
}

fn coordinator(config: &Config) -> anyhow::Result<Coordinator<RecallVenue, CoinGecko>> {
    let venue = broker::connect_venue(config).context("connecting to venue")?;
    broker::ensure_healthy(&venue).context("venue health check")?;
    let market = broker::market_data(config)?;
    let risk = RiskGate::try_new(config.risk.clone()).map_err(Error::Config)?;
    Ok(Coordinator::new(
        venue,
        market,
        risk,
        CycleSettings::from_config(config),
    ))
}

fn with_audit(
    coordinator: Coordinator<RecallVenue, CoinGecko>,
    config: &Config,
) -> anyhow::Result<Coordinator<RecallVenue, CoinGecko>> {
    let path = config.audit_path();
    let audit =
        AuditLog::open(&path).with_context(|| format!("opening audit log {}", path.display()))?;
    Ok(coordinator.with_audit(Box::new(audit)))
}

fn display_snapshot(snapshot: &PortfolioSnapshot) {
    if snapshot.is_empty() {
        println!("No balances.");
        return;
    }
    println!("CURRENT PORTFOLIO: ${:.2}", snapshot.total_value());
    for (symbol, h) in snapshot.iter() {
        println!(
            "  {:8} {:>16.6} @ ${:>10.2} = ${:>10.2}  ({:.1}%)",
            symbol,
            h.balance,
            h.price,
            h.value,
            h.allocation * 100.0,
        );
    }
    println!();
}

fn run(config: &Config, dry_run: bool, force: bool) -> anyhow::Result<()> {
    let target = load_target(config)?;
    let mut coordinator = with_audit(coordinator(config)?, config)?;
    coordinator.set_dry_run(dry_run);

    let (snapshot, report) = coordinator.status(&target)?;
    display_snapshot(&snapshot);
    print!("{report}");

    if !dry_run && !force && config.environment()? == Environment::Production {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Trade on production?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;
        if !confirmed {
            return Err(Error::Aborted("Aborted.".into()).into());
        }
    }

    let summary = coordinator.rebalance(&target)?;
    println!("\n{summary}");
    Ok(())
}

fn daemon(config: &Config) -> anyhow::Result<()> {
    let mut coordinator = with_audit(coordinator(config)?, config)?;
    let advisor = broker::advisor(config)?;
    let advisor = advisor.as_ref().map(|a| a as &dyn Advisor);
    schedule::run_daemon(&mut coordinator, config, advisor)?;
    Ok(())
}

fn status(config: &Config) -> anyhow::Result<()> {
    let target = load_target(config)?;
    let coordinator = coordinator(config)?;
    let (snapshot, report) = coordinator.status(&target)?;
    display_snapshot(&snapshot);
    println!("TARGET: {target}\n");
    print!("{report}");
    Ok(())
}

fn signals(config: &Config) -> anyhow::Result<()> {
    let target = load_target(config)?;
    let quote = config.quote();
    let strategies = StrategySet::from_names(quote, &config.strategies.active)?;
    let market = broker::market_data(config)?;

    let mut symbols: Vec<Symbol> = target.symbols().collect();
    if !symbols.contains(&quote) {
        symbols.push(quote);
    }
    let observations = market.observations(&symbols);
    if observations.is_empty() {
        return Err(Error::MarketData("no market data available".into()).into());
    }

    print!("{}", diagnostics::signal_report(&strategies, observations, 10_000.0));
    Ok(())
}

fn risk_check(config: &Config) -> anyhow::Result<()> {
    let result = diagnostics::risk_self_test(config.risk.clone(), Utc::now()).map_err(Error::Config)?;
    print!("{result}");
    Ok(())
}

fn health(config: &Config) -> anyhow::Result<()> {
    let venue = broker::connect_venue(config)?;
    print!("Checking {}... ", venue.client().base_url());
    venue.health_check()?;
    println!("OK");

    let profile = venue.profile()?;
    println!("Agent {} ({}): {}", profile.name, profile.id, profile.status);

    let balances = venue.balances()?;
    println!("{} balances", balances.len());
    for b in &balances {
        println!("  {:8} {:>16.6}", b.symbol, b.amount);
    }
    Ok(())
}
