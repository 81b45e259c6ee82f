//! JSONL audit trail logging.
//!
//! Each cycle appends events to an audit.jsonl file, one JSON object per
//! line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use ballast::{PlannedTrade, PortfolioSnapshot, TargetAllocation};
use ballast_broker::TradeReceipt;
use ballast_risk::RiskReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error::Result;
use crate::execution::CycleSummary;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Where audit events go.
pub trait AuditSink {
    fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()>;
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, json!({}))
    }
}

impl AuditSink for AuditLog {
    fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let line = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards every event; used by dry runs and tests.
#[derive(Debug, Default)]
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn log(&mut self, _event: &'static str, _data: serde_json::Value) -> Result<()> {
        Ok(())
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    pub events: Vec<(&'static str, serde_json::Value)>,
}

impl MemoryAudit {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(|(name, _)| *name).collect()
    }
}

impl AuditSink for MemoryAudit {
    fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        self.events.push((event, data));
        Ok(())
    }
}

/// Shared sink, so a caller can read events after handing one to a
/// coordinator.
impl<S: AuditSink> AuditSink for Arc<Mutex<S>> {
    fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .log(event, data)
    }
}

pub fn log_cycle_started(audit: &mut dyn AuditSink, kind: &str, dry_run: bool) -> Result<()> {
    audit.log("cycle_started", json!({ "kind": kind, "dry_run": dry_run }))
}

pub fn log_snapshot(audit: &mut dyn AuditSink, snapshot: &PortfolioSnapshot) -> Result<()> {
    let holdings: Vec<_> = snapshot
        .iter()
        .map(|(symbol, h)| {
            json!({
                "symbol": symbol.as_str(),
                "balance": h.balance,
                "price": h.price,
                "value": h.value,
                "allocation": h.allocation,
            })
        })
        .collect();

    audit.log(
        "snapshot",
        json!({ "total_value": snapshot.total_value(), "holdings": holdings }),
    )
}

pub fn log_plan(
    audit: &mut dyn AuditSink,
    target: &TargetAllocation,
    trades: &[PlannedTrade],
) -> Result<()> {
    let trade_data: Vec<_> = trades
        .iter()
        .map(|t| {
            json!({
                "symbol": t.symbol.as_str(),
                "side": t.side.to_string(),
                "amount": t.amount,
                "price": t.price,
                "current_weight": t.current_weight,
                "target_weight": t.target_weight,
                "weight_diff": t.weight_diff,
            })
        })
        .collect();

    audit.log(
        "plan",
        json!({ "target": target.to_string(), "trades": trade_data }),
    )
}

pub fn log_trade_rejected(
    audit: &mut dyn AuditSink,
    trade: &PlannedTrade,
    report: &RiskReport,
) -> Result<()> {
    audit.log(
        "trade_rejected",
        json!({
            "symbol": trade.symbol.as_str(),
            "side": trade.side.to_string(),
            "amount": trade.amount,
            "reason": report.reason(),
            "checks": report.checks,
        }),
    )
}

pub fn log_trade_skipped(audit: &mut dyn AuditSink, trade: &PlannedTrade, reason: &str) -> Result<()> {
    audit.log(
        "trade_skipped",
        json!({
            "symbol": trade.symbol.as_str(),
            "side": trade.side.to_string(),
            "amount": trade.amount,
            "reason": reason,
        }),
    )
}

/// Log an executed trade. `error` is set when the venue call failed.
pub fn log_trade_executed(
    audit: &mut dyn AuditSink,
    trade: &PlannedTrade,
    receipt: Option<&TradeReceipt>,
    error: Option<&str>,
) -> Result<()> {
    audit.log(
        "trade_executed",
        json!({
            "symbol": trade.symbol.as_str(),
            "side": trade.side.to_string(),
            "amount": trade.amount,
            "price": trade.price,
            "success": receipt.is_some_and(|r| r.success),
            "transaction_id": receipt.and_then(|r| r.transaction_id.clone()),
            "message": receipt.and_then(|r| r.message.clone()),
            "error": error,
        }),
    )
}

pub fn log_cycle_completed(audit: &mut dyn AuditSink, summary: &CycleSummary) -> Result<()> {
    audit.log("cycle_completed", serde_json::to_value(summary)?)
}

pub fn log_emergency_stop(audit: &mut dyn AuditSink, metrics: &ballast_risk::RiskMetrics) -> Result<()> {
    audit.log("emergency_stop", serde_json::to_value(metrics)?)
}

pub fn log_allocation_updated(
    audit: &mut dyn AuditSink,
    previous: &TargetAllocation,
    next: &TargetAllocation,
    max_change: f64,
) -> Result<()> {
    audit.log(
        "allocation_updated",
        json!({
            "previous": previous.to_string(),
            "next": next.to_string(),
            "max_change": max_change,
        }),
    )
}
