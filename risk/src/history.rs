//! Bounded trade log and rolling statistics.

use std::collections::VecDeque;

use ballast::{Side, Symbol};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// One attempted trade, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub side: Side,
    pub amount: f64,
    pub price: f64,
    /// `amount × price`.
    pub value: f64,
    pub success: bool,
    pub reason: String,
}

/// Aggregates over the trades inside a time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub successful_trades: usize,
    pub failed_trades: usize,
    /// Zero when there are no trades.
    pub success_rate: f64,
    pub total_volume: f64,
    pub avg_trade_value: f64,
}

/// FIFO log of trade records, newest last, evicting the oldest past
/// `capacity`. Timestamps never decrease.
#[derive(Debug, Clone)]
pub struct TradeLog {
    records: VecDeque<TradeRecord>,
    capacity: usize,
}

impl TradeLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append `record`, clamping its timestamp to the previous one if the
    /// clock went backwards.
    pub fn push(&mut self, mut record: TradeRecord) {
        if let Some(last) = self.records.back() {
            if record.timestamp < last.timestamp {
                record.timestamp = last.timestamp;
            }
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn last(&self) -> Option<&TradeRecord> {
        self.records.back()
    }

    /// Records strictly after `cutoff`, oldest first.
    pub fn since(&self, cutoff: DateTime<Utc>) -> impl Iterator<Item = &TradeRecord> {
        // timestamps are sorted; skip the old prefix
        let start = self.records.partition_point(|r| r.timestamp <= cutoff);
        self.records.range(start..)
    }

    /// Number of records within `window` before `now`.
    pub fn count_within(&self, now: DateTime<Utc>, window: TimeDelta) -> usize {
        self.since(now - window).count()
    }

    /// Statistics over records within `window` before `now`.
    pub fn stats_within(&self, now: DateTime<Utc>, window: TimeDelta) -> TradeStats {
        let mut stats = TradeStats::default();
        for record in self.since(now - window) {
            stats.total_trades += 1;
            if record.success {
                stats.successful_trades += 1;
            }
            stats.total_volume += record.value;
        }
        stats.failed_trades = stats.total_trades - stats.successful_trades;
        if stats.total_trades > 0 {
            stats.success_rate = stats.successful_trades as f64 / stats.total_trades as f64;
            stats.avg_trade_value = stats.total_volume / stats.total_trades as f64;
        }
        stats
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
