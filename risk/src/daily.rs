//! Per-day portfolio valuation and P&L.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

/// Valuation of one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyEntry {
    /// First valuation of the day; never changes.
    pub start_value: f64,
    pub current_value: f64,
    /// `(current - start) / start`; zero when `start_value` is not positive.
    pub pnl: f64,
}

impl DailyEntry {
    /// Absolute P&L in quote terms.
    pub fn pnl_value(&self) -> f64 {
        self.current_value - self.start_value
    }
}

/// Day-keyed P&L table keeping only the most recent days.
#[derive(Debug, Clone)]
pub struct DailyPnl {
    entries: BTreeMap<NaiveDate, DailyEntry>,
    retention: usize,
}

impl DailyPnl {
    /// `retention` is the number of days kept, today included.
    pub fn new(retention: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            retention: retention.max(1),
        }
    }

    /// Record `value` for `date`.
    ///
    /// The first observation of a day creates its entry and returns `None`;
    /// later ones update it and return the day's P&L.
    pub fn observe(&mut self, date: NaiveDate, value: f64) -> Option<f64> {
        if let Some(entry) = self.entries.get_mut(&date) {
            entry.current_value = value;
            entry.pnl = if entry.start_value > 0.0 {
                (value - entry.start_value) / entry.start_value
            } else {
                0.0
            };
            return Some(entry.pnl);
        }

        self.entries.insert(
            date,
            DailyEntry {
                start_value: value,
                current_value: value,
                pnl: 0.0,
            },
        );
        while self.entries.len() > self.retention {
            self.entries.pop_first();
        }
        None
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyEntry> {
        self.entries.get(&date)
    }

    /// P&L fraction for `date`, if that day has been observed.
    pub fn pnl(&self, date: NaiveDate) -> Option<f64> {
        self.entries.get(&date).map(|e| e.pnl)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &DailyEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
